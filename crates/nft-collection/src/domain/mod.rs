//! # Domain Layer (Inner Hexagon)
//!
//! Pure collection logic: state model, request protocol, state machine and
//! item address derivation. NO I/O, NO logging, NO shared state.
//!
//! Dependencies point INWARD only: the service and adapters depend on this
//! module, never the reverse.

pub mod invariants;
pub mod item;
pub mod messages;
pub mod processor;
pub mod request;
pub mod state;
pub mod value_objects;

pub use invariants::*;
pub use item::*;
pub use messages::*;
pub use processor::*;
pub use request::*;
pub use state::*;
pub use value_objects::*;

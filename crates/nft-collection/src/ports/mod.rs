//! # Ports Layer (Middle Hexagon)
//!
//! Trait definitions between the collection domain and the ledger.
//!
//! - **Driving Ports (Inbound)**: `CollectionApi`, `CollectionQueries`
//! - **Driven Ports (Outbound)**: `StateStore`
//! - No concrete implementations in this module

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;

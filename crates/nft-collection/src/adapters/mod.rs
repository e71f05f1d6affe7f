//! # Adapters Layer (Outer Hexagon)
//!
//! Adapters connect collection accounts to a host ledger.
//!
//! - [`InMemoryStateStore`] implements the `StateStore` port
//! - [`Sandbox`] delivers messages between wallets, collections and items

pub mod sandbox;
pub mod state_adapter;

pub use sandbox::*;
pub use state_adapter::*;

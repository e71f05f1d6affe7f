//! # Capped Item Collection
//!
//! A pay-to-mint collection account: buyers attach value and receive freshly
//! deployed item accounts, the owner tunes sale parameters, the admin takes a
//! per-item commission.
//!
//! ## Variants
//!
//! | Variant | Commission recipient | Item content |
//! |---------|----------------------|--------------|
//! | `Standard` | admin | one shared individual node |
//! | `Power` | stored commission address | `"<index>.json"` |
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Price and buyer limit never decrease | `domain/processor.rs` - `change_data()` |
//! | `available == -1 OR lastIndex <= available` | `domain/value_objects.rs` - `SupplyCap::check_mint()` |
//! | Window is `(0, 0)` or ordered | `domain/value_objects.rs` - `SaleWindow::new()` |
//! | Rejections leave state untouched | `domain/processor.rs` - `process()` |
//! | All of the above, after every transition | `domain/invariants.rs` - `check_all_invariants()` |
//!
//! ## Requests
//!
//! | Opcode | Request | Authorized Sender(s) |
//! |--------|---------|---------------------|
//! | 1 | Buy | anyone |
//! | 2 | FixMint | owner, admin |
//! | 3 | ChangeData | owner |
//! | 4 | Withdraw (genesis: referral payout) | owner, admin |
//! | 5 | ChangeCommissionAndContent | admin |
//!
//! ## Outbound Dependencies
//!
//! | Port | Purpose |
//! |------|---------|
//! | `StateStore` | Read/write the persisted record |
//!
//! ## Usage Example
//!
//! ```ignore
//! use nft_collection::prelude::*;
//!
//! let mut sandbox = Sandbox::new(now);
//! let buyer = sandbox.treasury("buyer");
//! let collection = sandbox.deploy_collection(code, &genesis, ProcessorConfig::default())?;
//!
//! let body = Request::new(0, RequestBody::Buy { quantity: 1 }).encode()?;
//! let records = sandbox.send(buyer, collection, "1".parse()?, body)?;
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod config;
pub mod domain;
pub mod errors;
pub mod ports;
pub mod service;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Value objects
    pub use crate::domain::value_objects::{CollectionVariant, Role, SaleWindow, SupplyCap};

    // State
    pub use crate::domain::state::{
        AllInformation, CollectionContent, CollectionData, CollectionState, Roles,
    };

    // Requests and transitions
    pub use crate::domain::messages::{MessageKind, OutboundMessage};
    pub use crate::domain::processor::{process, InboundContext, Outcome, Transition};
    pub use crate::domain::request::{opcodes, ReferralPayout, Request, RequestBody, SaleParameters};

    // Item accounts
    pub use crate::domain::item::derive_item_address;

    // Invariants
    pub use crate::domain::invariants::{
        check_all_invariants, InvariantCheckResult, InvariantViolation,
    };

    // Ports
    pub use crate::ports::inbound::{CollectionApi, CollectionQueries, InboundMessage};
    pub use crate::ports::outbound::StateStore;

    // Errors
    pub use crate::errors::{exit_codes, CollectionError, CollectionResult, ValidationError};

    // Config
    pub use crate::config::{GenesisConfig, GenesisConfigBuilder, ProcessorConfig};

    // Adapters
    pub use crate::adapters::{
        has_transaction, InMemoryStateStore, Sandbox, TransactionFilter, TransactionRecord,
    };

    // Service
    pub use crate::service::{AccountStats, AccountStatus, CollectionAccount};
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_exports() {
        // Verify prelude exports compile
        use prelude::*;
        let _ = ProcessorConfig::default();
        let _ = SupplyCap::UNLIMITED;
        assert_eq!(opcodes::BUY, 1);
    }
}

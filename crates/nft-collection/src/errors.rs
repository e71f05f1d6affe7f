//! # Error Types
//!
//! Failures a collection account can report, split by layer:
//!
//! | Type | Raised by | Effect |
//! |------|-----------|--------|
//! | [`ValidationError`] | processor business rules | request rejected, attached value refunded |
//! | [`CollectionError`] | codec, processor, service, config | see variant docs |
//!
//! Every error maps to a ledger-visible exit code via
//! [`CollectionError::exit_code`].

use shared_cells::{CellError, Coins, EncodingErrorKind, MsgAddress};
use thiserror::Error;

// =============================================================================
// EXIT CODES
// =============================================================================

/// Exit codes reported to the ledger for rejected requests.
pub mod exit_codes {
    /// Accepted request.
    pub const SUCCESS: u32 = 0;
    /// Builder ran out of bits or references.
    pub const CELL_OVERFLOW: u32 = 8;
    /// Reader ran past the end of a cell, or the layout did not match.
    pub const CELL_UNDERFLOW: u32 = 9;
    /// Sender lacks the role the request needs.
    pub const ACCESS_DENIED: u32 = 707;
    /// A role address was set to `addr_none`.
    pub const MISSING_ADDRESS: u32 = 708;
    /// Buyer limit would decrease.
    pub const BUYER_LIMIT_DECREASED: u32 = 709;
    /// Price would decrease or fall below the floor.
    pub const PRICE_DECREASED: u32 = 710;
    /// Start/end pair is neither `(0, 0)` nor ordered.
    pub const INVALID_TIME_WINDOW: u32 = 711;
    /// Supply cap would be exceeded.
    pub const SUPPLY_CAP: u32 = 712;
    /// Request arrived outside the sale window.
    pub const SALE_CLOSED: u32 = 713;
    /// Quantity above the per-request limit.
    pub const BUYER_LIMIT: u32 = 714;
    /// Quantity zero or above the per-message ceiling.
    pub const INVALID_QUANTITY: u32 = 715;
    /// Attached value or balance too low.
    pub const INSUFFICIENT_FUNDS: u32 = 716;
    /// Configuration, storage or invariant failure.
    pub const INTERNAL: u32 = 0xFFFD;
    /// Persisted state could not be decoded; account no longer processes.
    pub const ACCOUNT_HALTED: u32 = 0xFFFE;
    /// Opcode not recognised.
    pub const UNSUPPORTED_REQUEST: u32 = 0xFFFF;
}

// =============================================================================
// VALIDATION ERRORS
// =============================================================================

/// A well-formed request that violates a business rule.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A configuration value may only grow.
    #[error("{field} may not decrease: {current} -> {requested}")]
    Monotonicity {
        /// `"price"` or `"buyerLimit"`.
        field: &'static str,
        /// Stored value.
        current: u128,
        /// Value carried by the request.
        requested: u128,
    },

    /// Purchase attempted outside the sale window.
    #[error("sale window is closed at {now}: open from {start} to {end}")]
    TimeWindow {
        /// Ledger time of the request.
        now: u32,
        /// Window start.
        start: u32,
        /// Window end.
        end: u32,
    },

    /// Window bounds are neither both zero nor ordered.
    #[error("invalid sale window [{start}, {end}]: use 0,0 or start < end")]
    InvalidTimeWindow {
        /// Proposed start.
        start: u32,
        /// Proposed end.
        end: u32,
    },

    /// Supply cap would be exceeded.
    #[error("supply cap {available} reached: last index {last_index}, requested {quantity}")]
    SupplyCap {
        /// Next index to mint.
        last_index: u32,
        /// Items requested (0 for configuration changes).
        quantity: u32,
        /// Cap in force.
        available: i8,
    },

    /// Sender lacks the required role.
    #[error("{sender} may not {action}")]
    AccessControl {
        /// Message sender.
        sender: MsgAddress,
        /// Operation attempted.
        action: &'static str,
    },

    /// A role would be handed to `addr_none`.
    #[error("{field} may not be addr_none")]
    MissingAddress {
        /// Role being assigned.
        field: &'static str,
    },

    /// Quantity above the configured per-request limit.
    #[error("quantity {quantity} exceeds the buyer limit of {limit}")]
    BuyerLimit {
        /// Items requested.
        quantity: u32,
        /// Limit in force.
        limit: u32,
    },

    /// Quantity zero or above what one message may mint.
    #[error("quantity {quantity} outside 1..={max}")]
    InvalidQuantity {
        /// Items requested.
        quantity: u32,
        /// Ceiling from the processor configuration.
        max: u32,
    },

    /// Proposed price under the configured floor.
    #[error("price {price} is below the minimum of {minimum}")]
    PriceBelowMinimum {
        /// Proposed price.
        price: Coins,
        /// Configured floor.
        minimum: Coins,
    },
}

impl ValidationError {
    /// Ledger-visible exit code.
    #[must_use]
    pub fn exit_code(&self) -> u32 {
        match self {
            Self::Monotonicity { field, .. } if *field == "buyerLimit" => {
                exit_codes::BUYER_LIMIT_DECREASED
            }
            Self::Monotonicity { .. } | Self::PriceBelowMinimum { .. } => {
                exit_codes::PRICE_DECREASED
            }
            Self::TimeWindow { .. } => exit_codes::SALE_CLOSED,
            Self::InvalidTimeWindow { .. } => exit_codes::INVALID_TIME_WINDOW,
            Self::SupplyCap { .. } => exit_codes::SUPPLY_CAP,
            Self::AccessControl { .. } => exit_codes::ACCESS_DENIED,
            Self::MissingAddress { .. } => exit_codes::MISSING_ADDRESS,
            Self::BuyerLimit { .. } => exit_codes::BUYER_LIMIT,
            Self::InvalidQuantity { .. } => exit_codes::INVALID_QUANTITY,
        }
    }
}

// =============================================================================
// COLLECTION ERRORS
// =============================================================================

/// Top-level error for collection accounts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CollectionError {
    /// Malformed or oversized data in a request or outbound message.
    #[error("encoding error: {0}")]
    Encoding(#[from] CellError),

    /// Business rule violation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Attached value or spendable balance too low.
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        /// Amount needed.
        required: Coins,
        /// Amount on hand.
        available: Coins,
    },

    /// Opcode not recognised.
    #[error("unsupported request opcode {0}")]
    UnsupportedRequest(u32),

    /// The account's own persisted record failed to decode.
    #[error("persisted state is corrupted: {0}")]
    CorruptedState(CellError),

    /// The account halted earlier and refuses all requests.
    #[error("account is halted")]
    Halted,

    /// Invalid processor or genesis configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The state store failed.
    #[error("state store error: {0}")]
    Store(String),

    /// A transition broke a domain invariant and was discarded.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl CollectionError {
    /// Ledger-visible exit code.
    #[must_use]
    pub fn exit_code(&self) -> u32 {
        match self {
            Self::Encoding(err) => match err.kind() {
                EncodingErrorKind::Capacity => exit_codes::CELL_OVERFLOW,
                EncodingErrorKind::Truncation | EncodingErrorKind::Schema => {
                    exit_codes::CELL_UNDERFLOW
                }
            },
            Self::Validation(err) => err.exit_code(),
            Self::InsufficientFunds { .. } => exit_codes::INSUFFICIENT_FUNDS,
            Self::UnsupportedRequest(_) => exit_codes::UNSUPPORTED_REQUEST,
            Self::CorruptedState(_) | Self::Halted => exit_codes::ACCOUNT_HALTED,
            Self::Config(_) | Self::Store(_) | Self::Invariant(_) => exit_codes::INTERNAL,
        }
    }

    /// Comment attached to the refund sent back for a rejected request.
    #[must_use]
    pub fn bounce_comment(&self) -> String {
        match self {
            Self::InsufficientFunds { .. } => "Not enough funds".to_string(),
            Self::Validation(ValidationError::SupplyCap { available, .. }) if *available <= 0 => {
                "Sale is temporarily unavailable".to_string()
            }
            Self::Validation(ValidationError::SupplyCap { .. }) => {
                "All NFTs are already sold out".to_string()
            }
            Self::Validation(ValidationError::TimeWindow { .. }) => {
                "NFT is not available at this time".to_string()
            }
            Self::Validation(ValidationError::BuyerLimit { limit, .. }) => {
                format!("You can only mint {limit} NFTs per purchase")
            }
            other => other.to_string(),
        }
    }

    /// True if the error means the account must stop processing.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::CorruptedState(_) | Self::Halted)
    }
}

/// Result alias for collection operations.
pub type CollectionResult<T> = Result<T, CollectionError>;

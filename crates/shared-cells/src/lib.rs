//! # Shared Cells - Bit-Tree Codec
//!
//! Bounded binary nodes ("cells") used for every persisted record and every
//! message handled by collection accounts, plus the typed primitives built
//! on top of them.
//!
//! ## Components
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `cell` | Immutable node: ≤ 1023 bits, ≤ 4 references, cached representation hash |
//! | `builder` | Schema-directed writer with capacity checks |
//! | `slice` | Schema-directed reader with truncation checks |
//! | `primitives` | Coins, addresses, snake bytes, content nodes, comments, state init |
//! | `errors` | Capacity / truncation / schema errors |
//!
//! ## Codec Guarantees
//!
//! | Guarantee | Enforcement |
//! |-----------|-------------|
//! | Bounded nodes | `CellBuilder::store_*` returns `BitOverflow` / `RefOverflow` |
//! | No silent truncation | `CellSlice::load_*` returns `BitUnderflow` / `RefUnderflow` |
//! | Canonical coins | `Coins::load` rejects leading zero bytes |
//! | Deterministic encoding | layout fixed by the caller's schema, never by the data |
//!
//! ## Usage Example
//!
//! ```
//! use shared_cells::prelude::*;
//!
//! let mut builder = CellBuilder::new();
//! builder.store_uint(1, 32)?.store_uint(0, 64)?.store(&Coins::from_nano(5))?;
//! let cell = builder.build();
//!
//! let mut slice = cell.parse();
//! assert_eq!(slice.load_uint(32)?, 1);
//! assert_eq!(slice.load_uint(64)?, 0);
//! assert_eq!(slice.load::<Coins>()?, Coins::from_nano(5));
//! slice.end_parse()?;
//! # Ok::<(), shared_cells::CellError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod cell;
pub mod errors;
pub mod primitives;
pub mod slice;

pub use builder::CellBuilder;
pub use cell::{Cell, CellBits, CellHash, MAX_BITS, MAX_REFS};
pub use errors::{CellError, CellResult, EncodingErrorKind};
pub use primitives::{
    bytes_cell, load_snake_bytes, offchain_content, parse_bytes_cell, parse_offchain_content,
    parse_text_comment, store_snake_bytes, text_comment, CellDeserialize, CellSerialize, Coins,
    MsgAddress, ParseAddressError, ParseCoinsError, StateInit, StdAddress, NANO_PER_COIN,
    OFFCHAIN_CONTENT_TAG,
};
pub use slice::CellSlice;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::builder::CellBuilder;
    pub use crate::cell::{Cell, CellHash};
    pub use crate::errors::{CellError, CellResult};
    pub use crate::primitives::{CellDeserialize, CellSerialize, Coins, MsgAddress, StateInit};
    pub use crate::slice::CellSlice;
}

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}

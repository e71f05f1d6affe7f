//! # Error Types
//!
//! Errors raised by the cell codec. Every failure is fatal to the single
//! encode/decode call that produced it; nothing is ever partially applied.

use thiserror::Error;

/// Coarse classification of codec failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingErrorKind {
    /// A write exceeded node capacity or a value did not fit its width.
    Capacity,
    /// A read ran past the available bits or references.
    Truncation,
    /// The data was readable but did not match the expected schema.
    Schema,
}

/// Errors from building or parsing cells.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CellError {
    /// Writing would exceed the 1023-bit data limit.
    #[error("bit overflow: requested {requested} bits, {available} available")]
    BitOverflow {
        /// Bits the write needed.
        requested: usize,
        /// Bits still free in the node.
        available: usize,
    },

    /// Writing would exceed the 4-reference limit.
    #[error("reference overflow: cell already holds {max} references")]
    RefOverflow {
        /// Reference limit per node.
        max: usize,
    },

    /// Value does not fit into the requested bit width.
    #[error("value {value} does not fit into {bits} bits")]
    ValueOutOfRange {
        /// Offending value, as text.
        value: String,
        /// Width it had to fit.
        bits: usize,
    },

    /// Reading past the end of the data bits.
    #[error("bit underflow: requested {requested} bits, {remaining} remaining")]
    BitUnderflow {
        /// Bits the read needed.
        requested: usize,
        /// Bits left in the slice.
        remaining: usize,
    },

    /// Reading a reference slot that holds no child.
    #[error("reference underflow: no reference at position {position}")]
    RefUnderflow {
        /// Index of the missing reference.
        position: usize,
    },

    /// Data left over after a schema was fully read.
    #[error("trailing data: {bits} bits and {refs} references left unread")]
    TrailingData {
        /// Unread data bits.
        bits: usize,
        /// Unread references.
        refs: usize,
    },

    /// Value was encoded with more bytes than necessary.
    #[error("non-canonical encoding: {0}")]
    NonCanonical(String),

    /// Unknown or unsupported tag.
    #[error("invalid {bits}-bit tag {tag:#b} for {what}")]
    InvalidTag {
        /// Structure being decoded.
        what: &'static str,
        /// Tag value read.
        tag: u64,
        /// Tag width.
        bits: usize,
    },

    /// Any other schema mismatch.
    #[error("schema error: {0}")]
    Schema(String),
}

impl CellError {
    /// Returns the coarse kind of this error.
    #[must_use]
    pub fn kind(&self) -> EncodingErrorKind {
        match self {
            Self::BitOverflow { .. } | Self::RefOverflow { .. } | Self::ValueOutOfRange { .. } => {
                EncodingErrorKind::Capacity
            }
            Self::BitUnderflow { .. } | Self::RefUnderflow { .. } => EncodingErrorKind::Truncation,
            Self::TrailingData { .. }
            | Self::NonCanonical(_)
            | Self::InvalidTag { .. }
            | Self::Schema(_) => EncodingErrorKind::Schema,
        }
    }

    /// Returns true for capacity errors.
    #[must_use]
    pub fn is_capacity(&self) -> bool {
        self.kind() == EncodingErrorKind::Capacity
    }

    /// Returns true for truncation errors.
    #[must_use]
    pub fn is_truncation(&self) -> bool {
        self.kind() == EncodingErrorKind::Truncation
    }

    /// Returns true for schema errors.
    #[must_use]
    pub fn is_schema(&self) -> bool {
        self.kind() == EncodingErrorKind::Schema
    }
}

/// Result alias for codec operations.
pub type CellResult<T> = Result<T, CellError>;

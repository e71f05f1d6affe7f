//! # Cells
//!
//! A cell is the bounded node of the bit-tree format: up to 1023 data bits
//! and up to four ordered references to child cells. Cells are immutable
//! once built; the representation hash and depth are computed at
//! construction and cached.
//!
//! ## Representation hash
//!
//! ```text
//! repr = d1 || d2 || padded_data || depth(child_i)... || hash(child_i)...
//! d1   = number of references
//! d2   = floor(bits / 8) + ceil(bits / 8)
//! hash = sha256(repr)
//! ```
//!
//! Data that does not end on a byte boundary is completed with a single `1`
//! bit followed by `0` bits.

use crate::errors::{CellError, CellResult};
use crate::slice::CellSlice;
use bitvec::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

/// Maximum number of data bits in one cell.
pub const MAX_BITS: usize = 1023;

/// Maximum number of child references in one cell.
pub const MAX_REFS: usize = 4;

/// Bit storage used by cells, most significant bit first.
pub type CellBits = BitVec<u8, Msb0>;

// =============================================================================
// CELL HASH
// =============================================================================

/// 256-bit representation hash of a cell.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellHash(pub [u8; 32]);

impl CellHash {
    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for CellHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CellHash({})", self.to_hex())
    }
}

impl fmt::Display for CellHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<CellHash> for [u8; 32] {
    fn from(hash: CellHash) -> Self {
        hash.0
    }
}

// =============================================================================
// CELL
// =============================================================================

/// Immutable bit-tree node.
#[derive(Clone)]
pub struct Cell {
    bits: CellBits,
    refs: Vec<Arc<Cell>>,
    hash: CellHash,
    depth: u16,
}

impl Cell {
    /// Creates a cell from raw parts, enforcing the size bounds.
    pub fn new(bits: CellBits, refs: Vec<Arc<Cell>>) -> CellResult<Self> {
        if bits.len() > MAX_BITS {
            return Err(CellError::BitOverflow {
                requested: bits.len(),
                available: MAX_BITS,
            });
        }
        if refs.len() > MAX_REFS {
            return Err(CellError::RefOverflow { max: MAX_REFS });
        }
        Ok(Self::from_parts(bits, refs))
    }

    /// Builds a cell whose bounds were already enforced by the caller.
    pub(crate) fn from_parts(bits: CellBits, refs: Vec<Arc<Cell>>) -> Self {
        let depth = refs
            .iter()
            .map(|child| child.depth.saturating_add(1))
            .max()
            .unwrap_or(0);
        let hash = representation_hash(&bits, &refs);
        Self {
            bits,
            refs,
            hash,
            depth,
        }
    }

    /// The cell with no bits and no references.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_parts(CellBits::new(), Vec::new())
    }

    /// Number of data bits.
    #[must_use]
    pub fn bit_len(&self) -> usize {
        self.bits.len()
    }

    /// Data bits.
    #[must_use]
    pub fn bits(&self) -> &BitSlice<u8, Msb0> {
        &self.bits
    }

    /// Child references in order.
    #[must_use]
    pub fn refs(&self) -> &[Arc<Cell>] {
        &self.refs
    }

    /// Child reference at `position`.
    pub fn reference(&self, position: usize) -> CellResult<&Arc<Cell>> {
        self.refs
            .get(position)
            .ok_or(CellError::RefUnderflow { position })
    }

    /// True if the cell has neither bits nor references.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty() && self.refs.is_empty()
    }

    /// Representation hash.
    #[must_use]
    pub fn hash(&self) -> CellHash {
        self.hash
    }

    /// Depth of the tree rooted at this cell.
    #[must_use]
    pub fn depth(&self) -> u16 {
        self.depth
    }

    /// Data bits packed into bytes, zero-padded at the end.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        pack_bits(&self.bits, false)
    }

    /// Starts reading this cell from the beginning.
    #[must_use]
    pub fn parse(&self) -> CellSlice<'_> {
        CellSlice::new(self)
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Cell {}

impl std::hash::Hash for Cell {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut data = hex::encode(self.data());
        if self.bits.len() % 8 != 0 {
            data.push('_');
        }
        f.debug_struct("Cell")
            .field("bits", &self.bits.len())
            .field("data", &format_args!("x{{{data}}}"))
            .field("refs", &self.refs)
            .finish()
    }
}

// =============================================================================
// HASHING
// =============================================================================

fn pack_bits(bits: &BitSlice<u8, Msb0>, completion_tag: bool) -> Vec<u8> {
    let mut bytes = vec![0u8; bits.len().div_ceil(8)];
    for (i, bit) in bits.iter().by_vals().enumerate() {
        if bit {
            bytes[i / 8] |= 0x80 >> (i % 8);
        }
    }
    let tail = bits.len() % 8;
    if completion_tag && tail != 0 {
        if let Some(last) = bytes.last_mut() {
            *last |= 0x80 >> tail;
        }
    }
    bytes
}

fn representation_hash(bits: &CellBits, refs: &[Arc<Cell>]) -> CellHash {
    let bit_len = bits.len();
    // Both values are bounded by MAX_REFS and 2 * 128.
    let d1 = refs.len() as u8;
    let d2 = (bit_len / 8 + bit_len.div_ceil(8)) as u8;

    let mut hasher = Sha256::new();
    hasher.update([d1, d2]);
    hasher.update(pack_bits(bits, true));
    for child in refs {
        hasher.update(child.depth.to_be_bytes());
    }
    for child in refs {
        hasher.update(child.hash.0);
    }
    CellHash(hasher.finalize().into())
}

// =============================================================================
// TESTS
// =============================================================================

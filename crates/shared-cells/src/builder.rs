//! # Cell Builder
//!
//! Schema-directed writer. The caller decides field widths and ordering;
//! the builder only enforces the 1023-bit / 4-reference capacity and that
//! each value fits the width it is written with.

use crate::cell::{Cell, CellBits, MAX_BITS, MAX_REFS};
use crate::errors::{CellError, CellResult};
use crate::primitives::CellSerialize;
use crate::slice::CellSlice;
use bitvec::prelude::*;
use std::sync::Arc;

/// Incremental writer producing a [`Cell`].
#[derive(Clone, Debug, Default)]
pub struct CellBuilder {
    bits: CellBits,
    refs: Vec<Arc<Cell>>,
}

impl CellBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bits written so far.
    #[must_use]
    pub fn bit_len(&self) -> usize {
        self.bits.len()
    }

    /// References written so far.
    #[must_use]
    pub fn ref_count(&self) -> usize {
        self.refs.len()
    }

    /// Bits still available.
    #[must_use]
    pub fn remaining_bits(&self) -> usize {
        MAX_BITS - self.bits.len()
    }

    /// Reference slots still available.
    #[must_use]
    pub fn remaining_refs(&self) -> usize {
        MAX_REFS - self.refs.len()
    }

    fn ensure_bits(&self, requested: usize) -> CellResult<()> {
        if requested > self.remaining_bits() {
            return Err(CellError::BitOverflow {
                requested,
                available: self.remaining_bits(),
            });
        }
        Ok(())
    }

    /// Appends a single bit.
    pub fn store_bit(&mut self, bit: bool) -> CellResult<&mut Self> {
        self.ensure_bits(1)?;
        self.bits.push(bit);
        Ok(self)
    }

    /// Appends an unsigned integer using exactly `bits` bits (at most 64).
    pub fn store_uint(&mut self, value: u64, bits: usize) -> CellResult<&mut Self> {
        if bits > 64 {
            return Err(CellError::Schema(format!(
                "store_uint supports up to 64 bits, got {bits}"
            )));
        }
        self.store_uint_big(u128::from(value), bits)
    }

    /// Appends an unsigned integer using exactly `bits` bits (at most 128).
    pub fn store_uint_big(&mut self, value: u128, bits: usize) -> CellResult<&mut Self> {
        if bits > 128 {
            return Err(CellError::Schema(format!(
                "integers are limited to 128 bits, got {bits}"
            )));
        }
        if bits < 128 && value >> bits != 0 {
            return Err(CellError::ValueOutOfRange {
                value: value.to_string(),
                bits,
            });
        }
        self.ensure_bits(bits)?;
        for shift in (0..bits).rev() {
            self.bits.push((value >> shift) & 1 == 1);
        }
        Ok(self)
    }

    /// Appends a two's-complement signed integer using exactly `bits` bits.
    pub fn store_int(&mut self, value: i64, bits: usize) -> CellResult<&mut Self> {
        if bits > 64 {
            return Err(CellError::Schema(format!(
                "store_int supports up to 64 bits, got {bits}"
            )));
        }
        let fits = match bits {
            0 => value == 0,
            64 => true,
            _ => {
                let bound = 1i64 << (bits - 1);
                (-bound..bound).contains(&value)
            }
        };
        if !fits {
            return Err(CellError::ValueOutOfRange {
                value: value.to_string(),
                bits,
            });
        }
        let raw = if bits == 64 {
            value as u64
        } else {
            (value as u64) & ((1u64 << bits) - 1)
        };
        self.store_uint(raw, bits)
    }

    /// Appends whole bytes.
    pub fn store_bytes(&mut self, bytes: &[u8]) -> CellResult<&mut Self> {
        self.ensure_bits(bytes.len() * 8)?;
        self.bits.extend_from_bitslice(bytes.view_bits::<Msb0>());
        Ok(self)
    }

    /// Appends raw bits.
    pub fn store_bits(&mut self, bits: &BitSlice<u8, Msb0>) -> CellResult<&mut Self> {
        self.ensure_bits(bits.len())?;
        self.bits.extend_from_bitslice(bits);
        Ok(self)
    }

    /// Appends a reference to a child cell.
    pub fn store_ref(&mut self, child: impl Into<Arc<Cell>>) -> CellResult<&mut Self> {
        if self.refs.len() >= MAX_REFS {
            return Err(CellError::RefOverflow { max: MAX_REFS });
        }
        self.refs.push(child.into());
        Ok(self)
    }

    /// Appends the unread remainder of a slice: its bits, then its references.
    pub fn store_slice(&mut self, slice: &CellSlice<'_>) -> CellResult<&mut Self> {
        let remaining_refs = slice.remaining_refs();
        if remaining_refs > self.remaining_refs() {
            return Err(CellError::RefOverflow { max: MAX_REFS });
        }
        self.store_bits(slice.remaining_bit_slice())?;
        for child in slice.remaining_ref_cells() {
            self.refs.push(Arc::clone(child));
        }
        Ok(self)
    }

    /// Appends a value through its schema.
    pub fn store<T: CellSerialize + ?Sized>(&mut self, value: &T) -> CellResult<&mut Self> {
        value.store(self)?;
        Ok(self)
    }

    /// Finishes the cell. The builder stays usable.
    #[must_use]
    pub fn build(&self) -> Cell {
        Cell::from_parts(self.bits.clone(), self.refs.clone())
    }
}

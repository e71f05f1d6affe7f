//! # Cell Slice
//!
//! Schema-directed reader over a [`Cell`]. Reads advance a bit cursor and a
//! reference cursor independently; running past either end is a truncation
//! error.

use crate::cell::Cell;
use crate::errors::{CellError, CellResult};
use crate::primitives::CellDeserialize;
use bitvec::prelude::*;
use std::sync::Arc;

/// Read cursor over a cell.
#[derive(Clone, Debug)]
pub struct CellSlice<'a> {
    cell: &'a Cell,
    bit_pos: usize,
    ref_pos: usize,
}

impl<'a> CellSlice<'a> {
    /// Starts reading `cell` from the beginning.
    #[must_use]
    pub fn new(cell: &'a Cell) -> Self {
        Self {
            cell,
            bit_pos: 0,
            ref_pos: 0,
        }
    }

    /// Unread bits.
    #[must_use]
    pub fn remaining_bits(&self) -> usize {
        self.cell.bit_len() - self.bit_pos
    }

    /// Unread references.
    #[must_use]
    pub fn remaining_refs(&self) -> usize {
        self.cell.refs().len() - self.ref_pos
    }

    /// True if nothing is left to read.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remaining_bits() == 0 && self.remaining_refs() == 0
    }

    pub(crate) fn remaining_bit_slice(&self) -> &'a BitSlice<u8, Msb0> {
        &self.cell.bits()[self.bit_pos..]
    }

    pub(crate) fn remaining_ref_cells(&self) -> &'a [Arc<Cell>] {
        &self.cell.refs()[self.ref_pos..]
    }

    fn ensure_bits(&self, requested: usize) -> CellResult<()> {
        if requested > self.remaining_bits() {
            return Err(CellError::BitUnderflow {
                requested,
                remaining: self.remaining_bits(),
            });
        }
        Ok(())
    }

    /// Reads one bit.
    pub fn load_bit(&mut self) -> CellResult<bool> {
        self.ensure_bits(1)?;
        let bit = self.cell.bits()[self.bit_pos];
        self.bit_pos += 1;
        Ok(bit)
    }

    /// Skips `bits` bits.
    pub fn skip_bits(&mut self, bits: usize) -> CellResult<()> {
        self.ensure_bits(bits)?;
        self.bit_pos += bits;
        Ok(())
    }

    /// Reads an unsigned integer of `bits` bits (at most 128).
    pub fn load_uint_big(&mut self, bits: usize) -> CellResult<u128> {
        let value = self.preload_uint_big(bits)?;
        self.bit_pos += bits;
        Ok(value)
    }

    /// Reads an unsigned integer without advancing.
    pub fn preload_uint_big(&self, bits: usize) -> CellResult<u128> {
        if bits > 128 {
            return Err(CellError::Schema(format!(
                "integers are limited to 128 bits, got {bits}"
            )));
        }
        self.ensure_bits(bits)?;
        let value = self.cell.bits()[self.bit_pos..self.bit_pos + bits]
            .iter()
            .by_vals()
            .fold(0u128, |acc, bit| (acc << 1) | u128::from(bit));
        Ok(value)
    }

    /// Reads an unsigned integer of `bits` bits (at most 64).
    pub fn load_uint(&mut self, bits: usize) -> CellResult<u64> {
        if bits > 64 {
            return Err(CellError::Schema(format!(
                "load_uint supports up to 64 bits, got {bits}"
            )));
        }
        // Fits: at most 64 bits were read.
        Ok(self.load_uint_big(bits)? as u64)
    }

    /// Reads an unsigned integer without advancing.
    pub fn preload_uint(&self, bits: usize) -> CellResult<u64> {
        if bits > 64 {
            return Err(CellError::Schema(format!(
                "preload_uint supports up to 64 bits, got {bits}"
            )));
        }
        Ok(self.preload_uint_big(bits)? as u64)
    }

    /// Reads a two's-complement signed integer of `bits` bits (at most 64).
    pub fn load_int(&mut self, bits: usize) -> CellResult<i64> {
        let raw = self.load_uint(bits)?;
        Ok(match bits {
            0 => 0,
            64 => raw as i64,
            _ => {
                let shift = 64 - bits;
                ((raw << shift) as i64) >> shift
            }
        })
    }

    /// Reads `len` whole bytes.
    pub fn load_bytes(&mut self, len: usize) -> CellResult<Vec<u8>> {
        self.ensure_bits(len * 8)?;
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            // Each chunk is exactly 8 bits.
            out.push(self.load_uint(8)? as u8);
        }
        Ok(out)
    }

    /// Reads `len` raw bits.
    pub fn load_bits(&mut self, len: usize) -> CellResult<BitVec<u8, Msb0>> {
        self.ensure_bits(len)?;
        let bits = self.cell.bits()[self.bit_pos..self.bit_pos + len].to_bitvec();
        self.bit_pos += len;
        Ok(bits)
    }

    /// Reads the next child reference.
    pub fn load_ref(&mut self) -> CellResult<Arc<Cell>> {
        let child = self
            .cell
            .refs()
            .get(self.ref_pos)
            .ok_or(CellError::RefUnderflow {
                position: self.ref_pos,
            })?;
        self.ref_pos += 1;
        Ok(Arc::clone(child))
    }

    /// Reads a value through its schema.
    pub fn load<T: CellDeserialize>(&mut self) -> CellResult<T> {
        T::load(self)
    }

    /// Fails with a schema error if anything is left unread.
    pub fn end_parse(&self) -> CellResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(CellError::TrailingData {
                bits: self.remaining_bits(),
                refs: self.remaining_refs(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::CellBuilder;
    use crate::cell::Cell;
    use crate::errors::CellError;

    #[test]
    fn test_fixed_width_reads() {
        let cell = CellBuilder::new()
            .store_uint(1, 32)
            .unwrap()
            .store_uint(0xDEAD_BEEF, 64)
            .unwrap()
            .store_int(-1, 2)
            .unwrap()
            .store_int(-100, 8)
            .unwrap()
            .build();

        let mut s = cell.parse();
        assert_eq!(s.load_uint(32).unwrap(), 1);
        assert_eq!(s.load_uint(64).unwrap(), 0xDEAD_BEEF);
        assert_eq!(s.load_int(2).unwrap(), -1);
        assert_eq!(s.load_int(8).unwrap(), -100);
        assert!(s.end_parse().is_ok());
    }

    #[test]
    fn test_read_past_end_is_truncation() {
        let cell = CellBuilder::new().store_uint(3, 4).unwrap().build();
        let mut s = cell.parse();
        let err = s.load_uint(5).unwrap_err();
        assert!(err.is_truncation());
        // A failed read does not move the cursor.
        assert_eq!(s.load_uint(4).unwrap(), 3);
    }

    #[test]
    fn test_missing_reference_is_truncation() {
        let cell = CellBuilder::new()
            .store_ref(Cell::empty())
            .unwrap()
            .build();
        let mut s = cell.parse();
        assert!(s.load_ref().is_ok());
        assert!(matches!(
            s.load_ref(),
            Err(CellError::RefUnderflow { position: 1 })
        ));
    }

    #[test]
    fn test_end_parse_reports_leftovers() {
        let cell = CellBuilder::new()
            .store_uint(0, 10)
            .unwrap()
            .store_ref(Cell::empty())
            .unwrap()
            .build();
        let mut s = cell.parse();
        s.skip_bits(4).unwrap();
        assert_eq!(
            s.end_parse(),
            Err(CellError::TrailingData { bits: 6, refs: 1 })
        );
    }

    #[test]
    fn test_load_bytes_unaligned() {
        let cell = CellBuilder::new()
            .store_bit(true)
            .unwrap()
            .store_bytes(b"hi")
            .unwrap()
            .build();
        let mut s = cell.parse();
        assert!(s.load_bit().unwrap());
        assert_eq!(s.load_bytes(2).unwrap(), b"hi".to_vec());
    }

    #[test]
    fn test_preload_does_not_advance() {
        let cell = CellBuilder::new().store_uint(5, 32).unwrap().build();
        let mut s = cell.parse();
        assert_eq!(s.preload_uint(32).unwrap(), 5);
        assert_eq!(s.remaining_bits(), 32);
        assert_eq!(s.load_uint(32).unwrap(), 5);
    }
}

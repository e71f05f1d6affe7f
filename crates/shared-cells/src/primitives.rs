//! # Primitive Encoders
//!
//! Typed helpers on top of the raw codec:
//!
//! | Type | Layout |
//! |------|--------|
//! | [`Coins`] | `len:uint4 value:uint(len*8)`, minimal `len` |
//! | [`MsgAddress`] | `00` (none) or `10 anycast:0 workchain:int8 hash:bits256` |
//! | snake bytes | bytes packed into the cell, continued in its first reference |
//! | off-chain content | `0x01` tag byte followed by snake bytes |
//! | text comment | `op:uint32 = 0` followed by snake UTF-8 |
//! | [`StateInit`] | `00 1 1 0 ^code ^data` |

use crate::builder::CellBuilder;
use crate::cell::{Cell, CellHash};
use crate::errors::{CellError, CellResult};
use crate::slice::CellSlice;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

// =============================================================================
// SCHEMA TRAITS
// =============================================================================

/// A value with a fixed, schema-defined encoding into a builder.
pub trait CellSerialize {
    /// Writes `self` into `builder`.
    fn store(&self, builder: &mut CellBuilder) -> CellResult<()>;

    /// Encodes `self` as a standalone cell.
    fn to_cell(&self) -> CellResult<Cell> {
        let mut builder = CellBuilder::new();
        self.store(&mut builder)?;
        Ok(builder.build())
    }
}

/// A value with a fixed, schema-defined decoding from a slice.
pub trait CellDeserialize: Sized {
    /// Reads a value from `slice`.
    fn load(slice: &mut CellSlice<'_>) -> CellResult<Self>;

    /// Decodes a standalone cell, rejecting trailing data.
    fn from_cell(cell: &Cell) -> CellResult<Self> {
        let mut slice = cell.parse();
        let value = Self::load(&mut slice)?;
        slice.end_parse()?;
        Ok(value)
    }
}

// =============================================================================
// COINS
// =============================================================================

/// Nano units per whole coin.
pub const NANO_PER_COIN: u128 = 1_000_000_000;

/// Non-negative currency amount in nano units.
///
/// Encoded as a 4-bit byte count followed by the big-endian magnitude, so
/// the largest representable amount is `2^120 - 1`.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coins(u128);

impl Coins {
    /// Zero coins.
    pub const ZERO: Self = Self(0);

    /// Largest encodable amount.
    pub const MAX: Self = Self((1u128 << 120) - 1);

    /// Amount from nano units.
    #[must_use]
    pub const fn from_nano(nano: u128) -> Self {
        Self(nano)
    }

    /// Amount from whole coins.
    #[must_use]
    pub const fn from_coins(coins: u64) -> Self {
        Self(coins as u128 * NANO_PER_COIN)
    }

    /// Amount in nano units.
    #[must_use]
    pub const fn as_nano(&self) -> u128 {
        self.0
    }

    /// True for zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition, failing past [`Coins::MAX`].
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0
            .checked_add(other.0)
            .filter(|sum| *sum <= Self::MAX.0)
            .map(Self)
    }

    /// Checked subtraction.
    #[must_use]
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Saturating subtraction.
    #[must_use]
    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Checked multiplication by a count, failing past [`Coins::MAX`].
    #[must_use]
    pub fn checked_mul(self, count: u64) -> Option<Self> {
        self.0
            .checked_mul(u128::from(count))
            .filter(|product| *product <= Self::MAX.0)
            .map(Self)
    }

    fn byte_len(self) -> usize {
        16 - (self.0.leading_zeros() as usize) / 8
    }
}

impl CellSerialize for Coins {
    fn store(&self, builder: &mut CellBuilder) -> CellResult<()> {
        if *self > Self::MAX {
            return Err(CellError::ValueOutOfRange {
                value: self.0.to_string(),
                bits: 120,
            });
        }
        let len = self.byte_len();
        builder.store_uint(len as u64, 4)?;
        builder.store_uint_big(self.0, len * 8)?;
        Ok(())
    }
}

impl CellDeserialize for Coins {
    fn load(slice: &mut CellSlice<'_>) -> CellResult<Self> {
        // At most 15: the prefix is four bits wide.
        let len = slice.load_uint(4)? as usize;
        let value = slice.load_uint_big(len * 8)?;
        if len > 0 && value >> ((len - 1) * 8) == 0 {
            return Err(CellError::NonCanonical(format!(
                "coins encoded with {len} bytes but fit in fewer"
            )));
        }
        Ok(Self(value))
    }
}

impl fmt::Debug for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Coins({self})")
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / NANO_PER_COIN;
        let frac = self.0 % NANO_PER_COIN;
        if frac == 0 {
            write!(f, "{whole}")
        } else {
            let digits = format!("{frac:09}");
            write!(f, "{whole}.{}", digits.trim_end_matches('0'))
        }
    }
}

/// Errors from parsing a decimal coin amount.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseCoinsError {
    /// Not a decimal number.
    #[error("invalid coin amount: {0:?}")]
    Invalid(String),

    /// More than nine fractional digits.
    #[error("too many fractional digits in {0:?} (max 9)")]
    TooPrecise(String),

    /// Larger than the encodable maximum.
    #[error("coin amount {0:?} exceeds the encodable maximum")]
    Overflow(String),
}

impl FromStr for Coins {
    type Err = ParseCoinsError;

    /// Parses decimal text such as `"0.2"` or `"15"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
        let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if whole.is_empty() || !all_digits(whole) || !all_digits(frac) {
            return Err(ParseCoinsError::Invalid(s.to_string()));
        }
        if frac.len() > 9 {
            return Err(ParseCoinsError::TooPrecise(s.to_string()));
        }
        let whole: u128 = whole
            .parse()
            .map_err(|_| ParseCoinsError::Overflow(s.to_string()))?;
        let frac_nano: u128 = if frac.is_empty() {
            0
        } else {
            format!("{frac:0<9}")
                .parse()
                .map_err(|_| ParseCoinsError::Invalid(s.to_string()))?
        };
        whole
            .checked_mul(NANO_PER_COIN)
            .and_then(|nano| nano.checked_add(frac_nano))
            .filter(|nano| *nano <= Self::MAX.0)
            .map(Self)
            .ok_or_else(|| ParseCoinsError::Overflow(s.to_string()))
    }
}

// =============================================================================
// ADDRESSES
// =============================================================================

/// Standard account address: workchain plus 256-bit account hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StdAddress {
    /// Signed workchain identifier.
    pub workchain: i8,
    /// Account hash.
    pub hash: [u8; 32],
}

impl StdAddress {
    /// Creates an address.
    #[must_use]
    pub const fn new(workchain: i8, hash: [u8; 32]) -> Self {
        Self { workchain, hash }
    }
}

impl fmt::Debug for StdAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.workchain, hex::encode(self.hash))
    }
}

impl fmt::Display for StdAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.workchain, hex::encode(self.hash))
    }
}

/// Errors from parsing a raw `workchain:hex` address.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseAddressError {
    /// Missing `:` separator.
    #[error("address must look like `<workchain>:<64 hex chars>`")]
    Format,

    /// Workchain is not an 8-bit signed integer.
    #[error("invalid workchain: {0}")]
    Workchain(String),

    /// Hash is not 32 bytes of hex.
    #[error("invalid account hash: {0}")]
    Hash(String),
}

impl FromStr for StdAddress {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (wc, hash) = s.split_once(':').ok_or(ParseAddressError::Format)?;
        let workchain = wc
            .parse::<i8>()
            .map_err(|_| ParseAddressError::Workchain(wc.to_string()))?;
        let bytes = hex::decode(hash).map_err(|e| ParseAddressError::Hash(e.to_string()))?;
        let hash: [u8; 32] = bytes
            .try_into()
            .map_err(|_| ParseAddressError::Hash(format!("expected 32 bytes in {hash}")))?;
        Ok(Self { workchain, hash })
    }
}

/// A message address as carried in cells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MsgAddress {
    /// Absent address (`addr_none`).
    #[default]
    None,
    /// Standard address.
    Std(StdAddress),
}

impl MsgAddress {
    /// Encoded size of a standard address in bits.
    pub const STD_BITS: usize = 2 + 1 + 8 + 256;

    /// Creates a standard address.
    #[must_use]
    pub const fn std(workchain: i8, hash: [u8; 32]) -> Self {
        Self::Std(StdAddress::new(workchain, hash))
    }

    /// True for the absent address.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// The standard address, if present.
    #[must_use]
    pub const fn as_std(&self) -> Option<&StdAddress> {
        match self {
            Self::None => None,
            Self::Std(addr) => Some(addr),
        }
    }

    /// Workchain of a standard address.
    #[must_use]
    pub fn workchain(&self) -> Option<i8> {
        self.as_std().map(|addr| addr.workchain)
    }
}

impl From<StdAddress> for MsgAddress {
    fn from(addr: StdAddress) -> Self {
        Self::Std(addr)
    }
}

impl fmt::Display for MsgAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("addr_none"),
            Self::Std(addr) => write!(f, "{addr}"),
        }
    }
}

impl CellSerialize for MsgAddress {
    fn store(&self, builder: &mut CellBuilder) -> CellResult<()> {
        match self {
            Self::None => {
                builder.store_uint(0b00, 2)?;
            }
            Self::Std(addr) => {
                builder
                    .store_uint(0b10, 2)?
                    .store_bit(false)?
                    .store_int(i64::from(addr.workchain), 8)?
                    .store_bytes(&addr.hash)?;
            }
        }
        Ok(())
    }
}

impl CellDeserialize for MsgAddress {
    fn load(slice: &mut CellSlice<'_>) -> CellResult<Self> {
        match slice.load_uint(2)? {
            0b00 => Ok(Self::None),
            0b10 => {
                if slice.load_bit()? {
                    return Err(CellError::InvalidTag {
                        what: "anycast",
                        tag: 1,
                        bits: 1,
                    });
                }
                // Range guaranteed by the 8-bit read.
                let workchain = slice.load_int(8)? as i8;
                let bytes = slice.load_bytes(32)?;
                let mut hash = [0u8; 32];
                hash.copy_from_slice(&bytes);
                Ok(Self::std(workchain, hash))
            }
            tag => Err(CellError::InvalidTag {
                what: "address",
                tag,
                bits: 2,
            }),
        }
    }
}

// =============================================================================
// SNAKE BYTES, CONTENT AND COMMENTS
// =============================================================================

/// Tag byte of an off-chain content node.
pub const OFFCHAIN_CONTENT_TAG: u8 = 0x01;

/// Writes `bytes` into the builder, spilling into a chain of first
/// references once the current cell is full.
pub fn store_snake_bytes(builder: &mut CellBuilder, bytes: &[u8]) -> CellResult<()> {
    let room = builder.remaining_bits() / 8;
    if bytes.len() <= room {
        builder.store_bytes(bytes)?;
        return Ok(());
    }
    let (head, tail) = bytes.split_at(room);
    let mut next = CellBuilder::new();
    store_snake_bytes(&mut next, tail)?;
    builder.store_bytes(head)?.store_ref(next.build())?;
    Ok(())
}

/// Reads all remaining snake bytes, following the continuation chain.
pub fn load_snake_bytes(slice: &mut CellSlice<'_>) -> CellResult<Vec<u8>> {
    let bits = slice.remaining_bits();
    if bits % 8 != 0 {
        return Err(CellError::Schema(format!(
            "snake data must be byte aligned, found {bits} bits"
        )));
    }
    let mut out = slice.load_bytes(bits / 8)?;
    if slice.remaining_refs() > 0 {
        let next = slice.load_ref()?;
        let mut next_slice = next.parse();
        out.extend(load_snake_bytes(&mut next_slice)?);
        next_slice.end_parse()?;
    }
    Ok(out)
}

/// Cell holding raw bytes in snake layout.
pub fn bytes_cell(bytes: &[u8]) -> CellResult<Cell> {
    let mut builder = CellBuilder::new();
    store_snake_bytes(&mut builder, bytes)?;
    Ok(builder.build())
}

/// Reads a cell produced by [`bytes_cell`].
pub fn parse_bytes_cell(cell: &Cell) -> CellResult<Vec<u8>> {
    let mut slice = cell.parse();
    let bytes = load_snake_bytes(&mut slice)?;
    slice.end_parse()?;
    Ok(bytes)
}

/// Off-chain content node: tag byte followed by the URI bytes.
pub fn offchain_content(uri: &[u8]) -> CellResult<Cell> {
    let mut builder = CellBuilder::new();
    builder.store_uint(u64::from(OFFCHAIN_CONTENT_TAG), 8)?;
    store_snake_bytes(&mut builder, uri)?;
    Ok(builder.build())
}

/// Reads the URI bytes from an off-chain content node.
pub fn parse_offchain_content(cell: &Cell) -> CellResult<Vec<u8>> {
    let mut slice = cell.parse();
    let tag = slice.load_uint(8)?;
    if tag != u64::from(OFFCHAIN_CONTENT_TAG) {
        return Err(CellError::InvalidTag {
            what: "off-chain content",
            tag,
            bits: 8,
        });
    }
    let bytes = load_snake_bytes(&mut slice)?;
    slice.end_parse()?;
    Ok(bytes)
}

/// Message body carrying a human-readable comment.
pub fn text_comment(text: &str) -> CellResult<Cell> {
    let mut builder = CellBuilder::new();
    builder.store_uint(0, 32)?;
    store_snake_bytes(&mut builder, text.as_bytes())?;
    Ok(builder.build())
}

/// Reads a comment body produced by [`text_comment`].
pub fn parse_text_comment(cell: &Cell) -> CellResult<String> {
    let mut slice = cell.parse();
    let op = slice.load_uint(32)?;
    if op != 0 {
        return Err(CellError::InvalidTag {
            what: "text comment",
            tag: op,
            bits: 32,
        });
    }
    let bytes = load_snake_bytes(&mut slice)?;
    slice.end_parse()?;
    String::from_utf8(bytes).map_err(|e| CellError::Schema(format!("comment is not UTF-8: {e}")))
}

// =============================================================================
// STATE INIT
// =============================================================================

/// Code and data an account is created with. Its hash is the account id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateInit {
    /// Executable code.
    pub code: Arc<Cell>,
    /// Initial persistent data.
    pub data: Arc<Cell>,
}

impl StateInit {
    /// Creates a state init.
    #[must_use]
    pub fn new(code: Arc<Cell>, data: Arc<Cell>) -> Self {
        Self { code, data }
    }

    /// Representation hash of the encoded state init.
    pub fn hash(&self) -> CellResult<CellHash> {
        Ok(self.to_cell()?.hash())
    }

    /// Address of the account created from this state init.
    pub fn address(&self, workchain: i8) -> CellResult<MsgAddress> {
        Ok(MsgAddress::std(workchain, self.hash()?.0))
    }
}

impl CellSerialize for StateInit {
    fn store(&self, builder: &mut CellBuilder) -> CellResult<()> {
        // split_depth:none special:none code:some data:some library:none
        builder
            .store_uint(0b00, 2)?
            .store_bit(true)?
            .store_bit(true)?
            .store_bit(false)?
            .store_ref(Arc::clone(&self.code))?
            .store_ref(Arc::clone(&self.data))?;
        Ok(())
    }
}

impl CellDeserialize for StateInit {
    fn load(slice: &mut CellSlice<'_>) -> CellResult<Self> {
        let header = slice.load_uint(5)?;
        if header != 0b00110 {
            return Err(CellError::InvalidTag {
                what: "state init",
                tag: header,
                bits: 5,
            });
        }
        let code = slice.load_ref()?;
        let data = slice.load_ref()?;
        Ok(Self { code, data })
    }
}

// =============================================================================
// TESTS
// =============================================================================

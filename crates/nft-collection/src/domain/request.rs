//! # Request Protocol
//!
//! Every inbound request is one cell: `opcode:uint32 query_id:uint64` then
//! the payload for that opcode.
//!
//! | Opcode | Request | Payload |
//! |--------|---------|---------|
//! | 1 | Buy | `quantity:uint32` |
//! | 2 | FixMint | `index:uint32 owner:addr` |
//! | 3 | ChangeData | `price:coins buyerLimit:uint32 startTime:uint32 endTime:uint32 available:int2 owner:addr` |
//! | 4 | Withdraw | optional `referral:addr commission:coins` |
//! | 5 | ChangeCommissionAndContent | `commission:coins ^content` |
//!
//! Opcode 4 doubles as the genesis referral payout; the processor tells the
//! two apart from the delivery context, not the wire format.

use crate::domain::state::CollectionContent;
use crate::domain::value_objects::{CollectionVariant, SupplyCap};
use crate::errors::{CollectionError, CollectionResult};
use shared_cells::{Cell, CellBuilder, CellError, CellResult, CellSlice, Coins, MsgAddress};

/// Opcode values.
pub mod opcodes {
    /// Buy.
    pub const BUY: u32 = 1;
    /// FixMint.
    pub const FIX_MINT: u32 = 2;
    /// ChangeData.
    pub const CHANGE_DATA: u32 = 3;
    /// Withdraw / genesis referral payout.
    pub const WITHDRAW: u32 = 4;
    /// ChangeCommissionAndContent.
    pub const CHANGE_COMMISSION_AND_CONTENT: u32 = 5;
}

/// Referral target and amount carried by opcode 4.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReferralPayout {
    /// Referrer.
    pub address: MsgAddress,
    /// Amount for the referrer; zero sends everything spendable.
    pub commission: Coins,
}

/// New sale parameters carried by ChangeData.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SaleParameters {
    /// New price.
    pub price: Coins,
    /// New buyer limit.
    pub buyer_limit: u32,
    /// New window start.
    pub start_time: u32,
    /// New window end.
    pub end_time: u32,
    /// New supply cap.
    pub available: SupplyCap,
    /// New owner.
    pub owner: MsgAddress,
}

/// Decoded payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestBody {
    /// Mint `quantity` items for the sender.
    Buy {
        /// Items to mint.
        quantity: u32,
    },
    /// Deploy or repair the item at `index` for `owner`.
    FixMint {
        /// Item index.
        index: u32,
        /// Item owner.
        owner: MsgAddress,
    },
    /// Replace the sale parameters.
    ChangeData(SaleParameters),
    /// Pay out the spendable balance.
    Withdraw {
        /// Optional referral paid first.
        referral: Option<ReferralPayout>,
    },
    /// Replace commission and content.
    ChangeCommissionAndContent {
        /// New per-item commission.
        commission: Coins,
        /// New content nodes.
        content: CollectionContent,
    },
}

/// A decoded inbound request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    /// Caller-chosen correlation id.
    pub query_id: u64,
    /// Payload.
    pub body: RequestBody,
}

impl Request {
    /// Creates a request.
    #[must_use]
    pub fn new(query_id: u64, body: RequestBody) -> Self {
        Self { query_id, body }
    }

    /// Opcode of the payload.
    #[must_use]
    pub fn opcode(&self) -> u32 {
        match self.body {
            RequestBody::Buy { .. } => opcodes::BUY,
            RequestBody::FixMint { .. } => opcodes::FIX_MINT,
            RequestBody::ChangeData(_) => opcodes::CHANGE_DATA,
            RequestBody::Withdraw { .. } => opcodes::WITHDRAW,
            RequestBody::ChangeCommissionAndContent { .. } => {
                opcodes::CHANGE_COMMISSION_AND_CONTENT
            }
        }
    }

    /// Short name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self.body {
            RequestBody::Buy { .. } => "buy",
            RequestBody::FixMint { .. } => "fix_mint",
            RequestBody::ChangeData(_) => "change_data",
            RequestBody::Withdraw { .. } => "withdraw",
            RequestBody::ChangeCommissionAndContent { .. } => "change_commission_and_content",
        }
    }

    /// Decodes a request for a collection of `variant`.
    ///
    /// Unknown opcodes yield [`CollectionError::UnsupportedRequest`]; any
    /// layout problem yields [`CollectionError::Encoding`].
    pub fn decode(cell: &Cell, variant: CollectionVariant) -> CollectionResult<Self> {
        let mut slice = cell.parse();
        // 32-bit read.
        let opcode = slice.load_uint(32)? as u32;
        let query_id = slice.load_uint(64)?;
        let body = match opcode {
            opcodes::BUY => RequestBody::Buy {
                quantity: load_u32(&mut slice)?,
            },
            opcodes::FIX_MINT => RequestBody::FixMint {
                index: load_u32(&mut slice)?,
                owner: slice.load()?,
            },
            opcodes::CHANGE_DATA => RequestBody::ChangeData(load_sale_parameters(&mut slice)?),
            opcodes::WITHDRAW => {
                let referral = if slice.remaining_bits() > 0 {
                    Some(ReferralPayout {
                        address: slice.load()?,
                        commission: slice.load()?,
                    })
                } else {
                    None
                };
                RequestBody::Withdraw { referral }
            }
            opcodes::CHANGE_COMMISSION_AND_CONTENT => {
                let commission = slice.load::<Coins>()?;
                let content_node = slice.load_ref()?;
                RequestBody::ChangeCommissionAndContent {
                    commission,
                    content: CollectionContent::from_cell(&content_node, variant)?,
                }
            }
            other => return Err(CollectionError::UnsupportedRequest(other)),
        };
        slice.end_parse()?;
        Ok(Self { query_id, body })
    }

    /// Encodes the request.
    pub fn encode(&self) -> CellResult<Cell> {
        let mut builder = CellBuilder::new();
        builder
            .store_uint(u64::from(self.opcode()), 32)?
            .store_uint(self.query_id, 64)?;
        match &self.body {
            RequestBody::Buy { quantity } => {
                builder.store_uint(u64::from(*quantity), 32)?;
            }
            RequestBody::FixMint { index, owner } => {
                builder.store_uint(u64::from(*index), 32)?.store(owner)?;
            }
            RequestBody::ChangeData(params) => {
                builder
                    .store(&params.price)?
                    .store_uint(u64::from(params.buyer_limit), 32)?
                    .store_uint(u64::from(params.start_time), 32)?
                    .store_uint(u64::from(params.end_time), 32)?
                    .store_int(i64::from(params.available.value()), SupplyCap::BITS)?
                    .store(&params.owner)?;
            }
            RequestBody::Withdraw { referral } => {
                if let Some(referral) = referral {
                    builder.store(&referral.address)?.store(&referral.commission)?;
                }
            }
            RequestBody::ChangeCommissionAndContent {
                commission,
                content,
            } => {
                builder.store(commission)?.store_ref(content.to_cell()?)?;
            }
        }
        Ok(builder.build())
    }
}

fn load_u32(slice: &mut CellSlice<'_>) -> CellResult<u32> {
    Ok(slice.load_uint(32)? as u32)
}

fn load_sale_parameters(slice: &mut CellSlice<'_>) -> CellResult<SaleParameters> {
    let price = slice.load()?;
    let buyer_limit = load_u32(slice)?;
    let start_time = load_u32(slice)?;
    let end_time = load_u32(slice)?;
    // A 2-bit read always lands in range.
    let available = SupplyCap::new(slice.load_int(SupplyCap::BITS)? as i8)
        .map_err(CellError::Schema)?;
    let owner = slice.load()?;
    Ok(SaleParameters {
        price,
        buyer_limit,
        start_time,
        end_time,
        available,
        owner,
    })
}

//! # Collection State Model
//!
//! The persisted record of one collection account and its bit-exact layout:
//!
//! ```text
//! available:int2 price:coins lastIndex:uint32 buyerLimit:uint32
//! startTime:uint32 endTime:uint32 commission:coins
//! ^content ^itemCode ^roles
//!
//! content = ^collectionUri ^itemCommon [^itemIndividual]     (standard has 3 refs)
//! roles   = owner:addr admin:addr [commission:addr]          (power has 3 addresses)
//! ```
//!
//! Only [`crate::domain::processor`] mutates a state after genesis.

use crate::config::GenesisConfig;
use crate::domain::value_objects::{CollectionVariant, Role, SaleWindow, SupplyCap};
use crate::errors::CollectionResult;
use serde::Serialize;
use shared_cells::{
    bytes_cell, offchain_content, Cell, CellBuilder, CellError, CellResult, CellSlice, Coins,
    MsgAddress,
};
use std::sync::Arc;

// =============================================================================
// ROLES
// =============================================================================

/// Addresses with special rights over the collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Roles {
    /// Receives net sale proceeds; changes sale parameters.
    pub owner: MsgAddress,
    /// Privileged configurator.
    pub admin: MsgAddress,
    /// Commission sink (power variant only).
    pub commission: Option<MsgAddress>,
}

impl Roles {
    /// Role of `sender`. Owner wins when one address holds both roles.
    #[must_use]
    pub fn role_of(&self, sender: &MsgAddress) -> Role {
        if sender.is_none() {
            Role::Public
        } else if *sender == self.owner {
            Role::Owner
        } else if *sender == self.admin {
            Role::Admin
        } else {
            Role::Public
        }
    }

    /// True if `sender` is the owner.
    #[must_use]
    pub fn is_owner(&self, sender: &MsgAddress) -> bool {
        !sender.is_none() && *sender == self.owner
    }

    /// True if `sender` is the admin.
    #[must_use]
    pub fn is_admin(&self, sender: &MsgAddress) -> bool {
        !sender.is_none() && *sender == self.admin
    }

    fn to_cell(&self) -> CellResult<Cell> {
        let mut builder = CellBuilder::new();
        builder.store(&self.owner)?.store(&self.admin)?;
        if let Some(commission) = &self.commission {
            builder.store(commission)?;
        }
        Ok(builder.build())
    }

    fn from_cell(cell: &Cell, variant: CollectionVariant) -> CellResult<Self> {
        let mut slice = cell.parse();
        let owner = slice.load::<MsgAddress>()?;
        let admin = slice.load::<MsgAddress>()?;
        let commission = if variant.has_commission_address() {
            Some(slice.load::<MsgAddress>()?)
        } else {
            None
        };
        slice.end_parse()?;
        Ok(Self {
            owner,
            admin,
            commission,
        })
    }
}

// =============================================================================
// CONTENT
// =============================================================================

/// Opaque content nodes passed through to queries and item deployments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionContent {
    /// Collection metadata (tagged off-chain node).
    pub collection: Arc<Cell>,
    /// Shared item metadata prefix (raw bytes node).
    pub item_common: Arc<Cell>,
    /// Per-item suffix copied into every item (standard variant only).
    pub item_individual: Option<Arc<Cell>>,
}

impl CollectionContent {
    /// Two-node content of a power collection.
    pub fn power(collection_uri: &[u8], item_common: &[u8]) -> CellResult<Self> {
        Ok(Self {
            collection: Arc::new(offchain_content(collection_uri)?),
            item_common: Arc::new(bytes_cell(item_common)?),
            item_individual: None,
        })
    }

    /// Three-node content of a standard collection.
    pub fn standard(
        collection_uri: &[u8],
        item_common: &[u8],
        item_individual: &[u8],
    ) -> CellResult<Self> {
        Ok(Self {
            collection: Arc::new(offchain_content(collection_uri)?),
            item_common: Arc::new(bytes_cell(item_common)?),
            item_individual: Some(Arc::new(bytes_cell(item_individual)?)),
        })
    }

    /// Variant whose layout this content matches.
    #[must_use]
    pub fn variant(&self) -> CollectionVariant {
        if self.item_individual.is_some() {
            CollectionVariant::Standard
        } else {
            CollectionVariant::Power
        }
    }

    /// Encodes the content record.
    pub fn to_cell(&self) -> CellResult<Cell> {
        let mut builder = CellBuilder::new();
        builder
            .store_ref(Arc::clone(&self.collection))?
            .store_ref(Arc::clone(&self.item_common))?;
        if let Some(individual) = &self.item_individual {
            builder.store_ref(Arc::clone(individual))?;
        }
        Ok(builder.build())
    }

    /// Decodes a content record shaped for `variant`.
    pub fn from_cell(cell: &Cell, variant: CollectionVariant) -> CellResult<Self> {
        let expected = variant.content_refs();
        if cell.bit_len() != 0 || cell.refs().len() != expected {
            return Err(CellError::Schema(format!(
                "{variant} content expects 0 bits and {expected} refs, found {} bits and {} refs",
                cell.bit_len(),
                cell.refs().len()
            )));
        }
        let mut slice = cell.parse();
        let collection = slice.load_ref()?;
        let item_common = slice.load_ref()?;
        let item_individual = match variant {
            CollectionVariant::Standard => Some(slice.load_ref()?),
            CollectionVariant::Power => None,
        };
        slice.end_parse()?;
        Ok(Self {
            collection,
            item_common,
            item_individual,
        })
    }
}

// =============================================================================
// COLLECTION STATE
// =============================================================================

/// Persistent state of one collection account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionState {
    pub(crate) variant: CollectionVariant,
    pub(crate) supply_cap: SupplyCap,
    pub(crate) price: Coins,
    pub(crate) last_index: u32,
    pub(crate) buyer_limit: u32,
    pub(crate) sale_window: SaleWindow,
    pub(crate) commission: Coins,
    pub(crate) content: CollectionContent,
    pub(crate) item_code: Arc<Cell>,
    pub(crate) roles: Roles,
}

impl CollectionState {
    /// Builds the initial state from a validated genesis configuration.
    pub fn genesis(config: &GenesisConfig) -> CollectionResult<Self> {
        config.validate()?;
        let supply_cap =
            SupplyCap::new(config.available).map_err(crate::errors::CollectionError::Config)?;
        let sale_window = SaleWindow::new(config.start_time, config.end_time)?;
        Ok(Self {
            variant: config.variant,
            supply_cap,
            price: config.price,
            last_index: config.last_index,
            buyer_limit: config.buyer_limit,
            sale_window,
            commission: config.commission,
            content: config.content.clone(),
            item_code: Arc::clone(&config.item_code),
            roles: config.roles.clone(),
        })
    }

    /// Encodes the persisted record.
    pub fn encode(&self) -> CellResult<Cell> {
        let mut builder = CellBuilder::new();
        builder
            .store_int(i64::from(self.supply_cap.value()), SupplyCap::BITS)?
            .store(&self.price)?
            .store_uint(u64::from(self.last_index), 32)?
            .store_uint(u64::from(self.buyer_limit), 32)?
            .store_uint(u64::from(self.sale_window.start()), 32)?
            .store_uint(u64::from(self.sale_window.end()), 32)?
            .store(&self.commission)?
            .store_ref(self.content.to_cell()?)?
            .store_ref(Arc::clone(&self.item_code))?
            .store_ref(self.roles.to_cell()?)?;
        Ok(builder.build())
    }

    /// Decodes a persisted record of the given variant.
    pub fn decode(cell: &Cell, variant: CollectionVariant) -> CellResult<Self> {
        let mut slice = cell.parse();
        let state = Self::load(&mut slice, variant)?;
        slice.end_parse()?;
        Ok(state)
    }

    fn load(slice: &mut CellSlice<'_>, variant: CollectionVariant) -> CellResult<Self> {
        // A 2-bit read always lands in range.
        let available = slice.load_int(SupplyCap::BITS)? as i8;
        let supply_cap = SupplyCap::new(available).map_err(CellError::Schema)?;
        let price = slice.load::<Coins>()?;
        let last_index = load_u32(slice)?;
        let buyer_limit = load_u32(slice)?;
        let start = load_u32(slice)?;
        let end = load_u32(slice)?;
        let sale_window = SaleWindow::new(start, end)
            .map_err(|e| CellError::Schema(format!("persisted {e}")))?;
        let commission = slice.load::<Coins>()?;
        let content_node = slice.load_ref()?;
        let content = CollectionContent::from_cell(&content_node, variant)?;
        let item_code = slice.load_ref()?;
        let roles_node = slice.load_ref()?;
        let roles = Roles::from_cell(&roles_node, variant)?;
        Ok(Self {
            variant,
            supply_cap,
            price,
            last_index,
            buyer_limit,
            sale_window,
            commission,
            content,
            item_code,
            roles,
        })
    }

    /// Layout variant.
    #[must_use]
    pub fn variant(&self) -> CollectionVariant {
        self.variant
    }

    /// Item cap.
    #[must_use]
    pub fn supply_cap(&self) -> SupplyCap {
        self.supply_cap
    }

    /// Per-item price.
    #[must_use]
    pub fn price(&self) -> Coins {
        self.price
    }

    /// Next index to mint.
    #[must_use]
    pub fn last_index(&self) -> u32 {
        self.last_index
    }

    /// Per-request mint ceiling, 0 for none.
    #[must_use]
    pub fn buyer_limit(&self) -> u32 {
        self.buyer_limit
    }

    /// Sale window.
    #[must_use]
    pub fn sale_window(&self) -> SaleWindow {
        self.sale_window
    }

    /// Per-item commission.
    #[must_use]
    pub fn commission(&self) -> Coins {
        self.commission
    }

    /// Content nodes.
    #[must_use]
    pub fn content(&self) -> &CollectionContent {
        &self.content
    }

    /// Item template code.
    #[must_use]
    pub fn item_code(&self) -> &Arc<Cell> {
        &self.item_code
    }

    /// Role addresses.
    #[must_use]
    pub fn roles(&self) -> &Roles {
        &self.roles
    }

    /// Address receiving commission: the commission address for power
    /// collections, the admin otherwise.
    #[must_use]
    pub fn commission_recipient(&self) -> MsgAddress {
        self.roles.commission.unwrap_or(self.roles.admin)
    }

    /// Snapshot backing the `get_all_information` query.
    #[must_use]
    pub fn all_information(&self) -> AllInformation {
        AllInformation {
            owner: self.roles.owner,
            admin: self.roles.admin,
            commission_address: self.roles.commission,
            available: self.supply_cap.value(),
            price: self.price,
            last_index: self.last_index,
            buyer_limit: self.buyer_limit,
            start_time: self.sale_window.start(),
            end_time: self.sale_window.end(),
            commission: self.commission,
            content_collection: Arc::clone(&self.content.collection),
            content_item: Arc::clone(&self.content.item_common),
        }
    }

    /// Snapshot backing the `get_collection_data` query.
    #[must_use]
    pub fn collection_data(&self) -> CollectionData {
        CollectionData {
            next_index: self.last_index,
            collection_content: Arc::clone(&self.content.collection),
            owner: self.roles.owner,
        }
    }
}

fn load_u32(slice: &mut CellSlice<'_>) -> CellResult<u32> {
    // A 32-bit read always fits.
    Ok(slice.load_uint(32)? as u32)
}

// =============================================================================
// QUERY RESULTS
// =============================================================================

/// Every stored field, in query order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AllInformation {
    /// Owner address.
    pub owner: MsgAddress,
    /// Admin address.
    pub admin: MsgAddress,
    /// Commission address (power variant only).
    pub commission_address: Option<MsgAddress>,
    /// Supply cap, -1 for unlimited.
    pub available: i8,
    /// Per-item price.
    pub price: Coins,
    /// Next index to mint.
    pub last_index: u32,
    /// Per-request mint ceiling.
    pub buyer_limit: u32,
    /// Sale window start.
    pub start_time: u32,
    /// Sale window end.
    pub end_time: u32,
    /// Per-item commission.
    pub commission: Coins,
    /// Collection content node.
    #[serde(skip)]
    pub content_collection: Arc<Cell>,
    /// Item-common content node.
    #[serde(skip)]
    pub content_item: Arc<Cell>,
}

/// Standard collection metadata triple.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CollectionData {
    /// Next index to mint.
    pub next_index: u32,
    /// Collection content node.
    #[serde(skip)]
    pub collection_content: Arc<Cell>,
    /// Owner address.
    pub owner: MsgAddress,
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenesisConfig;
    use crate::errors::{CollectionError, ValidationError};

    fn addr(byte: u8) -> MsgAddress {
        MsgAddress::std(0, [byte; 32])
    }

    fn power_config() -> GenesisConfig {
        GenesisConfig::builder(CollectionVariant::Power)
            .owner(addr(1))
            .admin(addr(2))
            .commission_address(addr(3))
            .price(Coins::from_nano(200_000_000))
            .commission(Coins::from_nano(100_000_000))
            .content(CollectionContent::power(b"https://c.example/collection.json", b"https://c.example/").unwrap())
            .item_code(Arc::new(bytes_cell(b"item").unwrap()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_power_layout_round_trip() {
        let state = CollectionState::genesis(&power_config()).unwrap();
        let cell = state.encode().unwrap();
        // available, 4-byte price, four uint32 fields, 4-byte commission
        assert_eq!(cell.bit_len(), 2 + 36 + 128 + 36);
        assert_eq!(cell.refs().len(), 3);
        assert_eq!(cell.refs()[2].bit_len(), 3 * MsgAddress::STD_BITS);

        let decoded = CollectionState::decode(&cell, CollectionVariant::Power).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn test_standard_layout_round_trip() {
        let config = GenesisConfig::builder(CollectionVariant::Standard)
            .owner(addr(1))
            .admin(addr(2))
            .available(1)
            .sale_window(10, 20)
            .content(CollectionContent::standard(b"c.json", b"https://i/", b"meta.json").unwrap())
            .item_code(Arc::new(Cell::empty()))
            .build()
            .unwrap();
        let state = CollectionState::genesis(&config).unwrap();
        let cell = state.encode().unwrap();
        assert_eq!(cell.refs()[0].refs().len(), 3);
        assert_eq!(cell.refs()[2].bit_len(), 2 * MsgAddress::STD_BITS);
        assert_eq!(
            CollectionState::decode(&cell, CollectionVariant::Standard).unwrap(),
            state
        );
        assert_eq!(state.commission_recipient(), addr(2));
    }

    #[test]
    fn test_decode_with_wrong_variant_fails() {
        let state = CollectionState::genesis(&power_config()).unwrap();
        let cell = state.encode().unwrap();
        let err = CollectionState::decode(&cell, CollectionVariant::Standard).unwrap_err();
        assert!(err.is_schema());
    }

    #[test]
    fn test_decode_truncated_record_fails() {
        let cell = CellBuilder::new().store_int(-1, 2).unwrap().build();
        let err = CollectionState::decode(&cell, CollectionVariant::Power).unwrap_err();
        assert!(err.is_truncation());
    }

    #[test]
    fn test_decode_rejects_trailing_bits() {
        let state = CollectionState::genesis(&power_config()).unwrap();
        let cell = state.encode().unwrap();
        let mut builder = CellBuilder::new();
        builder
            .store_slice(&cell.parse())
            .unwrap()
            .store_bit(true)
            .unwrap();
        let err = CollectionState::decode(&builder.build(), CollectionVariant::Power).unwrap_err();
        assert!(matches!(err, CellError::TrailingData { bits: 1, refs: 0 }));
    }

    #[test]
    fn test_commission_recipient_power() {
        let state = CollectionState::genesis(&power_config()).unwrap();
        assert_eq!(state.commission_recipient(), addr(3));
        let info = state.all_information();
        assert_eq!(info.commission_address, Some(addr(3)));
        assert_eq!(info.available, -1);
        assert_eq!(state.collection_data().next_index, 0);
    }

    #[test]
    fn test_genesis_rejects_last_index_above_cap() {
        let mut config = power_config();
        config.available = 0;
        config.last_index = 1;
        let err = CollectionState::genesis(&config).unwrap_err();
        assert!(matches!(
            err,
            CollectionError::Validation(ValidationError::SupplyCap { .. })
        ));
    }

    #[test]
    fn test_role_resolution() {
        let roles = Roles {
            owner: addr(1),
            admin: addr(2),
            commission: None,
        };
        assert_eq!(roles.role_of(&addr(1)), Role::Owner);
        assert_eq!(roles.role_of(&addr(2)), Role::Admin);
        assert_eq!(roles.role_of(&addr(9)), Role::Public);
        assert_eq!(roles.role_of(&MsgAddress::None), Role::Public);
    }
}

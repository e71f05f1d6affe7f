//! # Item Address Deriver
//!
//! Item accounts are created from the collection's item template code and a
//! per-index data record `index:uint64 collection:addr`. Their address is the
//! collection's workchain plus the hash of that state init, so any index can
//! be resolved without touching the ledger.

use crate::domain::messages::{MessageKind, OutboundMessage};
use crate::domain::state::CollectionState;
use shared_cells::{
    bytes_cell, Cell, CellBuilder, CellResult, Coins, MsgAddress, StateInit, StdAddress,
};
use std::sync::Arc;

/// Metadata suffix appended to the decimal index for power collections.
pub const ITEM_METADATA_SUFFIX: &str = ".json";

/// Data record an item account starts with.
pub fn item_data(index: u64, collection: &StdAddress) -> CellResult<Cell> {
    let mut builder = CellBuilder::new();
    builder
        .store_uint(index, 64)?
        .store(&MsgAddress::Std(*collection))?;
    Ok(builder.build())
}

/// State init of the item at `index`.
pub fn item_state_init(
    item_code: &Arc<Cell>,
    index: u64,
    collection: &StdAddress,
) -> CellResult<StateInit> {
    Ok(StateInit::new(
        Arc::clone(item_code),
        Arc::new(item_data(index, collection)?),
    ))
}

/// Address of the item at `index`.
pub fn derive_item_address(
    item_code: &Arc<Cell>,
    index: u64,
    collection: &StdAddress,
) -> CellResult<MsgAddress> {
    item_state_init(item_code, index, collection)?.address(collection.workchain)
}

/// Content node stored in the item at `index`.
///
/// Power collections give each item `"<index>.json"`; standard collections
/// copy the stored item-individual node.
pub fn item_content(state: &CollectionState, index: u32) -> CellResult<Arc<Cell>> {
    match &state.content().item_individual {
        Some(individual) => Ok(Arc::clone(individual)),
        None => Ok(Arc::new(bytes_cell(
            format!("{index}{ITEM_METADATA_SUFFIX}").as_bytes(),
        )?)),
    }
}

/// Full item metadata: off-chain tag, the collection's common prefix, and
/// the item's individual node as a reference.
pub fn full_item_content(state: &CollectionState, individual: Arc<Cell>) -> CellResult<Cell> {
    let common = state.content().item_common.parse();
    let mut builder = CellBuilder::new();
    builder
        .store_uint(u64::from(shared_cells::OFFCHAIN_CONTENT_TAG), 8)?
        .store_slice(&common)?
        .store_ref(individual)?;
    Ok(builder.build())
}

/// Body of an item deployment: `owner:addr ^content`.
pub fn deploy_body(owner: &MsgAddress, content: Arc<Cell>) -> CellResult<Cell> {
    let mut builder = CellBuilder::new();
    builder.store(owner)?.store_ref(content)?;
    Ok(builder.build())
}

/// Message deploying the item at `index` for `owner`.
pub fn deploy_message(
    state: &CollectionState,
    collection: &StdAddress,
    index: u32,
    owner: &MsgAddress,
    value: Coins,
) -> CellResult<OutboundMessage> {
    let init = item_state_init(state.item_code(), u64::from(index), collection)?;
    let destination = init.address(collection.workchain)?;
    let body = deploy_body(owner, item_content(state, index)?)?;
    Ok(OutboundMessage {
        destination,
        value,
        body: Arc::new(body),
        state_init: Some(init),
        kind: MessageKind::ItemDeploy { index },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenesisConfig;
    use crate::domain::state::CollectionContent;
    use crate::domain::value_objects::CollectionVariant;
    use shared_cells::{parse_bytes_cell, CellDeserialize};

    fn collection() -> StdAddress {
        StdAddress::new(0, [0xC0; 32])
    }

    fn code() -> Arc<Cell> {
        Arc::new(bytes_cell(b"item code").unwrap())
    }

    fn power_state() -> CollectionState {
        let config = GenesisConfig::builder(CollectionVariant::Power)
            .owner(MsgAddress::std(0, [1; 32]))
            .admin(MsgAddress::std(0, [2; 32]))
            .commission_address(MsgAddress::std(0, [3; 32]))
            .content(CollectionContent::power(b"c.json", b"https://items/").unwrap())
            .item_code(code())
            .build()
            .unwrap();
        CollectionState::genesis(&config).unwrap()
    }

    #[test]
    fn test_address_is_deterministic() {
        let a = derive_item_address(&code(), 7, &collection()).unwrap();
        let b = derive_item_address(&code(), 7, &collection()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.workchain(), Some(0));
    }

    #[test]
    fn test_distinct_indexes_distinct_addresses() {
        let a = derive_item_address(&code(), 0, &collection()).unwrap();
        let b = derive_item_address(&code(), 1, &collection()).unwrap();
        assert_ne!(a, b);

        let other = StdAddress::new(0, [0xC1; 32]);
        assert_ne!(a, derive_item_address(&code(), 0, &other).unwrap());
    }

    #[test]
    fn test_workchain_follows_collection() {
        let master = StdAddress::new(-1, [0xC0; 32]);
        let addr = derive_item_address(&code(), 0, &master).unwrap();
        assert_eq!(addr.workchain(), Some(-1));
    }

    #[test]
    fn test_item_data_layout() {
        let data = item_data(3, &collection()).unwrap();
        assert_eq!(data.bit_len(), 64 + MsgAddress::STD_BITS);
        let mut slice = data.parse();
        assert_eq!(slice.load_uint(64).unwrap(), 3);
        assert_eq!(
            slice.load::<MsgAddress>().unwrap(),
            MsgAddress::Std(collection())
        );
    }

    #[test]
    fn test_power_item_content_is_index_json() {
        let state = power_state();
        let content = item_content(&state, 12).unwrap();
        assert_eq!(parse_bytes_cell(&content).unwrap(), b"12.json");
    }

    #[test]
    fn test_deploy_message_shape() {
        let state = power_state();
        let owner = MsgAddress::std(0, [9; 32]);
        let msg = deploy_message(&state, &collection(), 4, &owner, Coins::from_nano(20_000_000))
            .unwrap();
        assert!(msg.is_deploy());
        assert_eq!(msg.kind, MessageKind::ItemDeploy { index: 4 });
        assert_eq!(
            msg.destination,
            derive_item_address(state.item_code(), 4, &collection()).unwrap()
        );
        let mut body = msg.body.parse();
        assert_eq!(MsgAddress::load(&mut body).unwrap(), owner);
        let content = body.load_ref().unwrap();
        assert_eq!(parse_bytes_cell(&content).unwrap(), b"4.json");
    }

    #[test]
    fn test_full_item_content() {
        let state = power_state();
        let individual = Arc::new(bytes_cell(b"5.json").unwrap());
        let full = full_item_content(&state, Arc::clone(&individual)).unwrap();
        let mut slice = full.parse();
        assert_eq!(slice.load_uint(8).unwrap(), 1);
        assert_eq!(slice.load_bytes(14).unwrap(), b"https://items/");
        assert_eq!(slice.load_ref().unwrap(), individual);
    }
}

//! # Driving Ports (API - Inbound)
//!
//! Interfaces the ledger uses to deliver requests to a collection account
//! and to run read-only queries against it.

use crate::domain::processor::Transition;
use crate::domain::state::{AllInformation, CollectionData};
use crate::errors::CollectionResult;
use shared_cells::{Cell, Coins, MsgAddress, StdAddress};
use std::sync::Arc;

// =============================================================================
// INBOUND MESSAGE
// =============================================================================

/// An internal message addressed to a collection account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    /// Sender address.
    pub sender: MsgAddress,
    /// Attached value.
    pub value: Coins,
    /// Request body.
    pub body: Arc<Cell>,
}

impl InboundMessage {
    /// Creates a message.
    #[must_use]
    pub fn new(sender: MsgAddress, value: Coins, body: impl Into<Arc<Cell>>) -> Self {
        Self {
            sender,
            value,
            body: body.into(),
        }
    }
}

// =============================================================================
// COLLECTION API (Primary Driving Port)
// =============================================================================

/// Request delivery for one collection account.
///
/// ## Usage
///
/// ```ignore
/// let transition = account.receive(InboundMessage::new(buyer, value, body), now)?;
/// for msg in transition.messages { ledger.deliver(msg); }
/// ```
pub trait CollectionApi {
    /// Processes one message at ledger time `now`.
    ///
    /// # Returns
    ///
    /// * `Ok(Transition)` - accepted or rejected; rejected requests carry a refund
    /// * `Err(CollectionError)` - the account is halted or its state is unreadable
    fn receive(&mut self, message: InboundMessage, now: u32) -> CollectionResult<Transition>;

    /// The account's address.
    fn address(&self) -> StdAddress;

    /// Current balance.
    fn balance(&self) -> Coins;
}

// =============================================================================
// COLLECTION QUERIES (Read-only Driving Port)
// =============================================================================

/// Read-only getters.
pub trait CollectionQueries {
    /// Every stored field.
    fn get_all_information(&self) -> CollectionResult<AllInformation>;

    /// Address of the item at `index`.
    fn get_item_address_by_index(&self, index: u64) -> CollectionResult<MsgAddress>;

    /// Next index, collection content and owner.
    fn get_collection_data(&self) -> CollectionResult<CollectionData>;

    /// Full metadata of an item given its individual content node.
    fn get_item_content(&self, index: u64, individual: Arc<Cell>) -> CollectionResult<Cell>;
}

//! # Sandbox Ledger
//!
//! A small in-memory ledger for end-to-end tests: wallets, collection
//! accounts and item accounts exchange messages until the queue drains.
//!
//! ## Delivery Rules
//!
//! | Destination | Effect |
//! |-------------|--------|
//! | collection | `CollectionAccount::receive`; outbound messages are queued |
//! | item (message carries a state init) | account created on first deploy, owner and content taken from the body |
//! | anything else | credited as a wallet |
//!
//! A collection that fails outright (halted, unreadable state) bounces the
//! full value back to the sender.

use crate::adapters::state_adapter::InMemoryStateStore;
use crate::config::{GenesisConfig, ProcessorConfig};
use crate::domain::messages::MessageKind;
use crate::errors::{CollectionError, CollectionResult};
use crate::ports::inbound::InboundMessage;
use crate::service::CollectionAccount;
use sha2::{Digest, Sha256};
use shared_cells::{
    parse_text_comment, Cell, CellDeserialize, CellResult, Coins, MsgAddress, StateInit,
    StdAddress,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::debug;

/// Starting balance of a treasury wallet.
pub const TREASURY_BALANCE: Coins = Coins::from_coins(1_000_000);

// =============================================================================
// RECORDS
// =============================================================================

/// One delivered message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionRecord {
    /// Sender.
    pub from: MsgAddress,
    /// Recipient.
    pub to: StdAddress,
    /// Attached value.
    pub value: Coins,
    /// Whether the recipient accepted the message.
    pub success: bool,
    /// Recipient exit code.
    pub exit_code: u32,
    /// True if the message created an item account.
    pub deploy: bool,
    /// Purpose tag of collection-emitted messages.
    pub kind: Option<MessageKind>,
    /// Text comment, if the body is one.
    pub comment: Option<String>,
}

/// Matches transaction records by any combination of fields.
#[derive(Clone, Debug, Default)]
pub struct TransactionFilter {
    from: Option<MsgAddress>,
    to: Option<StdAddress>,
    success: Option<bool>,
    exit_code: Option<u32>,
    deploy: Option<bool>,
}

impl TransactionFilter {
    /// Matches everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sender must be `from`.
    #[must_use]
    pub fn from(mut self, from: impl Into<MsgAddress>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Recipient must be `to`.
    #[must_use]
    pub fn to(mut self, to: StdAddress) -> Self {
        self.to = Some(to);
        self
    }

    /// Outcome must be `success`.
    #[must_use]
    pub fn success(mut self, success: bool) -> Self {
        self.success = Some(success);
        self
    }

    /// Exit code must be `code`.
    #[must_use]
    pub fn exit_code(mut self, code: u32) -> Self {
        self.exit_code = Some(code);
        self
    }

    /// Deployment flag must be `deploy`.
    #[must_use]
    pub fn deploy(mut self, deploy: bool) -> Self {
        self.deploy = Some(deploy);
        self
    }

    /// True if `record` satisfies every set field.
    #[must_use]
    pub fn matches(&self, record: &TransactionRecord) -> bool {
        self.from.map_or(true, |v| v == record.from)
            && self.to.map_or(true, |v| v == record.to)
            && self.success.map_or(true, |v| v == record.success)
            && self.exit_code.map_or(true, |v| v == record.exit_code)
            && self.deploy.map_or(true, |v| v == record.deploy)
    }
}

/// True if any of `records` matches `filter`.
#[must_use]
pub fn has_transaction(records: &[TransactionRecord], filter: &TransactionFilter) -> bool {
    records.iter().any(|record| filter.matches(record))
}

// =============================================================================
// ITEM ACCOUNTS
// =============================================================================

/// An item account created by a collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeployedItem {
    /// Index from the item's data record.
    pub index: u64,
    /// Collection from the item's data record.
    pub collection: MsgAddress,
    /// Owner from the latest deployment body.
    pub owner: MsgAddress,
    /// Content node from the latest deployment body.
    pub content: Arc<Cell>,
    /// Accumulated value.
    pub balance: Coins,
}

impl DeployedItem {
    fn from_deploy(init: &StateInit, body: &Cell, value: Coins) -> CellResult<Self> {
        let mut data = init.data.parse();
        let index = data.load_uint(64)?;
        let collection = MsgAddress::load(&mut data)?;
        let mut body = body.parse();
        let owner = MsgAddress::load(&mut body)?;
        let content = body.load_ref()?;
        body.end_parse()?;
        Ok(Self {
            index,
            collection,
            owner,
            content,
            balance: value,
        })
    }
}

// =============================================================================
// SANDBOX
// =============================================================================

struct Delivery {
    from: MsgAddress,
    to: StdAddress,
    value: Coins,
    body: Arc<Cell>,
    state_init: Option<StateInit>,
    kind: Option<MessageKind>,
}

/// In-memory ledger.
pub struct Sandbox {
    now: u32,
    workchain: i8,
    wallets: HashMap<StdAddress, Coins>,
    collections: HashMap<StdAddress, CollectionAccount<InMemoryStateStore>>,
    items: HashMap<StdAddress, DeployedItem>,
    transactions: Vec<TransactionRecord>,
}

impl Sandbox {
    /// Creates an empty ledger on workchain 0 at time `now`.
    #[must_use]
    pub fn new(now: u32) -> Self {
        Self {
            now,
            workchain: 0,
            wallets: HashMap::new(),
            collections: HashMap::new(),
            items: HashMap::new(),
            transactions: Vec::new(),
        }
    }

    /// Current ledger time.
    #[must_use]
    pub fn now(&self) -> u32 {
        self.now
    }

    /// Sets the ledger time.
    pub fn set_now(&mut self, now: u32) {
        self.now = now;
    }

    /// Moves the ledger time forward.
    pub fn advance(&mut self, seconds: u32) {
        self.now = self.now.saturating_add(seconds);
    }

    /// A funded wallet whose address is derived from `name`.
    pub fn treasury(&mut self, name: &str) -> StdAddress {
        let hash: [u8; 32] = Sha256::digest(name.as_bytes()).into();
        let address = StdAddress::new(self.workchain, hash);
        self.wallets.entry(address).or_insert(TREASURY_BALANCE);
        address
    }

    /// Creates a collection account. Nothing is delivered until the first
    /// message, which the account processes as its genesis message.
    pub fn deploy_collection(
        &mut self,
        code: Arc<Cell>,
        genesis: &GenesisConfig,
        config: ProcessorConfig,
    ) -> CollectionResult<StdAddress> {
        let account =
            CollectionAccount::deploy(code, genesis, self.workchain, config, InMemoryStateStore::new())?;
        let address = account.address();
        self.collections.insert(address, account);
        Ok(address)
    }

    /// Collection account at `address`.
    #[must_use]
    pub fn collection(&self, address: &StdAddress) -> Option<&CollectionAccount<InMemoryStateStore>> {
        self.collections.get(address)
    }

    /// Collection account at `address`, mutably.
    pub fn collection_mut(
        &mut self,
        address: &StdAddress,
    ) -> Option<&mut CollectionAccount<InMemoryStateStore>> {
        self.collections.get_mut(address)
    }

    /// Item account at `address`.
    #[must_use]
    pub fn item(&self, address: &MsgAddress) -> Option<&DeployedItem> {
        address.as_std().and_then(|addr| self.items.get(addr))
    }

    /// Number of item accounts.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Balance of any account.
    #[must_use]
    pub fn balance(&self, address: &StdAddress) -> Coins {
        if let Some(account) = self.collections.get(address) {
            return account.balance();
        }
        if let Some(item) = self.items.get(address) {
            return item.balance;
        }
        self.wallets.get(address).copied().unwrap_or(Coins::ZERO)
    }

    /// Every record since the ledger was created.
    #[must_use]
    pub fn transactions(&self) -> &[TransactionRecord] {
        &self.transactions
    }

    /// Sends `value` with `body` from wallet `from` to `to` and delivers
    /// every resulting message. Returns the records of this send only.
    pub fn send(
        &mut self,
        from: StdAddress,
        to: StdAddress,
        value: Coins,
        body: impl Into<Arc<Cell>>,
    ) -> CollectionResult<Vec<TransactionRecord>> {
        let funds = self.wallets.get(&from).copied().unwrap_or(Coins::ZERO);
        let remaining = funds
            .checked_sub(value)
            .ok_or(CollectionError::InsufficientFunds {
                required: value,
                available: funds,
            })?;
        self.wallets.insert(from, remaining);

        let mut queue = VecDeque::from([Delivery {
            from: MsgAddress::Std(from),
            to,
            value,
            body: body.into(),
            state_init: None,
            kind: None,
        }]);
        let mut records = Vec::new();
        while let Some(delivery) = queue.pop_front() {
            records.push(self.deliver(delivery, &mut queue));
        }
        self.transactions.extend(records.iter().cloned());
        Ok(records)
    }

    fn deliver(&mut self, delivery: Delivery, queue: &mut VecDeque<Delivery>) -> TransactionRecord {
        debug!(from = %delivery.from, to = %delivery.to, value = %delivery.value, "Delivering message");
        let mut record = TransactionRecord {
            from: delivery.from,
            to: delivery.to,
            value: delivery.value,
            success: true,
            exit_code: 0,
            deploy: false,
            kind: delivery.kind,
            comment: parse_text_comment(&delivery.body).ok(),
        };

        if let Some(account) = self.collections.get_mut(&delivery.to) {
            let collection = account.address();
            let message = InboundMessage::new(delivery.from, delivery.value, delivery.body);
            match account.receive(message, self.now) {
                Ok(transition) => {
                    record.success = transition.is_accepted();
                    record.exit_code = transition.exit_code();
                    for msg in transition.messages {
                        if let Some(to) = msg.destination.as_std() {
                            queue.push_back(Delivery {
                                from: MsgAddress::Std(collection),
                                to: *to,
                                value: msg.value,
                                body: msg.body,
                                state_init: msg.state_init,
                                kind: Some(msg.kind),
                            });
                        }
                    }
                }
                Err(err) => {
                    record.success = false;
                    record.exit_code = err.exit_code();
                    if let Some(sender) = delivery.from.as_std() {
                        self.credit(*sender, delivery.value);
                    }
                }
            }
            return record;
        }

        if let Some(init) = &delivery.state_init {
            match self.items.get_mut(&delivery.to) {
                Some(item) => {
                    item.balance = item.balance.checked_add(delivery.value).unwrap_or(Coins::MAX);
                }
                None => match DeployedItem::from_deploy(init, &delivery.body, delivery.value) {
                    Ok(item) => {
                        self.items.insert(delivery.to, item);
                        record.deploy = true;
                    }
                    Err(err) => {
                        record.success = false;
                        record.exit_code = CollectionError::from(err).exit_code();
                    }
                },
            }
            return record;
        }

        self.credit(delivery.to, delivery.value);
        record
    }

    fn credit(&mut self, to: StdAddress, value: Coins) {
        let balance = self.wallets.entry(to).or_insert(Coins::ZERO);
        *balance = balance.checked_add(value).unwrap_or(Coins::MAX);
    }
}

// =============================================================================
// TESTS
// =============================================================================

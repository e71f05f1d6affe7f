//! # Collection Account Service
//!
//! One collection account as the ledger sees it: an address, a balance, a
//! persisted record in a [`StateStore`], and a lifecycle status.
//!
//! ## Request Flow
//!
//! ```text
//! receive(message, now)
//!   ├─ halted?                      → Err(Halted)
//!   ├─ load + decode record         → on failure: halt, Err(CorruptedState)
//!   ├─ decode request               → on failure: rejection with refund
//!   ├─ processor::process
//!   ├─ invariants                   → on violation: rejection with refund
//!   └─ encode + save new record     → on failure: rejection with refund
//!
//! Balance and status change only after the transition is settled, so a
//! rejected message leaves nothing behind but the kept bounce fee.
//! ```
//!
//! ## Lifecycle
//!
//! | Status | Meaning |
//! |--------|---------|
//! | `Uninitialized` | record written at deploy, no request accepted yet |
//! | `Active` | normal processing; opcode 4 is a withdrawal |
//! | `Halted` | persisted record unreadable; every request fails |
//!
//! Messages run with `genesis = true` until one is accepted, which routes
//! opcode 4 to the one-off referral payout.

use crate::config::{GenesisConfig, ProcessorConfig};
use crate::domain::invariants::check_all_invariants;
use crate::domain::item::{derive_item_address, full_item_content};
use crate::domain::messages::total_value;
use crate::domain::processor::{process, reject, InboundContext, Transition};
use crate::domain::request::Request;
use crate::domain::state::{AllInformation, CollectionData, CollectionState};
use crate::domain::value_objects::CollectionVariant;
use crate::errors::{CollectionError, CollectionResult, ValidationError};
use crate::ports::inbound::{CollectionApi, CollectionQueries, InboundMessage};
use crate::ports::outbound::StateStore;

use serde::Serialize;
use shared_cells::{Cell, CellError, Coins, MsgAddress, StateInit, StdAddress};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Lifecycle status of a collection account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum AccountStatus {
    /// Deployed, no request accepted yet.
    Uninitialized,
    /// Processing requests.
    Active,
    /// Stopped after a persisted-state decode failure.
    Halted,
}

/// Statistics for one collection account.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct AccountStats {
    /// Messages delivered, including rejected ones.
    pub requests_received: u64,
    /// Accepted requests.
    pub requests_accepted: u64,
    /// Rejected requests.
    pub requests_rejected: u64,
    /// Item deployments emitted.
    pub items_deployed: u64,
    /// Transitions discarded for breaking an invariant.
    pub invariant_violations: u64,
}

/// Address of a collection created from `code` and its genesis record.
pub fn collection_address(
    code: &Arc<Cell>,
    data: &Arc<Cell>,
    workchain: i8,
) -> CollectionResult<StdAddress> {
    let hash = StateInit::new(Arc::clone(code), Arc::clone(data)).hash()?;
    Ok(StdAddress::new(workchain, hash.0))
}

/// A deployed collection account.
pub struct CollectionAccount<S: StateStore> {
    /// Account address.
    address: StdAddress,
    /// Persisted layout.
    variant: CollectionVariant,
    /// Account code (opaque).
    code: Arc<Cell>,
    /// Processor economics.
    config: ProcessorConfig,
    /// Persisted record storage.
    store: S,
    /// Lifecycle status.
    status: AccountStatus,
    /// Current balance.
    balance: Coins,
    /// Counters.
    stats: AccountStats,
}

impl<S: StateStore> CollectionAccount<S> {
    /// Creates the account: validates the genesis configuration, writes the
    /// initial record, and derives the address from code and record.
    ///
    /// The genesis price is held to the same `min_price` floor as ChangeData.
    pub fn deploy(
        code: Arc<Cell>,
        genesis: &GenesisConfig,
        workchain: i8,
        config: ProcessorConfig,
        mut store: S,
    ) -> CollectionResult<Self> {
        config.validate()?;
        if genesis.price < config.min_price {
            return Err(ValidationError::PriceBelowMinimum {
                price: genesis.price,
                minimum: config.min_price,
            }
            .into());
        }
        let state = CollectionState::genesis(genesis)?;
        let data = Arc::new(state.encode()?);
        let address = collection_address(&code, &data, workchain)?;
        store.save(&address, data)?;

        info!(
            collection = %address,
            variant = %state.variant(),
            price = %state.price(),
            available = %state.supply_cap(),
            "Collection deployed"
        );

        Ok(Self {
            address,
            variant: state.variant(),
            code,
            config,
            store,
            status: AccountStatus::Uninitialized,
            balance: Coins::ZERO,
            stats: AccountStats::default(),
        })
    }

    /// Account address.
    #[must_use]
    pub fn address(&self) -> StdAddress {
        self.address
    }

    /// Persisted layout.
    #[must_use]
    pub fn variant(&self) -> CollectionVariant {
        self.variant
    }

    /// Account code.
    #[must_use]
    pub fn code(&self) -> &Arc<Cell> {
        &self.code
    }

    /// Lifecycle status.
    #[must_use]
    pub fn status(&self) -> AccountStatus {
        self.status
    }

    /// Current balance.
    #[must_use]
    pub fn balance(&self) -> Coins {
        self.balance
    }

    /// Counters.
    #[must_use]
    pub fn stats(&self) -> &AccountStats {
        &self.stats
    }

    /// Processor configuration.
    #[must_use]
    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Backing store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Backing store, mutably.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Decodes the current persisted record without side effects.
    pub fn state(&self) -> CollectionResult<CollectionState> {
        let cell = self
            .store
            .load(&self.address)?
            .ok_or_else(|| CollectionError::CorruptedState(missing_record()))?;
        CollectionState::decode(&cell, self.variant).map_err(CollectionError::CorruptedState)
    }

    /// Processes one message.
    #[instrument(
        skip(self, message),
        fields(collection = %self.address, sender = %message.sender, value = %message.value)
    )]
    pub fn receive(&mut self, message: InboundMessage, now: u32) -> CollectionResult<Transition> {
        if self.status == AccountStatus::Halted {
            warn!("Message delivered to halted account");
            return Err(CollectionError::Halted);
        }

        let before = self.load_or_halt()?;
        self.stats.requests_received += 1;
        let genesis = self.status == AccountStatus::Uninitialized;

        let ctx = InboundContext {
            sender: message.sender,
            attached: message.value,
            balance: self.balance.checked_add(message.value).unwrap_or(Coins::MAX),
            now,
            collection: self.address,
            genesis,
        };

        let transition = match Request::decode(&message.body, self.variant) {
            Ok(request) => {
                debug!(op = request.name(), query_id = request.query_id, genesis, "Request decoded");
                self.apply(before, &ctx, &request)
            }
            Err(err) => reject(&ctx, err, &self.config),
        };

        self.balance = ctx.balance;
        if transition.is_accepted() {
            self.status = AccountStatus::Active;
        }
        self.settle(&transition);
        Ok(transition)
    }

    fn apply(
        &mut self,
        before: CollectionState,
        ctx: &InboundContext,
        request: &Request,
    ) -> Transition {
        let mut after = before.clone();
        let transition = process(&mut after, ctx, request, &self.config);

        let check = check_all_invariants(&before, &after, ctx, request, &transition);
        if !check.is_ok() {
            self.stats.invariant_violations += 1;
            let summary = check
                .violations
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            error!(op = request.name(), violations = %summary, "Transition discarded");
            return reject(ctx, CollectionError::Invariant(summary), &self.config);
        }

        if transition.is_accepted() && after != before {
            let saved = match after.encode() {
                Ok(cell) => self.store.save(&self.address, Arc::new(cell)),
                Err(err) => Err(err.into()),
            };
            if let Err(err) = saved {
                error!(op = request.name(), error = %err, "Transition not persisted");
                return reject(ctx, err, &self.config);
            }
        }
        transition
    }

    fn settle(&mut self, transition: &Transition) {
        self.balance = self.balance.saturating_sub(total_value(&transition.messages));
        match transition.error() {
            None => {
                self.stats.requests_accepted += 1;
                let deployed = transition.messages.iter().filter(|m| m.is_deploy()).count();
                self.stats.items_deployed += deployed as u64;
                info!(
                    messages = transition.messages.len(),
                    items = deployed,
                    balance = %self.balance,
                    "Request accepted"
                );
            }
            Some(err) => {
                self.stats.requests_rejected += 1;
                warn!(exit_code = err.exit_code(), error = %err, "Request rejected");
            }
        }
    }

    fn load_or_halt(&mut self) -> CollectionResult<CollectionState> {
        match self.state() {
            Ok(state) => Ok(state),
            Err(CollectionError::CorruptedState(err)) => {
                self.status = AccountStatus::Halted;
                error!(error = %err, "Persisted state unreadable; halting account");
                Err(CollectionError::CorruptedState(err))
            }
            Err(other) => Err(other),
        }
    }
}

fn missing_record() -> CellError {
    CellError::Schema("no persisted record".to_string())
}

impl<S: StateStore> CollectionApi for CollectionAccount<S> {
    fn receive(&mut self, message: InboundMessage, now: u32) -> CollectionResult<Transition> {
        CollectionAccount::receive(self, message, now)
    }

    fn address(&self) -> StdAddress {
        self.address
    }

    fn balance(&self) -> Coins {
        self.balance
    }
}

impl<S: StateStore> CollectionQueries for CollectionAccount<S> {
    fn get_all_information(&self) -> CollectionResult<AllInformation> {
        Ok(self.state()?.all_information())
    }

    fn get_item_address_by_index(&self, index: u64) -> CollectionResult<MsgAddress> {
        let state = self.state()?;
        Ok(derive_item_address(state.item_code(), index, &self.address)?)
    }

    fn get_collection_data(&self) -> CollectionResult<CollectionData> {
        Ok(self.state()?.collection_data())
    }

    fn get_item_content(&self, _index: u64, individual: Arc<Cell>) -> CollectionResult<Cell> {
        let state = self.state()?;
        Ok(full_item_content(&state, individual)?)
    }
}

// =============================================================================
// TESTS
// =============================================================================

//! # Request Processor
//!
//! The collection's state machine. [`process`] applies one decoded request
//! to the current state and returns the outbound messages to deliver.
//!
//! ## Guarantees
//!
//! | Guarantee | How |
//! |-----------|-----|
//! | No partial updates | handlers work on a copy; the caller's state is replaced only on acceptance |
//! | Checks before effects | every rule is checked before any message is built |
//! | Rejections refund | attached value minus `bounce_fee` goes back with a comment |
//!
//! ## Access
//!
//! | Request | Allowed senders |
//! |---------|-----------------|
//! | Buy | anyone |
//! | FixMint | owner, admin |
//! | ChangeData | owner |
//! | Withdraw / genesis referral payout | owner, admin |
//! | ChangeCommissionAndContent | admin |

use crate::config::ProcessorConfig;
use crate::domain::item::deploy_message;
use crate::domain::messages::{MessageKind, OutboundMessage};
use crate::domain::request::{ReferralPayout, Request, RequestBody, SaleParameters};
use crate::domain::state::{CollectionContent, CollectionState};
use crate::domain::value_objects::SaleWindow;
use crate::errors::{CollectionError, CollectionResult, ValidationError};
use shared_cells::{Coins, MsgAddress, StdAddress};

// =============================================================================
// CONTEXT AND RESULT
// =============================================================================

/// Delivery facts the ledger supplies with each request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InboundContext {
    /// Message sender.
    pub sender: MsgAddress,
    /// Value attached to the message.
    pub attached: Coins,
    /// Account balance, including `attached`.
    pub balance: Coins,
    /// Ledger time in unix seconds.
    pub now: u32,
    /// This collection's own address.
    pub collection: StdAddress,
    /// True for the first message after the account was created.
    pub genesis: bool,
}

/// Whether a request was applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// State replaced, messages emitted.
    Accepted,
    /// State untouched, attached value refunded.
    Rejected(CollectionError),
}

/// Result of processing one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    /// Acceptance or the rejection reason.
    pub outcome: Outcome,
    /// Messages for the ledger to deliver.
    pub messages: Vec<OutboundMessage>,
}

impl Transition {
    /// True if the request was applied.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self.outcome, Outcome::Accepted)
    }

    /// Rejection reason, if any.
    #[must_use]
    pub fn error(&self) -> Option<&CollectionError> {
        match &self.outcome {
            Outcome::Accepted => None,
            Outcome::Rejected(err) => Some(err),
        }
    }

    /// Ledger-visible exit code.
    #[must_use]
    pub fn exit_code(&self) -> u32 {
        self.error()
            .map_or(crate::errors::exit_codes::SUCCESS, CollectionError::exit_code)
    }
}

/// State replacement and messages produced by an accepted request.
struct Effects {
    next: Option<CollectionState>,
    messages: Vec<OutboundMessage>,
}

impl Effects {
    fn messages(messages: Vec<OutboundMessage>) -> Self {
        Self {
            next: None,
            messages,
        }
    }
}

// =============================================================================
// ENTRY POINTS
// =============================================================================

/// Applies `request` to `state`.
///
/// On acceptance `state` is replaced with the new state; on rejection it is
/// left exactly as it was and the only message is the refund.
pub fn process(
    state: &mut CollectionState,
    ctx: &InboundContext,
    request: &Request,
    config: &ProcessorConfig,
) -> Transition {
    let result = match &request.body {
        RequestBody::Buy { quantity } => buy(state, ctx, *quantity, config),
        RequestBody::FixMint { index, owner } => fix_mint(state, ctx, *index, owner, config),
        RequestBody::ChangeData(params) => change_data(state, ctx, params, config),
        RequestBody::Withdraw { referral } if ctx.genesis => {
            init_referral(state, ctx, referral.as_ref(), config)
        }
        RequestBody::Withdraw { referral } => withdraw(state, ctx, referral.as_ref(), config),
        RequestBody::ChangeCommissionAndContent {
            commission,
            content,
        } => change_commission_and_content(state, ctx, *commission, content),
    };

    match result {
        Ok(effects) => {
            if let Some(next) = effects.next {
                *state = next;
            }
            Transition {
                outcome: Outcome::Accepted,
                messages: effects.messages,
            }
        }
        Err(err) => reject(ctx, err, config),
    }
}

/// Rejection transition: refund `attached - bounce_fee` with a comment.
#[must_use]
pub fn reject(ctx: &InboundContext, error: CollectionError, config: &ProcessorConfig) -> Transition {
    let refund = ctx.attached.saturating_sub(config.bounce_fee);
    let messages = if refund.is_zero() || ctx.sender.is_none() {
        Vec::new()
    } else {
        vec![OutboundMessage::refund(ctx.sender, refund, &error.bounce_comment())]
    };
    Transition {
        outcome: Outcome::Rejected(error),
        messages,
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

fn buy(
    state: &CollectionState,
    ctx: &InboundContext,
    quantity: u32,
    config: &ProcessorConfig,
) -> CollectionResult<Effects> {
    if quantity == 0 || quantity > config.max_items_per_buy {
        return Err(ValidationError::InvalidQuantity {
            quantity,
            max: config.max_items_per_buy,
        }
        .into());
    }
    state.supply_cap.check_mint(state.last_index, quantity)?;
    state.sale_window.check(ctx.now)?;
    if state.buyer_limit != 0 && quantity > state.buyer_limit {
        return Err(ValidationError::BuyerLimit {
            quantity,
            limit: state.buyer_limit,
        }
        .into());
    }

    let count = u64::from(quantity);
    let commission_total = times(state.commission, count);
    let required = times(state.price, count)
        .checked_add(commission_total)
        .and_then(|sum| sum.checked_add(config.gas_reserve))
        .unwrap_or(Coins::MAX);
    if ctx.attached < required {
        return Err(CollectionError::InsufficientFunds {
            required,
            available: ctx.attached,
        });
    }

    let mut messages = Vec::with_capacity(quantity as usize + 2);
    for index in state.last_index..state.last_index + quantity {
        messages.push(deploy_message(
            state,
            &ctx.collection,
            index,
            &ctx.sender,
            config.item_forward_amount,
        )?);
    }
    if !commission_total.is_zero() {
        messages.push(OutboundMessage::transfer(
            state.commission_recipient(),
            commission_total,
            "Commission",
            MessageKind::Commission,
        )?);
    }
    let proceeds = ctx
        .attached
        .saturating_sub(commission_total)
        .saturating_sub(times(config.item_forward_amount, count))
        .saturating_sub(config.gas_reserve);
    if !proceeds.is_zero() {
        messages.push(OutboundMessage::transfer(
            state.roles.owner,
            proceeds,
            "Sale proceeds",
            MessageKind::Proceeds,
        )?);
    }

    let mut next = state.clone();
    next.last_index += quantity;
    Ok(Effects {
        next: Some(next),
        messages,
    })
}

fn fix_mint(
    state: &CollectionState,
    ctx: &InboundContext,
    index: u32,
    owner: &MsgAddress,
    config: &ProcessorConfig,
) -> CollectionResult<Effects> {
    require_owner_or_admin(state, ctx, "fix mint")?;
    let spendable = ctx.balance.saturating_sub(config.storage_reserve);
    if spendable < config.item_forward_amount {
        return Err(CollectionError::InsufficientFunds {
            required: config.item_forward_amount,
            available: spendable,
        });
    }
    let message = deploy_message(
        state,
        &ctx.collection,
        index,
        owner,
        config.item_forward_amount,
    )?;
    Ok(Effects::messages(vec![message]))
}

fn change_data(
    state: &CollectionState,
    ctx: &InboundContext,
    params: &SaleParameters,
    config: &ProcessorConfig,
) -> CollectionResult<Effects> {
    if !state.roles.is_owner(&ctx.sender) {
        return Err(access_denied(ctx, "change sale data"));
    }
    if params.owner.is_none() {
        return Err(ValidationError::MissingAddress { field: "owner" }.into());
    }
    if params.buyer_limit < state.buyer_limit {
        return Err(ValidationError::Monotonicity {
            field: "buyerLimit",
            current: u128::from(state.buyer_limit),
            requested: u128::from(params.buyer_limit),
        }
        .into());
    }
    if params.price < state.price {
        return Err(ValidationError::Monotonicity {
            field: "price",
            current: state.price.as_nano(),
            requested: params.price.as_nano(),
        }
        .into());
    }
    if params.price < config.min_price {
        return Err(ValidationError::PriceBelowMinimum {
            price: params.price,
            minimum: config.min_price,
        }
        .into());
    }
    let sale_window = SaleWindow::new(params.start_time, params.end_time)?;
    if !params.available.admits(state.last_index) {
        return Err(ValidationError::SupplyCap {
            last_index: state.last_index,
            quantity: 0,
            available: params.available.value(),
        }
        .into());
    }

    let mut next = state.clone();
    next.price = params.price;
    next.buyer_limit = params.buyer_limit;
    next.sale_window = sale_window;
    next.supply_cap = params.available;
    next.roles.owner = params.owner;
    Ok(Effects {
        next: Some(next),
        messages: Vec::new(),
    })
}

fn withdraw(
    state: &CollectionState,
    ctx: &InboundContext,
    referral: Option<&ReferralPayout>,
    config: &ProcessorConfig,
) -> CollectionResult<Effects> {
    require_owner_or_admin(state, ctx, "withdraw")?;
    let spendable = ctx.balance.saturating_sub(config.storage_reserve);
    let messages = payout(spendable, referral, ctx.sender)?;
    Ok(Effects::messages(messages))
}

fn init_referral(
    state: &CollectionState,
    ctx: &InboundContext,
    referral: Option<&ReferralPayout>,
    config: &ProcessorConfig,
) -> CollectionResult<Effects> {
    require_owner_or_admin(state, ctx, "initialise the collection")?;
    let spendable = ctx.balance.saturating_sub(config.storage_reserve);
    let messages = payout(spendable, referral, state.commission_recipient())?;
    Ok(Effects::messages(messages))
}

fn change_commission_and_content(
    state: &CollectionState,
    ctx: &InboundContext,
    commission: Coins,
    content: &CollectionContent,
) -> CollectionResult<Effects> {
    if !state.roles.is_admin(&ctx.sender) {
        return Err(access_denied(ctx, "change commission and content"));
    }
    let mut next = state.clone();
    next.commission = commission;
    next.content = content.clone();
    Ok(Effects {
        next: Some(next),
        messages: Vec::new(),
    })
}

// =============================================================================
// HELPERS
// =============================================================================

/// Splits `spendable` between an optional referral and `remainder_to`.
///
/// A referral commission of zero sends everything to the referral.
fn payout(
    spendable: Coins,
    referral: Option<&ReferralPayout>,
    remainder_to: MsgAddress,
) -> CollectionResult<Vec<OutboundMessage>> {
    let mut messages = Vec::with_capacity(2);
    let mut remainder = spendable;

    if let Some(referral) = referral {
        let amount = if referral.commission.is_zero() {
            spendable
        } else {
            referral.commission
        };
        remainder = spendable
            .checked_sub(amount)
            .ok_or(CollectionError::InsufficientFunds {
                required: amount,
                available: spendable,
            })?;
        if !amount.is_zero() {
            messages.push(OutboundMessage::transfer(
                referral.address,
                amount,
                "Referral payout",
                MessageKind::Referral,
            )?);
        }
    }

    if !remainder.is_zero() {
        messages.push(OutboundMessage::transfer(
            remainder_to,
            remainder,
            "Withdrawal",
            MessageKind::Withdrawal,
        )?);
    }
    Ok(messages)
}

fn require_owner_or_admin(
    state: &CollectionState,
    ctx: &InboundContext,
    action: &'static str,
) -> CollectionResult<()> {
    if state.roles.is_owner(&ctx.sender) || state.roles.is_admin(&ctx.sender) {
        Ok(())
    } else {
        Err(access_denied(ctx, action))
    }
}

fn access_denied(ctx: &InboundContext, action: &'static str) -> CollectionError {
    ValidationError::AccessControl {
        sender: ctx.sender,
        action,
    }
    .into()
}

fn times(amount: Coins, count: u64) -> Coins {
    amount.checked_mul(count).unwrap_or(Coins::MAX)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenesisConfig;
    use crate::domain::item::derive_item_address;
    use crate::domain::value_objects::{CollectionVariant, SupplyCap};
    use crate::errors::exit_codes;
    use shared_cells::{parse_text_comment, Cell};
    use std::sync::Arc;

    const NANO: u128 = 1_000_000_000;

    fn coins(text: &str) -> Coins {
        text.parse().unwrap()
    }

    fn addr(byte: u8) -> MsgAddress {
        MsgAddress::std(0, [byte; 32])
    }

    fn owner() -> MsgAddress {
        addr(1)
    }

    fn admin() -> MsgAddress {
        addr(2)
    }

    fn commission_wallet() -> MsgAddress {
        addr(3)
    }

    fn buyer() -> MsgAddress {
        addr(4)
    }

    fn collection() -> StdAddress {
        StdAddress::new(0, [0xC0; 32])
    }

    fn power_state() -> CollectionState {
        let config = GenesisConfig::builder(CollectionVariant::Power)
            .owner(owner())
            .admin(admin())
            .commission_address(commission_wallet())
            .price(coins("0.2"))
            .commission(coins("0.1"))
            .content(CollectionContent::power(b"c.json", b"https://i/").unwrap())
            .item_code(Arc::new(Cell::empty()))
            .build()
            .unwrap();
        CollectionState::genesis(&config).unwrap()
    }

    fn ctx(sender: MsgAddress, attached: Coins) -> InboundContext {
        InboundContext {
            sender,
            attached,
            balance: attached,
            now: 1_000,
            collection: collection(),
            genesis: false,
        }
    }

    fn buy_request(quantity: u32) -> Request {
        Request::new(0, RequestBody::Buy { quantity })
    }

    fn change_data_request(price: Coins, buyer_limit: u32, start: u32, end: u32, available: i8) -> Request {
        Request::new(
            0,
            RequestBody::ChangeData(SaleParameters {
                price,
                buyer_limit,
                start_time: start,
                end_time: end,
                available: SupplyCap::new(available).unwrap(),
                owner: owner(),
            }),
        )
    }

    fn sent_to(transition: &Transition, to: MsgAddress) -> Coins {
        transition
            .messages
            .iter()
            .filter(|m| m.destination == to)
            .fold(Coins::ZERO, |sum, m| sum.checked_add(m.value).unwrap())
    }

    #[test]
    fn test_buy_four_items_splits_payout() {
        let mut state = power_state();
        let config = ProcessorConfig::default();
        let attached = coins("2");
        let t = process(&mut state, &ctx(buyer(), attached), &buy_request(4), &config);

        assert!(t.is_accepted());
        assert_eq!(state.last_index(), 4);
        assert_eq!(sent_to(&t, commission_wallet()), coins("0.4"));
        // 2 - 0.4 commission - 4 * 0.02 forward - 0.05 gas
        assert_eq!(sent_to(&t, owner()), coins("1.47"));

        let deploys: Vec<_> = t.messages.iter().filter(|m| m.is_deploy()).collect();
        assert_eq!(deploys.len(), 4);
        for (i, msg) in deploys.iter().enumerate() {
            assert_eq!(msg.kind, MessageKind::ItemDeploy { index: i as u32 });
            assert_eq!(msg.value, config.item_forward_amount);
            assert_eq!(
                msg.destination,
                derive_item_address(state.item_code(), i as u64, &collection()).unwrap()
            );
        }
    }

    #[test]
    fn test_buy_exact_funds_boundary() {
        let config = ProcessorConfig::default();
        // 0.2 + 0.1 + 0.05
        let exact = Coins::from_nano(350 * NANO / 1000);
        let mut state = power_state();
        assert!(process(&mut state, &ctx(buyer(), exact), &buy_request(1), &config).is_accepted());

        let mut state = power_state();
        let short = Coins::from_nano(exact.as_nano() - 1);
        let t = process(&mut state, &ctx(buyer(), short), &buy_request(1), &config);
        assert_eq!(t.exit_code(), exit_codes::INSUFFICIENT_FUNDS);
        assert_eq!(state.last_index(), 0);
    }

    #[test]
    fn test_buy_rejection_refunds_with_comment() {
        let mut state = power_state();
        let before = state.clone();
        let config = ProcessorConfig::default();
        let t = process(&mut state, &ctx(buyer(), coins("0.3")), &buy_request(1), &config);

        assert_eq!(state, before);
        assert_eq!(t.messages.len(), 1);
        let refund = &t.messages[0];
        assert_eq!(refund.destination, buyer());
        assert_eq!(refund.value, coins("0.29"));
        assert_eq!(refund.kind, MessageKind::Refund);
        assert_eq!(parse_text_comment(&refund.body).unwrap(), "Not enough funds");
    }

    #[test]
    fn test_buyer_limit_rejects_large_purchase() {
        let mut state = power_state();
        state.buyer_limit = 1;
        let before = state.clone();
        let t = process(
            &mut state,
            &ctx(buyer(), coins("10")),
            &buy_request(10),
            &ProcessorConfig::default(),
        );
        assert_eq!(t.exit_code(), exit_codes::BUYER_LIMIT);
        assert_eq!(state, before);
    }

    #[test]
    fn test_supply_cap() {
        let mut state = power_state();
        state.supply_cap = SupplyCap::new(1).unwrap();
        let config = ProcessorConfig::default();

        let t = process(&mut state, &ctx(buyer(), coins("5")), &buy_request(2), &config);
        assert_eq!(t.exit_code(), exit_codes::SUPPLY_CAP);
        assert_eq!(state.last_index(), 0);

        assert!(process(&mut state, &ctx(buyer(), coins("5")), &buy_request(1), &config).is_accepted());
        assert_eq!(state.last_index(), 1);

        let t = process(&mut state, &ctx(buyer(), coins("5")), &buy_request(1), &config);
        assert_eq!(t.exit_code(), exit_codes::SUPPLY_CAP);
        assert_eq!(
            parse_text_comment(&t.messages[0].body).unwrap(),
            "All NFTs are already sold out"
        );
    }

    #[test]
    fn test_sale_window_gating() {
        let mut state = power_state();
        state.sale_window = SaleWindow::new(1_100, 1_200).unwrap();
        let config = ProcessorConfig::default();

        let early = process(&mut state, &ctx(buyer(), coins("1")), &buy_request(1), &config);
        assert_eq!(early.exit_code(), exit_codes::SALE_CLOSED);

        let mut inside = ctx(buyer(), coins("1"));
        inside.now = 1_150;
        assert!(process(&mut state, &inside, &buy_request(1), &config).is_accepted());

        let mut late = ctx(buyer(), coins("1"));
        late.now = 1_201;
        assert!(!process(&mut state, &late, &buy_request(1), &config).is_accepted());
    }

    #[test]
    fn test_quantity_bounds() {
        let mut state = power_state();
        let config = ProcessorConfig::default().with_max_items_per_buy(3);
        let zero = process(&mut state, &ctx(buyer(), coins("5")), &buy_request(0), &config);
        assert_eq!(zero.exit_code(), exit_codes::INVALID_QUANTITY);
        let many = process(&mut state, &ctx(buyer(), coins("5")), &buy_request(4), &config);
        assert_eq!(many.exit_code(), exit_codes::INVALID_QUANTITY);
    }

    #[test]
    fn test_zero_commission_sends_no_commission_message() {
        let mut state = power_state();
        state.commission = Coins::ZERO;
        let t = process(
            &mut state,
            &ctx(buyer(), coins("1")),
            &buy_request(1),
            &ProcessorConfig::default(),
        );
        assert!(t.is_accepted());
        assert!(t.messages.iter().all(|m| m.kind != MessageKind::Commission));
    }

    #[test]
    fn test_standard_commission_goes_to_admin() {
        let config = GenesisConfig::builder(CollectionVariant::Standard)
            .owner(owner())
            .admin(admin())
            .price(coins("0.2"))
            .commission(coins("0.1"))
            .content(CollectionContent::standard(b"c", b"i", b"meta.json").unwrap())
            .item_code(Arc::new(Cell::empty()))
            .build()
            .unwrap();
        let mut state = CollectionState::genesis(&config).unwrap();
        let t = process(
            &mut state,
            &ctx(buyer(), coins("1")),
            &buy_request(2),
            &ProcessorConfig::default(),
        );
        assert_eq!(sent_to(&t, admin()), coins("0.2"));
    }

    #[test]
    fn test_change_data_price_monotonicity() {
        let mut state = power_state();
        let before = state.clone();
        let config = ProcessorConfig::default();
        let t = process(
            &mut state,
            &ctx(owner(), coins("0.02")),
            &change_data_request(coins("0.1"), 0, 0, 0, -1),
            &config,
        );
        assert_eq!(
            t.error(),
            Some(&CollectionError::Validation(ValidationError::Monotonicity {
                field: "price",
                current: 200_000_000,
                requested: 100_000_000,
            }))
        );
        assert_eq!(t.exit_code(), 710);
        assert_eq!(state, before);
    }

    #[test]
    fn test_change_data_buyer_limit_checked_first() {
        let mut state = power_state();
        state.buyer_limit = 5;
        let t = process(
            &mut state,
            &ctx(owner(), Coins::ZERO),
            &change_data_request(coins("0.1"), 1, 0, 0, -1),
            &ProcessorConfig::default(),
        );
        assert_eq!(t.exit_code(), 709);
    }

    #[test]
    fn test_change_data_accepts_increase() {
        let mut state = power_state();
        let t = process(
            &mut state,
            &ctx(owner(), Coins::ZERO),
            &change_data_request(coins("2"), 10, 100, 200, 1),
            &ProcessorConfig::default(),
        );
        assert!(t.is_accepted());
        assert!(t.messages.is_empty());
        assert_eq!(state.price(), coins("2"));
        assert_eq!(state.buyer_limit(), 10);
        assert_eq!(state.sale_window(), SaleWindow::new(100, 200).unwrap());
        assert_eq!(state.supply_cap().value(), 1);
    }

    #[test]
    fn test_change_data_rules() {
        let config = ProcessorConfig::default();
        let mut state = power_state();
        let owner_ctx = ctx(owner(), Coins::ZERO);

        let window = process(&mut state, &owner_ctx, &change_data_request(coins("0.2"), 0, 200, 100, -1), &config);
        assert_eq!(window.exit_code(), exit_codes::INVALID_TIME_WINDOW);

        state.last_index = 1;
        let cap = process(&mut state, &owner_ctx, &change_data_request(coins("0.2"), 0, 0, 0, 0), &config);
        assert_eq!(cap.exit_code(), exit_codes::SUPPLY_CAP);

        let admin_try = process(&mut state, &ctx(admin(), Coins::ZERO), &change_data_request(coins("0.3"), 0, 0, 0, -1), &config);
        assert_eq!(admin_try.exit_code(), exit_codes::ACCESS_DENIED);

        state.price = coins("0.1");
        let floor = process(&mut state, &owner_ctx, &change_data_request(coins("0.15"), 0, 0, 0, -1), &config);
        assert_eq!(floor.exit_code(), exit_codes::PRICE_DECREASED);
        assert!(matches!(
            floor.error(),
            Some(CollectionError::Validation(ValidationError::PriceBelowMinimum { .. }))
        ));
    }

    #[test]
    fn test_withdraw_pays_caller_and_keeps_reserve() {
        let mut state = power_state();
        let config = ProcessorConfig::default();
        let mut admin_ctx = ctx(admin(), coins("0.01"));
        admin_ctx.balance = coins("1.01");
        let request = Request::new(0, RequestBody::Withdraw { referral: None });

        let t = process(&mut state, &admin_ctx, &request, &config);
        assert!(t.is_accepted());
        assert_eq!(sent_to(&t, admin()), coins("1.005"));

        let stranger = process(&mut state, &ctx(buyer(), coins("1")), &request, &config);
        assert_eq!(stranger.exit_code(), exit_codes::ACCESS_DENIED);
        assert_eq!(stranger.messages[0].kind, MessageKind::Refund);
    }

    #[test]
    fn test_withdraw_with_nothing_spendable() {
        let mut state = power_state();
        let t = process(
            &mut state,
            &ctx(owner(), coins("0.001")),
            &Request::new(0, RequestBody::Withdraw { referral: None }),
            &ProcessorConfig::default(),
        );
        assert!(t.is_accepted());
        assert!(t.messages.is_empty());
    }

    #[test]
    fn test_genesis_referral_split() {
        let mut state = power_state();
        let config = ProcessorConfig::default();
        let mut genesis = ctx(owner(), coins("0.3"));
        genesis.genesis = true;
        let referral = addr(8);
        let request = Request::new(
            0,
            RequestBody::Withdraw {
                referral: Some(ReferralPayout {
                    address: referral,
                    commission: coins("0.2"),
                }),
            },
        );
        let t = process(&mut state, &genesis, &request, &config);
        assert!(t.is_accepted());
        assert_eq!(sent_to(&t, referral), coins("0.2"));
        assert_eq!(sent_to(&t, commission_wallet()), coins("0.095"));
    }

    #[test]
    fn test_genesis_referral_zero_takes_everything() {
        let mut state = power_state();
        let mut genesis = ctx(owner(), coins("0.3"));
        genesis.genesis = true;
        let referral = addr(8);
        let request = Request::new(
            0,
            RequestBody::Withdraw {
                referral: Some(ReferralPayout {
                    address: referral,
                    commission: Coins::ZERO,
                }),
            },
        );
        let t = process(&mut state, &genesis, &request, &ProcessorConfig::default());
        assert_eq!(t.messages.len(), 1);
        assert_eq!(sent_to(&t, referral), coins("0.295"));
    }

    #[test]
    fn test_genesis_without_referral_pays_commission_wallet() {
        let mut state = power_state();
        let mut genesis = ctx(owner(), coins("0.3"));
        genesis.genesis = true;
        let t = process(
            &mut state,
            &genesis,
            &Request::new(0, RequestBody::Withdraw { referral: None }),
            &ProcessorConfig::default(),
        );
        assert_eq!(sent_to(&t, commission_wallet()), coins("0.295"));
        assert_eq!(sent_to(&t, owner()), Coins::ZERO);
    }

    #[test]
    fn test_genesis_referral_larger_than_balance() {
        let mut state = power_state();
        let mut genesis = ctx(owner(), coins("0.1"));
        genesis.genesis = true;
        let request = Request::new(
            0,
            RequestBody::Withdraw {
                referral: Some(ReferralPayout {
                    address: addr(8),
                    commission: coins("0.2"),
                }),
            },
        );
        let t = process(&mut state, &genesis, &request, &ProcessorConfig::default());
        assert_eq!(t.exit_code(), exit_codes::INSUFFICIENT_FUNDS);
    }

    #[test]
    fn test_fix_mint_does_not_advance_index() {
        let mut state = power_state();
        let config = ProcessorConfig::default();
        let mut owner_ctx = ctx(owner(), coins("0.05"));
        owner_ctx.balance = coins("1");
        let request = Request::new(
            0,
            RequestBody::FixMint {
                index: 7,
                owner: buyer(),
            },
        );
        let t = process(&mut state, &owner_ctx, &request, &config);
        assert!(t.is_accepted());
        assert_eq!(state.last_index(), 0);
        assert_eq!(t.messages.len(), 1);
        assert_eq!(
            t.messages[0].destination,
            derive_item_address(state.item_code(), 7, &collection()).unwrap()
        );

        let again = process(&mut state, &owner_ctx, &request, &config);
        assert_eq!(again.messages[0].destination, t.messages[0].destination);

        let denied = process(&mut state, &ctx(buyer(), coins("1")), &request, &config);
        assert_eq!(denied.exit_code(), exit_codes::ACCESS_DENIED);
    }

    #[test]
    fn test_fix_mint_needs_balance() {
        let mut state = power_state();
        let t = process(
            &mut state,
            &ctx(admin(), coins("0.01")),
            &Request::new(0, RequestBody::FixMint { index: 0, owner: buyer() }),
            &ProcessorConfig::default(),
        );
        assert_eq!(t.exit_code(), exit_codes::INSUFFICIENT_FUNDS);
    }

    #[test]
    fn test_change_commission_and_content_admin_only() {
        let mut state = power_state();
        let content = CollectionContent::power(b"new.json", b"https://new/").unwrap();
        let request = Request::new(
            0,
            RequestBody::ChangeCommissionAndContent {
                commission: coins("0.3"),
                content: content.clone(),
            },
        );
        let config = ProcessorConfig::default();

        let denied = process(&mut state, &ctx(owner(), Coins::ZERO), &request, &config);
        assert_eq!(denied.exit_code(), exit_codes::ACCESS_DENIED);
        assert_eq!(state.commission(), coins("0.1"));

        assert!(process(&mut state, &ctx(admin(), Coins::ZERO), &request, &config).is_accepted());
        assert_eq!(state.commission(), coins("0.3"));
        assert_eq!(state.content(), &content);
    }

    #[test]
    fn test_rejection_without_value_sends_nothing() {
        let mut state = power_state();
        let t = process(
            &mut state,
            &ctx(buyer(), coins("0.005")),
            &buy_request(1),
            &ProcessorConfig::default(),
        );
        assert!(!t.is_accepted());
        assert!(t.messages.is_empty());
    }

    #[test]
    fn test_change_data_rejects_addr_none_owner() {
        let mut state = power_state();
        let before = state.clone();
        let mut request = change_data_request(coins("2"), 10, 0, 0, -1);
        if let RequestBody::ChangeData(params) = &mut request.body {
            params.owner = MsgAddress::None;
        }
        let t = process(&mut state, &ctx(owner(), Coins::ZERO), &request, &ProcessorConfig::default());
        assert_eq!(
            t.error(),
            Some(&CollectionError::Validation(ValidationError::MissingAddress { field: "owner" }))
        );
        assert_eq!(t.exit_code(), exit_codes::MISSING_ADDRESS);
        assert_eq!(state, before);
    }

    #[test]
    fn test_rejection_with_long_reason_still_refunds() {
        let reason = CollectionError::Invariant("violation; ".repeat(400));
        let t = reject(&ctx(buyer(), coins("1")), reason, &ProcessorConfig::default());
        assert_eq!(t.exit_code(), exit_codes::INTERNAL);
        assert_eq!(t.messages.len(), 1);
        assert_eq!(t.messages[0].destination, buyer());
        assert_eq!(t.messages[0].value, coins("0.99"));
        assert!(parse_text_comment(&t.messages[0].body).unwrap().len() > 4_000);
    }
}

//! # Domain Invariants
//!
//! Properties every transition must preserve. The service checks them
//! before committing a new state; a violation turns the transition into a
//! rejection.
//!
//! | Invariant | Check |
//! |-----------|-------|
//! | Rejections are inert | [`check_rejection_invariant`] |
//! | `lastIndex` advances only by purchases | [`check_index_invariant`] |
//! | Supply cap holds | [`check_supply_invariant`] |
//! | Sale window is well formed | [`check_window_invariant`] |
//! | Price and buyer limit never decrease | [`check_monotonic_invariant`] |
//! | No value is created | [`check_value_invariant`] |

use crate::domain::messages::{total_value, MessageKind};
use crate::domain::processor::{InboundContext, Transition};
use crate::domain::request::{Request, RequestBody};
use crate::domain::state::CollectionState;
use crate::domain::value_objects::SaleWindow;
use shared_cells::Coins;
use std::fmt;

// =============================================================================
// INVARIANT CHECKS
// =============================================================================

/// A rejected request leaves the state untouched and emits at most a refund.
#[must_use]
pub fn check_rejection_invariant(
    before: &CollectionState,
    after: &CollectionState,
    transition: &Transition,
) -> bool {
    if transition.is_accepted() {
        return true;
    }
    before == after
        && transition
            .messages
            .iter()
            .all(|msg| msg.kind == MessageKind::Refund)
}

/// `lastIndex` grows by exactly the purchased quantity, and only on Buy.
#[must_use]
pub fn check_index_invariant(
    before: &CollectionState,
    after: &CollectionState,
    request: &Request,
    transition: &Transition,
) -> bool {
    let expected = match (&request.body, transition.is_accepted()) {
        (RequestBody::Buy { quantity }, true) => before.last_index.checked_add(*quantity),
        _ => Some(before.last_index),
    };
    expected == Some(after.last_index)
}

/// `available == -1 OR lastIndex <= available`.
#[must_use]
pub fn check_supply_invariant(state: &CollectionState) -> bool {
    state.supply_cap.admits(state.last_index)
}

/// Window is `(0, 0)` or ordered.
#[must_use]
pub fn check_window_invariant(state: &CollectionState) -> bool {
    let window = state.sale_window;
    SaleWindow::new(window.start(), window.end()).is_ok()
}

/// Price and buyer limit never decrease.
#[must_use]
pub fn check_monotonic_invariant(before: &CollectionState, after: &CollectionState) -> bool {
    after.price >= before.price && after.buyer_limit >= before.buyer_limit
}

/// Outbound value never exceeds the balance.
#[must_use]
pub fn check_value_invariant(ctx: &InboundContext, transition: &Transition) -> bool {
    total_value(&transition.messages) <= ctx.balance
}

/// Check all invariants at once.
#[must_use]
pub fn check_all_invariants(
    before: &CollectionState,
    after: &CollectionState,
    ctx: &InboundContext,
    request: &Request,
    transition: &Transition,
) -> InvariantCheckResult {
    let mut violations = Vec::new();

    if !check_rejection_invariant(before, after, transition) {
        violations.push(InvariantViolation::RejectionMutatedState);
    }
    if !check_index_invariant(before, after, request, transition) {
        violations.push(InvariantViolation::IndexJump {
            before: before.last_index,
            after: after.last_index,
        });
    }
    if !check_supply_invariant(after) {
        violations.push(InvariantViolation::SupplyExceeded {
            last_index: after.last_index,
            available: after.supply_cap.value(),
        });
    }
    if !check_window_invariant(after) {
        violations.push(InvariantViolation::MalformedWindow {
            start: after.sale_window.start(),
            end: after.sale_window.end(),
        });
    }
    if !check_monotonic_invariant(before, after) {
        violations.push(InvariantViolation::ParameterDecreased);
    }
    if !check_value_invariant(ctx, transition) {
        violations.push(InvariantViolation::ValueCreated {
            sent: total_value(&transition.messages),
            balance: ctx.balance,
        });
    }

    InvariantCheckResult { violations }
}

// =============================================================================
// RESULT TYPES
// =============================================================================

/// Result of checking all invariants.
#[derive(Clone, Debug, Default)]
pub struct InvariantCheckResult {
    /// List of violations (empty if all passed).
    pub violations: Vec<InvariantViolation>,
}

impl InvariantCheckResult {
    /// Returns true if all invariants passed.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A violated invariant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    /// A rejected request changed state or sent non-refund messages.
    RejectionMutatedState,
    /// `lastIndex` moved by something other than a purchase.
    IndexJump {
        /// Before the transition.
        before: u32,
        /// After the transition.
        after: u32,
    },
    /// `lastIndex` above the cap.
    SupplyExceeded {
        /// Next index.
        last_index: u32,
        /// Cap.
        available: i8,
    },
    /// Window neither `(0, 0)` nor ordered.
    MalformedWindow {
        /// Start.
        start: u32,
        /// End.
        end: u32,
    },
    /// Price or buyer limit went down.
    ParameterDecreased,
    /// Messages carry more than the balance.
    ValueCreated {
        /// Total outbound value.
        sent: Coins,
        /// Balance before sending.
        balance: Coins,
    },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RejectionMutatedState => write!(f, "rejected request mutated state"),
            Self::IndexJump { before, after } => {
                write!(f, "lastIndex moved from {before} to {after}")
            }
            Self::SupplyExceeded {
                last_index,
                available,
            } => write!(f, "lastIndex {last_index} exceeds cap {available}"),
            Self::MalformedWindow { start, end } => {
                write!(f, "malformed sale window [{start}, {end}]")
            }
            Self::ParameterDecreased => write!(f, "price or buyer limit decreased"),
            Self::ValueCreated { sent, balance } => {
                write!(f, "sent {sent} with a balance of {balance}")
            }
        }
    }
}

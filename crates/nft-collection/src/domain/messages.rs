//! # Outbound Messages
//!
//! Value transfers and item deployments emitted by an accepted or rejected
//! request. The ledger delivers them after the transition commits.

use serde::Serialize;
use shared_cells::{text_comment, Cell, CellResult, Coins, MsgAddress, StateInit};
use std::sync::Arc;

/// Why a message was sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum MessageKind {
    /// Deploys (or re-initialises) the item at this index.
    ItemDeploy {
        /// Item index.
        index: u32,
    },
    /// Commission for a purchase.
    Commission,
    /// Net sale proceeds to the owner.
    Proceeds,
    /// One-off payout to a referrer.
    Referral,
    /// Balance withdrawal or genesis remainder.
    Withdrawal,
    /// Refund of a rejected request.
    Refund,
}

/// A message the account asks the ledger to deliver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Recipient.
    pub destination: MsgAddress,
    /// Value carried.
    pub value: Coins,
    /// Message body.
    pub body: Arc<Cell>,
    /// Code and data for a recipient that does not exist yet.
    pub state_init: Option<StateInit>,
    /// Purpose of the message.
    pub kind: MessageKind,
}

impl OutboundMessage {
    /// Plain transfer carrying a text comment.
    pub fn transfer(
        destination: MsgAddress,
        value: Coins,
        comment: &str,
        kind: MessageKind,
    ) -> CellResult<Self> {
        Ok(Self {
            destination,
            value,
            body: Arc::new(text_comment(comment)?),
            state_init: None,
            kind,
        })
    }

    /// Refund of a rejected request.
    ///
    /// Never fails: a comment that does not encode leaves the body empty and
    /// the value still goes back to the sender.
    #[must_use]
    pub fn refund(destination: MsgAddress, value: Coins, comment: &str) -> Self {
        let body = text_comment(comment).unwrap_or_else(|_| Cell::empty());
        Self {
            destination,
            value,
            body: Arc::new(body),
            state_init: None,
            kind: MessageKind::Refund,
        }
    }

    /// True if the message deploys an account.
    #[must_use]
    pub fn is_deploy(&self) -> bool {
        self.state_init.is_some()
    }
}

/// Total value carried by `messages`, saturating at [`Coins::MAX`].
#[must_use]
pub fn total_value(messages: &[OutboundMessage]) -> Coins {
    messages.iter().fold(Coins::ZERO, |sum, msg| {
        sum.checked_add(msg.value).unwrap_or(Coins::MAX)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_cells::parse_text_comment;

    #[test]
    fn test_transfer_carries_comment() {
        let to = MsgAddress::std(0, [7; 32]);
        let msg = OutboundMessage::transfer(to, Coins::from_coins(1), "Withdrawal", MessageKind::Withdrawal)
            .unwrap();
        assert_eq!(parse_text_comment(&msg.body).unwrap(), "Withdrawal");
        assert!(!msg.is_deploy());
    }

    #[test]
    fn test_refund_keeps_long_comment() {
        let to = MsgAddress::std(0, [7; 32]);
        let comment = "x".repeat(5_000);
        let msg = OutboundMessage::refund(to, Coins::from_nano(990), &comment);
        assert_eq!(msg.kind, MessageKind::Refund);
        assert_eq!(msg.value, Coins::from_nano(990));
        assert_eq!(parse_text_comment(&msg.body).unwrap(), comment);
    }

    #[test]
    fn test_total_value() {
        let to = MsgAddress::std(0, [7; 32]);
        let a = OutboundMessage::transfer(to, Coins::from_nano(5), "a", MessageKind::Proceeds).unwrap();
        let b = OutboundMessage::transfer(to, Coins::from_nano(7), "b", MessageKind::Commission).unwrap();
        assert_eq!(total_value(&[a, b]), Coins::from_nano(12));
        assert_eq!(total_value(&[]), Coins::ZERO);
    }
}

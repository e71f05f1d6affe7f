//! # Value Objects
//!
//! Small immutable types with their own validation rules.

use crate::errors::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// COLLECTION VARIANT
// =============================================================================

/// Persisted layout family of a collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionVariant {
    /// Commission goes to the admin; content carries an item-individual node.
    Standard,
    /// Commission goes to a dedicated address; two-node content.
    Power,
}

impl CollectionVariant {
    /// Number of child nodes in the content record.
    #[must_use]
    pub const fn content_refs(self) -> usize {
        match self {
            Self::Standard => 3,
            Self::Power => 2,
        }
    }

    /// True if the role record stores a commission address.
    #[must_use]
    pub const fn has_commission_address(self) -> bool {
        matches!(self, Self::Power)
    }
}

impl fmt::Display for CollectionVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => f.write_str("standard"),
            Self::Power => f.write_str("power"),
        }
    }
}

// =============================================================================
// SUPPLY CAP
// =============================================================================

/// Absolute item cap stored as a 2-bit signed integer.
///
/// `-1` means unlimited. Any other value is the highest `lastIndex` the
/// collection may reach.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub struct SupplyCap(i8);

impl SupplyCap {
    /// Encoded width.
    pub const BITS: usize = 2;
    /// Smallest encodable cap.
    pub const MIN: i8 = -2;
    /// Largest encodable cap.
    pub const MAX: i8 = 1;
    /// No cap.
    pub const UNLIMITED: Self = Self(-1);

    /// Creates a cap, rejecting values outside the 2-bit range.
    pub fn new(value: i8) -> Result<Self, String> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(format!(
                "available {value} is outside {}..={}",
                Self::MIN,
                Self::MAX
            ))
        }
    }

    /// Raw value.
    #[must_use]
    pub const fn value(self) -> i8 {
        self.0
    }

    /// True for the unlimited sentinel.
    #[must_use]
    pub const fn is_unlimited(self) -> bool {
        self.0 == -1
    }

    /// True if `last_index` is within the cap.
    #[must_use]
    pub fn admits(self, last_index: u32) -> bool {
        self.is_unlimited() || i64::from(last_index) <= i64::from(self.0)
    }

    /// Checks that minting `quantity` more items from `last_index` stays
    /// within the cap.
    pub fn check_mint(self, last_index: u32, quantity: u32) -> Result<(), ValidationError> {
        let fits = match last_index.checked_add(quantity) {
            Some(next) => self.admits(next),
            None => false,
        };
        if fits {
            Ok(())
        } else {
            Err(ValidationError::SupplyCap {
                last_index,
                quantity,
                available: self.0,
            })
        }
    }
}

impl Default for SupplyCap {
    fn default() -> Self {
        Self::UNLIMITED
    }
}

impl TryFrom<i8> for SupplyCap {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SupplyCap> for i8 {
    fn from(cap: SupplyCap) -> Self {
        cap.0
    }
}

impl fmt::Display for SupplyCap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unlimited() {
            f.write_str("unlimited")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

// =============================================================================
// SALE WINDOW
// =============================================================================

/// Unix-seconds interval during which purchases are accepted.
///
/// `(0, 0)` leaves sales unrestricted; otherwise `start < end` and both
/// bounds are inclusive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SaleWindow {
    start: u32,
    end: u32,
}

impl SaleWindow {
    /// Always open.
    pub const UNRESTRICTED: Self = Self { start: 0, end: 0 };

    /// Creates a window after checking its bounds.
    pub fn new(start: u32, end: u32) -> Result<Self, ValidationError> {
        let window = Self { start, end };
        if window.is_unrestricted() || start < end {
            Ok(window)
        } else {
            Err(ValidationError::InvalidTimeWindow { start, end })
        }
    }

    /// Window start.
    #[must_use]
    pub const fn start(self) -> u32 {
        self.start
    }

    /// Window end.
    #[must_use]
    pub const fn end(self) -> u32 {
        self.end
    }

    /// True for `(0, 0)`.
    #[must_use]
    pub const fn is_unrestricted(self) -> bool {
        self.start == 0 && self.end == 0
    }

    /// True if a purchase at `now` is allowed.
    #[must_use]
    pub const fn contains(self, now: u32) -> bool {
        self.is_unrestricted() || (self.start <= now && now <= self.end)
    }

    /// Checks a purchase time against the window.
    pub fn check(self, now: u32) -> Result<(), ValidationError> {
        if self.contains(now) {
            Ok(())
        } else {
            Err(ValidationError::TimeWindow {
                now,
                start: self.start,
                end: self.end,
            })
        }
    }
}

// =============================================================================
// ROLES
// =============================================================================

/// Privilege level of a message sender relative to one collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Receives proceeds, changes sale parameters.
    Owner,
    /// Changes commission and content.
    Admin,
    /// Neither owner nor admin.
    Public,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supply_cap_range() {
        assert!(SupplyCap::new(-2).is_ok());
        assert!(SupplyCap::new(1).is_ok());
        assert!(SupplyCap::new(2).is_err());
        assert!(SupplyCap::new(-3).is_err());
        assert_eq!(SupplyCap::default(), SupplyCap::UNLIMITED);
    }

    #[test]
    fn test_supply_cap_mint_check() {
        let one = SupplyCap::new(1).unwrap();
        assert!(one.check_mint(0, 1).is_ok());
        assert!(matches!(
            one.check_mint(1, 1),
            Err(ValidationError::SupplyCap { available: 1, .. })
        ));
        assert!(SupplyCap::new(0).unwrap().check_mint(0, 1).is_err());
        assert!(SupplyCap::UNLIMITED.check_mint(1_000_000, 250).is_ok());
        assert!(SupplyCap::UNLIMITED.check_mint(u32::MAX, 1).is_err());
    }

    #[test]
    fn test_sale_window_bounds() {
        assert!(SaleWindow::new(0, 0).is_ok());
        assert!(SaleWindow::new(100, 200).is_ok());
        assert_eq!(
            SaleWindow::new(200, 100),
            Err(ValidationError::InvalidTimeWindow {
                start: 200,
                end: 100
            })
        );
        assert!(SaleWindow::new(100, 100).is_err());
        assert!(SaleWindow::new(0, 100).is_ok());
    }

    #[test]
    fn test_sale_window_inclusive() {
        let window = SaleWindow::new(100, 200).unwrap();
        assert!(!window.contains(99));
        assert!(window.contains(100));
        assert!(window.contains(200));
        assert!(!window.contains(201));
        assert!(SaleWindow::UNRESTRICTED.contains(u32::MAX));
        assert!(window.check(250).is_err());
    }

    #[test]
    fn test_supply_cap_serde() {
        let json = serde_json::to_string(&SupplyCap::UNLIMITED).unwrap();
        assert_eq!(json, "-1");
        assert!(serde_json::from_str::<SupplyCap>("5").is_err());
    }
}

//! # Configuration
//!
//! Two configuration records:
//!
//! | Type | Scope | Source |
//! |------|-------|--------|
//! | [`ProcessorConfig`] | economics shared by every request | defaults, `NC_*` env vars, JSON |
//! | [`GenesisConfig`] | initial state of one collection | [`GenesisConfigBuilder`] |
//!
//! ## Processor Defaults
//!
//! | Setting | Default | Env var |
//! |---------|---------|---------|
//! | `gas_reserve` | 0.05 | `NC_GAS_RESERVE` |
//! | `item_forward_amount` | 0.02 | `NC_ITEM_FORWARD_AMOUNT` |
//! | `storage_reserve` | 0.005 | `NC_STORAGE_RESERVE` |
//! | `bounce_fee` | 0.01 | `NC_BOUNCE_FEE` |
//! | `min_price` | 0.2 | `NC_MIN_PRICE` |
//! | `max_items_per_buy` | 250 | `NC_MAX_ITEMS_PER_BUY` |

use crate::domain::state::{CollectionContent, Roles};
use crate::domain::value_objects::{CollectionVariant, SaleWindow, SupplyCap};
use crate::errors::{CollectionError, CollectionResult, ValidationError};
use serde::{Deserialize, Serialize};
use shared_cells::{Cell, Coins, MsgAddress};
use std::env;
use std::sync::Arc;

/// Outbound messages one transaction may emit, minus commission and proceeds.
pub const MAX_ITEMS_PER_BUY_LIMIT: u32 = 253;

// =============================================================================
// PROCESSOR CONFIG
// =============================================================================

/// Amounts and limits applied by the request processor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Kept from every purchase to pay for processing.
    pub gas_reserve: Coins,
    /// Value carried by each item deployment.
    pub item_forward_amount: Coins,
    /// Balance never paid out, covering storage rent.
    pub storage_reserve: Coins,
    /// Withheld from refunds of rejected requests.
    pub bounce_fee: Coins,
    /// Lowest price the genesis record or a configuration change may set.
    pub min_price: Coins,
    /// Most items one purchase may mint.
    pub max_items_per_buy: u32,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            gas_reserve: Coins::from_nano(50_000_000),
            item_forward_amount: Coins::from_nano(20_000_000),
            storage_reserve: Coins::from_nano(5_000_000),
            bounce_fee: Coins::from_nano(10_000_000),
            min_price: Coins::from_nano(200_000_000),
            max_items_per_buy: 250,
        }
    }
}

impl ProcessorConfig {
    /// Create configuration from environment variables.
    ///
    /// Amounts are decimal coin strings (`"0.05"`). Unset or unparsable
    /// variables fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let coins = |name: &str, default: Coins| {
            env::var(name)
                .ok()
                .and_then(|v| v.trim().parse::<Coins>().ok())
                .unwrap_or(default)
        };

        Self {
            gas_reserve: coins("NC_GAS_RESERVE", defaults.gas_reserve),
            item_forward_amount: coins("NC_ITEM_FORWARD_AMOUNT", defaults.item_forward_amount),
            storage_reserve: coins("NC_STORAGE_RESERVE", defaults.storage_reserve),
            bounce_fee: coins("NC_BOUNCE_FEE", defaults.bounce_fee),
            min_price: coins("NC_MIN_PRICE", defaults.min_price),
            max_items_per_buy: env::var("NC_MAX_ITEMS_PER_BUY")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.max_items_per_buy),
        }
    }

    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(json: &str) -> CollectionResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| CollectionError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate limits.
    pub fn validate(&self) -> CollectionResult<()> {
        if self.max_items_per_buy == 0 || self.max_items_per_buy > MAX_ITEMS_PER_BUY_LIMIT {
            return Err(CollectionError::Config(format!(
                "max_items_per_buy must be in 1..={MAX_ITEMS_PER_BUY_LIMIT}, got {}",
                self.max_items_per_buy
            )));
        }
        if self.item_forward_amount.is_zero() {
            return Err(CollectionError::Config(
                "item_forward_amount cannot be 0".to_string(),
            ));
        }
        if self.gas_reserve.is_zero() {
            return Err(CollectionError::Config(
                "gas_reserve cannot be 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Builder-style method to set the gas reserve
    #[must_use]
    pub fn with_gas_reserve(mut self, amount: Coins) -> Self {
        self.gas_reserve = amount;
        self
    }

    /// Builder-style method to set the per-item forward amount
    #[must_use]
    pub fn with_item_forward_amount(mut self, amount: Coins) -> Self {
        self.item_forward_amount = amount;
        self
    }

    /// Builder-style method to set the storage reserve
    #[must_use]
    pub fn with_storage_reserve(mut self, amount: Coins) -> Self {
        self.storage_reserve = amount;
        self
    }

    /// Builder-style method to set the bounce fee
    #[must_use]
    pub fn with_bounce_fee(mut self, amount: Coins) -> Self {
        self.bounce_fee = amount;
        self
    }

    /// Builder-style method to set the price floor
    #[must_use]
    pub fn with_min_price(mut self, amount: Coins) -> Self {
        self.min_price = amount;
        self
    }

    /// Builder-style method to set the per-purchase item ceiling
    #[must_use]
    pub fn with_max_items_per_buy(mut self, max: u32) -> Self {
        self.max_items_per_buy = max;
        self
    }
}

// =============================================================================
// GENESIS CONFIG
// =============================================================================

/// Initial values of a collection's persisted state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenesisConfig {
    /// Layout variant.
    pub variant: CollectionVariant,
    /// Owner, admin and (power only) commission address.
    pub roles: Roles,
    /// Supply cap, -1 for unlimited.
    pub available: i8,
    /// Per-item price.
    pub price: Coins,
    /// First index to mint.
    pub last_index: u32,
    /// Per-request ceiling, 0 for none.
    pub buyer_limit: u32,
    /// Sale window start.
    pub start_time: u32,
    /// Sale window end.
    pub end_time: u32,
    /// Per-item commission.
    pub commission: Coins,
    /// Content nodes.
    pub content: CollectionContent,
    /// Item template code.
    pub item_code: Arc<Cell>,
}

impl GenesisConfig {
    /// Starts a builder for `variant`.
    #[must_use]
    pub fn builder(variant: CollectionVariant) -> GenesisConfigBuilder {
        GenesisConfigBuilder::new(variant)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> CollectionResult<()> {
        if self.roles.owner.is_none() || self.roles.admin.is_none() {
            return Err(CollectionError::Config(
                "owner and admin addresses are required".to_string(),
            ));
        }
        let needs_commission = self.variant.has_commission_address();
        match self.roles.commission {
            Some(addr) if needs_commission && addr.is_none() => {
                return Err(CollectionError::Config(
                    "commission address cannot be addr_none".to_string(),
                ));
            }
            Some(_) if !needs_commission => {
                return Err(CollectionError::Config(format!(
                    "{} collections have no commission address",
                    self.variant
                )));
            }
            None if needs_commission => {
                return Err(CollectionError::Config(format!(
                    "{} collections need a commission address",
                    self.variant
                )));
            }
            _ => {}
        }
        if self.content.variant() != self.variant {
            return Err(CollectionError::Config(format!(
                "content is shaped for a {} collection, expected {}",
                self.content.variant(),
                self.variant
            )));
        }

        let cap = SupplyCap::new(self.available).map_err(CollectionError::Config)?;
        SaleWindow::new(self.start_time, self.end_time)?;
        if !cap.admits(self.last_index) {
            return Err(ValidationError::SupplyCap {
                last_index: self.last_index,
                quantity: 0,
                available: self.available,
            }
            .into());
        }
        Ok(())
    }
}

/// Builder for [`GenesisConfig`] with validation.
///
/// Owner, admin, content and item code are required; everything else
/// defaults to an open, uncapped sale at the default price floor.
#[derive(Debug)]
pub struct GenesisConfigBuilder {
    variant: CollectionVariant,
    owner: Option<MsgAddress>,
    admin: Option<MsgAddress>,
    commission_address: Option<MsgAddress>,
    available: i8,
    price: Coins,
    last_index: u32,
    buyer_limit: u32,
    start_time: u32,
    end_time: u32,
    commission: Coins,
    content: Option<CollectionContent>,
    item_code: Option<Arc<Cell>>,
}

impl GenesisConfigBuilder {
    /// Create a builder with default values
    #[must_use]
    pub fn new(variant: CollectionVariant) -> Self {
        Self {
            variant,
            owner: None,
            admin: None,
            commission_address: None,
            available: SupplyCap::UNLIMITED.value(),
            price: ProcessorConfig::default().min_price,
            last_index: 0,
            buyer_limit: 0,
            start_time: 0,
            end_time: 0,
            commission: Coins::ZERO,
            content: None,
            item_code: None,
        }
    }

    /// Set the owner
    #[must_use]
    pub fn owner(mut self, owner: MsgAddress) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Set the admin
    #[must_use]
    pub fn admin(mut self, admin: MsgAddress) -> Self {
        self.admin = Some(admin);
        self
    }

    /// Set the commission address (power collections)
    #[must_use]
    pub fn commission_address(mut self, address: MsgAddress) -> Self {
        self.commission_address = Some(address);
        self
    }

    /// Set the supply cap (-1 for unlimited)
    #[must_use]
    pub fn available(mut self, available: i8) -> Self {
        self.available = available;
        self
    }

    /// Set the per-item price
    #[must_use]
    pub fn price(mut self, price: Coins) -> Self {
        self.price = price;
        self
    }

    /// Set the first index to mint
    #[must_use]
    pub fn last_index(mut self, index: u32) -> Self {
        self.last_index = index;
        self
    }

    /// Set the per-request ceiling (0 for none)
    #[must_use]
    pub fn buyer_limit(mut self, limit: u32) -> Self {
        self.buyer_limit = limit;
        self
    }

    /// Set the sale window (0, 0 for unrestricted)
    #[must_use]
    pub fn sale_window(mut self, start: u32, end: u32) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    /// Set the per-item commission
    #[must_use]
    pub fn commission(mut self, commission: Coins) -> Self {
        self.commission = commission;
        self
    }

    /// Set the content nodes
    #[must_use]
    pub fn content(mut self, content: CollectionContent) -> Self {
        self.content = Some(content);
        self
    }

    /// Set the item template code
    #[must_use]
    pub fn item_code(mut self, code: Arc<Cell>) -> Self {
        self.item_code = Some(code);
        self
    }

    /// Build the configuration, validating all parameters
    pub fn build(self) -> CollectionResult<GenesisConfig> {
        let missing = |field: &str| CollectionError::Config(format!("{field} is required"));
        let config = GenesisConfig {
            variant: self.variant,
            roles: Roles {
                owner: self.owner.ok_or_else(|| missing("owner"))?,
                admin: self.admin.ok_or_else(|| missing("admin"))?,
                commission: self.commission_address,
            },
            available: self.available,
            price: self.price,
            last_index: self.last_index,
            buyer_limit: self.buyer_limit,
            start_time: self.start_time,
            end_time: self.end_time,
            commission: self.commission,
            content: self.content.ok_or_else(|| missing("content"))?,
            item_code: self.item_code.ok_or_else(|| missing("item_code"))?,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> MsgAddress {
        MsgAddress::std(0, [byte; 32])
    }

    fn power_builder() -> GenesisConfigBuilder {
        GenesisConfig::builder(CollectionVariant::Power)
            .owner(addr(1))
            .admin(addr(2))
            .commission_address(addr(3))
            .content(CollectionContent::power(b"c.json", b"https://i/").unwrap())
            .item_code(Arc::new(Cell::empty()))
    }

    #[test]
    fn test_default_config() {
        let config = ProcessorConfig::default();
        assert_eq!(config.gas_reserve.to_string(), "0.05");
        assert_eq!(config.item_forward_amount.to_string(), "0.02");
        assert_eq!(config.min_price.to_string(), "0.2");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_setters() {
        let config = ProcessorConfig::default()
            .with_bounce_fee(Coins::ZERO)
            .with_max_items_per_buy(10);
        assert!(config.bounce_fee.is_zero());
        assert_eq!(config.max_items_per_buy, 10);
    }

    #[test]
    fn test_validate_rejects_bad_limits() {
        let zero = ProcessorConfig::default().with_max_items_per_buy(0);
        assert!(zero.validate().is_err());
        let huge = ProcessorConfig::default().with_max_items_per_buy(MAX_ITEMS_PER_BUY_LIMIT + 1);
        assert!(huge.validate().is_err());
        let free_items = ProcessorConfig::default().with_item_forward_amount(Coins::ZERO);
        assert!(free_items.validate().is_err());
    }

    #[test]
    fn test_from_json_partial() {
        let config = ProcessorConfig::from_json(r#"{ "max_items_per_buy": 5 }"#).unwrap();
        assert_eq!(config.max_items_per_buy, 5);
        assert_eq!(config.gas_reserve, ProcessorConfig::default().gas_reserve);

        assert!(ProcessorConfig::from_json(r#"{ "max_items_per_buy": 0 }"#).is_err());
        assert!(ProcessorConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_genesis_builder_defaults() {
        let config = power_builder().build().unwrap();
        assert_eq!(config.available, -1);
        assert_eq!(config.last_index, 0);
        assert_eq!(config.price, ProcessorConfig::default().min_price);
    }

    #[test]
    fn test_genesis_requires_roles_and_content() {
        let err = GenesisConfig::builder(CollectionVariant::Power)
            .admin(addr(2))
            .build()
            .unwrap_err();
        assert_eq!(err, CollectionError::Config("owner is required".to_string()));
    }

    #[test]
    fn test_genesis_variant_consistency() {
        // power without a commission address
        let err = GenesisConfig::builder(CollectionVariant::Power)
            .owner(addr(1))
            .admin(addr(2))
            .content(CollectionContent::power(b"c", b"i").unwrap())
            .item_code(Arc::new(Cell::empty()))
            .build();
        assert!(err.is_err());

        // standard content on a power collection
        let err = power_builder()
            .content(CollectionContent::standard(b"c", b"i", b"x").unwrap())
            .build();
        assert!(err.is_err());
    }

    #[test]
    fn test_genesis_window_and_cap() {
        let window = power_builder().sale_window(200, 100).build().unwrap_err();
        assert!(matches!(
            window,
            CollectionError::Validation(ValidationError::InvalidTimeWindow { .. })
        ));
        let cap = power_builder().available(2).build().unwrap_err();
        assert!(matches!(cap, CollectionError::Config(_)));
        assert!(power_builder().available(1).last_index(1).build().is_ok());
        assert!(power_builder().available(0).last_index(1).build().is_err());
    }
}

//! Genesis configuration for the Dafo module.
//!
//! This module defines the initial state and configuration of the id space,
//! the token and the auction house when the chain starts.

use dafo_types::{Address, Amount, ReceiveBehavior, ROLE_COUNT};
use serde::{Deserialize, Serialize};

use crate::allocator::MAX_SUPPLY_LIMIT;
use crate::auction::AuctionParams;
use crate::registry::TraitCounts;

/// Default size of the id space.
pub const DEFAULT_MAX_SUPPLY: u64 = 10_000;

/// Genesis configuration for the Dafo module.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DafoGenesisConfig {
    /// Number of mintable ids (`1..=max_supply`)
    pub max_supply: u64,

    /// Governance authority: pauses, unpauses, reassigns the minter and
    /// receives auction proceeds
    pub owner: Address,

    /// Receives mirrored reward mints and royalties
    pub rewards_recipient: Address,

    /// Address the auction house acts under when it mints
    pub auction_house: Address,

    /// Initial minter; defaults to the auction house
    #[serde(default)]
    pub minter: Option<Address>,

    /// Mirror a reward mint every n-th mint; 0 disables it
    pub reward_period: u64,

    /// Auction timing and pricing
    #[serde(default)]
    pub auction: AuctionParams,

    /// Sizes of the external trait registries
    #[serde(default)]
    pub traits: TraitCounts,

    /// Initial native balances
    #[serde(default)]
    pub balances: Vec<(Address, Amount)>,

    /// Accounts with non-default receive logic
    #[serde(default)]
    pub receive_behaviors: Vec<(Address, ReceiveBehavior)>,
}

impl Default for DafoGenesisConfig {
    fn default() -> Self {
        Self {
            max_supply: DEFAULT_MAX_SUPPLY,
            owner: [0x0du8; 32],
            rewards_recipient: [0xdau8; 32],
            auction_house: [0xa4u8; 32],
            minter: None,
            reward_period: 1,
            auction: AuctionParams::default(),
            traits: TraitCounts::default(),
            balances: Vec::new(),
            receive_behaviors: Vec::new(),
        }
    }
}

impl DafoGenesisConfig {
    /// Minter the token starts with.
    pub fn initial_minter(&self) -> Address {
        self.minter.unwrap_or(self.auction_house)
    }

    /// Validate the genesis configuration.
    pub fn validate(&self) -> Result<(), GenesisValidationError> {
        if self.max_supply == 0 {
            return Err(GenesisValidationError::InvalidSupply(
                "Max supply cannot be zero".into(),
            ));
        }
        if self.max_supply > MAX_SUPPLY_LIMIT {
            return Err(GenesisValidationError::InvalidSupply(format!(
                "Max supply cannot exceed {MAX_SUPPLY_LIMIT}, got {}",
                self.max_supply
            )));
        }

        if self.reward_period > self.max_supply {
            return Err(GenesisValidationError::InvalidRewardPeriod {
                period: self.reward_period,
                max_supply: self.max_supply,
            });
        }

        if self.auction.duration == 0 {
            return Err(GenesisValidationError::InvalidAuctionParams(
                "Duration cannot be zero".into(),
            ));
        }
        if self.auction.min_bid_increment_percentage > 100 {
            return Err(GenesisValidationError::InvalidAuctionParams(
                "Minimum increment cannot exceed 100 percent".into(),
            ));
        }

        if self.traits.roles > ROLE_COUNT {
            return Err(GenesisValidationError::InvalidTraits(format!(
                "At most {ROLE_COUNT} roles exist, got {}",
                self.traits.roles
            )));
        }

        let mut total: Amount = 0;
        for (_, amount) in &self.balances {
            total = total
                .checked_add(*amount)
                .ok_or(GenesisValidationError::BalanceOverflow)?;
        }

        Ok(())
    }
}

/// Errors that can occur during genesis validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenesisValidationError {
    #[error("Invalid supply: {0}")]
    InvalidSupply(String),

    #[error("Reward period {period} exceeds max supply {max_supply}")]
    InvalidRewardPeriod { period: u64, max_supply: u64 },

    #[error("Invalid auction parameters: {0}")]
    InvalidAuctionParams(String),

    #[error("Invalid trait registry: {0}")]
    InvalidTraits(String),

    #[error("Initial balances overflow the native supply")]
    BalanceOverflow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DafoGenesisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.initial_minter(), config.auction_house);
    }

    #[test]
    fn test_zero_supply() {
        let config = DafoGenesisConfig {
            max_supply: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(GenesisValidationError::InvalidSupply(_))
        ));
    }

    #[test]
    fn test_supply_limit() {
        let at_limit = DafoGenesisConfig {
            max_supply: MAX_SUPPLY_LIMIT,
            ..Default::default()
        };
        assert!(at_limit.validate().is_ok());

        for max_supply in [MAX_SUPPLY_LIMIT + 1, u32::MAX as u64, u64::MAX] {
            let config = DafoGenesisConfig {
                max_supply,
                ..Default::default()
            };
            assert!(matches!(
                config.validate(),
                Err(GenesisValidationError::InvalidSupply(_))
            ));
        }
    }

    #[test]
    fn test_reward_period_exceeds_supply() {
        let config = DafoGenesisConfig {
            max_supply: 9,
            reward_period: 10,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(GenesisValidationError::InvalidRewardPeriod {
                period: 10,
                max_supply: 9
            })
        );
    }

    #[test]
    fn test_zero_duration() {
        let mut config = DafoGenesisConfig::default();
        config.auction.duration = 0;
        assert!(matches!(
            config.validate(),
            Err(GenesisValidationError::InvalidAuctionParams(_))
        ));
    }

    #[test]
    fn test_increment_over_hundred_percent() {
        let mut config = DafoGenesisConfig::default();
        config.auction.min_bid_increment_percentage = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_too_many_roles() {
        let mut config = DafoGenesisConfig::default();
        config.traits.roles = 5;
        assert!(matches!(
            config.validate(),
            Err(GenesisValidationError::InvalidTraits(_))
        ));
    }

    #[test]
    fn test_balance_overflow() {
        let config = DafoGenesisConfig {
            balances: vec![([1u8; 32], Amount::MAX), ([2u8; 32], 1)],
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(GenesisValidationError::BalanceOverflow)
        );
    }

    #[test]
    fn test_parses_minimal_json() {
        let json = serde_json::json!({
            "max_supply": 9,
            "owner": vec![1u8; 32],
            "rewards_recipient": vec![2u8; 32],
            "auction_house": vec![3u8; 32],
            "reward_period": 1,
        });

        let config: DafoGenesisConfig = serde_json::from_value(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.initial_minter(), [3u8; 32]);
        assert_eq!(config.auction, AuctionParams::default());
        assert_eq!(config.traits, TraitCounts::default());
    }
}

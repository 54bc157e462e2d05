//! The Dafo token: minting authority over the id space.
//!
//! Only the current minter can mint or burn. Every mint claims the requested
//! id through the allocator, and every `reward_period`-th mint also mirrors a
//! second id to the rewards recipient within the same call.

use std::collections::HashMap;

use dafo_types::{format_address, Address, Amount, CustomInput, DafoEvent, TokenId, GENESIS_TOKEN_ID};
use tracing::{info, warn};

use crate::allocator::IdSpace;
use crate::error::DafoError;
use crate::registry::{validate_custom_input, TraitRegistry};

/// Royalty on secondary sales, in basis points.
pub const ROYALTY_BPS: u64 = 500;

/// Ids produced by one mint call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MintReceipt {
    pub minted: CustomInput,
    pub owner: Address,
    /// Mirrored reward id, if the schedule fired and supply allowed it
    pub reward: Option<CustomInput>,
    pub rewards_recipient: Address,
}

impl MintReceipt {
    pub fn token_id(&self) -> TokenId {
        self.minted.token_id
    }

    pub fn reward_token_id(&self) -> Option<TokenId> {
        self.reward.map(|input| input.token_id)
    }

    /// One `DafoCreated` per id, requested id first.
    pub fn events(&self) -> Vec<DafoEvent> {
        let mut events = vec![DafoEvent::DafoCreated {
            token_id: self.minted.token_id,
            custom_input: self.minted,
            owner: self.owner,
        }];
        if let Some(reward) = self.reward {
            events.push(DafoEvent::DafoCreated {
                token_id: reward.token_id,
                custom_input: reward,
                owner: self.rewards_recipient,
            });
        }
        events
    }
}

#[derive(Clone, Debug)]
pub struct DafoToken {
    ids: IdSpace,
    owners: HashMap<TokenId, Address>,
    minter: Address,
    rewards_recipient: Address,
    /// Mirror every n-th mint; 0 disables the mirror
    reward_period: u64,
    /// Successful requested mints, across all callers
    mint_count: u64,
}

impl DafoToken {
    pub fn new(
        max_supply: u64,
        minter: Address,
        rewards_recipient: Address,
        reward_period: u64,
    ) -> Result<Self, DafoError> {
        Ok(Self {
            ids: IdSpace::new(max_supply)?,
            owners: HashMap::new(),
            minter,
            rewards_recipient,
            reward_period,
            mint_count: 0,
        })
    }

    pub fn ids(&self) -> &IdSpace {
        &self.ids
    }

    pub fn minter(&self) -> Address {
        self.minter
    }

    pub fn set_minter(&mut self, minter: Address) {
        self.minter = minter;
    }

    pub fn rewards_recipient(&self) -> Address {
        self.rewards_recipient
    }

    pub fn reward_period(&self) -> u64 {
        self.reward_period
    }

    pub fn mint_count(&self) -> u64 {
        self.mint_count
    }

    /// Next unclaimed id at or after `from`.
    pub fn find_next_available(&self, from: TokenId) -> Result<TokenId, DafoError> {
        self.ids.preview(from)
    }

    pub fn owner_of(&self, token_id: TokenId) -> Option<Address> {
        self.owners.get(&token_id).copied()
    }

    /// The genesis id always exists; other ids exist while they have an owner.
    pub fn exists(&self, token_id: TokenId) -> bool {
        token_id == GENESIS_TOKEN_ID || self.owners.contains_key(&token_id)
    }

    /// Live tokens, excluding the genesis sentinel.
    pub fn total_supply(&self) -> u64 {
        self.owners.len() as u64
    }

    /// Royalty receiver and amount for a sale of `token_id` at `sale_price`.
    pub fn royalty_info(
        &self,
        token_id: TokenId,
        sale_price: Amount,
    ) -> Result<(Address, Amount), DafoError> {
        if !self.owners.contains_key(&token_id) {
            return Err(DafoError::NotMinted(token_id));
        }
        let royalty = sale_price as u128 * ROYALTY_BPS as u128 / 10_000;
        Ok((self.rewards_recipient, royalty as Amount))
    }

    /// Every check `mint` performs, without writing anything.
    pub fn check_mint(
        &self,
        caller: &Address,
        input: &CustomInput,
        registry: &impl TraitRegistry,
    ) -> Result<(), DafoError> {
        if *caller != self.minter {
            return Err(DafoError::Unauthorized);
        }
        validate_custom_input(registry, input)?;
        self.ids.ensure_claimable(input.token_id)
    }

    fn mirror_due(&self) -> bool {
        self.reward_period != 0 && self.mint_count % self.reward_period == 0
    }

    /// Claim `input.token_id` for `to`, then run the reward mirror.
    pub fn mint(
        &mut self,
        caller: &Address,
        input: CustomInput,
        to: Address,
        registry: &impl TraitRegistry,
    ) -> Result<MintReceipt, DafoError> {
        self.check_mint(caller, &input, registry)?;

        self.ids.claim(input)?;
        self.owners.insert(input.token_id, to);
        self.mint_count += 1;
        info!(token_id = input.token_id, owner = %format_address(&to), "Dafo minted");

        let reward = if self.mirror_due() {
            self.mint_reward(input)
        } else {
            None
        };

        Ok(MintReceipt {
            minted: input,
            owner: to,
            reward,
            rewards_recipient: self.rewards_recipient,
        })
    }

    fn mint_reward(&mut self, source: CustomInput) -> Option<CustomInput> {
        let start = self.ids.next_after(source.token_id);
        let reward_id = match self.ids.preview(start) {
            Ok(id) => id,
            Err(err) => {
                warn!(token_id = source.token_id, %err, "Skipping reward mint");
                return None;
            }
        };

        let reward = source.with_token_id(reward_id);
        // The preview above ran against the same state, so the id is free.
        if let Err(err) = self.ids.claim(reward) {
            warn!(token_id = reward_id, %err, "Reward claim rejected");
            return None;
        }
        self.owners.insert(reward_id, self.rewards_recipient);
        info!(
            token_id = reward_id,
            mirrored_from = source.token_id,
            "Reward Dafo minted"
        );
        Some(reward)
    }

    /// Burn `token_id`. The id stays claimed and is never minted again.
    pub fn burn(&mut self, caller: &Address, token_id: TokenId) -> Result<(), DafoError> {
        if *caller != self.minter {
            return Err(DafoError::Unauthorized);
        }
        if self.owners.remove(&token_id).is_none() {
            return Err(DafoError::NotMinted(token_id));
        }
        info!(token_id, "Dafo burned");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TraitCounts;
    use dafo_types::Role;

    const MINTER: Address = [1u8; 32];
    const TREASURY: Address = [2u8; 32];
    const HOLDER: Address = [3u8; 32];

    fn token(max_supply: u64, reward_period: u64) -> DafoToken {
        DafoToken::new(max_supply, MINTER, TREASURY, reward_period).unwrap()
    }

    fn input(token_id: TokenId) -> CustomInput {
        CustomInput::new(token_id, Role::Activist, 1, false)
    }

    #[test]
    fn test_mint_with_reward_every_mint() {
        let mut token = token(9, 1);
        let receipt = token
            .mint(&MINTER, input(1), HOLDER, &TraitCounts::default())
            .unwrap();

        assert_eq!(receipt.token_id(), 1);
        assert_eq!(receipt.reward_token_id(), Some(2));
        assert_eq!(token.owner_of(1), Some(HOLDER));
        assert_eq!(token.owner_of(2), Some(TREASURY));
        assert_eq!(token.total_supply(), 2);

        let events = receipt.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].token_id(), Some(1));
        assert_eq!(events[1].actor(), Some(TREASURY));
    }

    #[test]
    fn test_reward_mirrors_traits() {
        let mut token = token(9, 1);
        let custom = CustomInput::new(4, Role::Business, 2, true);
        let receipt = token
            .mint(&MINTER, custom, HOLDER, &TraitCounts::default())
            .unwrap();

        let reward = receipt.reward.unwrap();
        assert_eq!(reward, custom.with_token_id(5));
        assert_eq!(token.ids().input_of(5), Some(&reward));
    }

    #[test]
    fn test_reward_every_third_mint() {
        let mut token = token(20, 3);
        let registry = TraitCounts::default();

        let rewards: Vec<Option<TokenId>> = [1, 5, 9, 13, 17, 19]
            .into_iter()
            .map(|id| {
                token
                    .mint(&MINTER, input(id), HOLDER, &registry)
                    .unwrap()
                    .reward_token_id()
            })
            .collect();

        assert_eq!(rewards, vec![None, None, Some(10), None, None, Some(20)]);
        assert_eq!(token.mint_count(), 6);
        assert_eq!(token.total_supply(), 8);
    }

    #[test]
    fn test_reward_disabled() {
        let mut token = token(9, 0);
        let receipt = token
            .mint(&MINTER, input(1), HOLDER, &TraitCounts::default())
            .unwrap();
        assert_eq!(receipt.reward, None);
        assert_eq!(token.total_supply(), 1);
    }

    #[test]
    fn test_reward_wraps_to_first_free_id() {
        let mut token = token(9, 1);
        let receipt = token
            .mint(&MINTER, input(9), HOLDER, &TraitCounts::default())
            .unwrap();
        assert_eq!(receipt.reward_token_id(), Some(1));
    }

    #[test]
    fn test_reward_skipped_when_supply_runs_out() {
        let mut token = token(1, 1);
        let receipt = token
            .mint(&MINTER, input(1), HOLDER, &TraitCounts::default())
            .unwrap();
        assert_eq!(receipt.reward, None);
        assert!(token.ids().is_exhausted());
    }

    #[test]
    fn test_requested_and_reward_ids_distinct() {
        let mut token = token(9, 1);
        let registry = TraitCounts::default();
        let mut seen = Vec::new();

        while !token.ids().is_exhausted() {
            let next = token.find_next_available(1).unwrap();
            let receipt = token.mint(&MINTER, input(next), HOLDER, &registry).unwrap();
            seen.push(receipt.token_id());
            if let Some(reward) = receipt.reward_token_id() {
                assert_ne!(reward, receipt.token_id());
                seen.push(reward);
            }
        }

        seen.sort_unstable();
        assert_eq!(seen, (1..=9).collect::<Vec<_>>());
        assert_eq!(token.find_next_available(1), Err(DafoError::SupplyExhausted));
    }

    #[test]
    fn test_non_minter_cannot_mint() {
        let mut token = token(9, 1);
        assert_eq!(
            token.mint(&HOLDER, input(1), HOLDER, &TraitCounts::default()),
            Err(DafoError::Unauthorized)
        );
        assert_eq!(token.total_supply(), 0);
    }

    #[test]
    fn test_mint_bounds() {
        let mut token = token(10_000, 1);
        let registry = TraitCounts::default();
        assert!(matches!(
            token.mint(&MINTER, input(0), HOLDER, &registry),
            Err(DafoError::OutOfBounds { token_id: 0, .. })
        ));
        assert!(matches!(
            token.mint(&MINTER, input(10_001), HOLDER, &registry),
            Err(DafoError::OutOfBounds { token_id: 10_001, .. })
        ));
    }

    #[test]
    fn test_mint_rejects_unregistered_traits() {
        let mut token = token(9, 1);
        let registry = TraitCounts {
            roles: 4,
            palettes: 1,
        };
        assert!(matches!(
            token.mint(&MINTER, input(1), HOLDER, &registry),
            Err(DafoError::IndexOutOfBounds { trait_name: "Palette", .. })
        ));
        assert!(!token.ids().is_claimed(1));
    }

    #[test]
    fn test_genesis_id_exists() {
        let token = token(9, 1);
        assert!(token.exists(0));
        assert!(!token.exists(1));
        assert_eq!(token.total_supply(), 0);
    }

    #[test]
    fn test_burn_keeps_id_claimed() {
        let mut token = token(9, 0);
        let registry = TraitCounts::default();
        token.mint(&MINTER, input(1), HOLDER, &registry).unwrap();

        assert_eq!(token.burn(&HOLDER, 1), Err(DafoError::Unauthorized));
        token.burn(&MINTER, 1).unwrap();

        assert!(!token.exists(1));
        assert!(token.ids().is_claimed(1));
        assert_eq!(token.find_next_available(1).unwrap(), 2);
        assert_eq!(token.burn(&MINTER, 1), Err(DafoError::NotMinted(1)));
    }

    #[test]
    fn test_royalty_is_five_percent() {
        let mut token = token(9, 0);
        token
            .mint(&MINTER, input(2), HOLDER, &TraitCounts::default())
            .unwrap();

        assert_eq!(token.royalty_info(2, 100).unwrap(), (TREASURY, 5));
        assert_eq!(token.royalty_info(3, 100), Err(DafoError::NotMinted(3)));
    }
}

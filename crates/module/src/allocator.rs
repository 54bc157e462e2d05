//! Circular "next free slot" allocator over the bounded id space.
//!
//! The space is an arena of `max_supply + 1` slots indexed by id. Slot `0` is
//! the genesis sentinel: claimed from construction and never previewable.
//! Previews are read-only; claims re-check freshness at commit time, so a
//! preview taken earlier is never trusted.

use dafo_types::{CustomInput, TokenId, GENESIS_TOKEN_ID};
use tracing::debug;

use crate::error::DafoError;

/// Largest supply the slot arena is sized for.
pub const MAX_SUPPLY_LIMIT: u64 = 1_000_000;

/// The identifier domain and the set of claimed ids.
#[derive(Clone, Debug)]
pub struct IdSpace {
    max_supply: u64,
    /// Input bound to each claimed id; `None` for free slots and the sentinel
    slots: Vec<Option<CustomInput>>,
    /// Claimed ids in `1..=max_supply`
    claimed: u64,
}

impl IdSpace {
    /// Create an empty id space. `max_supply` must be in `1..=MAX_SUPPLY_LIMIT`.
    pub fn new(max_supply: u64) -> Result<Self, DafoError> {
        if max_supply == 0 || max_supply > MAX_SUPPLY_LIMIT {
            return Err(DafoError::InvalidSupply {
                max_supply,
                limit: MAX_SUPPLY_LIMIT,
            });
        }
        Ok(Self {
            max_supply,
            slots: vec![None; max_supply as usize + 1],
            claimed: 0,
        })
    }

    pub fn max_supply(&self) -> u64 {
        self.max_supply
    }

    /// Number of claimed ids, excluding the genesis sentinel.
    pub fn claimed_count(&self) -> u64 {
        self.claimed
    }

    pub fn remaining(&self) -> u64 {
        self.max_supply - self.claimed
    }

    pub fn is_exhausted(&self) -> bool {
        self.claimed == self.max_supply
    }

    /// Whether `token_id` is claimed. The sentinel is always claimed; ids past
    /// the supply never are.
    pub fn is_claimed(&self, token_id: TokenId) -> bool {
        token_id == GENESIS_TOKEN_ID || self.input_of(token_id).is_some()
    }

    /// Input bound to a claimed id.
    pub fn input_of(&self, token_id: TokenId) -> Option<&CustomInput> {
        self.slots.get(token_id as usize).and_then(Option::as_ref)
    }

    fn check_bounds(&self, token_id: TokenId) -> Result<(), DafoError> {
        if token_id == GENESIS_TOKEN_ID || token_id > self.max_supply {
            return Err(DafoError::OutOfBounds {
                token_id,
                max_supply: self.max_supply,
            });
        }
        Ok(())
    }

    /// First unclaimed id at or after `requested`, wrapping from `max_supply`
    /// back to `1`. Visits each id at most once.
    pub fn preview(&self, requested: TokenId) -> Result<TokenId, DafoError> {
        self.check_bounds(requested)?;

        if self.is_exhausted() {
            return Err(DafoError::SupplyExhausted);
        }

        let mut candidate = requested;
        for _ in 0..self.max_supply {
            if self.slots[candidate as usize].is_none() {
                debug!(requested, found = candidate, "Previewed next available id");
                return Ok(candidate);
            }
            candidate = self.next_after(candidate);
        }

        Err(DafoError::SupplyExhausted)
    }

    /// Successor of `token_id` on the circle `1..=max_supply`.
    pub fn next_after(&self, token_id: TokenId) -> TokenId {
        token_id % self.max_supply + 1
    }

    /// Fail unless `token_id` could be claimed right now.
    pub fn ensure_claimable(&self, token_id: TokenId) -> Result<(), DafoError> {
        self.check_bounds(token_id)?;
        if self.is_claimed(token_id) {
            return Err(DafoError::AlreadyClaimed(token_id));
        }
        Ok(())
    }

    /// Permanently claim `input.token_id` and bind `input` to it.
    pub fn claim(&mut self, input: CustomInput) -> Result<(), DafoError> {
        self.ensure_claimable(input.token_id)?;
        self.slots[input.token_id as usize] = Some(input);
        self.claimed += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dafo_types::Role;
    use proptest::prelude::*;
    use rand::seq::SliceRandom;

    fn input(token_id: TokenId) -> CustomInput {
        CustomInput::new(token_id, Role::Academic, 0, false)
    }

    fn space_with(max_supply: u64, claimed: &[TokenId]) -> IdSpace {
        let mut space = IdSpace::new(max_supply).unwrap();
        for id in claimed {
            space.claim(input(*id)).unwrap();
        }
        space
    }

    #[test]
    fn test_supply_bounds() {
        assert_eq!(
            IdSpace::new(0).unwrap_err(),
            DafoError::InvalidSupply { max_supply: 0, limit: MAX_SUPPLY_LIMIT }
        );
        assert_eq!(
            IdSpace::new(MAX_SUPPLY_LIMIT + 1).unwrap_err(),
            DafoError::InvalidSupply {
                max_supply: MAX_SUPPLY_LIMIT + 1,
                limit: MAX_SUPPLY_LIMIT,
            }
        );
        assert!(IdSpace::new(u32::MAX as u64).is_err());

        let space = IdSpace::new(MAX_SUPPLY_LIMIT).unwrap();
        assert_eq!(space.remaining(), MAX_SUPPLY_LIMIT);
        assert_eq!(space.preview(MAX_SUPPLY_LIMIT).unwrap(), MAX_SUPPLY_LIMIT);
    }

    #[test]
    fn test_all_available_initially() {
        let space = IdSpace::new(9).unwrap();
        for id in 1..=9 {
            assert_eq!(space.preview(id).unwrap(), id);
        }
        assert!(space.is_claimed(0));
        assert_eq!(space.claimed_count(), 0);
    }

    #[test]
    fn test_out_of_bounds() {
        let space = IdSpace::new(9).unwrap();
        assert!(matches!(
            space.preview(0),
            Err(DafoError::OutOfBounds { token_id: 0, max_supply: 9 })
        ));
        assert!(matches!(
            space.preview(10),
            Err(DafoError::OutOfBounds { token_id: 10, .. })
        ));
    }

    #[test]
    fn test_claim_rejects_sentinel_and_overflow() {
        let mut space = IdSpace::new(9).unwrap();
        assert!(matches!(
            space.claim(input(0)),
            Err(DafoError::OutOfBounds { .. })
        ));
        assert!(matches!(
            space.claim(input(10)),
            Err(DafoError::OutOfBounds { .. })
        ));
        assert_eq!(space.claimed_count(), 0);
    }

    #[test]
    fn test_claim_twice_fails() {
        let mut space = space_with(9, &[4]);
        assert_eq!(space.claim(input(4)), Err(DafoError::AlreadyClaimed(4)));
        assert_eq!(space.claimed_count(), 1);
    }

    #[test]
    fn test_skips_claimed_ids() {
        let space = space_with(9, &[1, 2, 5]);
        assert_eq!(space.preview(1).unwrap(), 3);
        assert_eq!(space.preview(5).unwrap(), 6);
        assert_eq!(space.preview(9).unwrap(), 9);
    }

    #[test]
    fn test_wraps_past_max_supply() {
        let space = space_with(9, &[9]);
        assert_eq!(space.preview(9).unwrap(), 1);

        let space = space_with(9, &[8, 9, 1]);
        assert_eq!(space.preview(8).unwrap(), 2);
    }

    #[test]
    fn test_single_free_slot_found_from_anywhere() {
        let claimed: Vec<TokenId> = (1..=9).filter(|id| *id != 6).collect();
        let space = space_with(9, &claimed);
        for id in 1..=9 {
            assert_eq!(space.preview(id).unwrap(), 6);
        }
    }

    #[test]
    fn test_random_order_exhausts_supply() {
        let mut ids: Vec<TokenId> = (1..=9).collect();
        ids.shuffle(&mut rand::thread_rng());

        let space = space_with(9, &ids);
        assert_eq!(space.claimed_count(), 9);
        assert!(space.is_exhausted());
        for id in 1..=9 {
            assert_eq!(space.preview(id), Err(DafoError::SupplyExhausted));
        }
    }

    #[test]
    fn test_input_bound_at_claim() {
        let mut space = IdSpace::new(3).unwrap();
        let custom = CustomInput::new(2, Role::Artist, 2, true);
        space.claim(custom).unwrap();
        assert_eq!(space.input_of(2), Some(&custom));
        assert_eq!(space.input_of(1), None);
        assert_eq!(space.input_of(0), None);
    }

    fn claimed_set() -> impl Strategy<Value = (u64, Vec<TokenId>)> {
        (1u64..=40).prop_flat_map(|max| {
            (
                Just(max),
                proptest::sample::subsequence((1..=max).collect::<Vec<_>>(), 0..=max as usize),
            )
        })
    }

    proptest! {
        #[test]
        fn preview_is_deterministic((max, claimed) in claimed_set(), seed in any::<u64>()) {
            let space = space_with(max, &claimed);
            let requested = seed % max + 1;
            let first = space.preview(requested);
            prop_assert_eq!(first.clone(), space.preview(requested));
            prop_assert_eq!(first, space.preview(requested));
        }

        #[test]
        fn preview_returns_first_free_id_on_the_circle((max, claimed) in claimed_set(), seed in any::<u64>()) {
            let space = space_with(max, &claimed);
            let requested = seed % max + 1;

            match space.preview(requested) {
                Ok(found) => {
                    prop_assert!(found >= 1 && found <= max);
                    prop_assert!(!claimed.contains(&found));
                    // Every id walked over before `found` is claimed.
                    let mut id = requested;
                    while id != found {
                        prop_assert!(claimed.contains(&id));
                        id = space.next_after(id);
                    }
                }
                Err(err) => {
                    prop_assert_eq!(err, DafoError::SupplyExhausted);
                    prop_assert_eq!(claimed.len() as u64, max);
                }
            }
        }

        #[test]
        fn claiming_previews_never_double_allocates(max in 1u64..=30, starts in proptest::collection::vec(any::<u64>(), 1..60)) {
            let mut space = IdSpace::new(max).unwrap();
            let mut seen = std::collections::HashSet::new();

            for start in starts {
                let requested = start % max + 1;
                match space.preview(requested) {
                    Ok(id) => {
                        space.claim(input(id)).unwrap();
                        prop_assert!(seen.insert(id));
                    }
                    Err(err) => {
                        prop_assert_eq!(err, DafoError::SupplyExhausted);
                        prop_assert_eq!(seen.len() as u64, max);
                    }
                }
            }
            prop_assert_eq!(space.claimed_count(), seen.len() as u64);
        }
    }
}

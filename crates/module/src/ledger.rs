//! Native and wrapped balances.
//!
//! Value held by the auction house sits in `escrow`. Wrapped balances are
//! backed one-to-one by `wrapped_reserve`, so native balances plus escrow plus
//! the reserve is the same before and after every movement.

use std::collections::HashMap;

use dafo_types::{Address, Amount, ReceiveBehavior};

use crate::error::DafoError;

#[derive(Clone, Debug, Default)]
pub struct Ledger {
    balances: HashMap<Address, Amount>,
    escrow: Amount,
    wrapped: HashMap<Address, Amount>,
    wrapped_reserve: Amount,
    behaviors: HashMap<Address, ReceiveBehavior>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, address: &Address) -> Amount {
        self.balances.get(address).copied().unwrap_or(0)
    }

    pub fn wrapped_balance_of(&self, address: &Address) -> Amount {
        self.wrapped.get(address).copied().unwrap_or(0)
    }

    /// Native value held by the auction house.
    pub fn escrow(&self) -> Amount {
        self.escrow
    }

    pub fn wrapped_reserve(&self) -> Amount {
        self.wrapped_reserve
    }

    /// Native balances, escrow and wrapped reserve together.
    pub fn total_value(&self) -> u128 {
        let native: u128 = self.balances.values().map(|v| *v as u128).sum();
        native + self.escrow as u128 + self.wrapped_reserve as u128
    }

    pub fn receive_behavior(&self, address: &Address) -> ReceiveBehavior {
        self.behaviors.get(address).copied().unwrap_or_default()
    }

    pub fn set_receive_behavior(&mut self, address: Address, behavior: ReceiveBehavior) {
        if behavior == ReceiveBehavior::Accept {
            self.behaviors.remove(&address);
        } else {
            self.behaviors.insert(address, behavior);
        }
    }

    /// Create native value out of thin air. Genesis and test funding only.
    pub fn fund(&mut self, address: Address, amount: Amount) -> Result<(), DafoError> {
        let credited = credit(self.balance_of(&address), amount)?;
        self.balances.insert(address, credited);
        Ok(())
    }

    pub fn ensure_funds(&self, address: &Address, amount: Amount) -> Result<(), DafoError> {
        let available = self.balance_of(address);
        if available < amount {
            return Err(DafoError::InsufficientFunds {
                required: amount,
                available,
            });
        }
        Ok(())
    }

    /// Move `amount` from `from` into the auction house escrow.
    pub fn deposit_to_escrow(&mut self, from: &Address, amount: Amount) -> Result<(), DafoError> {
        self.ensure_funds(from, amount)?;
        let escrow = credit(self.escrow, amount)?;
        if let Some(balance) = self.balances.get_mut(from) {
            *balance -= amount;
        }
        self.escrow = escrow;
        Ok(())
    }

    fn ensure_escrow(&self, amount: Amount) -> Result<(), DafoError> {
        if self.escrow < amount {
            return Err(DafoError::InsufficientFunds {
                required: amount,
                available: self.escrow,
            });
        }
        Ok(())
    }

    /// Pay native value out of escrow.
    pub fn release_native(&mut self, to: Address, amount: Amount) -> Result<(), DafoError> {
        self.ensure_escrow(amount)?;
        let credited = credit(self.balance_of(&to), amount)?;
        self.escrow -= amount;
        self.balances.insert(to, credited);
        Ok(())
    }

    /// Wrap `amount` of escrow and credit the wrapped asset to `to`.
    pub fn release_wrapped(&mut self, to: Address, amount: Amount) -> Result<(), DafoError> {
        self.ensure_escrow(amount)?;
        let reserve = credit(self.wrapped_reserve, amount)?;
        let credited = credit(self.wrapped_balance_of(&to), amount)?;
        self.escrow -= amount;
        self.wrapped_reserve = reserve;
        self.wrapped.insert(to, credited);
        Ok(())
    }
}

fn credit(balance: Amount, amount: Amount) -> Result<Amount, DafoError> {
    balance.checked_add(amount).ok_or(DafoError::BalanceOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escrow_round_trip() {
        let mut ledger = Ledger::new();
        let alice = [1u8; 32];
        let bob = [2u8; 32];

        ledger.fund(alice, 100).unwrap();
        ledger.deposit_to_escrow(&alice, 60).unwrap();
        assert_eq!(ledger.balance_of(&alice), 40);
        assert_eq!(ledger.escrow(), 60);

        ledger.release_native(bob, 25).unwrap();
        ledger.release_wrapped(alice, 35).unwrap();

        assert_eq!(ledger.balance_of(&bob), 25);
        assert_eq!(ledger.wrapped_balance_of(&alice), 35);
        assert_eq!(ledger.wrapped_reserve(), 35);
        assert_eq!(ledger.escrow(), 0);
        assert_eq!(ledger.total_value(), 100);
    }

    #[test]
    fn test_deposit_requires_funds() {
        let mut ledger = Ledger::new();
        let alice = [1u8; 32];
        ledger.fund(alice, 5).unwrap();

        assert_eq!(
            ledger.deposit_to_escrow(&alice, 6),
            Err(DafoError::InsufficientFunds {
                required: 6,
                available: 5
            })
        );
        assert_eq!(ledger.balance_of(&alice), 5);
        assert_eq!(ledger.escrow(), 0);
    }

    #[test]
    fn test_cannot_release_more_than_escrow() {
        let mut ledger = Ledger::new();
        assert!(ledger.release_native([3u8; 32], 1).is_err());
        assert!(ledger.release_wrapped([3u8; 32], 1).is_err());
        assert_eq!(ledger.total_value(), 0);
    }

    #[test]
    fn test_fund_overflow_leaves_balance() {
        let mut ledger = Ledger::new();
        let alice = [1u8; 32];
        ledger.fund(alice, Amount::MAX).unwrap();

        assert_eq!(ledger.fund(alice, 1), Err(DafoError::BalanceOverflow));
        assert_eq!(ledger.balance_of(&alice), Amount::MAX);
    }

    #[test]
    fn test_escrow_overflow_rejected() {
        let mut ledger = Ledger::new();
        let alice = [1u8; 32];
        let bob = [2u8; 32];
        ledger.fund(alice, Amount::MAX).unwrap();
        ledger.fund(bob, 1).unwrap();
        ledger.deposit_to_escrow(&alice, Amount::MAX).unwrap();

        assert_eq!(
            ledger.deposit_to_escrow(&bob, 1),
            Err(DafoError::BalanceOverflow)
        );
        assert_eq!(ledger.balance_of(&bob), 1);
        assert_eq!(ledger.escrow(), Amount::MAX);
    }

    #[test]
    fn test_release_overflow_keeps_escrow() {
        let mut ledger = Ledger::new();
        let alice = [1u8; 32];
        let bob = [2u8; 32];
        ledger.fund(alice, 10).unwrap();
        ledger.fund(bob, Amount::MAX).unwrap();
        ledger.deposit_to_escrow(&alice, 10).unwrap();

        assert_eq!(
            ledger.release_native(bob, 10),
            Err(DafoError::BalanceOverflow)
        );
        assert_eq!(ledger.escrow(), 10);
        assert_eq!(ledger.balance_of(&bob), Amount::MAX);

        ledger.release_wrapped(bob, 4).unwrap();
        assert_eq!(ledger.wrapped_balance_of(&bob), 4);
        assert_eq!(ledger.escrow(), 6);
    }

    #[test]
    fn test_receive_behavior_defaults_to_accept() {
        let mut ledger = Ledger::new();
        let addr = [9u8; 32];
        assert_eq!(ledger.receive_behavior(&addr), ReceiveBehavior::Accept);

        ledger.set_receive_behavior(addr, ReceiveBehavior::Revert);
        assert_eq!(ledger.receive_behavior(&addr), ReceiveBehavior::Revert);

        ledger.set_receive_behavior(addr, ReceiveBehavior::Accept);
        assert_eq!(ledger.receive_behavior(&addr), ReceiveBehavior::Accept);
    }
}

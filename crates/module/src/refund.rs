//! Refund guard: pay value out of escrow without letting the recipient block.
//!
//! A direct transfer is attempted with a fixed gas stipend. A recipient that
//! reverts, or that would burn more than the stipend, loses the direct path and
//! is credited the wrapped asset instead. The wrapped credit is a plain ledger
//! write and cannot be refused, so the gas attributable to any single payment
//! is bounded by [`MAX_PAYMENT_GAS`] whatever the recipient does.

use dafo_types::{format_address, Address, Amount, ReceiveBehavior};
use tracing::{debug, warn};

use crate::error::DafoError;
use crate::ledger::Ledger;

/// Gas forwarded to the recipient on the direct path.
pub const DIRECT_TRANSFER_GAS_STIPEND: u64 = 30_000;

/// Cost of a transfer into an account with no receive logic.
pub const PLAIN_RECEIVE_GAS: u64 = 2_300;

/// Cost of wrapping value and crediting the wrapped asset.
pub const WRAP_AND_CREDIT_GAS: u64 = 45_000;

/// Upper bound on the gas one payment can cost the caller.
pub const MAX_PAYMENT_GAS: u64 = DIRECT_TRANSFER_GAS_STIPEND + WRAP_AND_CREDIT_GAS;

/// How the value reached the recipient.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentRoute {
    Direct,
    Wrapped,
}

/// Outcome of [`transfer_with_fallback`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub to: Address,
    pub amount: Amount,
    pub route: PaymentRoute,
    /// Simulated gas spent on the direct attempt and, if taken, the fallback
    pub gas_used: u64,
}

impl PaymentReceipt {
    pub fn wrapped(&self) -> bool {
        self.route == PaymentRoute::Wrapped
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DirectFailure {
    Reverted,
    OutOfGas,
}

/// Run the recipient's receive logic under `stipend`. Returns the gas spent,
/// which never exceeds the stipend.
fn attempt_direct(behavior: ReceiveBehavior, stipend: u64) -> Result<u64, (DirectFailure, u64)> {
    match behavior {
        ReceiveBehavior::Accept => Ok(PLAIN_RECEIVE_GAS.min(stipend)),
        ReceiveBehavior::Revert => Err((DirectFailure::Reverted, PLAIN_RECEIVE_GAS.min(stipend))),
        ReceiveBehavior::Consume(gas) => {
            let spent = gas.max(PLAIN_RECEIVE_GAS);
            if spent > stipend {
                Err((DirectFailure::OutOfGas, stipend))
            } else {
                Ok(spent)
            }
        }
    }
}

/// Pay `amount` from escrow to `to`, directly if the recipient accepts it
/// within the stipend, otherwise as the wrapped asset.
///
/// Fails if escrow does not hold `amount` or the credit would overflow the
/// recipient's balance. Nothing moves on failure.
pub fn transfer_with_fallback(
    ledger: &mut Ledger,
    to: Address,
    amount: Amount,
) -> Result<PaymentReceipt, DafoError> {
    if ledger.escrow() < amount {
        return Err(DafoError::InsufficientFunds {
            required: amount,
            available: ledger.escrow(),
        });
    }

    match attempt_direct(ledger.receive_behavior(&to), DIRECT_TRANSFER_GAS_STIPEND) {
        Ok(gas_used) => {
            ledger.release_native(to, amount)?;
            debug!(to = %format_address(&to), amount, gas_used, "Direct transfer succeeded");
            Ok(PaymentReceipt {
                to,
                amount,
                route: PaymentRoute::Direct,
                gas_used,
            })
        }
        Err((failure, spent)) => {
            ledger.release_wrapped(to, amount)?;
            warn!(
                to = %format_address(&to),
                amount,
                ?failure,
                "Direct transfer failed, credited wrapped asset"
            );
            Ok(PaymentReceipt {
                to,
                amount,
                route: PaymentRoute::Wrapped,
                gas_used: spent + WRAP_AND_CREDIT_GAS,
            })
        }
    }
}

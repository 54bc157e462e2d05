//! Auction house state: the single current auction and the pause flag.
//!
//! The house owns its [`Auction`] value outright; every transition goes
//! through a `&mut self` method here. Cross-component effects (claiming the
//! subject, moving funds, emitting events) are sequenced by the handlers.

use dafo_types::{Address, Amount, Auction, AuctionPhase, CustomInput, TokenId};
use serde::{Deserialize, Serialize};

use crate::error::DafoError;

/// Auction timing and pricing rules.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionParams {
    /// A bid landing closer than this to the end pushes the end out to
    /// `now + time_buffer` (seconds)
    pub time_buffer: u64,
    /// Minimum first bid
    pub reserve_price: Amount,
    /// Minimum raise over the current high bid, in percent
    pub min_bid_increment_percentage: u8,
    /// Length of a fresh auction (seconds)
    pub duration: u64,
}

impl Default for AuctionParams {
    fn default() -> Self {
        Self {
            time_buffer: 5 * 60,
            reserve_price: 1,
            min_bid_increment_percentage: 5,
            duration: 24 * 60 * 60,
        }
    }
}

impl AuctionParams {
    /// Smallest bid that can replace a high bid of `current`.
    ///
    /// `current × (100 + pct) / 100`, and always strictly above `current`.
    pub fn min_next_bid(&self, current: Amount) -> Amount {
        let raised = current as u128 * (100 + self.min_bid_increment_percentage as u128) / 100;
        let floor = current as u128 + 1;
        raised.max(floor).min(Amount::MAX as u128) as Amount
    }
}

/// Outcome of recording a bid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AcceptedBid {
    /// Bidder and amount displaced by this bid
    pub previous: Option<(Address, Amount)>,
    /// New end time, if the bid triggered an extension
    pub extended_to: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct AuctionHouse {
    params: AuctionParams,
    auction: Option<Auction>,
    paused: bool,
    /// Subject of the most recent auction; the next preview starts here
    last_subject: TokenId,
}

impl AuctionHouse {
    /// A new house starts paused with no auction.
    pub fn new(params: AuctionParams) -> Self {
        Self {
            params,
            auction: None,
            paused: true,
            last_subject: 1,
        }
    }

    pub fn params(&self) -> &AuctionParams {
        &self.params
    }

    pub fn auction(&self) -> Option<&Auction> {
        self.auction.as_ref()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Where the next subject preview starts.
    pub fn preview_hint(&self) -> TokenId {
        self.last_subject
    }

    /// Returns whether the flag changed.
    pub fn set_paused(&mut self, paused: bool) -> bool {
        let changed = self.paused != paused;
        self.paused = paused;
        changed
    }

    /// True when there is no auction or the current one is settled.
    pub fn can_create(&self) -> bool {
        self.auction.as_ref().map_or(true, |auction| auction.settled)
    }

    /// Whether an unsettled auction exists.
    pub fn has_pending(&self) -> bool {
        !self.can_create()
    }

    /// Open a fresh auction on `subject`.
    pub fn open(&mut self, subject: CustomInput, now: u64) -> Result<&Auction, DafoError> {
        if !self.can_create() {
            return Err(DafoError::AuctionNotComplete);
        }
        let end_time = now.saturating_add(self.params.duration);
        self.last_subject = subject.token_id;
        let auction = self.auction.insert(Auction {
            custom_input: subject,
            amount: 0,
            bidder: None,
            start_time: now,
            end_time,
            settled: false,
        });
        Ok(&*auction)
    }

    /// Validate a bid against the current auction without changing it.
    ///
    /// Checks timing, subject and amount; the caller checks the subject is
    /// still unclaimed and the traits are registered.
    pub fn check_bid(&self, input: &CustomInput, amount: Amount, now: u64) -> Result<(), DafoError> {
        let auction = self.auction.as_ref().ok_or(DafoError::NoActiveAuction)?;

        match auction.phase(now) {
            AuctionPhase::Live => {}
            AuctionPhase::Expired | AuctionPhase::Settled => return Err(DafoError::AuctionExpired),
        }

        if input.token_id != auction.token_id() {
            return Err(DafoError::SubjectUnavailable {
                requested: input.token_id,
                subject: auction.token_id(),
            });
        }

        match auction.bidder {
            None if amount < self.params.reserve_price => Err(DafoError::ReserveNotMet {
                required: self.params.reserve_price,
                got: amount,
            }),
            Some(_) => {
                let required = self.params.min_next_bid(auction.amount);
                if amount < required {
                    Err(DafoError::IncrementTooSmall {
                        required,
                        got: amount,
                    })
                } else {
                    Ok(())
                }
            }
            None => Ok(()),
        }
    }

    /// Record a bid already accepted by [`check_bid`](Self::check_bid).
    pub fn record_bid(
        &mut self,
        bidder: Address,
        input: CustomInput,
        amount: Amount,
        now: u64,
    ) -> Result<AcceptedBid, DafoError> {
        self.check_bid(&input, amount, now)?;
        let time_buffer = self.params.time_buffer;
        let auction = self.auction.as_mut().ok_or(DafoError::NoActiveAuction)?;

        let previous = auction.bidder.map(|prev| (prev, auction.amount));
        auction.bidder = Some(bidder);
        auction.amount = amount;
        auction.custom_input = input;

        let extended_to = if auction.end_time - now < time_buffer {
            auction.end_time = now.saturating_add(time_buffer);
            Some(auction.end_time)
        } else {
            None
        };

        Ok(AcceptedBid {
            previous,
            extended_to,
        })
    }

    /// Fail unless the current auction can be settled at `now`.
    ///
    /// With `force` the end time is ignored; used when the minter changes.
    pub fn check_settle(&self, now: u64, force: bool) -> Result<&Auction, DafoError> {
        let auction = self.auction.as_ref().ok_or(DafoError::NoActiveAuction)?;
        match auction.phase(now) {
            AuctionPhase::Settled => Err(DafoError::AuctionAlreadySettled),
            AuctionPhase::Live if !force => Err(DafoError::AuctionNotComplete),
            _ => Ok(auction),
        }
    }

    /// Mark the current auction settled.
    pub fn mark_settled(&mut self) -> Result<Auction, DafoError> {
        let auction = self.auction.as_mut().ok_or(DafoError::NoActiveAuction)?;
        if auction.settled {
            return Err(DafoError::AuctionAlreadySettled);
        }
        auction.settled = true;
        Ok(auction.clone())
    }
}

// Upkeep decision: may the current round be closed?
use borsh::{BorshDeserialize, BorshSerialize};

use crate::raffle_error::RaffleError;
use crate::raffle_state::RaffleState;

/// Outcome of an upkeep check together with the values it was computed from
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq)]
pub struct UpkeepCheck {
    pub upkeep_needed: bool,
    pub raffle_state: RaffleState,
    pub entrant_count: u64,
    pub pool_balance: u64,
    pub elapsed: i64,
}

impl UpkeepCheck {
    pub fn evaluate(
        raffle_state: RaffleState,
        entrant_count: u64,
        pool_balance: u64,
        elapsed: i64,
        interval: i64,
    ) -> Self {
        Self {
            upkeep_needed: is_upkeep_needed(raffle_state, entrant_count, pool_balance, elapsed, interval),
            raffle_state,
            entrant_count,
            pool_balance,
            elapsed,
        }
    }

    /// The rejection reported when upkeep is attempted anyway
    pub fn not_needed(&self) -> RaffleError {
        RaffleError::UpkeepNotNeeded {
            raffle_state: self.raffle_state,
            entrant_count: self.entrant_count,
            pool_balance: self.pool_balance,
            elapsed: self.elapsed,
        }
    }
}

/// All four conditions must hold at once.
pub fn is_upkeep_needed(
    raffle_state: RaffleState,
    entrant_count: u64,
    pool_balance: u64,
    elapsed: i64,
    interval: i64,
) -> bool {
    let is_open = raffle_state == RaffleState::Open;
    let time_passed = elapsed >= interval;
    let has_players = entrant_count > 0;
    let has_balance = pool_balance > 0;
    is_open && time_passed && has_players && has_balance
}

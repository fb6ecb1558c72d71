use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use crate::raffle_error::RaffleError;

/// Entrants of the current round, in entry order, and the lamports they paid in.
///
/// The same player may appear more than once; every slot is one chance to win.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq)]
pub struct EntryLedger {
    entrants: Vec<Pubkey>,
    pool_balance: u64,
}

impl EntryLedger {
    /// Serialized size of a ledger holding `capacity` entrants
    pub const fn space(capacity: u32) -> usize {
        4 + 32 * capacity as usize + 8
    }

    pub fn add_entrant(&mut self, entrant: Pubkey, fee: u64) -> Result<(), RaffleError> {
        let pool_balance = self
            .pool_balance
            .checked_add(fee)
            .ok_or(RaffleError::ArithmeticOverflow)?;
        self.entrants.push(entrant);
        self.pool_balance = pool_balance;
        Ok(())
    }

    /// Empties the ledger and hands back what it held.
    pub fn reset(&mut self) -> EntryLedger {
        std::mem::take(self)
    }

    pub fn entrant_at(&self, index: u64) -> Result<&Pubkey, RaffleError> {
        usize::try_from(index)
            .ok()
            .and_then(|index| self.entrants.get(index))
            .ok_or(RaffleError::IndexOutOfRange)
    }

    pub fn count(&self) -> u64 {
        self.entrants.len() as u64
    }

    pub fn balance(&self) -> u64 {
        self.pool_balance
    }

    pub fn entrants(&self) -> &[Pubkey] {
        &self.entrants
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_tracks_fee_per_entry() {
        let mut ledger = EntryLedger::default();
        let player = Pubkey::new_unique();
        for _ in 0..3 {
            ledger.add_entrant(player, 10).unwrap();
        }
        assert_eq!(ledger.count(), 3);
        assert_eq!(ledger.balance(), 30);
        assert_eq!(ledger.entrant_at(2).unwrap(), &player);
    }

    #[test]
    fn entrant_at_rejects_out_of_range() {
        let mut ledger = EntryLedger::default();
        assert_eq!(ledger.entrant_at(0), Err(RaffleError::IndexOutOfRange));
        ledger.add_entrant(Pubkey::new_unique(), 1).unwrap();
        assert_eq!(ledger.entrant_at(1), Err(RaffleError::IndexOutOfRange));
        assert_eq!(ledger.entrant_at(u64::MAX), Err(RaffleError::IndexOutOfRange));
    }

    #[test]
    fn reset_returns_previous_contents() {
        let mut ledger = EntryLedger::default();
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();
        ledger.add_entrant(a, 5).unwrap();
        ledger.add_entrant(b, 5).unwrap();

        let previous = ledger.reset();
        assert_eq!(ledger.count(), 0);
        assert_eq!(ledger.balance(), 0);
        assert_eq!(previous.entrants(), &[a, b]);
        assert_eq!(previous.balance(), 10);
    }

    #[test]
    fn overflowing_balance_leaves_ledger_untouched() {
        let mut ledger = EntryLedger::default();
        ledger.add_entrant(Pubkey::new_unique(), u64::MAX).unwrap();
        assert_eq!(
            ledger.add_entrant(Pubkey::new_unique(), 1),
            Err(RaffleError::ArithmeticOverflow)
        );
        assert_eq!(ledger.count(), 1);
    }
}

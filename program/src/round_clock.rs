use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::clock::UnixTimestamp;

/// Start of the current round. Callers supply "now"; the clock never reads the sysvar itself.
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct RoundClock {
    started_at: UnixTimestamp,
}

impl RoundClock {
    pub const LEN: usize = 8;

    pub fn starting_at(now: UnixTimestamp) -> Self {
        Self { started_at: now }
    }

    pub fn elapsed(&self, now: UnixTimestamp) -> i64 {
        now.saturating_sub(self.started_at)
    }

    pub fn restart(&mut self, now: UnixTimestamp) {
        self.started_at = now;
    }

    pub fn started_at(&self) -> UnixTimestamp {
        self.started_at
    }
}

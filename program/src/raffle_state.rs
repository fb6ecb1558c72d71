use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    clock::UnixTimestamp,
    msg,
    program_error::ProgramError,
    pubkey::Pubkey,
};

use crate::constants::{
    DEFAULT_CALLBACK_GAS_LIMIT, DEFAULT_ENTRANCE_FEE, DEFAULT_INTERVAL, DEFAULT_KEY_HASH,
    DEFAULT_MAX_ENTRANTS, DEFAULT_REQUEST_CONFIRMATIONS, MAX_ENTRANTS_LIMIT, NUM_WORDS,
};
use crate::ledger::EntryLedger;
use crate::raffle_error::RaffleError;
use crate::round_clock::RoundClock;
use crate::vrf::RandomnessRequest;

/// Status of the raffle round
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq)]
pub enum RaffleState {
    /// Raffle is open for entries
    Open,
    /// Entry is closed, waiting for the oracle to deliver randomness
    Calculating,
}

/// Oracle call parameters
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq)]
pub struct VrfConfig {
    /// Coordinator program that accepts randomness requests
    pub coordinator: Pubkey,
    /// Subscription account paying for requests
    pub subscription: Pubkey,
    /// The only key allowed to deliver random words
    pub oracle_authority: Pubkey,
    /// Gas lane
    pub key_hash: [u8; 32],
    /// Confirmations the oracle waits before answering
    pub request_confirmations: u16,
    /// Budget for the fulfillment callback
    pub callback_gas_limit: u32,
    /// Random words per request
    pub num_words: u32,
}

impl VrfConfig {
    pub const LEN: usize = 32 + 32 + 32 + 32 + 2 + 4 + 4;
}

/// Raffle configuration, fixed at construction
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq)]
pub struct RaffleConfig {
    /// Lamports charged per entry
    pub entrance_fee: u64,
    /// Minimum round length in seconds
    pub interval: i64,
    /// Entrant capacity the account is sized for
    pub max_entrants: u32,
    pub vrf: VrfConfig,
}

impl RaffleConfig {
    pub const LEN: usize = 8 + 8 + 4 + VrfConfig::LEN;

    /// Configuration with the default fee, interval and oracle parameters
    pub fn with_defaults(coordinator: Pubkey, subscription: Pubkey, oracle_authority: Pubkey) -> Self {
        Self {
            entrance_fee: DEFAULT_ENTRANCE_FEE,
            interval: DEFAULT_INTERVAL,
            max_entrants: DEFAULT_MAX_ENTRANTS,
            vrf: VrfConfig {
                coordinator,
                subscription,
                oracle_authority,
                key_hash: DEFAULT_KEY_HASH,
                request_confirmations: DEFAULT_REQUEST_CONFIRMATIONS,
                callback_gas_limit: DEFAULT_CALLBACK_GAS_LIMIT,
                num_words: NUM_WORDS,
            },
        }
    }

    pub fn validate(&self) -> Result<(), RaffleError> {
        if self.entrance_fee == 0 {
            msg!("Entrance fee must be greater than zero");
            return Err(RaffleError::InvalidConfig);
        }
        if self.interval <= 0 {
            msg!("Interval must be greater than zero");
            return Err(RaffleError::InvalidConfig);
        }
        if self.max_entrants == 0 || self.max_entrants > MAX_ENTRANTS_LIMIT {
            msg!("Max entrants must be between 1 and {}", MAX_ENTRANTS_LIMIT);
            return Err(RaffleError::InvalidConfig);
        }
        if self.vrf.num_words != NUM_WORDS {
            msg!("Exactly {} random word is drawn per round", NUM_WORDS);
            return Err(RaffleError::InvalidConfig);
        }
        Ok(())
    }
}

/// Raffle account data
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub struct Raffle {
    /// Is the account initialized
    pub is_initialized: bool,
    /// PDA bump seed
    pub bump: u8,
    pub config: RaffleConfig,
    pub state: RaffleState,
    pub ledger: EntryLedger,
    pub clock: RoundClock,
    /// Present exactly while the raffle is calculating
    pub outstanding_request_id: Option<u64>,
    pub recent_winner: Option<Pubkey>,
    /// Number of rounds paid out so far
    pub completed_rounds: u64,
}

impl Raffle {
    /// Account size for a raffle holding up to `max_entrants` entrants
    pub const fn space(max_entrants: u32) -> usize {
        1 + 1 + RaffleConfig::LEN + 1 + EntryLedger::space(max_entrants) + RoundClock::LEN + 9 + 33 + 8
    }

    pub fn new(config: RaffleConfig, bump: u8, now: UnixTimestamp) -> Result<Self, RaffleError> {
        config.validate()?;
        Ok(Self {
            is_initialized: true,
            bump,
            config,
            state: RaffleState::Open,
            ledger: EntryLedger::default(),
            clock: RoundClock::starting_at(now),
            outstanding_request_id: None,
            recent_winner: None,
            completed_rounds: 0,
        })
    }

    /// Decode raffle data, ignoring the unused tail of the account
    pub fn unpack(src: &[u8]) -> Result<Self, ProgramError> {
        let mut buf = src;
        let raffle = Raffle::deserialize(&mut buf).map_err(|_| ProgramError::InvalidAccountData)?;
        if !raffle.is_initialized {
            return Err(RaffleError::NotInitialized.into());
        }
        Ok(raffle)
    }

    pub fn pack(&self, dst: &mut [u8]) -> Result<(), ProgramError> {
        let mut buf = dst;
        self.serialize(&mut buf).map_err(|_| ProgramError::AccountDataTooSmall)
    }

    /// Parameters of the randomness request issued when the round closes
    pub fn randomness_request(&self) -> RandomnessRequest {
        RandomnessRequest {
            key_hash: self.config.vrf.key_hash,
            subscription: self.config.vrf.subscription,
            request_confirmations: self.config.vrf.request_confirmations,
            callback_gas_limit: self.config.vrf.callback_gas_limit,
            num_words: self.config.vrf.num_words,
        }
    }

    pub fn raffle_state(&self) -> RaffleState {
        self.state
    }

    pub fn entrance_fee(&self) -> u64 {
        self.config.entrance_fee
    }

    pub fn interval(&self) -> i64 {
        self.config.interval
    }

    pub fn number_of_players(&self) -> u64 {
        self.ledger.count()
    }

    pub fn player(&self, index: u64) -> Result<Pubkey, RaffleError> {
        self.ledger.entrant_at(index).copied()
    }

    pub fn pool_balance(&self) -> u64 {
        self.ledger.balance()
    }

    pub fn recent_winner(&self) -> Option<Pubkey> {
        self.recent_winner
    }

    pub fn last_timestamp(&self) -> UnixTimestamp {
        self.clock.started_at()
    }

    pub fn coordinator(&self) -> Pubkey {
        self.config.vrf.coordinator
    }

    pub fn subscription(&self) -> Pubkey {
        self.config.vrf.subscription
    }

    pub fn oracle_authority(&self) -> Pubkey {
        self.config.vrf.oracle_authority
    }

    pub fn key_hash(&self) -> [u8; 32] {
        self.config.vrf.key_hash
    }

    pub fn num_words(&self) -> u32 {
        self.config.vrf.num_words
    }

    pub fn request_confirmations(&self) -> u16 {
        self.config.vrf.request_confirmations
    }

    pub fn callback_gas_limit(&self) -> u32 {
        self.config.vrf.callback_gas_limit
    }

    pub fn outstanding_request_id(&self) -> Option<u64> {
        self.outstanding_request_id
    }

    pub fn completed_rounds(&self) -> u64 {
        self.completed_rounds
    }
}

use solana_program::program_error::ProgramError;
use thiserror::Error;

use crate::raffle_state::RaffleState;

/// Errors that may be returned by the Raffle program
#[derive(Error, Debug, Copy, Clone, PartialEq)]
pub enum RaffleError {
    /// Invalid instruction data passed
    #[error("Invalid instruction data")]
    InvalidInstructionData,

    /// Raffle account was already initialized
    #[error("Raffle is already initialized")]
    AlreadyInitialized,

    /// Raffle account has not been initialized
    #[error("Raffle is not initialized")]
    NotInitialized,

    /// Configuration supplied at construction is unusable
    #[error("Invalid raffle configuration")]
    InvalidConfig,

    /// Attached payment is below the entrance fee
    #[error("Payment is below the entrance fee")]
    InsufficientPayment,

    /// Entry attempted while a winner is being calculated
    #[error("Raffle is not open")]
    RoundNotOpen,

    /// Entrant index past the end of the ledger
    #[error("Entrant index out of range")]
    IndexOutOfRange,

    /// The raffle account has no room for another entry
    #[error("Raffle entrant capacity reached")]
    EntrantCapacityReached,

    /// Upkeep performed while the round is not ready to close
    #[error("Upkeep not needed: state={raffle_state:?}, entrants={entrant_count}, balance={pool_balance}, elapsed={elapsed}s")]
    UpkeepNotNeeded {
        raffle_state: RaffleState,
        entrant_count: u64,
        pool_balance: u64,
        elapsed: i64,
    },

    /// Fulfillment for a request that is not outstanding
    #[error("Unrecognized randomness request")]
    UnrecognizedRequest,

    /// Fulfillment carried the wrong number of random words
    #[error("Invalid random words")]
    InvalidRandomWords,

    /// Fulfillment was not signed by the oracle authority
    #[error("Only the oracle authority can fulfill randomness")]
    UnauthorizedFulfiller,

    /// Winner account does not match the selected entrant
    #[error("Winner account does not match the selected entrant")]
    WinnerAccountMismatch,

    /// The randomness coordinator rejected the request
    #[error("Randomness gateway unavailable")]
    GatewayUnavailable,

    /// The prize could not be moved to the winner
    #[error("Prize payout failed")]
    PayoutFailed,

    /// Checked arithmetic failed
    #[error("Arithmetic overflow")]
    ArithmeticOverflow,
}

impl RaffleError {
    /// Stable custom error code reported through `ProgramError::Custom`
    pub fn code(&self) -> u32 {
        match self {
            RaffleError::InvalidInstructionData => 0,
            RaffleError::AlreadyInitialized => 1,
            RaffleError::NotInitialized => 2,
            RaffleError::InvalidConfig => 3,
            RaffleError::InsufficientPayment => 4,
            RaffleError::RoundNotOpen => 5,
            RaffleError::IndexOutOfRange => 6,
            RaffleError::EntrantCapacityReached => 7,
            RaffleError::UpkeepNotNeeded { .. } => 8,
            RaffleError::UnrecognizedRequest => 9,
            RaffleError::InvalidRandomWords => 10,
            RaffleError::UnauthorizedFulfiller => 11,
            RaffleError::WinnerAccountMismatch => 12,
            RaffleError::GatewayUnavailable => 13,
            RaffleError::PayoutFailed => 14,
            RaffleError::ArithmeticOverflow => 15,
        }
    }
}

impl From<RaffleError> for ProgramError {
    fn from(e: RaffleError) -> Self {
        ProgramError::Custom(e.code())
    }
}

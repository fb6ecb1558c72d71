use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{log::sol_log_data, msg, pubkey::Pubkey};

/// Notifications emitted for off-chain consumers, in transaction order
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub enum RaffleEvent {
    /// A player bought an entry
    RaffleEnter { player: Pubkey, fee: u64 },
    /// The round closed and randomness was requested
    RequestedRaffleWinner { request_id: u64 },
    /// A winner was paid and the next round opened
    WinnerPicked { winner: Pubkey, prize: u64, round: u64 },
}

impl RaffleEvent {
    /// Write the event to the program log, both readable and borsh-encoded
    pub fn emit(&self) {
        match self {
            RaffleEvent::RaffleEnter { player, fee } => {
                msg!("RaffleEnter: player={} fee={}", player, fee)
            }
            RaffleEvent::RequestedRaffleWinner { request_id } => {
                msg!("RequestedRaffleWinner: request_id={}", request_id)
            }
            RaffleEvent::WinnerPicked { winner, prize, round } => {
                msg!("WinnerPicked: winner={} prize={} round={}", winner, prize, round)
            }
        }

        match self.try_to_vec() {
            Ok(data) => sol_log_data(&[&data]),
            Err(err) => msg!("Failed to encode event: {}", err),
        }
    }
}

// Auto Raffle Program - Utility Functions
use solana_program::{program_error::ProgramError, pubkey::Pubkey};

use crate::constants::RAFFLE_SEED;
use crate::raffle_state::Raffle;

/// Find the program derived address of the raffle
pub fn find_raffle_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[RAFFLE_SEED], program_id)
}

/// Check that `key` is the raffle PDA for the stored bump
pub fn assert_raffle_address(program_id: &Pubkey, key: &Pubkey, bump: u8) -> Result<(), ProgramError> {
    let expected = Pubkey::create_program_address(&[RAFFLE_SEED, &[bump]], program_id)
        .map_err(|_| ProgramError::InvalidSeeds)?;
    if expected != *key {
        return Err(ProgramError::InvalidSeeds);
    }
    Ok(())
}

/// Decode raffle account data fetched by a client
pub fn load_raffle(data: &[u8]) -> Result<Raffle, ProgramError> {
    Raffle::unpack(data)
}

/// Convert lamports to SOL (for display purposes)
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / 1_000_000_000.0
}

// Randomness coordinator integration for the auto raffle program
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::AccountInfo,
    instruction::{AccountMeta, Instruction},
    msg,
    program::{get_return_data, invoke},
    pubkey::Pubkey,
};

use crate::raffle_error::RaffleError;

/// A random word: an unsigned 256-bit integer, little-endian
pub type RandomWord = [u8; 32];

/// Parameters sent to the coordinator with every randomness request
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq)]
pub struct RandomnessRequest {
    /// Gas lane the oracle answers on
    pub key_hash: [u8; 32],
    /// Subscription account funding the request
    pub subscription: Pubkey,
    pub request_confirmations: u16,
    pub callback_gas_limit: u32,
    pub num_words: u32,
}

/// Instructions understood by the randomness coordinator
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub enum CoordinatorInstruction {
    /// Queue a request and return its id (u64, little-endian) as return data
    ///
    /// Accounts expected:
    /// 0. `[writable]` The subscription account
    /// 1. `[]` The consumer (raffle) account
    RequestRandomWords(RandomnessRequest),
}

/// The boundary to the randomness oracle. A request returns its id at once;
/// the words arrive later through a separate fulfillment.
pub trait RandomnessGateway {
    fn request_randomness(&mut self, request: &RandomnessRequest) -> Result<u64, RaffleError>;
}

/// Gateway that reaches the coordinator program through CPI
pub struct CoordinatorGateway<'a, 'b> {
    pub coordinator_program: &'b AccountInfo<'a>,
    pub subscription: &'b AccountInfo<'a>,
    pub consumer: &'b AccountInfo<'a>,
}

impl<'a, 'b> RandomnessGateway for CoordinatorGateway<'a, 'b> {
    fn request_randomness(&mut self, request: &RandomnessRequest) -> Result<u64, RaffleError> {
        let instruction = request_random_words(
            self.coordinator_program.key,
            self.subscription.key,
            self.consumer.key,
            request,
        )?;

        invoke(
            &instruction,
            &[
                self.subscription.clone(),
                self.consumer.clone(),
                self.coordinator_program.clone(),
            ],
        )
        .map_err(|err| {
            msg!("Coordinator rejected randomness request: {}", err);
            RaffleError::GatewayUnavailable
        })?;

        let (program_id, data) = get_return_data().ok_or_else(|| {
            msg!("Coordinator returned no request id");
            RaffleError::GatewayUnavailable
        })?;
        if program_id != *self.coordinator_program.key {
            msg!("Return data came from {}, not the coordinator", program_id);
            return Err(RaffleError::GatewayUnavailable);
        }
        parse_request_id(&data)
    }
}

/// Build a `RequestRandomWords` instruction for the coordinator
pub fn request_random_words(
    coordinator_program: &Pubkey,
    subscription: &Pubkey,
    consumer: &Pubkey,
    request: &RandomnessRequest,
) -> Result<Instruction, RaffleError> {
    let data = CoordinatorInstruction::RequestRandomWords(*request)
        .try_to_vec()
        .map_err(|_| RaffleError::InvalidInstructionData)?;

    Ok(Instruction {
        program_id: *coordinator_program,
        accounts: vec![
            AccountMeta::new(*subscription, false),
            AccountMeta::new_readonly(*consumer, false),
        ],
        data,
    })
}

fn parse_request_id(data: &[u8]) -> Result<u64, RaffleError> {
    data.get(..8)
        .and_then(|bytes| bytes.try_into().ok())
        .map(u64::from_le_bytes)
        .ok_or_else(|| {
            msg!("Malformed request id from coordinator");
            RaffleError::GatewayUnavailable
        })
}

/// Reduce a 256-bit random word modulo the number of entrants
pub fn winner_index(word: &RandomWord, entrant_count: u64) -> Result<u64, RaffleError> {
    if entrant_count == 0 {
        return Err(RaffleError::IndexOutOfRange);
    }

    // Horner's rule from the most significant byte keeps the accumulator below 2^72
    let modulus = entrant_count as u128;
    let index = word
        .iter()
        .rev()
        .fold(0u128, |acc, byte| ((acc << 8) | *byte as u128) % modulus);
    Ok(index as u64)
}

/// Widen a u64 seed into a random word
pub fn random_word_from_u64(value: u64) -> RandomWord {
    let mut word = [0u8; 32];
    word[..8].copy_from_slice(&value.to_le_bytes());
    word
}

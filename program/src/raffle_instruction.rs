use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};
use std::convert::TryInto;

use crate::raffle_error::RaffleError;
use crate::raffle_state::RaffleConfig;
use crate::vrf::RandomWord;

#[derive(Clone, Debug, PartialEq)]
pub enum RaffleInstruction {
    /// Create the raffle account and open the first round
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The deployer, pays for the raffle account
    /// 1. `[writable]` The raffle account (PDA)
    /// 2. `[]` The randomness coordinator program
    /// 3. `[]` The coordinator subscription account
    /// 4. `[]` The oracle authority allowed to fulfill randomness
    /// 5. `[]` The system program
    InitializeRaffle {
        /// Lamports charged per entry
        entrance_fee: u64,
        /// Minimum round length in seconds
        interval: i64,
        /// Entrant capacity of the raffle account
        max_entrants: u32,
        /// Gas lane of the oracle
        key_hash: [u8; 32],
        request_confirmations: u16,
        callback_gas_limit: u32,
        num_words: u32,
    },

    /// Buy one entry into the current round
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The player, pays the entrance fee
    /// 1. `[writable]` The raffle account
    /// 2. `[]` The system program
    EnterRaffle {
        /// Most lamports the player is willing to pay; exactly the fee is charged
        amount: u64,
    },

    /// Report whether the round can be closed. Read-only; the answer is
    /// returned as borsh `(bool, Vec<u8>)` return data.
    ///
    /// Accounts expected:
    /// 0. `[]` The raffle account
    CheckUpkeep {
        /// Unused, kept for automation compatibility
        check_data: Vec<u8>,
    },

    /// Close the round and request randomness
    ///
    /// Accounts expected:
    /// 0. `[signer]` Any caller (automation agent)
    /// 1. `[writable]` The raffle account
    /// 2. `[]` The randomness coordinator program
    /// 3. `[writable]` The coordinator subscription account
    PerformUpkeep {
        /// Unused, kept for automation compatibility
        perform_data: Vec<u8>,
    },

    /// Deliver randomness for the outstanding request, pay the winner and reopen
    ///
    /// Accounts expected:
    /// 0. `[signer]` The oracle authority
    /// 1. `[writable]` The raffle account
    /// 2. `[writable]` The winning entrant
    FulfillRandomWords {
        request_id: u64,
        random_words: Vec<RandomWord>,
    },
}

impl RaffleInstruction {
    /// Unpacks a byte buffer into a RaffleInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (tag, rest) = input.split_first().ok_or(RaffleError::InvalidInstructionData)?;

        Ok(match tag {
            0 => {
                let (entrance_fee, rest) = Self::unpack_u64(rest)?;
                let (interval, rest) = Self::unpack_i64(rest)?;
                let (max_entrants, rest) = Self::unpack_u32(rest)?;
                let (key_hash, rest) = Self::unpack_fixed_bytes::<32>(rest)?;
                let (request_confirmations, rest) = Self::unpack_u16(rest)?;
                let (callback_gas_limit, rest) = Self::unpack_u32(rest)?;
                let (num_words, _) = Self::unpack_u32(rest)?;
                Self::InitializeRaffle {
                    entrance_fee,
                    interval,
                    max_entrants,
                    key_hash,
                    request_confirmations,
                    callback_gas_limit,
                    num_words,
                }
            }
            1 => {
                let (amount, _) = Self::unpack_u64(rest)?;
                Self::EnterRaffle { amount }
            }
            2 => {
                let (check_data, _) = Self::unpack_bytes(rest)?;
                Self::CheckUpkeep { check_data }
            }
            3 => {
                let (perform_data, _) = Self::unpack_bytes(rest)?;
                Self::PerformUpkeep { perform_data }
            }
            4 => {
                let (request_id, rest) = Self::unpack_u64(rest)?;
                let (count, mut rest) = Self::unpack_u32(rest)?;
                let mut random_words = Vec::new();
                for _ in 0..count {
                    let (word, next) = Self::unpack_fixed_bytes::<32>(rest)?;
                    random_words.push(word);
                    rest = next;
                }
                Self::FulfillRandomWords {
                    request_id,
                    random_words,
                }
            }
            _ => return Err(RaffleError::InvalidInstructionData.into()),
        })
    }

    /// Packs a RaffleInstruction into a byte buffer
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            Self::InitializeRaffle {
                entrance_fee,
                interval,
                max_entrants,
                key_hash,
                request_confirmations,
                callback_gas_limit,
                num_words,
            } => {
                buf.push(0);
                buf.extend_from_slice(&entrance_fee.to_le_bytes());
                buf.extend_from_slice(&interval.to_le_bytes());
                buf.extend_from_slice(&max_entrants.to_le_bytes());
                buf.extend_from_slice(key_hash);
                buf.extend_from_slice(&request_confirmations.to_le_bytes());
                buf.extend_from_slice(&callback_gas_limit.to_le_bytes());
                buf.extend_from_slice(&num_words.to_le_bytes());
            }
            Self::EnterRaffle { amount } => {
                buf.push(1);
                buf.extend_from_slice(&amount.to_le_bytes());
            }
            Self::CheckUpkeep { check_data } => {
                buf.push(2);
                Self::pack_bytes(&mut buf, check_data);
            }
            Self::PerformUpkeep { perform_data } => {
                buf.push(3);
                Self::pack_bytes(&mut buf, perform_data);
            }
            Self::FulfillRandomWords {
                request_id,
                random_words,
            } => {
                buf.push(4);
                buf.extend_from_slice(&request_id.to_le_bytes());
                buf.extend_from_slice(&(random_words.len() as u32).to_le_bytes());
                for word in random_words {
                    buf.extend_from_slice(word);
                }
            }
        }
        buf
    }

    fn unpack_fixed_bytes<const N: usize>(input: &[u8]) -> Result<([u8; N], &[u8]), ProgramError> {
        if input.len() < N {
            return Err(RaffleError::InvalidInstructionData.into());
        }
        let (bytes, rest) = input.split_at(N);
        let bytes = bytes
            .try_into()
            .map_err(|_| ProgramError::from(RaffleError::InvalidInstructionData))?;
        Ok((bytes, rest))
    }

    fn unpack_u64(input: &[u8]) -> Result<(u64, &[u8]), ProgramError> {
        let (bytes, rest) = Self::unpack_fixed_bytes::<8>(input)?;
        Ok((u64::from_le_bytes(bytes), rest))
    }

    fn unpack_i64(input: &[u8]) -> Result<(i64, &[u8]), ProgramError> {
        let (bytes, rest) = Self::unpack_fixed_bytes::<8>(input)?;
        Ok((i64::from_le_bytes(bytes), rest))
    }

    fn unpack_u32(input: &[u8]) -> Result<(u32, &[u8]), ProgramError> {
        let (bytes, rest) = Self::unpack_fixed_bytes::<4>(input)?;
        Ok((u32::from_le_bytes(bytes), rest))
    }

    fn unpack_u16(input: &[u8]) -> Result<(u16, &[u8]), ProgramError> {
        let (bytes, rest) = Self::unpack_fixed_bytes::<2>(input)?;
        Ok((u16::from_le_bytes(bytes), rest))
    }

    fn unpack_bytes(input: &[u8]) -> Result<(Vec<u8>, &[u8]), ProgramError> {
        let (len, rest) = Self::unpack_u32(input)?;
        let len = len as usize;
        if rest.len() < len {
            return Err(RaffleError::InvalidInstructionData.into());
        }
        let (bytes, rest) = rest.split_at(len);
        Ok((bytes.to_vec(), rest))
    }

    fn pack_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
        buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        buf.extend_from_slice(bytes);
    }
}

/// Create initialize_raffle instruction
#[allow(clippy::too_many_arguments)]
pub fn initialize_raffle(
    program_id: &Pubkey,
    deployer: &Pubkey,
    raffle_account: &Pubkey,
    coordinator_program: &Pubkey,
    subscription: &Pubkey,
    oracle_authority: &Pubkey,
    entrance_fee: u64,
    interval: i64,
    max_entrants: u32,
    key_hash: [u8; 32],
    request_confirmations: u16,
    callback_gas_limit: u32,
    num_words: u32,
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::InitializeRaffle {
        entrance_fee,
        interval,
        max_entrants,
        key_hash,
        request_confirmations,
        callback_gas_limit,
        num_words,
    }
    .pack();

    let accounts = vec![
        AccountMeta::new(*deployer, true),
        AccountMeta::new(*raffle_account, false),
        AccountMeta::new_readonly(*coordinator_program, false),
        AccountMeta::new_readonly(*subscription, false),
        AccountMeta::new_readonly(*oracle_authority, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create initialize_raffle instruction from a prepared configuration
pub fn initialize_raffle_with_config(
    program_id: &Pubkey,
    deployer: &Pubkey,
    raffle_account: &Pubkey,
    config: &RaffleConfig,
) -> Result<Instruction, ProgramError> {
    initialize_raffle(
        program_id,
        deployer,
        raffle_account,
        &config.vrf.coordinator,
        &config.vrf.subscription,
        &config.vrf.oracle_authority,
        config.entrance_fee,
        config.interval,
        config.max_entrants,
        config.vrf.key_hash,
        config.vrf.request_confirmations,
        config.vrf.callback_gas_limit,
        config.vrf.num_words,
    )
}

/// Create initialize_raffle instruction with the default fee, interval and oracle settings
pub fn initialize_default_raffle(
    program_id: &Pubkey,
    deployer: &Pubkey,
    raffle_account: &Pubkey,
    coordinator_program: &Pubkey,
    subscription: &Pubkey,
    oracle_authority: &Pubkey,
) -> Result<Instruction, ProgramError> {
    let config = RaffleConfig::with_defaults(*coordinator_program, *subscription, *oracle_authority);
    initialize_raffle_with_config(program_id, deployer, raffle_account, &config)
}

/// Create enter_raffle instruction
pub fn enter_raffle(
    program_id: &Pubkey,
    player: &Pubkey,
    raffle_account: &Pubkey,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::EnterRaffle { amount }.pack();

    let accounts = vec![
        AccountMeta::new(*player, true),
        AccountMeta::new(*raffle_account, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create check_upkeep instruction
pub fn check_upkeep(
    program_id: &Pubkey,
    raffle_account: &Pubkey,
    check_data: Vec<u8>,
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::CheckUpkeep { check_data }.pack();

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![AccountMeta::new_readonly(*raffle_account, false)],
        data,
    })
}

/// Create perform_upkeep instruction
pub fn perform_upkeep(
    program_id: &Pubkey,
    caller: &Pubkey,
    raffle_account: &Pubkey,
    coordinator_program: &Pubkey,
    subscription: &Pubkey,
    perform_data: Vec<u8>,
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::PerformUpkeep { perform_data }.pack();

    let accounts = vec![
        AccountMeta::new_readonly(*caller, true),
        AccountMeta::new(*raffle_account, false),
        AccountMeta::new_readonly(*coordinator_program, false),
        AccountMeta::new(*subscription, false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create fulfill_random_words instruction
pub fn fulfill_random_words(
    program_id: &Pubkey,
    oracle_authority: &Pubkey,
    raffle_account: &Pubkey,
    winner: &Pubkey,
    request_id: u64,
    random_words: Vec<RandomWord>,
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::FulfillRandomWords {
        request_id,
        random_words,
    }
    .pack();

    let accounts = vec![
        AccountMeta::new_readonly(*oracle_authority, true),
        AccountMeta::new(*raffle_account, false),
        AccountMeta::new(*winner, false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DEFAULT_ENTRANCE_FEE, DEFAULT_INTERVAL, DEFAULT_KEY_HASH};

    #[test]
    fn default_raffle_carries_default_settings() {
        let coordinator = Pubkey::new_unique();
        let subscription = Pubkey::new_unique();
        let oracle = Pubkey::new_unique();
        let ix = initialize_default_raffle(
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &coordinator,
            &subscription,
            &oracle,
        )
        .unwrap();

        assert_eq!(ix.accounts[2].pubkey, coordinator);
        assert_eq!(ix.accounts[3].pubkey, subscription);
        assert_eq!(ix.accounts[4].pubkey, oracle);
        match RaffleInstruction::unpack(&ix.data).unwrap() {
            RaffleInstruction::InitializeRaffle {
                entrance_fee,
                interval,
                key_hash,
                num_words,
                ..
            } => {
                assert_eq!(entrance_fee, DEFAULT_ENTRANCE_FEE);
                assert_eq!(interval, DEFAULT_INTERVAL);
                assert_eq!(key_hash, DEFAULT_KEY_HASH);
                assert_eq!(num_words, 1);
            }
            other => panic!("unexpected instruction {:?}", other),
        }
    }

    #[test]
    fn fulfill_layout() {
        let ix = RaffleInstruction::FulfillRandomWords {
            request_id: 7,
            random_words: vec![[1u8; 32]],
        };
        let packed = ix.pack();
        assert_eq!(packed.len(), 1 + 8 + 4 + 32);
        assert_eq!(packed[0], 4);
        assert_eq!(RaffleInstruction::unpack(&packed).unwrap(), ix);
    }

    #[test]
    fn initialize_carries_every_parameter() {
        let ix = RaffleInstruction::InitializeRaffle {
            entrance_fee: 10_000_000,
            interval: 30,
            max_entrants: 100,
            key_hash: [7u8; 32],
            request_confirmations: 3,
            callback_gas_limit: 500_000,
            num_words: 1,
        };
        assert_eq!(RaffleInstruction::unpack(&ix.pack()).unwrap(), ix);
    }

    #[test]
    fn truncated_data_is_rejected() {
        let invalid = Err(ProgramError::from(RaffleError::InvalidInstructionData));
        assert_eq!(RaffleInstruction::unpack(&[]), invalid);
        assert_eq!(RaffleInstruction::unpack(&[1, 0, 0]), invalid);
        assert_eq!(RaffleInstruction::unpack(&[9]), invalid);
        // claims one word but carries none
        let mut data = vec![4];
        data.extend_from_slice(&1u64.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        assert_eq!(RaffleInstruction::unpack(&data), invalid);
        // opaque data shorter than its length prefix
        assert_eq!(RaffleInstruction::unpack(&[3, 5, 0, 0, 0, 1]), invalid);
    }
}

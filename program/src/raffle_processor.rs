use crate::constants::RAFFLE_SEED;
use crate::machine::PrizeTransfer;
use crate::raffle_error::RaffleError;
use crate::raffle_instruction::RaffleInstruction;
use crate::raffle_state::{Raffle, RaffleConfig, VrfConfig};
use crate::utils;
use crate::vrf::{CoordinatorGateway, RandomWord};

use borsh::BorshSerialize;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed, set_return_data},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_instruction,
    system_program,
    sysvar::{clock::Clock, rent::Rent, Sysvar},
};

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = RaffleInstruction::unpack(instruction_data)?;

        match instruction {
            RaffleInstruction::InitializeRaffle {
                entrance_fee,
                interval,
                max_entrants,
                key_hash,
                request_confirmations,
                callback_gas_limit,
                num_words,
            } => {
                msg!("Instruction: Initialize Raffle");
                Self::process_initialize_raffle(
                    accounts,
                    entrance_fee,
                    interval,
                    max_entrants,
                    key_hash,
                    request_confirmations,
                    callback_gas_limit,
                    num_words,
                    program_id,
                )
            }
            RaffleInstruction::EnterRaffle { amount } => {
                msg!("Instruction: Enter Raffle");
                Self::process_enter_raffle(accounts, amount, program_id)
            }
            RaffleInstruction::CheckUpkeep { .. } => {
                msg!("Instruction: Check Upkeep");
                Self::process_check_upkeep(accounts, program_id)
            }
            RaffleInstruction::PerformUpkeep { .. } => {
                msg!("Instruction: Perform Upkeep");
                Self::process_perform_upkeep(accounts, program_id)
            }
            RaffleInstruction::FulfillRandomWords {
                request_id,
                random_words,
            } => {
                msg!("Instruction: Fulfill Random Words");
                Self::process_fulfill_random_words(accounts, request_id, &random_words, program_id)
            }
        }
    }

    /// Create the raffle PDA and open the first round.
    /// Called once when the program is deployed.
    #[allow(clippy::too_many_arguments)]
    fn process_initialize_raffle(
        accounts: &[AccountInfo],
        entrance_fee: u64,
        interval: i64,
        max_entrants: u32,
        key_hash: [u8; 32],
        request_confirmations: u16,
        callback_gas_limit: u32,
        num_words: u32,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let deployer_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;
        let subscription_info = next_account_info(account_info_iter)?;
        let oracle_authority_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        // Verify the deployer signed the transaction
        if !deployer_info.is_signer {
            msg!("Deployer must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        // Find the PDA for the raffle account
        let (expected_raffle_pubkey, bump_seed) = utils::find_raffle_address(program_id);
        if *raffle_info.key != expected_raffle_pubkey {
            msg!("Invalid raffle account address");
            return Err(ProgramError::InvalidSeeds);
        }

        // Refuse to initialize twice
        if raffle_info.owner == program_id {
            msg!("Raffle account is already initialized");
            return Err(RaffleError::AlreadyInitialized.into());
        }

        // Build and validate the configuration before creating anything
        let config = RaffleConfig {
            entrance_fee,
            interval,
            max_entrants,
            vrf: VrfConfig {
                coordinator: *coordinator_info.key,
                subscription: *subscription_info.key,
                oracle_authority: *oracle_authority_info.key,
                key_hash,
                request_confirmations,
                callback_gas_limit,
                num_words,
            },
        };

        let now = Clock::get()?.unix_timestamp;
        let raffle_data = Raffle::new(config, bump_seed, now)?;

        // Create the raffle account sized for the entrant capacity
        let space = Raffle::space(max_entrants);
        let rent_lamports = Rent::get()?.minimum_balance(space);
        invoke_signed(
            &system_instruction::create_account(
                deployer_info.key,
                raffle_info.key,
                rent_lamports,
                space as u64,
                program_id,
            ),
            &[deployer_info.clone(), raffle_info.clone(), system_program_info.clone()],
            &[&[RAFFLE_SEED, &[bump_seed]]],
        )?;

        raffle_data.pack(&mut raffle_info.data.borrow_mut())?;

        msg!(
            "Raffle initialized: EntranceFee={} SOL, Interval={}s, MaxEntrants={}, Coordinator={}",
            utils::lamports_to_sol(entrance_fee),
            interval,
            max_entrants,
            coordinator_info.key
        );
        Ok(())
    }

    fn process_enter_raffle(
        accounts: &[AccountInfo],
        amount: u64,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let player_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        // Ensure the player signed the transaction
        if !player_info.is_signer {
            msg!("Player must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        // Record the entry (checks payment, round state and capacity)
        let mut raffle_data = Self::load_raffle(raffle_info, program_id)?;
        let event = raffle_data.enter(*player_info.key, amount)?;
        let fee = raffle_data.entrance_fee();

        msg!("Transferring entrance fee of {} lamports to the raffle pool", fee);
        // Move exactly the entrance fee into the pool
        invoke(
            &system_instruction::transfer(player_info.key, raffle_info.key, fee),
            &[
                player_info.clone(),
                raffle_info.clone(),
                system_program_info.clone(),
            ],
        )?;

        // Save the raffle data
        raffle_data.pack(&mut raffle_info.data.borrow_mut())?;
        event.emit();
        msg!(
            "Raffle now holds {} entries, pool {} lamports",
            raffle_data.number_of_players(),
            raffle_data.pool_balance()
        );
        Ok(())
    }

    /// Read-only: answers through return data and never writes the account
    fn process_check_upkeep(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let raffle_info = next_account_info(account_info_iter)?;

        // Get the current time from the clock
        let raffle_data = Self::load_raffle(raffle_info, program_id)?;
        let now = Clock::get()?.unix_timestamp;
        let check = raffle_data.check_upkeep(now);

        msg!(
            "Upkeep needed: {} (state={:?}, entrants={}, balance={}, elapsed={}s)",
            check.upkeep_needed,
            check.raffle_state,
            check.entrant_count,
            check.pool_balance,
            check.elapsed
        );

        // No perform data is needed to close the round
        let perform_data: Vec<u8> = Vec::new();
        let response = (check.upkeep_needed, perform_data)
            .try_to_vec()
            .map_err(|_| ProgramError::InvalidAccountData)?;
        set_return_data(&response);
        Ok(())
    }

    /// Close the round and request randomness from the coordinator
    fn process_perform_upkeep(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let caller_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;
        let subscription_info = next_account_info(account_info_iter)?;

        // Anyone may close a due round, but they must sign
        if !caller_info.is_signer {
            msg!("Upkeep caller must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut raffle_data = Self::load_raffle(raffle_info, program_id)?;

        // The coordinator and subscription must be the configured ones
        if *coordinator_info.key != raffle_data.coordinator() {
            msg!("Coordinator program does not match the raffle configuration");
            return Err(ProgramError::IncorrectProgramId);
        }
        if *subscription_info.key != raffle_data.subscription() {
            msg!("Subscription account does not match the raffle configuration");
            return Err(ProgramError::InvalidArgument);
        }

        // Close the round and request randomness
        let now = Clock::get()?.unix_timestamp;
        let mut gateway = CoordinatorGateway {
            coordinator_program: coordinator_info,
            subscription: subscription_info,
            consumer: raffle_info,
        };
        let event = raffle_data.perform_upkeep(&mut gateway, now)?;

        // Save the raffle data
        raffle_data.pack(&mut raffle_info.data.borrow_mut())?;
        event.emit();
        Ok(())
    }

    /// Oracle callback: pick the winner, reset the round, then pay the prize
    fn process_fulfill_random_words(
        accounts: &[AccountInfo],
        request_id: u64,
        random_words: &[RandomWord],
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let oracle_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let winner_info = next_account_info(account_info_iter)?;

        let mut raffle_data = Self::load_raffle(raffle_info, program_id)?;

        // Only the oracle authority delivers randomness
        if !oracle_info.is_signer || *oracle_info.key != raffle_data.oracle_authority() {
            msg!("Only the oracle authority {} can fulfill randomness", raffle_data.oracle_authority());
            return Err(RaffleError::UnauthorizedFulfiller.into());
        }

        // The winner account must be the entrant the random word selects
        let (_, expected_winner) = raffle_data.preview_winner(request_id, random_words)?;
        if *winner_info.key != expected_winner {
            msg!("Winner account {} is not the selected entrant {}", winner_info.key, expected_winner);
            return Err(RaffleError::WinnerAccountMismatch.into());
        }

        // Pick the winner, reset the round and pay out
        let now = Clock::get()?.unix_timestamp;
        let mut payout = LamportPayout {
            raffle: raffle_info,
            winner: winner_info,
            rent: Rent::get()?,
        };
        let event = raffle_data.fulfill_random_words(request_id, random_words, now, &mut payout)?;

        // Save the raffle data
        raffle_data.pack(&mut raffle_info.data.borrow_mut())?;
        event.emit();
        Ok(())
    }

    /// Load the raffle account after checking ownership and address
    fn load_raffle(raffle_info: &AccountInfo, program_id: &Pubkey) -> Result<Raffle, ProgramError> {
        // Check that the raffle account is owned by our program
        if raffle_info.owner != program_id {
            msg!("Raffle account must be owned by this program");
            return Err(ProgramError::IncorrectProgramId);
        }
        let raffle_data = Raffle::unpack(&raffle_info.data.borrow())?;
        utils::assert_raffle_address(program_id, raffle_info.key, raffle_data.bump)?;
        Ok(raffle_data)
    }
}

/// Pays the prize straight out of the raffle account's lamports
struct LamportPayout<'a, 'b> {
    raffle: &'b AccountInfo<'a>,
    winner: &'b AccountInfo<'a>,
    rent: Rent,
}

impl<'a, 'b> PrizeTransfer for LamportPayout<'a, 'b> {
    fn transfer_prize(&mut self, winner: &Pubkey, amount: u64) -> Result<(), RaffleError> {
        if self.winner.key != winner {
            return Err(RaffleError::WinnerAccountMismatch);
        }
        // Executable or read-only accounts cannot be credited
        if !self.winner.is_writable || self.winner.executable {
            msg!("Winner account cannot receive lamports");
            return Err(RaffleError::PayoutFailed);
        }

        // The raffle keeps its rent-exempt reserve
        let reserve = self.rent.minimum_balance(self.raffle.data_len());
        let raffle_remaining = self
            .raffle
            .lamports()
            .checked_sub(amount)
            .filter(|remaining| *remaining >= reserve)
            .ok_or_else(|| {
                msg!("Raffle account cannot cover a prize of {} lamports", amount);
                RaffleError::PayoutFailed
            })?;
        let winner_total = self
            .winner
            .lamports()
            .checked_add(amount)
            .ok_or(RaffleError::ArithmeticOverflow)?;
        // A system-owned winner must stay rent-exempt
        if self.winner.owner == &system_program::id()
            && winner_total < self.rent.minimum_balance(self.winner.data_len())
        {
            msg!("Prize would leave the winner below its rent-exempt minimum");
            return Err(RaffleError::PayoutFailed);
        }

        let mut raffle_lamports = self
            .raffle
            .try_borrow_mut_lamports()
            .map_err(|_| RaffleError::PayoutFailed)?;
        let mut winner_lamports = self
            .winner
            .try_borrow_mut_lamports()
            .map_err(|_| RaffleError::PayoutFailed)?;
        // Move the prize
        **raffle_lamports = raffle_remaining;
        **winner_lamports = winner_total;

        msg!("Paid {} lamports to {}", amount, winner);
        Ok(())
    }
}

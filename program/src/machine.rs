// Round state machine: entry, upkeep and randomness fulfillment
use solana_program::{clock::UnixTimestamp, msg, pubkey::Pubkey};

use crate::events::RaffleEvent;
use crate::raffle_error::RaffleError;
use crate::raffle_state::{Raffle, RaffleState};
use crate::upkeep::UpkeepCheck;
use crate::vrf::{self, RandomWord, RandomnessGateway};

/// Moves the prize to the winner once the round has been reset
pub trait PrizeTransfer {
    fn transfer_prize(&mut self, winner: &Pubkey, amount: u64) -> Result<(), RaffleError>;
}

impl Raffle {
    /// Record one entry for `player`, charging exactly the entrance fee.
    /// `payment` is what the player offered.
    pub fn enter(&mut self, player: Pubkey, payment: u64) -> Result<RaffleEvent, RaffleError> {
        let fee = self.config.entrance_fee;
        if payment < fee {
            msg!("Payment of {} lamports is below the entrance fee of {}", payment, fee);
            return Err(RaffleError::InsufficientPayment);
        }
        if self.state != RaffleState::Open {
            msg!("Raffle is calculating a winner, entries are closed");
            return Err(RaffleError::RoundNotOpen);
        }
        if self.ledger.count() >= self.config.max_entrants as u64 {
            msg!("Raffle is full ({} entrants)", self.config.max_entrants);
            return Err(RaffleError::EntrantCapacityReached);
        }

        self.ledger.add_entrant(player, fee)?;
        Ok(RaffleEvent::RaffleEnter { player, fee })
    }

    pub fn check_upkeep(&self, now: UnixTimestamp) -> UpkeepCheck {
        UpkeepCheck::evaluate(
            self.state,
            self.ledger.count(),
            self.ledger.balance(),
            self.clock.elapsed(now),
            self.config.interval,
        )
    }

    /// Close entry and ask the gateway for randomness. On gateway failure the
    /// raffle is left open with no request recorded.
    pub fn perform_upkeep<G: RandomnessGateway>(
        &mut self,
        gateway: &mut G,
        now: UnixTimestamp,
    ) -> Result<RaffleEvent, RaffleError> {
        let check = self.check_upkeep(now);
        if !check.upkeep_needed {
            let err = check.not_needed();
            msg!("{}", err);
            return Err(err);
        }

        self.state = RaffleState::Calculating;
        let request = self.randomness_request();
        match gateway.request_randomness(&request) {
            Ok(request_id) => {
                self.outstanding_request_id = Some(request_id);
                Ok(RaffleEvent::RequestedRaffleWinner { request_id })
            }
            Err(err) => {
                self.state = RaffleState::Open;
                Err(err)
            }
        }
    }

    /// Validate a fulfillment and return the entrant it selects, without mutating.
    pub fn preview_winner(
        &self,
        request_id: u64,
        random_words: &[RandomWord],
    ) -> Result<(u64, Pubkey), RaffleError> {
        if self.state != RaffleState::Calculating || self.outstanding_request_id != Some(request_id) {
            msg!(
                "Request {} does not match the outstanding request {:?}",
                request_id,
                self.outstanding_request_id
            );
            return Err(RaffleError::UnrecognizedRequest);
        }
        if random_words.len() != self.config.vrf.num_words as usize {
            msg!(
                "Expected {} random words, got {}",
                self.config.vrf.num_words,
                random_words.len()
            );
            return Err(RaffleError::InvalidRandomWords);
        }

        let index = vrf::winner_index(&random_words[0], self.ledger.count())?;
        let winner = *self.ledger.entrant_at(index)?;
        Ok((index, winner))
    }

    /// Pick the winner, reset the round, then pay out. A failed payout restores
    /// the calculating round exactly as it was.
    pub fn fulfill_random_words<T: PrizeTransfer>(
        &mut self,
        request_id: u64,
        random_words: &[RandomWord],
        now: UnixTimestamp,
        transfer: &mut T,
    ) -> Result<RaffleEvent, RaffleError> {
        let (index, winner) = self.preview_winner(request_id, random_words)?;
        msg!("Random winner index: {}", index);

        let previous_clock = self.clock;
        let previous_winner = self.recent_winner;
        let previous_ledger = self.ledger.reset();
        let prize = previous_ledger.balance();
        let round = self
            .completed_rounds
            .checked_add(1)
            .ok_or(RaffleError::ArithmeticOverflow)?;

        self.clock.restart(now);
        self.state = RaffleState::Open;
        self.outstanding_request_id = None;
        self.recent_winner = Some(winner);
        self.completed_rounds = round;

        if let Err(err) = transfer.transfer_prize(&winner, prize) {
            msg!("Payout of {} lamports to {} failed: {}", prize, winner, err);
            self.ledger = previous_ledger;
            self.clock = previous_clock;
            self.state = RaffleState::Calculating;
            self.outstanding_request_id = Some(request_id);
            self.recent_winner = previous_winner;
            self.completed_rounds = round - 1;
            return Err(RaffleError::PayoutFailed);
        }

        Ok(RaffleEvent::WinnerPicked { winner, prize, round })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raffle_state::RaffleConfig;
    use crate::vrf::{random_word_from_u64, RandomnessRequest};

    const START: UnixTimestamp = 1_700_000_000;

    #[derive(Default)]
    struct MockGateway {
        requests: Vec<RandomnessRequest>,
        next_id: u64,
        unavailable: bool,
    }

    impl RandomnessGateway for MockGateway {
        fn request_randomness(&mut self, request: &RandomnessRequest) -> Result<u64, RaffleError> {
            if self.unavailable {
                return Err(RaffleError::GatewayUnavailable);
            }
            self.requests.push(*request);
            self.next_id += 1;
            Ok(self.next_id)
        }
    }

    #[derive(Default)]
    struct MockPayout {
        paid: Vec<(Pubkey, u64)>,
        refuse: bool,
    }

    impl PrizeTransfer for MockPayout {
        fn transfer_prize(&mut self, winner: &Pubkey, amount: u64) -> Result<(), RaffleError> {
            if self.refuse {
                return Err(RaffleError::PayoutFailed);
            }
            self.paid.push((*winner, amount));
            Ok(())
        }
    }

    fn raffle(entrance_fee: u64, interval: i64) -> Raffle {
        let config = RaffleConfig {
            entrance_fee,
            interval,
            ..RaffleConfig::with_defaults(Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique())
        };
        Raffle::new(config, 255, START).unwrap()
    }

    fn calculating(entrants: &[Pubkey], gateway: &mut MockGateway) -> (Raffle, u64) {
        let mut raffle = raffle(10, 30);
        for entrant in entrants {
            raffle.enter(*entrant, 10).unwrap();
        }
        raffle.perform_upkeep(gateway, START + 31).unwrap();
        let request_id = raffle.outstanding_request_id().unwrap();
        (raffle, request_id)
    }

    #[test]
    fn entries_keep_pool_at_fee_times_count() {
        let mut raffle = raffle(10, 30);
        let player = Pubkey::new_unique();
        for n in 1..=5u64 {
            let event = raffle.enter(player, 10).unwrap();
            assert_eq!(event, RaffleEvent::RaffleEnter { player, fee: 10 });
            assert_eq!(raffle.pool_balance(), 10 * n);
            assert_eq!(raffle.number_of_players(), n);
        }
    }

    #[test]
    fn overpayment_is_charged_the_fee_only() {
        let mut raffle = raffle(10, 30);
        raffle.enter(Pubkey::new_unique(), 25).unwrap();
        assert_eq!(raffle.pool_balance(), 10);
    }

    #[test]
    fn underpayment_is_rejected() {
        let mut raffle = raffle(10, 30);
        assert_eq!(raffle.enter(Pubkey::new_unique(), 9), Err(RaffleError::InsufficientPayment));
        assert_eq!(raffle.number_of_players(), 0);
        assert_eq!(raffle.pool_balance(), 0);
    }

    #[test]
    fn entries_stop_at_capacity() {
        let mut raffle = raffle(10, 30);
        raffle.config.max_entrants = 2;
        raffle.enter(Pubkey::new_unique(), 10).unwrap();
        raffle.enter(Pubkey::new_unique(), 10).unwrap();
        assert_eq!(
            raffle.enter(Pubkey::new_unique(), 10),
            Err(RaffleError::EntrantCapacityReached)
        );
        assert_eq!(raffle.pool_balance(), 20);
    }

    #[test]
    fn single_entrant_round_end_to_end() {
        // fee 1, interval 30s, one entry at t=0
        let mut raffle = raffle(1, 30);
        let mut gateway = MockGateway::default();
        let player = Pubkey::new_unique();
        raffle.enter(player, 1).unwrap();
        assert_eq!(raffle.pool_balance(), 1);
        assert_eq!(raffle.number_of_players(), 1);

        assert!(!raffle.check_upkeep(START + 29).upkeep_needed);
        assert!(raffle.check_upkeep(START + 31).upkeep_needed);

        let event = raffle.perform_upkeep(&mut gateway, START + 31).unwrap();
        let request_id = raffle.outstanding_request_id().unwrap();
        assert_eq!(event, RaffleEvent::RequestedRaffleWinner { request_id });
        assert_eq!(raffle.raffle_state(), RaffleState::Calculating);
        assert_eq!(gateway.requests, vec![raffle.randomness_request()]);

        let mut payout = MockPayout::default();
        let event = raffle
            .fulfill_random_words(request_id, &[random_word_from_u64(7)], START + 40, &mut payout)
            .unwrap();
        assert_eq!(event, RaffleEvent::WinnerPicked { winner: player, prize: 1, round: 1 });
        assert_eq!(payout.paid, vec![(player, 1)]);
        assert_eq!(raffle.raffle_state(), RaffleState::Open);
        assert_eq!(raffle.number_of_players(), 0);
        assert_eq!(raffle.pool_balance(), 0);
        assert_eq!(raffle.last_timestamp(), START + 40);
        assert_eq!(raffle.outstanding_request_id(), None);
        assert_eq!(raffle.recent_winner(), Some(player));
        assert!(!raffle.check_upkeep(START + 40).upkeep_needed);
    }

    #[test]
    fn perform_without_need_changes_nothing() {
        let mut raffle = raffle(10, 30);
        let mut gateway = MockGateway::default();
        let before = raffle.clone();

        let err = raffle.perform_upkeep(&mut gateway, START + 100).unwrap_err();
        assert_eq!(
            err,
            RaffleError::UpkeepNotNeeded {
                raffle_state: RaffleState::Open,
                entrant_count: 0,
                pool_balance: 0,
                elapsed: 100,
            }
        );
        assert_eq!(raffle, before);
        assert!(gateway.requests.is_empty());
    }

    #[test]
    fn second_perform_is_rejected_without_new_request() {
        let mut gateway = MockGateway::default();
        let (mut raffle, request_id) = calculating(&[Pubkey::new_unique()], &mut gateway);
        let before = raffle.clone();

        let err = raffle.perform_upkeep(&mut gateway, START + 500).unwrap_err();
        assert!(matches!(
            err,
            RaffleError::UpkeepNotNeeded { raffle_state: RaffleState::Calculating, .. }
        ));
        assert_eq!(gateway.requests.len(), 1);
        assert_eq!(raffle, before);
        assert_eq!(raffle.outstanding_request_id(), Some(request_id));
    }

    #[test]
    fn gateway_failure_rolls_back_to_open() {
        let mut raffle = raffle(10, 30);
        raffle.enter(Pubkey::new_unique(), 10).unwrap();
        let before = raffle.clone();
        let mut gateway = MockGateway { unavailable: true, ..MockGateway::default() };

        assert_eq!(
            raffle.perform_upkeep(&mut gateway, START + 31),
            Err(RaffleError::GatewayUnavailable)
        );
        assert_eq!(raffle, before);
        assert_eq!(raffle.raffle_state(), RaffleState::Open);

        gateway.unavailable = false;
        raffle.perform_upkeep(&mut gateway, START + 32).unwrap();
        assert_eq!(raffle.raffle_state(), RaffleState::Calculating);
    }

    #[test]
    fn enter_while_calculating_is_rejected() {
        let mut gateway = MockGateway::default();
        let (mut raffle, _) = calculating(&[Pubkey::new_unique()], &mut gateway);

        assert_eq!(raffle.enter(Pubkey::new_unique(), 10), Err(RaffleError::RoundNotOpen));
        assert_eq!(raffle.number_of_players(), 1);
        assert_eq!(raffle.pool_balance(), 10);
    }

    #[test]
    fn mismatched_request_is_rejected() {
        let mut gateway = MockGateway::default();
        let (mut raffle, request_id) = calculating(&[Pubkey::new_unique()], &mut gateway);
        let before = raffle.clone();
        let mut payout = MockPayout::default();

        assert_eq!(
            raffle.fulfill_random_words(request_id + 1, &[random_word_from_u64(7)], START + 40, &mut payout),
            Err(RaffleError::UnrecognizedRequest)
        );
        assert_eq!(raffle, before);
        assert!(payout.paid.is_empty());
    }

    #[test]
    fn fulfillment_while_open_is_rejected() {
        let mut raffle = raffle(10, 30);
        raffle.enter(Pubkey::new_unique(), 10).unwrap();
        let mut payout = MockPayout::default();

        assert_eq!(
            raffle.fulfill_random_words(1, &[random_word_from_u64(1)], START + 40, &mut payout),
            Err(RaffleError::UnrecognizedRequest)
        );
    }

    #[test]
    fn duplicate_fulfillment_pays_once() {
        let mut gateway = MockGateway::default();
        let entrants = [Pubkey::new_unique(), Pubkey::new_unique()];
        let (mut raffle, request_id) = calculating(&entrants, &mut gateway);
        let mut payout = MockPayout::default();
        let words = [random_word_from_u64(3)];

        raffle.fulfill_random_words(request_id, &words, START + 40, &mut payout).unwrap();
        assert_eq!(
            raffle.fulfill_random_words(request_id, &words, START + 41, &mut payout),
            Err(RaffleError::UnrecognizedRequest)
        );
        assert_eq!(payout.paid, vec![(entrants[1], 20)]);
    }

    #[test]
    fn winner_is_seed_mod_entrant_count() {
        let mut gateway = MockGateway::default();
        let entrants = [Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique()];
        let (mut raffle, request_id) = calculating(&entrants, &mut gateway);
        let mut payout = MockPayout::default();

        // 301 = 3 * 100 + 1
        let event = raffle
            .fulfill_random_words(request_id, &[random_word_from_u64(301)], START + 40, &mut payout)
            .unwrap();
        assert_eq!(event, RaffleEvent::WinnerPicked { winner: entrants[1], prize: 30, round: 1 });
    }

    #[test]
    fn wrong_word_count_is_rejected() {
        let mut gateway = MockGateway::default();
        let (mut raffle, request_id) = calculating(&[Pubkey::new_unique()], &mut gateway);
        let before = raffle.clone();
        let mut payout = MockPayout::default();

        assert_eq!(
            raffle.fulfill_random_words(request_id, &[], START + 40, &mut payout),
            Err(RaffleError::InvalidRandomWords)
        );
        assert_eq!(
            raffle.fulfill_random_words(
                request_id,
                &[random_word_from_u64(1), random_word_from_u64(2)],
                START + 40,
                &mut payout
            ),
            Err(RaffleError::InvalidRandomWords)
        );
        assert_eq!(raffle, before);
    }

    #[test]
    fn failed_payout_leaves_round_calculating() {
        let mut gateway = MockGateway::default();
        let entrants = [Pubkey::new_unique(), Pubkey::new_unique()];
        let (mut raffle, request_id) = calculating(&entrants, &mut gateway);
        let before = raffle.clone();
        let mut payout = MockPayout { refuse: true, ..MockPayout::default() };

        assert_eq!(
            raffle.fulfill_random_words(request_id, &[random_word_from_u64(0)], START + 40, &mut payout),
            Err(RaffleError::PayoutFailed)
        );
        assert_eq!(raffle, before);
        assert_eq!(raffle.raffle_state(), RaffleState::Calculating);
        assert_eq!(raffle.outstanding_request_id(), Some(request_id));
        assert_eq!(raffle.pool_balance(), 20);
    }

    #[test]
    fn consecutive_rounds() {
        let mut gateway = MockGateway::default();
        let mut raffle = raffle(10, 30);
        let mut payout = MockPayout::default();
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();

        raffle.enter(a, 10).unwrap();
        raffle.perform_upkeep(&mut gateway, START + 30).unwrap();
        let first = raffle.outstanding_request_id().unwrap();
        raffle.fulfill_random_words(first, &[random_word_from_u64(5)], START + 35, &mut payout).unwrap();

        raffle.enter(b, 10).unwrap();
        raffle.enter(b, 10).unwrap();
        assert!(!raffle.check_upkeep(START + 64).upkeep_needed);
        raffle.perform_upkeep(&mut gateway, START + 65).unwrap();
        let second = raffle.outstanding_request_id().unwrap();
        assert_ne!(first, second);

        // the stale id from round one no longer matches
        assert_eq!(
            raffle.fulfill_random_words(first, &[random_word_from_u64(5)], START + 70, &mut payout),
            Err(RaffleError::UnrecognizedRequest)
        );
        raffle.fulfill_random_words(second, &[random_word_from_u64(5)], START + 70, &mut payout).unwrap();

        assert_eq!(payout.paid, vec![(a, 10), (b, 20)]);
        assert_eq!(raffle.completed_rounds(), 2);
        assert_eq!(raffle.recent_winner(), Some(b));
    }
}

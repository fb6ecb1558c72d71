// Auto Raffle
// A time-boxed raffle that closes on upkeep and draws its winner from an external randomness oracle

pub mod constants;
pub mod events;
pub mod ledger;
pub mod machine;
pub mod round_clock;
pub mod upkeep;
pub mod utils;

// Raffle modules
pub mod raffle_entrypoint;
pub mod raffle_error;
pub mod raffle_instruction;
pub mod raffle_processor;
pub mod raffle_state;

// Randomness coordinator integration
pub mod vrf;

pub use raffle_entrypoint::process_instruction;

// Auto Raffle Program - Constants

/// Seed for the raffle PDA
pub const RAFFLE_SEED: &[u8] = b"raffle";

/// Random words requested per round
pub const NUM_WORDS: u32 = 1;

/// Hard cap on entrants per round. The raffle account is created through a
/// CPI, which can allocate at most 10 KiB.
pub const MAX_ENTRANTS_LIMIT: u32 = 300;

/// Default entrance fee: 0.01 SOL
pub const DEFAULT_ENTRANCE_FEE: u64 = 10_000_000;

/// Default round interval in seconds
pub const DEFAULT_INTERVAL: i64 = 30;

/// Default entrant capacity
pub const DEFAULT_MAX_ENTRANTS: u32 = 100;

pub const DEFAULT_CALLBACK_GAS_LIMIT: u32 = 500_000;

pub const DEFAULT_REQUEST_CONFIRMATIONS: u16 = 3;

/// Default gas lane (key hash)
/// 0x787d74caea10b2b357790d5b5247c2f63d1d91572a9846f780606e4d953677ae
pub const DEFAULT_KEY_HASH: [u8; 32] = [
    0x78, 0x7d, 0x74, 0xca, 0xea, 0x10, 0xb2, 0xb3, 0x57, 0x79, 0x0d, 0x5b, 0x52, 0x47, 0xc2, 0xf6,
    0x3d, 0x1d, 0x91, 0x57, 0x2a, 0x98, 0x46, 0xf7, 0x80, 0x60, 0x6e, 0x4d, 0x95, 0x36, 0x77, 0xae,
];

//! Environment-driven service configuration.

use parlor_types::{DEFAULT_REVEAL_DELAY_MS, INITIAL_CHIPS};

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Pause between a challenge/believe reveal and the next-turn broadcast.
    pub reveal_delay_ms: u64,
    /// Ledger balance granted to accounts on first contact.
    pub starting_balance: u64,
    /// Sustained inbound commands allowed per connection per second.
    pub commands_per_second: u32,
    /// Burst headroom on top of the sustained rate.
    pub command_burst: u32,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("PARLOR_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: read_u16("PARLOR_PORT", 9300),
            reveal_delay_ms: read_u64("PARLOR_REVEAL_DELAY_MS", DEFAULT_REVEAL_DELAY_MS),
            starting_balance: read_u64("PARLOR_STARTING_BALANCE", INITIAL_CHIPS),
            commands_per_second: read_u32("PARLOR_COMMANDS_PER_SECOND", 10),
            command_burst: read_u32("PARLOR_COMMAND_BURST", 20),
        }
    }
}

fn read_u16(key: &str, fallback: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse::<u16>().ok())
        .unwrap_or(fallback)
}

fn read_u32(key: &str, fallback: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .unwrap_or(fallback)
}

fn read_u64(key: &str, fallback: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse::<u64>().ok())
        .unwrap_or(fallback)
}

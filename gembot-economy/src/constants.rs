//! Centralized tuning constants for the gembot economy.
//!
//! These values back `TariffTable::default_config` and the handful of
//! presentation defaults the rules need. External tariffs may override the
//! tariff values; the rest are fixed in code.

// Work tuning ---------------------------------------------------------------
pub const WORK_COOLDOWN_SECONDS: f64 = 10.0;

// Lottery tuning ------------------------------------------------------------
pub const LOTTERY_TICKET_PRICE: u64 = 100;
pub const LOTTERY_MAX_TICKETS: u32 = 1_000;
pub const PRIZE_WEIGHT_TOTAL: f64 = 100.0;
pub(crate) const PRIZE_WEIGHT_EPSILON: f64 = 1e-6;
pub const LOTTERY_DEFAULT_TICKETS: i64 = 1;

// Currency ------------------------------------------------------------------
pub const CURRENCY_EMOJI: &str = "💎";
pub const CURRENCY_NAME: &str = "Gem";

// Leaderboard ---------------------------------------------------------------
pub const LEADERBOARD_SIZE: usize = 10;
pub const UNKNOWN_JOB_EMOJI: &str = "❓";
pub const UNKNOWN_JOB_NAME: &str = "Unknown Job";
pub const UNKNOWN_USER_NAME: &str = "Unknown User";
pub(crate) const UNKNOWN_USER_ID_PREFIX: usize = 4;

// Commands ------------------------------------------------------------------
pub const FALLBACK_DISPLAY_NAME: &str = "Player";

// Logging keys --------------------------------------------------------------
pub(crate) const LOG_WORK_SETTLED: &str = "log.work.settled";
pub(crate) const LOG_WORK_PROMOTED: &str = "log.work.promoted";
pub(crate) const LOG_LOTTERY_SETTLED: &str = "log.lottery.settled";
pub(crate) const LOG_RNG_DRAWS: &str = "log.rng.draws";
pub(crate) const LOG_ADMIN_SET_JOB: &str = "log.admin.set-job";
pub(crate) const LOG_STORE_DEGRADED: &str = "log.store.degraded";
pub(crate) const LOG_STORE_WRITE_LOST: &str = "log.store.write-lost";

//! Gembot Economy
//!
//! Platform-agnostic rules for the gembot chat economy: timed work with job
//! promotions, a batched weighted lottery, an administrative job override and
//! a balance leaderboard. Persistence, time and randomness arrive through the
//! `PlayerStore` and `Clock` traits and explicit RNG arguments; this crate
//! performs no I/O of its own.

pub mod admin;
pub mod clock;
pub mod command;
pub mod constants;
pub mod engine;
pub mod error;
pub mod leaderboard;
pub mod lottery;
pub mod numbers;
pub mod player;
pub mod rng;
pub mod store;
pub mod tariff;
pub mod work;

// Re-export commonly used types
pub use admin::{JobChange, JobChangeApplied, resolve_job_index, set_job_index};
pub use clock::{Clock, FixedClock, SystemClock};
pub use command::{Command, CommandRequest};
pub use engine::{CommandReply, Committed, EconomyEngine, Pong, ReadPolicy};
pub use error::{EconomyError, TicketCountIssue, format_wait};
pub use leaderboard::{LeaderboardEntry, anonymous_name, rank_players};
pub use lottery::{
    LotteryApplied, Settlement, TierCount, TierCounts, apply_lottery_purchase, draw_prize,
    draw_prize_index, settle_draws, validate_ticket_count,
};
pub use player::{BalanceView, NextPromotion, PlayerRecord};
pub use rng::{CountingRng, RngBundle};
pub use store::{MemoryStore, PlayerStore, StoreError};
pub use tariff::{
    JobTier, LotteryConfig, LotteryPrizeTier, PayRange, TariffError, TariffTable, TemplateFill,
    VariationKind, VariationProfile,
};
pub use work::{
    Promotion, WorkApplied, WorkContext, WorkOutcome, WorkRoll, apply_work, cooldown_remaining,
    roll_work, settle_work,
};

//! Typed failures surfaced by the economy rules.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::numbers::split_minutes_seconds;

/// Why a requested ticket count was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketCountIssue {
    /// Zero or negative.
    NotPositive,
    /// Above the configured per-purchase maximum.
    AboveMaximum { max: u32 },
    /// Fractional or non-numeric input.
    NotInteger,
}

impl std::fmt::Display for TicketCountIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotPositive => write!(f, "ticket count must be at least 1"),
            Self::AboveMaximum { max } => write!(f, "ticket count must be at most {max}"),
            Self::NotInteger => write!(f, "ticket count must be a whole number"),
        }
    }
}

/// Errors raised while applying a player command.
///
/// All variants are recoverable within a single invocation; the record that
/// was read is never mutated when one of these is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EconomyError {
    #[error("still on break: wait {}", wait_label(.remaining_seconds))]
    CooldownActive { remaining_seconds: f64 },
    #[error("invalid ticket count: {reason}")]
    InvalidTicketCount { reason: TicketCountIssue },
    #[error("insufficient balance: {required} required, {available} available")]
    InsufficientBalance { required: u64, available: u64 },
    #[error("invalid job index {requested}: choose between {min} and {max}")]
    InvalidJobIndex { requested: i64, min: usize, max: usize },
    #[error("{command}: missing argument `{missing}`")]
    MissingArguments {
        command: String,
        missing: &'static str,
    },
    #[error("unknown command `{name}`")]
    UnknownCommand { name: String },
    #[error("player store unavailable: {reason}")]
    StoreUnavailable { reason: String },
    #[error("record for {user_id} changed concurrently; retry the command")]
    WriteConflict { user_id: String },
    #[error("tariff cannot serve this command: {reason}")]
    Misconfigured { reason: &'static str },
}

impl EconomyError {
    /// Amount still missing for an `InsufficientBalance` failure.
    #[must_use]
    pub fn shortfall(&self) -> Option<u64> {
        match self {
            Self::InsufficientBalance {
                required,
                available,
            } => Some(required.saturating_sub(*available)),
            _ => None,
        }
    }
}

fn wait_label(remaining_seconds: &f64) -> String {
    format_wait(*remaining_seconds)
}

/// `"{m}m {s}s"`, or `"{s}s"` when under a minute. Whole seconds are
/// floored, except that any wait under one second reads as `1s`.
#[must_use]
pub fn format_wait(remaining_seconds: f64) -> String {
    let remaining = if remaining_seconds > 0.0 {
        remaining_seconds.max(1.0)
    } else {
        remaining_seconds
    };
    let (minutes, seconds) = split_minutes_seconds(remaining);
    if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

//! Text and JSON presentation of engine replies.
use std::io::Write;

use anyhow::Result;
use clap::ValueEnum;
use gembot_economy::numbers::{group_thousands, group_thousands_signed};
use gembot_economy::{
    BalanceView, CommandReply, Committed, EconomyError, JobChange, LeaderboardEntry, Pong,
    Settlement, TariffTable, WorkOutcome, format_wait,
};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Write a successful reply.
pub fn write_reply(
    out: &mut impl Write,
    format: OutputFormat,
    reply: &Committed<CommandReply>,
    tariff: &TariffTable,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(reply)?)?;
        }
        OutputFormat::Text => {
            writeln!(out, "{}", reply_text(&reply.value, tariff))?;
            if !reply.persisted {
                writeln!(
                    out,
                    "⚠️ The store was unreachable; this result was not saved."
                )?;
            }
        }
    }
    Ok(())
}

/// Write a user-facing failure.
pub fn write_error(
    out: &mut impl Write,
    format: OutputFormat,
    err: &EconomyError,
    tariff: &TariffTable,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let body = json!({
                "error": error_kind(err),
                "message": error_text(err, tariff),
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&body)?)?;
        }
        OutputFormat::Text => writeln!(out, "{}", error_text(err, tariff))?,
    }
    Ok(())
}

#[must_use]
pub fn reply_text(reply: &CommandReply, tariff: &TariffTable) -> String {
    match reply {
        CommandReply::Pong(pong) => pong_text(*pong),
        CommandReply::Work(outcome) => work_text(outcome, tariff),
        CommandReply::Balance(view) => balance_text(view, tariff),
        CommandReply::Lottery(settlement) => settlement_text(settlement, tariff),
        CommandReply::JobChanged(change) => job_change_text(change),
        CommandReply::Leaderboard { entries } => leaderboard_text(entries, tariff),
    }
}

fn money(amount: u64, tariff: &TariffTable) -> String {
    format!("{}{}", group_thousands(amount), tariff.currency_emoji)
}

fn pong_text(pong: Pong) -> String {
    format!("🏓 Pong! Handler latency: {}µs", pong.latency_micros)
}

fn work_text(outcome: &WorkOutcome, tariff: &TariffTable) -> String {
    let mut lines = vec![
        outcome.message.clone(),
        format!(
            "💼 {} {} · Balance: {} · Works: {}",
            outcome.job_name,
            outcome.job_emoji,
            money(outcome.balance, tariff),
            outcome.work_count
        ),
    ];
    if let Some(promotion) = &outcome.promotion {
        lines.push(format!(
            "🎉 Promotion! You are now a {} {}!",
            promotion.job_name, promotion.job_emoji
        ));
    }
    lines.join("\n")
}

fn balance_text(view: &BalanceView, tariff: &TariffTable) -> String {
    let mut lines = vec![
        format!("📒 {}'s status", view.display_name),
        format!("Balance: {}", money(view.balance, tariff)),
        format!("Job: {} {}", view.job_name, view.job_emoji),
        format!("Works completed: {}", view.work_count),
    ];
    match &view.next_promotion {
        Some(next) => lines.push(format!(
            "Next promotion: {} {} in {} more work(s) ({} required)",
            next.job_name, next.job_emoji, next.remaining_works, next.required_works
        )),
        None => lines.push("Top tier reached. Nothing left to climb!".to_string()),
    }
    lines.join("\n")
}

fn settlement_text(settlement: &Settlement, tariff: &TariffTable) -> String {
    let mut lines = vec![format!(
        "🎫 Bought {} ticket(s) for {}",
        settlement.tickets,
        money(settlement.cost, tariff)
    )];
    for tier in &settlement.per_tier {
        lines.push(format!("{} {} × {}", tier.emoji, tier.name, tier.count));
    }
    lines.push(format!(
        "Winnings: {}",
        money(settlement.total_winnings, tariff)
    ));
    lines.push(format!(
        "Net: {}{}",
        group_thousands_signed(settlement.net),
        tariff.currency_emoji
    ));
    lines.push(format!("Balance: {}", money(settlement.balance, tariff)));
    lines.join("\n")
}

fn job_change_text(change: &JobChange) -> String {
    format!(
        "✅ Job for {} set to {} {} (index {} → {})",
        change.user_id, change.job_name, change.job_emoji, change.from_index, change.to_index
    )
}

fn leaderboard_text(entries: &[LeaderboardEntry], tariff: &TariffTable) -> String {
    if entries.is_empty() {
        return format!(
            "No players yet. Use `work` to earn your first {}!",
            tariff.currency_name
        );
    }
    let mut lines = vec![format!("🏆 {} Leaderboard", tariff.currency_name)];
    for entry in entries {
        lines.push(format!(
            "{} {}. {} {} · {}",
            entry.medal(),
            entry.rank,
            entry.job_emoji,
            entry.display_name,
            money(entry.balance, tariff)
        ));
    }
    lines.join("\n")
}

#[must_use]
pub const fn error_kind(err: &EconomyError) -> &'static str {
    match err {
        EconomyError::CooldownActive { .. } => "cooldown_active",
        EconomyError::InvalidTicketCount { .. } => "invalid_ticket_count",
        EconomyError::InsufficientBalance { .. } => "insufficient_balance",
        EconomyError::InvalidJobIndex { .. } => "invalid_job_index",
        EconomyError::MissingArguments { .. } => "missing_arguments",
        EconomyError::UnknownCommand { .. } => "unknown_command",
        EconomyError::StoreUnavailable { .. } => "store_unavailable",
        EconomyError::WriteConflict { .. } => "write_conflict",
        EconomyError::Misconfigured { .. } => "misconfigured",
    }
}

#[must_use]
pub fn error_text(err: &EconomyError, tariff: &TariffTable) -> String {
    match err {
        EconomyError::CooldownActive { remaining_seconds } => format!(
            "⏳ You're on a break. Try again in {}.",
            format_wait(*remaining_seconds)
        ),
        EconomyError::InsufficientBalance {
            required,
            available,
        } => format!(
            "💸 Not enough {}: this costs {}, you have {} (short by {}).",
            tariff.currency_name,
            money(*required, tariff),
            money(*available, tariff),
            money(err.shortfall().unwrap_or_default(), tariff)
        ),
        EconomyError::UnknownCommand { name } if name.starts_with("lottery") => {
            "🎫 Use `lottery buy [amount]` to buy tickets.".to_string()
        }
        other => format!("❌ {other}"),
    }
}

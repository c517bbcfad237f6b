//! Deterministic economy simulation over an in-memory store.
use std::sync::Arc;

use anyhow::Result;
use gembot_economy::numbers::{floor_f64_to_u64, u64_to_f64};
use gembot_economy::{
    EconomyEngine, FixedClock, MemoryStore, PlayerStore, ReadPolicy, TariffTable,
};
use serde::Serialize;

/// Configuration for one simulation run.
#[derive(Debug, Clone, Copy)]
pub struct SimulationConfig {
    pub players: usize,
    pub rounds: u32,
    /// Share of the current balance spent on tickets after each work.
    /// Spending never exceeds the balance itself.
    pub lottery_fraction: f64,
}

impl SimulationConfig {
    #[must_use]
    pub const fn new(players: usize, rounds: u32) -> Self {
        Self {
            players,
            rounds,
            lottery_fraction: 0.0,
        }
    }

    #[must_use]
    pub const fn with_lottery_fraction(mut self, fraction: f64) -> Self {
        self.lottery_fraction = fraction;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BalanceStats {
    pub min: u64,
    pub median: u64,
    pub mean: f64,
    pub max: u64,
}

impl BalanceStats {
    fn from_balances(mut balances: Vec<u64>) -> Self {
        if balances.is_empty() {
            return Self::default();
        }
        balances.sort_unstable();
        let count = u64::try_from(balances.len()).unwrap_or(u64::MAX);
        let mean =
            balances.iter().map(|&balance| u64_to_f64(balance)).sum::<f64>() / u64_to_f64(count);
        Self {
            min: balances[0],
            median: balances[balances.len() / 2],
            mean,
            max: balances[balances.len() - 1],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierShare {
    pub name: String,
    pub emoji: String,
    pub players: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrizeShare {
    pub name: String,
    pub emoji: String,
    pub count: u64,
}

/// Aggregated outcome of one seed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationSummary {
    pub seed: u64,
    pub players: usize,
    pub rounds: u32,
    pub works: u64,
    pub work_earnings: u64,
    pub promotions: u64,
    pub lottery_purchases: u64,
    pub tickets: u64,
    pub lottery_cost: u64,
    pub lottery_winnings: u64,
    /// Winnings per gem spent; 0 when nothing was bought.
    pub realized_return: f64,
    pub balances: BalanceStats,
    pub tiers: Vec<TierShare>,
    pub prizes: Vec<PrizeShare>,
}

/// Run `config.players` players for `config.rounds` rounds with `seed`.
///
/// # Errors
///
/// Propagates any engine failure; with a valid tariff none are expected.
pub fn run_simulation(
    tariff: &Arc<TariffTable>,
    config: &SimulationConfig,
    seed: u64,
) -> Result<SimulationSummary> {
    let engine = EconomyEngine::new(
        MemoryStore::new(),
        FixedClock::at(tariff.cooldown_seconds),
        Arc::clone(tariff),
        seed,
    )
    .with_policy(ReadPolicy::Strict);
    let users: Vec<String> = (0..config.players)
        .map(|index| format!("sim-{index:04}"))
        .collect();
    let lottery = &tariff.lottery;

    let mut summary = SimulationSummary {
        seed,
        players: config.players,
        rounds: config.rounds,
        works: 0,
        work_earnings: 0,
        promotions: 0,
        lottery_purchases: 0,
        tickets: 0,
        lottery_cost: 0,
        lottery_winnings: 0,
        realized_return: 0.0,
        balances: BalanceStats::default(),
        tiers: Vec::new(),
        prizes: lottery
            .prizes
            .iter()
            .map(|prize| PrizeShare {
                name: prize.name.clone(),
                emoji: prize.emoji.clone(),
                count: 0,
            })
            .collect(),
    };

    for round in 0..config.rounds {
        for user in &users {
            let outcome = engine.work(user, user)?.value;
            summary.works += 1;
            summary.work_earnings += outcome.total_earnings;
            summary.promotions += u64::from(outcome.promotion.is_some());

            let budget = floor_f64_to_u64(u64_to_f64(outcome.balance) * config.lottery_fraction)
                .min(outcome.balance);
            let tickets = (budget / lottery.ticket_price).min(u64::from(lottery.max_tickets));
            if tickets == 0 {
                continue;
            }
            let settlement = engine
                .lottery_buy(user, i64::try_from(tickets).unwrap_or(i64::MAX))?
                .value;
            summary.lottery_purchases += 1;
            summary.tickets += u64::from(settlement.tickets);
            summary.lottery_cost += settlement.cost;
            summary.lottery_winnings += settlement.total_winnings;
            for tier in &settlement.per_tier {
                if let Some(share) = summary.prizes.get_mut(tier.index) {
                    share.count += u64::from(tier.count);
                }
            }
        }
        log::debug!("simulation seed={seed} round={round} complete");
        engine.clock().advance(tariff.cooldown_seconds);
    }

    let records = engine.store().list()?;
    summary.balances =
        BalanceStats::from_balances(records.iter().map(|(_, record)| record.balance).collect());
    summary.tiers = tariff
        .jobs
        .iter()
        .enumerate()
        .map(|(index, job)| TierShare {
            name: job.name.clone(),
            emoji: job.emoji.clone(),
            players: records
                .iter()
                .filter(|(_, record)| record.job_index == index)
                .count(),
        })
        .collect();
    if summary.lottery_cost > 0 {
        summary.realized_return =
            u64_to_f64(summary.lottery_winnings) / u64_to_f64(summary.lottery_cost);
    }
    Ok(summary)
}

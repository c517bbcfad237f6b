//! Lottery engine: batched ticket purchase, weighted prize draws, settlement.
use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::constants::LOG_LOTTERY_SETTLED;
use crate::error::{EconomyError, TicketCountIssue};
use crate::numbers::signed_delta;
use crate::player::PlayerRecord;
use crate::tariff::{LotteryConfig, LotteryPrizeTier, TariffTable};

/// How many tickets landed on one prize tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCount {
    /// Position in the prize ladder.
    pub index: usize,
    pub name: String,
    pub emoji: String,
    pub multiplier: u64,
    pub count: u32,
}

/// Per-tier counts, sorted by count descending then ladder order.
pub type TierCounts = SmallVec<[TierCount; 8]>;

/// Net financial result of one batch of draws.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub tickets: u32,
    pub cost: u64,
    pub total_winnings: u64,
    pub net: i64,
    pub per_tier: TierCounts,
    pub balance: u64,
}

impl Settlement {
    #[must_use]
    pub const fn is_profit(&self) -> bool {
        self.net >= 0
    }

    /// Sum of all per-tier counts; always equals `tickets`.
    #[must_use]
    pub fn drawn(&self) -> u32 {
        self.per_tier.iter().map(|tier| tier.count).sum()
    }
}

/// Updated record plus the settlement to present.
#[derive(Debug, Clone, PartialEq)]
pub struct LotteryApplied {
    pub record: PlayerRecord,
    pub settlement: Settlement,
}

/// Check the requested count against the positive / maximum rules.
///
/// # Errors
///
/// Returns `InvalidTicketCount` for zero, negative or oversized requests.
pub fn validate_ticket_count(requested: i64, lottery: &LotteryConfig) -> Result<u32, EconomyError> {
    if requested <= 0 {
        return Err(EconomyError::InvalidTicketCount {
            reason: TicketCountIssue::NotPositive,
        });
    }
    match u32::try_from(requested) {
        Ok(tickets) if tickets <= lottery.max_tickets => Ok(tickets),
        _ => Err(EconomyError::InvalidTicketCount {
            reason: TicketCountIssue::AboveMaximum {
                max: lottery.max_tickets,
            },
        }),
    }
}

#[must_use]
pub fn purchase_cost(tickets: u32, lottery: &LotteryConfig) -> u64 {
    u64::from(tickets).saturating_mul(lottery.ticket_price)
}

/// # Errors
///
/// Returns `InsufficientBalance` when the record cannot cover `cost`.
pub fn check_funds(record: &PlayerRecord, cost: u64) -> Result<(), EconomyError> {
    if record.balance < cost {
        return Err(EconomyError::InsufficientBalance {
            required: cost,
            available: record.balance,
        });
    }
    Ok(())
}

/// Map a sample in `[0, weight_total)` onto the ladder.
///
/// Returns the first tier whose cumulative weight exceeds `sample`; anything
/// past the end lands on the last (fallback) tier. `None` only for an empty
/// ladder.
#[must_use]
pub fn draw_prize_index(prizes: &[LotteryPrizeTier], sample: f64) -> Option<usize> {
    let mut cumulative = 0.0_f64;
    for (index, prize) in prizes.iter().enumerate() {
        cumulative += prize.probability.max(0.0);
        if sample < cumulative {
            return Some(index);
        }
    }
    prizes.len().checked_sub(1)
}

/// Draw one ticket.
pub fn draw_prize<R>(lottery: &LotteryConfig, rng: &mut R) -> Option<usize>
where
    R: Rng + ?Sized,
{
    let sample = rng.r#gen::<f64>() * lottery.weight_total;
    draw_prize_index(&lottery.prizes, sample)
}

fn tally(lottery: &LotteryConfig, draws: &[usize]) -> (u64, TierCounts) {
    let mut counts = vec![0_u32; lottery.prizes.len()];
    let mut winnings = 0_u64;
    let fallback = lottery.prizes.len().saturating_sub(1);
    for &drawn in draws {
        let index = if drawn < counts.len() { drawn } else { fallback };
        let Some(prize) = lottery.prizes.get(index) else {
            continue;
        };
        counts[index] = counts[index].saturating_add(1);
        winnings = winnings.saturating_add(lottery.ticket_price.saturating_mul(prize.multiplier));
    }

    let mut per_tier: TierCounts = lottery
        .prizes
        .iter()
        .zip(counts)
        .enumerate()
        .filter(|(_, (_, count))| *count > 0)
        .map(|(index, (prize, count))| TierCount {
            index,
            name: prize.name.clone(),
            emoji: prize.emoji.clone(),
            multiplier: prize.multiplier,
            count,
        })
        .collect();
    // Stable sort keeps ladder order among equal counts.
    per_tier.sort_by(|a, b| b.count.cmp(&a.count));
    (winnings, per_tier)
}

/// Settle a batch of already-drawn ladder indices. Pure.
///
/// Cost is deducted before winnings are credited; both land on the returned
/// record only.
///
/// # Errors
///
/// Returns `InvalidTicketCount` if `draws` is empty or oversized, or
/// `InsufficientBalance` if the record cannot pay.
pub fn settle_draws(
    record: &PlayerRecord,
    tariff: &TariffTable,
    draws: &[usize],
) -> Result<LotteryApplied, EconomyError> {
    let lottery = &tariff.lottery;
    let requested = i64::try_from(draws.len()).unwrap_or(i64::MAX);
    let tickets = validate_ticket_count(requested, lottery)?;
    let cost = purchase_cost(tickets, lottery);
    check_funds(record, cost)?;

    let mut next = record.clone();
    next.balance -= cost;
    let (total_winnings, per_tier) = tally(lottery, draws);
    next.balance = next.balance.saturating_add(total_winnings);

    let settlement = Settlement {
        tickets,
        cost,
        total_winnings,
        net: signed_delta(total_winnings, cost),
        per_tier,
        balance: next.balance,
    };
    log::debug!(
        "{LOG_LOTTERY_SETTLED}: tickets={tickets} cost={cost} winnings={total_winnings} balance={}",
        next.balance
    );
    Ok(LotteryApplied {
        record: next,
        settlement,
    })
}

/// Full `lottery buy`: validate, draw `requested` independent prizes, settle.
///
/// Validation order is count positive, count within maximum, then funds;
/// no randomness is consumed on failure.
///
/// # Errors
///
/// Returns `InvalidTicketCount`, `InsufficientBalance` or `Misconfigured`;
/// the input record is unchanged in every case.
pub fn apply_lottery_purchase<R>(
    record: &PlayerRecord,
    tariff: &TariffTable,
    requested: i64,
    rng: &mut R,
) -> Result<LotteryApplied, EconomyError>
where
    R: Rng + ?Sized,
{
    let lottery = &tariff.lottery;
    let tickets = validate_ticket_count(requested, lottery)?;
    check_funds(record, purchase_cost(tickets, lottery))?;

    let mut draws = Vec::with_capacity(usize::try_from(tickets).unwrap_or(0));
    for _ in 0..tickets {
        let index = draw_prize(lottery, rng).ok_or(EconomyError::Misconfigured {
            reason: "lottery prize ladder is empty",
        })?;
        draws.push(index);
    }
    settle_draws(record, tariff, &draws)
}

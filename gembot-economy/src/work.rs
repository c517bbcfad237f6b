//! Work engine: cooldown, earnings roll and promotion.
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::constants::{LOG_WORK_PROMOTED, LOG_WORK_SETTLED};
use crate::error::EconomyError;
use crate::numbers::{floor_f64_to_u64, u64_to_f64};
use crate::player::PlayerRecord;
use crate::tariff::{JobTier, TariffTable, TemplateFill, VariationKind, VariationProfile};

/// Inputs shared by every step of a single `work` call.
#[derive(Debug, Clone, Copy)]
pub struct WorkContext<'a> {
    pub tariff: &'a TariffTable,
    /// Wall-clock seconds, same epoch as `PlayerRecord::last_work_timestamp`.
    pub now: f64,
    pub display_name: &'a str,
}

/// The random part of a `work` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkRoll<'a> {
    pub base_earnings: u64,
    pub variation: &'a VariationProfile,
}

/// Promotion into the next tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promotion {
    pub from_index: usize,
    pub to_index: usize,
    pub job_name: String,
    pub job_emoji: String,
}

/// Structured result of a successful `work`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOutcome {
    pub job_index: usize,
    pub job_name: String,
    pub job_emoji: String,
    pub variation: VariationKind,
    pub base_earnings: u64,
    /// Base earnings after the variation multiplier, before any bonus.
    pub earnings: u64,
    pub bonus_amount: Option<u64>,
    pub total_earnings: u64,
    pub balance: u64,
    pub work_count: u64,
    /// Variation template with every placeholder filled.
    pub message: String,
    pub promotion: Option<Promotion>,
}

/// Updated record plus the outcome to present.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkApplied {
    pub record: PlayerRecord,
    pub outcome: WorkOutcome,
}

/// Seconds left before `record` may work again; positive means still blocked.
#[must_use]
pub fn cooldown_remaining(record: &PlayerRecord, tariff: &TariffTable, now: f64) -> f64 {
    record.last_work_timestamp + tariff.cooldown_seconds - now
}

/// # Errors
///
/// Returns `CooldownActive` while the cooldown has time remaining.
pub fn check_cooldown(
    record: &PlayerRecord,
    tariff: &TariffTable,
    now: f64,
) -> Result<(), EconomyError> {
    let remaining = cooldown_remaining(record, tariff, now);
    if remaining > 0.0 {
        return Err(EconomyError::CooldownActive {
            remaining_seconds: remaining,
        });
    }
    Ok(())
}

/// Resolve the tier a record currently works in.
///
/// # Errors
///
/// Returns `InvalidJobIndex` when the stored index lies outside the tariff.
pub fn current_tier<'t>(
    record: &PlayerRecord,
    tariff: &'t TariffTable,
) -> Result<&'t JobTier, EconomyError> {
    record.job(tariff).ok_or_else(|| EconomyError::InvalidJobIndex {
        requested: i64::try_from(record.job_index).unwrap_or(i64::MAX),
        min: 0,
        max: tariff.max_job_index(),
    })
}

/// Draw base pay uniformly from the tier range and pick a variation with
/// equal probability per profile.
///
/// # Errors
///
/// Returns `Misconfigured` when the tariff has no variation profiles.
pub fn roll_work<'t, R>(
    tier: &JobTier,
    tariff: &'t TariffTable,
    rng: &mut R,
) -> Result<WorkRoll<'t>, EconomyError>
where
    R: Rng + ?Sized,
{
    let variation = tariff
        .variations
        .choose(rng)
        .ok_or(EconomyError::Misconfigured {
            reason: "no work variations configured",
        })?;
    let base_earnings = rng.gen_range(tier.pay.low..=tier.pay.high.max(tier.pay.low));
    Ok(WorkRoll {
        base_earnings,
        variation,
    })
}

/// Apply a fixed roll to a record. Pure: the input record is never touched.
///
/// # Errors
///
/// Returns `CooldownActive` or `InvalidJobIndex` without mutating anything.
pub fn settle_work(
    record: &PlayerRecord,
    ctx: WorkContext<'_>,
    roll: WorkRoll<'_>,
) -> Result<WorkApplied, EconomyError> {
    let tariff = ctx.tariff;
    check_cooldown(record, tariff, ctx.now)?;
    let tier = current_tier(record, tariff)?;

    let base = u64_to_f64(roll.base_earnings);
    let earnings = floor_f64_to_u64(base * roll.variation.earnings_multiplier());
    let bonus_amount = roll
        .variation
        .bonus_multiplier()
        .map(|bonus| floor_f64_to_u64(base * bonus));
    let total_earnings = earnings.saturating_add(bonus_amount.unwrap_or(0));

    let message = roll.variation.render(&TemplateFill {
        job_name: &tier.name,
        earnings,
        bonus_amount,
        total_earnings,
        emoji: &tariff.currency_emoji,
    });

    let mut next = record.clone();
    next.balance = next.balance.saturating_add(total_earnings);
    next.last_work_timestamp = ctx.now;
    next.work_count = next.work_count.saturating_add(1);
    next.display_name = Some(ctx.display_name.to_string());

    let promotion = promote_if_eligible(&mut next, tariff);

    log::debug!(
        "{LOG_WORK_SETTLED}: tier={} variation={} base={} total={} works={}",
        record.job_index,
        roll.variation.kind(),
        roll.base_earnings,
        total_earnings,
        next.work_count
    );

    let outcome = WorkOutcome {
        job_index: record.job_index,
        job_name: tier.name.clone(),
        job_emoji: tier.emoji.clone(),
        variation: roll.variation.kind(),
        base_earnings: roll.base_earnings,
        earnings,
        bonus_amount,
        total_earnings,
        balance: next.balance,
        work_count: next.work_count,
        message,
        promotion,
    };
    Ok(WorkApplied {
        record: next,
        outcome,
    })
}

/// Advance at most one tier, checked against the immediate next threshold only.
fn promote_if_eligible(record: &mut PlayerRecord, tariff: &TariffTable) -> Option<Promotion> {
    let from_index = record.job_index;
    let next_tier = tariff.next_tier(from_index)?;
    if record.work_count < next_tier.required_works {
        return None;
    }
    record.job_index = from_index + 1;
    log::debug!(
        "{LOG_WORK_PROMOTED}: {from_index} -> {} ({})",
        record.job_index,
        next_tier.name
    );
    Some(Promotion {
        from_index,
        to_index: record.job_index,
        job_name: next_tier.name.clone(),
        job_emoji: next_tier.emoji.clone(),
    })
}

/// Full `work` action: cooldown, roll, settle.
///
/// No randomness is consumed when the cooldown or job lookup fails.
///
/// # Errors
///
/// Returns `CooldownActive`, `InvalidJobIndex` or `Misconfigured`; the input
/// record is left unchanged in every case.
pub fn apply_work<R>(
    record: &PlayerRecord,
    ctx: WorkContext<'_>,
    rng: &mut R,
) -> Result<WorkApplied, EconomyError>
where
    R: Rng + ?Sized,
{
    check_cooldown(record, ctx.tariff, ctx.now)?;
    let tier = current_tier(record, ctx.tariff)?;
    let roll = roll_work(tier, ctx.tariff, rng)?;
    settle_work(record, ctx, roll)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn tariff() -> TariffTable {
        TariffTable::validated_default().unwrap()
    }

    fn ctx<'a>(tariff: &'a TariffTable, now: f64) -> WorkContext<'a> {
        WorkContext {
            tariff,
            now,
            display_name: "mika",
        }
    }

    fn variation(tariff: &TariffTable, kind: VariationKind) -> &VariationProfile {
        tariff
            .variations
            .iter()
            .find(|profile| profile.kind() == kind)
            .unwrap()
    }

    #[test]
    fn cooldown_blocks_and_reports_remaining() {
        let tariff = tariff();
        let record = PlayerRecord {
            last_work_timestamp: 100.0,
            ..PlayerRecord::default()
        };
        let mut rng = SmallRng::seed_from_u64(1);
        let err = apply_work(&record, ctx(&tariff, 105.0), &mut rng).unwrap_err();
        assert_eq!(
            err,
            EconomyError::CooldownActive {
                remaining_seconds: 5.0
            }
        );
    }

    #[test]
    fn cooldown_boundary_is_open() {
        let tariff = tariff();
        let record = PlayerRecord {
            last_work_timestamp: 100.0,
            ..PlayerRecord::default()
        };
        let mut rng = SmallRng::seed_from_u64(2);
        assert!(apply_work(&record, ctx(&tariff, 110.0), &mut rng).is_ok());
    }

    #[test]
    fn normal_roll_credits_base_pay() {
        let tariff = tariff();
        let record = PlayerRecord::fresh();
        let roll = WorkRoll {
            base_earnings: 20,
            variation: variation(&tariff, VariationKind::Normal),
        };
        let applied = settle_work(&record, ctx(&tariff, 1_000.0), roll).unwrap();
        assert_eq!(applied.outcome.total_earnings, 20);
        assert_eq!(applied.outcome.bonus_amount, None);
        assert_eq!(applied.record.balance, 20);
        assert_eq!(applied.record.work_count, 1);
        assert!((applied.record.last_work_timestamp - 1_000.0).abs() < f64::EPSILON);
        assert_eq!(applied.record.display_name.as_deref(), Some("mika"));
        assert_eq!(applied.outcome.promotion, None);
        assert_eq!(applied.record.job_index, 0);
        assert_eq!(record, PlayerRecord::fresh());
    }

    #[test]
    fn late_roll_halves_with_floor() {
        let tariff = tariff();
        let roll = WorkRoll {
            base_earnings: 25,
            variation: variation(&tariff, VariationKind::Late),
        };
        let applied = settle_work(&PlayerRecord::fresh(), ctx(&tariff, 50.0), roll).unwrap();
        assert_eq!(applied.outcome.earnings, 12);
        assert_eq!(applied.outcome.total_earnings, 12);
    }

    #[test]
    fn bonus_roll_adds_bonus_on_top() {
        let tariff = tariff();
        let roll = WorkRoll {
            base_earnings: 21,
            variation: variation(&tariff, VariationKind::Bonus),
        };
        let applied = settle_work(&PlayerRecord::fresh(), ctx(&tariff, 50.0), roll).unwrap();
        assert_eq!(applied.outcome.earnings, 21);
        assert_eq!(applied.outcome.bonus_amount, Some(10));
        assert_eq!(applied.outcome.total_earnings, 31);
        assert!(applied.outcome.message.contains("Total: **31💎**"));
        assert!(applied.outcome.message.contains("Truant"));
    }

    #[test]
    fn promotion_fires_when_threshold_reached() {
        let tariff = tariff();
        let record = PlayerRecord {
            work_count: 9,
            ..PlayerRecord::default()
        };
        let roll = WorkRoll {
            base_earnings: 10,
            variation: variation(&tariff, VariationKind::Normal),
        };
        let applied = settle_work(&record, ctx(&tariff, 50.0), roll).unwrap();
        assert_eq!(applied.record.work_count, 10);
        assert_eq!(applied.record.job_index, 1);
        let promotion = applied.outcome.promotion.unwrap();
        assert_eq!(promotion.to_index, 1);
        assert_eq!(promotion.job_name, "Miner");
        assert_eq!(applied.outcome.job_name, "Truant");
    }

    #[test]
    fn promotion_never_skips_tiers() {
        let tariff = tariff();
        let record = PlayerRecord {
            work_count: 100,
            job_index: 0,
            ..PlayerRecord::default()
        };
        let roll = WorkRoll {
            base_earnings: 10,
            variation: variation(&tariff, VariationKind::Normal),
        };
        let applied = settle_work(&record, ctx(&tariff, 50.0), roll).unwrap();
        assert_eq!(applied.record.job_index, 1);
    }

    #[test]
    fn top_tier_never_promotes() {
        let tariff = tariff();
        let record = PlayerRecord {
            work_count: 500,
            job_index: 3,
            ..PlayerRecord::default()
        };
        let mut rng = SmallRng::seed_from_u64(9);
        let applied = apply_work(&record, ctx(&tariff, 50.0), &mut rng).unwrap();
        assert_eq!(applied.record.job_index, 3);
        assert!(applied.outcome.promotion.is_none());
        assert!((180..=250).contains(&applied.outcome.base_earnings));
    }

    #[test]
    fn out_of_range_job_is_rejected() {
        let tariff = tariff();
        let record = PlayerRecord {
            job_index: 7,
            ..PlayerRecord::default()
        };
        let mut rng = SmallRng::seed_from_u64(3);
        assert_eq!(
            apply_work(&record, ctx(&tariff, 50.0), &mut rng),
            Err(EconomyError::InvalidJobIndex {
                requested: 7,
                min: 0,
                max: 3
            })
        );
    }

    #[test]
    fn empty_variations_are_reported() {
        let mut tariff = tariff();
        tariff.variations.clear();
        let mut rng = SmallRng::seed_from_u64(4);
        assert!(matches!(
            apply_work(&PlayerRecord::fresh(), ctx(&tariff, 50.0), &mut rng),
            Err(EconomyError::Misconfigured { .. })
        ));
    }
}

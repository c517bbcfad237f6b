//! Persistent player record and read-only projections of it.
use serde::{Deserialize, Serialize};

use crate::tariff::{JobTier, TariffTable};

/// One record per user identifier.
///
/// Field aliases accept legacy documents (`gem_balance`, `last_work_time`,
/// `discord_username`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PlayerRecord {
    #[serde(default, alias = "gem_balance")]
    pub balance: u64,
    #[serde(default)]
    pub work_count: u64,
    /// Seconds since the Unix epoch of the last successful `work`.
    #[serde(default, alias = "last_work_time")]
    pub last_work_timestamp: f64,
    #[serde(default)]
    pub job_index: usize,
    #[serde(
        default,
        alias = "discord_username",
        skip_serializing_if = "Option::is_none"
    )]
    pub display_name: Option<String>,
    /// Bumped on every committed write; used for conditional writes.
    #[serde(default)]
    pub revision: u64,
}

impl PlayerRecord {
    /// The record materialized for a user with no stored data.
    #[must_use]
    pub fn fresh() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_display_name(mut self, name: &str) -> Self {
        self.display_name = Some(name.to_string());
        self
    }

    /// Current tier, if `job_index` is inside the tariff.
    #[must_use]
    pub fn job<'t>(&self, tariff: &'t TariffTable) -> Option<&'t JobTier> {
        tariff.tier(self.job_index)
    }
}

/// Progress toward the next job tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextPromotion {
    pub job_name: String,
    pub job_emoji: String,
    pub required_works: u64,
    pub remaining_works: u64,
}

/// What the `balance` command shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceView {
    pub display_name: String,
    pub balance: u64,
    pub work_count: u64,
    pub job_index: usize,
    pub job_name: String,
    pub job_emoji: String,
    /// `None` at the top of the ladder.
    pub next_promotion: Option<NextPromotion>,
}

impl BalanceView {
    /// Project a record against the tariff. Out-of-range job indices fall back
    /// to an unknown job label rather than failing a read-only command.
    #[must_use]
    pub fn from_record(record: &PlayerRecord, tariff: &TariffTable, display_name: &str) -> Self {
        let (job_name, job_emoji) = record.job(tariff).map_or_else(
            || {
                (
                    crate::constants::UNKNOWN_JOB_NAME.to_string(),
                    crate::constants::UNKNOWN_JOB_EMOJI.to_string(),
                )
            },
            |tier| (tier.name.clone(), tier.emoji.clone()),
        );
        let next_promotion = tariff.next_tier(record.job_index).map(|next| NextPromotion {
            job_name: next.name.clone(),
            job_emoji: next.emoji.clone(),
            required_works: next.required_works,
            remaining_works: next.required_works.saturating_sub(record.work_count),
        });
        Self {
            display_name: display_name.to_string(),
            balance: record.balance,
            work_count: record.work_count,
            job_index: record.job_index,
            job_name,
            job_emoji,
            next_promotion,
        }
    }

    #[must_use]
    pub const fn is_top_tier(&self) -> bool {
        self.next_promotion.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_record_matches_documented_default() {
        let record = PlayerRecord::fresh();
        assert_eq!(record.balance, 0);
        assert_eq!(record.work_count, 0);
        assert!(record.last_work_timestamp.abs() < f64::EPSILON);
        assert_eq!(record.job_index, 0);
        assert_eq!(record.display_name, None);
    }

    #[test]
    fn legacy_field_names_deserialize() {
        let legacy = r#"{
            "gem_balance": 420,
            "work_count": 12,
            "last_work_time": 1700000000.5,
            "job_index": 1,
            "discord_username": "mika"
        }"#;
        let record: PlayerRecord = serde_json::from_str(legacy).unwrap();
        assert_eq!(record.balance, 420);
        assert_eq!(record.work_count, 12);
        assert!((record.last_work_timestamp - 1_700_000_000.5).abs() < 1e-6);
        assert_eq!(record.job_index, 1);
        assert_eq!(record.display_name.as_deref(), Some("mika"));
        assert_eq!(record.revision, 0);
    }

    #[test]
    fn missing_fields_default_to_zero() {
        let record: PlayerRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(record, PlayerRecord::fresh());
    }

    #[test]
    fn balance_view_reports_remaining_works() {
        let tariff = TariffTable::default_config();
        let record = PlayerRecord {
            balance: 1_500,
            work_count: 4,
            ..PlayerRecord::default()
        };
        let view = BalanceView::from_record(&record, &tariff, "mika");
        assert_eq!(view.job_name, "Truant");
        let next = view.next_promotion.unwrap();
        assert_eq!(next.job_name, "Miner");
        assert_eq!(next.remaining_works, 6);
    }

    #[test]
    fn balance_view_clamps_remaining_and_flags_top_tier() {
        let tariff = TariffTable::default_config();
        let overdue = PlayerRecord {
            work_count: 40,
            job_index: 0,
            ..PlayerRecord::default()
        };
        let view = BalanceView::from_record(&overdue, &tariff, "a");
        assert_eq!(view.next_promotion.unwrap().remaining_works, 0);

        let top = PlayerRecord {
            job_index: 3,
            ..PlayerRecord::default()
        };
        assert!(BalanceView::from_record(&top, &tariff, "b").is_top_tier());
    }
}

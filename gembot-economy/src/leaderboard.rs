//! Leaderboard view: sort, truncate and rank all stored records.
use serde::{Deserialize, Serialize};

use crate::constants::{UNKNOWN_JOB_EMOJI, UNKNOWN_USER_ID_PREFIX, UNKNOWN_USER_NAME};
use crate::player::PlayerRecord;
use crate::tariff::TariffTable;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// 1-based.
    pub rank: usize,
    pub user_id: String,
    pub display_name: String,
    pub balance: u64,
    pub job_emoji: String,
}

impl LeaderboardEntry {
    #[must_use]
    pub const fn medal(&self) -> &'static str {
        match self.rank {
            1 => "👑",
            2 => "🥈",
            3 => "🥉",
            _ => "🏅",
        }
    }
}

/// Name shown for a record that never carried a display name.
#[must_use]
pub fn anonymous_name(user_id: &str) -> String {
    let prefix: String = user_id.chars().take(UNKNOWN_USER_ID_PREFIX).collect();
    format!("{UNKNOWN_USER_NAME} ({prefix}...)")
}

/// Rank `records` by balance descending, ties by user id, keeping `limit`.
#[must_use]
pub fn rank_players(
    mut records: Vec<(String, PlayerRecord)>,
    tariff: &TariffTable,
    limit: usize,
) -> Vec<LeaderboardEntry> {
    records.sort_by(|(id_a, a), (id_b, b)| b.balance.cmp(&a.balance).then_with(|| id_a.cmp(id_b)));
    records
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(position, (user_id, record))| {
            let job_emoji = record
                .job(tariff)
                .map_or_else(|| UNKNOWN_JOB_EMOJI.to_string(), |tier| tier.emoji.clone());
            let display_name = record
                .display_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| anonymous_name(&user_id));
            LeaderboardEntry {
                rank: position + 1,
                user_id,
                display_name,
                balance: record.balance,
                job_emoji,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::LEADERBOARD_SIZE;

    fn record(balance: u64, job_index: usize, name: Option<&str>) -> PlayerRecord {
        PlayerRecord {
            balance,
            job_index,
            display_name: name.map(str::to_string),
            ..PlayerRecord::default()
        }
    }

    #[test]
    fn sorts_by_balance_and_breaks_ties_by_id() {
        let tariff = TariffTable::default_config();
        let board = rank_players(
            vec![
                ("b".into(), record(50, 0, Some("Bo"))),
                ("c".into(), record(900, 3, Some("Cy"))),
                ("a".into(), record(50, 1, Some("Al"))),
            ],
            &tariff,
            LEADERBOARD_SIZE,
        );
        let order: Vec<_> = board.iter().map(|entry| entry.user_id.as_str()).collect();
        assert_eq!(order, ["c", "a", "b"]);
        assert_eq!(board[0].medal(), "👑");
        assert_eq!(board[0].job_emoji, "💻");
        assert_eq!(board[2].rank, 3);
    }

    #[test]
    fn truncates_to_limit_and_assigns_medals() {
        let tariff = TariffTable::default_config();
        let records = (0..15_u64)
            .map(|n| (format!("user{n:02}"), record(n * 10, 0, None)))
            .collect();
        let board = rank_players(records, &tariff, LEADERBOARD_SIZE);
        assert_eq!(board.len(), 10);
        assert_eq!(board[0].balance, 140);
        let medals: Vec<_> = board.iter().map(LeaderboardEntry::medal).collect();
        assert_eq!(&medals[..4], ["👑", "🥈", "🥉", "🏅"]);
        assert!(medals[3..].iter().all(|medal| *medal == "🏅"));
    }

    #[test]
    fn unknown_names_and_jobs_fall_back() {
        let tariff = TariffTable::default_config();
        let board = rank_players(
            vec![("123456789".into(), record(1, 42, None))],
            &tariff,
            LEADERBOARD_SIZE,
        );
        assert_eq!(board[0].display_name, "Unknown User (1234...)");
        assert_eq!(board[0].job_emoji, "❓");
    }

    #[test]
    fn empty_store_yields_empty_board() {
        let tariff = TariffTable::default_config();
        assert!(rank_players(Vec::new(), &tariff, LEADERBOARD_SIZE).is_empty());
    }
}

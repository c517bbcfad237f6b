//! Administrative override of a player's job tier.
use serde::{Deserialize, Serialize};

use crate::constants::LOG_ADMIN_SET_JOB;
use crate::error::EconomyError;
use crate::player::PlayerRecord;
use crate::tariff::TariffTable;

/// Result of a `setjob` override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobChange {
    pub user_id: String,
    pub from_index: usize,
    pub to_index: usize,
    pub job_name: String,
    pub job_emoji: String,
}

/// Updated record plus the change summary.
#[derive(Debug, Clone, PartialEq)]
pub struct JobChangeApplied {
    pub record: PlayerRecord,
    pub change: JobChange,
}

/// Map a requested index onto the ladder.
///
/// # Errors
///
/// Returns `InvalidJobIndex` when `requested` is negative or past the top tier.
pub fn resolve_job_index(requested: i64, tariff: &TariffTable) -> Result<usize, EconomyError> {
    let invalid = || EconomyError::InvalidJobIndex {
        requested,
        min: 0,
        max: tariff.max_job_index(),
    };
    let index = usize::try_from(requested).map_err(|_| invalid())?;
    if tariff.tier(index).is_none() {
        return Err(invalid());
    }
    Ok(index)
}

/// Force `job_index` on a record. Balance, work count and cooldown are kept;
/// setting the current tier again is allowed.
///
/// # Errors
///
/// Returns `InvalidJobIndex`; the input record is unchanged.
pub fn set_job_index(
    record: &PlayerRecord,
    tariff: &TariffTable,
    user_id: &str,
    requested: i64,
) -> Result<JobChangeApplied, EconomyError> {
    let to_index = resolve_job_index(requested, tariff)?;
    let tier = tariff.tier(to_index).ok_or(EconomyError::InvalidJobIndex {
        requested,
        min: 0,
        max: tariff.max_job_index(),
    })?;

    let mut next = record.clone();
    next.job_index = to_index;
    log::info!(
        "{LOG_ADMIN_SET_JOB}: user={user_id} from={} to={to_index}",
        record.job_index
    );
    Ok(JobChangeApplied {
        record: next,
        change: JobChange {
            user_id: user_id.to_string(),
            from_index: record.job_index,
            to_index,
            job_name: tier.name.clone(),
            job_emoji: tier.emoji.clone(),
        },
    })
}

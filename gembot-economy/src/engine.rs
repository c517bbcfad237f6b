//! Read-modify-write orchestration for every player command.
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::admin::{JobChange, set_job_index};
use crate::clock::Clock;
use crate::command::{Command, CommandRequest};
use crate::constants::{
    LEADERBOARD_SIZE, LOG_RNG_DRAWS, LOG_STORE_DEGRADED, LOG_STORE_WRITE_LOST,
};
use crate::error::EconomyError;
use crate::leaderboard::{LeaderboardEntry, rank_players};
use crate::lottery::{Settlement, apply_lottery_purchase};
use crate::player::{BalanceView, PlayerRecord};
use crate::rng::RngBundle;
use crate::store::{PlayerStore, StoreError};
use crate::tariff::TariffTable;
use crate::work::{WorkContext, WorkOutcome, apply_work};

/// What to do when the store cannot be reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadPolicy {
    /// Substitute a default record on read outages and report lost writes
    /// through `Committed::persisted`.
    #[default]
    Degrade,
    /// Surface every outage as `StoreUnavailable`.
    Strict,
}

/// A command result plus whether the updated record reached the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Committed<T> {
    pub value: T,
    pub persisted: bool,
}

impl<T> Committed<T> {
    const fn durable(value: T) -> Self {
        Self {
            value,
            persisted: true,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Committed<U> {
        Committed {
            value: f(self.value),
            persisted: self.persisted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pong {
    pub latency_micros: u64,
}

/// Structured reply for any command, ready for a presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum CommandReply {
    Pong(Pong),
    Work(WorkOutcome),
    Balance(BalanceView),
    Lottery(Settlement),
    JobChanged(JobChange),
    Leaderboard { entries: Vec<LeaderboardEntry> },
}

/// A record and the precondition its write must meet.
struct Loaded {
    record: PlayerRecord,
    expected: Option<u64>,
}

impl Loaded {
    fn absent() -> Self {
        Self {
            record: PlayerRecord::fresh(),
            expected: None,
        }
    }
}

/// Economy engine wired to a store and a clock.
pub struct EconomyEngine<S, C>
where
    S: PlayerStore,
    C: Clock,
{
    store: S,
    clock: C,
    tariff: Arc<TariffTable>,
    policy: ReadPolicy,
    seed: u64,
}

impl<S, C> EconomyEngine<S, C>
where
    S: PlayerStore,
    C: Clock,
{
    /// `tariff` must already be validated.
    pub const fn new(store: S, clock: C, tariff: Arc<TariffTable>, seed: u64) -> Self {
        Self {
            store,
            clock,
            tariff,
            policy: ReadPolicy::Degrade,
            seed,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: ReadPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn clock(&self) -> &C {
        &self.clock
    }

    pub fn tariff(&self) -> &TariffTable {
        &self.tariff
    }

    pub const fn policy(&self) -> ReadPolicy {
        self.policy
    }

    /// Run the `work` action for one player.
    ///
    /// # Errors
    ///
    /// Returns `CooldownActive`, `InvalidJobIndex`, `WriteConflict` or, under
    /// the strict policy, `StoreUnavailable`.
    pub fn work(
        &self,
        user_id: &str,
        display_name: &str,
    ) -> Result<Committed<WorkOutcome>, EconomyError> {
        let Loaded { record, expected } = self.load(user_id)?;
        let ctx = WorkContext {
            tariff: &self.tariff,
            now: self.clock.now_seconds(),
            display_name,
        };
        let mut rng = RngBundle::for_player(self.seed, user_id, record.revision);
        let applied = apply_work(&record, ctx, rng.work())?;
        log::debug!(
            "{LOG_RNG_DRAWS}: user={user_id} stream=work draws={}",
            rng.work().draws()
        );
        let persisted = self.commit(user_id, applied.record, expected)?;
        Ok(Committed {
            value: applied.outcome,
            persisted,
        })
    }

    /// Read-only status. Nothing is written.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` under the strict policy.
    pub fn balance(&self, user_id: &str, display_name: &str) -> Result<BalanceView, EconomyError> {
        let loaded = self.load(user_id)?;
        Ok(BalanceView::from_record(
            &loaded.record,
            &self.tariff,
            display_name,
        ))
    }

    /// Run a batched `lottery buy`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTicketCount`, `InsufficientBalance`, `WriteConflict`
    /// or, under the strict policy, `StoreUnavailable`.
    pub fn lottery_buy(
        &self,
        user_id: &str,
        tickets: i64,
    ) -> Result<Committed<Settlement>, EconomyError> {
        let Loaded { record, expected } = self.load(user_id)?;
        let mut rng = RngBundle::for_player(self.seed, user_id, record.revision);
        let applied = apply_lottery_purchase(&record, &self.tariff, tickets, rng.lottery())?;
        log::debug!(
            "{LOG_RNG_DRAWS}: user={user_id} stream=lottery draws={}",
            rng.lottery().draws()
        );
        let persisted = self.commit(user_id, applied.record, expected)?;
        Ok(Committed {
            value: applied.settlement,
            persisted,
        })
    }

    /// Administrative job override for `target_user`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidJobIndex`, `WriteConflict` or, under the strict
    /// policy, `StoreUnavailable`.
    pub fn set_job(
        &self,
        target_user: &str,
        job_index: i64,
    ) -> Result<Committed<JobChange>, EconomyError> {
        // Range check before touching the store.
        crate::admin::resolve_job_index(job_index, &self.tariff)?;
        let Loaded { record, expected } = self.load(target_user)?;
        let applied = set_job_index(&record, &self.tariff, target_user, job_index)?;
        let persisted = self.commit(target_user, applied.record, expected)?;
        Ok(Committed {
            value: applied.change,
            persisted,
        })
    }

    /// Top players by balance.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` under the strict policy.
    pub fn rank(&self) -> Result<Vec<LeaderboardEntry>, EconomyError> {
        let records = match self.store.list() {
            Ok(records) => records,
            Err(err) => {
                self.on_read_failure("*", &err)?;
                Vec::new()
            }
        };
        Ok(rank_players(records, &self.tariff, LEADERBOARD_SIZE))
    }

    /// Liveness reply; latency is measured from `started`.
    #[must_use]
    pub fn ping(&self, started: Instant) -> Pong {
        let elapsed = started.elapsed().as_micros();
        Pong {
            latency_micros: u64::try_from(elapsed).unwrap_or(u64::MAX),
        }
    }

    /// Parse and run one envelope.
    ///
    /// # Errors
    ///
    /// Returns any parse or command error.
    pub fn dispatch(
        &self,
        request: &CommandRequest,
    ) -> Result<Committed<CommandReply>, EconomyError> {
        let started = Instant::now();
        let command = Command::parse(request)?;
        log::debug!(
            "dispatch {} from user={}",
            command.name(),
            request.user_id
        );
        self.execute(command, started)
    }

    /// Run an already-parsed command.
    ///
    /// # Errors
    ///
    /// Returns any command error.
    pub fn execute(
        &self,
        command: Command,
        started: Instant,
    ) -> Result<Committed<CommandReply>, EconomyError> {
        match command {
            Command::Ping => Ok(Committed::durable(CommandReply::Pong(self.ping(started)))),
            Command::Work {
                user_id,
                display_name,
            } => Ok(self.work(&user_id, &display_name)?.map(CommandReply::Work)),
            Command::Balance {
                user_id,
                display_name,
            } => Ok(Committed::durable(CommandReply::Balance(
                self.balance(&user_id, &display_name)?,
            ))),
            Command::LotteryBuy { user_id, tickets } => {
                Ok(self.lottery_buy(&user_id, tickets)?.map(CommandReply::Lottery))
            }
            Command::SetJob {
                target_user,
                job_index,
            } => Ok(self
                .set_job(&target_user, job_index)?
                .map(CommandReply::JobChanged)),
            Command::Rank => Ok(Committed::durable(CommandReply::Leaderboard {
                entries: self.rank()?,
            })),
        }
    }

    fn load(&self, user_id: &str) -> Result<Loaded, EconomyError> {
        match self.store.read(user_id) {
            Ok(Some(record)) => Ok(Loaded {
                expected: Some(record.revision),
                record,
            }),
            Ok(None) => Ok(Loaded::absent()),
            Err(err) => {
                self.on_read_failure(user_id, &err)?;
                // A substituted record may only be written where nothing is
                // stored; anything else is a conflict.
                Ok(Loaded::absent())
            }
        }
    }

    fn on_read_failure(&self, user_id: &str, err: &StoreError) -> Result<(), EconomyError> {
        match self.policy {
            ReadPolicy::Degrade => {
                log::warn!("{LOG_STORE_DEGRADED}: user={user_id} substituting defaults: {err}");
                Ok(())
            }
            ReadPolicy::Strict => Err(EconomyError::StoreUnavailable {
                reason: err.to_string(),
            }),
        }
    }

    /// Conditional write. `Ok(false)` means the outcome stands but the
    /// record was lost under the degrade policy.
    fn commit(
        &self,
        user_id: &str,
        mut record: PlayerRecord,
        expected_revision: Option<u64>,
    ) -> Result<bool, EconomyError> {
        record.revision = expected_revision.map_or(1, |revision| revision.saturating_add(1));
        match self.store.write(user_id, &record, expected_revision) {
            Ok(()) => Ok(true),
            Err(StoreError::Conflict { .. }) => Err(EconomyError::WriteConflict {
                user_id: user_id.to_string(),
            }),
            Err(err) => match self.policy {
                ReadPolicy::Degrade => {
                    log::error!("{LOG_STORE_WRITE_LOST}: user={user_id}: {err}");
                    Ok(false)
                }
                ReadPolicy::Strict => Err(EconomyError::StoreUnavailable {
                    reason: err.to_string(),
                }),
            },
        }
    }
}

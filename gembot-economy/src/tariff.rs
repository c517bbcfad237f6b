//! Tariff table: job ladder, work variations and the lottery prize ladder.
//!
//! A `TariffTable` is loaded once (embedded default or external JSON),
//! validated, and then shared immutably by every engine call.
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;
use thiserror::Error;

use crate::constants::{
    CURRENCY_EMOJI, CURRENCY_NAME, LOTTERY_MAX_TICKETS, LOTTERY_TICKET_PRICE,
    PRIZE_WEIGHT_EPSILON, PRIZE_WEIGHT_TOTAL, WORK_COOLDOWN_SECONDS,
};

/// Inclusive pay range, serialized as a two element array `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u64; 2]", into = "[u64; 2]")]
pub struct PayRange {
    pub low: u64,
    pub high: u64,
}

impl PayRange {
    #[must_use]
    pub const fn new(low: u64, high: u64) -> Self {
        Self { low, high }
    }
}

impl From<[u64; 2]> for PayRange {
    fn from([low, high]: [u64; 2]) -> Self {
        Self { low, high }
    }
}

impl From<PayRange> for [u64; 2] {
    fn from(range: PayRange) -> Self {
        [range.low, range.high]
    }
}

/// One rung of the job ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTier {
    pub name: String,
    pub emoji: String,
    pub pay: PayRange,
    /// Lifetime work count needed to be promoted into this tier.
    pub required_works: u64,
}

impl JobTier {
    fn new(name: &str, emoji: &str, pay: PayRange, required_works: u64) -> Self {
        Self {
            name: name.to_string(),
            emoji: emoji.to_string(),
            pay,
            required_works,
        }
    }

    /// `"{name} {emoji}"`, the label used in messages.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {}", self.name, self.emoji)
    }
}

/// Closed set of work variation categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariationKind {
    Normal,
    Late,
    Bonus,
}

impl VariationKind {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Late => "late",
            Self::Bonus => "bonus",
        }
    }
}

impl std::fmt::Display for VariationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Earnings modifier picked uniformly at random for each `work`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VariationProfile {
    Normal {
        multiplier: f64,
        message: String,
    },
    Late {
        multiplier: f64,
        message: String,
    },
    Bonus {
        multiplier: f64,
        bonus_multiplier: f64,
        message: String,
    },
}

/// Values substituted into a variation message template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFill<'a> {
    pub job_name: &'a str,
    pub earnings: u64,
    pub bonus_amount: Option<u64>,
    pub total_earnings: u64,
    pub emoji: &'a str,
}

const KEY_JOB_NAME: &str = "job_name";
const KEY_EARNINGS: &str = "earnings";
const KEY_EMOJI: &str = "emoji";
const KEY_BONUS_AMOUNT: &str = "bonus_amount";
const KEY_TOTAL_EARNINGS: &str = "total_earnings";

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{([a-z_]+)\}").expect("placeholder pattern is valid"))
}

impl VariationProfile {
    #[must_use]
    pub const fn kind(&self) -> VariationKind {
        match self {
            Self::Normal { .. } => VariationKind::Normal,
            Self::Late { .. } => VariationKind::Late,
            Self::Bonus { .. } => VariationKind::Bonus,
        }
    }

    #[must_use]
    pub const fn earnings_multiplier(&self) -> f64 {
        match self {
            Self::Normal { multiplier, .. }
            | Self::Late { multiplier, .. }
            | Self::Bonus { multiplier, .. } => *multiplier,
        }
    }

    #[must_use]
    pub const fn bonus_multiplier(&self) -> Option<f64> {
        match self {
            Self::Bonus {
                bonus_multiplier, ..
            } => Some(*bonus_multiplier),
            Self::Normal { .. } | Self::Late { .. } => None,
        }
    }

    #[must_use]
    pub fn template(&self) -> &str {
        match self {
            Self::Normal { message, .. }
            | Self::Late { message, .. }
            | Self::Bonus { message, .. } => message,
        }
    }

    /// Substitute every placeholder in a single pass; substituted values are
    /// never rescanned, so each key is filled exactly once.
    #[must_use]
    pub fn render(&self, fill: &TemplateFill<'_>) -> String {
        placeholder_pattern()
            .replace_all(self.template(), |caps: &Captures<'_>| {
                let key = &caps[1];
                match key {
                    KEY_JOB_NAME => fill.job_name.to_string(),
                    KEY_EARNINGS => crate::numbers::group_thousands(fill.earnings),
                    KEY_EMOJI => fill.emoji.to_string(),
                    KEY_BONUS_AMOUNT => fill
                        .bonus_amount
                        .map(crate::numbers::group_thousands)
                        .unwrap_or_default(),
                    KEY_TOTAL_EARNINGS => crate::numbers::group_thousands(fill.total_earnings),
                    _ => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    fn validate(&self) -> Result<(), TariffError> {
        let kind = self.kind();
        check_multiplier("variation.multiplier", self.earnings_multiplier())?;
        if let Some(bonus) = self.bonus_multiplier() {
            check_multiplier("variation.bonus_multiplier", bonus)?;
        }

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for caps in placeholder_pattern().captures_iter(self.template()) {
            *counts.entry(caps[1].to_string()).or_default() += 1;
        }

        let mut required = vec![KEY_JOB_NAME, KEY_EARNINGS];
        let mut allowed = vec![KEY_JOB_NAME, KEY_EARNINGS, KEY_EMOJI];
        if kind == VariationKind::Bonus {
            required.extend([KEY_BONUS_AMOUNT, KEY_TOTAL_EARNINGS]);
            allowed.extend([KEY_BONUS_AMOUNT, KEY_TOTAL_EARNINGS]);
        }

        for key in counts.keys() {
            if !allowed.contains(&key.as_str()) {
                return Err(TariffError::Template {
                    kind,
                    key: key.clone(),
                    problem: TemplateProblem::NotAllowed,
                });
            }
        }
        for key in required {
            match counts.get(key).copied().unwrap_or(0) {
                0 => {
                    return Err(TariffError::Template {
                        kind,
                        key: key.to_string(),
                        problem: TemplateProblem::Missing,
                    });
                }
                1 => {}
                _ => {
                    return Err(TariffError::Template {
                        kind,
                        key: key.to_string(),
                        problem: TemplateProblem::Repeated,
                    });
                }
            }
        }
        Ok(())
    }
}

/// One lottery outcome; the last entry of the ladder is the "no win" fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotteryPrizeTier {
    pub name: String,
    pub emoji: String,
    /// Payout per ticket, as a multiple of the ticket price.
    pub multiplier: u64,
    /// Share of the weight total; cumulative weights select the tier.
    pub probability: f64,
}

impl LotteryPrizeTier {
    fn new(name: &str, emoji: &str, multiplier: u64, probability: f64) -> Self {
        Self {
            name: name.to_string(),
            emoji: emoji.to_string(),
            multiplier,
            probability,
        }
    }
}

/// Lottery pricing and prize ladder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotteryConfig {
    #[serde(default = "LotteryConfig::default_ticket_price")]
    pub ticket_price: u64,
    #[serde(default = "LotteryConfig::default_max_tickets")]
    pub max_tickets: u32,
    #[serde(default = "LotteryConfig::default_weight_total")]
    pub weight_total: f64,
    pub prizes: Vec<LotteryPrizeTier>,
}

impl LotteryConfig {
    const fn default_ticket_price() -> u64 {
        LOTTERY_TICKET_PRICE
    }

    const fn default_max_tickets() -> u32 {
        LOTTERY_MAX_TICKETS
    }

    const fn default_weight_total() -> f64 {
        PRIZE_WEIGHT_TOTAL
    }

    fn default_prizes() -> Vec<LotteryPrizeTier> {
        vec![
            LotteryPrizeTier::new("Jackpot", "💰", 100, 0.1),
            LotteryPrizeTier::new("Second Prize", "🥈", 20, 0.9),
            LotteryPrizeTier::new("Third Prize", "🥉", 5, 4.0),
            LotteryPrizeTier::new("Small Win", "🎟️", 2, 15.0),
            LotteryPrizeTier::new("Refund", "🔁", 1, 20.0),
            LotteryPrizeTier::new("Miss", "💨", 0, 60.0),
        ]
    }

    /// The fallback ("no win") tier.
    #[must_use]
    pub fn fallback(&self) -> Option<&LotteryPrizeTier> {
        self.prizes.last()
    }

    fn validate(&self) -> Result<(), TariffError> {
        if self.ticket_price == 0 {
            return Err(TariffError::ZeroValue {
                field: "lottery.ticket_price",
            });
        }
        if self.max_tickets == 0 {
            return Err(TariffError::ZeroValue {
                field: "lottery.max_tickets",
            });
        }
        if !self.weight_total.is_finite() || self.weight_total <= 0.0 {
            return Err(TariffError::InvalidMultiplier {
                field: "lottery.weight_total",
                value: self.weight_total,
            });
        }
        if self.prizes.is_empty() {
            return Err(TariffError::Empty {
                field: "lottery.prizes",
            });
        }

        let mut seen = HashSet::new();
        let mut sum = 0.0_f64;
        for prize in &self.prizes {
            if !seen.insert(prize.name.as_str()) {
                return Err(TariffError::DuplicatePrize {
                    name: prize.name.clone(),
                });
            }
            if !prize.probability.is_finite() || prize.probability <= 0.0 {
                return Err(TariffError::NonPositiveWeight {
                    name: prize.name.clone(),
                    weight: prize.probability,
                });
            }
            sum += prize.probability;
        }
        if (sum - self.weight_total).abs() > PRIZE_WEIGHT_EPSILON {
            return Err(TariffError::WeightTotal {
                actual: sum,
                expected: self.weight_total,
            });
        }
        Ok(())
    }
}

impl Default for LotteryConfig {
    fn default() -> Self {
        Self {
            ticket_price: Self::default_ticket_price(),
            max_tickets: Self::default_max_tickets(),
            weight_total: Self::default_weight_total(),
            prizes: Self::default_prizes(),
        }
    }
}

/// Complete static economy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffTable {
    #[serde(default = "TariffTable::default_currency_emoji")]
    pub currency_emoji: String,
    #[serde(default = "TariffTable::default_currency_name")]
    pub currency_name: String,
    #[serde(default = "TariffTable::default_cooldown_seconds")]
    pub cooldown_seconds: f64,
    pub jobs: Vec<JobTier>,
    pub variations: Vec<VariationProfile>,
    #[serde(default)]
    pub lottery: LotteryConfig,
}

/// Problems found in a variation message template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateProblem {
    Missing,
    Repeated,
    NotAllowed,
}

impl std::fmt::Display for TemplateProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "is missing"),
            Self::Repeated => write!(f, "appears more than once"),
            Self::NotAllowed => write!(f, "is not allowed here"),
        }
    }
}

/// Errors raised when tariff invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum TariffError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error("{field} must be at least 1")]
    ZeroValue { field: &'static str },
    #[error("{field} must be a finite value >= 0 (got {value})")]
    InvalidMultiplier { field: &'static str, value: f64 },
    #[error("first job tier must require 0 works (got {required})")]
    FirstTierThreshold { required: u64 },
    #[error("job tier {index} ({name}) requires {required} works, fewer than the previous tier's {previous}")]
    DecreasingThreshold {
        index: usize,
        name: String,
        required: u64,
        previous: u64,
    },
    #[error("job tier {index} ({name}) has inverted pay range {low} > {high}")]
    PayRangeInverted {
        index: usize,
        name: String,
        low: u64,
        high: u64,
    },
    #[error("prize {name} weight must be positive (got {weight})")]
    NonPositiveWeight { name: String, weight: f64 },
    #[error("prize weights sum to {actual}, expected {expected}")]
    WeightTotal { actual: f64, expected: f64 },
    #[error("prize name {name} is used more than once")]
    DuplicatePrize { name: String },
    #[error("{kind} template: placeholder `{{{key}}}` {problem}")]
    Template {
        kind: VariationKind,
        key: String,
        problem: TemplateProblem,
    },
    #[error("tariff json could not be parsed: {0}")]
    Parse(String),
}

fn check_multiplier(field: &'static str, value: f64) -> Result<(), TariffError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(TariffError::InvalidMultiplier { field, value })
    }
}

impl TariffTable {
    fn default_currency_emoji() -> String {
        CURRENCY_EMOJI.to_string()
    }

    fn default_currency_name() -> String {
        CURRENCY_NAME.to_string()
    }

    const fn default_cooldown_seconds() -> f64 {
        WORK_COOLDOWN_SECONDS
    }

    /// The production tariff.
    #[must_use]
    pub fn default_config() -> Self {
        Self {
            currency_emoji: Self::default_currency_emoji(),
            currency_name: Self::default_currency_name(),
            cooldown_seconds: Self::default_cooldown_seconds(),
            jobs: vec![
                JobTier::new("Truant", "🏫", PayRange::new(10, 30), 0),
                JobTier::new("Miner", "⛏️", PayRange::new(30, 70), 10),
                JobTier::new("Confectioner", "🍡", PayRange::new(60, 90), 30),
                JobTier::new("Tech CEO", "💻", PayRange::new(180, 250), 50),
            ],
            variations: vec![
                VariationProfile::Normal {
                    multiplier: 1.0,
                    message: "You worked as a {job_name} and earned {earnings}{emoji}!".to_string(),
                },
                VariationProfile::Late {
                    multiplier: 0.5,
                    message: "You worked as a {job_name} but showed up late, so you only earned {earnings}{emoji}...".to_string(),
                },
                VariationProfile::Bonus {
                    multiplier: 1.0,
                    bonus_multiplier: 0.5,
                    message: "You worked as a {job_name} and earned {earnings}{emoji}! On top of that you got a {bonus_amount}{emoji} bonus!\nTotal: **{total_earnings}{emoji}**".to_string(),
                },
            ],
            lottery: LotteryConfig::default(),
        }
    }

    /// The production tariff, checked against every invariant.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded defaults violate a tariff invariant.
    pub fn validated_default() -> Result<Self, TariffError> {
        let table = Self::default_config();
        table.validate()?;
        Ok(table)
    }

    /// Parse and validate a tariff from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or any invariant fails.
    pub fn from_json(json: &str) -> Result<Self, TariffError> {
        let table: Self =
            serde_json::from_str(json).map_err(|err| TariffError::Parse(err.to_string()))?;
        table.validate()?;
        Ok(table)
    }

    /// Check every tariff invariant.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), TariffError> {
        check_multiplier("cooldown_seconds", self.cooldown_seconds)?;
        let Some(first) = self.jobs.first() else {
            return Err(TariffError::Empty { field: "jobs" });
        };
        if first.required_works != 0 {
            return Err(TariffError::FirstTierThreshold {
                required: first.required_works,
            });
        }
        let mut previous = 0;
        for (index, tier) in self.jobs.iter().enumerate() {
            if tier.pay.low > tier.pay.high {
                return Err(TariffError::PayRangeInverted {
                    index,
                    name: tier.name.clone(),
                    low: tier.pay.low,
                    high: tier.pay.high,
                });
            }
            if tier.required_works < previous {
                return Err(TariffError::DecreasingThreshold {
                    index,
                    name: tier.name.clone(),
                    required: tier.required_works,
                    previous,
                });
            }
            previous = tier.required_works;
        }

        if self.variations.is_empty() {
            return Err(TariffError::Empty {
                field: "variations",
            });
        }
        for variation in &self.variations {
            variation.validate()?;
        }
        self.lottery.validate()
    }

    #[must_use]
    pub fn tier_count(&self) -> usize {
        self.jobs.len()
    }

    /// Highest valid job index.
    #[must_use]
    pub fn max_job_index(&self) -> usize {
        self.jobs.len().saturating_sub(1)
    }

    #[must_use]
    pub fn tier(&self, index: usize) -> Option<&JobTier> {
        self.jobs.get(index)
    }

    /// The tier directly above `index`, if any.
    #[must_use]
    pub fn next_tier(&self, index: usize) -> Option<&JobTier> {
        index.checked_add(1).and_then(|next| self.jobs.get(next))
    }
}

impl Default for TariffTable {
    fn default() -> Self {
        Self::default_config()
    }
}

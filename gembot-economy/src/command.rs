//! Inbound command envelope and typed command parsing.
use std::collections::BTreeMap;

use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{FALLBACK_DISPLAY_NAME, LOTTERY_DEFAULT_TICKETS};
use crate::error::{EconomyError, TicketCountIssue};

/// A command as delivered by the chat platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub name: String,
    pub user_id: String,
    /// Server-specific nickname.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nick: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcommand: Option<String>,
    #[serde(default)]
    pub options: BTreeMap<String, Value>,
}

impl CommandRequest {
    #[must_use]
    pub fn new(name: &str, user_id: &str) -> Self {
        Self {
            name: name.to_string(),
            user_id: user_id.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_username(mut self, username: &str) -> Self {
        self.username = Some(username.to_string());
        self
    }

    #[must_use]
    pub fn with_subcommand(mut self, subcommand: &str) -> Self {
        self.subcommand = Some(subcommand.to_string());
        self
    }

    #[must_use]
    pub fn with_option(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.options.insert(key.to_string(), value.into());
        self
    }

    /// Nickname, then username, then global name, then the fallback.
    /// Blank names are skipped.
    #[must_use]
    pub fn display_name(&self) -> String {
        [&self.nick, &self.username, &self.global_name]
            .into_iter()
            .flatten()
            .map(|name| name.trim())
            .find(|name| !name.is_empty())
            .unwrap_or(FALLBACK_DISPLAY_NAME)
            .to_string()
    }
}

/// Typed command, ready for the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ping,
    Work { user_id: String, display_name: String },
    Balance { user_id: String, display_name: String },
    LotteryBuy { user_id: String, tickets: i64 },
    SetJob { target_user: String, job_index: i64 },
    Rank,
}

impl Command {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Work { .. } => "work",
            Self::Balance { .. } => "balance",
            Self::LotteryBuy { .. } => "lottery",
            Self::SetJob { .. } => "setjob",
            Self::Rank => "rank",
        }
    }

    /// Resolve an envelope into a command.
    ///
    /// # Errors
    ///
    /// Returns `UnknownCommand` for unrecognized names or a `lottery` request
    /// without the `buy` sub-command, `MissingArguments` when `setjob` lacks
    /// an option, and `InvalidTicketCount` for a non-integer `amount`.
    pub fn parse(request: &CommandRequest) -> Result<Self, EconomyError> {
        match request.name.as_str() {
            "ping" => Ok(Self::Ping),
            "work" => Ok(Self::Work {
                user_id: request.user_id.clone(),
                display_name: request.display_name(),
            }),
            "balance" => Ok(Self::Balance {
                user_id: request.user_id.clone(),
                display_name: request.display_name(),
            }),
            "rank" => Ok(Self::Rank),
            "lottery" => parse_lottery(request),
            "setjob" => parse_set_job(request),
            other => Err(EconomyError::UnknownCommand {
                name: other.to_string(),
            }),
        }
    }
}

fn parse_lottery(request: &CommandRequest) -> Result<Command, EconomyError> {
    match request.subcommand.as_deref() {
        Some("buy") => {}
        other => {
            let name = other.map_or_else(
                || "lottery".to_string(),
                |sub| format!("lottery {sub}"),
            );
            return Err(EconomyError::UnknownCommand { name });
        }
    }
    let tickets = match request.options.get("amount") {
        None | Some(Value::Null) => LOTTERY_DEFAULT_TICKETS,
        Some(value) => integer_option(value).ok_or(EconomyError::InvalidTicketCount {
            reason: TicketCountIssue::NotInteger,
        })?,
    };
    Ok(Command::LotteryBuy {
        user_id: request.user_id.clone(),
        tickets,
    })
}

fn parse_set_job(request: &CommandRequest) -> Result<Command, EconomyError> {
    let missing = |missing: &'static str| EconomyError::MissingArguments {
        command: request.name.clone(),
        missing,
    };
    let target_user = match request.options.get("target_user") {
        Some(Value::String(id)) if !id.trim().is_empty() => id.trim().to_string(),
        Some(Value::Number(id)) => id.to_string(),
        _ => return Err(missing("target_user")),
    };
    // Non-integer indices are treated as absent; the platform types the
    // option as an integer.
    let job_index = request
        .options
        .get("job_index")
        .and_then(integer_option)
        .ok_or_else(|| missing("job_index"))?;
    Ok(Command::SetJob {
        target_user,
        job_index,
    })
}

/// Integral JSON number (`3` or `3.0`) or numeric string. Whole numbers
/// outside the `i64` range saturate so range checks still see them.
fn integer_option(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_u64().map(|_| i64::MAX))
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|float| float.is_finite() && float.fract() == 0.0)
                    .map(|float| float.to_i64().unwrap_or(saturated(float > 0.0)))
            }),
        Value::String(text) => {
            let text = text.trim();
            text.parse().ok().or_else(|| {
                let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
                (!digits.is_empty() && digits.bytes().all(|byte| byte.is_ascii_digit()))
                    .then(|| saturated(!text.starts_with('-')))
            })
        }
        _ => None,
    }
}

const fn saturated(positive: bool) -> i64 {
    if positive { i64::MAX } else { i64::MIN }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_prefers_nick_then_username_then_global() {
        let mut request = CommandRequest::new("work", "u1");
        assert_eq!(request.display_name(), "Player");
        request.global_name = Some("Global".into());
        assert_eq!(request.display_name(), "Global");
        request.username = Some("user".into());
        assert_eq!(request.display_name(), "user");
        request.nick = Some("  ".into());
        assert_eq!(request.display_name(), "user");
        request.nick = Some("Nick".into());
        assert_eq!(request.display_name(), "Nick");
    }

    #[test]
    fn lottery_requires_buy_and_defaults_amount() {
        let bare = CommandRequest::new("lottery", "u1");
        assert_eq!(
            Command::parse(&bare).unwrap_err(),
            EconomyError::UnknownCommand {
                name: "lottery".into()
            }
        );
        let sell = bare.clone().with_subcommand("sell");
        assert!(matches!(
            Command::parse(&sell),
            Err(EconomyError::UnknownCommand { .. })
        ));
        let buy = bare.with_subcommand("buy");
        assert_eq!(
            Command::parse(&buy).unwrap(),
            Command::LotteryBuy {
                user_id: "u1".into(),
                tickets: 1
            }
        );
    }

    #[test]
    fn lottery_amount_must_be_integral() {
        let buy = CommandRequest::new("lottery", "u1").with_subcommand("buy");
        let whole = buy.clone().with_option("amount", 3.0);
        assert_eq!(
            Command::parse(&whole).unwrap(),
            Command::LotteryBuy {
                user_id: "u1".into(),
                tickets: 3
            }
        );
        let fractional = buy.clone().with_option("amount", 2.5);
        assert_eq!(
            Command::parse(&fractional).unwrap_err(),
            EconomyError::InvalidTicketCount {
                reason: TicketCountIssue::NotInteger
            }
        );
        // Range checks belong to the lottery engine, not the parser.
        let negative = buy.with_option("amount", -5);
        assert_eq!(
            Command::parse(&negative).unwrap(),
            Command::LotteryBuy {
                user_id: "u1".into(),
                tickets: -5
            }
        );
    }

    #[test]
    fn oversized_whole_amounts_saturate_instead_of_reading_as_fractions() {
        let buy = CommandRequest::new("lottery", "u1").with_subcommand("buy");
        for amount in [
            Value::from(u64::MAX),
            Value::from(1e20),
            Value::from("99999999999999999999999"),
        ] {
            let request = buy.clone().with_option("amount", amount);
            assert_eq!(
                Command::parse(&request).unwrap(),
                Command::LotteryBuy {
                    user_id: "u1".into(),
                    tickets: i64::MAX
                }
            );
        }
        let hugely_negative = buy.clone().with_option("amount", -1e20);
        assert!(matches!(
            Command::parse(&hugely_negative),
            Ok(Command::LotteryBuy {
                tickets: i64::MIN,
                ..
            })
        ));
        let garbage = buy.with_option("amount", "12abc");
        assert_eq!(
            Command::parse(&garbage).unwrap_err(),
            EconomyError::InvalidTicketCount {
                reason: TicketCountIssue::NotInteger
            }
        );
    }

    #[test]
    fn setjob_requires_both_options() {
        let request = CommandRequest::new("setjob", "admin");
        assert_eq!(
            Command::parse(&request).unwrap_err(),
            EconomyError::MissingArguments {
                command: "setjob".into(),
                missing: "target_user"
            }
        );
        let with_target = request.with_option("target_user", "u9");
        assert_eq!(
            Command::parse(&with_target).unwrap_err(),
            EconomyError::MissingArguments {
                command: "setjob".into(),
                missing: "job_index"
            }
        );
        let complete = with_target.with_option("job_index", 2);
        assert_eq!(
            Command::parse(&complete).unwrap(),
            Command::SetJob {
                target_user: "u9".into(),
                job_index: 2
            }
        );
    }

    #[test]
    fn unknown_names_are_rejected() {
        let request = CommandRequest::new("steal", "u1");
        assert_eq!(
            Command::parse(&request).unwrap_err().to_string(),
            "unknown command `steal`"
        );
    }

    #[test]
    fn envelope_deserializes_from_json() {
        let json = r#"{
            "name": "lottery",
            "user_id": "42",
            "nick": "Mika",
            "subcommand": "buy",
            "options": {"amount": 10}
        }"#;
        let request: CommandRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.display_name(), "Mika");
        assert_eq!(
            Command::parse(&request).unwrap(),
            Command::LotteryBuy {
                user_id: "42".into(),
                tickets: 10
            }
        );
    }
}

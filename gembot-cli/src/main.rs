mod file_store;
mod render;
mod reports;
mod simulation;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use file_store::JsonFileStore;
use gembot_economy::{CommandRequest, EconomyEngine, ReadPolicy, SystemClock, TariffTable};
use render::{OutputFormat, write_error, write_reply};
use simulation::{SimulationConfig, run_simulation};

#[derive(Debug, Parser)]
#[command(name = "gembot", version)]
#[command(about = "Gem economy chat-bot commands: work, lottery, leaderboard and simulation")]
struct Args {
    /// Directory holding one JSON record per player
    #[arg(long, env = "GEMBOT_STORE_DIR", default_value = ".gembot/players", global = true)]
    store: PathBuf,

    /// Tariff JSON to load instead of the built-in table
    #[arg(long, global = true)]
    tariff: Option<PathBuf>,

    /// Fail commands when the store is unreachable instead of using defaults
    #[arg(long, global = true)]
    strict_store: bool,

    /// Seed for deterministic rolls (random when omitted)
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Reply format for player commands
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    /// Optional path to write output instead of stdout
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Clone, clap::Args)]
struct PlayerArgs {
    /// Player user id
    user: String,

    /// Server nickname (preferred display name)
    #[arg(long)]
    nick: Option<String>,

    #[arg(long)]
    username: Option<String>,

    #[arg(long)]
    global_name: Option<String>,
}

#[derive(Debug, Clone, Subcommand)]
enum LotteryAction {
    /// Buy lottery tickets (default 1, at most 1000)
    Buy {
        /// Player user id
        user: String,
        /// Number of tickets
        #[arg(allow_hyphen_values = true)]
        amount: Option<String>,
    },
}

#[derive(Debug, Clone, clap::Args)]
struct SimulateArgs {
    /// Players per run
    #[arg(long, default_value_t = 10)]
    players: usize,

    /// Work rounds per player
    #[arg(long, default_value_t = 60)]
    rounds: u32,

    /// Seeds to run (comma-separated)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Share of balance spent on lottery tickets after each work (0 to 1)
    #[arg(long, default_value_t = 0.25, value_parser = parse_fraction)]
    lottery_fraction: f64,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["console", "json", "markdown"])]
    report: String,
}

#[derive(Debug, Clone, Subcommand)]
enum CliCommand {
    /// Work a shift: earn gems, maybe get promoted
    Work(PlayerArgs),
    /// Show balance, job and promotion progress
    Balance(PlayerArgs),
    /// Lottery commands
    Lottery {
        #[command(subcommand)]
        action: LotteryAction,
    },
    /// Force a player's job tier (administrative)
    #[command(name = "setjob")]
    SetJob {
        target_user: String,
        #[arg(allow_negative_numbers = true)]
        job_index: i64,
    },
    /// Show the top players by balance
    Rank,
    /// Liveness check
    Ping,
    /// Run a JSON command envelope from a file or stdin
    Dispatch {
        /// Path to the request JSON (stdin when omitted)
        request: Option<PathBuf>,
    },
    /// Simulate the economy over many players and rounds
    Simulate(SimulateArgs),
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let tariff = Arc::new(load_tariff(args.tariff.as_deref())?);
    let mut output_target = OutputTarget::new(args.output.clone())?;

    let exit_code = match &args.command {
        CliCommand::Simulate(sim) => {
            run_simulate(&mut output_target, &tariff, sim)?;
            0
        }
        command => {
            let request = build_request(command)?;
            run_player_command(&args, &mut output_target, tariff, &request)?
        }
    };

    output_target.flush_inner()?;
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

fn load_tariff(path: Option<&Path>) -> Result<TariffTable> {
    let Some(path) = path else {
        return TariffTable::validated_default().context("built-in tariff is invalid");
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read tariff {}", path.display()))?;
    let tariff = TariffTable::from_json(&raw)
        .with_context(|| format!("invalid tariff {}", path.display()))?;
    log::info!("loaded tariff from {}", path.display());
    Ok(tariff)
}

fn player_request(name: &str, player: &PlayerArgs) -> CommandRequest {
    let mut request = CommandRequest::new(name, &player.user);
    request.nick.clone_from(&player.nick);
    request.username.clone_from(&player.username);
    request.global_name.clone_from(&player.global_name);
    request
}

/// Integer-looking values travel as JSON numbers so the envelope parser
/// applies the same rules to CLI input as to platform input.
fn option_value(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw.trim()).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

fn build_request(command: &CliCommand) -> Result<CommandRequest> {
    let request = match command {
        CliCommand::Work(player) => player_request("work", player),
        CliCommand::Balance(player) => player_request("balance", player),
        CliCommand::Lottery {
            action: LotteryAction::Buy { user, amount },
        } => {
            let request = CommandRequest::new("lottery", user).with_subcommand("buy");
            match amount {
                Some(raw) => request.with_option("amount", option_value(raw)),
                None => request,
            }
        }
        CliCommand::SetJob {
            target_user,
            job_index,
        } => CommandRequest::new("setjob", "cli-admin")
            .with_option("target_user", target_user.as_str())
            .with_option("job_index", *job_index),
        CliCommand::Rank => CommandRequest::new("rank", "cli"),
        CliCommand::Ping => CommandRequest::new("ping", "cli"),
        CliCommand::Dispatch { request } => read_request(request.as_deref())?,
        CliCommand::Simulate(_) => anyhow::bail!("simulate is not a player command"),
    };
    Ok(request)
}

fn read_request(path: Option<&Path>) -> Result<CommandRequest> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read request {}", path.display()))?,
        None => std::io::read_to_string(std::io::stdin()).context("failed to read stdin")?,
    };
    serde_json::from_str(&raw).context("request is not a valid command envelope")
}

fn run_player_command(
    args: &Args,
    output_target: &mut OutputTarget,
    tariff: Arc<TariffTable>,
    request: &CommandRequest,
) -> Result<i32> {
    let policy = if args.strict_store {
        ReadPolicy::Strict
    } else {
        ReadPolicy::Degrade
    };
    let seed = args.seed.unwrap_or_else(rand::random);
    log::debug!("store={} seed={seed} policy={policy:?}", args.store.display());

    let engine = EconomyEngine::new(
        JsonFileStore::new(&args.store),
        SystemClock,
        Arc::clone(&tariff),
        seed,
    )
    .with_policy(policy);

    match engine.dispatch(request) {
        Ok(reply) => {
            write_reply(output_target, args.format, &reply, &tariff)?;
            Ok(0)
        }
        Err(err) => {
            log::info!("{} rejected: {err}", request.name);
            write_error(output_target, args.format, &err, &tariff)?;
            Ok(1)
        }
    }
}

fn parse_fraction(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("`{raw}` is not a number"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("`{raw}` must be between 0 and 1"))
    }
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn run_simulate(
    output_target: &mut OutputTarget,
    tariff: &Arc<TariffTable>,
    sim: &SimulateArgs,
) -> Result<()> {
    let seeds = split_csv(&sim.seeds)
        .iter()
        .map(|token| {
            token
                .parse::<u64>()
                .with_context(|| format!("invalid seed `{token}`"))
        })
        .collect::<Result<Vec<_>>>()?;
    let config =
        SimulationConfig::new(sim.players, sim.rounds).with_lottery_fraction(sim.lottery_fraction);

    if sim.report == "console" {
        announce_banner();
    }
    let start_time = Instant::now();
    let runs = seeds
        .iter()
        .map(|&seed| run_simulation(tariff, &config, seed))
        .collect::<Result<Vec<_>>>()?;

    match sim.report.as_str() {
        "json" => reports::generate_json_report(output_target, &runs)?,
        "markdown" => reports::generate_markdown_report(output_target, &runs)?,
        _ => reports::generate_console_report(output_target, &runs, start_time.elapsed())?,
    }
    Ok(())
}

fn announce_banner() {
    println!("{}", "💎 Gembot Economy Simulator".bright_cyan().bold());
    println!("{}", "===========================".cyan());
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gembot_economy::Command;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn lottery_amount_reaches_the_envelope_as_a_number() {
        let args = parse(&["gembot", "lottery", "buy", "u1", "5"]);
        let request = build_request(&args.command).unwrap();
        assert_eq!(
            Command::parse(&request).unwrap(),
            Command::LotteryBuy {
                user_id: "u1".into(),
                tickets: 5
            }
        );
    }

    #[test]
    fn lottery_amount_defaults_and_rejects_fractions() {
        let default = parse(&["gembot", "lottery", "buy", "u1"]);
        let request = build_request(&default.command).unwrap();
        assert!(matches!(
            Command::parse(&request),
            Ok(Command::LotteryBuy { tickets: 1, .. })
        ));

        let fractional = parse(&["gembot", "lottery", "buy", "u1", "2.5"]);
        let request = build_request(&fractional.command).unwrap();
        assert!(Command::parse(&request).is_err());
    }

    #[test]
    fn setjob_accepts_negative_indices_for_engine_validation() {
        let args = parse(&["gembot", "setjob", "u9", "-1"]);
        let request = build_request(&args.command).unwrap();
        assert_eq!(
            Command::parse(&request).unwrap(),
            Command::SetJob {
                target_user: "u9".into(),
                job_index: -1
            }
        );
    }

    #[test]
    fn work_uses_nick_before_username() {
        let args = parse(&["gembot", "work", "u1", "--username", "user", "--nick", "Nick"]);
        let request = build_request(&args.command).unwrap();
        assert_eq!(request.display_name(), "Nick");
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let args = parse(&[
            "gembot",
            "rank",
            "--store",
            "/tmp/players",
            "--strict-store",
            "--format",
            "json",
        ]);
        assert_eq!(args.store, PathBuf::from("/tmp/players"));
        assert!(args.strict_store);
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn lottery_fraction_must_stay_within_unit_range() {
        let args = parse(&["gembot", "simulate", "--lottery-fraction", "1"]);
        let CliCommand::Simulate(sim) = args.command else {
            panic!("expected simulate");
        };
        assert!((sim.lottery_fraction - 1.0).abs() < f64::EPSILON);

        for bad in ["2.0", "-0.1", "NaN", "lots"] {
            assert!(
                Args::try_parse_from(["gembot", "simulate", "--lottery-fraction", bad]).is_err(),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn split_csv_drops_blanks() {
        assert_eq!(split_csv(" 1, ,2,"), vec!["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn load_tariff_reads_shipped_asset() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/tariff.json");
        let tariff = load_tariff(Some(&path)).unwrap();
        assert_eq!(tariff, TariffTable::default_config());
    }
}

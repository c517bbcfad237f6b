use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use gembot_economy::numbers::group_thousands;
use serde_json::json;

use crate::simulation::SimulationSummary;

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = part as f64 / whole as f64;
    ratio * 100.0
}

pub fn generate_console_report(
    out: &mut impl Write,
    runs: &[SimulationSummary],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Economy Simulation Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "=============================".cyan())?;
    writeln!(out, "Runs: {}", runs.len())?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for run in runs {
        writeln!(
            out,
            "{} seed {} · {} players × {} rounds",
            "🎲".bold(),
            run.seed.to_string().bold(),
            run.players,
            run.rounds
        )?;
        writeln!(
            out,
            "   Works: {} · Earned: {} · Promotions: {}",
            run.works,
            group_thousands(run.work_earnings),
            run.promotions
        )?;
        writeln!(
            out,
            "   Balances: min {} · median {} · mean {:.1} · max {}",
            group_thousands(run.balances.min),
            group_thousands(run.balances.median),
            run.balances.mean,
            group_thousands(run.balances.max)
        )?;
        let tiers: Vec<String> = run
            .tiers
            .iter()
            .map(|tier| format!("{} {} {}", tier.emoji, tier.name, tier.players))
            .collect();
        writeln!(out, "   Tiers: {}", tiers.join(" · "))?;

        if run.tickets == 0 {
            writeln!(out, "   Lottery: {}", "no tickets bought".dimmed())?;
        } else {
            let realized = format!("{:.1}%", run.realized_return * 100.0);
            let realized = if run.lottery_winnings >= run.lottery_cost {
                realized.green()
            } else {
                realized.red()
            };
            writeln!(
                out,
                "   Lottery: {} tickets · spent {} · won {} · return {}",
                group_thousands(run.tickets),
                group_thousands(run.lottery_cost),
                group_thousands(run.lottery_winnings),
                realized
            )?;
            for prize in &run.prizes {
                writeln!(
                    out,
                    "     • {} {}: {} ({:.2}%)",
                    prize.emoji,
                    prize.name,
                    prize.count,
                    percent(prize.count, run.tickets)
                )?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn generate_json_report(out: &mut impl Write, runs: &[SimulationSummary]) -> Result<()> {
    let body = json!({
        "generated_at": Utc::now().to_rfc3339(),
        "runs": runs,
    });
    writeln!(out, "{}", serde_json::to_string_pretty(&body)?)?;
    Ok(())
}

pub fn generate_markdown_report(out: &mut impl Write, runs: &[SimulationSummary]) -> Result<()> {
    writeln!(out, "# Gembot Economy Simulation\n")?;
    writeln!(out, "_Generated {}_\n", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"))?;
    writeln!(
        out,
        "| Seed | Players | Rounds | Promotions | Median balance | Tickets | Return |"
    )?;
    writeln!(out, "|---|---|---|---|---|---|---|")?;
    for run in runs {
        writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} | {:.1}% |",
            run.seed,
            run.players,
            run.rounds,
            run.promotions,
            run.balances.median,
            run.tickets,
            run.realized_return * 100.0
        )?;
    }
    writeln!(out)?;

    for run in runs {
        writeln!(out, "## Seed {}\n", run.seed)?;
        writeln!(out, "- **Work earnings**: {}", run.work_earnings)?;
        writeln!(out, "- **Lottery cost**: {}", run.lottery_cost)?;
        writeln!(out, "- **Lottery winnings**: {}", run.lottery_winnings)?;
        writeln!(out, "- **Tier distribution**:")?;
        for tier in &run.tiers {
            writeln!(out, "  - {} {}: {}", tier.emoji, tier.name, tier.players)?;
        }
        if run.tickets > 0 {
            writeln!(out, "- **Prize distribution**:")?;
            for prize in &run.prizes {
                writeln!(
                    out,
                    "  - {} {}: {} ({:.2}%)",
                    prize.emoji,
                    prize.name,
                    prize.count,
                    percent(prize.count, run.tickets)
                )?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

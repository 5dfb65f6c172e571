use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use std::io::Write;
use umathyoi_calc::StatKind;

use super::runner::{RunReport, average, total_mean};

const REPORT_TITLE: &str = "Umathyoi Deck Efficiency Report";

fn stat_header() -> String {
    StatKind::ALL
        .iter()
        .map(|stat| format!("{:>9}", stat.to_string()))
        .collect::<String>()
}

pub fn generate_console_report(out: &mut dyn Write, reports: &[RunReport]) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", format!("📊 {REPORT_TITLE}").bright_cyan().bold())?;
    writeln!(out, "{}", "=================================".cyan())?;

    if let Some(first) = reports.first() {
        writeln!(out, "Deck: {}", first.deck.bold())?;
        writeln!(out, "Scenario: {}", first.scenario)?;
        writeln!(out, "Turns per run: {}", first.turn_count)?;
    }
    writeln!(out, "Runs: {}", reports.len())?;
    writeln!(out)?;

    for report in reports {
        writeln!(
            out,
            "{} {} {}",
            "🎲 Seed".bold(),
            report.seed.to_string().bold(),
            format!("(fingerprint {}, {:.1} ms)", report.fingerprint, report.duration_ms).dimmed()
        )?;
        writeln!(out, "   {:<9}{:>7}{}", "Facility", "Cards", stat_header())?;
        for facility in &report.facilities {
            let means: String = StatKind::ALL
                .iter()
                .map(|stat| format!("{:>9.2}", facility.mean(*stat)))
                .collect();
            writeln!(
                out,
                "   {:<9}{:>7.2}{}",
                facility.facility.to_string(),
                facility.mean_landed,
                means
            )?;
        }
        if let Some(best) = report.best_facility() {
            writeln!(
                out,
                "   Best facility: {} ({:.2} stats/turn)",
                best.facility.to_string().green(),
                total_mean(best)
            )?;
        }
        if !report.warnings.is_empty() {
            writeln!(out, "   Warnings:")?;
            for warning in &report.warnings {
                writeln!(out, "     • {}", warning.yellow())?;
            }
        }
        writeln!(out)?;
    }

    if reports.len() > 1 {
        writeln!(out, "{}", "⚡ Across Seeds".bright_yellow().bold())?;
        writeln!(out, "{}", "==============".yellow())?;
        let facilities = reports.first().map_or(0, |report| report.facilities.len());
        for index in 0..facilities {
            let label = reports[0].facilities[index].facility.to_string();
            let mean = average(reports, |report| total_mean(&report.facilities[index]));
            writeln!(out, "{label:<9} {mean:>9.2} stats/turn")?;
        }
        writeln!(out)?;
    }

    Ok(())
}

pub fn generate_json_report(out: &mut dyn Write, reports: &[RunReport]) -> Result<()> {
    let json_output = serde_json::to_string_pretty(reports)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report(out: &mut dyn Write, reports: &[RunReport]) -> Result<()> {
    writeln!(out, "# {REPORT_TITLE}\n")?;
    writeln!(
        out,
        "Generated: {}\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    )?;

    writeln!(out, "## Summary\n")?;
    if let Some(first) = reports.first() {
        writeln!(out, "- **Deck**: {}", first.deck)?;
        writeln!(out, "- **Scenario**: {}", first.scenario)?;
        writeln!(out, "- **Turns per run**: {}", first.turn_count)?;
    }
    writeln!(out, "- **Runs**: {}\n", reports.len())?;

    let header: String = StatKind::ALL.iter().map(|stat| format!(" {stat} |")).collect();
    let rule: String = StatKind::ALL.iter().map(|_| "---:|").collect();

    for report in reports {
        writeln!(out, "## Seed {}\n", report.seed)?;
        writeln!(out, "Fingerprint `{}`\n", report.fingerprint)?;
        writeln!(out, "| Facility | Cards |{header}")?;
        writeln!(out, "|---|---:|{rule}")?;
        for facility in &report.facilities {
            let means: String = StatKind::ALL
                .iter()
                .map(|stat| format!(" {:.2} |", facility.mean(*stat)))
                .collect();
            writeln!(
                out,
                "| {} | {:.2} |{means}",
                facility.facility, facility.mean_landed
            )?;
        }
        writeln!(out)?;

        if !report.warnings.is_empty() {
            writeln!(out, "### Warnings\n")?;
            for warning in &report.warnings {
                writeln!(out, "- {warning}")?;
            }
            writeln!(out)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::runner::run_seeds;
    use umathyoi_calc::{Deck, SimulationConfig, Simulator, TrainingContext};

    fn reports() -> Vec<RunReport> {
        run_seeds(
            &Simulator::default(),
            &Deck::default(),
            &TrainingContext::default(),
            &SimulationConfig::default().with_turn_count(10),
            &[1, 2],
            |_, _| {},
        )
        .unwrap()
    }

    #[test]
    fn markdown_has_a_table_per_seed() {
        let mut buffer = Vec::new();
        generate_markdown_report(&mut buffer, &reports()).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with(&format!("# {REPORT_TITLE}")));
        assert!(text.contains("## Seed 1"));
        assert!(text.contains("## Seed 2"));
        assert!(text.contains("| Facility | Cards |"));
    }

    #[test]
    fn json_round_trips_as_an_array() {
        let mut buffer = Vec::new();
        generate_json_report(&mut buffer, &reports()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        let runs = value.as_array().unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0]["facilities"].as_array().map(Vec::len), Some(5));
    }

    #[test]
    fn console_summarises_across_seeds() {
        colored::control::set_override(false);
        let mut buffer = Vec::new();
        generate_console_report(&mut buffer, &reports()).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("Runs: 2"));
        assert!(text.contains("Across Seeds"));
        assert!(text.contains("Best facility"));
    }
}

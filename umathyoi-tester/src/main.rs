use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use umathyoi_calc::constants::URA_FINALS_NAME;
use umathyoi_calc::{
    CalculatorEngine, DataLoader, Deck, Mood, SimulationConfig, TrainingContext,
};

mod logic;

use logic::FileLoader;
use logic::seeds::split_csv;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Console,
    Json,
    Markdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MoodArg {
    Awful,
    Bad,
    Normal,
    Good,
    Great,
}

impl From<MoodArg> for Mood {
    fn from(value: MoodArg) -> Self {
        match value {
            MoodArg::Awful => Self::Awful,
            MoodArg::Bad => Self::Bad,
            MoodArg::Normal => Self::Normal,
            MoodArg::Good => Self::Good,
            MoodArg::Great => Self::Great,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "umathyoi-tester")]
#[command(about = "Simulate support deck stat gains from JSON card data")]
#[command(version)]
struct Args {
    /// Card catalog JSON file
    #[arg(long)]
    cards: PathBuf,

    /// Deck JSON file
    #[arg(long)]
    deck: Option<PathBuf>,

    /// Scenario JSON file (built-in URA Finals when omitted)
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Training context JSON file
    #[arg(long)]
    context: Option<PathBuf>,

    /// Override the context's mood
    #[arg(long, value_enum)]
    mood: Option<MoodArg>,

    /// Override the context's fan count
    #[arg(long)]
    fans: Option<u32>,

    /// Simulated turns per seed
    #[arg(long, default_value_t = umathyoi_calc::constants::DEFAULT_TURN_COUNT)]
    turns: u32,

    /// Comma-separated seeds (decimal, 0x hex, or `default`)
    #[arg(long, default_value = "default")]
    seeds: String,

    /// Report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Print run progress
    #[arg(short, long)]
    verbose: bool,

    /// Write the report to a file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// List catalog cards (optionally filtered by --search) and exit
    #[arg(long)]
    list_cards: bool,

    /// Case-insensitive card name filter for --list-cards
    #[arg(long)]
    search: Option<String>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.output.is_some() {
        colored::control::set_override(false);
    }

    let engine = CalculatorEngine::new(FileLoader::new(args.cards.clone()));
    if maybe_list_cards(&args, &engine)? {
        return Ok(());
    }

    announce_banner(&args);

    let Some(deck_path) = args.deck.as_deref() else {
        bail!("--deck is required unless --list-cards is given");
    };
    let (_, deck) = engine.load_deck(&path_name(deck_path))?;
    let context = load_context(&args, &engine)?;
    let scenario_name = args
        .scenario
        .as_deref()
        .map_or_else(|| URA_FINALS_NAME.to_string(), path_name);
    let simulator = engine
        .simulator(&scenario_name)
        .with_context(|| format!("failed to load scenario {scenario_name}"))?;

    let seeds = logic::resolve_seed_inputs(&split_csv(&args.seeds))?;
    let config = SimulationConfig::default().with_turn_count(args.turns);
    let verbose = args.verbose;
    let reports = logic::run_seeds(&simulator, &deck, &context, &config, &seeds, |seed, percent| {
        if verbose && percent_milestone(percent) {
            eprintln!("   seed {seed}: {percent:.0}%");
        }
    })?;

    write_reports(&args, &deck, &reports)
}

fn path_name(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn percent_milestone(percent: f32) -> bool {
    let rounded = percent.round();
    (percent - rounded).abs() < 0.01 && (rounded % 25.0).abs() < f32::EPSILON
}

fn load_context(args: &Args, engine: &CalculatorEngine<FileLoader>) -> Result<TrainingContext> {
    let mut context: TrainingContext = match args.context.as_deref() {
        Some(path) => engine
            .loader()
            .load_config(&path_name(path))
            .with_context(|| format!("failed to load context {}", path.display()))?,
        None => TrainingContext::default(),
    };
    if let Some(mood) = args.mood {
        context.mood = mood.into();
    }
    if let Some(fans) = args.fans {
        context.fan_count = fans;
    }
    Ok(context)
}

fn maybe_list_cards(args: &Args, engine: &CalculatorEngine<FileLoader>) -> Result<bool> {
    if !args.list_cards {
        return Ok(false);
    }

    let catalog = engine
        .loader()
        .load_cards()
        .with_context(|| format!("failed to load cards from {}", args.cards.display()))?;
    let needle = args.search.clone().unwrap_or_default();

    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available cards:")?;
    for card in catalog.search(&needle) {
        writeln!(
            output_target.writer(),
            "  {:>6}  {:<3} {:<8} {}",
            card.id.0,
            format!("{:?}", card.rarity),
            card.kind.to_string(),
            card.name
        )?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner(args: &Args) {
    if args.report != ReportFormat::Console || args.output.is_some() {
        return;
    }
    println!("{}", "🐎 Umathyoi Deck Tester".bright_cyan().bold());
    println!("{}", "=======================".cyan());
}

fn write_reports(args: &Args, deck: &Deck, reports: &[logic::RunReport]) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report {
        ReportFormat::Json => logic::reports::generate_json_report(&mut output_target, reports)?,
        ReportFormat::Markdown => {
            logic::reports::generate_markdown_report(&mut output_target, reports)?;
        }
        ReportFormat::Console => {
            if deck.is_empty() {
                writeln!(
                    &mut output_target,
                    "{}",
                    "Deck has no cards; facilities show scenario base gains.".yellow()
                )?;
            }
            logic::reports::generate_console_report(&mut output_target, reports)?;
        }
    }

    output_target.flush_inner()?;
    if let Some(path) = &args.output {
        println!("Report written to {}", path.display());
    }
    Ok(())
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

    fn base_args() -> Args {
        Args {
            cards: PathBuf::from("cards.json"),
            deck: None,
            scenario: None,
            context: None,
            mood: None,
            fans: None,
            turns: 10,
            seeds: "default".to_string(),
            report: ReportFormat::Console,
            verbose: false,
            output: None,
            list_cards: false,
            search: None,
        }
    }

    #[test]
    fn parses_flags() {
        let args = Args::try_parse_from([
            "umathyoi-tester",
            "--cards",
            "c.json",
            "--deck",
            "d.json",
            "--report",
            "markdown",
            "--mood",
            "great",
            "--seeds",
            "1,2",
        ])
        .unwrap();
        assert_eq!(args.report, ReportFormat::Markdown);
        assert_eq!(args.mood, Some(MoodArg::Great));
        assert_eq!(args.turns, 1000);
    }

    #[test]
    fn context_overrides_apply() {
        let args = Args {
            mood: Some(MoodArg::Awful),
            fans: Some(5),
            ..base_args()
        };
        let engine = CalculatorEngine::new(FileLoader::new("cards.json"));
        let context = load_context(&args, &engine).unwrap();
        assert_eq!(context.mood, Mood::Awful);
        assert_eq!(context.fan_count, 5);
    }

    #[test]
    fn progress_milestones_are_quarters() {
        assert!(percent_milestone(25.0));
        assert!(percent_milestone(100.0));
        assert!(!percent_milestone(26.0));
        assert!(!percent_milestone(25.5));
    }

    #[test]
    fn write_reports_emits_json_output() {
        let temp = std::env::temp_dir().join("umathyoi-test-report.json");
        let args = Args {
            report: ReportFormat::Json,
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &Deck::default(), &[]).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("[]"));
    }
}

mod classify;
mod error;
mod export;
mod grid;
mod report;
mod search;
mod simulation;
mod snapshot;
mod stats;

use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};

use crate::classify::ClassifiedRule;
use crate::error::Result;
use crate::export::ExportConfig;
use crate::grid::{Rule, RULE_COUNT};
use crate::search::SurveyConfig;
use crate::snapshot::Snapshot;

#[derive(Debug, Parser)]
#[command(name = "catcube", about = "Survey of 3D totalistic cellular automata")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Simulate and classify all 256 rules.
    Survey(SurveyArgs),
    /// Simulate and classify a single rule.
    Rule(RuleArgs),
    /// Print the report for a saved classification table.
    Report(ReportArgs),
}

#[derive(Debug, Args)]
struct SurveyArgs {
    /// Lattice side length (odd).
    #[arg(long, default_value_t = 51)]
    size: usize,
    /// Generations per rule.
    #[arg(long, default_value_t = 100)]
    generations: u32,
    /// Where to save the survey snapshot [default: <output>/snapshot.json].
    #[arg(long)]
    snapshot: Option<PathBuf>,
    /// Load a previously saved snapshot instead of simulating.
    #[arg(long)]
    load: Option<PathBuf>,
    /// Where to write the classification table [default: <output>/classification.csv].
    #[arg(long)]
    table: Option<PathBuf>,
    /// Worker threads (0 = one per core).
    #[arg(long, default_value_t = 0)]
    threads: usize,
    /// Stop starting new rules after this many seconds.
    #[arg(long)]
    time_limit: Option<u64>,
    /// Export GIFs of the K most interesting rules.
    #[arg(long, default_value_t = 0)]
    animate: usize,
    /// Output directory.
    #[arg(long, default_value = "output")]
    output: PathBuf,
}

#[derive(Debug, Args)]
struct RuleArgs {
    /// Rule number in 0..=255.
    #[arg(allow_negative_numbers = true)]
    rule: i64,
    /// Lattice side length (odd).
    #[arg(long, default_value_t = 51)]
    size: usize,
    /// Generations to simulate.
    #[arg(long, default_value_t = 100)]
    generations: u32,
    /// Read the rule's series from a survey snapshot instead of simulating.
    #[arg(long)]
    load: Option<PathBuf>,
    /// Write every generation's statistics to this CSV file.
    #[arg(long)]
    series: Option<PathBuf>,
    /// Also export an animated GIF.
    #[arg(long)]
    gif: bool,
    /// Output directory.
    #[arg(long, default_value = "output")]
    output: PathBuf,
}

#[derive(Debug, Args)]
struct ReportArgs {
    /// Classification table written by `survey`.
    #[arg(long, default_value = "output/classification.csv")]
    table: PathBuf,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Survey(args) => survey(args),
        Command::Rule(args) => rule(args),
        Command::Report(args) => report_table(args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn survey(args: SurveyArgs) -> Result<()> {
    let snapshot = match &args.load {
        Some(path) => snapshot::load(path)?,
        None => {
            let config = SurveyConfig {
                size: args.size,
                generations: args.generations,
                threads: args.threads,
                ..SurveyConfig::default()
            };
            config.validate()?;
            let started = Instant::now();
            let deadline = args.time_limit.map(Duration::from_secs);
            let handle = search::spawn_survey(config);
            let mut last = 0;
            while handle.progress().running {
                thread::sleep(Duration::from_millis(500));
                let progress = handle.progress();
                if progress.completed != last {
                    last = progress.completed;
                    log::debug!("Progress: {}/{}", progress.completed, progress.total);
                }
                if deadline.is_some_and(|d| started.elapsed() >= d) {
                    log::warn!("Time limit reached, stopping survey");
                    handle.stop();
                    break;
                }
            }
            let series = handle.join()?;
            let snapshot = Snapshot::new(args.size, args.generations, series);
            let path = args
                .snapshot
                .clone()
                .unwrap_or_else(|| args.output.join("snapshot.json"));
            snapshot::save(&path, &snapshot)?;
            snapshot
        }
    };

    if snapshot.series.len() < RULE_COUNT {
        log::warn!("Snapshot covers {} of {RULE_COUNT} rules", snapshot.series.len());
    }
    let records = classify::classify_all(&snapshot.series);
    let table = args
        .table
        .clone()
        .unwrap_or_else(|| args.output.join("classification.csv"));
    classify::write_table(&table, &records)?;
    print!("{}", report::render(&records));

    if args.animate > 0 {
        let config = ExportConfig {
            size: snapshot.size,
            generations: snapshot.generations,
            output_dir: args.output.join("animations"),
            ..ExportConfig::default()
        };
        let picks: Vec<(Rule, Option<ClassifiedRule>)> = report::interesting(&records, args.animate)
            .into_iter()
            .map(|r| (Rule::from_number(r.rule), Some(r.clone())))
            .collect();
        for result in export::export_multiple(&picks, &config) {
            match result {
                Ok(exported) => println!(
                    "{} -> {} ({} frames, final population {})",
                    exported.label,
                    exported.path.display(),
                    exported.total_frames,
                    exported.final_population
                ),
                Err(e) => log::warn!("Export failed: {e}"),
            }
        }
    }
    Ok(())
}

fn rule(args: RuleArgs) -> Result<()> {
    let rule = Rule::encode(args.rule)?;
    let live: Vec<usize> = (0..rule.decisions().len())
        .filter(|&s| rule.decisions()[s])
        .collect();
    println!("{rule}, live for sums {live:?}");

    let series = match &args.load {
        Some(path) => {
            let snapshot = snapshot::load(path)?;
            match snapshot.series_for(rule.number()) {
                Some(series) => series.clone(),
                None => {
                    log::warn!("{} not in snapshot, simulating", rule.label());
                    stats::collect(args.size, args.generations, args.rule)?
                }
            }
        }
        None => stats::collect(args.size, args.generations, args.rule)?,
    };
    let classified = ClassifiedRule::from_series(&series);
    print!("{}", report::render_series(&series, &classified));
    if let Some(path) = &args.series {
        stats::write_series(path, &series)?;
    }

    if args.gif {
        let config = ExportConfig {
            size: series.size,
            generations: series.len() as u32,
            output_dir: args.output,
            ..ExportConfig::default()
        };
        let exported = export::export_gif(&rule, &config, Some(&classified))?;
        println!("Saved {} ({} frames)", exported.path.display(), exported.total_frames);
    }
    Ok(())
}

fn report_table(args: ReportArgs) -> Result<()> {
    let records = classify::load_table(&args.table)?;
    print!("{}", report::render(&records));
    Ok(())
}

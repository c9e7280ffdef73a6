//! interface-tracker CLI
//!
//! Records field-level changes between status snapshots into per-team
//! histories.

use clap::{Args, Parser, Subcommand, ValueEnum};
use interface_tracker::logging::{self, LogFormat};
use interface_tracker::{CsvLayout, MergeGate, Result, Tracker, TrackerConfig};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "interface-tracker")]
#[command(about = "Track interface status changes per team", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Workspace directory (overrides the configuration)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Current status snapshot (overrides the configuration)
    #[arg(long, global = true)]
    status_file: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Diff the current snapshot against the previous one and record changes
    Track,
    /// Merge new global log entries into the team partitions
    Merge,
    /// Export team partitions to CSV
    Csv(CsvArgs),
    /// List the teams present in the global log
    Teams,
}

#[derive(Debug, Args)]
struct CsvArgs {
    /// Row layout
    #[arg(long, value_enum, default_value_t = Layout::Flat)]
    layout: Layout,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Layout {
    Flat,
    TimeSeries,
}

impl From<Layout> for CsvLayout {
    fn from(layout: Layout) -> Self {
        match layout {
            Layout::Flat => CsvLayout::Flat,
            Layout::TimeSeries => CsvLayout::TimeSeries,
        }
    }
}

fn load_config(args: &GlobalArgs) -> Result<TrackerConfig> {
    let mut config = match &args.config {
        Some(path) => TrackerConfig::load(path)?,
        None => TrackerConfig::default(),
    };
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(file) = &args.status_file {
        config.status_file = file.clone();
    }
    Ok(config)
}

fn execute(cli: Cli) -> Result<()> {
    let tracker = Tracker::open(load_config(&cli.global)?)?;

    match cli.command {
        Commands::Track => {
            let summary = tracker.run()?;
            println!(
                "{}: {:?}, {} records, {} batches to {} partitions",
                summary.timestamp,
                summary.kind,
                summary.records,
                summary.batches_written,
                summary.partitions_written
            );
        }
        Commands::Merge => {
            let outcome = tracker.merge()?;
            match outcome.gate {
                MergeGate::Gated => println!("merge gated: migration not completed"),
                MergeGate::Active if !outcome.advanced() => println!("up to date"),
                MergeGate::Active => println!(
                    "merged {} entries: {} batches to {} partitions",
                    outcome.entries_considered,
                    outcome.batches_written,
                    outcome.partitions_written
                ),
            }
        }
        Commands::Csv(args) => {
            for path in tracker.export_csv(args.layout.into())? {
                println!("{}", path.display());
            }
        }
        Commands::Teams => {
            for team in tracker.teams() {
                println!("{}", team);
            }
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    logging::init(if cli.global.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Text
    });

    if let Err(e) = execute(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

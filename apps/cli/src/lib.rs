pub mod bank;
pub mod commands;
pub mod config;
pub mod db;

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use study_engine::{StrategyKind, StudyMode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bank::QuestionBank;
use crate::commands::{parse_mode, parse_strategy, SettingsUpdate, StudyOptions};
use crate::config::AppConfig;
use crate::db::SqliteRepository;

#[derive(Debug, Parser)]
#[command(name = "study", version, about = "Adaptive question practice from the terminal")]
pub struct Cli {
    /// SQLite database path (overrides STUDY_DB_PATH)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Question bank JSON file (overrides STUDY_BANK_PATH)
    #[arg(long, global = true)]
    pub bank: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Answer questions interactively
    Study(StudyArgs),
    /// Show knowledge, history and goal statistics
    Stats,
    /// Write all progress to a snapshot file
    Export { path: PathBuf },
    /// Replace all progress with a snapshot file
    Import { path: PathBuf },
    /// Show or change engine settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Forget all progress
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
        /// Also delete the answer history
        #[arg(long)]
        history: bool,
    },
}

#[derive(Debug, Args)]
pub struct StudyArgs {
    /// Selection mode (defaults to the configured one)
    #[arg(long, value_parser = parse_mode)]
    pub mode: Option<StudyMode>,
    /// Only questions from this section (repeatable)
    #[arg(long = "section")]
    pub sections: Vec<String>,
    /// Only questions from this quiz (repeatable)
    #[arg(long = "quiz")]
    pub quizzes: Vec<String>,
    /// Build one mixed batch of due, new and weak questions up front
    #[arg(long)]
    pub batch: bool,
    /// Maximum number of questions
    #[arg(long, short = 'n')]
    pub count: Option<usize>,
    /// Shuffle seed
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Debug, Subcommand)]
pub enum SettingsAction {
    /// Print current settings
    Show,
    /// Change one or more settings
    Set(SettingsArgs),
}

#[derive(Debug, Args)]
pub struct SettingsArgs {
    #[arg(long, value_parser = parse_strategy)]
    pub strategy: Option<StrategyKind>,
    #[arg(long, value_parser = parse_mode)]
    pub mode: Option<StudyMode>,
    #[arg(long)]
    pub recent_window: Option<usize>,
    #[arg(long)]
    pub session_size: Option<usize>,
    #[arg(long)]
    pub mix_new: Option<bool>,
    #[arg(long)]
    pub goal_count: Option<u32>,
    #[arg(long)]
    pub goal_minutes: Option<u32>,
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..24))]
    pub reset_hour: Option<u32>,
}

impl From<StudyArgs> for StudyOptions {
    fn from(args: StudyArgs) -> Self {
        Self {
            mode: args.mode,
            sections: args.sections,
            quizzes: args.quizzes,
            batch: args.batch,
            count: args.count,
            seed: args.seed,
        }
    }
}

impl From<SettingsArgs> for SettingsUpdate {
    fn from(args: SettingsArgs) -> Self {
        Self {
            strategy: args.strategy,
            mode: args.mode,
            recent_window: args.recent_window,
            session_size: args.session_size,
            mix_new_cards: args.mix_new,
            daily_goal_count: args.goal_count,
            daily_goal_minutes: args.goal_minutes,
            daily_reset_hour: args.reset_hour,
        }
    }
}

pub fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env().with_overrides(cli.db, cli.bank);

    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    tracing::info!("Opening database at {}", config.db_path.display());
    let repo = SqliteRepository::open(&config.db_path)
        .with_context(|| format!("failed to open database {}", config.db_path.display()))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Study(args) => {
            let Some(bank_path) = &config.bank_path else {
                bail!("no question bank given; pass --bank or set STUDY_BANK_PATH");
            };
            let bank = QuestionBank::load(bank_path)
                .with_context(|| format!("failed to load {}", bank_path.display()))?;
            tracing::info!("Loaded {} questions from {}", bank.len(), bank_path.display());

            let stdin = io::stdin();
            let mut input = stdin.lock();
            commands::run_study(&repo, &bank, &args.into(), &mut input, &mut out)?;
        }
        Command::Stats => {
            let bank = config
                .bank_path
                .as_ref()
                .map(QuestionBank::load)
                .transpose()
                .context("failed to load question bank")?;
            commands::show_stats(&repo, bank.as_ref(), &mut out)?;
        }
        Command::Export { path } => {
            let count = commands::export_snapshot(&repo, &path, Utc::now())?;
            writeln!(out, "Exported {count} question states to {}", path.display())?;
        }
        Command::Import { path } => {
            let count = commands::import_snapshot(&repo, &path)?;
            writeln!(out, "Imported {count} question states from {}", path.display())?;
        }
        Command::Settings { action } => match action {
            SettingsAction::Show => commands::show_settings(&repo, &mut out)?,
            SettingsAction::Set(args) => {
                commands::update_settings(&repo, &args.into())?;
                commands::show_settings(&repo, &mut out)?;
            }
        },
        Command::Reset { yes, history } => {
            if !yes {
                bail!("reset deletes all progress; rerun with --yes to confirm");
            }
            let outcome = commands::reset_progress(&repo, history)?;
            writeln!(
                out,
                "Cleared {} question states and {} history entries",
                outcome.states, outcome.answers
            )?;
        }
    }

    Ok(())
}

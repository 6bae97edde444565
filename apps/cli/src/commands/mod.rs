//! Commands behind the `study` subcommands.

pub mod reset;
pub mod settings;
pub mod stats;
pub mod study;
pub mod transfer;

pub use reset::{reset_progress, ResetOutcome};
pub use settings::{parse_mode, parse_strategy, show_settings, update_settings, SettingsUpdate};
pub use stats::{show_stats, summarize, KnowledgeSummary};
pub use study::{run_study, StopReason, StudyOptions, StudySummary};
pub use transfer::{export_snapshot, import_snapshot};

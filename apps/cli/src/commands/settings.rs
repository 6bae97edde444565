//! Settings commands.

use crate::db::{SettingsRepository, SqliteRepository};
use anyhow::{bail, Result};
use std::io::Write;
use study_engine::{EngineSettings, StrategyKind, StudyMode};

/// Requested changes; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsUpdate {
    pub strategy: Option<StrategyKind>,
    pub mode: Option<StudyMode>,
    pub recent_window: Option<usize>,
    pub session_size: Option<usize>,
    pub mix_new_cards: Option<bool>,
    pub daily_goal_count: Option<u32>,
    pub daily_goal_minutes: Option<u32>,
    pub daily_reset_hour: Option<u32>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn apply_to(&self, settings: &mut EngineSettings) {
        if let Some(strategy) = self.strategy {
            settings.strategy = strategy;
        }
        if let Some(mode) = self.mode {
            settings.mode = mode;
        }
        if let Some(window) = self.recent_window {
            settings.recent_window = window;
        }
        if let Some(size) = self.session_size {
            settings.session_size = size;
        }
        if let Some(mix) = self.mix_new_cards {
            settings.mix_new_cards = mix;
        }
        if let Some(count) = self.daily_goal_count {
            settings.daily_goal_count = count;
        }
        if let Some(minutes) = self.daily_goal_minutes {
            settings.daily_goal_minutes = minutes;
        }
        if let Some(hour) = self.daily_reset_hour {
            settings.daily_reset_hour = hour;
        }
    }
}

pub fn show_settings<W: Write>(repo: &SqliteRepository, output: &mut W) -> Result<()> {
    let settings = repo.get_settings()?;
    writeln!(output, "strategy            {}", settings.strategy.as_str())?;
    writeln!(output, "mode                {}", settings.mode.as_str())?;
    writeln!(output, "recent window       {}", settings.recent_window)?;
    writeln!(output, "session size        {}", settings.session_size)?;
    writeln!(output, "mix new cards       {}", settings.mix_new_cards)?;
    writeln!(output, "daily goal count    {}", settings.daily_goal_count)?;
    writeln!(output, "daily goal minutes  {}", settings.daily_goal_minutes)?;
    writeln!(output, "daily reset hour    {}", settings.daily_reset_hour)?;
    Ok(())
}

/// Apply `update` and persist the result.
pub fn update_settings(repo: &SqliteRepository, update: &SettingsUpdate) -> Result<EngineSettings> {
    if update.is_empty() {
        bail!("no settings given; see `study settings set --help`");
    }
    if update.session_size == Some(0) {
        bail!("session size must be at least 1");
    }

    let mut settings = repo.get_settings()?;
    let previous = settings.strategy;
    update.apply_to(&mut settings);
    repo.save_settings(&settings)?;

    if settings.strategy != previous {
        tracing::warn!(
            "Strategy changed from {} to {}; existing scores are not comparable",
            previous.as_str(),
            settings.strategy.as_str()
        );
    }
    Ok(settings)
}

/// Parse a study mode name for the command line.
pub fn parse_mode(s: &str) -> Result<StudyMode, String> {
    StudyMode::from_str(s).ok_or_else(|| {
        format!(
            "unknown mode '{s}' \
             (sequential, shuffle, most-needed, due-only, new-only, weak-areas)"
        )
    })
}

/// Parse a strategy name for the command line.
pub fn parse_strategy(s: &str) -> Result<StrategyKind, String> {
    StrategyKind::from_str(s).ok_or_else(|| format!("unknown strategy '{s}' (rating, sm2)"))
}

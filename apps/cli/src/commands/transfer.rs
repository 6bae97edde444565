//! Snapshot export and import commands.

use crate::commands::study::current_goal;
use crate::db::{SettingsRepository, SqliteRepository};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::Path;
use study_engine::{import_into, Snapshot, StatePersistence};

/// Write every stored state, plus the daily goal, to `path`.
pub fn export_snapshot(
    repo: &SqliteRepository,
    path: &Path,
    now: DateTime<Utc>,
) -> Result<usize> {
    let settings = repo.get_settings()?;
    let store = repo.load()?;
    let mut snapshot = Snapshot::capture(&store, settings.strategy, now);
    if let Some(goal) = current_goal(repo, &settings, now)? {
        snapshot = snapshot.with_goal(goal);
    }

    let json = snapshot.to_json()?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write snapshot to {}", path.display()))?;

    tracing::info!("Exported {} states to {}", store.len(), path.display());
    Ok(store.len())
}

/// Replace stored states with the snapshot at `path`.
///
/// Nothing is written unless every record validates. A snapshot taken under
/// another strategy switches the configured strategy to match it.
pub fn import_snapshot(repo: &SqliteRepository, path: &Path) -> Result<usize> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot from {}", path.display()))?;

    let mut store = repo.load()?;
    let snapshot = import_into(&mut store, &json)
        .with_context(|| format!("rejected snapshot {}", path.display()))?;

    let mut settings = repo.get_settings()?;
    let adopted = if snapshot.strategy != settings.strategy {
        tracing::warn!(
            "Snapshot uses strategy {}, switching from {}",
            snapshot.strategy.as_str(),
            settings.strategy.as_str()
        );
        settings.strategy = snapshot.strategy;
        Some(&settings)
    } else {
        None
    };

    repo.import_all(&store, snapshot.goal.as_ref(), adopted)?;

    tracing::info!(
        "Imported {} states exported at {}",
        store.len(),
        snapshot.exported_at.to_rfc3339()
    );
    Ok(store.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{update_settings, SettingsUpdate};
    use crate::db::date_utils::{get_adjusted_today, get_adjusted_today_string};
    use crate::db::{GoalRepository, StateRepository};
    use pretty_assertions::assert_eq;
    use study_engine::{DailyGoal, KnowledgeState, Stage, StrategyKind};

    fn answered(rating: u8) -> KnowledgeState {
        KnowledgeState {
            stage: Stage::Review,
            rating,
            total_reviews: 1,
            correct_reviews: 1,
            correct_streak: 1,
            ..KnowledgeState::default()
        }
    }

    #[test]
    fn export_then_import_into_fresh_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");

        let source = SqliteRepository::open_in_memory().unwrap();
        source.save_state("q1", &answered(3)).unwrap();
        source.save_state("q2", &answered(7)).unwrap();
        let goal = DailyGoal::new(10, 5, get_adjusted_today(0));
        source.save_goal(&goal).unwrap();
        assert_eq!(export_snapshot(&source, &path, Utc::now()).unwrap(), 2);

        let target = SqliteRepository::open(dir.path().join("target.db")).unwrap();
        target.save_state("stale", &answered(1)).unwrap();
        assert_eq!(import_snapshot(&target, &path).unwrap(), 2);

        assert_eq!(target.load_states().unwrap(), source.load_states().unwrap());
        assert_eq!(target.get_goal().unwrap(), Some(goal));
    }

    #[test]
    fn export_rolls_a_stale_goal_over_to_today() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");

        let repo = SqliteRepository::open_in_memory().unwrap();
        repo.save_goal(&DailyGoal {
            target_count: 5,
            completed_count: 3,
            target_minutes: 10,
            minutes_spent: 7,
            streak_days: 2,
            last_active_date: "2020-01-01".to_string(),
        })
        .unwrap();
        export_snapshot(&repo, &path, Utc::now()).unwrap();

        let json = std::fs::read_to_string(&path).unwrap();
        let exported = Snapshot::from_json(&json).unwrap().goal.unwrap();
        assert_eq!(exported.last_active_date, get_adjusted_today_string(0));
        assert_eq!((exported.completed_count, exported.minutes_spent), (0, 0));
        assert_eq!(exported.streak_days, 0);
        assert_eq!(repo.get_goal().unwrap(), Some(exported));
    }

    #[test]
    fn import_adopts_the_snapshot_strategy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");

        let source = SqliteRepository::open_in_memory().unwrap();
        update_settings(
            &source,
            &SettingsUpdate {
                strategy: Some(StrategyKind::Rating),
                ..SettingsUpdate::default()
            },
        )
        .unwrap();
        source.save_state("q1", &answered(5)).unwrap();
        export_snapshot(&source, &path, Utc::now()).unwrap();

        let target = SqliteRepository::open_in_memory().unwrap();
        assert_eq!(target.get_settings().unwrap().strategy, StrategyKind::Sm2);
        assert_eq!(import_snapshot(&target, &path).unwrap(), 1);

        let settings = target.get_settings().unwrap();
        assert_eq!(settings.strategy, StrategyKind::Rating);
        assert_eq!(settings.mode, source.get_settings().unwrap().mode);
        assert_eq!(target.get_state("q1").unwrap(), Some(answered(5)));
    }

    #[test]
    fn rejected_import_leaves_database_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(
            &path,
            r#"{"version":1,"exported_at":"2024-01-01T00:00:00Z","strategy":"sm2",
                "states":{"q1":{"stage":"review"}}}"#,
        )
        .unwrap();

        let repo = SqliteRepository::open_in_memory().unwrap();
        repo.save_state("keep", &answered(4)).unwrap();

        assert!(import_snapshot(&repo, &path).is_err());
        let store = repo.load_states().unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("keep"), Some(&answered(4)));
    }

    #[test]
    fn missing_file_is_an_error() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        assert!(import_snapshot(&repo, Path::new("/nonexistent/snapshot.json")).is_err());
    }
}

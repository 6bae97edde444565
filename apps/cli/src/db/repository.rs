//! Repository pattern for database access.

use crate::db::date_utils::{get_adjusted_today, get_adjusted_today_string};
use crate::db::error::DbError;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use study_engine::session::format_date;
use study_engine::{
    DailyGoal, EngineSettings, KnowledgeState, KnowledgeStore, Stage, StatePersistence,
    StrategyKind, StudyMode,
};

type Result<T> = std::result::Result<T, DbError>;

/// Repository for knowledge state operations.
pub trait StateRepository {
    fn get_state(&self, question_id: &str) -> Result<Option<KnowledgeState>>;
    fn save_state(&self, question_id: &str, state: &KnowledgeState) -> Result<()>;
    fn load_states(&self) -> Result<KnowledgeStore>;
    /// Replace every stored state with the contents of `store`.
    fn replace_states(&self, store: &KnowledgeStore) -> Result<()>;
    fn clear_states(&self) -> Result<usize>;
}

/// Repository for settings operations.
pub trait SettingsRepository {
    fn get_settings(&self) -> Result<EngineSettings>;
    fn save_settings(&self, settings: &EngineSettings) -> Result<()>;
}

/// Repository for the daily goal record.
pub trait GoalRepository {
    fn get_goal(&self) -> Result<Option<DailyGoal>>;
    fn save_goal(&self, goal: &DailyGoal) -> Result<()>;
}

/// One answered question, as written to the history log.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AnswerRecord {
    pub question_id: String,
    pub answered_at: String,
    pub study_date: String,
    pub is_correct: bool,
    pub confidence: Option<u8>,
    pub response_time_ms: Option<u64>,
    pub strategy: String,
    pub stage_before: String,
    pub stage_after: String,
    pub interval_before: u32,
    pub interval_after: u32,
    pub ease_before: f64,
    pub ease_after: f64,
    pub rating_before: u8,
    pub rating_after: u8,
}

/// Overall study statistics.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StudyStats {
    pub answers_today: usize,
    pub correct_today: usize,
    pub questions_today: usize,
    pub total_answers: usize,
    pub accuracy: f64,
    pub active_days: usize,
}

/// Calendar data point.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CalendarData {
    pub date: String,
    pub answers: usize,
}

/// Repository for answer history.
pub trait HistoryRepository {
    fn insert_answer(&self, record: &AnswerRecord) -> Result<i64>;
    fn clear_history(&self) -> Result<usize>;
}

/// Repository for statistics operations.
pub trait StatsRepository {
    fn get_study_stats(&self, daily_reset_hour: u32) -> Result<StudyStats>;
    fn get_calendar_data(&self, days: usize, daily_reset_hour: u32) -> Result<Vec<CalendarData>>;
}

/// SQLite implementation of repositories.
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Open database at path, creating if necessary.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let repo = Self { conn };
        repo.initialize()?;
        Ok(repo)
    }

    /// Open in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let repo = Self { conn };
        repo.initialize()?;
        Ok(repo)
    }

    fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(super::schema::SCHEMA)?;
        self.conn.execute_batch(super::schema::INIT_SETTINGS)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
            params![super::schema::SCHEMA_VERSION],
        )?;
        Ok(())
    }

    /// Replace states, and optionally the goal and settings, in one
    /// transaction. On any error nothing is written.
    pub fn import_all(
        &self,
        store: &KnowledgeStore,
        goal: Option<&DailyGoal>,
        settings: Option<&EngineSettings>,
    ) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        Self::write_all_states(&tx, store)?;
        if let Some(goal) = goal {
            Self::write_goal(&tx, goal)?;
        }
        if let Some(settings) = settings {
            Self::write_settings(&tx, settings)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn write_all_states(conn: &Connection, store: &KnowledgeStore) -> Result<()> {
        conn.execute("DELETE FROM knowledge_states", [])?;
        for (id, state) in store.iter() {
            Self::upsert_state(conn, id, state)?;
        }
        Ok(())
    }

    fn write_settings(conn: &Connection, settings: &EngineSettings) -> Result<()> {
        if settings.daily_reset_hour > 23 {
            return Err(DbError::InvalidData(format!(
                "daily reset hour must be 0-23, got {}",
                settings.daily_reset_hour
            )));
        }

        conn.execute(
            "UPDATE engine_settings SET strategy = ?1, mode = ?2, recent_window = ?3, session_size = ?4, mix_new_cards = ?5, daily_goal_count = ?6, daily_goal_minutes = ?7, daily_reset_hour = ?8 WHERE id = 1",
            params![
                settings.strategy.as_str(),
                settings.mode.as_str(),
                settings.recent_window,
                settings.session_size,
                settings.mix_new_cards,
                settings.daily_goal_count,
                settings.daily_goal_minutes,
                settings.daily_reset_hour,
            ],
        )?;
        Ok(())
    }

    fn write_goal(conn: &Connection, goal: &DailyGoal) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO daily_goal (id, target_count, completed_count, target_minutes, minutes_spent, streak_days, last_active_date)
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                goal.target_count,
                goal.completed_count,
                goal.target_minutes,
                goal.minutes_spent,
                goal.streak_days,
                goal.last_active_date,
            ],
        )?;
        Ok(())
    }

    fn upsert_state(conn: &Connection, question_id: &str, state: &KnowledgeState) -> Result<()> {
        let confidence = serde_json::to_string(&state.recent_confidence)
            .map_err(|e| DbError::InvalidData(e.to_string()))?;
        conn.execute(
            "INSERT INTO knowledge_states (question_id, stage, rating, ease_factor, interval_days, repetitions, due_at, correct_streak, incorrect_count, total_reviews, correct_reviews, last_answered_at, recent_confidence)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             ON CONFLICT(question_id) DO UPDATE SET
                stage = excluded.stage,
                rating = excluded.rating,
                ease_factor = excluded.ease_factor,
                interval_days = excluded.interval_days,
                repetitions = excluded.repetitions,
                due_at = excluded.due_at,
                correct_streak = excluded.correct_streak,
                incorrect_count = excluded.incorrect_count,
                total_reviews = excluded.total_reviews,
                correct_reviews = excluded.correct_reviews,
                last_answered_at = excluded.last_answered_at,
                recent_confidence = excluded.recent_confidence",
            params![
                question_id,
                state.stage.as_str(),
                state.rating,
                state.ease_factor,
                state.interval_days,
                state.repetitions,
                state.due_at,
                state.correct_streak,
                state.incorrect_count,
                state.total_reviews,
                state.correct_reviews,
                state.last_answered_at,
                confidence,
            ],
        )?;
        Ok(())
    }
}

const STATE_COLUMNS: &str = "question_id, stage, rating, ease_factor, interval_days, repetitions, due_at, correct_streak, incorrect_count, total_reviews, correct_reviews, last_answered_at, recent_confidence";

fn row_to_state(row: &Row<'_>) -> rusqlite::Result<(String, KnowledgeState)> {
    let stage_str: String = row.get(1)?;
    let confidence_json: String = row.get(12)?;
    let recent_confidence: Vec<u8> = serde_json::from_str(&confidence_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(12, Type::Text, Box::new(e)))?;

    let state = KnowledgeState {
        stage: Stage::from_str(&stage_str).unwrap_or_default(),
        rating: row.get(2)?,
        ease_factor: row.get(3)?,
        interval_days: row.get(4)?,
        repetitions: row.get(5)?,
        due_at: row.get(6)?,
        correct_streak: row.get(7)?,
        incorrect_count: row.get(8)?,
        total_reviews: row.get(9)?,
        correct_reviews: row.get(10)?,
        last_answered_at: row.get(11)?,
        recent_confidence,
    };
    Ok((row.get(0)?, state))
}

impl StateRepository for SqliteRepository {
    fn get_state(&self, question_id: &str) -> Result<Option<KnowledgeState>> {
        let sql = format!("SELECT {STATE_COLUMNS} FROM knowledge_states WHERE question_id = ?1");
        self.conn
            .query_row(&sql, params![question_id], row_to_state)
            .optional()
            .map(|found| found.map(|(_, state)| state))
            .map_err(Into::into)
    }

    fn save_state(&self, question_id: &str, state: &KnowledgeState) -> Result<()> {
        Self::upsert_state(&self.conn, question_id, state)
    }

    fn load_states(&self) -> Result<KnowledgeStore> {
        let sql = format!("SELECT {STATE_COLUMNS} FROM knowledge_states");
        let mut stmt = self.conn.prepare(&sql)?;
        let states = stmt
            .query_map([], row_to_state)?
            .collect::<std::result::Result<_, _>>()?;
        Ok(KnowledgeStore::from_map(states))
    }

    fn replace_states(&self, store: &KnowledgeStore) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        Self::write_all_states(&tx, store)?;
        tx.commit()?;
        Ok(())
    }

    fn clear_states(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM knowledge_states", [])?)
    }
}

impl StatePersistence for SqliteRepository {
    type Error = DbError;

    fn load(&self) -> Result<KnowledgeStore> {
        self.load_states()
    }

    /// Upsert every record in one transaction. Rows absent from `store`
    /// are left untouched.
    fn save(&self, store: &KnowledgeStore) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for (id, state) in store.iter() {
            Self::upsert_state(&tx, id, state)?;
        }
        tx.commit()?;
        Ok(())
    }
}

impl SettingsRepository for SqliteRepository {
    fn get_settings(&self) -> Result<EngineSettings> {
        self.conn
            .query_row(
                "SELECT strategy, mode, recent_window, session_size, mix_new_cards, daily_goal_count, daily_goal_minutes, daily_reset_hour FROM engine_settings WHERE id = 1",
                [],
                |row| {
                    let strategy_str: String = row.get(0)?;
                    let mode_str: String = row.get(1)?;

                    Ok(EngineSettings {
                        strategy: StrategyKind::from_str(&strategy_str).unwrap_or_default(),
                        mode: StudyMode::from_str(&mode_str).unwrap_or_default(),
                        recent_window: row.get(2)?,
                        session_size: row.get(3)?,
                        mix_new_cards: row.get(4)?,
                        daily_goal_count: row.get(5)?,
                        daily_goal_minutes: row.get(6)?,
                        daily_reset_hour: row.get(7)?,
                    })
                },
            )
            .map_err(Into::into)
    }

    fn save_settings(&self, settings: &EngineSettings) -> Result<()> {
        Self::write_settings(&self.conn, settings)
    }
}

impl GoalRepository for SqliteRepository {
    fn get_goal(&self) -> Result<Option<DailyGoal>> {
        self.conn
            .query_row(
                "SELECT target_count, completed_count, target_minutes, minutes_spent, streak_days, last_active_date FROM daily_goal WHERE id = 1",
                [],
                |row| {
                    Ok(DailyGoal {
                        target_count: row.get(0)?,
                        completed_count: row.get(1)?,
                        target_minutes: row.get(2)?,
                        minutes_spent: row.get(3)?,
                        streak_days: row.get(4)?,
                        last_active_date: row.get(5)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    fn save_goal(&self, goal: &DailyGoal) -> Result<()> {
        Self::write_goal(&self.conn, goal)
    }
}

impl HistoryRepository for SqliteRepository {
    fn insert_answer(&self, record: &AnswerRecord) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO answer_log (question_id, answered_at, study_date, is_correct, confidence, response_time_ms, strategy, stage_before, stage_after, interval_before, interval_after, ease_before, ease_after, rating_before, rating_after)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                record.question_id,
                record.answered_at,
                record.study_date,
                record.is_correct,
                record.confidence,
                record.response_time_ms.map(|ms| ms as i64),
                record.strategy,
                record.stage_before,
                record.stage_after,
                record.interval_before,
                record.interval_after,
                record.ease_before,
                record.ease_after,
                record.rating_before,
                record.rating_after,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn clear_history(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM answer_log", [])?)
    }
}

impl StatsRepository for SqliteRepository {
    fn get_study_stats(&self, daily_reset_hour: u32) -> Result<StudyStats> {
        let today = get_adjusted_today_string(daily_reset_hour);

        let (answers_today, correct_today, questions_today): (usize, usize, usize) =
            self.conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(is_correct), 0), COUNT(DISTINCT question_id) FROM answer_log WHERE study_date = ?1",
                params![today],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;

        let (total_answers, total_correct): (usize, usize) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(is_correct), 0) FROM answer_log",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let active_days: usize = self.conn.query_row(
            "SELECT COUNT(DISTINCT study_date) FROM answer_log",
            [],
            |row| row.get(0),
        )?;

        let accuracy = if total_answers > 0 {
            total_correct as f64 / total_answers as f64
        } else {
            0.0
        };

        Ok(StudyStats {
            answers_today,
            correct_today,
            questions_today,
            total_answers,
            accuracy,
            active_days,
        })
    }

    fn get_calendar_data(&self, days: usize, daily_reset_hour: u32) -> Result<Vec<CalendarData>> {
        let today = get_adjusted_today(daily_reset_hour);
        let mut stmt = self
            .conn
            .prepare("SELECT COUNT(*) FROM answer_log WHERE study_date = ?1")?;

        let mut data = Vec::with_capacity(days);
        for offset in (0..days).rev() {
            let date = today - chrono::Duration::days(offset as i64);
            let date_str = format_date(date);
            let answers: usize = stmt.query_row(params![date_str], |row| row.get(0))?;
            data.push(CalendarData {
                date: date_str,
                answers,
            });
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn answered_state() -> KnowledgeState {
        KnowledgeState {
            stage: Stage::Review,
            rating: 3,
            ease_factor: 2.36,
            interval_days: 6,
            repetitions: 2,
            due_at: 1_717_230_000_000,
            correct_streak: 2,
            incorrect_count: 1,
            total_reviews: 3,
            correct_reviews: 2,
            last_answered_at: 1_716_711_600_000,
            recent_confidence: vec![2, 3, 3],
        }
    }

    fn record(question_id: &str, study_date: &str, is_correct: bool) -> AnswerRecord {
        AnswerRecord {
            question_id: question_id.to_string(),
            answered_at: format!("{study_date}T10:00:00+00:00"),
            study_date: study_date.to_string(),
            is_correct,
            confidence: Some(2),
            response_time_ms: Some(4200),
            strategy: "sm2".to_string(),
            stage_before: "new".to_string(),
            stage_after: "review".to_string(),
            interval_before: 0,
            interval_after: 1,
            ease_before: 2.5,
            ease_after: 2.5,
            rating_before: 0,
            rating_after: 1,
        }
    }

    #[test]
    fn state_round_trips_through_sqlite() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        assert_eq!(repo.get_state("q1").unwrap(), None);

        repo.save_state("q1", &answered_state()).unwrap();
        assert_eq!(repo.get_state("q1").unwrap(), Some(answered_state()));

        let mut updated = answered_state();
        updated.rating = 4;
        repo.save_state("q1", &updated).unwrap();
        assert_eq!(repo.get_state("q1").unwrap().map(|s| s.rating), Some(4));
    }

    #[test]
    fn persistence_save_keeps_rows_outside_the_store() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        repo.save_state("old", &KnowledgeState::default()).unwrap();

        let mut store = KnowledgeStore::new();
        store.set("q1", answered_state());
        repo.save(&store).unwrap();

        let loaded = repo.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get("q1"), Some(&answered_state()));
    }

    #[test]
    fn replace_states_drops_missing_rows() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        repo.save_state("old", &KnowledgeState::default()).unwrap();

        let mut store = KnowledgeStore::new();
        store.set("q1", answered_state());
        repo.replace_states(&store).unwrap();

        assert_eq!(repo.load_states().unwrap(), store);
        assert_eq!(repo.clear_states().unwrap(), 1);
        assert!(repo.load_states().unwrap().is_empty());
    }

    #[test]
    fn settings_default_and_update() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        assert_eq!(repo.get_settings().unwrap(), EngineSettings::default());

        let settings = EngineSettings {
            strategy: StrategyKind::Rating,
            mode: StudyMode::WeakAreas,
            recent_window: 3,
            mix_new_cards: false,
            daily_reset_hour: 4,
            ..EngineSettings::default()
        };
        repo.save_settings(&settings).unwrap();
        assert_eq!(repo.get_settings().unwrap(), settings);
    }

    #[test]
    fn settings_reject_bad_reset_hour() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        let settings = EngineSettings {
            daily_reset_hour: 24,
            ..EngineSettings::default()
        };
        assert!(matches!(
            repo.save_settings(&settings),
            Err(DbError::InvalidData(_))
        ));
    }

    #[test]
    fn import_all_writes_states_goal_and_settings_together() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        repo.save_state("old", &KnowledgeState::default()).unwrap();

        let mut store = KnowledgeStore::new();
        store.set("q1", answered_state());
        let goal = DailyGoal::new(8, 10, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        let settings = EngineSettings {
            strategy: StrategyKind::Rating,
            ..EngineSettings::default()
        };
        repo.import_all(&store, Some(&goal), Some(&settings)).unwrap();

        assert_eq!(repo.load_states().unwrap(), store);
        assert_eq!(repo.get_goal().unwrap(), Some(goal));
        assert_eq!(repo.get_settings().unwrap().strategy, StrategyKind::Rating);
    }

    #[test]
    fn failed_import_all_rolls_back_states() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        repo.save_state("old", &KnowledgeState::default()).unwrap();
        let before = repo.load_states().unwrap();

        let mut store = KnowledgeStore::new();
        store.set("q1", answered_state());
        let goal = DailyGoal::new(8, 10, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        let bad = EngineSettings {
            daily_reset_hour: 24,
            ..EngineSettings::default()
        };
        assert!(repo.import_all(&store, Some(&goal), Some(&bad)).is_err());

        assert_eq!(repo.load_states().unwrap(), before);
        assert_eq!(repo.get_goal().unwrap(), None);
        assert_eq!(repo.get_settings().unwrap(), EngineSettings::default());
    }

    #[test]
    fn goal_is_created_on_first_save() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        assert_eq!(repo.get_goal().unwrap(), None);

        let goal = DailyGoal {
            target_count: 10,
            completed_count: 4,
            target_minutes: 5,
            minutes_spent: 2,
            streak_days: 3,
            last_active_date: "2024-05-01".to_string(),
        };
        repo.save_goal(&goal).unwrap();
        assert_eq!(repo.get_goal().unwrap(), Some(goal));
    }

    #[test]
    fn study_stats_count_history() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        let today = get_adjusted_today_string(0);

        repo.insert_answer(&record("q1", &today, true)).unwrap();
        repo.insert_answer(&record("q1", &today, false)).unwrap();
        repo.insert_answer(&record("q2", &today, true)).unwrap();
        repo.insert_answer(&record("q3", "2000-01-01", true)).unwrap();

        let stats = repo.get_study_stats(0).unwrap();
        assert_eq!(stats.answers_today, 3);
        assert_eq!(stats.correct_today, 2);
        assert_eq!(stats.questions_today, 2);
        assert_eq!(stats.total_answers, 4);
        assert_eq!(stats.active_days, 2);
        assert!((stats.accuracy - 0.75).abs() < 1e-9);

        let calendar = repo.get_calendar_data(3, 0).unwrap();
        assert_eq!(calendar.len(), 3);
        assert_eq!(calendar[2].date, today);
        assert_eq!(calendar[2].answers, 3);

        assert_eq!(repo.clear_history().unwrap(), 4);
        assert_eq!(repo.get_study_stats(0).unwrap().total_answers, 0);
    }
}

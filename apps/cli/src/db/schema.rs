//! SQLite schema definitions.

/// Current schema version for migrations.
pub const SCHEMA_VERSION: i32 = 1;

/// Complete schema for the local study database.
pub const SCHEMA: &str = r#"
-- Knowledge state per question
CREATE TABLE IF NOT EXISTS knowledge_states (
    question_id TEXT PRIMARY KEY,
    stage TEXT NOT NULL DEFAULT 'new',
    rating INTEGER NOT NULL DEFAULT 0,
    ease_factor REAL NOT NULL DEFAULT 2.5,
    interval_days INTEGER NOT NULL DEFAULT 0,
    repetitions INTEGER NOT NULL DEFAULT 0,
    due_at INTEGER NOT NULL DEFAULT 0,
    correct_streak INTEGER NOT NULL DEFAULT 0,
    incorrect_count INTEGER NOT NULL DEFAULT 0,
    total_reviews INTEGER NOT NULL DEFAULT 0,
    correct_reviews INTEGER NOT NULL DEFAULT 0,
    last_answered_at INTEGER NOT NULL DEFAULT 0,
    recent_confidence TEXT NOT NULL DEFAULT '[]'
);

-- Answer history
CREATE TABLE IF NOT EXISTS answer_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    question_id TEXT NOT NULL,
    answered_at TEXT NOT NULL,
    study_date TEXT NOT NULL,
    is_correct INTEGER NOT NULL,
    confidence INTEGER,
    response_time_ms INTEGER,
    strategy TEXT NOT NULL,
    stage_before TEXT NOT NULL,
    stage_after TEXT NOT NULL,
    interval_before INTEGER NOT NULL,
    interval_after INTEGER NOT NULL,
    ease_before REAL NOT NULL,
    ease_after REAL NOT NULL,
    rating_before INTEGER NOT NULL,
    rating_after INTEGER NOT NULL
);

-- Engine settings
CREATE TABLE IF NOT EXISTS engine_settings (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    strategy TEXT NOT NULL DEFAULT 'sm2',
    mode TEXT NOT NULL DEFAULT 'most_needed',
    recent_window INTEGER NOT NULL DEFAULT 5,
    session_size INTEGER NOT NULL DEFAULT 20,
    mix_new_cards INTEGER NOT NULL DEFAULT 1,
    daily_goal_count INTEGER NOT NULL DEFAULT 20,
    daily_goal_minutes INTEGER NOT NULL DEFAULT 15,
    daily_reset_hour INTEGER NOT NULL DEFAULT 0
);

-- Daily goal
CREATE TABLE IF NOT EXISTS daily_goal (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    target_count INTEGER NOT NULL,
    completed_count INTEGER NOT NULL DEFAULT 0,
    target_minutes INTEGER NOT NULL,
    minutes_spent INTEGER NOT NULL DEFAULT 0,
    streak_days INTEGER NOT NULL DEFAULT 0,
    last_active_date TEXT NOT NULL
);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_knowledge_states_due ON knowledge_states(due_at);
CREATE INDEX IF NOT EXISTS idx_answer_log_date ON answer_log(study_date);
"#;

/// Initialize settings if not exists.
pub const INIT_SETTINGS: &str = r#"
INSERT OR IGNORE INTO engine_settings (id) VALUES (1);
"#;

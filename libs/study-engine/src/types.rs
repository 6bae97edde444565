//! Core types for the scheduling engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Milliseconds in one day.
pub const DAY_MS: i64 = 86_400_000;

/// Highest rating in the simple model.
pub const MAX_RATING: u8 = 10;

/// Ease factor bounds for the SM-2 model.
pub const MIN_EASE: f64 = 1.3;
pub const MAX_EASE: f64 = 2.5;

/// Number of confidence values kept per question.
pub const CONFIDENCE_HISTORY: usize = 10;

/// Convert a timestamp to epoch milliseconds.
pub fn epoch_ms(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

/// A study item as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuestionRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz: Option<String>,
}

impl QuestionRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            section: None,
            quiz: None,
        }
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn with_quiz(mut self, quiz: impl Into<String>) -> Self {
        self.quiz = Some(quiz.into());
        self
    }
}

/// Coarse lifecycle bucket of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    New,
    Learning,
    Review,
    Mastered,
}

impl Default for Stage {
    fn default() -> Self {
        Self::New
    }
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Learning => "learning",
            Self::Review => "review",
            Self::Mastered => "mastered",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "new" => Some(Self::New),
            "learning" => Some(Self::Learning),
            "review" => Some(Self::Review),
            "mastered" => Some(Self::Mastered),
            _ => None,
        }
    }
}

/// Self-reported confidence for one answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Guessing,
    Unsure,
    Confident,
}

impl Confidence {
    /// Convert to 3-point numeric value (1-3).
    pub fn to_value(self) -> u8 {
        match self {
            Self::Guessing => 1,
            Self::Unsure => 2,
            Self::Confident => 3,
        }
    }

    /// Create from a numeric value, clamping out-of-range input.
    pub fn from_value(value: i64) -> Self {
        match value {
            i64::MIN..=1 => Self::Guessing,
            2 => Self::Unsure,
            _ => Self::Confident,
        }
    }
}

/// One answer submitted by the learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerEvent {
    pub question_id: String,
    pub is_correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
}

impl AnswerEvent {
    pub fn new(question_id: impl Into<String>, is_correct: bool) -> Self {
        Self {
            question_id: question_id.into(),
            is_correct,
            confidence: None,
            response_time_ms: None,
        }
    }

    pub fn correct(question_id: impl Into<String>) -> Self {
        Self::new(question_id, true)
    }

    pub fn incorrect(question_id: impl Into<String>) -> Self {
        Self::new(question_id, false)
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_response_time(mut self, ms: u64) -> Self {
        self.response_time_ms = Some(ms);
        self
    }
}

/// Per-question learning record.
///
/// Carries the fields of both scheduling strategies. The rating strategy
/// owns `rating`; the SM-2 strategy owns `ease_factor`, `interval_days`,
/// `repetitions` and `due_at`. Everything else is shared bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeState {
    pub stage: Stage,
    pub rating: u8,
    pub ease_factor: f64,
    pub interval_days: u32,
    pub repetitions: u32,
    /// Epoch ms of the next scheduled review, 0 when never scheduled.
    pub due_at: i64,
    pub correct_streak: u32,
    pub incorrect_count: u32,
    pub total_reviews: u32,
    pub correct_reviews: u32,
    /// Epoch ms of the last answer, 0 when never answered.
    pub last_answered_at: i64,
    /// Oldest first.
    pub recent_confidence: Vec<u8>,
}

impl Default for KnowledgeState {
    fn default() -> Self {
        Self {
            stage: Stage::New,
            rating: 0,
            ease_factor: MAX_EASE,
            interval_days: 0,
            repetitions: 0,
            due_at: 0,
            correct_streak: 0,
            incorrect_count: 0,
            total_reviews: 0,
            correct_reviews: 0,
            last_answered_at: 0,
            recent_confidence: Vec::new(),
        }
    }
}

impl KnowledgeState {
    /// Fraction of correct answers, `None` before the first review.
    pub fn accuracy(&self) -> Option<f64> {
        if self.total_reviews == 0 {
            None
        } else {
            Some(f64::from(self.correct_reviews) / f64::from(self.total_reviews))
        }
    }

    /// Mean of the recorded confidence values.
    pub fn average_confidence(&self) -> Option<f64> {
        if self.recent_confidence.is_empty() {
            return None;
        }
        let sum: u32 = self.recent_confidence.iter().map(|&c| u32::from(c)).sum();
        Some(f64::from(sum) / self.recent_confidence.len() as f64)
    }

    pub fn is_new(&self) -> bool {
        self.stage == Stage::New
    }

    pub fn has_schedule(&self) -> bool {
        self.due_at > 0
    }

    /// Update the counters every strategy maintains.
    pub(crate) fn record_outcome(&mut self, event: &AnswerEvent, now_ms: i64) {
        self.total_reviews = self.total_reviews.saturating_add(1);
        if event.is_correct {
            self.correct_reviews = self.correct_reviews.saturating_add(1);
            self.correct_streak = self.correct_streak.saturating_add(1);
        } else {
            self.correct_streak = 0;
            self.incorrect_count = self.incorrect_count.saturating_add(1);
        }

        if let Some(confidence) = event.confidence {
            self.recent_confidence.push(confidence.to_value());
            if self.recent_confidence.len() > CONFIDENCE_HISTORY {
                let excess = self.recent_confidence.len() - CONFIDENCE_HISTORY;
                self.recent_confidence.drain(..excess);
            }
        }

        self.last_answered_at = now_ms;
    }
}

/// Human-readable mastery label for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strength {
    New,
    Learning,
    Good,
    Strong,
    Mastered,
}

impl Strength {
    pub fn label(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Learning => "Learning",
            Self::Good => "Good",
            Self::Strong => "Strong",
            Self::Mastered => "Mastered",
        }
    }
}

/// Question selection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyMode {
    Sequential,
    Shuffle,
    MostNeeded,
    DueOnly,
    NewOnly,
    WeakAreas,
}

impl Default for StudyMode {
    fn default() -> Self {
        Self::MostNeeded
    }
}

impl StudyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Shuffle => "shuffle",
            Self::MostNeeded => "most_needed",
            Self::DueOnly => "due_only",
            Self::NewOnly => "new_only",
            Self::WeakAreas => "weak_areas",
        }
    }

    /// Parse from string. Accepts hyphenated spellings.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.replace('-', "_").as_str() {
            "sequential" => Some(Self::Sequential),
            "shuffle" => Some(Self::Shuffle),
            "most_needed" => Some(Self::MostNeeded),
            "due_only" => Some(Self::DueOnly),
            "new_only" => Some(Self::NewOnly),
            "weak_areas" => Some(Self::WeakAreas),
            _ => None,
        }
    }

    /// Modes served from a persistent cyclic working list.
    pub fn is_cyclic(&self) -> bool {
        matches!(self, Self::Sequential | Self::Shuffle)
    }
}

/// Scheduling strategy options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Rating,
    Sm2,
}

impl Default for StrategyKind {
    fn default() -> Self {
        Self::Sm2
    }
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rating => "rating",
            Self::Sm2 => "sm2",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "rating" => Some(Self::Rating),
            "sm2" => Some(Self::Sm2),
            _ => None,
        }
    }
}

/// Engine configuration for one deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    pub strategy: StrategyKind,
    pub mode: StudyMode,
    pub recent_window: usize,
    pub session_size: usize,
    pub mix_new_cards: bool,
    pub daily_goal_count: u32,
    pub daily_goal_minutes: u32,
    pub daily_reset_hour: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            mode: StudyMode::default(),
            recent_window: 5,
            session_size: 20,
            mix_new_cards: true,
            daily_goal_count: 20,
            daily_goal_minutes: 15,
            daily_reset_hour: 0,
        }
    }
}

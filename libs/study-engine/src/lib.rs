//! Scheduling engine for flashcard-style study.
//!
//! Provides:
//! - Knowledge-state store and persistence boundary
//! - Scheduling strategies (simple rating model, SM-2) with need scoring
//! - Question selector with study modes, anti-repeat window and session batches
//! - Session and daily goal tracking
//! - JSON export/import of the full state
//!
//! The engine is synchronous and performs no I/O. Callers own the store,
//! the selector and the strategy and pass them in explicitly.

pub mod algorithm;
pub mod error;
pub mod recent;
pub mod selector;
pub mod session;
pub mod store;
pub mod transfer;
pub mod types;

pub use algorithm::{get_strategy, strategy_for, SchedulingStrategy};
pub use error::{Result, TransferError};
pub use recent::RecentWindow;
pub use selector::{PoolFilter, Selection, Selector};
pub use session::{study_date, DailyGoal, SessionStats, SessionTracker};
pub use store::{KnowledgeStore, StatePersistence};
pub use transfer::{import_into, Snapshot};
pub use types::{
    AnswerEvent, Confidence, EngineSettings, KnowledgeState, QuestionRef, Stage, StrategyKind,
    Strength, StudyMode,
};

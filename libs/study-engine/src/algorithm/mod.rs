//! Scheduling strategies.
//!
//! Two models exist and their scores live on different scales, so a
//! deployment picks exactly one through [`StrategyKind`].

pub mod rating;
pub mod sm2;

use crate::types::{AnswerEvent, KnowledgeState, StrategyKind, Strength};
use chrono::{DateTime, Utc};

/// Update rule, priority scorer and due check for one model.
pub trait SchedulingStrategy: Send + Sync {
    /// Strategy identifier.
    fn name(&self) -> &'static str;

    /// State for a question that has never been answered.
    fn initial_state(&self) -> KnowledgeState {
        KnowledgeState::default()
    }

    /// Next state after one answer. Pure and total.
    fn apply(&self, state: &KnowledgeState, event: &AnswerEvent, now: DateTime<Utc>)
        -> KnowledgeState;

    /// Need score, higher means more urgently needed.
    fn score(&self, state: &KnowledgeState, now: DateTime<Utc>) -> f64;

    /// Whether the question is waiting for review at `now`.
    fn is_due(&self, state: &KnowledgeState, now: DateTime<Utc>) -> bool;

    /// Display label derived from the numeric state.
    fn strength(&self, state: &KnowledgeState) -> Strength;
}

/// Get strategy by name.
pub fn get_strategy(name: &str) -> Option<Box<dyn SchedulingStrategy>> {
    StrategyKind::from_str(name).map(strategy_for)
}

/// Construct the strategy for a configured kind.
pub fn strategy_for(kind: StrategyKind) -> Box<dyn SchedulingStrategy> {
    match kind {
        StrategyKind::Rating => Box::new(rating::RatingModel::default()),
        StrategyKind::Sm2 => Box::new(sm2::Sm2::default()),
    }
}

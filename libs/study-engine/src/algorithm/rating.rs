//! Simple rating model.
//!
//! Mastery is an integer rating from 0 (unknown) to 10 that moves one
//! step per answer. There is no review schedule: any question answered at
//! least once counts as due, and ordering comes from the need score.

use super::SchedulingStrategy;
use crate::types::{epoch_ms, AnswerEvent, KnowledgeState, Stage, Strength, DAY_MS, MAX_RATING};
use chrono::{DateTime, Utc};

/// Rating model with configurable score weights.
#[derive(Debug, Clone)]
pub struct RatingModel {
    pub max_rating: u8,
    /// Ratings at or above this count as in review rather than learning.
    pub review_rating: u8,
    pub base_score: f64,
    pub rating_weight: f64,
    pub incorrect_weight: f64,
    pub streak_weight: f64,
    pub recency_cap_days: i64,
}

impl Default for RatingModel {
    fn default() -> Self {
        Self {
            max_rating: MAX_RATING,
            review_rating: 5,
            base_score: 100.0,
            rating_weight: 15.0,
            incorrect_weight: 5.0,
            streak_weight: 3.0,
            recency_cap_days: 30,
        }
    }
}

impl RatingModel {
    /// Whole days since the last answer, 0 when never answered.
    fn days_since(&self, state: &KnowledgeState, now_ms: i64) -> i64 {
        if state.last_answered_at > 0 {
            (now_ms - state.last_answered_at).max(0) / DAY_MS
        } else {
            0
        }
    }
}

impl SchedulingStrategy for RatingModel {
    fn name(&self) -> &'static str {
        "rating"
    }

    fn apply(
        &self,
        state: &KnowledgeState,
        event: &AnswerEvent,
        now: DateTime<Utc>,
    ) -> KnowledgeState {
        let current = state.rating.min(self.max_rating);
        let mut next = state.clone();

        next.rating = if event.is_correct {
            current.saturating_add(1).min(self.max_rating)
        } else {
            current.saturating_sub(1)
        };
        next.record_outcome(event, epoch_ms(now));

        next.stage = if next.rating >= self.max_rating {
            Stage::Mastered
        } else if !event.is_correct || next.rating < self.review_rating {
            Stage::Learning
        } else {
            Stage::Review
        };

        next
    }

    fn score(&self, state: &KnowledgeState, now: DateTime<Utc>) -> f64 {
        let rating = f64::from(state.rating.min(self.max_rating));
        let base = self.base_score - rating * self.rating_weight;
        let boost = f64::from(state.incorrect_count) * self.incorrect_weight;
        let penalty = f64::from(state.correct_streak) * self.streak_weight;
        let recency = self
            .days_since(state, epoch_ms(now))
            .min(self.recency_cap_days) as f64;

        base + boost - penalty + recency
    }

    fn is_due(&self, state: &KnowledgeState, _now: DateTime<Utc>) -> bool {
        state.last_answered_at > 0
    }

    fn strength(&self, state: &KnowledgeState) -> Strength {
        if state.total_reviews == 0 {
            return Strength::New;
        }
        match state.rating {
            0..=3 => Strength::Learning,
            4..=6 => Strength::Good,
            r if r < self.max_rating => Strength::Strong,
            _ => Strength::Mastered,
        }
    }
}

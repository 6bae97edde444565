//! SM-2 spaced repetition model.
//!
//! Based on SuperMemo 2. Answer quality (0-5) is derived from correctness
//! and self-reported confidence:
//!
//! | answer    | none | guessing | unsure | confident |
//! |-----------|------|----------|--------|-----------|
//! | correct   | 4    | 3        | 4      | 5         |
//! | incorrect | 1    | 2        | 1      | 0         |
//!
//! A confidently wrong answer is the worst outcome; a lucky guess is the
//! weakest pass.

use super::SchedulingStrategy;
use crate::types::{
    epoch_ms, AnswerEvent, Confidence, KnowledgeState, Stage, Strength, DAY_MS, MAX_EASE, MIN_EASE,
};
use chrono::{DateTime, Utc};

/// Map one answer to an SM-2 quality score.
pub fn quality(event: &AnswerEvent) -> u8 {
    match (event.is_correct, event.confidence) {
        (true, None) => 4,
        (true, Some(Confidence::Guessing)) => 3,
        (true, Some(Confidence::Unsure)) => 4,
        (true, Some(Confidence::Confident)) => 5,
        (false, None) => 1,
        (false, Some(Confidence::Guessing)) => 2,
        (false, Some(Confidence::Unsure)) => 1,
        (false, Some(Confidence::Confident)) => 0,
    }
}

/// SM-2 model with configurable parameters.
#[derive(Debug, Clone)]
pub struct Sm2 {
    pub initial_ease: f64,
    pub minimum_ease: f64,
    pub maximum_ease: f64,
    /// Successful repetitions before a card counts as mastered.
    pub mastered_repetitions: u32,
    pub low_confidence: f64,
    pub low_accuracy: f64,
}

impl Default for Sm2 {
    fn default() -> Self {
        Self {
            initial_ease: MAX_EASE,
            minimum_ease: MIN_EASE,
            maximum_ease: MAX_EASE,
            mastered_repetitions: 5,
            low_confidence: 2.0,
            low_accuracy: 0.7,
        }
    }
}

impl Sm2 {
    /// EF' = EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02)), clamped.
    fn next_ease(&self, ease: f64, quality: u8) -> f64 {
        let ease = if ease.is_finite() {
            ease
        } else {
            self.initial_ease
        };
        let miss = 5.0 - f64::from(quality.min(5));
        let adjusted = ease + (0.1 - miss * (0.08 + miss * 0.02));
        adjusted.clamp(self.minimum_ease, self.maximum_ease)
    }
}

impl SchedulingStrategy for Sm2 {
    fn name(&self) -> &'static str {
        "sm2"
    }

    fn initial_state(&self) -> KnowledgeState {
        KnowledgeState {
            ease_factor: self.initial_ease,
            ..Default::default()
        }
    }

    fn apply(
        &self,
        state: &KnowledgeState,
        event: &AnswerEvent,
        now: DateTime<Utc>,
    ) -> KnowledgeState {
        let q = quality(event);
        let new_ease = self.next_ease(state.ease_factor, q);
        let mut next = state.clone();
        next.ease_factor = new_ease;

        if q < 3 {
            next.repetitions = 0;
            next.interval_days = 1;
            next.stage = Stage::Learning;
        } else {
            next.repetitions = state.repetitions.saturating_add(1);
            next.interval_days = match next.repetitions {
                1 => 1,
                2 => 6,
                // Previous interval, new ease.
                _ => (f64::from(state.interval_days) * new_ease).round().max(1.0) as u32,
            };
            next.stage = if next.repetitions >= self.mastered_repetitions {
                Stage::Mastered
            } else {
                Stage::Review
            };
        }

        let now_ms = epoch_ms(now);
        next.due_at = now_ms + i64::from(next.interval_days) * DAY_MS;
        next.record_outcome(event, now_ms);
        next
    }

    fn score(&self, state: &KnowledgeState, now: DateTime<Utc>) -> f64 {
        let now_ms = epoch_ms(now);
        let mut score = 0.0;

        if state.has_schedule() {
            if state.due_at <= now_ms {
                let days_overdue = (now_ms - state.due_at) / DAY_MS;
                score += 100.0 + 10.0 * days_overdue as f64;
            } else if state.due_at - now_ms <= DAY_MS {
                score += 10.0;
            }
        }

        match state.stage {
            Stage::New => score += 50.0,
            Stage::Learning => score += 30.0,
            Stage::Review | Stage::Mastered => {}
        }

        if state
            .average_confidence()
            .is_some_and(|avg| avg < self.low_confidence)
        {
            score += 20.0;
        }

        if state.accuracy().is_some_and(|acc| acc < self.low_accuracy) {
            score += 15.0;
        }

        score
    }

    fn is_due(&self, state: &KnowledgeState, now: DateTime<Utc>) -> bool {
        state.has_schedule() && state.due_at <= epoch_ms(now)
    }

    fn strength(&self, state: &KnowledgeState) -> Strength {
        let Some(accuracy) = state.accuracy() else {
            return Strength::New;
        };
        let interval = state.interval_days;
        if interval >= 21 && state.ease_factor >= 2.3 && accuracy >= 0.9 {
            Strength::Mastered
        } else if interval >= 14 && accuracy >= 0.8 {
            Strength::Strong
        } else if interval >= 6 && accuracy >= 0.7 {
            Strength::Good
        } else {
            Strength::Learning
        }
    }
}

//! Session statistics and daily goal tracking.

use crate::types::{epoch_ms, Confidence};
use chrono::{DateTime, FixedOffset, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

const DATE_FORMAT: &str = "%Y-%m-%d";
const MINUTE_MS: i64 = 60_000;

/// Study day for a moment in time.
///
/// Hours before `daily_reset_hour` (in the given offset) still count as
/// the previous day, so late-night study lands on the day it started.
pub fn study_date(now: DateTime<Utc>, offset: FixedOffset, daily_reset_hour: u32) -> NaiveDate {
    let local = now.with_timezone(&offset);
    let date = local.date_naive();
    if local.hour() < daily_reset_hour {
        date.pred_opt().unwrap_or(date)
    } else {
        date
    }
}

/// Format a study day as YYYY-MM-DD.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Counters for one study session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub started_at: i64,
    pub questions_answered: u32,
    pub correct_answers: u32,
    pub streak: u32,
    pub best_streak: u32,
    pub elapsed_ms: i64,
    pub confidence_sum: u32,
    pub confidence_count: u32,
}

impl SessionStats {
    pub fn start(now: DateTime<Utc>) -> Self {
        Self {
            started_at: epoch_ms(now),
            questions_answered: 0,
            correct_answers: 0,
            streak: 0,
            best_streak: 0,
            elapsed_ms: 0,
            confidence_sum: 0,
            confidence_count: 0,
        }
    }

    pub fn accuracy(&self) -> Option<f64> {
        (self.questions_answered > 0)
            .then(|| f64::from(self.correct_answers) / f64::from(self.questions_answered))
    }

    pub fn average_confidence(&self) -> Option<f64> {
        (self.confidence_count > 0)
            .then(|| f64::from(self.confidence_sum) / f64::from(self.confidence_count))
    }
}

/// Daily practice target and streak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyGoal {
    pub target_count: u32,
    pub completed_count: u32,
    pub target_minutes: u32,
    pub minutes_spent: u32,
    /// Consecutive past days on which the goal was met.
    pub streak_days: u32,
    pub last_active_date: String,
}

impl DailyGoal {
    pub fn new(target_count: u32, target_minutes: u32, today: NaiveDate) -> Self {
        Self {
            target_count,
            completed_count: 0,
            target_minutes,
            minutes_spent: 0,
            streak_days: 0,
            last_active_date: format_date(today),
        }
    }

    /// Both targets reached. A zero target is always reached.
    pub fn is_met(&self) -> bool {
        self.completed_count >= self.target_count && self.minutes_spent >= self.target_minutes
    }

    /// Streak including today once today's goal is met.
    pub fn current_streak(&self) -> u32 {
        if self.is_met() {
            self.streak_days + 1
        } else {
            self.streak_days
        }
    }

    /// Fraction of the count target completed, capped at 1.
    pub fn progress(&self) -> f64 {
        if self.target_count == 0 {
            return 1.0;
        }
        (f64::from(self.completed_count) / f64::from(self.target_count)).min(1.0)
    }

    /// Reset daily counters when `today` differs from the last active day.
    ///
    /// The streak grows only when the goal was met on the last active day
    /// and that day was yesterday. Returns whether a rollover happened.
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        let today_str = format_date(today);
        if self.last_active_date == today_str {
            return false;
        }

        let last = NaiveDate::parse_from_str(&self.last_active_date, DATE_FORMAT).ok();
        let consecutive = last.and_then(|d| d.succ_opt()) == Some(today);
        self.streak_days = if consecutive && self.is_met() {
            self.streak_days.saturating_add(1)
        } else {
            0
        };

        self.completed_count = 0;
        self.minutes_spent = 0;
        self.last_active_date = today_str;
        true
    }
}

/// Tracks one session and feeds it into the daily goal.
#[derive(Debug, Clone)]
pub struct SessionTracker {
    stats: SessionStats,
    goal: DailyGoal,
    offset: FixedOffset,
    daily_reset_hour: u32,
    /// Daily minutes recorded before this session started the current day.
    minutes_base: u32,
    /// Session elapsed time at which the current study day began.
    day_anchor_ms: i64,
}

impl SessionTracker {
    pub fn start(
        goal: DailyGoal,
        now: DateTime<Utc>,
        offset: FixedOffset,
        daily_reset_hour: u32,
    ) -> Self {
        let mut tracker = Self {
            stats: SessionStats::start(now),
            goal,
            offset,
            daily_reset_hour,
            minutes_base: 0,
            day_anchor_ms: 0,
        };
        tracker.refresh(now);
        tracker.minutes_base = tracker.goal.minutes_spent;
        tracker
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn goal(&self) -> &DailyGoal {
        &self.goal
    }

    pub fn into_parts(self) -> (SessionStats, DailyGoal) {
        (self.stats, self.goal)
    }

    fn elapsed(&self, now: DateTime<Utc>) -> i64 {
        (epoch_ms(now) - self.stats.started_at).max(0)
    }

    /// Apply day rollover for `now` and return the current goal.
    pub fn refresh(&mut self, now: DateTime<Utc>) -> &DailyGoal {
        let today = study_date(now, self.offset, self.daily_reset_hour);
        if self.goal.roll_over(today) {
            self.minutes_base = 0;
            self.day_anchor_ms = self.elapsed(now);
        }
        &self.goal
    }

    /// Count one answer.
    pub fn record_answer(
        &mut self,
        correct: bool,
        confidence: Option<Confidence>,
        now: DateTime<Utc>,
    ) {
        self.refresh(now);
        let elapsed = self.elapsed(now);

        let stats = &mut self.stats;
        stats.questions_answered = stats.questions_answered.saturating_add(1);
        if correct {
            stats.correct_answers = stats.correct_answers.saturating_add(1);
            stats.streak = stats.streak.saturating_add(1);
            stats.best_streak = stats.best_streak.max(stats.streak);
        } else {
            stats.streak = 0;
        }
        if let Some(confidence) = confidence {
            stats.confidence_sum += u32::from(confidence.to_value());
            stats.confidence_count += 1;
        }
        stats.elapsed_ms = elapsed;

        let day_minutes = ((elapsed - self.day_anchor_ms).max(0) / MINUTE_MS) as u32;
        self.goal.completed_count = self.goal.completed_count.saturating_add(1);
        self.goal.minutes_spent = self.minutes_base.saturating_add(day_minutes);
    }
}

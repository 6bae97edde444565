//! Statistics command.

use crate::bank::QuestionBank;
use crate::commands::study::current_goal;
use crate::db::{CalendarData, SettingsRepository, SqliteRepository, StatsRepository, StudyStats};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::io::Write;
use study_engine::{
    strategy_for, DailyGoal, KnowledgeState, KnowledgeStore, QuestionRef, SchedulingStrategy,
    Stage, StatePersistence, Strength,
};

/// Knowledge summary over a set of questions.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct KnowledgeSummary {
    pub total: usize,
    pub new: usize,
    pub learning: usize,
    pub review: usize,
    pub mastered: usize,
    pub due_now: usize,
    /// Counts per strength label, weakest first.
    pub strength: Vec<(&'static str, usize)>,
    pub average_ease: f64,
    pub average_interval: f64,
}

/// Summarize `pool`, or every stored state when no pool is given.
pub fn summarize(
    store: &KnowledgeStore,
    pool: Option<&[QuestionRef]>,
    strategy: &dyn SchedulingStrategy,
    now: DateTime<Utc>,
) -> KnowledgeSummary {
    let states: Vec<KnowledgeState> = match pool {
        Some(pool) => pool.iter().map(|q| store.state_or_default(&q.id)).collect(),
        None => store.iter().map(|(_, state)| state.clone()).collect(),
    };

    let mut summary = KnowledgeSummary {
        total: states.len(),
        strength: [
            Strength::New,
            Strength::Learning,
            Strength::Good,
            Strength::Strong,
            Strength::Mastered,
        ]
        .iter()
        .map(|s| (s.label(), 0))
        .collect(),
        ..KnowledgeSummary::default()
    };

    let mut ease_sum = 0.0;
    let mut interval_sum = 0.0;
    let mut scheduled = 0usize;

    for state in &states {
        match state.stage {
            Stage::New => summary.new += 1,
            Stage::Learning => summary.learning += 1,
            Stage::Review => summary.review += 1,
            Stage::Mastered => summary.mastered += 1,
        }
        if strategy.is_due(state, now) {
            summary.due_now += 1;
        }
        let label = strategy.strength(state).label();
        if let Some(entry) = summary.strength.iter_mut().find(|(l, _)| *l == label) {
            entry.1 += 1;
        }
        if !state.is_new() {
            ease_sum += state.ease_factor;
            interval_sum += f64::from(state.interval_days);
            scheduled += 1;
        }
    }

    if scheduled > 0 {
        summary.average_ease = ease_sum / scheduled as f64;
        summary.average_interval = interval_sum / scheduled as f64;
    }
    summary
}

/// Print knowledge, history and goal statistics.
pub fn show_stats<W: Write>(
    repo: &SqliteRepository,
    bank: Option<&QuestionBank>,
    output: &mut W,
) -> Result<()> {
    let now = Utc::now();
    let settings = repo.get_settings()?;
    let strategy = strategy_for(settings.strategy);
    let store = repo.load()?;
    let summary = summarize(
        &store,
        bank.map(QuestionBank::questions),
        strategy.as_ref(),
        now,
    );
    let history = repo.get_study_stats(settings.daily_reset_hour)?;
    let calendar = repo.get_calendar_data(7, settings.daily_reset_hour)?;

    write_summary(&summary, strategy.name(), output)?;
    write_history(&history, &calendar, output)?;
    if let Some(goal) = current_goal(repo, &settings, now)? {
        write_goal(&goal, output)?;
    }
    Ok(())
}

fn write_summary<W: Write>(
    summary: &KnowledgeSummary,
    strategy: &str,
    output: &mut W,
) -> Result<()> {
    writeln!(output, "Questions ({strategy}): {}", summary.total)?;
    writeln!(
        output,
        "  new {}  learning {}  review {}  mastered {}  due now {}",
        summary.new, summary.learning, summary.review, summary.mastered, summary.due_now
    )?;
    let strength: Vec<String> = summary
        .strength
        .iter()
        .map(|(label, count)| format!("{label} {count}"))
        .collect();
    writeln!(output, "  strength: {}", strength.join(", "))?;
    writeln!(
        output,
        "  average ease {:.2}, average interval {:.1} days",
        summary.average_ease, summary.average_interval
    )?;
    Ok(())
}

fn write_history<W: Write>(
    history: &StudyStats,
    calendar: &[CalendarData],
    output: &mut W,
) -> Result<()> {
    writeln!(
        output,
        "Today: {} answers on {} questions, {} correct",
        history.answers_today, history.questions_today, history.correct_today
    )?;
    writeln!(
        output,
        "All time: {} answers, {:.0}% correct, {} active day(s)",
        history.total_answers,
        history.accuracy * 100.0,
        history.active_days
    )?;
    let days: Vec<String> = calendar
        .iter()
        .map(|day| format!("{} {}", &day.date[5..], day.answers))
        .collect();
    writeln!(output, "Last 7 days: {}", days.join(" | "))?;
    Ok(())
}

fn write_goal<W: Write>(goal: &DailyGoal, output: &mut W) -> Result<()> {
    writeln!(
        output,
        "Daily goal ({}): {}/{} questions, {}/{} minutes, {:.0}%, streak {} day(s)",
        goal.last_active_date,
        goal.completed_count,
        goal.target_count,
        goal.minutes_spent,
        goal.target_minutes,
        goal.progress() * 100.0,
        goal.current_streak()
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::date_utils::get_adjusted_today_string;
    use crate::db::{GoalRepository, StateRepository};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use study_engine::{AnswerEvent, StrategyKind};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 10, 12, 0, 0).unwrap()
    }

    fn pool() -> Vec<QuestionRef> {
        ["a", "b", "c", "d"].into_iter().map(QuestionRef::new).collect()
    }

    #[test]
    fn summary_counts_unanswered_pool_questions_as_new() {
        let strategy = strategy_for(StrategyKind::Sm2);
        let mut store = KnowledgeStore::new();
        let fresh = KnowledgeState::default();
        let answered = strategy.apply(&fresh, &AnswerEvent::correct("a"), now());
        store.set("a", answered);
        let failed = strategy.apply(&fresh, &AnswerEvent::incorrect("b"), now());
        store.set("b", failed);

        let summary = summarize(&store, Some(&pool()), strategy.as_ref(), now());
        assert_eq!(summary.total, 4);
        assert_eq!(summary.new, 2);
        assert_eq!(summary.review, 1);
        assert_eq!(summary.learning, 1);
        assert_eq!(summary.due_now, 0);
        assert_eq!(summary.strength[0], ("New", 2));
        assert_eq!(summary.average_interval, 1.0);

        let stored_only = summarize(&store, None, strategy.as_ref(), now());
        assert_eq!(stored_only.total, 2);
        assert_eq!(stored_only.new, 0);
    }

    #[test]
    fn show_stats_prints_every_block() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        repo.save_state("a", &KnowledgeState::default()).unwrap();
        repo.save_goal(&DailyGoal {
            target_count: 5,
            completed_count: 3,
            target_minutes: 0,
            minutes_spent: 0,
            streak_days: 1,
            last_active_date: "2020-01-01".to_string(),
        })
        .unwrap();

        let mut output = Vec::new();
        show_stats(&repo, None, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();

        assert!(text.contains("Questions (sm2): 1"));
        assert!(text.contains("All time: 0 answers"));
        let today = get_adjusted_today_string(0);
        assert!(text.contains(&format!("Daily goal ({today}): 0/5 questions")));
        assert!(text.contains("streak 0 day(s)"));
        assert_eq!(
            repo.get_goal().unwrap().map(|g| g.last_active_date),
            Some(today)
        );
    }
}

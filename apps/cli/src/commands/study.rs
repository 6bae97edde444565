//! Interactive study session.

use crate::bank::QuestionBank;
use crate::db::date_utils::local_offset;
use crate::db::{
    AnswerRecord, GoalRepository, HistoryRepository, SettingsRepository, SqliteRepository,
    StateRepository,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::io::{BufRead, Write};
use std::time::Instant;
use study_engine::session::format_date;
use study_engine::{
    strategy_for, study_date, AnswerEvent, Confidence, DailyGoal, EngineSettings, KnowledgeState,
    KnowledgeStore, PoolFilter, QuestionRef, SchedulingStrategy, Selection, Selector,
    SessionStats, SessionTracker, StatePersistence, StudyMode,
};

/// Options for one study run.
#[derive(Debug, Clone, Default)]
pub struct StudyOptions {
    /// Overrides the configured mode.
    pub mode: Option<StudyMode>,
    pub sections: Vec<String>,
    pub quizzes: Vec<String>,
    /// Serve a precomputed session batch instead of picking one at a time.
    pub batch: bool,
    /// Maximum questions; defaults to the configured session size.
    pub count: Option<usize>,
    /// Fixed shuffle seed.
    pub seed: Option<u64>,
}

/// Outcome of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct StudySummary {
    pub stats: SessionStats,
    pub goal: DailyGoal,
    pub stop: StopReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    LimitReached,
    Quit,
    EmptyPool,
    NoneDue,
}

/// The learner's response to one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Response {
    is_correct: bool,
    confidence: Option<Confidence>,
    response_time_ms: u64,
}

/// Run a study session against `bank`, reading answers from `input`.
pub fn run_study<R: BufRead, W: Write>(
    repo: &SqliteRepository,
    bank: &QuestionBank,
    options: &StudyOptions,
    input: &mut R,
    output: &mut W,
) -> Result<StudySummary> {
    let settings = repo.get_settings()?;
    let mode = options.mode.unwrap_or(settings.mode);
    let limit = options.count.unwrap_or(settings.session_size);
    let strategy = strategy_for(settings.strategy);

    let mut selector = match options.seed {
        Some(seed) => Selector::with_seed(mode, settings.recent_window, seed),
        None => Selector::new(mode, settings.recent_window),
    };
    let mut filter = PoolFilter::all();
    if !options.sections.is_empty() {
        filter = filter.with_sections(options.sections.iter().cloned());
    }
    if !options.quizzes.is_empty() {
        filter = filter.with_quizzes(options.quizzes.iter().cloned());
    }
    selector.set_filter(filter);

    let mut store = repo.load().context("failed to load knowledge states")?;
    let now = Utc::now();
    let mut tracker = SessionTracker::start(
        load_goal(repo, &settings, now)?,
        now,
        local_offset(),
        settings.daily_reset_hour,
    );

    tracing::info!(
        "Starting {} session with {} strategy over {} questions",
        mode.as_str(),
        strategy.name(),
        bank.len()
    );

    let mut session = StudySession {
        repo,
        bank,
        strategy: strategy.as_ref(),
        settings: &settings,
        store: &mut store,
        tracker: &mut tracker,
    };

    let stop = if options.batch {
        let batch = selector.session(
            bank.questions(),
            session.store,
            session.strategy,
            now,
            limit,
            settings.mix_new_cards,
        );
        session.run_batch(&batch, input, output)?
    } else {
        session.run_adaptive(&mut selector, limit, input, output)?
    };

    match stop {
        StopReason::EmptyPool => writeln!(output, "No questions match the current filter.")?,
        StopReason::NoneDue => writeln!(output, "Nothing is due right now. Come back later.")?,
        StopReason::LimitReached | StopReason::Quit => {}
    }

    let (stats, goal) = tracker.into_parts();
    print_summary(&stats, &goal, output)?;
    Ok(StudySummary { stats, goal, stop })
}

/// Stored daily goal rolled over to the current study day.
///
/// A rollover is written back so later reads see the same day.
pub(crate) fn current_goal(
    repo: &SqliteRepository,
    settings: &EngineSettings,
    now: DateTime<Utc>,
) -> Result<Option<DailyGoal>> {
    let Some(mut goal) = repo.get_goal()? else {
        return Ok(None);
    };
    let today = study_date(now, local_offset(), settings.daily_reset_hour);
    if goal.roll_over(today) {
        tracing::debug!("Daily goal rolled over to {}", goal.last_active_date);
        repo.save_goal(&goal)?;
    }
    Ok(Some(goal))
}

/// Current daily goal, created from the settings on first use.
fn load_goal(
    repo: &SqliteRepository,
    settings: &EngineSettings,
    now: DateTime<Utc>,
) -> Result<DailyGoal> {
    let today = study_date(now, local_offset(), settings.daily_reset_hour);
    let mut goal = current_goal(repo, settings, now)?.unwrap_or_else(|| {
        DailyGoal::new(
            settings.daily_goal_count,
            settings.daily_goal_minutes,
            today,
        )
    });
    goal.target_count = settings.daily_goal_count;
    goal.target_minutes = settings.daily_goal_minutes;
    Ok(goal)
}

struct StudySession<'a> {
    repo: &'a SqliteRepository,
    bank: &'a QuestionBank,
    strategy: &'a dyn SchedulingStrategy,
    settings: &'a EngineSettings,
    store: &'a mut KnowledgeStore,
    tracker: &'a mut SessionTracker,
}

impl StudySession<'_> {
    fn run_adaptive<R: BufRead, W: Write>(
        &mut self,
        selector: &mut Selector,
        limit: usize,
        input: &mut R,
        output: &mut W,
    ) -> Result<StopReason> {
        let bank = self.bank;
        for served in 0..limit {
            let question = match selector.next(
                bank.questions(),
                self.store,
                self.strategy,
                Utc::now(),
            ) {
                Selection::Next(question) => question,
                Selection::EmptyPool => return Ok(StopReason::EmptyPool),
                Selection::NoneDue => return Ok(StopReason::NoneDue),
            };

            writeln!(output, "\n({}/{})", served + 1, limit)?;
            if !self.ask(question, input, output)? {
                return Ok(StopReason::Quit);
            }
        }
        Ok(StopReason::LimitReached)
    }

    fn run_batch<R: BufRead, W: Write>(
        &mut self,
        batch: &[QuestionRef],
        input: &mut R,
        output: &mut W,
    ) -> Result<StopReason> {
        if batch.is_empty() {
            return Ok(StopReason::EmptyPool);
        }
        for (i, question) in batch.iter().enumerate() {
            writeln!(output, "\n({}/{})", i + 1, batch.len())?;
            if !self.ask(question, input, output)? {
                return Ok(StopReason::Quit);
            }
        }
        Ok(StopReason::LimitReached)
    }

    /// Present one question. Returns false when the learner quits.
    fn ask<R: BufRead, W: Write>(
        &mut self,
        question: &QuestionRef,
        input: &mut R,
        output: &mut W,
    ) -> Result<bool> {
        let Some(response) = prompt_question(self.bank, question, input, output)? else {
            return Ok(false);
        };

        let mut event = AnswerEvent::new(question.id.clone(), response.is_correct)
            .with_response_time(response.response_time_ms);
        if let Some(confidence) = response.confidence {
            event = event.with_confidence(confidence);
        }

        let now = Utc::now();
        let state = self.submit(&event, now)?;
        self.tracker
            .record_answer(event.is_correct, event.confidence, now);
        self.repo.save_goal(self.tracker.goal())?;

        writeln!(
            output,
            "{} ({})",
            state.stage.as_str(),
            self.strategy.strength(&state).label()
        )?;
        Ok(true)
    }

    /// Apply one answer, persist the new state and log it.
    fn submit(&mut self, event: &AnswerEvent, now: DateTime<Utc>) -> Result<KnowledgeState> {
        let before = self.store.state_or_default(&event.question_id);
        let after = self.strategy.apply(&before, event, now);

        self.repo
            .save_state(&event.question_id, &after)
            .with_context(|| format!("failed to save state for {}", event.question_id))?;

        let today = study_date(now, local_offset(), self.settings.daily_reset_hour);
        self.repo.insert_answer(&AnswerRecord {
            question_id: event.question_id.clone(),
            answered_at: now.to_rfc3339(),
            study_date: format_date(today),
            is_correct: event.is_correct,
            confidence: event.confidence.map(Confidence::to_value),
            response_time_ms: event.response_time_ms,
            strategy: self.strategy.name().to_string(),
            stage_before: before.stage.as_str().to_string(),
            stage_after: after.stage.as_str().to_string(),
            interval_before: before.interval_days,
            interval_after: after.interval_days,
            ease_before: before.ease_factor,
            ease_after: after.ease_factor,
            rating_before: before.rating,
            rating_after: after.rating,
        })?;

        tracing::debug!(
            "Answered {} correct={} stage {} -> {}",
            event.question_id,
            event.is_correct,
            before.stage.as_str(),
            after.stage.as_str()
        );

        self.store.set(event.question_id.clone(), after.clone());
        Ok(after)
    }
}

fn prompt_question<R: BufRead, W: Write>(
    bank: &QuestionBank,
    question: &QuestionRef,
    input: &mut R,
    output: &mut W,
) -> Result<Option<Response>> {
    let location = match (&question.section, &question.quiz) {
        (Some(section), Some(quiz)) => format!("[{section} / {quiz}] "),
        (Some(section), None) => format!("[{section}] "),
        _ => String::new(),
    };
    let (prompt, answer) = match bank.card(&question.id) {
        Some(card) => (card.prompt.as_str(), card.answer.as_str()),
        None => (question.id.as_str(), ""),
    };

    let started = Instant::now();
    writeln!(output, "{location}Q: {prompt}")?;
    write!(output, "(Enter to reveal, q to quit) ")?;
    output.flush()?;
    match read_line(input)? {
        None => return Ok(None),
        Some(line) if line.eq_ignore_ascii_case("q") => return Ok(None),
        Some(_) => {}
    }
    let response_time_ms = started.elapsed().as_millis() as u64;
    writeln!(output, "A: {answer}")?;

    let is_correct = loop {
        write!(output, "Correct? [y/n/q] ")?;
        output.flush()?;
        match read_line(input)?.as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("q") => return Ok(None),
            Some("y") | Some("yes") => break true,
            Some("n") | Some("no") => break false,
            Some(_) => writeln!(output, "Please answer y or n.")?,
        }
    };

    let confidence = loop {
        write!(output, "Confidence 1=guessing 2=unsure 3=confident (Enter to skip) ")?;
        output.flush()?;
        match read_line(input)?.as_deref() {
            None | Some("") => break None,
            Some(line) => match line.parse::<i64>() {
                Ok(value @ 1..=3) => break Some(Confidence::from_value(value)),
                _ => writeln!(output, "Please enter 1, 2 or 3.")?,
            },
        }
    };

    Ok(Some(Response {
        is_correct,
        confidence,
        response_time_ms,
    }))
}

/// Next trimmed input line, or `None` at end of input.
fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn print_summary<W: Write>(stats: &SessionStats, goal: &DailyGoal, output: &mut W) -> Result<()> {
    writeln!(output)?;
    match stats.accuracy() {
        Some(accuracy) => writeln!(
            output,
            "Session: {} answered, {} correct ({:.0}%), best streak {}",
            stats.questions_answered,
            stats.correct_answers,
            accuracy * 100.0,
            stats.best_streak
        )?,
        None => writeln!(output, "Session: no questions answered")?,
    }
    writeln!(
        output,
        "Daily goal: {}/{} questions, {}/{} minutes, streak {} day(s){}",
        goal.completed_count,
        goal.target_count,
        goal.minutes_spent,
        goal.target_minutes,
        goal.current_streak(),
        if goal.is_met() { " - goal met" } else { "" }
    )?;
    Ok(())
}

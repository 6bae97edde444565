//! Question selection.
//!
//! The selector filters a question pool by section/quiz, applies the
//! mode's candidate policy and returns the next question. Cyclic modes
//! (sequential, shuffle) serve from a working list that survives between
//! calls and is rebuilt only when the filtered pool changes size or the
//! mode or filter is replaced. Ranked modes re-score on every call since
//! states move after each answer.

use crate::algorithm::SchedulingStrategy;
use crate::recent::RecentWindow;
use crate::store::KnowledgeStore;
use crate::types::{EngineSettings, KnowledgeState, QuestionRef, StudyMode};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashSet;
use tracing::debug;

/// Minimum reviews before a question can count as weak.
pub const WEAK_MIN_REVIEWS: u32 = 3;
pub const WEAK_ACCURACY: f64 = 0.6;
pub const WEAK_CONFIDENCE: f64 = 1.5;

/// Share of a session batch reserved for due and new cards.
pub const SESSION_DUE_SHARE: f64 = 0.7;
pub const SESSION_NEW_SHARE: f64 = 0.3;

/// Outcome of a selection request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection<'a> {
    Next(&'a QuestionRef),
    /// Nothing matches the current filter and mode.
    EmptyPool,
    /// Due-only mode found questions, but none is due yet.
    NoneDue,
}

impl<'a> Selection<'a> {
    pub fn question(&self) -> Option<&'a QuestionRef> {
        match self {
            Self::Next(q) => Some(*q),
            Self::EmptyPool | Self::NoneDue => None,
        }
    }
}

/// Section and quiz restriction applied before any mode policy.
///
/// An unset dimension matches every question.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolFilter {
    sections: Option<HashSet<String>>,
    quizzes: Option<HashSet<String>>,
}

impl PoolFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_sections<I, S>(mut self, sections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sections = Some(sections.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_quizzes<I, S>(mut self, quizzes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.quizzes = Some(quizzes.into_iter().map(Into::into).collect());
        self
    }

    pub fn matches(&self, question: &QuestionRef) -> bool {
        fn allowed(set: &Option<HashSet<String>>, value: &Option<String>) -> bool {
            match set {
                None => true,
                Some(set) => value.as_ref().is_some_and(|v| set.contains(v)),
            }
        }
        allowed(&self.sections, &question.section) && allowed(&self.quizzes, &question.quiz)
    }
}

struct Scored<'a> {
    question: &'a QuestionRef,
    state: KnowledgeState,
    score: f64,
}

/// Picks the next question for a study mode.
pub struct Selector {
    mode: StudyMode,
    filter: PoolFilter,
    recent: RecentWindow,
    /// Indices into the filtered pool, in serving order.
    working: Vec<usize>,
    cursor: usize,
    built_len: Option<usize>,
    rng: StdRng,
}

impl Selector {
    pub fn new(mode: StudyMode, recent_window: usize) -> Self {
        Self::with_rng(mode, recent_window, StdRng::from_entropy())
    }

    /// Deterministic shuffle order.
    pub fn with_seed(mode: StudyMode, recent_window: usize, seed: u64) -> Self {
        Self::with_rng(mode, recent_window, StdRng::seed_from_u64(seed))
    }

    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self::new(settings.mode, settings.recent_window)
    }

    fn with_rng(mode: StudyMode, recent_window: usize, rng: StdRng) -> Self {
        Self {
            mode,
            filter: PoolFilter::all(),
            recent: RecentWindow::new(recent_window),
            working: Vec::new(),
            cursor: 0,
            built_len: None,
            rng,
        }
    }

    pub fn mode(&self) -> StudyMode {
        self.mode
    }

    pub fn filter(&self) -> &PoolFilter {
        &self.filter
    }

    pub fn recent(&self) -> &RecentWindow {
        &self.recent
    }

    pub fn set_mode(&mut self, mode: StudyMode) {
        if mode != self.mode {
            self.mode = mode;
            self.invalidate();
        }
    }

    pub fn set_filter(&mut self, filter: PoolFilter) {
        if filter != self.filter {
            self.filter = filter;
            self.invalidate();
        }
    }

    /// Record a question served outside `next`, e.g. from a session batch.
    pub fn mark_served(&mut self, id: &str) {
        self.recent.push(id);
    }

    /// Forget the working list and the recent window.
    pub fn reset(&mut self) {
        self.invalidate();
        self.recent.clear();
    }

    fn invalidate(&mut self) {
        self.built_len = None;
    }

    /// Select the next question.
    pub fn next<'a>(
        &mut self,
        pool: &'a [QuestionRef],
        store: &KnowledgeStore,
        strategy: &dyn SchedulingStrategy,
        now: DateTime<Utc>,
    ) -> Selection<'a> {
        let filtered: Vec<&'a QuestionRef> =
            pool.iter().filter(|q| self.filter.matches(q)).collect();
        if filtered.is_empty() {
            debug!(mode = self.mode.as_str(), "filtered pool is empty");
            return Selection::EmptyPool;
        }

        let picked = if self.mode.is_cyclic() {
            self.next_cyclic(&filtered)
        } else {
            let ranked = self.ranked(&filtered, store, strategy, now);
            if ranked.is_empty() {
                return match self.mode {
                    StudyMode::DueOnly => Selection::NoneDue,
                    _ => Selection::EmptyPool,
                };
            }
            self.first_not_recent(&ranked)
        };

        self.recent.push(&picked.id);
        Selection::Next(picked)
    }

    fn rebuild(&mut self, filtered: &[&QuestionRef]) {
        self.working = (0..filtered.len()).collect();
        if self.mode == StudyMode::Shuffle {
            self.working.shuffle(&mut self.rng);
            // Keep just-served questions away from the front.
            let recent = &self.recent;
            let (fresh, stale): (Vec<usize>, Vec<usize>) = self
                .working
                .iter()
                .partition(|&&i| !recent.contains(&filtered[i].id));
            self.working = fresh.into_iter().chain(stale).collect();
        }
        self.cursor = 0;
        self.built_len = Some(filtered.len());
        debug!(
            mode = self.mode.as_str(),
            size = filtered.len(),
            "rebuilt working list"
        );
    }

    fn next_cyclic<'a>(&mut self, filtered: &[&'a QuestionRef]) -> &'a QuestionRef {
        if self.built_len != Some(filtered.len()) {
            self.rebuild(filtered);
        }

        let len = self.working.len();
        let fresh = (0..len)
            .map(|k| (self.cursor + k) % len)
            .find(|&pos| !self.recent.contains(&filtered[self.working[pos]].id));

        let pos = match fresh {
            Some(pos) => pos,
            None => {
                debug!("every candidate served recently, repeating");
                self.cursor
            }
        };

        self.cursor = (pos + 1) % len;
        filtered[self.working[pos]]
    }

    /// Candidates for a ranked mode, best first.
    fn ranked<'a>(
        &self,
        filtered: &[&'a QuestionRef],
        store: &KnowledgeStore,
        strategy: &dyn SchedulingStrategy,
        now: DateTime<Utc>,
    ) -> Vec<&'a QuestionRef> {
        let mut candidates: Vec<Scored<'a>> = score_all(filtered, store, strategy, now)
            .into_iter()
            .filter(|c| match self.mode {
                StudyMode::DueOnly => strategy.is_due(&c.state, now),
                StudyMode::NewOnly => c.state.is_new(),
                StudyMode::WeakAreas => is_weak(&c.state),
                _ => true,
            })
            .collect();

        if self.mode == StudyMode::WeakAreas {
            candidates.sort_by(|a, b| {
                let acc_a = a.state.accuracy().unwrap_or(1.0);
                let acc_b = b.state.accuracy().unwrap_or(1.0);
                acc_a.total_cmp(&acc_b)
            });
        } else {
            sort_by_need(&mut candidates);
        }

        candidates.into_iter().map(|c| c.question).collect()
    }

    fn first_not_recent<'a>(&self, ranked: &[&'a QuestionRef]) -> &'a QuestionRef {
        match ranked.iter().copied().find(|q| !self.recent.contains(&q.id)) {
            Some(q) => q,
            None => {
                debug!("every candidate served recently, repeating");
                ranked[0]
            }
        }
    }

    /// Build a study batch of up to `max_count` questions.
    ///
    /// Due cards fill up to 70% of the batch, new cards up to 30% when
    /// `mix_new` is set, and the highest-need remaining cards fill the
    /// rest.
    pub fn session(
        &self,
        pool: &[QuestionRef],
        store: &KnowledgeStore,
        strategy: &dyn SchedulingStrategy,
        now: DateTime<Utc>,
        max_count: usize,
        mix_new: bool,
    ) -> Vec<QuestionRef> {
        let filtered: Vec<&QuestionRef> =
            pool.iter().filter(|q| self.filter.matches(q)).collect();
        let mut scored = score_all(&filtered, store, strategy, now);
        sort_by_need(&mut scored);

        let due_quota = quota(max_count, SESSION_DUE_SHARE);
        let new_quota = quota(max_count, SESSION_NEW_SHARE);

        let mut chosen: Vec<QuestionRef> = Vec::with_capacity(max_count);
        let mut seen: HashSet<&str> = HashSet::new();

        fill(&mut chosen, &mut seen, &scored, due_quota, max_count, |c| {
            strategy.is_due(&c.state, now)
        });
        if mix_new {
            fill(&mut chosen, &mut seen, &scored, new_quota, max_count, |c| {
                c.state.is_new()
            });
        }
        fill(&mut chosen, &mut seen, &scored, max_count, max_count, |_| true);

        debug!(
            requested = max_count,
            selected = chosen.len(),
            "built session batch"
        );
        chosen
    }
}

fn score_all<'a>(
    filtered: &[&'a QuestionRef],
    store: &KnowledgeStore,
    strategy: &dyn SchedulingStrategy,
    now: DateTime<Utc>,
) -> Vec<Scored<'a>> {
    filtered
        .iter()
        .map(|q| {
            let state = store
                .get(&q.id)
                .cloned()
                .unwrap_or_else(|| strategy.initial_state());
            let score = strategy.score(&state, now);
            Scored {
                question: q,
                state,
                score,
            }
        })
        .collect()
}

/// Append up to `limit` unseen candidates matching `predicate`.
fn fill<'a>(
    chosen: &mut Vec<QuestionRef>,
    seen: &mut HashSet<&'a str>,
    candidates: &[Scored<'a>],
    limit: usize,
    max_count: usize,
    predicate: impl Fn(&Scored<'a>) -> bool,
) {
    let mut taken = 0;
    for candidate in candidates {
        if taken >= limit || chosen.len() >= max_count {
            break;
        }
        let id: &'a str = candidate.question.id.as_str();
        if seen.contains(id) || !predicate(candidate) {
            continue;
        }
        seen.insert(id);
        chosen.push(candidate.question.clone());
        taken += 1;
    }
}

/// Descending by score; ties keep pool order.
fn sort_by_need(candidates: &mut [Scored]) {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
}

fn is_weak(state: &KnowledgeState) -> bool {
    if state.total_reviews < WEAK_MIN_REVIEWS {
        return false;
    }
    let low_accuracy = state.accuracy().is_some_and(|acc| acc < WEAK_ACCURACY);
    let low_confidence = state
        .average_confidence()
        .is_some_and(|avg| avg < WEAK_CONFIDENCE);
    low_accuracy || low_confidence
}

fn quota(max_count: usize, share: f64) -> usize {
    ((max_count as f64) * share).round() as usize
}

//! End-to-end study loop: select, answer, update, persist, track.

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::convert::Infallible;

use study_engine::{
    import_into, strategy_for, AnswerEvent, DailyGoal, KnowledgeStore, QuestionRef, Selection,
    Selector, SessionTracker, Snapshot, Stage, StatePersistence, StrategyKind, StudyMode,
};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 2, 9, 0, 0).unwrap()
}

fn bank() -> Vec<QuestionRef> {
    (1..=6)
        .map(|i| {
            let section = if i <= 3 { "basics" } else { "advanced" };
            QuestionRef::new(format!("q{i}")).with_section(section)
        })
        .collect()
}

/// In-memory persistence standing in for a real storage layer.
#[derive(Default)]
struct MemoryPersistence {
    saved: RefCell<KnowledgeStore>,
    saves: RefCell<usize>,
}

impl StatePersistence for MemoryPersistence {
    type Error = Infallible;

    fn load(&self) -> Result<KnowledgeStore, Self::Error> {
        Ok(self.saved.borrow().clone())
    }

    fn save(&self, store: &KnowledgeStore) -> Result<(), Self::Error> {
        *self.saved.borrow_mut() = store.clone();
        *self.saves.borrow_mut() += 1;
        Ok(())
    }
}

#[test]
fn answering_moves_questions_through_stages() {
    let strategy = strategy_for(StrategyKind::Sm2);
    let persistence = MemoryPersistence::default();
    let pool = bank();
    let mut selector = Selector::new(StudyMode::MostNeeded, 5);
    let mut tracker = SessionTracker::start(
        DailyGoal::new(6, 0, start().date_naive()),
        start(),
        FixedOffset::east_opt(0).unwrap(),
        0,
    );

    let mut store = persistence.load().unwrap();
    let mut now = start();
    for _ in 0..6 {
        let question = selector
            .next(&pool, &store, strategy.as_ref(), now)
            .question()
            .cloned()
            .expect("new questions are always available");
        let event = AnswerEvent::new(question.id.clone(), question.id != "q2");
        let next = strategy.apply(&store.state_or_default(&question.id), &event, now);
        store.set(question.id.clone(), next);
        persistence.save(&store).unwrap();
        tracker.record_answer(event.is_correct, None, now);
        now += Duration::minutes(1);
    }

    let reloaded = persistence.load().unwrap();
    assert_eq!(reloaded.len(), 6);
    assert_eq!(*persistence.saves.borrow(), 6);
    assert_eq!(reloaded.get("q2").map(|s| s.stage), Some(Stage::Learning));
    assert_eq!(reloaded.get("q1").map(|s| s.stage), Some(Stage::Review));

    assert_eq!(tracker.stats().questions_answered, 6);
    assert_eq!(tracker.stats().correct_answers, 5);
    assert!(tracker.goal().is_met());
}

#[test]
fn due_only_waits_until_reviews_come_due() {
    let strategy = strategy_for(StrategyKind::Sm2);
    let pool = bank();
    let mut store = KnowledgeStore::new();
    for q in &pool {
        let state = store.state_or_default(&q.id);
        let next = strategy.apply(&state, &AnswerEvent::correct(&q.id), start());
        store.set(q.id.clone(), next);
    }

    let mut selector = Selector::new(StudyMode::DueOnly, 5);
    assert_eq!(
        selector.next(&pool, &store, strategy.as_ref(), start()),
        Selection::NoneDue
    );

    let tomorrow = start() + Duration::days(1);
    let picked = selector.next(&pool, &store, strategy.as_ref(), tomorrow);
    assert!(picked.question().is_some());
}

#[test]
fn weak_questions_resurface_first_in_session_batch() {
    let strategy = strategy_for(StrategyKind::Rating);
    let pool = bank();
    let mut store = KnowledgeStore::new();
    let mut now = start();
    for round in 0..4 {
        for q in &pool {
            let correct = q.id != "q5" || round == 3;
            let event = AnswerEvent::new(q.id.clone(), correct);
            let next = strategy.apply(&store.state_or_default(&q.id), &event, now);
            store.set(q.id.clone(), next);
        }
        now += Duration::hours(1);
    }

    let selector = Selector::new(StudyMode::MostNeeded, 5);
    let batch = selector.session(&pool, &store, strategy.as_ref(), now, 3, false);
    assert_eq!(batch.len(), 3);
    assert_eq!(batch[0].id, "q5");
}

#[test]
fn import_failure_keeps_existing_progress() {
    let strategy = strategy_for(StrategyKind::Sm2);
    let mut store = KnowledgeStore::new();
    for q in bank() {
        let state = store.state_or_default(&q.id);
        let next = strategy.apply(&state, &AnswerEvent::correct(&q.id), start());
        store.set(q.id, next);
    }
    let before = store.clone();

    let mut doc: serde_json::Value = serde_json::from_str(
        &Snapshot::capture(&store, StrategyKind::Sm2, start()).to_json().unwrap(),
    )
    .unwrap();
    doc["states"]["q4"].as_object_mut().unwrap().remove("due_at");

    assert!(import_into(&mut store, &doc.to_string()).is_err());
    assert_eq!(store, before);
}

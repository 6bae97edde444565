//! Study, export, reset and import against an on-disk database.

use chrono::Utc;
use pretty_assertions::assert_eq;
use std::io::Cursor;

use study_cli::bank::QuestionBank;
use study_cli::commands::{
    export_snapshot, import_snapshot, reset_progress, run_study, show_stats, update_settings,
    SettingsUpdate, StopReason, StudyOptions,
};
use study_cli::db::{HistoryRepository, SqliteRepository, StateRepository, StatsRepository};
use study_engine::{StrategyKind, StudyMode};

const BANK: &str = r#"{ "sections": [
    { "name": "Networking", "quizzes": [ { "name": "TCP", "questions": [
        { "id": "tcp-1", "prompt": "How many packets in a handshake?", "answer": "Three" },
        { "id": "tcp-2", "prompt": "Which flag closes a connection?", "answer": "FIN" }
    ] } ] },
    { "name": "Storage", "quizzes": [ { "name": "SQL", "questions": [
        { "id": "sql-1", "prompt": "What does ACID's I stand for?", "answer": "Isolation" },
        { "id": "sql-2", "prompt": "Default SQLite journal mode?", "answer": "DELETE" }
    ] } ] }
] }"#;

fn study(
    repo: &SqliteRepository,
    bank: &QuestionBank,
    options: StudyOptions,
    script: &str,
) -> StopReason {
    let mut input = Cursor::new(script.as_bytes().to_vec());
    let mut output = Vec::new();
    run_study(repo, bank, &options, &mut input, &mut output)
        .unwrap()
        .stop
}

#[test]
fn progress_survives_export_reset_import() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("study.db");
    let snapshot = dir.path().join("snapshot.json");
    let bank = QuestionBank::from_json(BANK).unwrap();

    {
        let repo = SqliteRepository::open(&db_path).unwrap();
        update_settings(
            &repo,
            &SettingsUpdate {
                strategy: Some(StrategyKind::Rating),
                mode: Some(StudyMode::Sequential),
                ..SettingsUpdate::default()
            },
        )
        .unwrap();

        let options = StudyOptions {
            count: Some(4),
            ..StudyOptions::default()
        };
        let stop = study(&repo, &bank, options, "\ny\n3\n\nn\n1\n\ny\n\n\ny\n2\n");
        assert_eq!(stop, StopReason::LimitReached);
    }

    let repo = SqliteRepository::open(&db_path).unwrap();
    let before = repo.load_states().unwrap();
    assert_eq!(before.len(), 4);
    assert_eq!(before.get("tcp-1").map(|s| s.rating), Some(1));
    assert_eq!(before.get("tcp-2").map(|s| s.incorrect_count), Some(1));

    let stats = repo.get_study_stats(0).unwrap();
    assert_eq!(stats.total_answers, 4);
    assert_eq!(stats.accuracy, 0.75);

    assert_eq!(export_snapshot(&repo, &snapshot, Utc::now()).unwrap(), 4);
    let outcome = reset_progress(&repo, true).unwrap();
    assert_eq!((outcome.states, outcome.answers), (4, 4));
    assert!(repo.load_states().unwrap().is_empty());

    assert_eq!(import_snapshot(&repo, &snapshot).unwrap(), 4);
    assert_eq!(repo.load_states().unwrap(), before);
}

#[test]
fn weak_areas_serves_the_missed_question() {
    let dir = tempfile::tempdir().unwrap();
    let repo = SqliteRepository::open(dir.path().join("study.db")).unwrap();
    let bank = QuestionBank::from_json(BANK).unwrap();
    update_settings(
        &repo,
        &SettingsUpdate {
            mode: Some(StudyMode::Sequential),
            ..SettingsUpdate::default()
        },
    )
    .unwrap();

    // Three rounds: sql-2 is always missed.
    let round = "\ny\n\n\ny\n\n\ny\n\n\nn\n1\n";
    let options = StudyOptions {
        count: Some(12),
        ..StudyOptions::default()
    };
    study(&repo, &bank, options, &round.repeat(3));

    let weak = StudyOptions {
        mode: Some(StudyMode::WeakAreas),
        count: Some(1),
        ..StudyOptions::default()
    };
    let mut input = Cursor::new(b"\ny\n\n".to_vec());
    let mut output = Vec::new();
    run_study(&repo, &bank, &weak, &mut input, &mut output).unwrap();
    let text = String::from_utf8(output).unwrap();
    assert!(text.contains("Q: Default SQLite journal mode?"));

    let mut stats = Vec::new();
    show_stats(&repo, Some(&bank), &mut stats).unwrap();
    let stats = String::from_utf8(stats).unwrap();
    assert!(stats.contains("Questions (sm2): 4"));
    assert!(stats.contains("All time: 13 answers"));
    assert_eq!(repo.clear_history().unwrap(), 13);
}

use std::sync::Arc;

use dogdog_core::model::{PathId, Question, QuestionId};
use dogdog_core::time::fixed_clock;
use storage::record::progress_key;
use storage::repository::{InMemoryStore, Storage};
use services::{AnswerOutcome, AppConfig, AppServices, GameConfig, ManualTicker, QuestionBank};

fn bank(count: usize) -> Arc<QuestionBank> {
    let questions = (0..count)
        .map(|i| {
            Question::new(
                QuestionId::new(format!("pup-{i:03}")).unwrap(),
                format!("Puppy question {i}"),
                ["a".into(), "b".into(), "c".into(), "d".into()],
                2,
                None,
                10,
            )
            .unwrap()
        })
        .collect();
    Arc::new(QuestionBank::new(questions).with_shuffle(true))
}

fn path() -> PathId {
    PathId::new("puppies").unwrap()
}

async fn play(services: &AppServices, correct: usize) {
    let mut session = services
        .start_session(path(), bank(40), Box::new(ManualTicker::new()))
        .await
        .unwrap();
    for _ in 0..correct {
        let outcome = session.answer(2).await.unwrap();
        assert!(matches!(outcome, AnswerOutcome::Resolved(ref f) if f.is_correct));
        session.next_question().await.unwrap();
    }
    session.end_session();
}

#[tokio::test]
async fn progress_survives_sessions_in_sqlite() {
    let app = AppConfig {
        db_url: "sqlite:file:memdb_services_progress?mode=memory&cache=shared".into(),
        game: GameConfig::default(),
    };
    let services = AppServices::new_sqlite(&app, fixed_clock()).await.unwrap();

    play(&services, 12).await;

    let mut tracker = services.tracker();
    tracker.select_path(path()).await;
    let progress = tracker.progress().unwrap();
    assert_eq!(progress.questions_answered(), 12);
    assert_eq!(progress.completed_checkpoints().len(), 1);
    assert_eq!(progress.used_question_ids().len(), 12);
    assert_eq!(tracker.next_checkpoint().unwrap().display_name(), "Pug");
    assert!((tracker.progress_to_next_checkpoint() - 0.2).abs() < 1e-6);

    // a second session never repeats a used question
    let mut session = services
        .start_session(path(), bank(40), Box::new(ManualTicker::new()))
        .await
        .unwrap();
    let id = session.current_question().unwrap().id().clone();
    assert!(!progress.used_question_ids().contains(&id));
    session.end_session();
}

#[tokio::test]
async fn corrupted_progress_starts_fresh() {
    let store = InMemoryStore::new();
    store.put_raw(&progress_key(&path()), b"\x00\x01 not an envelope".to_vec());
    let services = AppServices::from_storage(
        Storage::from_store(store.clone()),
        GameConfig::default(),
        fixed_clock(),
    );

    play(&services, 3).await;

    let mut tracker = services.tracker();
    tracker.select_path(path()).await;
    assert_eq!(tracker.progress().unwrap().questions_answered(), 3);
}

#[tokio::test]
async fn version_one_progress_is_migrated_on_load() {
    let store = InMemoryStore::new();
    store.put_raw(
        &progress_key(&path()),
        r#"{"schema_version": 1, "data": {
            "path_id": "puppies",
            "questions_answered": 23,
            "correct_answers": 20,
            "completed_checkpoints": [1, 2],
            "last_checkpoint": 2
        }}"#,
    );
    let services = AppServices::from_storage(
        Storage::from_store(store.clone()),
        GameConfig::default(),
        fixed_clock(),
    );

    let mut tracker = services.tracker();
    tracker.select_path(path()).await;
    assert_eq!(tracker.progress().unwrap().questions_answered(), 23);
    assert_eq!(
        tracker.last_completed_checkpoint().unwrap().display_name(),
        "Pug"
    );
}

#[tokio::test]
async fn failing_saves_do_not_interrupt_play() {
    let store = InMemoryStore::new();
    store.fail_saves(true);
    let services = AppServices::from_storage(
        Storage::from_store(store.clone()),
        GameConfig::default(),
        fixed_clock(),
    );

    let mut session = services
        .start_session(path(), bank(40), Box::new(ManualTicker::new()))
        .await
        .unwrap();
    for _ in 0..11 {
        session.answer(2).await.unwrap();
        session.next_question().await.unwrap();
    }
    assert_eq!(session.tracker().progress().unwrap().questions_answered(), 11);
    assert_eq!(session.tracker().completed_count(), 1);
    assert!(session.tracker().flush().await.is_err());
    assert!(store.is_empty());

    store.fail_saves(false);
    session.tracker().flush().await.unwrap();
    assert_eq!(store.len(), 1);
}

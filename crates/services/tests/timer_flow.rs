use std::sync::Arc;
use std::time::Duration;

use dogdog_core::model::{PathId, Question, QuestionId};
use dogdog_core::time::fixed_clock;
use services::{AppServices, FallbackAction, GameConfig, QuestionBank, TokioTicker};

fn bank() -> Arc<QuestionBank> {
    let questions = (0..20)
        .map(|i| {
            Question::new(
                QuestionId::new(format!("t{i:02}")).unwrap(),
                format!("Timed question {i}"),
                ["a".into(), "b".into(), "c".into(), "d".into()],
                1,
                None,
                0,
            )
            .unwrap()
        })
        .collect();
    Arc::new(QuestionBank::new(questions))
}

/// Tick-forwarding loop a host would run: every tick from the ticker goes to
/// the session; after each timed-out question the next one starts.
#[tokio::test(start_paused = true)]
async fn running_out_of_time_three_times_triggers_fallback() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let services = AppServices::in_memory(GameConfig::default(), fixed_clock());
    let (ticker, mut ticks) = TokioTicker::every_second();
    let mut session = services
        .start_session(PathId::new("timed").unwrap(), bank(), Box::new(ticker))
        .await
        .unwrap();

    let mut timeouts = Vec::new();
    while timeouts.len() < 3 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        while let Ok(epoch) = ticks.try_recv() {
            if let Some(feedback) = session.tick(epoch).await.unwrap() {
                assert!(feedback.timed_out());
                timeouts.push(feedback);
                session.next_question().await.unwrap();
            }
        }
    }

    assert_eq!(timeouts[0].lives_remaining, 2);
    assert_eq!(timeouts[1].lives_remaining, 1);
    let summary = timeouts[2].fallback.as_ref().expect("fallback ran");
    assert_eq!(summary.action, FallbackAction::PathRestart);
    assert_eq!(session.lives(), 3);
    assert_eq!(session.time_remaining(), 20);
}

#[tokio::test(start_paused = true)]
async fn paused_session_receives_no_ticks() {
    let services = AppServices::in_memory(GameConfig::default(), fixed_clock());
    let (ticker, mut ticks) = TokioTicker::every_second();
    let mut session = services
        .start_session(PathId::new("timed").unwrap(), bank(), Box::new(ticker))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(3_500)).await;
    while let Ok(epoch) = ticks.try_recv() {
        session.tick(epoch).await.unwrap();
    }
    assert_eq!(session.time_remaining(), 17);

    assert!(session.pause());
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(ticks.try_recv().is_err());
    assert_eq!(session.time_remaining(), 17);

    assert!(session.resume());
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    while let Ok(epoch) = ticks.try_recv() {
        session.tick(epoch).await.unwrap();
    }
    assert_eq!(session.time_remaining(), 16);
}

#[tokio::test(start_paused = true)]
async fn tick_queued_before_answer_does_not_reach_next_question() {
    let services = AppServices::in_memory(GameConfig::default(), fixed_clock());
    let (ticker, mut ticks) = TokioTicker::every_second();
    let mut session = services
        .start_session(PathId::new("timed").unwrap(), bank(), Box::new(ticker))
        .await
        .unwrap();

    // one tick sits in the channel, unread, while the player answers
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    session.answer(1).await.unwrap();
    session.next_question().await.unwrap();
    assert_eq!(session.time_remaining(), 20);

    while let Ok(epoch) = ticks.try_recv() {
        assert!(session.tick(epoch).await.unwrap().is_none());
    }
    assert_eq!(session.time_remaining(), 20);

    tokio::time::sleep(Duration::from_millis(1_100)).await;
    while let Ok(epoch) = ticks.try_recv() {
        session.tick(epoch).await.unwrap();
    }
    assert_eq!(session.time_remaining(), 19);
}

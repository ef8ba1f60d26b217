//! Tests of what reaches the engine, using a scripted mock backend

use anyhow::Result;
use embedmpv::engine::{EngineCommand, EngineReply};
use embedmpv::{EngineError, PlayerError, PlayerState, Severity, ValidationError};
use embedmpv_integration_tests::{mock_session, MockBackend};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Mock that answers init and the speed query, counting every call
fn initializing_backend(calls: Arc<AtomicUsize>) -> MockBackend {
    let mut engine = MockBackend::new();
    engine.expect_execute().returning(move |command| {
        calls.fetch_add(1, Ordering::SeqCst);
        match command {
            EngineCommand::Init => Ok(EngineReply::confirmation(
                "MPV initialized for embedding - no popup windows",
            )),
            EngineCommand::GetPlaybackSpeed => Ok(EngineReply::Number(1.0)),
            other => Err(EngineError::rejected(other.name(), "unexpected command")),
        }
    });
    engine
}

#[tokio::test]
async fn test_load_while_uninitialized_never_reaches_engine() -> Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let session = mock_session(initializing_backend(Arc::clone(&calls)))?;

    let err = session.load_media("/a.mp4").await.unwrap_err();

    assert!(matches!(
        err,
        PlayerError::Validation(ValidationError::InvalidTransition {
            state: PlayerState::Uninitialized,
            ..
        })
    ));
    assert_eq!(session.state(), PlayerState::Uninitialized);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn test_loaded_only_intents_never_reach_engine() -> Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let session = mock_session(initializing_backend(Arc::clone(&calls)))?;

    assert!(session.toggle_play_pause().await.is_err());
    session.initialize().await?;
    let after_init = calls.load(Ordering::SeqCst);
    assert!(session.toggle_play_pause().await.is_err());

    assert_eq!(after_init, 2);
    assert_eq!(calls.load(Ordering::SeqCst), after_init);
    Ok(())
}

#[tokio::test]
async fn test_engine_message_is_surfaced_verbatim() -> Result<()> {
    let mut engine = MockBackend::new();
    engine
        .expect_execute()
        .withf(|command| matches!(command, EngineCommand::Load { .. }))
        .times(1)
        .returning(|_| Err(EngineError::rejected("load", "Failed to load file: -13")));
    engine
        .expect_execute()
        .withf(|command| *command == EngineCommand::GetPlaybackSpeed)
        .returning(|_| Ok(EngineReply::Number(1.0)));
    engine
        .expect_execute()
        .withf(|command| *command == EngineCommand::Init)
        .times(1)
        .returning(|_| Ok(EngineReply::confirmation("MPV initialized")));
    let session = mock_session(engine)?;

    session.initialize().await?;
    let err = session.load_media("/broken.mkv").await.unwrap_err();

    assert_eq!(err.to_string(), "load failed: Failed to load file: -13");
    let status = session.latest_status().expect("status after failure");
    assert_eq!(status.severity, Severity::Error);
    assert!(status.message.contains("Failed to load file: -13"));
    assert_eq!(session.state(), PlayerState::Initialized);
    assert!(session.snapshot().errored);
    Ok(())
}

#[tokio::test]
async fn test_out_of_bound_engine_speed_is_not_adopted() -> Result<()> {
    let mut engine = MockBackend::new();
    engine.expect_execute().returning(|command| match command {
        EngineCommand::Init => Ok(EngineReply::confirmation("MPV initialized")),
        EngineCommand::GetPlaybackSpeed => Ok(EngineReply::Number(16.0)),
        other => Err(EngineError::rejected(other.name(), "unexpected command")),
    });
    let session = mock_session(engine)?;

    // Initialization itself succeeds; only the reconciliation fails
    session.initialize().await?;

    assert_eq!(session.state(), PlayerState::Initialized);
    assert_eq!(session.speed().value(), 1.0);
    assert!(session.snapshot().errored);
    assert!(matches!(
        session.query_speed().await,
        Err(PlayerError::Engine(EngineError::UnexpectedReply { .. }))
    ));
    Ok(())
}

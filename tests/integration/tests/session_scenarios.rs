//! End-to-end session scenarios on the headless engine
//!
//! These tests verify the complete session behaviour including:
//! - Lifecycle transitions
//! - Speed reconciliation with the engine
//! - Render region holding and deduplication
//! - Ordering and timeouts of overlapping intents

use anyhow::Result;
use embedmpv::engine::EngineCommand;
use embedmpv::speed::{MAX_SPEED, MIN_SPEED};
use embedmpv::{
    EngineError, Intent, Playback, PlayerError, PlayerState, Presentation, RegionOutcome,
    RenderRegion, Severity,
};
use embedmpv_integration_tests::{headless_session, headless_session_with, loaded_session, short_timeout_config};
use std::time::Duration;

#[tokio::test]
async fn test_play_pause_stop_lifecycle() -> Result<()> {
    let (session, _) = headless_session()?;

    session.initialize().await?;
    session.load_media("/a.mp4").await?;
    assert_eq!(session.state(), PlayerState::Loaded(Playback::Paused));

    session.toggle_play_pause().await?;
    assert_eq!(session.state(), PlayerState::Loaded(Playback::Playing));

    session.toggle_play_pause().await?;
    assert_eq!(session.state(), PlayerState::Loaded(Playback::Paused));

    session.stop().await?;
    assert_eq!(session.state(), PlayerState::Stopped);

    Ok(())
}

#[tokio::test]
async fn test_loaded_intents_rejected_without_media() -> Result<()> {
    let (session, probe) = headless_session()?;

    assert!(session.toggle_play_pause().await.is_err());
    assert_eq!(probe.call_count(), 0);

    session.initialize().await?;
    let before = probe.call_count();
    let err = session.toggle_play_pause().await.unwrap_err();

    assert!(err.is_validation());
    assert_eq!(session.state(), PlayerState::Initialized);
    assert_eq!(probe.call_count(), before);

    Ok(())
}

#[tokio::test]
async fn test_reload_from_stopped() -> Result<()> {
    let (session, probe) = loaded_session("/a.mp4").await?;
    session.stop().await?;

    session.load_media("/b.mkv").await?;

    assert_eq!(session.state(), PlayerState::Loaded(Playback::Paused));
    assert_eq!(probe.media().as_deref(), Some("/b.mkv"));
    Ok(())
}

#[tokio::test]
async fn test_engine_speed_wins_over_preset() -> Result<()> {
    let (session, probe) = loaded_session("/a.mp4").await?;

    session.set_speed_preset(2.0).await?;
    assert_eq!(session.speed().value(), 2.0);

    probe.set_engine_speed(1.0);
    let speed = session.query_speed().await?;

    assert_eq!(speed.value(), 1.0);
    assert_eq!(session.speed().value(), 1.0);
    Ok(())
}

#[tokio::test]
async fn test_speed_bounds_through_session() -> Result<()> {
    let (session, probe) = loaded_session("/a.mp4").await?;

    for value in [0.09, 4.01, -1.0, f64::INFINITY] {
        let err = session.set_custom_speed(value).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(session.latest_status().map(|s| s.severity), Some(Severity::Warning));
    }
    assert_eq!(probe.count_of("set_playback_speed"), 0);

    assert_eq!(session.adjust_speed(50.0).await?.value(), MAX_SPEED);
    assert_eq!(session.adjust_speed(-50.0).await?.value(), MIN_SPEED);
    assert_eq!(session.reset_speed().await?.value(), 1.0);
    Ok(())
}

#[tokio::test]
async fn test_zero_area_region_withheld_then_dispatched() -> Result<()> {
    let (session, probe) = loaded_session("/a.mp4").await?;

    assert!(session
        .report_geometry(RenderRegion::new(0, 0, 0, 400))
        .await
        .is_err());
    assert_eq!(probe.count_of("setup_video_rendering"), 0);
    assert_eq!(session.snapshot().presentation, Presentation::AudioOnly);

    let region = RenderRegion::new(0, 0, 800, 400);
    assert_eq!(session.report_geometry(region).await?, RegionOutcome::Applied);
    assert_eq!(session.report_geometry(region).await?, RegionOutcome::Unchanged);

    assert_eq!(probe.count_of("setup_video_rendering"), 1);
    assert_eq!(session.snapshot().presentation, Presentation::Attached(region));
    Ok(())
}

#[tokio::test]
async fn test_region_survives_media_change() -> Result<()> {
    let (session, probe) = headless_session()?;
    let region = RenderRegion::new(0, 48, 1280, 672);

    session.report_geometry(region).await?;
    session.initialize().await?;
    session.load_media("/a.mp4").await?;
    session.load_media("/b.mp4").await?;

    // Re-applied after every load
    assert_eq!(probe.count_of("setup_video_rendering"), 2);
    assert_eq!(session.snapshot().presentation, Presentation::Attached(region));
    Ok(())
}

#[tokio::test]
async fn test_overlapping_intents_run_in_arrival_order() -> Result<()> {
    let (session, probe) = headless_session()?;
    probe.set_latency(Duration::from_millis(20));

    let (init, speed, region) = tokio::join!(
        session.initialize(),
        session.set_custom_speed(1.5),
        session.report_geometry(RenderRegion::new(0, 0, 640, 360)),
    );

    assert!(init.is_ok());
    assert!(speed.is_ok());
    assert_eq!(region?, RegionOutcome::Applied);

    let names: Vec<&str> = probe.calls().iter().map(EngineCommand::name).collect();
    assert_eq!(
        names,
        vec!["init", "get_playback_speed", "set_playback_speed", "setup_video_rendering"]
    );
    Ok(())
}

#[tokio::test]
async fn test_timed_out_command_still_runs_and_session_recovers() -> Result<()> {
    let (session, probe) = headless_session_with(short_timeout_config(Duration::from_millis(30)))?;
    probe.set_latency(Duration::from_millis(120));

    let err = session.initialize().await.unwrap_err();
    assert!(matches!(err, PlayerError::Engine(EngineError::Unresponsive { .. })));
    assert!(session.snapshot().errored);
    assert_eq!(session.latest_status().map(|s| s.severity), Some(Severity::Error));

    // The engine finished the timed-out init on its own
    probe.set_latency(Duration::ZERO);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(probe.count_of("init"), 1);

    // The session still sees itself uninitialized, so a retry is allowed
    assert_eq!(session.state(), PlayerState::Uninitialized);
    session.initialize().await?;
    assert_eq!(session.state(), PlayerState::Initialized);
    assert!(!session.snapshot().errored);
    assert_eq!(probe.count_of("init"), 2);
    Ok(())
}

#[tokio::test]
async fn test_dispatch_accepts_every_intent() -> Result<()> {
    let (session, _) = headless_session()?;

    for intent in [
        Intent::ReportGeometry(RenderRegion::new(0, 0, 800, 450)),
        Intent::Initialize,
        Intent::QuerySpeed,
        Intent::LoadMedia(embedmpv::MediaSource::new("/a.mp4")),
        Intent::TogglePlayPause,
        Intent::SetSpeedPreset(1.25),
        Intent::AdjustSpeed(0.25),
        Intent::SetCustomSpeed(3.0),
        Intent::ResetSpeed,
        Intent::Stop,
    ] {
        session.dispatch(intent).await?;
    }

    let snapshot = session.snapshot();
    assert_eq!(snapshot.state, PlayerState::Stopped);
    assert_eq!(snapshot.speed.value(), 1.0);
    assert!(!snapshot.errored);
    Ok(())
}

#[tokio::test]
async fn test_dead_engine_is_restarted_from_any_ready_state() -> Result<()> {
    let (session, probe) = loaded_session("/a.mp4").await?;

    probe.fail_next("play_pause", "mpv closed the IPC connection");
    assert!(session.toggle_play_pause().await.is_err());
    assert_eq!(session.state(), PlayerState::Loaded(Playback::Paused));

    session.initialize().await?;
    assert_eq!(session.state(), PlayerState::Initialized);

    session.load_media("/a.mp4").await?;
    assert_eq!(session.toggle_play_pause().await?, Playback::Playing);
    Ok(())
}

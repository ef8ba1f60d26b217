//! Configuration files feeding a session

use anyhow::Result;
use embedmpv::utils::config::{Config, EngineKind};
use embedmpv::{PlayerError, PlayerSessionController};
use embedmpv_integration_tests::ConfigFixture;
use std::time::Duration;

#[test]
fn test_partial_file_keeps_defaults() -> Result<()> {
    let fixture = ConfigFixture::new(
        r#"
[engine]
command_timeout_ms = 1500

[speed]
presets = [0.5, 1.0, 3.0]
"#,
    )?;

    let config = Config::load_from(&fixture.path)?;

    assert_eq!(config.engine.kind, EngineKind::Headless);
    assert_eq!(config.engine.command_timeout(), Duration::from_millis(1500));
    assert_eq!(config.speed.presets, vec![0.5, 1.0, 3.0]);
    assert_eq!(config.speed.step, 0.25);
    Ok(())
}

#[test]
fn test_invalid_presets_are_rejected() -> Result<()> {
    let fixture = ConfigFixture::new("[speed]\npresets = [2.0, 1.0]\n")?;

    let err = Config::load_from(&fixture.path).unwrap_err();

    assert!(matches!(err, PlayerError::Config(_)));
    Ok(())
}

#[test]
fn test_saved_config_round_trips() -> Result<()> {
    let fixture = ConfigFixture::new("")?;
    let mut config = Config::default();
    config.engine.kind = EngineKind::MpvIpc;
    config.engine.mpv.hwdec = "no".to_string();

    config.save_to(&fixture.path)?;
    let loaded = Config::load_from(&fixture.path)?;

    assert_eq!(loaded.engine.kind, EngineKind::MpvIpc);
    assert_eq!(loaded.engine.mpv.hwdec, "no");
    Ok(())
}

#[tokio::test]
async fn test_session_uses_configured_presets() -> Result<()> {
    let fixture = ConfigFixture::new("[speed]\npresets = [0.5, 1.0, 3.0]\n")?;
    let config = Config::load_from(&fixture.path)?;
    let session = PlayerSessionController::from_config(&config)?;

    session.initialize().await?;

    assert!(session.set_speed_preset(3.0).await.is_ok());
    assert!(session.set_speed_preset(2.0).await.is_err());
    assert_eq!(session.speed().value(), 3.0);
    Ok(())
}

#[test]
fn test_presets_with_three_decimals_are_rejected() -> Result<()> {
    let fixture = ConfigFixture::new("[speed]\npresets = [0.125, 1.0, 1.125]\n")?;

    let err = Config::load_from(&fixture.path).unwrap_err();

    assert!(err.to_string().contains("more than two decimals"));
    Ok(())
}

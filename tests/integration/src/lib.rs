//! Integration test utilities for embedmpv
//!
//! This module provides common utilities for integration testing including:
//! - Session fixtures on the headless engine
//! - A mockall engine for asserting what reaches the engine
//! - Temporary configuration files

use anyhow::Result;
use embedmpv::engine::{Engine, EngineCommand, EngineReply};
use embedmpv::utils::config::Config;
use embedmpv::utils::error::EngineError;
use embedmpv::{HeadlessEngine, HeadlessProbe, PlayerSessionController};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

// Engine whose every call is scripted by the test
mockall::mock! {
    pub Backend {}

    impl Engine for Backend {
        fn execute(&mut self, command: &EngineCommand) -> std::result::Result<EngineReply, EngineError>;
        fn shutdown(&mut self);
    }
}

/// Session on a fresh headless engine
pub fn headless_session() -> Result<(PlayerSessionController, HeadlessProbe)> {
    headless_session_with(Config::default())
}

/// Session on a fresh headless engine with custom configuration
pub fn headless_session_with(config: Config) -> Result<(PlayerSessionController, HeadlessProbe)> {
    let engine = HeadlessEngine::new();
    let probe = engine.probe();
    let session = PlayerSessionController::new(Box::new(engine), &config)?;
    Ok((session, probe))
}

/// Session driving a mock engine
pub fn mock_session(mut engine: MockBackend) -> Result<PlayerSessionController> {
    engine.expect_shutdown().return_const(());
    Ok(PlayerSessionController::new(Box::new(engine), &Config::default())?)
}

/// Initialized session with `path` loaded
pub async fn loaded_session(path: &str) -> Result<(PlayerSessionController, HeadlessProbe)> {
    let (session, probe) = headless_session()?;
    session.initialize().await?;
    session.load_media(path).await?;
    Ok((session, probe))
}

/// Configuration with a short command timeout
pub fn short_timeout_config(timeout: Duration) -> Config {
    let mut config = Config::default();
    config.engine.command_timeout_ms = timeout.as_millis() as u64;
    config
}

/// Temporary directory holding a configuration file
pub struct ConfigFixture {
    pub temp_dir: TempDir,
    pub path: PathBuf,
}

impl ConfigFixture {
    /// Write `contents` to `config.toml` in a fresh temp dir
    pub fn new(contents: &str) -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, contents)?;
        Ok(Self { temp_dir, path })
    }
}

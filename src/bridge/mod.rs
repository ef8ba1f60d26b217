//! Command bridge for embedmpv
//!
//! A single worker thread owns the engine and executes requests strictly in
//! the order they were issued. Callers get an async send-one/receive-one
//! call with an explicit timeout; the bridge never retries and never looks
//! inside a reply.

use crate::engine::{Engine, EngineCommand, EngineReply};
use crate::utils::error::{EngineError, PlayerError, Result};
use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

/// One queued command and the slot its outcome goes to
struct Request {
    sequence: u64,
    command: EngineCommand,
    reply: oneshot::Sender<std::result::Result<EngineReply, EngineError>>,
}

/// Async request/response channel to an engine
///
/// Clones share the same worker and queue.
#[derive(Clone)]
pub struct CommandBridge {
    tx: Sender<Request>,
    timeout: Duration,
    issued: Arc<AtomicU64>,
}

impl CommandBridge {
    /// Move `engine` onto a dedicated worker thread
    ///
    /// # Arguments
    ///
    /// * `engine` - Engine backend, owned by the worker from now on
    /// * `timeout` - How long a call waits before reporting the engine unresponsive
    ///
    /// # Returns
    ///
    /// Returns the bridge handle or an error if the thread cannot be spawned
    pub fn spawn(engine: Box<dyn Engine>, timeout: Duration) -> Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();

        thread::Builder::new()
            .name("engine-bridge".to_string())
            .spawn(move || run_worker(engine, rx))
            .map_err(|e| PlayerError::Internal(format!("Failed to spawn bridge worker: {}", e)))?;

        Ok(Self {
            tx,
            timeout,
            issued: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Send `command` and wait for its outcome
    ///
    /// # Returns
    ///
    /// The engine's reply; `EngineError::Unresponsive` when the timeout
    /// elapses first, `EngineError::Disconnected` when the worker is gone
    pub async fn call(&self, command: EngineCommand) -> std::result::Result<EngineReply, EngineError> {
        let name = command.name();
        let sequence = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let (reply_tx, reply_rx) = oneshot::channel();

        self.tx
            .send(Request {
                sequence,
                command,
                reply: reply_tx,
            })
            .map_err(|_| EngineError::Disconnected { command: name })?;

        match tokio::time::timeout(self.timeout, reply_rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(EngineError::Disconnected { command: name }),
            Err(_) => {
                warn!("#{} {} timed out after {:?}", sequence, name, self.timeout);
                Err(EngineError::Unresponsive {
                    command: name,
                    timeout: self.timeout,
                })
            }
        }
    }

    /// Number of commands issued through this bridge so far
    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }
}

/// Worker loop: runs until every bridge handle is dropped
fn run_worker(mut engine: Box<dyn Engine>, rx: Receiver<Request>) {
    debug!("Bridge worker started");

    for request in rx.iter() {
        let name = request.command.name();
        let started = Instant::now();

        // A dispatched command always runs, even if its caller gave up
        let outcome = engine.execute(&request.command);

        match &outcome {
            Ok(reply) => debug!(
                "#{} {} -> {} ({:?})",
                request.sequence,
                name,
                reply,
                started.elapsed()
            ),
            Err(e) => warn!("#{} {}", request.sequence, e),
        }

        if request.reply.send(outcome).is_err() {
            warn!(
                "#{} {} finished after its caller stopped waiting",
                request.sequence, name
            );
        }
    }

    engine.shutdown();
    info!("Bridge worker stopped, engine shut down");
}

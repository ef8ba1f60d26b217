//! mpv engine driven over the JSON IPC socket
//!
//! `init` spawns mpv idle and paused with video output disabled, then
//! connects to `--input-ipc-server`. Video output is switched on by
//! `setup_video_rendering` once the host surface has a real size.

use crate::engine::{Engine, EngineCommand, EngineReply};
use crate::utils::config::MpvConfig;
use crate::utils::error::{EngineError, IntoEngineError};
use log::{debug, info, warn};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

type EngineResult<T> = Result<T, EngineError>;

/// Events kept while waiting for replies; older ones are dropped
const MAX_BUFFERED_EVENTS: usize = 64;

/// Connected IPC socket
struct IpcConnection {
    reader: BufReader<UnixStream>,
    writer: UnixStream,

    /// Events read while waiting for a reply, oldest first
    events: VecDeque<Value>,
}

impl IpcConnection {
    fn new(stream: UnixStream, read_timeout: Duration) -> io::Result<Self> {
        stream.set_read_timeout(Some(read_timeout))?;
        Ok(Self {
            reader: BufReader::new(stream.try_clone()?),
            writer: stream,
            events: VecDeque::new(),
        })
    }

    /// Next JSON message, or `None` once mpv closed the socket
    fn read_message(&mut self) -> io::Result<Option<Value>> {
        loop {
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            match serde_json::from_str(&line) {
                Ok(msg) => return Ok(Some(msg)),
                Err(_) => debug!("Ignoring malformed IPC line: {}", line.trim_end()),
            }
        }
    }

    fn buffer_event(&mut self, event: Value) {
        if self.events.len() == MAX_BUFFERED_EVENTS {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// mpv child process plus its IPC connection
pub struct MpvIpcEngine {
    config: MpvConfig,
    socket_path: PathBuf,
    process: Option<Child>,
    connection: Option<IpcConnection>,
    request_id: u64,
}

impl MpvIpcEngine {
    /// Create an engine; no process is started until `init`
    pub fn new(config: MpvConfig) -> Self {
        let socket_path = config.socket_path();
        Self {
            config,
            socket_path,
            process: None,
            connection: None,
            request_id: 1,
        }
    }

    /// Spawn mpv and connect to its socket, reusing a live instance
    fn start(&mut self, command: &'static str) -> EngineResult<String> {
        if self.connection.is_some() {
            if self.is_responsive(command) {
                return Ok("mpv already running; playback reset".to_string());
            }
            warn!("mpv is gone or not answering, starting a new instance");
            self.terminate();
        }

        let _ = std::fs::remove_file(&self.socket_path);

        let mut cmd = Command::new(&self.config.binary);
        cmd.arg("--idle=yes")
            .arg(format!("--input-ipc-server={}", self.socket_path.display()))
            .arg("--vid=no") // no separate window before a render target exists
            .arg(format!("--hwdec={}", self.config.hwdec))
            .arg("--pause")
            .arg("--keep-open=yes")
            .arg("--force-window=no")
            .arg("--no-terminal");

        if let Some(wid) = self.config.parent_window {
            cmd.arg(format!("--wid={}", wid));
        }

        cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());

        info!("Spawning mpv: {:?}", self.config.binary);
        let process = cmd
            .spawn()
            .map_err(|e| EngineError::rejected(command, format!("Failed to start mpv: {}", e)))?;
        let pid = process.id();
        self.process = Some(process);

        let attached = match self.connect(command) {
            Ok(stream) => self.attach(command, stream),
            Err(err) => Err(err),
        };
        if let Err(err) = attached {
            self.terminate();
            return Err(err);
        }

        Ok(format!("mpv initialized for embedding (pid {})", pid))
    }

    /// Whether the running mpv is alive and answers; stops its playback
    fn is_responsive(&mut self, command: &'static str) -> bool {
        if let Some(process) = self.process.as_mut() {
            if !matches!(process.try_wait(), Ok(None)) {
                return false;
            }
        }
        self.request(command, json!(["stop"])).is_ok()
    }

    /// Poll for the IPC socket until the connect timeout expires
    fn connect(&mut self, command: &'static str) -> EngineResult<UnixStream> {
        let deadline = Instant::now() + self.config.connect_timeout();

        loop {
            if let Some(process) = self.process.as_mut() {
                if let Ok(Some(status)) = process.try_wait() {
                    return Err(EngineError::rejected(
                        command,
                        format!("mpv exited during startup ({})", status),
                    ));
                }
            }

            match UnixStream::connect(&self.socket_path) {
                Ok(stream) => return Ok(stream),
                Err(e) if Instant::now() >= deadline => {
                    return Err(EngineError::rejected(
                        command,
                        format!("Failed to connect to mpv IPC socket: {}", e),
                    ));
                }
                Err(_) => std::thread::sleep(Duration::from_millis(50)),
            }
        }
    }

    fn attach(&mut self, command: &'static str, stream: UnixStream) -> EngineResult<()> {
        let connection = IpcConnection::new(stream, self.config.connect_timeout()).rejected(command)?;
        self.connection = Some(connection);
        Ok(())
    }

    fn connection(&mut self, command: &'static str) -> EngineResult<&mut IpcConnection> {
        self.connection
            .as_mut()
            .ok_or_else(|| EngineError::rejected(command, "MPV not initialized"))
    }

    /// Send one IPC request and wait for the reply carrying its request id
    fn request(&mut self, command: &'static str, args: Value) -> EngineResult<Value> {
        let request_id = self.request_id;
        self.request_id += 1;

        let conn = self.connection(command)?;

        let payload = json!({ "command": args, "request_id": request_id });
        debug!("mpv <- {}", payload);
        writeln!(conn.writer, "{}", payload).rejected(command)?;
        conn.writer.flush().rejected(command)?;

        loop {
            let msg = conn
                .read_message()
                .rejected(command)?
                .ok_or_else(|| EngineError::rejected(command, "mpv closed the IPC connection"))?;

            // Events are interleaved with replies
            if msg.get("event").is_some() {
                conn.buffer_event(msg);
                continue;
            }
            if msg["request_id"].as_u64() != Some(request_id) {
                debug!("Skipping stale mpv reply: {}", msg);
                continue;
            }

            debug!("mpv -> {}", msg);
            return match msg["error"].as_str() {
                Some("success") => Ok(msg["data"].clone()),
                Some(error) => Err(EngineError::rejected(command, error.to_string())),
                None => Err(EngineError::UnexpectedReply {
                    command,
                    reply: msg.to_string(),
                }),
            };
        }
    }

    /// Wait until mpv has opened the file queued by `loadfile`
    ///
    /// `loadfile` is acknowledged before the file is opened; the outcome
    /// arrives later as `file-loaded` or `end-file` after a `start-file`.
    fn await_file_loaded(&mut self, command: &'static str) -> EngineResult<()> {
        let conn = self.connection(command)?;
        let mut started = false;

        loop {
            let event = match conn.events.pop_front() {
                Some(event) => event,
                None => match conn.read_message() {
                    Ok(Some(msg)) => msg,
                    Ok(None) => {
                        return Err(EngineError::rejected(command, "mpv closed the IPC connection"))
                    }
                    Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                        return Err(EngineError::rejected(
                            command,
                            "Timed out waiting for mpv to open the file",
                        ))
                    }
                    Err(e) => return Err(EngineError::rejected(command, e.to_string())),
                },
            };

            match event["event"].as_str() {
                Some("start-file") => started = true,
                Some("file-loaded") if started => return Ok(()),
                Some("end-file") if started => {
                    let detail = event["file_error"]
                        .as_str()
                        .or_else(|| event["reason"].as_str())
                        .unwrap_or("unknown error");
                    return Err(EngineError::rejected(
                        command,
                        format!("Failed to load file: {}", detail),
                    ));
                }
                _ => {}
            }
        }
    }

    fn terminate(&mut self) {
        self.connection = None;
        if let Some(mut process) = self.process.take() {
            let _ = process.kill();
            let _ = process.wait();
        }
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

impl Engine for MpvIpcEngine {
    fn execute(&mut self, command: &EngineCommand) -> EngineResult<EngineReply> {
        let name = command.name();

        match command {
            EngineCommand::Init => {
                let message = self.start(name)?;
                Ok(EngineReply::Confirmation(message))
            }

            EngineCommand::Load { file_path } => {
                self.request(name, json!(["set_property", "pause", true]))?;
                // Only events from this load count
                self.connection(name)?.events.clear();
                self.request(name, json!(["loadfile", file_path]))?;
                self.await_file_loaded(name)?;
                Ok(EngineReply::Confirmation(format!("Loading video: {}", file_path)))
            }

            EngineCommand::PlayPause => {
                self.request(name, json!(["get_property", "path"]))
                    .map_err(|_| EngineError::rejected(name, "No media loaded"))?;
                self.request(name, json!(["cycle", "pause"]))?;
                let paused = self.request(name, json!(["get_property", "pause"]))?;
                let label = match paused.as_bool() {
                    Some(true) => "Paused",
                    Some(false) => "Playing",
                    None => {
                        return Err(EngineError::UnexpectedReply {
                            command: name,
                            reply: paused.to_string(),
                        })
                    }
                };
                Ok(EngineReply::confirmation(label))
            }

            EngineCommand::Stop => {
                self.request(name, json!(["stop"]))?;
                Ok(EngineReply::confirmation("Stopped"))
            }

            EngineCommand::SpeedPreset { speed } | EngineCommand::SetPlaybackSpeed { speed } => {
                self.request(name, json!(["set_property", "speed", speed]))?;
                Ok(EngineReply::Confirmation(format!("Speed set to {:.2}x", speed)))
            }

            EngineCommand::GetPlaybackSpeed => {
                let data = self.request(name, json!(["get_property", "speed"]))?;
                data.as_f64()
                    .map(EngineReply::Number)
                    .ok_or_else(|| EngineError::UnexpectedReply {
                        command: name,
                        reply: data.to_string(),
                    })
            }

            EngineCommand::SetupVideoRendering { video_area } => {
                if !video_area.has_area() {
                    return Err(EngineError::rejected(name, "Invalid video area"));
                }
                self.request(name, json!(["set_property", "vid", "auto"]))?;
                // With --wid mpv fills the host view; otherwise place its own window
                if self.config.parent_window.is_none() {
                    self.request(name, json!(["set_property", "geometry", video_area.to_string()]))?;
                }
                Ok(EngineReply::Confirmation(format!(
                    "Video will render in app at {}x{}",
                    video_area.width, video_area.height
                )))
            }
        }
    }

    fn shutdown(&mut self) {
        if self.connection.is_some() {
            if let Err(e) = self.request("quit", json!(["quit"])) {
                warn!("mpv did not acknowledge quit: {}", e);
            }
        }
        self.terminate();
    }
}

impl Drop for MpvIpcEngine {
    fn drop(&mut self) {
        self.terminate();
    }
}

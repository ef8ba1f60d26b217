//! Line console for the embedmpv binary
//!
//! Turns one line of user input into a session intent or a console action.

use embedmpv::{Intent, MediaSource, RenderRegion};
use std::fmt;

/// What a console line asks for
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Intent(Intent),
    Status,
    Presets,
    Help,
    Quit,
}

/// Input that could not be understood
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError(String);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ParseError {}

pub const HELP: &str = "\
Commands:
  init                    start the engine
  load <path>             load a media file (paused)
  toggle                  play/pause
  stop                    stop playback
  preset <speed>          apply a speed preset
  speed <speed>           set a custom speed (0.1 - 4.0)
  adjust <delta>          change speed by delta
  faster | slower         change speed by the configured step
  reset                   back to 1.00x
  query                   read the engine's speed
  region <x> <y> <w> <h>  report the video surface geometry
  status                  show the session snapshot
  presets                 list speed presets
  help                    this text
  quit                    exit";

/// Parse a console line
///
/// # Arguments
///
/// * `line` - Raw input line
/// * `step` - Speed step used by `faster`/`slower`
///
/// # Returns
///
/// `Ok(None)` for blank lines
pub fn parse(line: &str, step: f64) -> Result<Option<Command>, ParseError> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "" => return Ok(None),
        "init" => Command::Intent(Intent::Initialize),
        // Paths may contain spaces; an empty one is left for the session to reject
        "load" | "open" => Command::Intent(Intent::LoadMedia(MediaSource::new(rest))),
        "toggle" | "play" | "pause" => Command::Intent(Intent::TogglePlayPause),
        "stop" => Command::Intent(Intent::Stop),
        "preset" => Command::Intent(Intent::SetSpeedPreset(number(word, rest)?)),
        "speed" => Command::Intent(Intent::SetCustomSpeed(number(word, rest)?)),
        "adjust" => Command::Intent(Intent::AdjustSpeed(number(word, rest)?)),
        "faster" => Command::Intent(Intent::AdjustSpeed(step)),
        "slower" => Command::Intent(Intent::AdjustSpeed(-step)),
        "reset" => Command::Intent(Intent::ResetSpeed),
        "query" => Command::Intent(Intent::QuerySpeed),
        "region" => Command::Intent(Intent::ReportGeometry(region(rest)?)),
        "status" => Command::Status,
        "presets" => Command::Presets,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(ParseError(format!("Unknown command '{}', try 'help'", other))),
    };

    Ok(Some(command))
}

fn number(word: &str, arg: &str) -> Result<f64, ParseError> {
    arg.parse::<f64>()
        .map_err(|_| ParseError(format!("'{}' needs a number, got '{}'", word, arg)))
}

fn region(args: &str) -> Result<RenderRegion, ParseError> {
    let parts = args
        .split_whitespace()
        .map(str::parse::<i32>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ParseError(format!("Bad region: {}", e)))?;

    match parts.as_slice() {
        [x, y, width, height] => Ok(RenderRegion::new(*x, *y, *width, *height)),
        _ => Err(ParseError("'region' needs <x> <y> <w> <h>".to_string())),
    }
}

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use crate::wm_ipc::SocketSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WindowManager {
    /// i3 (discovers the socket with `i3 --get-socketpath`)
    I3,
    /// Sway (discovers the socket with `sway --get-socketpath`)
    Sway,
}

impl WindowManager {
    /// Binary asked for the IPC socket path
    pub fn binary(self) -> &'static str {
        match self {
            WindowManager::I3 => "i3",
            WindowManager::Sway => "sway",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run as daemon (default if no command specified)
    Daemon,
    /// Switch to the previously focused window
    Switch,
    /// Move forward in the focus history
    Next,
    /// Move back in the focus history
    Prev,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "focus-last")]
#[command(about = "Switch back to recently focused windows in i3 and Sway", long_about = None)]
pub struct Config {
    /// Maximum number of windows kept in the focus history
    #[arg(long, default_value_t = 80, value_parser = clap::value_parser!(u32).range(1..))]
    pub history_size: u32,

    /// How long a window must keep focus before it is recorded (e.g. 800ms, 1s; 0 disables)
    #[arg(long, default_value = "800ms", value_parser = parse_duration)]
    pub permanence: Duration,

    /// Keep each window only once in the history
    #[arg(long)]
    pub unique: bool,

    /// Do not record focus changes to floating windows
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub ignore_floating: bool,

    /// Window manager to talk to
    #[arg(long, value_enum, default_value = "i3")]
    pub wm: WindowManager,

    /// IPC socket path (skips asking the window manager for it)
    #[arg(long)]
    pub socket_path: Option<PathBuf>,

    /// How long a focus switch waits for a window manager connection
    #[arg(long, default_value = "3s", value_parser = parse_duration)]
    pub connect_timeout: Duration,

    /// How long the event subscription keeps trying to reconnect before giving up
    #[arg(long, default_value = "10s", value_parser = parse_duration)]
    pub reconnect_timeout: Duration,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Config {
    pub fn parse() -> Self {
        <Config as Parser>::parse()
    }

    /// Get the command, defaulting to Daemon if none specified
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Daemon)
    }

    pub fn socket_source(&self) -> SocketSource {
        SocketSource {
            window_manager: self.wm,
            path_override: self.socket_path.clone(),
        }
    }

    pub fn history_capacity(&self) -> usize {
        self.history_size as usize
    }
}

/// Parse `250ms`, `1s`, `2m` or a bare `0`
fn parse_duration(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    if raw == "0" {
        return Ok(Duration::ZERO);
    }

    let (number, unit) = raw
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .map(|split| raw.split_at(split))
        .ok_or_else(|| format!("missing unit in duration `{raw}` (use ms, s or m)"))?;
    let value: f64 = number
        .parse()
        .map_err(|_| format!("invalid number in duration `{raw}`"))?;

    let millis = match unit {
        "ms" => value,
        "s" => value * 1_000.0,
        "m" => value * 60_000.0,
        other => return Err(format!("unknown duration unit `{other}` (use ms, s or m)")),
    };
    Ok(Duration::from_nanos((millis * 1_000_000.0).round() as u64))
}

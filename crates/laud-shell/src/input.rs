//! Line commands typed into the headless shell.

use laud_proto::playback::{PlaybackCommand, SkipDirection};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// Raw page name, handed to the navigation signal as-is.
    Go(String),
    Tab(usize),
    Back,
    Playback(PlaybackCommand),
    Login(String),
    Offline(bool),
    ListenAlong(bool),
    ForcedPause(bool),
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("{command}: missing argument")]
    MissingArgument { command: &'static str },
    #[error("{command}: invalid argument {value:?}")]
    InvalidArgument { command: &'static str, value: String },
}

pub const HELP: &str = "\
commands:
  go <Home|Login|Playlist|Playing|Playlists>
  tab <0-3>            back
  play | fav | next | prev | repeat | shuffle
  seek <seconds>       login <user>
  offline on|off       along on|off       forced on|off
  status | help | quit";

pub fn parse(line: &str) -> Result<ShellCommand, ParseCommandError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err(ParseCommandError::Empty);
    };
    let arg = words.next();

    let cmd = match head {
        "go" => ShellCommand::Go(required("go", arg)?.to_string()),
        "tab" => ShellCommand::Tab(number("tab", arg)?),
        "back" => ShellCommand::Back,
        "play" | "pause" => ShellCommand::Playback(PlaybackCommand::TogglePlayback),
        "fav" => ShellCommand::Playback(PlaybackCommand::ToggleFavorite),
        "next" => ShellCommand::Playback(PlaybackCommand::Skip {
            direction: SkipDirection::Next,
        }),
        "prev" => ShellCommand::Playback(PlaybackCommand::Skip {
            direction: SkipDirection::Previous,
        }),
        "repeat" => ShellCommand::Playback(PlaybackCommand::CycleRepeat),
        "shuffle" => ShellCommand::Playback(PlaybackCommand::Shuffle),
        "seek" => {
            let secs: u64 = number("seek", arg)?;
            ShellCommand::Playback(PlaybackCommand::Seek {
                position_ms: secs.saturating_mul(1000),
            })
        }
        "login" => ShellCommand::Login(required("login", arg)?.to_string()),
        "offline" => ShellCommand::Offline(switch("offline", arg)?),
        "along" => ShellCommand::ListenAlong(switch("along", arg)?),
        "forced" => ShellCommand::ForcedPause(switch("forced", arg)?),
        "status" => ShellCommand::Status,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        other => return Err(ParseCommandError::Unknown(other.to_string())),
    };
    Ok(cmd)
}

fn required<'a>(command: &'static str, arg: Option<&'a str>) -> Result<&'a str, ParseCommandError> {
    arg.ok_or(ParseCommandError::MissingArgument { command })
}

fn number<T: std::str::FromStr>(
    command: &'static str,
    arg: Option<&str>,
) -> Result<T, ParseCommandError> {
    let value = required(command, arg)?;
    value
        .parse()
        .map_err(|_| ParseCommandError::InvalidArgument {
            command,
            value: value.to_string(),
        })
}

fn switch(command: &'static str, arg: Option<&str>) -> Result<bool, ParseCommandError> {
    match required(command, arg)? {
        "on" => Ok(true),
        "off" => Ok(false),
        value => Err(ParseCommandError::InvalidArgument {
            command,
            value: value.to_string(),
        }),
    }
}

//! The USI text protocol: what we send and the line shapes we look for.
//!
//! One command per line, one line per write. Incoming lines are matched by
//! the [`classifier`](crate::classifier).

use std::fmt;

pub const ID_NAME_PREFIX: &str = "id name ";
pub const ID_AUTHOR_PREFIX: &str = "id author ";
pub const ENGINE_NAME_OPTION_PREFIX: &str = "option name Engine_Name";
pub const USI_OK: &str = "usiok";
pub const READY_OK: &str = "readyok";
pub const BESTMOVE_PREFIX: &str = "bestmove ";

/// A command written to the engine's stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Starts the handshake. Answered by `id ...` lines and `usiok`.
    Usi,
    /// Answered by `readyok` once the engine has loaded everything.
    IsReady,
    UsiNewGame,
    /// `position sfen <base> [moves m1 m2 ...]`
    Position { base: String, moves: Vec<String> },
    /// `go byoyomi <secs>`, answered by `bestmove ...`.
    Go { byoyomi_secs: u64 },
    Stop,
    Quit,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Usi => write!(f, "usi"),
            Command::IsReady => write!(f, "isready"),
            Command::UsiNewGame => write!(f, "usinewgame"),
            Command::Position { base, moves } => {
                write!(f, "position sfen {base}")?;
                if !moves.is_empty() {
                    write!(f, " moves {}", moves.join(" "))?;
                }
                Ok(())
            }
            Command::Go { byoyomi_secs } => write!(f, "go byoyomi {byoyomi_secs}"),
            Command::Stop => write!(f, "stop"),
            Command::Quit => write!(f, "quit"),
        }
    }
}

/// Whole seconds of byoyomi for a time limit in milliseconds. Floored, never
/// below one.
pub fn byoyomi_secs(time_limit_ms: u64) -> u64 {
    (time_limit_ms / 1000).max(1)
}

//! Turns engine output lines into state changes.
//!
//! [`classify`] is pure; [`Classifier`] applies the result to the shared
//! status and the result channel. Lines that match nothing are logged and
//! published on the event bus, never treated as errors.

use std::sync::Arc;
use tracing::{debug, info};

use crate::events::{Event, EventBus};
use crate::protocol::{
    BESTMOVE_PREFIX, ENGINE_NAME_OPTION_PREFIX, ID_AUTHOR_PREFIX, ID_NAME_PREFIX, READY_OK, USI_OK,
};
use crate::result::ResultSender;
use crate::status::StatusCell;

/// What a single (already trimmed) line means to the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineLine<'a> {
    IdName(&'a str),
    IdAuthor(&'a str),
    /// `option name Engine_Name type string default <name>`, used by some
    /// engines instead of `id name`.
    EngineNameOption(&'a str),
    UsiOk,
    ReadyOk,
    BestMove(&'a str),
    Other(&'a str),
}

/// Match a line against the protocol shapes, first match wins.
pub fn classify(line: &str) -> EngineLine<'_> {
    if let Some(name) = line.strip_prefix(ID_NAME_PREFIX) {
        return EngineLine::IdName(name);
    }
    if let Some(author) = line.strip_prefix(ID_AUTHOR_PREFIX) {
        return EngineLine::IdAuthor(author);
    }
    if let Some(rest) = line.strip_prefix(ENGINE_NAME_OPTION_PREFIX)
        && let Some(name) = engine_name_default(rest)
    {
        return EngineLine::EngineNameOption(name);
    }
    if line == USI_OK {
        return EngineLine::UsiOk;
    }
    if line == READY_OK {
        return EngineLine::ReadyOk;
    }
    if let Some(rest) = line.strip_prefix(BESTMOVE_PREFIX)
        && let Some(bestmove) = rest.split_whitespace().next()
    {
        return EngineLine::BestMove(bestmove);
    }
    EngineLine::Other(line)
}

fn engine_name_default(rest: &str) -> Option<&str> {
    let rest = rest.strip_prefix(char::is_whitespace)?.trim_start();
    let rest = rest.strip_prefix("type")?.trim_start();
    let rest = rest.strip_prefix("string")?.trim_start();
    let name = rest.strip_prefix("default")?.trim();
    (!name.is_empty()).then_some(name)
}

/// Applies classified lines for one engine process.
#[derive(Debug, Clone)]
pub struct Classifier {
    generation: u64,
    status: StatusCell,
    results: ResultSender,
    events: Arc<EventBus>,
}

impl Classifier {
    pub fn new(
        generation: u64,
        status: StatusCell,
        results: ResultSender,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            generation,
            status,
            results,
            events,
        }
    }

    pub fn handle(&self, line: &str) {
        debug!(generation = self.generation, "← {line}");
        self.events.emit(Event::LineReceived {
            line: line.to_string(),
        });

        match classify(line) {
            EngineLine::IdName(name) => self.status.update(|s| s.identity.name = name.to_string()),
            EngineLine::IdAuthor(author) => {
                self.status.update(|s| s.identity.author = author.to_string())
            }
            EngineLine::EngineNameOption(name) => self.status.update(|s| {
                if s.identity.name.is_empty() {
                    s.identity.name = name.to_string();
                }
            }),
            EngineLine::UsiOk => self.status.update(|s| s.ready = true),
            EngineLine::ReadyOk => self.status.update(|s| s.synced = true),
            EngineLine::BestMove(bestmove) => {
                self.results.push(bestmove.to_string());
            }
            EngineLine::Other(_) => {}
        }
    }

    /// The engine's stdout is gone; treat the process as dead.
    pub fn stream_closed(&self) {
        if self.status.mark_exited(self.generation) {
            info!(generation = self.generation, "engine output closed, state reset");
        }
        self.events.emit(Event::EngineExited {
            generation: self.generation,
        });
    }
}

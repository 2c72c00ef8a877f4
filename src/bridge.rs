//! The bridge: caller-facing operations over one engine process.
//!
//! ```text
//! Disconnected --connect--> Handshaking --handshake--> Ready <--search--> Thinking
//!      ^                                                 |
//!      +------------- quit / engine exit ----------------+
//! ```
//!
//! Every operation is safe to call from several tasks at once. Handshake,
//! new game and search wait on the shared status or the result channel with
//! a deadline and never hold a lock on shared state while they wait.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::consts::{
    DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_SEARCH_MARGIN, DEFAULT_SHUTDOWN_GRACE, RESULT_QUEUE_CAPACITY,
    WRITE_TIMEOUT,
};
use crate::error::{BridgeError, Operation, Result};
use crate::events::{Event, EventBus};
use crate::process::Launcher;
use crate::protocol::{Command, byoyomi_secs};
use crate::result::{PendingSearch, ResultChannel};
use crate::status::{EngineIdentity, EngineStatus, Phase, PositionState, StatusCell};
use crate::supervisor::Supervisor;
use crate::writer::CommandWriter;

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Deadline for `usiok` after `usi`, and for `readyok` after `isready`.
    pub handshake_timeout: Duration,
    /// Added to the caller's time limit when waiting for `bestmove`.
    pub search_margin: Duration,
    /// How long a quitting engine gets before it is killed.
    pub shutdown_grace: Duration,
    /// Send `stop` when a search times out.
    pub stop_on_timeout: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            search_margin: DEFAULT_SEARCH_MARGIN,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            stop_on_timeout: false,
        }
    }
}

/// Snapshot for health checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub engine_running: bool,
    pub engine_ready: bool,
    pub engine_name: String,
    pub engine_author: String,
    pub phase: Phase,
    pub pid: Option<u32>,
}

impl From<&EngineStatus> for Health {
    fn from(s: &EngineStatus) -> Self {
        Self {
            engine_running: s.running,
            engine_ready: s.ready,
            engine_name: s.identity.name.clone(),
            engine_author: s.identity.author.clone(),
            phase: s.phase(),
            pid: s.pid,
        }
    }
}

/// A completed search. `position` is whatever was last set, echoed for
/// convenience and not checked against what the engine searched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub bestmove: String,
    pub position: Option<PositionState>,
}

pub struct Bridge {
    supervisor: Supervisor,
    writer: Arc<CommandWriter>,
    status: StatusCell,
    results: ResultChannel,
    events: Arc<EventBus>,
    config: BridgeConfig,
}

impl Bridge {
    pub fn new(launcher: Arc<dyn Launcher>, config: BridgeConfig) -> Self {
        let events = Arc::new(EventBus::default());
        let status = StatusCell::new();
        let results = ResultChannel::new(RESULT_QUEUE_CAPACITY);
        let writer = Arc::new(CommandWriter::new(Arc::clone(&events), WRITE_TIMEOUT));
        let supervisor = Supervisor::new(
            launcher,
            Arc::clone(&writer),
            status.clone(),
            results.sender(),
            Arc::clone(&events),
            config.shutdown_grace,
        );
        Self {
            supervisor,
            writer,
            status,
            results,
            events,
            config,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Protocol traffic and exits, for loggers and UIs.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Start the engine unless one is already running. Sends nothing.
    pub async fn connect(&self, path: impl AsRef<Path>) -> Result<()> {
        if self.supervisor.is_running() {
            debug!("connect: engine already running");
            return Ok(());
        }
        match self.supervisor.start(path.as_ref()).await {
            Err(BridgeError::AlreadyRunning) => Ok(()),
            other => other,
        }
    }

    /// Run the `usi` / `usiok` exchange and return the engine's identity.
    /// Returns immediately, without sending anything, once ready.
    pub async fn handshake(&self) -> Result<EngineIdentity> {
        let status = self.status.snapshot();
        if !status.running {
            return Err(BridgeError::NotRunning);
        }
        if status.ready {
            return Ok(status.identity);
        }

        self.writer.send(&Command::Usi).await?;
        let deadline = self.config.handshake_timeout;
        match self
            .status
            .wait_until(deadline, |s| s.ready || !s.running)
            .await
        {
            Some(s) if s.ready => {
                info!(name = %s.identity.name, author = %s.identity.author, "handshake complete");
                Ok(s.identity)
            }
            Some(_) => Err(BridgeError::NotRunning),
            None => {
                warn!(after_ms = deadline.as_millis() as u64, "no usiok from engine");
                Err(BridgeError::Timeout {
                    operation: Operation::Handshake,
                    after: deadline,
                })
            }
        }
    }

    /// `isready`, wait for `readyok`, then `usinewgame`.
    pub async fn new_game(&self) -> Result<()> {
        self.require_ready()?;
        self.status.update(|s| s.synced = false);
        self.writer.send(&Command::IsReady).await?;

        let deadline = self.config.handshake_timeout;
        match self
            .status
            .wait_until(deadline, |s| s.synced || !s.running)
            .await
        {
            Some(s) if s.running => {}
            Some(_) => return Err(BridgeError::NotRunning),
            None => {
                return Err(BridgeError::Timeout {
                    operation: Operation::NewGame,
                    after: deadline,
                });
            }
        }

        self.writer.send(&Command::UsiNewGame).await
    }

    /// Send `position sfen <base> [moves ...]` and remember it. The engine
    /// does not acknowledge this command; a successful write is the only
    /// confirmation.
    pub async fn set_position(&self, base: &str, moves: &[String]) -> Result<PositionState> {
        self.require_ready()?;
        validate_position(base, moves)?;

        let position = PositionState {
            base_encoding: base.to_string(),
            moves: moves.to_vec(),
        };
        self.writer
            .send(&Command::Position {
                base: position.base_encoding.clone(),
                moves: position.moves.clone(),
            })
            .await?;
        self.status.update(|s| s.position = Some(position.clone()));
        Ok(position)
    }

    /// Search for up to `time_limit_ms` and return the engine's best move.
    ///
    /// Only one search may be pending; a concurrent call fails with
    /// [`BridgeError::SearchInProgress`]. On timeout the engine is left
    /// running and its late answer is discarded by the next search.
    pub async fn search(&self, time_limit_ms: u64) -> Result<SearchOutcome> {
        self.require_ready()?;
        let mut pending = self
            .results
            .try_claim()
            .ok_or(BridgeError::SearchInProgress)?;

        let stale = pending.drain();
        if stale > 0 {
            debug!(stale, "discarded stale bestmove");
        }

        let _thinking = Thinking::begin(&self.status);
        self.await_bestmove(&mut pending, time_limit_ms).await
    }

    async fn await_bestmove(
        &self,
        pending: &mut PendingSearch<'_>,
        time_limit_ms: u64,
    ) -> Result<SearchOutcome> {
        self.writer
            .send(&Command::Go {
                byoyomi_secs: byoyomi_secs(time_limit_ms),
            })
            .await?;

        let deadline = Duration::from_millis(time_limit_ms) + self.config.search_margin;
        let mut status = self.status.subscribe();
        let arrival = tokio::time::timeout(deadline, async {
            tokio::select! {
                biased;
                bestmove = pending.recv() => bestmove,
                _ = status.wait_for(|s| !s.running) => None,
            }
        })
        .await;

        match arrival {
            Ok(Some(bestmove)) => {
                info!(%bestmove, "search complete");
                Ok(SearchOutcome {
                    bestmove,
                    position: self.status.snapshot().position,
                })
            }
            Ok(None) => {
                warn!("engine exited during search");
                Err(BridgeError::NotRunning)
            }
            Err(_) => {
                warn!(after_ms = deadline.as_millis() as u64, "no bestmove from engine");
                if self.config.stop_on_timeout
                    && let Err(e) = self.writer.send(&Command::Stop).await
                {
                    debug!(error = %e, "stop not delivered");
                }
                Err(BridgeError::Timeout {
                    operation: Operation::Search,
                    after: deadline,
                })
            }
        }
    }

    /// Stop the engine and reset to disconnected. Safe to call repeatedly.
    pub async fn quit(&self) {
        self.supervisor.stop().await;
        info!("bridge disconnected");
    }

    /// Current state. Never blocks and never talks to the engine.
    pub fn health(&self) -> Health {
        Health::from(&self.status.snapshot())
    }

    pub fn phase(&self) -> Phase {
        self.status.snapshot().phase()
    }

    fn require_ready(&self) -> Result<()> {
        let s = self.status.snapshot();
        if s.running && s.ready {
            Ok(())
        } else {
            Err(BridgeError::NotReady)
        }
    }
}

fn validate_position(base: &str, moves: &[String]) -> Result<()> {
    if base.trim().is_empty() {
        return Err(BridgeError::InvalidArgument(
            "base encoding must not be empty".into(),
        ));
    }
    let breaks_line = |s: &str| s.contains(['\n', '\r']);
    if breaks_line(base) || moves.iter().any(|m| breaks_line(m.as_str())) {
        return Err(BridgeError::InvalidArgument(
            "position must not contain line breaks".into(),
        ));
    }
    if moves.iter().any(|m| m.trim().is_empty()) {
        return Err(BridgeError::InvalidArgument("empty move token".into()));
    }
    Ok(())
}

/// Marks the status as thinking until dropped, including when the search
/// future is cancelled by the caller.
struct Thinking<'a> {
    status: &'a StatusCell,
}

impl<'a> Thinking<'a> {
    fn begin(status: &'a StatusCell) -> Self {
        status.update(|s| s.thinking = true);
        Self { status }
    }
}

impl Drop for Thinking<'_> {
    fn drop(&mut self) {
        self.status.update(|s| s.thinking = false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_from_status() {
        let status = EngineStatus {
            running: true,
            ready: true,
            pid: Some(12),
            identity: EngineIdentity {
                name: "Foo".into(),
                author: "Bar".into(),
            },
            ..EngineStatus::default()
        };
        let health = Health::from(&status);
        assert!(health.engine_running);
        assert!(health.engine_ready);
        assert_eq!(health.engine_name, "Foo");
        assert_eq!(health.phase, Phase::Ready);
    }

    #[test]
    fn health_serializes_camel_case() {
        let health = Health::from(&EngineStatus::default());
        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["engineRunning"], false);
        assert_eq!(json["engineReady"], false);
        assert_eq!(json["engineName"], "");
        assert_eq!(json["phase"], "disconnected");
    }

    #[test]
    fn position_validation() {
        assert!(validate_position("startpos", &[]).is_ok());
        assert!(validate_position("startpos", &["7g7f".into()]).is_ok());
        assert!(matches!(
            validate_position("  ", &[]),
            Err(BridgeError::InvalidArgument(_))
        ));
        assert!(matches!(
            validate_position("startpos\nquit", &[]),
            Err(BridgeError::InvalidArgument(_))
        ));
        assert!(matches!(
            validate_position("startpos", &["7g7f\r".into()]),
            Err(BridgeError::InvalidArgument(_))
        ));
        assert!(matches!(
            validate_position("startpos", &["".into()]),
            Err(BridgeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn thinking_guard_clears_on_drop() {
        let status = StatusCell::new();
        status.begin(None);
        status.update(|s| s.ready = true);
        {
            let _thinking = Thinking::begin(&status);
            assert_eq!(status.snapshot().phase(), Phase::Thinking);
        }
        assert_eq!(status.snapshot().phase(), Phase::Ready);
    }

    #[test]
    fn search_outcome_serializes_position() {
        let outcome = SearchOutcome {
            bestmove: "2g2f".into(),
            position: Some(PositionState {
                base_encoding: "startpos".into(),
                moves: vec!["7g7f".into()],
            }),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["bestmove"], "2g2f");
        assert_eq!(json["position"]["baseEncoding"], "startpos");
    }
}

//! Shared engine status: identity, readiness, position and phase.
//!
//! Lives in a [`tokio::sync::watch`] cell. Writers update it under the
//! channel's internal lock for the length of a closure; waiters subscribe and
//! sleep until a predicate holds, so nobody holds a lock while waiting on the
//! engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Who the engine says it is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineIdentity {
    pub name: String,
    pub author: String,
}

/// The last position successfully sent to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionState {
    pub base_encoding: String,
    pub moves: Vec<String>,
}

/// Where the bridge is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Disconnected,
    Handshaking,
    Ready,
    Thinking,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Disconnected => "disconnected",
            Phase::Handshaking => "handshaking",
            Phase::Ready => "ready",
            Phase::Thinking => "thinking",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EngineStatus {
    /// A process is held and its stdout has not closed.
    pub running: bool,
    /// `usiok` seen for the current process.
    pub ready: bool,
    /// `readyok` seen since the last `isready`.
    pub synced: bool,
    /// A search is pending.
    pub thinking: bool,
    /// Bumped on every spawn so a dead process's reader cannot reset its
    /// successor.
    pub generation: u64,
    pub pid: Option<u32>,
    pub identity: EngineIdentity,
    pub position: Option<PositionState>,
}

impl EngineStatus {
    pub fn phase(&self) -> Phase {
        if !self.running {
            Phase::Disconnected
        } else if !self.ready {
            Phase::Handshaking
        } else if self.thinking {
            Phase::Thinking
        } else {
            Phase::Ready
        }
    }

    fn clear(&mut self) {
        self.running = false;
        self.ready = false;
        self.synced = false;
        self.thinking = false;
        self.pid = None;
        self.identity = EngineIdentity::default();
        self.position = None;
    }
}

/// Cheaply cloneable handle to the shared [`EngineStatus`].
#[derive(Debug, Clone)]
pub struct StatusCell {
    tx: Arc<watch::Sender<EngineStatus>>,
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusCell {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(EngineStatus::default());
        Self { tx: Arc::new(tx) }
    }

    /// Copy of the current status. Never blocks on the engine.
    pub fn snapshot(&self) -> EngineStatus {
        self.tx.borrow().clone()
    }

    pub fn update(&self, f: impl FnOnce(&mut EngineStatus)) {
        self.tx.send_modify(f);
    }

    pub fn subscribe(&self) -> watch::Receiver<EngineStatus> {
        self.tx.subscribe()
    }

    /// A new process was spawned. Clears everything left from the previous
    /// one and returns the new generation.
    pub fn begin(&self, pid: Option<u32>) -> u64 {
        let mut generation = 0;
        self.tx.send_modify(|s| {
            s.clear();
            s.generation += 1;
            s.running = true;
            s.pid = pid;
            generation = s.generation;
        });
        generation
    }

    /// The given generation's stdout closed. Returns false when a newer
    /// process has already taken over or the state was already torn down.
    pub fn mark_exited(&self, generation: u64) -> bool {
        self.tx.send_if_modified(|s| {
            if s.generation == generation && s.running {
                s.clear();
                true
            } else {
                false
            }
        })
    }

    /// Unconditional reset to disconnected.
    pub fn teardown(&self) {
        self.tx.send_modify(EngineStatus::clear);
    }

    /// Wait until `pred` holds or `deadline` passes. Checks the current
    /// status first, so an already-true predicate returns immediately.
    pub async fn wait_until<F>(&self, deadline: Duration, mut pred: F) -> Option<EngineStatus>
    where
        F: FnMut(&EngineStatus) -> bool,
    {
        let mut rx = self.tx.subscribe();
        match tokio::time::timeout(deadline, rx.wait_for(|s| pred(s))).await {
            Ok(Ok(status)) => Some(status.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_follows_flags() {
        let mut s = EngineStatus::default();
        assert_eq!(s.phase(), Phase::Disconnected);
        s.running = true;
        assert_eq!(s.phase(), Phase::Handshaking);
        s.ready = true;
        assert_eq!(s.phase(), Phase::Ready);
        s.thinking = true;
        assert_eq!(s.phase(), Phase::Thinking);
    }

    #[test]
    fn begin_bumps_generation_and_clears() {
        let cell = StatusCell::new();
        let first = cell.begin(Some(42));
        cell.update(|s| {
            s.ready = true;
            s.identity.name = "Foo".into();
        });

        let second = cell.begin(Some(43));
        assert_eq!(second, first + 1);

        let s = cell.snapshot();
        assert!(s.running);
        assert!(!s.ready);
        assert!(s.identity.name.is_empty());
        assert_eq!(s.pid, Some(43));
    }

    #[test]
    fn stale_generation_cannot_reset_successor() {
        let cell = StatusCell::new();
        let old = cell.begin(None);
        let _new = cell.begin(None);

        assert!(!cell.mark_exited(old));
        assert!(cell.snapshot().running);
    }

    #[test]
    fn mark_exited_resets_identity_and_readiness() {
        let cell = StatusCell::new();
        let generation = cell.begin(Some(7));
        cell.update(|s| {
            s.ready = true;
            s.identity.author = "Bar".into();
        });

        assert!(cell.mark_exited(generation));
        let s = cell.snapshot();
        assert_eq!(s.phase(), Phase::Disconnected);
        assert_eq!(s.identity, EngineIdentity::default());
        assert_eq!(s.generation, generation);
    }

    #[tokio::test]
    async fn wait_until_returns_immediately_when_true() {
        let cell = StatusCell::new();
        cell.begin(None);
        let s = cell
            .wait_until(Duration::from_millis(10), |s| s.running)
            .await;
        assert!(s.is_some());
    }

    #[tokio::test]
    async fn wait_until_wakes_on_update() {
        let cell = StatusCell::new();
        cell.begin(None);

        let writer = cell.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            writer.update(|s| s.ready = true);
        });

        let s = cell
            .wait_until(Duration::from_secs(2), |s| s.ready)
            .await
            .unwrap();
        assert!(s.ready);
    }

    #[tokio::test]
    async fn wait_until_times_out() {
        let cell = StatusCell::new();
        let s = cell
            .wait_until(Duration::from_millis(30), |s| s.ready)
            .await;
        assert!(s.is_none());
    }

    #[test]
    fn phase_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Phase::Thinking).unwrap(), "\"thinking\"");
    }
}

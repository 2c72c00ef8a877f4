//! The single writer to the engine's stdin.

use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{BridgeError, Result};
use crate::events::{Event, EventBus};
use crate::process::EngineInput;
use crate::protocol::Command;

/// Serializes commands onto stdin. The lock is held for the whole
/// write-and-flush, so two commands can never interleave.
///
/// Every send, including the wait for the lock, is bounded by the write
/// timeout. An engine that stops reading stdin turns into a
/// [`BridgeError::WriteFailure`] instead of a stuck lock.
pub struct CommandWriter {
    stdin: Mutex<Option<EngineInput>>,
    events: Arc<EventBus>,
    write_timeout: Duration,
}

impl CommandWriter {
    pub fn new(events: Arc<EventBus>, write_timeout: Duration) -> Self {
        Self {
            stdin: Mutex::new(None),
            events,
            write_timeout,
        }
    }

    pub async fn attach(&self, stdin: EngineInput) {
        *self.stdin.lock().await = Some(stdin);
    }

    /// Take stdin away. Dropping the returned handle closes the pipe.
    pub async fn detach(&self) -> Option<EngineInput> {
        self.stdin.lock().await.take()
    }

    pub async fn send(&self, command: &Command) -> Result<()> {
        let line = command.to_string();
        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');

        match tokio::time::timeout(self.write_timeout, self.write_line(&bytes)).await {
            Ok(written) => written?,
            Err(_) => {
                let after_ms = self.write_timeout.as_millis() as u64;
                warn!(after_ms, "engine is not reading its input");
                return Err(BridgeError::WriteFailure(format!(
                    "write timed out after {after_ms}ms"
                )));
            }
        }

        debug!("→ {line}");
        self.events.emit(Event::CommandSent { command: line });
        Ok(())
    }

    async fn write_line(&self, bytes: &[u8]) -> Result<()> {
        let mut guard = self.stdin.lock().await;
        let stdin = guard.as_mut().ok_or(BridgeError::NotRunning)?;
        stdin
            .write_all(bytes)
            .await
            .map_err(|e| BridgeError::WriteFailure(e.to_string()))?;
        stdin
            .flush()
            .await
            .map_err(|e| BridgeError::WriteFailure(e.to_string()))
    }
}

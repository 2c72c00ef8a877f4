//! Owns the engine process: start, stop, and the wiring of its streams.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::classifier::Classifier;
use crate::error::{BridgeError, Result};
use crate::events::EventBus;
use crate::process::{EngineProcess, Launcher, ProcessControl};
use crate::protocol::Command;
use crate::reader;
use crate::result::ResultSender;
use crate::status::StatusCell;
use crate::writer::CommandWriter;

/// How long to wait for the reader to see EOF after the process is gone.
const READER_JOIN_TIMEOUT: Duration = Duration::from_millis(500);

struct Running {
    control: Box<dyn ProcessControl>,
    reader: JoinHandle<()>,
    stderr: Option<JoinHandle<()>>,
    generation: u64,
}

/// Holds at most one engine process.
///
/// Liveness comes from the stdout reader: when that stream closes the shared
/// status flips to not running. The handle itself is only released by
/// [`Supervisor::stop`] or by the next [`Supervisor::start`].
pub struct Supervisor {
    launcher: Arc<dyn Launcher>,
    writer: Arc<CommandWriter>,
    status: StatusCell,
    results: ResultSender,
    events: Arc<EventBus>,
    process: Mutex<Option<Running>>,
    grace: Duration,
}

impl Supervisor {
    pub fn new(
        launcher: Arc<dyn Launcher>,
        writer: Arc<CommandWriter>,
        status: StatusCell,
        results: ResultSender,
        events: Arc<EventBus>,
        grace: Duration,
    ) -> Self {
        Self {
            launcher,
            writer,
            status,
            results,
            events,
            process: Mutex::new(None),
            grace,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status.snapshot().running
    }

    /// Launch the engine at `path` and start reading its output.
    ///
    /// Refuses with [`BridgeError::AlreadyRunning`] while a live process is
    /// held. A handle whose output already closed is reaped first.
    pub async fn start(&self, path: &Path) -> Result<()> {
        let mut slot = self.process.lock().await;
        if slot.is_some() && self.is_running() {
            return Err(BridgeError::AlreadyRunning);
        }
        if let Some(dead) = slot.take() {
            debug!(generation = dead.generation, "reaping exited engine");
            self.reap(dead).await;
        }

        info!(path = %path.display(), "starting engine");
        let EngineProcess {
            stdin,
            stdout,
            stderr,
            control,
        } = self
            .launcher
            .launch(path)
            .await
            .map_err(|e| BridgeError::SpawnFailure(format!("{e:#}")))?;

        // stdin goes in before `running` is published, so nobody can see a
        // running engine with no way to write to it.
        self.writer.attach(stdin).await;
        let generation = self.status.begin(control.id());

        let classifier = Classifier::new(
            generation,
            self.status.clone(),
            self.results.clone(),
            Arc::clone(&self.events),
        );
        let reader = reader::spawn_reader(stdout, classifier);
        let stderr = stderr.map(reader::spawn_stderr_logger);

        info!(pid = ?control.id(), generation, "engine started");
        *slot = Some(Running {
            control,
            reader,
            stderr,
            generation,
        });
        Ok(())
    }

    /// Ask the engine to quit, give it the grace period, then kill it.
    /// Idempotent; always leaves the status disconnected.
    pub async fn stop(&self) {
        let mut slot = self.process.lock().await;
        if let Some(running) = slot.take() {
            match tokio::time::timeout(self.grace, self.writer.send(&Command::Quit)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!(error = %e, "quit not delivered"),
                Err(_) => debug!("quit not delivered within grace period"),
            }
            self.reap(running).await;
        }
        self.status.teardown();
    }

    async fn reap(&self, mut running: Running) {
        // Closing stdin is a second hint for engines that ignore `quit`. A
        // write stuck on a full pipe may still hold the writer; the kill
        // below breaks it loose.
        let detached = tokio::time::timeout(self.grace, self.writer.detach())
            .await
            .is_ok();

        let exited = match tokio::time::timeout(self.grace, running.control.wait()).await {
            Ok(Ok(code)) => {
                info!(?code, generation = running.generation, "engine exited");
                true
            }
            Ok(Err(e)) => {
                warn!(error = %e, "waiting for engine failed, killing");
                false
            }
            Err(_) => {
                warn!(
                    grace_ms = self.grace.as_millis() as u64,
                    "engine still alive after grace period, killing"
                );
                false
            }
        };
        if !exited && let Err(e) = running.control.kill().await {
            warn!(error = %e, "failed to kill engine");
        }
        if !detached {
            // The stuck write fails once the process is gone, or at the
            // writer's own timeout.
            drop(self.writer.detach().await);
        }

        if tokio::time::timeout(READER_JOIN_TIMEOUT, &mut running.reader)
            .await
            .is_err()
        {
            running.reader.abort();
        }
        if let Some(stderr) = running.stderr {
            stderr.abort();
        }
    }
}

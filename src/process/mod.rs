//! How engine processes come to exist.
//!
//! The supervisor only sees these traits. [`os::OsLauncher`] spawns real
//! executables; [`mock::ScriptedLauncher`] simulates an engine in memory.

pub mod mock;
pub mod os;

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use tokio::io::{AsyncRead, AsyncWrite};

pub type EngineInput = Box<dyn AsyncWrite + Send + Unpin>;
pub type EngineOutput = Box<dyn AsyncRead + Send + Unpin>;

/// A freshly started engine: its three streams and a handle to control it.
pub struct EngineProcess {
    pub stdin: EngineInput,
    pub stdout: EngineOutput,
    pub stderr: Option<EngineOutput>,
    pub control: Box<dyn ProcessControl>,
}

/// Lifecycle control over a running engine.
#[async_trait]
pub trait ProcessControl: Send {
    /// OS process id, if there is one.
    fn id(&self) -> Option<u32>;

    /// Wait for the process to exit on its own. Returns the exit code when
    /// the platform reports one.
    async fn wait(&mut self) -> Result<Option<i32>>;

    /// Terminate the process and block until termination is confirmed.
    async fn kill(&mut self) -> Result<()>;
}

/// Starts engines.
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(&self, path: &Path) -> Result<EngineProcess>;
}

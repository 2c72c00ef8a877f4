use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::debug;

use super::{EngineOutput, EngineProcess, Launcher, ProcessControl};

/// Spawns the engine executable with piped stdio.
///
/// Relative paths are resolved against the current directory, and the
/// engine runs with its own directory as working directory since engines
/// load evaluation files and books relative to themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsLauncher;

impl OsLauncher {
    fn resolve(path: &Path) -> Result<PathBuf> {
        let exe = std::path::absolute(path)
            .with_context(|| format!("cannot resolve engine path {}", path.display()))?;
        if !exe.is_file() {
            bail!("engine executable not found: {}", exe.display());
        }
        Ok(exe)
    }
}

#[async_trait]
impl Launcher for OsLauncher {
    async fn launch(&self, path: &Path) -> Result<EngineProcess> {
        let exe = Self::resolve(path)?;

        let mut command = Command::new(&exe);
        if let Some(dir) = exe.parent() {
            command.current_dir(dir);
        }
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {}", exe.display()))?;

        debug!(pid = ?child.id(), exe = %exe.display(), "engine spawned");

        let stdin = child.stdin.take().context("engine stdin was not piped")?;
        let stdout = child.stdout.take().context("engine stdout was not piped")?;
        let stderr = child.stderr.take();

        Ok(EngineProcess {
            stdin: Box::new(stdin),
            stdout: Box::new(stdout),
            stderr: stderr.map(|s| -> EngineOutput { Box::new(s) }),
            control: Box::new(OsProcess { child }),
        })
    }
}

struct OsProcess {
    child: Child,
}

#[async_trait]
impl ProcessControl for OsProcess {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    async fn wait(&mut self) -> Result<Option<i32>> {
        let status = self.child.wait().await?;
        Ok(status.code())
    }

    async fn kill(&mut self) -> Result<()> {
        // Sends the kill and reaps the child before returning.
        self.child.kill().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_rejects_missing_file() {
        let err = OsLauncher::resolve(Path::new("definitely/not/an/engine.exe")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn resolve_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(OsLauncher::resolve(dir.path()).is_err());
    }

    #[test]
    fn resolve_makes_path_absolute() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("engine");
        std::fs::write(&exe, "").unwrap();
        let resolved = OsLauncher::resolve(&exe).unwrap();
        assert!(resolved.is_absolute());
    }
}

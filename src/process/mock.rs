//! A scripted engine for tests and demos. Speaks the protocol over
//! in-memory pipes, so no executable is needed.

use anyhow::{Result, bail};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::task::{JoinHandle, JoinSet};

use super::{EngineProcess, Launcher, ProcessControl};

const PIPE_CAPACITY: usize = 64 * 1024;
const FAKE_PID_BASE: u32 = 40_000;

#[derive(Debug, Clone)]
struct Reply {
    lines: Vec<String>,
    delay: Duration,
}

#[derive(Debug, Clone, Default)]
struct Script {
    greeting: Vec<String>,
    replies: HashMap<String, VecDeque<Reply>>,
    crash_on: Option<String>,
    hang_on_quit: bool,
    deaf: bool,
}

impl Script {
    /// Reply for a command, keyed by its first word. Queued replies are used
    /// in order and the last one repeats.
    fn reply_for(&mut self, command: &str) -> Option<Reply> {
        let keyword = command.split_whitespace().next()?;
        let queue = self.replies.get_mut(keyword)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

/// Launches simulated engines that answer commands from a script.
///
/// ```
/// use usi_bridge::process::mock::ScriptedLauncher;
///
/// let launcher = ScriptedLauncher::usi_engine("Foo", "Bar").on("go", &["bestmove 7g7f"]);
/// assert_eq!(launcher.launches(), 0);
/// ```
#[derive(Debug, Default)]
pub struct ScriptedLauncher {
    script: Script,
    received: Arc<Mutex<Vec<String>>>,
    launches: AtomicUsize,
    refusal: Option<String>,
}

impl ScriptedLauncher {
    /// An engine that reads commands and never answers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `usi` with its identity and `usiok`, and `isready` with
    /// `readyok`.
    pub fn usi_engine(name: &str, author: &str) -> Self {
        Self::new()
            .on(
                "usi",
                &[
                    format!("id name {name}").as_str(),
                    format!("id author {author}").as_str(),
                    "usiok",
                ],
            )
            .on("isready", &["readyok"])
    }

    /// Every launch fails with `reason`.
    pub fn refusing(reason: &str) -> Self {
        Self {
            refusal: Some(reason.to_string()),
            ..Self::default()
        }
    }

    /// Queue a reply for commands starting with `keyword`.
    pub fn on(self, keyword: &str, lines: &[&str]) -> Self {
        self.on_after(keyword, Duration::ZERO, lines)
    }

    /// Queue a reply printed `delay` after the command arrives. The engine
    /// keeps reading commands in the meantime.
    pub fn on_after(mut self, keyword: &str, delay: Duration, lines: &[&str]) -> Self {
        self.script
            .replies
            .entry(keyword.to_string())
            .or_default()
            .push_back(Reply {
                lines: lines.iter().map(|l| l.to_string()).collect(),
                delay,
            });
        self
    }

    /// Lines printed as soon as the engine starts.
    pub fn greeting(mut self, lines: &[&str]) -> Self {
        self.script.greeting = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    /// Die (close every stream) on receiving a command starting with `keyword`.
    pub fn crash_on(mut self, keyword: &str) -> Self {
        self.script.crash_on = Some(keyword.to_string());
        self
    }

    /// Ignore `quit` and stdin EOF; only a kill ends the process.
    pub fn hang_on_quit(mut self) -> Self {
        self.script.hang_on_quit = true;
        self
    }

    /// Print the greeting, then never read stdin again. Writes past the pipe
    /// buffer block until the engine is killed.
    pub fn deaf(mut self) -> Self {
        self.script.deaf = true;
        self
    }

    /// Every command line received so far, across all launches.
    pub fn received(&self) -> Vec<String> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Launcher for ScriptedLauncher {
    async fn launch(&self, _path: &Path) -> Result<EngineProcess> {
        if let Some(reason) = &self.refusal {
            bail!("{reason}");
        }
        let n = self.launches.fetch_add(1, Ordering::SeqCst) + 1;

        let (bridge_stdin, engine_stdin) = tokio::io::duplex(PIPE_CAPACITY);
        let (engine_stdout, bridge_stdout) = tokio::io::duplex(PIPE_CAPACITY);
        let task = tokio::spawn(run_engine(
            self.script.clone(),
            engine_stdin,
            engine_stdout,
            Arc::clone(&self.received),
        ));

        Ok(EngineProcess {
            stdin: Box::new(bridge_stdin),
            stdout: Box::new(bridge_stdout),
            stderr: None,
            control: Box::new(ScriptedProcess {
                task: Some(task),
                pid: FAKE_PID_BASE + n as u32,
                killed: false,
            }),
        })
    }
}

async fn run_engine(
    mut script: Script,
    stdin: DuplexStream,
    stdout: DuplexStream,
    received: Arc<Mutex<Vec<String>>>,
) {
    let stdout = Arc::new(tokio::sync::Mutex::new(stdout));
    let mut delayed = JoinSet::new();
    write_lines(&stdout, &script.greeting).await;
    if script.deaf {
        let _held = &stdin;
        std::future::pending::<()>().await;
    }

    let mut lines = BufReader::new(stdin).lines();
    while let Ok(Some(command)) = lines.next_line().await {
        let command = command.trim().to_string();
        received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command.clone());

        if command == "quit" {
            break;
        }
        if let Some(keyword) = &script.crash_on
            && command.split_whitespace().next() == Some(keyword.as_str())
        {
            return;
        }
        if let Some(reply) = script.reply_for(&command) {
            if reply.delay.is_zero() {
                write_lines(&stdout, &reply.lines).await;
            } else {
                let stdout = Arc::clone(&stdout);
                delayed.spawn(async move {
                    tokio::time::sleep(reply.delay).await;
                    write_lines(&stdout, &reply.lines).await;
                });
            }
        }
        while delayed.try_join_next().is_some() {}
    }

    if script.hang_on_quit {
        std::future::pending::<()>().await;
    }
}

async fn write_lines(stdout: &tokio::sync::Mutex<DuplexStream>, lines: &[String]) {
    let mut stdout = stdout.lock().await;
    for line in lines {
        if stdout.write_all(format!("{line}\n").as_bytes()).await.is_err() {
            return;
        }
    }
    let _ = stdout.flush().await;
}

struct ScriptedProcess {
    task: Option<JoinHandle<()>>,
    pid: u32,
    killed: bool,
}

#[async_trait]
impl ProcessControl for ScriptedProcess {
    fn id(&self) -> Option<u32> {
        Some(self.pid)
    }

    async fn wait(&mut self) -> Result<Option<i32>> {
        if let Some(task) = self.task.as_mut() {
            let _ = task.await;
            self.task = None;
        }
        Ok(if self.killed { None } else { Some(0) })
    }

    async fn kill(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
        self.killed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn read_line(stdout: &mut BufReader<crate::process::EngineOutput>) -> String {
        let mut line = String::new();
        stdout.read_line(&mut line).await.unwrap();
        line.trim().to_string()
    }

    #[tokio::test]
    async fn answers_from_script_and_records_commands() {
        let launcher = ScriptedLauncher::usi_engine("Foo", "Bar");
        let mut process = launcher.launch(Path::new("fake-engine")).await.unwrap();
        let mut stdout = BufReader::new(process.stdout);

        process.stdin.write_all(b"usi\n").await.unwrap();
        assert_eq!(read_line(&mut stdout).await, "id name Foo");
        assert_eq!(read_line(&mut stdout).await, "id author Bar");
        assert_eq!(read_line(&mut stdout).await, "usiok");

        assert_eq!(launcher.received(), vec!["usi"]);
        assert_eq!(launcher.launches(), 1);
        assert_eq!(process.control.id(), Some(FAKE_PID_BASE + 1));
    }

    #[test]
    fn queued_replies_are_used_in_order_then_repeat() {
        let launcher = ScriptedLauncher::new()
            .on("go", &["bestmove 1a1b"])
            .on("go", &["bestmove 2a2b"]);
        let mut script = launcher.script.clone();

        let first = script.reply_for("go byoyomi 1").unwrap();
        let second = script.reply_for("go byoyomi 1").unwrap();
        let third = script.reply_for("go byoyomi 1").unwrap();
        assert_eq!(first.lines, vec!["bestmove 1a1b"]);
        assert_eq!(second.lines, vec!["bestmove 2a2b"]);
        assert_eq!(third.lines, vec!["bestmove 2a2b"]);
        assert!(script.reply_for("position sfen startpos").is_none());
    }

    #[tokio::test]
    async fn quit_ends_the_process() {
        let launcher = ScriptedLauncher::new();
        let mut process = launcher.launch(Path::new("fake-engine")).await.unwrap();
        process.stdin.write_all(b"quit\n").await.unwrap();
        assert_eq!(process.control.wait().await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn kill_ends_a_hanging_process() {
        let launcher = ScriptedLauncher::new().hang_on_quit();
        let mut process = launcher.launch(Path::new("fake-engine")).await.unwrap();
        process.stdin.write_all(b"quit\n").await.unwrap();

        let waited =
            tokio::time::timeout(Duration::from_millis(50), process.control.wait()).await;
        assert!(waited.is_err());

        process.control.kill().await.unwrap();
        assert_eq!(process.control.wait().await.unwrap(), None);
    }

    #[tokio::test]
    async fn refusing_launcher_fails() {
        let launcher = ScriptedLauncher::refusing("no such engine");
        let err = launcher
            .launch(Path::new("fake-engine"))
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("no such engine"));
        assert_eq!(launcher.launches(), 0);
    }
}

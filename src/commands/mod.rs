//! Built-in REPL commands prefixed with `/`.
//!
//! Commands implement the [`Command`] trait and are registered in a
//! [`CommandRegistry`]. The registry splits the input line into a trigger
//! and arguments, resolves aliases, and generates `/help`.

mod config;
mod connect;
mod disconnect;
mod go;
mod health;
mod help;
mod newgame;
mod position;
mod quit;
mod usi;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::bridge::Bridge;
use crate::config::Config;
use crate::error::BridgeError;

/// What commands can reach while they run.
pub struct Session<'a> {
    pub bridge: &'a Bridge,
    /// `None` when the session runs without a config store.
    pub config: Option<&'a Config>,
    /// Used by `/connect` when no path is given.
    pub engine_path: &'a Path,
}

/// What the REPL should do after a command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandResult {
    /// Input was not a command.
    NotACommand,
    /// Command handled, continue the REPL loop.
    Handled,
    /// A search ran; feeds the session summary.
    Searched { timed_out: bool },
    /// Exit the REPL.
    Quit,
}

/// A REPL command. Implement this trait to add new commands.
#[async_trait]
pub trait Command: Send + Sync {
    /// Primary name, e.g. `"/go"`.
    fn name(&self) -> &str;

    /// Alternative names, e.g. `&["/h", "/?"]`.
    fn aliases(&self) -> &[&str] {
        &[]
    }

    /// Argument synopsis shown by `/help`, e.g. `"[ms]"`.
    fn usage(&self) -> &str {
        ""
    }

    /// One-line description for `/help`.
    fn description(&self) -> &str;

    /// Run the command with the words following the trigger.
    async fn execute(&self, args: &[&str], session: &Session<'_>) -> CommandResult;
}

/// Holds registered commands.
pub struct CommandRegistry {
    commands: Vec<Arc<dyn Command>>,
}

impl CommandRegistry {
    /// Create a registry with all built-in commands.
    pub fn new() -> Self {
        let commands: Vec<Arc<dyn Command>> = vec![
            Arc::new(help::HelpCommand),
            Arc::new(connect::ConnectCommand),
            Arc::new(usi::UsiCommand),
            Arc::new(newgame::NewGameCommand),
            Arc::new(position::PositionCommand),
            Arc::new(go::GoCommand),
            Arc::new(health::HealthCommand),
            Arc::new(disconnect::DisconnectCommand),
            Arc::new(config::ConfigCommand),
            Arc::new(quit::QuitCommand),
        ];
        Self { commands }
    }

    /// Register an additional command.
    pub fn register(&mut self, command: Arc<dyn Command>) {
        self.commands.push(command);
    }

    /// Dispatch input to a matching command, or return `NotACommand`.
    pub async fn dispatch(&self, input: &str, session: &Session<'_>) -> CommandResult {
        let words: Vec<&str> = input.split_whitespace().collect();
        let Some((&trigger, args)) = words.split_first() else {
            return CommandResult::NotACommand;
        };

        for command in &self.commands {
            if trigger == command.name() || command.aliases().contains(&trigger) {
                // /help needs the registry itself
                if command.name() == "/help" {
                    print!("{}", self.help_text());
                    return CommandResult::Handled;
                }
                return command.execute(args, session).await;
            }
        }

        if trigger.starts_with('/') {
            println!("unknown command: {trigger}");
            println!("type /help for available commands");
            return CommandResult::Handled;
        }

        CommandResult::NotACommand
    }

    /// Generate help text from all registered commands.
    pub fn help_text(&self) -> String {
        let entries: Vec<(String, &str)> = self
            .commands
            .iter()
            .map(|c| (format_label(c.name(), c.usage(), c.aliases()), c.description()))
            .collect();

        let max_width = entries
            .iter()
            .map(|(label, _)| label.len())
            .max()
            .unwrap_or(10);

        let mut out = String::new();
        for (label, desc) in &entries {
            out.push_str(&format!("  {label:<max_width$}  {desc}\n"));
        }
        out
    }

    /// All registered command names.
    pub fn names(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.name()).collect()
    }

    /// All registered names and aliases.
    pub fn all_triggers(&self) -> Vec<&str> {
        let mut triggers = Vec::new();
        for cmd in &self.commands {
            triggers.push(cmd.name());
            triggers.extend_from_slice(cmd.aliases());
        }
        triggers
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Print a failed bridge call. A fatal error means the engine is gone, so
/// the bridge is reset to disconnected.
async fn report(err: &BridgeError, session: &Session<'_>) {
    eprintln!("  ✗ {err}");
    if err.is_fatal() {
        session.bridge.quit().await;
        eprintln!("  engine connection lost; use /connect to restart");
    }
}

fn format_label(name: &str, usage: &str, aliases: &[&str]) -> String {
    let mut label = name.to_string();
    if !usage.is_empty() {
        label.push(' ');
        label.push_str(usage);
    }
    if !aliases.is_empty() {
        label.push_str(&format!(" ({})", aliases.join(", ")));
    }
    label
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::bridge::BridgeConfig;
    use crate::process::mock::ScriptedLauncher;
    use std::time::Duration;

    pub(crate) const ENGINE: &str = "fake-engine";

    /// A bridge over a scripted engine with short timeouts.
    pub(crate) fn test_bridge(launcher: ScriptedLauncher) -> (Bridge, Arc<ScriptedLauncher>) {
        let launcher = Arc::new(launcher);
        let config = BridgeConfig {
            handshake_timeout: Duration::from_millis(200),
            search_margin: Duration::from_millis(100),
            shutdown_grace: Duration::from_millis(100),
            stop_on_timeout: false,
        };
        (Bridge::new(launcher.clone(), config), launcher)
    }

    pub(crate) fn session<'a>(bridge: &'a Bridge, config: Option<&'a Config>) -> Session<'a> {
        Session {
            bridge,
            config,
            engine_path: Path::new(ENGINE),
        }
    }

    #[test]
    fn all_builtins_registered() {
        let reg = CommandRegistry::new();
        let names = reg.names();
        for name in [
            "/help",
            "/connect",
            "/usi",
            "/newgame",
            "/position",
            "/go",
            "/health",
            "/disconnect",
            "/config",
            "/quit",
        ] {
            assert!(names.contains(&name), "missing: {name}");
        }
    }

    #[test]
    fn no_duplicate_triggers() {
        let reg = CommandRegistry::new();
        let triggers = reg.all_triggers();
        let mut seen = Vec::new();
        for t in &triggers {
            assert!(!seen.contains(t), "duplicate trigger: {t}");
            seen.push(t);
        }
    }

    #[test]
    fn help_text_includes_all_commands() {
        let reg = CommandRegistry::new();
        let text = reg.help_text();
        for name in reg.names() {
            assert!(text.contains(name), "help missing: {name}");
        }
        assert!(text.contains("/h"));
        assert!(text.contains("[ms]"));
    }

    #[tokio::test]
    async fn unknown_slash_command_is_handled() {
        let (bridge, _) = test_bridge(ScriptedLauncher::new());
        let reg = CommandRegistry::new();
        assert_eq!(
            reg.dispatch("/foobar", &session(&bridge, None)).await,
            CommandResult::Handled
        );
    }

    #[tokio::test]
    async fn non_command_passes_through() {
        let (bridge, _) = test_bridge(ScriptedLauncher::new());
        let reg = CommandRegistry::new();
        let s = session(&bridge, None);
        assert_eq!(reg.dispatch("go 1000", &s).await, CommandResult::NotACommand);
        assert_eq!(reg.dispatch("   ", &s).await, CommandResult::NotACommand);
    }

    #[tokio::test]
    async fn dispatch_passes_arguments() {
        struct EchoCommand;

        #[async_trait]
        impl Command for EchoCommand {
            fn name(&self) -> &str {
                "/echo"
            }
            fn description(&self) -> &str {
                "test"
            }
            async fn execute(&self, args: &[&str], _session: &Session<'_>) -> CommandResult {
                if args == ["a", "b"] {
                    CommandResult::Quit
                } else {
                    CommandResult::Handled
                }
            }
        }

        let (bridge, _) = test_bridge(ScriptedLauncher::new());
        let mut reg = CommandRegistry::new();
        reg.register(Arc::new(EchoCommand));
        assert_eq!(
            reg.dispatch("/echo  a b", &session(&bridge, None)).await,
            CommandResult::Quit
        );
    }

    #[test]
    fn format_label_variants() {
        assert_eq!(format_label("/health", "", &[]), "/health");
        assert_eq!(format_label("/help", "", &["/h", "/?"]), "/help (/h, /?)");
        assert_eq!(format_label("/go", "[ms]", &[]), "/go [ms]");
    }
}

use async_trait::async_trait;
use std::path::Path;

use super::{Command, CommandResult, Session};

pub struct ConnectCommand;

#[async_trait]
impl Command for ConnectCommand {
    fn name(&self) -> &str {
        "/connect"
    }

    fn usage(&self) -> &str {
        "[path]"
    }

    fn description(&self) -> &str {
        "start the engine process"
    }

    async fn execute(&self, args: &[&str], session: &Session<'_>) -> CommandResult {
        let joined = args.join(" ");
        let path = if joined.is_empty() {
            session.engine_path
        } else {
            Path::new(&joined)
        };

        if session.bridge.health().engine_running {
            println!("  engine already running");
            return CommandResult::Handled;
        }

        match session.bridge.connect(path).await {
            Ok(()) => {
                let pid = session
                    .bridge
                    .health()
                    .pid
                    .map_or_else(|| "?".to_string(), |p| p.to_string());
                println!("  ✓ started {} (pid {pid})", path.display());
            }
            Err(e) => eprintln!("  ✗ {e}"),
        }
        CommandResult::Handled
    }
}

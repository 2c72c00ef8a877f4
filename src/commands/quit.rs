use async_trait::async_trait;

use super::{Command, CommandResult, Session};

pub struct QuitCommand;

#[async_trait]
impl Command for QuitCommand {
    fn name(&self) -> &str {
        "/quit"
    }

    fn aliases(&self) -> &[&str] {
        &["quit", "exit", "/exit"]
    }

    fn description(&self) -> &str {
        "stop the engine and exit"
    }

    async fn execute(&self, _args: &[&str], _session: &Session<'_>) -> CommandResult {
        CommandResult::Quit
    }
}

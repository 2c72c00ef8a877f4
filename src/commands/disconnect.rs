use async_trait::async_trait;

use super::{Command, CommandResult, Session};

pub struct DisconnectCommand;

#[async_trait]
impl Command for DisconnectCommand {
    fn name(&self) -> &str {
        "/disconnect"
    }

    fn description(&self) -> &str {
        "send quit and stop the engine"
    }

    async fn execute(&self, _args: &[&str], session: &Session<'_>) -> CommandResult {
        let was_running = session.bridge.health().engine_running;
        session.bridge.quit().await;
        if was_running {
            println!("  ✓ engine stopped");
        } else {
            println!("  no engine running");
        }
        CommandResult::Handled
    }
}

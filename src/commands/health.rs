use async_trait::async_trait;

use super::{Command, CommandResult, Session};

pub struct HealthCommand;

#[async_trait]
impl Command for HealthCommand {
    fn name(&self) -> &str {
        "/health"
    }

    fn aliases(&self) -> &[&str] {
        &["/status"]
    }

    fn description(&self) -> &str {
        "show engine status as JSON"
    }

    async fn execute(&self, _args: &[&str], session: &Session<'_>) -> CommandResult {
        match serde_json::to_string_pretty(&session.bridge.health()) {
            Ok(json) => {
                for line in json.lines() {
                    println!("  {line}");
                }
            }
            Err(e) => eprintln!("  ✗ {e}"),
        }
        CommandResult::Handled
    }
}

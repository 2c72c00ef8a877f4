use async_trait::async_trait;

use super::{Command, CommandResult, Session, report};
use crate::spinner::Spinner;

pub struct UsiCommand;

#[async_trait]
impl Command for UsiCommand {
    fn name(&self) -> &str {
        "/usi"
    }

    fn aliases(&self) -> &[&str] {
        &["/handshake"]
    }

    fn description(&self) -> &str {
        "run the usi handshake and show the engine's identity"
    }

    async fn execute(&self, _args: &[&str], session: &Session<'_>) -> CommandResult {
        let spinner = Spinner::start("waiting for usiok");
        let result = session.bridge.handshake().await;
        spinner.stop().await;

        match result {
            Ok(id) => {
                let name: &str = if id.name.is_empty() { "?" } else { &id.name };
                let author: &str = if id.author.is_empty() { "?" } else { &id.author };
                println!("  ✓ {name} by {author}");
            }
            Err(e) => report(&e, session).await,
        }
        CommandResult::Handled
    }
}

use async_trait::async_trait;

use super::{Command, CommandResult, Session, report};

pub struct NewGameCommand;

#[async_trait]
impl Command for NewGameCommand {
    fn name(&self) -> &str {
        "/newgame"
    }

    fn description(&self) -> &str {
        "isready, wait for readyok, then usinewgame"
    }

    async fn execute(&self, _args: &[&str], session: &Session<'_>) -> CommandResult {
        match session.bridge.new_game().await {
            Ok(()) => println!("  ✓ new game"),
            Err(e) => report(&e, session).await,
        }
        CommandResult::Handled
    }
}

use async_trait::async_trait;

use super::{Command, CommandResult, Session, report};
use crate::consts::DEFAULT_SEARCH_TIME_MS;
use crate::error::BridgeError;
use crate::spinner::Spinner;

pub struct GoCommand;

fn parse_time(args: &[&str]) -> Result<u64, String> {
    match args {
        [] => Ok(DEFAULT_SEARCH_TIME_MS),
        [ms] => ms
            .parse()
            .map_err(|_| format!("time limit must be milliseconds, got {ms:?}")),
        _ => Err("usage: /go [ms]".into()),
    }
}

#[async_trait]
impl Command for GoCommand {
    fn name(&self) -> &str {
        "/go"
    }

    fn usage(&self) -> &str {
        "[ms]"
    }

    fn description(&self) -> &str {
        "search the current position and print the best move"
    }

    async fn execute(&self, args: &[&str], session: &Session<'_>) -> CommandResult {
        let time_limit_ms = match parse_time(args) {
            Ok(ms) => ms,
            Err(msg) => {
                eprintln!("  {msg}");
                return CommandResult::Handled;
            }
        };

        let spinner = Spinner::start("thinking");
        let result = session.bridge.search(time_limit_ms).await;
        spinner.stop().await;

        match result {
            Ok(outcome) => {
                println!("  bestmove {}", outcome.bestmove);
                CommandResult::Searched { timed_out: false }
            }
            Err(e @ BridgeError::Timeout { .. }) => {
                eprintln!("  ✗ {e}");
                CommandResult::Searched { timed_out: true }
            }
            Err(e) => {
                report(&e, session).await;
                CommandResult::Handled
            }
        }
    }
}

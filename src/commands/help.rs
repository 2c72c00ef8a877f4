use async_trait::async_trait;

use super::{Command, CommandResult, Session};

/// Listed in the registry so it shows up in its own output; the registry
/// prints the text before `execute` is reached.
pub struct HelpCommand;

#[async_trait]
impl Command for HelpCommand {
    fn name(&self) -> &str {
        "/help"
    }

    fn aliases(&self) -> &[&str] {
        &["/h", "/?"]
    }

    fn description(&self) -> &str {
        "show available commands"
    }

    async fn execute(&self, _args: &[&str], _session: &Session<'_>) -> CommandResult {
        CommandResult::Handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_aliases() {
        assert_eq!(HelpCommand.aliases(), &["/h", "/?"]);
    }
}

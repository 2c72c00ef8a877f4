use async_trait::async_trait;

use super::{Command, CommandResult, Session};
use crate::config::settings;

pub struct ConfigCommand;

#[derive(Debug, PartialEq, Eq)]
enum Action<'a> {
    List,
    Set(&'a str, String),
    Unset(&'a str),
}

fn parse<'a>(args: &[&'a str]) -> Result<Action<'a>, &'static str> {
    match args {
        [] => Ok(Action::List),
        ["set", key, value @ ..] if !value.is_empty() => Ok(Action::Set(*key, value.join(" "))),
        ["unset", key] => Ok(Action::Unset(*key)),
        _ => Err("usage: /config [set <key> <value> | unset <key>]"),
    }
}

#[async_trait]
impl Command for ConfigCommand {
    fn name(&self) -> &str {
        "/config"
    }

    fn usage(&self) -> &str {
        "[set k v | unset k]"
    }

    fn description(&self) -> &str {
        "show or change stored settings (applied on next start)"
    }

    async fn execute(&self, args: &[&str], session: &Session<'_>) -> CommandResult {
        let Some(store) = session.config else {
            eprintln!("  ✗ no config store in this session");
            return CommandResult::Handled;
        };

        let result = match parse(args) {
            Ok(Action::List) => store.entries().map(|entries| {
                if entries.is_empty() {
                    println!("  nothing stored");
                }
                for (key, value) in entries {
                    println!("  {key} = {value}");
                }
            }),
            Ok(Action::Set(key, value)) => settings::validate(key, &value)
                .and_then(|()| store.set(key, &value))
                .map(|()| println!("  ✓ {key} = {value}")),
            Ok(Action::Unset(key)) => store.remove(key).map(|()| println!("  ✓ {key} unset")),
            Err(usage) => {
                eprintln!("  {usage}");
                return CommandResult::Handled;
            }
        };

        if let Err(e) = result {
            eprintln!("  ✗ {e:#}");
        }
        CommandResult::Handled
    }
}

use async_trait::async_trait;

use super::{Command, CommandResult, Session, report};

pub struct PositionCommand;

/// Split `<base...> [moves m1 m2 ...]` into the base encoding and moves.
/// The base may span several words, as a full SFEN does.
fn parse(args: &[&str]) -> Result<(String, Vec<String>), String> {
    let split = args.iter().position(|&w| w == "moves").unwrap_or(args.len());
    let (base, rest) = args.split_at(split);
    if base.is_empty() {
        return Err("usage: /position <base> [moves m1 m2 ...]".into());
    }
    let moves = rest.iter().skip(1).map(|m| m.to_string()).collect();
    Ok((base.join(" "), moves))
}

#[async_trait]
impl Command for PositionCommand {
    fn name(&self) -> &str {
        "/position"
    }

    fn usage(&self) -> &str {
        "<base> [moves ...]"
    }

    fn description(&self) -> &str {
        "set the position to search"
    }

    async fn execute(&self, args: &[&str], session: &Session<'_>) -> CommandResult {
        let (base, moves) = match parse(args) {
            Ok(parsed) => parsed,
            Err(usage) => {
                eprintln!("  {usage}");
                return CommandResult::Handled;
            }
        };

        match session.bridge.set_position(&base, &moves).await {
            Ok(position) => println!(
                "  ✓ {} (+{} moves)",
                position.base_encoding,
                position.moves.len()
            ),
            Err(e) => report(&e, session).await,
        }
        CommandResult::Handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{ENGINE, session, test_bridge};
    use crate::process::mock::ScriptedLauncher;

    #[test]
    fn parse_base_only() {
        let (base, moves) = parse(&["startpos"]).unwrap();
        assert_eq!(base, "startpos");
        assert!(moves.is_empty());
    }

    #[test]
    fn parse_multi_word_base_with_moves() {
        let args = [
            "lnsgkgsnl/1r5b1/ppppppppp/9/9/9/PPPPPPPPP/1B5R1/LNSGKGSNL",
            "b",
            "-",
            "1",
            "moves",
            "7g7f",
            "3c3d",
        ];
        let (base, moves) = parse(&args).unwrap();
        assert!(base.ends_with(" b - 1"));
        assert_eq!(moves, vec!["7g7f", "3c3d"]);
    }

    #[test]
    fn parse_requires_base() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["moves", "7g7f"]).is_err());
    }

    #[tokio::test]
    async fn sends_position_when_ready() {
        let (bridge, launcher) = test_bridge(ScriptedLauncher::usi_engine("Foo", "Bar"));
        bridge.connect(ENGINE).await.unwrap();
        bridge.handshake().await.unwrap();

        PositionCommand
            .execute(&["startpos", "moves", "7g7f"], &session(&bridge, None))
            .await;
        bridge.quit().await;
        assert!(
            launcher
                .received()
                .contains(&"position sfen startpos moves 7g7f".to_string())
        );
    }
}

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use usi_bridge::banner::{BannerInfo, SessionStats, print_banner, print_session_summary};
use usi_bridge::bridge::Bridge;
use usi_bridge::commands::{CommandRegistry, CommandResult, Session};
use usi_bridge::config::Config;
use usi_bridge::config::settings::Settings;
use usi_bridge::consts::{DEFAULT_SEARCH_TIME_MS, ENGINE_PATH_ENV, default_db_path};
use usi_bridge::events::Event;
use usi_bridge::process::os::OsLauncher;

#[derive(Parser)]
#[command(name = "usi-bridge", version, about = "Drive a USI shogi engine.")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Engine executable (overrides $ENGINE_PATH and the stored engine_path)
    #[arg(short, long)]
    engine: Option<PathBuf>,

    /// SQLite database for stored settings (use :memory: for ephemeral)
    #[arg(long)]
    db: Option<String>,

    /// Print every line exchanged with the engine
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// Do not start the engine when the REPL opens
    #[arg(long, default_value_t = false)]
    no_connect: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Start the engine, run the handshake, print its identity as JSON
    Probe,
    /// Search one position and print the best move as JSON
    Search {
        /// Base position, e.g. `startpos` or a full SFEN
        #[arg(long, default_value = "startpos")]
        sfen: String,

        /// Moves played from the base position
        #[arg(long, num_args = 0..)]
        moves: Vec<String>,

        /// Time limit in milliseconds
        #[arg(short, long, default_value_t = DEFAULT_SEARCH_TIME_MS)]
        time: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let db = cli
        .db
        .clone()
        .or_else(|| default_db_path().map(|p| p.to_string_lossy().into_owned()));
    let store = match &db {
        Some(path) => Some(open_store(path)?),
        None => {
            warn!("no home directory; running without a config store");
            None
        }
    };

    let settings = Settings::resolve(
        cli.engine.clone(),
        std::env::var(ENGINE_PATH_ENV).ok(),
        store.as_ref(),
    )?;
    let bridge = Bridge::new(std::sync::Arc::new(OsLauncher), settings.bridge.clone());
    let printer = cli.verbose.then(|| spawn_traffic_printer(bridge.subscribe()));

    let outcome = match cli.command {
        Some(Command::Probe) => probe(&bridge, &settings.engine_path).await,
        Some(Command::Search { sfen, moves, time }) => {
            search(&bridge, &settings.engine_path, &sfen, &moves, time).await
        }
        None => {
            let db_label = db.as_deref().unwrap_or("none");
            repl(&bridge, store.as_ref(), &settings, db_label, !cli.no_connect).await
        }
    };

    bridge.quit().await;
    if let Some(printer) = printer {
        printer.abort();
    }
    outcome
}

/// `RUST_LOG` wins when set. Logs go to stderr so stdout stays parseable.
fn init_tracing(debug: bool) {
    let default_directive = if debug {
        "usi_bridge=debug"
    } else {
        "usi_bridge=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();
}

fn open_store(path: &str) -> anyhow::Result<Config> {
    if path != ":memory:"
        && let Some(dir) = Path::new(path).parent()
        && !dir.as_os_str().is_empty()
    {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("cannot create {}", dir.display()))?;
    }
    Config::open(path)
}

fn spawn_traffic_printer(mut events: broadcast::Receiver<Event>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(Event::CommandSent { command }) => eprintln!("  > {command}"),
                Ok(Event::LineReceived { line }) => eprintln!("  < {line}"),
                Ok(Event::EngineExited { generation }) => {
                    eprintln!("  engine exited (generation {generation})")
                }
                Err(RecvError::Lagged(n)) => eprintln!("  ... {n} lines not shown"),
                Err(RecvError::Closed) => break,
            }
        }
    })
}

async fn probe(bridge: &Bridge, engine: &Path) -> anyhow::Result<()> {
    bridge.connect(engine).await?;
    let identity = bridge.handshake().await?;
    println!("{}", serde_json::to_string_pretty(&identity)?);
    Ok(())
}

async fn search(
    bridge: &Bridge,
    engine: &Path,
    sfen: &str,
    moves: &[String],
    time_limit_ms: u64,
) -> anyhow::Result<()> {
    bridge.connect(engine).await?;
    bridge.handshake().await?;
    bridge.new_game().await?;
    bridge.set_position(sfen, moves).await?;
    let outcome = bridge.search(time_limit_ms).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

async fn repl(
    bridge: &Bridge,
    store: Option<&Config>,
    settings: &Settings,
    db_label: &str,
    auto_connect: bool,
) -> anyhow::Result<()> {
    print_banner(&BannerInfo {
        engine_path: &settings.engine_path,
        db: db_label,
        bridge: &settings.bridge,
    });

    let registry = CommandRegistry::new();
    let session = Session {
        bridge,
        config: store,
        engine_path: &settings.engine_path,
    };
    let mut stats = SessionStats::default();

    if auto_connect {
        registry.dispatch("/connect", &session).await;
        if bridge.health().engine_running {
            registry.dispatch("/usi", &session).await;
        }
    }

    // Async stdin so Ctrl+C is caught at the prompt too
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        print!("\n{}> ", bridge.phase());
        io::stdout().flush()?;

        let line = tokio::select! {
            result = lines.next_line() => {
                match result {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        // Ctrl+D (EOF)
                        println!();
                        break;
                    }
                    Err(e) => {
                        eprintln!("input error: {}", e);
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        // Ctrl+C during a command cancels the command, not the REPL
        let result = tokio::select! {
            result = registry.dispatch(input, &session) => result,
            _ = tokio::signal::ctrl_c() => {
                println!("\n\ninterrupted");
                CommandResult::Handled
            }
        };

        match result {
            CommandResult::Quit => break,
            CommandResult::Searched { timed_out } => {
                stats.searches += 1;
                if timed_out {
                    stats.timeouts += 1;
                }
            }
            CommandResult::NotACommand => {
                println!("commands start with / (type /help)");
            }
            CommandResult::Handled => {}
        }
    }

    info!(searches = stats.searches, "session ended");
    print_session_summary(stats);
    Ok(())
}

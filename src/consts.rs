//! Project-wide constants.

use std::path::PathBuf;
use std::time::Duration;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Engine executable used when nothing else is configured.
pub const DEFAULT_ENGINE_PATH: &str = "engine.exe";

/// Environment variable naming the engine executable.
pub const ENGINE_PATH_ENV: &str = "ENGINE_PATH";

pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_SEARCH_MARGIN: Duration = Duration::from_secs(1);
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Longest a single command write may take before the engine is considered
/// to have stopped reading.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// Search time used by the REPL's `/go` when no limit is given.
pub const DEFAULT_SEARCH_TIME_MS: u64 = 5_000;

/// Best moves that may pile up with no search waiting for them.
pub const RESULT_QUEUE_CAPACITY: usize = 4;

/// Default database path: `~/.usi-bridge/bridge.db`.
/// `None` when the home directory cannot be determined.
pub fn default_db_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".usi-bridge").join("bridge.db"))
}

/// Human-readable duration, e.g. `850ms`, `5s`, `1.5s`.
pub fn format_duration(d: Duration) -> String {
    let ms = d.as_millis();
    if ms < 1_000 {
        format!("{ms}ms")
    } else if ms.is_multiple_of(1_000) {
        format!("{}s", ms / 1_000)
    } else {
        format!("{:.1}s", d.as_secs_f64())
    }
}

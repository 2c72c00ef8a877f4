//! Startup banner and session summary display.

use std::path::Path;

use crate::bridge::BridgeConfig;
use crate::consts::{DESCRIPTION, VERSION, format_duration};

/// Session configuration for display in the startup banner.
pub struct BannerInfo<'a> {
    pub engine_path: &'a Path,
    pub db: &'a str,
    pub bridge: &'a BridgeConfig,
}

/// Print the startup banner with session info.
pub fn print_banner(info: &BannerInfo) {
    println!(
        r#"
   ╔═══════════════════════════════════════╗
   ║          U S I   B R I D G E          ║
   ╚═══════════════════════════════════════╝

   {}
   version   {}
   engine    {}
   config    {}
   timeouts  handshake {}, search margin {}, shutdown {}
   on miss   {}

   type /help for commands
"#,
        DESCRIPTION,
        VERSION,
        info.engine_path.display(),
        info.db,
        format_duration(info.bridge.handshake_timeout),
        format_duration(info.bridge.search_margin),
        format_duration(info.bridge.shutdown_grace),
        if info.bridge.stop_on_timeout {
            "send stop"
        } else {
            "leave engine searching"
        },
    );
}

/// Counters shown when the REPL exits.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionStats {
    pub searches: u32,
    pub timeouts: u32,
}

/// Print the session summary (search counts + farewell).
pub fn print_session_summary(stats: SessionStats) {
    if stats.searches > 0 {
        println!(
            "session: {} searches, {} timed out",
            stats.searches, stats.timeouts
        );
    }
    println!("goodbye.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn print_banner_does_not_panic() {
        let bridge = BridgeConfig::default();
        print_banner(&BannerInfo {
            engine_path: &PathBuf::from("/opt/engine/engine.exe"),
            db: ":memory:",
            bridge: &bridge,
        });
    }

    #[test]
    fn print_session_summary_with_searches() {
        print_session_summary(SessionStats {
            searches: 3,
            timeouts: 1,
        });
    }

    #[test]
    fn print_session_summary_empty() {
        print_session_summary(SessionStats::default());
    }
}

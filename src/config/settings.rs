//! Effective settings: command-line flags, then environment, then the
//! config store, then built-in defaults.

use anyhow::{Context, Result, bail};
use std::path::PathBuf;
use std::time::Duration;

use super::{
    Config, ENGINE_PATH, HANDSHAKE_TIMEOUT_MS, KNOWN_KEYS, SEARCH_MARGIN_MS, SHUTDOWN_GRACE_MS,
    STOP_ON_TIMEOUT,
};
use crate::bridge::BridgeConfig;
use crate::consts::DEFAULT_ENGINE_PATH;

#[derive(Debug, Clone)]
pub struct Settings {
    pub engine_path: PathBuf,
    pub bridge: BridgeConfig,
}

impl Settings {
    /// `cli_engine` wins over `env_engine`, which wins over the stored path.
    /// Timeouts come from the store alone.
    pub fn resolve(
        cli_engine: Option<PathBuf>,
        env_engine: Option<String>,
        store: Option<&Config>,
    ) -> Result<Self> {
        let stored = |key: &str| -> Result<Option<String>> {
            match store {
                Some(config) => config.get(key),
                None => Ok(None),
            }
        };

        let engine_path = match (cli_engine, env_engine.filter(|s| !s.trim().is_empty())) {
            (Some(path), _) => path,
            (None, Some(env)) => PathBuf::from(env),
            (None, None) => stored(ENGINE_PATH)?
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ENGINE_PATH)),
        };

        let mut bridge = BridgeConfig::default();
        if let Some(v) = stored(HANDSHAKE_TIMEOUT_MS)? {
            bridge.handshake_timeout = parse_millis(HANDSHAKE_TIMEOUT_MS, &v)?;
        }
        if let Some(v) = stored(SEARCH_MARGIN_MS)? {
            bridge.search_margin = parse_millis(SEARCH_MARGIN_MS, &v)?;
        }
        if let Some(v) = stored(SHUTDOWN_GRACE_MS)? {
            bridge.shutdown_grace = parse_millis(SHUTDOWN_GRACE_MS, &v)?;
        }
        if let Some(v) = stored(STOP_ON_TIMEOUT)? {
            bridge.stop_on_timeout = parse_bool(STOP_ON_TIMEOUT, &v)?;
        }

        Ok(Self {
            engine_path,
            bridge,
        })
    }
}

/// Check a value before it is written to the store.
pub fn validate(key: &str, value: &str) -> Result<()> {
    match key {
        ENGINE_PATH if value.trim().is_empty() => bail!("{key} must not be empty"),
        ENGINE_PATH => Ok(()),
        HANDSHAKE_TIMEOUT_MS | SEARCH_MARGIN_MS | SHUTDOWN_GRACE_MS => {
            parse_millis(key, value).map(drop)
        }
        STOP_ON_TIMEOUT => parse_bool(key, value).map(drop),
        _ => bail!("unknown key {key} (known: {})", KNOWN_KEYS.join(", ")),
    }
}

fn parse_millis(key: &str, value: &str) -> Result<Duration> {
    let ms: u64 = value
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a whole number of milliseconds, got {value:?}"))?;
    Ok(Duration::from_millis(ms))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => bail!("{key} must be true or false, got {value:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Config {
        Config::open(":memory:").unwrap()
    }

    #[test]
    fn defaults_without_anything() {
        let s = Settings::resolve(None, None, None).unwrap();
        assert_eq!(s.engine_path, PathBuf::from(DEFAULT_ENGINE_PATH));
        assert_eq!(s.bridge.handshake_timeout, Duration::from_secs(5));
        assert!(!s.bridge.stop_on_timeout);
    }

    #[test]
    fn flag_beats_env_and_store() {
        let config = store();
        config.set(ENGINE_PATH, "stored").unwrap();
        let s = Settings::resolve(
            Some(PathBuf::from("flag")),
            Some("env".into()),
            Some(&config),
        )
        .unwrap();
        assert_eq!(s.engine_path, PathBuf::from("flag"));
    }

    #[test]
    fn env_beats_store() {
        let config = store();
        config.set(ENGINE_PATH, "stored").unwrap();
        let s = Settings::resolve(None, Some("env".into()), Some(&config)).unwrap();
        assert_eq!(s.engine_path, PathBuf::from("env"));
    }

    #[test]
    fn blank_env_is_ignored() {
        let config = store();
        config.set(ENGINE_PATH, "stored").unwrap();
        let s = Settings::resolve(None, Some("  ".into()), Some(&config)).unwrap();
        assert_eq!(s.engine_path, PathBuf::from("stored"));
    }

    #[test]
    fn timeouts_from_store() {
        let config = store();
        config.set(HANDSHAKE_TIMEOUT_MS, "2500").unwrap();
        config.set(SEARCH_MARGIN_MS, "200").unwrap();
        config.set(SHUTDOWN_GRACE_MS, "300").unwrap();
        config.set(STOP_ON_TIMEOUT, "yes").unwrap();

        let s = Settings::resolve(None, None, Some(&config)).unwrap();
        assert_eq!(s.bridge.handshake_timeout, Duration::from_millis(2500));
        assert_eq!(s.bridge.search_margin, Duration::from_millis(200));
        assert_eq!(s.bridge.shutdown_grace, Duration::from_millis(300));
        assert!(s.bridge.stop_on_timeout);
    }

    #[test]
    fn bad_stored_value_is_an_error() {
        let config = store();
        config.set(SEARCH_MARGIN_MS, "soon").unwrap();
        let err = Settings::resolve(None, None, Some(&config)).unwrap_err();
        assert!(err.to_string().contains(SEARCH_MARGIN_MS));
    }

    #[test]
    fn validate_accepts_known_keys() {
        validate(ENGINE_PATH, "/usr/local/bin/engine").unwrap();
        validate(HANDSHAKE_TIMEOUT_MS, "1000").unwrap();
        validate(STOP_ON_TIMEOUT, "off").unwrap();
    }

    #[test]
    fn validate_rejects_bad_input() {
        assert!(validate("colour", "blue").is_err());
        assert!(validate(ENGINE_PATH, " ").is_err());
        assert!(validate(SHUTDOWN_GRACE_MS, "-5").is_err());
        assert!(validate(STOP_ON_TIMEOUT, "maybe").is_err());
    }
}

//! Configuration for a coverage run, read from a TOML file.
//!
//! ```toml
//! test_command = "vendor/bin/phpunit"
//! config_path = "phpunit.xml.dist"
//! timeout = "30m"
//! idle_timeout = "5m"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::{CloverError, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Exits 0 when a PHP coverage driver is loaded.
const DEFAULT_COVERAGE_PROBE: &str =
    r#"php -r "exit(extension_loaded('xdebug') || extension_loaded('pcov') ? 0 : 1);""#;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Command running the test suite; `--coverage-clover` is appended.
    pub test_command: String,

    /// Passed to the test command as `--configuration`.
    pub config_path: Option<String>,

    /// Deprecated, has no effect.
    pub only_changesets: bool,

    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,

    /// Maximum time the test command may go without printing anything.
    #[serde(deserialize_with = "deserialize_duration")]
    pub idle_timeout: Duration,

    pub coverage_probe: String,

    /// Extensions of files tracked by the project model.
    pub extensions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            test_command: "phpunit".to_string(),
            config_path: None,
            only_changesets: false,
            timeout: DEFAULT_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            coverage_probe: DEFAULT_COVERAGE_PROBE.to_string(),
            extensions: vec!["php".to_string()],
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CloverError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).map_err(|e| CloverError::Config(e.to_string()))?;
        config.warn_deprecated();
        Ok(config)
    }

    fn warn_deprecated(&self) {
        if self.only_changesets {
            tracing::warn!("'only_changesets' is deprecated and has no effect");
        }
    }
}

/// Parse durations like `"500ms"`, `"30s"`, `"1.5s"`, `"5m"` or `"1h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let (number, unit_secs) = if let Some(ms) = s.strip_suffix("ms") {
        let n: u64 = ms
            .trim()
            .parse()
            .map_err(|_| format!("invalid duration: {s}"))?;
        return Ok(Duration::from_millis(n));
    } else if let Some(secs) = s.strip_suffix('s') {
        (secs, 1.0)
    } else if let Some(mins) = s.strip_suffix('m') {
        (mins, 60.0)
    } else if let Some(hours) = s.strip_suffix('h') {
        (hours, 3600.0)
    } else {
        return Err(format!(
            "invalid duration format: {s} (use 500ms, 30s, 5m or 1h)"
        ));
    };

    let n: f64 = number
        .trim()
        .parse()
        .map_err(|_| format!("invalid duration: {s}"))?;
    if !n.is_finite() || n < 0.0 {
        return Err(format!("invalid duration: {s}"));
    }
    Duration::try_from_secs_f64(n * unit_secs).map_err(|_| format!("invalid duration: {s}"))
}

fn deserialize_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(serde::de::Error::custom)
}

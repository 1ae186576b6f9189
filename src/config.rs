//! Runtime configuration.
//!
//! Values come from the environment (a `.env` file in the working directory is
//! loaded first), then CLI flags override individual fields.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `LAUREL_LISTEN` | `0.0.0.0:8080` |
//! | `LAUREL_FONT_DIRS` | (none, system fonts only) |
//! | `LAUREL_MAX_RECIPIENTS` | `10` |
//! | `LAUREL_MAX_TEMPLATE_BYTES` | `5242880` |
//! | `LAUREL_SESSION_TTL_SECS` | `1800` |
//! | `LAUREL_LOG` | `info` |
//! | `LAUREL_LOG_JSON` | `false` |

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::LaurelError;

/// Largest template upload accepted (5 MiB).
pub const DEFAULT_MAX_TEMPLATE_BYTES: usize = 5 * 1024 * 1024;

/// Default recipient list capacity.
pub const DEFAULT_MAX_RECIPIENTS: usize = 10;

/// Global application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to (e.g., "0.0.0.0:8080")
    pub listen_addr: String,
    /// Extra directories scanned for font files, on top of system fonts
    pub font_dirs: Vec<PathBuf>,
    /// Recipient list capacity
    pub max_recipients: usize,
    /// Largest accepted template in bytes (decoded, not base64)
    pub max_template_bytes: usize,
    /// Idle time before an uploaded template session expires
    pub session_ttl_secs: u64,
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "laurel=debug,tower_http=info").
    pub level: String,
    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            font_dirs: Vec::new(),
            max_recipients: DEFAULT_MAX_RECIPIENTS,
            max_template_bytes: DEFAULT_MAX_TEMPLATE_BYTES,
            session_ttl_secs: 30 * 60,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Load from the process environment (and `.env`, if present).
    pub fn from_env() -> Result<Self, LaurelError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Missing keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LaurelError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("LAUREL_LISTEN") {
            config.listen_addr = addr;
        }
        if let Some(dirs) = lookup("LAUREL_FONT_DIRS") {
            config.font_dirs = std::env::split_paths(&dirs)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
        }
        if let Some(v) = lookup("LAUREL_MAX_RECIPIENTS") {
            config.max_recipients = parse_var("LAUREL_MAX_RECIPIENTS", &v)?;
            if config.max_recipients == 0 {
                return Err(LaurelError::Validation(
                    "LAUREL_MAX_RECIPIENTS must be at least 1".to_string(),
                ));
            }
        }
        if let Some(v) = lookup("LAUREL_MAX_TEMPLATE_BYTES") {
            config.max_template_bytes = parse_var("LAUREL_MAX_TEMPLATE_BYTES", &v)?;
        }
        if let Some(v) = lookup("LAUREL_SESSION_TTL_SECS") {
            config.session_ttl_secs = parse_var("LAUREL_SESSION_TTL_SECS", &v)?;
        }
        if let Some(level) = lookup("LAUREL_LOG") {
            config.logging.level = level;
        }
        if let Some(v) = lookup("LAUREL_LOG_JSON") {
            config.logging.json = matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }

        Ok(config)
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T, LaurelError> {
    value
        .trim()
        .parse()
        .map_err(|_| LaurelError::Validation(format!("{} has invalid value '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.max_recipients, 10);
        assert_eq!(config.max_template_bytes, 5 * 1024 * 1024);
        assert!(config.font_dirs.is_empty());
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("LAUREL_LISTEN", "127.0.0.1:9000"),
            ("LAUREL_MAX_RECIPIENTS", "250"),
            ("LAUREL_LOG_JSON", "true"),
            ("LAUREL_FONT_DIRS", "/opt/fonts"),
        ]))
        .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9000");
        assert_eq!(config.max_recipients, 250);
        assert!(config.logging.json);
        assert_eq!(config.font_dirs, vec![PathBuf::from("/opt/fonts")]);
    }

    #[test]
    fn test_invalid_number_rejected() {
        let err = Config::from_lookup(lookup_from(&[("LAUREL_MAX_RECIPIENTS", "lots")])).unwrap_err();
        assert!(err.is_validation());

        let err = Config::from_lookup(lookup_from(&[("LAUREL_MAX_RECIPIENTS", "0")])).unwrap_err();
        assert!(err.is_validation());
    }
}

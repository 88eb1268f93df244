use std::net::SocketAddr;
use std::path::PathBuf;

use zeroize::Zeroizing;

use crate::crypto::{MIN_SECRET_LENGTH, PBKDF2_ITERATIONS};

/// Application-level constants
pub const APP_NAME: &str = "ClinicRecords";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_ADDR: &str = "0.0.0.0:5000";
pub const DB_FILE_NAME: &str = "clinic.db";

pub const ENV_ADDR: &str = "CLINIC_ADDR";
pub const ENV_DB_PATH: &str = "CLINIC_DB_PATH";
pub const ENV_TOKEN_SECRET: &str = "CLINIC_TOKEN_SECRET";
pub const ENV_ALLOW_REGISTRATION: &str = "CLINIC_ALLOW_REGISTRATION";
pub const ENV_PBKDF2_ITERATIONS: &str = "CLINIC_PBKDF2_ITERATIONS";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "clinic_records_lib=info,clinic_records=info,clinic_admin=info,tower_http=warn"
}

/// ~/ClinicRecords/ on all platforms. `None` when the home directory is
/// unknown.
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(APP_NAME))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{ENV_TOKEN_SECRET} is not set")]
    MissingSecret,

    #[error("{ENV_TOKEN_SECRET} must be at least {0} bytes")]
    WeakSecret(usize),

    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("Cannot determine home directory; set {ENV_DB_PATH}")]
    NoDataDir,
}

/// Runtime settings for the HTTP server and the admin tool.
#[derive(Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub token_secret: Zeroizing<String>,
    pub allow_registration: bool,
    pub pbkdf2_iterations: u32,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("addr", &self.addr)
            .field("db_path", &self.db_path)
            .field("token_secret", &"<redacted>")
            .field("allow_registration", &self.allow_registration)
            .field("pbkdf2_iterations", &self.pbkdf2_iterations)
            .finish()
    }
}

impl ServerConfig {
    /// Read settings from the process environment. Call `dotenvy::dotenv()`
    /// first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read settings through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let token_secret = Zeroizing::new(get(ENV_TOKEN_SECRET).ok_or(ConfigError::MissingSecret)?);
        if token_secret.len() < MIN_SECRET_LENGTH {
            return Err(ConfigError::WeakSecret(MIN_SECRET_LENGTH));
        }

        let addr_raw = get(ENV_ADDR).unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = addr_raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                var: ENV_ADDR,
                value: addr_raw.clone(),
            })?;

        let db_path = match get(ENV_DB_PATH) {
            Some(path) => PathBuf::from(path.trim()),
            None => app_data_dir().ok_or(ConfigError::NoDataDir)?.join(DB_FILE_NAME),
        };

        let allow_registration = match get(ENV_ALLOW_REGISTRATION) {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::InvalidValue {
                var: ENV_ALLOW_REGISTRATION,
                value: raw,
            })?,
            None => true,
        };

        let pbkdf2_iterations = match get(ENV_PBKDF2_ITERATIONS) {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::InvalidValue {
                    var: ENV_PBKDF2_ITERATIONS,
                    value: raw,
                })?,
            None => PBKDF2_ITERATIONS,
        };

        Ok(Self {
            addr,
            db_path,
            token_secret,
            allow_registration,
            pbkdf2_iterations,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = ServerConfig::from_lookup(lookup(&[(ENV_TOKEN_SECRET, SECRET)])).unwrap();
        assert_eq!(config.addr.to_string(), DEFAULT_ADDR);
        assert!(config.allow_registration);
        assert_eq!(config.pbkdf2_iterations, PBKDF2_ITERATIONS);
        assert!(config.db_path.ends_with("ClinicRecords/clinic.db"));
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[
            (ENV_TOKEN_SECRET, SECRET),
            (ENV_ADDR, "127.0.0.1:8080"),
            (ENV_DB_PATH, "/tmp/clinic-test.db"),
            (ENV_ALLOW_REGISTRATION, "false"),
            (ENV_PBKDF2_ITERATIONS, "1000"),
        ]))
        .unwrap();
        assert_eq!(config.addr.port(), 8080);
        assert_eq!(config.db_path, PathBuf::from("/tmp/clinic-test.db"));
        assert!(!config.allow_registration);
        assert_eq!(config.pbkdf2_iterations, 1000);
    }

    #[test]
    fn missing_or_short_secret_fails_closed() {
        assert!(matches!(
            ServerConfig::from_lookup(lookup(&[])),
            Err(ConfigError::MissingSecret)
        ));
        assert!(matches!(
            ServerConfig::from_lookup(lookup(&[(ENV_TOKEN_SECRET, "short")])),
            Err(ConfigError::WeakSecret(_))
        ));
    }

    #[test]
    fn malformed_values_are_rejected() {
        for (var, value) in [
            (ENV_ADDR, "not-an-address"),
            (ENV_ALLOW_REGISTRATION, "maybe"),
            (ENV_PBKDF2_ITERATIONS, "0"),
            (ENV_PBKDF2_ITERATIONS, "lots"),
        ] {
            let result = ServerConfig::from_lookup(lookup(&[(ENV_TOKEN_SECRET, SECRET), (var, value)]));
            assert!(
                matches!(result, Err(ConfigError::InvalidValue { .. })),
                "{var}={value} accepted"
            );
        }
    }

    #[test]
    fn debug_output_hides_secret() {
        let config = ServerConfig::from_lookup(lookup(&[(ENV_TOKEN_SECRET, SECRET)])).unwrap();
        assert!(!format!("{config:?}").contains(SECRET));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, env!("CARGO_PKG_VERSION"));
    }
}

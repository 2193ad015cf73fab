use std::env;
use std::path::PathBuf;
use thiserror::Error;

use crate::models::address::WorkerAddress;
use crate::models::role::Role;

const DEFAULT_TOLERANCE_SECS: i64 = 5;
const DEFAULT_CALL_TIMEOUT_SECS: u64 = 5;
const DEFAULT_DEADLINE_SECS: u64 = 30;
const DEFAULT_IDENTITY: &str = "assemble_key";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Everything the core consumes from the environment. CLI flags may
/// override individual fields after loading.
#[derive(Debug, Clone)]
pub struct Config {
    pub role: Role,
    pub password: String,
    pub workers: Vec<WorkerAddress>,
    pub tolerance_secs: i64,
    pub min_fragments: Option<usize>,
    pub call_timeout_secs: u64,
    pub deadline_secs: u64,
    pub key_dir: PathBuf,
    pub identity: String,
}

impl Config {
    /// Reads `SCATTER_*` variables. `SCATTER_PASSWORD` is required;
    /// everything else has a default. The worker list is a comma-separated
    /// ordered list of addresses.
    pub fn from_env() -> Result<Self, ConfigError> {
        let password =
            env::var("SCATTER_PASSWORD").map_err(|_| ConfigError::Missing("SCATTER_PASSWORD"))?;
        let role = match env::var("SCATTER_ROLE") {
            Ok(raw) => raw.parse::<Role>().map_err(|reason| ConfigError::Invalid {
                var: "SCATTER_ROLE",
                reason,
            })?,
            Err(_) => Role::Distributor,
        };
        let workers = env::var("SCATTER_WORKERS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(WorkerAddress::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Config {
            role,
            password,
            workers,
            tolerance_secs: parse_var("SCATTER_TOLERANCE_SECS", DEFAULT_TOLERANCE_SECS)?,
            min_fragments: match env::var("SCATTER_MIN_FRAGMENTS") {
                Ok(raw) => Some(raw.parse().map_err(|_| ConfigError::Invalid {
                    var: "SCATTER_MIN_FRAGMENTS",
                    reason: format!("`{}` is not a count", raw),
                })?),
                Err(_) => None,
            },
            call_timeout_secs: parse_var("SCATTER_CALL_TIMEOUT_SECS", DEFAULT_CALL_TIMEOUT_SECS)?,
            deadline_secs: parse_var("SCATTER_DEADLINE_SECS", DEFAULT_DEADLINE_SECS)?,
            key_dir: env::var("SCATTER_KEY_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("keys")),
            identity: env::var("SCATTER_IDENTITY").unwrap_or_else(|_| DEFAULT_IDENTITY.to_string()),
        })
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            var,
            reason: format!("`{}` is not a number", raw),
        }),
        Err(_) => Ok(default),
    }
}

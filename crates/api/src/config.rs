//! Startup configuration, read once from the environment.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use thiserror::Error;

use pennywise_infra::CorruptStatePolicy;

pub const ENV_BIND: &str = "PENNYWISE_BIND";
pub const ENV_STATE_FILE: &str = "PENNYWISE_STATE_FILE";
pub const ENV_USERS_FILE: &str = "PENNYWISE_USERS_FILE";
pub const ENV_LOG_DIR: &str = "PENNYWISE_LOG_DIR";
pub const ENV_ON_CORRUPT_STATE: &str = "PENNYWISE_ON_CORRUPT_STATE";

const DEFAULT_BIND: &str = "0.0.0.0:8910";
const DEFAULT_STATE_FILE: &str = "budget.dat";
const DEFAULT_USERS_FILE: &str = "users";
const DEFAULT_LOG_DIR: &str = "/var/log/budget";

const TRANSACTION_LOG: &str = "transactions.csv";
const UNAUTHORIZED_LOG: &str = "unauthorized.log";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("PENNYWISE_BIND={value:?} is not a socket address: {source}")]
    InvalidBind {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("PENNYWISE_ON_CORRUPT_STATE={0:?} must be one of: fail, start-empty")]
    InvalidCorruptStatePolicy(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind: SocketAddr,
    pub state_file: PathBuf,
    pub users_file: PathBuf,
    pub log_dir: PathBuf,
    pub on_corrupt_state: CorruptStatePolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (tests inject a map here).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let bind_raw = get(ENV_BIND, DEFAULT_BIND);
        let bind = bind_raw
            .parse()
            .map_err(|source| ConfigError::InvalidBind {
                value: bind_raw.clone(),
                source,
            })?;

        let on_corrupt_state = match lookup(ENV_ON_CORRUPT_STATE).as_deref() {
            None | Some("fail") => CorruptStatePolicy::Fail,
            Some("start-empty") => CorruptStatePolicy::StartEmpty,
            Some(other) => return Err(ConfigError::InvalidCorruptStatePolicy(other.to_string())),
        };

        Ok(Self {
            bind,
            state_file: get(ENV_STATE_FILE, DEFAULT_STATE_FILE).into(),
            users_file: get(ENV_USERS_FILE, DEFAULT_USERS_FILE).into(),
            log_dir: get(ENV_LOG_DIR, DEFAULT_LOG_DIR).into(),
            on_corrupt_state,
        })
    }

    pub fn transaction_log_path(&self) -> PathBuf {
        self.log_dir.join(TRANSACTION_LOG)
    }

    pub fn unauthorized_log_path(&self) -> PathBuf {
        self.log_dir.join(UNAUTHORIZED_LOG)
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}

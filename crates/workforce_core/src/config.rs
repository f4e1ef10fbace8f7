//! Runtime configuration.
//!
//! Values come from the process environment (`WORKFORCE_*` keys) or from
//! any lookup function, so tests never touch global state.

use crate::logging::{default_log_level, normalize_level};
use crate::model::entity::ActorId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DATABASE_PATH_KEY: &str = "WORKFORCE_DATABASE_PATH";
pub const ATTACHMENTS_ROOT_KEY: &str = "WORKFORCE_ATTACHMENTS_ROOT";
pub const LOG_LEVEL_KEY: &str = "WORKFORCE_LOG_LEVEL";
pub const LOG_DIR_KEY: &str = "WORKFORCE_LOG_DIR";
pub const ACTOR_ID_KEY: &str = "WORKFORCE_ACTOR_ID";

const DEFAULT_ATTACHMENTS_ROOT: &str = "wwwroot/files";
const DEFAULT_ACTOR_ID: ActorId = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    pub database_path: PathBuf,
    /// Root under which attachment folders are created.
    pub attachments_root: PathBuf,
    pub log_level: String,
    /// File logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    /// Actor stamped on writes made by this process.
    pub actor: ActorId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(key) => write!(f, "missing required setting `{key}`"),
            Self::Invalid { key, value, reason } => {
                write!(f, "invalid value `{value}` for `{key}`: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

impl CoreConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let database_path = get(DATABASE_PATH_KEY)
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing(DATABASE_PATH_KEY))?;

        let attachments_root = get(ATTACHMENTS_ROOT_KEY)
            .map_or_else(|| PathBuf::from(DEFAULT_ATTACHMENTS_ROOT), PathBuf::from);

        let log_level = match get(LOG_LEVEL_KEY) {
            Some(value) => normalize_level(&value)
                .map_err(|reason| ConfigError::Invalid {
                    key: LOG_LEVEL_KEY,
                    value,
                    reason,
                })?
                .to_string(),
            None => default_log_level().to_string(),
        };

        let log_dir = get(LOG_DIR_KEY).map(PathBuf::from);

        let actor = match get(ACTOR_ID_KEY) {
            Some(value) => value.parse::<ActorId>().map_err(|err| ConfigError::Invalid {
                key: ACTOR_ID_KEY,
                reason: err.to_string(),
                value,
            })?,
            None => DEFAULT_ACTOR_ID,
        };

        Ok(Self {
            database_path,
            attachments_root,
            log_level,
            log_dir,
            actor,
        })
    }
}

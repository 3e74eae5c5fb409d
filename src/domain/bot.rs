//! Bot identity record and run status.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Fields;
use crate::storage::StorageError;

/// Keys that belong to the identity record and never end up in a bot config.
pub const IDENTITY_FIELDS: [&str; 6] = ["id", "name", "pair", "exchange", "strategy", "status"];

/// BotStatus is the run status of a bot.
///
/// The store keeps `BotInfo::status` as a plain string, so values outside
/// this enum survive a round-trip untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BotStatus {
    Stopped,
    Running,
}

impl BotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BotStatus::Stopped => "stopped",
            BotStatus::Running => "running",
        }
    }
}

impl std::fmt::Display for BotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BotStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stopped" => Ok(BotStatus::Stopped),
            "running" => Ok(BotStatus::Running),
            _ => Err(format!("Unknown bot status: {}", s)),
        }
    }
}

/// BotInfo is the identity record stored under `bots[id]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotInfo {
    /// Caller-supplied unique identifier.
    pub id: String,
    /// Human-readable bot name.
    pub name: String,
    /// Trading pair (e.g., "BTC/USDT").
    pub pair: String,
    /// Strategy the bot runs.
    pub strategy: String,
    /// Exchange the bot trades on.
    pub exchange: String,
    /// Run status, usually "stopped" or "running".
    pub status: String,
    /// Fields written by other tools. Kept as-is across status updates.
    #[serde(flatten)]
    pub extra: Fields,
}

impl BotInfo {
    /// Splits a registration payload into an identity record and a config.
    ///
    /// `id`, `name`, `pair`, `exchange` and `strategy` are required string
    /// fields. The status is always reset to "stopped", and a supplied
    /// `status` key is discarded rather than copied into the config.
    pub fn split_registration(payload: &Fields) -> Result<(BotInfo, Fields), StorageError> {
        let bot = BotInfo {
            id: required_str(payload, "id")?,
            name: required_str(payload, "name")?,
            pair: required_str(payload, "pair")?,
            strategy: required_str(payload, "strategy")?,
            exchange: required_str(payload, "exchange")?,
            status: BotStatus::Stopped.as_str().to_string(),
            extra: Fields::new(),
        };

        let config = payload
            .iter()
            .filter(|(key, _)| !IDENTITY_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok((bot, config))
    }

    /// Returns true if the bot is marked as running.
    pub fn is_running(&self) -> bool {
        self.status == BotStatus::Running.as_str()
    }
}

fn required_str(payload: &Fields, field: &str) -> Result<String, StorageError> {
    match payload.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(StorageError::Validation(format!(
            "field {} must be a string, got {}",
            field, other
        ))),
        None => Err(StorageError::Validation(format!(
            "missing required field: {}",
            field
        ))),
    }
}

//! Storage interfaces and implementations for persisting trading bots.

mod document;
mod file;

pub use document::StorageDocument;
pub use file::{FileBotStorage, LOCK_FILENAME, STORAGE_FILENAME};

use crate::domain::{BotInfo, BotRecord, Fields};
use async_trait::async_trait;

/// BotStorage defines the interface for storing bot identities, configs and states.
///
/// Every bot id present in storage owns exactly one identity record, one
/// config map and one state map. Implementations create, update and delete
/// the three together.
#[async_trait]
pub trait BotStorage: Send + Sync {
    /// Registers a bot from a combined identity + config payload.
    ///
    /// The status is always reset to "stopped" and the state starts empty.
    /// Registering an existing id replaces all three fragments.
    /// Returns the bot id.
    async fn put_bot(&self, payload: &Fields) -> Result<String, StorageError>;

    /// Returns the identity, config and state stored for `id`.
    async fn get_bot_by_id(&self, id: &str) -> Result<BotRecord, StorageError>;

    /// Returns the first running bot, in stored order, trading `pair` on `exchange`.
    async fn get_active_bot_by_exchange_and_pair(
        &self,
        exchange: &str,
        pair: &str,
    ) -> Result<Option<BotRecord>, StorageError>;

    /// Returns all identity records in stored order.
    async fn get_bots_list(&self) -> Result<Vec<BotInfo>, StorageError>;

    /// Removes the identity, config and state of `id`.
    async fn delete_bot(&self, id: &str) -> Result<(), StorageError>;

    /// Shallow-merges `patch` into the bot's state.
    async fn update_bot_state(&self, id: &str, patch: &Fields) -> Result<(), StorageError>;

    /// Shallow-merges `patch` into the bot's config.
    async fn update_bot_config(&self, id: &str, patch: &Fields) -> Result<(), StorageError>;

    /// Replaces the status of the bot's identity record.
    async fn update_bot_status(&self, id: &str, status: &str) -> Result<(), StorageError>;

    /// Releases the storage. Later calls fail with `StorageError::Closed`.
    async fn close(&self) -> Result<(), StorageError>;
}

/// StorageError represents errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to initialize storage at {path}: {source}")]
    Init {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt document {path}: {reason}")]
    CorruptDocument { path: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage is closed")]
    Closed,
}

impl StorageError {
    /// Returns true for lookups of a bot id that does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }

    /// Returns true for rejected registration payloads.
    pub fn is_validation(&self) -> bool {
        matches!(self, StorageError::Validation(_))
    }
}

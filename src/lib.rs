//! Persistence layer for trading-bot metadata.
//!
//! Each bot is stored as three fragments under one identifier: an identity
//! record, a configuration map and a runtime state map. All of them live in a
//! single JSON document that is rewritten in full on every mutation.

pub mod config;
pub mod domain;
pub mod storage;

pub use domain::{BotInfo, BotRecord, BotStatus, Fields};
pub use storage::{BotStorage, FileBotStorage, StorageError};

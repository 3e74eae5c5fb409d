//! Storage configuration.

use serde::Deserialize;

/// Bot storage settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the storage document. Created on first use.
    #[serde(default)]
    pub dir: String,
}

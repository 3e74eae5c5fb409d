//! Tool identity and logging settings.

use serde::Deserialize;

/// Settings for the storage tool itself.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Name attached to error logs.
    pub name: String,
    /// Default tracing level when `RUST_LOG` is unset: "trace" through "error".
    pub log_level: Option<String>,
}

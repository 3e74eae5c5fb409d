//! Combined bot record returned by lookups.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::BotInfo;

/// Open-ended key-value data used for bot configs and runtime states.
///
/// Keys keep their insertion order, both in memory and on disk.
pub type Fields = Map<String, Value>;

/// BotRecord bundles the identity, config and state stored for one bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotRecord {
    /// Identity and status record.
    pub bot: BotInfo,
    /// Bot configuration without the identity fields.
    pub config: Fields,
    /// Mutable runtime state.
    pub state: Fields,
}

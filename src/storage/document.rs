//! The persisted storage document and its in-memory operations.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{BotInfo, BotRecord, Fields};
use crate::storage::StorageError;

/// StorageDocument holds the three collections keyed by bot id.
///
/// On disk it is a JSON object with exactly the `bots`, `configs` and
/// `states` keys. Bots keep the order they were first registered in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageDocument {
    #[serde(with = "bots_map")]
    pub bots: Vec<BotInfo>,
    pub configs: Fields,
    pub states: Fields,
}

impl StorageDocument {
    /// Parses a document and checks that every config and state entry is an object.
    ///
    /// `path` is only used to describe failures.
    pub fn from_json(path: &str, json: &str) -> Result<Self, StorageError> {
        let document: StorageDocument =
            serde_json::from_str(json).map_err(|e| StorageError::CorruptDocument {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        for (collection, entries) in [("configs", &document.configs), ("states", &document.states)] {
            if let Some((id, _)) = entries.iter().find(|(_, value)| !value.is_object()) {
                return Err(StorageError::CorruptDocument {
                    path: path.to_string(),
                    reason: format!("{}[{}] is not an object", collection, id),
                });
            }
        }

        Ok(document)
    }

    /// Serializes the document as pretty-printed JSON (2-space indent).
    pub fn to_json(&self) -> Result<String, StorageError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Returns the identity record for `id`.
    pub fn bot(&self, id: &str) -> Option<&BotInfo> {
        self.bots.iter().find(|bot| bot.id == id)
    }

    fn bot_mut(&mut self, id: &str) -> Option<&mut BotInfo> {
        self.bots.iter_mut().find(|bot| bot.id == id)
    }

    /// Resolves the full record for `id`. Missing config or state reads as empty.
    pub fn record(&self, id: &str) -> Result<BotRecord, StorageError> {
        let bot = self.bot(id).ok_or_else(|| bot_not_found(id))?;

        Ok(BotRecord {
            bot: bot.clone(),
            config: object_or_empty(self.configs.get(id)),
            state: object_or_empty(self.states.get(id)),
        })
    }

    /// Returns the first running bot matching `exchange` and `pair`, in stored order.
    pub fn active_bot(&self, exchange: &str, pair: &str) -> Option<&BotInfo> {
        self.bots
            .iter()
            .find(|bot| bot.exchange == exchange && bot.pair == pair && bot.is_running())
    }

    /// Writes all three fragments for a bot, replacing any existing ones in place.
    pub fn insert_bot(&mut self, bot: BotInfo, config: Fields) {
        let id = bot.id.clone();

        match self.bot_mut(&id) {
            Some(existing) => *existing = bot,
            None => self.bots.push(bot),
        }
        self.configs.insert(id.clone(), Value::Object(config));
        self.states.insert(id, Value::Object(Fields::new()));
    }

    /// Removes all three fragments for `id`.
    ///
    /// Nothing is touched unless `id` exists in `bots`.
    pub fn remove_bot(&mut self, id: &str) -> Result<(), StorageError> {
        let index = self
            .bots
            .iter()
            .position(|bot| bot.id == id)
            .ok_or_else(|| bot_not_found(id))?;

        self.bots.remove(index);
        self.configs.shift_remove(id);
        self.states.shift_remove(id);
        Ok(())
    }

    /// Shallow-merges `patch` into the state of `id`.
    pub fn merge_state(&mut self, id: &str, patch: &Fields) -> Result<(), StorageError> {
        if self.bot(id).is_none() {
            return Err(bot_not_found(id));
        }

        let state = self
            .states
            .entry(id.to_string())
            .or_insert_with(|| Value::Object(Fields::new()));
        merge_into(state, patch);
        Ok(())
    }

    /// Shallow-merges `patch` into the config of `id`.
    ///
    /// Fails when no config entry exists, even if the identity record does.
    pub fn merge_config(&mut self, id: &str, patch: &Fields) -> Result<(), StorageError> {
        let config = self
            .configs
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(format!("config for bot {}", id)))?;
        merge_into(config, patch);
        Ok(())
    }

    /// Replaces the status of `id`, leaving the other identity fields untouched.
    pub fn set_status(&mut self, id: &str, status: &str) -> Result<(), StorageError> {
        let bot = self.bot_mut(id).ok_or_else(|| bot_not_found(id))?;
        bot.status = status.to_string();
        Ok(())
    }
}

fn bot_not_found(id: &str) -> StorageError {
    StorageError::NotFound(format!("bot {}", id))
}

fn object_or_empty(value: Option<&Value>) -> Fields {
    value.and_then(Value::as_object).cloned().unwrap_or_default()
}

fn merge_into(target: &mut Value, patch: &Fields) {
    if !target.is_object() {
        *target = Value::Object(Fields::new());
    }
    if let Value::Object(fields) = target {
        for (key, value) in patch {
            fields.insert(key.clone(), value.clone());
        }
    }
}

/// Serde adapter storing the bot list as a JSON object keyed by bot id.
mod bots_map {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::domain::{BotInfo, Fields};

    pub fn serialize<S>(bots: &[BotInfo], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(bots.iter().map(|bot| (&bot.id, bot)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<BotInfo>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries = Fields::deserialize(deserializer)?;

        entries
            .into_iter()
            .map(|(key, value)| {
                let bot = BotInfo::deserialize(value)
                    .map_err(|e| D::Error::custom(format!("bots[{}]: {}", key, e)))?;
                if bot.id != key {
                    return Err(D::Error::custom(format!(
                        "bots[{}] holds a record with id {}",
                        key, bot.id
                    )));
                }
                Ok(bot)
            })
            .collect()
    }
}

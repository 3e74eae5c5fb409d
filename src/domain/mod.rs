//! Domain models for stored trading bots.

mod bot;
mod record;

pub use bot::{BotInfo, BotStatus, IDENTITY_FIELDS};
pub use record::{BotRecord, Fields};

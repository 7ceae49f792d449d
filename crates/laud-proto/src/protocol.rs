use serde::{Deserialize, Serialize};

/// Topic raised once the user session has been established.
pub const TOPIC_LOGIN: &str = "login";
/// Topic raised after the engine acknowledged a seek.
pub const TOPIC_SEEK: &str = "seek";

/// Messages carried on the global message bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum BusMessage {
    Login,
    /// Listen-along collaborators follow the new position.
    Seek { position_ms: u64 },
}

impl BusMessage {
    pub fn topic(&self) -> &'static str {
        match self {
            BusMessage::Login => TOPIC_LOGIN,
            BusMessage::Seek { .. } => TOPIC_SEEK,
        }
    }
}

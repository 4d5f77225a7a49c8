use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use quickretro_types::envelope::Envelope;
use quickretro_types::models::Message;

use crate::error::StoreResult;

/// Publish/subscribe channel keyed by board id.
///
/// The mutating process always publishes, including to itself; local sockets
/// only ever receive what a subscription delivers.
#[async_trait]
pub trait Bridge: Send + Sync {
    async fn publish(&self, channel: &str, payload: String) -> StoreResult<()>;

    async fn subscribe(&self, channel: &str) -> StoreResult<()>;

    async fn unsubscribe(&self, channel: &str) -> StoreResult<()>;
}

/// One message received on a subscribed channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub channel: String,
    pub payload: String,
}

/// What travels over the bridge: the stamped envelope plus the entity the
/// handler mutated, when there is one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    pub event: Envelope,
    #[serde(default)]
    pub message: Option<Message>,
}

impl Publication {
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn decode(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }
}

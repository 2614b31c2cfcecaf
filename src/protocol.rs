//! JSON messages exchanged over the websocket.

use serde::{Deserialize, Serialize};

use crate::arcade::ModelKind;
use crate::input::RawInput;
use crate::vehicle::VehicleSnapshot;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Held control states, sampled by the server once per tick.
    Input(RawInput),
    Ping,
    /// Respawn the sender's vehicle with another physics style.
    SelectModel { model: ModelKind },
}

impl ClientMessage {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage<'a> {
    Welcome { player_id: &'a str, model: ModelKind },
    Rejected { reason: &'a str },
    Pong,
    Snapshot { tick: u64, vehicles: &'a [VehicleSnapshot] },
}

impl ServerMessage<'_> {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

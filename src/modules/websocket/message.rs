/// WebSocket message protocol
///
/// Every frame is a JSON object tagged by `type` (camelCase).
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from the client to the server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Subscribe to a trade room
    #[serde(rename_all = "camelCase")]
    JoinRoom { room_id: Uuid },

    #[serde(rename_all = "camelCase")]
    LeaveRoom { room_id: Uuid },

    /// Post a chat message to a trade room
    #[serde(rename_all = "camelCase")]
    SendMessage { room_id: Uuid, content: String },

    /// Direct message to another user
    #[serde(rename_all = "camelCase")]
    PrivateMessage { recipient_id: Uuid, content: String },

    Ping,
}

/// Messages sent from the server to the client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Handshake accepted
    #[serde(rename_all = "camelCase")]
    Connected { user_id: Uuid },

    #[serde(rename_all = "camelCase")]
    RoomJoined { room_id: Uuid },

    #[serde(rename_all = "camelCase")]
    RoomLeft { room_id: Uuid },

    /// New chat message in a trade room
    #[serde(rename_all = "camelCase")]
    NewMessage { room_id: Uuid, message: serde_json::Value },

    #[serde(rename_all = "camelCase")]
    PrivateMessage { message: serde_json::Value },

    #[serde(rename_all = "camelCase")]
    Notification { notification: serde_json::Value },

    /// A trade changed status
    #[serde(rename_all = "camelCase")]
    TradeUpdated { trade_id: Uuid, status: String, updated_by: Uuid },

    Pong,

    #[serde(rename_all = "camelCase")]
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error { message: message.into() }
    }
}

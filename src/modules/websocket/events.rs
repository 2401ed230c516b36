/// Messages exchanged between session actors and the server actor.
use actix::prelude::*;
use uuid::Uuid;

use super::message::ServerMessage;

/// An authenticated session came up
#[derive(Message)]
#[rtype(result = "()")]
pub struct Connect {
    pub id: Uuid,
    pub user_id: Uuid,
    pub addr: Recipient<ServerMessage>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub id: Uuid,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct JoinRoom {
    pub user_id: Uuid,
    pub room_id: Uuid,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct LeaveRoom {
    pub user_id: Uuid,
    pub room_id: Uuid,
}

#[derive(Message, Clone)]
#[rtype(result = "()")]
pub struct BroadcastToRoom {
    pub room_id: Uuid,
    pub message: ServerMessage,
    /// Do not deliver to this user (usually the sender)
    pub skip_user_id: Option<Uuid>,
}

/// Deliver to every session of one user
#[derive(Message, Clone)]
#[rtype(result = "()")]
pub struct SendToUser {
    pub user_id: Uuid,
    pub message: ServerMessage,
}

#[derive(Message, Clone)]
#[rtype(result = "()")]
pub struct SendToUsers {
    pub user_ids: Vec<Uuid>,
    pub message: ServerMessage,
}

#[derive(Message)]
#[rtype(result = "Vec<Uuid>")]
pub struct GetOnlineUsers;

/// WebSocket server actor
///
/// Owns every live session and the room membership tables. Each user has an
/// implicit private room made of all their sessions, so one account can be
/// connected from several devices.
use actix::prelude::*;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use super::events::*;
use super::message::ServerMessage;

#[derive(Default)]
pub struct WebSocketServer {
    /// session_id -> session
    sessions: HashMap<Uuid, Recipient<ServerMessage>>,

    /// session_id -> user_id
    session_users: HashMap<Uuid, Uuid>,

    /// user_id -> session_ids
    users: HashMap<Uuid, HashSet<Uuid>>,

    /// room_id (trade id) -> user_ids
    rooms: HashMap<Uuid, HashSet<Uuid>>,
}

impl WebSocketServer {
    pub fn new() -> Self {
        Self::default()
    }

    fn send_to_session(&self, session_id: &Uuid, message: ServerMessage) {
        if let Some(recipient) = self.sessions.get(session_id) {
            recipient.do_send(message);
        }
    }

    /// Returns how many sessions the message went to.
    fn send_to_user(&self, user_id: &Uuid, message: &ServerMessage) -> usize {
        match self.users.get(user_id) {
            Some(session_ids) => {
                for session_id in session_ids {
                    self.send_to_session(session_id, message.clone());
                }
                session_ids.len()
            }
            None => 0,
        }
    }
}

impl Actor for WebSocketServer {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("WebSocket server started");
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("WebSocket server stopped");
    }
}

impl Handler<Connect> for WebSocketServer {
    type Result = ();

    fn handle(&mut self, msg: Connect, _: &mut Context<Self>) {
        self.sessions.insert(msg.id, msg.addr);
        self.session_users.insert(msg.id, msg.user_id);
        let sessions = self.users.entry(msg.user_id).or_default();
        sessions.insert(msg.id);

        tracing::info!("User {} connected ({} active session(s))", msg.user_id, sessions.len());
    }
}

impl Handler<Disconnect> for WebSocketServer {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, _: &mut Context<Self>) {
        self.sessions.remove(&msg.id);
        let Some(user_id) = self.session_users.remove(&msg.id) else {
            return;
        };

        let last_session = match self.users.get_mut(&user_id) {
            Some(sessions) => {
                sessions.remove(&msg.id);
                sessions.is_empty()
            }
            None => false,
        };

        if last_session {
            self.users.remove(&user_id);
            for room_users in self.rooms.values_mut() {
                room_users.remove(&user_id);
            }
            self.rooms.retain(|_, users| !users.is_empty());
            tracing::info!("User {} fully disconnected and removed from all rooms", user_id);
        } else {
            tracing::debug!("Session {} of user {} disconnected", msg.id, user_id);
        }
    }
}

impl Handler<JoinRoom> for WebSocketServer {
    type Result = ();

    fn handle(&mut self, msg: JoinRoom, _: &mut Context<Self>) {
        let room = self.rooms.entry(msg.room_id).or_default();
        room.insert(msg.user_id);
        tracing::debug!(
            "User {} joined room {} ({} users in room)",
            msg.user_id,
            msg.room_id,
            room.len()
        );
    }
}

impl Handler<LeaveRoom> for WebSocketServer {
    type Result = ();

    fn handle(&mut self, msg: LeaveRoom, _: &mut Context<Self>) {
        if let Some(room) = self.rooms.get_mut(&msg.room_id) {
            room.remove(&msg.user_id);
            if room.is_empty() {
                self.rooms.remove(&msg.room_id);
            }
        }
    }
}

impl Handler<BroadcastToRoom> for WebSocketServer {
    type Result = ();

    fn handle(&mut self, msg: BroadcastToRoom, _: &mut Context<Self>) {
        let Some(room_users) = self.rooms.get(&msg.room_id) else {
            tracing::debug!("Broadcast to empty room {}", msg.room_id);
            return;
        };

        let sent: usize = room_users
            .iter()
            .filter(|user_id| Some(**user_id) != msg.skip_user_id)
            .map(|user_id| self.send_to_user(user_id, &msg.message))
            .sum();

        tracing::debug!("Broadcast to room {}: {} sessions", msg.room_id, sent);
    }
}

impl Handler<SendToUser> for WebSocketServer {
    type Result = ();

    fn handle(&mut self, msg: SendToUser, _: &mut Context<Self>) {
        let sent = self.send_to_user(&msg.user_id, &msg.message);
        if sent == 0 {
            tracing::debug!("User {} not online, message dropped", msg.user_id);
        }
    }
}

impl Handler<SendToUsers> for WebSocketServer {
    type Result = ();

    fn handle(&mut self, msg: SendToUsers, _: &mut Context<Self>) {
        let sent: usize =
            msg.user_ids.iter().map(|user_id| self.send_to_user(user_id, &msg.message)).sum();
        tracing::debug!("Sent message to {} users ({} sessions)", msg.user_ids.len(), sent);
    }
}

impl Handler<GetOnlineUsers> for WebSocketServer {
    type Result = Vec<Uuid>;

    fn handle(&mut self, _: GetOnlineUsers, _: &mut Context<Self>) -> Self::Result {
        self.users.keys().copied().collect()
    }
}

impl Message for ServerMessage {
    type Result = ();
}

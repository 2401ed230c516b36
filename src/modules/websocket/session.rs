/// WebSocket session actor
///
/// One actor per connection. The user is known from the handshake, so every
/// client message is handled on behalf of `user_id`. Outbound frames go through
/// an mpsc channel drained by the handler task. Database work runs with
/// `ctx.spawn()` + `into_actor()`.
use actix::prelude::*;
use actix_web::web;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::modules::chat::handle::ChatSvc;

use super::events::*;
use super::message::{ClientMessage, ServerMessage};
use super::server::WebSocketServer;

pub struct WebSocketSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub server: Addr<WebSocketServer>,
    /// JSON frames for the client
    pub tx: mpsc::UnboundedSender<String>,
    pub chat_service: web::Data<ChatSvc>,
}

fn send_json(tx: &mpsc::UnboundedSender<String>, session_id: Uuid, msg: &ServerMessage) {
    match serde_json::to_string(msg) {
        Ok(json) => {
            if let Err(e) = tx.send(json) {
                tracing::error!("Failed to queue frame for session {}: {}", session_id, e);
            }
        }
        Err(e) => tracing::error!("Failed to serialize ServerMessage (session {}): {}", session_id, e),
    }
}

impl WebSocketSession {
    pub fn new(
        user_id: Uuid,
        server: Addr<WebSocketServer>,
        tx: mpsc::UnboundedSender<String>,
        chat_service: web::Data<ChatSvc>,
    ) -> Self {
        Self { id: Uuid::now_v7(), user_id, server, tx, chat_service }
    }

    fn send_to_client(&self, msg: &ServerMessage) {
        send_json(&self.tx, self.id, msg);
    }

    fn handle_client_message(&mut self, msg: ClientMessage, ctx: &mut Context<Self>) {
        match msg {
            ClientMessage::JoinRoom { room_id } => self.handle_join_room(room_id, ctx),
            ClientMessage::LeaveRoom { room_id } => {
                self.server.do_send(LeaveRoom { user_id: self.user_id, room_id });
                self.send_to_client(&ServerMessage::RoomLeft { room_id });
            }
            ClientMessage::SendMessage { room_id, content } => {
                self.handle_room_message(room_id, content, ctx)
            }
            ClientMessage::PrivateMessage { recipient_id, content } => {
                self.handle_private_message(recipient_id, content, ctx)
            }
            ClientMessage::Ping => self.send_to_client(&ServerMessage::Pong),
        }
    }

    fn handle_join_room(&self, room_id: Uuid, ctx: &mut Context<Self>) {
        let service = self.chat_service.clone();
        let server = self.server.clone();
        let tx = self.tx.clone();
        let (session_id, user_id) = (self.id, self.user_id);

        ctx.spawn(
            async move {
                let reply = match service.can_access_room(user_id, room_id).await {
                    Ok(true) => {
                        server.do_send(JoinRoom { user_id, room_id });
                        tracing::debug!("User {} joined room {}", user_id, room_id);
                        ServerMessage::RoomJoined { room_id }
                    }
                    Ok(false) => ServerMessage::error("You cannot join this room"),
                    Err(e) => {
                        tracing::error!("Room check failed (session {}): {}", session_id, e);
                        ServerMessage::error("Could not join room")
                    }
                };
                send_json(&tx, session_id, &reply);
            }
            .into_actor(self),
        );
    }

    fn handle_room_message(&self, room_id: Uuid, content: String, ctx: &mut Context<Self>) {
        let service = self.chat_service.clone();
        let server = self.server.clone();
        let tx = self.tx.clone();
        let (session_id, user_id) = (self.id, self.user_id);

        ctx.spawn(
            async move {
                match service.send_room_message(user_id, room_id, &content).await {
                    Ok(message) => match serde_json::to_value(&message) {
                        Ok(value) => server.do_send(BroadcastToRoom {
                            room_id,
                            message: ServerMessage::NewMessage { room_id, message: value },
                            skip_user_id: None,
                        }),
                        Err(e) => tracing::error!("Failed to serialize chat message: {}", e),
                    },
                    Err(e) => {
                        tracing::warn!("Room message rejected (session {}): {}", session_id, e);
                        send_json(&tx, session_id, &ServerMessage::error(client_error(&e)));
                    }
                }
            }
            .into_actor(self),
        );
    }

    fn handle_private_message(&self, recipient_id: Uuid, content: String, ctx: &mut Context<Self>) {
        let service = self.chat_service.clone();
        let server = self.server.clone();
        let tx = self.tx.clone();
        let (session_id, user_id) = (self.id, self.user_id);

        ctx.spawn(
            async move {
                match service.send_private_message(user_id, recipient_id, &content).await {
                    Ok(message) => match serde_json::to_value(&message) {
                        // echo to the sender's other devices as well
                        Ok(value) => server.do_send(SendToUsers {
                            user_ids: vec![recipient_id, user_id],
                            message: ServerMessage::PrivateMessage { message: value },
                        }),
                        Err(e) => tracing::error!("Failed to serialize chat message: {}", e),
                    },
                    Err(e) => {
                        tracing::warn!("Private message rejected (session {}): {}", session_id, e);
                        send_json(&tx, session_id, &ServerMessage::error(client_error(&e)));
                    }
                }
            }
            .into_actor(self),
        );
    }
}

/// Client-safe text for a failed chat operation.
fn client_error(e: &crate::api::error::SystemError) -> String {
    use crate::api::error::SystemError;
    match e {
        SystemError::BadRequest(msg)
        | SystemError::Forbidden(msg)
        | SystemError::NotFound(msg) => msg.to_string(),
        _ => "Could not send message".to_string(),
    }
}

impl Actor for WebSocketSession {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::debug!("WebSocket session {} started for user {}", self.id, self.user_id);
        self.server.do_send(Connect {
            id: self.id,
            user_id: self.user_id,
            addr: ctx.address().recipient(),
        });
        self.send_to_client(&ServerMessage::Connected { user_id: self.user_id });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::debug!("WebSocket session {} stopped", self.id);
        self.server.do_send(Disconnect { id: self.id });
    }
}

impl Message for ClientMessage {
    type Result = ();
}

impl Handler<ClientMessage> for WebSocketSession {
    type Result = ();

    fn handle(&mut self, msg: ClientMessage, ctx: &mut Context<Self>) {
        self.handle_client_message(msg, ctx);
    }
}

impl Handler<ServerMessage> for WebSocketSession {
    type Result = ();

    fn handle(&mut self, msg: ServerMessage, _ctx: &mut Context<Self>) {
        self.send_to_client(&msg);
    }
}

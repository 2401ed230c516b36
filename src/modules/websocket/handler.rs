/// WebSocket HTTP handler
///
/// Authenticates the upgrade request, then bridges frames in both directions:
/// - inbound:  client -> WebSocket -> ClientMessage -> session actor
/// - outbound: server actor -> session actor -> mpsc channel -> WebSocket -> client
use actix::{Actor, Addr};
use actix_web::{Error, HttpRequest, HttpResponse, web};
use actix_ws::Message;
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::message::ClientMessage;
use super::server::WebSocketServer;
use super::session::WebSocketSession;
use crate::ENV;
use crate::api::error;
use crate::middlewares::bearer_token;
use crate::modules::chat::handle::ChatSvc;
use crate::utils::Claims;

#[derive(Deserialize)]
struct WsAuthQuery {
    token: Option<String>,
}

/// Access token from the `Authorization` header, or the `token` query parameter
/// for clients that cannot set headers on the upgrade request.
fn handshake_token(req: &HttpRequest) -> Option<String> {
    if let Some(token) = bearer_token(req) {
        return Some(token.to_owned());
    }
    web::Query::<WsAuthQuery>::from_query(req.query_string())
        .ok()
        .and_then(|q| q.into_inner().token)
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty())
}

fn authenticate(req: &HttpRequest) -> Result<Uuid, error::Error> {
    let token =
        handshake_token(req).ok_or_else(|| error::Error::unauthorized("Missing access token"))?;
    let claims = Claims::decode(&token, ENV.jwt_secret.as_ref())
        .map_err(|_| error::Error::unauthorized("Token Invalid or Expired"))?;
    if !claims.is_access_token() {
        return Err(error::Error::unauthorized("Access token required"));
    }
    Ok(claims.sub)
}

/// GET /ws
pub async fn websocket_handler(
    req: HttpRequest,
    stream: web::Payload,
    server: web::Data<Addr<WebSocketServer>>,
    chat_service: web::Data<ChatSvc>,
) -> Result<HttpResponse, Error> {
    let user_id = authenticate(&req).inspect_err(|_| {
        tracing::debug!("Rejected WebSocket upgrade from {:?}", req.peer_addr());
    })?;

    let (response, mut ws_session, mut msg_stream) = actix_ws::handle(&req, stream)?;

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let addr = WebSocketSession::new(user_id, server.get_ref().clone(), tx, chat_service).start();

    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                msg = msg_stream.recv() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<ClientMessage>(&text) {
                                Ok(client_msg) => addr.do_send(client_msg),
                                Err(e) => {
                                    tracing::warn!(
                                        "Unparseable client message: {} - raw: {}",
                                        e,
                                        text.chars().take(100).collect::<String>()
                                    );
                                }
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if let Err(e) = ws_session.pong(&data).await {
                                tracing::error!("Failed to send pong: {}", e);
                                break;
                            }
                        }
                        Some(Ok(Message::Pong(_))) => {}
                        Some(Ok(Message::Close(reason))) => {
                            tracing::info!("WebSocket close frame: {:?}", reason);
                            break;
                        }
                        Some(Ok(Message::Binary(_))) => {
                            tracing::warn!("Binary frames are not supported");
                        }
                        Some(Ok(Message::Continuation(_) | Message::Nop)) => {}
                        Some(Err(e)) => {
                            tracing::error!("WebSocket protocol error: {}", e);
                            break;
                        }
                        None => break,
                    }
                }

                Some(json) = rx.recv() => {
                    if ws_session.text(json).await.is_err() {
                        tracing::error!("Failed to write to WebSocket client");
                        break;
                    }
                }
            }
        }

        // stopping the actor unregisters the session from the server
        addr.do_send(StopSession);
        let _ = ws_session.close(None).await;
        tracing::debug!("WebSocket loop for user {} finished", user_id);
    });

    tracing::info!("WebSocket connection established for user {}", user_id);
    Ok(response)
}

#[derive(actix::Message)]
#[rtype(result = "()")]
pub struct StopSession;

impl actix::Handler<StopSession> for WebSocketSession {
    type Result = ();

    fn handle(&mut self, _: StopSession, ctx: &mut Self::Context) {
        use actix::ActorContext;
        ctx.stop();
    }
}

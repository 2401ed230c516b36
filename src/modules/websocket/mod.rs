/// Realtime delivery over WebSocket
///
/// - message: the JSON protocol (ClientMessage / ServerMessage)
/// - server: actor owning sessions, per-user rooms and trade rooms
/// - session: one actor per connection
/// - handler: authenticated HTTP upgrade
pub mod events;
pub mod handler;
pub mod message;
pub mod server;
pub mod session;

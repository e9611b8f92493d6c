//! Realtime gateway: one `ChatServer` actor holding rooms and presence, and a
//! `ChatSession` actor per WebSocket connection.

mod event;
mod presence;
mod room;
mod server;
mod session;

pub use event::{
    ClientEvent, DeliveryStatus, IncomingMessage, MessageRef, RoomRef, ServerEvent, TypingSignal,
};
pub use presence::{PresenceChange, PresenceTable};
pub use room::{ConnectionId, RoomId, Rooms};
pub use server::{
    Broadcast, ChatServer, Connect, Deliver, Disconnect, JoinRoom, LeaveRoom, OnlineUsers,
    PublishMessage,
};
pub use session::{chat_websocket, ChatSession};

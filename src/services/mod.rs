pub mod chat;

pub use chat::{ChatService, SendMessage};

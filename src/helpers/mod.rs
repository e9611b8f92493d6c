pub(crate) mod json;
pub mod session;

pub(crate) use json::*;
pub use session::{decode_session_token, encode_session_token, SessionClaims};

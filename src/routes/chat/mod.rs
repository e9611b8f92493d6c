mod contacts;
mod conversation;
mod message;
mod presence;
mod validate;

pub use contacts::*;
pub use conversation::*;
pub use message::*;
pub use presence::*;
pub use validate::*;

use crate::errors::ChatError;

fn invalid_form(errors: serde_valid::validation::Errors) -> ChatError {
    let msg = format!("Invalid data received: {errors}");
    tracing::debug!(msg);
    ChatError::validation(msg)
}

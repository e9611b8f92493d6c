use crate::errors::ChatError;
use crate::models::Identity;
use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};
use std::sync::Arc;

/// Handlers take `Identity` to require an authenticated caller.
impl FromRequest for Identity {
    type Error = ChatError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let identity = req
            .extensions()
            .get::<Arc<Identity>>()
            .map(|identity| identity.as_ref().clone())
            .ok_or(ChatError::AuthenticationRequired);
        ready(identity)
    }
}

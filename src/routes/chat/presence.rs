use crate::errors::ChatError;
use crate::helpers::JsonResponse;
use crate::models::Identity;
use crate::realtime::{ChatServer, OnlineUsers};
use actix::Addr;
use actix_web::{get, web, Responder, Result};

/// GET /chat/online
/// Users with at least one live realtime connection.
#[tracing::instrument(name = "List online users.", skip(server))]
#[get("/online")]
pub async fn list_online(
    identity: Identity,
    server: web::Data<Addr<ChatServer>>,
) -> Result<impl Responder> {
    let online = server.send(OnlineUsers).await.map_err(|err| {
        tracing::error!("Chat server unreachable: {:?}", err);
        ChatError::RealtimeUnavailable
    })?;
    Ok(JsonResponse::build().set_list(online).ok("OK"))
}

use super::invalid_form;
use crate::forms;
use crate::helpers::JsonResponse;
use crate::models::Identity;
use crate::services::ChatService;
use actix_web::{get, post, web, Responder, Result};
use serde_valid::Validate;

/// GET /chat/conversations
/// Conversations of the caller, most recent activity first.
#[tracing::instrument(name = "List conversations.", skip(service))]
#[get("/conversations")]
pub async fn list_conversations(
    identity: Identity,
    service: web::Data<ChatService>,
) -> Result<impl Responder> {
    let conversations = service.list_conversations(&identity).await?;
    Ok(JsonResponse::build().set_list(conversations).ok("OK"))
}

/// POST /chat/conversations
/// Returns the existing conversation with the counterpart or creates it.
#[tracing::instrument(name = "Open conversation.", skip(service))]
#[post("/conversations")]
pub async fn open_conversation(
    identity: Identity,
    form: web::Json<forms::CreateConversation>,
    service: web::Data<ChatService>,
) -> Result<impl Responder> {
    form.validate().map_err(invalid_form)?;

    let conversation = service
        .open_conversation(&identity, &form.counterpart_id)
        .await?;
    Ok(JsonResponse::build().set_item(conversation).ok("OK"))
}

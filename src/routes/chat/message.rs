use super::invalid_form;
use crate::forms;
use crate::helpers::JsonResponse;
use crate::models::Identity;
use crate::realtime::{Broadcast, ChatServer, PublishMessage, RoomId, ServerEvent};
use crate::services::ChatService;
use actix::Addr;
use actix_web::{get, post, put, web, Responder, Result};
use serde_json::json;
use serde_valid::Validate;
use uuid::Uuid;

/// GET /chat/messages/{conversation_id}
#[tracing::instrument(name = "Get messages.", skip(service))]
#[get("/messages/{conversation_id}")]
pub async fn list_messages(
    identity: Identity,
    path: web::Path<(Uuid,)>,
    service: web::Data<ChatService>,
) -> Result<impl Responder> {
    let (conversation_id,) = path.into_inner();
    let messages = service.list_messages(&identity, conversation_id).await?;
    Ok(JsonResponse::build().set_list(messages).ok("OK"))
}

/// POST /chat/messages
/// Persists the message, then pushes it and its delivery status to sockets
/// joined to the conversation.
#[tracing::instrument(name = "Send message.", skip(form, service, server))]
#[post("/messages")]
pub async fn send_message(
    identity: Identity,
    form: web::Json<forms::SendMessageForm>,
    service: web::Data<ChatService>,
    server: web::Data<Addr<ChatServer>>,
) -> Result<impl Responder> {
    form.validate().map_err(invalid_form)?;

    let view = service
        .send_message(&identity, form.into_inner().into())
        .await?;

    server.do_send(PublishMessage { view: view.clone() });

    Ok(JsonResponse::build().set_item(view).created("Message sent"))
}

/// PUT /chat/messages/read/{conversation_id}
/// Marks messages addressed to the caller as read and resets the unread counter.
#[tracing::instrument(name = "Mark messages read.", skip(service, server))]
#[put("/messages/read/{conversation_id}")]
pub async fn mark_read(
    identity: Identity,
    path: web::Path<(Uuid,)>,
    service: web::Data<ChatService>,
    server: web::Data<Addr<ChatServer>>,
) -> Result<impl Responder> {
    let (conversation_id,) = path.into_inner();
    let updated = service.mark_read(&identity, conversation_id).await?;

    server.do_send(Broadcast {
        room: RoomId::from(conversation_id),
        event: ServerEvent::MessagesRead {
            conversation_id,
            reader_id: identity.user_id.clone(),
        },
        exclude_user: Some(identity.user_id.clone()),
    });

    Ok(JsonResponse::build()
        .set_item(json!({ "updated": updated }))
        .ok("OK"))
}

/// PUT /chat/messages/{conversation_id}/read/{message_id}
#[tracing::instrument(name = "Mark message read.", skip(service, server))]
#[put("/messages/{conversation_id}/read/{message_id}")]
pub async fn mark_message_read(
    identity: Identity,
    path: web::Path<(Uuid, Uuid)>,
    service: web::Data<ChatService>,
    server: web::Data<Addr<ChatServer>>,
) -> Result<impl Responder> {
    let (conversation_id, message_id) = path.into_inner();
    let updated = service
        .mark_message_read(&identity, conversation_id, message_id)
        .await?;

    if updated {
        server.do_send(Broadcast {
            room: RoomId::from(conversation_id),
            event: ServerEvent::MessageRead {
                conversation_id,
                message_id,
                reader_id: identity.user_id.clone(),
            },
            exclude_user: Some(identity.user_id.clone()),
        });
    }

    Ok(JsonResponse::build()
        .set_item(json!({ "updated": updated }))
        .ok("OK"))
}

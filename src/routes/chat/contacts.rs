use crate::helpers::JsonResponse;
use crate::models::Identity;
use crate::services::ChatService;
use actix_web::{get, web, Responder, Result};

/// GET /chat/contacts
#[tracing::instrument(name = "List contacts.", skip(service))]
#[get("/contacts")]
pub async fn list_contacts(
    identity: Identity,
    service: web::Data<ChatService>,
) -> Result<impl Responder> {
    let contacts = service.contacts(&identity).await?;
    Ok(JsonResponse::build().set_list(contacts).ok("OK"))
}

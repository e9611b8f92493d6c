use super::invalid_form;
use crate::forms;
use crate::helpers::JsonResponse;
use crate::models::Identity;
use crate::services::ChatService;
use actix_web::{post, web, Responder, Result};
use serde_json::json;
use serde_valid::Validate;

/// POST /chat/validate
/// Whether the caller may start a conversation with the participant.
#[tracing::instrument(name = "Validate participant.", skip(service))]
#[post("/validate")]
pub async fn validate_participant(
    identity: Identity,
    form: web::Json<forms::ValidateParticipant>,
    service: web::Data<ChatService>,
) -> Result<impl Responder> {
    form.validate().map_err(invalid_form)?;

    let valid = service
        .validate_counterpart(&identity, &form.participant_id)
        .await?;
    Ok(JsonResponse::build()
        .set_item(json!({ "valid": valid }))
        .ok("OK"))
}

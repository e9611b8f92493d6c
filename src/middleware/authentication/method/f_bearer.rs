use crate::helpers::session::extract_bearer_token;
use crate::middleware::authentication::get_header;
use actix_web::dev::ServiceRequest;

#[tracing::instrument(name = "Authenticate with bearer token", skip(req))]
pub fn try_bearer(req: &mut ServiceRequest) -> Result<bool, String> {
    let authorization = match get_header::<String>(req, "authorization")? {
        Some(value) => value,
        None => return Ok(false),
    };

    // other schemes are not ours to judge; fall through to the next method
    let token = match extract_bearer_token(&authorization) {
        Some(token) => token.to_string(),
        None => return Ok(false),
    };

    super::attach_identity(req, &token)?;
    Ok(true)
}

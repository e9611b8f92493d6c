mod f_anonym;
mod f_bearer;
mod f_cookie;

pub use f_anonym::anonym;
pub use f_bearer::try_bearer;
pub use f_cookie::try_cookie;

use crate::configuration::Settings;
use crate::helpers::session::decode_session_token;
use crate::models::Identity;
use actix_web::{dev::ServiceRequest, web, HttpMessage};
use std::sync::Arc;

/// Verify `token` against the configured secret and attach the identity.
fn attach_identity(req: &mut ServiceRequest, token: &str) -> Result<(), String> {
    let settings = req
        .app_data::<web::Data<Settings>>()
        .ok_or_else(|| "settings are not configured".to_string())?;
    let claims = decode_session_token(token, &settings.session.secret)?;
    let identity: Identity = claims.identity();

    tracing::debug!(user = %identity.user_id, role = %identity.role, "Session verified");
    if req.extensions_mut().insert(Arc::new(identity)).is_some() {
        return Err("user already logged".to_string());
    }

    Ok(())
}

use crate::configuration::Settings;
use crate::helpers::session::cookie_value;
use crate::middleware::authentication::get_header;
use actix_web::{dev::ServiceRequest, web};

#[tracing::instrument(name = "Authenticate with cookie", skip(req))]
pub fn try_cookie(req: &mut ServiceRequest) -> Result<bool, String> {
    let cookies = match get_header::<String>(req, "cookie")? {
        Some(value) => value,
        None => return Ok(false),
    };

    let cookie_name = req
        .app_data::<web::Data<Settings>>()
        .map(|settings| settings.session.cookie_name.clone())
        .unwrap_or_else(|| "token".to_string());

    let token = match cookie_value(&cookies, &cookie_name) {
        Some(token) => token.to_string(),
        None => return Ok(false),
    };

    tracing::debug!("Found session token in cookies");
    super::attach_identity(req, &token)?;
    Ok(true)
}

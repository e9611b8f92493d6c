use crate::services::ChatService;
use actix_web::{get, web, HttpResponse};

/// Liveness plus a store ping; 503 while the store is unreachable.
#[get("")]
pub async fn health_check(service: web::Data<ChatService>) -> HttpResponse {
    match service.store().ping().await {
        Ok(()) => HttpResponse::Ok().finish(),
        Err(err) => {
            tracing::error!("Health check failed: {}", err);
            HttpResponse::ServiceUnavailable().finish()
        }
    }
}

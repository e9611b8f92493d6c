use crate::configuration::Settings;
use crate::errors::ChatError;
use crate::middleware;
use crate::realtime::{self, ChatServer};
use crate::routes;
use crate::services::ChatService;
use actix::Actor;
use actix_cors::Cors;
use actix_web::{dev::Server, error, web, App, HttpServer};
use std::net::TcpListener;
use tracing_actix_web::TracingLogger;

pub async fn run(
    listener: TcpListener,
    service: ChatService,
    settings: Settings,
) -> Result<Server, std::io::Error> {
    let chat_server = ChatServer::new(service.directory().clone()).start();
    let chat_server = web::Data::new(chat_server);

    let service = web::Data::new(service);
    let settings = web::Data::new(settings);

    let json_config = web::JsonConfig::default().error_handler(|err, _req| {
        let msg = match &err {
            error::JsonPayloadError::Deserialize(err) => format!(
                "Invalid JSON at line {}, column {}: {}",
                err.line(),
                err.column(),
                err
            ),
            _ => err.to_string(),
        };
        tracing::debug!("Rejected request body: {}", msg);
        ChatError::validation(msg).into()
    });

    let path_config = web::PathConfig::default().error_handler(|err, req| {
        tracing::debug!("Rejected path {}: {}", req.path(), err);
        ChatError::validation(format!("Invalid path: {err}")).into()
    });

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(middleware::authentication::Manager::new())
            .wrap(Cors::permissive())
            .service(web::scope("/health_check").service(routes::health_check))
            .service(
                web::scope("/chat")
                    .service(routes::chat::list_conversations)
                    .service(routes::chat::open_conversation)
                    .service(routes::chat::list_messages)
                    .service(routes::chat::send_message)
                    .service(routes::chat::mark_read)
                    .service(routes::chat::mark_message_read)
                    .service(routes::chat::validate_participant)
                    .service(routes::chat::list_contacts)
                    .service(routes::chat::list_online)
                    .service(web::resource("/ws").route(web::get().to(realtime::chat_websocket))),
            )
            .app_data(json_config.clone())
            .app_data(path_config.clone())
            .app_data(service.clone())
            .app_data(chat_server.clone())
            .app_data(settings.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}

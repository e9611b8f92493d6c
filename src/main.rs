use anyhow::Context;
use counsel_chat::configuration::{get_configuration, StoreBackend};
use counsel_chat::connectors;
use counsel_chat::db::{ChatStore, InMemoryChatStore, PgChatStore};
use counsel_chat::services::ChatService;
use counsel_chat::startup::run;
use counsel_chat::telemetry::{get_subscriber, init_subscriber};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber("counsel-chat".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber);

    let settings = get_configuration().context("Failed to read configuration")?;

    let store: Arc<dyn ChatStore> = match settings.store.backend {
        StoreBackend::Postgres => {
            tracing::info!(
                db_host = %settings.database.host,
                db_port = settings.database.port,
                db_name = %settings.database.database_name,
                "Connecting to PostgreSQL"
            );

            let connect_options = PgConnectOptions::new()
                .host(&settings.database.host)
                .port(settings.database.port)
                .username(&settings.database.username)
                .password(&settings.database.password)
                .database(&settings.database.database_name)
                .ssl_mode(PgSslMode::Prefer);

            let pg_pool = PgPoolOptions::new()
                .max_connections(settings.database.max_connections)
                .acquire_timeout(Duration::from_secs(30))
                .connect_with(connect_options)
                .await
                .context("Failed to connect to database")?;

            let store = PgChatStore::new(pg_pool);
            store.migrate().await.context("Failed to run migrations")?;
            Arc::new(store)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory chat store, history is lost on restart");
            Arc::new(InMemoryChatStore::new())
        }
    };

    let directory = connectors::init_user_directory(&settings.connectors);
    let service = ChatService::new(store, directory);

    let address = format!("{}:{}", settings.app_host, settings.app_port);
    tracing::info!("Start server at {:?}", &address);
    let listener =
        TcpListener::bind(&address).with_context(|| format!("failed to bind to {address}"))?;

    run(listener, service, settings).await?.await?;
    Ok(())
}

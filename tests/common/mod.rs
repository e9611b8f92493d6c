#![allow(dead_code)]

use counsel_chat::configuration::{get_configuration, DatabaseSettings, Settings, StoreBackend};
use counsel_chat::connectors::StaticUserDirectory;
use counsel_chat::db::{ChatStore, InMemoryChatStore, PgChatStore};
use counsel_chat::models::{Role, User};
use counsel_chat::services::ChatService;
use serde_json::Value;
use sqlx::{Connection, Executor, PgConnection, PgPool};
use std::net::TcpListener;
use std::sync::Arc;

pub const TEST_SECRET: &str = "integration-test-secret";

pub struct TestApp {
    pub address: String,
    pub ws_address: String,
    pub service: ChatService,
}

impl TestApp {
    pub fn token(&self, user_id: &str, role: Role) -> String {
        encode_token(user_id, role)
    }

    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::new()
    }

    pub async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client()
            .get(format!("{}{}", self.address, path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client()
            .post(format!("{}{}", self.address, path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn put(&self, path: &str, token: &str) -> reqwest::Response {
        self.client()
            .put(format!("{}{}", self.address, path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Opens the conversation between two seeded users and returns its id.
    pub async fn open_conversation(&self, token: &str, counterpart_id: &str) -> String {
        let response = self
            .post(
                "/chat/conversations",
                token,
                serde_json::json!({ "counterpartId": counterpart_id }),
            )
            .await;
        assert_eq!(200, response.status().as_u16());
        let body: Value = response.json().await.unwrap();
        body["item"]["id"].as_str().unwrap().to_string()
    }
}

pub fn encode_token(user_id: &str, role: Role) -> String {
    let claims = counsel_chat::helpers::SessionClaims::new(user_id, role, 3600);
    counsel_chat::helpers::encode_session_token(&claims, TEST_SECRET).expect("Failed to sign token")
}

pub fn seeded_users() -> Vec<User> {
    [
        ("client-ana", "Ana Client", Role::Client),
        ("client-ben", "Ben Client", Role::Client),
        ("lawyer-lee", "Lee Lawyer", Role::Lawyer),
        ("lawyer-mia", "Mia Lawyer", Role::Lawyer),
    ]
    .into_iter()
    .map(|(id, name, role)| User {
        id: id.to_string(),
        name: name.to_string(),
        role,
        picture: None,
        specialization: None,
        online: false,
    })
    .collect()
}

fn test_configuration() -> Settings {
    let mut configuration = get_configuration().expect("Failed to get configuration");
    configuration.session.secret = TEST_SECRET.to_string();
    configuration.app_port = 0;
    configuration
}

async fn spawn_with_store(configuration: Settings, store: Arc<dyn ChatStore>) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let directory = Arc::new(StaticUserDirectory::new(seeded_users()));
    let service = ChatService::new(store, directory);

    let server = counsel_chat::startup::run(listener, service.clone(), configuration)
        .await
        .expect("Failed to bind address.");
    actix_web::rt::spawn(server);

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        ws_address: format!("ws://127.0.0.1:{}/chat/ws", port),
        service,
    }
}

/// Server backed by the in-memory store and a seeded directory.
pub async fn spawn_app() -> TestApp {
    let mut configuration = test_configuration();
    configuration.store.backend = StoreBackend::Memory;
    spawn_with_store(configuration, Arc::new(InMemoryChatStore::new())).await
}

/// Server backed by a fresh PostgreSQL database, or None when postgres is unreachable.
pub async fn spawn_app_with_postgres() -> Option<TestApp> {
    let mut configuration = test_configuration();
    configuration.database.database_name = uuid::Uuid::new_v4().to_string();

    let pool = match configure_database(&configuration.database).await {
        Ok(pool) => pool,
        Err(err) => {
            eprintln!("Skipping tests: failed to connect to postgres: {}", err);
            return None;
        }
    };

    Some(spawn_with_store(configuration, Arc::new(PgChatStore::new(pool))).await)
}

pub async fn configure_database(config: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    let mut connection = PgConnection::connect(&config.connection_string_without_db()).await?;

    connection
        .execute(format!(r#"CREATE DATABASE "{}""#, config.database_name).as_str())
        .await?;

    let connection_pool = PgPool::connect(&config.connection_string()).await?;

    sqlx::migrate!("./migrations").run(&connection_pool).await?;

    Ok(connection_pool)
}

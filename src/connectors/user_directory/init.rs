use std::sync::Arc;

use crate::connectors::config::ConnectorConfig;
use crate::connectors::user_directory::{StaticUserDirectory, UserDirectory, UserDirectoryClient};

/// Initialize the user directory connector from Settings
///
/// The HTTP client is used when enabled; otherwise the static directory,
/// seeded from `seed_file` when one is configured and readable.
pub fn init(connector_config: &ConnectorConfig) -> Arc<dyn UserDirectory> {
    let config = connector_config.user_directory.clone().unwrap_or_default();

    if config.enabled {
        let mut config = config.clone();
        // Load auth token from environment if not set in config
        if config.auth_token.is_none() {
            config.auth_token = std::env::var("USER_DIRECTORY_AUTH_TOKEN").ok();
        }
        tracing::info!("Initializing user directory connector: {}", config.base_url);
        match UserDirectoryClient::new(config) {
            Ok(client) => return Arc::new(client),
            Err(err) => tracing::error!("User directory client unavailable: {}", err),
        }
    }

    tracing::warn!("User directory connector disabled - using static directory");
    match config.seed_file.as_deref() {
        Some(path) => match StaticUserDirectory::from_file(path) {
            Ok(directory) => Arc::new(directory),
            Err(err) => {
                tracing::warn!("Could not seed static directory: {}", err);
                Arc::new(StaticUserDirectory::empty())
            }
        },
        None => Arc::new(StaticUserDirectory::empty()),
    }
}

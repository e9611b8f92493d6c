use serde::{Deserialize, Serialize};

/// Configuration for external service connectors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    pub user_directory: Option<UserDirectoryConfig>,
}

/// User Directory connector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDirectoryConfig {
    /// Enable/disable the HTTP directory; when disabled the static directory is used
    pub enabled: bool,
    /// Base URL for the directory API (e.g., http://localhost:4100/api/users)
    pub base_url: String,
    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
    /// JSON file seeding the static directory
    #[serde(default)]
    pub seed_file: Option<String>,
    /// Bearer token for inter-service authentication (from env: USER_DIRECTORY_AUTH_TOKEN)
    #[serde(skip)]
    pub auth_token: Option<String>,
}

impl Default for UserDirectoryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "http://localhost:4100/api/users".to_string(),
            timeout_secs: 10,
            seed_file: None,
            auth_token: None,
        }
    }
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            user_directory: Some(UserDirectoryConfig::default()),
        }
    }
}

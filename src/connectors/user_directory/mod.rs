mod init;
mod static_directory;

pub use init::init;
pub use static_directory::StaticUserDirectory;

use super::config::UserDirectoryConfig;
use super::errors::ConnectorError;
use crate::models::{Role, User};
use reqwest::StatusCode;
use tracing::Instrument;

/// Trait for the external user directory.
/// Allows mocking in tests and swapping implementations
#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolve a user by id; `Ok(None)` when the directory does not know it
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, ConnectorError>;

    /// All users holding `role`, used for counterpart lists
    async fn list_by_role(&self, role: Role) -> Result<Vec<User>, ConnectorError>;

    /// Best-effort presence flag on the user record
    async fn set_online(&self, user_id: &str, online: bool) -> Result<(), ConnectorError>;
}

/// HTTP-based directory client
pub struct UserDirectoryClient {
    base_url: String,
    http_client: reqwest::Client,
    auth_token: Option<String>,
}

impl UserDirectoryClient {
    pub fn new(config: UserDirectoryConfig) -> Result<Self, ConnectorError> {
        let timeout = std::time::Duration::from_secs(config.timeout_secs);
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ConnectorError::Internal(format!("http client: {err}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http_client,
            auth_token: config.auth_token,
        })
    }

    /// Build authorization header if token configured
    fn auth_header(&self) -> Option<String> {
        self.auth_token
            .as_ref()
            .map(|token| format!("Bearer {}", token))
    }

    /// `{base_url}/{user_id}[/{suffix}]` with the id pushed as a single path segment.
    /// Ids that could leave the users collection are rejected before any request.
    fn user_url(
        &self,
        user_id: &str,
        suffix: Option<&str>,
    ) -> Result<reqwest::Url, ConnectorError> {
        if !is_plain_segment(user_id) {
            return Err(ConnectorError::NotFound(format!("invalid user id {user_id:?}")));
        }
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|err| ConnectorError::Internal(format!("base url: {err}")))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ConnectorError::Internal("base url cannot carry a path".to_string()))?;
            segments.pop_if_empty().push(user_id);
            if let Some(suffix) = suffix {
                segments.push(suffix);
            }
        }
        Ok(url)
    }

    fn request(&self, method: reqwest::Method, url: reqwest::Url) -> reqwest::RequestBuilder {
        let req = self.http_client.request(method, url);
        match self.auth_header() {
            Some(auth) => req.header("Authorization", auth),
            None => req,
        }
    }
}

#[async_trait::async_trait]
impl UserDirectory for UserDirectoryClient {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, ConnectorError> {
        let span = tracing::info_span!("user_directory_get_user", user_id = %user_id);
        let url = match self.user_url(user_id, None) {
            Ok(url) => url,
            Err(ConnectorError::NotFound(reason)) => {
                tracing::warn!("Refusing directory lookup: {}", reason);
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let resp = self
            .request(reqwest::Method::GET, url)
            .send()
            .instrument(span)
            .await?;

        match resp.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ConnectorError::Unauthorized(format!(
                    "directory refused lookup of {user_id}"
                )))
            }
            status if !status.is_success() => {
                return Err(ConnectorError::HttpError(format!(
                    "directory returned {status} for {user_id}"
                )))
            }
            _ => {}
        }

        let text = resp
            .text()
            .await
            .map_err(|e| ConnectorError::HttpError(e.to_string()))?;
        let user = serde_json::from_str::<User>(&text)
            .map_err(|_| ConnectorError::InvalidResponse(text))?;
        if user.id != user_id {
            return Err(ConnectorError::InvalidResponse(format!(
                "asked for {user_id}, directory answered with {}",
                user.id
            )));
        }
        Ok(Some(user))
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<User>, ConnectorError> {
        let span = tracing::info_span!("user_directory_list_by_role", role = %role);
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|err| ConnectorError::Internal(format!("base url: {err}")))?;
        url.query_pairs_mut().append_pair("role", role.as_str());

        let resp = self
            .request(reqwest::Method::GET, url)
            .send()
            .instrument(span)
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| {
                tracing::error!("list_by_role error: {:?}", e);
                ConnectorError::from(e)
            })?;

        let text = resp
            .text()
            .await
            .map_err(|e| ConnectorError::HttpError(e.to_string()))?;
        let mut users = serde_json::from_str::<Vec<User>>(&text)
            .map_err(|_| ConnectorError::InvalidResponse(text))?;
        // the directory is not trusted to filter
        users.retain(|u| u.role == role);
        Ok(users)
    }

    async fn set_online(&self, user_id: &str, online: bool) -> Result<(), ConnectorError> {
        let span = tracing::info_span!("user_directory_set_online", user_id = %user_id, online);
        let url = self.user_url(user_id, Some("presence"))?;

        self.request(reqwest::Method::PATCH, url)
            .json(&serde_json::json!({ "online": online }))
            .send()
            .instrument(span)
            .await
            .and_then(|resp| resp.error_for_status())
            .map(|_| ())
            .map_err(|e| {
                tracing::warn!("set_online error: {:?}", e);
                ConnectorError::from(e)
            })
    }
}

fn is_plain_segment(user_id: &str) -> bool {
    !user_id.is_empty()
        && !user_id.contains("..")
        && !user_id.contains(['/', '\\', '?', '#'])
}

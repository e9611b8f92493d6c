use super::UserDirectory;
use crate::connectors::errors::ConnectorError;
use crate::models::{Role, User};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;

/// In-process directory seeded from a fixed user list. Used for local runs and tests.
pub struct StaticUserDirectory {
    users: RwLock<HashMap<String, User>>,
}

impl StaticUserDirectory {
    pub fn new(users: Vec<User>) -> Self {
        let users = users.into_iter().map(|u| (u.id.clone(), u)).collect();
        Self {
            users: RwLock::new(users),
        }
    }

    pub fn empty() -> Self {
        Self::new(vec![])
    }

    /// Read a JSON array of users
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConnectorError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| {
            ConnectorError::Internal(format!("cannot read {}: {}", path.display(), err))
        })?;
        let users: Vec<User> = serde_json::from_str(&raw)
            .map_err(|err| ConnectorError::InvalidResponse(format!("{}: {}", path.display(), err)))?;
        Ok(Self::new(users))
    }

    pub async fn insert(&self, user: User) {
        self.users.write().await.insert(user.id.clone(), user);
    }
}

#[async_trait::async_trait]
impl UserDirectory for StaticUserDirectory {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, ConnectorError> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<User>, ConnectorError> {
        let mut users: Vec<User> = self
            .users
            .read()
            .await
            .values()
            .filter(|u| u.role == role)
            .cloned()
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn set_online(&self, user_id: &str, online: bool) -> Result<(), ConnectorError> {
        if let Some(user) = self.users.write().await.get_mut(user_id) {
            user.online = online;
        }
        Ok(())
    }
}

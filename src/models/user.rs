use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Marketplace role; fixed per identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Lawyer,
}

impl Role {
    /// Clients talk to lawyers and lawyers talk to clients.
    pub fn counterpart(self) -> Role {
        match self {
            Role::Client => Role::Lawyer,
            Role::Lawyer => Role::Client,
        }
    }

    pub fn can_converse_with(self, other: Role) -> bool {
        self.counterpart() == other
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Lawyer => "lawyer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Role::Client),
            "lawyer" => Ok(Role::Lawyer),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Directory record. Owned by the external user directory and referenced by id here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    #[serde(default)]
    pub online: bool,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            name: Some(self.name.clone()),
            role: Some(self.role),
            picture: self.picture.clone(),
        }
    }
}

/// What conversation and message views embed about a participant.
///
/// Only `id` is guaranteed; the rest is absent when the directory does not know the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

impl UserSummary {
    pub fn unresolved(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: None,
            role: None,
            picture: None,
        }
    }
}

/// The authenticated caller, decoded from the session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_cross_role_pairs_may_converse() {
        assert!(Role::Client.can_converse_with(Role::Lawyer));
        assert!(Role::Lawyer.can_converse_with(Role::Client));
        assert!(!Role::Client.can_converse_with(Role::Client));
        assert!(!Role::Lawyer.can_converse_with(Role::Lawyer));
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("Lawyer".parse::<Role>().unwrap(), Role::Lawyer);
        assert_eq!(" client ".parse::<Role>().unwrap(), Role::Client);
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn directory_record_deserializes_without_optional_fields() {
        let user: User =
            serde_json::from_str(r#"{"id":"u1","name":"Ana","role":"client"}"#).unwrap();
        assert_eq!(user.role, Role::Client);
        assert!(user.picture.is_none());
        assert!(!user.online);

        let summary = user.summary();
        assert_eq!(summary.name.as_deref(), Some("Ana"));
    }
}

//! Caller identity and roles

use serde::{Deserialize, Serialize};
use std::fmt;

const ANONYMOUS: &str = "anonymous";

/// Opaque caller identity supplied by the external identity provider
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    /// Wrap an identity; blank input maps to the anonymous principal
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.trim().is_empty() {
            Self::anonymous()
        } else {
            Self(value.trim().to_string())
        }
    }

    /// The unauthenticated caller. Always a guest.
    pub fn anonymous() -> Self {
        Self(ANONYMOUS.to_string())
    }

    pub fn is_anonymous(&self) -> bool {
        self.0 == ANONYMOUS
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// System-level role, ordered by privilege
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum SystemRole {
    #[default]
    Guest,
    User,
    Admin,
}

impl std::str::FromStr for SystemRole {
    type Err = crate::LibraryError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "guest" => Ok(Self::Guest),
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(crate::LibraryError::InvalidInput(format!(
                "unknown role '{}'",
                other
            ))),
        }
    }
}

/// Two independent axes: system role and authorship.
/// An admin may also be an author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub system_role: SystemRole,
    pub is_author: bool,
}

impl Role {
    pub const GUEST: Role = Role {
        system_role: SystemRole::Guest,
        is_author: false,
    };

    pub fn at_least(&self, required: SystemRole) -> bool {
        self.system_role >= required
    }

    pub fn is_admin(&self) -> bool {
        self.system_role == SystemRole::Admin
    }
}

/// Self-managed profile data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,

    /// Mirrors the authorship axis of the role; ignored on save
    #[serde(default)]
    pub is_author: bool,
}

/// A registered principal with its role and profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub principal: Principal,
    pub name: String,
    pub role: Role,
}

impl UserAccount {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            name: self.name.clone(),
            is_author: self.role.is_author,
        }
    }
}

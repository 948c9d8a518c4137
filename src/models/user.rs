use serde::{Deserialize, Serialize};

use crate::entities::users;

/// Account role. Moderators may edit or delete any review/comment; admins
/// additionally manage the catalog and user accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "moderator" => Some(Self::Moderator),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The identity performing a request. Core operations take the actor as an
/// explicit argument rather than reading ambient request state, so the
/// permission rules are testable without an HTTP harness.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: i32,
    pub username: String,
    pub role: Role,
    pub is_superuser: bool,
}

impl Actor {
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin) || self.is_superuser
    }

    #[must_use]
    pub const fn is_moderator(&self) -> bool {
        matches!(self.role, Role::Moderator)
    }
}

impl From<&users::Model> for Actor {
    fn from(model: &users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username.clone(),
            // Unknown role strings demote to the base role rather than panic.
            role: Role::parse(&model.role).unwrap_or_default(),
            is_superuser: model.is_superuser,
        }
    }
}

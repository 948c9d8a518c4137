//! Role and ownership rules as pure decision functions.
//!
//! Every rule takes the acting identity explicitly and returns an [`Access`]
//! verdict; HTTP handlers translate `Unauthenticated` and `Forbidden` into
//! 401/403 responses. Nothing here reads request state or touches storage.

use crate::models::user::Actor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    Delete,
}

impl Action {
    #[must_use]
    pub const fn is_read(self) -> bool {
        matches!(self, Self::List | Self::Retrieve)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    /// No credentials were presented for an action that needs them.
    Unauthenticated,
    /// Credentials are fine but role/ownership is insufficient.
    Forbidden,
}

impl Access {
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Category, genre, and title writes are reserved for admins; reads are
/// open to everyone, anonymous actors included.
#[must_use]
pub fn evaluate_catalog(actor: Option<&Actor>, action: Action) -> Access {
    if action.is_read() {
        return Access::Allow;
    }
    match actor {
        None => Access::Unauthenticated,
        Some(actor) if actor.is_admin() => Access::Allow,
        Some(_) => Access::Forbidden,
    }
}

/// Reviews and comments: reads are open, creation needs any authenticated
/// actor, and mutation is limited to the author, moderators, and admins.
#[must_use]
pub fn evaluate_content(actor: Option<&Actor>, action: Action, author_id: i32) -> Access {
    if action.is_read() {
        return Access::Allow;
    }

    let Some(actor) = actor else {
        return Access::Unauthenticated;
    };

    match action {
        Action::Create => Access::Allow,
        _ => {
            if actor.id == author_id || actor.is_moderator() || actor.is_admin() {
                Access::Allow
            } else {
                Access::Forbidden
            }
        }
    }
}

/// Administrative user management is admin-only, reads included.
#[must_use]
pub fn evaluate_user_admin(actor: Option<&Actor>) -> Access {
    match actor {
        None => Access::Unauthenticated,
        Some(actor) if actor.is_admin() => Access::Allow,
        Some(_) => Access::Forbidden,
    }
}

/// Whether a self-service profile update may change the role field.
/// Non-admin actors have the field silently discarded, so self-elevation
/// is impossible.
#[must_use]
pub fn may_change_role(actor: &Actor) -> bool {
    actor.is_admin()
}

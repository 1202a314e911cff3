use std::collections::BTreeSet;

use serde::Serialize;
use utoipa::ToSchema;

use crate::squad::PlayerId;

/// Role granted to an authenticated user by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// May validate match sheets, close ratings, and record statistics.
    Captain,
    /// May edit any player profile.
    Admin,
}

impl Role {
    /// Parse a role name, ignoring case and surrounding whitespace.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "captain" => Some(Role::Captain),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Who is performing an operation. Passed explicitly to every guarded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContext {
    pub user_id: PlayerId,
    pub roles: BTreeSet<Role>,
}

impl ActorContext {
    pub fn new(user_id: impl Into<PlayerId>, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            user_id: user_id.into(),
            roles: roles.into_iter().collect(),
        }
    }

    /// Actor holding the captain role.
    pub fn captain(user_id: impl Into<PlayerId>) -> Self {
        Self::new(user_id, [Role::Captain])
    }

    /// Actor without any role.
    pub fn member(user_id: impl Into<PlayerId>) -> Self {
        Self::new(user_id, [])
    }

    /// Build a context from the raw `X-User-Id` / `X-User-Roles` values.
    ///
    /// Returns `None` when the user id is missing or blank. Unknown roles are ignored.
    pub fn from_raw(user_id: Option<&str>, roles: Option<&str>) -> Option<Self> {
        let user_id = user_id.map(str::trim).filter(|id| !id.is_empty())?;
        let roles = roles
            .unwrap_or_default()
            .split(',')
            .filter_map(Role::parse);
        Some(Self::new(user_id, roles))
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_captain(&self) -> bool {
        self.has_role(Role::Captain)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    /// Whether this actor is the player `id`.
    pub fn is(&self, id: &PlayerId) -> bool {
        &self.user_id == id
    }
}

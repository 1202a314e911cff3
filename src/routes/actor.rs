use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{error::AppError, state::actor::ActorContext};

/// Header carrying the authenticated player id, set by the upstream gateway.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the comma-separated roles of that player.
pub const USER_ROLES_HEADER: &str = "x-user-roles";

/// Identity of the caller, required by every write route.
#[derive(Debug, Clone)]
pub struct Actor(pub ActorContext);

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        ActorContext::from_raw(
            header(parts, USER_ID_HEADER),
            header(parts, USER_ROLES_HEADER),
        )
        .map(Actor)
        .ok_or_else(|| AppError::Unauthorized("missing user header `X-User-Id`".into()))
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
}

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::AppError;

/// Header carrying the caller's id, set by the upstream authentication layer.
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
}

impl AuthUser {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::BadRequest(format!("Missing {USER_ID_HEADER} header")))?
            .to_str()
            .map_err(|_| AppError::BadRequest(format!("Invalid {USER_ID_HEADER} header")))?;

        let user_id = Uuid::parse_str(raw.trim())
            .map_err(|_| AppError::BadRequest("Invalid user id".into()))?;

        Ok(AuthUser { user_id })
    }
}

// Caller identity forwarded by the authenticating gateway.
// Token issuance and verification happen upstream; this layer only reads
// the resulting identity headers.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use codegrade_common::types::{Actor, Role};
use uuid::Uuid;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Extractor yielding the authenticated caller
#[derive(Debug, Clone, Copy)]
pub struct CurrentActor(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .ok_or_else(|| ApiError::Unauthorized(format!("missing {} header", name)))
        };

        let id = Uuid::parse_str(header(USER_ID_HEADER)?)
            .map_err(|_| ApiError::Unauthorized("invalid user id".to_string()))?;
        let role_name = header(USER_ROLE_HEADER)?;
        let role: Role = role_name
            .parse()
            .map_err(|_| ApiError::Unauthorized(format!("invalid role '{}'", role_name)))?;

        Ok(CurrentActor(Actor { id, role }))
    }
}

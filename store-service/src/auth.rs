use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    Json,
};
use uuid::Uuid;

use shared::Role;

use crate::api::{AppState, ErrorResponse};
use crate::models::User;

/// Header naming the authenticated principal. Session management is a
/// commodity concern handled in front of this service; the routes only
/// care about the resolved user and its role.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Any authenticated storefront user (customer routes).
pub struct CurrentUser(pub User);

/// A user carrying the admin role (backoffice routes).
pub struct AdminUser(pub User);

pub type AuthRejection = (StatusCode, Json<ErrorResponse>);

fn unauthorized(message: &str) -> AuthRejection {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

fn forbidden(message: &str) -> AuthRejection {
    (
        StatusCode::FORBIDDEN,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

async fn lookup_user(parts: &Parts, state: &AppState) -> Result<(User, Role), AuthRejection> {
    let header = parts
        .headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| unauthorized("missing x-user-id header"))?;
    let raw = header
        .to_str()
        .map_err(|_| unauthorized("invalid x-user-id header"))?;
    let user_id =
        Uuid::parse_str(raw).map_err(|_| unauthorized("invalid x-user-id header"))?;

    let user = state
        .store
        .user_by_id(user_id)
        .await
        .map_err(|err| {
            tracing::error!("user lookup failed: {err:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "internal server error".to_string(),
                }),
            )
        })?
        .ok_or_else(|| unauthorized("unknown user"))?;

    let role = user
        .role
        .parse::<Role>()
        .map_err(|_| forbidden("user has no storefront role"))?;
    Ok((user, role))
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let (user, _role) = lookup_user(parts, state).await?;
        Ok(CurrentUser(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let (user, role) = lookup_user(parts, state).await?;
        if !role.is_admin() {
            return Err(forbidden("admin role required"));
        }
        Ok(AdminUser(user))
    }
}

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use plaza_types::api::Claims;

use crate::auth::{AppState, INACTIVE_USER};
use crate::error::ApiError;

pub const NO_CREDENTIALS: &str = "Authentication credentials were not provided.";
pub const INVALID_TOKEN: &str = "Invalid token.";
pub const NO_PERMISSION: &str = "You do not have permission to perform this action.";

/// The authenticated caller, looked up fresh per request so deactivation
/// takes effect before the token expires.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

/// Extract and validate the bearer token, then attach a `CurrentUser`
/// extension for handlers downstream.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Authentication(NO_CREDENTIALS))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Authentication(NO_CREDENTIALS))?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Authentication(INVALID_TOKEN))?;

    let sub = token_data.claims.sub;
    let db = state.clone();
    let user = tokio::task::spawn_blocking(move || db.db.get_user_by_id(&sub.to_string()))
        .await
        .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::Authentication(INVALID_TOKEN))?;

    if !user.is_active {
        return Err(ApiError::Authentication(INACTIVE_USER));
    }

    req.extensions_mut().insert(CurrentUser {
        id: sub,
        email: user.email,
        is_staff: user.is_staff,
        is_superuser: user.is_superuser,
    });
    Ok(next.run(req).await)
}

/// Staff gate for the admin surface, layered inside `require_auth`.
pub async fn require_staff(req: Request, next: Next) -> Result<Response, ApiError> {
    let is_staff = req
        .extensions()
        .get::<CurrentUser>()
        .is_some_and(|u| u.is_staff);

    if !is_staff {
        return Err(ApiError::PermissionDenied(NO_PERMISSION));
    }
    Ok(next.run(req).await)
}

/// Owner-or-staff check for mutating endpoints. A no-op unless ownership
/// enforcement was switched on for the deployment.
pub fn enforce_owner(enabled: bool, user: &CurrentUser, owner_id: &str) -> Result<(), ApiError> {
    if !enabled || user.is_staff || user.id.to_string() == owner_id {
        Ok(())
    } else {
        Err(ApiError::PermissionDenied(NO_PERMISSION))
    }
}

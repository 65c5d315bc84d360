use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use plaza_db::Database;
use plaza_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, UserResponse};
use plaza_types::validate::{self, EMAIL_TAKEN, FieldErrors};

use crate::error::{ApiError, ApiResult};
use crate::media::MediaStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub media: MediaStore,
    pub jwt_secret: String,
    pub enforce_ownership: bool,
}

pub const BAD_CREDENTIALS: &str = "Invalid email or password.";
pub const INACTIVE_USER: &str = "User inactive or deleted.";

/// POST /register/ — the open endpoint for self-provisioning an account.
/// Staff flags are never settable here.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    validate::validate_credentials(req.email.as_deref(), req.password.as_deref())?;

    let email = validate::normalize_email(req.email.unwrap_or_default().trim());
    let password = req.password.unwrap_or_default();

    let db = state.clone();
    let user =
        tokio::task::spawn_blocking(move || create_account(&db.db, &email, &password, false, false))
            .await
            .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))??;

    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /login/ — verifies the stored hash, stamps `last_login`, and
/// issues a 30-day bearer token.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    validate::validate_credentials(req.email.as_deref(), req.password.as_deref())?;

    let email = validate::normalize_email(req.email.unwrap_or_default().trim());
    let password = req.password.unwrap_or_default();

    let db = state.clone();
    let lookup = email.clone();
    let user = tokio::task::spawn_blocking(move || db.db.get_user_by_email(&lookup))
        .await
        .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::Authentication(BAD_CREDENTIALS))?;

    if !user.is_active {
        return Err(ApiError::Authentication(INACTIVE_USER));
    }

    verify_password(&password, &user.password)?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt user id '{}': {e}", user.id)))?;

    let db = state.clone();
    let uid = user.id.clone();
    tokio::task::spawn_blocking(move || db.db.touch_last_login(&uid))
        .await
        .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?
        .map_err(ApiError::Internal)?;

    let token = create_token(&state.jwt_secret, user_id, &user.email).map_err(ApiError::Internal)?;

    Ok(Json(LoginResponse {
        user_id,
        email: user.email,
        token,
    }))
}

/// Hashes the password and inserts the user row. Shared by the register
/// handler, the admin create endpoint, and the `createsuperuser` command.
pub fn create_account(
    db: &Database,
    email: &str,
    password: &str,
    is_staff: bool,
    is_superuser: bool,
) -> ApiResult<UserResponse> {
    let password_hash = hash_password(password)?;
    let user_id = Uuid::new_v4();

    if let Err(err) = db.create_user(
        &user_id.to_string(),
        email,
        &password_hash,
        is_staff,
        is_superuser,
    ) {
        if plaza_db::is_unique_violation(&err) {
            return Err(FieldErrors::single("email", EMAIL_TAKEN).into());
        }
        return Err(ApiError::Internal(err));
    }

    Ok(UserResponse {
        id: user_id,
        email: email.to_string(),
    })
}

/// Salted Argon2id, serialized as a PHC string.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, stored_hash: &str) -> ApiResult<()> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("stored hash unparsable: {e}")))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| ApiError::Authentication(BAD_CREDENTIALS))
}

pub fn create_token(secret: &str, user_id: Uuid, email: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

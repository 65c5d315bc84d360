use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use plaza_db::models::ProfileRow;
use plaza_types::api::{ImageUploadResponse, ProfileRequest, ProfileResponse};
use plaza_types::dates::parse_sqlite_datetime;
use plaza_types::validate::{self, FieldErrors, MAX_NICK_NAME_LEN, REQUIRED};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::media;
use crate::middleware::{CurrentUser, enforce_owner};

pub const PROFILE_EXISTS: &str = "A profile for this user already exists.";

/// Filename arrives as a query parameter because the body is the raw image.
#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    pub filename: Option<String>,
}

/// POST /profile/ — at most one per user; the owner is always the caller,
/// whatever the body claims.
pub async fn create_profile(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<ProfileRequest>,
) -> ApiResult<impl IntoResponse> {
    let nick = validate::trimmed(req.nick_name);
    validate::char_field("nickName", nick.as_deref(), true, MAX_NICK_NAME_LEN)?;

    let profile_id = Uuid::new_v4();
    let db = state.clone();
    let pid = profile_id.to_string();
    let uid = user.id.to_string();
    let nick = nick.unwrap_or_default();

    let row = tokio::task::spawn_blocking(move || {
        // The UNIQUE(user_id) constraint carries the one-profile rule, so a
        // concurrent second create cannot slip through.
        if let Err(err) = db.db.create_profile(&pid, &nick, &uid) {
            if plaza_db::is_unique_violation(&err) {
                return Err(ApiError::Conflict(PROFILE_EXISTS));
            }
            return Err(ApiError::Internal(err));
        }
        db.db
            .get_profile(&pid)
            .map_err(ApiError::Internal)?
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("profile '{pid}' missing after insert")))
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))??;

    Ok((StatusCode::CREATED, Json(to_response(row))))
}

pub async fn list_profiles(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<ProfileResponse>>> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_profiles())
        .await
        .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?
        .map_err(ApiError::Internal)?;

    Ok(Json(rows.into_iter().map(to_response).collect()))
}

/// GET /myprofile/ — the profile list filtered to the caller.
pub async fn my_profile(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<ProfileResponse>>> {
    let db = state.clone();
    let uid = user.id.to_string();
    let rows = tokio::task::spawn_blocking(move || db.db.list_profiles_for_user(&uid))
        .await
        .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?
        .map_err(ApiError::Internal)?;

    Ok(Json(rows.into_iter().map(to_response).collect()))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(_user): Extension<CurrentUser>,
) -> ApiResult<Json<ProfileResponse>> {
    let db = state.clone();
    let pid = id.to_string();
    let row = tokio::task::spawn_blocking(move || db.db.get_profile(&pid))
        .await
        .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(to_response(row)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<ProfileRequest>,
) -> ApiResult<Json<ProfileResponse>> {
    apply_update(state, user, id, req, false).await
}

pub async fn patch_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<ProfileRequest>,
) -> ApiResult<Json<ProfileResponse>> {
    apply_update(state, user, id, req, true).await
}

async fn apply_update(
    state: AppState,
    user: CurrentUser,
    id: Uuid,
    req: ProfileRequest,
    partial: bool,
) -> ApiResult<Json<ProfileResponse>> {
    let nick = validate::trimmed(req.nick_name);
    validate::char_field("nickName", nick.as_deref(), !partial, MAX_NICK_NAME_LEN)?;

    let db = state.clone();
    let enforce = state.enforce_ownership;
    let pid = id.to_string();

    let row = tokio::task::spawn_blocking(move || {
        let row = db
            .db
            .get_profile(&pid)
            .map_err(ApiError::Internal)?
            .ok_or(ApiError::NotFound)?;
        enforce_owner(enforce, &user, &row.user_id)?;

        db.db
            .update_profile(&pid, nick.as_deref())
            .map_err(ApiError::Internal)?;
        db.db
            .get_profile(&pid)
            .map_err(ApiError::Internal)?
            .ok_or(ApiError::NotFound)
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))??;

    Ok(Json(to_response(row)))
}

pub async fn delete_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<StatusCode> {
    let db = state.clone();
    let enforce = state.enforce_ownership;
    let pid = id.to_string();

    tokio::task::spawn_blocking(move || {
        let row = db
            .db
            .get_profile(&pid)
            .map_err(ApiError::Internal)?
            .ok_or(ApiError::NotFound)?;
        enforce_owner(enforce, &user, &row.user_id)?;

        db.db.delete_profile(&pid).map_err(ApiError::Internal)?;
        Ok::<_, ApiError>(())
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))??;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /profile/{id}/image?filename=f.ext — raw image bytes in the body.
/// The derived path goes into the profile's `img` column; a later upload to
/// the same derived path overwrites the file.
pub async fn upload_profile_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ImageQuery>,
    Extension(user): Extension<CurrentUser>,
    bytes: Bytes,
) -> ApiResult<Json<ImageUploadResponse>> {
    let filename = query
        .filename
        .ok_or_else(|| FieldErrors::single("filename", REQUIRED))?;
    media::check_upload(&bytes)?;

    let db = state.clone();
    let pid = id.to_string();
    let row = tokio::task::spawn_blocking(move || db.db.get_profile(&pid))
        .await
        .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound)?;

    enforce_owner(state.enforce_ownership, &user, &row.user_id)?;

    let owner: Uuid = row.user_id.parse().map_err(|e| {
        ApiError::Internal(anyhow::anyhow!(
            "corrupt user_id '{}' on profile '{}': {e}",
            row.user_id,
            row.id
        ))
    })?;
    let rel_path = media::avatar_path(owner, &row.nick_name, &filename)?;

    state
        .media
        .save(&rel_path, &bytes)
        .await
        .map_err(ApiError::Internal)?;

    let db = state.clone();
    let pid = row.id.clone();
    let img = rel_path.clone();
    tokio::task::spawn_blocking(move || db.db.set_profile_img(&pid, &img))
        .await
        .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?
        .map_err(ApiError::Internal)?;

    Ok(Json(ImageUploadResponse { img: rel_path }))
}

fn to_response(row: ProfileRow) -> ProfileResponse {
    let id = row.id.parse().unwrap_or_else(|e| {
        warn!("Corrupt profile id '{}': {}", row.id, e);
        Uuid::default()
    });
    let user_profile = row.user_id.parse().unwrap_or_else(|e| {
        warn!("Corrupt user_id '{}' on profile '{}': {}", row.user_id, row.id, e);
        Uuid::default()
    });
    let created_on = parse_sqlite_datetime(&row.created_on).unwrap_or_else(|| {
        warn!("Corrupt created_on '{}' on profile '{}'", row.created_on, row.id);
        chrono::DateTime::default()
    });

    ProfileResponse {
        id,
        nick_name: row.nick_name,
        user_profile,
        created_on,
        img: row.img,
    }
}

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::warn;
use uuid::Uuid;

use plaza_db::models::CommentRow;
use plaza_types::api::{CommentRequest, CommentResponse};
use plaza_types::validate::{self, COMMENT_POST_IMMUTABLE, FieldErrors, MAX_COMMENT_LEN, REQUIRED};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{CurrentUser, enforce_owner};

/// POST /comment/ — the author is always the caller; the parent post must
/// exist, a dangling reference is a 404.
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let text = validate::trimmed(req.text);
    validate::char_field("text", text.as_deref(), true, MAX_COMMENT_LEN)?;
    let post = req
        .post
        .ok_or_else(|| FieldErrors::single("post", REQUIRED))?;

    let comment_id = Uuid::new_v4();
    let db = state.clone();
    let cid = comment_id.to_string();
    let uid = user.id.to_string();
    let pid = post.to_string();
    let text = text.unwrap_or_default();

    let row = tokio::task::spawn_blocking(move || {
        if !db.db.post_exists(&pid).map_err(ApiError::Internal)? {
            return Err(ApiError::NotFound);
        }
        if let Err(err) = db.db.create_comment(&cid, &text, &uid, &pid) {
            // The post vanished between the existence check and the insert.
            if plaza_db::is_foreign_key_violation(&err) {
                return Err(ApiError::NotFound);
            }
            return Err(ApiError::Internal(err));
        }
        db.db
            .get_comment(&cid)
            .map_err(ApiError::Internal)?
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("comment '{cid}' missing after insert")))
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))??;

    Ok((StatusCode::CREATED, Json(to_response(row))))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<CommentResponse>>> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_comments())
        .await
        .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?
        .map_err(ApiError::Internal)?;

    Ok(Json(rows.into_iter().map(to_response).collect()))
}

pub async fn get_comment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(_user): Extension<CurrentUser>,
) -> ApiResult<Json<CommentResponse>> {
    let db = state.clone();
    let cid = id.to_string();
    let row = tokio::task::spawn_blocking(move || db.db.get_comment(&cid))
        .await
        .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(to_response(row)))
}

pub async fn update_comment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CommentRequest>,
) -> ApiResult<Json<CommentResponse>> {
    apply_update(state, user, id, req, false).await
}

pub async fn patch_comment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CommentRequest>,
) -> ApiResult<Json<CommentResponse>> {
    apply_update(state, user, id, req, true).await
}

/// Only the text is editable. A `post` key that names a different parent is
/// rejected; repeating the current parent is tolerated.
async fn apply_update(
    state: AppState,
    user: CurrentUser,
    id: Uuid,
    req: CommentRequest,
    partial: bool,
) -> ApiResult<Json<CommentResponse>> {
    let text = validate::trimmed(req.text);
    validate::char_field("text", text.as_deref(), !partial, MAX_COMMENT_LEN)?;
    if !partial && req.post.is_none() {
        return Err(FieldErrors::single("post", REQUIRED).into());
    }

    let db = state.clone();
    let enforce = state.enforce_ownership;
    let cid = id.to_string();
    let new_post = req.post;

    let row = tokio::task::spawn_blocking(move || {
        let row = db
            .db
            .get_comment(&cid)
            .map_err(ApiError::Internal)?
            .ok_or(ApiError::NotFound)?;
        enforce_owner(enforce, &user, &row.user_id)?;

        if let Some(p) = new_post {
            if p.to_string() != row.post_id {
                return Err(FieldErrors::single("post", COMMENT_POST_IMMUTABLE).into());
            }
        }

        db.db
            .update_comment(&cid, text.as_deref())
            .map_err(ApiError::Internal)?;
        db.db
            .get_comment(&cid)
            .map_err(ApiError::Internal)?
            .ok_or(ApiError::NotFound)
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))??;

    Ok(Json(to_response(row)))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<StatusCode> {
    let db = state.clone();
    let enforce = state.enforce_ownership;
    let cid = id.to_string();

    tokio::task::spawn_blocking(move || {
        let row = db
            .db
            .get_comment(&cid)
            .map_err(ApiError::Internal)?
            .ok_or(ApiError::NotFound)?;
        enforce_owner(enforce, &user, &row.user_id)?;

        db.db.delete_comment(&cid).map_err(ApiError::Internal)?;
        Ok::<_, ApiError>(())
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))??;

    Ok(StatusCode::NO_CONTENT)
}

fn to_response(row: CommentRow) -> CommentResponse {
    let id = row.id.parse().unwrap_or_else(|e| {
        warn!("Corrupt comment id '{}': {}", row.id, e);
        Uuid::default()
    });
    let user_comment = row.user_id.parse().unwrap_or_else(|e| {
        warn!("Corrupt user_id '{}' on comment '{}': {}", row.user_id, row.id, e);
        Uuid::default()
    });
    let post = row.post_id.parse().unwrap_or_else(|e| {
        warn!("Corrupt post_id '{}' on comment '{}': {}", row.post_id, row.id, e);
        Uuid::default()
    });

    CommentResponse {
        id,
        text: row.text,
        user_comment,
        post,
    }
}

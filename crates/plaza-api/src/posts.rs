use std::collections::HashMap;

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::warn;
use uuid::Uuid;

use plaza_db::{Database, models::PostRow};
use plaza_types::api::{ImageUploadResponse, PostRequest, PostResponse};
use plaza_types::dates::parse_sqlite_datetime;
use plaza_types::validate::{self, FieldErrors, MAX_TITLE_LEN, REQUIRED};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::media;
use crate::middleware::{CurrentUser, enforce_owner};
use crate::profiles::ImageQuery;

/// POST /post/ — the author is always the caller. An optional `liked` list
/// seeds the like set at creation.
pub async fn create_post(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<PostRequest>,
) -> ApiResult<impl IntoResponse> {
    let title = validate::trimmed(req.title);
    validate::char_field("title", title.as_deref(), true, MAX_TITLE_LEN)?;

    let post_id = Uuid::new_v4();
    let db = state.clone();
    let pid = post_id.to_string();
    let uid = user.id.to_string();
    let title = title.unwrap_or_default();
    let liked = req.liked;

    let (row, liked_ids) = tokio::task::spawn_blocking(move || {
        let liked_ids = check_liked_users(&db.db, liked.as_deref())?;

        db.db
            .create_post(&pid, &title, &uid)
            .map_err(ApiError::Internal)?;
        if let Some(ids) = &liked_ids {
            db.db.replace_liked(&pid, ids).map_err(ApiError::Internal)?;
        }

        let row = db
            .db
            .get_post(&pid)
            .map_err(ApiError::Internal)?
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("post '{pid}' missing after insert")))?;
        let liked_now = db.db.liked_for_post(&pid).map_err(ApiError::Internal)?;
        Ok::<_, ApiError>((row, liked_now))
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))??;

    Ok((
        StatusCode::CREATED,
        Json(to_response(row, liked_ids, vec![])),
    ))
}

/// GET /post/ — every post, with liked user ids and comment ids attached.
/// Both relations are batch-fetched so the listing stays at three queries.
pub async fn list_posts(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<PostResponse>>> {
    let db = state.clone();
    let (rows, like_pairs, comment_pairs) = tokio::task::spawn_blocking(move || {
        let rows = db.db.list_posts()?;
        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let likes = db.db.liked_for_posts(&ids)?;
        let comments = db.db.comment_ids_for_posts(&ids)?;
        Ok::<_, anyhow::Error>((rows, likes, comments))
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?
    .map_err(ApiError::Internal)?;

    // Group by post id (cheap in-memory work, fine on the async thread)
    let mut like_map: HashMap<String, Vec<String>> = HashMap::new();
    for (post_id, user_id) in like_pairs {
        like_map.entry(post_id).or_default().push(user_id);
    }
    let mut comment_map: HashMap<String, Vec<String>> = HashMap::new();
    for (post_id, comment_id) in comment_pairs {
        comment_map.entry(post_id).or_default().push(comment_id);
    }

    let posts = rows
        .into_iter()
        .map(|row| {
            let liked = like_map.remove(&row.id).unwrap_or_default();
            let comments = comment_map.remove(&row.id).unwrap_or_default();
            to_response(row, liked, comments)
        })
        .collect();

    Ok(Json(posts))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(_user): Extension<CurrentUser>,
) -> ApiResult<Json<PostResponse>> {
    let db = state.clone();
    let pid = id.to_string();

    let (row, liked, comments) = tokio::task::spawn_blocking(move || {
        let row = db
            .db
            .get_post(&pid)
            .map_err(ApiError::Internal)?
            .ok_or(ApiError::NotFound)?;
        let liked = db.db.liked_for_post(&pid).map_err(ApiError::Internal)?;
        let comments = db
            .db
            .comment_ids_for_posts(std::slice::from_ref(&pid))
            .map_err(ApiError::Internal)?
            .into_iter()
            .map(|(_, comment_id)| comment_id)
            .collect();
        Ok::<_, ApiError>((row, liked, comments))
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))??;

    Ok(Json(to_response(row, liked, comments)))
}

pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<PostRequest>,
) -> ApiResult<Json<PostResponse>> {
    apply_update(state, user, id, req, false).await
}

pub async fn patch_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<PostRequest>,
) -> ApiResult<Json<PostResponse>> {
    apply_update(state, user, id, req, true).await
}

/// Title and liked are the editable fields; the author never changes.
/// Omitting `liked` leaves the stored set as is, an empty list clears it.
async fn apply_update(
    state: AppState,
    user: CurrentUser,
    id: Uuid,
    req: PostRequest,
    partial: bool,
) -> ApiResult<Json<PostResponse>> {
    let title = validate::trimmed(req.title);
    validate::char_field("title", title.as_deref(), !partial, MAX_TITLE_LEN)?;

    let db = state.clone();
    let enforce = state.enforce_ownership;
    let pid = id.to_string();
    let liked = req.liked;

    let (row, liked_now, comments) = tokio::task::spawn_blocking(move || {
        let row = db
            .db
            .get_post(&pid)
            .map_err(ApiError::Internal)?
            .ok_or(ApiError::NotFound)?;
        enforce_owner(enforce, &user, &row.user_id)?;

        let liked_ids = check_liked_users(&db.db, liked.as_deref())?;

        db.db
            .update_post(&pid, title.as_deref())
            .map_err(ApiError::Internal)?;
        if let Some(ids) = &liked_ids {
            db.db.replace_liked(&pid, ids).map_err(ApiError::Internal)?;
        }

        let row = db
            .db
            .get_post(&pid)
            .map_err(ApiError::Internal)?
            .ok_or(ApiError::NotFound)?;
        let liked_now = db.db.liked_for_post(&pid).map_err(ApiError::Internal)?;
        let comments = db
            .db
            .comment_ids_for_posts(std::slice::from_ref(&pid))
            .map_err(ApiError::Internal)?
            .into_iter()
            .map(|(_, comment_id)| comment_id)
            .collect();
        Ok::<_, ApiError>((row, liked_now, comments))
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))??;

    Ok(Json(to_response(row, liked_now, comments)))
}

pub async fn delete_post(
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
            .get_post(&pid)
            .map_err(ApiError::Internal)?
            .ok_or(ApiError::NotFound)?;
        enforce_owner(enforce, &user, &row.user_id)?;

        db.db.delete_post(&pid).map_err(ApiError::Internal)?;
        Ok::<_, ApiError>(())
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))??;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /post/{id}/image?filename=f.ext — raw image bytes in the body.
pub async fn upload_post_image(
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
    let row = tokio::task::spawn_blocking(move || db.db.get_post(&pid))
        .await
        .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound)?;

    enforce_owner(state.enforce_ownership, &user, &row.user_id)?;

    let owner: Uuid = row.user_id.parse().map_err(|e| {
        ApiError::Internal(anyhow::anyhow!(
            "corrupt user_id '{}' on post '{}': {e}",
            row.user_id,
            row.id
        ))
    })?;
    let rel_path = media::post_image_path(owner, &row.title, &filename)?;

    state
        .media
        .save(&rel_path, &bytes)
        .await
        .map_err(ApiError::Internal)?;

    let db = state.clone();
    let pid = row.id.clone();
    let img = rel_path.clone();
    tokio::task::spawn_blocking(move || db.db.set_post_img(&pid, &img))
        .await
        .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?
        .map_err(ApiError::Internal)?;

    Ok(Json(ImageUploadResponse { img: rel_path }))
}

/// Every liked id must name an existing user; the first unknown id fails
/// the request with a per-field error, before any write happens. Repeated
/// ids collapse to one entry — the column has set semantics.
fn check_liked_users(db: &Database, liked: Option<&[Uuid]>) -> Result<Option<Vec<String>>, ApiError> {
    let Some(ids) = liked else { return Ok(None) };

    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        let id_str = id.to_string();
        if out.contains(&id_str) {
            continue;
        }
        if !db.user_exists(&id_str).map_err(ApiError::Internal)? {
            let msg = format!("Invalid pk \"{id}\" - object does not exist.");
            return Err(FieldErrors::single("liked", &msg).into());
        }
        out.push(id_str);
    }
    Ok(Some(out))
}

fn to_response(row: PostRow, liked: Vec<String>, comments: Vec<String>) -> PostResponse {
    let id = row.id.parse().unwrap_or_else(|e| {
        warn!("Corrupt post id '{}': {}", row.id, e);
        Uuid::default()
    });
    let user_post = row.user_id.parse().unwrap_or_else(|e| {
        warn!("Corrupt user_id '{}' on post '{}': {}", row.user_id, row.id, e);
        Uuid::default()
    });
    let created_on = parse_sqlite_datetime(&row.created_on).unwrap_or_else(|| {
        warn!("Corrupt created_on '{}' on post '{}'", row.created_on, row.id);
        chrono::DateTime::default()
    });

    PostResponse {
        id,
        title: row.title,
        user_post,
        created_on,
        img: row.img,
        liked: parse_id_list(liked, "post_likes"),
        comments: parse_id_list(comments, "comments"),
    }
}

fn parse_id_list(ids: Vec<String>, table: &str) -> Vec<Uuid> {
    ids.into_iter()
        .filter_map(|s| match s.parse() {
            Ok(uuid) => Some(uuid),
            Err(e) => {
                warn!("Corrupt id '{}' in {}: {}", s, table, e);
                None
            }
        })
        .collect()
}

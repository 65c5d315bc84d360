use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::warn;
use uuid::Uuid;

use plaza_db::models::UserRow;
use plaza_types::api::{
    AdminDates, AdminIdentity, AdminPermissions, AdminUserCreate, AdminUserDetail,
    AdminUserSummary, AdminUserUpdate,
};
use plaza_types::dates::parse_sqlite_datetime;
use plaza_types::validate::{self, EMAIL_TAKEN, FieldErrors};

use crate::auth::{AppState, create_account, hash_password};
use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentUser;

/// GET /admin/users/ — ordered by id, email as the display column.
pub async fn list_users(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<AdminUserSummary>>> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_users())
        .await
        .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?
        .map_err(ApiError::Internal)?;

    let users = rows
        .into_iter()
        .map(|row| {
            let id = row.id.parse().unwrap_or_else(|e| {
                warn!("Corrupt user id '{}': {}", row.id, e);
                Uuid::default()
            });
            AdminUserSummary { id, email: row.email }
        })
        .collect();

    Ok(Json(users))
}

/// POST /admin/users/ — create with two-step password confirmation.
pub async fn create_user(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Json(req): Json<AdminUserCreate>,
) -> ApiResult<impl IntoResponse> {
    validate::validate_admin_create(
        req.email.as_deref(),
        req.password.as_deref(),
        req.password_confirm.as_deref(),
    )?;

    let email = validate::normalize_email(req.email.unwrap_or_default().trim());
    let password = req.password.unwrap_or_default();
    let is_staff = req.is_staff.unwrap_or(false);
    let is_superuser = req.is_superuser.unwrap_or(false);
    let is_active = req.is_active;

    let db = state.clone();
    let created = tokio::task::spawn_blocking(move || {
        let user = create_account(&db.db, &email, &password, is_staff, is_superuser)?;
        // Rows default to active; only an explicit false needs a write.
        if is_active == Some(false) {
            db.db
                .update_user_fields(&user.id.to_string(), None, None, Some(false), None, None)
                .map_err(ApiError::Internal)?;
        }
        Ok::<_, ApiError>(user)
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))??;

    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /admin/users/{id}/ — fields grouped into the management UI's
/// identity / permissions / dates sections.
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(_user): Extension<CurrentUser>,
) -> ApiResult<Json<AdminUserDetail>> {
    let db = state.clone();
    let uid = id.to_string();
    let row = tokio::task::spawn_blocking(move || db.db.get_user_by_id(&uid))
        .await
        .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(to_detail(row)))
}

/// PATCH /admin/users/{id}/ — email, password (re-hashed), and the three
/// permission flags are editable.
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(_user): Extension<CurrentUser>,
    Json(req): Json<AdminUserUpdate>,
) -> ApiResult<Json<AdminUserDetail>> {
    let AdminUserUpdate {
        email,
        password,
        is_active,
        is_staff,
        is_superuser,
    } = req;

    let email = match email.as_deref() {
        Some(e) => {
            validate::validate_email(e)?;
            Some(validate::normalize_email(e.trim()))
        }
        None => None,
    };
    let password_hash = match password.as_deref() {
        Some(p) => {
            validate::validate_password(p)?;
            Some(hash_password(p)?)
        }
        None => None,
    };

    let db = state.clone();
    let uid = id.to_string();
    let row = tokio::task::spawn_blocking(move || {
        let found = match db.db.update_user_fields(
            &uid,
            email.as_deref(),
            password_hash.as_deref(),
            is_active,
            is_staff,
            is_superuser,
        ) {
            Ok(found) => found,
            Err(err) if plaza_db::is_unique_violation(&err) => {
                return Err(FieldErrors::single("email", EMAIL_TAKEN).into());
            }
            Err(err) => return Err(ApiError::Internal(err)),
        };
        if !found {
            return Err(ApiError::NotFound);
        }
        db.db
            .get_user_by_id(&uid)
            .map_err(ApiError::Internal)?
            .ok_or(ApiError::NotFound)
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))??;

    Ok(Json(to_detail(row)))
}

/// DELETE /admin/users/{id}/ — the profile, posts, comments, and like rows
/// of the user go with it.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(_user): Extension<CurrentUser>,
) -> ApiResult<StatusCode> {
    let db = state.clone();
    let uid = id.to_string();
    let found = tokio::task::spawn_blocking(move || db.db.delete_user(&uid))
        .await
        .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?
        .map_err(ApiError::Internal)?;

    if !found {
        return Err(ApiError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

fn to_detail(row: UserRow) -> AdminUserDetail {
    let id = row.id.parse().unwrap_or_else(|e| {
        warn!("Corrupt user id '{}': {}", row.id, e);
        Uuid::default()
    });
    let last_login = row.last_login.as_deref().and_then(parse_sqlite_datetime);
    let created_at = parse_sqlite_datetime(&row.created_at).unwrap_or_else(|| {
        warn!("Corrupt created_at '{}' on user '{}'", row.created_at, row.id);
        chrono::DateTime::default()
    });

    AdminUserDetail {
        id,
        identity: AdminIdentity { email: row.email },
        permissions: AdminPermissions {
            is_active: row.is_active,
            is_staff: row.is_staff,
            is_superuser: row.is_superuser,
        },
        dates: AdminDates {
            last_login,
            created_at,
        },
    }
}

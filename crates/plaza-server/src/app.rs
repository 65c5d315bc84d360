use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, patch, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use plaza_api::auth::{self, AppState};
use plaza_api::middleware::{require_auth, require_staff};
use plaza_api::{admin, comments, media, posts, profiles};

/// Assembles the full routing tree over the given state.
pub fn build_app(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/register/", post(auth::register))
        .route("/login/", post(auth::login))
        .route("/health", get(health))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/profile/", get(profiles::list_profiles))
        .route("/profile/", post(profiles::create_profile))
        .route("/profile/{id}/", get(profiles::get_profile))
        .route("/profile/{id}/", put(profiles::update_profile))
        .route("/profile/{id}/", patch(profiles::patch_profile))
        .route("/profile/{id}/", delete(profiles::delete_profile))
        .route("/myprofile/", get(profiles::my_profile))
        .route("/post/", get(posts::list_posts))
        .route("/post/", post(posts::create_post))
        .route("/post/{id}/", get(posts::get_post))
        .route("/post/{id}/", put(posts::update_post))
        .route("/post/{id}/", patch(posts::patch_post))
        .route("/post/{id}/", delete(posts::delete_post))
        .route("/comment/", get(comments::list_comments))
        .route("/comment/", post(comments::create_comment))
        .route("/comment/{id}/", get(comments::get_comment))
        .route("/comment/{id}/", put(comments::update_comment))
        .route("/comment/{id}/", patch(comments::patch_comment))
        .route("/comment/{id}/", delete(comments::delete_comment))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    // Uploads carry raw bytes; the transport cap sits above the application
    // cap so an oversize body still reaches the per-field size error.
    let upload_routes = Router::new()
        .route("/profile/{id}/image", post(profiles::upload_profile_image))
        .route("/post/{id}/image", post(posts::upload_post_image))
        .layer(DefaultBodyLimit::max(media::MAX_IMAGE_SIZE + 1024))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    // Outermost layer runs first: require_auth attaches the caller, then
    // the staff gate reads it.
    let admin_routes = Router::new()
        .route("/admin/users/", get(admin::list_users))
        .route("/admin/users/", post(admin::create_user))
        .route("/admin/users/{id}/", get(admin::get_user))
        .route("/admin/users/{id}/", patch(admin::update_user))
        .route("/admin/users/{id}/", delete(admin::delete_user))
        .layer(middleware::from_fn(require_staff))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    // Stored images are served as-is, no auth.
    let media_routes = Router::new().nest_service("/media", ServeDir::new(state.media.root()));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(upload_routes)
        .merge(admin_routes)
        .merge(media_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "ok"
}

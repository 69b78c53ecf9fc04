use crate::{AppState, auth, handlers, upload::MULTIPART_OVERHEAD};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
};

/// Authenticated Router Module
///
/// Routes open to any signed-in account, whatever its role. The whole router
/// sits behind `require_account`, so every handler can take `AuthUser`.
pub fn authenticated_routes(state: AppState) -> Router<AppState> {
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD;

    Router::<AppState>::new()
        // GET/PUT /profile
        // The caller's own profile; PUT is a partial update.
        .route(
            "/profile",
            get(handlers::profile::get_profile).put(handlers::profile::update_profile),
        )
        .route("/user-role", get(handlers::profile::get_user_role))
        .route("/dashboard", get(handlers::profile::dashboard))
        // POST /upload
        // Multipart image upload. The body cap sits just above the file limit so the
        // pipeline, not the transport, reports oversize files.
        .route(
            "/upload",
            post(handlers::images::upload_image).layer(DefaultBodyLimit::max(body_limit)),
        )
        // DELETE /upload/{id}
        // Uploader or admin only; the ownership check happens in the handler.
        .route("/upload/{id}", delete(handlers::images::delete_image))
        .route_layer(middleware::from_fn_with_state(state, auth::require_account))
}

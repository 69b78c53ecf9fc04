use crate::{AppState, auth, handlers};
use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};

/// Admin Router Module
///
/// Management routes for `admin` and `superadmin` accounts. The role check runs
/// in `require_admin` before any handler; handlers only add the finer rules
/// around superadmin accounts.
pub fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin", get(handlers::admin::admin_home))
        // --- Accounts ---
        .route("/admin/users", get(handlers::admin::list_users))
        // PUT /admin/users/role
        // Only a superadmin may grant or revoke the superadmin role.
        .route("/admin/users/role", put(handlers::admin::update_user_role))
        .route("/admin/users/{id}", delete(handlers::admin::delete_user))
        .route("/admin/admins", post(handlers::admin::create_admin))
        // --- Statistics ---
        .route("/admin/stats/age", get(handlers::admin::age_stats))
        .route("/admin/stats/gender", get(handlers::admin::gender_stats))
        // --- Content management ---
        .route("/admin/events", post(handlers::content::create_event))
        .route(
            "/admin/events/{id}",
            put(handlers::content::update_event).delete(handlers::content::delete_event),
        )
        .route("/admin/about", put(handlers::content::update_about))
        .route(
            "/admin/about/categories",
            put(handlers::content::replace_categories),
        )
        .route_layer(middleware::from_fn_with_state(state, auth::require_admin))
}

/// Routes reserved to superadmins.
pub fn superadmin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/superadmin", get(handlers::admin::superadmin_home))
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::require_superadmin,
        ))
}

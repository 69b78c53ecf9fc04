use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a token: the account gateway (sign-up, sign-in,
/// verification) and read-only content for the landing pages.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // --- Account gateway ---
        .route("/auth/signup", post(handlers::accounts::sign_up))
        .route("/auth/signin", post(handlers::accounts::sign_in))
        // POST /auth/verify-email
        // Consumes the six-digit code mailed at sign-up.
        .route("/auth/verify-email", post(handlers::accounts::verify_email))
        .route("/auth/logout", post(handlers::accounts::logout))
        // --- Content ---
        // GET /events?popular=true
        .route("/events", get(handlers::content::list_events))
        .route("/about", get(handlers::content::get_about))
        .route("/about/categories", get(handlers::content::list_categories))
        // --- Images ---
        // GET /images/{id}
        // Streams stored bytes. Deletion lives at DELETE /upload/{id} behind the gate.
        .route("/images/{id}", get(handlers::images::get_image))
        .route("/images/{id}/meta", get(handlers::images::get_image_meta))
}

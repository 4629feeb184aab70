use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::handlers::referral;
use crate::middleware::auth;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    // Everything except the public referral-code registration requires a
    // valid session token.
    let protected = Router::new()
        .route("/generate", post(referral::generate_code))
        .route("/stats", get(referral::stats))
        .route("/analytics", get(referral::analytics_report))
        .route("/update-status", post(referral::update_status))
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::auth_middleware,
        ));

    Router::new()
        .route("/register", post(referral::register_via_code))
        .merge(protected)
}

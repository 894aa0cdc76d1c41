use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use booking_form_cell::router::booking_form_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Appointment booking API is running!" }))
        .nest("/booking", booking_form_routes(state))
}

use std::sync::Arc;

use axum::{
    routing::{get, patch, post, put},
    Router,
};

use shared_config::AppConfig;

use crate::handlers;
use crate::services::BookingFormService;

pub fn booking_form_routes(config: Arc<AppConfig>) -> Router {
    booking_form_routes_with_service(Arc::new(BookingFormService::new(&config)))
}

pub fn booking_form_routes_with_service(service: Arc<BookingFormService>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/departments/{dept_id}/doctors", get(handlers::get_doctors_by_department))

        // Form lifecycle
        .route("/forms", post(handlers::create_form))
        .route("/forms/{form_id}", get(handlers::get_form).delete(handlers::discard_form))

        // Selections
        .route("/forms/{form_id}/department", put(handlers::select_department))
        .route("/forms/{form_id}/location", put(handlers::select_location))
        .route("/forms/{form_id}/doctor", put(handlers::select_doctor))
        .route("/forms/{form_id}/date", put(handlers::select_date))
        .route("/forms/{form_id}/time", put(handlers::select_time))
        .route("/forms/{form_id}/details", patch(handlers::update_details))

        // Contact verification
        .route("/forms/{form_id}/verification/{channel}/request", post(handlers::request_verification_code))
        .route("/forms/{form_id}/verification/{channel}/confirm", post(handlers::confirm_verification_code))
        .route("/forms/{form_id}/verification/{channel}/cancel", post(handlers::cancel_verification))

        .route("/forms/{form_id}/submit", post(handlers::submit_form))
        .with_state(service)
}

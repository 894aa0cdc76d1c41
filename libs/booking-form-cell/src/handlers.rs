use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{
    Channel, ConfirmCodeRequest, FormView, SelectDateRequest, SelectDepartmentRequest,
    SelectDoctorRequest, SelectLocationRequest, SelectTimeRequest, SubmissionResponse,
    UpdateDetailsRequest,
};
use crate::services::BookingFormService;

// ==============================================================================
// SERVICE STATUS & REFERENCE LOOKUPS
// ==============================================================================

#[axum::debug_handler]
pub async fn health_check(
    State(service): State<Arc<BookingFormService>>,
) -> Json<Value> {
    let active_forms = service.session_count().await;

    Json(json!({
        "status": "ok",
        "scheduling_configured": service.config().is_configured(),
        "active_forms": active_forms,
    }))
}

#[axum::debug_handler]
pub async fn get_doctors_by_department(
    State(service): State<Arc<BookingFormService>>,
    Path(dept_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let doctors = service.doctors_by_department(&dept_id).await?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

// ==============================================================================
// FORM SESSIONS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_form(
    State(service): State<Arc<BookingFormService>>,
) -> (StatusCode, Json<FormView>) {
    (StatusCode::CREATED, Json(service.create_form().await))
}

#[axum::debug_handler]
pub async fn get_form(
    State(service): State<Arc<BookingFormService>>,
    Path(form_id): Path<Uuid>,
) -> Result<Json<FormView>, AppError> {
    Ok(Json(service.get_form(form_id).await?))
}

#[axum::debug_handler]
pub async fn discard_form(
    State(service): State<Arc<BookingFormService>>,
    Path(form_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service.discard_form(form_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn select_department(
    State(service): State<Arc<BookingFormService>>,
    Path(form_id): Path<Uuid>,
    Json(request): Json<SelectDepartmentRequest>,
) -> Result<Json<FormView>, AppError> {
    Ok(Json(service.select_department(form_id, request.department_id).await?))
}

#[axum::debug_handler]
pub async fn select_location(
    State(service): State<Arc<BookingFormService>>,
    Path(form_id): Path<Uuid>,
    Json(request): Json<SelectLocationRequest>,
) -> Result<Json<FormView>, AppError> {
    Ok(Json(service.select_location(form_id, request.center_id).await?))
}

#[axum::debug_handler]
pub async fn select_doctor(
    State(service): State<Arc<BookingFormService>>,
    Path(form_id): Path<Uuid>,
    Json(request): Json<SelectDoctorRequest>,
) -> Result<Json<FormView>, AppError> {
    Ok(Json(service.select_doctor(form_id, request.doctor_id).await?))
}

#[axum::debug_handler]
pub async fn select_date(
    State(service): State<Arc<BookingFormService>>,
    Path(form_id): Path<Uuid>,
    Json(request): Json<SelectDateRequest>,
) -> Result<Json<FormView>, AppError> {
    Ok(Json(service.select_date(form_id, request.date).await?))
}

#[axum::debug_handler]
pub async fn select_time(
    State(service): State<Arc<BookingFormService>>,
    Path(form_id): Path<Uuid>,
    Json(request): Json<SelectTimeRequest>,
) -> Result<Json<FormView>, AppError> {
    Ok(Json(service.select_time(form_id, request.time).await?))
}

#[axum::debug_handler]
pub async fn update_details(
    State(service): State<Arc<BookingFormService>>,
    Path(form_id): Path<Uuid>,
    Json(request): Json<UpdateDetailsRequest>,
) -> Result<Json<FormView>, AppError> {
    Ok(Json(service.update_details(form_id, request).await?))
}

// ==============================================================================
// CONTACT VERIFICATION
// ==============================================================================

#[axum::debug_handler]
pub async fn request_verification_code(
    State(service): State<Arc<BookingFormService>>,
    Path((form_id, channel)): Path<(Uuid, Channel)>,
) -> Result<Json<FormView>, AppError> {
    Ok(Json(service.request_code(form_id, channel).await?))
}

#[axum::debug_handler]
pub async fn confirm_verification_code(
    State(service): State<Arc<BookingFormService>>,
    Path((form_id, channel)): Path<(Uuid, Channel)>,
    Json(request): Json<ConfirmCodeRequest>,
) -> Result<Json<FormView>, AppError> {
    Ok(Json(service.confirm_code(form_id, channel, &request.code).await?))
}

#[axum::debug_handler]
pub async fn cancel_verification(
    State(service): State<Arc<BookingFormService>>,
    Path((form_id, channel)): Path<(Uuid, Channel)>,
) -> Result<Json<FormView>, AppError> {
    Ok(Json(service.cancel_verification(form_id, channel).await?))
}

// ==============================================================================
// SUBMISSION
// ==============================================================================

#[axum::debug_handler]
pub async fn submit_form(
    State(service): State<Arc<BookingFormService>>,
    Path(form_id): Path<Uuid>,
) -> Result<(StatusCode, Json<SubmissionResponse>), AppError> {
    let response = service.submit(form_id).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

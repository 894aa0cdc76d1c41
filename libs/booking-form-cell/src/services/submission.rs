use tracing::{error, info, instrument};

use crate::error::BookingFormError;
use crate::models::{BookingRequest, FormFields};
use crate::services::availability::to_wire_datetime;
use crate::services::backend::SchedulingBackend;
use crate::services::verification::VerificationGate;

/// Run the submit-time checks in order, stopping at the first failure:
/// location, doctor, date and time, then verification.
pub fn prepare_booking(
    fields: &FormFields,
    gate: &VerificationGate,
) -> Result<BookingRequest, BookingFormError> {
    let center_id = fields
        .center_id
        .as_ref()
        .ok_or(BookingFormError::MissingField("a location"))?;
    let doctor_id = fields
        .doctor_id
        .as_ref()
        .ok_or(BookingFormError::MissingField("a doctor"))?;
    let (date, time) = fields
        .date
        .zip(fields.time.as_ref())
        .ok_or(BookingFormError::MissingField("an appointment date and time"))?;

    gate.check()?;

    Ok(BookingRequest {
        doctor_id: doctor_id.clone(),
        appointment_slot: to_wire_datetime(date, time)?,
        center_id: center_id.clone(),
    })
}

/// Issue the booking call. Returns the backend's appointment id.
#[instrument(skip(backend))]
pub async fn book(
    backend: &dyn SchedulingBackend,
    request: &BookingRequest,
) -> Result<String, BookingFormError> {
    let response = backend.save_appointment(request).await.map_err(|e| {
        error!("Booking call failed: {}", e);
        BookingFormError::Submission(e.to_string())
    })?;

    if !response.is_success() {
        let reason = if response.error_text.is_empty() {
            format!("rejected with code {}", response.return_code)
        } else {
            response.error_text
        };
        error!("Booking rejected by backend: {}", reason);
        return Err(BookingFormError::Submission(reason));
    }

    match response.appointment_id.filter(|id| !id.is_empty()) {
        Some(appointment_id) => {
            info!(
                "Appointment {} booked with doctor {} at {}",
                appointment_id, request.doctor_id, request.appointment_slot
            );
            Ok(appointment_id)
        }
        None => {
            error!("Booking accepted without an appointment id");
            Err(BookingFormError::Submission(
                "no confirmation was returned".to_string(),
            ))
        }
    }
}

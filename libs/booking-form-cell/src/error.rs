use thiserror::Error;

use shared_models::error::AppError;

use crate::models::{Channel, VerificationState};

#[derive(Error, Debug)]
pub enum BookingFormError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Please select {0}")]
    MissingField(&'static str),

    #[error("Form session not found: {0}")]
    NotFound(String),

    #[error("Available slots are still loading")]
    SlotsLoading,

    #[error("Invalid time label: {0}")]
    TimeLabel(String),

    #[error("The {channel} verification code you entered is incorrect. Please try again.")]
    VerificationMismatch { channel: Channel },

    #[error("Cannot {action} {channel} verification while it is {state}")]
    InvalidTransition {
        channel: Channel,
        state: VerificationState,
        action: &'static str,
    },

    #[error("Please verify your {channel} before submitting")]
    VerificationRequired { channel: Channel },

    #[error("Could not send {channel} verification code: {reason}")]
    CodeDelivery { channel: Channel, reason: String },

    #[error("An appointment request is already being submitted")]
    SubmissionInProgress,

    #[error("Appointment already booked with confirmation {0}")]
    AlreadySubmitted(String),

    #[error("Appointment could not be booked: {0}. Please try again.")]
    Submission(String),

    #[error("Scheduling backend error: {0}")]
    Backend(String),
}

impl From<BookingFormError> for AppError {
    fn from(err: BookingFormError) -> Self {
        let message = err.to_string();
        match err {
            BookingFormError::Validation(_)
            | BookingFormError::MissingField(_)
            | BookingFormError::TimeLabel(_)
            | BookingFormError::VerificationRequired { .. } => AppError::ValidationError(message),
            BookingFormError::VerificationMismatch { .. } | BookingFormError::SlotsLoading => {
                AppError::BadRequest(message)
            }
            BookingFormError::NotFound(_) => AppError::NotFound(message),
            BookingFormError::InvalidTransition { .. }
            | BookingFormError::SubmissionInProgress
            | BookingFormError::AlreadySubmitted(_) => AppError::Conflict(message),
            BookingFormError::CodeDelivery { .. }
            | BookingFormError::Submission(_)
            | BookingFormError::Backend(_) => AppError::ExternalService(message),
        }
    }
}

mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use uuid::Uuid;

use booking_form_cell::*;
use common::*;
use shared_utils::test_utils::TestConfig;

fn june_10() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
}

fn contact_details() -> UpdateDetailsRequest {
    UpdateDetailsRequest {
        full_name: Some("Asha Rao".to_string()),
        phone: Some("9876543210".to_string()),
        email: Some("asha@example.com".to_string()),
        ..UpdateDetailsRequest::default()
    }
}

async fn verify_both(form: &mut FormController, issuer: &SequentialCodeIssuer) {
    for channel in Channel::ALL {
        form.request_code(channel, issuer).await.unwrap();
        let code = issuer.last_code(channel).unwrap();
        form.confirm_code(channel, &code).unwrap();
    }
}

/// Doctor A at 2:30 PM on 2024-06-10 in C1, both contacts verified.
async fn complete_form() -> FormController {
    let issuer = SequentialCodeIssuer::default();
    let mut form = form_with_doctor_a();
    form.select_location(Some("C1".to_string())).unwrap();
    form.select_date(Some(june_10())).unwrap();
    form.select_time(Some("2:30 PM".to_string())).unwrap();
    form.update_details(contact_details());
    verify_both(&mut form, &issuer).await;
    form
}

#[tokio::test]
async fn test_checks_run_in_order() {
    let issuer = SequentialCodeIssuer::default();
    let mut form = new_form();

    assert_matches!(form.begin_submission(), Err(BookingFormError::MissingField("a location")));

    form.select_location(Some("C2".to_string())).unwrap();
    assert_matches!(form.begin_submission(), Err(BookingFormError::MissingField("a doctor")));

    let ticket = form.select_doctor(Some("A".to_string())).unwrap().unwrap();
    form.apply_slots(&ticket, Ok(slots_ok(&SAMPLE_SLOTS)));
    assert_matches!(
        form.begin_submission(),
        Err(BookingFormError::MissingField("an appointment date and time"))
    );

    form.select_date(Some(june_10())).unwrap();
    assert_matches!(
        form.begin_submission(),
        Err(BookingFormError::MissingField("an appointment date and time"))
    );

    form.select_time(Some("9:00 AM".to_string())).unwrap();
    form.update_details(contact_details());
    assert_matches!(
        form.begin_submission(),
        Err(BookingFormError::VerificationRequired { channel: Channel::Phone })
    );

    form.request_code(Channel::Phone, &issuer).await.unwrap();
    let code = issuer.last_code(Channel::Phone).unwrap();
    form.confirm_code(Channel::Phone, &code).unwrap();
    assert_matches!(
        form.begin_submission(),
        Err(BookingFormError::VerificationRequired { channel: Channel::Email })
    );

    assert!(!form.is_submitting());
    assert!(!form.can_submit());
}

#[tokio::test]
async fn test_booking_request_built_from_fields() {
    let mut form = complete_form().await;
    assert!(form.can_submit());

    let request = form.begin_submission().unwrap();

    assert_eq!(request.doctor_id, "A");
    assert_eq!(request.center_id, "C1");
    assert_eq!(request.appointment_slot, "2024-06-10T14:30:00Z");
    assert!(form.is_submitting());
}

#[tokio::test]
async fn test_second_submission_blocked_while_in_flight() {
    let mut form = complete_form().await;
    form.begin_submission().unwrap();

    assert_matches!(form.begin_submission(), Err(BookingFormError::SubmissionInProgress));
    assert!(!form.can_submit());

    form.finish_submission(Ok("APT-1".to_string())).unwrap();
    assert_matches!(
        form.begin_submission(),
        Err(BookingFormError::AlreadySubmitted(ref id)) if id == "APT-1"
    );
    assert_eq!(form.confirmation_id(), Some("APT-1"));
}

#[tokio::test]
async fn test_failed_booking_keeps_form_for_resubmit() {
    let mut form = complete_form().await;
    let before = form.fields().clone();
    form.begin_submission().unwrap();

    let result = form.finish_submission(Err(BookingFormError::Submission("Slot taken".to_string())));

    assert_matches!(result, Err(BookingFormError::Submission(_)));
    assert!(!form.is_submitting());
    assert_eq!(form.fields(), &before);
    assert_eq!(form.gate().state(Channel::Phone), VerificationState::Verified);
    assert!(form.begin_submission().is_ok());
}

#[tokio::test]
async fn test_no_verification_required_when_disabled() {
    let mut form = FormController::new(reference_data(), VerificationGate::new(Vec::new()));
    let ticket = form.select_doctor(Some("B".to_string())).unwrap().unwrap();
    form.apply_slots(&ticket, Ok(slots_ok(&["2024-07-01T16:00:00"])));
    form.select_location(Some("C2".to_string())).unwrap();
    form.select_date(NaiveDate::from_ymd_opt(2024, 7, 1)).unwrap();
    form.select_time(Some("4:00 PM".to_string())).unwrap();

    let request = form.begin_submission().unwrap();
    assert_eq!(request.appointment_slot, "2024-07-01T16:00:00Z");
}

// ------------------------------------------------------------------------------
// Through the service, against the in-memory backend
// ------------------------------------------------------------------------------

struct Harness {
    service: BookingFormService,
    backend: Arc<FakeBackend>,
    issuer: Arc<SequentialCodeIssuer>,
}

impl Harness {
    fn new(backend: FakeBackend) -> Self {
        let backend = Arc::new(backend);
        let issuer = Arc::new(SequentialCodeIssuer::default());
        let service = BookingFormService::with_backend(
            &TestConfig::default().to_app_config(),
            backend.clone(),
            issuer.clone(),
        );
        Self { service, backend, issuer }
    }

    async fn filled_form(&self) -> Uuid {
        let id = self.service.create_form().await.id;
        self.service.select_location(id, Some("C1".to_string())).await.unwrap();
        self.service.select_doctor(id, Some("A".to_string())).await.unwrap();
        self.service.select_date(id, Some(june_10())).await.unwrap();
        self.service.select_time(id, Some("2:30 PM".to_string())).await.unwrap();
        self.service.update_details(id, contact_details()).await.unwrap();
        for channel in Channel::ALL {
            self.service.request_code(id, channel).await.unwrap();
            let code = self.issuer.last_code(channel).unwrap();
            self.service.confirm_code(id, channel, &code).await.unwrap();
        }
        id
    }
}

#[tokio::test]
async fn test_invalid_form_makes_no_booking_call() {
    let harness = Harness::new(FakeBackend::new());
    let id = harness.service.create_form().await.id;

    let result = harness.service.submit(id).await;

    assert_matches!(result, Err(BookingFormError::MissingField(_)));
    assert_eq!(harness.backend.booking_calls(), 0);
}

#[tokio::test]
async fn test_valid_form_books_exactly_once() {
    let harness = Harness::new(FakeBackend::new());
    let id = harness.filled_form().await;

    let response = harness.service.submit(id).await.unwrap();

    assert_eq!(response.confirmation_id, "APT-1001");
    assert_eq!(response.appointment_slot, "2024-06-10T14:30:00Z");
    assert_eq!(response.form.confirmation_id.as_deref(), Some("APT-1001"));
    assert!(!response.form.can_submit);

    assert_eq!(harness.backend.booking_calls(), 1);
    let bookings = harness.backend.bookings();
    assert_eq!(bookings[0].doctor_id, "A");
    assert_eq!(bookings[0].center_id, "C1");
    assert_eq!(bookings[0].appointment_slot, "2024-06-10T14:30:00Z");

    assert_matches!(
        harness.service.submit(id).await,
        Err(BookingFormError::AlreadySubmitted(_))
    );
    assert_eq!(harness.backend.booking_calls(), 1);
}

#[tokio::test]
async fn test_rejected_booking_surfaces_backend_text() {
    let harness = Harness::new(FakeBackend::new().rejecting_bookings("Slot no longer available"));
    let id = harness.filled_form().await;

    let err = harness.service.submit(id).await.unwrap_err();
    assert_matches!(err, BookingFormError::Submission(ref text) if text == "Slot no longer available");

    let view = harness.service.get_form(id).await.unwrap();
    assert_eq!(view.fields.time.as_deref(), Some("2:30 PM"));
    assert!(!view.submitting);
    assert!(view.can_submit);

    // Resubmitting is allowed and calls the backend again.
    assert!(harness.service.submit(id).await.is_err());
    assert_eq!(harness.backend.booking_calls(), 2);
}

#[tokio::test]
async fn test_transport_failure_is_a_submission_error() {
    let mut backend = FakeBackend::new();
    backend.booking_response = None;
    let harness = Harness::new(backend);
    let id = harness.filled_form().await;

    let err = harness.service.submit(id).await.unwrap_err();

    assert_matches!(err, BookingFormError::Submission(ref text) if text.contains("connection refused"));
    assert_eq!(harness.backend.booking_calls(), 1);
}

#[tokio::test]
async fn test_accepted_booking_without_id_is_an_error() {
    let mut backend = FakeBackend::new();
    backend.booking_response = Some(AppointmentResponse {
        return_code: "0".to_string(),
        error_text: String::new(),
        appointment_id: None,
    });
    let harness = Harness::new(backend);
    let id = harness.filled_form().await;

    assert_matches!(harness.service.submit(id).await, Err(BookingFormError::Submission(_)));
    assert!(harness.service.get_form(id).await.unwrap().confirmation_id.is_none());
}

#[tokio::test]
async fn test_abandoned_submission_can_be_retried() {
    let harness = Harness::new(FakeBackend::new());
    let id = harness.filled_form().await;
    harness.backend.set_stalled(false, true);

    // The client goes away while the booking call is outstanding.
    let abandoned = tokio::time::timeout(Duration::from_millis(50), harness.service.submit(id)).await;
    assert!(abandoned.is_err());

    let view = harness.service.get_form(id).await.unwrap();
    assert!(!view.submitting);
    assert!(view.can_submit);
    assert_eq!(view.fields.time.as_deref(), Some("2:30 PM"));

    harness.backend.set_stalled(false, false);
    let response = harness.service.submit(id).await.unwrap();

    assert_eq!(response.confirmation_id, "APT-1001");
    assert_eq!(harness.backend.booking_calls(), 2);
}

#[test]
fn test_abandon_only_clears_in_flight_flag() {
    let mut form = new_form();
    form.abandon_submission();
    assert!(!form.is_submitting());
    assert!(form.confirmation_id().is_none());
}

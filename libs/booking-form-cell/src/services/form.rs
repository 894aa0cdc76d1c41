use anyhow::Result;
use chrono::NaiveDate;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::BookingFormError;
use crate::models::{
    BookingRequest, Channel, Doctor, FormFields, FormView, SlotAvailabilityResponse,
    UpdateDetailsRequest,
};
use crate::services::availability::{AvailabilityResolver, SlotTicket};
use crate::services::reference::ReferenceData;
use crate::services::selection::{department_for_doctor, filter_doctors, retain_doctor};
use crate::services::submission::prepare_booking;
use crate::services::verification::{CodeIssuer, VerificationGate};

/// Where a field edit enters the derivation chain
/// department -> doctor -> slots -> date -> time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Stage {
    Department,
    Doctor,
    Date,
}

/// One user's booking form: field values, reference data, the slices
/// derived from them, and the verification gate.
#[derive(Debug, Clone)]
pub struct FormController {
    id: Uuid,
    fields: FormFields,
    reference: ReferenceData,
    visible_doctors: Vec<Doctor>,
    availability: AvailabilityResolver,
    gate: VerificationGate,
    submitting: bool,
    confirmation_id: Option<String>,
}

impl FormController {
    pub fn new(reference: ReferenceData, gate: VerificationGate) -> Self {
        Self {
            id: Uuid::new_v4(),
            fields: FormFields::default(),
            visible_doctors: reference.doctors.clone(),
            reference,
            availability: AvailabilityResolver::new(),
            gate,
            submitting: false,
            confirmation_id: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn fields(&self) -> &FormFields {
        &self.fields
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    pub fn visible_doctors(&self) -> &[Doctor] {
        &self.visible_doctors
    }

    pub fn availability(&self) -> &AvailabilityResolver {
        &self.availability
    }

    pub fn gate(&self) -> &VerificationGate {
        &self.gate
    }

    /// Recompute everything downstream of `from`. A value whose upstream
    /// changed is cleared here and nowhere else. Returns the slot fetch to
    /// issue when the doctor changed.
    fn recompute(&mut self, from: Stage) -> Option<SlotTicket> {
        let mut ticket = None;

        if from == Stage::Department {
            self.refilter_doctors();
            let retained = retain_doctor(self.fields.doctor_id.as_deref(), &self.visible_doctors);
            if retained == self.fields.doctor_id {
                return None;
            }
            debug!("Doctor selection cleared by department change");
            self.fields.doctor_id = retained;
        }

        if from <= Stage::Doctor {
            self.fields.date = None;
            ticket = self.availability.reset_for_doctor(self.fields.doctor_id.as_deref());
        }

        self.fields.time = None;
        ticket
    }

    fn refilter_doctors(&mut self) {
        self.visible_doctors =
            filter_doctors(self.fields.department_id.as_deref(), &self.reference.doctors);
    }

    /// Select a department; a selected doctor outside it is cleared.
    pub fn select_department(&mut self, department_id: Option<String>) -> Result<(), BookingFormError> {
        if let Some(id) = department_id.as_deref() {
            if self.reference.department(id).is_none() {
                return Err(BookingFormError::Validation(format!("Unknown department {}", id)));
            }
        }
        if department_id == self.fields.department_id {
            return Ok(());
        }

        self.fields.department_id = department_id;
        // Clearing the doctor never yields a fetch.
        self.recompute(Stage::Department);
        Ok(())
    }

    pub fn select_location(&mut self, center_id: Option<String>) -> Result<(), BookingFormError> {
        if let Some(id) = center_id.as_deref() {
            if self.reference.center(id).is_none() {
                return Err(BookingFormError::Validation(format!("Unknown location {}", id)));
            }
        }
        self.fields.center_id = center_id;
        Ok(())
    }

    /// Select a doctor, moving the department selection to the doctor's own
    /// department when they differ. Returns the slot fetch to issue, also when
    /// the same doctor is re-selected after a lost or failed fetch.
    pub fn select_doctor(&mut self, doctor_id: Option<String>) -> Result<Option<SlotTicket>, BookingFormError> {
        let implied_department = match doctor_id.as_deref() {
            Some(id) => {
                let doctor = self
                    .reference
                    .doctor(id)
                    .ok_or_else(|| BookingFormError::Validation(format!("Unknown doctor {}", id)))?;
                department_for_doctor(self.fields.department_id.as_deref(), doctor)
            }
            None => None,
        };

        if doctor_id == self.fields.doctor_id {
            // A fetch that never landed or failed is retried on re-selection.
            if doctor_id.is_some() && self.availability.needs_refetch() {
                debug!("Refetching slots for re-selected doctor");
                return Ok(self.recompute(Stage::Doctor));
            }
            return Ok(None);
        }

        self.fields.doctor_id = doctor_id;
        if let Some(department_id) = implied_department {
            debug!("Department set to {} to match doctor", department_id);
            self.fields.department_id = Some(department_id);
            // Only the list is refreshed: the doctor is in this department,
            // so there is nothing to evict.
            self.refilter_doctors();
        }

        Ok(self.recompute(Stage::Doctor))
    }

    /// Deliver a slot fetch result. Returns `false` if it was superseded.
    pub fn apply_slots(&mut self, ticket: &SlotTicket, result: Result<SlotAvailabilityResponse>) -> bool {
        self.availability.apply(ticket, result)
    }

    pub fn select_date(&mut self, date: Option<NaiveDate>) -> Result<(), BookingFormError> {
        if date == self.fields.date {
            return Ok(());
        }
        self.availability.select_date(date)?;
        self.fields.date = date;
        self.recompute(Stage::Date);
        Ok(())
    }

    pub fn select_time(&mut self, time: Option<String>) -> Result<(), BookingFormError> {
        if let Some(label) = time.as_deref() {
            if self.fields.date.is_none() {
                return Err(BookingFormError::MissingField("an appointment date first"));
            }
            self.availability.check_time(label)?;
        }
        self.fields.time = time;
        Ok(())
    }

    /// Apply free-text edits. Editing a contact value resets its
    /// verification; writing back the same value is not an edit.
    pub fn update_details(&mut self, request: UpdateDetailsRequest) {
        if let Some(appointment_type) = request.appointment_type {
            self.fields.appointment_type = appointment_type;
        }
        if let Some(full_name) = request.full_name {
            self.fields.full_name = full_name;
        }
        if let Some(notes) = request.notes {
            self.fields.notes = notes;
        }
        if let Some(phone) = request.phone {
            self.set_contact(Channel::Phone, phone);
        }
        if let Some(email) = request.email {
            self.set_contact(Channel::Email, email);
        }
    }

    pub fn set_contact(&mut self, channel: Channel, value: String) {
        let field = match channel {
            Channel::Phone => &mut self.fields.phone,
            Channel::Email => &mut self.fields.email,
        };
        if *field != value {
            *field = value;
            self.gate.contact_changed(channel);
        }
    }

    pub async fn request_code(&mut self, channel: Channel, issuer: &dyn CodeIssuer) -> Result<(), BookingFormError> {
        let value = self.fields.contact(channel).to_string();
        self.gate.request_code(channel, &value, issuer).await
    }

    pub fn confirm_code(&mut self, channel: Channel, code: &str) -> Result<(), BookingFormError> {
        self.gate.confirm_code(channel, code)
    }

    pub fn cancel_verification(&mut self, channel: Channel) -> Result<(), BookingFormError> {
        self.gate.cancel(channel)
    }

    /// Validate and mark the form as submitting. Until
    /// [`finish_submission`](Self::finish_submission) runs, further
    /// submissions are refused.
    pub fn begin_submission(&mut self) -> Result<BookingRequest, BookingFormError> {
        if let Some(confirmation_id) = &self.confirmation_id {
            return Err(BookingFormError::AlreadySubmitted(confirmation_id.clone()));
        }
        if self.submitting {
            return Err(BookingFormError::SubmissionInProgress);
        }

        let request = prepare_booking(&self.fields, &self.gate)?;
        self.submitting = true;
        Ok(request)
    }

    /// Record the outcome of the booking call. Fields are left untouched on
    /// failure so the user can resubmit.
    pub fn finish_submission(&mut self, outcome: Result<String, BookingFormError>) -> Result<String, BookingFormError> {
        self.submitting = false;
        let confirmation_id = outcome?;
        info!("Form {} confirmed as appointment {}", self.id, confirmation_id);
        self.confirmation_id = Some(confirmation_id.clone());
        Ok(confirmation_id)
    }

    /// The booking call was dropped before its outcome arrived. The backend
    /// may or may not have booked; the user is free to submit again.
    pub fn abandon_submission(&mut self) {
        if self.submitting {
            warn!("Form {} submission abandoned before the booking call returned", self.id);
            self.submitting = false;
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn confirmation_id(&self) -> Option<&str> {
        self.confirmation_id.as_deref()
    }

    pub fn can_submit(&self) -> bool {
        !self.submitting
            && self.confirmation_id.is_none()
            && prepare_booking(&self.fields, &self.gate).is_ok()
    }

    pub fn view(&self) -> FormView {
        FormView {
            id: self.id,
            fields: self.fields.clone(),
            departments: self.reference.departments.clone(),
            centers: self.reference.centers.clone(),
            doctors: self.reference.doctors.clone(),
            visible_doctors: self.visible_doctors.clone(),
            available_dates: self.availability.dates().to_vec(),
            available_times: self.availability.times().to_vec(),
            slot_status: self.availability.status(),
            slot_error: self.availability.error().map(str::to_string),
            verification: self.gate.views(),
            submitting: self.submitting,
            can_submit: self.can_submit(),
            load_errors: self.reference.load_errors.clone(),
            confirmation_id: self.confirmation_id.clone(),
        }
    }
}

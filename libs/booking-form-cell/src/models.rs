use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// REFERENCE DATA
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    #[serde(alias = "dept_id")]
    pub id: String,
    #[serde(alias = "dept_name")]
    pub name: String,
}

/// A hospital location. The form calls it "location", the backend "center".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Center {
    #[serde(alias = "center_id")]
    pub id: String,
    #[serde(alias = "center_name")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    #[serde(alias = "doctor_id")]
    pub id: String,
    #[serde(alias = "doctor_name")]
    pub name: String,
    #[serde(alias = "dept_id")]
    pub department_id: String,
    #[serde(alias = "dept_name", default)]
    pub department_name: String,
    pub center_id: String,
    #[serde(default)]
    pub center_name: String,
}

/// Record shape of `get_doctors_department`, passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentDoctor {
    pub doctor_id: String,
    pub doctor_name: String,
    pub dept_id: String,
    pub center_id: String,
    #[serde(default)]
    pub specialization: Option<String>,
}

// ==============================================================================
// SCHEDULING BACKEND PAYLOADS
// ==============================================================================

pub const RETURN_CODE_OK: &str = "0";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotAvailabilityResponse {
    pub return_code: String,
    pub error_text: String,
    // The backend spells it this way.
    #[serde(rename = "avaiable_slots", alias = "available_slots")]
    pub available_slots: Vec<String>,
}

impl SlotAvailabilityResponse {
    pub fn is_success(&self) -> bool {
        self.return_code == RETURN_CODE_OK
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppointmentResponse {
    pub return_code: String,
    pub error_text: String,
    pub appointment_id: Option<String>,
}

impl AppointmentResponse {
    pub fn is_success(&self) -> bool {
        self.return_code == RETURN_CODE_OK
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub doctor_id: String,
    pub appointment_slot: String,
    pub center_id: String,
}

// ==============================================================================
// FORM STATE
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Phone,
    Email,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Phone, Channel::Email];
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Phone => write!(f, "phone"),
            Channel::Email => write!(f, "email"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationState {
    #[default]
    Unverified,
    CodeSent,
    Verified,
}

impl fmt::Display for VerificationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationState::Unverified => write!(f, "unverified"),
            VerificationState::CodeSent => write!(f, "awaiting a code"),
            VerificationState::Verified => write!(f, "verified"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentType {
    #[default]
    #[serde(rename = "in-person")]
    InPerson,
    #[serde(rename = "video")]
    Video,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    NoSlots,
    Failed,
}

/// Values the user has entered. Derived collections live elsewhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormFields {
    pub department_id: Option<String>,
    pub center_id: Option<String>,
    pub doctor_id: Option<String>,
    pub appointment_type: AppointmentType,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub notes: String,
}

impl FormFields {
    pub fn contact(&self, channel: Channel) -> &str {
        match channel {
            Channel::Phone => &self.phone,
            Channel::Email => &self.email,
        }
    }
}

// ==============================================================================
// REQUEST / RESPONSE BODIES
// ==============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectDepartmentRequest {
    pub department_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectLocationRequest {
    pub center_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectDoctorRequest {
    pub doctor_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectDateRequest {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectTimeRequest {
    pub time: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDetailsRequest {
    pub appointment_type: Option<AppointmentType>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmCodeRequest {
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelView {
    pub channel: Channel,
    pub state: VerificationState,
    pub required: bool,
}

/// Snapshot of a form session as rendered by the front end.
#[derive(Debug, Clone, Serialize)]
pub struct FormView {
    pub id: Uuid,
    pub fields: FormFields,
    pub departments: Vec<Department>,
    pub centers: Vec<Center>,
    pub doctors: Vec<Doctor>,
    pub visible_doctors: Vec<Doctor>,
    pub available_dates: Vec<NaiveDate>,
    pub available_times: Vec<String>,
    pub slot_status: SlotStatus,
    pub slot_error: Option<String>,
    pub verification: Vec<ChannelView>,
    pub submitting: bool,
    pub can_submit: bool,
    pub load_errors: Vec<String>,
    pub confirmation_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionResponse {
    pub confirmation_id: String,
    pub appointment_slot: String,
    pub form: FormView,
}

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use booking_form_cell::*;

pub fn department(id: &str, name: &str) -> Department {
    Department { id: id.to_string(), name: name.to_string() }
}

pub fn center(id: &str, name: &str) -> Center {
    Center { id: id.to_string(), name: name.to_string() }
}

pub fn doctor(id: &str, department_id: &str, center_id: &str) -> Doctor {
    Doctor {
        id: id.to_string(),
        name: format!("Dr. {}", id),
        department_id: department_id.to_string(),
        department_name: format!("Department {}", department_id),
        center_id: center_id.to_string(),
        center_name: format!("Center {}", center_id),
    }
}

/// Departments D1/D2, centers C1/C2, doctors A and B in D1, C in D2.
pub fn reference_data() -> ReferenceData {
    ReferenceData {
        departments: vec![department("D1", "Surgery"), department("D2", "Dermatology")],
        centers: vec![center("C1", "Kompally"), center("C2", "Sangareddy")],
        doctors: vec![doctor("A", "D1", "C1"), doctor("B", "D1", "C2"), doctor("C", "D2", "C1")],
        load_errors: Vec::new(),
    }
}

pub const SAMPLE_SLOTS: [&str; 3] = [
    "2024-06-10T09:00:00",
    "2024-06-10T14:30:00",
    "2024-06-11T10:00:00",
];

pub fn slots_ok(slots: &[&str]) -> SlotAvailabilityResponse {
    SlotAvailabilityResponse {
        return_code: "0".to_string(),
        error_text: String::new(),
        available_slots: slots.iter().map(|s| s.to_string()).collect(),
    }
}

/// In-memory scheduling backend that records bookings.
#[derive(Default)]
pub struct FakeBackend {
    pub reference: ReferenceData,
    pub fail_departments: bool,
    pub fail_centers: bool,
    pub fail_doctors: bool,
    pub slots: HashMap<String, Vec<String>>,
    pub booking_response: Option<AppointmentResponse>,
    pub booking_calls: AtomicUsize,
    pub bookings: Mutex<Vec<BookingRequest>>,
    /// While set, slot and booking calls hang instead of answering.
    pub stall_slots: AtomicBool,
    pub stall_bookings: AtomicBool,
}

impl FakeBackend {
    pub fn new() -> Self {
        let mut slots = HashMap::new();
        slots.insert("A".to_string(), SAMPLE_SLOTS.iter().map(|s| s.to_string()).collect());
        slots.insert("B".to_string(), vec!["2024-07-01T16:00:00".to_string()]);
        slots.insert("C".to_string(), Vec::new());

        Self {
            reference: reference_data(),
            slots,
            booking_response: Some(AppointmentResponse {
                return_code: "0".to_string(),
                error_text: String::new(),
                appointment_id: Some("APT-1001".to_string()),
            }),
            ..Self::default()
        }
    }

    pub fn rejecting_bookings(mut self, error_text: &str) -> Self {
        self.booking_response = Some(AppointmentResponse {
            return_code: "1".to_string(),
            error_text: error_text.to_string(),
            appointment_id: None,
        });
        self
    }

    pub fn set_stalled(&self, slots: bool, bookings: bool) {
        self.stall_slots.store(slots, Ordering::SeqCst);
        self.stall_bookings.store(bookings, Ordering::SeqCst);
    }

    pub fn booking_calls(&self) -> usize {
        self.booking_calls.load(Ordering::SeqCst)
    }

    pub fn bookings(&self) -> Vec<BookingRequest> {
        self.bookings.lock().unwrap().clone()
    }
}

#[async_trait]
impl SchedulingBackend for FakeBackend {
    async fn get_departments(&self) -> Result<Vec<Department>> {
        if self.fail_departments {
            return Err(anyhow!("HTTP error! status: 500"));
        }
        Ok(self.reference.departments.clone())
    }

    async fn get_centers(&self) -> Result<Vec<Center>> {
        if self.fail_centers {
            return Err(anyhow!("HTTP error! status: 500"));
        }
        Ok(self.reference.centers.clone())
    }

    async fn get_doctors(&self) -> Result<Vec<Doctor>> {
        if self.fail_doctors {
            return Err(anyhow!("HTTP error! status: 500"));
        }
        Ok(self.reference.doctors.clone())
    }

    async fn get_doctors_by_department(&self, dept_id: &str) -> Result<Vec<DepartmentDoctor>> {
        Ok(self
            .reference
            .doctors
            .iter()
            .filter(|d| d.department_id == dept_id)
            .map(|d| DepartmentDoctor {
                doctor_id: d.id.clone(),
                doctor_name: d.name.clone(),
                dept_id: d.department_id.clone(),
                center_id: d.center_id.clone(),
                specialization: None,
            })
            .collect())
    }

    async fn check_available_slots(&self, doctor_id: &str) -> Result<SlotAvailabilityResponse> {
        if self.stall_slots.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        let slots = self.slots.get(doctor_id).cloned().unwrap_or_default();
        Ok(SlotAvailabilityResponse {
            return_code: "0".to_string(),
            error_text: String::new(),
            available_slots: slots,
        })
    }

    async fn save_appointment(&self, request: &BookingRequest) -> Result<AppointmentResponse> {
        self.booking_calls.fetch_add(1, Ordering::SeqCst);
        self.bookings.lock().unwrap().push(request.clone());
        if self.stall_bookings.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        self.booking_response
            .clone()
            .ok_or_else(|| anyhow!("connection refused"))
    }
}

/// Issues "100000", "100001", ... and remembers the last code per channel.
#[derive(Default)]
pub struct SequentialCodeIssuer {
    next: AtomicUsize,
    pub issued: Mutex<Vec<(Channel, String, String)>>,
}

impl SequentialCodeIssuer {
    pub fn last_code(&self, channel: Channel) -> Option<String> {
        self.issued
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(c, _, _)| *c == channel)
            .map(|(_, _, code)| code.clone())
    }
}

#[async_trait]
impl CodeIssuer for SequentialCodeIssuer {
    async fn issue_code(&self, channel: Channel, target: &str) -> Result<String> {
        let code = (100_000 + self.next.fetch_add(1, Ordering::SeqCst)).to_string();
        self.issued
            .lock()
            .unwrap()
            .push((channel, target.to_string(), code.clone()));
        Ok(code)
    }
}

pub struct FailingCodeIssuer;

#[async_trait]
impl CodeIssuer for FailingCodeIssuer {
    async fn issue_code(&self, _channel: Channel, _target: &str) -> Result<String> {
        Err(anyhow!("SMS gateway unavailable"))
    }
}

pub fn both_channels() -> VerificationGate {
    VerificationGate::new(vec![Channel::Phone, Channel::Email])
}

pub fn new_form() -> FormController {
    FormController::new(reference_data(), both_channels())
}

/// Select doctor A and deliver its sample slots.
pub fn form_with_doctor_a() -> FormController {
    let mut form = new_form();
    let ticket = form.select_doctor(Some("A".to_string())).unwrap().unwrap();
    assert!(form.apply_slots(&ticket, Ok(slots_ok(&SAMPLE_SLOTS))));
    form
}

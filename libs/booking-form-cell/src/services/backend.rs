use anyhow::Result;
use async_trait::async_trait;

use shared_scheduling::FrappeClient;

use crate::models::{
    AppointmentResponse, BookingRequest, Center, Department, DepartmentDoctor, Doctor,
    SlotAvailabilityResponse,
};

/// Remote scheduling system the form reads reference data and slots from
/// and books appointments against.
#[async_trait]
pub trait SchedulingBackend: Send + Sync {
    async fn get_departments(&self) -> Result<Vec<Department>>;

    async fn get_centers(&self) -> Result<Vec<Center>>;

    async fn get_doctors(&self) -> Result<Vec<Doctor>>;

    async fn get_doctors_by_department(&self, dept_id: &str) -> Result<Vec<DepartmentDoctor>>;

    async fn check_available_slots(&self, doctor_id: &str) -> Result<SlotAvailabilityResponse>;

    async fn save_appointment(&self, request: &BookingRequest) -> Result<AppointmentResponse>;
}

#[async_trait]
impl SchedulingBackend for FrappeClient {
    async fn get_departments(&self) -> Result<Vec<Department>> {
        self.get("get_unique_departments", &[]).await
    }

    async fn get_centers(&self) -> Result<Vec<Center>> {
        self.get("get_unique_centers", &[]).await
    }

    async fn get_doctors(&self) -> Result<Vec<Doctor>> {
        self.get("get_unique_doctor", &[]).await
    }

    async fn get_doctors_by_department(&self, dept_id: &str) -> Result<Vec<DepartmentDoctor>> {
        self.get("get_doctors_department", &[("dept_id", dept_id)]).await
    }

    async fn check_available_slots(&self, doctor_id: &str) -> Result<SlotAvailabilityResponse> {
        self.get("check_available_slots", &[("doctor_id", doctor_id)]).await
    }

    async fn save_appointment(&self, request: &BookingRequest) -> Result<AppointmentResponse> {
        self.post("save_appointment", request).await
    }
}

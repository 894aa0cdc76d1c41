use anyhow::Result;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::models::{Center, Department, Doctor};
use crate::services::backend::SchedulingBackend;

/// Departments, centers and doctors as fetched when a form is opened.
/// Never mutated afterwards.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReferenceData {
    pub departments: Vec<Department>,
    pub centers: Vec<Center>,
    pub doctors: Vec<Doctor>,
    pub load_errors: Vec<String>,
}

impl ReferenceData {
    pub fn department(&self, id: &str) -> Option<&Department> {
        self.departments.iter().find(|d| d.id == id)
    }

    pub fn center(&self, id: &str) -> Option<&Center> {
        self.centers.iter().find(|c| c.id == id)
    }

    pub fn doctor(&self, id: &str) -> Option<&Doctor> {
        self.doctors.iter().find(|d| d.id == id)
    }
}

/// Fetch all three collections concurrently. A failed fetch leaves its
/// collection empty and records a message; the others are kept.
#[instrument(skip(backend))]
pub async fn load_reference_data(backend: &dyn SchedulingBackend) -> ReferenceData {
    let (departments, centers, doctors) = tokio::join!(
        backend.get_departments(),
        backend.get_centers(),
        backend.get_doctors(),
    );

    let mut load_errors = Vec::new();
    let departments = settle("departments", departments, &mut load_errors);
    let centers = settle("locations", centers, &mut load_errors);
    let doctors = settle("doctors", doctors, &mut load_errors);

    info!(
        "Loaded reference data: {} departments, {} locations, {} doctors",
        departments.len(),
        centers.len(),
        doctors.len()
    );

    ReferenceData {
        departments,
        centers,
        doctors,
        load_errors,
    }
}

fn settle<T>(what: &str, result: Result<Vec<T>>, load_errors: &mut Vec<String>) -> Vec<T> {
    match result {
        Ok(items) => items,
        Err(e) => {
            warn!("Failed to load {}: {}", what, e);
            load_errors.push(format!("Failed to load {}: {}", what, e));
            Vec::new()
        }
    }
}

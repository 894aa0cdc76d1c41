use crate::models::Doctor;

/// Doctors offered for a department choice. No department means no filter.
pub fn filter_doctors(department_id: Option<&str>, all_doctors: &[Doctor]) -> Vec<Doctor> {
    match department_id {
        Some(department_id) => all_doctors
            .iter()
            .filter(|doctor| doctor.department_id == department_id)
            .cloned()
            .collect(),
        None => all_doctors.to_vec(),
    }
}

/// The doctor selection that survives a department change: kept only if the
/// doctor is still offered.
pub fn retain_doctor(doctor_id: Option<&str>, visible_doctors: &[Doctor]) -> Option<String> {
    doctor_id
        .filter(|id| visible_doctors.iter().any(|doctor| doctor.id == *id))
        .map(str::to_string)
}

/// The department a doctor selection implies, if it differs from the current
/// one. Applying it never evicts `doctor`, since `doctor` is in its own
/// department's list.
pub fn department_for_doctor(current_department: Option<&str>, doctor: &Doctor) -> Option<String> {
    if current_department == Some(doctor.department_id.as_str()) {
        None
    } else {
        Some(doctor.department_id.clone())
    }
}

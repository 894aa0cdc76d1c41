use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_config::{AppConfig, DEFAULT_FORM_SESSION_IDLE_SECS};

/// Method path prefix the default scheduling URL resolves to.
pub const SCHEDULING_METHOD_PREFIX: &str = "/api/method/docgenie.utils.api_testing";

pub struct TestConfig {
    pub scheduling_api_url: String,
    pub scheduling_api_key: String,
    pub scheduling_api_secret: String,
    pub require_phone_verification: bool,
    pub require_email_verification: bool,
    pub form_session_idle_secs: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            scheduling_api_url: format!("http://localhost:8000{}", SCHEDULING_METHOD_PREFIX),
            scheduling_api_key: "test-api-key".to_string(),
            scheduling_api_secret: "test-api-secret".to_string(),
            require_phone_verification: true,
            require_email_verification: true,
            form_session_idle_secs: DEFAULT_FORM_SESSION_IDLE_SECS,
        }
    }
}

impl TestConfig {
    /// Point the scheduling API at a wiremock server.
    pub fn for_mock_server(server: &MockServer) -> Self {
        Self {
            scheduling_api_url: format!("{}{}", server.uri(), SCHEDULING_METHOD_PREFIX),
            ..Self::default()
        }
    }

    pub fn without_verification(mut self) -> Self {
        self.require_phone_verification = false;
        self.require_email_verification = false;
        self
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            scheduling_api_url: self.scheduling_api_url.clone(),
            scheduling_api_key: self.scheduling_api_key.clone(),
            scheduling_api_secret: self.scheduling_api_secret.clone(),
            require_phone_verification: self.require_phone_verification,
            require_email_verification: self.require_email_verification,
            form_session_idle_secs: self.form_session_idle_secs,
            port: 3000,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

/// Canned payloads in the shape the Frappe scheduling API returns them.
pub struct MockSchedulingResponses;

impl MockSchedulingResponses {
    pub fn departments() -> Value {
        json!({
            "message": [
                {"dept_id": "D01", "dept_name": "General Surgery"},
                {"dept_id": "D02", "dept_name": "Dermatology"},
                {"dept_id": "D03", "dept_name": "Pediatrics"}
            ]
        })
    }

    pub fn centers() -> Value {
        json!({
            "message": [
                {"center_id": "C01", "center_name": "Ameerpet - DK Road"},
                {"center_id": "C02", "center_name": "Kompally"}
            ]
        })
    }

    pub fn doctors() -> Value {
        json!({
            "message": [
                Self::doctor("DR1", "Dr. Sai Sudhakar", "D01", "General Surgery", "C01", "Ameerpet - DK Road"),
                Self::doctor("DR2", "Dr. Jessica Brown", "D01", "General Surgery", "C02", "Kompally"),
                Self::doctor("DR3", "Dr. Emily Davis", "D02", "Dermatology", "C01", "Ameerpet - DK Road")
            ]
        })
    }

    pub fn doctor(
        id: &str,
        name: &str,
        dept_id: &str,
        dept_name: &str,
        center_id: &str,
        center_name: &str,
    ) -> Value {
        json!({
            "doctor_id": id,
            "doctor_name": name,
            "dept_id": dept_id,
            "dept_name": dept_name,
            "center_id": center_id,
            "center_name": center_name
        })
    }

    pub fn department_doctors() -> Value {
        json!({
            "message": [
                {
                    "doctor_id": "DR1",
                    "doctor_name": "Dr. Sai Sudhakar",
                    "dept_id": "D01",
                    "center_id": "C01",
                    "specialization": "Laparoscopic Surgery"
                }
            ]
        })
    }

    pub fn slots(slots: &[&str]) -> Value {
        json!({
            "message": {
                "return_code": "0",
                "error_text": "",
                "avaiable_slots": slots
            }
        })
    }

    pub fn slots_error(error_text: &str) -> Value {
        json!({
            "message": {
                "return_code": "1",
                "error_text": error_text,
                "avaiable_slots": []
            }
        })
    }

    pub fn appointment_saved(appointment_id: &str) -> Value {
        json!({
            "message": {
                "return_code": "0",
                "error_text": "",
                "appointment_id": appointment_id
            }
        })
    }

    pub fn appointment_rejected(error_text: &str) -> Value {
        json!({
            "message": {
                "return_code": "1",
                "error_text": error_text
            }
        })
    }

    /// Mount the three reference-data methods.
    pub async fn mount_reference_data(server: &MockServer) {
        for (name, body) in [
            ("get_unique_departments", Self::departments()),
            ("get_unique_centers", Self::centers()),
            ("get_unique_doctor", Self::doctors()),
        ] {
            Mock::given(method("GET"))
                .and(path(method_path(name)))
                .respond_with(ResponseTemplate::new(200).set_body_json(body))
                .mount(server)
                .await;
        }
    }

    /// Mount `check_available_slots` for one doctor, optionally delayed.
    pub async fn mount_slots(server: &MockServer, doctor_id: &str, body: Value, delay: Option<Duration>) {
        let mut response = ResponseTemplate::new(200).set_body_json(body);
        if let Some(delay) = delay {
            response = response.set_delay(delay);
        }

        Mock::given(method("GET"))
            .and(path(method_path("check_available_slots")))
            .and(query_param("doctor_id", doctor_id))
            .respond_with(response)
            .mount(server)
            .await;
    }
}

pub fn method_path(name: &str) -> String {
    format!("{}.{}", SCHEDULING_METHOD_PREFIX, name)
}

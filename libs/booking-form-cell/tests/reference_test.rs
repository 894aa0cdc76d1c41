mod common;

use booking_form_cell::reference::load_reference_data;
use booking_form_cell::*;
use common::*;
use shared_scheduling::FrappeClient;
use shared_utils::test_utils::{method_path, MockSchedulingResponses, TestConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_loads_all_collections() {
    let backend = FakeBackend::new();

    let reference = load_reference_data(&backend).await;

    assert_eq!(reference.departments.len(), 2);
    assert_eq!(reference.centers.len(), 2);
    assert_eq!(reference.doctors.len(), 3);
    assert!(reference.load_errors.is_empty());
}

#[tokio::test]
async fn test_failed_collection_does_not_block_others() {
    let backend = FakeBackend {
        fail_doctors: true,
        ..FakeBackend::new()
    };

    let reference = load_reference_data(&backend).await;

    assert_eq!(reference.departments.len(), 2);
    assert_eq!(reference.centers.len(), 2);
    assert!(reference.doctors.is_empty());
    assert_eq!(reference.load_errors.len(), 1);
    assert!(reference.load_errors[0].starts_with("Failed to load doctors"));
}

#[tokio::test]
async fn test_every_collection_can_fail() {
    let backend = FakeBackend {
        fail_departments: true,
        fail_centers: true,
        fail_doctors: true,
        ..FakeBackend::new()
    };

    let reference = load_reference_data(&backend).await;

    assert!(reference.departments.is_empty());
    assert!(reference.centers.is_empty());
    assert!(reference.doctors.is_empty());
    assert_eq!(reference.load_errors.len(), 3);

    // The form still opens, with nothing to pick.
    let form = FormController::new(reference, both_channels());
    assert!(form.visible_doctors().is_empty());
    assert_eq!(form.view().load_errors.len(), 3);
}

#[tokio::test]
async fn test_loads_from_frappe_api() {
    let mock_server = MockServer::start().await;
    MockSchedulingResponses::mount_reference_data(&mock_server).await;
    let client = FrappeClient::new(&TestConfig::for_mock_server(&mock_server).to_app_config());

    let reference = load_reference_data(&client).await;

    assert!(reference.load_errors.is_empty());
    assert_eq!(reference.department("D02").unwrap().name, "Dermatology");
    assert_eq!(reference.center("C02").unwrap().name, "Kompally");

    let doctor = reference.doctor("DR2").unwrap();
    assert_eq!(doctor.name, "Dr. Jessica Brown");
    assert_eq!(doctor.department_id, "D01");
    assert_eq!(doctor.center_id, "C02");
}

#[tokio::test]
async fn test_frappe_failure_recorded_per_collection() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(method_path("get_unique_departments")))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockSchedulingResponses::departments()))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(method_path("get_unique_centers")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(method_path("get_unique_doctor")))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let client = FrappeClient::new(&TestConfig::for_mock_server(&mock_server).to_app_config());
    let reference = load_reference_data(&client).await;

    assert_eq!(reference.departments.len(), 3);
    assert!(reference.centers.is_empty());
    assert!(reference.doctors.is_empty());
    assert_eq!(reference.load_errors.len(), 2);
    assert!(reference.load_errors[0].contains("locations"));
    assert!(reference.load_errors[1].contains("Authentication error"));
}

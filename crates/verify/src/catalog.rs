//! Built-in scenarios for the role-specific dashboards
//!
//! Link names here are the accessibility contract with the application.
//! Renaming a navigation label in the app breaks these on purpose.

use crate::error::VerifyResult;
use crate::locator::{ElementLocator, Role};
use crate::scenario::{Scenario, Step};

pub const PATIENT_DASHBOARD: &str = "/patient-dashboard";
pub const DOCTOR_DASHBOARD: &str = "/doctor-dashboard";
pub const HOSPITAL_DASHBOARD: &str = "/hospital-dashboard";
pub const UPLOAD_PAGE: &str = "/upload";

pub const PATIENT_LINKS: [&str; 6] = [
    "My Documents",
    "Search Documents",
    "My Appointments",
    "Book Appointment",
    "Upload Documents",
    "Family Access",
];

pub const DOCTOR_LINKS: [&str; 3] = ["Dashboard", "My Patients", "Appointments"];

fn links_visible<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<Step> {
    names
        .into_iter()
        .map(|name| Step::expect_visible(ElementLocator::link(name)))
        .collect()
}

pub fn patient_sidebar() -> Scenario {
    Scenario::new("patient-sidebar")
        .describe("Patient navigation links are visible")
        .tag("sidebar")
        .tag("patient")
        .step(Step::navigate(PATIENT_DASHBOARD))
        .steps(links_visible(PATIENT_LINKS))
}

pub fn doctor_sidebar() -> Scenario {
    Scenario::new("doctor-sidebar")
        .describe("Doctor navigation links are visible")
        .tag("sidebar")
        .tag("doctor")
        .step(Step::navigate(DOCTOR_DASHBOARD))
        .steps(links_visible(DOCTOR_LINKS))
}

pub fn hospital_staff_sidebar() -> VerifyResult<Scenario> {
    let appointments = ElementLocator::matching(Role::Link, "Appointments")?;

    Ok(Scenario::new("hospital-staff-sidebar")
        .describe("Hospital staff navigation links are visible")
        .tag("sidebar")
        .tag("hospital")
        .step(Step::navigate(HOSPITAL_DASHBOARD))
        .steps(links_visible(["Dashboard", "Patients", "Add Patient", "Doctors"]))
        .step(Step::expect_visible(appointments))
        .steps(links_visible(["Add Record"])))
}

/// Clicking patient tabs updates both the fragment and the content
pub fn patient_fragment_routing() -> Scenario {
    let tab = |link: &str, fragment: &str, content: &str| {
        [
            Step::click(ElementLocator::link(link)),
            Step::expect_url(format!("{}#{}", PATIENT_DASHBOARD, fragment)),
            Step::expect_visible(ElementLocator::text(content)),
        ]
    };

    Scenario::new("patient-fragment-routing")
        .describe("Patient dashboard tabs route through the URL fragment")
        .tag("routing")
        .tag("patient")
        .step(Step::navigate(PATIENT_DASHBOARD))
        .step(Step::expect_visible(ElementLocator::text("My Documents")))
        .steps(tab("Search Documents", "search", "Enhanced Document Search"))
        .steps(tab("Upload Documents", "upload", "Upload a new document"))
        .steps(tab("Family Access", "family", "Manage Family Access"))
        .step(Step::click(ElementLocator::link("My Documents")))
        .step(Step::expect_url(format!("{}#documents", PATIENT_DASHBOARD)))
        .step(Step::capture("documents-tab"))
}

/// The camera control on the public upload page opens the scanner dialog
pub fn camera_upload() -> Scenario {
    Scenario::new("camera-upload")
        .describe("Open Camera shows the document scanner dialog")
        .tag("upload")
        .step(Step::navigate(UPLOAD_PAGE))
        .step(Step::click(ElementLocator::button("Open Camera")))
        .step(Step::expect_visible(ElementLocator::role(Role::Dialog)))
        .step(Step::capture("scanner-dialog"))
}

/// Evidence of what the patient dashboard renders once its navigation is up
pub fn patient_dashboard_evidence() -> Scenario {
    Scenario::new("patient-dashboard-evidence")
        .describe("Screenshot of the loaded patient dashboard")
        .tag("evidence")
        .tag("patient")
        .step(Step::navigate(PATIENT_DASHBOARD))
        .step(Step::expect_visible(ElementLocator::link("My Documents")))
        .step(Step::capture("patient-dashboard"))
}

/// Deliberately failing probe: checks the harness reports missing links
pub fn missing_link_probe(timeout_ms: u64) -> Scenario {
    Scenario::new("missing-link-probe")
        .describe("A link that does not exist must fail with a timeout")
        .tag("negative")
        .step(Step::navigate(PATIENT_DASHBOARD))
        .step(Step::expect_visible(ElementLocator::link("Nonexistent Link")).within_ms(timeout_ms))
}

/// Every positive scenario, in run order
pub fn all() -> VerifyResult<Vec<Scenario>> {
    Ok(vec![
        patient_sidebar(),
        doctor_sidebar(),
        hospital_staff_sidebar()?,
        patient_fragment_routing(),
        camera_upload(),
        patient_dashboard_evidence(),
    ])
}

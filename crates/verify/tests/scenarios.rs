//! End-to-end runs of the built-in scenarios against the simulated application

mod common;

use std::time::Duration;

use common::{FakeApp, BASE_URL};
use dashboard_verify::catalog;
use dashboard_verify::runner::write_results;
use dashboard_verify::{
    ElementLocator, EvidenceStore, RunnerConfig, Scenario, ScenarioRunner, Step, Verdict,
};

fn runner_config() -> RunnerConfig {
    RunnerConfig::default()
}

fn store(dir: &tempfile::TempDir) -> EvidenceStore {
    EvidenceStore::with_run_id(dir.path(), "test-run")
}

#[tokio::test(start_paused = true)]
async fn test_patient_sidebar_passes() {
    let app = FakeApp::new();
    let mut session = app.session();
    let dir = tempfile::tempdir().unwrap();
    let mut runner = ScenarioRunner::new(&mut session, store(&dir), runner_config());

    let report = runner.run(&catalog::patient_sidebar()).await;

    assert_eq!(report.verdict, Verdict::Passed, "{:?}", report.failure_summary());
    assert_eq!(report.steps.len(), 7);
    assert!(report.steps.iter().all(|s| s.success));
    assert_eq!(app.navigations(), vec![format!("{}/patient-dashboard", BASE_URL)]);
}

#[tokio::test(start_paused = true)]
async fn test_doctor_and_hospital_sidebars_pass() {
    let app = FakeApp::new();
    let mut session = app.session();
    let dir = tempfile::tempdir().unwrap();
    let mut runner = ScenarioRunner::new(&mut session, store(&dir), runner_config());

    let report = runner
        .run_all(&[
            catalog::doctor_sidebar(),
            catalog::hospital_staff_sidebar().unwrap(),
        ])
        .await;

    assert!(report.success(), "{:?}", report.scenarios[1].failure_summary());
    assert_eq!(report.passed, 2);
}

#[tokio::test(start_paused = true)]
async fn test_fragment_routing_updates_url_and_content() {
    let app = FakeApp::new().route_delay(Duration::from_millis(250));
    let mut session = app.session();
    let dir = tempfile::tempdir().unwrap();
    let mut runner = ScenarioRunner::new(&mut session, store(&dir), runner_config());

    let report = runner.run(&catalog::patient_fragment_routing()).await;

    assert_eq!(report.verdict, Verdict::Passed, "{:?}", report.failure_summary());
    assert_eq!(
        app.clicks(),
        vec!["Search Documents", "Upload Documents", "Family Access", "My Documents"]
    );
    assert_eq!(app.url(), format!("{}/patient-dashboard#documents", BASE_URL));

    let url_details: Vec<&str> = report
        .steps
        .iter()
        .filter(|s| s.step.starts_with("assert:page"))
        .filter_map(|s| s.detail.as_deref())
        .collect();
    assert_eq!(url_details[0], "url http://127.0.0.1:8080/patient-dashboard#search");
    assert_eq!(url_details[1], "url http://127.0.0.1:8080/patient-dashboard#upload");

    assert_eq!(report.evidence.len(), 1);
    assert!(report.evidence[0].path.ends_with("test-run/patient-fragment-routing/1-13-documents-tab.png"));
}

#[tokio::test(start_paused = true)]
async fn test_camera_upload_opens_dialog_and_captures() {
    let app = FakeApp::new().dialog_delay(Duration::from_millis(400));
    let mut session = app.session();
    let dir = tempfile::tempdir().unwrap();
    let mut runner = ScenarioRunner::new(&mut session, store(&dir), runner_config());

    let report = runner.run(&catalog::camera_upload()).await;

    assert_eq!(report.verdict, Verdict::Passed, "{:?}", report.failure_summary());
    assert_eq!(report.evidence.len(), 1);

    let shot = &report.evidence[0];
    let written = std::fs::metadata(&shot.path).unwrap();
    assert!(written.len() > 0);
    assert_eq!(shot.bytes, written.len());
    assert_eq!((shot.width, shot.height), (8, 6));
    assert_eq!(shot.sha256.len(), 64);
}

#[tokio::test(start_paused = true)]
async fn test_missing_link_fails_with_timeout() {
    let app = FakeApp::new();
    let mut session = app.session();
    let dir = tempfile::tempdir().unwrap();
    let mut runner = ScenarioRunner::new(&mut session, store(&dir), runner_config());

    let report = runner.run(&catalog::missing_link_probe(500)).await;

    match &report.verdict {
        Verdict::Failed { step, reason } => {
            assert_eq!(*step, 1);
            assert!(reason.contains("Timed out after 500 ms"), "{}", reason);
            assert!(reason.contains("link named \"Nonexistent Link\" to be visible"), "{}", reason);
            assert!(reason.contains("last observed: no elements matched"), "{}", reason);
        }
        Verdict::Passed => panic!("missing link must not pass"),
    }
    assert_eq!(report.steps.len(), 2);
    assert!(!report.steps[1].success);
}

#[tokio::test(start_paused = true)]
async fn test_failed_navigation_is_isolated() {
    let app = FakeApp::new().unreachable("/nowhere");
    let mut session = app.session();
    let dir = tempfile::tempdir().unwrap();
    let mut runner = ScenarioRunner::new(&mut session, store(&dir), runner_config());

    let broken = Scenario::new("broken-first-step")
        .step(Step::navigate("/nowhere"))
        .step(Step::click(ElementLocator::link("My Documents")))
        .step(Step::capture("never"));

    let report = runner.run_all(&[broken, catalog::patient_sidebar()]).await;

    assert_eq!(report.total, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.passed, 1);
    assert!(!report.success());

    let first = &report.scenarios[0];
    match &first.verdict {
        Verdict::Failed { step, reason } => {
            assert_eq!(*step, 0);
            assert!(reason.contains("did not complete"), "{}", reason);
        }
        Verdict::Passed => panic!("navigation failure must fail the scenario"),
    }
    assert_eq!(first.steps.len(), 1);
    assert!(app.clicks().is_empty());
    assert!(first.evidence.is_empty());

    assert_eq!(report.scenarios[1].verdict, Verdict::Passed);
}

#[tokio::test(start_paused = true)]
async fn test_click_on_missing_element_fails_step() {
    let app = FakeApp::new();
    let mut session = app.session();
    let dir = tempfile::tempdir().unwrap();
    let mut runner = ScenarioRunner::new(&mut session, store(&dir), runner_config());

    let scenario = Scenario::new("click-missing")
        .step(Step::navigate("/doctor-dashboard"))
        .step(Step::click(ElementLocator::link("Family Access")))
        .step(Step::expect_url("/doctor-dashboard#family"));

    let report = runner.run(&scenario).await;
    match report.verdict {
        Verdict::Failed { step, reason } => {
            assert_eq!(step, 1);
            assert_eq!(reason, "Element not found: link named \"Family Access\"");
        }
        Verdict::Passed => panic!("click on a missing link must fail"),
    }
    assert!(app.clicks().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_capture_failure_does_not_fail_scenario() {
    let app = FakeApp::new().broken_screenshots();
    let mut session = app.session();
    let dir = tempfile::tempdir().unwrap();
    let mut runner = ScenarioRunner::new(&mut session, store(&dir), runner_config());

    let report = runner.run(&catalog::patient_dashboard_evidence()).await;

    assert_eq!(report.verdict, Verdict::Passed);
    assert!(report.evidence.is_empty());
    let capture = report.steps.last().unwrap();
    assert!(capture.success);
    assert!(capture.warning.as_deref().unwrap_or_default().starts_with("Capture to"));
}

#[tokio::test(start_paused = true)]
async fn test_invalid_scenario_never_touches_session() {
    let app = FakeApp::new();
    let mut session = app.session();
    let dir = tempfile::tempdir().unwrap();
    let mut runner = ScenarioRunner::new(&mut session, store(&dir), runner_config());

    let scenario = Scenario::new("assert-first")
        .step(Step::expect_visible(ElementLocator::link("My Documents")));
    let report = runner.run(&scenario).await;

    assert!(matches!(report.verdict, Verdict::Failed { step: 0, .. }));
    assert_eq!(report.attempts, 0);
    assert!(app.navigations().is_empty());
    assert_eq!(app.snapshots(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_retry_policy_recovers_flaky_first_load() {
    let dir = tempfile::tempdir().unwrap();

    let app = FakeApp::new().failing_loads(1);
    let mut session = app.session();
    let mut runner = ScenarioRunner::new(&mut session, store(&dir), runner_config());
    let report = runner.run(&catalog::doctor_sidebar()).await;
    assert!(matches!(report.verdict, Verdict::Failed { step: 0, .. }));
    assert_eq!(report.attempts, 1);

    let app = FakeApp::new().failing_loads(1);
    let mut session = app.session();
    let config = RunnerConfig {
        retries: 1,
        ..RunnerConfig::default()
    };
    let mut runner = ScenarioRunner::new(&mut session, store(&dir), config);
    let report = runner.run(&catalog::doctor_sidebar()).await;
    assert_eq!(report.verdict, Verdict::Passed);
    assert_eq!(report.attempts, 2);
    assert_eq!(app.navigations().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_report_written_as_json() {
    let app = FakeApp::new();
    let mut session = app.session();
    let dir = tempfile::tempdir().unwrap();
    let mut runner = ScenarioRunner::new(&mut session, store(&dir), runner_config());

    let report = runner
        .run_all(&[catalog::patient_sidebar(), catalog::missing_link_probe(200)])
        .await;
    let path = write_results(&report, &dir.path().join("out")).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(json["run_id"], "test-run");
    assert_eq!(json["passed"], 1);
    assert_eq!(json["failed"], 1);
    assert_eq!(json["scenarios"][0]["verdict"]["status"], "passed");
    assert_eq!(json["scenarios"][1]["verdict"]["status"], "failed");
    assert_eq!(json["scenarios"][1]["verdict"]["step"], 1);
}

#[tokio::test(start_paused = true)]
async fn test_yaml_scenario_runs_like_builtin() {
    let yaml = r##"
name: yaml-upload-tab
tags: [routing]
steps:
  - action: navigate
    url: /patient-dashboard
  - action: click
    locator: { role: link, name: Upload Documents }
  - action: assert
    condition:
      has_url: { pattern: "#upload$" }
  - action: assert
    locator: { role: heading }
    condition:
      has_text: Upload a new document
"##;
    let scenario = Scenario::from_yaml(yaml).unwrap();

    let app = FakeApp::new().route_delay(Duration::from_millis(120));
    let mut session = app.session();
    let dir = tempfile::tempdir().unwrap();
    let mut runner = ScenarioRunner::new(&mut session, store(&dir), runner_config());

    let report = runner.run(&scenario).await;
    assert_eq!(report.verdict, Verdict::Passed, "{:?}", report.failure_summary());
}

#[tokio::test(start_paused = true)]
async fn test_similar_scenario_names_keep_separate_evidence() {
    let app = FakeApp::new();
    let mut session = app.session();
    let dir = tempfile::tempdir().unwrap();
    let mut runner = ScenarioRunner::new(&mut session, store(&dir), runner_config());

    let scenarios: Vec<Scenario> = ["Camera Upload", "camera-upload", "Запись", "Приём"]
        .into_iter()
        .map(|name| {
            Scenario::new(name)
                .step(Step::navigate("/upload"))
                .step(Step::capture("shot"))
        })
        .collect();

    let report = runner.run_all(&scenarios).await;
    assert!(report.success());

    let mut paths: Vec<_> = report
        .scenarios
        .iter()
        .flat_map(|s| s.evidence.iter().map(|e| e.path.clone()))
        .collect();
    assert_eq!(paths.len(), 4);
    for path in &paths {
        assert!(path.exists(), "{}", path.display());
    }
    paths.sort();
    paths.dedup();
    assert_eq!(paths.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_capture_to_explicit_path() {
    let app = FakeApp::new();
    let mut session = app.session();
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("chosen").join("upload.png");
    let mut runner = ScenarioRunner::new(&mut session, store(&dir), runner_config());

    let scenario = Scenario::new("upload-shot")
        .step(Step::navigate("/upload"))
        .step(Step::capture_to("upload", &target));

    let report = runner.run(&scenario).await;

    assert_eq!(report.verdict, Verdict::Passed);
    assert_eq!(report.evidence.len(), 1);
    assert_eq!(report.evidence[0].path, target);
    assert!(std::fs::metadata(&target).unwrap().len() > 0);
}

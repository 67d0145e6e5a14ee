//! Port conflict coordination: resolution order, config rewrites, failure paths.

mod common;

use common::{backend_file, frontend_file, write_project, FakePlatform, BACKEND_YAML, VITE_CONFIG};
use devctl::orchestrator::PortCoordinator;
use devctl::rewrite::UpdateStatus;
use devctl::{Config, Error, ServiceKind};
use std::fs;

#[test]
fn backend_conflict_moves_backend_and_retargets_proxy() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_project(dir.path());
    let fake = FakePlatform::new();
    fake.occupy(&[8081]);

    let assignment = PortCoordinator::new(&config, fake.clone()).resolve().unwrap();

    assert_eq!(assignment.backend_port(), 8082);
    assert_eq!(assignment.frontend_port(), 5173);
    assert!(assignment.backend.changed);
    assert!(!assignment.frontend.changed);

    let backend = backend_file(dir.path());
    assert!(backend.contains("  port: 8082\n"));
    assert!(!backend.contains("8081"));

    let frontend = frontend_file(dir.path());
    assert!(frontend.contains("target: 'http://localhost:8082'"));
    assert!(frontend.contains("    port: 5173,\n"));

    let statuses: Vec<_> = assignment
        .config_updates
        .iter()
        .map(|u| (u.service, u.status.clone()))
        .collect();
    assert_eq!(
        statuses,
        vec![
            (ServiceKind::Backend, UpdateStatus::Updated),
            (ServiceKind::Frontend, UpdateStatus::Updated),
        ]
    );
}

#[test]
fn exhausted_backend_fails_without_touching_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_project(dir.path());
    let fake = FakePlatform::new();
    fake.occupy(&[8081, 8082, 8083, 8084]);

    let err = PortCoordinator::new(&config, fake.clone())
        .resolve()
        .unwrap_err();

    assert!(matches!(
        err,
        Error::NoPortAvailable {
            service: ServiceKind::Backend,
            ..
        }
    ));
    assert!(err.to_string().contains("backend"));
    assert_eq!(backend_file(dir.path()), BACKEND_YAML);
    assert_eq!(frontend_file(dir.path()), VITE_CONFIG);
    // Frontend never probed once the backend failed
    assert!(fake.probes().iter().all(|p| !(5173..=5176).contains(p)));
}

#[test]
fn exhausted_frontend_fails_without_touching_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_project(dir.path());
    let fake = FakePlatform::new();
    fake.occupy(&[8081, 5173, 5174, 5175, 5176]);

    let err = PortCoordinator::new(&config, fake).resolve().unwrap_err();

    assert!(matches!(
        err,
        Error::NoPortAvailable {
            service: ServiceKind::Frontend,
            ..
        }
    ));
    // Backend already moved in memory, but nothing was written
    assert_eq!(backend_file(dir.path()), BACKEND_YAML);
    assert_eq!(frontend_file(dir.path()), VITE_CONFIG);
}

#[test]
fn preferred_ports_free_means_no_rewrite() {
    let dir = tempfile::tempdir().unwrap();
    // No config files on disk at all: any rewrite attempt would be recorded as a failure
    let config = Config::defaults(dir.path());
    let fake = FakePlatform::new();

    let assignment = PortCoordinator::new(&config, fake.clone()).resolve().unwrap();

    assert_eq!(assignment.backend_port(), 8081);
    assert_eq!(assignment.frontend_port(), 5173);
    assert!(!assignment.any_changed());
    assert!(assignment.config_updates.is_empty());
    assert_eq!(fake.probes(), vec![8081, 5173]);
}

#[test]
fn frontend_only_move_rewrites_frontend_only() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_project(dir.path());
    let fake = FakePlatform::new();
    fake.occupy(&[5173, 5174]);

    let assignment = PortCoordinator::new(&config, fake).resolve().unwrap();

    assert_eq!(assignment.backend_port(), 8081);
    assert_eq!(assignment.frontend_port(), 5175);
    assert_eq!(backend_file(dir.path()), BACKEND_YAML);

    let frontend = frontend_file(dir.path());
    assert!(frontend.contains("    port: 5175,\n"));
    assert!(frontend.contains("target: 'http://localhost:8081'"));

    assert_eq!(assignment.config_updates.len(), 1);
    assert_eq!(assignment.config_updates[0].service, ServiceKind::Frontend);
}

#[test]
fn failed_config_write_does_not_abort_resolution() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_project(dir.path());
    fs::remove_file(dir.path().join("frontend/vite.config.js")).unwrap();
    let fake = FakePlatform::new();
    fake.occupy(&[8081]);

    let assignment = PortCoordinator::new(&config, fake).resolve().unwrap();

    assert_eq!(assignment.backend_port(), 8082);
    assert!(backend_file(dir.path()).contains("port: 8082"));

    let frontend_update = assignment
        .config_updates
        .iter()
        .find(|u| u.service == ServiceKind::Frontend)
        .unwrap();
    assert!(matches!(frontend_update.status, UpdateStatus::Failed(_)));
    assert!(!dir.path().join("frontend/vite.config.js").exists());
}

#[test]
fn service_without_config_file_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = write_project(dir.path());
    config.backend.config_file = None;
    let fake = FakePlatform::new();
    fake.occupy(&[8081]);

    let assignment = PortCoordinator::new(&config, fake).resolve().unwrap();

    assert_eq!(assignment.backend_port(), 8082);
    assert_eq!(backend_file(dir.path()), BACKEND_YAML);
    assert_eq!(assignment.config_updates.len(), 1);
    assert_eq!(assignment.config_updates[0].service, ServiceKind::Frontend);
}

#[test]
fn assignment_serializes_for_json_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_project(dir.path());
    let fake = FakePlatform::new();
    fake.occupy(&[8081]);

    let assignment = PortCoordinator::new(&config, fake).resolve().unwrap();
    let json = serde_json::to_value(&assignment).unwrap();

    assert_eq!(json["backend"]["chosen_port"], 8082);
    assert_eq!(json["backend"]["changed"], true);
    assert_eq!(json["frontend"]["service"], "frontend");
    assert_eq!(json["config_updates"][0]["status"], "updated");
}

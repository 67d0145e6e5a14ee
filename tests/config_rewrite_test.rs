//! Config file rewrites on disk, plus idempotence over generated inputs.

mod common;

use common::{BACKEND_YAML, VITE_CONFIG};
use devctl::rewrite::{
    rewrite_backend_port, rewrite_backend_port_text, rewrite_frontend_port,
    rewrite_frontend_port_text, RewriteOutcome,
};
use devctl::Error;
use proptest::prelude::*;
use std::fs;

#[test]
fn backend_file_moves_to_fallback_port() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("application.yml");
    fs::write(&path, BACKEND_YAML).unwrap();

    let outcome = rewrite_backend_port(&path, 8082).unwrap();

    assert_eq!(outcome, RewriteOutcome::Updated);
    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("  port: 8082\n"));
    assert!(!content.contains("8081"));
    assert_eq!(content, BACKEND_YAML.replace("8081", "8082"));

    // Second run finds nothing to do
    assert_eq!(
        rewrite_backend_port(&path, 8082).unwrap(),
        RewriteOutcome::Unchanged
    );
}

#[test]
fn properties_file_is_supported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("application.properties");
    fs::write(
        &path,
        "spring.application.name=as-service\nserver.port=8081\nlogging.level.root=INFO\n",
    )
    .unwrap();

    rewrite_backend_port(&path, 8084).unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "spring.application.name=as-service\nserver.port=8084\nlogging.level.root=INFO\n"
    );
}

#[test]
fn frontend_file_follows_backend_move_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vite.config.js");
    fs::write(&path, VITE_CONFIG).unwrap();

    let outcome = rewrite_frontend_port(&path, 5173, 8082).unwrap();

    assert_eq!(outcome, RewriteOutcome::Updated);
    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("target: 'http://localhost:8082'"));
    assert!(content.contains("    port: 5173,\n"));
    assert_eq!(content, VITE_CONFIG.replace("localhost:8081", "localhost:8082"));
}

#[test]
fn frontend_file_gets_both_ports() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vite.config.js");
    fs::write(&path, VITE_CONFIG).unwrap();

    rewrite_frontend_port(&path, 5175, 8083).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("    port: 5175,\n"));
    assert!(content.contains("target: 'http://localhost:8083'"));
    assert!(content.contains("changeOrigin: true"));
}

#[test]
fn missing_frontend_port_is_inserted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vite.config.ts");
    let original = "export default defineConfig({\n  server: {\n    host: true,\n  },\n})\n";
    fs::write(&path, original).unwrap();

    rewrite_frontend_port(&path, 5174, 8081).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("server: {\n    port: 5174,"), "{}", content);
    assert!(content.contains("host: true,"));
    assert_eq!(
        rewrite_frontend_port(&path, 5174, 8081).unwrap(),
        RewriteOutcome::Unchanged
    );
}

#[test]
fn missing_file_is_reported_not_created() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vite.config.js");

    let err = rewrite_frontend_port(&path, 5174, 8082).unwrap_err();

    assert!(matches!(err, Error::ConfigWrite { .. }));
    assert!(!path.exists());
}

#[test]
fn rewrite_leaves_no_temp_files_behind() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("application.yml");
    fs::write(&path, BACKEND_YAML).unwrap();

    rewrite_backend_port(&path, 8083).unwrap();

    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["application.yml".to_string()]);
}

fn yaml_line() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("server:".to_string()),
        (1u16..=65535).prop_map(|p| format!("  port: {}", p)),
        (1u16..=65535).prop_map(|p| format!("server.port={}", p)),
        Just("spring:".to_string()),
        Just("  datasource:".to_string()),
        (1u16..=65535).prop_map(|p| format!("    url: jdbc:postgresql://localhost:{}/db", p)),
        Just("# comment".to_string()),
        Just(String::new()),
        "[a-z]{1,8}: [a-z0-9]{0,8}",
    ]
}

fn vite_line() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("export default defineConfig({".to_string()),
        Just("  server: {".to_string()),
        (1u16..=65535).prop_map(|p| format!("    port: {},", p)),
        Just("    proxy: {".to_string()),
        (1u16..=65535).prop_map(|p| format!("      '/api': {{ target: 'http://localhost:{}' }},", p)),
        (1u16..=65535).prop_map(|p| format!("      target: \"http://127.0.0.1:{}\",", p)),
        Just("    },".to_string()),
        Just("  },".to_string()),
        Just("})".to_string()),
        Just("// server: { port: 1 }".to_string()),
        Just("  plugins: [react()],".to_string()),
        Just(String::new()),
    ]
}

proptest! {
    #[test]
    fn backend_rewrite_is_idempotent(
        lines in prop::collection::vec(yaml_line(), 0..12),
        port in 1u16..=65535,
    ) {
        let content = lines.join("\n");
        let once = rewrite_backend_port_text(&content, port);
        let twice = rewrite_backend_port_text(&once, port);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn frontend_rewrite_is_idempotent(
        lines in prop::collection::vec(vite_line(), 0..14),
        frontend_port in 1u16..=65535,
        backend_port in 1u16..=65535,
    ) {
        let content = lines.join("\n");
        let once = rewrite_frontend_port_text(&content, frontend_port, backend_port);
        let twice = rewrite_frontend_port_text(&once, frontend_port, backend_port);
        prop_assert_eq!(once, twice);
    }
}

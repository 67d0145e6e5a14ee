//! Process reaper behavior against a scripted platform.

mod common;

use common::FakePlatform;
use devctl::config::ReaperConfig;
use devctl::orchestrator::{KillResult, ReapTarget, Reaper};
use devctl::platform::TerminateMode;
use std::sync::Arc;
use std::time::Duration;

fn reaper(fake: &Arc<FakePlatform>) -> Reaper {
    let config = ReaperConfig {
        sweep_pause: Duration::ZERO,
        ..Default::default()
    };
    Reaper::new(fake.clone(), &config).with_term_wait(Duration::from_millis(50))
}

#[tokio::test]
async fn empty_port_is_a_no_op_every_time() {
    let fake = FakePlatform::new();
    let reaper = reaper(&fake);

    for _ in 0..2 {
        let outcome = reaper.kill_process_on_port(8081).await;
        assert_eq!(outcome.target, ReapTarget::Port(8081));
        assert!(outcome.nothing_found());
        assert_eq!(outcome.stopped_count(), 0);
    }
    assert!(fake.signals().is_empty());
}

#[tokio::test]
async fn graceful_signal_is_enough_for_cooperative_process() {
    let fake = FakePlatform::new();
    fake.listen(8081, 4242, "java");
    let reaper = reaper(&fake);

    let outcome = reaper.kill_process_on_port(8081).await;

    assert_eq!(outcome.processes.len(), 1);
    assert_eq!(outcome.processes[0].process.pid, 4242);
    assert_eq!(outcome.processes[0].result, KillResult::Terminated);
    assert_eq!(fake.signals(), vec![(4242, TerminateMode::Graceful)]);
    assert!(!fake.is_running(4242));
}

#[tokio::test]
async fn stubborn_process_is_force_killed() {
    let fake = FakePlatform::new();
    fake.listen(5173, 4343, "node");
    fake.ignore_term(4343);
    let reaper = reaper(&fake);

    let outcome = reaper.kill_process_on_port(5173).await;

    assert_eq!(outcome.processes[0].result, KillResult::ForceKilled);
    assert_eq!(outcome.stopped_count(), 1);
    assert_eq!(
        fake.signals(),
        vec![(4343, TerminateMode::Graceful), (4343, TerminateMode::Forced)]
    );
    assert!(!fake.is_running(4343));
}

#[tokio::test]
async fn own_pid_and_init_are_never_signalled() {
    let fake = FakePlatform::new();
    let me = std::process::id();
    fake.listen(8081, me, "devctl");
    fake.listen(8081, 1, "init");
    let reaper = reaper(&fake);

    let outcome = reaper.kill_process_on_port(8081).await;

    assert_eq!(outcome.processes.len(), 2);
    assert!(outcome
        .processes
        .iter()
        .all(|p| p.result == KillResult::Skipped));
    assert!(fake.signals().is_empty());
    assert!(fake.is_running(me));
}

#[tokio::test]
async fn pattern_kill_stops_every_match() {
    let fake = FakePlatform::new();
    fake.spawn(100, "node", "node /app/node_modules/.bin/vite --port 5173");
    fake.spawn(101, "java", "java -jar target/app.jar spring-boot:run");
    fake.spawn(102, "bash", "bash");
    let reaper = reaper(&fake);

    let outcome = reaper.kill_processes_by_pattern("vite").await;

    assert_eq!(outcome.target, ReapTarget::Pattern("vite".to_string()));
    assert_eq!(outcome.processes.len(), 1);
    assert_eq!(outcome.processes[0].process.pid, 100);
    assert!(!fake.is_running(100));
    assert!(fake.is_running(101));
    assert!(fake.is_running(102));
}

#[tokio::test]
async fn denied_signal_is_recorded_and_sweep_continues() {
    let fake = FakePlatform::new();
    fake.spawn(200, "node", "node vite");
    fake.spawn(201, "node", "node vite --host");
    fake.deny(200);
    let reaper = reaper(&fake);

    let outcomes = reaper
        .kill_patterns(&["vite".to_string(), "nothing-matches-this".to_string()])
        .await;

    assert_eq!(outcomes.len(), 2);
    let vite = &outcomes[0];
    assert_eq!(vite.processes.len(), 2);
    assert!(matches!(vite.processes[0].result, KillResult::Failed(_)));
    assert_eq!(vite.processes[1].result, KillResult::Terminated);
    assert_eq!(vite.failures().count(), 1);
    assert!(fake.is_running(200));
    assert!(!fake.is_running(201));
    assert!(outcomes[1].nothing_found());
}

#[tokio::test]
async fn process_gone_before_signal_is_already_exited() {
    let fake = FakePlatform::new();
    fake.stale_listener(8083, 300, "java");
    let reaper = reaper(&fake);

    let outcome = reaper.kill_process_on_port(8083).await;

    assert_eq!(outcome.processes.len(), 1);
    assert_eq!(outcome.processes[0].result, KillResult::AlreadyExited);
    assert_eq!(outcome.stopped_count(), 0);
    assert_eq!(outcome.failures().count(), 0);
}

#[tokio::test(start_paused = true)]
async fn sweep_pauses_between_ports() {
    let fake = FakePlatform::new();
    fake.listen(8081, 500, "java");
    fake.listen(5173, 501, "node");
    let config = ReaperConfig {
        sweep_pause: Duration::from_millis(500),
        ..Default::default()
    };
    let reaper = Reaper::new(fake.clone(), &config);

    let start = tokio::time::Instant::now();
    let outcomes = reaper.sweep_known_dev_ports(&[8081, 8082, 5173]).await;
    let elapsed = start.elapsed();

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].stopped_count(), 1);
    assert!(outcomes[1].nothing_found());
    assert_eq!(outcomes[2].stopped_count(), 1);
    // Two pauses, none before the first port
    assert!(elapsed >= Duration::from_millis(1000), "{:?}", elapsed);
    assert!(elapsed < Duration::from_millis(1500), "{:?}", elapsed);
}

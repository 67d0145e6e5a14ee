//! Shared test helpers.

#![allow(dead_code)]

use devctl::platform::{Platform, ProcessInfo, SignalOutcome, TerminateMode};
use devctl::{Config, Error, Result};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Scripted [`Platform`]: a fixed set of occupied ports and fake processes,
/// with every probe and signal recorded.
#[derive(Default)]
pub struct FakePlatform {
    state: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    occupied: HashSet<u16>,
    probe_errors: HashSet<u16>,
    /// What lsof/netstat would report for each port
    listeners: HashMap<u16, Vec<ProcessInfo>>,
    processes: HashMap<u32, ProcessInfo>,
    ignores_term: HashSet<u32>,
    denied: HashSet<u32>,
    probes: Vec<u16>,
    signals: Vec<(u32, TerminateMode)>,
    opened_urls: Vec<String>,
}

impl FakePlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock()
    }

    /// Mark ports as occupied by something we cannot see.
    pub fn occupy(&self, ports: &[u16]) {
        self.state().occupied.extend(ports.iter().copied());
    }

    /// A process named `name` listening on `port`.
    pub fn listen(&self, port: u16, pid: u32, name: &str) {
        let mut state = self.state();
        state.occupied.insert(port);
        state
            .listeners
            .entry(port)
            .or_default()
            .push(ProcessInfo::new(pid, name));
        state
            .processes
            .entry(pid)
            .or_insert_with(|| ProcessInfo::new(pid, name));
    }

    /// A listing for `port` whose process has already exited.
    pub fn stale_listener(&self, port: u16, pid: u32, name: &str) {
        self.state()
            .listeners
            .entry(port)
            .or_default()
            .push(ProcessInfo::new(pid, name));
    }

    /// A process that is not listening anywhere.
    pub fn spawn(&self, pid: u32, name: &str, command: &str) {
        self.state().processes.insert(
            pid,
            ProcessInfo {
                pid,
                name: name.to_string(),
                command: Some(command.to_string()),
            },
        );
    }

    pub fn fail_probe(&self, port: u16) {
        self.state().probe_errors.insert(port);
    }

    /// `pid` survives SIGTERM and needs a forced kill.
    pub fn ignore_term(&self, pid: u32) {
        self.state().ignores_term.insert(pid);
    }

    /// Signals to `pid` fail as if we lacked permission.
    pub fn deny(&self, pid: u32) {
        self.state().denied.insert(pid);
    }

    pub fn probes(&self) -> Vec<u16> {
        self.state().probes.clone()
    }

    pub fn clear_probes(&self) {
        self.state().probes.clear();
    }

    pub fn signals(&self) -> Vec<(u32, TerminateMode)> {
        self.state().signals.clone()
    }

    pub fn opened_urls(&self) -> Vec<String> {
        self.state().opened_urls.clone()
    }

    pub fn is_running(&self, pid: u32) -> bool {
        self.state().processes.contains_key(&pid)
    }
}

impl Platform for FakePlatform {
    fn probe_port(&self, port: u16) -> Result<bool> {
        let mut state = self.state();
        state.probes.push(port);
        if state.probe_errors.contains(&port) {
            return Err(Error::Probe {
                port,
                reason: "permission denied".to_string(),
            });
        }
        Ok(state.occupied.contains(&port))
    }

    fn processes_on_port(&self, port: u16) -> Vec<ProcessInfo> {
        self.state()
            .listeners
            .get(&port)
            .cloned()
            .unwrap_or_default()
    }

    fn processes_matching(&self, pattern: &str) -> Vec<ProcessInfo> {
        let state = self.state();
        let mut found: Vec<ProcessInfo> = state
            .processes
            .values()
            .filter(|p| p.command.as_deref().is_some_and(|c| c.contains(pattern)))
            .cloned()
            .collect();
        found.sort_by_key(|p| p.pid);
        found
    }

    fn terminate(&self, pid: u32, mode: TerminateMode) -> Result<SignalOutcome> {
        let mut state = self.state();
        state.signals.push((pid, mode));

        if state.denied.contains(&pid) {
            return Err(Error::Signal(format!(
                "failed to signal PID {}: Operation not permitted",
                pid
            )));
        }
        if !state.processes.contains_key(&pid) {
            return Ok(SignalOutcome::NotRunning);
        }
        if mode == TerminateMode::Graceful && state.ignores_term.contains(&pid) {
            return Ok(SignalOutcome::Sent);
        }

        state.processes.remove(&pid);
        let mut freed = Vec::new();
        for (port, holders) in state.listeners.iter_mut() {
            holders.retain(|p| p.pid != pid);
            if holders.is_empty() {
                freed.push(*port);
            }
        }
        for port in freed {
            state.listeners.remove(&port);
            state.occupied.remove(&port);
        }
        Ok(SignalOutcome::Sent)
    }

    fn is_alive(&self, pid: u32) -> bool {
        self.state().processes.contains_key(&pid)
    }

    fn open_url(&self, url: &str) -> Result<()> {
        self.state().opened_urls.push(url.to_string());
        Ok(())
    }
}

pub const BACKEND_YAML: &str = "spring:\n  application:\n    name: as-service\nserver:\n  port: 8081\n  servlet:\n    context-path: /\n";

pub const VITE_CONFIG: &str = r#"import { defineConfig } from 'vite'
import react from '@vitejs/plugin-react'

export default defineConfig({
  plugins: [react()],
  server: {
    port: 5173,
    proxy: {
      '/api': {
        target: 'http://localhost:8081',
        changeOrigin: true,
      },
    },
  },
})
"#;

/// Lay out a project with the default config file locations and return its config.
pub fn write_project(root: &Path) -> Config {
    let backend = root.join("backend/src/main/resources");
    let frontend = root.join("frontend");
    fs::create_dir_all(&backend).unwrap();
    fs::create_dir_all(&frontend).unwrap();
    fs::write(backend.join("application.yml"), BACKEND_YAML).unwrap();
    fs::write(frontend.join("vite.config.js"), VITE_CONFIG).unwrap();
    Config::defaults(root)
}

pub fn backend_file(root: &Path) -> String {
    fs::read_to_string(root.join("backend/src/main/resources/application.yml")).unwrap()
}

pub fn frontend_file(root: &Path) -> String {
    fs::read_to_string(root.join("frontend/vite.config.js")).unwrap()
}

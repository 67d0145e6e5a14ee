//! Parsers for the output of OS lookup tools.
//!
//! Kept separate from the platform impls so they can be tested on any host.

#![cfg_attr(not(windows), allow(dead_code))]

use super::ProcessInfo;
use std::collections::HashSet;

/// Parse `lsof -F pcn` field output.
///
/// Each process block starts with a `p<PID>` line followed by `c<COMMAND>`
/// and any number of `n<NAME>` lines.
pub(crate) fn parse_lsof_fields(stdout: &str) -> Vec<ProcessInfo> {
    let mut processes = Vec::new();
    let mut seen_pids = HashSet::new();
    let mut current_pid: Option<u32> = None;
    let mut current_command: Option<String> = None;

    let mut flush = |pid: Option<u32>, command: Option<String>, out: &mut Vec<ProcessInfo>| {
        if let Some(pid) = pid {
            if seen_pids.insert(pid) {
                out.push(ProcessInfo {
                    pid,
                    name: command.clone().unwrap_or_else(|| "unknown".to_string()),
                    command,
                });
            }
        }
    };

    for line in stdout.lines() {
        if let Some(pid) = line.strip_prefix('p') {
            flush(current_pid, current_command.take(), &mut processes);
            current_pid = pid.parse::<u32>().ok();
        } else if let Some(command) = line.strip_prefix('c') {
            current_command = Some(command.to_string());
        }
    }
    flush(current_pid, current_command, &mut processes);

    processes
}

/// Extract PIDs from `ss -tlnp` output, e.g.
/// `users:(("java",pid=4242,fd=45),("java",pid=4243,fd=46))`.
pub(crate) fn parse_ss_pids(stdout: &str) -> Vec<u32> {
    let mut pids = Vec::new();
    let mut seen = HashSet::new();

    // Skip header
    for line in stdout.lines().skip(1) {
        let Some(users_part) = line.split_whitespace().last() else {
            continue;
        };
        for part in users_part.split(|c| c == ',' || c == ')') {
            if let Some(pid) = part.strip_prefix("pid=").and_then(|p| p.parse::<u32>().ok()) {
                if seen.insert(pid) {
                    pids.push(pid);
                }
            }
        }
    }

    pids
}

/// Parse `pgrep -f` output: one PID per line.
pub(crate) fn parse_pid_lines(stdout: &str) -> Vec<u32> {
    stdout
        .lines()
        .filter_map(|line| line.trim().parse::<u32>().ok())
        .collect()
}

/// Find listeners on `port` in `netstat -ano -p TCP` output.
///
/// ```text
///   Proto  Local Address          Foreign Address        State           PID
///   TCP    0.0.0.0:5173           0.0.0.0:0              LISTENING       1234
///   TCP    [::]:5173              [::]:0                 LISTENING       1234
/// ```
pub(crate) fn parse_netstat_listeners(stdout: &str, port: u16) -> Vec<u32> {
    let suffix = format!(":{}", port);
    let mut pids = Vec::new();
    let mut seen = HashSet::new();

    for line in stdout.lines() {
        let cols: Vec<&str> = line.split_whitespace().collect();
        if cols.len() < 5 || !cols[0].eq_ignore_ascii_case("TCP") {
            continue;
        }
        if !cols[1].ends_with(&suffix) || !cols[3].eq_ignore_ascii_case("LISTENING") {
            continue;
        }
        if let Ok(pid) = cols[4].parse::<u32>() {
            if pid != 0 && seen.insert(pid) {
                pids.push(pid);
            }
        }
    }

    pids
}

/// Parse tab-separated `PID<TAB>Name<TAB>CommandLine` rows produced by the
/// PowerShell CIM query.
pub(crate) fn parse_cim_rows(stdout: &str) -> Vec<ProcessInfo> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut cols = line.trim_end_matches('\r').splitn(3, '\t');
            let pid = cols.next()?.trim().parse::<u32>().ok()?;
            let name = cols.next().unwrap_or("unknown").trim().to_string();
            let command = cols
                .next()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty());
            Some(ProcessInfo { pid, name, command })
        })
        .collect()
}

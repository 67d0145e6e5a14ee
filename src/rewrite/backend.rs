use super::{rewrite_file, RewriteOutcome};
use crate::error::Result;
use regex::{Captures, Regex};
use std::path::Path;
use std::sync::OnceLock;

static PORT_DECL_REGEX: OnceLock<Regex> = OnceLock::new();

/// `port: 8081` (YAML, any indentation) or `server.port=8081` (properties).
fn port_decl_regex() -> &'static Regex {
    PORT_DECL_REGEX.get_or_init(|| {
        Regex::new(r"(?m)^([ \t]*(?:server\.)?port[ \t]*[:=][ \t]*)(\d+)")
            .expect("static regex pattern is valid")
    })
}

/// Replace the first port declaration in `content` with `new_port`.
pub fn rewrite_backend_port_text(content: &str, new_port: u16) -> String {
    if !port_decl_regex().is_match(content) {
        tracing::warn!("No port declaration found in backend config; leaving it unchanged");
        return content.to_string();
    }
    port_decl_regex()
        .replace(content, |caps: &Captures| format!("{}{}", &caps[1], new_port))
        .into_owned()
}

/// Rewrite the backend's server-port declaration in `path`.
pub fn rewrite_backend_port(path: &Path, new_port: u16) -> Result<RewriteOutcome> {
    let outcome = rewrite_file(path, |content| rewrite_backend_port_text(content, new_port))?;
    if outcome == RewriteOutcome::Updated {
        tracing::info!("Set backend port to {} in {}", new_port, path.display());
    }
    Ok(outcome)
}

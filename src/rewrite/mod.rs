//! Targeted, best-effort edits of the services' own config files.
//!
//! Only the port-related spans are touched; every other byte of the file is
//! preserved. Each edit is a self-contained read-modify-write, and applying
//! the same edit twice leaves the file as the first application left it.
//!
//! - [`backend`]: `port: N` (YAML) or `server.port=N` (properties)
//! - [`frontend`]: Vite dev-server `port` and proxy `target` URLs

pub mod backend;
pub mod frontend;

pub use backend::{rewrite_backend_port, rewrite_backend_port_text};
pub use frontend::{rewrite_frontend_port, rewrite_frontend_port_text};

use crate::error::{Error, Result};
use crate::service::ServiceKind;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// What a rewrite did to the file on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RewriteOutcome {
    Updated,
    /// Content already matched; nothing was written.
    Unchanged,
}

/// One config file the coordinator tried to update.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigUpdate {
    pub service: ServiceKind,
    pub path: PathBuf,
    pub status: UpdateStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStatus {
    Updated,
    Unchanged,
    /// The write failed; startup continued without it.
    Failed(String),
}

impl From<RewriteOutcome> for UpdateStatus {
    fn from(outcome: RewriteOutcome) -> Self {
        match outcome {
            RewriteOutcome::Updated => UpdateStatus::Updated,
            RewriteOutcome::Unchanged => UpdateStatus::Unchanged,
        }
    }
}

/// Read `path`, apply `edit`, write back atomically if anything changed.
pub(crate) fn rewrite_file(path: &Path, edit: impl FnOnce(&str) -> String) -> Result<RewriteOutcome> {
    let original = fs::read_to_string(path).map_err(|e| Error::ConfigWrite {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let updated = edit(&original);
    if updated == original {
        tracing::debug!("{} already up to date", path.display());
        return Ok(RewriteOutcome::Unchanged);
    }

    write_atomic(path, &updated)?;
    Ok(RewriteOutcome::Updated)
}

/// Write `contents` to a sibling temp file, fsync it, then rename it over `path`.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let write_error = |e: std::io::Error| Error::ConfigWrite {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::ConfigWrite {
            path: path.to_path_buf(),
            reason: "not a file path".to_string(),
        })?;
    let temp_path = path.with_file_name(format!(".{}.devctl.tmp", file_name));

    let mut file = fs::File::create(&temp_path).map_err(write_error)?;
    let written = file
        .write_all(contents.as_bytes())
        .and_then(|_| file.sync_all());
    drop(file);

    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(write_error(e));
    }

    // Keep the original mode bits
    if let Ok(meta) = fs::metadata(path) {
        let _ = fs::set_permissions(&temp_path, meta.permissions());
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        write_error(e)
    })
}

//! Child output draining and forwarding.
//!
//! Each child stream gets its own reader task that pushes complete lines into
//! the supervisor's event channel as soon as they arrive, so no child ever
//! blocks on a full pipe while the supervisor is waiting on something else.
//! The supervisor hands every line to an [`OutputSink`], which either prints
//! it tagged with the service name or keeps it in memory.

use super::{ProcessEvent, ServiceKind, Stream};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// Where forwarded child output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Print `[service] line` to our own stdout/stderr.
    #[default]
    Forward,
    /// Keep lines in memory (tests, embedding callers).
    Captured,
}

/// One line of child output with its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedLine {
    pub service: ServiceKind,
    pub stream: Stream,
    pub line: String,
}

impl TaggedLine {
    pub fn render(&self) -> String {
        format!("[{}] {}", self.service, self.line)
    }
}

/// Receives child output in arrival order.
#[derive(Debug, Clone, Default)]
pub struct OutputSink {
    mode: OutputMode,
    captured: Arc<Mutex<Vec<TaggedLine>>>,
}

impl OutputSink {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            captured: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn forward() -> Self {
        Self::new(OutputMode::Forward)
    }

    pub fn captured() -> Self {
        Self::new(OutputMode::Captured)
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn emit(&self, line: TaggedLine) {
        match self.mode {
            OutputMode::Forward => {
                let rendered = line.render();
                // A closed stdout (e.g. piped into `head`) must not take the session down
                let _ = match line.stream {
                    Stream::Stdout => writeln!(std::io::stdout().lock(), "{}", rendered),
                    Stream::Stderr => writeln!(std::io::stderr().lock(), "{}", rendered),
                };
            }
            OutputMode::Captured => {
                self.captured.lock().push(line);
            }
        }
    }

    /// Lines captured so far (always empty in `Forward` mode).
    pub fn lines(&self) -> Vec<TaggedLine> {
        self.captured.lock().clone()
    }
}

/// Longest line forwarded as one event; longer runs are split at this size.
const MAX_LINE_BYTES: u64 = 64 * 1024;

/// Spawn a task that reads `reader` line by line until EOF and sends each
/// line as a [`ProcessEvent::Output`].
///
/// Invalid UTF-8 is replaced rather than ending the stream.
pub(crate) fn spawn_line_reader<R>(
    reader: R,
    service: ServiceKind,
    stream: Stream,
    events: UnboundedSender<ProcessEvent>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match (&mut reader)
                .take(MAX_LINE_BYTES)
                .read_until(b'\n', &mut buf)
                .await
            {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf)
                        .trim_end_matches(['\n', '\r'])
                        .to_string();
                    if events
                        .send(ProcessEvent::Output {
                            service,
                            stream,
                            line,
                        })
                        .is_err()
                    {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!("Stopped reading {} {:?}: {}", service, stream, e);
                    break;
                }
            }
        }
    })
}

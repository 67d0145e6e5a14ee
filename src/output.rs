use std::io::{IsTerminal, Write};

/// Where command modules send human-readable messages.
///
/// Child process output does not go through here (see `devctl::service::OutputSink`);
/// this is only devctl talking about what it is doing.
pub trait UserOutput: Send + Sync {
    fn status(&self, message: &str);

    fn success(&self, message: &str);

    /// Goes to stderr.
    fn warning(&self, message: &str);

    /// Goes to stderr.
    fn error(&self, message: &str);

    /// Start a step on the current line, e.g. `Resolving ports... `.
    fn progress(&self, message: &str);

    /// End the line started by [`progress`](Self::progress).
    fn finish_progress(&self, result: &str);

    fn blank(&self);
}

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Terminal output. Colors are only used when the stream is a TTY.
pub struct CliOutput;

impl CliOutput {
    fn paint(color: &str, message: &str, tty: bool) -> String {
        if tty {
            format!("{}{}{}", color, message, RESET)
        } else {
            message.to_string()
        }
    }
}

impl UserOutput for CliOutput {
    fn status(&self, message: &str) {
        println!("{}", message);
    }

    fn success(&self, message: &str) {
        println!(
            "{}",
            Self::paint(GREEN, message, std::io::stdout().is_terminal())
        );
    }

    fn warning(&self, message: &str) {
        eprintln!(
            "{}",
            Self::paint(YELLOW, message, std::io::stderr().is_terminal())
        );
    }

    fn error(&self, message: &str) {
        eprintln!("{}", Self::paint(RED, message, std::io::stderr().is_terminal()));
    }

    fn progress(&self, message: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = write!(stdout, "{}", message);
        let _ = stdout.flush();
    }

    fn finish_progress(&self, result: &str) {
        println!("{}", result);
    }

    fn blank(&self) {
        println!();
    }
}

/// Drops every message. Used by `--json` commands, whose stdout is the document.
pub struct QuietOutput;

impl UserOutput for QuietOutput {
    fn status(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
    fn progress(&self, _: &str) {}
    fn finish_progress(&self, _: &str) {}
    fn blank(&self) {}
}

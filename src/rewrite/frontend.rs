use super::{rewrite_file, RewriteOutcome};
use crate::error::Result;
use regex::{Captures, Regex};
use std::ops::Range;
use std::path::Path;
use std::sync::OnceLock;

static PROXY_TARGET_REGEX: OnceLock<Regex> = OnceLock::new();
static SERVER_BLOCK_REGEX: OnceLock<Regex> = OnceLock::new();

fn proxy_target_regex() -> &'static Regex {
    PROXY_TARGET_REGEX.get_or_init(|| {
        Regex::new(r#"(\btarget\s*:\s*['"`]https?://(?:localhost|127\.0\.0\.1):)(\d+)"#)
            .expect("static regex pattern is valid")
    })
}

fn server_block_regex() -> &'static Regex {
    SERVER_BLOCK_REGEX
        .get_or_init(|| Regex::new(r"\bserver\s*:\s*\{").expect("static regex pattern is valid"))
}

/// Point every localhost proxy target at `backend_port` and set the dev
/// server's `port` to `frontend_port`, inserting it if the `server` block has none.
pub fn rewrite_frontend_port_text(content: &str, frontend_port: u16, backend_port: u16) -> String {
    let retargeted = proxy_target_regex()
        .replace_all(content, |caps: &Captures| format!("{}{}", &caps[1], backend_port));
    set_server_port(&retargeted, frontend_port)
}

/// Rewrite the frontend dev-server config at `path`.
pub fn rewrite_frontend_port(
    path: &Path,
    frontend_port: u16,
    backend_port: u16,
) -> Result<RewriteOutcome> {
    let outcome = rewrite_file(path, |content| {
        rewrite_frontend_port_text(content, frontend_port, backend_port)
    })?;
    if outcome == RewriteOutcome::Updated {
        tracing::info!(
            "Set frontend port to {} and proxy target to {} in {}",
            frontend_port,
            backend_port,
            path.display()
        );
    }
    Ok(outcome)
}

fn set_server_port(content: &str, port: u16) -> String {
    let code = code_mask(content.as_bytes());

    let Some(open) = server_block_regex()
        .find_iter(content)
        .map(|m| m.end() - 1)
        .find(|&brace| code[brace])
    else {
        tracing::warn!("No `server: {{ ... }}` block in frontend config; dev server port not set");
        return content.to_string();
    };

    let Some(close) = matching_brace(content.as_bytes(), &code, open) else {
        tracing::warn!("Unbalanced braces in frontend config; dev server port not set");
        return content.to_string();
    };

    match find_port_value(content.as_bytes(), &code, open, close) {
        PortValue::Literal(range) => {
            let mut out = String::with_capacity(content.len());
            out.push_str(&content[..range.start]);
            out.push_str(&port.to_string());
            out.push_str(&content[range.end..]);
            out
        }
        PortValue::Expression => {
            tracing::warn!("Frontend `server.port` is not a number literal; leaving it alone");
            content.to_string()
        }
        PortValue::Missing => insert_port(content, open, close, port),
    }
}

enum PortValue {
    Literal(Range<usize>),
    Expression,
    Missing,
}

/// Insert `port: N,` as the first entry of the block opened at `open`.
fn insert_port(content: &str, open: usize, close: usize, port: u16) -> String {
    let after_open = &content[open + 1..close];
    let entry = if after_open.trim().is_empty() && !after_open.contains('\n') {
        // `server: {}`
        format!(" port: {} ", port)
    } else if let Some(newline) = after_open.find('\n') {
        let line_ending = if after_open[..newline].ends_with('\r') {
            "\r\n"
        } else {
            "\n"
        };
        format!("{}{}port: {},", line_ending, block_indent(content, open, close), port)
    } else {
        format!(" port: {},", port)
    };

    let mut out = String::with_capacity(content.len() + entry.len());
    out.push_str(&content[..=open]);
    out.push_str(&entry);
    out.push_str(&content[open + 1..]);
    out
}

/// Indentation of the first entry in the block, or the closing line's plus two spaces.
fn block_indent(content: &str, open: usize, close: usize) -> String {
    let body = &content[open + 1..close];
    let first_entry = body
        .split('\n')
        .skip(1)
        .find(|line| !line.trim().is_empty());
    if let Some(line) = first_entry {
        return line[..line.len() - line.trim_start().len()].to_string();
    }

    let line_start = content[..close].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let closing = &content[line_start..close];
    format!("{}  ", &closing[..closing.len() - closing.trim_start().len()])
}

/// Byte index of the `}` matching the `{` at `open`.
fn matching_brace(bytes: &[u8], code: &[bool], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for i in open..bytes.len() {
        if !code[i] {
            continue;
        }
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Look for a `port:` key directly inside the block (not in nested objects).
fn find_port_value(bytes: &[u8], code: &[bool], open: usize, close: usize) -> PortValue {
    let mut depth = 0usize;
    let mut i = open + 1;
    while i < close {
        if code[i] {
            match bytes[i] {
                b'{' | b'[' | b'(' => depth += 1,
                b'}' | b']' | b')' => depth = depth.saturating_sub(1),
                b'p' if depth == 0 && is_key_at(bytes, i, b"port") => {
                    return port_value_after(bytes, i + 4, close);
                }
                _ => {}
            }
        }
        i += 1;
    }
    PortValue::Missing
}

fn is_ident(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b == b'.'
}

fn is_key_at(bytes: &[u8], at: usize, key: &[u8]) -> bool {
    let end = at + key.len();
    if end > bytes.len() || &bytes[at..end] != key {
        return false;
    }
    if at > 0 && is_ident(bytes[at - 1]) {
        return false;
    }
    if end < bytes.len() && is_ident(bytes[end]) {
        return false;
    }
    bytes[end..]
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|&b| b == b':')
}

fn port_value_after(bytes: &[u8], from: usize, close: usize) -> PortValue {
    let mut i = from;
    while i < close && bytes[i] != b':' {
        i += 1;
    }
    i += 1;
    while i < close && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    let start = i;
    while i < close && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let terminated = i >= close || !is_ident(bytes[i]);
    if i > start && terminated {
        PortValue::Literal(start..i)
    } else {
        PortValue::Expression
    }
}

/// `true` for bytes that are code, `false` inside string literals and comments.
fn code_mask(bytes: &[u8]) -> Vec<bool> {
    enum State {
        Code,
        Str(u8),
        LineComment,
        BlockComment,
    }

    let mut mask = vec![true; bytes.len()];
    let mut state = State::Code;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match state {
            State::Code => match b {
                b'\'' | b'"' | b'`' => {
                    state = State::Str(b);
                    mask[i] = false;
                }
                b'/' if bytes.get(i + 1) == Some(&b'/') => {
                    state = State::LineComment;
                    mask[i] = false;
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    state = State::BlockComment;
                    mask[i] = false;
                    mask[i + 1] = false;
                    i += 1;
                }
                _ => {}
            },
            State::Str(quote) => {
                mask[i] = false;
                if b == b'\\' {
                    if let Some(m) = mask.get_mut(i + 1) {
                        *m = false;
                    }
                    i += 1;
                } else if b == quote {
                    state = State::Code;
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Code;
                } else {
                    mask[i] = false;
                }
            }
            State::BlockComment => {
                mask[i] = false;
                if b == b'*' && bytes.get(i + 1) == Some(&b'/') {
                    mask[i + 1] = false;
                    i += 1;
                    state = State::Code;
                }
            }
        }
        i += 1;
    }
    mask
}

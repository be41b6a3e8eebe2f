// src/script/wrapper.rs

//! Wraps caller script text with the marker-emitting preamble/postamble.
//!
//! The generated entry script:
//! - prints `START:<id>` before running anything else,
//! - compiles and runs the caller script, embedded as a string literal,
//!   inside `try:`, so syntax and indentation errors in it are reported like
//!   any other exception,
//! - on any exception prints one `ERROR:<id> - <Type>: <message>` line and
//!   one `TRACEBACK:<id> - <line>` per traceback line, then exits non-zero,
//! - on normal completion prints `SUCCESS:<id>`.
//!
//! The worker can exit 0 even when the embedded script failed, so these
//! markers are the only reliable outcome signal.

use std::fmt::Write as _;

use crate::script::markers::{Marker, PAYLOAD_SEPARATOR};
use crate::script::CorrelationId;

const INDENT: &str = "    ";

/// File name reported for the caller script in tracebacks.
pub const SCRIPT_FILENAME: &str = "<script>";

/// Entry-script text for one call.
#[derive(Debug, Clone)]
pub struct WrappedScript {
    pub correlation_id: CorrelationId,
    pub text: String,
}

pub fn wrap(script: &str, id: &CorrelationId) -> WrappedScript {
    let mut out = String::with_capacity(script.len() * 2 + 1024);

    // `write!` into a String cannot fail.
    let _ = writeln!(out, "import sys");
    let _ = writeln!(out, "import traceback");
    let _ = writeln!(out);
    let _ = writeln!(out, "_HEADLESS_EXEC_ID = \"{id}\"");
    let _ = writeln!(out, "_HEADLESS_EXEC_SOURCE = {}", python_literal(script));
    let _ = writeln!(out);
    let _ = writeln!(out, "print(\"{}\", flush=True)", Marker::Start.prefix(id));
    let _ = writeln!(out);
    let _ = writeln!(out, "try:");
    let _ = writeln!(
        out,
        "{INDENT}_headless_exec_code = compile(_HEADLESS_EXEC_SOURCE, \"{SCRIPT_FILENAME}\", \"exec\")"
    );
    let _ = writeln!(
        out,
        "{INDENT}exec(_headless_exec_code, {{\"__name__\": \"__main__\"}})"
    );
    let _ = writeln!(out, "except Exception as _headless_exec_error:");
    let _ = writeln!(
        out,
        "{INDENT}_message = str(_headless_exec_error).replace(\"\\n\", \" \")"
    );
    let _ = writeln!(
        out,
        "{INDENT}print(\"{}{}\" + type(_headless_exec_error).__name__ + \": \" + _message, flush=True)",
        Marker::Error.prefix(id),
        PAYLOAD_SEPARATOR,
    );
    let _ = writeln!(
        out,
        "{INDENT}for _line in traceback.format_exc().rstrip().splitlines():"
    );
    let _ = writeln!(
        out,
        "{INDENT}{INDENT}print(\"{}{}\" + _line, flush=True)",
        Marker::Traceback.prefix(id),
        PAYLOAD_SEPARATOR,
    );
    let _ = writeln!(out, "{INDENT}sys.stdout.flush()");
    let _ = writeln!(out, "{INDENT}sys.exit(1)");
    let _ = writeln!(out, "else:");
    let _ = writeln!(
        out,
        "{INDENT}print(\"{}\", flush=True)",
        Marker::Success.prefix(id)
    );

    WrappedScript {
        correlation_id: id.clone(),
        text: out,
    }
}

/// Double-quoted single-line Python string literal holding `source`, with
/// CRLF line endings normalised to LF.
pub fn python_literal(source: &str) -> String {
    let mut out = String::with_capacity(source.len() + 16);
    out.push('"');
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' if chars.peek() == Some(&'\n') => {}
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

use std::process::Command;

use headless_exec::errors::ExecError;
use headless_exec::output::parse;
use headless_exec::script::wrapper::{SCRIPT_FILENAME, python_literal};
use headless_exec::script::{CorrelationId, wrap};
use headless_exec_test_utils::python3_available;

fn id(s: &str) -> CorrelationId {
    CorrelationId::parse(s).unwrap()
}

/// Write the wrapped script to a temp dir and run it with `python3`.
fn run_wrapped(script: &str, cid: &CorrelationId) -> (String, String, Option<i32>) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(format!("{cid}.py"));
    std::fs::write(&path, wrap(script, cid).text).unwrap();
    let out = Command::new("python3").arg(&path).output().unwrap();
    (
        String::from_utf8_lossy(&out.stdout).into_owned(),
        String::from_utf8_lossy(&out.stderr).into_owned(),
        out.status.code(),
    )
}

#[test]
fn test_wrapped_script_structure() {
    let cid = id("call_7");
    let wrapped = wrap("print('hi')\nif True:\n    x = 1\n", &cid);
    let text = &wrapped.text;

    assert_eq!(wrapped.correlation_id, cid);
    assert!(text.contains("print(\"START:call_7\", flush=True)"));
    assert!(text.contains(r#"_HEADLESS_EXEC_SOURCE = "print('hi')\nif True:\n    x = 1\n""#));
    assert!(text.contains(&format!("compile(_HEADLESS_EXEC_SOURCE, \"{SCRIPT_FILENAME}\", \"exec\")")));
    assert!(text.contains("ERROR:call_7 - "));
    assert!(text.contains("TRACEBACK:call_7 - "));
    assert!(text.contains("print(\"SUCCESS:call_7\", flush=True)"));

    let start = text.find("print(\"START:call_7\"").unwrap();
    let try_block = text.find("try:").unwrap();
    let success = text.find("SUCCESS:call_7").unwrap();
    assert!(start < try_block && try_block < success);
}

#[test]
fn test_literal_escapes_quotes_backslashes_and_controls() {
    assert_eq!(python_literal("a = \"b\"\n"), r#""a = \"b\"\n""#);
    assert_eq!(python_literal(r"C:\tmp"), r#""C:\\tmp""#);
    assert_eq!(python_literal("x\r\ny\tz\u{0}"), r#""x\ny\tz\x00""#);
    assert_eq!(python_literal("é ✓"), "\"é ✓\"");
    assert!(!python_literal("a\r\n\r\nb").contains('\r'));
}

#[test]
fn test_python_success_prints_start_then_success() {
    if !python3_available() {
        eprintln!("python3 not available; skipping");
        return;
    }
    let cid = id("py_ok");

    let (stdout, _, code) = run_wrapped("print('hello')", &cid);

    assert_eq!(code, Some(0));
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines, vec!["START:py_ok", "hello", "SUCCESS:py_ok"]);
    assert!(parse(&stdout, "", &cid).unwrap().success_marker);
}

#[test]
fn test_python_exception_reports_type_message_and_traceback() {
    if !python3_available() {
        eprintln!("python3 not available; skipping");
        return;
    }
    let cid = id("py_err");

    let (stdout, stderr, code) = run_wrapped("x = 1\ny = x / 0", &cid);

    assert_eq!(code, Some(1));
    assert!(!stdout.contains("SUCCESS:py_err"));
    match parse(&stdout, &stderr, &cid).unwrap_err() {
        ExecError::Script {
            message, traceback, ..
        } => {
            assert_eq!(message, "ZeroDivisionError: division by zero");
            assert!(traceback.starts_with("Traceback (most recent call last):"));
            assert!(traceback.lines().count() >= 3);
            assert!(traceback.ends_with("ZeroDivisionError: division by zero"));
        }
        other => panic!("expected Script error, got {other:?}"),
    }
}

#[test]
fn test_python_multiline_message_stays_on_one_marker_line() {
    if !python3_available() {
        eprintln!("python3 not available; skipping");
        return;
    }
    let cid = id("py_multi");

    let (stdout, _, _) = run_wrapped("raise ValueError('first\\nsecond')", &cid);

    let error_lines: Vec<&str> = stdout
        .lines()
        .filter(|l| l.starts_with("ERROR:py_multi"))
        .collect();
    assert_eq!(error_lines, vec!["ERROR:py_multi - ValueError: first second"]);
}

#[test]
fn test_python_comment_only_script_still_runs() {
    if !python3_available() {
        eprintln!("python3 not available; skipping");
        return;
    }
    let cid = id("py_comment");

    let (stdout, stderr, code) = run_wrapped("# nothing to do here\n", &cid);

    assert_eq!(code, Some(0), "stderr: {stderr}");
    assert!(parse(&stdout, &stderr, &cid).unwrap().success_marker);
}

#[test]
fn test_python_nested_blocks_keep_their_structure() {
    if !python3_available() {
        eprintln!("python3 not available; skipping");
        return;
    }
    let cid = id("py_nested");
    let script = "def add(a, b):\n    return a + b\n\nfor i in range(2):\n    print(add(i, 10))\n";

    let (stdout, _, code) = run_wrapped(script, &cid);

    assert_eq!(code, Some(0));
    assert!(stdout.contains("\n10\n11\n"));
}

#[test]
fn test_python_syntax_error_is_reported_after_start() {
    if !python3_available() {
        eprintln!("python3 not available; skipping");
        return;
    }
    let cid = id("py_syntax");

    let (stdout, stderr, code) = run_wrapped("print('unclosed'", &cid);

    assert_eq!(code, Some(1));
    assert!(stdout.starts_with("START:py_syntax\n"));
    match parse(&stdout, &stderr, &cid).unwrap_err() {
        ExecError::Script {
            message, traceback, ..
        } => {
            assert!(message.starts_with("SyntaxError: "), "{message}");
            assert!(traceback.contains(SCRIPT_FILENAME), "{traceback}");
        }
        other => panic!("expected Script error, got {other:?}"),
    }
}

#[test]
fn test_python_indentation_error_is_script_error() {
    if !python3_available() {
        eprintln!("python3 not available; skipping");
        return;
    }
    let cid = id("py_indent");

    let (stdout, stderr, _) = run_wrapped("if True:\nprint(1)\n", &cid);

    match parse(&stdout, &stderr, &cid).unwrap_err() {
        ExecError::Script { message, .. } => {
            assert!(message.starts_with("IndentationError: "), "{message}");
        }
        other => panic!("expected Script error, got {other:?}"),
    }
}

#[test]
fn test_python_source_with_quotes_and_backslashes_runs_verbatim() {
    if !python3_available() {
        eprintln!("python3 not available; skipping");
        return;
    }
    let cid = id("py_escape");
    let script = "s = \"tab\\there \\\"q\\\" 'single' é\"\r\nprint(s)\r\n";

    let (stdout, _, code) = run_wrapped(script, &cid);

    assert_eq!(code, Some(0));
    assert!(stdout.contains("tab\there \"q\" 'single' é\n"), "{stdout}");
}

#[test]
fn test_python_script_functions_see_their_own_globals() {
    if !python3_available() {
        eprintln!("python3 not available; skipping");
        return;
    }
    let cid = id("py_globals");
    let script = "LIMIT = 3\n\ndef under(x):\n    return x < LIMIT\n\nprint(__name__, [i for i in range(5) if under(i)])\n";

    let (stdout, _, code) = run_wrapped(script, &cid);

    assert_eq!(code, Some(0));
    assert!(stdout.contains("__main__ [0, 1, 2]\n"), "{stdout}");
}

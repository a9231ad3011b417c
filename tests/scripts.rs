use std::path::Path;
use std::process::Output;

use assert_cmd::Command;
use pretty_assertions::assert_eq;

include!(concat!(env!("OUT_DIR"), "/script_tests.rs"));

/// Runs a script from `tests/data` and checks it against the annotations in
/// its comments:
///
/// * `// expect: LINE` is one line of stdout, in order.
/// * `// expect runtime error: TEXT` must appear on stderr; exit code 70.
/// * `// expect syntax error: TEXT` must appear on stderr; exit code 65.
fn do_test(filename: &Path) {
    let content = std::fs::read_to_string(filename)
        .unwrap_or_else(|_| panic!("failed to read {}", filename.display()));

    let output = run_file(filename);
    let stdout = String::from_utf8(output.stdout).unwrap();
    let stderr = String::from_utf8(output.stderr).unwrap();

    let expected = annotations(&content, "// expect: ").join("\n");
    assert_eq!(expected, stdout.trim_end(), "stderr={stderr}");

    let runtime_errors = annotations(&content, "// expect runtime error: ");
    let syntax_errors = annotations(&content, "// expect syntax error: ");
    for message in runtime_errors.iter().chain(&syntax_errors) {
        assert!(stderr.contains(message.as_str()), "missing '{message}' in stderr={stderr}");
    }

    let code = output.status.code();
    if !syntax_errors.is_empty() {
        assert_eq!(code, Some(65));
    } else if !runtime_errors.is_empty() {
        assert_eq!(code, Some(70));
    } else {
        assert_eq!(code, Some(0), "stderr={stderr}");
    }
}

fn run_file(filename: &Path) -> Output {
    let mut cmd = Command::cargo_bin("harvest").unwrap();
    cmd.env("HARVEST_LOG", "off").arg(filename).output().unwrap()
}

fn annotations(content: &str, marker: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| line.rfind(marker).map(|idx| line[idx + marker.len()..].to_owned()))
        .collect()
}

#[test]
fn missing_script_fails() {
    let mut cmd = Command::cargo_bin("harvest").unwrap();
    let output = cmd.arg("tests/data/no-such-script.hv").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to read script"));
}

#[test]
fn debug_flag_shows_debug_lines_and_globals() {
    let mut cmd = Command::cargo_bin("harvest").unwrap();
    let output = cmd
        .env("HARVEST_LOG", "off")
        .arg("--debug")
        .arg("tests/data/debug/visible.hv")
        .output()
        .unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout, "[LOG] before\n[DEBUG] hidden unless --debug\n[DEBUG] answer = 42\n");
}

#[test]
fn prints_version() {
    let mut cmd = Command::cargo_bin("harvest").unwrap();
    cmd.arg("--version").assert().success();
}

//! Drives the compiled `p4c` binary over real files.

use std::io::Write;
use std::process::Command;

fn p4c() -> Command {
    Command::new(env!("CARGO_BIN_EXE_p4c"))
}

fn source_file(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".p4").tempfile().expect("temp file");
    file.write_all(text.as_bytes()).expect("write source");
    file
}

#[test]
fn accepts_a_valid_program() {
    let file = source_file(
        "header H { bit<8> a; bit<16> b; }
         parser P(inout H h) { state start { transition accept; } }",
    );
    let output = p4c().arg(file.path()).output().expect("runs");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(output.stderr.is_empty());
}

#[test]
fn reports_syntax_errors_on_one_line_and_exits_1() {
    let file = source_file("header H { bit<8> a }\n");
    let output = p4c().arg(file.path()).output().expect("runs");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.lines().count(), 1, "one line per error: {stderr}");
    assert!(stderr.contains(": error: "), "canonical format: {stderr}");
    assert!(stderr.contains(":1:21:"), "line and column: {stderr}");
}

#[test]
fn reports_lexical_errors_with_location() {
    let file = source_file("const bit<8> X = 0xG;\n");
    let output = p4c().arg(file.path()).output().expect("runs");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("hexadecimal digits"), "stderr: {stderr}");
}

#[test]
fn reports_type_errors() {
    let file = source_file(
        "control C(inout bit<8> v) {
           apply { bit<16> w = 16w1; v = w; }
         }",
    );
    let output = p4c().arg(file.path()).output().expect("runs");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains(": error: "), "stderr: {stderr}");
}

#[test]
fn missing_file_fails_with_a_message() {
    let output = p4c().arg("no-such-file.p4").output().expect("runs");
    assert_eq!(output.status.code(), Some(1));
    assert!(!output.stderr.is_empty());
}

#[test]
fn dump_ast_prints_the_tree() {
    let file = source_file("header H { bit<8> a; }");
    let output = p4c().arg(file.path()).arg("--dump-ast").output().expect("runs");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("P4Program"));
    assert!(stdout.contains("HeaderTypeDeclaration"));
    assert!(stdout.contains("`H`"));
}

#[test]
fn json_diagnostics_are_machine_readable() {
    let file = source_file("header H { bit<8> a }\n");
    let output = p4c().arg(file.path()).arg("--json-diagnostics").output().expect("runs");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    let value: serde_json::Value =
        serde_json::from_str(stderr.trim()).expect("stderr is one JSON object");
    assert_eq!(value["kind"], "Syntax");
    assert_eq!(value["line"], 1);
}

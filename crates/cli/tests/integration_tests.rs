/// Integration tests for the RODB CLI
/// Tests cover: navigation commands, dump, verify, load failures, config via env
use rodb::{Value, Writer};
use std::fs;
use std::path::Path;
use std::process::Output;
use tempfile::tempdir;

/// Helper to run CLI commands and capture the whole process output
fn run_cli(db_path: &Path, verify: &str, command: &str) -> Output {
    use std::io::Write;
    use std::process::{Command, Stdio};

    let mut child = Command::new("cargo")
        .args(["run", "-q", "-p", "cli", "--"])
        .env("RODB_PATH", db_path.to_str().unwrap())
        .env("RODB_VERIFY", verify)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn CLI");

    {
        let stdin = child.stdin.as_mut().expect("Failed to open stdin");
        // The shell may already have exited on a load failure.
        let _ = stdin.write_all(command.as_bytes());
        let _ = stdin.write_all(b"EXIT\n");
    }

    child.wait_with_output().expect("Failed to read output")
}

/// Helper to run CLI commands against a verified load and capture stdout
fn run_cli_command(db_path: &Path, command: &str) -> String {
    let output = run_cli(db_path, "true", command);
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn scene() -> Value {
    Value::map([
        ("width", Value::Int(640)),
        ("height", Value::Int(480)),
        ("title", Value::from("demo scene")),
        (
            "layers",
            Value::Array(vec![
                Value::map([
                    ("name", Value::from("ground")),
                    ("points", Value::Array(vec![Value::map([("x", 1), ("y", 2)])])),
                ]),
                Value::map([("name", Value::from("sky")), ("visible", Value::Bool(false))]),
            ]),
        ),
    ])
}

fn write_scene(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("scene.rodb");
    Writer::write_to_path(&path, &scene()).unwrap();
    path
}

#[test]
fn test_banner_and_exit() {
    let dir = tempdir().unwrap();
    let path = write_scene(dir.path());

    let output = run_cli_command(&path, "");

    assert!(output.contains("RODB loaded"));
    assert!(output.contains("verify=true"));
    assert!(output.contains("bye"));
}

#[test]
fn test_get_scalars() {
    let dir = tempdir().unwrap();
    let path = write_scene(dir.path());

    let output = run_cli_command(&path, "GET width\nGET title\nGET layers/1/visible\n");

    assert!(output.contains("640"));
    assert!(output.contains("demo scene"));
    assert!(output.contains("false"));
}

#[test]
fn test_nested_path() {
    let dir = tempdir().unwrap();
    let path = write_scene(dir.path());

    let output = run_cli_command(&path, "GET layers/0/points/0/y\nGET /layers/0/name/\n");

    assert!(output.contains("> 2\n"));
    assert!(output.contains("ground"));
}

#[test]
fn test_type_and_size() {
    let dir = tempdir().unwrap();
    let path = write_scene(dir.path());

    let output = run_cli_command(&path, "TYPE layers\nSIZE layers\nTYPE layers/0\nSIZE /\n");

    assert!(output.contains("array"));
    assert!(output.contains("> 2\n"));
    assert!(output.contains("map"));
    assert!(output.contains("> 4\n"));
}

#[test]
fn test_keys_sorted() {
    let dir = tempdir().unwrap();
    let path = write_scene(dir.path());

    let output = run_cli_command(&path, "KEYS\n");

    assert!(output.contains("height\nlayers\ntitle\nwidth\n(4 keys)"));
}

#[test]
fn test_missing_key_and_bad_index() {
    let dir = tempdir().unwrap();
    let path = write_scene(dir.path());

    let output = run_cli_command(&path, "GET depth\nGET layers/5\nGET layers/-1\nGET width/x\n");

    assert!(output.contains("ERR key not found: \"depth\""));
    assert!(output.contains("ERR index 5 is out of bounds (size 2)"));
    assert!(output.contains("ERR index -1 is out of bounds (size 2)"));
    assert!(output.contains("ERR type mismatch"));
}

#[test]
fn test_dump_subtree() {
    let dir = tempdir().unwrap();
    let path = write_scene(dir.path());

    let output = run_cli_command(&path, "DUMP layers/0/points\n");

    assert!(output.contains("- \n    \"x\": 1\n    \"y\": 2\n"));
}

#[test]
fn test_info_and_verify() {
    let dir = tempdir().unwrap();
    let path = write_scene(dir.path());
    let size = fs::metadata(&path).unwrap().len();

    let output = run_cli_command(&path, "INFO\nVERIFY\n");

    assert!(output.contains(&format!(" Total size: {}", size)));
    assert!(output.contains("Header size: 8"));
    assert!(output.contains("Signature: 0x62646f72"));
    assert!(output.contains("Version: 1"));
    assert!(output.contains("OK"));
}

#[test]
fn test_unknown_command_and_usage() {
    let dir = tempdir().unwrap();
    let path = write_scene(dir.path());

    let output = run_cli_command(&path, "SET a b\nGET\n\n");

    assert!(output.contains("unknown command: SET"));
    assert!(output.contains("ERR usage: GET path"));
}

#[test]
fn test_quit_command() {
    let dir = tempdir().unwrap();
    let path = write_scene(dir.path());

    let output = run_cli_command(&path, "QUIT\nGET width\n");

    assert!(output.contains("bye"));
    assert!(!output.contains("640"));
}

#[test]
fn test_missing_file_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.rodb");

    let output = run_cli(&path, "true", "");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to load"));
}

#[test]
fn test_bad_signature_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.rodb");
    fs::write(&path, b"RODB\x01\x00\x00\x00a\x00\x00\x00\x04\x00\x00\x00\x00\x00\x00\x00").unwrap();

    let output = run_cli(&path, "true", "");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("integrity check failed"));
}

#[test]
fn test_unverified_load_reports_corruption_lazily() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("unsorted.rodb");

    // map {"b": 1, "a": 2} with keys stored out of order
    let keys = Writer::encode_node(&Value::array(["b", "a"])).unwrap();
    let values = Writer::encode_node(&Value::array([1, 2])).unwrap();
    let mut payload = Vec::new();
    payload.extend_from_slice(&2u32.to_le_bytes());
    payload.extend_from_slice(&(keys.len() as u32).to_le_bytes());
    payload.extend_from_slice(&keys);
    payload.extend_from_slice(&values);
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"rodb\x01\x00\x00\x00m\x00\x00\x00");
    bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&payload);
    fs::write(&path, &bytes).unwrap();

    let verified = run_cli(&path, "true", "");
    assert!(!verified.status.success());

    let output = run_cli(&path, "false", "KEYS\nVERIFY\n");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("verify=false"));
    assert!(stdout.contains("b\na\n(2 keys)"));
    assert!(stdout.contains("ERR corrupt data"));
}

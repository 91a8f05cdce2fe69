use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_schoold");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn schoold");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> &str {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

#[test]
fn bundle_export_then_import_restores_workspace() {
    let workspace = temp_dir("school-backup-ws");
    let out_dir = temp_dir("school-backup-out");
    let bundle = out_dir.join("workspace-backup.zip");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.create",
        json!({ "student": {
            "firstName": "Yaa",
            "surname": "Asantewaa",
            "className": "C3",
            "dob": "2013-06-11",
            "gender": "Female",
            "residence": "Ejisu"
        }}),
    );
    let student_id = created["student"]["id"].as_str().expect("id").to_string();
    request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "fees.setClassFee",
        json!({ "className": "C3", "feeAmount": 420 }),
    );

    let export = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "backup.exportWorkspaceBundle",
        json!({ "outPath": bundle.to_string_lossy() }),
    );
    assert_eq!(export["bundleFormat"], "school-workspace-v1");
    assert_eq!(export["entryCount"], 3);
    assert_eq!(export["dbSha256"].as_str().map(|s| s.len()), Some(64));
    assert!(bundle.is_file());

    request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "students.delete",
        json!({ "studentId": student_id }),
    );

    let import = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "backup.importWorkspaceBundle",
        json!({ "inPath": bundle.to_string_lossy() }),
    );
    assert_eq!(import["bundleFormatDetected"], "school-workspace-v1");

    // The reopened workspace serves the restored rows.
    let restored = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "students.get",
        json!({ "studentId": student_id }),
    );
    assert_eq!(restored["student"]["fullName"], "Yaa Asantewaa");
    let status = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "fees.studentStatus",
        json!({ "studentId": student_id }),
    );
    assert_eq!(status["record"]["feeAmount"].as_f64(), Some(420.0));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn import_failures_keep_the_workspace_open() {
    let workspace = temp_dir("school-backup-fail");
    let junk = workspace.join("not-a-bundle.zip");
    // Zip signature followed by garbage.
    std::fs::write(&junk, [0x50, 0x4B, 0x03, 0x04, 0x00, 0x01, 0x02]).expect("write junk");

    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let early = request(
        &mut stdin,
        &mut reader,
        "1",
        "backup.exportWorkspaceBundle",
        json!({ "outPath": workspace.join("x.zip").to_string_lossy() }),
    );
    assert_eq!(error_code(&early), "no_workspace");

    request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let missing = request(
        &mut stdin,
        &mut reader,
        "3",
        "backup.importWorkspaceBundle",
        json!({ "inPath": workspace.join("nope.zip").to_string_lossy() }),
    );
    assert_eq!(error_code(&missing), "not_found");

    let broken = request(
        &mut stdin,
        &mut reader,
        "4",
        "backup.importWorkspaceBundle",
        json!({ "inPath": junk.to_string_lossy() }),
    );
    assert_eq!(error_code(&broken), "io_failed");

    let notes = workspace.join("roster.txt");
    std::fs::write(&notes, "B1: Ama, Esi, Kojo").expect("write notes");
    let text = request(
        &mut stdin,
        &mut reader,
        "5",
        "backup.importWorkspaceBundle",
        json!({ "inPath": notes.to_string_lossy() }),
    );
    assert_eq!(error_code(&text), "io_failed");

    let no_path = request(&mut stdin, &mut reader, "6", "backup.importWorkspaceBundle", json!({}));
    assert_eq!(error_code(&no_path), "bad_params");

    request_ok(&mut stdin, &mut reader, "7", "students.list", json!({}));

    let _ = std::fs::remove_dir_all(workspace);
}

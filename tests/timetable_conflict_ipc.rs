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

fn add_teacher(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    name: &str,
    subject: &str,
) -> i64 {
    let res = request_ok(
        stdin,
        reader,
        id,
        "teachers.create",
        json!({ "teacher": {
            "name": name,
            "subject": subject,
            "email": "staff@school.edu",
            "phone": "0241234567"
        }}),
    );
    res["teacher"]["id"].as_i64().expect("teacher id")
}

fn slot(class_name: &str, day: &str, period: i64, subject: &str, teacher_id: i64) -> serde_json::Value {
    json!({
        "className": class_name,
        "day": day,
        "period": period,
        "subject": subject,
        "teacherId": teacher_id,
    })
}

#[test]
fn double_booked_teacher_and_taken_slot_are_distinct_conflicts() {
    let workspace = temp_dir("school-timetable-conflict");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let t1 = add_teacher(&mut stdin, &mut reader, "2", "Ama Owusu", "Maths");
    let t2 = add_teacher(&mut stdin, &mut reader, "3", "Yaw Boateng", "English");

    let added = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "timetable.addSlot",
        slot("A1", "Monday", 1, "Maths", t1),
    );
    assert_eq!(added["slot"]["className"], "A1");
    assert_eq!(added["slot"]["day"], "Monday");
    assert_eq!(added["slot"]["teacherId"], t1);

    // Probing from the other class sees the booking; probing its own class does not.
    let check = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "timetable.checkConflict",
        json!({ "className": "A2", "day": "Monday", "period": 1, "teacherId": t1 }),
    );
    assert_eq!(check["conflict"], true);
    let check = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "timetable.checkConflict",
        json!({ "className": "A1", "day": "Monday", "period": 1, "teacherId": t1 }),
    );
    assert_eq!(check["conflict"], false);
    let check = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "timetable.checkConflict",
        json!({ "className": "A2", "day": "Monday", "period": 1 }),
    );
    assert_eq!(check["conflict"], false);

    let rejected = request(
        &mut stdin,
        &mut reader,
        "8",
        "timetable.addSlot",
        slot("A2", "Monday", 1, "Maths", t1),
    );
    assert_eq!(rejected["ok"], false);
    assert_eq!(error_code(&rejected), "conflict");
    assert_eq!(rejected["error"]["details"]["kind"], "teacher_conflict");

    let taken = request(
        &mut stdin,
        &mut reader,
        "9",
        "timetable.addSlot",
        slot("A1", "Monday", 1, "English", t2),
    );
    assert_eq!(error_code(&taken), "conflict");
    assert_eq!(taken["error"]["details"]["kind"], "duplicate_slot");

    let listed = request_ok(&mut stdin, &mut reader, "10", "timetable.listSlots", json!({}));
    assert_eq!(listed["slots"].as_array().map(|a| a.len()), Some(1));

    // A different period is free for the same teacher.
    request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "timetable.addSlot",
        slot("A2", "Monday", 2, "Maths", t1),
    );
    let by_teacher = request_ok(
        &mut stdin,
        &mut reader,
        "12",
        "timetable.listSlots",
        json!({ "teacherId": t1 }),
    );
    assert_eq!(by_teacher["slots"].as_array().map(|a| a.len()), Some(2));

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn slot_validation_update_and_remove() {
    let workspace = temp_dir("school-timetable-edit");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let t1 = add_teacher(&mut stdin, &mut reader, "2", "Esi Asante", "Science");

    let bad_day = request(
        &mut stdin,
        &mut reader,
        "3",
        "timetable.addSlot",
        slot("B1", "Saturday", 1, "Science", t1),
    );
    assert_eq!(error_code(&bad_day), "bad_params");
    let bad_period = request(
        &mut stdin,
        &mut reader,
        "4",
        "timetable.addSlot",
        slot("B1", "Tuesday", 9, "Science", t1),
    );
    assert_eq!(error_code(&bad_period), "bad_params");
    let ghost = request(
        &mut stdin,
        &mut reader,
        "5",
        "timetable.addSlot",
        slot("B1", "Tuesday", 3, "Science", t1 + 100),
    );
    assert_eq!(error_code(&ghost), "not_found");

    let added = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "timetable.addSlot",
        slot("B1", "Tuesday", 3, "Science", t1),
    );
    let slot_id = added["slot"]["id"].as_i64().expect("slot id");

    let mut moved = slot("B1", "Wednesday", 4, "Science", t1);
    moved["slotId"] = json!(slot_id);
    let updated = request_ok(&mut stdin, &mut reader, "7", "timetable.updateSlot", moved);
    assert_eq!(updated["slot"]["day"], "Wednesday");
    assert_eq!(updated["slot"]["period"], 4);

    request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "timetable.removeSlot",
        json!({ "slotId": slot_id }),
    );
    let gone = request(
        &mut stdin,
        &mut reader,
        "9",
        "timetable.getSlot",
        json!({ "slotId": slot_id }),
    );
    assert_eq!(error_code(&gone), "not_found");

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn subject_assignments_and_available_teachers() {
    let workspace = temp_dir("school-assignments");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let t1 = add_teacher(&mut stdin, &mut reader, "2", "Kwame Nkrumah", "History");
    let t2 = add_teacher(&mut stdin, &mut reader, "3", "Abena Darko", "History");

    request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "assignments.create",
        json!({ "className": "C1", "subject": "History", "teacherId": t1 }),
    );
    let dup = request(
        &mut stdin,
        &mut reader,
        "5",
        "assignments.create",
        json!({ "className": "C1", "subject": "History", "teacherId": t2 }),
    );
    assert_eq!(dup["error"]["details"]["kind"], "duplicate_assignment");

    let available = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "assignments.availableTeachers",
        json!({ "className": "C1", "subject": "History" }),
    );
    let ids: Vec<i64> = available["teachers"]
        .as_array()
        .expect("teachers")
        .iter()
        .filter_map(|t| t["id"].as_i64())
        .collect();
    assert_eq!(ids, vec![t2]);

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "assignments.list",
        json!({ "className": "C1" }),
    );
    assert_eq!(listed["assignments"][0]["teacherId"], t1);

    let _ = std::fs::remove_dir_all(workspace);
}

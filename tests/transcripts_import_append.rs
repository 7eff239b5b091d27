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
    let exe = env!("CARGO_BIN_EXE_transcriptd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn transcriptd");
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

fn select_workspace(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    workspace: &PathBuf,
) {
    let _ = request_ok(
        stdin,
        reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
}

#[test]
fn import_then_append_builds_transcript_and_persists() {
    let workspace = temp_dir("transcriptd-import-append");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);

    let imported = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "transcripts.importHistory",
        json!({
            "rows": [
                { "ID": "S1", "Name": "Ann", "Semester": 1, "CourseCode": "CS1", "Credits": 3, "Mark": 85 },
                { "ID": "S1", "Semester": 1, "CourseCode": "CS2", "Credits": 3, "Mark": 30 },
                { "Name": "no id", "Mark": 50 }
            ]
        }),
    );
    assert_eq!(imported["imported"], 1);
    assert_eq!(imported["processedRows"], 3);
    assert_eq!(imported["skipped"], 1);
    assert_eq!(imported["skippedRows"][0]["reason"], "missing_id");

    let t = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.transcript",
        json!({ "studentId": "S1" }),
    );
    let student = &t["student"];
    assert_eq!(student["name"], "Ann");
    assert_eq!(student["semesters"].as_array().map(|a| a.len()), Some(1));
    assert_eq!(student["semesters"][0]["courses"].as_array().map(|a| a.len()), Some(2));
    assert_eq!(student["semesters"][0]["gpa"], "2.00");
    assert_eq!(student["cgpa"], "2.00");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "session.set",
        json!({ "session": "2024S1" }),
    );
    let appended = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "transcripts.appendResults",
        json!({
            "courseCode": "CS3",
            "courseTitle": "DATA STRUCTURES",
            "credits": 3,
            "rows": [ { "ID": "S1", "Mark": 70 } ]
        }),
    );
    assert_eq!(appended["updated"], 1);
    assert_eq!(appended["skipped"], 0);

    drop(stdin);
    let _ = child.wait();

    // A fresh process must see the same dataset.
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);
    let session = request_ok(&mut stdin, &mut reader, "5", "session.get", json!({}));
    assert_eq!(session["session"], "2024S1");

    let t = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "students.transcript",
        json!({ "studentId": "S1" }),
    );
    let semesters = t["student"]["semesters"].as_array().cloned().unwrap_or_default();
    assert_eq!(semesters.len(), 2);
    let added = &semesters[1];
    assert_eq!(added["sessionLabel"], "2024S1");
    assert_eq!(added["number"], 2);
    let cs3 = &added["courses"][0];
    assert_eq!(cs3["code"], "CS3");
    assert_eq!(cs3["letter"], "B+");
    let points = cs3["gradePoints"].as_f64().expect("gradePoints");
    assert!((points - 9.99).abs() < 1e-9);
    // (12 + 0 + 9.99) / 9
    assert_eq!(t["student"]["cgpa"], "2.44");

    let catalog = request_ok(&mut stdin, &mut reader, "7", "catalog.list", json!({}));
    let codes: Vec<String> = catalog["courses"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .filter_map(|c| c["code"].as_str().map(str::to_string))
        .collect();
    assert_eq!(codes, vec!["CS1", "CS2", "CS3"]);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn preconditions_surface_typed_error_codes() {
    let workspace = temp_dir("transcriptd-preconditions");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let before = request(
        &mut stdin,
        &mut reader,
        "0",
        "transcripts.importHistory",
        json!({ "rows": [ { "ID": "S1" } ] }),
    );
    assert_eq!(error_code(&before), "no_workspace");

    select_workspace(&mut stdin, &mut reader, &workspace);

    let empty = request(
        &mut stdin,
        &mut reader,
        "1",
        "transcripts.importHistory",
        json!({ "rows": [] }),
    );
    assert_eq!(error_code(&empty), "empty_input");

    let no_session = request(
        &mut stdin,
        &mut reader,
        "2",
        "transcripts.appendResults",
        json!({ "courseCode": "CS3", "courseTitle": "DS", "rows": [ { "ID": "S1", "Mark": 70 } ] }),
    );
    assert_eq!(error_code(&no_session), "no_session");

    let blank_session = request(
        &mut stdin,
        &mut reader,
        "3",
        "session.set",
        json!({ "session": "   " }),
    );
    assert_eq!(error_code(&blank_session), "invalid_session");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "session.set",
        json!({ "session": "2024S1" }),
    );
    let no_title = request(
        &mut stdin,
        &mut reader,
        "5",
        "transcripts.appendResults",
        json!({ "courseCode": "CS3", "rows": [ { "ID": "S1", "Mark": 70 } ] }),
    );
    assert_eq!(error_code(&no_title), "invalid_course");

    let bad_rows = request(
        &mut stdin,
        &mut reader,
        "6",
        "transcripts.importHistory",
        json!({ "rows": [ 1, 2 ] }),
    );
    assert_eq!(error_code(&bad_rows), "bad_params");

    let stats = request_ok(&mut stdin, &mut reader, "7", "stats.get", json!({}));
    assert_eq!(stats["students"], 0);
    assert_eq!(stats["catalog"], 0);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

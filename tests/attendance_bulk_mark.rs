
use serde_json::{json, Value};
use test_support::{open_school, request, request_ok, spawn_sidecar, temp_dir};

#[test]
fn bulk_mark_upserts_per_student_per_date() {
    let workspace = temp_dir("campus-attendance");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let token = open_school(&mut stdin, &mut reader, &workspace, "Roll Call High");

    let class = request_ok(
        &mut stdin,
        &mut reader,
        "c1",
        "POST",
        "/api/academics/classes",
        Some(&token),
        Value::Null,
        json!({ "name": "Class 3" }),
    );
    let class_id = class["id"].as_str().expect("class id").to_string();

    let mut student_ids = Vec::new();
    for (i, (first, last)) in [("Asha", "Verma"), ("Dev", "Mehta")].iter().enumerate() {
        let created = request_ok(
            &mut stdin,
            &mut reader,
            &format!("st-{}", i),
            "POST",
            "/api/students",
            Some(&token),
            Value::Null,
            json!({ "firstName": first, "lastName": last, "classId": class_id }),
        );
        student_ids.push(created["id"].as_str().expect("id").to_string());
    }

    let marked = request_ok(
        &mut stdin,
        &mut reader,
        "m1",
        "POST",
        "/api/attendance",
        Some(&token),
        Value::Null,
        json!({
            "date": "2025-06-02",
            "entries": [
                { "studentId": student_ids[0], "status": "present" },
                { "studentId": student_ids[1], "status": "absent" },
                { "studentId": "ghost", "status": "present" },
            ],
        }),
    );
    // Unknown students are skipped, not fatal.
    assert_eq!(marked["marked"], json!(2));

    // Re-marking the same date replaces, never duplicates.
    let remarked = request_ok(
        &mut stdin,
        &mut reader,
        "m2",
        "POST",
        "/api/attendance",
        Some(&token),
        Value::Null,
        json!({
            "date": "2025-06-02",
            "entries": [{ "studentId": student_ids[1], "status": "late" }],
        }),
    );
    assert_eq!(remarked["marked"], json!(1));

    let listed = request(
        &mut stdin,
        &mut reader,
        "l1",
        "GET",
        "/api/attendance",
        Some(&token),
        json!({ "classId": class_id, "date": "2025-06-02" }),
        Value::Null,
    );
    assert_eq!(listed["pagination"]["total"], json!(2));
    let statuses: Vec<&str> = listed["data"]
        .as_array()
        .expect("rows")
        .iter()
        .map(|r| r["status"].as_str().expect("status"))
        .collect();
    assert!(statuses.contains(&"present"));
    assert!(statuses.contains(&"late"));
    assert!(!statuses.contains(&"absent"));

    // Single-record correction through PUT.
    let record_id = listed["data"][0]["id"].as_str().expect("record id");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "u1",
        "PUT",
        &format!("/api/attendance/{}", record_id),
        Some(&token),
        Value::Null,
        json!({ "status": "absent" }),
    );

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn attendance_list_requires_a_scope_and_valid_status() {
    let workspace = temp_dir("campus-attendance-scope");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let token = open_school(&mut stdin, &mut reader, &workspace, "Roll Call High");

    let unscoped = request(
        &mut stdin,
        &mut reader,
        "q1",
        "GET",
        "/api/attendance",
        Some(&token),
        Value::Null,
        Value::Null,
    );
    assert_eq!(unscoped["status"], json!(400));
    assert_eq!(unscoped["error"], json!("classId or studentId is required"));

    let bad_status = request(
        &mut stdin,
        &mut reader,
        "q2",
        "POST",
        "/api/attendance",
        Some(&token),
        Value::Null,
        json!({
            "date": "2025-06-02",
            "entries": [{ "studentId": "s1", "status": "vanished" }],
        }),
    );
    assert_eq!(bad_status["status"], json!(400));

    let bad_date = request(
        &mut stdin,
        &mut reader,
        "q3",
        "POST",
        "/api/attendance",
        Some(&token),
        Value::Null,
        json!({ "date": "02-06-2025", "entries": [] }),
    );
    assert_eq!(bad_date["error"], json!("date must be YYYY-MM-DD"));

    let _ = std::fs::remove_dir_all(workspace);
}


use serde_json::{json, Value};
use test_support::{open_school, request, request_ok, spawn_sidecar, temp_dir};

#[test]
fn book_availability_never_exceeds_copies() {
    let workspace = temp_dir("campus-library");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let token = open_school(&mut stdin, &mut reader, &workspace, "Stacks High");

    let over = request(
        &mut stdin,
        &mut reader,
        "b1",
        "POST",
        "/api/library/books",
        Some(&token),
        Value::Null,
        json!({ "title": "Pale Fire", "copies": 2, "available": 5 }),
    );
    assert_eq!(over["status"], json!(400));
    assert_eq!(over["error"], json!("available cannot exceed copies"));

    // Omitted counts default to one copy, all available.
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "b2",
        "POST",
        "/api/library/books",
        Some(&token),
        Value::Null,
        json!({ "title": "Pale Fire", "author": "Nabokov" }),
    );
    let book_id = created["id"].as_str().expect("book id").to_string();

    let listed = request(
        &mut stdin,
        &mut reader,
        "b3",
        "GET",
        "/api/library/books",
        Some(&token),
        json!({ "search": "pale" }),
        Value::Null,
    );
    let row = &listed["data"][0];
    assert_eq!(row["copies"], json!(1));
    assert_eq!(row["available"], json!(1));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "b4",
        "PUT",
        &format!("/api/library/books/{}", book_id),
        Some(&token),
        Value::Null,
        json!({ "title": "Pale Fire", "copies": 4, "available": 3 }),
    );

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn vehicle_registration_numbers_are_unique_per_school() {
    let workspace = temp_dir("campus-transport");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let token = open_school(&mut stdin, &mut reader, &workspace, "Fleet High");

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "v1",
        "POST",
        "/api/transport/vehicles",
        Some(&token),
        Value::Null,
        json!({ "regNo": "KA-01-1234", "driverName": "S. Rao", "capacity": 40 }),
    );
    let vehicle_id = created["id"].as_str().expect("vehicle id").to_string();

    let dup = request(
        &mut stdin,
        &mut reader,
        "v2",
        "POST",
        "/api/transport/vehicles",
        Some(&token),
        Value::Null,
        json!({ "regNo": "KA-01-1234" }),
    );
    assert_eq!(dup["status"], json!(400));
    assert_eq!(
        dup["error"],
        json!("a vehicle with this registration number already exists")
    );

    // A vehicle may keep its own registration through an update.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "v3",
        "PUT",
        &format!("/api/transport/vehicles/{}", vehicle_id),
        Some(&token),
        Value::Null,
        json!({ "regNo": "KA-01-1234", "status": "maintenance" }),
    );

    let listed = request(
        &mut stdin,
        &mut reader,
        "v4",
        "GET",
        "/api/transport/vehicles",
        Some(&token),
        json!({ "status": "maintenance" }),
        Value::Null,
    );
    assert_eq!(listed["pagination"]["total"], json!(1));

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn inventory_and_enquiries_track_their_statuses() {
    let workspace = temp_dir("campus-office");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let token = open_school(&mut stdin, &mut reader, &workspace, "Office High");

    let item = request_ok(
        &mut stdin,
        &mut reader,
        "i1",
        "POST",
        "/api/inventory/items",
        Some(&token),
        Value::Null,
        json!({ "name": "Whiteboard markers", "quantity": 12, "unitPrice": "3.50" }),
    );
    assert!(item["id"].is_string());

    let bad_status = request(
        &mut stdin,
        &mut reader,
        "i2",
        "POST",
        "/api/inventory/items",
        Some(&token),
        Value::Null,
        json!({ "name": "Chalk", "status": "misplaced" }),
    );
    assert_eq!(bad_status["status"], json!(400));

    let enquiry = request_ok(
        &mut stdin,
        &mut reader,
        "e1",
        "POST",
        "/api/front-office/enquiries",
        Some(&token),
        Value::Null,
        json!({
            "name": "R. Kapoor",
            "purpose": "admission enquiry",
            "date": "2025-06-10",
        }),
    );
    let enquiry_id = enquiry["id"].as_str().expect("enquiry id").to_string();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "e2",
        "PUT",
        &format!("/api/front-office/enquiries/{}", enquiry_id),
        Some(&token),
        Value::Null,
        json!({
            "name": "R. Kapoor",
            "purpose": "admission enquiry",
            "date": "2025-06-10",
            "status": "closed",
        }),
    );

    let open_only = request(
        &mut stdin,
        &mut reader,
        "e3",
        "GET",
        "/api/front-office/enquiries",
        Some(&token),
        json!({ "status": "open" }),
        Value::Null,
    );
    assert_eq!(open_only["pagination"]["total"], json!(0));

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn settings_upsert_by_key() {
    let workspace = temp_dir("campus-settings");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let token = open_school(&mut stdin, &mut reader, &workspace, "Config High");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "s1",
        "PUT",
        "/api/settings",
        Some(&token),
        Value::Null,
        json!({ "key": "academicYear", "value": "2025-26" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "s2",
        "PUT",
        "/api/settings",
        Some(&token),
        Value::Null,
        json!({ "key": "academicYear", "value": "2026-27" }),
    );

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "s3",
        "GET",
        "/api/settings",
        Some(&token),
        Value::Null,
        Value::Null,
    );
    let rows = listed.as_array().expect("settings rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["key"], json!("academicYear"));
    assert_eq!(rows[0]["value"], json!("2026-27"));

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn attendance_report_counts_by_student_for_a_month() {
    let workspace = temp_dir("campus-report");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let token = open_school(&mut stdin, &mut reader, &workspace, "Report High");

    let class = request_ok(
        &mut stdin,
        &mut reader,
        "c1",
        "POST",
        "/api/academics/classes",
        Some(&token),
        Value::Null,
        json!({ "name": "Class 4" }),
    );
    let class_id = class["id"].as_str().expect("class id").to_string();
    let student = request_ok(
        &mut stdin,
        &mut reader,
        "st1",
        "POST",
        "/api/students",
        Some(&token),
        Value::Null,
        json!({ "firstName": "Asha", "lastName": "Verma", "classId": class_id }),
    );
    let student_id = student["id"].as_str().expect("student id").to_string();

    for (i, (date, status)) in [
        ("2025-06-02", "present"),
        ("2025-06-03", "present"),
        ("2025-06-04", "late"),
        ("2025-07-01", "absent"),
    ]
    .iter()
    .enumerate()
    {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("m-{}", i),
            "POST",
            "/api/attendance",
            Some(&token),
            Value::Null,
            json!({ "date": date, "entries": [{ "studentId": student_id, "status": status }] }),
        );
    }

    let report = request_ok(
        &mut stdin,
        &mut reader,
        "r1",
        "GET",
        "/api/reports/attendance",
        Some(&token),
        json!({ "classId": class_id, "month": "2025-06" }),
        Value::Null,
    );
    assert_eq!(report["month"], json!("2025-06"));
    let row = &report["rows"][0];
    assert_eq!(row["studentName"], json!("Verma, Asha"));
    assert_eq!(row["present"], json!(2));
    assert_eq!(row["late"], json!(1));
    // The July absence stays out of the June report.
    assert_eq!(row["absent"], json!(0));

    let bad_month = request(
        &mut stdin,
        &mut reader,
        "r2",
        "GET",
        "/api/reports/attendance",
        Some(&token),
        json!({ "classId": class_id, "month": "June 2025" }),
        Value::Null,
    );
    assert_eq!(bad_month["status"], json!(400));
    assert_eq!(bad_month["error"], json!("month must be YYYY-MM"));

    let _ = std::fs::remove_dir_all(workspace);
}

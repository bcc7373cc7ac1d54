
use std::io::BufReader;
use std::process::{ChildStdin, ChildStdout};

use serde_json::{json, Value};
use test_support::{open_school, request, request_ok, spawn_sidecar, temp_dir};

fn create_named(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    token: &str,
    id: &str,
    path: &str,
    body: Value,
) -> String {
    let data = request_ok(stdin, reader, id, "POST", path, Some(token), Value::Null, body);
    data["id"].as_str().expect("created id").to_string()
}

#[test]
fn class_and_section_names_are_unique_within_scope() {
    let workspace = temp_dir("campus-academics-dup");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let token = open_school(&mut stdin, &mut reader, &workspace, "Dup High");

    let class_id = create_named(
        &mut stdin,
        &mut reader,
        &token,
        "c1",
        "/api/academics/classes",
        json!({ "name": "Class 5" }),
    );
    let dup = request(
        &mut stdin,
        &mut reader,
        "c2",
        "POST",
        "/api/academics/classes",
        Some(&token),
        Value::Null,
        json!({ "name": "Class 5" }),
    );
    assert_eq!(dup["status"], json!(400));
    assert_eq!(dup["error"], json!("a class with this name already exists"));

    let _ = create_named(
        &mut stdin,
        &mut reader,
        &token,
        "s1",
        "/api/academics/sections",
        json!({ "classId": class_id, "name": "A" }),
    );
    let dup_section = request(
        &mut stdin,
        &mut reader,
        "s2",
        "POST",
        "/api/academics/sections",
        Some(&token),
        Value::Null,
        json!({ "classId": class_id, "name": "A" }),
    );
    assert_eq!(dup_section["status"], json!(400));

    // Section listing is class-scoped; asking without a class is an error.
    let unscoped = request(
        &mut stdin,
        &mut reader,
        "s3",
        "GET",
        "/api/academics/sections",
        Some(&token),
        Value::Null,
        Value::Null,
    );
    assert_eq!(unscoped["status"], json!(400));
    assert_eq!(unscoped["error"], json!("classId is required"));

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn class_delete_refuses_while_students_remain() {
    let workspace = temp_dir("campus-academics-delete");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let token = open_school(&mut stdin, &mut reader, &workspace, "Dup High");

    let class_id = create_named(
        &mut stdin,
        &mut reader,
        &token,
        "c1",
        "/api/academics/classes",
        json!({ "name": "Class 8" }),
    );
    let student_id = create_named(
        &mut stdin,
        &mut reader,
        &token,
        "st1",
        "/api/students",
        json!({ "firstName": "Asha", "lastName": "Verma", "classId": class_id }),
    );

    let blocked = request(
        &mut stdin,
        &mut reader,
        "d1",
        "DELETE",
        &format!("/api/academics/classes/{}", class_id),
        Some(&token),
        Value::Null,
        Value::Null,
    );
    assert_eq!(blocked["status"], json!(400));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "d2",
        "DELETE",
        &format!("/api/students/{}", student_id),
        Some(&token),
        Value::Null,
        Value::Null,
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "d3",
        "DELETE",
        &format!("/api/academics/classes/{}", class_id),
        Some(&token),
        Value::Null,
        Value::Null,
    );

    let remaining = request(
        &mut stdin,
        &mut reader,
        "l1",
        "GET",
        "/api/academics/classes",
        Some(&token),
        Value::Null,
        Value::Null,
    );
    assert_eq!(remaining["pagination"]["total"], json!(0));

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn timetable_rejects_double_booked_periods_and_joins_names() {
    let workspace = temp_dir("campus-timetable");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let token = open_school(&mut stdin, &mut reader, &workspace, "Grid High");

    let class_id = create_named(
        &mut stdin,
        &mut reader,
        &token,
        "c1",
        "/api/academics/classes",
        json!({ "name": "Class 6" }),
    );
    let section_id = create_named(
        &mut stdin,
        &mut reader,
        &token,
        "s1",
        "/api/academics/sections",
        json!({ "classId": class_id, "name": "B" }),
    );
    let staff_id = create_named(
        &mut stdin,
        &mut reader,
        &token,
        "t1",
        "/api/staff",
        json!({ "name": "R. Iyer", "role": "teacher" }),
    );

    let entry = json!({
        "classId": class_id,
        "sectionId": section_id,
        "dayOfWeek": 1,
        "period": 2,
        "subject": "Maths",
        "staffId": staff_id,
        "startsAt": "09:00",
        "endsAt": "09:45",
    });
    let entry_id = create_named(
        &mut stdin,
        &mut reader,
        &token,
        "e1",
        "/api/academics/timetable",
        entry.clone(),
    );

    let clash = request(
        &mut stdin,
        &mut reader,
        "e2",
        "POST",
        "/api/academics/timetable",
        Some(&token),
        Value::Null,
        entry.clone(),
    );
    assert_eq!(clash["status"], json!(400));
    assert_eq!(
        clash["error"],
        json!("this period is already scheduled for the section")
    );

    let out_of_range = request(
        &mut stdin,
        &mut reader,
        "e3",
        "POST",
        "/api/academics/timetable",
        Some(&token),
        Value::Null,
        json!({
            "classId": class_id, "sectionId": section_id,
            "dayOfWeek": 8, "period": 1, "subject": "Maths",
        }),
    );
    assert_eq!(out_of_range["status"], json!(400));

    let listed = request(
        &mut stdin,
        &mut reader,
        "l1",
        "GET",
        "/api/academics/timetable",
        Some(&token),
        json!({ "classId": class_id }),
        Value::Null,
    );
    let row = &listed["data"][0];
    assert_eq!(row["subject"], json!("Maths"));
    assert_eq!(row["staffName"], json!("R. Iyer"));
    assert_eq!(row["sectionName"], json!("B"));

    // Updating an entry in place may keep its own slot.
    let mut moved = entry.clone();
    moved["subject"] = json!("Algebra");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "u1",
        "PUT",
        &format!("/api/academics/timetable/{}", entry_id),
        Some(&token),
        Value::Null,
        moved,
    );

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "d1",
        "DELETE",
        &format!("/api/academics/timetable/{}", entry_id),
        Some(&token),
        Value::Null,
        Value::Null,
    );

    let _ = std::fs::remove_dir_all(workspace);
}


use serde_json::{json, Value};
use test_support::{open_school, request, request_ok, spawn_sidecar, temp_dir};

#[test]
fn paid_at_follows_status_transitions() {
    let workspace = temp_dir("campus-fees");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let token = open_school(&mut stdin, &mut reader, &workspace, "Ledger High");

    let student = request_ok(
        &mut stdin,
        &mut reader,
        "st1",
        "POST",
        "/api/students",
        Some(&token),
        Value::Null,
        json!({ "firstName": "Asha", "lastName": "Verma" }),
    );
    let student_id = student["id"].as_str().expect("student id").to_string();

    let fee = request_ok(
        &mut stdin,
        &mut reader,
        "f1",
        "POST",
        "/api/fees",
        Some(&token),
        Value::Null,
        json!({
            "studentId": student_id,
            "title": "Term 1 tuition",
            "amount": "1250.50",
            "dueDate": "2025-04-15",
        }),
    );
    let fee_id = fee["id"].as_str().expect("fee id").to_string();

    let fetch_row = |stdin: &mut _, reader: &mut _, id: &str| -> Value {
        let listed = request(
            stdin,
            reader,
            id,
            "GET",
            "/api/fees",
            Some(&token),
            json!({ "studentId": student_id }),
            Value::Null,
        );
        listed["data"][0].clone()
    };

    let row = fetch_row(&mut stdin, &mut reader, "l1");
    assert_eq!(row["status"], json!("unpaid"));
    assert_eq!(row["paidAt"], Value::Null);
    // Numeric strings in the body land as numbers in the ledger.
    assert_eq!(row["amount"], json!(1250.5));
    assert_eq!(row["studentName"], json!("Verma, Asha"));

    let put_status = |stdin: &mut _, reader: &mut _, id: &str, status: &str| {
        let _ = request_ok(
            stdin,
            reader,
            id,
            "PUT",
            &format!("/api/fees/{}", fee_id),
            Some(&token),
            Value::Null,
            json!({
                "studentId": student_id,
                "title": "Term 1 tuition",
                "amount": 1250.50,
                "dueDate": "2025-04-15",
                "status": status,
            }),
        );
    };

    put_status(&mut stdin, &mut reader, "u1", "paid");
    let row = fetch_row(&mut stdin, &mut reader, "l2");
    assert_eq!(row["status"], json!("paid"));
    let stamped = row["paidAt"].as_str().expect("paidAt stamped").to_string();

    // Saving again while already paid keeps the original stamp.
    put_status(&mut stdin, &mut reader, "u2", "paid");
    let row = fetch_row(&mut stdin, &mut reader, "l3");
    assert_eq!(row["paidAt"], json!(stamped));

    // Reverting to unpaid clears it.
    put_status(&mut stdin, &mut reader, "u3", "unpaid");
    let row = fetch_row(&mut stdin, &mut reader, "l4");
    assert_eq!(row["paidAt"], Value::Null);

    // The overview report derives billed and outstanding from the ledger.
    let overview = request_ok(
        &mut stdin,
        &mut reader,
        "r1",
        "GET",
        "/api/reports/overview",
        Some(&token),
        Value::Null,
        Value::Null,
    );
    assert_eq!(overview["fees"]["billed"], json!(1250.5));
    assert_eq!(overview["fees"]["collected"], json!(0.0));
    assert_eq!(overview["fees"]["outstanding"], json!(1250.5));
    assert_eq!(overview["students"]["total"], json!(1));

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn fee_validation_rejects_bad_amounts_and_unknown_students() {
    let workspace = temp_dir("campus-fees-validate");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let token = open_school(&mut stdin, &mut reader, &workspace, "Ledger High");

    let negative = request(
        &mut stdin,
        &mut reader,
        "v1",
        "POST",
        "/api/fees",
        Some(&token),
        Value::Null,
        json!({
            "studentId": "s1",
            "title": "Term 1",
            "amount": -5,
            "dueDate": "2025-04-15",
        }),
    );
    assert_eq!(negative["status"], json!(400));
    assert_eq!(negative["error"], json!("amount must be a non-negative number"));

    let ghost = request(
        &mut stdin,
        &mut reader,
        "v2",
        "POST",
        "/api/fees",
        Some(&token),
        Value::Null,
        json!({
            "studentId": "ghost",
            "title": "Term 1",
            "amount": 100,
            "dueDate": "2025-04-15",
        }),
    );
    assert_eq!(ghost["error"], json!("student not found"));

    let _ = std::fs::remove_dir_all(workspace);
}

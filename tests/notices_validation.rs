
use serde_json::{json, Value};
use test_support::{open_school, request, request_ok, spawn_sidecar, temp_dir};

#[test]
fn notice_titles_are_required_and_unique() {
    let workspace = temp_dir("campus-notices");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let token = open_school(&mut stdin, &mut reader, &workspace, "Notice High");

    let empty = request(
        &mut stdin,
        &mut reader,
        "n1",
        "POST",
        "/api/events/notices",
        Some(&token),
        Value::Null,
        json!({ "title": "", "body": "hello" }),
    );
    assert_eq!(empty["status"], json!(400));
    assert_eq!(empty["error"], json!("title is required"));

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "n2",
        "POST",
        "/api/events/notices",
        Some(&token),
        Value::Null,
        json!({ "title": "Sports day", "publishDate": "2025-03-01" }),
    );
    let notice_id = created["id"].as_str().expect("notice id").to_string();

    let dup = request(
        &mut stdin,
        &mut reader,
        "n3",
        "POST",
        "/api/events/notices",
        Some(&token),
        Value::Null,
        json!({ "title": "Sports day" }),
    );
    assert_eq!(dup["status"], json!(400));
    assert_eq!(dup["error"], json!("a notice with this title already exists"));

    let bad_audience = request(
        &mut stdin,
        &mut reader,
        "n4",
        "POST",
        "/api/events/notices",
        Some(&token),
        Value::Null,
        json!({ "title": "Exam week", "audience": "aliens" }),
    );
    assert_eq!(bad_audience["status"], json!(400));

    // Renaming onto another notice's title is also blocked, but saving a
    // notice under its own title is not.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "n5",
        "POST",
        "/api/events/notices",
        Some(&token),
        Value::Null,
        json!({ "title": "Exam week" }),
    );
    let rename_clash = request(
        &mut stdin,
        &mut reader,
        "n6",
        "PUT",
        &format!("/api/events/notices/{}", notice_id),
        Some(&token),
        Value::Null,
        json!({ "title": "Exam week" }),
    );
    assert_eq!(rename_clash["status"], json!(400));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "n7",
        "PUT",
        &format!("/api/events/notices/{}", notice_id),
        Some(&token),
        Value::Null,
        json!({ "title": "Sports day", "audience": "students" }),
    );

    let listed = request(
        &mut stdin,
        &mut reader,
        "n8",
        "GET",
        "/api/events/notices",
        Some(&token),
        json!({ "audience": "students" }),
        Value::Null,
    );
    assert_eq!(listed["pagination"]["total"], json!(1));
    assert_eq!(listed["data"][0]["title"], json!("Sports day"));

    let _ = std::fs::remove_dir_all(workspace);
}

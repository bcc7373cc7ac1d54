
use serde_json::{json, Value};
use test_support::{open_school, request, request_ok, spawn_sidecar, temp_dir};

#[test]
fn health_works_before_any_workspace() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let data = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "GET",
        "/health",
        None,
        Value::Null,
        Value::Null,
    );
    assert_eq!(data.get("status").and_then(|v| v.as_str()), Some("ok"));
}

#[test]
fn resource_routes_refuse_without_a_workspace() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let resp = request(
        &mut stdin,
        &mut reader,
        "1",
        "GET",
        "/api/students",
        None,
        Value::Null,
        Value::Null,
    );
    assert_eq!(resp["success"], json!(false));
    assert_eq!(resp["status"], json!(503));
    assert_eq!(resp["error"], json!("open a workspace first"));
}

#[test]
fn missing_and_bogus_tokens_are_rejected() {
    let workspace = temp_dir("campus-smoke-auth");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = open_school(&mut stdin, &mut reader, &workspace, "Smoke High");

    let no_token = request(
        &mut stdin,
        &mut reader,
        "1",
        "GET",
        "/api/students",
        None,
        Value::Null,
        Value::Null,
    );
    assert_eq!(no_token["status"], json!(401));
    assert_eq!(no_token["error"], json!("unauthorized"));

    let bad_token = request(
        &mut stdin,
        &mut reader,
        "2",
        "GET",
        "/api/students",
        Some("not-a-real-token"),
        Value::Null,
        Value::Null,
    );
    assert_eq!(bad_token["status"], json!(401));

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn unknown_routes_report_method_and_path() {
    let workspace = temp_dir("campus-smoke-404");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let token = open_school(&mut stdin, &mut reader, &workspace, "Smoke High");

    let resp = request(
        &mut stdin,
        &mut reader,
        "1",
        "GET",
        "/api/no-such-thing",
        Some(&token),
        Value::Null,
        Value::Null,
    );
    assert_eq!(resp["status"], json!(404));
    assert_eq!(resp["error"], json!("unknown route: GET /api/no-such-thing"));

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn every_resource_family_lists_empty_after_setup() {
    let workspace = temp_dir("campus-smoke-lists");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let token = open_school(&mut stdin, &mut reader, &workspace, "Smoke High");

    let list_paths = [
        "/api/staff",
        "/api/academics/classes",
        "/api/library/books",
        "/api/transport/vehicles",
        "/api/inventory/items",
        "/api/front-office/enquiries",
        "/api/events/notices",
    ];
    for (i, path) in list_paths.iter().enumerate() {
        let resp = request(
            &mut stdin,
            &mut reader,
            &format!("list-{}", i),
            "GET",
            path,
            Some(&token),
            Value::Null,
            Value::Null,
        );
        assert_eq!(resp["success"], json!(true), "list {} failed: {}", path, resp);
        assert_eq!(resp["data"], json!([]));
        assert_eq!(resp["pagination"]["total"], json!(0));
        assert_eq!(resp["pagination"]["page"], json!(1));
    }

    let _ = std::fs::remove_dir_all(workspace);
}

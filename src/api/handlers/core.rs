use std::path::PathBuf;

use chrono::Utc;
use rusqlite::OptionalExtension;
use serde_json::json;
use uuid::Uuid;

use crate::api::error::{fail, ok, respond, ApiError};
use crate::api::types::{ApiRequest, AppState};
use crate::api::validate::{optional_str, required_str};
use crate::backup;
use crate::db;

fn handle_workspace_open(state: &mut AppState, req: &ApiRequest) -> serde_json::Value {
    let path = match required_str(&req.body, "path") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e.response(&req.id),
    };
    match db::open_db(&path) {
        Ok(conn) => {
            state.workspace = Some(path.clone());
            state.db = Some(conn);
            log::info!("workspace opened: {}", path.to_string_lossy());
            ok(&req.id, json!({ "workspace": path.to_string_lossy() }))
        }
        Err(e) => ApiError::internal(e).response(&req.id),
    }
}

/// Provisioning hook: mints a token for a named school, creating the school
/// row on first use. Issuance policy (expiry, renewal) lives outside campusd.
fn handle_session_issue(state: &mut AppState, req: &ApiRequest) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return fail(&req.id, 503, "open a workspace first");
    };
    let result = (|| -> Result<serde_json::Value, ApiError> {
        let school = required_str(&req.body, "school")?;
        let user_name = required_str(&req.body, "userName")?;
        let role = optional_str(&req.body, "role")?.unwrap_or_else(|| "admin".to_string());

        let existing: Option<String> = conn
            .query_row("SELECT id FROM schools WHERE name = ?", [&school], |r| {
                r.get(0)
            })
            .optional()?;
        let school_id = match existing {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4().to_string();
                conn.execute(
                    "INSERT INTO schools(id, name) VALUES(?, ?)",
                    (&id, &school),
                )?;
                id
            }
        };

        let token = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO sessions(token, school_id, user_name, role, issued_at)
             VALUES(?, ?, ?, ?, ?)",
            (&token, &school_id, &user_name, &role, Utc::now().to_rfc3339()),
        )?;
        Ok(json!({ "token": token, "schoolId": school_id }))
    })();
    respond(&req.id, result)
}

fn handle_backup(state: &mut AppState, req: &ApiRequest) -> serde_json::Value {
    let Some(workspace) = state.workspace.clone() else {
        return fail(&req.id, 503, "open a workspace first");
    };
    let out_path = match required_str(&req.body, "outPath") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e.response(&req.id),
    };
    match backup::export_workspace_bundle(&workspace, &out_path) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "bundleFormat": summary.bundle_format,
                "dbSha256": summary.db_sha256,
                "outPath": out_path.to_string_lossy(),
            }),
        ),
        Err(e) => ApiError::internal(e).response(&req.id),
    }
}

fn handle_restore(state: &mut AppState, req: &ApiRequest) -> serde_json::Value {
    let Some(workspace) = state.workspace.clone() else {
        return fail(&req.id, 503, "open a workspace first");
    };
    let in_path = match required_str(&req.body, "inPath") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e.response(&req.id),
    };

    // Release the live connection before the file swap.
    state.db = None;
    let imported = backup::import_workspace_bundle(&in_path, &workspace);
    let reopened = db::open_db(&workspace);
    match (imported, reopened) {
        (Ok(summary), Ok(conn)) => {
            state.db = Some(conn);
            ok(
                &req.id,
                json!({ "bundleFormat": summary.bundle_format_detected }),
            )
        }
        (Err(e), Ok(conn)) => {
            state.db = Some(conn);
            fail(&req.id, 400, e.to_string())
        }
        (_, Err(e)) => ApiError::internal(e).response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &ApiRequest) -> Option<serde_json::Value> {
    match (req.method.as_str(), req.path.as_str()) {
        ("GET", "/health") => Some(ok(
            &req.id,
            json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }),
        )),
        ("POST", "/workspace") => Some(handle_workspace_open(state, req)),
        ("POST", "/sessions") => Some(handle_session_issue(state, req)),
        ("POST", "/workspace/backup") => Some(handle_backup(state, req)),
        ("POST", "/workspace/restore") => Some(handle_restore(state, req)),
        _ => None,
    }
}

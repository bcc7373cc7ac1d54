use rusqlite::Connection;
use serde_json::json;

use crate::api::error::{respond, ApiError};
use crate::api::session::SessionCtx;
use crate::api::types::ApiRequest;
use crate::api::validate::required_str;

fn list_settings(conn: &Connection, ctx: &SessionCtx) -> Result<serde_json::Value, ApiError> {
    let mut stmt =
        conn.prepare("SELECT key, value FROM settings WHERE school_id = ? ORDER BY key")?;
    let rows = stmt
        .query_map([&ctx.school_id], |r| {
            Ok(json!({
                "key": r.get::<_, String>(0)?,
                "value": r.get::<_, String>(1)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(json!(rows))
}

fn upsert_setting(
    conn: &Connection,
    ctx: &SessionCtx,
    body: &serde_json::Value,
) -> Result<serde_json::Value, ApiError> {
    let key = required_str(body, "key")?;
    let value = required_str(body, "value")?;
    conn.execute(
        "INSERT INTO settings(school_id, key, value) VALUES(?, ?, ?)
         ON CONFLICT(school_id, key) DO UPDATE SET value = excluded.value",
        (&ctx.school_id, &key, &value),
    )?;
    Ok(json!({ "key": key, "value": value }))
}

pub fn try_handle(
    conn: &Connection,
    ctx: &SessionCtx,
    req: &ApiRequest,
) -> Option<serde_json::Value> {
    match (req.method.as_str(), req.path.as_str()) {
        ("GET", "/api/settings") => Some(respond(&req.id, list_settings(conn, ctx))),
        ("PUT", "/api/settings") => Some(respond(&req.id, upsert_setting(conn, ctx, &req.body))),
        _ => None,
    }
}

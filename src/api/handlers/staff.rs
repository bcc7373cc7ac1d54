use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

use crate::api::error::{respond, respond_list, ApiError, Pagination};
use crate::api::session::SessionCtx;
use crate::api::types::ApiRequest;
use crate::api::validate::{
    like_pattern, one_of, optional_str, parse_page, path_id, q_str, required_str,
};

fn list_staff(
    conn: &Connection,
    ctx: &SessionCtx,
    query: &serde_json::Value,
) -> Result<(Vec<serde_json::Value>, Pagination), ApiError> {
    let mut clauses = vec!["school_id = ?".to_string()];
    let mut args: Vec<String> = vec![ctx.school_id.clone()];

    if let Some(v) = q_str(query, "role") {
        clauses.push("role = ?".to_string());
        args.push(v);
    }
    if let Some(v) = q_str(query, "department") {
        clauses.push("department = ?".to_string());
        args.push(v);
    }
    if let Some(v) = q_str(query, "status") {
        clauses.push("status = ?".to_string());
        args.push(v);
    }
    if let Some(v) = q_str(query, "search") {
        clauses.push("(name LIKE ? OR phone LIKE ?)".to_string());
        let pat = like_pattern(&v);
        args.push(pat.clone());
        args.push(pat);
    }

    let where_sql = clauses.join(" AND ");
    let params: Vec<&dyn rusqlite::ToSql> =
        args.iter().map(|s| s as &dyn rusqlite::ToSql).collect();

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM staff WHERE {}", where_sql),
        params.as_slice(),
        |r| r.get(0),
    )?;

    let page = parse_page(query);
    let mut stmt = conn.prepare(&format!(
        "SELECT id, name, role, department, phone, status
         FROM staff
         WHERE {}
         ORDER BY name
         LIMIT {} OFFSET {}",
        where_sql,
        page.limit,
        page.offset()
    ))?;
    let rows = stmt
        .query_map(params.as_slice(), |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "name": r.get::<_, String>(1)?,
                "role": r.get::<_, String>(2)?,
                "department": r.get::<_, Option<String>>(3)?,
                "phone": r.get::<_, Option<String>>(4)?,
                "status": r.get::<_, String>(5)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok((
        rows,
        Pagination {
            page: page.page,
            limit: page.limit,
            total,
        },
    ))
}

struct StaffFields {
    name: String,
    role: String,
    department: Option<String>,
    phone: Option<String>,
    status: String,
}

fn staff_fields(body: &serde_json::Value) -> Result<StaffFields, ApiError> {
    let name = required_str(body, "name")?;
    let role = required_str(body, "role")?;
    let department = optional_str(body, "department")?;
    let phone = optional_str(body, "phone")?;
    let status = if body.get("status").map(|v| v.is_null()).unwrap_or(true) {
        "active".to_string()
    } else {
        one_of(body, "status", &["active", "inactive"])?
    };
    Ok(StaffFields {
        name,
        role,
        department,
        phone,
        status,
    })
}

fn staff_exists(conn: &Connection, ctx: &SessionCtx, id: &str) -> Result<bool, ApiError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM staff WHERE id = ? AND school_id = ?",
            (id, &ctx.school_id),
            |r| r.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn create_staff(
    conn: &Connection,
    ctx: &SessionCtx,
    body: &serde_json::Value,
) -> Result<serde_json::Value, ApiError> {
    let f = staff_fields(body)?;
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO staff(id, school_id, name, role, department, phone, status)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
        (
            &id,
            &ctx.school_id,
            &f.name,
            &f.role,
            &f.department,
            &f.phone,
            &f.status,
        ),
    )?;
    Ok(json!({ "id": id }))
}

fn update_staff(
    conn: &Connection,
    ctx: &SessionCtx,
    id: &str,
    body: &serde_json::Value,
) -> Result<serde_json::Value, ApiError> {
    if !staff_exists(conn, ctx, id)? {
        return Err(ApiError::not_found("staff member not found"));
    }
    let f = staff_fields(body)?;
    conn.execute(
        "UPDATE staff SET name = ?, role = ?, department = ?, phone = ?, status = ?
         WHERE id = ? AND school_id = ?",
        (
            &f.name,
            &f.role,
            &f.department,
            &f.phone,
            &f.status,
            id,
            &ctx.school_id,
        ),
    )?;
    Ok(json!({ "id": id }))
}

fn delete_staff(
    conn: &Connection,
    ctx: &SessionCtx,
    id: &str,
) -> Result<serde_json::Value, ApiError> {
    if !staff_exists(conn, ctx, id)? {
        return Err(ApiError::not_found("staff member not found"));
    }
    let tx = conn.unchecked_transaction()?;
    // Timetable rows keep their slot but lose the teacher link.
    tx.execute(
        "UPDATE timetable_entries SET staff_id = NULL WHERE staff_id = ?",
        [id],
    )?;
    tx.execute(
        "DELETE FROM staff WHERE id = ? AND school_id = ?",
        (id, &ctx.school_id),
    )?;
    tx.commit()?;
    Ok(json!({ "deleted": true }))
}

pub fn try_handle(
    conn: &Connection,
    ctx: &SessionCtx,
    req: &ApiRequest,
) -> Option<serde_json::Value> {
    match (req.method.as_str(), req.path.as_str()) {
        ("GET", "/api/staff") => Some(respond_list(&req.id, list_staff(conn, ctx, &req.query))),
        ("POST", "/api/staff") => Some(respond(&req.id, create_staff(conn, ctx, &req.body))),
        ("PUT", p) => {
            let id = path_id(p, "/api/staff/")?;
            Some(respond(&req.id, update_staff(conn, ctx, id, &req.body)))
        }
        ("DELETE", p) => {
            let id = path_id(p, "/api/staff/")?;
            Some(respond(&req.id, delete_staff(conn, ctx, id)))
        }
        _ => None,
    }
}

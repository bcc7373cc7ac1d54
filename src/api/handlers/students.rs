use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

use crate::api::error::{respond, respond_list, ApiError, Pagination};
use crate::api::session::SessionCtx;
use crate::api::types::ApiRequest;
use crate::api::validate::{
    like_pattern, one_of, optional_str, parse_page, path_id, q_str, required_str,
};

fn list_students(
    conn: &Connection,
    ctx: &SessionCtx,
    query: &serde_json::Value,
) -> Result<(Vec<serde_json::Value>, Pagination), ApiError> {
    let mut clauses = vec!["s.school_id = ?".to_string()];
    let mut args: Vec<String> = vec![ctx.school_id.clone()];

    if let Some(v) = q_str(query, "classId") {
        clauses.push("s.class_id = ?".to_string());
        args.push(v);
    }
    if let Some(v) = q_str(query, "sectionId") {
        clauses.push("s.section_id = ?".to_string());
        args.push(v);
    }
    if let Some(v) = q_str(query, "status") {
        clauses.push("s.status = ?".to_string());
        args.push(v);
    }
    if let Some(v) = q_str(query, "search") {
        clauses.push(
            "(s.first_name LIKE ? OR s.last_name LIKE ? OR s.admission_no LIKE ?)".to_string(),
        );
        let pat = like_pattern(&v);
        args.push(pat.clone());
        args.push(pat.clone());
        args.push(pat);
    }

    let where_sql = clauses.join(" AND ");
    let params: Vec<&dyn rusqlite::ToSql> =
        args.iter().map(|s| s as &dyn rusqlite::ToSql).collect();

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM students s WHERE {}", where_sql),
        params.as_slice(),
        |r| r.get(0),
    )?;

    let page = parse_page(query);
    let mut stmt = conn.prepare(&format!(
        "SELECT s.id, s.first_name, s.last_name, s.admission_no, s.guardian_phone,
                s.status, s.class_id, c.name, s.section_id, sec.name
         FROM students s
         LEFT JOIN classes c ON c.id = s.class_id
         LEFT JOIN sections sec ON sec.id = s.section_id
         WHERE {}
         ORDER BY s.last_name, s.first_name
         LIMIT {} OFFSET {}",
        where_sql,
        page.limit,
        page.offset()
    ))?;
    let rows = stmt
        .query_map(params.as_slice(), |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "firstName": r.get::<_, String>(1)?,
                "lastName": r.get::<_, String>(2)?,
                "admissionNo": r.get::<_, Option<String>>(3)?,
                "guardianPhone": r.get::<_, Option<String>>(4)?,
                "status": r.get::<_, String>(5)?,
                "classId": r.get::<_, Option<String>>(6)?,
                "className": r.get::<_, Option<String>>(7)?,
                "sectionId": r.get::<_, Option<String>>(8)?,
                "sectionName": r.get::<_, Option<String>>(9)?,
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

struct StudentFields {
    first_name: String,
    last_name: String,
    admission_no: Option<String>,
    guardian_phone: Option<String>,
    status: String,
    class_id: Option<String>,
    section_id: Option<String>,
}

fn student_fields(
    conn: &Connection,
    ctx: &SessionCtx,
    body: &serde_json::Value,
) -> Result<StudentFields, ApiError> {
    let first_name = required_str(body, "firstName")?;
    let last_name = required_str(body, "lastName")?;
    let admission_no = optional_str(body, "admissionNo")?;
    let guardian_phone = optional_str(body, "guardianPhone")?;
    let status = if body.get("status").map(|v| v.is_null()).unwrap_or(true) {
        "active".to_string()
    } else {
        one_of(body, "status", &["active", "inactive"])?
    };

    let class_id = optional_str(body, "classId")?;
    if let Some(cid) = &class_id {
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM classes WHERE id = ? AND school_id = ?",
                (cid, &ctx.school_id),
                |r| r.get(0),
            )
            .optional()?;
        if found.is_none() {
            return Err(ApiError::invalid("class not found"));
        }
    }
    let section_id = optional_str(body, "sectionId")?;
    if let Some(sid) = &section_id {
        let Some(cid) = &class_id else {
            return Err(ApiError::invalid("sectionId requires classId"));
        };
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM sections WHERE id = ? AND class_id = ?",
                (sid, cid),
                |r| r.get(0),
            )
            .optional()?;
        if found.is_none() {
            return Err(ApiError::invalid("section not found in class"));
        }
    }

    Ok(StudentFields {
        first_name,
        last_name,
        admission_no,
        guardian_phone,
        status,
        class_id,
        section_id,
    })
}

fn create_student(
    conn: &Connection,
    ctx: &SessionCtx,
    body: &serde_json::Value,
) -> Result<serde_json::Value, ApiError> {
    let f = student_fields(conn, ctx, body)?;
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO students(id, school_id, class_id, section_id, first_name, last_name,
                              admission_no, guardian_phone, status, created_at, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &id,
            &ctx.school_id,
            &f.class_id,
            &f.section_id,
            &f.first_name,
            &f.last_name,
            &f.admission_no,
            &f.guardian_phone,
            &f.status,
            &now,
            &now,
        ),
    )?;
    Ok(json!({ "id": id }))
}

fn update_student(
    conn: &Connection,
    ctx: &SessionCtx,
    student_id: &str,
    body: &serde_json::Value,
) -> Result<serde_json::Value, ApiError> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM students WHERE id = ? AND school_id = ?",
            (student_id, &ctx.school_id),
            |r| r.get(0),
        )
        .optional()?;
    if exists.is_none() {
        return Err(ApiError::not_found("student not found"));
    }

    let f = student_fields(conn, ctx, body)?;
    conn.execute(
        "UPDATE students SET class_id = ?, section_id = ?, first_name = ?, last_name = ?,
                admission_no = ?, guardian_phone = ?, status = ?, updated_at = ?
         WHERE id = ? AND school_id = ?",
        (
            &f.class_id,
            &f.section_id,
            &f.first_name,
            &f.last_name,
            &f.admission_no,
            &f.guardian_phone,
            &f.status,
            &Utc::now().to_rfc3339(),
            student_id,
            &ctx.school_id,
        ),
    )?;
    Ok(json!({ "id": student_id }))
}

fn delete_student(
    conn: &Connection,
    ctx: &SessionCtx,
    student_id: &str,
) -> Result<serde_json::Value, ApiError> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM students WHERE id = ? AND school_id = ?",
            (student_id, &ctx.school_id),
            |r| r.get(0),
        )
        .optional()?;
    if exists.is_none() {
        return Err(ApiError::not_found("student not found"));
    }

    // Remove dependents in dependency order; no ON DELETE CASCADE.
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "DELETE FROM attendance_records WHERE student_id = ?",
        [student_id],
    )?;
    tx.execute("DELETE FROM fee_records WHERE student_id = ?", [student_id])?;
    tx.execute(
        "DELETE FROM students WHERE id = ? AND school_id = ?",
        (student_id, &ctx.school_id),
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
        ("GET", "/api/students") => Some(respond_list(
            &req.id,
            list_students(conn, ctx, &req.query),
        )),
        ("POST", "/api/students") => {
            Some(respond(&req.id, create_student(conn, ctx, &req.body)))
        }
        ("PUT", p) => {
            let id = path_id(p, "/api/students/")?;
            Some(respond(&req.id, update_student(conn, ctx, id, &req.body)))
        }
        ("DELETE", p) => {
            let id = path_id(p, "/api/students/")?;
            Some(respond(&req.id, delete_student(conn, ctx, id)))
        }
        _ => None,
    }
}

use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

use crate::api::error::{respond, respond_list, ApiError, Pagination};
use crate::api::session::SessionCtx;
use crate::api::types::ApiRequest;
use crate::api::validate::{one_of, parse_page, path_id, q_date, q_str, required_date};

const STATUSES: [&str; 3] = ["present", "absent", "late"];

fn list_attendance(
    conn: &Connection,
    ctx: &SessionCtx,
    query: &serde_json::Value,
) -> Result<(Vec<serde_json::Value>, Pagination), ApiError> {
    let mut clauses = vec!["a.school_id = ?".to_string()];
    let mut args: Vec<String> = vec![ctx.school_id.clone()];

    if let Some(v) = q_str(query, "studentId") {
        clauses.push("a.student_id = ?".to_string());
        args.push(v);
    } else if let Some(v) = q_str(query, "classId") {
        clauses.push("s.class_id = ?".to_string());
        args.push(v);
        if let Some(sec) = q_str(query, "sectionId") {
            clauses.push("s.section_id = ?".to_string());
            args.push(sec);
        }
    } else {
        return Err(ApiError::invalid("classId or studentId is required"));
    }
    if let Some(v) = q_date(query, "date")? {
        clauses.push("a.date = ?".to_string());
        args.push(v);
    }
    if let Some(v) = q_date(query, "from")? {
        clauses.push("a.date >= ?".to_string());
        args.push(v);
    }
    if let Some(v) = q_date(query, "to")? {
        clauses.push("a.date <= ?".to_string());
        args.push(v);
    }
    if let Some(v) = q_str(query, "status") {
        clauses.push("a.status = ?".to_string());
        args.push(v);
    }

    let where_sql = clauses.join(" AND ");
    let params: Vec<&dyn rusqlite::ToSql> =
        args.iter().map(|s| s as &dyn rusqlite::ToSql).collect();

    let total: i64 = conn.query_row(
        &format!(
            "SELECT COUNT(*)
             FROM attendance_records a
             JOIN students s ON s.id = a.student_id
             WHERE {}",
            where_sql
        ),
        params.as_slice(),
        |r| r.get(0),
    )?;

    let page = parse_page(query);
    let mut stmt = conn.prepare(&format!(
        "SELECT a.id, a.student_id, s.first_name, s.last_name, a.date, a.status
         FROM attendance_records a
         JOIN students s ON s.id = a.student_id
         WHERE {}
         ORDER BY a.date DESC, s.last_name, s.first_name
         LIMIT {} OFFSET {}",
        where_sql,
        page.limit,
        page.offset()
    ))?;
    let rows = stmt
        .query_map(params.as_slice(), |r| {
            let first: String = r.get(2)?;
            let last: String = r.get(3)?;
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "studentId": r.get::<_, String>(1)?,
                "studentName": format!("{}, {}", last, first),
                "date": r.get::<_, String>(4)?,
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

/// Bulk mark for one date: `{ date, entries: [{ studentId, status }] }`.
/// Upserts every entry in a single transaction; entries for students outside
/// the caller's school are skipped.
fn bulk_mark(
    conn: &Connection,
    ctx: &SessionCtx,
    body: &serde_json::Value,
) -> Result<serde_json::Value, ApiError> {
    let date = required_date(body, "date")?;
    let Some(entries) = body.get("entries").and_then(|v| v.as_array()) else {
        return Err(ApiError::invalid("entries is required"));
    };

    let tx = conn.unchecked_transaction()?;
    let mut marked: i64 = 0;
    for entry in entries {
        let student_id = crate::api::validate::required_str(entry, "studentId")?;
        let status = one_of(entry, "status", &STATUSES)?;

        let known: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM students WHERE id = ? AND school_id = ?",
                (&student_id, &ctx.school_id),
                |r| r.get(0),
            )
            .optional()?;
        if known.is_none() {
            continue;
        }

        tx.execute(
            "INSERT INTO attendance_records(id, school_id, student_id, date, status)
             VALUES(?, ?, ?, ?, ?)
             ON CONFLICT(student_id, date) DO UPDATE SET
               status = excluded.status",
            (
                Uuid::new_v4().to_string(),
                &ctx.school_id,
                &student_id,
                &date,
                &status,
            ),
        )?;
        marked += 1;
    }
    tx.commit()?;
    Ok(json!({ "date": date, "marked": marked }))
}

fn update_record(
    conn: &Connection,
    ctx: &SessionCtx,
    record_id: &str,
    body: &serde_json::Value,
) -> Result<serde_json::Value, ApiError> {
    let status = one_of(body, "status", &STATUSES)?;
    let affected = conn.execute(
        "UPDATE attendance_records SET status = ? WHERE id = ? AND school_id = ?",
        (&status, record_id, &ctx.school_id),
    )?;
    if affected == 0 {
        return Err(ApiError::not_found("attendance record not found"));
    }
    Ok(json!({ "id": record_id, "status": status }))
}

pub fn try_handle(
    conn: &Connection,
    ctx: &SessionCtx,
    req: &ApiRequest,
) -> Option<serde_json::Value> {
    match (req.method.as_str(), req.path.as_str()) {
        ("GET", "/api/attendance") => Some(respond_list(
            &req.id,
            list_attendance(conn, ctx, &req.query),
        )),
        ("POST", "/api/attendance") => Some(respond(&req.id, bulk_mark(conn, ctx, &req.body))),
        ("PUT", p) => {
            let id = path_id(p, "/api/attendance/")?;
            Some(respond(&req.id, update_record(conn, ctx, id, &req.body)))
        }
        _ => None,
    }
}

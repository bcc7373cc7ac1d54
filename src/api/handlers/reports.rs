use rusqlite::Connection;
use serde_json::json;

use crate::api::error::{respond, ApiError};
use crate::api::session::SessionCtx;
use crate::api::types::ApiRequest;
use crate::api::validate::{parse_month, q_str};

fn overview(conn: &Connection, ctx: &SessionCtx) -> Result<serde_json::Value, ApiError> {
    let school = &ctx.school_id;
    let count = |sql: &str| -> Result<i64, ApiError> {
        Ok(conn.query_row(sql, [school], |r| r.get(0))?)
    };

    let students_total = count("SELECT COUNT(*) FROM students WHERE school_id = ?")?;
    let students_active =
        count("SELECT COUNT(*) FROM students WHERE school_id = ? AND status = 'active'")?;
    let staff_total = count("SELECT COUNT(*) FROM staff WHERE school_id = ?")?;
    let books_total = count("SELECT COUNT(*) FROM books WHERE school_id = ?")?;
    let vehicles_total = count("SELECT COUNT(*) FROM vehicles WHERE school_id = ?")?;
    let enquiries_open =
        count("SELECT COUNT(*) FROM enquiries WHERE school_id = ? AND status = 'open'")?;

    let (billed, collected): (f64, f64) = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0),
                COALESCE(SUM(CASE WHEN status = 'paid' THEN amount ELSE 0 END), 0)
         FROM fee_records WHERE school_id = ?",
        [school],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;

    Ok(json!({
        "students": { "total": students_total, "active": students_active },
        "staff": { "total": staff_total },
        "library": { "books": books_total },
        "transport": { "vehicles": vehicles_total },
        "frontOffice": { "openEnquiries": enquiries_open },
        "fees": {
            "billed": billed,
            "collected": collected,
            "outstanding": billed - collected,
        },
    }))
}

/// Per-student present/absent/late counts for one class and month.
fn attendance_summary(
    conn: &Connection,
    ctx: &SessionCtx,
    query: &serde_json::Value,
) -> Result<serde_json::Value, ApiError> {
    let class_id =
        q_str(query, "classId").ok_or_else(|| ApiError::invalid("classId is required"))?;
    let month = q_str(query, "month").ok_or_else(|| ApiError::invalid("month is required"))?;
    if parse_month(&month).is_none() {
        return Err(ApiError::invalid("month must be YYYY-MM"));
    }
    let month_prefix = format!("{}-%", month);

    let mut stmt = conn.prepare(
        "SELECT s.id, s.first_name, s.last_name,
                COALESCE(SUM(CASE WHEN a.status = 'present' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN a.status = 'absent' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN a.status = 'late' THEN 1 ELSE 0 END), 0)
         FROM students s
         LEFT JOIN attendance_records a
           ON a.student_id = s.id AND a.date LIKE ?
         WHERE s.school_id = ? AND s.class_id = ?
         GROUP BY s.id
         ORDER BY s.last_name, s.first_name",
    )?;
    let rows = stmt
        .query_map((&month_prefix, &ctx.school_id, &class_id), |r| {
            let first: String = r.get(1)?;
            let last: String = r.get(2)?;
            Ok(json!({
                "studentId": r.get::<_, String>(0)?,
                "studentName": format!("{}, {}", last, first),
                "present": r.get::<_, i64>(3)?,
                "absent": r.get::<_, i64>(4)?,
                "late": r.get::<_, i64>(5)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(json!({ "month": month, "classId": class_id, "rows": rows }))
}

pub fn try_handle(
    conn: &Connection,
    ctx: &SessionCtx,
    req: &ApiRequest,
) -> Option<serde_json::Value> {
    match (req.method.as_str(), req.path.as_str()) {
        ("GET", "/api/reports/overview") => Some(respond(&req.id, overview(conn, ctx))),
        ("GET", "/api/reports/attendance") => Some(respond(
            &req.id,
            attendance_summary(conn, ctx, &req.query),
        )),
        _ => None,
    }
}

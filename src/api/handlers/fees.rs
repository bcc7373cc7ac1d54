use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

use crate::api::error::{respond, respond_list, ApiError, Pagination};
use crate::api::session::SessionCtx;
use crate::api::types::ApiRequest;
use crate::api::validate::{
    non_negative_number, one_of, parse_page, path_id, q_date, q_str, required_date, required_str,
};

fn list_fees(
    conn: &Connection,
    ctx: &SessionCtx,
    query: &serde_json::Value,
) -> Result<(Vec<serde_json::Value>, Pagination), ApiError> {
    let mut clauses = vec!["f.school_id = ?".to_string()];
    let mut args: Vec<String> = vec![ctx.school_id.clone()];

    if let Some(v) = q_str(query, "studentId") {
        clauses.push("f.student_id = ?".to_string());
        args.push(v);
    }
    if let Some(v) = q_str(query, "status") {
        clauses.push("f.status = ?".to_string());
        args.push(v);
    }
    if let Some(v) = q_date(query, "from")? {
        clauses.push("f.due_date >= ?".to_string());
        args.push(v);
    }
    if let Some(v) = q_date(query, "to")? {
        clauses.push("f.due_date <= ?".to_string());
        args.push(v);
    }

    let where_sql = clauses.join(" AND ");
    let params: Vec<&dyn rusqlite::ToSql> =
        args.iter().map(|s| s as &dyn rusqlite::ToSql).collect();

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM fee_records f WHERE {}", where_sql),
        params.as_slice(),
        |r| r.get(0),
    )?;

    let page = parse_page(query);
    let mut stmt = conn.prepare(&format!(
        "SELECT f.id, f.student_id, s.first_name, s.last_name, f.title, f.amount,
                f.due_date, f.status, f.paid_at
         FROM fee_records f
         JOIN students s ON s.id = f.student_id
         WHERE {}
         ORDER BY f.due_date, s.last_name
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
                "title": r.get::<_, String>(4)?,
                "amount": r.get::<_, f64>(5)?,
                "dueDate": r.get::<_, String>(6)?,
                "status": r.get::<_, String>(7)?,
                "paidAt": r.get::<_, Option<String>>(8)?,
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

struct FeeFields {
    student_id: String,
    title: String,
    amount: f64,
    due_date: String,
    status: String,
}

fn fee_fields(
    conn: &Connection,
    ctx: &SessionCtx,
    body: &serde_json::Value,
) -> Result<FeeFields, ApiError> {
    let student_id = required_str(body, "studentId")?;
    let title = required_str(body, "title")?;
    let amount = non_negative_number(body, "amount")?;
    let due_date = required_date(body, "dueDate")?;
    let status = if body.get("status").map(|v| v.is_null()).unwrap_or(true) {
        "unpaid".to_string()
    } else {
        one_of(body, "status", &["unpaid", "paid"])?
    };

    let known: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM students WHERE id = ? AND school_id = ?",
            (&student_id, &ctx.school_id),
            |r| r.get(0),
        )
        .optional()?;
    if known.is_none() {
        return Err(ApiError::invalid("student not found"));
    }

    Ok(FeeFields {
        student_id,
        title,
        amount,
        due_date,
        status,
    })
}

fn create_fee(
    conn: &Connection,
    ctx: &SessionCtx,
    body: &serde_json::Value,
) -> Result<serde_json::Value, ApiError> {
    let f = fee_fields(conn, ctx, body)?;
    let id = Uuid::new_v4().to_string();
    let paid_at = if f.status == "paid" {
        Some(Utc::now().to_rfc3339())
    } else {
        None
    };
    conn.execute(
        "INSERT INTO fee_records(id, school_id, student_id, title, amount, due_date, status, paid_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &id,
            &ctx.school_id,
            &f.student_id,
            &f.title,
            f.amount,
            &f.due_date,
            &f.status,
            &paid_at,
        ),
    )?;
    Ok(json!({ "id": id }))
}

fn update_fee(
    conn: &Connection,
    ctx: &SessionCtx,
    fee_id: &str,
    body: &serde_json::Value,
) -> Result<serde_json::Value, ApiError> {
    let prior_status: Option<String> = conn
        .query_row(
            "SELECT status FROM fee_records WHERE id = ? AND school_id = ?",
            (fee_id, &ctx.school_id),
            |r| r.get(0),
        )
        .optional()?;
    let Some(prior_status) = prior_status else {
        return Err(ApiError::not_found("fee record not found"));
    };

    let f = fee_fields(conn, ctx, body)?;
    // Moving to paid stamps paidAt once; moving back clears it.
    let paid_at: Option<String> = match (prior_status.as_str(), f.status.as_str()) {
        ("unpaid", "paid") => Some(Utc::now().to_rfc3339()),
        (_, "unpaid") => None,
        ("paid", "paid") => conn
            .query_row(
                "SELECT paid_at FROM fee_records WHERE id = ?",
                [fee_id],
                |r| r.get(0),
            )
            .optional()?
            .flatten(),
        _ => None,
    };

    conn.execute(
        "UPDATE fee_records
         SET student_id = ?, title = ?, amount = ?, due_date = ?, status = ?, paid_at = ?
         WHERE id = ? AND school_id = ?",
        (
            &f.student_id,
            &f.title,
            f.amount,
            &f.due_date,
            &f.status,
            &paid_at,
            fee_id,
            &ctx.school_id,
        ),
    )?;
    Ok(json!({ "id": fee_id, "status": f.status }))
}

fn delete_fee(
    conn: &Connection,
    ctx: &SessionCtx,
    fee_id: &str,
) -> Result<serde_json::Value, ApiError> {
    let affected = conn.execute(
        "DELETE FROM fee_records WHERE id = ? AND school_id = ?",
        (fee_id, &ctx.school_id),
    )?;
    if affected == 0 {
        return Err(ApiError::not_found("fee record not found"));
    }
    Ok(json!({ "deleted": true }))
}

pub fn try_handle(
    conn: &Connection,
    ctx: &SessionCtx,
    req: &ApiRequest,
) -> Option<serde_json::Value> {
    match (req.method.as_str(), req.path.as_str()) {
        ("GET", "/api/fees") => Some(respond_list(&req.id, list_fees(conn, ctx, &req.query))),
        ("POST", "/api/fees") => Some(respond(&req.id, create_fee(conn, ctx, &req.body))),
        ("PUT", p) => {
            let id = path_id(p, "/api/fees/")?;
            Some(respond(&req.id, update_fee(conn, ctx, id, &req.body)))
        }
        ("DELETE", p) => {
            let id = path_id(p, "/api/fees/")?;
            Some(respond(&req.id, delete_fee(conn, ctx, id)))
        }
        _ => None,
    }
}

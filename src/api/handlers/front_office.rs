use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

use crate::api::error::{respond, respond_list, ApiError, Pagination};
use crate::api::session::SessionCtx;
use crate::api::types::ApiRequest;
use crate::api::validate::{
    like_pattern, one_of, optional_str, parse_page, path_id, q_date, q_str, required_date,
    required_str,
};

fn list_enquiries(
    conn: &Connection,
    ctx: &SessionCtx,
    query: &serde_json::Value,
) -> Result<(Vec<serde_json::Value>, Pagination), ApiError> {
    let mut clauses = vec!["school_id = ?".to_string()];
    let mut args: Vec<String> = vec![ctx.school_id.clone()];

    if let Some(v) = q_str(query, "status") {
        clauses.push("status = ?".to_string());
        args.push(v);
    }
    if let Some(v) = q_date(query, "from")? {
        clauses.push("date >= ?".to_string());
        args.push(v);
    }
    if let Some(v) = q_date(query, "to")? {
        clauses.push("date <= ?".to_string());
        args.push(v);
    }
    if let Some(v) = q_str(query, "search") {
        clauses.push("(name LIKE ? OR phone LIKE ? OR purpose LIKE ?)".to_string());
        let pat = like_pattern(&v);
        args.push(pat.clone());
        args.push(pat.clone());
        args.push(pat);
    }

    let where_sql = clauses.join(" AND ");
    let params: Vec<&dyn rusqlite::ToSql> =
        args.iter().map(|s| s as &dyn rusqlite::ToSql).collect();

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM enquiries WHERE {}", where_sql),
        params.as_slice(),
        |r| r.get(0),
    )?;

    let page = parse_page(query);
    let mut stmt = conn.prepare(&format!(
        "SELECT id, name, phone, purpose, note, status, date
         FROM enquiries
         WHERE {}
         ORDER BY date DESC
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
                "phone": r.get::<_, Option<String>>(2)?,
                "purpose": r.get::<_, String>(3)?,
                "note": r.get::<_, Option<String>>(4)?,
                "status": r.get::<_, String>(5)?,
                "date": r.get::<_, String>(6)?,
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

struct EnquiryFields {
    name: String,
    phone: Option<String>,
    purpose: String,
    note: Option<String>,
    status: String,
    date: String,
}

fn enquiry_fields(body: &serde_json::Value) -> Result<EnquiryFields, ApiError> {
    let name = required_str(body, "name")?;
    let phone = optional_str(body, "phone")?;
    let purpose = required_str(body, "purpose")?;
    let note = optional_str(body, "note")?;
    let status = if body.get("status").map(|v| v.is_null()).unwrap_or(true) {
        "open".to_string()
    } else {
        one_of(body, "status", &["open", "followed_up", "closed"])?
    };
    let date = required_date(body, "date")?;
    Ok(EnquiryFields {
        name,
        phone,
        purpose,
        note,
        status,
        date,
    })
}

fn create_enquiry(
    conn: &Connection,
    ctx: &SessionCtx,
    body: &serde_json::Value,
) -> Result<serde_json::Value, ApiError> {
    let f = enquiry_fields(body)?;
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO enquiries(id, school_id, name, phone, purpose, note, status, date)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &id,
            &ctx.school_id,
            &f.name,
            &f.phone,
            &f.purpose,
            &f.note,
            &f.status,
            &f.date,
        ),
    )?;
    Ok(json!({ "id": id }))
}

fn update_enquiry(
    conn: &Connection,
    ctx: &SessionCtx,
    enquiry_id: &str,
    body: &serde_json::Value,
) -> Result<serde_json::Value, ApiError> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM enquiries WHERE id = ? AND school_id = ?",
            (enquiry_id, &ctx.school_id),
            |r| r.get(0),
        )
        .optional()?;
    if exists.is_none() {
        return Err(ApiError::not_found("enquiry not found"));
    }
    let f = enquiry_fields(body)?;
    conn.execute(
        "UPDATE enquiries SET name = ?, phone = ?, purpose = ?, note = ?, status = ?, date = ?
         WHERE id = ? AND school_id = ?",
        (
            &f.name,
            &f.phone,
            &f.purpose,
            &f.note,
            &f.status,
            &f.date,
            enquiry_id,
            &ctx.school_id,
        ),
    )?;
    Ok(json!({ "id": enquiry_id }))
}

fn delete_enquiry(
    conn: &Connection,
    ctx: &SessionCtx,
    enquiry_id: &str,
) -> Result<serde_json::Value, ApiError> {
    let affected = conn.execute(
        "DELETE FROM enquiries WHERE id = ? AND school_id = ?",
        (enquiry_id, &ctx.school_id),
    )?;
    if affected == 0 {
        return Err(ApiError::not_found("enquiry not found"));
    }
    Ok(json!({ "deleted": true }))
}

pub fn try_handle(
    conn: &Connection,
    ctx: &SessionCtx,
    req: &ApiRequest,
) -> Option<serde_json::Value> {
    match (req.method.as_str(), req.path.as_str()) {
        ("GET", "/api/front-office/enquiries") => Some(respond_list(
            &req.id,
            list_enquiries(conn, ctx, &req.query),
        )),
        ("POST", "/api/front-office/enquiries") => {
            Some(respond(&req.id, create_enquiry(conn, ctx, &req.body)))
        }
        ("PUT", p) => {
            let id = path_id(p, "/api/front-office/enquiries/")?;
            Some(respond(&req.id, update_enquiry(conn, ctx, id, &req.body)))
        }
        ("DELETE", p) => {
            let id = path_id(p, "/api/front-office/enquiries/")?;
            Some(respond(&req.id, delete_enquiry(conn, ctx, id)))
        }
        _ => None,
    }
}

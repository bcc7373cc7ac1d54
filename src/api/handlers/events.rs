use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

use crate::api::error::{respond, respond_list, ApiError, Pagination};
use crate::api::session::SessionCtx;
use crate::api::types::ApiRequest;
use crate::api::validate::{
    like_pattern, one_of, optional_date, optional_str, parse_page, path_id, q_str, required_str,
};

fn list_notices(
    conn: &Connection,
    ctx: &SessionCtx,
    query: &serde_json::Value,
) -> Result<(Vec<serde_json::Value>, Pagination), ApiError> {
    let mut clauses = vec!["school_id = ?".to_string()];
    let mut args: Vec<String> = vec![ctx.school_id.clone()];

    if let Some(v) = q_str(query, "audience") {
        clauses.push("audience = ?".to_string());
        args.push(v);
    }
    if let Some(v) = q_str(query, "search") {
        clauses.push("(title LIKE ? OR body LIKE ?)".to_string());
        let pat = like_pattern(&v);
        args.push(pat.clone());
        args.push(pat);
    }

    let where_sql = clauses.join(" AND ");
    let params: Vec<&dyn rusqlite::ToSql> =
        args.iter().map(|s| s as &dyn rusqlite::ToSql).collect();

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM notices WHERE {}", where_sql),
        params.as_slice(),
        |r| r.get(0),
    )?;

    let page = parse_page(query);
    let mut stmt = conn.prepare(&format!(
        "SELECT id, title, body, publish_date, audience
         FROM notices
         WHERE {}
         ORDER BY publish_date DESC, title
         LIMIT {} OFFSET {}",
        where_sql,
        page.limit,
        page.offset()
    ))?;
    let rows = stmt
        .query_map(params.as_slice(), |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "title": r.get::<_, String>(1)?,
                "body": r.get::<_, Option<String>>(2)?,
                "publishDate": r.get::<_, Option<String>>(3)?,
                "audience": r.get::<_, String>(4)?,
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

struct NoticeFields {
    title: String,
    body_text: Option<String>,
    publish_date: Option<String>,
    audience: String,
}

fn notice_fields(body: &serde_json::Value) -> Result<NoticeFields, ApiError> {
    let title = required_str(body, "title")?;
    let body_text = optional_str(body, "body")?;
    let publish_date = optional_date(body, "publishDate")?;
    let audience = if body.get("audience").map(|v| v.is_null()).unwrap_or(true) {
        "all".to_string()
    } else {
        one_of(body, "audience", &["all", "students", "staff", "parents"])?
    };
    Ok(NoticeFields {
        title,
        body_text,
        publish_date,
        audience,
    })
}

fn title_taken(
    conn: &Connection,
    ctx: &SessionCtx,
    title: &str,
    exclude_id: Option<&str>,
) -> Result<bool, ApiError> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM notices WHERE school_id = ? AND title = ?",
            (&ctx.school_id, title),
            |r| r.get(0),
        )
        .optional()?;
    Ok(match existing {
        Some(id) => Some(id.as_str()) != exclude_id,
        None => false,
    })
}

fn create_notice(
    conn: &Connection,
    ctx: &SessionCtx,
    body: &serde_json::Value,
) -> Result<serde_json::Value, ApiError> {
    let f = notice_fields(body)?;
    if title_taken(conn, ctx, &f.title, None)? {
        return Err(ApiError::invalid("a notice with this title already exists"));
    }
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO notices(id, school_id, title, body, publish_date, audience)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            &id,
            &ctx.school_id,
            &f.title,
            &f.body_text,
            &f.publish_date,
            &f.audience,
        ),
    )?;
    Ok(json!({ "id": id }))
}

fn update_notice(
    conn: &Connection,
    ctx: &SessionCtx,
    notice_id: &str,
    body: &serde_json::Value,
) -> Result<serde_json::Value, ApiError> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM notices WHERE id = ? AND school_id = ?",
            (notice_id, &ctx.school_id),
            |r| r.get(0),
        )
        .optional()?;
    if exists.is_none() {
        return Err(ApiError::not_found("notice not found"));
    }
    let f = notice_fields(body)?;
    if title_taken(conn, ctx, &f.title, Some(notice_id))? {
        return Err(ApiError::invalid("a notice with this title already exists"));
    }
    conn.execute(
        "UPDATE notices SET title = ?, body = ?, publish_date = ?, audience = ?
         WHERE id = ? AND school_id = ?",
        (
            &f.title,
            &f.body_text,
            &f.publish_date,
            &f.audience,
            notice_id,
            &ctx.school_id,
        ),
    )?;
    Ok(json!({ "id": notice_id }))
}

fn delete_notice(
    conn: &Connection,
    ctx: &SessionCtx,
    notice_id: &str,
) -> Result<serde_json::Value, ApiError> {
    let affected = conn.execute(
        "DELETE FROM notices WHERE id = ? AND school_id = ?",
        (notice_id, &ctx.school_id),
    )?;
    if affected == 0 {
        return Err(ApiError::not_found("notice not found"));
    }
    Ok(json!({ "deleted": true }))
}

pub fn try_handle(
    conn: &Connection,
    ctx: &SessionCtx,
    req: &ApiRequest,
) -> Option<serde_json::Value> {
    match (req.method.as_str(), req.path.as_str()) {
        ("GET", "/api/events/notices") => {
            Some(respond_list(&req.id, list_notices(conn, ctx, &req.query)))
        }
        ("POST", "/api/events/notices") => {
            Some(respond(&req.id, create_notice(conn, ctx, &req.body)))
        }
        ("PUT", p) => {
            let id = path_id(p, "/api/events/notices/")?;
            Some(respond(&req.id, update_notice(conn, ctx, id, &req.body)))
        }
        ("DELETE", p) => {
            let id = path_id(p, "/api/events/notices/")?;
            Some(respond(&req.id, delete_notice(conn, ctx, id)))
        }
        _ => None,
    }
}

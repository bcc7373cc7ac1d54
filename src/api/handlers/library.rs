use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

use crate::api::error::{respond, respond_list, ApiError, Pagination};
use crate::api::session::SessionCtx;
use crate::api::types::ApiRequest;
use crate::api::validate::{
    like_pattern, optional_int, optional_str, parse_page, path_id, q_str, required_str,
};

fn list_books(
    conn: &Connection,
    ctx: &SessionCtx,
    query: &serde_json::Value,
) -> Result<(Vec<serde_json::Value>, Pagination), ApiError> {
    let mut clauses = vec!["school_id = ?".to_string()];
    let mut args: Vec<String> = vec![ctx.school_id.clone()];

    if let Some(v) = q_str(query, "category") {
        clauses.push("category = ?".to_string());
        args.push(v);
    }
    if let Some(v) = q_str(query, "search") {
        clauses.push("(title LIKE ? OR author LIKE ?)".to_string());
        let pat = like_pattern(&v);
        args.push(pat.clone());
        args.push(pat);
    }

    let where_sql = clauses.join(" AND ");
    let params: Vec<&dyn rusqlite::ToSql> =
        args.iter().map(|s| s as &dyn rusqlite::ToSql).collect();

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM books WHERE {}", where_sql),
        params.as_slice(),
        |r| r.get(0),
    )?;

    let page = parse_page(query);
    let mut stmt = conn.prepare(&format!(
        "SELECT id, title, author, category, copies, available
         FROM books
         WHERE {}
         ORDER BY title
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
                "author": r.get::<_, Option<String>>(2)?,
                "category": r.get::<_, Option<String>>(3)?,
                "copies": r.get::<_, i64>(4)?,
                "available": r.get::<_, i64>(5)?,
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

struct BookFields {
    title: String,
    author: Option<String>,
    category: Option<String>,
    copies: i64,
    available: i64,
}

fn book_fields(body: &serde_json::Value) -> Result<BookFields, ApiError> {
    let title = required_str(body, "title")?;
    let author = optional_str(body, "author")?;
    let category = optional_str(body, "category")?;
    let copies = optional_int(body, "copies")?.unwrap_or(1);
    if copies < 0 {
        return Err(ApiError::invalid("copies must be a non-negative number"));
    }
    let available = optional_int(body, "available")?.unwrap_or(copies);
    if available < 0 {
        return Err(ApiError::invalid("available must be a non-negative number"));
    }
    if available > copies {
        return Err(ApiError::invalid("available cannot exceed copies"));
    }
    Ok(BookFields {
        title,
        author,
        category,
        copies,
        available,
    })
}

fn create_book(
    conn: &Connection,
    ctx: &SessionCtx,
    body: &serde_json::Value,
) -> Result<serde_json::Value, ApiError> {
    let f = book_fields(body)?;
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO books(id, school_id, title, author, category, copies, available)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
        (
            &id,
            &ctx.school_id,
            &f.title,
            &f.author,
            &f.category,
            f.copies,
            f.available,
        ),
    )?;
    Ok(json!({ "id": id }))
}

fn update_book(
    conn: &Connection,
    ctx: &SessionCtx,
    book_id: &str,
    body: &serde_json::Value,
) -> Result<serde_json::Value, ApiError> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM books WHERE id = ? AND school_id = ?",
            (book_id, &ctx.school_id),
            |r| r.get(0),
        )
        .optional()?;
    if exists.is_none() {
        return Err(ApiError::not_found("book not found"));
    }
    let f = book_fields(body)?;
    conn.execute(
        "UPDATE books SET title = ?, author = ?, category = ?, copies = ?, available = ?
         WHERE id = ? AND school_id = ?",
        (
            &f.title,
            &f.author,
            &f.category,
            f.copies,
            f.available,
            book_id,
            &ctx.school_id,
        ),
    )?;
    Ok(json!({ "id": book_id }))
}

fn delete_book(
    conn: &Connection,
    ctx: &SessionCtx,
    book_id: &str,
) -> Result<serde_json::Value, ApiError> {
    let affected = conn.execute(
        "DELETE FROM books WHERE id = ? AND school_id = ?",
        (book_id, &ctx.school_id),
    )?;
    if affected == 0 {
        return Err(ApiError::not_found("book not found"));
    }
    Ok(json!({ "deleted": true }))
}

pub fn try_handle(
    conn: &Connection,
    ctx: &SessionCtx,
    req: &ApiRequest,
) -> Option<serde_json::Value> {
    match (req.method.as_str(), req.path.as_str()) {
        ("GET", "/api/library/books") => {
            Some(respond_list(&req.id, list_books(conn, ctx, &req.query)))
        }
        ("POST", "/api/library/books") => {
            Some(respond(&req.id, create_book(conn, ctx, &req.body)))
        }
        ("PUT", p) => {
            let id = path_id(p, "/api/library/books/")?;
            Some(respond(&req.id, update_book(conn, ctx, id, &req.body)))
        }
        ("DELETE", p) => {
            let id = path_id(p, "/api/library/books/")?;
            Some(respond(&req.id, delete_book(conn, ctx, id)))
        }
        _ => None,
    }
}

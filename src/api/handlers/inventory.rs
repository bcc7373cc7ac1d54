use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

use crate::api::error::{respond, respond_list, ApiError, Pagination};
use crate::api::session::SessionCtx;
use crate::api::types::ApiRequest;
use crate::api::validate::{
    like_pattern, non_negative_number, one_of, optional_int, optional_str, parse_page, path_id,
    q_str, required_str,
};

fn list_items(
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
    if let Some(v) = q_str(query, "status") {
        clauses.push("status = ?".to_string());
        args.push(v);
    }
    if let Some(v) = q_str(query, "search") {
        clauses.push("name LIKE ?".to_string());
        args.push(like_pattern(&v));
    }

    let where_sql = clauses.join(" AND ");
    let params: Vec<&dyn rusqlite::ToSql> =
        args.iter().map(|s| s as &dyn rusqlite::ToSql).collect();

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM inventory_items WHERE {}", where_sql),
        params.as_slice(),
        |r| r.get(0),
    )?;

    let page = parse_page(query);
    let mut stmt = conn.prepare(&format!(
        "SELECT id, name, category, quantity, unit_price, status
         FROM inventory_items
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
                "category": r.get::<_, Option<String>>(2)?,
                "quantity": r.get::<_, i64>(3)?,
                "unitPrice": r.get::<_, Option<f64>>(4)?,
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

struct ItemFields {
    name: String,
    category: Option<String>,
    quantity: i64,
    unit_price: Option<f64>,
    status: String,
}

fn item_fields(body: &serde_json::Value) -> Result<ItemFields, ApiError> {
    let name = required_str(body, "name")?;
    let category = optional_str(body, "category")?;
    let quantity = optional_int(body, "quantity")?.unwrap_or(0);
    if quantity < 0 {
        return Err(ApiError::invalid("quantity must be a non-negative number"));
    }
    let unit_price = if body.get("unitPrice").map(|v| v.is_null()).unwrap_or(true) {
        None
    } else {
        Some(non_negative_number(body, "unitPrice")?)
    };
    let status = if body.get("status").map(|v| v.is_null()).unwrap_or(true) {
        "in_stock".to_string()
    } else {
        one_of(body, "status", &["in_stock", "low", "out_of_stock"])?
    };
    Ok(ItemFields {
        name,
        category,
        quantity,
        unit_price,
        status,
    })
}

fn create_item(
    conn: &Connection,
    ctx: &SessionCtx,
    body: &serde_json::Value,
) -> Result<serde_json::Value, ApiError> {
    let f = item_fields(body)?;
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO inventory_items(id, school_id, name, category, quantity, unit_price, status)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
        (
            &id,
            &ctx.school_id,
            &f.name,
            &f.category,
            f.quantity,
            f.unit_price,
            &f.status,
        ),
    )?;
    Ok(json!({ "id": id }))
}

fn update_item(
    conn: &Connection,
    ctx: &SessionCtx,
    item_id: &str,
    body: &serde_json::Value,
) -> Result<serde_json::Value, ApiError> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM inventory_items WHERE id = ? AND school_id = ?",
            (item_id, &ctx.school_id),
            |r| r.get(0),
        )
        .optional()?;
    if exists.is_none() {
        return Err(ApiError::not_found("inventory item not found"));
    }
    let f = item_fields(body)?;
    conn.execute(
        "UPDATE inventory_items
         SET name = ?, category = ?, quantity = ?, unit_price = ?, status = ?
         WHERE id = ? AND school_id = ?",
        (
            &f.name,
            &f.category,
            f.quantity,
            f.unit_price,
            &f.status,
            item_id,
            &ctx.school_id,
        ),
    )?;
    Ok(json!({ "id": item_id }))
}

fn delete_item(
    conn: &Connection,
    ctx: &SessionCtx,
    item_id: &str,
) -> Result<serde_json::Value, ApiError> {
    let affected = conn.execute(
        "DELETE FROM inventory_items WHERE id = ? AND school_id = ?",
        (item_id, &ctx.school_id),
    )?;
    if affected == 0 {
        return Err(ApiError::not_found("inventory item not found"));
    }
    Ok(json!({ "deleted": true }))
}

pub fn try_handle(
    conn: &Connection,
    ctx: &SessionCtx,
    req: &ApiRequest,
) -> Option<serde_json::Value> {
    match (req.method.as_str(), req.path.as_str()) {
        ("GET", "/api/inventory/items") => {
            Some(respond_list(&req.id, list_items(conn, ctx, &req.query)))
        }
        ("POST", "/api/inventory/items") => {
            Some(respond(&req.id, create_item(conn, ctx, &req.body)))
        }
        ("PUT", p) => {
            let id = path_id(p, "/api/inventory/items/")?;
            Some(respond(&req.id, update_item(conn, ctx, id, &req.body)))
        }
        ("DELETE", p) => {
            let id = path_id(p, "/api/inventory/items/")?;
            Some(respond(&req.id, delete_item(conn, ctx, id)))
        }
        _ => None,
    }
}

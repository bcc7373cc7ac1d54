use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

use crate::api::error::{respond, respond_list, ApiError, Pagination};
use crate::api::session::SessionCtx;
use crate::api::types::ApiRequest;
use crate::api::validate::{
    like_pattern, one_of, optional_int, optional_str, parse_page, path_id, q_str, required_str,
};

fn list_vehicles(
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
    if let Some(v) = q_str(query, "search") {
        clauses.push("(reg_no LIKE ? OR driver_name LIKE ? OR route_name LIKE ?)".to_string());
        let pat = like_pattern(&v);
        args.push(pat.clone());
        args.push(pat.clone());
        args.push(pat);
    }

    let where_sql = clauses.join(" AND ");
    let params: Vec<&dyn rusqlite::ToSql> =
        args.iter().map(|s| s as &dyn rusqlite::ToSql).collect();

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM vehicles WHERE {}", where_sql),
        params.as_slice(),
        |r| r.get(0),
    )?;

    let page = parse_page(query);
    let mut stmt = conn.prepare(&format!(
        "SELECT id, reg_no, driver_name, route_name, capacity, status
         FROM vehicles
         WHERE {}
         ORDER BY reg_no
         LIMIT {} OFFSET {}",
        where_sql,
        page.limit,
        page.offset()
    ))?;
    let rows = stmt
        .query_map(params.as_slice(), |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "regNo": r.get::<_, String>(1)?,
                "driverName": r.get::<_, Option<String>>(2)?,
                "routeName": r.get::<_, Option<String>>(3)?,
                "capacity": r.get::<_, Option<i64>>(4)?,
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

struct VehicleFields {
    reg_no: String,
    driver_name: Option<String>,
    route_name: Option<String>,
    capacity: Option<i64>,
    status: String,
}

fn vehicle_fields(body: &serde_json::Value) -> Result<VehicleFields, ApiError> {
    let reg_no = required_str(body, "regNo")?;
    let driver_name = optional_str(body, "driverName")?;
    let route_name = optional_str(body, "routeName")?;
    let capacity = optional_int(body, "capacity")?;
    if matches!(capacity, Some(c) if c < 0) {
        return Err(ApiError::invalid("capacity must be a non-negative number"));
    }
    let status = if body.get("status").map(|v| v.is_null()).unwrap_or(true) {
        "active".to_string()
    } else {
        one_of(body, "status", &["active", "maintenance", "retired"])?
    };
    Ok(VehicleFields {
        reg_no,
        driver_name,
        route_name,
        capacity,
        status,
    })
}

fn reg_no_taken(
    conn: &Connection,
    ctx: &SessionCtx,
    reg_no: &str,
    exclude_id: Option<&str>,
) -> Result<bool, ApiError> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM vehicles WHERE school_id = ? AND reg_no = ?",
            (&ctx.school_id, reg_no),
            |r| r.get(0),
        )
        .optional()?;
    Ok(match existing {
        Some(id) => Some(id.as_str()) != exclude_id,
        None => false,
    })
}

fn create_vehicle(
    conn: &Connection,
    ctx: &SessionCtx,
    body: &serde_json::Value,
) -> Result<serde_json::Value, ApiError> {
    let f = vehicle_fields(body)?;
    if reg_no_taken(conn, ctx, &f.reg_no, None)? {
        return Err(ApiError::invalid(
            "a vehicle with this registration number already exists",
        ));
    }
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO vehicles(id, school_id, reg_no, driver_name, route_name, capacity, status)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
        (
            &id,
            &ctx.school_id,
            &f.reg_no,
            &f.driver_name,
            &f.route_name,
            f.capacity,
            &f.status,
        ),
    )?;
    Ok(json!({ "id": id }))
}

fn update_vehicle(
    conn: &Connection,
    ctx: &SessionCtx,
    vehicle_id: &str,
    body: &serde_json::Value,
) -> Result<serde_json::Value, ApiError> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM vehicles WHERE id = ? AND school_id = ?",
            (vehicle_id, &ctx.school_id),
            |r| r.get(0),
        )
        .optional()?;
    if exists.is_none() {
        return Err(ApiError::not_found("vehicle not found"));
    }
    let f = vehicle_fields(body)?;
    if reg_no_taken(conn, ctx, &f.reg_no, Some(vehicle_id))? {
        return Err(ApiError::invalid(
            "a vehicle with this registration number already exists",
        ));
    }
    conn.execute(
        "UPDATE vehicles SET reg_no = ?, driver_name = ?, route_name = ?, capacity = ?, status = ?
         WHERE id = ? AND school_id = ?",
        (
            &f.reg_no,
            &f.driver_name,
            &f.route_name,
            f.capacity,
            &f.status,
            vehicle_id,
            &ctx.school_id,
        ),
    )?;
    Ok(json!({ "id": vehicle_id }))
}

fn delete_vehicle(
    conn: &Connection,
    ctx: &SessionCtx,
    vehicle_id: &str,
) -> Result<serde_json::Value, ApiError> {
    let affected = conn.execute(
        "DELETE FROM vehicles WHERE id = ? AND school_id = ?",
        (vehicle_id, &ctx.school_id),
    )?;
    if affected == 0 {
        return Err(ApiError::not_found("vehicle not found"));
    }
    Ok(json!({ "deleted": true }))
}

pub fn try_handle(
    conn: &Connection,
    ctx: &SessionCtx,
    req: &ApiRequest,
) -> Option<serde_json::Value> {
    match (req.method.as_str(), req.path.as_str()) {
        ("GET", "/api/transport/vehicles") => {
            Some(respond_list(&req.id, list_vehicles(conn, ctx, &req.query)))
        }
        ("POST", "/api/transport/vehicles") => {
            Some(respond(&req.id, create_vehicle(conn, ctx, &req.body)))
        }
        ("PUT", p) => {
            let id = path_id(p, "/api/transport/vehicles/")?;
            Some(respond(&req.id, update_vehicle(conn, ctx, id, &req.body)))
        }
        ("DELETE", p) => {
            let id = path_id(p, "/api/transport/vehicles/")?;
            Some(respond(&req.id, delete_vehicle(conn, ctx, id)))
        }
        _ => None,
    }
}

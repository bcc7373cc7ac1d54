use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

use crate::api::error::{respond, respond_list, ApiError, Pagination};
use crate::api::session::SessionCtx;
use crate::api::types::ApiRequest;
use crate::api::validate::{
    int_in_range, optional_str, parse_page, path_id, q_str, required_int, required_str,
};

// --- classes ---

fn list_classes(
    conn: &Connection,
    ctx: &SessionCtx,
    query: &serde_json::Value,
) -> Result<(Vec<serde_json::Value>, Pagination), ApiError> {
    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM classes WHERE school_id = ?",
        [&ctx.school_id],
        |r| r.get(0),
    )?;

    let page = parse_page(query);
    // Correlated subqueries keep the counts join-free.
    let mut stmt = conn.prepare(&format!(
        "SELECT
           c.id,
           c.name,
           (SELECT COUNT(*) FROM sections s WHERE s.class_id = c.id) AS section_count,
           (SELECT COUNT(*) FROM students st WHERE st.class_id = c.id) AS student_count
         FROM classes c
         WHERE c.school_id = ?
         ORDER BY c.sort_order, c.name
         LIMIT {} OFFSET {}",
        page.limit,
        page.offset()
    ))?;
    let rows = stmt
        .query_map([&ctx.school_id], |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "name": r.get::<_, String>(1)?,
                "sectionCount": r.get::<_, i64>(2)?,
                "studentCount": r.get::<_, i64>(3)?,
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

fn create_class(
    conn: &Connection,
    ctx: &SessionCtx,
    body: &serde_json::Value,
) -> Result<serde_json::Value, ApiError> {
    let name = required_str(body, "name")?;
    let dup: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM classes WHERE school_id = ? AND name = ?",
            (&ctx.school_id, &name),
            |r| r.get(0),
        )
        .optional()?;
    if dup.is_some() {
        return Err(ApiError::invalid("a class with this name already exists"));
    }
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO classes(id, school_id, name) VALUES(?, ?, ?)",
        (&id, &ctx.school_id, &name),
    )?;
    Ok(json!({ "id": id, "name": name }))
}

fn delete_class(
    conn: &Connection,
    ctx: &SessionCtx,
    class_id: &str,
) -> Result<serde_json::Value, ApiError> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM classes WHERE id = ? AND school_id = ?",
            (class_id, &ctx.school_id),
            |r| r.get(0),
        )
        .optional()?;
    if exists.is_none() {
        return Err(ApiError::not_found("class not found"));
    }

    let enrolled: i64 = conn.query_row(
        "SELECT COUNT(*) FROM students WHERE class_id = ?",
        [class_id],
        |r| r.get(0),
    )?;
    if enrolled > 0 {
        return Err(ApiError::invalid(
            "class still has students; move them out first",
        ));
    }

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "DELETE FROM timetable_entries WHERE class_id = ?",
        [class_id],
    )?;
    tx.execute("DELETE FROM sections WHERE class_id = ?", [class_id])?;
    tx.execute(
        "DELETE FROM classes WHERE id = ? AND school_id = ?",
        (class_id, &ctx.school_id),
    )?;
    tx.commit()?;
    Ok(json!({ "deleted": true }))
}

// --- sections ---

fn list_sections(
    conn: &Connection,
    ctx: &SessionCtx,
    query: &serde_json::Value,
) -> Result<(Vec<serde_json::Value>, Pagination), ApiError> {
    // Sections are the child filter's option source; they only make sense
    // scoped to one class.
    let class_id =
        q_str(query, "classId").ok_or_else(|| ApiError::invalid("classId is required"))?;

    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sections WHERE class_id = ? AND school_id = ?",
        (&class_id, &ctx.school_id),
        |r| r.get(0),
    )?;

    let page = parse_page(query);
    let mut stmt = conn.prepare(&format!(
        "SELECT id, name,
                (SELECT COUNT(*) FROM students st WHERE st.section_id = sections.id)
         FROM sections
         WHERE class_id = ? AND school_id = ?
         ORDER BY name
         LIMIT {} OFFSET {}",
        page.limit,
        page.offset()
    ))?;
    let rows = stmt
        .query_map((&class_id, &ctx.school_id), |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "name": r.get::<_, String>(1)?,
                "studentCount": r.get::<_, i64>(2)?,
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

fn create_section(
    conn: &Connection,
    ctx: &SessionCtx,
    body: &serde_json::Value,
) -> Result<serde_json::Value, ApiError> {
    let class_id = required_str(body, "classId")?;
    let name = required_str(body, "name")?;

    let class_ok: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM classes WHERE id = ? AND school_id = ?",
            (&class_id, &ctx.school_id),
            |r| r.get(0),
        )
        .optional()?;
    if class_ok.is_none() {
        return Err(ApiError::invalid("class not found"));
    }

    let dup: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM sections WHERE class_id = ? AND name = ?",
            (&class_id, &name),
            |r| r.get(0),
        )
        .optional()?;
    if dup.is_some() {
        return Err(ApiError::invalid(
            "a section with this name already exists in the class",
        ));
    }

    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO sections(id, school_id, class_id, name) VALUES(?, ?, ?, ?)",
        (&id, &ctx.school_id, &class_id, &name),
    )?;
    Ok(json!({ "id": id, "name": name }))
}

fn delete_section(
    conn: &Connection,
    ctx: &SessionCtx,
    section_id: &str,
) -> Result<serde_json::Value, ApiError> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM sections WHERE id = ? AND school_id = ?",
            (section_id, &ctx.school_id),
            |r| r.get(0),
        )
        .optional()?;
    if exists.is_none() {
        return Err(ApiError::not_found("section not found"));
    }

    let enrolled: i64 = conn.query_row(
        "SELECT COUNT(*) FROM students WHERE section_id = ?",
        [section_id],
        |r| r.get(0),
    )?;
    if enrolled > 0 {
        return Err(ApiError::invalid(
            "section still has students; move them out first",
        ));
    }

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "DELETE FROM timetable_entries WHERE section_id = ?",
        [section_id],
    )?;
    tx.execute(
        "DELETE FROM sections WHERE id = ? AND school_id = ?",
        (section_id, &ctx.school_id),
    )?;
    tx.commit()?;
    Ok(json!({ "deleted": true }))
}

// --- timetable ---

fn list_timetable(
    conn: &Connection,
    ctx: &SessionCtx,
    query: &serde_json::Value,
) -> Result<(Vec<serde_json::Value>, Pagination), ApiError> {
    let class_id =
        q_str(query, "classId").ok_or_else(|| ApiError::invalid("classId is required"))?;

    let mut clauses = vec![
        "t.school_id = ?".to_string(),
        "t.class_id = ?".to_string(),
    ];
    let mut args: Vec<String> = vec![ctx.school_id.clone(), class_id];
    if let Some(v) = q_str(query, "sectionId") {
        clauses.push("t.section_id = ?".to_string());
        args.push(v);
    }

    let where_sql = clauses.join(" AND ");
    let params: Vec<&dyn rusqlite::ToSql> =
        args.iter().map(|s| s as &dyn rusqlite::ToSql).collect();

    let total: i64 = conn.query_row(
        &format!(
            "SELECT COUNT(*) FROM timetable_entries t WHERE {}",
            where_sql
        ),
        params.as_slice(),
        |r| r.get(0),
    )?;

    let page = parse_page(query);
    let mut stmt = conn.prepare(&format!(
        "SELECT t.id, t.day_of_week, t.period, t.subject, t.staff_id, st.name,
                t.starts_at, t.ends_at, t.section_id, sec.name
         FROM timetable_entries t
         LEFT JOIN staff st ON st.id = t.staff_id
         LEFT JOIN sections sec ON sec.id = t.section_id
         WHERE {}
         ORDER BY t.day_of_week, t.period
         LIMIT {} OFFSET {}",
        where_sql,
        page.limit,
        page.offset()
    ))?;
    let rows = stmt
        .query_map(params.as_slice(), |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "dayOfWeek": r.get::<_, i64>(1)?,
                "period": r.get::<_, i64>(2)?,
                "subject": r.get::<_, String>(3)?,
                "staffId": r.get::<_, Option<String>>(4)?,
                "staffName": r.get::<_, Option<String>>(5)?,
                "startsAt": r.get::<_, Option<String>>(6)?,
                "endsAt": r.get::<_, Option<String>>(7)?,
                "sectionId": r.get::<_, String>(8)?,
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

struct TimetableFields {
    class_id: String,
    section_id: String,
    day_of_week: i64,
    period: i64,
    subject: String,
    staff_id: Option<String>,
    starts_at: Option<String>,
    ends_at: Option<String>,
}

fn timetable_fields(
    conn: &Connection,
    ctx: &SessionCtx,
    body: &serde_json::Value,
) -> Result<TimetableFields, ApiError> {
    let class_id = required_str(body, "classId")?;
    let section_id = required_str(body, "sectionId")?;
    let day_of_week = int_in_range("dayOfWeek", required_int(body, "dayOfWeek")?, 1, 7)?;
    let period = int_in_range("period", required_int(body, "period")?, 1, 12)?;
    let subject = required_str(body, "subject")?;
    let staff_id = optional_str(body, "staffId")?;
    let starts_at = optional_str(body, "startsAt")?;
    let ends_at = optional_str(body, "endsAt")?;

    let section_ok: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM sections WHERE id = ? AND class_id = ? AND school_id = ?",
            (&section_id, &class_id, &ctx.school_id),
            |r| r.get(0),
        )
        .optional()?;
    if section_ok.is_none() {
        return Err(ApiError::invalid("section not found in class"));
    }
    if let Some(sid) = &staff_id {
        let staff_ok: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM staff WHERE id = ? AND school_id = ?",
                (sid, &ctx.school_id),
                |r| r.get(0),
            )
            .optional()?;
        if staff_ok.is_none() {
            return Err(ApiError::invalid("staff member not found"));
        }
    }

    Ok(TimetableFields {
        class_id,
        section_id,
        day_of_week,
        period,
        subject,
        staff_id,
        starts_at,
        ends_at,
    })
}

fn slot_taken(
    conn: &Connection,
    f: &TimetableFields,
    exclude_id: Option<&str>,
) -> Result<bool, ApiError> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM timetable_entries
             WHERE section_id = ? AND day_of_week = ? AND period = ?",
            (&f.section_id, f.day_of_week, f.period),
            |r| r.get(0),
        )
        .optional()?;
    Ok(match existing {
        Some(id) => Some(id.as_str()) != exclude_id,
        None => false,
    })
}

fn create_timetable_entry(
    conn: &Connection,
    ctx: &SessionCtx,
    body: &serde_json::Value,
) -> Result<serde_json::Value, ApiError> {
    let f = timetable_fields(conn, ctx, body)?;
    if slot_taken(conn, &f, None)? {
        return Err(ApiError::invalid(
            "this period is already scheduled for the section",
        ));
    }
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO timetable_entries(id, school_id, class_id, section_id, day_of_week,
                                       period, subject, staff_id, starts_at, ends_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &id,
            &ctx.school_id,
            &f.class_id,
            &f.section_id,
            f.day_of_week,
            f.period,
            &f.subject,
            &f.staff_id,
            &f.starts_at,
            &f.ends_at,
        ),
    )?;
    Ok(json!({ "id": id }))
}

fn update_timetable_entry(
    conn: &Connection,
    ctx: &SessionCtx,
    entry_id: &str,
    body: &serde_json::Value,
) -> Result<serde_json::Value, ApiError> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM timetable_entries WHERE id = ? AND school_id = ?",
            (entry_id, &ctx.school_id),
            |r| r.get(0),
        )
        .optional()?;
    if exists.is_none() {
        return Err(ApiError::not_found("timetable entry not found"));
    }
    let f = timetable_fields(conn, ctx, body)?;
    if slot_taken(conn, &f, Some(entry_id))? {
        return Err(ApiError::invalid(
            "this period is already scheduled for the section",
        ));
    }
    conn.execute(
        "UPDATE timetable_entries
         SET class_id = ?, section_id = ?, day_of_week = ?, period = ?,
             subject = ?, staff_id = ?, starts_at = ?, ends_at = ?
         WHERE id = ? AND school_id = ?",
        (
            &f.class_id,
            &f.section_id,
            f.day_of_week,
            f.period,
            &f.subject,
            &f.staff_id,
            &f.starts_at,
            &f.ends_at,
            entry_id,
            &ctx.school_id,
        ),
    )?;
    Ok(json!({ "id": entry_id }))
}

fn delete_timetable_entry(
    conn: &Connection,
    ctx: &SessionCtx,
    entry_id: &str,
) -> Result<serde_json::Value, ApiError> {
    let affected = conn.execute(
        "DELETE FROM timetable_entries WHERE id = ? AND school_id = ?",
        (entry_id, &ctx.school_id),
    )?;
    if affected == 0 {
        return Err(ApiError::not_found("timetable entry not found"));
    }
    Ok(json!({ "deleted": true }))
}

pub fn try_handle(
    conn: &Connection,
    ctx: &SessionCtx,
    req: &ApiRequest,
) -> Option<serde_json::Value> {
    match (req.method.as_str(), req.path.as_str()) {
        ("GET", "/api/academics/classes") => Some(respond_list(
            &req.id,
            list_classes(conn, ctx, &req.query),
        )),
        ("POST", "/api/academics/classes") => {
            Some(respond(&req.id, create_class(conn, ctx, &req.body)))
        }
        ("GET", "/api/academics/sections") => Some(respond_list(
            &req.id,
            list_sections(conn, ctx, &req.query),
        )),
        ("POST", "/api/academics/sections") => {
            Some(respond(&req.id, create_section(conn, ctx, &req.body)))
        }
        ("GET", "/api/academics/timetable") => Some(respond_list(
            &req.id,
            list_timetable(conn, ctx, &req.query),
        )),
        ("POST", "/api/academics/timetable") => Some(respond(
            &req.id,
            create_timetable_entry(conn, ctx, &req.body),
        )),
        ("PUT", p) => {
            let id = path_id(p, "/api/academics/timetable/")?;
            Some(respond(
                &req.id,
                update_timetable_entry(conn, ctx, id, &req.body),
            ))
        }
        ("DELETE", p) => {
            if let Some(id) = path_id(p, "/api/academics/classes/") {
                return Some(respond(&req.id, delete_class(conn, ctx, id)));
            }
            if let Some(id) = path_id(p, "/api/academics/sections/") {
                return Some(respond(&req.id, delete_section(conn, ctx, id)));
            }
            let id = path_id(p, "/api/academics/timetable/")?;
            Some(respond(&req.id, delete_timetable_entry(conn, ctx, id)))
        }
        _ => None,
    }
}

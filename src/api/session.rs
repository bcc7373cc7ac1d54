use rusqlite::{Connection, OptionalExtension};

use super::error::ApiError;

/// Request-scoped caller identity. Resolved once by the router and passed
/// explicitly into every handler; nothing reads session state ambiently.
#[derive(Debug, Clone)]
pub struct SessionCtx {
    pub school_id: String,
    pub user_name: String,
    pub role: String,
}

pub fn resolve(conn: &Connection, token: Option<&str>) -> Result<SessionCtx, ApiError> {
    let Some(token) = token else {
        return Err(ApiError::unauthorized());
    };
    let row = conn
        .query_row(
            "SELECT school_id, user_name, role FROM sessions WHERE token = ?",
            [token],
            |r| {
                Ok(SessionCtx {
                    school_id: r.get(0)?,
                    user_name: r.get(1)?,
                    role: r.get(2)?,
                })
            },
        )
        .optional()
        .map_err(ApiError::internal)?;
    row.ok_or_else(ApiError::unauthorized)
}

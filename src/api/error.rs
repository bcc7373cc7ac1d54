use serde_json::json;

/// Page metadata returned by every list endpoint.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}

impl Pagination {
    pub fn total_pages(&self) -> i64 {
        if self.limit <= 0 {
            return 0;
        }
        (self.total + self.limit - 1) / self.limit
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

impl ApiError {
    pub fn unauthorized() -> Self {
        ApiError {
            status: 401,
            message: "unauthorized".to_string(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ApiError {
            status: 400,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError {
            status: 404,
            message: message.into(),
        }
    }

    /// Unexpected failure. The cause is logged server-side; the caller only
    /// ever sees a generic message.
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        log::error!("internal error: {}", cause);
        ApiError {
            status: 500,
            message: "internal server error".to_string(),
        }
    }

    pub fn response(&self, id: &str) -> serde_json::Value {
        fail(id, self.status, self.message.clone())
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(e: rusqlite::Error) -> Self {
        ApiError::internal(e)
    }
}

pub fn ok(id: &str, data: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "status": 200,
        "success": true,
        "data": data,
    })
}

pub fn ok_list(id: &str, data: Vec<serde_json::Value>, page: &Pagination) -> serde_json::Value {
    json!({
        "id": id,
        "status": 200,
        "success": true,
        "data": data,
        "pagination": {
            "page": page.page,
            "limit": page.limit,
            "total": page.total,
            "totalPages": page.total_pages(),
        },
    })
}

pub fn fail(id: &str, status: u16, message: impl Into<String>) -> serde_json::Value {
    json!({
        "id": id,
        "status": status,
        "success": false,
        "error": message.into(),
    })
}

pub fn respond(id: &str, result: Result<serde_json::Value, ApiError>) -> serde_json::Value {
    match result {
        Ok(data) => ok(id, data),
        Err(e) => e.response(id),
    }
}

pub fn respond_list(
    id: &str,
    result: Result<(Vec<serde_json::Value>, Pagination), ApiError>,
) -> serde_json::Value {
    match result {
        Ok((data, page)) => ok_list(id, data, &page),
        Err(e) => e.response(id),
    }
}

use chrono::NaiveDate;

use super::error::ApiError;

/// Body/query checks shared by every handler. Each helper reports the first
/// violated rule with a message the client shows verbatim.

pub fn required_str(body: &serde_json::Value, key: &str) -> Result<String, ApiError> {
    match body.get(key) {
        Some(v) if v.is_string() => {
            let s = v.as_str().unwrap_or("").trim().to_string();
            if s.is_empty() {
                Err(ApiError::invalid(format!("{} is required", key)))
            } else {
                Ok(s)
            }
        }
        Some(v) if v.is_null() => Err(ApiError::invalid(format!("{} is required", key))),
        Some(_) => Err(ApiError::invalid(format!("{} must be a string", key))),
        None => Err(ApiError::invalid(format!("{} is required", key))),
    }
}

pub fn optional_str(body: &serde_json::Value, key: &str) -> Result<Option<String>, ApiError> {
    match body.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => {
            let Some(s) = v.as_str() else {
                return Err(ApiError::invalid(format!("{} must be a string", key)));
            };
            let t = s.trim();
            if t.is_empty() {
                Ok(None)
            } else {
                Ok(Some(t.to_string()))
            }
        }
    }
}

/// Accepts a JSON number or a numeric string; form clients send text.
pub fn required_number(body: &serde_json::Value, key: &str) -> Result<f64, ApiError> {
    let v = body
        .get(key)
        .filter(|v| !v.is_null())
        .ok_or_else(|| ApiError::invalid(format!("{} is required", key)))?;
    number_of(v).ok_or_else(|| ApiError::invalid(format!("{} must be a number", key)))
}

pub fn non_negative_number(body: &serde_json::Value, key: &str) -> Result<f64, ApiError> {
    let n = required_number(body, key)?;
    if n < 0.0 {
        return Err(ApiError::invalid(format!(
            "{} must be a non-negative number",
            key
        )));
    }
    Ok(n)
}

pub fn required_int(body: &serde_json::Value, key: &str) -> Result<i64, ApiError> {
    let n = required_number(body, key)?;
    if n.fract() != 0.0 {
        return Err(ApiError::invalid(format!("{} must be an integer", key)));
    }
    Ok(n as i64)
}

pub fn optional_int(body: &serde_json::Value, key: &str) -> Result<Option<i64>, ApiError> {
    match body.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => {
            let n = number_of(v)
                .ok_or_else(|| ApiError::invalid(format!("{} must be a number", key)))?;
            if n.fract() != 0.0 {
                return Err(ApiError::invalid(format!("{} must be an integer", key)));
            }
            Ok(Some(n as i64))
        }
    }
}

pub fn int_in_range(key: &str, value: i64, min: i64, max: i64) -> Result<i64, ApiError> {
    if value < min || value > max {
        return Err(ApiError::invalid(format!(
            "{} must be between {} and {}",
            key, min, max
        )));
    }
    Ok(value)
}

pub fn required_date(body: &serde_json::Value, key: &str) -> Result<String, ApiError> {
    let s = required_str(body, key)?;
    parse_date(&s).ok_or_else(|| ApiError::invalid(format!("{} must be YYYY-MM-DD", key)))?;
    Ok(s)
}

pub fn optional_date(body: &serde_json::Value, key: &str) -> Result<Option<String>, ApiError> {
    let Some(s) = optional_str(body, key)? else {
        return Ok(None);
    };
    parse_date(&s).ok_or_else(|| ApiError::invalid(format!("{} must be YYYY-MM-DD", key)))?;
    Ok(Some(s))
}

pub fn one_of(body: &serde_json::Value, key: &str, allowed: &[&str]) -> Result<String, ApiError> {
    let s = required_str(body, key)?;
    if allowed.contains(&s.as_str()) {
        Ok(s)
    } else {
        Err(ApiError::invalid(format!(
            "{} must be one of {}",
            key,
            allowed.join(", ")
        )))
    }
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// YYYY-MM, validated by pinning to the first of the month.
pub fn parse_month(s: &str) -> Option<(i32, u32)> {
    let d = NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d").ok()?;
    use chrono::Datelike;
    Some((d.year(), d.month()))
}

fn number_of(v: &serde_json::Value) -> Option<f64> {
    if let Some(n) = v.as_f64() {
        return Some(n);
    }
    v.as_str().and_then(|s| s.trim().parse::<f64>().ok())
}

// --- query parameters ---

/// Non-empty query value; "all" is the UI's no-filter sentinel.
pub fn q_str(query: &serde_json::Value, key: &str) -> Option<String> {
    let s = query.get(key)?.as_str()?.trim();
    if s.is_empty() || s == "all" {
        return None;
    }
    Some(s.to_string())
}

pub fn q_date(query: &serde_json::Value, key: &str) -> Result<Option<String>, ApiError> {
    let Some(s) = q_str(query, key) else {
        return Ok(None);
    };
    parse_date(&s).ok_or_else(|| ApiError::invalid(format!("{} must be YYYY-MM-DD", key)))?;
    Ok(Some(s))
}

#[derive(Debug, Clone, Copy)]
pub struct PageParams {
    pub page: i64,
    pub limit: i64,
}

impl PageParams {
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

// Query values arrive as strings from a real query string but as numbers
// from programmatic callers; accept both.
fn q_int(query: &serde_json::Value, key: &str) -> Option<i64> {
    match query.get(key) {
        Some(v) if v.is_i64() => v.as_i64(),
        Some(v) => v.as_str()?.trim().parse::<i64>().ok(),
        None => None,
    }
}

pub fn parse_page(query: &serde_json::Value) -> PageParams {
    let page = q_int(query, "page").unwrap_or(1).max(1);
    let limit = q_int(query, "limit").unwrap_or(50).clamp(1, 200);
    PageParams { page, limit }
}

pub fn like_pattern(search: &str) -> String {
    format!("%{}%", search.trim())
}

/// "/api/students/42" with prefix "/api/students/" -> "42".
pub fn path_id<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.contains('/') {
        return None;
    }
    Some(rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn required_str_reports_first_rule() {
        let body = json!({ "title": "" });
        let err = required_str(&body, "title").unwrap_err();
        assert_eq!(err.status, 400);
        assert_eq!(err.message, "title is required");

        let err = required_str(&json!({}), "title").unwrap_err();
        assert_eq!(err.message, "title is required");

        let err = required_str(&json!({ "title": 5 }), "title").unwrap_err();
        assert_eq!(err.message, "title must be a string");
    }

    #[test]
    fn numbers_accept_numeric_strings() {
        assert_eq!(
            required_number(&json!({ "amount": "251.50" }), "amount").unwrap(),
            251.5
        );
        assert_eq!(required_number(&json!({ "amount": 40 }), "amount").unwrap(), 40.0);
        let err = non_negative_number(&json!({ "amount": -1 }), "amount").unwrap_err();
        assert_eq!(err.message, "amount must be a non-negative number");
    }

    #[test]
    fn dates_validate_format() {
        assert!(required_date(&json!({ "date": "2025-02-28" }), "date").is_ok());
        let err = required_date(&json!({ "date": "28/02/2025" }), "date").unwrap_err();
        assert_eq!(err.message, "date must be YYYY-MM-DD");
        assert!(parse_month("2025-09").is_some());
        assert!(parse_month("2025-13").is_none());
    }

    #[test]
    fn query_helpers_skip_empty_and_all() {
        let q = json!({ "classId": "c1", "status": "all", "search": "  " });
        assert_eq!(q_str(&q, "classId").as_deref(), Some("c1"));
        assert_eq!(q_str(&q, "status"), None);
        assert_eq!(q_str(&q, "search"), None);
    }

    #[test]
    fn page_params_default_and_clamp() {
        let p = parse_page(&json!({}));
        assert_eq!((p.page, p.limit), (1, 50));
        let p = parse_page(&json!({ "page": "3", "limit": "1000" }));
        assert_eq!((p.page, p.limit, p.offset()), (3, 200, 400));
        let p = parse_page(&json!({ "page": 0, "limit": 25 }));
        assert_eq!((p.page, p.limit), (1, 25));
    }

    #[test]
    fn path_id_extracts_trailing_segment() {
        assert_eq!(path_id("/api/students/42", "/api/students/"), Some("42"));
        assert_eq!(path_id("/api/students/", "/api/students/"), None);
        assert_eq!(path_id("/api/students/4/x", "/api/students/"), None);
    }
}

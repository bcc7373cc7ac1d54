use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

/// One REST-style request as read off the wire: verb + path + query + body,
/// with the caller's session token alongside.
#[derive(Debug, Deserialize, Clone)]
pub struct ApiRequest {
    pub id: String,
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub query: serde_json::Value,
    #[serde(default)]
    pub body: serde_json::Value,
    #[serde(default)]
    pub token: Option<String>,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
}

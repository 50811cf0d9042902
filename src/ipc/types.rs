use std::path::PathBuf;

use crate::store::SqliteStore;
use rusqlite::Connection;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Sidecar state: the selected workspace and its open database, if any.
#[derive(Default)]
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
}

impl AppState {
    /// Store over the open workspace, or `None` before `workspace.select`.
    pub fn store(&self) -> Option<SqliteStore<'_>> {
        self.db.as_ref().map(SqliteStore::new)
    }
}

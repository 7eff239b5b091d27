use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::config::EngineConfig;
use crate::model::Dataset;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Everything the sidecar owns between requests. The dataset is only
/// replaced after the workspace has accepted the new version.
#[derive(Default)]
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub dataset: Dataset,
    pub config: EngineConfig,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}

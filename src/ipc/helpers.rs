use crate::db;
use crate::fields::Row;
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::model::Dataset;
use rusqlite::Connection;

pub fn require_db<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, serde_json::Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

/// `params.rows` as field-keyed objects.
pub fn parse_rows(req: &Request) -> Result<Vec<Row>, serde_json::Value> {
    let Some(raw) = req.params.get("rows").and_then(|v| v.as_array()) else {
        return Err(err(&req.id, "bad_params", "missing rows", None));
    };
    raw.iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_object().cloned().ok_or_else(|| {
                err(
                    &req.id,
                    "bad_params",
                    "rows must be objects",
                    Some(serde_json::json!({ "row": i })),
                )
            })
        })
        .collect()
}

pub fn param_str<'a>(req: &'a Request, key: &str) -> Option<&'a str> {
    req.params.get(key).and_then(|v| v.as_str())
}

/// Persists `next` and only then swaps it in. Audit failures are logged but
/// do not undo an accepted write.
pub fn commit(
    state: &mut AppState,
    req: &Request,
    next: Dataset,
    action: &str,
    details: &serde_json::Value,
) -> Result<(), serde_json::Value> {
    let conn = require_db(state, req)?;
    if let Err(e) = db::save_dataset(conn, &next) {
        return Err(err(&req.id, "db_update_failed", e.to_string(), None));
    }
    if let Err(e) = db::audit_append(conn, action, details) {
        tracing::warn!(action, error = %e, "audit append failed");
    }
    state.dataset = next;
    Ok(())
}

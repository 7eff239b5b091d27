use crate::config::ConfigSection;
use crate::db;
use crate::ipc::error::{engine_err, err, ok};
use crate::ipc::helpers::require_db;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_config_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "fieldAliases": state.config.section_value(ConfigSection::FieldAliases),
            "gradeScale": state.config.section_value(ConfigSection::GradeScale)
        }),
    )
}

fn handle_config_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    let Some(section) = ConfigSection::parse(section_raw) else {
        return err(&req.id, "bad_params", "unknown section", None);
    };
    let Some(value) = req.params.get("value") else {
        return err(&req.id, "bad_params", "missing value", None);
    };

    let mut next = state.config.clone();
    if let Err(e) = next.apply_section(section, value) {
        return engine_err(&req.id, &e);
    }
    let stored = next.section_value(section);
    if let Err(e) = db::settings_set_json(conn, section.key(), &stored) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    if let Err(e) = db::audit_append(conn, "config.update", &json!({ "section": section_raw })) {
        tracing::warn!(error = %e, "audit append failed");
    }
    state.config = next;
    let mut result = serde_json::Map::new();
    result.insert(section_raw.to_string(), stored);
    ok(&req.id, serde_json::Value::Object(result))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "config.get" => Some(handle_config_get(state, req)),
        "config.update" => Some(handle_config_update(state, req)),
        _ => None,
    }
}

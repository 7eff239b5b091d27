use crate::catalog::{self, CatalogUpdate};
use crate::fields::FieldValue;
use crate::ipc::error::{engine_err, err, ok};
use crate::ipc::helpers::{commit, param_str, require_db};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_catalog_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({ "courses": catalog::list_catalog(&state.dataset) }),
    )
}

fn handle_catalog_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_db(state, req) {
        return resp;
    }
    let Some(code) = param_str(req, "code") else {
        return err(&req.id, "bad_params", "missing code", None);
    };
    let credits = match req.params.get("credits") {
        None => FieldValue::Empty,
        Some(v) => match serde_json::from_value::<FieldValue>(v.clone()) {
            Ok(fv) => fv,
            Err(_) => return err(&req.id, "bad_params", "credits must be a number or string", None),
        },
    };
    let update = CatalogUpdate {
        title: param_str(req, "title").map(str::to_string),
        credits,
    };

    let mut next = state.dataset.clone();
    let summary = match catalog::update_catalog_entry(&mut next, code, &update, &state.config) {
        Ok(s) => s,
        Err(e) => return engine_err(&req.id, &e),
    };
    let details = json!({
        "code": summary.entry.code,
        "credits": summary.entry.credits,
        "students": summary.updated_student_count
    });
    if let Err(resp) = commit(state, req, next, "catalog.update", &details) {
        return resp;
    }
    ok(&req.id, json!(summary))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "catalog.list" => Some(handle_catalog_list(state, req)),
        "catalog.update" => Some(handle_catalog_update(state, req)),
        _ => None,
    }
}

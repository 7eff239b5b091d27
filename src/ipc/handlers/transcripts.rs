use crate::fields::FieldValue;
use crate::ipc::error::{engine_err, ok};
use crate::ipc::helpers::{commit, param_str, parse_rows, require_db};
use crate::ipc::types::{AppState, Request};
use crate::reconcile::{self, AppendCourse};
use serde_json::json;

fn handle_import_history(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_db(state, req) {
        return resp;
    }
    let rows = match parse_rows(req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let mut next = state.dataset.clone();
    let summary = match reconcile::import_history(&mut next, &rows, &state.config) {
        Ok(s) => s,
        Err(e) => return engine_err(&req.id, &e),
    };
    let details = json!({
        "imported": summary.imported,
        "processedRows": summary.processed_rows,
        "skipped": summary.skipped
    });
    if let Err(resp) = commit(state, req, next, "transcripts.importHistory", &details) {
        return resp;
    }
    ok(&req.id, json!(summary))
}

fn handle_append_results(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_db(state, req) {
        return resp;
    }
    let rows = match parse_rows(req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    // Credits may arrive as a number or as the raw text of a form field.
    let credits = req
        .params
        .get("credits")
        .and_then(|v| serde_json::from_value::<FieldValue>(v.clone()).ok())
        .and_then(|v| v.to_f64());
    let course = AppendCourse {
        course_code: param_str(req, "courseCode").unwrap_or_default().to_string(),
        course_title: param_str(req, "courseTitle").unwrap_or_default().to_string(),
        credits,
    };

    let mut next = state.dataset.clone();
    let summary = match reconcile::append_results(&mut next, &rows, &course, &state.config) {
        Ok(s) => s,
        Err(e) => return engine_err(&req.id, &e),
    };
    let details = json!({
        "course": summary.course.code,
        "session": next.session,
        "updated": summary.updated,
        "skipped": summary.skipped
    });
    if let Err(resp) = commit(state, req, next, "transcripts.appendResults", &details) {
        return resp;
    }
    ok(&req.id, json!(summary))
}

fn handle_import_profiles(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_db(state, req) {
        return resp;
    }
    let rows = match parse_rows(req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let intake = param_str(req, "intake");
    let mut next = state.dataset.clone();
    let summary = match reconcile::import_profiles(&mut next, &rows, intake, &state.config) {
        Ok(s) => s,
        Err(e) => return engine_err(&req.id, &e),
    };
    let details = json!({
        "created": summary.created,
        "updated": summary.updated,
        "skipped": summary.skipped
    });
    if let Err(resp) = commit(state, req, next, "students.importProfiles", &details) {
        return resp;
    }
    ok(&req.id, json!(summary))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "transcripts.importHistory" => Some(handle_import_history(state, req)),
        "transcripts.appendResults" => Some(handle_append_results(state, req)),
        "students.importProfiles" => Some(handle_import_profiles(state, req)),
        _ => None,
    }
}

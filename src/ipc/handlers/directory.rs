use crate::db;
use crate::directory::{self, StudentQuery};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::param_str;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

const DEFAULT_AUDIT_LIMIT: usize = 50;

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let query: StudentQuery = if req.params.is_null() {
        StudentQuery::default()
    } else {
        match serde_json::from_value(req.params.clone()) {
            Ok(q) => q,
            Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
        }
    };
    ok(&req.id, json!(directory::list_students(&state.dataset, &query)))
}

fn handle_students_profiles(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({ "profiles": directory::list_profiles(&state.dataset) }),
    )
}

fn handle_students_intakes(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({ "intakes": directory::list_intakes(&state.dataset) }),
    )
}

fn handle_students_transcript(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(id) = param_str(req, "studentId") else {
        return err(&req.id, "bad_params", "missing studentId", None);
    };
    match directory::transcript(&state.dataset, id) {
        Some(student) => ok(&req.id, json!({ "student": student })),
        None => err(&req.id, "not_found", "student not found", None),
    }
}

fn handle_students_lookup(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (Some(ic), Some(name)) = (param_str(req, "ic"), param_str(req, "name")) else {
        return err(&req.id, "bad_params", "ic and name are required", None);
    };
    match directory::find_by_ic_and_name(&state.dataset, ic, name) {
        Some(student) => ok(&req.id, json!({ "student": student })),
        None => err(&req.id, "not_found", "no record matches that IC and name", None),
    }
}

fn handle_reports_rows(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({ "rows": directory::report_rows(&state.dataset) }),
    )
}

fn handle_stats_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!(directory::stats(&state.dataset)))
}

fn handle_audit_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "entries": [] }));
    };
    let limit = req
        .params
        .get("limit")
        .and_then(|v| v.as_u64())
        .map(|n| n as usize)
        .unwrap_or(DEFAULT_AUDIT_LIMIT);
    match db::audit_list(conn, limit) {
        Ok(entries) => ok(&req.id, json!({ "entries": entries })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.profiles" => Some(handle_students_profiles(state, req)),
        "students.intakes" => Some(handle_students_intakes(state, req)),
        "students.transcript" => Some(handle_students_transcript(state, req)),
        "students.lookup" => Some(handle_students_lookup(state, req)),
        "reports.rows" => Some(handle_reports_rows(state, req)),
        "stats.get" => Some(handle_stats_get(state, req)),
        "audit.list" => Some(handle_audit_list(state, req)),
        _ => None,
    }
}

use crate::directory;
use crate::ipc::error::{engine_err, err, ok};
use crate::ipc::helpers::{commit, param_str, require_db};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_session_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "session": state.dataset.session }))
}

fn handle_session_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_db(state, req) {
        return resp;
    }
    let Some(label) = param_str(req, "session") else {
        return err(&req.id, "bad_params", "missing session", None);
    };
    let mut next = state.dataset.clone();
    let session = match directory::set_session(&mut next, label) {
        Ok(s) => s,
        Err(e) => return engine_err(&req.id, &e),
    };
    if let Err(resp) = commit(state, req, next, "session.set", &json!({ "session": session })) {
        return resp;
    }
    ok(&req.id, json!({ "session": session }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.get" => Some(handle_session_get(state, req)),
        "session.set" => Some(handle_session_set(state, req)),
        _ => None,
    }
}

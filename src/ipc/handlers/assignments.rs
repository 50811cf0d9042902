use crate::ipc::error::{assignment_not_found, err, ok, store_err};
use crate::ipc::helpers::{grading_submission, optional_str, required_str, required_str_list, store};
use crate::ipc::types::{AppState, Request};
use crate::store::parse_ts;
use chrono::NaiveDateTime;
use serde_json::json;

fn pair(req: &Request) -> Result<(String, String), serde_json::Value> {
    Ok((required_str(req, "worksheetId")?, required_str(req, "studentId")?))
}

/// `gradedAt` defaults to now; a value that does not parse is rejected.
fn graded_at(req: &Request) -> Result<NaiveDateTime, serde_json::Value> {
    match req.params.get("gradedAt").and_then(|v| v.as_str()) {
        None => Ok(chrono::Local::now().naive_local()),
        Some(raw) => parse_ts(raw).ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                "gradedAt must be an ISO timestamp (YYYY-MM-DDTHH:MM:SS)",
                Some(json!({ "gradedAt": raw })),
            )
        }),
    }
}

fn handle_assign(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let worksheet_ids = match required_str_list(req, "worksheetIds") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_ids = match required_str_list(req, "studentIds") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store.assign_many(&worksheet_ids, &student_ids, &optional_str(req, "assignedBy")) {
        Ok(outcome) => ok(&req.id, json!(outcome)),
        Err(e) => store_err(&req.id, e),
    }
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let (wid, sid) = match pair(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store.find_assignment(&wid, &sid) {
        Ok(Some(a)) => ok(&req.id, json!({ "assignment": a })),
        Ok(None) => assignment_not_found(&req.id, &wid, &sid),
        Err(e) => store_err(&req.id, e),
    }
}

fn handle_list_for_student(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store() else {
        return ok(&req.id, json!({ "assignments": [] }));
    };
    let sid = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store.list_assignments_for_student(&sid) {
        Ok(rows) => ok(&req.id, json!({ "assignments": rows })),
        Err(e) => store_err(&req.id, e),
    }
}

fn handle_wrongnote_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store() else {
        return ok(&req.id, json!({ "assignments": [] }));
    };
    let sid = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store.list_wrongnotes_for_student(&sid) {
        Ok(rows) => ok(&req.id, json!({ "assignments": rows })),
        Err(e) => store_err(&req.id, e),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cycle {
    Primary,
    WrongNote,
}

fn handle_grade(state: &mut AppState, req: &Request, cycle: Cycle) -> serde_json::Value {
    let store = match store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let (wid, sid) = match pair(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let submission = match grading_submission(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let when = match graded_at(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let graded_by = optional_str(req, "gradedBy");
    let saved = match cycle {
        Cycle::Primary => store.save_grading(&wid, &sid, &submission, &graded_by, when),
        Cycle::WrongNote => store.save_wrongnote_grading(&wid, &sid, &submission, &graded_by, when),
    };
    match saved {
        Ok(true) => ok(&req.id, json!({ "updated": true })),
        Ok(false) => assignment_not_found(&req.id, &wid, &sid),
        Err(e) => store_err(&req.id, e),
    }
}

fn handle_wrongnote_enable(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let (wid, sid) = match pair(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store.enable_wrongnote(&wid, &sid, &optional_str(req, "title")) {
        Ok(true) => ok(&req.id, json!({ "updated": true })),
        Ok(false) => assignment_not_found(&req.id, &wid, &sid),
        Err(e) => store_err(&req.id, e),
    }
}

fn handle_wrongnote_set_wrong(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let (wid, sid) = match pair(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let ids = match required_str_list(req, "wrongProblemIds") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store.set_wrong_info(&wid, &sid, &ids) {
        Ok(true) => ok(&req.id, json!({ "updated": true })),
        Ok(false) => assignment_not_found(&req.id, &wid, &sid),
        Err(e) => store_err(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "assignments.assign" => Some(handle_assign(state, req)),
        "assignments.get" => Some(handle_get(state, req)),
        "assignments.listForStudent" => Some(handle_list_for_student(state, req)),
        "assignments.grade" => Some(handle_grade(state, req, Cycle::Primary)),
        "assignments.wrongnote.enable" => Some(handle_wrongnote_enable(state, req)),
        "assignments.wrongnote.setWrong" => Some(handle_wrongnote_set_wrong(state, req)),
        "assignments.wrongnote.grade" => Some(handle_grade(state, req, Cycle::WrongNote)),
        "assignments.wrongnote.list" => Some(handle_wrongnote_list(state, req)),
        _ => None,
    }
}

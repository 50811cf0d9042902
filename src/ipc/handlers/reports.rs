use crate::ipc::error::{err, not_found, ok, store_err};
use crate::ipc::helpers::{optional_str, required_str, store};
use crate::ipc::types::{AppState, Request};
use crate::report::{aggregate_report, ReportSnapshot, ReportSources};
use crate::store::NewSavedReport;
use serde_json::json;

struct PeriodQuery {
    student_id: String,
    period_start: String,
    period_end: String,
}

fn period_query(req: &Request) -> Result<PeriodQuery, serde_json::Value> {
    Ok(PeriodQuery {
        student_id: required_str(req, "studentId")?,
        period_start: required_str(req, "periodStart")?,
        period_end: required_str(req, "periodEnd")?,
    })
}

fn aggregate(state: &AppState, q: &PeriodQuery) -> ReportSnapshot {
    let Some(store) = state.store() else {
        return ReportSnapshot::empty();
    };
    aggregate_report(
        &ReportSources::from_store(&store),
        &q.student_id,
        &q.period_start,
        &q.period_end,
    )
}

fn handle_report_aggregate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let q = match period_query(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let snapshot = aggregate(state, &q);
    ok(&req.id, json!({ "snapshot": snapshot }))
}

fn handle_saved_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let q = match period_query(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let snapshot = match req.params.get("snapshot") {
        None => aggregate(state, &q),
        Some(v) if v.is_null() => aggregate(state, &q),
        Some(v) => match serde_json::from_value::<ReportSnapshot>(v.clone()) {
            Ok(s) => s,
            Err(e) => return err(&req.id, "bad_params", format!("invalid snapshot: {}", e), None),
        },
    };

    let report = NewSavedReport {
        student_id: q.student_id,
        period_start: q.period_start,
        period_end: q.period_end,
        comment: optional_str(req, "comment"),
        snapshot,
    };
    match store.create_saved_report(&report) {
        Ok(id) => ok(&req.id, json!({ "reportId": id, "snapshot": report.snapshot })),
        Err(e) => store_err(&req.id, e),
    }
}

fn handle_saved_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store() else {
        return ok(&req.id, json!({ "reports": [] }));
    };
    let sid = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store.list_saved_reports(&sid) {
        Ok(reports) => ok(&req.id, json!({ "reports": reports })),
        Err(e) => store_err(&req.id, e),
    }
}

fn handle_saved_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let id = match required_str(req, "reportId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store.get_saved_report(&id) {
        Ok(Some(r)) => ok(&req.id, json!({ "report": r })),
        Ok(None) => not_found(&req.id, "report", None),
        Err(e) => store_err(&req.id, e),
    }
}

fn handle_saved_update_comment(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let id = match required_str(req, "reportId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store.update_saved_report_comment(&id, &optional_str(req, "comment")) {
        Ok(true) => ok(&req.id, json!({ "updated": true })),
        Ok(false) => not_found(&req.id, "report", None),
        Err(e) => store_err(&req.id, e),
    }
}

fn handle_saved_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let id = match required_str(req, "reportId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store.delete_saved_report(&id) {
        Ok(deleted) => ok(&req.id, json!({ "deleted": deleted })),
        Err(e) => store_err(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "report.aggregate" => Some(handle_report_aggregate(state, req)),
        "reports.saved.create" => Some(handle_saved_create(state, req)),
        "reports.saved.list" => Some(handle_saved_list(state, req)),
        "reports.saved.get" => Some(handle_saved_get(state, req)),
        "reports.saved.updateComment" => Some(handle_saved_update_comment(state, req)),
        "reports.saved.delete" => Some(handle_saved_delete(state, req)),
        _ => None,
    }
}

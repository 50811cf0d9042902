use crate::ipc::error::{err, not_found, ok, store_err};
use crate::ipc::helpers::{optional_str, required_str, store};
use crate::ipc::types::{AppState, Request};
use crate::models::SourceType;
use crate::store::{
    ExamLookup, NewExam, NewProblem, NewTextbook, NewWorksheet, TextbookLookup, WorksheetLookup,
};
use serde_json::json;

fn handle_textbooks_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v.trim().to_string(),
        Err(e) => return e,
    };
    if name.is_empty() {
        return err(&req.id, "bad_params", "name must not be empty", None);
    }
    let sub_unit = req
        .params
        .get("subUnit")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    let tb = NewTextbook {
        name,
        subject: optional_str(req, "subject"),
        major_unit: optional_str(req, "majorUnit"),
        sub_unit,
    };
    match store.create_textbook(&tb) {
        Ok(id) => ok(&req.id, json!({ "textbookId": id })),
        Err(e) => store_err(&req.id, e),
    }
}

fn handle_textbooks_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let id = match required_str(req, "textbookId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store.find_textbook(&id) {
        Ok(Some(tb)) => ok(&req.id, json!({ "textbook": tb })),
        Ok(None) => not_found(&req.id, "textbook", None),
        Err(e) => store_err(&req.id, e),
    }
}

fn handle_exams_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let exam = NewExam {
        school_name: optional_str(req, "schoolName"),
        grade: optional_str(req, "grade"),
        semester: optional_str(req, "semester"),
        exam_type: optional_str(req, "examType"),
        year: optional_str(req, "year"),
    };
    match store.create_exam(&exam) {
        Ok(id) => ok(&req.id, json!({ "examId": id })),
        Err(e) => store_err(&req.id, e),
    }
}

fn handle_exams_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let id = match required_str(req, "examId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store.find_exam(&id) {
        Ok(Some(exam)) => {
            let display_name = exam.display_name();
            ok(&req.id, json!({ "exam": exam, "displayName": display_name }))
        }
        Ok(None) => not_found(&req.id, "exam", None),
        Err(e) => store_err(&req.id, e),
    }
}

fn handle_problems_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let source_type = match req.params.get("sourceType").and_then(|v| v.as_str()) {
        None => SourceType::Textbook,
        Some(s) if s.eq_ignore_ascii_case("textbook") => SourceType::Textbook,
        Some(s) if s.eq_ignore_ascii_case("exam") => SourceType::Exam,
        Some(other) => {
            return err(
                &req.id,
                "bad_params",
                "sourceType must be one of: textbook, exam",
                Some(json!({ "sourceType": other })),
            )
        }
    };
    let problem_index = match req.params.get("problemIndex") {
        None => 0,
        Some(v) if v.is_null() => 0,
        Some(v) => match v.as_i64() {
            Some(n) => n,
            None => {
                return err(&req.id, "bad_params", "problemIndex must be an integer", None)
            }
        },
    };

    let problem = NewProblem {
        source_id: optional_str(req, "sourceId"),
        source_type,
        content_text: optional_str(req, "contentText"),
        problem_index,
    };
    match store.create_problem(&problem) {
        Ok(id) => ok(&req.id, json!({ "problemId": id })),
        Err(e) => store_err(&req.id, e),
    }
}

fn handle_problems_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let id = match required_str(req, "problemId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store.get_problem(&id) {
        Ok(problem) => ok(&req.id, json!({ "problem": problem })),
        Err(e) => store_err(&req.id, e),
    }
}

fn handle_worksheets_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let problem_ids = match req.params.get("problemIds") {
        None => Vec::new(),
        Some(v) if v.is_null() => Vec::new(),
        Some(v) => match v.as_array() {
            Some(items) => items
                .iter()
                .filter_map(|i| i.as_str().map(|s| s.to_string()))
                .collect(),
            None => {
                return err(&req.id, "bad_params", "problemIds must be an array", None)
            }
        },
    };

    let ws = NewWorksheet {
        title: optional_str(req, "title"),
        grade: optional_str(req, "grade"),
        type_text: optional_str(req, "typeText"),
        creator: optional_str(req, "creator"),
        problem_ids,
    };
    match store.create_worksheet(&ws) {
        Ok(id) => ok(&req.id, json!({ "worksheetId": id })),
        Err(e) => store_err(&req.id, e),
    }
}

fn handle_worksheets_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let id = match required_str(req, "worksheetId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store.find_worksheet(&id) {
        Ok(Some(ws)) => ok(&req.id, json!({ "worksheet": ws })),
        Ok(None) => not_found(&req.id, "worksheet", None),
        Err(e) => store_err(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "textbooks.create" => Some(handle_textbooks_create(state, req)),
        "textbooks.get" => Some(handle_textbooks_get(state, req)),
        "exams.create" => Some(handle_exams_create(state, req)),
        "exams.get" => Some(handle_exams_get(state, req)),
        "problems.create" => Some(handle_problems_create(state, req)),
        "problems.get" => Some(handle_problems_get(state, req)),
        "worksheets.create" => Some(handle_worksheets_create(state, req)),
        "worksheets.get" => Some(handle_worksheets_get(state, req)),
        _ => None,
    }
}

use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::models::{answers_from_value, unit_stats_from_value, GradingSubmission};
use crate::store::SqliteStore;
use serde_json::json;

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

/// Missing or null strings read as empty.
pub fn optional_str(req: &Request, key: &str) -> String {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

pub fn required_str_list(req: &Request, key: &str) -> Result<Vec<String>, serde_json::Value> {
    let Some(items) = req.params.get(key).and_then(|v| v.as_array()) else {
        return Err(err(
            &req.id,
            "bad_params",
            format!("{} must be an array of strings", key),
            None,
        ));
    };
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let Some(s) = item.as_str() else {
            return Err(err(
                &req.id,
                "bad_params",
                format!("{} must be an array of strings", key),
                Some(json!({ "value": item })),
            ));
        };
        out.push(s.to_string());
    }
    Ok(out)
}

pub fn store<'a>(state: &'a AppState, req: &Request) -> Result<SqliteStore<'a>, serde_json::Value> {
    state
        .store()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

/// Largest question count a grading record can hold (SQLite INTEGER).
const MAX_COUNT: u64 = i64::MAX as u64;

/// Reads `totalQuestions`, `correctCount`, `answers` and `unitStats` for either grading cycle.
pub fn grading_submission(req: &Request) -> Result<GradingSubmission, serde_json::Value> {
    let count = |key: &str| -> Result<u64, serde_json::Value> {
        let Some(v) = req.params.get(key) else {
            return Err(err(&req.id, "bad_params", format!("missing {}", key), None));
        };
        match v.as_u64() {
            Some(n) if n <= MAX_COUNT => Ok(n),
            _ => Err(err(
                &req.id,
                "bad_params",
                format!("{} must be an integer between 0 and {}", key, MAX_COUNT),
                Some(json!({ "field": key, "value": v })),
            )),
        }
    };
    let total_questions = count("totalQuestions")?;
    let correct_count = count("correctCount")?;
    if correct_count > total_questions {
        return Err(err(
            &req.id,
            "bad_params",
            "correctCount must not exceed totalQuestions",
            Some(json!({ "totalQuestions": total_questions, "correctCount": correct_count })),
        ));
    }

    let null = serde_json::Value::Null;
    Ok(GradingSubmission {
        total_questions,
        correct_count,
        answers: answers_from_value(req.params.get("answers").unwrap_or(&null)),
        unit_stats: unit_stats_from_value(req.params.get("unitStats").unwrap_or(&null)),
    })
}

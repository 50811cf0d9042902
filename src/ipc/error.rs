use crate::store::StoreError;
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// `what` names the record kind: "assignment", "textbook", "report", ...
pub fn not_found(id: &str, what: &str, details: Option<serde_json::Value>) -> serde_json::Value {
    err(id, "not_found", format!("{} not found", what), details)
}

pub fn assignment_not_found(id: &str, worksheet_id: &str, student_id: &str) -> serde_json::Value {
    not_found(
        id,
        "assignment",
        Some(json!({ "worksheetId": worksheet_id, "studentId": student_id })),
    )
}

/// Maps a store failure onto its envelope. Only database and encoding faults are logged.
pub fn store_err(id: &str, e: StoreError) -> serde_json::Value {
    match e {
        StoreError::NotFound(what) => not_found(id, what, None),
        StoreError::InvalidInput(msg) => err(id, "bad_params", msg, None),
        other => {
            log::warn!("store failure: {}", other);
            err(id, other.code(), other.to_string(), None)
        }
    }
}

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

/// Catalog a problem was drawn from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    #[default]
    Textbook,
    Exam,
}

impl SourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::Textbook => "textbook",
            SourceType::Exam => "exam",
        }
    }

    /// Stored values other than `exam` are treated as textbook rows.
    pub fn from_stored(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("exam") {
            SourceType::Exam
        } else {
            SourceType::Textbook
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub id: String,
    pub source_id: String,
    pub source_type: SourceType,
    pub content_text: String,
    pub problem_index: i64,
    pub created_at: Option<String>,
}

impl Problem {
    /// The trimmed source reference, or `None` when the problem carries no attribution.
    pub fn source_ref(&self) -> Option<&str> {
        let s = self.source_id.trim();
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Textbook {
    pub id: String,
    pub name: String,
    pub subject: String,
    pub major_unit: String,
    pub sub_unit: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: String,
    pub school_name: String,
    pub grade: String,
    pub semester: String,
    pub exam_type: String,
    pub year: String,
    pub created_at: Option<String>,
}

impl Exam {
    /// "{school} {grade} {semester} {exam_type} {year}" with blank parts dropped.
    pub fn display_name(&self) -> Option<String> {
        let parts: Vec<&str> = [
            self.school_name.as_str(),
            self.grade.as_str(),
            self.semester.as_str(),
            self.exam_type.as_str(),
            self.year.as_str(),
        ]
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Worksheet {
    pub id: String,
    pub title: String,
    pub grade: String,
    pub type_text: String,
    pub creator: String,
    pub problem_ids: Vec<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    #[default]
    Assigned,
    Graded,
}

impl AssignmentStatus {
    pub fn from_stored(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("graded") => AssignmentStatus::Graded,
            _ => AssignmentStatus::Assigned,
        }
    }
}

/// One graded problem on a worksheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub problem_id: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UnitCounter {
    pub total: u64,
    pub correct: u64,
}

impl UnitCounter {
    /// Saturates at `u64::MAX`; stored counters are not trusted to be small.
    pub fn add(&mut self, total: u64, correct: u64) {
        self.total = self.total.saturating_add(total);
        self.correct = self.correct.saturating_add(correct);
    }
}

pub type UnitStats = BTreeMap<String, UnitCounter>;

/// One grading event. The primary cycle and the wrong-note cycle share this shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingCycle {
    pub status: AssignmentStatus,
    pub graded_at: Option<String>,
    pub total_questions: u64,
    pub correct_count: u64,
    pub answers: Vec<AnswerRecord>,
    pub unit_stats: UnitStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: String,
    pub worksheet_id: String,
    pub student_id: String,
    pub assigned_at: String,
    pub assigned_by: String,
    pub grading: GradingCycle,
    pub wrong_problem_ids: Vec<String>,
    pub wrong_count: u64,
    pub wrongnote_enabled: bool,
    pub wrongnote_title: Option<String>,
    pub wrongnote_updated_at: Option<String>,
    pub wrongnote: GradingCycle,
}

/// Grading input shared by both cycles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradingSubmission {
    pub total_questions: u64,
    pub correct_count: u64,
    pub answers: Vec<AnswerRecord>,
    pub unit_stats: UnitStats,
}

impl GradingSubmission {
    /// Problem ids answered incorrectly, in answer order.
    pub fn wrong_problem_ids(&self) -> Vec<String> {
        self.answers
            .iter()
            .filter(|a| !a.is_correct && !a.problem_id.is_empty())
            .map(|a| a.problem_id.clone())
            .collect()
    }
}

/// Decodes an answers column. Anything but an array of objects yields no answers.
pub fn decode_answers(raw: Option<&str>) -> Vec<AnswerRecord> {
    parse_json_col(raw)
        .map(|v| answers_from_value(&v))
        .unwrap_or_default()
}

pub fn answers_from_value(value: &serde_json::Value) -> Vec<AnswerRecord> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            let problem_id = obj
                .get("problem_id")
                .or_else(|| obj.get("problemId"))
                .map(id_from_value)
                .unwrap_or_default();
            let is_correct = obj
                .get("is_correct")
                .or_else(|| obj.get("isCorrect"))
                .map(truthy)
                .unwrap_or(false);
            Some(AnswerRecord {
                problem_id,
                is_correct,
            })
        })
        .collect()
}

/// Decodes a unit-stats column. Entries whose value is not an object are dropped.
pub fn decode_unit_stats(raw: Option<&str>) -> UnitStats {
    parse_json_col(raw)
        .map(|v| unit_stats_from_value(&v))
        .unwrap_or_default()
}

pub fn unit_stats_from_value(value: &serde_json::Value) -> UnitStats {
    let mut out = UnitStats::new();
    let Some(obj) = value.as_object() else {
        return out;
    };
    for (key, entry) in obj {
        let Some(entry) = entry.as_object() else {
            continue;
        };
        let total = entry.get("total").map(count_from_value).unwrap_or(0);
        let correct = entry.get("correct").map(count_from_value).unwrap_or(0);
        out.entry(key.clone()).or_default().add(total, correct);
    }
    out
}

pub fn decode_id_list(raw: Option<&str>) -> Vec<String> {
    parse_json_col(raw)
        .map(|v| id_list_from_value(&v))
        .unwrap_or_default()
}

pub fn id_list_from_value(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(id_from_value)
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

pub fn encode_answers(answers: &[AnswerRecord]) -> String {
    let items: Vec<serde_json::Value> = answers
        .iter()
        .map(|a| json!({ "problem_id": a.problem_id, "is_correct": a.is_correct }))
        .collect();
    serde_json::Value::Array(items).to_string()
}

pub fn encode_unit_stats(stats: &UnitStats) -> String {
    let obj: serde_json::Map<String, serde_json::Value> = stats
        .iter()
        .map(|(k, c)| (k.clone(), json!({ "total": c.total, "correct": c.correct })))
        .collect();
    serde_json::Value::Object(obj).to_string()
}

fn parse_json_col(raw: Option<&str>) -> Option<serde_json::Value> {
    let s = raw?.trim();
    if s.is_empty() {
        return None;
    }
    serde_json::from_str(s).ok()
}

fn id_from_value(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

fn truthy(v: &serde_json::Value) -> bool {
    match v {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(a) => !a.is_empty(),
        serde_json::Value::Object(o) => !o.is_empty(),
    }
}

/// Non-negative counter from a loosely typed JSON value. Negative or non-numeric input counts as 0.
pub fn count_from_value(v: &serde_json::Value) -> u64 {
    match v {
        serde_json::Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                u
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f > 0.0)
                    .map(|f| f.trunc() as u64)
                    .unwrap_or(0)
            }
        }
        serde_json::Value::String(s) => s.trim().parse::<u64>().unwrap_or(0),
        serde_json::Value::Bool(b) => u64::from(*b),
        _ => 0,
    }
}

pub fn count_from_column(v: Option<i64>) -> u64 {
    v.filter(|n| *n > 0).map(|n| n as u64).unwrap_or(0)
}

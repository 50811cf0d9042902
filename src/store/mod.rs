mod assignments;
mod catalog;
mod saved_reports;

pub use catalog::{NewExam, NewProblem, NewTextbook, NewWorksheet};
pub use saved_reports::NewSavedReport;

use crate::models::{Assignment, Exam, Problem, Textbook, Worksheet};
use chrono::NaiveDateTime;
use rusqlite::Connection;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0} not found")]
    NotFound(&'static str),
}

impl StoreError {
    /// Stable IPC error code for this failure.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Sqlite(_) => "db_query_failed",
            StoreError::Json(_) => "bad_json",
            StoreError::InvalidInput(_) => "bad_params",
            StoreError::NotFound(_) => "not_found",
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Graded-assignment range reads consumed by the report aggregator.
pub trait AssignmentSource {
    fn list_graded_for_student_in_period(
        &self,
        student_id: &str,
        period_start: &str,
        period_end: &str,
    ) -> StoreResult<Vec<Assignment>>;
}

pub trait ProblemLookup {
    fn find_problem(&self, problem_id: &str) -> StoreResult<Option<Problem>>;
}

pub trait TextbookLookup {
    fn find_textbook(&self, textbook_id: &str) -> StoreResult<Option<Textbook>>;
}

pub trait ExamLookup {
    fn find_exam(&self, exam_id: &str) -> StoreResult<Option<Exam>>;
}

pub trait WorksheetLookup {
    fn find_worksheet(&self, worksheet_id: &str) -> StoreResult<Option<Worksheet>>;
}

/// Repository handle over an open workspace connection.
#[derive(Clone, Copy)]
pub struct SqliteStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub(crate) fn conn(&self) -> &'a Connection {
        self.conn
    }
}

const TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

pub fn format_ts(ts: NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

pub fn now_ts() -> String {
    format_ts(chrono::Local::now().naive_local())
}

/// Accepts `YYYY-MM-DDTHH:MM:SS[.ffffff]` or `YYYY-MM-DD HH:MM:SS[.ffffff]`.
pub fn parse_ts(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(crate) fn clean(s: &str) -> String {
    s.trim().to_string()
}

#[cfg(test)]
pub(crate) fn test_conn() -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    crate::db::init_schema(&conn).expect("init schema");
    conn
}

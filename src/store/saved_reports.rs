use super::{clean, new_id, now_ts, SqliteStore, StoreError, StoreResult};
use crate::report::ReportSnapshot;
use rusqlite::{OptionalExtension, Row};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedReport {
    pub id: String,
    pub student_id: String,
    pub period_start: String,
    pub period_end: String,
    pub comment: String,
    pub created_at: Option<String>,
    pub snapshot: ReportSnapshot,
}

#[derive(Debug, Clone, Default)]
pub struct NewSavedReport {
    pub student_id: String,
    pub period_start: String,
    pub period_end: String,
    pub comment: String,
    pub snapshot: ReportSnapshot,
}

fn saved_report_from_row(r: &Row<'_>) -> rusqlite::Result<SavedReport> {
    let snapshot_json: Option<String> = r.get(6)?;
    Ok(SavedReport {
        id: r.get(0)?,
        student_id: r.get(1)?,
        period_start: r.get(2)?,
        period_end: r.get(3)?,
        comment: r.get(4)?,
        created_at: r.get(5)?,
        snapshot: ReportSnapshot::from_stored(snapshot_json.as_deref()),
    })
}

impl SqliteStore<'_> {
    pub fn create_saved_report(&self, report: &NewSavedReport) -> StoreResult<String> {
        let sid = clean(&report.student_id);
        if sid.is_empty() {
            return Err(StoreError::InvalidInput("studentId must not be empty".into()));
        }
        let id = new_id();
        self.conn().execute(
            "INSERT INTO saved_reports(id, student_id, period_start, period_end, comment, created_at, snapshot_json)
             VALUES(?, ?, ?, ?, ?, ?, ?)",
            (
                &id,
                &sid,
                clean(&report.period_start),
                clean(&report.period_end),
                clean(&report.comment),
                now_ts(),
                serde_json::to_string(&report.snapshot)?,
            ),
        )?;
        Ok(id)
    }

    /// Newest first.
    pub fn list_saved_reports(&self, student_id: &str) -> StoreResult<Vec<SavedReport>> {
        let sid = clean(student_id);
        if sid.is_empty() {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn().prepare(
            "SELECT id, student_id, period_start, period_end, comment, created_at, snapshot_json
             FROM saved_reports
             WHERE student_id = ?
             ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt
            .query_map([&sid], saved_report_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn get_saved_report(&self, report_id: &str) -> StoreResult<Option<SavedReport>> {
        let rid = clean(report_id);
        if rid.is_empty() {
            return Ok(None);
        }
        let row = self
            .conn()
            .query_row(
                "SELECT id, student_id, period_start, period_end, comment, created_at, snapshot_json
                 FROM saved_reports WHERE id = ?",
                [&rid],
                saved_report_from_row,
            )
            .optional()?;
        Ok(row)
    }

    pub fn update_saved_report_comment(&self, report_id: &str, comment: &str) -> StoreResult<bool> {
        let rid = clean(report_id);
        if rid.is_empty() {
            return Ok(false);
        }
        let changed = self.conn().execute(
            "UPDATE saved_reports SET comment = ? WHERE id = ?",
            (clean(comment), &rid),
        )?;
        Ok(changed > 0)
    }

    pub fn delete_saved_report(&self, report_id: &str) -> StoreResult<bool> {
        let rid = clean(report_id);
        if rid.is_empty() {
            return Ok(false);
        }
        let changed = self
            .conn()
            .execute("DELETE FROM saved_reports WHERE id = ?", [&rid])?;
        Ok(changed > 0)
    }
}

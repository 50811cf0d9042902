use super::{
    clean, format_ts, new_id, now_ts, AssignmentSource, SqliteStore, StoreError, StoreResult,
};
use crate::models::{
    count_from_column, decode_answers, decode_id_list, decode_unit_stats, encode_answers,
    encode_unit_stats, Assignment, AssignmentStatus, GradingCycle, GradingSubmission,
};
use chrono::NaiveDateTime;
use rusqlite::{OptionalExtension, Row};
use serde::Serialize;

const ASSIGNMENT_COLUMNS: &str = "id, worksheet_id, student_id, assigned_at, assigned_by,
    status, graded_at, total_questions, correct_count, answers_json, unit_stats_json,
    wrong_problem_ids_json, wrong_count,
    wrongnote_enabled, wrongnote_title, wrongnote_updated_at, wrongnote_status,
    wrongnote_graded_at, wrongnote_total_questions, wrongnote_correct_count,
    wrongnote_answers_json, wrongnote_unit_stats_json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AssignOutcome {
    pub inserted: usize,
    pub skipped: usize,
    pub total: usize,
}

/// Expands a date-only period to full-day timestamps. Bounds that already carry a time are used verbatim.
pub fn period_bounds(period_start: &str, period_end: &str) -> (String, String) {
    let start = period_start.trim();
    let end = period_end.trim();
    let start = if start.contains('T') {
        start.to_string()
    } else {
        format!("{}T00:00:00", start)
    };
    let end = if end.contains('T') {
        end.to_string()
    } else {
        format!("{}T23:59:59.999999", end)
    };
    (start, end)
}

fn count_column(value: u64, field: &str) -> StoreResult<i64> {
    i64::try_from(value)
        .map_err(|_| StoreError::InvalidInput(format!("{} is too large: {}", field, value)))
}

fn assignment_from_row(r: &Row<'_>) -> rusqlite::Result<Assignment> {
    let status: Option<String> = r.get(5)?;
    let answers: Option<String> = r.get(9)?;
    let unit_stats: Option<String> = r.get(10)?;
    let wrong_ids: Option<String> = r.get(11)?;
    let wn_status: Option<String> = r.get(16)?;
    let wn_answers: Option<String> = r.get(20)?;
    let wn_unit_stats: Option<String> = r.get(21)?;
    Ok(Assignment {
        id: r.get(0)?,
        worksheet_id: r.get(1)?,
        student_id: r.get(2)?,
        assigned_at: r.get(3)?,
        assigned_by: r.get::<_, Option<String>>(4)?.unwrap_or_default(),
        grading: GradingCycle {
            status: AssignmentStatus::from_stored(status.as_deref()),
            graded_at: r.get(6)?,
            total_questions: count_from_column(r.get(7)?),
            correct_count: count_from_column(r.get(8)?),
            answers: decode_answers(answers.as_deref()),
            unit_stats: decode_unit_stats(unit_stats.as_deref()),
        },
        wrong_problem_ids: decode_id_list(wrong_ids.as_deref()),
        wrong_count: count_from_column(r.get(12)?),
        wrongnote_enabled: r.get::<_, Option<i64>>(13)?.unwrap_or(0) != 0,
        wrongnote_title: r.get(14)?,
        wrongnote_updated_at: r.get(15)?,
        wrongnote: GradingCycle {
            status: AssignmentStatus::from_stored(wn_status.as_deref()),
            graded_at: r.get(17)?,
            total_questions: count_from_column(r.get(18)?),
            correct_count: count_from_column(r.get(19)?),
            answers: decode_answers(wn_answers.as_deref()),
            unit_stats: decode_unit_stats(wn_unit_stats.as_deref()),
        },
    })
}

impl SqliteStore<'_> {
    /// Creates one `assigned` record per (worksheet, student) pair. Existing pairs are left untouched.
    pub fn assign_many(
        &self,
        worksheet_ids: &[String],
        student_ids: &[String],
        assigned_by: &str,
    ) -> StoreResult<AssignOutcome> {
        let ws_ids: Vec<String> = worksheet_ids
            .iter()
            .map(|s| clean(s))
            .filter(|s| !s.is_empty())
            .collect();
        let st_ids: Vec<String> = student_ids
            .iter()
            .map(|s| clean(s))
            .filter(|s| !s.is_empty())
            .collect();
        if ws_ids.is_empty() || st_ids.is_empty() {
            return Ok(AssignOutcome {
                inserted: 0,
                skipped: 0,
                total: 0,
            });
        }

        let now = now_ts();
        let assigned_by = clean(assigned_by);
        let tx = self.conn().unchecked_transaction()?;
        let mut inserted = 0usize;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO worksheet_assignments(id, worksheet_id, student_id, assigned_at, assigned_by, status)
                 VALUES(?, ?, ?, ?, ?, 'assigned')
                 ON CONFLICT(worksheet_id, student_id) DO NOTHING",
            )?;
            for wid in &ws_ids {
                for sid in &st_ids {
                    inserted += stmt.execute((new_id(), wid, sid, &now, &assigned_by))?;
                }
            }
        }
        tx.commit()?;

        let total = ws_ids.len() * st_ids.len();
        Ok(AssignOutcome {
            inserted,
            skipped: total - inserted,
            total,
        })
    }

    pub fn find_assignment(
        &self,
        worksheet_id: &str,
        student_id: &str,
    ) -> StoreResult<Option<Assignment>> {
        let (wid, sid) = (clean(worksheet_id), clean(student_id));
        if wid.is_empty() || sid.is_empty() {
            return Ok(None);
        }
        let sql = format!(
            "SELECT {} FROM worksheet_assignments WHERE worksheet_id = ? AND student_id = ?",
            ASSIGNMENT_COLUMNS
        );
        let row = self
            .conn()
            .query_row(&sql, (&wid, &sid), assignment_from_row)
            .optional()?;
        Ok(row)
    }

    pub fn list_assignments_for_student(&self, student_id: &str) -> StoreResult<Vec<Assignment>> {
        let sid = clean(student_id);
        if sid.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM worksheet_assignments WHERE student_id = ? ORDER BY assigned_at DESC",
            ASSIGNMENT_COLUMNS
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt
            .query_map([&sid], assignment_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn list_wrongnotes_for_student(&self, student_id: &str) -> StoreResult<Vec<Assignment>> {
        let sid = clean(student_id);
        if sid.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM worksheet_assignments
             WHERE student_id = ? AND wrongnote_enabled = 1
             ORDER BY assigned_at DESC",
            ASSIGNMENT_COLUMNS
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt
            .query_map([&sid], assignment_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Records the primary grading result. Returns `false` when no assignment matches.
    pub fn save_grading(
        &self,
        worksheet_id: &str,
        student_id: &str,
        submission: &GradingSubmission,
        graded_by: &str,
        graded_at: NaiveDateTime,
    ) -> StoreResult<bool> {
        let (wid, sid) = (clean(worksheet_id), clean(student_id));
        if wid.is_empty() || sid.is_empty() {
            return Ok(false);
        }
        let wrong_ids = submission.wrong_problem_ids();
        let ts = format_ts(graded_at);
        let changed = self.conn().execute(
            "UPDATE worksheet_assignments SET
                status = 'graded', graded_at = ?, total_questions = ?, correct_count = ?,
                answers_json = ?, unit_stats_json = ?, wrong_problem_ids_json = ?,
                wrong_count = ?, wrongnote_updated_at = ?, assigned_by = ?
             WHERE worksheet_id = ? AND student_id = ?",
            (
                &ts,
                count_column(submission.total_questions, "totalQuestions")?,
                count_column(submission.correct_count, "correctCount")?,
                encode_answers(&submission.answers),
                encode_unit_stats(&submission.unit_stats),
                serde_json::to_string(&wrong_ids)?,
                wrong_ids.len() as i64,
                &ts,
                clean(graded_by),
                &wid,
                &sid,
            ),
        )?;
        Ok(changed > 0)
    }

    /// Records a wrong-note quiz result. The primary grading fields are left as they are.
    pub fn save_wrongnote_grading(
        &self,
        worksheet_id: &str,
        student_id: &str,
        submission: &GradingSubmission,
        graded_by: &str,
        graded_at: NaiveDateTime,
    ) -> StoreResult<bool> {
        let (wid, sid) = (clean(worksheet_id), clean(student_id));
        if wid.is_empty() || sid.is_empty() {
            return Ok(false);
        }
        let ts = format_ts(graded_at);
        let changed = self.conn().execute(
            "UPDATE worksheet_assignments SET
                wrongnote_status = 'graded', wrongnote_graded_at = ?,
                wrongnote_total_questions = ?, wrongnote_correct_count = ?,
                wrongnote_answers_json = ?, wrongnote_unit_stats_json = ?,
                wrongnote_updated_at = ?, assigned_by = ?
             WHERE worksheet_id = ? AND student_id = ?",
            (
                &ts,
                count_column(submission.total_questions, "totalQuestions")?,
                count_column(submission.correct_count, "correctCount")?,
                encode_answers(&submission.answers),
                encode_unit_stats(&submission.unit_stats),
                &ts,
                clean(graded_by),
                &wid,
                &sid,
            ),
        )?;
        Ok(changed > 0)
    }

    pub fn enable_wrongnote(
        &self,
        worksheet_id: &str,
        student_id: &str,
        title: &str,
    ) -> StoreResult<bool> {
        let (wid, sid) = (clean(worksheet_id), clean(student_id));
        if wid.is_empty() || sid.is_empty() {
            return Ok(false);
        }
        let changed = self.conn().execute(
            "UPDATE worksheet_assignments SET
                wrongnote_enabled = 1, wrongnote_title = ?, wrongnote_updated_at = ?
             WHERE worksheet_id = ? AND student_id = ?",
            (clean(title), now_ts(), &wid, &sid),
        )?;
        Ok(changed > 0)
    }

    /// Replaces the wrong-problem list picked for the wrong-note quiz.
    pub fn set_wrong_info(
        &self,
        worksheet_id: &str,
        student_id: &str,
        wrong_problem_ids: &[String],
    ) -> StoreResult<bool> {
        let (wid, sid) = (clean(worksheet_id), clean(student_id));
        if wid.is_empty() || sid.is_empty() {
            return Ok(false);
        }
        let ids: Vec<String> = wrong_problem_ids
            .iter()
            .map(|s| clean(s))
            .filter(|s| !s.is_empty())
            .collect();
        let changed = self.conn().execute(
            "UPDATE worksheet_assignments SET
                wrong_problem_ids_json = ?, wrong_count = ?, wrongnote_updated_at = ?
             WHERE worksheet_id = ? AND student_id = ?",
            (
                serde_json::to_string(&ids)?,
                ids.len() as i64,
                now_ts(),
                &wid,
                &sid,
            ),
        )?;
        Ok(changed > 0)
    }
}

impl AssignmentSource for SqliteStore<'_> {
    fn list_graded_for_student_in_period(
        &self,
        student_id: &str,
        period_start: &str,
        period_end: &str,
    ) -> StoreResult<Vec<Assignment>> {
        let sid = clean(student_id);
        if sid.is_empty() || period_start.trim().is_empty() || period_end.trim().is_empty() {
            return Ok(Vec::new());
        }
        let (start, end) = period_bounds(period_start, period_end);
        let sql = format!(
            "SELECT {} FROM worksheet_assignments
             WHERE student_id = ? AND status = 'graded'
               AND graded_at >= ? AND graded_at <= ?
             ORDER BY graded_at DESC",
            ASSIGNMENT_COLUMNS
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt
            .query_map((&sid, &start, &end), assignment_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

use crate::models::{Assignment, SourceType, UnitCounter};
use crate::store::{
    AssignmentSource, ExamLookup, ProblemLookup, TextbookLookup, WorksheetLookup,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Worksheet type labels containing this token are past-exam worksheets.
pub const EXAM_TYPE_MARKER: &str = "기출";
pub const UNNAMED_LABEL: &str = "미명";
pub const UNCONFIRMED_LABEL: &str = "미확인";
pub const UNCLASSIFIED_LABEL: &str = "미분류";

/// Percentage with one decimal, rounded half-up on the exact ratio `correct / total`.
///
/// Working in integer tenths keeps boundary cases exact: `1/16` is `6.25%` and
/// rounds to `6.3`, which float `round(x * 10) / 10` cannot promise. The result
/// is clamped to `[0.0, 100.0]` and is `0.0` when `total` is zero.
pub fn rate_pct(correct: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let correct = u128::from(correct.min(total));
    let total = u128::from(total);
    let tenths = (correct * 2000 + total) / (2 * total);
    tenths as f64 / 10.0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitStat {
    pub unit_key: String,
    pub unit_label: String,
    pub total: u64,
    pub correct: u64,
    pub rate_pct: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceStat {
    pub name: String,
    pub correct: u64,
    pub total: u64,
}

/// Aggregated learning report for one student and period.
///
/// Field names stay snake_case: the same JSON document is persisted verbatim in
/// `saved_reports.snapshot_json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSnapshot {
    pub total_worksheets: u64,
    pub total_questions: u64,
    pub total_correct: u64,
    pub average_rate_pct: f64,
    pub unit_stats: Vec<UnitStat>,
    pub textbook_stats: Vec<SourceStat>,
    pub exam_stats: Vec<SourceStat>,
}

impl ReportSnapshot {
    /// The canonical empty snapshot.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Decodes a persisted snapshot. Missing or unreadable documents decode as empty.
    pub fn from_stored(raw: Option<&str>) -> Self {
        raw.map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default()
    }
}

/// Bucket a source statistic is reported under. Ordered so that textbooks sort before exams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceCategory {
    Textbook,
    Exam,
}

impl SourceCategory {
    fn from_source_type(t: SourceType) -> Self {
        match t {
            SourceType::Exam => SourceCategory::Exam,
            SourceType::Textbook => SourceCategory::Textbook,
        }
    }

    fn from_worksheet_type(type_text: &str) -> Self {
        if type_text.contains(EXAM_TYPE_MARKER) {
            SourceCategory::Exam
        } else {
            SourceCategory::Textbook
        }
    }
}

/// Read-only collaborators the aggregator pulls from.
#[derive(Clone, Copy)]
pub struct ReportSources<'a> {
    pub assignments: &'a dyn AssignmentSource,
    pub problems: &'a dyn ProblemLookup,
    pub textbooks: &'a dyn TextbookLookup,
    pub exams: &'a dyn ExamLookup,
    pub worksheets: &'a dyn WorksheetLookup,
}

impl<'a> ReportSources<'a> {
    /// Uses one store for every collaborator.
    pub fn from_store<S>(store: &'a S) -> Self
    where
        S: AssignmentSource + ProblemLookup + TextbookLookup + ExamLookup + WorksheetLookup + 'a,
    {
        Self {
            assignments: store,
            problems: store,
            textbooks: store,
            exams: store,
            worksheets: store,
        }
    }
}

type SourceBuckets = BTreeMap<(SourceCategory, String), UnitCounter>;

/// Builds the report snapshot for `student_id` over the closed period `[period_start, period_end]`.
///
/// Never fails: blank input, an unreachable store or an empty period all yield
/// [`ReportSnapshot::empty`]. A lookup failure for one answer skips only that answer.
pub fn aggregate_report(
    sources: &ReportSources<'_>,
    student_id: &str,
    period_start: &str,
    period_end: &str,
) -> ReportSnapshot {
    let sid = student_id.trim();
    let start = period_start.trim();
    let end = period_end.trim();
    if sid.is_empty() || start.is_empty() || end.is_empty() {
        return ReportSnapshot::empty();
    }

    let assignments = match sources
        .assignments
        .list_graded_for_student_in_period(sid, start, end)
    {
        Ok(v) => v,
        Err(e) => {
            log::warn!("report: graded assignment query failed for student {}: {}", sid, e);
            return ReportSnapshot::empty();
        }
    };
    if assignments.is_empty() {
        return ReportSnapshot::empty();
    }

    let mut total_questions: u64 = 0;
    let mut total_correct: u64 = 0;
    let mut unit_merged: BTreeMap<String, UnitCounter> = BTreeMap::new();
    let mut source_merged: SourceBuckets = BTreeMap::new();

    for a in &assignments {
        let tq = a.grading.total_questions;
        let tc = a.grading.correct_count;
        total_questions = total_questions.saturating_add(tq);
        total_correct = total_correct.saturating_add(tc);

        for (unit_key, counter) in &a.grading.unit_stats {
            unit_merged
                .entry(unit_key.clone())
                .or_default()
                .add(counter.total, counter.correct);
        }

        if !attribute_answers(sources, a, &mut source_merged) {
            let key = fallback_bucket(sources, a);
            log::debug!(
                "report: assignment {} has no attributed problems, using worksheet bucket {:?}",
                a.id,
                key
            );
            source_merged.entry(key).or_default().add(tq, tc);
        }
    }

    let mut unit_rows: Vec<(String, UnitCounter)> = unit_merged.into_iter().collect();
    unit_rows.sort_by(|(ka, a), (kb, b)| b.total.cmp(&a.total).then_with(|| ka.cmp(kb)));
    let unit_stats = unit_rows
        .into_iter()
        .map(|(unit_key, c)| UnitStat {
            unit_label: if unit_key.is_empty() {
                UNCLASSIFIED_LABEL.to_string()
            } else {
                unit_key.clone()
            },
            unit_key,
            total: c.total,
            correct: c.correct,
            rate_pct: rate_pct(c.correct, c.total),
        })
        .collect();

    let mut source_rows: Vec<((SourceCategory, String), UnitCounter)> =
        source_merged.into_iter().collect();
    source_rows.sort_by(|(ka, a), (kb, b)| b.total.cmp(&a.total).then_with(|| ka.cmp(kb)));
    let mut textbook_stats = Vec::new();
    let mut exam_stats = Vec::new();
    for ((category, name), c) in source_rows {
        let item = SourceStat {
            name,
            correct: c.correct,
            total: c.total,
        };
        match category {
            SourceCategory::Exam => exam_stats.push(item),
            SourceCategory::Textbook => textbook_stats.push(item),
        }
    }

    ReportSnapshot {
        total_worksheets: assignments.len() as u64,
        total_questions,
        total_correct,
        average_rate_pct: rate_pct(total_correct, total_questions),
        unit_stats,
        textbook_stats,
        exam_stats,
    }
}

/// Adds one unit per answer whose problem carries a source. Returns whether any answer was attributed.
fn attribute_answers(
    sources: &ReportSources<'_>,
    assignment: &Assignment,
    buckets: &mut SourceBuckets,
) -> bool {
    let mut attributed = false;
    for ans in &assignment.grading.answers {
        let pid = ans.problem_id.trim();
        if pid.is_empty() {
            continue;
        }
        let problem = match sources.problems.find_problem(pid) {
            Ok(Some(p)) => p,
            Ok(None) => continue,
            Err(e) => {
                log::debug!("report: problem {} lookup failed, skipping: {}", pid, e);
                continue;
            }
        };
        let Some(source_id) = problem.source_ref() else {
            continue;
        };

        let category = SourceCategory::from_source_type(problem.source_type);
        let name = source_name(sources, problem.source_type, source_id)
            .unwrap_or_else(|| UNNAMED_LABEL.to_string());
        let counter = buckets.entry((category, name)).or_default();
        counter.add(1, u64::from(ans.is_correct));
        attributed = true;
    }
    attributed
}

fn source_name(sources: &ReportSources<'_>, source_type: SourceType, source_id: &str) -> Option<String> {
    let name = match source_type {
        SourceType::Exam => match sources.exams.find_exam(source_id) {
            Ok(exam) => exam.and_then(|e| e.display_name()),
            Err(e) => {
                log::debug!("report: exam {} lookup failed: {}", source_id, e);
                None
            }
        },
        SourceType::Textbook => match sources.textbooks.find_textbook(source_id) {
            Ok(tb) => tb.map(|t| t.name.trim().to_string()),
            Err(e) => {
                log::debug!("report: textbook {} lookup failed: {}", source_id, e);
                None
            }
        },
    };
    name.filter(|n| !n.is_empty())
}

fn fallback_bucket(sources: &ReportSources<'_>, assignment: &Assignment) -> (SourceCategory, String) {
    let wid = assignment.worksheet_id.trim();
    let worksheet = if wid.is_empty() {
        None
    } else {
        match sources.worksheets.find_worksheet(wid) {
            Ok(ws) => ws,
            Err(e) => {
                log::debug!("report: worksheet {} lookup failed: {}", wid, e);
                None
            }
        }
    };

    match worksheet {
        Some(ws) => {
            let title = ws.title.trim();
            let name = if title.is_empty() { UNNAMED_LABEL } else { title };
            (SourceCategory::from_worksheet_type(&ws.type_text), name.to_string())
        }
        None => (SourceCategory::Textbook, UNCONFIRMED_LABEL.to_string()),
    }
}

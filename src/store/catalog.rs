use super::{clean, new_id, now_ts, SqliteStore, StoreError, StoreResult};
use super::{ExamLookup, ProblemLookup, TextbookLookup, WorksheetLookup};
use crate::models::{decode_id_list, Exam, Problem, SourceType, Textbook, Worksheet};
use rusqlite::OptionalExtension;

#[derive(Debug, Clone, Default)]
pub struct NewTextbook {
    pub name: String,
    pub subject: String,
    pub major_unit: String,
    pub sub_unit: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewExam {
    pub school_name: String,
    pub grade: String,
    pub semester: String,
    pub exam_type: String,
    pub year: String,
}

#[derive(Debug, Clone, Default)]
pub struct NewProblem {
    pub source_id: String,
    pub source_type: SourceType,
    pub content_text: String,
    pub problem_index: i64,
}

#[derive(Debug, Clone, Default)]
pub struct NewWorksheet {
    pub title: String,
    pub grade: String,
    pub type_text: String,
    pub creator: String,
    pub problem_ids: Vec<String>,
}

impl SqliteStore<'_> {
    pub fn create_textbook(&self, tb: &NewTextbook) -> StoreResult<String> {
        let id = new_id();
        self.conn().execute(
            "INSERT INTO textbooks(id, name, subject, major_unit, sub_unit, created_at)
             VALUES(?, ?, ?, ?, ?, ?)",
            (
                &id,
                clean(&tb.name),
                clean(&tb.subject),
                clean(&tb.major_unit),
                tb.sub_unit.as_deref().map(clean).filter(|s| !s.is_empty()),
                now_ts(),
            ),
        )?;
        Ok(id)
    }

    pub fn create_exam(&self, exam: &NewExam) -> StoreResult<String> {
        let id = new_id();
        self.conn().execute(
            "INSERT INTO exams(id, school_name, grade, semester, exam_type, year, created_at)
             VALUES(?, ?, ?, ?, ?, ?, ?)",
            (
                &id,
                clean(&exam.school_name),
                clean(&exam.grade),
                clean(&exam.semester),
                clean(&exam.exam_type),
                clean(&exam.year),
                now_ts(),
            ),
        )?;
        Ok(id)
    }

    pub fn create_problem(&self, problem: &NewProblem) -> StoreResult<String> {
        let id = new_id();
        self.conn().execute(
            "INSERT INTO problems(id, source_id, source_type, content_text, problem_index, created_at)
             VALUES(?, ?, ?, ?, ?, ?)",
            (
                &id,
                clean(&problem.source_id),
                problem.source_type.as_str(),
                &problem.content_text,
                problem.problem_index,
                now_ts(),
            ),
        )?;
        Ok(id)
    }

    pub fn create_worksheet(&self, ws: &NewWorksheet) -> StoreResult<String> {
        let ids: Vec<String> = ws
            .problem_ids
            .iter()
            .map(|s| clean(s))
            .filter(|s| !s.is_empty())
            .collect();
        let id = new_id();
        self.conn().execute(
            "INSERT INTO worksheets(id, title, grade, type_text, creator, problem_ids_json, created_at)
             VALUES(?, ?, ?, ?, ?, ?, ?)",
            (
                &id,
                clean(&ws.title),
                clean(&ws.grade),
                clean(&ws.type_text),
                clean(&ws.creator),
                serde_json::to_string(&ids)?,
                now_ts(),
            ),
        )?;
        Ok(id)
    }

    /// Like [`ProblemLookup::find_problem`] but an unknown id is an error.
    pub fn get_problem(&self, problem_id: &str) -> StoreResult<Problem> {
        self.find_problem(problem_id)?
            .ok_or(StoreError::NotFound("problem"))
    }
}

impl ProblemLookup for SqliteStore<'_> {
    fn find_problem(&self, problem_id: &str) -> StoreResult<Option<Problem>> {
        let row = self
            .conn()
            .query_row(
                "SELECT id, source_id, source_type, content_text, problem_index, created_at
                 FROM problems WHERE id = ?",
                [problem_id.trim()],
                |r| {
                    let source_type: String = r.get(2)?;
                    Ok(Problem {
                        id: r.get(0)?,
                        source_id: r.get(1)?,
                        source_type: SourceType::from_stored(&source_type),
                        content_text: r.get(3)?,
                        problem_index: r.get(4)?,
                        created_at: r.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }
}

impl TextbookLookup for SqliteStore<'_> {
    fn find_textbook(&self, textbook_id: &str) -> StoreResult<Option<Textbook>> {
        let row = self
            .conn()
            .query_row(
                "SELECT id, name, subject, major_unit, sub_unit, created_at
                 FROM textbooks WHERE id = ?",
                [textbook_id.trim()],
                |r| {
                    Ok(Textbook {
                        id: r.get(0)?,
                        name: r.get(1)?,
                        subject: r.get(2)?,
                        major_unit: r.get(3)?,
                        sub_unit: r.get(4)?,
                        created_at: r.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }
}

impl ExamLookup for SqliteStore<'_> {
    fn find_exam(&self, exam_id: &str) -> StoreResult<Option<Exam>> {
        let row = self
            .conn()
            .query_row(
                "SELECT id, school_name, grade, semester, exam_type, year, created_at
                 FROM exams WHERE id = ?",
                [exam_id.trim()],
                |r| {
                    Ok(Exam {
                        id: r.get(0)?,
                        school_name: r.get(1)?,
                        grade: r.get(2)?,
                        semester: r.get(3)?,
                        exam_type: r.get(4)?,
                        year: r.get(5)?,
                        created_at: r.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }
}

impl WorksheetLookup for SqliteStore<'_> {
    fn find_worksheet(&self, worksheet_id: &str) -> StoreResult<Option<Worksheet>> {
        let row = self
            .conn()
            .query_row(
                "SELECT id, title, grade, type_text, creator, problem_ids_json, created_at
                 FROM worksheets WHERE id = ?",
                [worksheet_id.trim()],
                |r| {
                    let ids_json: Option<String> = r.get(5)?;
                    Ok(Worksheet {
                        id: r.get(0)?,
                        title: r.get(1)?,
                        grade: r.get(2)?,
                        type_text: r.get(3)?,
                        creator: r.get(4)?,
                        problem_ids: decode_id_list(ids_json.as_deref()),
                        created_at: r.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_conn;

    #[test]
    fn problem_lookup_round_trips_source_fields() {
        let conn = test_conn();
        let store = SqliteStore::new(&conn);
        let exam_id = store
            .create_exam(&NewExam {
                school_name: "한빛고".into(),
                grade: "1학년".into(),
                semester: "1학기".into(),
                exam_type: "기말고사".into(),
                year: "2025".into(),
            })
            .expect("create exam");
        let pid = store
            .create_problem(&NewProblem {
                source_id: format!("  {}  ", exam_id),
                source_type: SourceType::Exam,
                content_text: "x^2 = 4".into(),
                problem_index: 3,
            })
            .expect("create problem");

        let p = store.find_problem(&pid).expect("query").expect("found");
        assert_eq!(p.source_type, SourceType::Exam);
        assert_eq!(p.source_ref(), Some(exam_id.as_str()));
        assert_eq!(p.problem_index, 3);

        let exam = store.find_exam(&exam_id).expect("query").expect("found");
        assert_eq!(exam.display_name().as_deref(), Some("한빛고 1학년 1학기 기말고사 2025"));
    }

    #[test]
    fn unknown_ids_are_absent_not_errors() {
        let conn = test_conn();
        let store = SqliteStore::new(&conn);
        assert!(store.find_problem("nope").expect("query").is_none());
        assert!(store.find_textbook("nope").expect("query").is_none());
        assert!(store.find_exam("").expect("query").is_none());
        assert!(store.find_worksheet("nope").expect("query").is_none());
        assert!(matches!(store.get_problem("nope"), Err(StoreError::NotFound("problem"))));
    }

    #[test]
    fn worksheet_keeps_problem_order_and_drops_blank_ids() {
        let conn = test_conn();
        let store = SqliteStore::new(&conn);
        let wid = store
            .create_worksheet(&NewWorksheet {
                title: " 1월 모의고사 ".into(),
                grade: "고1".into(),
                type_text: "내신기출".into(),
                creator: "kim".into(),
                problem_ids: vec!["p2".into(), " ".into(), "p1".into()],
            })
            .expect("create worksheet");
        let ws = store.find_worksheet(&wid).expect("query").expect("found");
        assert_eq!(ws.title, "1월 모의고사");
        assert_eq!(ws.problem_ids, vec!["p2".to_string(), "p1".to_string()]);
    }

    #[test]
    fn blank_sub_unit_is_stored_as_null() {
        let conn = test_conn();
        let store = SqliteStore::new(&conn);
        let id = store
            .create_textbook(&NewTextbook {
                name: "수학의 정석".into(),
                subject: "수학".into(),
                major_unit: "방정식".into(),
                sub_unit: Some("   ".into()),
            })
            .expect("create textbook");
        let tb = store.find_textbook(&id).expect("query").expect("found");
        assert_eq!(tb.name, "수학의 정석");
        assert_eq!(tb.sub_unit, None);
    }
}

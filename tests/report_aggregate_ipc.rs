mod test_support;

use serde_json::json;
use test_support::{request_ok, spawn_in_workspace, str_at, temp_workspace, Sidecar};

fn create_textbook(sc: &mut Sidecar, name: &str) -> String {
    let r = request_ok(sc, "textbooks.create", json!({ "name": name }));
    str_at(&r, "/textbookId").to_string()
}

fn create_problem(sc: &mut Sidecar, source_id: &str, source_type: &str) -> String {
    let r = request_ok(
        sc,
        "problems.create",
        json!({ "sourceId": source_id, "sourceType": source_type }),
    );
    str_at(&r, "/problemId").to_string()
}

fn create_worksheet(sc: &mut Sidecar, title: &str, type_text: &str) -> String {
    let r = request_ok(
        sc,
        "worksheets.create",
        json!({ "title": title, "typeText": type_text }),
    );
    str_at(&r, "/worksheetId").to_string()
}

fn assign_and_grade(
    sc: &mut Sidecar,
    worksheet_id: &str,
    student_id: &str,
    graded_at: &str,
    grading: serde_json::Value,
) {
    request_ok(
        sc,
        "assignments.assign",
        json!({ "worksheetIds": [worksheet_id], "studentIds": [student_id] }),
    );
    let mut params = grading;
    params["worksheetId"] = json!(worksheet_id);
    params["studentId"] = json!(student_id);
    params["gradedAt"] = json!(graded_at);
    let r = request_ok(sc, "assignments.grade", params);
    assert_eq!(r["updated"], json!(true));
}

fn aggregate(sc: &mut Sidecar, student_id: &str, start: &str, end: &str) -> serde_json::Value {
    let r = request_ok(
        sc,
        "report.aggregate",
        json!({ "studentId": student_id, "periodStart": start, "periodEnd": end }),
    );
    r["snapshot"].clone()
}

/// Ten answers, the first `correct` of them right.
fn answers(problem_ids: &[String], correct: usize) -> serde_json::Value {
    json!(problem_ids
        .iter()
        .enumerate()
        .map(|(i, pid)| json!({ "problem_id": pid, "is_correct": i < correct }))
        .collect::<Vec<_>>())
}

#[test]
fn textbook_attributed_answers_build_textbook_stats() {
    let ws = temp_workspace("tutord-report-a");
    let mut sc = spawn_in_workspace(ws.path());

    let tb = create_textbook(&mut sc, "수학의 정석");
    let pids: Vec<String> = (0..10).map(|_| create_problem(&mut sc, &tb, "textbook")).collect();
    let wid = create_worksheet(&mut sc, "1주차 복습", "교재");

    assign_and_grade(
        &mut sc,
        &wid,
        "s1",
        "2026-01-15T10:00:00",
        json!({
            "totalQuestions": 10,
            "correctCount": 7,
            "unitStats": { "이차방정식": { "total": 10, "correct": 7 } },
            "answers": answers(&pids, 7),
        }),
    );

    let snap = aggregate(&mut sc, "s1", "2026-01-01", "2026-01-31");
    assert_eq!(
        snap,
        json!({
            "total_worksheets": 1,
            "total_questions": 10,
            "total_correct": 7,
            "average_rate_pct": 70.0,
            "unit_stats": [
                { "unit_key": "이차방정식", "unit_label": "이차방정식", "total": 10, "correct": 7, "rate_pct": 70.0 }
            ],
            "textbook_stats": [ { "name": "수학의 정석", "correct": 7, "total": 10 } ],
            "exam_stats": []
        })
    );
}

#[test]
fn unresolved_answers_fall_back_to_exam_worksheet() {
    let ws = temp_workspace("tutord-report-b");
    let mut sc = spawn_in_workspace(ws.path());

    let wid = create_worksheet(&mut sc, "1월 모의고사", "학평 기출");
    let ghost_ids: Vec<String> = (0..10).map(|i| format!("ghost-{}", i)).collect();
    assign_and_grade(
        &mut sc,
        &wid,
        "s1",
        "2026-01-15T10:00:00",
        json!({
            "totalQuestions": 10,
            "correctCount": 7,
            "unitStats": { "이차방정식": { "total": 10, "correct": 7 } },
            "answers": answers(&ghost_ids, 7),
        }),
    );

    let snap = aggregate(&mut sc, "s1", "2026-01-01", "2026-01-31");
    assert_eq!(
        snap["exam_stats"],
        json!([{ "name": "1월 모의고사", "correct": 7, "total": 10 }])
    );
    assert_eq!(snap["textbook_stats"], json!([]));
    assert_eq!(snap["average_rate_pct"], json!(70.0));
}

#[test]
fn blank_student_yields_empty_snapshot() {
    let ws = temp_workspace("tutord-report-c");
    let mut sc = spawn_in_workspace(ws.path());
    let snap = aggregate(&mut sc, "  ", "2026-01-01", "2026-01-31");
    assert_eq!(snap["total_worksheets"], json!(0));
    assert_eq!(snap["unit_stats"], json!([]));
}

#[test]
fn only_graded_assignments_inside_the_period_count() {
    let ws = temp_workspace("tutord-report-period");
    let mut sc = spawn_in_workspace(ws.path());

    let tb = create_textbook(&mut sc, "개념원리");
    let pid = create_problem(&mut sc, &tb, "textbook");

    let w_jan = create_worksheet(&mut sc, "1월", "교재");
    let w_feb = create_worksheet(&mut sc, "2월", "교재");
    let w_open = create_worksheet(&mut sc, "미채점", "교재");
    let w_last = create_worksheet(&mut sc, "말일", "교재");

    let one = |correct: bool| {
        json!({
            "totalQuestions": 1,
            "correctCount": u64::from(correct),
            "answers": [{ "problemId": pid, "isCorrect": correct }],
        })
    };
    assign_and_grade(&mut sc, &w_jan, "s1", "2026-01-10T09:00:00", one(true));
    assign_and_grade(&mut sc, &w_last, "s1", "2026-01-31T23:59:59", one(false));
    assign_and_grade(&mut sc, &w_feb, "s1", "2026-02-01T00:00:00", one(true));
    request_ok(
        &mut sc,
        "assignments.assign",
        json!({ "worksheetIds": [w_open], "studentIds": ["s1"] }),
    );
    // Another student's work never leaks in.
    assign_and_grade(&mut sc, &w_jan, "s2", "2026-01-10T09:00:00", one(true));

    let snap = aggregate(&mut sc, "s1", "2026-01-01", "2026-01-31");
    assert_eq!(snap["total_worksheets"], json!(2));
    assert_eq!(snap["total_questions"], json!(2));
    assert_eq!(snap["total_correct"], json!(1));
    assert_eq!(snap["average_rate_pct"], json!(50.0));
    assert_eq!(
        snap["textbook_stats"],
        json!([{ "name": "개념원리", "correct": 1, "total": 2 }])
    );
}

#[test]
fn exam_problems_use_composed_exam_name_and_sort_by_volume() {
    let ws = temp_workspace("tutord-report-exam");
    let mut sc = spawn_in_workspace(ws.path());

    let exam = request_ok(
        &mut sc,
        "exams.create",
        json!({ "schoolName": "한빛고", "grade": "1학년", "semester": "1학기", "examType": "기말", "year": "2025" }),
    );
    let exam_id = str_at(&exam, "/examId").to_string();
    let tb = create_textbook(&mut sc, "쎈");

    let exam_pids: Vec<String> = (0..3).map(|_| create_problem(&mut sc, &exam_id, "exam")).collect();
    let tb_pids: Vec<String> = (0..2).map(|_| create_problem(&mut sc, &tb, "textbook")).collect();
    let untagged = create_problem(&mut sc, "", "textbook");

    let mut all = exam_pids.clone();
    all.extend(tb_pids.iter().cloned());
    all.push(untagged);

    let wid = create_worksheet(&mut sc, "혼합", "교재");
    assign_and_grade(
        &mut sc,
        &wid,
        "s1",
        "2026-03-02T14:30:00",
        json!({
            "totalQuestions": 6,
            "correctCount": 4,
            "unitStats": {
                "함수": { "total": 2, "correct": 1 },
                "수열": { "total": 4, "correct": 3 },
            },
            "answers": answers(&all, 4),
        }),
    );

    let snap = aggregate(&mut sc, "s1", "2026-03-01", "2026-03-31");
    assert_eq!(
        snap["exam_stats"],
        json!([{ "name": "한빛고 1학년 1학기 기말 2025", "correct": 3, "total": 3 }])
    );
    assert_eq!(
        snap["textbook_stats"],
        json!([{ "name": "쎈", "correct": 1, "total": 2 }])
    );
    assert_eq!(snap["unit_stats"][0]["unit_key"], json!("수열"));
    assert_eq!(snap["unit_stats"][0]["rate_pct"], json!(75.0));
    assert_eq!(snap["unit_stats"][1]["unit_key"], json!("함수"));
    assert_eq!(snap["average_rate_pct"], json!(66.7));
}

#[test]
fn huge_unit_totals_do_not_take_the_sidecar_down() {
    let ws = temp_workspace("tutord-report-huge");
    let mut sc = spawn_in_workspace(ws.path());

    for title in ["w1", "w2"] {
        let wid = create_worksheet(&mut sc, title, "교재");
        assign_and_grade(
            &mut sc,
            &wid,
            "s1",
            "2026-01-15T10:00:00",
            json!({
                "totalQuestions": 1,
                "correctCount": 0,
                "unitStats": { "A": { "total": u64::MAX, "correct": 0 } }
            }),
        );
    }

    let snap = aggregate(&mut sc, "s1", "2026-01-01", "2026-01-31");
    assert_eq!(snap["total_worksheets"], json!(2));
    assert_eq!(snap["unit_stats"][0]["total"], json!(u64::MAX));
    assert_eq!(snap["unit_stats"][0]["rate_pct"], json!(0.0));

    request_ok(&mut sc, "health", json!({}));
}

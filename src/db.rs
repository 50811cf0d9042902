use rusqlite::Connection;
use std::path::Path;

pub const DB_FILE_NAME: &str = "tutor.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS textbooks(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL DEFAULT '',
            subject TEXT NOT NULL DEFAULT '',
            major_unit TEXT NOT NULL DEFAULT '',
            sub_unit TEXT,
            created_at TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS exams(
            id TEXT PRIMARY KEY,
            school_name TEXT NOT NULL DEFAULT '',
            grade TEXT NOT NULL DEFAULT '',
            semester TEXT NOT NULL DEFAULT '',
            exam_type TEXT NOT NULL DEFAULT '',
            year TEXT NOT NULL DEFAULT '',
            created_at TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS problems(
            id TEXT PRIMARY KEY,
            source_id TEXT NOT NULL DEFAULT '',
            source_type TEXT NOT NULL DEFAULT 'textbook',
            content_text TEXT NOT NULL DEFAULT '',
            problem_index INTEGER NOT NULL DEFAULT 0,
            created_at TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_problems_source ON problems(source_type, source_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS worksheets(
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL DEFAULT '',
            grade TEXT NOT NULL DEFAULT '',
            type_text TEXT NOT NULL DEFAULT '',
            creator TEXT NOT NULL DEFAULT '',
            problem_ids_json TEXT NOT NULL DEFAULT '[]',
            created_at TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS worksheet_assignments(
            id TEXT PRIMARY KEY,
            worksheet_id TEXT NOT NULL,
            student_id TEXT NOT NULL,
            assigned_at TEXT NOT NULL,
            assigned_by TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'assigned',
            graded_at TEXT,
            total_questions INTEGER,
            correct_count INTEGER,
            answers_json TEXT,
            unit_stats_json TEXT,
            wrong_problem_ids_json TEXT,
            wrong_count INTEGER,
            UNIQUE(worksheet_id, student_id)
        )",
        [],
    )?;
    // Workspaces created before the wrong-note cycle existed lack these columns.
    ensure_wrongnote_columns(conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_wa_student_assigned ON worksheet_assignments(student_id, assigned_at)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_wa_student_graded ON worksheet_assignments(student_id, status, graded_at)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS saved_reports(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            period_start TEXT NOT NULL DEFAULT '',
            period_end TEXT NOT NULL DEFAULT '',
            comment TEXT NOT NULL DEFAULT '',
            created_at TEXT,
            snapshot_json TEXT NOT NULL DEFAULT '{}'
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_saved_reports_student_created ON saved_reports(student_id, created_at)",
        [],
    )?;

    Ok(())
}

fn ensure_wrongnote_columns(conn: &Connection) -> anyhow::Result<()> {
    let columns = [
        ("wrongnote_enabled", "INTEGER NOT NULL DEFAULT 0"),
        ("wrongnote_title", "TEXT"),
        ("wrongnote_updated_at", "TEXT"),
        ("wrongnote_status", "TEXT"),
        ("wrongnote_graded_at", "TEXT"),
        ("wrongnote_total_questions", "INTEGER"),
        ("wrongnote_correct_count", "INTEGER"),
        ("wrongnote_answers_json", "TEXT"),
        ("wrongnote_unit_stats_json", "TEXT"),
    ];
    for (name, decl) in columns {
        if !table_has_column(conn, "worksheet_assignments", name)? {
            conn.execute(
                &format!("ALTER TABLE worksheet_assignments ADD COLUMN {} {}", name, decl),
                [],
            )?;
        }
    }
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        init_schema(&conn).expect("first init");
        init_schema(&conn).expect("second init");
        assert!(table_has_column(&conn, "worksheet_assignments", "wrongnote_unit_stats_json")
            .expect("pragma"));
    }

    #[test]
    fn old_assignment_table_gains_wrongnote_columns() {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        conn.execute(
            "CREATE TABLE worksheet_assignments(
                id TEXT PRIMARY KEY,
                worksheet_id TEXT NOT NULL,
                student_id TEXT NOT NULL,
                assigned_at TEXT NOT NULL,
                assigned_by TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'assigned',
                graded_at TEXT,
                total_questions INTEGER,
                correct_count INTEGER,
                answers_json TEXT,
                unit_stats_json TEXT,
                wrong_problem_ids_json TEXT,
                wrong_count INTEGER,
                UNIQUE(worksheet_id, student_id)
            )",
            [],
        )
        .expect("create legacy table");
        assert!(!table_has_column(&conn, "worksheet_assignments", "wrongnote_enabled")
            .expect("pragma"));

        init_schema(&conn).expect("migrate");
        assert!(table_has_column(&conn, "worksheet_assignments", "wrongnote_enabled")
            .expect("pragma"));
        assert!(table_has_column(&conn, "worksheet_assignments", "wrongnote_graded_at")
            .expect("pragma"));
    }
}

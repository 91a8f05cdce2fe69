use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::path::Path;

pub const DB_FILE_NAME: &str = "school.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Create every table and index if missing, then bring older workspaces up to date.
pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            first_name TEXT NOT NULL,
            middle_name TEXT,
            surname TEXT NOT NULL,
            class_name TEXT NOT NULL,
            dob TEXT NOT NULL,
            gender TEXT NOT NULL,
            residence TEXT NOT NULL,
            guardian_name TEXT,
            guardian_phone TEXT,
            insurance_number TEXT,
            medical_details TEXT,
            registered_on TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_class ON students(class_name)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS teachers(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            subject TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS timetable_slots(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            class_name TEXT NOT NULL,
            day TEXT NOT NULL,
            day_order INTEGER NOT NULL,
            period INTEGER NOT NULL CHECK(period BETWEEN 1 AND 8),
            subject TEXT NOT NULL,
            teacher_id INTEGER,
            FOREIGN KEY(teacher_id) REFERENCES teachers(id) ON DELETE SET NULL,
            UNIQUE(class_name, day, period)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_timetable_slots_teacher
         ON timetable_slots(teacher_id, day, period)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subject_assignments(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            class_name TEXT NOT NULL,
            subject TEXT NOT NULL,
            teacher_id INTEGER NOT NULL,
            FOREIGN KEY(teacher_id) REFERENCES teachers(id) ON DELETE CASCADE,
            UNIQUE(class_name, subject)
        )",
        [],
    )?;

    // Amounts are integer cents. student_id NULL is the class template row.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS fees(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            class_name TEXT NOT NULL,
            student_id TEXT,
            fee_amount INTEGER NOT NULL,
            paid_amount INTEGER NOT NULL DEFAULT 0,
            date_paid TEXT,
            collected_by TEXT,
            FOREIGN KEY(student_id) REFERENCES students(id) ON DELETE CASCADE,
            UNIQUE(class_name, student_id)
        )",
        [],
    )?;
    // SQLite treats NULLs as distinct under UNIQUE, so templates need their own index.
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_fees_class_template
         ON fees(class_name) WHERE student_id IS NULL",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_fees_student ON fees(student_id)",
        [],
    )?;

    // One mark per person per day; the first mark of the day stands.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance(
            date TEXT NOT NULL,
            student_id TEXT NOT NULL,
            present INTEGER NOT NULL,
            PRIMARY KEY(date, student_id),
            FOREIGN KEY(student_id) REFERENCES students(id) ON DELETE CASCADE
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS teacher_attendance(
            date TEXT NOT NULL,
            teacher_id INTEGER NOT NULL,
            present INTEGER NOT NULL,
            PRIMARY KEY(date, teacher_id),
            FOREIGN KEY(teacher_id) REFERENCES teachers(id) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS results(
            student_id TEXT NOT NULL,
            subject TEXT NOT NULL,
            score INTEGER NOT NULL CHECK(score BETWEEN 0 AND 100),
            PRIMARY KEY(student_id, subject),
            FOREIGN KEY(student_id) REFERENCES students(id) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS activities(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            activity TEXT NOT NULL,
            date TEXT NOT NULL,
            description TEXT,
            UNIQUE(date, activity)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS class_teachers(
            class_name TEXT NOT NULL,
            teacher_id INTEGER NOT NULL,
            PRIMARY KEY(class_name, teacher_id),
            FOREIGN KEY(teacher_id) REFERENCES teachers(id) ON DELETE CASCADE
        )",
        [],
    )?;

    // Month is YYYY-MM; amount in cents like the fee ledger.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS salary(
            teacher_id INTEGER NOT NULL,
            month TEXT NOT NULL,
            amount INTEGER NOT NULL,
            paid_on TEXT NOT NULL,
            PRIMARY KEY(teacher_id, month),
            FOREIGN KEY(teacher_id) REFERENCES teachers(id) ON DELETE CASCADE
        )",
        [],
    )?;

    Ok(())
}

/// Begin a write transaction that takes the database write lock up front, so a
/// read-check-write sequence cannot interleave with another writer.
pub fn begin_write(conn: &Connection) -> rusqlite::Result<Transaction<'_>> {
    Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
}

#[cfg(test)]
pub fn count_rows(conn: &Connection, table: &str) -> rusqlite::Result<i64> {
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| {
        r.get(0)
    })
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

pub fn settings_set_json(conn: &Connection, key: &str, value: &serde_json::Value) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}

#[cfg(test)]
pub fn test_conn() -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    init_schema(&conn).expect("init schema");
    conn
}

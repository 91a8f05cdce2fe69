//! Exam results: one score per student per subject.

use crate::error::SchoolResult;
use crate::model::SubjectResult;
use crate::roster;
use crate::validate;
use rusqlite::Connection;

/// Record a score, replacing any earlier score for the same subject.
pub fn record_result(conn: &Connection, student_id: &str, subject: &str, score: i64) -> SchoolResult<SubjectResult> {
    let subject = validate::subject(subject)?;
    let score = validate::score(score)?;
    roster::require_student(conn, student_id)?;
    conn.execute(
        "INSERT INTO results(student_id, subject, score) VALUES(?, ?, ?)
         ON CONFLICT(student_id, subject) DO UPDATE SET score = excluded.score",
        (student_id, &subject, score),
    )?;
    tracing::info!(student = %student_id, subject = %subject, score, "result recorded");
    Ok(SubjectResult {
        student_id: student_id.to_string(),
        subject,
        score,
    })
}

pub fn list_results(
    conn: &Connection,
    student_id: Option<&str>,
    subject: Option<&str>,
) -> SchoolResult<Vec<SubjectResult>> {
    let mut stmt = conn.prepare(
        "SELECT student_id, subject, score FROM results
         WHERE (?1 IS NULL OR student_id = ?1) AND (?2 IS NULL OR subject = ?2)
         ORDER BY student_id, subject",
    )?;
    let rows = stmt
        .query_map((student_id, subject), |r| {
            Ok(SubjectResult {
                student_id: r.get(0)?,
                subject: r.get(1)?,
                score: r.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

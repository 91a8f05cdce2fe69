//! Daily attendance registers for students and teachers.
//!
//! A mark is taken once per person per day. Marking someone who already has
//! a mark for that day leaves the first mark in place and is reported back as
//! `already_marked`.

use crate::db;
use crate::error::{SchoolError, SchoolResult};
use crate::model::{StudentAttendance, TeacherAttendance, TeacherId};
use crate::roster;
use crate::validate;
use chrono::NaiveDate;
use rusqlite::{Connection, Transaction};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkOutcome {
    pub recorded: usize,
    pub already_marked: usize,
}

impl MarkOutcome {
    fn count(&mut self, inserted: bool) {
        if inserted {
            self.recorded += 1;
        } else {
            self.already_marked += 1;
        }
    }
}

fn insert_student_mark(
    tx: &Transaction<'_>,
    student_id: &str,
    date: NaiveDate,
    present: bool,
) -> SchoolResult<bool> {
    let changed = tx.execute(
        "INSERT OR IGNORE INTO attendance(date, student_id, present) VALUES(?, ?, ?)",
        (date, student_id, present),
    )?;
    Ok(changed == 1)
}

pub fn mark_student(
    conn: &Connection,
    student_id: &str,
    date: NaiveDate,
    present: bool,
) -> SchoolResult<MarkOutcome> {
    mark_students(conn, &[student_id.to_string()], date, present)
}

/// Mark every listed student. Unknown ids abort the whole batch.
pub fn mark_students(
    conn: &Connection,
    student_ids: &[String],
    date: NaiveDate,
    present: bool,
) -> SchoolResult<MarkOutcome> {
    if student_ids.is_empty() {
        return Err(SchoolError::invalid("select at least one student"));
    }
    let tx = db::begin_write(conn)?;
    let mut outcome = MarkOutcome::default();
    for id in student_ids {
        roster::require_student(&tx, id)?;
        outcome.count(insert_student_mark(&tx, id, date, present)?);
    }
    tx.commit()?;
    tracing::info!(%date, present, recorded = outcome.recorded, skipped = outcome.already_marked, "student attendance marked");
    Ok(outcome)
}

/// Mark everyone currently enrolled in `class_name`.
pub fn mark_class(
    conn: &Connection,
    class_name: &str,
    date: NaiveDate,
    present: bool,
) -> SchoolResult<MarkOutcome> {
    let class_name = validate::class_name(class_name)?;
    let tx = db::begin_write(conn)?;
    let ids: Vec<String> = {
        let mut stmt = tx.prepare("SELECT id FROM students WHERE class_name = ? ORDER BY id")?;
        let rows = stmt
            .query_map([&class_name], |r| r.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };
    if ids.is_empty() {
        return Err(SchoolError::not_found("class", &class_name));
    }
    let mut outcome = MarkOutcome::default();
    for id in &ids {
        outcome.count(insert_student_mark(&tx, id, date, present)?);
    }
    tx.commit()?;
    tracing::info!(class = %class_name, %date, present, recorded = outcome.recorded, "class attendance marked");
    Ok(outcome)
}

pub fn mark_teachers(
    conn: &Connection,
    teacher_ids: &[TeacherId],
    date: NaiveDate,
    present: bool,
) -> SchoolResult<MarkOutcome> {
    if teacher_ids.is_empty() {
        return Err(SchoolError::invalid("select at least one teacher"));
    }
    let tx = db::begin_write(conn)?;
    let mut outcome = MarkOutcome::default();
    for &id in teacher_ids {
        roster::require_teacher(&tx, id)?;
        let changed = tx.execute(
            "INSERT OR IGNORE INTO teacher_attendance(date, teacher_id, present) VALUES(?, ?, ?)",
            (date, id, present),
        )?;
        outcome.count(changed == 1);
    }
    tx.commit()?;
    tracing::info!(%date, present, recorded = outcome.recorded, "teacher attendance marked");
    Ok(outcome)
}

/// The register for `date`, optionally narrowed to one class.
pub fn student_attendance(
    conn: &Connection,
    date: NaiveDate,
    class_name: Option<&str>,
) -> SchoolResult<Vec<StudentAttendance>> {
    let mut stmt = conn.prepare(
        "SELECT a.date, s.id, s.first_name, s.middle_name, s.surname, s.class_name, a.present
         FROM attendance a JOIN students s ON s.id = a.student_id
         WHERE a.date = ?1 AND (?2 IS NULL OR s.class_name = ?2)
         ORDER BY s.class_name, s.surname, s.first_name",
    )?;
    let rows = stmt
        .query_map((date, class_name), |r| {
            let first: String = r.get(2)?;
            let middle: Option<String> = r.get(3)?;
            let surname: String = r.get(4)?;
            let full_name = match middle {
                Some(m) => format!("{} {} {}", first, m, surname),
                None => format!("{} {}", first, surname),
            };
            Ok(StudentAttendance {
                date: r.get(0)?,
                student_id: r.get(1)?,
                full_name,
                class_name: r.get(5)?,
                present: r.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn teacher_attendance(conn: &Connection, date: NaiveDate) -> SchoolResult<Vec<TeacherAttendance>> {
    let mut stmt = conn.prepare(
        "SELECT a.date, t.id, t.name, a.present
         FROM teacher_attendance a JOIN teachers t ON t.id = a.teacher_id
         WHERE a.date = ?
         ORDER BY t.id",
    )?;
    let rows = stmt
        .query_map([date], |r| {
            Ok(TeacherAttendance {
                date: r.get(0)?,
                teacher_id: r.get(1)?,
                name: r.get(2)?,
                present: r.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    pub date: NaiveDate,
    pub total_students: i64,
    pub present: i64,
    pub absent: i64,
    pub unmarked: i64,
}

/// Head counts for the day across the whole school.
pub fn daily_summary(conn: &Connection, date: NaiveDate) -> SchoolResult<AttendanceSummary> {
    let (total_students, present, absent): (i64, i64, i64) = conn.query_row(
        "SELECT
           (SELECT COUNT(*) FROM students),
           (SELECT COUNT(*) FROM attendance WHERE date = ?1 AND present = 1),
           (SELECT COUNT(*) FROM attendance WHERE date = ?1 AND present = 0)",
        [date],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
    )?;
    Ok(AttendanceSummary {
        date,
        total_students,
        present,
        absent,
        unmarked: (total_students - present - absent).max(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{count_rows, test_conn};
    use crate::roster::fixtures::{add_student, add_teacher};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn first_mark_of_the_day_stands() {
        let conn = test_conn();
        let s = add_student(&conn, "Kofi", "B2");
        let first = mark_student(&conn, &s.id, day(2), true).unwrap();
        assert_eq!(first, MarkOutcome { recorded: 1, already_marked: 0 });

        let again = mark_student(&conn, &s.id, day(2), false).unwrap();
        assert_eq!(again, MarkOutcome { recorded: 0, already_marked: 1 });
        let register = student_attendance(&conn, day(2), None).unwrap();
        assert_eq!(register.len(), 1);
        assert!(register[0].present);
        assert_eq!(register[0].full_name, "Kofi Mensah");

        mark_student(&conn, &s.id, day(3), false).unwrap();
        assert_eq!(count_rows(&conn, "attendance").unwrap(), 2);
    }

    #[test]
    fn batch_with_unknown_student_writes_nothing() {
        let conn = test_conn();
        let a = add_student(&conn, "Ama", "B1");
        let ids = vec![a.id.clone(), "ghost".to_string()];
        assert!(matches!(
            mark_students(&conn, &ids, day(2), true),
            Err(SchoolError::NotFound { entity: "student", .. })
        ));
        assert_eq!(count_rows(&conn, "attendance").unwrap(), 0);
        assert!(matches!(
            mark_students(&conn, &[], day(2), true),
            Err(SchoolError::InvalidInput(_))
        ));
    }

    #[test]
    fn class_marking_covers_enrolled_students_only() {
        let conn = test_conn();
        let a = add_student(&conn, "Ama", "B1");
        add_student(&conn, "Esi", "B1");
        add_student(&conn, "Kojo", "B2");
        mark_student(&conn, &a.id, day(4), false).unwrap();

        let outcome = mark_class(&conn, "B1", day(4), true).unwrap();
        assert_eq!(outcome, MarkOutcome { recorded: 1, already_marked: 1 });
        assert_eq!(student_attendance(&conn, day(4), Some("B1")).unwrap().len(), 2);
        assert!(student_attendance(&conn, day(4), Some("B2")).unwrap().is_empty());
        assert!(matches!(
            mark_class(&conn, "Z9", day(4), true),
            Err(SchoolError::NotFound { entity: "class", .. })
        ));

        let summary = daily_summary(&conn, day(4)).unwrap();
        assert_eq!(
            (summary.total_students, summary.present, summary.absent, summary.unmarked),
            (3, 1, 1, 1)
        );
    }

    #[test]
    fn teacher_register() {
        let conn = test_conn();
        let t = add_teacher(&conn, "Ama", "Maths");
        let u = add_teacher(&conn, "Yaw", "English");
        let outcome = mark_teachers(&conn, &[t.id, u.id, t.id], day(5), true).unwrap();
        assert_eq!(outcome, MarkOutcome { recorded: 2, already_marked: 1 });
        assert!(mark_teachers(&conn, &[99], day(5), true).is_err());
        let register = teacher_attendance(&conn, day(5)).unwrap();
        assert_eq!(register.len(), 2);
        assert_eq!(register[1].name, "Yaw");
    }
}

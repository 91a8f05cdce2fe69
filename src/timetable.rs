//! Timetable slots, subject and class teacher assignments, and the teacher
//! double-booking check.

use crate::db;
use crate::error::{conflict_on_unique, ConflictKind, SchoolError, SchoolResult};
use crate::model::{ClassTeacher, Day, Period, SubjectAssignment, Teacher, TeacherId, TimetableSlot};
use crate::roster;
use crate::validate;
use rusqlite::{Connection, OptionalExtension, Row};

/// Whether `teacher_id` already teaches a *different* class at `day`/`period`.
///
/// A slot without a teacher never conflicts. A match in the same class is the
/// row being (re)saved and does not count.
pub fn has_conflict(
    conn: &Connection,
    class_name: &str,
    day: Day,
    period: Period,
    teacher_id: Option<TeacherId>,
) -> SchoolResult<bool> {
    teacher_busy(conn, class_name, day, period, teacher_id, None)
}

/// `has_conflict`, ignoring the slot `except` (the row being edited).
fn teacher_busy(
    conn: &Connection,
    class_name: &str,
    day: Day,
    period: Period,
    teacher_id: Option<TeacherId>,
    except: Option<i64>,
) -> SchoolResult<bool> {
    let Some(teacher_id) = teacher_id else {
        return Ok(false);
    };
    let hit: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM timetable_slots
             WHERE day = ? AND period = ? AND teacher_id = ? AND class_name <> ?
               AND (? IS NULL OR id <> ?)
             LIMIT 1",
            (day, period, teacher_id, class_name, except, except),
            |r| r.get(0),
        )
        .optional()?;
    Ok(hit.is_some())
}

#[derive(Debug, Clone)]
pub struct SlotInput {
    pub class_name: String,
    pub day: Day,
    pub period: Period,
    pub subject: String,
    pub teacher_id: Option<TeacherId>,
}

#[derive(Debug, Clone, Default)]
pub struct SlotFilter {
    pub class_name: Option<String>,
    pub day: Option<Day>,
    pub teacher_id: Option<TeacherId>,
}

fn slot_from_row(r: &Row<'_>) -> rusqlite::Result<TimetableSlot> {
    Ok(TimetableSlot {
        id: r.get(0)?,
        class_name: r.get(1)?,
        day: r.get(2)?,
        period: r.get(3)?,
        subject: r.get(4)?,
        teacher_id: r.get(5)?,
    })
}

/// Shared checks for add/update, run inside the caller's write transaction.
fn check_slot(conn: &Connection, input: &SlotInput, except: Option<i64>) -> SchoolResult<(String, String)> {
    let class_name = validate::class_name(&input.class_name)?;
    let subject = validate::subject(&input.subject)?;
    if let Some(tid) = input.teacher_id {
        roster::require_teacher(conn, tid)?;
    }
    if teacher_busy(conn, &class_name, input.day, input.period, input.teacher_id, except)? {
        return Err(SchoolError::Conflict(ConflictKind::TeacherDoubleBooked));
    }
    Ok((class_name, subject))
}

pub fn add_slot(conn: &Connection, input: &SlotInput) -> SchoolResult<TimetableSlot> {
    let tx = db::begin_write(conn)?;
    let (class_name, subject) = check_slot(&tx, input, None)?;
    tx.execute(
        "INSERT INTO timetable_slots(class_name, day, day_order, period, subject, teacher_id)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            &class_name,
            input.day,
            input.day.ordinal(),
            input.period,
            &subject,
            input.teacher_id,
        ),
    )
    .map_err(conflict_on_unique(ConflictKind::DuplicateSlot))?;
    let id = tx.last_insert_rowid();
    tx.commit()?;
    tracing::info!(slot_id = id, class = %class_name, day = %input.day, period = input.period.get(), "timetable slot added");
    Ok(TimetableSlot {
        id,
        class_name,
        day: input.day,
        period: input.period,
        subject,
        teacher_id: input.teacher_id,
    })
}

pub fn update_slot(conn: &Connection, slot_id: i64, input: &SlotInput) -> SchoolResult<TimetableSlot> {
    let tx = db::begin_write(conn)?;
    if get_slot(&tx, slot_id)?.is_none() {
        return Err(SchoolError::not_found("timetable slot", slot_id));
    }
    let (class_name, subject) = check_slot(&tx, input, Some(slot_id))?;
    tx.execute(
        "UPDATE timetable_slots
         SET class_name = ?, day = ?, day_order = ?, period = ?, subject = ?, teacher_id = ?
         WHERE id = ?",
        (
            &class_name,
            input.day,
            input.day.ordinal(),
            input.period,
            &subject,
            input.teacher_id,
            slot_id,
        ),
    )
    .map_err(conflict_on_unique(ConflictKind::DuplicateSlot))?;
    tx.commit()?;
    tracing::info!(slot_id, class = %class_name, "timetable slot updated");
    Ok(TimetableSlot {
        id: slot_id,
        class_name,
        day: input.day,
        period: input.period,
        subject,
        teacher_id: input.teacher_id,
    })
}

pub fn get_slot(conn: &Connection, slot_id: i64) -> SchoolResult<Option<TimetableSlot>> {
    Ok(conn
        .query_row(
            "SELECT id, class_name, day, period, subject, teacher_id
             FROM timetable_slots WHERE id = ?",
            [slot_id],
            slot_from_row,
        )
        .optional()?)
}

pub fn list_slots(conn: &Connection, filter: &SlotFilter) -> SchoolResult<Vec<TimetableSlot>> {
    let mut stmt = conn.prepare(
        "SELECT id, class_name, day, period, subject, teacher_id
         FROM timetable_slots
         WHERE (?1 IS NULL OR class_name = ?1)
           AND (?2 IS NULL OR day = ?2)
           AND (?3 IS NULL OR teacher_id = ?3)
         ORDER BY class_name, day_order, period",
    )?;
    let rows = stmt
        .query_map(
            (filter.class_name.as_deref(), filter.day, filter.teacher_id),
            slot_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn remove_slot(conn: &Connection, slot_id: i64) -> SchoolResult<()> {
    let changed = conn.execute("DELETE FROM timetable_slots WHERE id = ?", [slot_id])?;
    if changed == 0 {
        return Err(SchoolError::not_found("timetable slot", slot_id));
    }
    tracing::info!(slot_id, "timetable slot removed");
    Ok(())
}

fn assignment_from_row(r: &Row<'_>) -> rusqlite::Result<SubjectAssignment> {
    Ok(SubjectAssignment {
        id: r.get(0)?,
        class_name: r.get(1)?,
        subject: r.get(2)?,
        teacher_id: r.get(3)?,
    })
}

pub fn assign_subject_teacher(
    conn: &Connection,
    class_name: &str,
    subject: &str,
    teacher_id: TeacherId,
) -> SchoolResult<SubjectAssignment> {
    let class_name = validate::class_name(class_name)?;
    let subject = validate::subject(subject)?;
    roster::require_teacher(conn, teacher_id)?;
    conn.execute(
        "INSERT INTO subject_assignments(class_name, subject, teacher_id) VALUES(?, ?, ?)",
        (&class_name, &subject, teacher_id),
    )
    .map_err(conflict_on_unique(ConflictKind::DuplicateAssignment))?;
    let id = conn.last_insert_rowid();
    tracing::info!(assignment_id = id, class = %class_name, subject = %subject, teacher_id, "subject teacher assigned");
    Ok(SubjectAssignment {
        id,
        class_name,
        subject,
        teacher_id,
    })
}

pub fn update_subject_assignment(
    conn: &Connection,
    assignment_id: i64,
    class_name: &str,
    subject: &str,
    teacher_id: TeacherId,
) -> SchoolResult<SubjectAssignment> {
    let class_name = validate::class_name(class_name)?;
    let subject = validate::subject(subject)?;
    roster::require_teacher(conn, teacher_id)?;
    let changed = conn
        .execute(
            "UPDATE subject_assignments SET class_name = ?, subject = ?, teacher_id = ? WHERE id = ?",
            (&class_name, &subject, teacher_id, assignment_id),
        )
        .map_err(conflict_on_unique(ConflictKind::DuplicateAssignment))?;
    if changed == 0 {
        return Err(SchoolError::not_found("subject assignment", assignment_id));
    }
    Ok(SubjectAssignment {
        id: assignment_id,
        class_name,
        subject,
        teacher_id,
    })
}

pub fn list_assignments(conn: &Connection, class_name: Option<&str>) -> SchoolResult<Vec<SubjectAssignment>> {
    let mut stmt = conn.prepare(
        "SELECT id, class_name, subject, teacher_id
         FROM subject_assignments
         WHERE (?1 IS NULL OR class_name = ?1)
         ORDER BY class_name, subject",
    )?;
    let rows = stmt
        .query_map([class_name], assignment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Teachers of `subject` who do not already hold it for `class_name`.
pub fn available_teachers_for_subject(
    conn: &Connection,
    subject: &str,
    class_name: &str,
) -> SchoolResult<Vec<Teacher>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.name, t.subject, t.email, t.phone
         FROM teachers t
         WHERE t.subject = ?1
           AND t.id NOT IN (
             SELECT sa.teacher_id FROM subject_assignments sa
             WHERE sa.class_name = ?2 AND sa.subject = ?1
           )
         ORDER BY t.id",
    )?;
    let rows = stmt
        .query_map((subject.trim(), class_name.trim()), |r| {
            Ok(Teacher {
                id: r.get(0)?,
                name: r.get(1)?,
                subject: r.get(2)?,
                email: r.get(3)?,
                phone: r.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Link a teacher to a class as one of its class teachers.
pub fn assign_class_teacher(
    conn: &Connection,
    class_name: &str,
    teacher_id: TeacherId,
) -> SchoolResult<ClassTeacher> {
    let class_name = validate::class_name(class_name)?;
    roster::require_teacher(conn, teacher_id)?;
    conn.execute(
        "INSERT INTO class_teachers(class_name, teacher_id) VALUES(?, ?)",
        (&class_name, teacher_id),
    )
    .map_err(conflict_on_unique(ConflictKind::DuplicateClassTeacher))?;
    tracing::info!(class = %class_name, teacher_id, "class teacher assigned");
    Ok(ClassTeacher {
        class_name,
        teacher_id,
    })
}

pub fn list_class_teachers(conn: &Connection, class_name: Option<&str>) -> SchoolResult<Vec<ClassTeacher>> {
    let mut stmt = conn.prepare(
        "SELECT class_name, teacher_id FROM class_teachers
         WHERE (?1 IS NULL OR class_name = ?1)
         ORDER BY class_name, teacher_id",
    )?;
    let rows = stmt
        .query_map([class_name], |r| {
            Ok(ClassTeacher {
                class_name: r.get(0)?,
                teacher_id: r.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn remove_class_teacher(conn: &Connection, class_name: &str, teacher_id: TeacherId) -> SchoolResult<()> {
    let changed = conn.execute(
        "DELETE FROM class_teachers WHERE class_name = ? AND teacher_id = ?",
        (class_name.trim(), teacher_id),
    )?;
    if changed == 0 {
        return Err(SchoolError::not_found("class teacher", format!("{}/{}", class_name.trim(), teacher_id)));
    }
    Ok(())
}

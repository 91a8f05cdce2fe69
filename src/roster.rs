use crate::error::{SchoolError, SchoolResult};
use crate::model::{Student, Teacher, TeacherId};
use crate::validate;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentInput {
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub surname: String,
    pub class_name: String,
    pub dob: NaiveDate,
    pub gender: String,
    pub residence: String,
    #[serde(default)]
    pub guardian_name: Option<String>,
    #[serde(default)]
    pub guardian_phone: Option<String>,
    #[serde(default)]
    pub insurance_number: Option<String>,
    #[serde(default)]
    pub has_medical_condition: bool,
    #[serde(default)]
    pub medical_details: Option<String>,
}

/// Field values after trimming and validation, ready to bind.
struct CleanStudent {
    first_name: String,
    middle_name: Option<String>,
    surname: String,
    class_name: String,
    dob: NaiveDate,
    gender: String,
    residence: String,
    guardian_name: Option<String>,
    guardian_phone: Option<String>,
    insurance_number: Option<String>,
    medical_details: Option<String>,
}

fn clean_student(input: &StudentInput, today: NaiveDate) -> SchoolResult<CleanStudent> {
    let first_name = validate::name_part(&input.first_name, "first name")?;
    let middle_name = validate::optional_text(input.middle_name.as_deref());
    if let Some(m) = middle_name.as_deref() {
        validate::name_part(m, "middle name")?;
    }
    let surname = validate::name_part(&input.surname, "surname")?;
    let class_name = validate::class_name(&input.class_name)?;
    let dob = validate::student_dob(input.dob, today)?;
    let gender = input.gender.trim().to_string();
    if !validate::GENDERS.contains(&gender.as_str()) {
        return Err(SchoolError::invalid("gender must be Male, Female or Other"));
    }
    let residence = input.residence.trim().to_string();
    if residence.is_empty() {
        return Err(SchoolError::invalid("residence required"));
    }
    let guardian_name = validate::optional_text(input.guardian_name.as_deref());
    if let Some(g) = guardian_name.as_deref() {
        validate::name_part(g, "guardian name")?;
    }
    let guardian_phone = validate::optional_text(input.guardian_phone.as_deref());
    if guardian_phone.as_deref().is_some_and(|p| !validate::is_valid_phone(p)) {
        return Err(SchoolError::invalid("invalid guardian phone"));
    }
    let insurance_number = validate::optional_text(input.insurance_number.as_deref());
    if insurance_number
        .as_deref()
        .is_some_and(|n| !validate::is_valid_insurance_number(n))
    {
        return Err(SchoolError::invalid("invalid insurance number"));
    }
    let medical_details = if input.has_medical_condition {
        let d = validate::optional_text(input.medical_details.as_deref());
        if d.is_none() {
            return Err(SchoolError::invalid(
                "medical details required if condition exists",
            ));
        }
        d
    } else {
        None
    };
    Ok(CleanStudent {
        first_name,
        middle_name,
        surname,
        class_name,
        dob,
        gender,
        residence,
        guardian_name,
        guardian_phone,
        insurance_number,
        medical_details,
    })
}

const STUDENT_COLUMNS: &str = "id, first_name, middle_name, surname, class_name, dob, gender,
     residence, guardian_name, guardian_phone, insurance_number, medical_details, registered_on,
     updated_at";

fn student_from_row(r: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: r.get(0)?,
        first_name: r.get(1)?,
        middle_name: r.get(2)?,
        surname: r.get(3)?,
        class_name: r.get(4)?,
        dob: r.get(5)?,
        gender: r.get(6)?,
        residence: r.get(7)?,
        guardian_name: r.get(8)?,
        guardian_phone: r.get(9)?,
        insurance_number: r.get(10)?,
        medical_details: r.get(11)?,
        registered_on: r.get(12)?,
        updated_at: r.get(13)?,
    })
}

pub fn create_student(conn: &Connection, input: &StudentInput, today: NaiveDate) -> SchoolResult<Student> {
    let s = clean_student(input, today)?;
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO students(
           id, first_name, middle_name, surname, class_name, dob, gender, residence,
           guardian_name, guardian_phone, insurance_number, medical_details, registered_on)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            id,
            s.first_name,
            s.middle_name,
            s.surname,
            s.class_name,
            s.dob,
            s.gender,
            s.residence,
            s.guardian_name,
            s.guardian_phone,
            s.insurance_number,
            s.medical_details,
            today,
        ],
    )?;
    tracing::info!(student_id = %id, class = %s.class_name, "student created");
    require_student(conn, &id)
}

pub fn get_student(conn: &Connection, student_id: &str) -> SchoolResult<Option<Student>> {
    let sql = format!("SELECT {} FROM students WHERE id = ?", STUDENT_COLUMNS);
    Ok(conn
        .query_row(&sql, [student_id], student_from_row)
        .optional()?)
}

pub fn require_student(conn: &Connection, student_id: &str) -> SchoolResult<Student> {
    get_student(conn, student_id)?.ok_or_else(|| SchoolError::not_found("student", student_id))
}

pub fn list_students(conn: &Connection, class_name: Option<&str>) -> SchoolResult<Vec<Student>> {
    let sql = format!(
        "SELECT {} FROM students
         WHERE (?1 IS NULL OR class_name = ?1)
         ORDER BY class_name, surname, first_name",
        STUDENT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([class_name], student_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Overwrite a student's profile. The id is stable, so renames touch one row.
pub fn update_student(
    conn: &Connection,
    student_id: &str,
    input: &StudentInput,
    today: NaiveDate,
) -> SchoolResult<Student> {
    let s = clean_student(input, today)?;
    let changed = conn.execute(
        "UPDATE students SET
           first_name = ?, middle_name = ?, surname = ?, class_name = ?, dob = ?, gender = ?,
           residence = ?, guardian_name = ?, guardian_phone = ?, insurance_number = ?,
           medical_details = ?, updated_at = datetime('now')
         WHERE id = ?",
        rusqlite::params![
            s.first_name,
            s.middle_name,
            s.surname,
            s.class_name,
            s.dob,
            s.gender,
            s.residence,
            s.guardian_name,
            s.guardian_phone,
            s.insurance_number,
            s.medical_details,
            student_id,
        ],
    )?;
    if changed == 0 {
        return Err(SchoolError::not_found("student", student_id));
    }
    tracing::info!(student_id, "student updated");
    require_student(conn, student_id)
}

/// Remove a student; their fee records go with them.
pub fn delete_student(conn: &Connection, student_id: &str) -> SchoolResult<()> {
    let changed = conn.execute("DELETE FROM students WHERE id = ?", [student_id])?;
    if changed == 0 {
        return Err(SchoolError::not_found("student", student_id));
    }
    tracing::info!(student_id, "student deleted");
    Ok(())
}

/// Students and teachers matching a free-text dashboard query.
#[derive(Debug, Clone, Default)]
pub struct ProfileMatches {
    pub students: Vec<Student>,
    pub teachers: Vec<Teacher>,
}

/// `%q%` for LIKE, with the wildcard characters in `q` escaped by `\`.
fn like_pattern(q: &str) -> String {
    let mut out = String::with_capacity(q.len() + 2);
    out.push('%');
    for c in q.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

fn query_students(conn: &Connection, filter: &str, arg: &str) -> SchoolResult<Vec<Student>> {
    let sql = format!(
        "SELECT {} FROM students WHERE {} ORDER BY class_name, surname, first_name",
        STUDENT_COLUMNS, filter
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([arg], student_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Look students up by exact first name, falling back to a case-insensitive
/// substring of the full name. Teachers match by id when the query is a
/// number, otherwise by name substring.
pub fn search_profiles(conn: &Connection, query: &str) -> SchoolResult<ProfileMatches> {
    let q = query.trim();
    if q.is_empty() {
        return Err(SchoolError::invalid("search query required"));
    }

    let mut students = query_students(conn, "first_name = ?1", q)?;
    if students.is_empty() {
        students = query_students(
            conn,
            "(first_name || ' ' || COALESCE(middle_name || ' ', '') || surname) LIKE ?1 ESCAPE '\\'",
            &like_pattern(q),
        )?;
    }

    let teachers = match q.parse::<TeacherId>() {
        Ok(id) => get_teacher(conn, id)?.into_iter().collect(),
        Err(_) => {
            let mut stmt = conn.prepare(
                "SELECT id, name, subject, email, phone FROM teachers
                 WHERE name LIKE ?1 ESCAPE '\\'
                 ORDER BY id",
            )?;
            let rows = stmt
                .query_map([like_pattern(q)], teacher_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
    };
    tracing::debug!(query = q, students = students.len(), teachers = teachers.len(), "profile search");
    Ok(ProfileMatches { students, teachers })
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherInput {
    pub name: String,
    pub subject: String,
    pub email: String,
    pub phone: String,
}

fn clean_teacher(input: &TeacherInput) -> SchoolResult<TeacherInput> {
    let name = validate::name_part(&input.name, "name")?;
    let subject = validate::subject(&input.subject)?;
    let email = input.email.trim().to_string();
    if !validate::is_valid_email(&email) {
        return Err(SchoolError::invalid("invalid email"));
    }
    let phone = input.phone.trim().to_string();
    if !validate::is_valid_phone(&phone) {
        return Err(SchoolError::invalid("invalid phone"));
    }
    Ok(TeacherInput {
        name,
        subject,
        email,
        phone,
    })
}

fn teacher_from_row(r: &Row<'_>) -> rusqlite::Result<Teacher> {
    Ok(Teacher {
        id: r.get(0)?,
        name: r.get(1)?,
        subject: r.get(2)?,
        email: r.get(3)?,
        phone: r.get(4)?,
    })
}

pub fn create_teacher(conn: &Connection, input: &TeacherInput) -> SchoolResult<Teacher> {
    let t = clean_teacher(input)?;
    conn.execute(
        "INSERT INTO teachers(name, subject, email, phone) VALUES(?, ?, ?, ?)",
        (&t.name, &t.subject, &t.email, &t.phone),
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(teacher_id = id, "teacher created");
    Ok(Teacher {
        id,
        name: t.name,
        subject: t.subject,
        email: t.email,
        phone: t.phone,
    })
}

pub fn get_teacher(conn: &Connection, teacher_id: TeacherId) -> SchoolResult<Option<Teacher>> {
    Ok(conn
        .query_row(
            "SELECT id, name, subject, email, phone FROM teachers WHERE id = ?",
            [teacher_id],
            teacher_from_row,
        )
        .optional()?)
}

pub fn require_teacher(conn: &Connection, teacher_id: TeacherId) -> SchoolResult<Teacher> {
    get_teacher(conn, teacher_id)?.ok_or_else(|| SchoolError::not_found("teacher", teacher_id))
}

pub fn list_teachers(conn: &Connection) -> SchoolResult<Vec<Teacher>> {
    let mut stmt =
        conn.prepare("SELECT id, name, subject, email, phone FROM teachers ORDER BY id")?;
    let rows = stmt
        .query_map([], teacher_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_teacher(conn: &Connection, teacher_id: TeacherId, input: &TeacherInput) -> SchoolResult<Teacher> {
    let t = clean_teacher(input)?;
    let changed = conn.execute(
        "UPDATE teachers SET name = ?, subject = ?, email = ?, phone = ? WHERE id = ?",
        (&t.name, &t.subject, &t.email, &t.phone, teacher_id),
    )?;
    if changed == 0 {
        return Err(SchoolError::not_found("teacher", teacher_id));
    }
    Ok(Teacher {
        id: teacher_id,
        name: t.name,
        subject: t.subject,
        email: t.email,
        phone: t.phone,
    })
}

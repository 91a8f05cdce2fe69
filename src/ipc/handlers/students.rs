use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_optional_str, get_required_str, parse_params, HandlerFn, today, with_conn};
use crate::ipc::types::{AppState, Request};
use crate::model::Student;
use crate::roster::{self, StudentInput};
use rusqlite::Connection;
use serde_json::{json, Value};

fn student_json(s: &Student) -> Value {
    let mut v = json!(s);
    v["fullName"] = json!(s.full_name());
    v
}

fn students_create(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let input: StudentInput = parse_params(params, Some("student"))?;
    let s = roster::create_student(conn, &input, today())?;
    Ok(json!({ "student": student_json(&s) }))
}

fn students_get(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let s = roster::require_student(conn, &student_id)?;
    Ok(json!({ "student": student_json(&s) }))
}

fn students_list(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let class_name = get_optional_str(params, "className")?;
    let students = roster::list_students(conn, class_name.as_deref())?;
    let rows: Vec<Value> = students.iter().map(student_json).collect();
    Ok(json!({ "students": rows }))
}

fn students_update(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let input: StudentInput = parse_params(params, Some("student"))?;
    let s = roster::update_student(conn, &student_id, &input, today())?;
    Ok(json!({ "student": student_json(&s) }))
}

fn students_delete(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    roster::delete_student(conn, &student_id)?;
    Ok(json!({ "ok": true }))
}

fn profiles_search(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let query = get_required_str(params, "query")?;
    let found = roster::search_profiles(conn, &query)?;
    let students: Vec<Value> = found.students.iter().map(student_json).collect();
    Ok(json!({ "students": students, "teachers": found.teachers }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let f: HandlerFn = match req.method.as_str() {
        "students.create" => students_create,
        "students.get" => students_get,
        "students.list" => students_list,
        "students.update" => students_update,
        "students.delete" => students_delete,
        "profiles.search" => profiles_search,
        _ => return None,
    };
    Some(with_conn(state, req, f))
}

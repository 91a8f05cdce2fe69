use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_required_i64, parse_params, HandlerFn, with_conn};
use crate::ipc::types::{AppState, Request};
use crate::roster::{self, TeacherInput};
use rusqlite::Connection;
use serde_json::{json, Value};

fn teachers_create(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let input: TeacherInput = parse_params(params, Some("teacher"))?;
    let t = roster::create_teacher(conn, &input)?;
    Ok(json!({ "teacher": t }))
}

fn teachers_get(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let teacher_id = get_required_i64(params, "teacherId")?;
    Ok(json!({ "teacher": roster::require_teacher(conn, teacher_id)? }))
}

fn teachers_list(conn: &Connection, _params: &Value) -> Result<Value, HandlerErr> {
    Ok(json!({ "teachers": roster::list_teachers(conn)? }))
}

fn teachers_update(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let teacher_id = get_required_i64(params, "teacherId")?;
    let input: TeacherInput = parse_params(params, Some("teacher"))?;
    Ok(json!({ "teacher": roster::update_teacher(conn, teacher_id, &input)? }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let f: HandlerFn = match req.method.as_str() {
        "teachers.create" => teachers_create,
        "teachers.get" => teachers_get,
        "teachers.list" => teachers_list,
        "teachers.update" => teachers_update,
        _ => return None,
    };
    Some(with_conn(state, req, f))
}

use crate::attendance;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{
    get_date_or_today, get_optional_str, get_required_bool, get_required_i64, get_required_str,
    parse_params, with_conn, HandlerFn,
};
use crate::ipc::types::{AppState, Request};
use crate::model::TeacherId;
use rusqlite::Connection;
use serde_json::{json, Value};

fn attendance_mark_student(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let outcome = attendance::mark_student(
        conn,
        &get_required_str(params, "studentId")?,
        get_date_or_today(params, "date")?,
        get_required_bool(params, "present")?,
    )?;
    Ok(json!(outcome))
}

fn attendance_mark_students(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let ids: Vec<String> = parse_params(params, Some("studentIds"))?;
    let outcome = attendance::mark_students(
        conn,
        &ids,
        get_date_or_today(params, "date")?,
        get_required_bool(params, "present")?,
    )?;
    Ok(json!(outcome))
}

fn attendance_mark_class(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let outcome = attendance::mark_class(
        conn,
        &get_required_str(params, "className")?,
        get_date_or_today(params, "date")?,
        get_required_bool(params, "present")?,
    )?;
    Ok(json!(outcome))
}

fn attendance_mark_teacher(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let outcome = attendance::mark_teachers(
        conn,
        &[get_required_i64(params, "teacherId")?],
        get_date_or_today(params, "date")?,
        get_required_bool(params, "present")?,
    )?;
    Ok(json!(outcome))
}

fn attendance_mark_teachers(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let ids: Vec<TeacherId> = parse_params(params, Some("teacherIds"))?;
    let outcome = attendance::mark_teachers(
        conn,
        &ids,
        get_date_or_today(params, "date")?,
        get_required_bool(params, "present")?,
    )?;
    Ok(json!(outcome))
}

fn attendance_list(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let date = get_date_or_today(params, "date")?;
    let class_name = get_optional_str(params, "className")?;
    let marks = attendance::student_attendance(conn, date, class_name.as_deref())?;
    Ok(json!({ "date": date, "marks": marks }))
}

fn attendance_teacher_list(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let date = get_date_or_today(params, "date")?;
    let marks = attendance::teacher_attendance(conn, date)?;
    Ok(json!({ "date": date, "marks": marks }))
}

fn attendance_summary(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let date = get_date_or_today(params, "date")?;
    Ok(json!({ "summary": attendance::daily_summary(conn, date)? }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let f: HandlerFn = match req.method.as_str() {
        "attendance.markStudent" => attendance_mark_student,
        "attendance.markStudents" => attendance_mark_students,
        "attendance.markClass" => attendance_mark_class,
        "attendance.markTeacher" => attendance_mark_teacher,
        "attendance.markTeachers" => attendance_mark_teachers,
        "attendance.list" => attendance_list,
        "attendance.teacherList" => attendance_teacher_list,
        "attendance.summary" => attendance_summary,
        _ => return None,
    };
    Some(with_conn(state, req, f))
}

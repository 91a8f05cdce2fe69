use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_optional_str, get_required_i64, get_required_str, with_conn, HandlerFn};
use crate::ipc::types::{AppState, Request};
use crate::results;
use rusqlite::Connection;
use serde_json::{json, Value};

fn results_record(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let result = results::record_result(
        conn,
        &get_required_str(params, "studentId")?,
        &get_required_str(params, "subject")?,
        get_required_i64(params, "score")?,
    )?;
    Ok(json!({ "result": result }))
}

fn results_list(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = get_optional_str(params, "studentId")?;
    let subject = get_optional_str(params, "subject")?;
    let rows = results::list_results(conn, student_id.as_deref(), subject.as_deref())?;
    Ok(json!({ "results": rows }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let f: HandlerFn = match req.method.as_str() {
        "results.record" => results_record,
        "results.list" => results_list,
        _ => return None,
    };
    Some(with_conn(state, req, f))
}

use crate::fees;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{
    get_money, get_optional_date, get_optional_str, get_required_str, today, with_conn, HandlerFn,
};
use crate::ipc::types::{AppState, Request};
use crate::error::SchoolError;
use rusqlite::Connection;
use serde_json::{json, Value};

fn fees_set_class_fee(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let class_name = get_required_str(params, "className")?;
    let fee_amount = get_money(params, "feeAmount")?;
    let template = fees::set_class_fee(conn, &class_name, fee_amount)?;
    Ok(json!({ "record": template }))
}

fn fees_record_payment(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let amount = get_money(params, "amount")?;
    let collected_by = get_optional_str(params, "collectedBy")?.unwrap_or_default();
    let on = get_optional_date(params, "on")?.unwrap_or_else(today);
    let record = fees::record_payment(conn, &student_id, amount, &collected_by, on)?;
    Ok(json!({ "record": record }))
}

fn fees_get(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let class_name = get_required_str(params, "className")?;
    let student_id = get_optional_str(params, "studentId")?;
    let record = fees::get_fee_record(conn, &class_name, student_id.as_deref())?
        .ok_or_else(|| SchoolError::not_found("fee record", &class_name))?;
    Ok(json!({ "record": record }))
}

fn fees_list(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let class_name = get_optional_str(params, "className")?;
    Ok(json!({ "records": fees::list_fee_records(conn, class_name.as_deref())? }))
}

fn fees_student_status(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    Ok(json!(fees::student_fee_status(conn, &student_id)?))
}

fn fees_summary(conn: &Connection, _params: &Value) -> Result<Value, HandlerErr> {
    Ok(json!(fees::fee_summary(conn)?))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let f: HandlerFn = match req.method.as_str() {
        "fees.setClassFee" => fees_set_class_fee,
        "fees.recordPayment" => fees_record_payment,
        "fees.get" => fees_get,
        "fees.list" => fees_list,
        "fees.studentStatus" => fees_student_status,
        "fees.summary" => fees_summary,
        _ => return None,
    };
    Some(with_conn(state, req, f))
}

use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{
    get_date_or_today, get_money, get_optional_str, get_required_i64, get_required_str,
    get_teacher_id, with_conn, HandlerFn,
};
use crate::ipc::types::{AppState, Request};
use crate::payroll;
use rusqlite::Connection;
use serde_json::{json, Value};

fn salary_pay(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let payment = payroll::pay_salary(
        conn,
        get_required_i64(params, "teacherId")?,
        &get_required_str(params, "month")?,
        get_money(params, "amount")?,
        get_date_or_today(params, "paidOn")?,
    )?;
    Ok(json!({ "payment": payment }))
}

fn salary_list(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let teacher_id = get_teacher_id(params)?;
    let month = get_optional_str(params, "month")?;
    Ok(json!({ "payments": payroll::list_salary(conn, teacher_id, month.as_deref())? }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let f: HandlerFn = match req.method.as_str() {
        "salary.pay" => salary_pay,
        "salary.list" => salary_list,
        _ => return None,
    };
    Some(with_conn(state, req, f))
}

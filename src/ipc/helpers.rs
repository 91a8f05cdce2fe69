use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::{Day, Money, Period, TeacherId};
use crate::validate;
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub fn get_required_str(params: &Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

/// Absent, null and blank all read as `None`.
pub fn get_optional_str(params: &Value, key: &str) -> Result<Option<String>, HandlerErr> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(HandlerErr::bad_params(format!("{} must be a string", key))),
    }
}

pub fn get_required_i64(params: &Value, key: &str) -> Result<i64, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_optional_i64(params: &Value, key: &str) -> Result<Option<i64>, HandlerErr> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be an integer", key))),
    }
}

pub fn get_required_bool(params: &Value, key: &str) -> Result<bool, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_bool())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_teacher_id(params: &Value) -> Result<Option<TeacherId>, HandlerErr> {
    get_optional_i64(params, "teacherId")
}

pub fn get_day(params: &Value) -> Result<Day, HandlerErr> {
    Ok(Day::parse(&get_required_str(params, "day")?)?)
}

pub fn get_period(params: &Value) -> Result<Period, HandlerErr> {
    Ok(Period::new(get_required_i64(params, "period")?)?)
}

pub fn get_money(params: &Value, key: &str) -> Result<Money, HandlerErr> {
    let v = params
        .get(key)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))?;
    Ok(Money::from_major(v)?)
}

pub fn get_optional_date(params: &Value, key: &str) -> Result<Option<NaiveDate>, HandlerErr> {
    match get_optional_str(params, key)? {
        Some(s) => Ok(Some(validate::parse_date(&s, key)?)),
        None => Ok(None),
    }
}

/// Deserialize the whole params object (or one member of it) into `T`.
pub fn parse_params<T: DeserializeOwned>(params: &Value, key: Option<&str>) -> Result<T, HandlerErr> {
    let v = match key {
        Some(k) => params
            .get(k)
            .cloned()
            .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", k)))?,
        None => params.clone(),
    };
    serde_json::from_value(v).map_err(|e| HandlerErr::bad_params(e.to_string()))
}

/// `key` when given, otherwise today's date.
pub fn get_date_or_today(params: &Value, key: &str) -> Result<NaiveDate, HandlerErr> {
    Ok(get_optional_date(params, key)?.unwrap_or_else(today))
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub type HandlerFn = fn(&Connection, &Value) -> Result<Value, HandlerErr>;

/// Run `f` against the open workspace and wrap its outcome in a response.
pub fn with_conn(
    state: &mut AppState,
    req: &Request,
    f: impl FnOnce(&Connection, &Value) -> Result<Value, HandlerErr>,
) -> Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match f(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => {
            tracing::warn!(method = %req.method, code = error.code, message = %error.message, "request rejected");
            error.response(&req.id)
        }
    }
}

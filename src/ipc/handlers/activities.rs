use crate::activities::{self, ActivityInput};
use crate::error::SchoolError;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{
    get_optional_date, get_optional_str, get_required_i64, get_required_str, with_conn, HandlerFn,
};
use crate::ipc::types::{AppState, Request};
use crate::validate;
use rusqlite::Connection;
use serde_json::{json, Value};

fn activity_input(params: &Value) -> Result<ActivityInput, HandlerErr> {
    Ok(ActivityInput {
        activity: get_required_str(params, "activity")?,
        date: validate::parse_date(&get_required_str(params, "date")?, "date")?,
        description: get_optional_str(params, "description")?,
    })
}

fn activities_create(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let a = activities::create_activity(conn, &activity_input(params)?)?;
    Ok(json!({ "activity": a }))
}

fn activities_update(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let activity_id = get_required_i64(params, "activityId")?;
    let a = activities::update_activity(conn, activity_id, &activity_input(params)?)?;
    Ok(json!({ "activity": a }))
}

fn activities_get(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let activity_id = get_required_i64(params, "activityId")?;
    let a = activities::get_activity(conn, activity_id)?
        .ok_or_else(|| SchoolError::not_found("activity", activity_id))?;
    Ok(json!({ "activity": a }))
}

fn activities_list(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let from = get_optional_date(params, "from")?;
    let to = get_optional_date(params, "to")?;
    Ok(json!({ "activities": activities::list_activities(conn, from, to)? }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let f: HandlerFn = match req.method.as_str() {
        "activities.create" => activities_create,
        "activities.update" => activities_update,
        "activities.get" => activities_get,
        "activities.list" => activities_list,
        _ => return None,
    };
    Some(with_conn(state, req, f))
}

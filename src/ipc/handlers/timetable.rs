use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{
    get_day, get_optional_str, get_period, get_required_i64, get_required_str, get_teacher_id,
    with_conn, HandlerFn,
};
use crate::ipc::types::{AppState, Request};
use crate::model::Day;
use crate::timetable::{self, SlotFilter, SlotInput};
use rusqlite::Connection;
use serde_json::{json, Value};

fn slot_input(params: &Value) -> Result<SlotInput, HandlerErr> {
    Ok(SlotInput {
        class_name: get_required_str(params, "className")?,
        day: get_day(params)?,
        period: get_period(params)?,
        subject: get_required_str(params, "subject")?,
        teacher_id: get_teacher_id(params)?,
    })
}

fn timetable_check_conflict(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let class_name = get_required_str(params, "className")?;
    let day = get_day(params)?;
    let period = get_period(params)?;
    let teacher_id = get_teacher_id(params)?;
    let conflict = timetable::has_conflict(conn, &class_name, day, period, teacher_id)?;
    Ok(json!({ "conflict": conflict }))
}

fn timetable_add_slot(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let slot = timetable::add_slot(conn, &slot_input(params)?)?;
    Ok(json!({ "slot": slot }))
}

fn timetable_update_slot(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let slot_id = get_required_i64(params, "slotId")?;
    let slot = timetable::update_slot(conn, slot_id, &slot_input(params)?)?;
    Ok(json!({ "slot": slot }))
}

fn timetable_get_slot(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let slot_id = get_required_i64(params, "slotId")?;
    let slot = timetable::get_slot(conn, slot_id)?
        .ok_or_else(|| crate::error::SchoolError::not_found("timetable slot", slot_id))?;
    Ok(json!({ "slot": slot }))
}

fn timetable_list_slots(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let day = match get_optional_str(params, "day")? {
        Some(d) => Some(Day::parse(&d)?),
        None => None,
    };
    let filter = SlotFilter {
        class_name: get_optional_str(params, "className")?,
        day,
        teacher_id: get_teacher_id(params)?,
    };
    Ok(json!({ "slots": timetable::list_slots(conn, &filter)? }))
}

fn timetable_remove_slot(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let slot_id = get_required_i64(params, "slotId")?;
    timetable::remove_slot(conn, slot_id)?;
    Ok(json!({ "ok": true }))
}

fn assignments_create(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let a = timetable::assign_subject_teacher(
        conn,
        &get_required_str(params, "className")?,
        &get_required_str(params, "subject")?,
        get_required_i64(params, "teacherId")?,
    )?;
    Ok(json!({ "assignment": a }))
}

fn assignments_update(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let a = timetable::update_subject_assignment(
        conn,
        get_required_i64(params, "assignmentId")?,
        &get_required_str(params, "className")?,
        &get_required_str(params, "subject")?,
        get_required_i64(params, "teacherId")?,
    )?;
    Ok(json!({ "assignment": a }))
}

fn assignments_list(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let class_name = get_optional_str(params, "className")?;
    Ok(json!({ "assignments": timetable::list_assignments(conn, class_name.as_deref())? }))
}

fn assignments_available_teachers(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let subject = get_required_str(params, "subject")?;
    let class_name = get_required_str(params, "className")?;
    let teachers = timetable::available_teachers_for_subject(conn, &subject, &class_name)?;
    Ok(json!({ "teachers": teachers }))
}

fn class_teachers_assign(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let link = timetable::assign_class_teacher(
        conn,
        &get_required_str(params, "className")?,
        get_required_i64(params, "teacherId")?,
    )?;
    Ok(json!({ "classTeacher": link }))
}

fn class_teachers_list(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let class_name = get_optional_str(params, "className")?;
    Ok(json!({ "classTeachers": timetable::list_class_teachers(conn, class_name.as_deref())? }))
}

fn class_teachers_remove(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    timetable::remove_class_teacher(
        conn,
        &get_required_str(params, "className")?,
        get_required_i64(params, "teacherId")?,
    )?;
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let f: HandlerFn = match req.method.as_str() {
        "timetable.checkConflict" => timetable_check_conflict,
        "timetable.addSlot" => timetable_add_slot,
        "timetable.updateSlot" => timetable_update_slot,
        "timetable.getSlot" => timetable_get_slot,
        "timetable.listSlots" => timetable_list_slots,
        "timetable.removeSlot" => timetable_remove_slot,
        "assignments.create" => assignments_create,
        "assignments.update" => assignments_update,
        "assignments.list" => assignments_list,
        "assignments.availableTeachers" => assignments_available_teachers,
        "classTeachers.assign" => class_teachers_assign,
        "classTeachers.list" => class_teachers_list,
        "classTeachers.remove" => class_teachers_remove,
        _ => return None,
    };
    Some(with_conn(state, req, f))
}

//! Input predicates shared by the roster, timetable and fee operations.

use crate::error::{SchoolError, SchoolResult};
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.-]+@[\w.-]+\.\w+$").expect("email regex"));
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?\d{10,15}$").expect("phone regex"));

pub const GENDERS: [&str; 3] = ["Male", "Female", "Other"];
pub const MAX_STUDENT_AGE_YEARS: i32 = 18;

pub fn is_valid_email(s: &str) -> bool {
    EMAIL_RE.is_match(s)
}

pub fn is_valid_phone(s: &str) -> bool {
    PHONE_RE.is_match(s)
}

/// Letters and inner spaces only, at least one letter.
pub fn is_valid_name_part(s: &str) -> bool {
    let t = s.trim();
    !t.is_empty() && t.chars().all(|c| c.is_alphabetic() || c.is_whitespace())
}

pub fn is_valid_insurance_number(s: &str) -> bool {
    s.trim().chars().count() >= 5
}

pub fn class_name(s: &str) -> SchoolResult<String> {
    let t = s.trim();
    if t.is_empty() {
        return Err(SchoolError::invalid("invalid class name"));
    }
    Ok(t.to_string())
}

pub fn subject(s: &str) -> SchoolResult<String> {
    let t = s.trim();
    if t.chars().count() < 2 {
        return Err(SchoolError::invalid("invalid subject"));
    }
    Ok(t.to_string())
}

pub fn activity_name(s: &str) -> SchoolResult<String> {
    let t = s.trim();
    if t.chars().count() < 2 {
        return Err(SchoolError::invalid("activity name must be at least 2 characters"));
    }
    Ok(t.to_string())
}

/// A payroll month, `YYYY-MM`.
pub fn month(s: &str) -> SchoolResult<String> {
    let t = s.trim();
    NaiveDate::parse_from_str(&format!("{}-01", t), "%Y-%m-%d")
        .ok()
        .filter(|_| t.len() == 7)
        .map(|_| t.to_string())
        .ok_or_else(|| SchoolError::invalid("month must be YYYY-MM"))
}

/// Exam score as a whole percentage.
pub fn score(n: i64) -> SchoolResult<u8> {
    u8::try_from(n)
        .ok()
        .filter(|s| *s <= 100)
        .ok_or_else(|| SchoolError::invalid("score must be between 0 and 100"))
}

pub fn name_part(s: &str, field: &str) -> SchoolResult<String> {
    if !is_valid_name_part(s) {
        return Err(SchoolError::invalid(format!("invalid {}", field)));
    }
    Ok(s.trim().to_string())
}

/// Blank optional text becomes `None`.
pub fn optional_text(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|t| !t.is_empty()).map(str::to_string)
}

/// Date of birth must not lie in the future nor more than 18 years back.
pub fn student_dob(dob: NaiveDate, today: NaiveDate) -> SchoolResult<NaiveDate> {
    let earliest = today
        .with_year(today.year() - MAX_STUDENT_AGE_YEARS)
        // Feb 29 has no counterpart in a non-leap year.
        .or_else(|| {
            NaiveDate::from_ymd_opt(today.year() - MAX_STUDENT_AGE_YEARS, today.month(), 28)
        })
        .ok_or_else(|| SchoolError::invalid("invalid date of birth"))?;
    if dob > today || dob < earliest {
        return Err(SchoolError::invalid(format!(
            "invalid date of birth (must be under {} years)",
            MAX_STUDENT_AGE_YEARS
        )));
    }
    Ok(dob)
}

pub fn parse_date(s: &str, field: &str) -> SchoolResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| SchoolError::invalid(format!("{} must be YYYY-MM-DD", field)))
}

use crate::error::{SchoolError, SchoolResult};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Day {
    pub const ALL: [Day; 5] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
    ];

    pub fn parse(s: &str) -> SchoolResult<Self> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s.trim())
            .ok_or_else(|| SchoolError::invalid(format!("invalid day: {}", s)))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monday => "Monday",
            Self::Tuesday => "Tuesday",
            Self::Wednesday => "Wednesday",
            Self::Thursday => "Thursday",
            Self::Friday => "Friday",
        }
    }

    /// 1-based position in the school week, used for ordering in SQL.
    pub fn ordinal(self) -> i64 {
        self as i64 + 1
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for Day {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Day {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        Day::parse(s).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl Serialize for Day {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

/// Teaching period within a day, 1 through 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Period(u8);

impl Period {
    pub const FIRST: u8 = 1;
    pub const LAST: u8 = 8;

    pub fn new(n: i64) -> SchoolResult<Self> {
        if (Self::FIRST as i64..=Self::LAST as i64).contains(&n) {
            Ok(Self(n as u8))
        } else {
            Err(SchoolError::invalid(format!(
                "period must be between {} and {}",
                Self::FIRST,
                Self::LAST
            )))
        }
    }

    pub fn get(self) -> i64 {
        self.0 as i64
    }
}

impl ToSql for Period {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.get()))
    }
}

impl FromSql for Period {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Period::new(value.as_i64()?).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// Amount of money in minor units (cents).
///
/// Caller-supplied amounts are capped at [`Money::MAX`]; totals over many rows
/// go through the checked operations so they can never wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);
    /// One trillion in major units.
    pub const MAX: Money = Money(1_000_000_000_000 * 100);

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    /// Parse a caller-supplied major-unit amount in `0..=Money::MAX`.
    pub fn from_major(value: f64) -> SchoolResult<Self> {
        if !value.is_finite() {
            return Err(SchoolError::invalid("amount must be a finite number"));
        }
        if value < 0.0 {
            return Err(SchoolError::invalid("amount must not be negative"));
        }
        let cents = (value * 100.0).round();
        if cents > Self::MAX.0 as f64 {
            return Err(SchoolError::invalid(format!(
                "amount must not exceed {}",
                Self::MAX
            )));
        }
        Ok(Self(cents as i64))
    }

    pub fn as_major(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    /// `None` if the running total leaves the `i64` range.
    pub fn checked_sum(iter: impl IntoIterator<Item = Money>) -> Option<Money> {
        iter.into_iter()
            .try_fold(Money::ZERO, |acc, m| acc.checked_add(m))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl ToSql for Money {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl FromSql for Money {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_i64().map(Money)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(self.as_major())
    }
}

pub type TeacherId = i64;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub surname: String,
    pub class_name: String,
    pub dob: NaiveDate,
    pub gender: String,
    pub residence: String,
    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,
    pub insurance_number: Option<String>,
    pub medical_details: Option<String>,
    pub registered_on: NaiveDate,
    /// Set by the last profile edit; `None` until then.
    pub updated_at: Option<NaiveDateTime>,
}

impl Student {
    pub fn full_name(&self) -> String {
        match self.middle_name.as_deref() {
            Some(m) if !m.is_empty() => format!("{} {} {}", self.first_name, m, self.surname),
            _ => format!("{} {}", self.first_name, self.surname),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: TeacherId,
    pub name: String,
    pub subject: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableSlot {
    pub id: i64,
    pub class_name: String,
    pub day: Day,
    pub period: Period,
    pub subject: String,
    pub teacher_id: Option<TeacherId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAssignment {
    pub id: i64,
    pub class_name: String,
    pub subject: String,
    pub teacher_id: TeacherId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeRecord {
    pub class_name: String,
    /// `None` marks the class template.
    pub student_id: Option<String>,
    pub fee_amount: Money,
    pub paid_amount: Money,
    pub date_paid: Option<NaiveDate>,
    pub collected_by: Option<String>,
}

impl FeeRecord {
    /// Outstanding balance. Negative when the student has overpaid.
    pub fn arrears(&self) -> Money {
        Money(self.fee_amount.0.saturating_sub(self.paid_amount.0))
    }

    pub fn is_template(&self) -> bool {
        self.student_id.is_none()
    }
}

impl Serialize for FeeRecord {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut st = s.serialize_struct("FeeRecord", 7)?;
        st.serialize_field("className", &self.class_name)?;
        st.serialize_field("studentId", &self.student_id)?;
        st.serialize_field("feeAmount", &self.fee_amount)?;
        st.serialize_field("paidAmount", &self.paid_amount)?;
        st.serialize_field("arrears", &self.arrears())?;
        st.serialize_field("datePaid", &self.date_paid)?;
        st.serialize_field("collectedBy", &self.collected_by)?;
        st.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassTeacher {
    pub class_name: String,
    pub teacher_id: TeacherId,
}

/// One day's attendance mark for a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAttendance {
    pub date: NaiveDate,
    pub student_id: String,
    pub full_name: String,
    pub class_name: String,
    pub present: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherAttendance {
    pub date: NaiveDate,
    pub teacher_id: TeacherId,
    pub name: String,
    pub present: bool,
}

/// A student's score (0..=100) in one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectResult {
    pub student_id: String,
    pub subject: String,
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: i64,
    pub activity: String,
    pub date: NaiveDate,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryPayment {
    pub teacher_id: TeacherId,
    /// `YYYY-MM`.
    pub month: String,
    pub amount: Money,
    pub paid_on: NaiveDate,
}

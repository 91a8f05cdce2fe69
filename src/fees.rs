//! Per-student fee ledger: class templates, payments, arrears projections.

use crate::db;
use crate::error::{SchoolError, SchoolResult};
use crate::model::{FeeRecord, Money};
use crate::roster;
use crate::validate;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::Serialize;

const FEE_COLUMNS: &str = "class_name, student_id, fee_amount, paid_amount, date_paid, collected_by";

fn fee_from_row(r: &Row<'_>) -> rusqlite::Result<FeeRecord> {
    Ok(FeeRecord {
        class_name: r.get(0)?,
        student_id: r.get(1)?,
        fee_amount: r.get(2)?,
        paid_amount: r.get(3)?,
        date_paid: r.get(4)?,
        collected_by: r.get(5)?,
    })
}

/// Exact lookup; `student_id = None` selects the class template.
pub fn get_fee_record(
    conn: &Connection,
    class_name: &str,
    student_id: Option<&str>,
) -> SchoolResult<Option<FeeRecord>> {
    let sql = format!(
        "SELECT {} FROM fees WHERE class_name = ?1 AND student_id IS ?2",
        FEE_COLUMNS
    );
    Ok(conn
        .query_row(&sql, (class_name, student_id), fee_from_row)
        .optional()?)
}

/// Base charge for a class, zero when no template has been set.
fn template_fee(conn: &Connection, class_name: &str) -> SchoolResult<Money> {
    Ok(get_fee_record(conn, class_name, None)?
        .map(|t| t.fee_amount)
        .unwrap_or(Money::ZERO))
}

fn check_amount(amount: Money) -> SchoolResult<()> {
    if amount < Money::ZERO {
        return Err(SchoolError::invalid("amount must not be negative"));
    }
    if amount > Money::MAX {
        return Err(SchoolError::invalid(format!("amount must not exceed {}", Money::MAX)));
    }
    Ok(())
}

/// Create or replace the class template. Existing student records keep the
/// fee they were opened with.
pub fn set_class_fee(conn: &Connection, class_name: &str, fee_amount: Money) -> SchoolResult<FeeRecord> {
    let class_name = validate::class_name(class_name)?;
    check_amount(fee_amount)?;
    let tx = db::begin_write(conn)?;
    let changed = tx.execute(
        "UPDATE fees SET fee_amount = ? WHERE class_name = ? AND student_id IS NULL",
        (fee_amount, &class_name),
    )?;
    if changed == 0 {
        tx.execute(
            "INSERT INTO fees(class_name, student_id, fee_amount, paid_amount) VALUES(?, NULL, ?, 0)",
            (&class_name, fee_amount),
        )?;
    }
    tx.commit()?;
    tracing::info!(class = %class_name, fee = %fee_amount, "class fee set");
    Ok(FeeRecord {
        class_name,
        student_id: None,
        fee_amount,
        paid_amount: Money::ZERO,
        date_paid: None,
        collected_by: None,
    })
}

/// Apply one payment to a student's ledger row, opening the row on first payment.
///
/// The first payment seeds `paid_amount` with `amount` and copies the class
/// template's fee. Later payments add to `paid_amount`. Exactly one row is
/// written, inside a single write transaction.
pub fn record_payment(
    conn: &Connection,
    student_id: &str,
    amount: Money,
    collected_by: &str,
    on: NaiveDate,
) -> SchoolResult<FeeRecord> {
    check_amount(amount)?;
    let collected_by = validate::optional_text(Some(collected_by));

    let tx = db::begin_write(conn)?;
    let student = roster::require_student(&tx, student_id)?;
    let class_name = student.class_name;

    match get_fee_record(&tx, &class_name, Some(student_id))? {
        None => {
            let fee_amount = template_fee(&tx, &class_name)?;
            tx.execute(
                "INSERT INTO fees(class_name, student_id, fee_amount, paid_amount, date_paid, collected_by)
                 VALUES(?, ?, ?, ?, ?, ?)",
                (&class_name, student_id, fee_amount, amount, on, &collected_by),
            )?;
        }
        Some(existing) => {
            let total = existing
                .paid_amount
                .checked_add(amount)
                .filter(|t| *t <= Money::MAX)
                .ok_or_else(|| {
                    SchoolError::invalid(format!(
                        "paid total would exceed {}",
                        Money::MAX
                    ))
                })?;
            tracing::debug!(student_id, paid = %existing.paid_amount, total = %total, "topping up fee record");
            tx.execute(
                "UPDATE fees
                 SET paid_amount = paid_amount + ?, date_paid = ?, collected_by = ?
                 WHERE class_name = ? AND student_id = ?",
                (amount, on, &collected_by, &class_name, student_id),
            )?;
        }
    }

    let record = get_fee_record(&tx, &class_name, Some(student_id))?
        .ok_or_else(|| SchoolError::not_found("fee record", student_id))?;
    tx.commit()?;
    tracing::info!(
        student_id,
        class = %class_name,
        amount = %amount,
        paid = %record.paid_amount,
        arrears = %record.arrears(),
        "payment recorded"
    );
    Ok(record)
}

/// All ledger rows, templates first within each class.
pub fn list_fee_records(conn: &Connection, class_name: Option<&str>) -> SchoolResult<Vec<FeeRecord>> {
    let sql = format!(
        "SELECT {} FROM fees
         WHERE (?1 IS NULL OR class_name = ?1)
         ORDER BY class_name, student_id IS NOT NULL, student_id",
        FEE_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([class_name], fee_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentFeeStatus {
    pub student_id: String,
    pub full_name: String,
    pub has_record: bool,
    pub record: FeeRecord,
}

/// The student's ledger row, or what it would be before any payment.
pub fn student_fee_status(conn: &Connection, student_id: &str) -> SchoolResult<StudentFeeStatus> {
    let student = roster::require_student(conn, student_id)?;
    let existing = get_fee_record(conn, &student.class_name, Some(student_id))?;
    let has_record = existing.is_some();
    let record = match existing {
        Some(r) => r,
        None => FeeRecord {
            fee_amount: template_fee(conn, &student.class_name)?,
            class_name: student.class_name.clone(),
            student_id: Some(student.id.clone()),
            paid_amount: Money::ZERO,
            date_paid: None,
            collected_by: None,
        },
    };
    Ok(StudentFeeStatus {
        full_name: student.full_name(),
        student_id: student.id,
        has_record,
        record,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeSummary {
    pub collected: Money,
    pub arrears: Money,
    pub record_count: usize,
    pub template_count: usize,
}

/// Dashboard totals over every ledger row.
pub fn fee_summary(conn: &Connection) -> SchoolResult<FeeSummary> {
    let records = list_fee_records(conn, None)?;
    let overflow = || SchoolError::invalid("fee totals are too large to add up");
    Ok(FeeSummary {
        collected: Money::checked_sum(records.iter().map(|r| r.paid_amount)).ok_or_else(overflow)?,
        arrears: Money::checked_sum(records.iter().map(FeeRecord::arrears)).ok_or_else(overflow)?,
        record_count: records.len(),
        template_count: records.iter().filter(|r| r.is_template()).count(),
    })
}

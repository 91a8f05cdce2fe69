//! Monthly teacher salary payments.

use crate::error::{conflict_on_unique, ConflictKind, SchoolError, SchoolResult};
use crate::model::{Money, SalaryPayment, TeacherId};
use crate::roster;
use crate::validate;
use chrono::NaiveDate;
use rusqlite::Connection;

/// Record one month's salary. A month can only be paid once per teacher.
pub fn pay_salary(
    conn: &Connection,
    teacher_id: TeacherId,
    month: &str,
    amount: Money,
    paid_on: NaiveDate,
) -> SchoolResult<SalaryPayment> {
    let month = validate::month(month)?;
    if amount <= Money::ZERO || amount > Money::MAX {
        return Err(SchoolError::invalid(format!(
            "salary must be above 0 and at most {}",
            Money::MAX
        )));
    }
    roster::require_teacher(conn, teacher_id)?;
    conn.execute(
        "INSERT INTO salary(teacher_id, month, amount, paid_on) VALUES(?, ?, ?, ?)",
        (teacher_id, &month, amount, paid_on),
    )
    .map_err(conflict_on_unique(ConflictKind::DuplicateSalary))?;
    tracing::info!(teacher = teacher_id, month = %month, %amount, "salary paid");
    Ok(SalaryPayment {
        teacher_id,
        month,
        amount,
        paid_on,
    })
}

pub fn list_salary(
    conn: &Connection,
    teacher_id: Option<TeacherId>,
    month: Option<&str>,
) -> SchoolResult<Vec<SalaryPayment>> {
    let month = month.map(validate::month).transpose()?;
    let mut stmt = conn.prepare(
        "SELECT teacher_id, month, amount, paid_on FROM salary
         WHERE (?1 IS NULL OR teacher_id = ?1) AND (?2 IS NULL OR month = ?2)
         ORDER BY month DESC, teacher_id",
    )?;
    let rows = stmt
        .query_map((teacher_id, month), |r| {
            Ok(SalaryPayment {
                teacher_id: r.get(0)?,
                month: r.get(1)?,
                amount: r.get(2)?,
                paid_on: r.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

//! School calendar activities.

use crate::error::{conflict_on_unique, ConflictKind, SchoolError, SchoolResult};
use crate::model::Activity;
use crate::validate;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row};

#[derive(Debug, Clone)]
pub struct ActivityInput {
    pub activity: String,
    pub date: NaiveDate,
    pub description: Option<String>,
}

fn activity_from_row(r: &Row<'_>) -> rusqlite::Result<Activity> {
    Ok(Activity {
        id: r.get(0)?,
        activity: r.get(1)?,
        date: r.get(2)?,
        description: r.get(3)?,
    })
}

pub fn create_activity(conn: &Connection, input: &ActivityInput) -> SchoolResult<Activity> {
    let name = validate::activity_name(&input.activity)?;
    let description = validate::optional_text(input.description.as_deref());
    conn.execute(
        "INSERT INTO activities(activity, date, description) VALUES(?, ?, ?)",
        (&name, input.date, &description),
    )
    .map_err(conflict_on_unique(ConflictKind::DuplicateActivity))?;
    let id = conn.last_insert_rowid();
    tracing::info!(id, activity = %name, date = %input.date, "activity created");
    Ok(Activity {
        id,
        activity: name,
        date: input.date,
        description,
    })
}

pub fn update_activity(conn: &Connection, activity_id: i64, input: &ActivityInput) -> SchoolResult<Activity> {
    let name = validate::activity_name(&input.activity)?;
    let description = validate::optional_text(input.description.as_deref());
    let changed = conn
        .execute(
            "UPDATE activities SET activity = ?, date = ?, description = ? WHERE id = ?",
            (&name, input.date, &description, activity_id),
        )
        .map_err(conflict_on_unique(ConflictKind::DuplicateActivity))?;
    if changed == 0 {
        return Err(SchoolError::not_found("activity", activity_id));
    }
    tracing::info!(id = activity_id, "activity updated");
    Ok(Activity {
        id: activity_id,
        activity: name,
        date: input.date,
        description,
    })
}

pub fn get_activity(conn: &Connection, activity_id: i64) -> SchoolResult<Option<Activity>> {
    let row = conn
        .query_row(
            "SELECT id, activity, date, description FROM activities WHERE id = ?",
            [activity_id],
            activity_from_row,
        )
        .optional()?;
    Ok(row)
}

/// Newest first, optionally bounded by an inclusive date range.
pub fn list_activities(
    conn: &Connection,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> SchoolResult<Vec<Activity>> {
    let mut stmt = conn.prepare(
        "SELECT id, activity, date, description FROM activities
         WHERE (?1 IS NULL OR date >= ?1) AND (?2 IS NULL OR date <= ?2)
         ORDER BY date DESC, id DESC",
    )?;
    let rows = stmt
        .query_map((from, to), activity_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_conn;

    fn input(name: &str, month: u32, day: u32) -> ActivityInput {
        ActivityInput {
            activity: name.to_string(),
            date: NaiveDate::from_ymd_opt(2026, month, day).unwrap(),
            description: Some("  ".to_string()),
        }
    }

    #[test]
    fn same_name_on_the_same_day_is_a_conflict() {
        let conn = test_conn();
        let a = create_activity(&conn, &input("Sports day", 3, 6)).unwrap();
        assert_eq!(a.description, None);
        assert!(matches!(
            create_activity(&conn, &input(" Sports day ", 3, 6)),
            Err(SchoolError::Conflict(ConflictKind::DuplicateActivity))
        ));
        create_activity(&conn, &input("Sports day", 3, 7)).unwrap();
        assert!(matches!(
            create_activity(&conn, &input("X", 3, 8)),
            Err(SchoolError::InvalidInput(_))
        ));
    }

    #[test]
    fn update_and_list_newest_first() {
        let conn = test_conn();
        let a = create_activity(&conn, &input("Open day", 2, 1)).unwrap();
        let b = create_activity(&conn, &input("Cleanup", 4, 10)).unwrap();
        create_activity(&conn, &input("Debate", 3, 15)).unwrap();

        let moved = update_activity(&conn, a.id, &input("Open day", 5, 1)).unwrap();
        assert_eq!(get_activity(&conn, a.id).unwrap(), Some(moved));
        assert!(matches!(
            update_activity(&conn, b.id, &input("Open day", 5, 1)),
            Err(SchoolError::Conflict(ConflictKind::DuplicateActivity))
        ));
        assert!(matches!(
            update_activity(&conn, 999, &input("Ghost", 5, 1)),
            Err(SchoolError::NotFound { .. })
        ));

        let names: Vec<String> = list_activities(&conn, None, None)
            .unwrap()
            .into_iter()
            .map(|a| a.activity)
            .collect();
        assert_eq!(names, ["Open day", "Cleanup", "Debate"]);
        let march_to_april = list_activities(
            &conn,
            NaiveDate::from_ymd_opt(2026, 3, 1),
            NaiveDate::from_ymd_opt(2026, 4, 30),
        )
        .unwrap();
        assert_eq!(march_to_april.len(), 2);
    }
}

use std::fmt;

/// Which uniqueness rule a write ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// The teacher already holds the same day/period in another class.
    TeacherDoubleBooked,
    /// The class already has a subject in that day/period.
    DuplicateSlot,
    /// The class already has a teacher for that subject.
    DuplicateAssignment,
    /// An activity with that name is already on that date.
    DuplicateActivity,
    /// The teacher is already linked to that class.
    DuplicateClassTeacher,
    /// The teacher's salary for that month is already recorded.
    DuplicateSalary,
}

impl ConflictKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::TeacherDoubleBooked => "teacher_conflict",
            Self::DuplicateSlot => "duplicate_slot",
            Self::DuplicateAssignment => "duplicate_assignment",
            Self::DuplicateActivity => "duplicate_activity",
            Self::DuplicateClassTeacher => "duplicate_class_teacher",
            Self::DuplicateSalary => "duplicate_salary",
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::TeacherDoubleBooked => "teacher is already assigned to another class at this time",
            Self::DuplicateSlot => "this class already has a subject scheduled for this day and period",
            Self::DuplicateAssignment => "this subject is already assigned for this class",
            Self::DuplicateActivity => "an activity with this name already exists on this date",
            Self::DuplicateClassTeacher => "this teacher is already assigned to this class",
            Self::DuplicateSalary => "salary for this month is already recorded",
        };
        f.write_str(msg)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchoolError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("{0}")]
    Conflict(ConflictKind),

    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Db(#[from] rusqlite::Error),
}

impl SchoolError {
    pub fn not_found(entity: &'static str, key: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

pub type SchoolResult<T> = Result<T, SchoolError>;

/// True when `e` is SQLite rejecting a UNIQUE/PRIMARY KEY constraint.
pub fn is_unique_violation(e: &rusqlite::Error) -> bool {
    match e {
        rusqlite::Error::SqliteFailure(err, _) => {
            err.code == rusqlite::ErrorCode::ConstraintViolation
                && matches!(
                    err.extended_code,
                    rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                        | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                )
        }
        _ => false,
    }
}

/// Map a failed write to `Conflict(kind)` when a uniqueness rule rejected it.
pub fn conflict_on_unique(kind: ConflictKind) -> impl Fn(rusqlite::Error) -> SchoolError {
    move |e| {
        if is_unique_violation(&e) {
            SchoolError::Conflict(kind)
        } else {
            SchoolError::Db(e)
        }
    }
}

pub mod activities;
pub mod attendance;
pub mod backup;
pub mod core;
pub mod fees;
pub mod payroll;
pub mod results;
pub mod students;
pub mod teachers;
pub mod timetable;

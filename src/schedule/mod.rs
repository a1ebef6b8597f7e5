//! Attendance view-model pipeline: raw schedule feed in, rendered rows and
//! spreadsheet out. Everything here is synchronous and free of I/O.

pub mod export;
pub mod flatten;
pub mod guard;
pub mod names;
pub mod pagination;
pub mod session;
pub mod view;

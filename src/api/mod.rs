pub mod departments;
pub mod health;
pub mod names;
pub mod schedule;
pub mod session;
pub mod view_session;

pub mod dates;
pub mod health_log;
pub mod session_store;
pub mod view_cache;

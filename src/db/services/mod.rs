//! SQL access for the check pipeline.
//!
//! Each sub-module owns the queries for one table. Functions take the shared
//! `PgPool` by reference and check out a connection only for the duration of
//! their own query, so the pool is returned on every exit path.

pub mod alert_service;
pub mod check_result_service;
pub mod monitor_service;

pub use alert_service::*;
pub use check_result_service::*;
pub use monitor_service::*;

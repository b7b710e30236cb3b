/// Fixed reference calendar and interval constants.
pub mod calendar;
pub mod context;
pub mod engine;
pub mod kpi;
/// Recurring schedule rules and their expansion.
pub mod schedule;
pub mod types;

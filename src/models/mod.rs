pub mod availability;
pub mod exam;
pub mod schedule;

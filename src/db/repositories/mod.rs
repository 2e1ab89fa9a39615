pub mod availability_repository;
pub mod exam_repository;
pub mod scheduled_task_repository;

pub mod availability_service;
pub mod exam_service;
pub mod planner_service;
pub mod schedule_packer;
pub mod schedule_utils;

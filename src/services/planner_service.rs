use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::repositories::scheduled_task_repository::{
    ScheduledTaskRepository, ScheduledTaskRow,
};
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::schedule::ScheduledTaskRecord;
use crate::services::availability_service::AvailabilityService;
use crate::services::exam_service::ExamService;
use crate::services::schedule_packer::{self, HORIZON_DAYS};

/// Result of one scheduling run.
///
/// `PersistenceFailedAfterWipe` is the asymmetric failure window of the
/// wipe-then-insert regeneration: the previous schedule is already gone and
/// the new one never became visible. Rerunning `generate_schedule` is the
/// documented recovery, since the wipe is idempotent and packing is pure
/// recomputation over the same inputs.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ScheduleOutcome {
    NoUpcomingWork,
    Committed {
        placed_count: usize,
        sequence_range: Option<(i64, i64)>,
    },
    PersistenceFailedAfterWipe {
        detail: String,
    },
}

#[derive(Clone)]
pub struct PlannerService {
    db: DbPool,
    exam_service: Arc<ExamService>,
    availability_service: Arc<AvailabilityService>,
}

impl PlannerService {
    pub fn new(
        db: DbPool,
        exam_service: Arc<ExamService>,
        availability_service: Arc<AvailabilityService>,
    ) -> Self {
        Self {
            db,
            exam_service,
            availability_service,
        }
    }

    /// Regenerates the user's weekly schedule from scratch for the 7 days
    /// starting at `today`. Two runs for the same user must not execute
    /// concurrently; this service takes no lock of its own.
    pub fn generate_schedule(&self, user_id: &str, today: NaiveDate) -> AppResult<ScheduleOutcome> {
        let horizon_end = today + Duration::days(HORIZON_DAYS);
        let exams = self
            .exam_service
            .exams_due_in_window(user_id, today, horizon_end)?;
        if exams.is_empty() {
            info!(target: "app::planner", user_id, "no exams due within the horizon");
            return Ok(ScheduleOutcome::NoUpcomingWork);
        }

        let availability = self.availability_service.get(user_id)?;
        let pool = schedule_packer::decompose_exams(&exams, today);
        let intervals = schedule_packer::resolve_open_intervals(&availability, today);
        debug!(
            target: "app::planner",
            user_id,
            work_items = pool.len(),
            open_days = intervals.len(),
            "scheduling inputs resolved"
        );

        // The wipe commits on its own before the new batch is inserted; the
        // window between the two is the asymmetric failure reported below.
        let wiped = self
            .db
            .with_connection(|conn| ScheduledTaskRepository::delete_all_for_user(conn, user_id))?;
        debug!(target: "app::planner", user_id, wiped, "previous schedule wiped");

        let placed = schedule_packer::pack_week(pool, &intervals);
        let now = Utc::now().to_rfc3339();
        let rows: Vec<ScheduledTaskRow> = placed
            .iter()
            .map(|task| {
                ScheduledTaskRow::from_record(&ScheduledTaskRecord {
                    id: Uuid::new_v4().to_string(),
                    user_id: user_id.to_string(),
                    source_exam_id: Some(task.source_exam_id.clone()),
                    date: task.date,
                    start_time: task.start_time,
                    end_time: task.end_time,
                    label: task.label.clone(),
                    sequence_number: task.sequence_number,
                    completed: false,
                    created_at: now.clone(),
                })
            })
            .collect();

        let insert_result = self
            .db
            .get_connection()
            .and_then(|mut conn| ScheduledTaskRepository::insert_batch(&mut conn, &rows));
        if let Err(error) = insert_result {
            warn!(
                target: "app::planner",
                user_id,
                %error,
                "insert failed after wipe, user is left without a schedule"
            );
            return Ok(ScheduleOutcome::PersistenceFailedAfterWipe {
                detail: error.to_string(),
            });
        }

        let placed_count = rows.len();
        let sequence_range = if placed_count == 0 {
            None
        } else {
            Some((1, placed_count as i64))
        };
        info!(target: "app::planner", user_id, placed = placed_count, "schedule committed");
        Ok(ScheduleOutcome::Committed {
            placed_count,
            sequence_range,
        })
    }

    pub fn generate_schedule_today(&self, user_id: &str) -> AppResult<ScheduleOutcome> {
        self.generate_schedule(user_id, Utc::now().date_naive())
    }

    /// The user's current schedule in day and sequence order.
    pub fn list_schedule(&self, user_id: &str) -> AppResult<Vec<ScheduledTaskRecord>> {
        let rows = self
            .db
            .with_connection(|conn| ScheduledTaskRepository::list_for_user(conn, user_id))?;
        rows.into_iter()
            .map(|row| row.into_record())
            .collect::<AppResult<Vec<_>>>()
    }

    /// Completion toggle for a single task, the one mutation that happens
    /// outside a regeneration run.
    pub fn set_completed(&self, task_id: &str, completed: bool) -> AppResult<()> {
        self.db
            .with_connection(|conn| ScheduledTaskRepository::set_completed(conn, task_id, completed))?;
        info!(target: "app::planner", task_id, completed, "task completion updated");
        Ok(())
    }
}

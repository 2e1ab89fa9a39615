use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::db::repositories::exam_repository::{ExamRepository, ExamRow};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::exam::{ExamCreateInput, ExamRecord};

#[derive(Clone)]
pub struct ExamService {
    db: DbPool,
}

impl ExamService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn create_exam(&self, input: ExamCreateInput) -> AppResult<ExamRecord> {
        let subject = normalize_subject(&input.subject)?;
        let topics = input
            .topics
            .map(|value| value.trim().to_string())
            .unwrap_or_default();

        let record = ExamRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: input.user_id,
            subject,
            due_date: input.due_date,
            topics,
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        let row = ExamRow::from_record(&record);
        self.db
            .with_connection(|conn| ExamRepository::insert(conn, &row))?;
        info!(exam_id = %record.id, "exam record created");
        Ok(record)
    }

    pub fn get_exam(&self, id: &str) -> AppResult<ExamRecord> {
        let row = self
            .db
            .with_connection(|conn| ExamRepository::find_by_id(conn, id))?
            .ok_or_else(AppError::not_found)?;
        row.into_record()
    }

    pub fn delete_exam(&self, id: &str) -> AppResult<()> {
        let deleted = self
            .db
            .with_connection(|conn| ExamRepository::delete(conn, id))?;
        if deleted == 0 {
            return Err(AppError::not_found());
        }
        info!(exam_id = %id, "exam record deleted");
        Ok(())
    }

    /// All of a user's exams in due-date order, nearest first.
    pub fn list_exams(&self, user_id: &str) -> AppResult<Vec<ExamRecord>> {
        let rows = self
            .db
            .with_connection(|conn| ExamRepository::list_for_user(conn, user_id))?;
        let exams = rows
            .into_iter()
            .map(|row| row.into_record())
            .collect::<AppResult<Vec<_>>>()?;
        debug!(user_id, count = exams.len(), "exams listed");
        Ok(exams)
    }

    /// Exams with `from < due_date <= to`.
    pub fn exams_due_in_window(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<ExamRecord>> {
        let rows = self
            .db
            .with_connection(|conn| ExamRepository::list_due_in_window(conn, user_id, from, to))?;
        rows.into_iter()
            .map(|row| row.into_record())
            .collect::<AppResult<Vec<_>>>()
    }

    /// Countdown view of the agenda: every exam with its days remaining and
    /// a plan label, nearest due date first.
    pub fn agenda_overview(&self, user_id: &str, today: NaiveDate) -> AppResult<Vec<AgendaEntry>> {
        let exams = self.list_exams(user_id)?;
        let entries = exams
            .into_iter()
            .map(|exam| {
                let days_remaining = (exam.due_date - today).num_days();
                AgendaEntry {
                    days_remaining,
                    plan_label: plan_label(days_remaining).to_string(),
                    exam,
                }
            })
            .collect();
        Ok(entries)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgendaEntry {
    pub exam: ExamRecord,
    pub days_remaining: i64,
    pub plan_label: String,
}

fn plan_label(days_remaining: i64) -> &'static str {
    if days_remaining < 0 {
        "😥 Exam day has passed"
    } else if days_remaining <= 3 {
        "🚨 Critical! Start now"
    } else if days_remaining <= 7 {
        "🔥 Intense study period"
    } else {
        "✅ On track"
    }
}

fn normalize_subject(raw: &str) -> AppResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("subject must not be empty"));
    }
    Ok(trimmed.to_string())
}

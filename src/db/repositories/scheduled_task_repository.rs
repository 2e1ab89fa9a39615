use std::convert::TryFrom;

use chrono::{NaiveDate, NaiveTime};
use rusqlite::{named_params, Connection, Row};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::models::schedule::ScheduledTaskRecord;

const BASE_SELECT: &str = r#"
    SELECT
        id,
        user_id,
        source_exam_id,
        date,
        start_time,
        end_time,
        label,
        sequence_number,
        completed,
        created_at
    FROM scheduled_tasks
"#;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone)]
pub struct ScheduledTaskRow {
    pub id: String,
    pub user_id: String,
    pub source_exam_id: Option<String>,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub label: String,
    pub sequence_number: i64,
    pub completed: bool,
    pub created_at: String,
}

impl ScheduledTaskRow {
    pub fn from_record(record: &ScheduledTaskRecord) -> Self {
        Self {
            id: record.id.clone(),
            user_id: record.user_id.clone(),
            source_exam_id: record.source_exam_id.clone(),
            date: record.date.format(DATE_FORMAT).to_string(),
            start_time: record.start_time.format(TIME_FORMAT).to_string(),
            end_time: record.end_time.format(TIME_FORMAT).to_string(),
            label: record.label.clone(),
            sequence_number: record.sequence_number,
            completed: record.completed,
            created_at: record.created_at.clone(),
        }
    }

    pub fn into_record(self) -> AppResult<ScheduledTaskRecord> {
        let date = NaiveDate::parse_from_str(&self.date, DATE_FORMAT).map_err(|err| {
            AppError::validation_with_details(
                "invalid stored date",
                json!({"value": self.date, "error": err.to_string()}),
            )
        })?;
        let start_time = parse_stored_time(&self.start_time)?;
        let end_time = parse_stored_time(&self.end_time)?;
        Ok(ScheduledTaskRecord {
            id: self.id,
            user_id: self.user_id,
            source_exam_id: self.source_exam_id,
            date,
            start_time,
            end_time,
            label: self.label,
            sequence_number: self.sequence_number,
            completed: self.completed,
            created_at: self.created_at,
        })
    }
}

impl TryFrom<&Row<'_>> for ScheduledTaskRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            source_exam_id: row.get("source_exam_id")?,
            date: row.get("date")?,
            start_time: row.get("start_time")?,
            end_time: row.get("end_time")?,
            label: row.get("label")?,
            sequence_number: row.get("sequence_number")?,
            completed: row.get("completed")?,
            created_at: row.get("created_at")?,
        })
    }
}

pub struct ScheduledTaskRepository;

impl ScheduledTaskRepository {
    /// Idempotent: deleting an already-empty schedule succeeds and reports
    /// zero rows.
    pub fn delete_all_for_user(conn: &Connection, user_id: &str) -> AppResult<usize> {
        let deleted = conn.execute(
            "DELETE FROM scheduled_tasks WHERE user_id = :user_id",
            named_params! {":user_id": user_id},
        )?;
        Ok(deleted)
    }

    /// Inserts the whole batch inside one transaction; either every row
    /// becomes visible or none do.
    pub fn insert_batch(conn: &mut Connection, rows: &[ScheduledTaskRow]) -> AppResult<()> {
        let tx = conn.transaction()?;
        for row in rows {
            Self::insert(&tx, row)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn insert(conn: &Connection, row: &ScheduledTaskRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO scheduled_tasks (
                    id, user_id, source_exam_id, date, start_time, end_time,
                    label, sequence_number, completed, created_at
                )
                VALUES (
                    :id, :user_id, :source_exam_id, :date, :start_time, :end_time,
                    :label, :sequence_number, :completed, :created_at
                )
            "#,
            named_params! {
                ":id": row.id,
                ":user_id": row.user_id,
                ":source_exam_id": row.source_exam_id,
                ":date": row.date,
                ":start_time": row.start_time,
                ":end_time": row.end_time,
                ":label": row.label,
                ":sequence_number": row.sequence_number,
                ":completed": row.completed,
                ":created_at": row.created_at,
            },
        )?;
        Ok(())
    }

    pub fn list_for_user(conn: &Connection, user_id: &str) -> AppResult<Vec<ScheduledTaskRow>> {
        let sql = format!(
            "{BASE_SELECT} WHERE user_id = :user_id ORDER BY date ASC, sequence_number ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(named_params! {":user_id": user_id}, |row| {
                ScheduledTaskRow::try_from(row)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn set_completed(conn: &Connection, id: &str, completed: bool) -> AppResult<()> {
        let changed = conn.execute(
            "UPDATE scheduled_tasks SET completed = :completed WHERE id = :id",
            named_params! {":completed": completed, ":id": id},
        )?;
        if changed == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }
}

fn parse_stored_time(value: &str) -> AppResult<NaiveTime> {
    NaiveTime::parse_from_str(value, TIME_FORMAT).map_err(|err| {
        AppError::validation_with_details(
            "invalid stored time",
            json!({"value": value, "error": err.to_string()}),
        )
    })
}

use std::convert::TryFrom;

use chrono::NaiveDate;
use rusqlite::{named_params, Connection, OptionalExtension, Row};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::models::exam::ExamRecord;

const BASE_SELECT: &str = r#"
    SELECT
        id,
        user_id,
        subject,
        due_date,
        topics,
        created_at
    FROM exam_records
"#;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone)]
pub struct ExamRow {
    pub id: String,
    pub user_id: String,
    pub subject: String,
    pub due_date: String,
    pub topics: String,
    pub created_at: String,
}

impl ExamRow {
    pub fn from_record(record: &ExamRecord) -> Self {
        Self {
            id: record.id.clone(),
            user_id: record.user_id.clone(),
            subject: record.subject.clone(),
            due_date: record.due_date.format(DATE_FORMAT).to_string(),
            topics: record.topics.clone(),
            created_at: record.created_at.clone(),
        }
    }

    pub fn into_record(self) -> AppResult<ExamRecord> {
        let due_date = parse_stored_date(&self.due_date)?;
        Ok(ExamRecord {
            id: self.id,
            user_id: self.user_id,
            subject: self.subject,
            due_date,
            topics: self.topics,
            created_at: self.created_at,
        })
    }
}

impl TryFrom<&Row<'_>> for ExamRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            subject: row.get("subject")?,
            due_date: row.get("due_date")?,
            topics: row.get("topics")?,
            created_at: row.get("created_at")?,
        })
    }
}

pub struct ExamRepository;

impl ExamRepository {
    pub fn insert(conn: &Connection, row: &ExamRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO exam_records (id, user_id, subject, due_date, topics, created_at)
                VALUES (:id, :user_id, :subject, :due_date, :topics, :created_at)
            "#,
            named_params! {
                ":id": row.id,
                ":user_id": row.user_id,
                ":subject": row.subject,
                ":due_date": row.due_date,
                ":topics": row.topics,
                ":created_at": row.created_at,
            },
        )?;
        Ok(())
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<ExamRow>> {
        let sql = format!("{BASE_SELECT} WHERE id = :id");
        let mut stmt = conn.prepare(&sql)?;
        let row = stmt
            .query_row(named_params! {":id": id}, |row| ExamRow::try_from(row))
            .optional()?;
        Ok(row)
    }

    pub fn list_for_user(conn: &Connection, user_id: &str) -> AppResult<Vec<ExamRow>> {
        let sql = format!("{BASE_SELECT} WHERE user_id = :user_id ORDER BY due_date ASC, created_at ASC");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(named_params! {":user_id": user_id}, |row| {
                ExamRow::try_from(row)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Exams with `from < due_date <= to`. Dates are stored as zero-padded
    /// `%Y-%m-%d` text, so lexicographic comparison is chronological.
    pub fn list_due_in_window(
        conn: &Connection,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<ExamRow>> {
        let sql = format!(
            "{BASE_SELECT} WHERE user_id = :user_id AND due_date > :from AND due_date <= :to ORDER BY due_date ASC, created_at ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                named_params! {
                    ":user_id": user_id,
                    ":from": from.format(DATE_FORMAT).to_string(),
                    ":to": to.format(DATE_FORMAT).to_string(),
                },
                |row| ExamRow::try_from(row),
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn delete(conn: &Connection, id: &str) -> AppResult<usize> {
        let changed = conn.execute("DELETE FROM exam_records WHERE id = :id", named_params! {":id": id})?;
        Ok(changed)
    }
}

fn parse_stored_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|err| {
        AppError::validation_with_details(
            "invalid stored date",
            json!({"value": value, "error": err.to_string()}),
        )
    })
}

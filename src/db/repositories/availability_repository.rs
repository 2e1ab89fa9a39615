use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::AppResult;

#[derive(Debug, Clone)]
pub struct AvailabilityRuleRow {
    pub user_id: String,
    pub weekday: String,
    pub window: String,
}

impl TryFrom<&Row<'_>> for AvailabilityRuleRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: row.get("user_id")?,
            weekday: row.get("weekday")?,
            window: row.get("window")?,
        })
    }
}

pub struct AvailabilityRepository;

impl AvailabilityRepository {
    pub fn upsert_rule(
        conn: &Connection,
        user_id: &str,
        weekday: &str,
        window: &str,
    ) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO availability_rules (user_id, weekday, window)
                VALUES (:user_id, :weekday, :window)
                ON CONFLICT(user_id, weekday) DO UPDATE SET
                    window = excluded.window,
                    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            "#,
            named_params! {":user_id": user_id, ":weekday": weekday, ":window": window},
        )?;
        Ok(())
    }

    pub fn delete_rule(conn: &Connection, user_id: &str, weekday: &str) -> AppResult<()> {
        conn.execute(
            "DELETE FROM availability_rules WHERE user_id = :user_id AND weekday = :weekday",
            named_params! {":user_id": user_id, ":weekday": weekday},
        )?;
        Ok(())
    }

    pub fn fetch_rules(conn: &Connection, user_id: &str) -> AppResult<Vec<AvailabilityRuleRow>> {
        let mut stmt = conn.prepare(
            "SELECT user_id, weekday, window FROM availability_rules WHERE user_id = :user_id",
        )?;
        let rows = stmt
            .query_map(named_params! {":user_id": user_id}, |row| {
                AvailabilityRuleRow::try_from(row)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn set_blocked_window(conn: &Connection, user_id: &str, window: &str) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO blocked_windows (user_id, window)
                VALUES (:user_id, :window)
                ON CONFLICT(user_id) DO UPDATE SET
                    window = excluded.window,
                    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            "#,
            named_params! {":user_id": user_id, ":window": window},
        )?;
        Ok(())
    }

    pub fn clear_blocked_window(conn: &Connection, user_id: &str) -> AppResult<()> {
        conn.execute(
            "DELETE FROM blocked_windows WHERE user_id = :user_id",
            named_params! {":user_id": user_id},
        )?;
        Ok(())
    }

    pub fn fetch_blocked_window(conn: &Connection, user_id: &str) -> AppResult<Option<String>> {
        let mut stmt =
            conn.prepare("SELECT window FROM blocked_windows WHERE user_id = :user_id")?;
        let window = stmt
            .query_row(named_params! {":user_id": user_id}, |row| row.get(0))
            .optional()?;
        Ok(window)
    }
}

use std::collections::HashMap;

use chrono::Weekday;
use tracing::{info, warn};

use crate::db::repositories::availability_repository::AvailabilityRepository;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::availability::{parse_weekday_key, weekday_key, WeeklyAvailability};
use crate::services::schedule_utils::TimeWindow;

/// Settings surface for the weekly free-time windows and the daily blocked
/// window. Setters validate by parsing but persist the caller's exact
/// string, so the stored text round-trips losslessly back to the UI.
#[derive(Clone)]
pub struct AvailabilityService {
    db: DbPool,
}

impl AvailabilityService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn get(&self, user_id: &str) -> AppResult<WeeklyAvailability> {
        self.db.with_connection(|conn| {
            let rows = AvailabilityRepository::fetch_rules(conn, user_id)?;
            let blocked_window = AvailabilityRepository::fetch_blocked_window(conn, user_id)?;

            let mut weekday_rules = HashMap::new();
            for row in rows {
                match parse_weekday_key(&row.weekday) {
                    Some(weekday) => {
                        weekday_rules.insert(weekday, row.window);
                    }
                    None => {
                        warn!(
                            target: "app::planner",
                            weekday = %row.weekday,
                            "ignoring availability rule with unknown weekday key"
                        );
                    }
                }
            }

            Ok(WeeklyAvailability {
                weekday_rules,
                blocked_window,
            })
        })
    }

    pub fn set_rule(&self, user_id: &str, weekday: Weekday, window: &str) -> AppResult<()> {
        TimeWindow::parse(window)?;
        self.db.with_connection(|conn| {
            AvailabilityRepository::upsert_rule(conn, user_id, weekday_key(weekday), window)
        })?;
        info!(user_id, weekday = weekday_key(weekday), window, "availability rule stored");
        Ok(())
    }

    pub fn remove_rule(&self, user_id: &str, weekday: Weekday) -> AppResult<()> {
        self.db.with_connection(|conn| {
            AvailabilityRepository::delete_rule(conn, user_id, weekday_key(weekday))
        })?;
        info!(user_id, weekday = weekday_key(weekday), "availability rule removed");
        Ok(())
    }

    pub fn set_blocked_window(&self, user_id: &str, window: &str) -> AppResult<()> {
        TimeWindow::parse(window)?;
        self.db.with_connection(|conn| {
            AvailabilityRepository::set_blocked_window(conn, user_id, window)
        })?;
        info!(user_id, window, "blocked window stored");
        Ok(())
    }

    pub fn clear_blocked_window(&self, user_id: &str) -> AppResult<()> {
        self.db
            .with_connection(|conn| AvailabilityRepository::clear_blocked_window(conn, user_id))?;
        info!(user_id, "blocked window cleared");
        Ok(())
    }
}

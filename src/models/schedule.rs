use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// One placed study block as persisted for the user's week. A schedule is
/// always regenerated as a whole; rows are never patched in place, except
/// for the completion toggle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTaskRecord {
    pub id: String,
    pub user_id: String,
    pub source_exam_id: Option<String>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub label: String,
    pub sequence_number: i64,
    pub completed: bool,
    pub created_at: String,
}

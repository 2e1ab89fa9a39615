use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One upcoming exam as entered by the user. Due dates are calendar dates,
/// timezone-naive, compared at date granularity only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExamRecord {
    pub id: String,
    pub user_id: String,
    pub subject: String,
    pub due_date: NaiveDate,
    pub topics: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExamCreateInput {
    pub user_id: String,
    pub subject: String,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub topics: Option<String>,
}

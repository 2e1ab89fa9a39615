use std::collections::VecDeque;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::AppResult;
use crate::models::availability::WeeklyAvailability;
use crate::models::exam::ExamRecord;
use crate::services::schedule_utils::{self, TimeWindow};

pub const HORIZON_DAYS: i64 = 7;
pub const BREAK_MINUTES: i64 = 15;

const STUDY_SHARE_PERCENT: i64 = 60;

/// Urgency of an exam's work items, derived from the days left until its
/// due date. Ordinal ordering is part of the contract: `Planned < Intense <
/// Critical`, never the lexical order of the display tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UrgencyTier {
    Planned,
    Intense,
    Critical,
}

impl UrgencyTier {
    pub fn for_days_remaining(days_remaining: i64) -> Self {
        if days_remaining <= 2 {
            UrgencyTier::Critical
        } else if days_remaining <= 4 {
            UrgencyTier::Intense
        } else {
            UrgencyTier::Planned
        }
    }

    pub fn total_minutes(self) -> i64 {
        match self {
            UrgencyTier::Critical => 180,
            UrgencyTier::Intense => 120,
            UrgencyTier::Planned => 60,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            UrgencyTier::Critical => "CRITICAL",
            UrgencyTier::Intense => "INTENSE",
            UrgencyTier::Planned => "PLANNED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WorkKind {
    Study,
    Review,
}

impl WorkKind {
    fn label(self) -> &'static str {
        match self {
            WorkKind::Study => "study",
            WorkKind::Review => "review",
        }
    }
}

/// One unit of schedulable work. Lives only within a single run: it either
/// becomes a scheduled task or is dropped when the horizon ends.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    pub source_exam_id: String,
    pub subject: String,
    pub duration_minutes: i64,
    pub tier: UrgencyTier,
    pub kind: WorkKind,
}

impl WorkItem {
    pub fn label(&self) -> String {
        format!("[{}] {} ({})", self.tier.tag(), self.subject, self.kind.label())
    }
}

/// Usable packing capacity on one day after the blocked window has been
/// subtracted from the free window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenInterval {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// One placed work item, still unpersisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedTask {
    pub source_exam_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub label: String,
    pub sequence_number: i64,
}

/// Splits each exam into a study and a review item and orders the pool by
/// urgency. The split is study = floor(60%), review = remainder, so the two
/// parts always sum exactly to the tier's total. Equal-tier items keep
/// their insertion order (stable sort); there is no secondary due-date key.
pub fn decompose_exams(exams: &[ExamRecord], today: NaiveDate) -> Vec<WorkItem> {
    let mut pool = Vec::with_capacity(exams.len() * 2);
    for exam in exams {
        let days_remaining = (exam.due_date - today).num_days();
        let tier = UrgencyTier::for_days_remaining(days_remaining);
        let total = tier.total_minutes();
        let study_minutes = total * STUDY_SHARE_PERCENT / 100;
        let review_minutes = total - study_minutes;

        pool.push(WorkItem {
            source_exam_id: exam.id.clone(),
            subject: exam.subject.clone(),
            duration_minutes: study_minutes,
            tier,
            kind: WorkKind::Study,
        });
        pool.push(WorkItem {
            source_exam_id: exam.id.clone(),
            subject: exam.subject.clone(),
            duration_minutes: review_minutes,
            tier,
            kind: WorkKind::Review,
        });
    }

    pool.sort_by(|a, b| b.tier.cmp(&a.tier));
    pool
}

/// Resolves the 7-day horizon into zero-or-one open interval per day.
/// Malformed windows never abort the run: a malformed weekday rule skips
/// that day, a malformed blocked window leaves the whole week without
/// capacity.
pub fn resolve_open_intervals(
    availability: &WeeklyAvailability,
    today: NaiveDate,
) -> Vec<OpenInterval> {
    let blocked = match availability.blocked_window.as_deref() {
        Some(raw) => match TimeWindow::parse(raw) {
            Ok(window) => Some(window),
            Err(error) => {
                warn!(
                    target: "app::planner",
                    %error,
                    "blocked window does not parse, week has no open capacity"
                );
                return Vec::new();
            }
        },
        None => None,
    };

    let mut intervals = Vec::new();
    for offset in 0..HORIZON_DAYS {
        let date = today + Duration::days(offset);
        let Some(raw) = availability.rule_for(date.weekday()) else {
            continue;
        };
        match resolve_day(date, raw, blocked) {
            Ok(Some(interval)) => intervals.push(interval),
            Ok(None) => {
                debug!(target: "app::planner", date = %date, "free window fully blocked");
            }
            Err(error) => {
                warn!(
                    target: "app::planner",
                    date = %date,
                    %error,
                    "skipping day with malformed availability window"
                );
            }
        }
    }
    intervals
}

fn resolve_day(
    date: NaiveDate,
    free_raw: &str,
    blocked: Option<TimeWindow>,
) -> AppResult<Option<OpenInterval>> {
    let free = TimeWindow::parse(free_raw)?;
    let open = match blocked {
        Some(blocked) if free.overlaps(&blocked) => {
            // Free time before the blocked window is discarded: the open
            // interval always starts at or after the blocked window's end.
            let start = free.start.max(blocked.end);
            if start >= free.end {
                return Ok(None);
            }
            TimeWindow {
                start,
                end: free.end,
            }
        }
        _ => free,
    };
    Ok(Some(OpenInterval {
        date,
        start: open.start,
        end: open.end,
    }))
}

/// Greedy first-fit-at-head packing over the open intervals in day order.
/// The head item either fits at the cursor or closes the day; later pool
/// items are never considered for the remaining gap. Sequence numbers are
/// global across the run, contiguous from 1 in placement order.
pub fn pack_week(pool: Vec<WorkItem>, intervals: &[OpenInterval]) -> Vec<PlacedTask> {
    let mut queue: VecDeque<WorkItem> = pool.into();
    let mut placed = Vec::new();
    let mut sequence = 0i64;

    'days: for interval in intervals {
        let day_end = schedule_utils::minutes_from_midnight(interval.end);
        let mut cursor = schedule_utils::minutes_from_midnight(interval.start);

        while cursor < day_end {
            let Some(item) = queue.pop_front() else {
                break 'days;
            };
            if cursor + item.duration_minutes <= day_end {
                sequence += 1;
                placed.push(PlacedTask {
                    source_exam_id: item.source_exam_id.clone(),
                    date: interval.date,
                    start_time: schedule_utils::time_from_minutes(cursor),
                    end_time: schedule_utils::time_from_minutes(cursor + item.duration_minutes),
                    label: item.label(),
                    sequence_number: sequence,
                });
                cursor += item.duration_minutes + BREAK_MINUTES;
            } else {
                // The item keeps its priority position and is retried on the
                // next day; the rest of this interval stays unused.
                queue.push_front(item);
                continue 'days;
            }
        }
    }

    if !queue.is_empty() {
        debug!(
            target: "app::planner",
            unplaced = queue.len(),
            "work items left unplaced at the end of the horizon"
        );
    }
    placed
}

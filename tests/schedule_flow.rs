use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Weekday};
use tempfile::tempdir;

use study_agenda::db::repositories::scheduled_task_repository::{
    ScheduledTaskRepository, ScheduledTaskRow,
};
use study_agenda::db::DbPool;
use study_agenda::models::exam::ExamCreateInput;
use study_agenda::services::availability_service::AvailabilityService;
use study_agenda::services::exam_service::ExamService;
use study_agenda::services::planner_service::{PlannerService, ScheduleOutcome};

const USER: &str = "user-1";

const ALL_WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

struct TestApp {
    _dir: tempfile::TempDir,
    pool: DbPool,
    exams: Arc<ExamService>,
    availability: Arc<AvailabilityService>,
    planner: PlannerService,
}

fn setup() -> TestApp {
    let dir = tempdir().expect("temp dir");
    let db_path = dir.path().join("agenda.sqlite");
    let pool = DbPool::new(&db_path).expect("db pool");

    let exams = Arc::new(ExamService::new(pool.clone()));
    let availability = Arc::new(AvailabilityService::new(pool.clone()));
    let planner = PlannerService::new(pool.clone(), Arc::clone(&exams), Arc::clone(&availability));

    TestApp {
        _dir: dir,
        pool,
        exams,
        availability,
        planner,
    }
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
}

fn add_exam(app: &TestApp, subject: &str, due_date: NaiveDate) {
    app.exams
        .create_exam(ExamCreateInput {
            user_id: USER.to_string(),
            subject: subject.to_string(),
            due_date,
            topics: Some("unit 1, unit 2".to_string()),
        })
        .expect("create exam");
}

// 2026-03-02 is a Monday.
fn monday() -> NaiveDate {
    date(2026, 3, 2)
}

#[test]
fn fully_blocked_day_rolls_critical_work_to_the_next_open_evening() {
    let app = setup();
    app.availability
        .set_rule(USER, Weekday::Mon, "09:00-12:00")
        .expect("monday rule");
    app.availability
        .set_rule(USER, Weekday::Tue, "18:00-22:00")
        .expect("tuesday rule");
    app.availability
        .set_blocked_window(USER, "08:00-17:00")
        .expect("blocked window");
    add_exam(&app, "Maths", date(2026, 3, 4));

    let outcome = app
        .planner
        .generate_schedule(USER, monday())
        .expect("generate");
    assert_eq!(
        outcome,
        ScheduleOutcome::Committed {
            placed_count: 2,
            sequence_range: Some((1, 2)),
        }
    );

    let schedule = app.planner.list_schedule(USER).expect("list");
    assert_eq!(schedule.len(), 2);
    // Monday's free window sits inside the blocked window, so nothing may
    // land there; both critical items move to Tuesday evening.
    assert!(schedule.iter().all(|task| task.date == date(2026, 3, 3)));
    assert_eq!(schedule[0].start_time, time(18, 0));
    assert_eq!(schedule[0].end_time, time(19, 48));
    assert_eq!(schedule[0].label, "[CRITICAL] Maths (study)");
    assert_eq!(schedule[1].start_time, time(20, 3));
    assert_eq!(schedule[1].end_time, time(21, 15));
    assert_eq!(schedule[1].label, "[CRITICAL] Maths (review)");
}

#[test]
fn planned_exam_fits_one_evening_with_a_break_between_items() {
    let app = setup();
    app.availability
        .set_rule(USER, Weekday::Tue, "18:00-21:00")
        .expect("tuesday rule");
    app.availability
        .set_blocked_window(USER, "08:00-17:00")
        .expect("blocked window");
    add_exam(&app, "History", date(2026, 3, 8));

    let outcome = app
        .planner
        .generate_schedule(USER, monday())
        .expect("generate");
    assert_eq!(
        outcome,
        ScheduleOutcome::Committed {
            placed_count: 2,
            sequence_range: Some((1, 2)),
        }
    );

    let schedule = app.planner.list_schedule(USER).expect("list");
    assert_eq!(schedule.len(), 2);

    assert_eq!(schedule[0].date, date(2026, 3, 3));
    assert_eq!(schedule[0].start_time, time(18, 0));
    assert_eq!(schedule[0].end_time, time(18, 36));
    assert_eq!(schedule[0].label, "[PLANNED] History (study)");
    assert_eq!(schedule[0].sequence_number, 1);
    assert!(!schedule[0].completed);

    assert_eq!(schedule[1].start_time, time(18, 51));
    assert_eq!(schedule[1].end_time, time(19, 15));
    assert_eq!(schedule[1].label, "[PLANNED] History (review)");
    assert_eq!(schedule[1].sequence_number, 2);
}

#[test]
fn no_upcoming_work_leaves_the_previous_schedule_untouched() {
    let app = setup();
    // Due today and due beyond the horizon both fall outside the window.
    add_exam(&app, "Chemistry", monday());
    add_exam(&app, "Biology", date(2026, 3, 11));

    let leftover = ScheduledTaskRow {
        id: "leftover-1".to_string(),
        user_id: USER.to_string(),
        source_exam_id: None,
        date: "2026-02-23".to_string(),
        start_time: "18:00".to_string(),
        end_time: "19:00".to_string(),
        label: "[PLANNED] Chemistry (study)".to_string(),
        sequence_number: 1,
        completed: true,
        created_at: "2026-02-22T00:00:00Z".to_string(),
    };
    app.pool
        .with_connection(|conn| ScheduledTaskRepository::insert(conn, &leftover))
        .expect("seed leftover task");

    let outcome = app
        .planner
        .generate_schedule(USER, monday())
        .expect("generate");
    assert_eq!(outcome, ScheduleOutcome::NoUpcomingWork);

    let schedule = app.planner.list_schedule(USER).expect("list");
    assert_eq!(schedule.len(), 1);
    assert_eq!(schedule[0].id, "leftover-1");
    assert!(schedule[0].completed);
}

#[test]
fn exam_due_exactly_seven_days_out_is_still_scheduled() {
    let app = setup();
    app.availability
        .set_rule(USER, Weekday::Tue, "18:00-21:00")
        .expect("tuesday rule");
    add_exam(&app, "Geography", date(2026, 3, 9));

    let outcome = app
        .planner
        .generate_schedule(USER, monday())
        .expect("generate");
    assert_eq!(
        outcome,
        ScheduleOutcome::Committed {
            placed_count: 2,
            sequence_range: Some((1, 2)),
        }
    );

    let schedule = app.planner.list_schedule(USER).expect("list");
    assert!(schedule[0].label.starts_with("[PLANNED]"));
}

#[test]
fn full_week_packs_by_urgency_with_breaks_and_contiguous_sequence() {
    let app = setup();
    for weekday in ALL_WEEKDAYS {
        app.availability
            .set_rule(USER, weekday, "18:00-21:00")
            .expect("rule");
    }
    app.availability
        .set_blocked_window(USER, "08:00-17:00")
        .expect("blocked window");

    add_exam(&app, "Maths", date(2026, 3, 4)); // critical, 108 + 72
    add_exam(&app, "Physics", date(2026, 3, 6)); // intense, 72 + 48
    add_exam(&app, "History", date(2026, 3, 8)); // planned, 36 + 24

    let outcome = app
        .planner
        .generate_schedule(USER, monday())
        .expect("generate");
    assert_eq!(
        outcome,
        ScheduleOutcome::Committed {
            placed_count: 6,
            sequence_range: Some((1, 6)),
        }
    );

    let schedule = app.planner.list_schedule(USER).expect("list");
    assert_eq!(schedule.len(), 6);

    // Critical items first, then intense, then planned.
    let labels: Vec<&str> = schedule.iter().map(|task| task.label.as_str()).collect();
    assert_eq!(
        labels,
        vec![
            "[CRITICAL] Maths (study)",
            "[CRITICAL] Maths (review)",
            "[INTENSE] Physics (study)",
            "[INTENSE] Physics (review)",
            "[PLANNED] History (study)",
            "[PLANNED] History (review)",
        ]
    );

    let sequences: Vec<i64> = schedule.iter().map(|task| task.sequence_number).collect();
    assert_eq!(sequences, vec![1, 2, 3, 4, 5, 6]);

    let blocked_start = time(8, 0);
    let blocked_end = time(17, 0);
    for pair in schedule.windows(2) {
        if pair[0].date == pair[1].date {
            let gap = pair[1].start_time - pair[0].end_time;
            assert!(gap >= chrono::Duration::minutes(15));
        }
        assert!(pair[0].date <= pair[1].date);
    }
    for task in &schedule {
        assert!(task.start_time >= blocked_end || task.end_time <= blocked_start);
    }
}

#[test]
fn capacity_shortfall_drops_the_tail_of_the_pool() {
    let app = setup();
    // One short evening for three exams' worth of work.
    app.availability
        .set_rule(USER, Weekday::Tue, "18:00-20:30")
        .expect("rule");
    add_exam(&app, "Maths", date(2026, 3, 4));
    add_exam(&app, "Physics", date(2026, 3, 6));
    add_exam(&app, "History", date(2026, 3, 8));

    let outcome = app
        .planner
        .generate_schedule(USER, monday())
        .expect("generate");

    // 150 minutes of capacity: the critical study block and, after its
    // break, nothing else fits; everything behind the queue head is
    // discarded with the horizon.
    assert_eq!(
        outcome,
        ScheduleOutcome::Committed {
            placed_count: 1,
            sequence_range: Some((1, 1)),
        }
    );
    let schedule = app.planner.list_schedule(USER).expect("list");
    assert_eq!(schedule[0].label, "[CRITICAL] Maths (study)");
}

#[test]
fn regeneration_is_deterministic_for_identical_inputs() {
    let app = setup();
    for weekday in ALL_WEEKDAYS {
        app.availability
            .set_rule(USER, weekday, "18:00-21:00")
            .expect("rule");
    }
    app.availability
        .set_blocked_window(USER, "08:00-17:00")
        .expect("blocked window");
    add_exam(&app, "Maths", date(2026, 3, 4));
    add_exam(&app, "History", date(2026, 3, 8));

    let first_outcome = app
        .planner
        .generate_schedule(USER, monday())
        .expect("first run");
    let first: Vec<_> = app
        .planner
        .list_schedule(USER)
        .expect("list")
        .into_iter()
        .map(|task| {
            (
                task.date,
                task.start_time,
                task.end_time,
                task.label,
                task.sequence_number,
            )
        })
        .collect();

    let second_outcome = app
        .planner
        .generate_schedule(USER, monday())
        .expect("second run");
    let second: Vec<_> = app
        .planner
        .list_schedule(USER)
        .expect("list")
        .into_iter()
        .map(|task| {
            (
                task.date,
                task.start_time,
                task.end_time,
                task.label,
                task.sequence_number,
            )
        })
        .collect();

    assert_eq!(first_outcome, second_outcome);
    assert_eq!(first, second);
}

#[test]
fn wiping_the_schedule_twice_is_idempotent() {
    let app = setup();
    app.availability
        .set_rule(USER, Weekday::Tue, "18:00-21:00")
        .expect("rule");
    add_exam(&app, "Maths", date(2026, 3, 4));
    app.planner
        .generate_schedule(USER, monday())
        .expect("generate");

    let first = app
        .pool
        .with_connection(|conn| ScheduledTaskRepository::delete_all_for_user(conn, USER))
        .expect("first wipe");
    assert!(first > 0);

    let second = app
        .pool
        .with_connection(|conn| ScheduledTaskRepository::delete_all_for_user(conn, USER))
        .expect("second wipe");
    assert_eq!(second, 0);
    assert!(app.planner.list_schedule(USER).expect("list").is_empty());
}

#[test]
fn failed_insert_after_wipe_is_reported_and_recoverable() {
    let app = setup();
    app.availability
        .set_rule(USER, Weekday::Tue, "18:00-21:00")
        .expect("rule");
    add_exam(&app, "Maths", date(2026, 3, 4));
    app.planner
        .generate_schedule(USER, monday())
        .expect("first schedule");
    assert_eq!(app.planner.list_schedule(USER).expect("list").len(), 2);

    app.pool
        .with_connection(|conn| {
            conn.execute_batch(
                r#"
                CREATE TRIGGER scheduled_tasks_insert_guard
                BEFORE INSERT ON scheduled_tasks
                BEGIN
                    SELECT RAISE(ABORT, 'insert disabled');
                END;
                "#,
            )
            .map_err(Into::into)
        })
        .expect("install insert guard");

    let outcome = app
        .planner
        .generate_schedule(USER, monday())
        .expect("run with failing insert");
    match outcome {
        ScheduleOutcome::PersistenceFailedAfterWipe { .. } => {}
        other => panic!("expected PersistenceFailedAfterWipe, got {other:?}"),
    }
    // The wipe went through, the batch did not: the user has no schedule.
    assert!(app.planner.list_schedule(USER).expect("list").is_empty());

    app.pool
        .with_connection(|conn| {
            conn.execute_batch("DROP TRIGGER scheduled_tasks_insert_guard;")
                .map_err(Into::into)
        })
        .expect("remove insert guard");

    // Rerunning the whole call is the documented recovery.
    let retry = app
        .planner
        .generate_schedule(USER, monday())
        .expect("retry");
    assert_eq!(
        retry,
        ScheduleOutcome::Committed {
            placed_count: 2,
            sequence_range: Some((1, 2)),
        }
    );
    assert_eq!(app.planner.list_schedule(USER).expect("list").len(), 2);
}

#[test]
fn committed_with_zero_placements_still_wipes_the_old_schedule() {
    let app = setup();
    // Exams exist, but no availability rules: the week has no capacity.
    add_exam(&app, "Maths", date(2026, 3, 4));

    let leftover = ScheduledTaskRow {
        id: "leftover-2".to_string(),
        user_id: USER.to_string(),
        source_exam_id: None,
        date: "2026-02-23".to_string(),
        start_time: "18:00".to_string(),
        end_time: "19:00".to_string(),
        label: "[PLANNED] Chemistry (study)".to_string(),
        sequence_number: 1,
        completed: false,
        created_at: "2026-02-22T00:00:00Z".to_string(),
    };
    app.pool
        .with_connection(|conn| ScheduledTaskRepository::insert(conn, &leftover))
        .expect("seed leftover task");

    let outcome = app
        .planner
        .generate_schedule(USER, monday())
        .expect("generate");
    assert_eq!(
        outcome,
        ScheduleOutcome::Committed {
            placed_count: 0,
            sequence_range: None,
        }
    );
    assert!(app.planner.list_schedule(USER).expect("list").is_empty());
}

#[test]
fn availability_strings_round_trip_losslessly() {
    let app = setup();
    app.availability
        .set_rule(USER, Weekday::Wed, "07:05-09:30")
        .expect("rule");
    app.availability
        .set_blocked_window(USER, "08:15-16:45")
        .expect("blocked window");

    let availability = app.availability.get(USER).expect("get");
    assert_eq!(availability.rule_for(Weekday::Wed), Some("07:05-09:30"));
    assert_eq!(availability.blocked_window.as_deref(), Some("08:15-16:45"));

    app.availability
        .set_rule(USER, Weekday::Wed, "19:00-22:00")
        .expect("update rule");
    let availability = app.availability.get(USER).expect("get after update");
    assert_eq!(availability.rule_for(Weekday::Wed), Some("19:00-22:00"));

    app.availability
        .remove_rule(USER, Weekday::Wed)
        .expect("remove rule");
    app.availability
        .clear_blocked_window(USER)
        .expect("clear blocked");
    let availability = app.availability.get(USER).expect("get after clear");
    assert!(availability.weekday_rules.is_empty());
    assert!(availability.blocked_window.is_none());
}

#[test]
fn malformed_availability_strings_are_rejected_by_the_settings_surface() {
    let app = setup();
    assert!(app
        .availability
        .set_rule(USER, Weekday::Mon, "evenings")
        .is_err());
    assert!(app
        .availability
        .set_blocked_window(USER, "17:00-08:00")
        .is_err());
}

#[test]
fn completion_toggle_survives_outside_the_run() {
    let app = setup();
    app.availability
        .set_rule(USER, Weekday::Tue, "18:00-21:00")
        .expect("rule");
    add_exam(&app, "Maths", date(2026, 3, 4));
    app.planner
        .generate_schedule(USER, monday())
        .expect("generate");

    let schedule = app.planner.list_schedule(USER).expect("list");
    app.planner
        .set_completed(&schedule[0].id, true)
        .expect("toggle");

    let schedule = app.planner.list_schedule(USER).expect("list after toggle");
    assert!(schedule[0].completed);
    assert!(!schedule[1].completed);

    assert!(app.planner.set_completed("missing-task", true).is_err());
}

#[test]
fn agenda_overview_labels_and_orders_the_countdown() {
    let app = setup();
    add_exam(&app, "Chemistry", date(2026, 2, 28)); // already past
    add_exam(&app, "Maths", date(2026, 3, 4)); // 2 days
    add_exam(&app, "History", date(2026, 3, 8)); // 6 days
    add_exam(&app, "Latin", date(2026, 3, 20)); // far out

    let overview = app
        .exams
        .agenda_overview(USER, monday())
        .expect("overview");
    assert_eq!(overview.len(), 4);

    let subjects: Vec<&str> = overview
        .iter()
        .map(|entry| entry.exam.subject.as_str())
        .collect();
    assert_eq!(subjects, vec!["Chemistry", "Maths", "History", "Latin"]);

    assert_eq!(overview[0].days_remaining, -2);
    assert_eq!(overview[0].plan_label, "😥 Exam day has passed");
    assert_eq!(overview[1].plan_label, "🚨 Critical! Start now");
    assert_eq!(overview[2].plan_label, "🔥 Intense study period");
    assert_eq!(overview[3].plan_label, "✅ On track");
}

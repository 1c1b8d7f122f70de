use std::fmt::Display;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::model::task::Task;
use crate::ops::countdown::{Countdown, task_countdown};
use crate::ops::view::{Counts, EmptyState, Filter};
use crate::util::text::{first_line, fit_to_width};

/// Cells reserved for the abbreviated id column
const ID_WIDTH: usize = 8;
/// Cells reserved for the priority label column
const PRIORITY_WIDTH: usize = 6;
/// Title cells before the countdown column starts
const TITLE_WIDTH: usize = 32;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskJson {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub completed: bool,
    /// Effective priority (unrecognized stored values read as medium)
    pub priority: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub countdown: Option<Countdown>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct ListJson {
    pub filter: Filter,
    pub counts: Counts,
    pub tasks: Vec<TaskJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty: Option<EmptyState>,
}

pub fn task_to_json(task: &Task, countdown: Option<Countdown>) -> TaskJson {
    TaskJson {
        id: task.id.clone(),
        title: task.title.clone(),
        description: task.description.clone(),
        completed: task.completed,
        priority: task.priority().to_string(),
        deadline: task.deadline,
        countdown,
        created_at: task.created_at,
        updated_at: task.updated_at,
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// Leading characters of an id, enough to type back as a prefix
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(ID_WIDTH) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

/// Filter tabs with counts; the active filter is bracketed
pub fn format_counts(counts: &Counts, active: Filter) -> String {
    [
        (Filter::All, "All"),
        (Filter::Active, "Active"),
        (Filter::Completed, "Completed"),
    ]
    .iter()
    .map(|&(filter, name)| {
        let tab = format!("{} ({})", name, counts.get(filter));
        if filter == active {
            format!("[{}]", tab)
        } else {
            tab
        }
    })
    .collect::<Vec<_>>()
    .join("  ")
}

/// One-line summary: checkbox, id, priority, title, countdown
pub fn format_task_line(task: &Task, countdown: Option<&Countdown>) -> String {
    let check = if task.completed { 'x' } else { ' ' };
    let title = first_line(&task.title);
    let tail = match countdown {
        Some(c) => format!("{}  {}", fit_to_width(title, TITLE_WIDTH), c.label),
        None => title.to_string(),
    };
    format!(
        "[{}] {}  {}  {}",
        check,
        fit_to_width(short_id(&task.id), ID_WIDTH),
        fit_to_width(task.priority().label(), PRIORITY_WIDTH),
        tail
    )
}

/// Empty-state heading, hint and optional call to action
pub fn format_empty_state(empty: &EmptyState) -> Vec<String> {
    let mut lines = vec![empty.title.clone(), empty.hint.clone()];
    if empty.offer_create {
        lines.push("Run `tasky add <TITLE>` to create a task.".to_string());
    }
    lines
}

/// Counts header, blank line, then one line per task or the empty state
pub fn format_listing(
    view: &[&Task],
    counts: &Counts,
    filter: Filter,
    empty: Option<&EmptyState>,
    countdown: &dyn Fn(&Task) -> Option<Countdown>,
) -> Vec<String> {
    let mut lines = vec![format_counts(counts, filter), String::new()];
    match empty {
        Some(empty) => lines.extend(format_empty_state(empty)),
        None => {
            for task in view {
                lines.push(format_task_line(task, countdown(task).as_ref()));
            }
        }
    }
    lines
}

/// Timestamp as `YYYY-MM-DD HH:MM` in the given zone
pub fn format_timestamp<Tz>(at: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    at.with_timezone(tz).format("%Y-%m-%d %H:%M").to_string()
}

/// Detailed view of one task
pub fn format_task_detail<Tz>(task: &Task, now: DateTime<Utc>, tz: &Tz) -> Vec<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let check = if task.completed { 'x' } else { ' ' };
    let mut lines = vec![format!("[{}] {}", check, task.title)];
    lines.push(format!("id:        {}", task.id));
    lines.push(format!("priority:  {}", task.priority().label()));
    lines.push(format!(
        "status:    {}",
        if task.completed { "Completed" } else { "Active" }
    ));
    if let Some(deadline) = task.deadline {
        let mut line = format!("deadline:  {}", format_timestamp(deadline, tz));
        if let Some(c) = task_countdown(task, now) {
            line.push_str(&format!(" ({})", c.label));
        }
        lines.push(line);
    }
    lines.push(format!("created:   {}", format_timestamp(task.created_at, tz)));
    lines.push(format!("updated:   {}", format_timestamp(task.updated_at, tz)));
    if let Some(ref description) = task.description {
        lines.push("description:".to_string());
        for l in description.lines() {
            lines.push(format!("  {}", l));
        }
    }
    lines
}

/// One-time greeting shown on first use of a store
pub fn welcome_lines() -> Vec<&'static str> {
    vec![
        "Welcome to Tasky!",
        "Your personal productivity companion to organize and track your tasks efficiently.",
        "",
        "  Set priorities    Mark tasks as high, medium or low priority to focus on what matters most.",
        "  Track deadlines   Set target dates and watch the countdown.",
        "  Overdue alerts    Overdue tasks are flagged so you stay on top of your work.",
        "",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::Priority;
    use crate::ops::view::{counts, derive_view, empty_state};
    use chrono::{Duration, TimeZone};
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap()
    }

    fn task(id: &str, title: &str, priority: Priority) -> Task {
        Task {
            id: id.into(),
            title: title.into(),
            description: None,
            completed: false,
            raw_priority: Some(priority.into()),
            deadline: None,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn sample() -> Vec<Task> {
        let mut milk = task("t-2", "Buy milk", Priority::Low);
        milk.deadline = Some(now() + Duration::days(1));
        let mut spec = task("t-1", "Write spec", Priority::High);
        spec.completed = true;
        let mut report = task(
            "3f2a9c1e-77aa-4d1e-9a55-0c1d2e3f4a5b",
            "File report",
            Priority::Medium,
        );
        report.deadline = Some(now() - Duration::hours(3));
        vec![milk, spec, report]
    }

    fn render(tasks: &[Task], filter: Filter) -> String {
        let view = derive_view(tasks, filter);
        let empty = empty_state(&view, filter);
        format_listing(
            &view,
            &counts(tasks),
            filter,
            empty.as_ref(),
            &|t| task_countdown(t, now()),
        )
        .join("\n")
    }

    #[test]
    fn listing_all() {
        assert_snapshot!(render(&sample(), Filter::All), @r"
        [All (3)]  Active (2)  Completed (1)

        [x] t-1       High    Write spec
        [ ] 3f2a9c1e  Medium  File report                       Overdue by about 3 hours
        [ ] t-2       Low     Buy milk                          Due in 1 day
        ");
    }

    #[test]
    fn listing_empty_filter() {
        let tasks: Vec<Task> = sample().into_iter().filter(|t| !t.completed).collect();
        assert_snapshot!(render(&tasks, Filter::Completed), @r"
        All (2)  Active (2)  [Completed (0)]

        No completed tasks
        You don't have any completed tasks
        ");
    }

    #[test]
    fn listing_no_tasks() {
        assert_snapshot!(render(&[], Filter::All), @r"
        [All (0)]  Active (0)  Completed (0)

        No tasks yet
        Create your first task to get started
        Run `tasky add <TITLE>` to create a task.
        ");
    }

    #[test]
    fn detail_includes_countdown_and_description() {
        let mut t = task("t-9", "Ship it", Priority::High);
        t.deadline = Some(now() + Duration::minutes(30));
        t.description = Some("line one\nline two".into());
        assert_eq!(
            format_task_detail(&t, now(), &Utc),
            vec![
                "[ ] Ship it",
                "id:        t-9",
                "priority:  High",
                "status:    Active",
                "deadline:  2025-05-01 09:30 (Due in 30 minutes)",
                "created:   2025-05-01 09:00",
                "updated:   2025-05-01 09:00",
                "description:",
                "  line one",
                "  line two",
            ]
        );
    }

    #[test]
    fn completed_detail_has_no_countdown() {
        let mut t = task("t-9", "Ship it", Priority::High);
        t.deadline = Some(now() - Duration::days(2));
        t.completed = true;
        let lines = format_task_detail(&t, now(), &Utc);
        assert_eq!(lines[4], "deadline:  2025-04-29 09:00");
    }

    #[test]
    fn short_id_truncates_long_ids() {
        assert_eq!(short_id("3f2a9c1e-77aa"), "3f2a9c1e");
        assert_eq!(short_id("t-1"), "t-1");
    }

    #[test]
    fn json_uses_effective_priority() {
        let mut t = task("t-1", "x", Priority::Low);
        t.raw_priority = None;
        let json = serde_json::to_value(task_to_json(&t, None)).unwrap();
        assert_eq!(json["priority"], "medium");
        assert_eq!(json["updatedAt"], "2025-05-01T09:00:00Z");
        assert!(json.get("countdown").is_none());
    }
}

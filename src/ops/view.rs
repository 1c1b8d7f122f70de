use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::task::Task;

/// Status filter for the task list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl Filter {
    pub fn matches(self, task: &Task) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => !task.completed,
            Filter::Completed => task.completed,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::All => write!(f, "all"),
            Filter::Active => write!(f, "active"),
            Filter::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for Filter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Filter::All),
            "active" => Ok(Filter::Active),
            "completed" | "done" => Ok(Filter::Completed),
            _ => Err(format!(
                "invalid filter '{}' (expected all, active, completed)",
                s
            )),
        }
    }
}

/// Tasks matching `filter`, in stored order
pub fn filter_tasks(tasks: &[Task], filter: Filter) -> Vec<&Task> {
    tasks.iter().filter(|t| filter.matches(t)).collect()
}

/// Display order: priority rank, then earliest deadline, deadline-less last.
pub fn compare_tasks(a: &Task, b: &Task) -> Ordering {
    a.priority()
        .rank()
        .cmp(&b.priority().rank())
        .then_with(|| match (a.deadline, b.deadline) {
            (Some(da), Some(db)) => da.cmp(&db),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

/// Stable in-place sort of a derived view
pub fn sort_tasks(view: &mut [&Task]) {
    view.sort_by(|a, b| compare_tasks(a, b));
}

/// Filtered and sorted view. The source slice is left untouched.
pub fn derive_view(tasks: &[Task], filter: Filter) -> Vec<&Task> {
    let mut view = filter_tasks(tasks, filter);
    sort_tasks(&mut view);
    view
}

/// Per-status totals over the unfiltered collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub all: usize,
    pub active: usize,
    pub completed: usize,
}

impl Counts {
    pub fn get(&self, filter: Filter) -> usize {
        match filter {
            Filter::All => self.all,
            Filter::Active => self.active,
            Filter::Completed => self.completed,
        }
    }
}

pub fn counts(tasks: &[Task]) -> Counts {
    let mut counts = Counts::default();
    for task in tasks {
        counts.all += 1;
        if task.completed {
            counts.completed += 1;
        } else {
            counts.active += 1;
        }
    }
    counts
}

/// Heading and hint shown when a filtered view is empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmptyState {
    pub title: String,
    pub hint: String,
    /// Whether to offer a "create" action
    pub offer_create: bool,
}

/// Empty-state copy, derived from the filter alone. `None` if the view has rows.
pub fn empty_state(view: &[&Task], filter: Filter) -> Option<EmptyState> {
    if !view.is_empty() {
        return None;
    }
    Some(match filter {
        Filter::All => EmptyState {
            title: "No tasks yet".into(),
            hint: "Create your first task to get started".into(),
            offer_create: true,
        },
        other => EmptyState {
            title: format!("No {} tasks", other),
            hint: format!("You don't have any {} tasks", other),
            offer_create: false,
        },
    })
}

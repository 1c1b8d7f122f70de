use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::model::task::Task;

const MINUTES_IN_DAY: i64 = 1440;
const MINUTES_IN_MONTH: i64 = 43_200;

/// Whether a deadline has passed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CountdownState {
    Overdue,
    Upcoming,
}

/// Display state of a deadline at one instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Countdown {
    pub state: CountdownState,
    /// "Overdue by ..." or "Due in ..."
    pub label: String,
    /// Absolute distance between the deadline and the evaluation instant
    #[serde(skip)]
    pub distance: Duration,
}

impl Countdown {
    pub fn is_overdue(&self) -> bool {
        self.state == CountdownState::Overdue
    }
}

/// Evaluate a deadline against `now`. A deadline equal to `now` is overdue.
pub fn evaluate(deadline: DateTime<Utc>, now: DateTime<Utc>) -> Countdown {
    if now >= deadline {
        Countdown {
            state: CountdownState::Overdue,
            label: format!("Overdue by {}", distance_in_words(deadline, now)),
            distance: now - deadline,
        }
    } else {
        Countdown {
            state: CountdownState::Upcoming,
            label: format!("Due in {}", distance_in_words(now, deadline)),
            distance: deadline - now,
        }
    }
}

/// Countdown for a task, or `None` when no countdown is shown
/// (no deadline, or already completed).
pub fn task_countdown(task: &Task, now: DateTime<Utc>) -> Option<Countdown> {
    if task.completed {
        return None;
    }
    task.deadline.map(|deadline| evaluate(deadline, now))
}

/// Human-relative distance between two instants, order-insensitive.
pub fn distance_in_words(a: DateTime<Utc>, b: DateTime<Utc>) -> String {
    let (earlier, later) = if a <= b { (a, b) } else { (b, a) };
    let seconds = (later - earlier).num_seconds();
    let minutes = round_div(seconds, 60);

    if minutes < 2 {
        return if minutes == 0 {
            "less than a minute".to_string()
        } else {
            "1 minute".to_string()
        };
    }
    if minutes < 45 {
        return format!("{} minutes", minutes);
    }
    if minutes < 90 {
        return "about 1 hour".to_string();
    }
    if minutes < MINUTES_IN_DAY {
        let hours = round_div(minutes, 60);
        return format!("about {} hours", hours);
    }
    if minutes < 2520 {
        return "1 day".to_string();
    }
    if minutes < MINUTES_IN_MONTH {
        let days = round_div(minutes, MINUTES_IN_DAY);
        return format!("{} days", days);
    }
    if minutes < MINUTES_IN_MONTH * 2 {
        let months = round_div(minutes, MINUTES_IN_MONTH);
        return plural("about ", months, "month");
    }

    let months = calendar_months(earlier, later);
    if months < 12 {
        let nearest = round_div(minutes, MINUTES_IN_MONTH);
        return plural("", nearest, "month");
    }

    let remainder = months % 12;
    let years = months / 12;
    if remainder < 3 {
        plural("about ", years, "year")
    } else if remainder < 9 {
        plural("over ", years, "year")
    } else {
        plural("almost ", years + 1, "year")
    }
}

fn plural(prefix: &str, n: i64, unit: &str) -> String {
    if n == 1 {
        format!("{}1 {}", prefix, unit)
    } else {
        format!("{}{} {}s", prefix, n, unit)
    }
}

/// Integer division rounding half up, for non-negative operands
fn round_div(n: i64, d: i64) -> i64 {
    (n + d / 2) / d
}

/// Whole calendar months from `earlier` to `later`
fn calendar_months(earlier: DateTime<Utc>, later: DateTime<Utc>) -> i64 {
    let mut months = (later.year() as i64 - earlier.year() as i64) * 12
        + (later.month() as i64 - earlier.month() as i64);
    let later_rest = (later.day(), later.num_seconds_from_midnight());
    let earlier_rest = (earlier.day(), earlier.num_seconds_from_midnight());
    if months > 0 && later_rest < earlier_rest {
        months -= 1;
    }
    months
}

// ---------------------------------------------------------------------------
// Refresh scheduling
// ---------------------------------------------------------------------------

struct Timer {
    deadline: DateTime<Utc>,
    next_tick: DateTime<Utc>,
    current: Countdown,
}

/// Periodic countdown refresh for the tasks currently on screen.
///
/// Holds one timer per visible task with an active deadline. Timers are
/// released when their task leaves the view, completes, or loses its
/// deadline. Driven by the host calling [`CountdownScheduler::tick`].
pub struct CountdownScheduler {
    cadence: Duration,
    timers: IndexMap<String, Timer>,
}

impl CountdownScheduler {
    /// Cadences below one millisecond are raised to one millisecond.
    pub fn new(cadence: Duration) -> Self {
        CountdownScheduler {
            cadence: cadence.max(Duration::milliseconds(1)),
            timers: IndexMap::new(),
        }
    }

    /// One-minute cadence
    pub fn every_minute() -> Self {
        Self::new(Duration::minutes(1))
    }

    pub fn cadence(&self) -> Duration {
        self.cadence
    }

    /// Start (or restart) the timer for `id`, evaluating immediately.
    pub fn schedule(
        &mut self,
        id: &str,
        deadline: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> &Countdown {
        let timer = Timer {
            deadline,
            next_tick: now + self.cadence,
            current: evaluate(deadline, now),
        };
        self.timers.insert(id.to_string(), timer);
        &self.timers[id].current
    }

    /// Release the timer for `id`. Returns whether one was running.
    pub fn cancel(&mut self, id: &str) -> bool {
        self.timers.shift_remove(id).is_some()
    }

    pub fn cancel_all(&mut self) {
        self.timers.clear();
    }

    /// Reconcile timers with the visible tasks: start timers for newly
    /// visible deadlines, restart on a changed deadline, release the rest.
    pub fn sync(&mut self, visible: &[&Task], now: DateTime<Utc>) {
        self.timers.retain(|id, timer| {
            visible.iter().any(|t| {
                t.id == *id && t.has_active_deadline() && t.deadline == Some(timer.deadline)
            })
        });
        for task in visible {
            if let Some(deadline) = task.deadline
                && !task.completed
                && !self.timers.contains_key(&task.id)
            {
                self.schedule(&task.id, deadline, now);
            }
        }
    }

    /// Fire every timer that is due at `now`. Returns the refreshed
    /// countdowns in scheduling order.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<(String, Countdown)> {
        let mut fired = Vec::new();
        for (id, timer) in self.timers.iter_mut() {
            if timer.next_tick > now {
                continue;
            }
            // Missed intervals collapse into one refresh.
            while timer.next_tick <= now {
                timer.next_tick += self.cadence;
            }
            timer.current = evaluate(timer.deadline, now);
            fired.push((id.clone(), timer.current.clone()));
        }
        fired
    }

    /// Earliest pending tick, if any timer is running
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.timers.values().map(|t| t.next_tick).min()
    }

    pub fn get(&self, id: &str) -> Option<&Countdown> {
        self.timers.get(id).map(|t| &t.current)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

use std::cell::Cell;
use std::rc::Rc;

use chrono::{DateTime, Duration, Utc};

use crate::io::persisted::Persisted;
use crate::io::storage::{MemoryStorage, Storage, TASKS_KEY};
use crate::model::task::{Priority, Task};

/// Error type for task operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("Title is required")]
    EmptyTitle,
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Source of "now" for mutations and countdown ticks
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for deterministic tests and replays.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Cell<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        ManualClock {
            now: Cell::new(start),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now);
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

/// Producer of collision-resistant task ids
pub trait IdSource {
    fn next_id(&self) -> String;
}

/// Random v4 UUIDs
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidSource;

impl IdSource for UuidSource {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Sequential ids `<prefix>-1`, `<prefix>-2`, ... for deterministic tests
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: Cell<u64>,
}

impl SequentialIds {
    pub fn new(prefix: &str) -> Self {
        SequentialIds {
            prefix: prefix.to_string(),
            next: Cell::new(1),
        }
    }
}

impl IdSource for SequentialIds {
    fn next_id(&self) -> String {
        let n = self.next.get();
        self.next.set(n + 1);
        format!("{}-{}", self.prefix, n)
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Fields supplied by the form layer to `create`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskInput {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub deadline: Option<DateTime<Utc>>,
}

impl TaskInput {
    pub fn new(title: impl Into<String>) -> Self {
        TaskInput {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), TaskError> {
        if self.title.is_empty() {
            return Err(TaskError::EmptyTitle);
        }
        Ok(())
    }
}

/// Partial edit. `None` leaves a field alone; the nested options of
/// `description` and `deadline` distinguish "clear" from "keep".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub deadline: Option<Option<DateTime<Utc>>>,
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }

    pub fn validate(&self) -> Result<(), TaskError> {
        if matches!(self.title.as_deref(), Some("")) {
            return Err(TaskError::EmptyTitle);
        }
        Ok(())
    }

    fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(priority) = self.priority {
            task.raw_priority = Some(priority.into());
        }
        if let Some(deadline) = self.deadline {
            task.deadline = deadline;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
    }
}

// ---------------------------------------------------------------------------
// Collection engine
// ---------------------------------------------------------------------------

/// The authoritative, newest-first list of tasks, mirrored to storage.
///
/// Every mutation builds a new list and swaps it in whole through a
/// functional update; the previous list is never edited in place. Lookups
/// by a missing id are no-ops.
pub struct TaskCollection {
    store: Persisted<Vec<Task>>,
    clock: Box<dyn Clock>,
    ids: Box<dyn IdSource>,
}

impl TaskCollection {
    pub fn new(store: Persisted<Vec<Task>>, clock: Box<dyn Clock>, ids: Box<dyn IdSource>) -> Self {
        TaskCollection { store, clock, ids }
    }

    /// Load the `tasks` key from `storage`, or start empty.
    pub fn open(storage: Rc<dyn Storage>, clock: Box<dyn Clock>, ids: Box<dyn IdSource>) -> Self {
        Self::new(Persisted::load(storage, TASKS_KEY, Vec::new()), clock, ids)
    }

    /// Collection over process-local storage, seeded with `tasks`
    pub fn in_memory(tasks: Vec<Task>, clock: Box<dyn Clock>, ids: Box<dyn IdSource>) -> Self {
        let storage: Rc<dyn Storage> = Rc::new(MemoryStorage::new());
        Self::new(Persisted::load(storage, TASKS_KEY, tasks), clock, ids)
    }

    pub fn tasks(&self) -> &[Task] {
        self.store.get()
    }

    pub fn len(&self) -> usize {
        self.tasks().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks().is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks().iter().find(|t| t.id == id)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Whether storage writes were abandoned for this session
    pub fn is_degraded(&self) -> bool {
        self.store.is_degraded()
    }

    /// Re-read the stored list after an external change
    pub fn reload(&mut self) -> bool {
        self.store.reload()
    }

    /// Create a task and prepend it. Returns the new task.
    pub fn create(&mut self, input: TaskInput) -> Result<Task, TaskError> {
        input.validate()?;

        let mut id = self.ids.next_id();
        while self.get(&id).is_some() {
            id = self.ids.next_id();
        }
        let now = self.clock.now();
        let task = Task {
            id,
            title: input.title,
            description: input.description,
            completed: false,
            raw_priority: input.priority.map(Into::into),
            deadline: input.deadline,
            created_at: now,
            updated_at: now,
        };

        self.store.update(|prev| {
            let mut next = Vec::with_capacity(prev.len() + 1);
            next.push(task.clone());
            next.extend(prev.iter().cloned());
            next
        });
        Ok(task)
    }

    /// Merge `patch` into the task with `id`. `Ok(None)` if there is no such task.
    pub fn update(&mut self, id: &str, patch: TaskPatch) -> Result<Option<Task>, TaskError> {
        patch.validate()?;
        Ok(self.modify(id, |task| patch.apply(task)))
    }

    /// Flip completion. `None` if there is no such task.
    pub fn toggle_complete(&mut self, id: &str) -> Option<Task> {
        self.modify(id, |task| task.completed = !task.completed)
    }

    /// Remove the task with `id`, returning it. `None` if there is no such task.
    pub fn delete(&mut self, id: &str) -> Option<Task> {
        let removed = self.get(id)?.clone();
        self.store
            .update(|prev| prev.iter().filter(|t| t.id != id).cloned().collect());
        Some(removed)
    }

    fn modify(&mut self, id: &str, f: impl FnOnce(&mut Task)) -> Option<Task> {
        let mut task = self.get(id)?.clone();
        f(&mut task);
        task.updated_at = touched_at(&task, self.clock.now());

        self.store.update(|prev| {
            prev.iter()
                .map(|t| if t.id == task.id { task.clone() } else { t.clone() })
                .collect()
        });
        Some(task)
    }
}

/// New `updatedAt` for a mutation at `now`. Always strictly after the
/// previous value, so a coarse or stalled clock still orders edits.
fn touched_at(task: &Task, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > task.updated_at {
        now
    } else {
        task.updated_at + Duration::milliseconds(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap()
    }

    /// Collection with a clock the test can advance.
    fn collection() -> (TaskCollection, std::rc::Rc<ManualClock>) {
        let clock = std::rc::Rc::new(ManualClock::new(start()));
        let tasks = TaskCollection::in_memory(
            Vec::new(),
            Box::new(SharedClock(clock.clone())),
            Box::new(SequentialIds::new("t")),
        );
        (tasks, clock)
    }

    struct SharedClock(std::rc::Rc<ManualClock>);

    impl Clock for SharedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0.now()
        }
    }

    // --- create ---

    #[test]
    fn test_create_assigns_defaults() {
        let (mut tasks, _) = collection();
        let task = tasks
            .create(TaskInput {
                title: "Write spec".into(),
                priority: Some(Priority::High),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(task.id, "t-1");
        assert!(!task.completed);
        assert_eq!(task.created_at, start());
        assert_eq!(task.created_at, task.updated_at);
        assert_eq!(tasks.get("t-1"), Some(&task));
    }

    #[test]
    fn test_create_prepends_newest_first() {
        let (mut tasks, _) = collection();
        tasks.create(TaskInput::new("first")).unwrap();
        tasks.create(TaskInput::new("second")).unwrap();
        tasks.create(TaskInput::new("third")).unwrap();

        let titles: Vec<&str> = tasks.tasks().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["third", "second", "first"]);
    }

    #[test]
    fn test_create_rejects_empty_title() {
        let (mut tasks, _) = collection();
        assert_eq!(tasks.create(TaskInput::new("")), Err(TaskError::EmptyTitle));
        assert!(tasks.is_empty());
    }

    #[test]
    fn test_create_ids_are_unique() {
        let (mut tasks, _) = collection();
        for i in 0..20 {
            tasks.create(TaskInput::new(format!("task {}", i))).unwrap();
        }
        let mut ids: Vec<&str> = tasks.tasks().iter().map(|t| t.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 20);
    }

    #[test]
    fn test_create_skips_colliding_id() {
        struct Repeating(Cell<u32>);
        impl IdSource for Repeating {
            fn next_id(&self) -> String {
                let n = self.0.get();
                self.0.set(n + 1);
                // first two calls collide
                if n < 2 { "dup".into() } else { format!("id-{}", n) }
            }
        }
        let mut tasks = TaskCollection::in_memory(
            Vec::new(),
            Box::new(ManualClock::new(start())),
            Box::new(Repeating(Cell::new(0))),
        );
        tasks.create(TaskInput::new("a")).unwrap();
        let b = tasks.create(TaskInput::new("b")).unwrap();
        assert_eq!(b.id, "id-2");
    }

    // --- update ---

    #[test]
    fn test_update_merges_and_preserves_identity() {
        let (mut tasks, clock) = collection();
        let created = tasks.create(TaskInput::new("draft")).unwrap();
        clock.advance(Duration::minutes(5));

        let updated = tasks
            .update(
                &created.id,
                TaskPatch {
                    title: Some("final".into()),
                    priority: Some(Priority::Low),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.title, "final");
        assert_eq!(updated.priority(), Priority::Low);
        assert_eq!(updated.description, None);
        assert!(updated.updated_at > created.updated_at);
        assert_eq!(updated.updated_at, start() + Duration::minutes(5));
    }

    #[test]
    fn test_update_clears_optional_fields() {
        let (mut tasks, _) = collection();
        let created = tasks
            .create(TaskInput {
                title: "x".into(),
                description: Some("notes".into()),
                deadline: Some(start() + Duration::days(1)),
                ..Default::default()
            })
            .unwrap();

        let updated = tasks
            .update(
                &created.id,
                TaskPatch {
                    description: Some(None),
                    deadline: Some(None),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.description, None);
        assert_eq!(updated.deadline, None);
    }

    #[test]
    fn test_update_missing_id_is_noop() {
        let (mut tasks, _) = collection();
        tasks.create(TaskInput::new("a")).unwrap();
        let before = tasks.tasks().to_vec();
        let result = tasks.update(
            "nope",
            TaskPatch {
                title: Some("b".into()),
                ..Default::default()
            },
        );
        assert_eq!(result, Ok(None));
        assert_eq!(tasks.tasks(), before.as_slice());
    }

    #[test]
    fn test_update_rejects_empty_title() {
        let (mut tasks, _) = collection();
        let created = tasks.create(TaskInput::new("a")).unwrap();
        let result = tasks.update(
            &created.id,
            TaskPatch {
                title: Some(String::new()),
                ..Default::default()
            },
        );
        assert_eq!(result, Err(TaskError::EmptyTitle));
        assert_eq!(tasks.get(&created.id).unwrap().title, "a");
    }

    #[test]
    fn test_update_with_stalled_clock_still_advances() {
        let (mut tasks, _) = collection();
        let created = tasks.create(TaskInput::new("a")).unwrap();
        let updated = tasks
            .update(&created.id, TaskPatch::default())
            .unwrap()
            .unwrap();
        assert!(updated.updated_at > created.updated_at);
    }

    #[test]
    fn test_update_keeps_position() {
        let (mut tasks, _) = collection();
        let a = tasks.create(TaskInput::new("a")).unwrap();
        tasks.create(TaskInput::new("b")).unwrap();
        tasks
            .update(
                &a.id,
                TaskPatch {
                    title: Some("a2".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        let titles: Vec<&str> = tasks.tasks().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "a2"]);
    }

    // --- toggle ---

    #[test]
    fn test_toggle_twice_restores_state_and_advances_timestamp() {
        let (mut tasks, clock) = collection();
        let created = tasks.create(TaskInput::new("a")).unwrap();

        clock.advance(Duration::seconds(1));
        let once = tasks.toggle_complete(&created.id).unwrap();
        assert!(once.completed);
        assert!(once.updated_at > created.updated_at);

        clock.advance(Duration::seconds(1));
        let twice = tasks.toggle_complete(&created.id).unwrap();
        assert!(!twice.completed);
        assert!(twice.updated_at > once.updated_at);
    }

    #[test]
    fn test_toggle_missing_id_is_noop() {
        let (mut tasks, _) = collection();
        assert_eq!(tasks.toggle_complete("nope"), None);
    }

    // --- delete ---

    #[test]
    fn test_delete_then_operate_is_noop() {
        let (mut tasks, _) = collection();
        let a = tasks.create(TaskInput::new("a")).unwrap();
        tasks.create(TaskInput::new("b")).unwrap();

        let removed = tasks.delete(&a.id).unwrap();
        assert_eq!(removed.id, a.id);
        assert_eq!(tasks.len(), 1);

        assert_eq!(tasks.delete(&a.id), None);
        assert_eq!(tasks.toggle_complete(&a.id), None);
        assert_eq!(
            tasks.update(
                &a.id,
                TaskPatch {
                    title: Some("zombie".into()),
                    ..Default::default()
                },
            ),
            Ok(None)
        );
        assert_eq!(tasks.len(), 1);
    }

    // --- persistence ---

    #[test]
    fn test_mutations_write_through_and_reload() {
        let storage = Rc::new(MemoryStorage::new());
        let mut tasks = TaskCollection::open(
            storage.clone(),
            Box::new(ManualClock::new(start())),
            Box::new(SequentialIds::new("t")),
        );
        let a = tasks.create(TaskInput::new("a")).unwrap();
        tasks.create(TaskInput::new("b")).unwrap();
        tasks.toggle_complete(&a.id);

        let reopened = TaskCollection::open(
            storage.clone(),
            Box::new(SystemClock),
            Box::new(UuidSource),
        );
        assert_eq!(reopened.tasks(), tasks.tasks());

        tasks.delete(&a.id);
        let stored: Vec<Task> = serde_json::from_str(&storage.raw(TASKS_KEY).unwrap()).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].title, "b");
    }

    #[test]
    fn test_write_failure_keeps_memory_state() {
        let storage = Rc::new(MemoryStorage::new());
        let mut tasks = TaskCollection::open(
            storage.clone(),
            Box::new(ManualClock::new(start())),
            Box::new(SequentialIds::new("t")),
        );
        storage.set_read_only(true);
        let a = tasks.create(TaskInput::new("a")).unwrap();
        assert!(tasks.is_degraded());
        assert_eq!(tasks.get(&a.id).map(|t| t.title.as_str()), Some("a"));
        assert_eq!(storage.raw(TASKS_KEY), None);
    }

    #[test]
    fn test_corrupt_storage_opens_empty() {
        let storage = Rc::new(MemoryStorage::with_items([(TASKS_KEY, "{not an array")]));
        let tasks = TaskCollection::open(storage, Box::new(SystemClock), Box::new(UuidSource));
        assert!(tasks.is_empty());
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(TaskPatch::default().is_empty());
        assert!(!TaskPatch {
            completed: Some(true),
            ..Default::default()
        }
        .is_empty());
    }
}

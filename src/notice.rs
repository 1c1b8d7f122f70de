use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use serde::Serialize;

/// A short user-facing message about a completed change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn new(title: &str, description: &str) -> Self {
        Notice {
            title: title.to_string(),
            description: description.to_string(),
        }
    }

    pub fn created() -> Self {
        Notice::new("Task created", "Your new task has been added successfully.")
    }

    pub fn updated() -> Self {
        Notice::new("Task updated", "Your task has been updated successfully.")
    }

    pub fn deleted() -> Self {
        Notice::new("Task deleted", "Your task has been removed successfully.")
    }
}

/// Fire-and-forget delivery of notices
pub trait Notifier {
    fn notify(&self, notice: &Notice);
}

/// Drops every notice
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _notice: &Notice) {}
}

/// Writes each notice as a `title: description` line. A failed write is
/// dropped; delivery never reaches back into the caller.
#[derive(Debug)]
pub struct StreamNotifier<W: Write> {
    out: RefCell<W>,
}

/// Notices on stderr, keeping stdout clean for command output
pub type StderrNotifier = StreamNotifier<io::Stderr>;

impl<W: Write> StreamNotifier<W> {
    pub fn new(out: W) -> Self {
        StreamNotifier {
            out: RefCell::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl StreamNotifier<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write> Notifier for StreamNotifier<W> {
    fn notify(&self, notice: &Notice) {
        let mut out = self.out.borrow_mut();
        let _ = writeln!(out, "{}: {}", notice.title, notice.description);
        let _ = out.flush();
    }
}

/// Keeps notices in a shared list
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    notices: Rc<RefCell<Vec<Notice>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.borrow().clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.notices.borrow().iter().map(|n| n.title.clone()).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: &Notice) {
        self.notices.borrow_mut().push(notice.clone());
    }
}

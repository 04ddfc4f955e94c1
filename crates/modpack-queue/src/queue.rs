//! FIFO task queue with a durable text dump
//!
//! The queue is fed by multiple producers (config watcher, schedule manager,
//! event manager, hooks) and drained by a single consumer. After every
//! mutating operation a human-readable snapshot is written to the dump file;
//! dump failures are logged and never propagated.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tracing::warn;

use crate::task::Task;

/// Mutex-guarded FIFO of tasks
pub struct TasksQueue {
    tasks: Mutex<VecDeque<Task>>,
    dump_path: Option<PathBuf>,
    quiet: AtomicBool,
}

impl TasksQueue {
    /// Create an empty queue without a dump file
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(VecDeque::new()),
            dump_path: None,
            quiet: AtomicBool::new(false),
        }
    }

    /// Create an empty queue that snapshots itself to `path` after every
    /// mutation
    pub fn with_dump_file(path: impl Into<PathBuf>) -> Self {
        Self {
            tasks: Mutex::new(VecDeque::new()),
            dump_path: Some(path.into()),
            quiet: AtomicBool::new(false),
        }
    }

    /// Append a task at the tail
    pub fn add(&self, task: Task) {
        {
            let mut tasks = self.tasks.lock().unwrap();
            tasks.push_back(task);
        }
        self.dump();
    }

    /// Non-destructive read of the head task
    pub fn peek(&self) -> Option<Task> {
        self.tasks.lock().unwrap().front().cloned()
    }

    /// Drop the head task and return it
    pub fn pop(&self) -> Option<Task> {
        let head = {
            let mut tasks = self.tasks.lock().unwrap();
            tasks.pop_front()
        };
        self.dump();
        head
    }

    pub fn length(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().unwrap().is_empty()
    }

    /// Run `f` on the head task under the queue lock. The head may be absent.
    /// A non-empty returned string is logged by the caller.
    pub fn with_lock<F>(&self, f: F) -> String
    where
        F: FnOnce(Option<&mut Task>) -> String,
    {
        let result = {
            let mut tasks = self.tasks.lock().unwrap();
            f(tasks.front_mut())
        };
        self.dump();
        result
    }

    /// Render every task through `f` while holding the lock for the whole
    /// pass, producing the dump body
    pub fn iterate_with_lock<F>(&self, mut f: F) -> String
    where
        F: FnMut(&Task, usize) -> String,
    {
        let tasks = self.tasks.lock().unwrap();
        let mut out = String::new();
        for (index, task) in tasks.iter().enumerate() {
            out.push_str(&f(task, index));
            out.push('\n');
        }
        out
    }

    /// Increment the head task's failure counter
    pub fn increment_failure_count(&self) {
        let message = self.with_lock(|head| match head {
            Some(task) => {
                task.increment_failure_count();
                format!(
                    "failure count for '{}' is now {}",
                    task.name, task.failure_count
                )
            }
            None => String::new(),
        });
        if !message.is_empty() {
            warn!("{}", message);
        }
    }

    /// Suppress dumps during bulk loads. Re-enabling performs one catch-up
    /// dump.
    pub fn set_quiet(&self, quiet: bool) {
        self.quiet.store(quiet, Ordering::SeqCst);
        if !quiet {
            self.dump();
        }
    }

    /// The textual snapshot: a length header, a blank line, then one
    /// paragraph per task. The lock is held for the whole rendering so the
    /// header always matches the body.
    pub fn dump_as_text(&self) -> String {
        let tasks = self.tasks.lock().unwrap();
        let mut out = format!("Queue length {}\n\n", tasks.len());
        for (index, task) in tasks.iter().enumerate() {
            out.push_str(&format!("{}: {}\n", index, task.dump_as_text()));
        }
        out
    }

    fn dump(&self) {
        if self.quiet.load(Ordering::SeqCst) {
            return;
        }
        let Some(path) = self.dump_path.as_deref() else {
            return;
        };
        if let Err(e) = self.write_dump(path) {
            warn!("failed to dump tasks queue to {}: {}", path.display(), e);
        }
    }

    fn write_dump(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.dump_as_text())
    }
}

impl Default for TasksQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let queue = TasksQueue::new();
        queue.add(Task::module_run("a"));
        queue.add(Task::module_run("b"));
        queue.add(Task::module_delete("c"));

        assert_eq!(queue.length(), 3);
        assert_eq!(queue.peek().unwrap().name, "a");
        // peek is non-destructive
        assert_eq!(queue.peek().unwrap().name, "a");

        assert_eq!(queue.pop().unwrap().name, "a");
        assert_eq!(queue.pop().unwrap().name, "b");
        assert_eq!(queue.pop().unwrap().name, "c");
        assert!(queue.pop().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_increment_failure_count() {
        let queue = TasksQueue::new();
        queue.add(Task::module_run("a"));
        queue.add(Task::module_run("b"));

        queue.increment_failure_count();
        queue.increment_failure_count();

        assert_eq!(queue.peek().unwrap().failure_count, 2);
        queue.pop();
        // only the head is counted
        assert_eq!(queue.peek().unwrap().failure_count, 0);
    }

    #[test]
    fn test_increment_on_empty_queue() {
        let queue = TasksQueue::new();
        queue.increment_failure_count();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_with_lock_head_mutation() {
        let queue = TasksQueue::new();
        queue.add(Task::module_run("a"));

        let message = queue.with_lock(|head| {
            let task = head.unwrap();
            task.allow_failure = true;
            format!("patched {}", task.name)
        });

        assert_eq!(message, "patched a");
        assert!(queue.peek().unwrap().allow_failure);
    }

    #[test]
    fn test_iterate_with_lock() {
        let queue = TasksQueue::new();
        queue.add(Task::module_run("a"));
        queue.add(Task::module_run("b"));

        let rendered =
            queue.iterate_with_lock(|task, index| format!("task {}: {}", index, task.name));
        assert_eq!(rendered, "task 0: a\ntask 1: b\n");
    }

    #[test]
    fn test_dump_format() {
        let dir = tempfile::tempdir().unwrap();
        let dump_path = dir.path().join("queue-dump.txt");
        let queue = TasksQueue::with_dump_file(&dump_path);

        queue.add(Task::module_run("first"));
        queue.add(Task::module_delete("second"));

        let dump = std::fs::read_to_string(&dump_path).unwrap();
        assert_eq!(
            dump,
            "Queue length 2\n\n0: ModuleRun first\n1: ModuleDelete second\n"
        );

        queue.pop();
        let dump = std::fs::read_to_string(&dump_path).unwrap();
        assert_eq!(dump, "Queue length 1\n\n0: ModuleDelete second\n");
    }

    #[test]
    fn test_quiet_mode_catches_up_on_reenable() {
        let dir = tempfile::tempdir().unwrap();
        let dump_path = dir.path().join("queue-dump.txt");
        let queue = TasksQueue::with_dump_file(&dump_path);

        queue.set_quiet(true);
        queue.add(Task::module_run("bulk-1"));
        queue.add(Task::module_run("bulk-2"));
        assert!(!dump_path.exists());

        queue.set_quiet(false);
        let dump = std::fs::read_to_string(&dump_path).unwrap();
        assert!(dump.starts_with("Queue length 2\n"));
        assert!(dump.contains("bulk-1"));
        assert!(dump.contains("bulk-2"));
    }

    #[test]
    fn test_dump_failure_is_swallowed() {
        let queue = TasksQueue::with_dump_file("/nonexistent-dir/queue-dump.txt");
        queue.add(Task::module_run("a"));
        assert_eq!(queue.length(), 1);
    }
}

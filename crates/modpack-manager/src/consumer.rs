//! The single queue consumer
//!
//! Tasks execute strictly in insertion order. A failing task without
//! allow-failure stays at the head and is retried: head-of-line blocking is
//! intentional, because the operations are not commutative. Unknown names
//! and malformed configs are popped immediately, they never heal by
//! retrying.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use modpack_queue::{Task, TaskKind, TasksQueue};
use tracing::{debug, error, info, warn};

use crate::error::{ManagerError, Result};
use crate::manager::ModuleManager;

/// What one consumer step did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The queue was empty
    Idle,
    /// The head task finished (successfully or terminally) and was popped
    Done,
    /// The head task failed and stays at the head for a retry
    Retry,
}

pub struct QueueConsumer {
    manager: Arc<ModuleManager>,
    queue: Arc<TasksQueue>,
    stop: Arc<AtomicBool>,
    retry_delay: Duration,
    idle_delay: Duration,
}

impl QueueConsumer {
    pub fn new(manager: Arc<ModuleManager>, queue: Arc<TasksQueue>) -> Self {
        Self {
            manager,
            queue,
            stop: Arc::new(AtomicBool::new(false)),
            retry_delay: Duration::from_secs(5),
            idle_delay: Duration::from_millis(100),
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_idle_delay(mut self, delay: Duration) -> Self {
        self.idle_delay = delay;
        self
    }

    /// Shared flag that makes [`run`](Self::run) stop after the current task
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Drain the queue until the stop flag is raised. The current task is
    /// always finished before stopping.
    pub fn run(&self) {
        info!("queue consumer started");
        while !self.stop.load(Ordering::SeqCst) {
            match self.process_next() {
                StepOutcome::Idle => std::thread::sleep(self.idle_delay),
                StepOutcome::Done => {}
                StepOutcome::Retry => std::thread::sleep(self.retry_delay),
            }
        }
        info!("queue consumer stopped");
    }

    /// Process the head task, if any
    pub fn process_next(&self) -> StepOutcome {
        let Some(task) = self.queue.peek() else {
            return StepOutcome::Idle;
        };

        debug!("processing task: {}", task.dump_as_text());
        match self.dispatch(&task) {
            Ok(()) => {
                self.queue.pop();
                StepOutcome::Done
            }
            Err(e) if !e.is_retryable() => {
                error!("task '{}' failed terminally: {}", task.dump_as_text(), e);
                self.queue.pop();
                StepOutcome::Done
            }
            Err(e) if task.allow_failure => {
                warn!("task '{}' failed (allowed): {}", task.dump_as_text(), e);
                self.queue.pop();
                StepOutcome::Done
            }
            Err(e) => {
                warn!(
                    "task '{}' failed, will retry: {}",
                    task.dump_as_text(),
                    e
                );
                self.queue.increment_failure_count();
                StepOutcome::Retry
            }
        }
    }

    fn dispatch(&self, task: &Task) -> Result<()> {
        match task.kind {
            TaskKind::ModuleRun | TaskKind::ModuleEnable => self.manager.run_module(&task.name),
            TaskKind::ModuleDelete | TaskKind::ModuleDisable => {
                self.manager.delete_module(&task.name)
            }
            TaskKind::ModuleHookRun => {
                let binding = self.hook_binding(task)?;
                self.manager
                    .run_module_hook(&task.name, binding, &task.binding_context)
            }
            TaskKind::GlobalHookRun => {
                let binding = self.hook_binding(task)?;
                self.manager
                    .run_global_hook(&task.name, binding, &task.binding_context)
            }
        }
    }

    fn hook_binding(&self, task: &Task) -> Result<modpack_core::BindingType> {
        task.binding.ok_or_else(|| ManagerError::InvalidConfig {
            message: format!("hook task '{}' carries no binding", task.name),
        })
    }
}

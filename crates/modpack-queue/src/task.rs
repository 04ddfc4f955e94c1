//! Queue task types

use modpack_core::{BindingContext, BindingType};

/// What a task asks the consumer to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    ModuleRun,
    ModuleDelete,
    ModuleHookRun,
    GlobalHookRun,
    ModuleEnable,
    ModuleDisable,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskKind::ModuleRun => "ModuleRun",
            TaskKind::ModuleDelete => "ModuleDelete",
            TaskKind::ModuleHookRun => "ModuleHookRun",
            TaskKind::GlobalHookRun => "GlobalHookRun",
            TaskKind::ModuleEnable => "ModuleEnable",
            TaskKind::ModuleDisable => "ModuleDisable",
        };
        f.write_str(s)
    }
}

/// A unit of work executed serially by the queue consumer.
///
/// The kind is a plain tag; the consumer dispatches on it in one place.
/// `failure_count` and `allow_failure` are common to all kinds.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub kind: TaskKind,

    /// Module name, or hook name for hook-run tasks
    pub name: String,

    /// The binding a hook-run task fires for
    pub binding: Option<BindingType>,

    /// Event contexts handed to the hook
    pub binding_context: Vec<BindingContext>,

    /// How many times this task has failed so far
    pub failure_count: u64,

    /// A failing run still advances the queue
    pub allow_failure: bool,
}

impl Task {
    fn new(kind: TaskKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            binding: None,
            binding_context: Vec::new(),
            failure_count: 0,
            allow_failure: false,
        }
    }

    pub fn module_run(module: impl Into<String>) -> Self {
        Self::new(TaskKind::ModuleRun, module)
    }

    pub fn module_delete(module: impl Into<String>) -> Self {
        Self::new(TaskKind::ModuleDelete, module)
    }

    pub fn module_enable(module: impl Into<String>) -> Self {
        Self::new(TaskKind::ModuleEnable, module)
    }

    pub fn module_disable(module: impl Into<String>) -> Self {
        Self::new(TaskKind::ModuleDisable, module)
    }

    pub fn module_hook_run(
        hook: impl Into<String>,
        binding: BindingType,
        context: Vec<BindingContext>,
    ) -> Self {
        let mut task = Self::new(TaskKind::ModuleHookRun, hook);
        task.binding = Some(binding);
        task.binding_context = context;
        task
    }

    pub fn global_hook_run(
        hook: impl Into<String>,
        binding: BindingType,
        context: Vec<BindingContext>,
    ) -> Self {
        let mut task = Self::new(TaskKind::GlobalHookRun, hook);
        task.binding = Some(binding);
        task.binding_context = context;
        task
    }

    pub fn with_allow_failure(mut self, allow: bool) -> Self {
        self.allow_failure = allow;
        self
    }

    pub fn increment_failure_count(&mut self) {
        self.failure_count += 1;
    }

    /// One-paragraph rendering used by the queue dump
    pub fn dump_as_text(&self) -> String {
        let mut line = format!("{} {}", self.kind, self.name);
        if let Some(binding) = self.binding {
            line.push_str(&format!(" binding={}", binding));
        }
        if self.allow_failure {
            line.push_str(" allowFailure=true");
        }
        if self.failure_count > 0 {
            line.push_str(&format!(" failures={}", self.failure_count));
        }
        line
    }
}

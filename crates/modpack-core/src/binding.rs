//! Hook binding types
//!
//! A binding is one of the lifecycle or event categories a hook may
//! subscribe to. Global hooks and module hooks support different subsets.

use serde::{Deserialize, Serialize};

/// The closed set of hook bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BindingType {
    OnStartup,
    BeforeAll,
    AfterAll,
    BeforeHelm,
    AfterHelm,
    AfterDeleteHelm,
    Schedule,
    Kubernetes,
}

/// Bindings available to global hooks
pub const GLOBAL_BINDINGS: &[BindingType] = &[
    BindingType::OnStartup,
    BindingType::BeforeAll,
    BindingType::AfterAll,
    BindingType::Schedule,
    BindingType::Kubernetes,
];

/// Bindings available to module hooks
pub const MODULE_BINDINGS: &[BindingType] = &[
    BindingType::OnStartup,
    BindingType::BeforeHelm,
    BindingType::AfterHelm,
    BindingType::AfterDeleteHelm,
    BindingType::Schedule,
    BindingType::Kubernetes,
];

impl BindingType {
    /// The name used in hook config documents and binding contexts
    pub fn as_str(&self) -> &'static str {
        match self {
            BindingType::OnStartup => "onStartup",
            BindingType::BeforeAll => "beforeAll",
            BindingType::AfterAll => "afterAll",
            BindingType::BeforeHelm => "beforeHelm",
            BindingType::AfterHelm => "afterHelm",
            BindingType::AfterDeleteHelm => "afterDeleteHelm",
            BindingType::Schedule => "schedule",
            BindingType::Kubernetes => "kubernetes",
        }
    }
}

impl std::fmt::Display for BindingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a hook is global or owned by a module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookScope {
    Global,
    Module,
}

impl HookScope {
    /// The bindings a hook of this scope may subscribe to
    pub fn allowed_bindings(&self) -> &'static [BindingType] {
        match self {
            HookScope::Global => GLOBAL_BINDINGS,
            HookScope::Module => MODULE_BINDINGS,
        }
    }

    pub fn allows(&self, binding: BindingType) -> bool {
        self.allowed_bindings().contains(&binding)
    }
}

impl std::fmt::Display for HookScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookScope::Global => f.write_str("global"),
            HookScope::Module => f.write_str("module"),
        }
    }
}

/// The context handed to a hook run for an event-driven binding.
///
/// Serialized as a JSON array into the hook's `binding_context.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingContext {
    /// The binding name that fired (a binding type name or a schedule name)
    pub binding: String,
}

impl BindingContext {
    pub fn new(binding: impl Into<String>) -> Self {
        Self {
            binding: binding.into(),
        }
    }
}

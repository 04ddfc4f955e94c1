//! Modpack Core - Core types for the modpack addon operator
//!
//! This crate provides the foundational types used throughout modpack:
//! - `Values`: Configuration trees with deep merge support
//! - `ValuesPatch`: Ordered merge / JSON-Patch operations applied atomically
//! - `BindingType`: The lifecycle and event bindings hooks subscribe to
//! - `HookConfig`: The parsed output of a hook's `--config` invocation
//! - `ModuleConfig`: The per-module section of the cluster-stored config

pub mod binding;
pub mod error;
pub mod hook_config;
pub mod module_config;
pub mod patch;
pub mod values;

pub use binding::{BindingContext, BindingType, HookScope};
pub use error::{CoreError, Result};
pub use hook_config::{HookConfig, KubernetesConfig, ScheduleConfig};
pub use module_config::{
    module_name_to_enabled_key, module_name_to_values_key, ModuleConfig,
};
pub use patch::{PatchOp, ValuesPatch};
pub use values::Values;

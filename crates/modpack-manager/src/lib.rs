//! Modpack Manager - the module manager core of the modpack addon operator
//!
//! This crate provides:
//! - **Module Index**: filesystem discovery of modules, their hooks, enabled
//!   scripts and charts
//! - **Values Store**: the six-layer values model with deep-merged views and
//!   atomic patch application
//! - **Hook Registry**: global and per-module hook catalogs with stable
//!   per-binding ordering
//! - **Execution Engine**: runs hooks as child processes and modules as Helm
//!   release operations
//! - **Module Manager Facade**: enabled-set computation and the `run`/`delete`
//!   operations fed by the task queue
//! - **Queue Consumer**: the single serial consumer with retry and
//!   allow-failure semantics

pub mod consumer;
pub mod error;
pub mod executor;
pub mod helm;
pub mod hook;
pub mod index;
pub mod manager;
pub mod module;
pub mod registry;
pub mod store;

#[cfg(test)]
pub(crate) mod testutil;

pub use consumer::{QueueConsumer, StepOutcome};
pub use error::{ManagerError, Result};
pub use executor::{CommandExecutor, CommandOutput, ProcessExecutor};
pub use helm::{HelmCall, HelmCli, HelmClient, MockHelmClient, ReleaseStatus};
pub use hook::Hook;
pub use index::ModuleIndex;
pub use manager::{ModuleManager, ModulesState};
pub use module::Module;
pub use registry::HookRegistry;
pub use store::ValuesStore;

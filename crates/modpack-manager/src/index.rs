//! Module and hook discovery
//!
//! The index is built once from a working directory laid out as:
//!
//! ```text
//! values.yaml                     global + per-module static defaults
//! modules/NNN-<name>/
//!     values.yaml                 optional, merged into the module's statics
//!     Chart.yaml                  Helm chart
//!     enabled                     optional executable
//!     hooks/...                   executables at any depth
//! global-hooks/...                executables at any depth
//! ```
//!
//! Every discovered hook is probed once with `--config` (in a sandbox temp
//! directory) to learn its bindings. The index is immutable after build.

use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;
use modpack_core::{module_name_to_values_key, HookConfig, HookScope, Values};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{ManagerError, Result};
use crate::executor::CommandExecutor;
use crate::hook::Hook;
use crate::module::{parse_directory_name, Module};

const MODULES_DIR: &str = "modules";
const GLOBAL_HOOKS_DIR: &str = "global-hooks";
const HOOKS_DIR: &str = "hooks";
const VALUES_FILE: &str = "values.yaml";
const CHART_FILE: &str = "Chart.yaml";
const ENABLED_FILE: &str = "enabled";

/// Everything discovered from the working directory
pub struct ModuleIndex {
    /// Modules keyed by name, in `(order, name)` order
    pub modules: IndexMap<String, Module>,

    /// Layer 1: the `global` section of the root values file
    pub global_static: Values,

    /// Layer 2 seeds: per-module static defaults
    pub module_static: HashMap<String, Values>,

    /// Global hooks keyed by canonical name, in discovery order
    pub global_hooks: IndexMap<String, Hook>,

    /// Module hooks keyed by module name, then canonical hook name
    pub module_hooks: IndexMap<String, IndexMap<String, Hook>>,
}

impl ModuleIndex {
    /// Walk `working_dir` and build the full index
    pub fn build(working_dir: &Path, executor: &dyn CommandExecutor) -> Result<Self> {
        let root_doc = read_values_doc(&working_dir.join(VALUES_FILE))?;
        let global_static = extract_section(&root_doc, "global");

        let modules = discover_modules(&working_dir.join(MODULES_DIR))?;

        let mut module_static = HashMap::new();
        for module in modules.values() {
            let mut statics = extract_section(&root_doc, &module_name_to_values_key(&module.name));
            let module_doc = read_values_doc(&module.path.join(VALUES_FILE))?;
            statics.merge(&extract_section(
                &module_doc,
                &module_name_to_values_key(&module.name),
            ));
            module_static.insert(module.name.clone(), statics);
        }

        // one sandbox for all --config probes
        let sandbox = tempfile::Builder::new().prefix("modpack-config-").tempdir()?;

        let mut module_hooks = IndexMap::new();
        let modules_dir = working_dir.join(MODULES_DIR);
        for module in modules.values() {
            let hooks = discover_hooks(
                &module.path.join(HOOKS_DIR),
                &modules_dir,
                HookScope::Module,
                executor,
                sandbox.path(),
            )?;
            debug!("module '{}': {} hooks", module.name, hooks.len());
            module_hooks.insert(module.name.clone(), hooks);
        }

        let global_hooks = discover_hooks(
            &working_dir.join(GLOBAL_HOOKS_DIR),
            working_dir,
            HookScope::Global,
            executor,
            sandbox.path(),
        )?;
        debug!("{} global hooks", global_hooks.len());

        Ok(Self {
            modules,
            global_static,
            module_static,
            global_hooks,
            module_hooks,
        })
    }
}

/// Parse a values file into a document tree; an absent file is empty
fn read_values_doc(path: &Path) -> Result<Values> {
    if !path.exists() {
        return Ok(Values::new());
    }
    Values::from_file(path).map_err(ManagerError::from)
}

/// Pull one top-level section out of a values document
fn extract_section(doc: &Values, key: &str) -> Values {
    doc.get(key)
        .map(|section| Values(section.clone()))
        .unwrap_or_default()
}

fn discover_modules(modules_dir: &Path) -> Result<IndexMap<String, Module>> {
    let mut found = Vec::new();
    if modules_dir.is_dir() {
        for entry in std::fs::read_dir(modules_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let directory_name = entry.file_name().to_string_lossy().into_owned();
            let (name, order) = parse_directory_name(&directory_name);
            let path = entry.path();

            let enabled = path.join(ENABLED_FILE);
            let enabled_script = (enabled.is_file() && is_executable(&enabled)).then_some(enabled);

            found.push(Module {
                name,
                has_chart: path.join(CHART_FILE).is_file(),
                enabled_script,
                directory_name,
                order,
                path,
            });
        }
    }

    // directory prefix dominates, name breaks ties
    found.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));

    let mut modules = IndexMap::new();
    for module in found {
        if let Some(previous) = modules.insert(module.name.clone(), module) {
            return Err(ManagerError::InvalidConfig {
                message: format!(
                    "duplicate module name '{}' (directory '{}')",
                    previous.name, previous.directory_name
                ),
            });
        }
    }
    Ok(modules)
}

/// Walk a hooks tree; every regular executable file is a hook. Hook names
/// are paths relative to `name_root`.
fn discover_hooks(
    hooks_dir: &Path,
    name_root: &Path,
    scope: HookScope,
    executor: &dyn CommandExecutor,
    sandbox: &Path,
) -> Result<IndexMap<String, Hook>> {
    let mut hooks = IndexMap::new();
    if !hooks_dir.is_dir() {
        return Ok(hooks);
    }

    for entry in WalkDir::new(hooks_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| ManagerError::InvalidConfig {
            message: format!("walking {}: {}", hooks_dir.display(), e),
        })?;
        if !entry.file_type().is_file() || !is_executable(entry.path()) {
            continue;
        }

        let name = entry
            .path()
            .strip_prefix(name_root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .into_owned();

        let config = probe_hook_config(&name, entry.path(), executor, sandbox)?;
        config.validate(scope).map_err(ManagerError::from)?;

        hooks.insert(name.clone(), Hook::new(name, entry.path(), config));
    }
    Ok(hooks)
}

/// Run `hook --config` and parse its stdout
fn probe_hook_config(
    name: &str,
    path: &Path,
    executor: &dyn CommandExecutor,
    sandbox: &Path,
) -> Result<HookConfig> {
    let output = executor.run(path, &["--config"], sandbox, &[])?;
    if !output.success() {
        return Err(ManagerError::InvalidConfig {
            message: format!(
                "hook '{}' --config exited with {}: {}",
                name,
                output.exit_code,
                output.stderr.trim()
            ),
        });
    }
    HookConfig::from_output(&output.stdout).map_err(|e| ManagerError::InvalidConfig {
        message: format!("hook '{}' config: {}", name, e),
    })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}

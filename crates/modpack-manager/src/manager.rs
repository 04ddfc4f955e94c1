//! Module manager facade
//!
//! Owns the index output, the hook registry, the values store and the
//! external collaborators (Helm client, process executor), and exposes the
//! operations the queue consumer dispatches to: running and deleting
//! modules, running single hooks, and recomputing the enabled module set.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use indexmap::IndexMap;
use modpack_core::{BindingContext, BindingType, ModuleConfig, Values};
use modpack_queue::{Task, TasksQueue};
use tracing::{debug, info, warn};

use crate::error::{ManagerError, Result};
use crate::executor::CommandExecutor;
use crate::helm::HelmClient;
use crate::hook::{Hook, HookRunFiles};
use crate::index::ModuleIndex;
use crate::module::Module;
use crate::registry::HookRegistry;
use crate::store::ValuesStore;

/// The result of one enabled-set recomputation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModulesState {
    /// All currently enabled modules, in run order
    pub enabled: Vec<String>,

    /// Modules that became enabled since the last recomputation
    pub newly_enabled: Vec<String>,

    /// Modules that became disabled, in reverse run order
    pub disabled: Vec<String>,
}

pub struct ModuleManager {
    working_dir: PathBuf,
    namespace: String,
    modules: IndexMap<String, Module>,
    registry: HookRegistry,
    store: ValuesStore,
    helm: Arc<dyn HelmClient>,
    executor: Arc<dyn CommandExecutor>,

    /// The enabled set as of the last `discover_modules_state`
    enabled_modules: Mutex<Vec<String>>,
}

impl ModuleManager {
    /// Build the index from `working_dir` and assemble the manager.
    /// Hook `--config` probes run during this call.
    pub fn init(
        working_dir: &Path,
        namespace: &str,
        helm: Arc<dyn HelmClient>,
        executor: Arc<dyn CommandExecutor>,
    ) -> Result<Self> {
        let index = ModuleIndex::build(working_dir, executor.as_ref())?;
        let ModuleIndex {
            modules,
            global_static,
            module_static,
            global_hooks,
            module_hooks,
        } = index;

        let store = ValuesStore::new();
        let module_names: Vec<String> = modules.keys().cloned().collect();
        store.init_static(global_static, module_static, &module_names);

        info!(
            "initialized module manager: {} modules, {} global hooks",
            modules.len(),
            global_hooks.len()
        );

        Ok(Self {
            working_dir: working_dir.to_path_buf(),
            namespace: namespace.to_string(),
            modules,
            registry: HookRegistry::new(global_hooks, module_hooks),
            store,
            helm,
            executor,
            enabled_modules: Mutex::new(Vec::new()),
        })
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn store(&self) -> &ValuesStore {
        &self.store
    }

    pub fn get_module(&self, name: &str) -> Result<&Module> {
        self.modules
            .get(name)
            .ok_or_else(|| ManagerError::ModuleNotFound {
                name: name.to_string(),
            })
    }

    /// Module names sorted by `(directory prefix, name)`
    pub fn get_module_names_in_order(&self) -> Vec<String> {
        self.modules.keys().cloned().collect()
    }

    pub fn get_global_hook(&self, name: &str) -> Result<&Hook> {
        self.registry.get_global_hook(name)
    }

    pub fn get_module_hook(&self, name: &str) -> Result<&Hook> {
        self.registry.get_module_hook(name).map(|(_, hook)| hook)
    }

    pub fn get_global_hooks_in_order(&self, binding: BindingType) -> Vec<String> {
        self.registry.get_global_hooks_in_order(binding)
    }

    pub fn get_module_hooks_in_order(&self, module: &str, binding: BindingType) -> Vec<String> {
        self.registry.get_module_hooks_in_order(module, binding)
    }

    /// Replace the cluster-stored config layers from a watcher snapshot
    pub fn apply_kube_config(&self, global: Values, module_configs: Vec<ModuleConfig>) {
        let mut per_module = std::collections::HashMap::new();
        let mut enabled = std::collections::HashMap::new();
        for config in module_configs {
            if let Some(flag) = config.is_enabled {
                enabled.insert(config.module_name.clone(), flag);
            }
            per_module.insert(config.module_name, config.values);
        }
        self.store.apply_kube_config(global, per_module, enabled);
    }

    // ========== Hook execution ==========

    /// Run one global hook against the global layers
    pub fn run_global_hook(
        &self,
        name: &str,
        binding: BindingType,
        context: &[BindingContext],
    ) -> Result<()> {
        let hook = self.registry.get_global_hook(name)?;
        debug!("running global hook '{}' for binding '{}'", name, binding);

        let files = HookRunFiles::materialize(
            &self.store.kube_config_values(),
            &self.store.global_view(),
            context,
        )?;
        let Some(files) = self.execute_hook(hook, files)? else {
            return Ok(());
        };

        let config_patch = files.read_config_values_patch()?;
        let values_patch = files.read_values_patch()?;
        if !config_patch.is_empty() {
            self.store.patch_global_config(&config_patch)?;
        }
        if !values_patch.is_empty() {
            self.store.patch_global_dynamic(&values_patch)?;
        }
        Ok(())
    }

    /// Run one module hook against its module's layers
    pub fn run_module_hook(
        &self,
        name: &str,
        binding: BindingType,
        context: &[BindingContext],
    ) -> Result<()> {
        let (module_name, hook) = self.registry.get_module_hook(name)?;
        debug!(
            "running module hook '{}' of '{}' for binding '{}'",
            name, module_name, binding
        );

        let files = HookRunFiles::materialize(
            &self.store.kube_module_config_values(module_name),
            &self.store.module_view(module_name)?,
            context,
        )?;
        let Some(files) = self.execute_hook(hook, files)? else {
            return Ok(());
        };

        let config_patch = files.read_config_values_patch()?;
        let values_patch = files.read_values_patch()?;
        if !config_patch.is_empty() {
            self.store.patch_module_config(module_name, &config_patch)?;
        }
        if !values_patch.is_empty() {
            self.store.patch_module_dynamic(module_name, &values_patch)?;
        }
        Ok(())
    }

    /// Run every global hook bound to `binding`, in order (the operator runs
    /// `beforeAll` / `afterAll` sweeps through this)
    pub fn run_global_hooks_by_binding(&self, binding: BindingType) -> Result<()> {
        let context = [BindingContext::new(binding.as_str())];
        for hook_name in self.get_global_hooks_in_order(binding) {
            self.run_global_hook(&hook_name, binding, &context)?;
        }
        Ok(())
    }

    /// Spawn the hook process. Returns `None` when a failure was downgraded
    /// by `allowFailure` (the run's patches are discarded with it).
    fn execute_hook(&self, hook: &Hook, files: HookRunFiles) -> Result<Option<HookRunFiles>> {
        let output = self
            .executor
            .run(&hook.path, &[], files.dir(), &files.env())?;
        if output.success() {
            return Ok(Some(files));
        }
        if hook.config.allow_failure {
            warn!(
                "hook '{}' failed with exit code {} (allowed): {}",
                hook.name,
                output.exit_code,
                output.stderr.trim()
            );
            return Ok(None);
        }
        Err(ManagerError::HookFailed {
            hook: hook.name.clone(),
            exit_code: output.exit_code,
        })
    }

    // ========== Module execution ==========

    /// Run every hook of a module bound to `binding`, in order, handing each
    /// a context naming the binding that fired
    fn run_module_hooks_by_binding(&self, module: &str, binding: BindingType) -> Result<()> {
        let context = [BindingContext::new(binding.as_str())];
        for hook_name in self.get_module_hooks_in_order(module, binding) {
            self.run_module_hook(&hook_name, binding, &context)?;
        }
        Ok(())
    }

    /// Run a module: `beforeHelm` hooks, failed-revision cleanup, Helm
    /// upgrade, `afterHelm` hooks.
    pub fn run_module(&self, name: &str) -> Result<()> {
        let module = self.get_module(name)?;
        info!("running module '{}'", name);

        self.run_module_hooks_by_binding(name, BindingType::BeforeHelm)?;

        if module.has_chart {
            self.helm.delete_single_failed_revision(module.release_name())?;

            let values = self.store.module_view(name)?;
            let values_file = tempfile::Builder::new()
                .prefix("modpack-values-")
                .suffix(".yaml")
                .tempfile()?;
            std::fs::write(values_file.path(), values.to_yaml()?)?;

            self.helm.upgrade_release(
                module.release_name(),
                module.chart_path(),
                values_file.path(),
                &self.namespace,
            )?;
        }

        self.run_module_hooks_by_binding(name, BindingType::AfterHelm)?;
        Ok(())
    }

    /// Delete a module: `afterDeleteHelm` hooks run first so cleanup logic
    /// can still read the live release, then the release is deleted.
    pub fn delete_module(&self, name: &str) -> Result<()> {
        let module = self.get_module(name)?;
        info!("deleting module '{}'", name);

        self.run_module_hooks_by_binding(name, BindingType::AfterDeleteHelm)?;

        if module.has_chart {
            self.helm.delete_release(module.release_name())?;
        }
        Ok(())
    }

    // ========== Enabled set ==========

    /// The ordered list of enabled modules.
    ///
    /// Per module: an explicit `<camelName>Enabled` flag from the cluster
    /// config wins; otherwise an `enabled` script is consulted; otherwise
    /// the module is enabled.
    pub fn get_enabled_modules_in_order(&self) -> Result<Vec<String>> {
        let mut enabled = Vec::new();
        for (name, module) in &self.modules {
            let verdict = match self.store.module_enabled_flag(name) {
                Some(flag) => flag,
                None => match &module.enabled_script {
                    Some(script) => self.run_enabled_script(name, script)?,
                    None => true,
                },
            };
            if verdict {
                enabled.push(name.clone());
            }
        }
        Ok(enabled)
    }

    fn run_enabled_script(&self, module: &str, script: &Path) -> Result<bool> {
        let files = HookRunFiles::materialize(
            &self.store.kube_module_config_values(module),
            &self.store.module_view(module)?,
            &[],
        )?;
        let output = self.executor.run(script, &[], files.dir(), &files.env())?;
        if !output.success() {
            return Err(ManagerError::HookFailed {
                hook: script.display().to_string(),
                exit_code: output.exit_code,
            });
        }
        match output.stdout.trim() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(ManagerError::InvalidConfig {
                message: format!(
                    "enabled script for '{}' printed '{}', expected true or false",
                    module, other
                ),
            }),
        }
    }

    /// Recompute the enabled set and enqueue the transitions as
    /// `ModuleEnable` / `ModuleDisable` tasks, so the consumer applies
    /// changes serially. Steady state enqueues nothing.
    pub fn discover_modules_state(&self, queue: &TasksQueue) -> Result<ModulesState> {
        let enabled = self.get_enabled_modules_in_order()?;

        let (newly_enabled, disabled) = {
            let mut last = self.enabled_modules.lock().unwrap();
            let newly_enabled: Vec<String> = enabled
                .iter()
                .filter(|m| !last.contains(m))
                .cloned()
                .collect();
            // disable in reverse run order
            let disabled: Vec<String> = last
                .iter()
                .rev()
                .filter(|m| !enabled.contains(m))
                .cloned()
                .collect();
            *last = enabled.clone();
            (newly_enabled, disabled)
        };

        for module in &disabled {
            queue.add(Task::module_disable(module.clone()));
        }
        for module in &newly_enabled {
            queue.add(Task::module_enable(module.clone()));
        }

        Ok(ModulesState {
            enabled,
            newly_enabled,
            disabled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helm::{HelmCall, MockHelmClient};
    use crate::testutil::{fixture_tree, FixtureTree, ScriptedExecutor};
    use modpack_queue::TaskKind;

    fn init_manager(
        tree: &FixtureTree,
        executor: ScriptedExecutor,
    ) -> (ModuleManager, Arc<MockHelmClient>) {
        let helm = Arc::new(MockHelmClient::new());
        let manager = ModuleManager::init(
            tree.path(),
            "default",
            helm.clone(),
            Arc::new(executor),
        )
        .unwrap();
        (manager, helm)
    }

    fn values(json: &str) -> Values {
        Values::from_json(json).unwrap()
    }

    #[test]
    fn test_get_module() {
        let tree = fixture_tree();
        tree.add_module("000-module");

        let (manager, _) = init_manager(&tree, ScriptedExecutor::new());
        let module = manager.get_module("module").unwrap();
        assert_eq!(module.directory_name, "000-module");

        assert!(matches!(
            manager.get_module("missing"),
            Err(ManagerError::ModuleNotFound { .. })
        ));
    }

    #[test]
    fn test_module_names_in_order() {
        let tree = fixture_tree();
        tree.add_module("100-module-c");
        tree.add_module("200-module-a");
        tree.add_module("300-module-b");

        let (manager, _) = init_manager(&tree, ScriptedExecutor::new());
        assert_eq!(
            manager.get_module_names_in_order(),
            vec!["module-c", "module-a", "module-b"]
        );
    }

    #[test]
    fn test_run_module_hook_patches_kube_module_config() {
        let tree = fixture_tree();
        tree.add_module("000-update-kube-module-config");
        tree.write_hook("000-update-kube-module-config/hooks/merge_and_patch_values");

        let executor = ScriptedExecutor::new()
            .with_config("merge_and_patch_values", r#"{"beforeHelm": 1}"#)
            .with_patches(
                "merge_and_patch_values",
                r#"{"op": "merge", "value": {"a": 2, "c": [3]}}"#,
                "",
            );
        let (manager, _) = init_manager(&tree, executor);

        let module = "update-kube-module-config";
        manager
            .store()
            .set_kube_module_config_values(module, values(r#"{"a": 1, "b": 2, "x": "123"}"#));

        manager
            .run_module_hook(
                "000-update-kube-module-config/hooks/merge_and_patch_values",
                BindingType::BeforeHelm,
                &[],
            )
            .unwrap();

        // unmentioned keys preserved, arrays replace
        assert_eq!(
            manager.store().kube_module_config_values(module),
            values(r#"{"a": 2, "b": 2, "c": [3], "x": "123"}"#)
        );
        assert!(manager.store().module_dynamic_values(module).is_empty());
    }

    #[test]
    fn test_run_module_hook_patches_dynamic_values() {
        let tree = fixture_tree();
        tree.add_module("100-update-module-dynamic");
        tree.write_hook("100-update-module-dynamic/hooks/merge_and_patch_values");

        let executor = ScriptedExecutor::new()
            .with_config("merge_and_patch_values", r#"{"beforeHelm": 1}"#)
            .with_patches(
                "merge_and_patch_values",
                "",
                r#"{"op": "merge", "value": {"a": 9, "c": "10"}}"#,
            );
        let (manager, _) = init_manager(&tree, executor);

        let module = "update-module-dynamic";
        manager
            .store()
            .set_module_dynamic_values(module, values(r#"{"a": 123, "x": 10}"#));

        manager
            .run_module_hook(
                "100-update-module-dynamic/hooks/merge_and_patch_values",
                BindingType::BeforeHelm,
                &[],
            )
            .unwrap();

        assert_eq!(
            manager.store().module_dynamic_values(module),
            values(r#"{"a": 9, "c": "10", "x": 10}"#)
        );
        assert!(manager.store().kube_module_config_values(module).is_empty());
    }

    #[test]
    fn test_run_module_sequence() {
        let tree = fixture_tree();
        tree.add_module("000-module");
        tree.write_module_chart("000-module");
        tree.write_hook("000-module/hooks/before");
        tree.write_hook("000-module/hooks/after");

        let executor = ScriptedExecutor::new()
            .with_config("hooks/before", r#"{"beforeHelm": 1}"#)
            .with_config("hooks/after", r#"{"afterHelm": 1}"#)
            .with_patches(
                "hooks/before",
                "",
                r#"{"op": "merge", "value": {"beforeHelm": "override-value"}}"#,
            )
            .with_patches(
                "hooks/after",
                "",
                r#"{"op": "merge", "value": {"afterHelm": "override-value"}}"#,
            );
        let (manager, helm) = init_manager(&tree, executor);

        manager.run_module("module").unwrap();

        // both hook patches landed in the dynamic layer
        assert_eq!(
            manager.store().module_dynamic_values("module"),
            values(r#"{"beforeHelm": "override-value", "afterHelm": "override-value"}"#)
        );

        // failed-revision cleanup strictly before the upgrade
        assert_eq!(
            helm.calls(),
            vec![
                HelmCall::DeleteSingleFailedRevision("module".to_string()),
                HelmCall::UpgradeRelease("module".to_string()),
            ]
        );
    }

    #[test]
    fn test_delete_module_sequence() {
        let tree = fixture_tree();
        tree.add_module("000-module");
        tree.write_module_chart("000-module");
        tree.write_hook("000-module/hooks/cleanup");

        let executor = ScriptedExecutor::new()
            .with_config("hooks/cleanup", r#"{"afterDeleteHelm": 1}"#)
            .with_patches(
                "hooks/cleanup",
                "",
                r#"{"op": "merge", "value": {"afterDeleteHelm": "override-value"}}"#,
            );
        let (manager, helm) = init_manager(&tree, executor);

        manager.delete_module("module").unwrap();

        // the hook patch applied and the release deleted afterwards
        assert_eq!(
            manager.store().module_dynamic_values("module"),
            values(r#"{"afterDeleteHelm": "override-value"}"#)
        );
        assert_eq!(
            helm.calls(),
            vec![HelmCall::DeleteRelease("module".to_string())]
        );
    }

    #[test]
    fn test_failing_hook_aborts_run_module() {
        let tree = fixture_tree();
        tree.add_module("000-module");
        tree.write_module_chart("000-module");
        tree.write_hook("000-module/hooks/broken");

        let executor = ScriptedExecutor::new()
            .with_config("hooks/broken", r#"{"beforeHelm": 1}"#)
            .with_exit_code("hooks/broken", 2);
        let (manager, helm) = init_manager(&tree, executor);

        let result = manager.run_module("module");
        assert!(matches!(
            result,
            Err(ManagerError::HookFailed { exit_code: 2, .. })
        ));
        // Helm was never reached
        assert!(helm.calls().is_empty());
    }

    #[test]
    fn test_allow_failure_discards_patches_and_continues() {
        let tree = fixture_tree();
        tree.add_module("000-module");
        tree.write_module_chart("000-module");
        tree.write_hook("000-module/hooks/tolerated");

        let executor = ScriptedExecutor::new()
            .with_config("hooks/tolerated", r#"{"beforeHelm": 1, "allowFailure": true}"#)
            .with_behavior("hooks/tolerated", |_program, env| {
                // the hook writes a patch, then dies: the patch must not apply
                let path = env
                    .iter()
                    .find(|(k, _)| k == "VALUES_JSON_PATCH_PATH")
                    .map(|(_, v)| v.clone())
                    .unwrap();
                std::fs::write(path, r#"{"op": "merge", "value": {"leaked": true}}"#).unwrap();
                crate::testutil::exit_with(1)
            });
        let (manager, helm) = init_manager(&tree, executor);

        manager.run_module("module").unwrap();

        assert!(manager.store().module_dynamic_values("module").is_empty());
        assert_eq!(helm.calls().len(), 2);
    }

    #[test]
    fn test_run_global_hook_patches_global_layers() {
        let tree = fixture_tree();
        tree.write_global_hook("global-hooks/000-update-kube-config/merge_and_patch_values");

        let executor = ScriptedExecutor::new()
            .with_config("merge_and_patch_values", r#"{"beforeAll": 1}"#)
            .with_patches(
                "merge_and_patch_values",
                r#"{"op": "merge", "value": {"a": 2, "c": [3]}}"#,
                r#"{"op": "merge", "value": {"a": 9, "c": "10"}}"#,
            );
        let (manager, _) = init_manager(&tree, executor);

        manager
            .run_global_hook(
                "global-hooks/000-update-kube-config/merge_and_patch_values",
                BindingType::BeforeAll,
                &[],
            )
            .unwrap();

        assert_eq!(
            manager.store().kube_config_values(),
            values(r#"{"a": 2, "c": [3]}"#)
        );
        assert_eq!(
            manager.store().global_dynamic_values(),
            values(r#"{"a": 9, "c": "10"}"#)
        );
    }

    #[test]
    fn test_global_hooks_sweep_runs_in_binding_order() {
        let tree = fixture_tree();
        tree.write_global_hook("global-hooks/000-order/a");
        tree.write_global_hook("global-hooks/000-order/b");
        tree.write_global_hook("global-hooks/000-order/c");

        let append = |name: &str| format!(r#"{{"op": "add", "path": "/ran/-", "value": "{}"}}"#, name);
        let executor = ScriptedExecutor::new()
            .with_config("000-order/a", r#"{"beforeAll": 3}"#)
            .with_config("000-order/b", r#"{"beforeAll": 1}"#)
            .with_config("000-order/c", r#"{"beforeAll": 2}"#)
            .with_patches("000-order/a", "", &append("a"))
            .with_patches("000-order/b", "", &append("b"))
            .with_patches("000-order/c", "", &append("c"));
        let (manager, _) = init_manager(&tree, executor);

        manager
            .store()
            .patch_global_dynamic(
                &modpack_core::ValuesPatch::from_lines(r#"{"op": "merge", "value": {"ran": []}}"#)
                    .unwrap(),
            )
            .unwrap();

        manager
            .run_global_hooks_by_binding(BindingType::BeforeAll)
            .unwrap();

        assert_eq!(
            manager.store().global_dynamic_values().get("ran").unwrap(),
            &serde_json::json!(["b", "c", "a"])
        );
    }

    #[test]
    fn test_unknown_hook_is_not_found() {
        let tree = fixture_tree();
        let (manager, _) = init_manager(&tree, ScriptedExecutor::new());

        assert!(matches!(
            manager.run_module_hook("ghost", BindingType::BeforeHelm, &[]),
            Err(ManagerError::HookNotFound { .. })
        ));
        assert!(matches!(
            manager.run_global_hook("ghost", BindingType::BeforeAll, &[]),
            Err(ManagerError::HookNotFound { .. })
        ));
    }

    #[test]
    fn test_enabled_defaults_to_true() {
        let tree = fixture_tree();
        tree.add_module("100-plain");

        let (manager, _) = init_manager(&tree, ScriptedExecutor::new());
        assert_eq!(manager.get_enabled_modules_in_order().unwrap(), vec!["plain"]);
    }

    #[test]
    fn test_enabled_explicit_flag_wins_over_script() {
        let tree = fixture_tree();
        tree.add_module("100-flagged");
        // script would say true, but the explicit flag disables the module
        tree.write_enabled_script("100-flagged");

        let executor = ScriptedExecutor::new().with_stdout("100-flagged/enabled", "true");
        let (manager, _) = init_manager(&tree, executor);

        manager.apply_kube_config(
            Values::new(),
            vec![ModuleConfig::new("flagged").with_enabled(false)],
        );

        assert!(manager.get_enabled_modules_in_order().unwrap().is_empty());
    }

    #[test]
    fn test_enabled_script_verdicts() {
        let tree = fixture_tree();
        tree.add_module("100-on");
        tree.add_module("200-off");
        tree.write_enabled_script("100-on");
        tree.write_enabled_script("200-off");

        let executor = ScriptedExecutor::new()
            .with_stdout("100-on/enabled", "true\n")
            .with_stdout("200-off/enabled", "false\n");
        let (manager, _) = init_manager(&tree, executor);

        assert_eq!(manager.get_enabled_modules_in_order().unwrap(), vec!["on"]);
    }

    #[test]
    fn test_enabled_script_garbage_is_invalid_config() {
        let tree = fixture_tree();
        tree.add_module("100-noisy");
        tree.write_enabled_script("100-noisy");

        let executor = ScriptedExecutor::new().with_stdout("100-noisy/enabled", "maybe");
        let (manager, _) = init_manager(&tree, executor);

        assert!(matches!(
            manager.get_enabled_modules_in_order(),
            Err(ManagerError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_discover_modules_state_emits_transition_tasks() {
        let tree = fixture_tree();
        tree.add_module("100-first");
        tree.add_module("200-second");

        let (manager, _) = init_manager(&tree, ScriptedExecutor::new());
        let queue = TasksQueue::new();

        // initial discovery: both become enabled
        let state = manager.discover_modules_state(&queue).unwrap();
        assert_eq!(state.enabled, vec!["first", "second"]);
        assert_eq!(state.newly_enabled, vec!["first", "second"]);
        assert!(state.disabled.is_empty());

        let first = queue.pop().unwrap();
        assert_eq!((first.kind, first.name.as_str()), (TaskKind::ModuleEnable, "first"));
        let second = queue.pop().unwrap();
        assert_eq!((second.kind, second.name.as_str()), (TaskKind::ModuleEnable, "second"));
        assert!(queue.is_empty());

        // steady state: nothing to do
        let state = manager.discover_modules_state(&queue).unwrap();
        assert!(state.newly_enabled.is_empty());
        assert!(state.disabled.is_empty());
        assert!(queue.is_empty());

        // disable one module via the cluster config
        manager.apply_kube_config(
            Values::new(),
            vec![ModuleConfig::new("first").with_enabled(false)],
        );
        let state = manager.discover_modules_state(&queue).unwrap();
        assert_eq!(state.enabled, vec!["second"]);
        assert_eq!(state.disabled, vec!["first"]);

        let task = queue.pop().unwrap();
        assert_eq!((task.kind, task.name.as_str()), (TaskKind::ModuleDisable, "first"));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_apply_kube_config_values_visible_in_view() {
        let tree = fixture_tree();
        tree.add_module("100-m");
        tree.write_root_values("global:\n  g: 1\nm:\n  s: 1\n");

        let (manager, _) = init_manager(&tree, ScriptedExecutor::new());
        manager.apply_kube_config(
            values(r#"{"kc": 1}"#),
            vec![ModuleConfig::new("m").with_values(values(r#"{"kmc": 1}"#))],
        );

        let view = manager.store().module_view("m").unwrap();
        assert_eq!(view, values(r#"{"g": 1, "s": 1, "kc": 1, "kmc": 1}"#));
    }
}

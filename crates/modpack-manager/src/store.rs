//! The six-layer values store
//!
//! Layer order, lowest precedence first:
//!
//! 1. global static values (modules root `values.yaml`, immutable)
//! 2. per-module static values (immutable)
//! 3. kube config values (cluster-stored, global section)
//! 4. per-module kube config values
//! 5. global dynamic values (produced by global hooks)
//! 6. per-module dynamic values (produced by module hooks)
//!
//! Views are deep merges of the relevant layers and are handed out as
//! snapshots: one store-wide lock guards all layers, and the lock is never
//! held across hook or Helm execution.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use modpack_core::{Values, ValuesPatch};

use crate::error::{ManagerError, Result};

#[derive(Default)]
struct Layers {
    global_static: Values,
    module_static: HashMap<String, Values>,
    kube_config: Values,
    kube_module_config: HashMap<String, Values>,
    global_dynamic: Values,
    module_dynamic: HashMap<String, Values>,

    /// Modules known to the index; views exist only for these
    known_modules: HashSet<String>,

    /// Tri-state `<module>Enabled` flags from the cluster config
    module_enabled: HashMap<String, bool>,
}

/// Holds the layered values and produces merged views
pub struct ValuesStore {
    inner: Mutex<Layers>,
}

impl ValuesStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Layers::default()),
        }
    }

    /// Seed the immutable layers from the module index. Called once at init.
    pub fn init_static(
        &self,
        global_static: Values,
        module_static: HashMap<String, Values>,
        module_names: &[String],
    ) {
        let mut layers = self.inner.lock().unwrap();
        layers.global_static = global_static;
        layers.module_static = module_static;
        layers.known_modules = module_names.iter().cloned().collect();
    }

    /// The merged global view: layers 1, 3, 5
    pub fn global_view(&self) -> Values {
        let layers = self.inner.lock().unwrap();
        Values::merge_all([
            layers.global_static.clone(),
            layers.kube_config.clone(),
            layers.global_dynamic.clone(),
        ])
    }

    /// The merged view for one module: layers 1, 2(m), 3, 4(m), 5, 6(m)
    pub fn module_view(&self, module: &str) -> Result<Values> {
        let layers = self.inner.lock().unwrap();
        if !layers.known_modules.contains(module) {
            return Err(ManagerError::ModuleNotFound {
                name: module.to_string(),
            });
        }
        let for_module = |map: &HashMap<String, Values>| map.get(module).cloned().unwrap_or_default();
        Ok(Values::merge_all([
            layers.global_static.clone(),
            for_module(&layers.module_static),
            layers.kube_config.clone(),
            for_module(&layers.kube_module_config),
            layers.global_dynamic.clone(),
            for_module(&layers.module_dynamic),
        ]))
    }

    /// Atomically replace layers 3 and 4 from an external snapshot.
    ///
    /// Per-module entries for unknown modules are retained: they may belong
    /// to modules that appear in a later index load.
    pub fn apply_kube_config(
        &self,
        global: Values,
        per_module: HashMap<String, Values>,
        enabled: HashMap<String, bool>,
    ) {
        let mut layers = self.inner.lock().unwrap();
        layers.kube_config = global;
        layers.kube_module_config = per_module;
        layers.module_enabled = enabled;
    }

    /// The tri-state enabled flag for a module
    pub fn module_enabled_flag(&self, module: &str) -> Option<bool> {
        self.inner.lock().unwrap().module_enabled.get(module).copied()
    }

    pub fn patch_global_config(&self, patch: &ValuesPatch) -> Result<()> {
        let mut layers = self.inner.lock().unwrap();
        let patched = patch.apply(&layers.kube_config)?;
        layers.kube_config = patched;
        Ok(())
    }

    pub fn patch_module_config(&self, module: &str, patch: &ValuesPatch) -> Result<()> {
        let mut layers = self.inner.lock().unwrap();
        if !layers.known_modules.contains(module) {
            return Err(ManagerError::ModuleNotFound {
                name: module.to_string(),
            });
        }
        let base = layers.kube_module_config.get(module).cloned().unwrap_or_default();
        let patched = patch.apply(&base)?;
        layers.kube_module_config.insert(module.to_string(), patched);
        Ok(())
    }

    pub fn patch_global_dynamic(&self, patch: &ValuesPatch) -> Result<()> {
        let mut layers = self.inner.lock().unwrap();
        let patched = patch.apply(&layers.global_dynamic)?;
        layers.global_dynamic = patched;
        Ok(())
    }

    pub fn patch_module_dynamic(&self, module: &str, patch: &ValuesPatch) -> Result<()> {
        let mut layers = self.inner.lock().unwrap();
        if !layers.known_modules.contains(module) {
            return Err(ManagerError::ModuleNotFound {
                name: module.to_string(),
            });
        }
        let base = layers.module_dynamic.get(module).cloned().unwrap_or_default();
        let patched = patch.apply(&base)?;
        layers.module_dynamic.insert(module.to_string(), patched);
        Ok(())
    }

    // Raw layer snapshots. Hook runs materialize these; tests assert on them.

    pub fn global_static_values(&self) -> Values {
        self.inner.lock().unwrap().global_static.clone()
    }

    pub fn module_static_values(&self, module: &str) -> Values {
        let layers = self.inner.lock().unwrap();
        layers.module_static.get(module).cloned().unwrap_or_default()
    }

    pub fn kube_config_values(&self) -> Values {
        self.inner.lock().unwrap().kube_config.clone()
    }

    pub fn kube_module_config_values(&self, module: &str) -> Values {
        let layers = self.inner.lock().unwrap();
        layers
            .kube_module_config
            .get(module)
            .cloned()
            .unwrap_or_default()
    }

    pub fn global_dynamic_values(&self) -> Values {
        self.inner.lock().unwrap().global_dynamic.clone()
    }

    pub fn module_dynamic_values(&self, module: &str) -> Values {
        let layers = self.inner.lock().unwrap();
        layers.module_dynamic.get(module).cloned().unwrap_or_default()
    }

    /// Replace layer 4 for one module (used by tests and the config watcher
    /// when only one module's section changed)
    pub fn set_kube_module_config_values(&self, module: &str, values: Values) {
        let mut layers = self.inner.lock().unwrap();
        layers.kube_module_config.insert(module.to_string(), values);
    }

    /// Replace layer 6 for one module
    pub fn set_module_dynamic_values(&self, module: &str, values: Values) {
        let mut layers = self.inner.lock().unwrap();
        layers.module_dynamic.insert(module.to_string(), values);
    }
}

impl Default for ValuesStore {
    fn default() -> Self {
        Self::new()
    }
}

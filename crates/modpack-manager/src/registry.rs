//! Hook registry
//!
//! Catalogs global and per-module hooks keyed by canonical name, and answers
//! ordered per-binding lookups. Immutable after the index is built.

use indexmap::IndexMap;
use modpack_core::{BindingType, HookScope};

use crate::error::{ManagerError, Result};
use crate::hook::Hook;

pub struct HookRegistry {
    global_hooks: IndexMap<String, Hook>,
    module_hooks: IndexMap<String, IndexMap<String, Hook>>,
}

impl HookRegistry {
    pub fn new(
        global_hooks: IndexMap<String, Hook>,
        module_hooks: IndexMap<String, IndexMap<String, Hook>>,
    ) -> Self {
        Self {
            global_hooks,
            module_hooks,
        }
    }

    pub fn get_global_hook(&self, name: &str) -> Result<&Hook> {
        self.global_hooks
            .get(name)
            .ok_or_else(|| ManagerError::HookNotFound {
                name: name.to_string(),
            })
    }

    /// Look a module hook up by canonical name, searching all modules.
    /// Returns the owning module's name alongside the hook.
    pub fn get_module_hook(&self, name: &str) -> Result<(&str, &Hook)> {
        for (module, hooks) in &self.module_hooks {
            if let Some(hook) = hooks.get(name) {
                return Ok((module.as_str(), hook));
            }
        }
        Err(ManagerError::HookNotFound {
            name: name.to_string(),
        })
    }

    /// Global hook names bound to `binding`, sorted by `(order, name)`.
    /// A binding global hooks cannot use yields an empty list.
    pub fn get_global_hooks_in_order(&self, binding: BindingType) -> Vec<String> {
        if !HookScope::Global.allows(binding) {
            return Vec::new();
        }
        ordered_names(self.global_hooks.values(), binding)
    }

    /// Module hook names bound to `binding` for one module, sorted by
    /// `(order, name)`. Unknown modules and unsupported bindings yield an
    /// empty list.
    pub fn get_module_hooks_in_order(&self, module: &str, binding: BindingType) -> Vec<String> {
        if !HookScope::Module.allows(binding) {
            return Vec::new();
        }
        match self.module_hooks.get(module) {
            Some(hooks) => ordered_names(hooks.values(), binding),
            None => Vec::new(),
        }
    }
}

fn ordered_names<'a, I: Iterator<Item = &'a Hook>>(hooks: I, binding: BindingType) -> Vec<String> {
    let mut bound: Vec<&Hook> = hooks.filter(|hook| hook.binds(binding)).collect();
    bound.sort_by(|a, b| {
        a.order_for(binding)
            .partial_cmp(&b.order_for(binding))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    bound.into_iter().map(|hook| hook.name.clone()).collect()
}

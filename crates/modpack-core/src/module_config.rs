//! Per-module sections of the cluster-stored config
//!
//! The cluster config surface is a key-value map where a module named
//! `my-module` owns two keys: `myModule` (a YAML document with the module's
//! config values) and `myModuleEnabled` (`"true"` / `"false"`). An absent
//! enabled key leaves the module in the unset state, which is distinct from
//! both `true` and `false`.

use serde_json::Value as JsonValue;

use crate::error::{CoreError, Result};
use crate::values::Values;

/// camelCase values key for a module name: `my-module` -> `myModule`
pub fn module_name_to_values_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    let mut upper_next = false;
    for ch in name.chars() {
        if ch == '-' || ch == '_' {
            upper_next = true;
            continue;
        }
        if upper_next {
            key.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            key.push(ch);
        }
    }
    key
}

/// Enabled-flag key for a module name: `my-module` -> `myModuleEnabled`
pub fn module_name_to_enabled_key(name: &str) -> String {
    format!("{}Enabled", module_name_to_values_key(name))
}

/// One module's slice of the cluster config
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleConfig {
    pub module_name: String,

    /// Tri-state enable flag: absent / true / false
    pub is_enabled: Option<bool>,

    /// The module's config values (the subtree under its camelCase key)
    pub values: Values,
}

impl ModuleConfig {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            is_enabled: None,
            values: Values::new(),
        }
    }

    pub fn with_values(mut self, values: Values) -> Self {
        self.values = values;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.is_enabled = Some(enabled);
        self
    }

    /// Parse this module's section out of a YAML document that may contain
    /// `<camelName>` and `<camelName>Enabled` keys.
    pub fn from_yaml(self, yaml: &str) -> Result<Self> {
        let doc = Values::from_yaml(yaml)?;
        self.from_values_doc(doc.inner())
    }

    /// Same as [`from_yaml`](Self::from_yaml) but over an already-parsed tree
    pub fn from_values_doc(mut self, doc: &JsonValue) -> Result<Self> {
        let map = match doc {
            JsonValue::Null => return Ok(self),
            JsonValue::Object(map) => map,
            _ => {
                return Err(CoreError::InvalidConfig {
                    message: format!(
                        "module config for '{}' should be a map of config keys",
                        self.module_name
                    ),
                })
            }
        };

        let values_key = module_name_to_values_key(&self.module_name);
        if let Some(section) = map.get(&values_key) {
            match section {
                JsonValue::Object(_) | JsonValue::Array(_) => {
                    self.values = Values(section.clone());
                }
                _ => {
                    return Err(CoreError::InvalidConfig {
                        message: format!(
                            "module config for '{}' should be array or map, got: {}",
                            self.module_name, section
                        ),
                    })
                }
            }
        }

        let enabled_key = module_name_to_enabled_key(&self.module_name);
        if let Some(flag) = map.get(&enabled_key) {
            self.is_enabled = Some(parse_enabled_flag(&self.module_name, flag)?);
        }

        Ok(self)
    }
}

fn parse_enabled_flag(module_name: &str, flag: &JsonValue) -> Result<bool> {
    match flag {
        JsonValue::Bool(b) => Ok(*b),
        JsonValue::String(s) if s == "true" => Ok(true),
        JsonValue::String(s) if s == "false" => Ok(false),
        other => Err(CoreError::InvalidConfig {
            message: format!(
                "enabled flag for '{}' should be true or false, got: {}",
                module_name, other
            ),
        }),
    }
}

//! Hook configuration documents
//!
//! A hook invoked with `--config` writes a JSON or YAML document to stdout
//! describing which bindings it subscribes to, its execution order per
//! binding, its schedules, and whether failures are tolerated.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::binding::{BindingType, HookScope};
use crate::error::{CoreError, Result};

/// A crontab-driven schedule subscription
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConfig {
    /// Optional schedule name, surfaced in binding contexts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Crontab expression, 5 or 6 whitespace-separated fields
    pub crontab: String,

    #[serde(default)]
    pub allow_failure: bool,
}

impl ScheduleConfig {
    fn validate(&self) -> Result<()> {
        let fields = self.crontab.split_whitespace().count();
        if fields != 5 && fields != 6 {
            return Err(CoreError::InvalidConfig {
                message: format!(
                    "crontab '{}' must have 5 or 6 fields, got {}",
                    self.crontab, fields
                ),
            });
        }
        Ok(())
    }
}

/// A Kubernetes object subscription.
///
/// Selectors are kept opaque: the event manager that consumes them is an
/// external collaborator with its own schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_selector: Option<JsonValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_selector: Option<JsonValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_selector: Option<JsonValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_selector: Option<JsonValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execute_hook_on_events: Option<bool>,
}

/// The parsed output of `hook --config`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_startup: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_all: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_all: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_helm: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_helm: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_delete_helm: Option<f64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schedule: Vec<ScheduleConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kubernetes: Vec<KubernetesConfig>,

    #[serde(default)]
    pub allow_failure: bool,
}

impl HookConfig {
    /// Parse a config document from hook stdout. YAML is a superset of
    /// JSON, so both serializations are accepted. Empty output yields the
    /// default (bindingless) config.
    pub fn from_output(output: &str) -> Result<Self> {
        if output.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(output)?)
    }

    /// The execution order for a binding, defined iff the hook binds to it
    pub fn order_for(&self, binding: BindingType) -> Option<f64> {
        match binding {
            BindingType::OnStartup => self.on_startup,
            BindingType::BeforeAll => self.before_all,
            BindingType::AfterAll => self.after_all,
            BindingType::BeforeHelm => self.before_helm,
            BindingType::AfterHelm => self.after_helm,
            BindingType::AfterDeleteHelm => self.after_delete_helm,
            BindingType::Schedule | BindingType::Kubernetes => None,
        }
    }

    /// All bindings this config subscribes to
    pub fn bindings(&self) -> Vec<BindingType> {
        let mut bindings = Vec::new();
        for binding in [
            BindingType::OnStartup,
            BindingType::BeforeAll,
            BindingType::AfterAll,
            BindingType::BeforeHelm,
            BindingType::AfterHelm,
            BindingType::AfterDeleteHelm,
        ] {
            if self.order_for(binding).is_some() {
                bindings.push(binding);
            }
        }
        if !self.schedule.is_empty() {
            bindings.push(BindingType::Schedule);
        }
        if !self.kubernetes.is_empty() {
            bindings.push(BindingType::Kubernetes);
        }
        bindings
    }

    pub fn binds(&self, binding: BindingType) -> bool {
        self.bindings().contains(&binding)
    }

    /// Reject bindings the hook's scope does not support, and malformed
    /// schedules.
    pub fn validate(&self, scope: HookScope) -> Result<()> {
        for binding in self.bindings() {
            if !scope.allows(binding) {
                return Err(CoreError::UnsupportedBinding {
                    binding: binding.to_string(),
                    scope: scope.to_string(),
                });
            }
        }
        for schedule in &self.schedule {
            schedule.validate()?;
        }
        Ok(())
    }
}

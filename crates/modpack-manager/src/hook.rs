//! Hook definition and the per-invocation file contract
//!
//! A hook run sees its inputs as files in a fresh temp directory and hands
//! its outputs back through patch files in the same directory. The directory
//! is destroyed on every exit path once the run has been interpreted.

use std::path::{Path, PathBuf};

use modpack_core::{BindingContext, BindingType, HookConfig, Values, ValuesPatch};
use tempfile::TempDir;

use crate::error::Result;

/// A discovered hook: an external executable plus its parsed config
#[derive(Debug, Clone, PartialEq)]
pub struct Hook {
    /// Canonical name: the hook path relative to the modules root (module
    /// hooks) or to the working directory (global hooks)
    pub name: String,

    /// Absolute path of the executable
    pub path: PathBuf,

    pub config: HookConfig,
}

impl Hook {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, config: HookConfig) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            config,
        }
    }

    pub fn binds(&self, binding: BindingType) -> bool {
        self.config.binds(binding)
    }

    /// Execution order for a binding; hooks bound without an explicit order
    /// sort as 0
    pub fn order_for(&self, binding: BindingType) -> f64 {
        self.config.order_for(binding).unwrap_or(0.0)
    }
}

/// The materialized input/output files of one hook invocation
pub(crate) struct HookRunFiles {
    dir: TempDir,
}

impl HookRunFiles {
    const BINDING_CONTEXT: &'static str = "binding_context.json";
    const CONFIG_VALUES: &'static str = "config_values.yaml";
    const VALUES: &'static str = "values.yaml";
    const CONFIG_VALUES_PATCH: &'static str = "config_values_patch.json";
    const VALUES_PATCH: &'static str = "values_patch.json";
    const METRICS: &'static str = "metrics.json";
    const KUBERNETES: &'static str = "kubernetes.json";

    /// Create the temp directory and write all input files: the config
    /// values layer, the merged values view, the binding contexts, and empty
    /// result files for the hook to fill in.
    pub fn materialize(
        config_values: &Values,
        values: &Values,
        context: &[BindingContext],
    ) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("modpack-hook-").tempdir()?;

        std::fs::write(dir.path().join(Self::CONFIG_VALUES), config_values.to_yaml()?)?;
        std::fs::write(dir.path().join(Self::VALUES), values.to_yaml()?)?;
        std::fs::write(
            dir.path().join(Self::BINDING_CONTEXT),
            serde_json::to_string(context).map_err(modpack_core::CoreError::from)?,
        )?;
        for empty in [
            Self::CONFIG_VALUES_PATCH,
            Self::VALUES_PATCH,
            Self::METRICS,
            Self::KUBERNETES,
        ] {
            std::fs::write(dir.path().join(empty), "")?;
        }

        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// The environment handed to the hook process
    pub fn env(&self) -> Vec<(String, String)> {
        let path = |name: &str| self.dir.path().join(name).to_string_lossy().into_owned();
        vec![
            ("BINDING_CONTEXT_PATH".to_string(), path(Self::BINDING_CONTEXT)),
            ("CONFIG_VALUES_PATH".to_string(), path(Self::CONFIG_VALUES)),
            ("VALUES_PATH".to_string(), path(Self::VALUES)),
            (
                "CONFIG_VALUES_JSON_PATCH_PATH".to_string(),
                path(Self::CONFIG_VALUES_PATCH),
            ),
            ("VALUES_JSON_PATCH_PATH".to_string(), path(Self::VALUES_PATCH)),
            ("METRICS_PATH".to_string(), path(Self::METRICS)),
        ]
    }

    /// The patch the hook wrote for its config values layer
    pub fn read_config_values_patch(&self) -> modpack_core::Result<ValuesPatch> {
        ValuesPatch::from_file(self.dir.path().join(Self::CONFIG_VALUES_PATCH))
    }

    /// The patch the hook wrote for its dynamic values layer
    pub fn read_values_patch(&self) -> modpack_core::Result<ValuesPatch> {
        ValuesPatch::from_file(self.dir.path().join(Self::VALUES_PATCH))
    }
}

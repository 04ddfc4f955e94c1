//! Module definition

use std::path::{Path, PathBuf};

/// A directory-packaged unit: a Helm chart plus optional hooks, an optional
/// `enabled` script and optional static defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    /// Directory basename with the leading `NNN-` prefix removed
    pub name: String,

    /// Directory basename as found on disk (e.g. `100-my-module`)
    pub directory_name: String,

    /// Absolute path of the module directory
    pub path: PathBuf,

    /// Numeric directory prefix; modules run in ascending order
    pub order: u32,

    /// Whether the module ships a `Chart.yaml`
    pub has_chart: bool,

    /// Optional executable deciding whether the module is enabled
    pub enabled_script: Option<PathBuf>,
}

impl Module {
    /// The chart directory handed to Helm (the module directory itself)
    pub fn chart_path(&self) -> &Path {
        &self.path
    }

    /// Release name for this module's Helm release
    pub fn release_name(&self) -> &str {
        &self.name
    }
}

/// Split a module directory name into `(name, order)`.
///
/// `100-my-module` -> `("my-module", 100)`; a missing or non-numeric prefix
/// leaves the whole basename as the name with order 0.
pub(crate) fn parse_directory_name(directory_name: &str) -> (String, u32) {
    if let Some((prefix, rest)) = directory_name.split_once('-') {
        if !prefix.is_empty() && !rest.is_empty() && prefix.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(order) = prefix.parse() {
                return (rest.to_string(), order);
            }
        }
    }
    (directory_name.to_string(), 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_directory_name() {
        assert_eq!(
            parse_directory_name("100-my-module"),
            ("my-module".to_string(), 100)
        );
        assert_eq!(parse_directory_name("000-module"), ("module".to_string(), 0));
        assert_eq!(parse_directory_name("module"), ("module".to_string(), 0));
        assert_eq!(
            parse_directory_name("no-prefix-here"),
            ("no-prefix-here".to_string(), 0)
        );
        assert_eq!(parse_directory_name("007-bond"), ("bond".to_string(), 7));
    }
}

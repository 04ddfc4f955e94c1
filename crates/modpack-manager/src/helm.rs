//! Helm client boundary
//!
//! The manager only ever touches Helm through [`HelmClient`], declared with
//! exactly the operations the core calls. The real implementation shells out
//! to the `helm` binary; tests substitute [`MockHelmClient`] and assert on
//! its recorded calls.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use tracing::{debug, info};

use crate::error::{ManagerError, Result};

/// Status of the most recent revision of a release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseStatus {
    pub revision: String,
    pub status: String,
}

impl ReleaseStatus {
    /// A failed first revision: the only revision state worth deleting
    /// before an upgrade
    pub fn is_single_failed(&self) -> bool {
        self.status.eq_ignore_ascii_case("failed") && self.revision == "1"
    }
}

/// The Helm operations the module manager needs
pub trait HelmClient: Send + Sync {
    fn last_release_status(&self, release: &str) -> Result<ReleaseStatus>;

    /// Delete the release if its only revision is in the failed state.
    /// Idempotent: a missing or healthy release is left alone.
    fn delete_single_failed_revision(&self, release: &str) -> Result<()>;

    fn upgrade_release(
        &self,
        release: &str,
        chart_path: &Path,
        values_path: &Path,
        namespace: &str,
    ) -> Result<()>;

    fn delete_release(&self, release: &str) -> Result<()>;

    fn list_releases(&self) -> Result<Vec<String>>;

    fn is_release_exists(&self, release: &str) -> Result<bool>;
}

/// Helm client over the `helm` binary
pub struct HelmCli {
    binary: PathBuf,
    namespace: String,
}

impl HelmCli {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            binary: PathBuf::from("helm"),
            namespace: namespace.into(),
        }
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    fn helm(&self, args: &[&str]) -> Result<String> {
        debug!("helm {}", args.join(" "));
        let output = Command::new(&self.binary).args(args).output()?;
        if !output.status.success() {
            return Err(ManagerError::HelmFailed {
                message: format!(
                    "helm {} exited with {}: {}",
                    args.join(" "),
                    output.status.code().unwrap_or(-1),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl HelmClient for HelmCli {
    fn last_release_status(&self, release: &str) -> Result<ReleaseStatus> {
        let out = self.helm(&[
            "status",
            release,
            "--namespace",
            &self.namespace,
            "--output",
            "json",
        ])?;
        let doc: serde_json::Value =
            serde_json::from_str(&out).map_err(|e| ManagerError::HelmFailed {
                message: format!("unparsable helm status for '{}': {}", release, e),
            })?;
        Ok(ReleaseStatus {
            revision: doc["version"]
                .as_u64()
                .map(|v| v.to_string())
                .unwrap_or_default(),
            status: doc["info"]["status"].as_str().unwrap_or("unknown").to_string(),
        })
    }

    fn delete_single_failed_revision(&self, release: &str) -> Result<()> {
        if !self.is_release_exists(release)? {
            return Ok(());
        }
        let status = self.last_release_status(release)?;
        if status.is_single_failed() {
            info!("deleting single failed revision of release '{}'", release);
            self.delete_release(release)?;
        }
        Ok(())
    }

    fn upgrade_release(
        &self,
        release: &str,
        chart_path: &Path,
        values_path: &Path,
        namespace: &str,
    ) -> Result<()> {
        let chart = chart_path.to_string_lossy();
        let values = values_path.to_string_lossy();
        self.helm(&[
            "upgrade",
            release,
            chart.as_ref(),
            "--install",
            "--namespace",
            namespace,
            "--values",
            values.as_ref(),
        ])?;
        info!("release '{}' upgraded", release);
        Ok(())
    }

    fn delete_release(&self, release: &str) -> Result<()> {
        self.helm(&["uninstall", release, "--namespace", &self.namespace])?;
        info!("release '{}' deleted", release);
        Ok(())
    }

    fn list_releases(&self) -> Result<Vec<String>> {
        let out = self.helm(&["list", "--short", "--namespace", &self.namespace])?;
        Ok(out.lines().map(|l| l.trim().to_string()).filter(|l| !l.is_empty()).collect())
    }

    fn is_release_exists(&self, release: &str) -> Result<bool> {
        Ok(self.list_releases()?.iter().any(|r| r == release))
    }
}

/// A recorded call against the mock client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HelmCall {
    DeleteSingleFailedRevision(String),
    UpgradeRelease(String),
    DeleteRelease(String),
}

/// In-memory Helm client for tests: records calls, owns a release list
pub struct MockHelmClient {
    calls: Mutex<Vec<HelmCall>>,
    releases: Mutex<Vec<String>>,
}

impl MockHelmClient {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            releases: Mutex::new(Vec::new()),
        }
    }

    pub fn with_releases(releases: Vec<String>) -> Self {
        let client = Self::new();
        *client.releases.lock().unwrap() = releases;
        client
    }

    /// All calls recorded so far, in order
    pub fn calls(&self) -> Vec<HelmCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: HelmCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Default for MockHelmClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HelmClient for MockHelmClient {
    fn last_release_status(&self, _release: &str) -> Result<ReleaseStatus> {
        Ok(ReleaseStatus {
            revision: "1".to_string(),
            status: "deployed".to_string(),
        })
    }

    fn delete_single_failed_revision(&self, release: &str) -> Result<()> {
        self.record(HelmCall::DeleteSingleFailedRevision(release.to_string()));
        Ok(())
    }

    fn upgrade_release(
        &self,
        release: &str,
        _chart_path: &Path,
        _values_path: &Path,
        _namespace: &str,
    ) -> Result<()> {
        self.record(HelmCall::UpgradeRelease(release.to_string()));
        let mut releases = self.releases.lock().unwrap();
        if !releases.iter().any(|r| r == release) {
            releases.push(release.to_string());
        }
        Ok(())
    }

    fn delete_release(&self, release: &str) -> Result<()> {
        self.record(HelmCall::DeleteRelease(release.to_string()));
        self.releases.lock().unwrap().retain(|r| r != release);
        Ok(())
    }

    fn list_releases(&self) -> Result<Vec<String>> {
        Ok(self.releases.lock().unwrap().clone())
    }

    fn is_release_exists(&self, release: &str) -> Result<bool> {
        Ok(self.releases.lock().unwrap().iter().any(|r| r == release))
    }
}

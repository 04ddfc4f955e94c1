//! Shared test fixtures: an on-disk module tree builder and a scripted
//! executor that stands in for real hook processes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::Result;
use crate::executor::{CommandExecutor, CommandOutput};

/// Builds a working-directory layout under a temp dir
pub(crate) struct FixtureTree {
    dir: TempDir,
}

pub(crate) fn fixture_tree() -> FixtureTree {
    FixtureTree {
        dir: tempfile::tempdir().expect("create fixture dir"),
    }
}

impl FixtureTree {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_root_values(&self, yaml: &str) {
        std::fs::write(self.path().join("values.yaml"), yaml).unwrap();
    }

    pub fn add_module(&self, directory_name: &str) {
        std::fs::create_dir_all(self.path().join("modules").join(directory_name)).unwrap();
    }

    pub fn write_module_chart(&self, directory_name: &str) {
        let chart = self
            .path()
            .join("modules")
            .join(directory_name)
            .join("Chart.yaml");
        std::fs::write(chart, "name: fixture\nversion: 0.1.0\n").unwrap();
    }

    pub fn write_module_values(&self, directory_name: &str, yaml: &str) {
        let values = self
            .path()
            .join("modules")
            .join(directory_name)
            .join("values.yaml");
        std::fs::write(values, yaml).unwrap();
    }

    pub fn write_enabled_script(&self, directory_name: &str) {
        let script = self
            .path()
            .join("modules")
            .join(directory_name)
            .join("enabled");
        write_executable(&script);
    }

    /// Create an executable hook under `modules/` (e.g.
    /// `100-module/hooks/sub/a`)
    pub fn write_hook(&self, relative: &str) {
        write_executable(&self.path().join("modules").join(relative));
    }

    /// Create an executable global hook (e.g. `global-hooks/000-order/a`)
    pub fn write_global_hook(&self, relative: &str) {
        write_executable(&self.path().join(relative));
    }

    pub fn write_plain_file(&self, relative: &str) {
        let path = self.path().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "not a hook\n").unwrap();
    }
}

fn write_executable(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    // the scripted executor never actually runs these, but discovery
    // requires a real executable file
    std::fs::write(path, "#!/bin/sh\nexit 0\n").unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
}

type Behavior = Box<dyn Fn(&Path, &[(String, String)]) -> CommandOutput + Send + Sync>;

/// Deterministic stand-in for [`crate::ProcessExecutor`].
///
/// Programs are matched by path suffix. `--config` probes answer with
/// registered config documents (empty config by default); plain runs execute
/// registered behaviors (exit 0 by default).
pub(crate) struct ScriptedExecutor {
    configs: HashMap<String, String>,
    failing_configs: Vec<String>,
    behaviors: HashMap<String, Behavior>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self {
            configs: HashMap::new(),
            failing_configs: Vec::new(),
            behaviors: HashMap::new(),
        }
    }

    /// Answer `--config` for programs whose path ends with `suffix`
    pub fn with_config(mut self, suffix: &str, config: &str) -> Self {
        self.configs.insert(suffix.to_string(), config.to_string());
        self
    }

    /// Make `--config` fail for programs whose path ends with `suffix`
    pub fn with_failing_config(mut self, suffix: &str) -> Self {
        self.failing_configs.push(suffix.to_string());
        self
    }

    /// Script the plain (non `--config`) run of matching programs
    pub fn with_behavior<F>(mut self, suffix: &str, behavior: F) -> Self
    where
        F: Fn(&Path, &[(String, String)]) -> CommandOutput + Send + Sync + 'static,
    {
        self.behaviors.insert(suffix.to_string(), Box::new(behavior));
        self
    }

    /// Script a run that writes the given patch lines into the hook's two
    /// patch files and exits 0
    pub fn with_patches(self, suffix: &str, config_patch: &str, values_patch: &str) -> Self {
        let config_patch = config_patch.to_string();
        let values_patch = values_patch.to_string();
        self.with_behavior(suffix, move |_program, env| {
            write_env_file(env, "CONFIG_VALUES_JSON_PATCH_PATH", &config_patch);
            write_env_file(env, "VALUES_JSON_PATCH_PATH", &values_patch);
            exit_with(0)
        })
    }

    /// Script a run that prints `stdout` and exits 0 (enabled scripts)
    pub fn with_stdout(self, suffix: &str, stdout: &str) -> Self {
        let stdout = stdout.to_string();
        self.with_behavior(suffix, move |_program, _env| CommandOutput {
            exit_code: 0,
            stdout: stdout.clone(),
            stderr: String::new(),
        })
    }

    /// Script a run that exits with the given code
    pub fn with_exit_code(self, suffix: &str, exit_code: i32) -> Self {
        self.with_behavior(suffix, move |_program, _env| exit_with(exit_code))
    }

    fn lookup<'a, V>(&self, map: &'a HashMap<String, V>, program: &Path) -> Option<&'a V> {
        let path = program.to_string_lossy();
        map.iter()
            .find(|(suffix, _)| path.ends_with(suffix.as_str()))
            .map(|(_, v)| v)
    }
}

impl CommandExecutor for ScriptedExecutor {
    fn run(
        &self,
        program: &Path,
        args: &[&str],
        _cwd: &Path,
        env: &[(String, String)],
    ) -> Result<CommandOutput> {
        let path = program.to_string_lossy();

        if args == ["--config"] {
            if self.failing_configs.iter().any(|s| path.ends_with(s.as_str())) {
                return Ok(CommandOutput {
                    exit_code: 1,
                    stdout: String::new(),
                    stderr: "scripted config failure".to_string(),
                });
            }
            let config = self
                .lookup(&self.configs, program)
                .cloned()
                .unwrap_or_default();
            return Ok(CommandOutput {
                exit_code: 0,
                stdout: config,
                stderr: String::new(),
            });
        }

        match self.lookup(&self.behaviors, program) {
            Some(behavior) => Ok(behavior(program, env)),
            None => Ok(exit_with(0)),
        }
    }
}

pub(crate) fn exit_with(exit_code: i32) -> CommandOutput {
    CommandOutput {
        exit_code,
        stdout: String::new(),
        stderr: String::new(),
    }
}

fn write_env_file(env: &[(String, String)], key: &str, content: &str) {
    let path: PathBuf = env
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into())
        .expect("hook env should carry the patch paths");
    std::fs::write(path, content).unwrap();
}

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::Duration,
};

/// An external command ready to be supervised.
///
/// Built once by the command catalog and never mutated afterwards.
/// Environment entries override the inherited environment; everything
/// else is inherited unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    argv: Vec<String>,
    cwd: Option<PathBuf>,
    env: BTreeMap<String, String>,
    timeout: Option<Duration>,
}

impl CommandSpec {
    /// Start a spec from a program and its arguments.
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            cwd: None,
            env: BTreeMap::new(),
            timeout: None,
        }
    }

    /// Run the command from `dir`.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Override one environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Kill the command if it runs longer than `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Program followed by its arguments.
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Working directory, if one was set.
    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Environment overrides.
    pub fn env_overrides(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Configured timeout.
    pub fn timeout_value(&self) -> Option<Duration> {
        self.timeout
    }

    /// Value following `flag` in the argument vector.
    pub fn arg_after(&self, flag: &str) -> Option<&str> {
        self.argv
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.argv.get(i + 1))
            .map(String::as_str)
    }

    /// Shell-escaped command line, for logs and error messages.
    pub fn display(&self) -> String {
        shell_words::join(&self.argv)
    }
}

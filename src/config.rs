//! Typed configuration. Every recognized option is enumerated here with its
//! default; unknown keys and missing required keys fail at load time, not in
//! the middle of a sync.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::error::{fail, Attempt, Maybe};
use crate::retry::RetryPolicy;
use crate::source::{GitSource, RemoteSource, SvnSource};

pub const DEFAULT_CONFIG_FILE: &str = "tether.json";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub retry: RetryConfig,
    pub targets: Vec<TargetConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff")]
    pub backoff_seconds: Vec<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_seconds: default_backoff(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff() -> Vec<u64> {
    vec![5, 15, 45]
}

fn default_branch() -> String {
    "main".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Git,
    Svn,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    pub name: String,
    pub path: PathBuf,
    pub kind: SourceKind,
    pub url: String,
    /// Git only.
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Svn only; HEAD when absent.
    #[serde(default)]
    pub revision: Option<String>,
}

impl TargetConfig {
    pub fn source(&self) -> Box<dyn RemoteSource> {
        match self.kind {
            SourceKind::Git => Box::new(GitSource::new(&self.url, &self.branch)),
            SourceKind::Svn => Box::new(SvnSource::new(&self.url, self.revision.as_deref())),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Maybe<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("could not read config {}", path.display()))?;
        let config: Config = serde_json::from_str(&raw)
            .with_context(|| format!("could not parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Attempt {
        if self.targets.is_empty() {
            return fail("config has no targets");
        }
        if self.retry.max_attempts < 1 {
            return fail("retry.max_attempts must be at least 1");
        }
        if self.retry.backoff_seconds.is_empty() {
            return fail("retry.backoff_seconds must not be empty");
        }

        let mut seen = HashSet::new();
        for target in &self.targets {
            if target.name.is_empty() {
                return fail("target with an empty name");
            }
            if !seen.insert(target.name.as_str()) {
                return fail(&format!("duplicate target name: {}", target.name));
            }
            if target.url.is_empty() {
                return fail(&format!("target {} has an empty url", target.name));
            }
            if target.path.as_os_str().is_empty() {
                return fail(&format!("target {} has an empty path", target.name));
            }
            match target.kind {
                SourceKind::Git => {
                    if target.branch.is_empty() {
                        return fail(&format!("target {} has an empty branch", target.name));
                    }
                    if target.revision.is_some() {
                        return fail(&format!(
                            "target {}: revision is only valid for svn targets",
                            target.name
                        ));
                    }
                }
                SourceKind::Svn => {}
            }
        }
        Ok(())
    }

    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry.max_attempts, self.retry.backoff_seconds.clone())
    }

    pub fn target(&self, name: &str) -> Option<&TargetConfig> {
        self.targets.iter().find(|t| t.name == name)
    }
}

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::transform::TransformStep;

pub const DEFAULT_USER_AGENT: &str = "wikiedit/0.1";
pub const DEFAULT_CONFIG_PATH: &str = ".wikiedit/config.toml";

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct WikiConfig {
    #[serde(default)]
    pub wiki: WikiSection,
    #[serde(default)]
    pub run: RunSection,
    #[serde(default)]
    pub transform: Vec<TransformStep>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct WikiSection {
    pub api_url: Option<String>,
    pub user_agent: Option<String>,
}

/// Defaults for `wikiedit run`; command-line flags win over these.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct RunSection {
    pub summary: Option<String>,
    pub dry_run: Option<bool>,
    pub delay_ms: Option<u64>,
    pub limit: Option<usize>,
    #[serde(default)]
    pub namespaces: Vec<i32>,
    pub report_path: Option<PathBuf>,
}

impl WikiConfig {
    /// Resolve the wiki API URL: env WIKI_API_URL > config > None.
    pub fn api_url(&self) -> Option<String> {
        env_override("WIKI_API_URL").or_else(|| {
            self.wiki
                .api_url
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(ToString::to_string)
        })
    }

    /// Resolve user agent: env WIKI_USER_AGENT > config > DEFAULT_USER_AGENT.
    pub fn user_agent(&self) -> String {
        env_override("WIKI_USER_AGENT")
            .or_else(|| self.wiki.user_agent.clone())
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
    }
}

/// Load and parse a WikiConfig from a TOML file. Returns default if file doesn't exist.
pub fn load_config(config_path: &Path) -> Result<WikiConfig> {
    if !config_path.exists() {
        return Ok(WikiConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: WikiConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

/// Explicit path (relative to `cwd` when not absolute) or the default location.
pub fn resolve_config_path(explicit: Option<&Path>, cwd: &Path) -> PathBuf {
    match explicit {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => cwd.join(path),
        None => cwd.join(DEFAULT_CONFIG_PATH),
    }
}

fn env_override(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

//! Pipeline settings.
//!
//! Settings are loaded from YAML and may be overridden by the caller before the
//! pipeline runs. Every field has a default, so an empty file is valid.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Knobs controlling how strictly policy is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySettings {
    /// Fail storage buckets when the project declares no audit log bucket,
    /// instead of skipping the logging wiring.
    pub require_audit_sink: bool,
    /// Prefix joined onto template references in the render manifest.
    pub template_root: String,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            require_audit_sink: false,
            template_root: "templates".to_string(),
        }
    }
}

impl PolicySettings {
    /// Load settings from a YAML file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse settings from a YAML string.
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Self = serde_yaml::from_str(yaml)?;
        settings.check()?;
        Ok(settings)
    }

    pub fn with_require_audit_sink(mut self, required: bool) -> Self {
        self.require_audit_sink = required;
        self
    }

    pub fn with_template_root(mut self, root: impl Into<String>) -> Self {
        self.template_root = root.into();
        self
    }

    /// Resolve a template reference against the configured root.
    pub fn template_path(&self, reference: &str) -> String {
        if self.template_root.is_empty() {
            return reference.to_string();
        }
        format!("{}/{}", self.template_root.trim_end_matches('/'), reference)
    }

    fn check(&self) -> ConfigResult<()> {
        if self.template_root.starts_with('/') {
            return Err(ConfigError::Settings(format!(
                "template_root '{}' must be relative to the renderer's working directory",
                self.template_root
            )));
        }
        Ok(())
    }
}

//! CLI command definitions.
//!
//! Each subcommand loads one or more project documents and runs them through
//! the policy pipeline.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use thiserror::Error;
use tracing::debug;

use rampart_config::{Document, PolicySettings};

pub mod manifest;
pub mod normalize;
pub mod validate;

/// Rampart - resource normalization and policy injection
#[derive(Parser)]
#[command(name = "rampart")]
#[command(version, about = "Rampart - resource normalization and policy injection")]
#[command(long_about = r#"
Rampart reads a project document describing cloud resources, validates every
resource and injects organization policy: mandatory access bindings, forced
versioning, audit log routing and retention rules.

WORKFLOWS:
  normalize  → Validate, apply policy and write the finalized document
  validate   → Validate documents without applying policy
  manifest   → List the template each resource is rendered with

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Decode failure
  4 - Validation failure
  5 - Policy application failure
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a document, apply policy and write the result
    Normalize(normalize::NormalizeArgs),

    /// Validate documents without applying policy
    Validate(validate::ValidateArgs),

    /// Print the template assignment of every resource
    Manifest(manifest::ManifestArgs),
}

/// Settings shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct SettingsArgs {
    /// Policy settings file (YAML)
    #[arg(long, env = "RAMPART_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Fail when storage buckets have no audit log bucket to log into
    #[arg(long, env = "RAMPART_REQUIRE_AUDIT_SINK")]
    pub require_audit_sink: bool,

    /// Root directory of the resource templates
    #[arg(long, env = "RAMPART_TEMPLATE_ROOT")]
    pub template_root: Option<String>,
}

impl SettingsArgs {
    /// Load the settings file, if any, then apply flag overrides.
    pub fn load(&self) -> Result<PolicySettings> {
        let mut settings = match &self.settings {
            Some(path) => {
                require_exists(path)?;
                PolicySettings::from_file(path)
                    .with_context(|| format!("Failed to load settings from {}", path.display()))?
            }
            None => PolicySettings::default(),
        };

        if self.require_audit_sink {
            settings = settings.with_require_audit_sink(true);
        }
        if let Some(root) = &self.template_root {
            settings = settings.with_template_root(root.clone());
        }

        debug!("Using policy settings: {:?}", settings);
        Ok(settings)
    }
}

/// A command-line argument that cannot be acted on.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct InvalidArgument(pub String);

pub(crate) fn require_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(InvalidArgument(format!("File not found: {}", path.display())).into());
    }
    Ok(())
}

pub(crate) fn load_document(path: &Path) -> Result<Document> {
    require_exists(path)?;
    Document::from_file(path).with_context(|| format!("Failed to load {}", path.display()))
}

//! # rampart_config
//!
//! Resource normalization and policy injection for Rampart.
//!
//! Users describe a project's cloud resources as loosely-typed YAML or JSON.
//! This crate decodes each resource into a typed view that keeps every
//! unmodeled key, validates it, and applies organization policy: mandatory
//! access bindings, forced safety features, audit log wiring and retention
//! rules. The result is re-encoded for an external template renderer.
//!
//! This crate provides:
//! - **Documents**: decode and re-encode whole project documents
//! - **Project**: the read-only policy inputs every resource consults
//! - **Resources**: storage buckets, BigQuery datasets, Pub/Sub topics and Compute instances
//! - **Bindings**: deterministic merging of access-control entries
//! - **Pipeline**: ordered, fail-fast validation and policy injection
//!
//! ## Example
//!
//! ```rust,no_run
//! use rampart_config::{Document, PolicyPipeline, PolicySettings};
//! use std::path::Path;
//!
//! let mut document = Document::from_file(Path::new("project.yaml"))?;
//! let pipeline = PolicyPipeline::new(PolicySettings::default());
//! pipeline.run(&mut document)?;
//! println!("{}", document.to_yaml_string()?);
//! # Ok::<(), rampart_config::ConfigError>(())
//! ```

pub mod binding;
pub mod context;
pub mod document;
pub mod error;
pub mod naming;
pub mod pipeline;
pub mod project;
pub mod resources;
pub mod settings;

pub use binding::{group_members, merge_bindings, overlay_all, Binding};
pub use context::{Inventory, PolicyContext, ResourceRole};
pub use document::{AuditLogResources, Document, ManifestEntry, ResourceGroup};
pub use error::{ConfigError, ConfigResult, ErrorCategory};
pub use pipeline::PolicyPipeline;
pub use project::{AuditSinks, Project, ProjectParent};
pub use resources::{Resource, ResourceKind, Validated};
pub use settings::PolicySettings;

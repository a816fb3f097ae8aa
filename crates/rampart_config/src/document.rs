//! Project documents: decoding, resource grouping and re-encoding.
//!
//! A document has a `project` section and an optional `resources` mapping from
//! resource kind key (`gcs_buckets`, `pubsub_topics`, ...) to a list of
//! definitions. Audit log targets live under `project.audit_logs`. Every key
//! the decoder does not model is carried through to the encoded output.

use std::path::Path;

use rampart_overlay::DecodeError;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::context::ResourceRole;
use crate::error::{ConfigError, ConfigResult};
use crate::project::{AuditSinks, Project};
use crate::resources::{Resource, ResourceKind};
use crate::settings::PolicySettings;

const PROJECT_KEY: &str = "project";
const RESOURCES_KEY: &str = "resources";
const AUDIT_LOGS_KEY: &str = "audit_logs";
const LOGS_BUCKET_KEY: &str = "logs_gcs_bucket";
const LOGS_DATASET_KEY: &str = "logs_bigquery_dataset";

/// Resources receiving the project's audit logs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditLogResources {
    pub bucket: Option<Resource>,
    pub dataset: Option<Resource>,
}

impl AuditLogResources {
    fn decode(value: Option<&Value>) -> ConfigResult<Self> {
        let section = match value {
            None | Some(Value::Null) => return Ok(Self::default()),
            Some(Value::Object(section)) => section,
            Some(_) => return Err(ConfigError::Structure("'project.audit_logs' must be a mapping".to_string())),
        };

        let decode = |key: &str, kind: ResourceKind| -> ConfigResult<Option<Resource>> {
            section
                .get(key)
                .map(|value| Resource::decode(kind, value.clone()))
                .transpose()
        };

        Ok(Self {
            bucket: decode(LOGS_BUCKET_KEY, ResourceKind::GcsBucket)?,
            dataset: decode(LOGS_DATASET_KEY, ResourceKind::BigqueryDataset)?,
        })
    }

    fn sinks(&self) -> AuditSinks {
        AuditSinks {
            gcs_bucket: self.bucket.as_ref().map(|r| r.identify().to_string()),
            bigquery_dataset: self.dataset.as_ref().map(|r| r.identify().to_string()),
        }
    }
}

/// All declared resources of one kind, in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceGroup {
    pub kind: ResourceKind,
    pub resources: Vec<Resource>,
}

impl ResourceGroup {
    fn decode(key: &str, value: &Value) -> ConfigResult<Self> {
        let kind = ResourceKind::from_document_key(key)
            .ok_or_else(|| ConfigError::Structure(format!("unknown resource kind '{}'", key)))?;

        let resources = match value {
            Value::Null => Vec::new(),
            Value::Array(items) => items
                .iter()
                .map(|item| Resource::decode(kind, item.clone()))
                .collect::<ConfigResult<Vec<_>>>()?,
            _ => return Err(ConfigError::Structure(format!("'resources.{}' must be a list", key))),
        };

        Ok(Self { kind, resources })
    }
}

/// One line of the render manifest handed to the template engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    pub kind: ResourceKind,
    pub name: String,
    pub template: String,
}

/// A decoded project document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    raw: Map<String, Value>,
    project: Project,
    audit_logs: AuditLogResources,
    groups: Vec<ResourceGroup>,
}

impl Document {
    /// Load a document from disk. Files ending in `.json` are parsed as JSON, anything else as YAML.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        debug!("Reading project document from {:?}", path);
        let content = std::fs::read(path)?;
        if path.extension().map_or(false, |e| e == "json") {
            Self::from_json_slice(&content)
        } else {
            let text = String::from_utf8(content).map_err(|e| ConfigError::Structure(format!("{:?}: {}", path, e)))?;
            Self::from_yaml_str(&text)
        }
    }

    pub fn from_json_slice(bytes: &[u8]) -> ConfigResult<Self> {
        let value = serde_json::from_slice(bytes).map_err(|e| ConfigError::decode("document", DecodeError::Malformed(e)))?;
        Self::from_value(value)
    }

    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let value: Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> ConfigResult<Self> {
        let raw = match value {
            Value::Object(raw) => raw,
            _ => return Err(ConfigError::Structure("document must be a mapping".to_string())),
        };

        let project_section = match raw.get(PROJECT_KEY) {
            Some(section @ Value::Object(_)) => section,
            Some(_) => return Err(ConfigError::Structure("'project' must be a mapping".to_string())),
            None => return Err(ConfigError::Structure("missing 'project' section".to_string())),
        };
        let audit_logs = AuditLogResources::decode(project_section.get(AUDIT_LOGS_KEY))?;
        let project = Project::from_value(project_section, audit_logs.sinks())?;

        let groups = match raw.get(RESOURCES_KEY) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Object(resources)) => resources
                .iter()
                .map(|(key, value)| ResourceGroup::decode(key, value))
                .collect::<ConfigResult<Vec<_>>>()?,
            Some(_) => {
                return Err(ConfigError::Structure(
                    "'resources' must be a mapping from resource kind to list".to_string(),
                ))
            }
        };

        debug!(
            "Decoded project {} with {} resource groups",
            project.id(),
            groups.len()
        );

        Ok(Self {
            raw,
            project,
            audit_logs,
            groups,
        })
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn audit_logs(&self) -> &AuditLogResources {
        &self.audit_logs
    }

    pub fn groups(&self) -> &[ResourceGroup] {
        &self.groups
    }

    /// Every resource in processing order: audit log targets first, then declared resources.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.audit_logs
            .bucket
            .iter()
            .chain(self.audit_logs.dataset.iter())
            .chain(self.groups.iter().flat_map(|g| g.resources.iter()))
    }

    pub fn find(&self, kind: ResourceKind, name: &str) -> Option<&Resource> {
        self.resources().find(|r| r.kind() == kind && r.identify() == name)
    }

    /// Borrow the project alongside mutable access to every resource, in processing order.
    pub fn split_for_policy(&mut self) -> (&Project, Vec<(ResourceRole, &mut Resource)>) {
        let mut resources: Vec<(ResourceRole, &mut Resource)> = Vec::new();
        resources.extend(self.audit_logs.bucket.iter_mut().map(|r| (ResourceRole::AuditLog, r)));
        resources.extend(self.audit_logs.dataset.iter_mut().map(|r| (ResourceRole::AuditLog, r)));
        for group in &mut self.groups {
            resources.extend(group.resources.iter_mut().map(|r| (ResourceRole::Data, r)));
        }
        (&self.project, resources)
    }

    /// Template assignments for the external renderer.
    pub fn manifest(&self, settings: &PolicySettings) -> Vec<ManifestEntry> {
        self.resources()
            .map(|r| ManifestEntry {
                kind: r.kind(),
                name: r.identify().to_string(),
                template: settings.template_path(r.template_reference()),
            })
            .collect()
    }

    /// Encode the document: the original structure with every resource replaced by its encoded form.
    pub fn to_value(&self) -> ConfigResult<Value> {
        let mut out = self.raw.clone();

        if let Some(Value::Object(audit)) = out
            .get_mut(PROJECT_KEY)
            .and_then(|project| project.get_mut(AUDIT_LOGS_KEY))
        {
            if let Some(bucket) = &self.audit_logs.bucket {
                audit.insert(LOGS_BUCKET_KEY.to_string(), bucket.to_value()?);
            }
            if let Some(dataset) = &self.audit_logs.dataset {
                audit.insert(LOGS_DATASET_KEY.to_string(), dataset.to_value()?);
            }
        }

        if let Some(Value::Object(resources)) = out.get_mut(RESOURCES_KEY) {
            for group in self.groups.iter().filter(|g| !g.resources.is_empty()) {
                let encoded = group
                    .resources
                    .iter()
                    .map(Resource::to_value)
                    .collect::<ConfigResult<Vec<_>>>()?;
                resources.insert(group.kind.document_key().to_string(), Value::Array(encoded));
            }
        }

        Ok(Value::Object(out))
    }

    pub fn to_json_string(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_value()?)?)
    }

    pub fn to_yaml_string(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(&self.to_value()?)?)
    }
}

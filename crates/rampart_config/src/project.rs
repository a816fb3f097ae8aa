//! The project aggregate: organization-wide policy inputs every resource consults.
//!
//! A [`Project`] is built once per document, before any resource is processed,
//! and is only ever handed out by shared reference afterwards.

use serde::Deserialize;
use serde_json::Value;

use crate::binding::group_members;
use crate::error::{ConfigError, ConfigResult};
use crate::naming;

const PROJECT_KIND: &str = "project";

/// Identities of the resources receiving the project's audit logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditSinks {
    /// Name of the audit log storage bucket.
    pub gcs_bucket: Option<String>,
    /// Name of the audit log BigQuery dataset.
    pub bigquery_dataset: Option<String>,
}

/// Where the project sits in the resource hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectParent {
    Organization(String),
    Folder(String),
}

/// The `project` section as written by users. Unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
struct ProjectDefinition {
    #[serde(default)]
    project_id: String,
    #[serde(default)]
    owners_group: String,
    #[serde(default)]
    auditors_group: String,
    #[serde(default)]
    data_readwrite_groups: Vec<String>,
    #[serde(default)]
    data_readonly_groups: Vec<String>,
    #[serde(default)]
    organization_id: Option<String>,
    #[serde(default)]
    folder_id: Option<String>,
}

/// Project-wide policy inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    id: String,
    owners_group: String,
    auditors_group: String,
    data_readwrite_groups: Vec<String>,
    data_readonly_groups: Vec<String>,
    organization_id: Option<String>,
    folder_id: Option<String>,
    audit_sinks: AuditSinks,
}

impl Project {
    /// Create a project with its mandatory groups.
    pub fn new(id: impl Into<String>, owners_group: impl Into<String>, auditors_group: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            owners_group: owners_group.into(),
            auditors_group: auditors_group.into(),
            data_readwrite_groups: Vec::new(),
            data_readonly_groups: Vec::new(),
            organization_id: None,
            folder_id: None,
            audit_sinks: AuditSinks::default(),
        }
    }

    /// Build a project from the document's `project` section and the identities of its audit sinks.
    pub fn from_value(value: &Value, audit_sinks: AuditSinks) -> ConfigResult<Self> {
        let definition: ProjectDefinition = serde_json::from_value(value.clone())
            .map_err(|e| ConfigError::decode("project", rampart_overlay::DecodeError::Schema(e)))?;

        Ok(Self {
            id: definition.project_id,
            owners_group: definition.owners_group,
            auditors_group: definition.auditors_group,
            data_readwrite_groups: definition.data_readwrite_groups,
            data_readonly_groups: definition.data_readonly_groups,
            organization_id: definition.organization_id,
            folder_id: definition.folder_id,
            audit_sinks,
        })
    }

    pub fn with_readwrite_groups(mut self, groups: Vec<String>) -> Self {
        self.data_readwrite_groups = groups;
        self
    }

    pub fn with_readonly_groups(mut self, groups: Vec<String>) -> Self {
        self.data_readonly_groups = groups;
        self
    }

    pub fn with_audit_sinks(mut self, sinks: AuditSinks) -> Self {
        self.audit_sinks = sinks;
        self
    }

    pub fn with_organization(mut self, id: impl Into<String>) -> Self {
        self.organization_id = Some(id.into());
        self
    }

    pub fn with_folder(mut self, id: impl Into<String>) -> Self {
        self.folder_id = Some(id.into());
        self
    }

    /// Check the project's own required fields.
    pub fn validate(&self) -> ConfigResult<()> {
        let fail = |rule: String| Err(ConfigError::validation(PROJECT_KIND, &self.id, rule));

        if self.id.is_empty() {
            return fail("project_id must be set".to_string());
        }
        if !naming::is_project_id(&self.id) {
            return fail(format!("project_id '{}' is not a valid project id", self.id));
        }
        if self.owners_group.is_empty() {
            return fail("owners_group must be set".to_string());
        }
        if self.auditors_group.is_empty() {
            return fail("auditors_group must be set".to_string());
        }

        let groups = [&self.owners_group, &self.auditors_group]
            .into_iter()
            .chain(&self.data_readwrite_groups)
            .chain(&self.data_readonly_groups);
        for group in groups {
            if !naming::is_email(group) {
                return fail(format!("group '{}' is not an email address", group));
            }
        }

        if self.organization_id.is_some() && self.folder_id.is_some() {
            return fail("only one of organization_id and folder_id may be set".to_string());
        }
        if let Some(id) = self.organization_id.as_deref().or(self.folder_id.as_deref()) {
            if !naming::is_numeric_id(id) {
                return fail(format!("parent id '{}' must be numeric", id));
            }
        }

        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn owners_group(&self) -> &str {
        &self.owners_group
    }

    pub fn auditors_group(&self) -> &str {
        &self.auditors_group
    }

    /// Groups granted read-write access to data resources.
    pub fn data_readwrite_groups(&self) -> &[String] {
        &self.data_readwrite_groups
    }

    /// Groups granted read-only access to data resources.
    pub fn data_readonly_groups(&self) -> &[String] {
        &self.data_readonly_groups
    }

    /// Owners group as a principal list.
    pub fn owners_members(&self) -> Vec<String> {
        group_members(std::slice::from_ref(&self.owners_group))
    }

    /// Auditors group as a principal list.
    pub fn auditors_members(&self) -> Vec<String> {
        group_members(std::slice::from_ref(&self.auditors_group))
    }

    pub fn parent(&self) -> Option<ProjectParent> {
        match (&self.organization_id, &self.folder_id) {
            (_, Some(folder)) => Some(ProjectParent::Folder(folder.clone())),
            (Some(org), None) => Some(ProjectParent::Organization(org.clone())),
            (None, None) => None,
        }
    }

    pub fn audit_sinks(&self) -> &AuditSinks {
        &self.audit_sinks
    }

    /// Whether any audit log sink is declared.
    pub fn has_audit_sink(&self) -> bool {
        self.audit_sinks.gcs_bucket.is_some() || self.audit_sinks.bigquery_dataset.is_some()
    }

    pub fn audit_log_bucket(&self) -> Option<&str> {
        self.audit_sinks.gcs_bucket.as_deref()
    }

    pub fn audit_log_dataset(&self) -> Option<&str> {
        self.audit_sinks.bigquery_dataset.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn project() -> Project {
        Project::new("my-project", "owners@example.com", "auditors@example.com")
    }

    #[test]
    fn test_from_value() {
        let value = json!({
            "project_id": "my-project",
            "owners_group": "owners@example.com",
            "auditors_group": "auditors@example.com",
            "data_readwrite_groups": ["rw@example.com"],
            "folder_id": "123",
            "billing_account": "000000-000000-000000"
        });
        let sinks = AuditSinks {
            gcs_bucket: Some("my-project-logs".to_string()),
            bigquery_dataset: None,
        };

        let project = Project::from_value(&value, sinks).unwrap();

        assert_eq!(project.id(), "my-project");
        assert_eq!(project.data_readwrite_groups().to_vec(), vec!["rw@example.com".to_string()]);
        assert!(project.data_readonly_groups().is_empty());
        assert_eq!(project.parent(), Some(ProjectParent::Folder("123".to_string())));
        assert!(project.has_audit_sink());
        assert_eq!(project.audit_log_bucket(), Some("my-project-logs"));
        assert_eq!(project.audit_log_dataset(), None);
        project.validate().unwrap();
    }

    #[test]
    fn test_from_value_type_mismatch() {
        let value = json!({"project_id": "my-project", "owners_group": ["not", "a", "string"]});
        let err = Project::from_value(&value, AuditSinks::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Decode { .. }));
    }

    #[test]
    fn test_validate_requires_groups() {
        let err = Project::new("my-project", "", "auditors@example.com").validate().unwrap_err();
        assert!(err.to_string().contains("owners_group must be set"));

        let err = Project::new("my-project", "owners@example.com", "").validate().unwrap_err();
        assert!(err.to_string().contains("auditors_group must be set"));
    }

    #[test]
    fn test_validate_rejects_bad_groups() {
        let err = project()
            .with_readonly_groups(vec!["readers".to_string()])
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("'readers' is not an email address"));
    }

    #[test]
    fn test_validate_parent() {
        let err = project().with_folder("1").with_organization("2").validate().unwrap_err();
        assert!(err.to_string().contains("only one of"));

        let err = project().with_organization("organizations/2").validate().unwrap_err();
        assert!(err.to_string().contains("must be numeric"));

        project().with_organization("2").validate().unwrap();
    }

    #[test]
    fn test_members() {
        let project = project();
        assert_eq!(project.owners_members(), vec!["group:owners@example.com".to_string()]);
        assert_eq!(project.auditors_members(), vec!["group:auditors@example.com".to_string()]);
        assert!(!project.has_audit_sink());
    }
}

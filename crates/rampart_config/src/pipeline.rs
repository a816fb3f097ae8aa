//! The policy injection pipeline.
//!
//! Resources are processed strictly in order, one at a time: validate, then
//! apply policy. The first failure stops the run; resources after it are not
//! touched. Callers reject the whole document on any error, so partially
//! processed documents are never encoded.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::context::{Inventory, PolicyContext, ResourceRole};
use crate::document::Document;
use crate::error::{ConfigError, ConfigResult};
use crate::project::Project;
use crate::resources::{Resource, ResourceKind};
use crate::settings::PolicySettings;

/// Runs validation and policy injection across a project's resources.
#[derive(Debug, Clone, Default)]
pub struct PolicyPipeline {
    settings: PolicySettings,
}

impl PolicyPipeline {
    pub fn new(settings: PolicySettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &PolicySettings {
        &self.settings
    }

    /// Validate the project, then validate and apply policy to every resource of the document.
    pub fn run(&self, document: &mut Document) -> ConfigResult<Inventory> {
        document.project().validate()?;
        let (project, resources) = document.split_for_policy();
        self.process(project, resources)
    }

    /// Validate and apply policy to each resource in iteration order.
    ///
    /// Returns the inventory of processed identities, or the first error,
    /// tagged with the failing resource's kind and name.
    pub fn process<'a, I>(&self, project: &Project, resources: I) -> ConfigResult<Inventory>
    where
        I: IntoIterator<Item = (ResourceRole, &'a mut Resource)>,
    {
        let mut inventory = Inventory::new();

        for (role, resource) in resources {
            let kind = resource.kind();
            debug!("Validating {} '{}'", kind, resource.identify());

            let validated = resource.validate()?;
            let name = validated.resource().identify().to_string();
            if inventory.contains(kind, &name) {
                return Err(duplicate(kind, name));
            }

            let ctx = PolicyContext::new(project, &inventory, &self.settings, role);
            validated.apply_policy(&ctx)?;
            debug!("Applied policy to {} '{}'", kind, name);
            inventory.register(kind, name);
        }

        info!(
            "Applied policy to {} resources of project {}",
            inventory.len(),
            project.id()
        );
        Ok(inventory)
    }

    /// Validate the project and every resource without applying policy.
    ///
    /// Returns the number of resources checked.
    pub fn check(&self, document: &mut Document) -> ConfigResult<usize> {
        document.project().validate()?;

        let (_, resources) = document.split_for_policy();
        let mut seen: HashSet<(ResourceKind, String)> = HashSet::new();
        for (_, resource) in resources {
            let kind = resource.kind();
            let validated = resource.validate()?;
            let name = validated.resource().identify().to_string();
            if !seen.insert((kind, name.clone())) {
                return Err(duplicate(kind, name));
            }
        }

        info!("Validated {} resources of project {}", seen.len(), document.project().id());
        Ok(seen.len())
    }
}

fn duplicate(kind: ResourceKind, name: String) -> ConfigError {
    let rule = format!("{} names must be unique within a project", kind);
    ConfigError::validation(kind.as_str(), name, rule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::test_support::project;
    use serde_json::json;

    fn bucket(name: &str) -> Resource {
        Resource::decode(
            ResourceKind::GcsBucket,
            json!({"properties": {"name": name, "location": "US"}}),
        )
        .unwrap()
    }

    #[test]
    fn test_fail_fast_leaves_later_resources_untouched() {
        let mut first = Resource::decode(
            ResourceKind::GcsBucket,
            json!({"properties": {"name": "my-project-bad", "location": "US", "versioning": {"enabled": false}}}),
        )
        .unwrap();
        let mut second = bucket("my-project-data");
        let untouched = second.clone();

        let pipeline = PolicyPipeline::default();
        let err = pipeline
            .process(
                &project(),
                vec![(ResourceRole::Data, &mut first), (ResourceRole::Data, &mut second)],
            )
            .unwrap_err();

        assert_eq!(err.category(), ErrorCategory::Validation);
        assert!(err.to_string().contains("'my-project-bad'"));
        assert!(!err.to_string().contains("my-project-data"));
        assert_eq!(second, untouched);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut first = bucket("my-project-data");
        let mut second = bucket("my-project-data");

        let err = PolicyPipeline::default()
            .process(
                &project(),
                vec![(ResourceRole::Data, &mut first), (ResourceRole::Data, &mut second)],
            )
            .unwrap_err();

        assert!(err.to_string().contains("names must be unique"));
    }

    #[test]
    fn test_later_resources_see_earlier_identities() {
        let mut logs = bucket("my-project-access-logs");
        let mut data = Resource::decode(
            ResourceKind::GcsBucket,
            json!({"properties": {
                "name": "my-project-data",
                "location": "US",
                "logging": {"logBucket": "my-project-access-logs"}
            }}),
        )
        .unwrap();

        let inventory = PolicyPipeline::default()
            .process(
                &project(),
                vec![(ResourceRole::Data, &mut logs), (ResourceRole::Data, &mut data)],
            )
            .unwrap();

        assert_eq!(inventory.len(), 2);
        assert!(inventory.contains(ResourceKind::GcsBucket, "my-project-access-logs"));
    }

    #[test]
    fn test_forward_reference_rejected() {
        let mut data = Resource::decode(
            ResourceKind::GcsBucket,
            json!({"properties": {
                "name": "my-project-data",
                "location": "US",
                "logging": {"logBucket": "my-project-access-logs"}
            }}),
        )
        .unwrap();
        let mut logs = bucket("my-project-access-logs");

        let err = PolicyPipeline::default()
            .process(
                &project(),
                vec![(ResourceRole::Data, &mut data), (ResourceRole::Data, &mut logs)],
            )
            .unwrap_err();

        assert_eq!(err.category(), ErrorCategory::Policy);
    }

    #[test]
    fn test_check_does_not_apply_policy() {
        let input = json!({
            "project": {
                "project_id": "my-project",
                "owners_group": "owners@example.com",
                "auditors_group": "auditors@example.com"
            },
            "resources": {"gcs_buckets": [{"properties": {"name": "my-project-data", "location": "US"}}]}
        });
        let mut document = Document::from_value(input.clone()).unwrap();

        let checked = PolicyPipeline::default().check(&mut document).unwrap();

        assert_eq!(checked, 1);
        assert_eq!(document.to_value().unwrap(), input);
    }

    #[test]
    fn test_run_validates_project_first() {
        let mut document = Document::from_value(json!({
            "project": {"project_id": "my-project", "auditors_group": "auditors@example.com"},
            "resources": {"gcs_buckets": [{"properties": {"name": "my-project-data", "location": "US"}}]}
        }))
        .unwrap();
        let before = document.clone();

        let err = PolicyPipeline::default().run(&mut document).unwrap_err();

        assert!(err.to_string().contains("project 'my-project': owners_group must be set"));
        assert_eq!(document, before);
    }
}

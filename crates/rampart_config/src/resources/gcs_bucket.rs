//! Cloud Storage buckets.

use rampart_overlay::{is_default, Overlaid};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::binding::{merge_bindings, overlay_all, Binding};
use crate::context::PolicyContext;
use crate::naming;
use crate::resources::{ResourceKind, ResourceSpec};

const ADMIN_ROLE: &str = "roles/storage.admin";
const OBJECT_ADMIN_ROLE: &str = "roles/storage.objectAdmin";
const OBJECT_VIEWER_ROLE: &str = "roles/storage.objectViewer";

/// A storage bucket definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GcsBucket {
    #[serde(default, skip_serializing_if = "is_default")]
    pub properties: GcsBucketProperties,
    /// Delete live objects once they are this many days old.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_days: Option<i64>,
}

/// Modeled subset of the bucket template's properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcsBucketProperties {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<Overlaid<Binding>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versioning: Option<Versioning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle: Option<Lifecycle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predefined_acl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predefined_default_object_acl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<BucketLogging>,
}

/// Object versioning. `enabled` is unset, explicitly on, or explicitly off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioning {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lifecycle {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rule: Vec<Overlaid<LifecycleRule>>,
}

/// A lifecycle rule. Unmodeled keys of user-written rules are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<LifecycleAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<LifecycleCondition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleAction {
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_live: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketLogging {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_bucket: Option<String>,
}

impl LifecycleRule {
    /// Delete live objects older than `days`.
    pub fn delete_after(days: i64) -> Self {
        Self {
            action: Some(LifecycleAction {
                kind: "Delete".to_string(),
            }),
            condition: Some(LifecycleCondition {
                age: Some(days),
                is_live: Some(true),
            }),
        }
    }
}

impl GcsBucket {
    pub fn name(&self) -> &str {
        &self.properties.name
    }

    pub fn log_bucket(&self) -> Option<&str> {
        self.properties.logging.as_ref().and_then(|l| l.log_bucket.as_deref())
    }

    pub fn lifecycle_rules(&self) -> &[Overlaid<LifecycleRule>] {
        self.properties.lifecycle.as_ref().map(|l| l.rule.as_slice()).unwrap_or_default()
    }

    fn baseline_bindings(ctx: &PolicyContext<'_>) -> Vec<Binding> {
        let project = ctx.project();
        let mut bindings = vec![Binding::new(ADMIN_ROLE, project.owners_members())];

        if ctx.is_audit_log() {
            bindings.push(Binding::new(OBJECT_VIEWER_ROLE, project.auditors_members()));
            return bindings;
        }

        bindings.extend(Binding::for_groups(OBJECT_ADMIN_ROLE, project.data_readwrite_groups()));
        bindings.extend(Binding::for_groups(OBJECT_VIEWER_ROLE, project.data_readonly_groups()));
        bindings
    }

    fn wire_logging(&mut self, ctx: &PolicyContext<'_>) -> Result<(), String> {
        if let Some(log_bucket) = ctx.project().audit_log_bucket() {
            debug!("Routing access logs of bucket {} to {}", self.name(), log_bucket);
            self.properties.logging.get_or_insert_with(Default::default).log_bucket = Some(log_bucket.to_string());
            return Ok(());
        }

        match self.log_bucket() {
            Some(target) if ctx.inventory().contains(ResourceKind::GcsBucket, target) => Ok(()),
            Some(target) => Err(format!("log bucket '{}' is not declared before this bucket", target)),
            None if ctx.settings().require_audit_sink => {
                Err("project declares no audit log bucket to receive access logs".to_string())
            }
            None => {
                warn!("Project declares no audit log bucket; access logs of bucket {} are not routed", self.name());
                Ok(())
            }
        }
    }
}

impl ResourceSpec for GcsBucket {
    fn identity(&self) -> &str {
        self.name()
    }

    fn check(&self) -> Result<(), String> {
        let props = &self.properties;

        if props.name.is_empty() {
            return Err("name must be set".to_string());
        }
        if !naming::is_bucket_name(&props.name) {
            return Err(format!("name '{}' is not a valid bucket name", props.name));
        }
        if props.location.is_empty() {
            return Err("location must be set".to_string());
        }
        if props.versioning.as_ref().and_then(|v| v.enabled) == Some(false) {
            return Err("versioning must not be disabled".to_string());
        }
        let is_set = |acl: &Option<String>| acl.as_deref().is_some_and(|s| !s.is_empty());
        if is_set(&props.predefined_acl) || is_set(&props.predefined_default_object_acl) {
            return Err("predefined ACLs must not be set".to_string());
        }
        if props.bindings.iter().any(|b| b.typed().role.is_empty()) {
            return Err("every binding must name a role".to_string());
        }
        if let Some(days) = self.ttl_days {
            if days <= 0 {
                return Err(format!("ttl_days must be a positive number of days, got {}", days));
            }
        }

        Ok(())
    }

    fn inject_policy(&mut self, ctx: &PolicyContext<'_>) -> Result<(), String> {
        self.properties.versioning = Some(Versioning { enabled: Some(true) });

        let baseline = overlay_all(Self::baseline_bindings(ctx));
        self.properties.bindings = merge_bindings([baseline.as_slice(), self.properties.bindings.as_slice()]);

        // Audit log buckets do not log into themselves.
        if !ctx.is_audit_log() {
            self.wire_logging(ctx)?;
        }

        if let Some(days) = self.ttl_days {
            self.properties
                .lifecycle
                .get_or_insert_with(Default::default)
                .rule
                .push(Overlaid::new(LifecycleRule::delete_after(days)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Inventory, ResourceRole};
    use crate::project::{AuditSinks, Project};
    use crate::resources::Resource;
    use crate::settings::PolicySettings;
    use crate::test_support::{apply, apply_with, project};
    use serde_json::{json, Value};

    fn bucket(value: Value) -> Resource {
        Resource::decode(ResourceKind::GcsBucket, value).unwrap()
    }

    fn bindings_of(resource: &Resource) -> Value {
        resource.to_value().unwrap()["properties"]["bindings"].clone()
    }

    fn with_logs(project: Project) -> Project {
        project.with_audit_sinks(AuditSinks {
            gcs_bucket: Some("my-project-logs".to_string()),
            bigquery_dataset: None,
        })
    }

    #[test]
    fn test_default_binding_injection() {
        let project = Project::new("my-project", "g@example.com", "auditors@example.com");
        let mut resource = bucket(json!({"properties": {"name": "my-project-data", "location": "US"}}));

        apply(&mut resource, &project).unwrap();

        assert_eq!(
            bindings_of(&resource),
            json!([{"role": "roles/storage.admin", "members": ["group:g@example.com"]}])
        );
    }

    #[test]
    fn test_user_bindings_follow_policy_defaults() {
        let project = project()
            .with_readwrite_groups(vec!["rw@example.com".to_string()])
            .with_readonly_groups(vec!["ro@example.com".to_string()]);
        let mut resource = bucket(json!({"properties": {
            "name": "my-project-data",
            "location": "US",
            "bindings": [
                {"role": "roles/storage.objectViewer", "members": ["user:analyst@example.com", "group:ro@example.com"]},
                {"role": "roles/storage.legacyBucketReader", "members": ["user:ops@example.com"]}
            ]
        }}));

        apply(&mut resource, &project).unwrap();

        assert_eq!(
            bindings_of(&resource),
            json!([
                {"role": "roles/storage.admin", "members": ["group:owners@example.com"]},
                {"role": "roles/storage.objectAdmin", "members": ["group:rw@example.com"]},
                {"role": "roles/storage.objectViewer", "members": ["group:ro@example.com", "user:analyst@example.com"]},
                {"role": "roles/storage.legacyBucketReader", "members": ["user:ops@example.com"]}
            ])
        );
    }

    #[test]
    fn test_versioning_forced_on_and_extras_kept() {
        let mut resource = bucket(json!({"properties": {
            "name": "my-project-data",
            "location": "US",
            "labels": {"env": "prod"}
        }}));

        apply(&mut resource, &with_logs(project())).unwrap();

        let encoded = resource.to_value().unwrap();
        assert_eq!(encoded["properties"]["versioning"], json!({"enabled": true}));
        assert_eq!(encoded["properties"]["labels"], json!({"env": "prod"}));
        assert_eq!(encoded["properties"]["logging"], json!({"logBucket": "my-project-logs"}));
    }

    #[test]
    fn test_versioning_disabled_rejected() {
        let mut resource = bucket(json!({"properties": {
            "name": "my-project-data",
            "location": "US",
            "versioning": {"enabled": false}
        }}));

        let err = resource.validate().unwrap_err();

        assert!(err.to_string().contains("versioning must not be disabled"));
        assert_eq!(
            resource.as_gcs_bucket().unwrap().properties.versioning,
            Some(Versioning { enabled: Some(false) })
        );
    }

    #[test]
    fn test_required_fields_and_forbidden_acls() {
        let cases = [
            (json!({"properties": {"location": "US"}}), "name must be set"),
            (json!({"properties": {"name": "Bad_Name!", "location": "US"}}), "not a valid bucket name"),
            (json!({"properties": {"name": "my-project-data"}}), "location must be set"),
            (
                json!({"properties": {"name": "my-project-data", "location": "US", "predefinedAcl": "publicRead"}}),
                "predefined ACLs must not be set",
            ),
            (
                json!({"properties": {"name": "my-project-data", "location": "US", "predefinedDefaultObjectAcl": "private"}}),
                "predefined ACLs must not be set",
            ),
            (
                json!({"properties": {"name": "my-project-data", "location": "US"}, "ttl_days": 0}),
                "ttl_days must be a positive number of days",
            ),
        ];

        for (input, expected) in cases {
            let mut resource = bucket(input);
            let err = resource.validate().unwrap_err();
            assert!(err.to_string().contains(expected), "{} does not mention {}", err, expected);
        }
    }

    #[test]
    fn test_ttl_rule_appended_after_existing_rules() {
        let mut resource = bucket(json!({
            "properties": {
                "name": "my-project-data",
                "location": "US",
                "lifecycle": {"rule": [
                    {"action": {"type": "SetStorageClass", "storageClass": "COLDLINE"}, "condition": {"age": 90}}
                ]}
            },
            "ttl_days": 30
        }));

        apply(&mut resource, &with_logs(project())).unwrap();

        let encoded = resource.to_value().unwrap();
        assert_eq!(
            encoded["properties"]["lifecycle"]["rule"],
            json!([
                {"action": {"type": "SetStorageClass", "storageClass": "COLDLINE"}, "condition": {"age": 90}},
                {"action": {"type": "Delete"}, "condition": {"age": 30, "isLive": true}}
            ])
        );
        assert_eq!(encoded["ttl_days"], json!(30));
    }

    #[test]
    fn test_ttl_applied_without_audit_sink() {
        let mut resource = bucket(json!({
            "properties": {"name": "my-project-data", "location": "US"},
            "ttl_days": 7
        }));

        apply(&mut resource, &project()).unwrap();

        let bucket = resource.as_gcs_bucket().unwrap();
        assert_eq!(bucket.lifecycle_rules().len(), 1);
        assert_eq!(bucket.lifecycle_rules()[0].typed(), &LifecycleRule::delete_after(7));
        assert_eq!(bucket.log_bucket(), None);
    }

    #[test]
    fn test_missing_sink_is_error_when_required() {
        let mut resource = bucket(json!({"properties": {"name": "my-project-data", "location": "US"}}));
        let settings = PolicySettings::default().with_require_audit_sink(true);

        let err = apply_with(&mut resource, &project(), &Inventory::new(), &settings, ResourceRole::Data).unwrap_err();

        assert!(err.to_string().contains("Policy application failed for gcs_bucket 'my-project-data'"));
    }

    #[test]
    fn test_declared_log_bucket_must_exist() {
        let input = json!({"properties": {
            "name": "my-project-data",
            "location": "US",
            "logging": {"logBucket": "my-project-access-logs"}
        }});
        let settings = PolicySettings::default();

        let mut resource = bucket(input.clone());
        let err = apply_with(&mut resource, &project(), &Inventory::new(), &settings, ResourceRole::Data).unwrap_err();
        assert!(err.to_string().contains("log bucket 'my-project-access-logs' is not declared"));

        let mut inventory = Inventory::new();
        inventory.register(ResourceKind::GcsBucket, "my-project-access-logs");
        let mut resource = bucket(input);
        apply_with(&mut resource, &project(), &inventory, &settings, ResourceRole::Data).unwrap();
        assert_eq!(resource.as_gcs_bucket().unwrap().log_bucket(), Some("my-project-access-logs"));
    }

    #[test]
    fn test_audit_log_bucket_bindings() {
        let project = with_logs(project()).with_readwrite_groups(vec!["rw@example.com".to_string()]);
        let mut resource = bucket(json!({"properties": {"name": "my-project-logs", "location": "US"}}));

        apply_with(&mut resource, &project, &Inventory::new(), &PolicySettings::default(), ResourceRole::AuditLog)
            .unwrap();

        assert_eq!(
            bindings_of(&resource),
            json!([
                {"role": "roles/storage.admin", "members": ["group:owners@example.com"]},
                {"role": "roles/storage.objectViewer", "members": ["group:auditors@example.com"]}
            ])
        );
        assert_eq!(resource.as_gcs_bucket().unwrap().log_bucket(), None);
    }

    #[test]
    fn test_binding_extras_roundtrip() {
        let input = json!({"properties": {
            "name": "my-project-data",
            "location": "US",
            "bindings": [
                {
                    "role": "roles/storage.objectViewer",
                    "members": ["user:a@example.com"],
                    "condition": {"title": "expires", "expression": "request.time < timestamp('2030-01-01T00:00:00Z')"}
                },
                {"role": "roles/storage.legacyBucketReader"}
            ]
        }});

        assert_eq!(bucket(input.clone()).to_value().unwrap(), input);
    }

    #[test]
    fn test_conditional_binding_not_widened() {
        let project = project().with_readonly_groups(vec!["ro@example.com".to_string()]);
        let condition = json!({"title": "expires", "expression": "request.time < timestamp('2030-01-01T00:00:00Z')"});
        let mut resource = bucket(json!({"properties": {
            "name": "my-project-data",
            "location": "US",
            "bindings": [
                {"role": "roles/storage.objectViewer", "members": ["user:a@example.com"], "condition": condition.clone()},
                {"role": "roles/storage.legacyBucketReader"}
            ]
        }}));

        apply(&mut resource, &project).unwrap();

        assert_eq!(
            bindings_of(&resource),
            json!([
                {"role": "roles/storage.admin", "members": ["group:owners@example.com"]},
                {"role": "roles/storage.objectViewer", "members": ["group:ro@example.com"]},
                {"role": "roles/storage.objectViewer", "members": ["user:a@example.com"], "condition": condition}
            ])
        );
    }
}

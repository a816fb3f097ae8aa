//! BigQuery datasets.
//!
//! Dataset access is expressed as `access` entries rather than IAM bindings.
//! Entries are converted to `role -> principal` bindings for merging and back
//! again afterwards. Authorization entries (views, datasets, routines) carry no
//! principal and pass through after the merged entries.

use rampart_overlay::{is_default, Overlaid};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::binding::{merge_bindings, overlay_all, Binding};
use crate::context::PolicyContext;
use crate::naming;
use crate::resources::ResourceSpec;

const OWNER_ROLE: &str = "OWNER";
const WRITER_ROLE: &str = "WRITER";
const READER_ROLE: &str = "READER";

/// A BigQuery dataset definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BigqueryDataset {
    #[serde(default, skip_serializing_if = "is_default")]
    pub properties: BigqueryDatasetProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BigqueryDatasetProperties {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub access: Vec<Overlaid<DatasetAccess>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_default_owner: Option<bool>,
}

/// One dataset access entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetAccess {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_by_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iam_member: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routine: Option<Value>,
}

impl DatasetAccess {
    pub fn group(role: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            group_by_email: Some(email.into()),
            ..Default::default()
        }
    }

    /// Whether the entry authorizes a view, dataset or routine instead of a principal.
    pub fn is_authorization(&self) -> bool {
        self.view.is_some() || self.dataset.is_some() || self.routine.is_some()
    }

    /// Principals as binding members, prefixed with the key they were declared under.
    fn principals(&self) -> Vec<String> {
        [
            ("user", &self.user_by_email),
            ("group", &self.group_by_email),
            ("specialGroup", &self.special_group),
            ("domain", &self.domain),
            ("iamMember", &self.iam_member),
        ]
        .into_iter()
        .filter_map(|(prefix, value)| value.as_ref().map(|v| format!("{}:{}", prefix, v)))
        .collect()
    }

    fn from_principal(role: &str, member: &str) -> Option<Self> {
        let (prefix, value) = member.split_once(':')?;
        let mut entry = Self {
            role: role.to_string(),
            ..Default::default()
        };
        let slot = match prefix {
            "user" => &mut entry.user_by_email,
            "group" => &mut entry.group_by_email,
            "specialGroup" => &mut entry.special_group,
            "domain" => &mut entry.domain,
            "iamMember" => &mut entry.iam_member,
            _ => return None,
        };
        *slot = Some(value.to_string());
        Some(entry)
    }

    fn grants(&self, role: &str, member: &str) -> bool {
        self.role == role && self.principals().iter().any(|p| p == member)
    }
}

impl BigqueryDataset {
    pub fn name(&self) -> &str {
        &self.properties.name
    }

    fn baseline_bindings(ctx: &PolicyContext<'_>) -> Vec<Binding> {
        let project = ctx.project();
        let mut bindings = vec![Binding::new(OWNER_ROLE, project.owners_members())];

        if ctx.is_audit_log() {
            bindings.push(Binding::new(READER_ROLE, project.auditors_members()));
            return bindings;
        }

        bindings.extend(Binding::for_groups(WRITER_ROLE, project.data_readwrite_groups()));
        bindings.extend(Binding::for_groups(READER_ROLE, project.data_readonly_groups()));
        bindings
    }
}

impl ResourceSpec for BigqueryDataset {
    fn identity(&self) -> &str {
        self.name()
    }

    fn check(&self) -> Result<(), String> {
        let props = &self.properties;

        if props.name.is_empty() {
            return Err("name must be set".to_string());
        }
        if !naming::is_dataset_id(&props.name) {
            return Err(format!("name '{}' is not a valid dataset id", props.name));
        }
        if props.location.is_empty() {
            return Err("location must be set".to_string());
        }
        if props.set_default_owner == Some(true) {
            return Err("setDefaultOwner must not be set; owners are granted through access entries".to_string());
        }

        for entry in props.access.iter().map(|a| a.typed()) {
            let principals = entry.principals();
            if entry.is_authorization() {
                if !principals.is_empty() {
                    return Err("authorization access entries must not name a principal".to_string());
                }
                continue;
            }
            if entry.role.is_empty() {
                return Err("every access entry must name a role".to_string());
            }
            if principals.len() != 1 {
                return Err(format!("access entry for role {} must name exactly one principal", entry.role));
            }
        }

        Ok(())
    }

    fn inject_policy(&mut self, ctx: &PolicyContext<'_>) -> Result<(), String> {
        let (authorizations, entries): (Vec<_>, Vec<_>) = self
            .properties
            .access
            .drain(..)
            .partition(|a: &Overlaid<DatasetAccess>| a.typed().is_authorization());

        let declared: Vec<Overlaid<Binding>> = entries
            .iter()
            .map(|a| Overlaid::new(Binding::new(a.typed().role.clone(), a.typed().principals())))
            .collect();
        let baseline = overlay_all(Self::baseline_bindings(ctx));
        let merged = merge_bindings([baseline.as_slice(), declared.as_slice()]);

        // Declared entries are reused so their unmodeled keys survive.
        let mut access = Vec::new();
        for binding in merged.iter().map(|b| b.typed()) {
            for member in &binding.members {
                match entries.iter().find(|a| a.typed().grants(&binding.role, member)) {
                    Some(declared) => access.push(declared.clone()),
                    None => access.extend(DatasetAccess::from_principal(&binding.role, member).map(Overlaid::new)),
                }
            }
        }
        for authorization in authorizations {
            if !access.contains(&authorization) {
                access.push(authorization);
            }
        }

        self.properties.access = access;
        Ok(())
    }
}

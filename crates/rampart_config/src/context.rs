//! Read-only state handed to each resource while its policy is applied.

use crate::project::Project;
use crate::resources::ResourceKind;
use crate::settings::PolicySettings;

/// Whether a resource holds project data or receives the project's audit logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceRole {
    Data,
    AuditLog,
}

/// Identities of the resources that have completed policy application.
///
/// Resources may look up identities declared before them; there is no
/// forward lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    entries: Vec<(ResourceKind, String)>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, kind: ResourceKind, name: &str) -> bool {
        self.entries.iter().any(|(k, n)| *k == kind && n == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn register(&mut self, kind: ResourceKind, name: impl Into<String>) {
        self.entries.push((kind, name.into()));
    }
}

/// Everything a resource may consult while its policy is applied.
#[derive(Debug, Clone, Copy)]
pub struct PolicyContext<'a> {
    project: &'a Project,
    inventory: &'a Inventory,
    settings: &'a PolicySettings,
    role: ResourceRole,
}

impl<'a> PolicyContext<'a> {
    pub fn new(
        project: &'a Project,
        inventory: &'a Inventory,
        settings: &'a PolicySettings,
        role: ResourceRole,
    ) -> Self {
        Self {
            project,
            inventory,
            settings,
            role,
        }
    }

    pub fn project(&self) -> &'a Project {
        self.project
    }

    pub fn inventory(&self) -> &'a Inventory {
        self.inventory
    }

    pub fn settings(&self) -> &'a PolicySettings {
        self.settings
    }

    pub fn role(&self) -> ResourceRole {
        self.role
    }

    pub fn is_audit_log(&self) -> bool {
        self.role == ResourceRole::AuditLog
    }
}

//! Compute Engine instances.
//!
//! Instances carry no project-level access bindings or audit wiring; they are
//! validated and otherwise passed to the renderer as declared.

use rampart_overlay::is_default;
use serde::{Deserialize, Serialize};

use crate::context::PolicyContext;
use crate::naming;
use crate::resources::ResourceSpec;

/// A Compute Engine instance definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GceInstance {
    #[serde(default, skip_serializing_if = "is_default")]
    pub properties: GceInstanceProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GceInstanceProperties {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub zone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_type: Option<String>,
}

impl GceInstance {
    pub fn name(&self) -> &str {
        &self.properties.name
    }
}

impl ResourceSpec for GceInstance {
    fn identity(&self) -> &str {
        self.name()
    }

    fn check(&self) -> Result<(), String> {
        let props = &self.properties;

        if props.name.is_empty() {
            return Err("name must be set".to_string());
        }
        if !naming::is_instance_name(&props.name) {
            return Err(format!("name '{}' is not a valid instance name", props.name));
        }
        if props.zone.is_empty() {
            return Err("zone must be set".to_string());
        }
        if props.machine_type.as_deref() == Some("") {
            return Err("machineType must not be empty when set".to_string());
        }

        Ok(())
    }

    fn inject_policy(&mut self, _ctx: &PolicyContext<'_>) -> Result<(), String> {
        Ok(())
    }
}

//! The resource kind catalog.
//!
//! Every kind is a typed schema wrapped in an [`Overlaid`] so that keys the
//! schema does not model survive policy injection. [`Resource`] is the closed
//! set of kinds; adding a kind means adding a variant, and every `match` below
//! must then handle it.
//!
//! Policy can only be applied through the continuation returned by a
//! successful [`Resource::validate`]:
//!
//! ```rust,ignore
//! let validated = resource.validate()?;
//! validated.apply_policy(&context)?;
//! ```

use std::fmt;

use rampart_overlay::Overlaid;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::PolicyContext;
use crate::error::{ConfigError, ConfigResult};

pub mod bigquery_dataset;
pub mod gce_instance;
pub mod gcs_bucket;
pub mod pubsub_topic;

pub use bigquery_dataset::{BigqueryDataset, BigqueryDatasetProperties, DatasetAccess};
pub use gce_instance::{GceInstance, GceInstanceProperties};
pub use gcs_bucket::{
    BucketLogging, GcsBucket, GcsBucketProperties, Lifecycle, LifecycleAction, LifecycleCondition, LifecycleRule,
    Versioning,
};
pub use pubsub_topic::{PubsubTopic, PubsubTopicProperties, Subscription};

/// Supported resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    GcsBucket,
    BigqueryDataset,
    PubsubTopic,
    GceInstance,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::GcsBucket => "gcs_bucket",
            ResourceKind::BigqueryDataset => "bigquery_dataset",
            ResourceKind::PubsubTopic => "pubsub_topic",
            ResourceKind::GceInstance => "gce_instance",
        }
    }

    /// Key under `resources` holding the list of definitions of this kind.
    pub fn document_key(&self) -> &'static str {
        match self {
            ResourceKind::GcsBucket => "gcs_buckets",
            ResourceKind::BigqueryDataset => "bigquery_datasets",
            ResourceKind::PubsubTopic => "pubsub_topics",
            ResourceKind::GceInstance => "gce_instances",
        }
    }

    pub fn from_document_key(key: &str) -> Option<Self> {
        Self::all().into_iter().find(|kind| kind.document_key() == key)
    }

    pub fn all() -> [Self; 4] {
        [
            ResourceKind::GcsBucket,
            ResourceKind::BigqueryDataset,
            ResourceKind::PubsubTopic,
            ResourceKind::GceInstance,
        ]
    }

    /// Template the external renderer applies to resources of this kind.
    pub fn template_reference(&self) -> &'static str {
        match self {
            ResourceKind::GcsBucket => "gcs_bucket/gcs_bucket.py",
            ResourceKind::BigqueryDataset => "bigquery/bigquery_dataset.py",
            ResourceKind::PubsubTopic => "pubsub/pubsub.py",
            ResourceKind::GceInstance => "gce_instance/gce_instance.py",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Capabilities each typed schema provides to the catalog.
///
/// `check` must not mutate. `inject_policy` is only reachable through
/// [`Validated::apply_policy`].
pub(crate) trait ResourceSpec {
    fn identity(&self) -> &str;

    fn check(&self) -> Result<(), String>;

    fn inject_policy(&mut self, ctx: &PolicyContext<'_>) -> Result<(), String>;
}

/// One declared resource: typed view plus raw capture.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    GcsBucket(Overlaid<GcsBucket>),
    BigqueryDataset(Overlaid<BigqueryDataset>),
    PubsubTopic(Overlaid<PubsubTopic>),
    GceInstance(Overlaid<GceInstance>),
}

macro_rules! each_kind {
    ($resource:expr, $inner:ident => $body:expr) => {
        match $resource {
            Resource::GcsBucket($inner) => $body,
            Resource::BigqueryDataset($inner) => $body,
            Resource::PubsubTopic($inner) => $body,
            Resource::GceInstance($inner) => $body,
        }
    };
}

fn decode_as<T: DeserializeOwned>(kind: ResourceKind, value: Value) -> ConfigResult<Overlaid<T>> {
    Overlaid::from_value(value).map_err(|e| ConfigError::decode(format!("{} definition", kind), e))
}

impl Resource {
    /// Decode one resource definition of the given kind.
    pub fn decode(kind: ResourceKind, value: Value) -> ConfigResult<Self> {
        Ok(match kind {
            ResourceKind::GcsBucket => Resource::GcsBucket(decode_as(kind, value)?),
            ResourceKind::BigqueryDataset => Resource::BigqueryDataset(decode_as(kind, value)?),
            ResourceKind::PubsubTopic => Resource::PubsubTopic(decode_as(kind, value)?),
            ResourceKind::GceInstance => Resource::GceInstance(decode_as(kind, value)?),
        })
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::GcsBucket(_) => ResourceKind::GcsBucket,
            Resource::BigqueryDataset(_) => ResourceKind::BigqueryDataset,
            Resource::PubsubTopic(_) => ResourceKind::PubsubTopic,
            Resource::GceInstance(_) => ResourceKind::GceInstance,
        }
    }

    /// Canonical name, used for cross-referencing between resources.
    pub fn identify(&self) -> &str {
        each_kind!(self, r => r.typed().identity())
    }

    /// Opaque template identifier for the external renderer.
    pub fn template_reference(&self) -> &'static str {
        self.kind().template_reference()
    }

    /// Check required fields and forbidden configurations.
    ///
    /// Performs no mutation. On success, returns the only handle through which
    /// policy can be applied to this resource.
    pub fn validate(&mut self) -> ConfigResult<Validated<'_>> {
        let outcome = each_kind!(&*self, r => r.typed().check());
        outcome.map_err(|rule| ConfigError::validation(self.kind().as_str(), self.identify(), rule))?;
        Ok(Validated { resource: self })
    }

    /// Encode to a structured value: raw capture with the typed view merged over it.
    pub fn to_value(&self) -> ConfigResult<Value> {
        let encoded = each_kind!(self, r => r.to_value());
        encoded.map_err(|e| ConfigError::encode(format!("{} '{}'", self.kind(), self.identify()), e))
    }

    pub fn as_gcs_bucket(&self) -> Option<&GcsBucket> {
        match self {
            Resource::GcsBucket(r) => Some(r.typed()),
            _ => None,
        }
    }

    pub fn as_bigquery_dataset(&self) -> Option<&BigqueryDataset> {
        match self {
            Resource::BigqueryDataset(r) => Some(r.typed()),
            _ => None,
        }
    }

    pub fn as_pubsub_topic(&self) -> Option<&PubsubTopic> {
        match self {
            Resource::PubsubTopic(r) => Some(r.typed()),
            _ => None,
        }
    }

    pub fn as_gce_instance(&self) -> Option<&GceInstance> {
        match self {
            Resource::GceInstance(r) => Some(r.typed()),
            _ => None,
        }
    }
}

/// A resource that passed validation and may now have policy applied.
#[derive(Debug)]
pub struct Validated<'r> {
    resource: &'r mut Resource,
}

impl<'r> Validated<'r> {
    pub fn resource(&self) -> &Resource {
        &*self.resource
    }

    /// Apply project policy to the validated resource.
    ///
    /// Precondition: called exactly once per resource per pipeline run. Policy
    /// application is not idempotent; for example a TTL rule is appended on
    /// every call.
    pub fn apply_policy(self, ctx: &PolicyContext<'_>) -> ConfigResult<&'r Resource> {
        let resource = self.resource;
        let outcome = each_kind!(&mut *resource, r => r.typed_mut().inject_policy(ctx));
        outcome.map_err(|reason| ConfigError::policy(resource.kind().as_str(), resource.identify(), reason))?;
        Ok(resource)
    }
}

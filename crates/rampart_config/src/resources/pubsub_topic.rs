//! Pub/Sub topics and their subscriptions.

use std::collections::HashSet;

use rampart_overlay::{is_default, Overlaid};
use serde::{Deserialize, Serialize};

use crate::binding::{merge_bindings, overlay_all, Binding};
use crate::context::PolicyContext;
use crate::resources::ResourceSpec;

const ADMIN_ROLE: &str = "roles/pubsub.admin";
const PUBLISHER_ROLE: &str = "roles/pubsub.publisher";
const SUBSCRIBER_ROLE: &str = "roles/pubsub.subscriber";
const VIEWER_ROLE: &str = "roles/pubsub.viewer";

/// A Pub/Sub topic definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PubsubTopic {
    #[serde(default, skip_serializing_if = "is_default")]
    pub properties: PubsubTopicProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PubsubTopicProperties {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub topic: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub access_control: Vec<Overlaid<Binding>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subscriptions: Vec<Overlaid<Subscription>>,
}

/// A subscription on the topic. Unmodeled keys (ack deadlines, push config) are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub access_control: Vec<Overlaid<Binding>>,
}

impl PubsubTopic {
    pub fn topic(&self) -> &str {
        &self.properties.topic
    }

    pub fn subscriptions(&self) -> impl Iterator<Item = &Subscription> {
        self.properties.subscriptions.iter().map(|s| s.typed())
    }
}

impl ResourceSpec for PubsubTopic {
    fn identity(&self) -> &str {
        self.topic()
    }

    fn check(&self) -> Result<(), String> {
        if self.properties.topic.is_empty() {
            return Err("topic must be set".to_string());
        }
        if self.properties.access_control.iter().any(|b| b.typed().role.is_empty()) {
            return Err("every access control binding must name a role".to_string());
        }

        let mut names = HashSet::new();
        for subscription in self.subscriptions() {
            if subscription.name.is_empty() {
                return Err("every subscription must have a name".to_string());
            }
            if !names.insert(subscription.name.as_str()) {
                return Err(format!("subscription '{}' is declared more than once", subscription.name));
            }
            if subscription.access_control.iter().any(|b| b.typed().role.is_empty()) {
                return Err(format!(
                    "every access control binding of subscription '{}' must name a role",
                    subscription.name
                ));
            }
        }

        Ok(())
    }

    fn inject_policy(&mut self, ctx: &PolicyContext<'_>) -> Result<(), String> {
        let project = ctx.project();

        let mut topic_baseline = vec![Binding::new(ADMIN_ROLE, project.owners_members())];
        topic_baseline.extend(Binding::for_groups(PUBLISHER_ROLE, project.data_readwrite_groups()));
        let topic_baseline = overlay_all(topic_baseline);
        let props = &mut self.properties;
        props.access_control = merge_bindings([topic_baseline.as_slice(), props.access_control.as_slice()]);

        let subscription_baseline = overlay_all(
            [
                Binding::for_groups(SUBSCRIBER_ROLE, project.data_readwrite_groups()),
                Binding::for_groups(VIEWER_ROLE, project.data_readonly_groups()),
            ]
            .into_iter()
            .flatten()
            .collect(),
        );
        for subscription in &mut props.subscriptions {
            let subscription = subscription.typed_mut();
            subscription.access_control =
                merge_bindings([subscription_baseline.as_slice(), subscription.access_control.as_slice()]);
        }

        Ok(())
    }
}

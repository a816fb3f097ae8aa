//! Access-control bindings and the binding merger.

use rampart_overlay::Overlaid;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An access-control entry mapping a role to a set of principals.
///
/// A `condition` restricts the grant; a conditional grant is never folded into
/// an unconditional one for the same role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub role: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,
}

impl Binding {
    pub fn new(role: impl Into<String>, members: Vec<String>) -> Self {
        Self {
            role: role.into(),
            members,
            condition: None,
        }
    }

    /// Binding granting `role` to each group, as `group:` principals.
    ///
    /// Returns `None` when there are no groups, so callers never emit empty bindings.
    pub fn for_groups<S: AsRef<str>>(role: impl Into<String>, groups: &[S]) -> Option<Self> {
        if groups.is_empty() {
            return None;
        }
        Some(Self::new(role, group_members(groups)))
    }

    /// Whether both bindings grant the same role under the same condition.
    pub fn same_grant(&self, other: &Binding) -> bool {
        self.role == other.role && self.condition == other.condition
    }
}

/// Prefix each group address as a `group:` principal.
pub fn group_members<S: AsRef<str>>(groups: &[S]) -> Vec<String> {
    groups.iter().map(|g| format!("group:{}", g.as_ref())).collect()
}

/// Wrap bindings produced by policy, which have no user input behind them.
pub fn overlay_all(bindings: Vec<Binding>) -> Vec<Overlaid<Binding>> {
    bindings.into_iter().map(Overlaid::new).collect()
}

/// Merge binding lists into one binding per role and condition.
///
/// Lists are concatenated in argument order. Grants keep the order in which
/// they are first seen, along with any unmodeled keys of that first entry;
/// within a grant, members keep first-seen order and duplicates are dropped.
/// Grants that end up with no members are omitted. Merging never fails, and
/// merging the output again is a no-op.
pub fn merge_bindings<'a, I>(lists: I) -> Vec<Overlaid<Binding>>
where
    I: IntoIterator<Item = &'a [Overlaid<Binding>]>,
{
    let mut merged: Vec<Overlaid<Binding>> = Vec::new();

    for entry in lists.into_iter().flatten() {
        let binding = entry.typed();
        let index = match merged.iter().position(|m| m.typed().same_grant(binding)) {
            Some(index) => index,
            None => {
                let mut first = entry.clone();
                first.typed_mut().members.clear();
                merged.push(first);
                merged.len() - 1
            }
        };

        let members = &mut merged[index].typed_mut().members;
        for member in &binding.members {
            if !members.contains(member) {
                members.push(member.clone());
            }
        }
    }

    merged.retain(|b| !b.typed().members.is_empty());
    merged
}

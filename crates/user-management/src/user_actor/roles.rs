//! Role diffing for `UpdateRoles`.

use crate::outcome::Outcome;
use crate::user_actor::UserError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The roles an `UpdateRoles` call actually adds and removes once diffed against the
/// current role set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveRoleChange {
    pub added: BTreeSet<String>,
    pub removed: BTreeSet<String>,
}

impl EffectiveRoleChange {
    /// Rejects blank role names.
    pub fn validate_request(add: &[String], remove: &[String]) -> Outcome<()> {
        if add.iter().chain(remove).any(|role| role.trim().is_empty()) {
            return Err(UserError::ValidationError(
                "Role names must not be blank".to_string(),
            ));
        }
        Ok(())
    }

    /// Diffs a request against `current`.
    ///
    /// Requested roles are deduplicated. A role named in both `add` and `remove` cancels
    /// out. Adds already held and removes not held are dropped, so `added` and `removed`
    /// are always disjoint.
    pub fn compute(current: &BTreeSet<String>, add: &[String], remove: &[String]) -> Self {
        let requested_add: BTreeSet<&String> = add.iter().collect();
        let requested_remove: BTreeSet<&String> = remove.iter().collect();

        let added: BTreeSet<String> = requested_add
            .difference(&requested_remove)
            .filter(|role| !current.contains(**role))
            .map(|role| (*role).clone())
            .collect();
        let removed: BTreeSet<String> = requested_remove
            .difference(&requested_add)
            .filter(|role| current.contains(**role))
            .map(|role| (*role).clone())
            .collect();

        debug_assert!(added.is_disjoint(&removed));

        Self { added, removed }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    pub fn apply(&self, roles: &mut BTreeSet<String>) {
        roles.extend(self.added.iter().cloned());
        roles.retain(|role| !self.removed.contains(role));
    }
}

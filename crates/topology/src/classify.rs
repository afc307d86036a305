//! Change classification for matched entity pairs

use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostic;
use crate::mask::FieldMask;
use crate::model::{Entity, FormatSchema, Identity, MlModel, NodeGroup, Shard, ShardGroup};

/// Semantic category of the change between a desired and observed entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeCategory {
    /// Nothing to do
    NoOp,
    /// Any applicable change not covered by a more specific category
    OtherUpdate,
    /// Dedicated manager group grows
    ManagerHostCountIncrease,
    /// Dedicated manager group shrinks
    ManagerHostCountDecrease,
    /// Mixed manager group loses hosts or its manager role
    DataManagerShrink,
    /// Dedicated manager group would become non-manager-only
    IncompatibleRoleChange,
}

impl std::fmt::Display for ChangeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeCategory::NoOp => write!(f, "no_op"),
            ChangeCategory::OtherUpdate => write!(f, "other_update"),
            ChangeCategory::ManagerHostCountIncrease => write!(f, "manager_host_count_increase"),
            ChangeCategory::ManagerHostCountDecrease => write!(f, "manager_host_count_decrease"),
            ChangeCategory::DataManagerShrink => write!(f, "data_manager_shrink"),
            ChangeCategory::IncompatibleRoleChange => write!(f, "incompatible_role_change"),
        }
    }
}

/// Classified change of one matched pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub category: ChangeCategory,
    /// Paths that changed; empty for `NoOp`
    pub mask: FieldMask,
}

impl Classified {
    fn from_mask(mask: FieldMask) -> Self {
        let category = if mask.is_empty() {
            ChangeCategory::NoOp
        } else {
            ChangeCategory::OtherUpdate
        };
        Self { category, mask }
    }
}

/// Entity the reconciler knows how to diff and order
pub trait Reconcilable: Identity + Clone + Into<Entity> {
    /// Classify the change from `observed` to `self`
    ///
    /// `Err` means the change cannot be applied in place; no operation is
    /// emitted for the pair.
    fn classify(&self, observed: &Self) -> Result<Classified, Diagnostic>;

    /// Created ahead of its kind's other entities
    fn create_first(&self) -> bool {
        false
    }
}

/// Category of a node group change
///
/// Checked in order: incompatible role change, manager-only resize in either
/// direction, mixed-manager shrink, then any other difference.
pub fn node_group_category(
    desired: &NodeGroup,
    observed: &NodeGroup,
    mask: &FieldMask,
) -> ChangeCategory {
    if observed.is_manager_only() && !desired.is_manager_only() {
        return ChangeCategory::IncompatibleRoleChange;
    }
    if desired.is_manager_only() && desired.hosts_count > observed.hosts_count {
        return ChangeCategory::ManagerHostCountIncrease;
    }
    if desired.is_manager_only() && desired.hosts_count < observed.hosts_count {
        return ChangeCategory::ManagerHostCountDecrease;
    }
    if desired.is_mixed_manager() && desired.hosts_count < observed.hosts_count {
        return ChangeCategory::DataManagerShrink;
    }
    if observed.is_mixed_manager() && is_removed_manager_role(desired, observed) {
        return ChangeCategory::DataManagerShrink;
    }
    if mask.is_empty() {
        ChangeCategory::NoOp
    } else {
        ChangeCategory::OtherUpdate
    }
}

/// Observed group carries the manager role, desired group does not
pub fn is_removed_manager_role(desired: &NodeGroup, observed: &NodeGroup) -> bool {
    observed.has_manager_role() && !desired.has_manager_role()
}

impl Reconcilable for NodeGroup {
    fn classify(&self, observed: &Self) -> Result<Classified, Diagnostic> {
        let mask = self.changed_fields(observed);
        let category = node_group_category(self, observed, &mask);
        if category == ChangeCategory::IncompatibleRoleChange {
            return Err(Diagnostic::error(
                "dedicated manager groups cannot be converted to non-manager-only",
            )
            .with_detail(format!(
                "observed roles {}, desired roles {}",
                format_roles(observed),
                format_roles(self)
            ))
            .with_target(self.entity_ref()));
        }
        Ok(Classified { category, mask })
    }

    fn create_first(&self) -> bool {
        self.is_manager_only()
    }
}

impl Reconcilable for Shard {
    fn classify(&self, observed: &Self) -> Result<Classified, Diagnostic> {
        Ok(Classified::from_mask(self.changed_fields(observed)))
    }
}

impl Reconcilable for ShardGroup {
    fn classify(&self, observed: &Self) -> Result<Classified, Diagnostic> {
        Ok(Classified::from_mask(self.changed_fields(observed)))
    }
}

impl Reconcilable for FormatSchema {
    fn classify(&self, observed: &Self) -> Result<Classified, Diagnostic> {
        if self.schema_type != observed.schema_type {
            return Err(Diagnostic::error("type of an existing format schema cannot be changed")
                .with_detail(format!(
                    "observed {}, desired {}; use a new name to replace the schema",
                    observed.schema_type, self.schema_type
                ))
                .with_target(self.entity_ref()));
        }
        Ok(Classified::from_mask(self.changed_fields(observed)))
    }
}

impl Reconcilable for MlModel {
    fn classify(&self, observed: &Self) -> Result<Classified, Diagnostic> {
        if self.model_type != observed.model_type {
            return Err(Diagnostic::error("type of an existing ml model cannot be changed")
                .with_detail(format!(
                    "observed {}, desired {}; use a new name to replace the model",
                    observed.model_type, self.model_type
                ))
                .with_target(self.entity_ref()));
        }
        Ok(Classified::from_mask(self.changed_fields(observed)))
    }
}

fn format_roles(group: &NodeGroup) -> String {
    let roles: Vec<&str> = group.roles.iter().map(|r| r.as_str()).collect();
    format!("[{}]", roles.join(", "))
}

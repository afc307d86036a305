//! Ordered operation plans

use serde::{Deserialize, Serialize};

use crate::classify::ChangeCategory;
use crate::mask::FieldMask;
use crate::model::{Entity, EntityKind, EntityRef};

/// Execution phase, in execution order
///
/// Manager capacity grows before anything else changes and shrinks only
/// after everything else has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// New entities, manager-only groups first
    Create,
    /// Dedicated manager groups grow
    ManagerIncrease,
    /// Mixed manager groups shrink or lose the manager role
    DataManagerShrink,
    /// Remaining updates, then deletions
    UpdateAndDelete,
    /// Dedicated manager groups shrink
    ManagerDecrease,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Create,
        Phase::ManagerIncrease,
        Phase::DataManagerShrink,
        Phase::UpdateAndDelete,
        Phase::ManagerDecrease,
    ];

    /// Phase an update of the given category belongs to
    pub fn for_update(category: ChangeCategory) -> Option<Phase> {
        match category {
            ChangeCategory::ManagerHostCountIncrease => Some(Phase::ManagerIncrease),
            ChangeCategory::DataManagerShrink => Some(Phase::DataManagerShrink),
            ChangeCategory::OtherUpdate => Some(Phase::UpdateAndDelete),
            ChangeCategory::ManagerHostCountDecrease => Some(Phase::ManagerDecrease),
            ChangeCategory::NoOp | ChangeCategory::IncompatibleRoleChange => None,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Create => write!(f, "create"),
            Phase::ManagerIncrease => write!(f, "manager_increase"),
            Phase::DataManagerShrink => write!(f, "data_manager_shrink"),
            Phase::UpdateAndDelete => write!(f, "update_and_delete"),
            Phase::ManagerDecrease => write!(f, "manager_decrease"),
        }
    }
}

/// Remote verb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationKind::Create => write!(f, "create"),
            OperationKind::Update => write!(f, "update"),
            OperationKind::Delete => write!(f, "delete"),
        }
    }
}

/// One remote mutating call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub phase: Phase,
    pub kind: OperationKind,
    pub target: EntityRef,
    /// Set for updates only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ChangeCategory>,
    /// Paths an update may change; empty for create and delete
    #[serde(default, skip_serializing_if = "FieldMask::is_empty")]
    pub field_mask: FieldMask,
    /// Desired entity for create and update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<Entity>,
}

impl Operation {
    pub fn create(entity: Entity) -> Self {
        Self {
            phase: Phase::Create,
            kind: OperationKind::Create,
            target: entity.entity_ref(),
            category: None,
            field_mask: FieldMask::new(),
            entity: Some(entity),
        }
    }

    pub fn update(
        phase: Phase,
        category: ChangeCategory,
        field_mask: FieldMask,
        entity: Entity,
    ) -> Self {
        Self {
            phase,
            kind: OperationKind::Update,
            target: entity.entity_ref(),
            category: Some(category),
            field_mask,
            entity: Some(entity),
        }
    }

    pub fn delete(target: EntityRef) -> Self {
        Self {
            phase: Phase::UpdateAndDelete,
            kind: OperationKind::Delete,
            target,
            category: None,
            field_mask: FieldMask::new(),
            entity: None,
        }
    }

    pub fn is_update(&self) -> bool {
        self.kind == OperationKind::Update
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.target)?;
        if let Some(category) = self.category {
            write!(f, " ({}; {})", category, self.field_mask)?;
        }
        Ok(())
    }
}

/// Operations of one phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub phase: Phase,
    pub operations: Vec<Operation>,
}

/// Ordered list of operation batches
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationPlan {
    pub batches: Vec<Batch>,
}

impl OperationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Operations in execution order
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.batches.iter().flat_map(|b| b.operations.iter())
    }

    pub fn len(&self) -> usize {
        self.batches.iter().map(|b| b.operations.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn batch(&self, phase: Phase) -> Option<&Batch> {
        self.batches.iter().find(|b| b.phase == phase)
    }

    /// Number of operations of the given verb
    pub fn count(&self, kind: OperationKind) -> usize {
        self.operations().filter(|op| op.kind == kind).count()
    }

    /// Operations touching one entity
    pub fn for_target<'a>(
        &'a self,
        kind: EntityKind,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Operation> + 'a {
        self.operations()
            .filter(move |op| op.target.kind == kind && op.target.name == name)
    }
}

impl std::fmt::Display for OperationPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "no changes");
        }
        let mut step = 1;
        for batch in &self.batches {
            writeln!(f, "phase {}:", batch.phase)?;
            for op in &batch.operations {
                writeln!(f, "  {:>3}. {}", step, op)?;
                step += 1;
            }
        }
        Ok(())
    }
}

//! Phase sequencer
//!
//! Collects creates, classified updates and deletes of every entity kind and
//! orders them into phase batches:
//!
//! 1. `Create`: manager-only node groups, other node groups, shards, shard
//!    groups, format schemas, ML models
//! 2. `ManagerIncrease`
//! 3. `DataManagerShrink`
//! 4. `UpdateAndDelete`: updates in kind order, then deletes in reverse kind
//!    order so dependents go before what they reference
//! 5. `ManagerDecrease`
//!
//! Inside a phase the order is deterministic (kind, then name).

use std::collections::BTreeMap;
use tracing::debug;

use crate::classify::{Classified, Reconcilable};
use crate::model::EntityKind;
use crate::plan::{Batch, Operation, OperationPlan, Phase};

/// Position of an operation inside its phase
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct SlotKey {
    /// 0 for updates and creates, 1 for deletes
    group: u8,
    kind_rank: u8,
    /// 0 for entities created ahead of their kind
    priority: u8,
    name: String,
}

/// Builds an [`OperationPlan`]
#[derive(Debug, Default)]
pub struct Sequencer {
    phases: BTreeMap<Phase, Vec<(SlotKey, Operation)>>,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule creation of a desired entity
    pub fn create<E: Reconcilable>(&mut self, desired: &E) {
        let key = SlotKey {
            group: 0,
            kind_rank: E::KIND as u8,
            priority: if desired.create_first() { 0 } else { 1 },
            name: desired.name().to_string(),
        };
        self.push(Phase::Create, key, Operation::create(desired.clone().into()));
    }

    /// Schedule an update; returns `false` when nothing needs to be sent
    ///
    /// Updates with an empty field mask are suppressed, which keeps
    /// reconciling a converged topology free of operations.
    pub fn update<E: Reconcilable>(&mut self, desired: &E, classified: Classified) -> bool {
        if classified.mask.is_empty() {
            return false;
        }
        let Some(phase) = Phase::for_update(classified.category) else {
            return false;
        };
        let key = SlotKey {
            group: 0,
            kind_rank: E::KIND as u8,
            priority: 0,
            name: desired.name().to_string(),
        };
        let entity = desired.clone().into();
        let op = Operation::update(phase, classified.category, classified.mask, entity);
        self.push(phase, key, op);
        true
    }

    /// Schedule deletion of an observed entity
    pub fn delete<E: Reconcilable>(&mut self, observed: &E) {
        let key = SlotKey {
            group: 1,
            kind_rank: (EntityKind::MlModel as u8) - (E::KIND as u8),
            priority: 0,
            name: observed.name().to_string(),
        };
        self.push(Phase::UpdateAndDelete, key, Operation::delete(observed.entity_ref()));
    }

    fn push(&mut self, phase: Phase, key: SlotKey, op: Operation) {
        debug!("Sequenced {} in phase {}", op, phase);
        self.phases.entry(phase).or_default().push((key, op));
    }

    /// Number of operations scheduled so far
    pub fn len(&self) -> usize {
        self.phases.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sort every phase and emit non-empty batches in phase order
    pub fn finish(mut self) -> OperationPlan {
        let mut batches = Vec::new();
        for phase in Phase::ALL {
            let Some(mut slots) = self.phases.remove(&phase) else {
                continue;
            };
            if slots.is_empty() {
                continue;
            }
            slots.sort_by(|a, b| a.0.cmp(&b.0));
            batches.push(Batch {
                phase,
                operations: slots.into_iter().map(|(_, op)| op).collect(),
            });
        }
        OperationPlan { batches }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ChangeCategory;
    use crate::mask::FieldMask;
    use crate::model::{NodeGroup, Role, Shard, ShardGroup};
    use crate::plan::OperationKind;

    #[test]
    fn test_create_phase_puts_manager_only_groups_first() {
        let mut seq = Sequencer::new();
        seq.create(&Shard::new("a-shard", 1));
        seq.create(&NodeGroup::new("a-data", [Role::Data], 2));
        seq.create(&NodeGroup::new("z-managers", [Role::Manager], 3));

        let plan = seq.finish();
        let names: Vec<_> = plan.operations().map(|op| op.target.name.as_str()).collect();
        assert_eq!(names, vec!["z-managers", "a-data", "a-shard"]);
    }

    #[test]
    fn test_deletes_follow_updates_in_reverse_kind_order() {
        let mut seq = Sequencer::new();
        seq.delete(&Shard::new("s1", 1));
        seq.delete(&ShardGroup::new("g1", ["s1"]));
        seq.update(
            &Shard::new("s2", 2),
            Classified {
                category: ChangeCategory::OtherUpdate,
                mask: ["weight"].into_iter().collect(),
            },
        );

        let plan = seq.finish();
        assert_eq!(plan.batches.len(), 1);
        let ops: Vec<_> = plan.operations().map(|op| (op.kind, op.target.name.as_str())).collect();
        assert_eq!(
            ops,
            vec![
                (OperationKind::Update, "s2"),
                (OperationKind::Delete, "g1"),
                (OperationKind::Delete, "s1"),
            ]
        );
    }

    #[test]
    fn test_empty_mask_is_suppressed() {
        let mut seq = Sequencer::new();
        let scheduled = seq.update(
            &Shard::new("s1", 1),
            Classified {
                category: ChangeCategory::OtherUpdate,
                mask: FieldMask::new(),
            },
        );
        assert!(!scheduled);
        assert!(seq.finish().is_empty());
    }

    #[test]
    fn test_phase_order() {
        let mut seq = Sequencer::new();
        let hosts: FieldMask = ["hosts_count"].into_iter().collect();
        seq.update(
            &NodeGroup::new("managers", [Role::Manager], 1),
            Classified {
                category: ChangeCategory::ManagerHostCountDecrease,
                mask: hosts.clone(),
            },
        );
        seq.delete(&NodeGroup::new("old", [Role::Data], 1));
        seq.update(
            &NodeGroup::new("mixed", [Role::Manager, Role::Data], 1),
            Classified {
                category: ChangeCategory::DataManagerShrink,
                mask: hosts.clone(),
            },
        );
        seq.create(&NodeGroup::new("new", [Role::Data], 1));

        let plan = seq.finish();
        let phases: Vec<_> = plan.batches.iter().map(|b| b.phase).collect();
        assert_eq!(
            phases,
            vec![
                Phase::Create,
                Phase::DataManagerShrink,
                Phase::UpdateAndDelete,
                Phase::ManagerDecrease,
            ]
        );
    }
}

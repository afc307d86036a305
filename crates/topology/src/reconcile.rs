//! Reconciliation: diff, classify and sequence every entity kind

use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::classify::Reconcilable;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::diff::diff;
use crate::model::Topology;
use crate::plan::{OperationKind, OperationPlan};
use crate::sequence::Sequencer;
use crate::validate::{apply_shard_resources, validate_topology};

/// Outcome of one planning run
///
/// The plan holds operations for every pair that could be classified; the
/// diagnostics name pairs that could not. A run with error diagnostics must
/// be treated as failed as a whole.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub plan: OperationPlan,
    pub diagnostics: Diagnostics,
}

impl Reconciliation {
    pub fn is_ok(&self) -> bool {
        !self.diagnostics.has_errors()
    }

    pub fn into_result(self) -> Result<OperationPlan, Diagnostics> {
        self.diagnostics.into_result(self.plan)
    }
}

/// Compute the ordered operations that turn `observed` into `desired`
///
/// Pure: neither snapshot is modified. `reconcile(t, t)` is always empty.
pub fn reconcile(desired: &Topology, observed: &Topology) -> Reconciliation {
    let mut sequencer = Sequencer::new();
    let mut diagnostics = Diagnostics::new();

    let (seq, diags) = (&mut sequencer, &mut diagnostics);
    reconcile_kind(&desired.node_groups, &observed.node_groups, seq, diags);
    reconcile_kind(&desired.shards, &observed.shards, seq, diags);
    reconcile_kind(&desired.shard_groups, &observed.shard_groups, seq, diags);
    reconcile_kind(&desired.format_schemas, &observed.format_schemas, seq, diags);
    reconcile_kind(&desired.ml_models, &observed.ml_models, seq, diags);

    check_manager_removal(desired, observed, &mut diagnostics);

    let plan = sequencer.finish();
    debug!(
        "Reconciled topology: {} creates, {} updates, {} deletes, {} diagnostics",
        plan.count(OperationKind::Create),
        plan.count(OperationKind::Update),
        plan.count(OperationKind::Delete),
        diagnostics.len()
    );

    Reconciliation { plan, diagnostics }
}

/// Validate `desired`, propagate cluster resources to shards, then reconcile
///
/// Classification still runs after a validation error so every finding is
/// reported, but the returned plan is then empty.
pub fn plan_update(desired: &Topology, observed: &Topology) -> Reconciliation {
    let mut effective = desired.clone();
    let mut diagnostics = validate_topology(&effective);
    diagnostics.extend(apply_shard_resources(&mut effective));
    let valid = !diagnostics.has_errors();

    let reconciliation = reconcile(&effective, observed);
    diagnostics.extend(reconciliation.diagnostics);

    let plan = if valid {
        reconciliation.plan
    } else {
        OperationPlan::new()
    };
    Reconciliation { plan, diagnostics }
}

fn reconcile_kind<E: Reconcilable>(
    desired: &BTreeMap<String, E>,
    observed: &BTreeMap<String, E>,
    sequencer: &mut Sequencer,
    diagnostics: &mut Diagnostics,
) {
    let d = diff(desired, observed);

    for entity in d.added {
        sequencer.create(entity);
    }

    for (want, have) in d.matched {
        match want.classify(have) {
            Ok(classified) => {
                sequencer.update(want, classified);
            }
            Err(diagnostic) => {
                warn!("Cannot reconcile {}: {}", want.entity_ref(), diagnostic.summary);
                diagnostics.push(diagnostic);
            }
        }
    }

    for entity in d.removed {
        sequencer.delete(entity);
    }
}

/// Warn when the desired topology leaves no host with the manager role
///
/// The control plane has the final say; the engine only points it out.
fn check_manager_removal(desired: &Topology, observed: &Topology, diagnostics: &mut Diagnostics) {
    if observed.manager_hosts() > 0 && desired.manager_hosts() == 0 {
        diagnostics.push(
            Diagnostic::warning("desired topology has no node group with the manager role")
                .with_detail(
                    "the control plane is expected to reject removing the last manager hosts",
                ),
        );
    }
}

//! Topology - reconciliation engine for managed database clusters
//!
//! Diffs a desired cluster topology (node groups, shards, shard groups,
//! format schemas, ML models) against the observed one and produces an
//! ordered plan of remote operations that never shrinks manager capacity
//! before everything else has been applied.
//!
//! # Pipeline
//! - [`validate_plan`] / [`validate_topology`]: plan-time checks
//! - [`diff()`]: identity-keyed matching of two collections
//! - [`Reconcilable::classify`]: per-pair change category and field mask
//! - [`Sequencer`]: phase ordering
//! - [`reconcile`] / [`plan_update`]: all of the above
//!
//! # Usage Example
//! ```ignore
//! use topology::{plan_update, Topology};
//!
//! let reconciliation = plan_update(&desired, &observed);
//! let plan = reconciliation.into_result()?;
//! for op in plan.operations() {
//!     println!("{}", op);
//! }
//! ```

pub mod classify;
pub mod diagnostics;
pub mod diff;
pub mod error;
pub mod mask;
pub mod model;
pub mod plan;
pub mod reconcile;
pub mod sequence;
pub mod validate;

// Re-export commonly used types
pub use classify::{ChangeCategory, Classified, Reconcilable};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use diff::{diff, EntityDiff};
pub use error::ModelError;
pub use mask::FieldMask;
pub use model::{
    Entity, EntityKind, EntityRef, FormatSchema, FormatSchemaType, HasResources, Identity, MlModel,
    MlModelType, NodeGroup, Resources, Role, Shard, ShardGroup, Topology,
};
pub use plan::{Batch, Operation, OperationKind, OperationPlan, Phase};
pub use reconcile::{plan_update, reconcile, Reconciliation};
pub use sequence::Sequencer;
pub use validate::{apply_shard_resources, validate_plan, validate_topology};

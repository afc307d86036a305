//! Shared fixtures for executor tests

#![allow(dead_code)]

use std::sync::Arc;

use pilot::config::ExecutorConfig;
use pilot::{ControlCall, Executor, InMemoryControlPlane};
use topology::{
    EntityKind, EntityRef, FormatSchema, FormatSchemaType, MlModel, MlModelType, NodeGroup,
    OperationPlan, Role, Shard, ShardGroup, Topology,
};

pub fn observed() -> Topology {
    Topology::new()
        .with(NodeGroup::new("managers", [Role::Manager], 3))
        .with(NodeGroup::new("data", [Role::Data], 3))
        .with(Shard::new("s1", 1))
        .with(Shard::new("s2", 1))
        .with(ShardGroup::new("g", ["s1", "s2"]))
        .with(MlModel::new("ranker", MlModelType::CatBoost, "https://storage/ranker.bin"))
}

/// Touches every phase but the manager decrease
///
/// Plan order: create analytics, create events, grow managers, update data,
/// s1 and g, delete ranker, delete s2.
pub fn desired() -> Topology {
    Topology::new()
        .with(NodeGroup::new("managers", [Role::Manager], 5))
        .with(NodeGroup::new("data", [Role::Data], 2))
        .with(NodeGroup::new("analytics", [Role::Data], 2))
        .with(Shard::new("s1", 2))
        .with(ShardGroup::new("g", ["s1"]))
        .with(FormatSchema::new(
            "events",
            FormatSchemaType::Protobuf,
            "https://storage/events.proto",
        ))
}

pub const PLAN_ORDER: [&str; 8] = [
    "node_group/analytics",
    "format_schema/events",
    "node_group/managers",
    "node_group/data",
    "shard/s1",
    "shard_group/g",
    "ml_model/ranker",
    "shard/s2",
];

pub fn plan() -> OperationPlan {
    topology::plan_update(&desired(), &observed())
        .into_result()
        .expect("fixture plan is valid")
}

pub fn group(name: &str) -> EntityRef {
    EntityRef::new(EntityKind::NodeGroup, name)
}

pub fn control() -> Arc<InMemoryControlPlane> {
    Arc::new(InMemoryControlPlane::new(observed()))
}

pub fn executor(control: Arc<InMemoryControlPlane>, operation_timeout_secs: u64) -> Executor {
    let config = ExecutorConfig {
        operation_timeout_secs,
        run_timeout_secs: 0,
    };
    Executor::new(control, &config)
}

/// Targets of the received calls, in order
pub fn targets(calls: &[ControlCall]) -> Vec<String> {
    calls.iter().map(|c| c.target.to_string()).collect()
}

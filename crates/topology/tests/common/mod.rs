//! Shared fixtures for reconciliation tests

#![allow(dead_code)]

use topology::{
    FormatSchema, FormatSchemaType, MlModel, MlModelType, NodeGroup, Operation, Resources, Role,
    Shard, ShardGroup, Topology,
};

pub fn micro() -> Resources {
    Resources::new("s2.micro", "network-ssd", 10)
}

pub fn manager_only(name: &str, hosts: u32) -> NodeGroup {
    NodeGroup::new(name, [Role::Manager], hosts)
        .with_resources(micro())
        .with_zones(["zone-a"])
}

pub fn data(name: &str, hosts: u32) -> NodeGroup {
    NodeGroup::new(name, [Role::Data], hosts)
        .with_resources(micro())
        .with_zones(["zone-a", "zone-b"])
}

pub fn mixed(name: &str, hosts: u32) -> NodeGroup {
    NodeGroup::new(name, [Role::Manager, Role::Data], hosts)
        .with_resources(micro())
        .with_zones(["zone-a"])
}

/// A cluster using every entity kind
pub fn full_cluster() -> Topology {
    Topology::new()
        .with_resources(micro())
        .with(manager_only("managers", 3))
        .with(mixed("hot", 3))
        .with(data("warm", 4))
        .with(Shard::new("shard1", 1).with_resources(micro()))
        .with(Shard::new("shard2", 2).with_resources(micro()))
        .with(ShardGroup::new("all", ["shard1", "shard2"]))
        .with(FormatSchema::new(
            "events",
            FormatSchemaType::Protobuf,
            "https://storage/events.proto",
        ))
        .with(MlModel::new("ranker", MlModelType::CatBoost, "https://storage/ranker.bin"))
}

/// Fixture topologies used by the property-style tests
pub fn samples() -> Vec<Topology> {
    vec![
        Topology::new(),
        full_cluster(),
        Topology::new().with(manager_only("m", 1)).with(data("d", 2)),
        Topology::new().with(mixed("a", 3)).with(mixed("b", 3)),
        Topology::new().with(Shard::new("s", 5)),
    ]
}

/// Field mask of an operation as plain strings
pub fn paths_of(op: &Operation) -> Vec<&str> {
    op.field_mask.iter().collect()
}

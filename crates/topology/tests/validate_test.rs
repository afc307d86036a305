mod common;

use std::collections::BTreeMap;

use common::*;
use topology::{plan_update, validate_plan, OperationKind, Resources, Shard, Topology};

fn preset(name: &str) -> Resources {
    Resources::new(name, "network-ssd", 10)
}

#[test]
fn test_shard_override_must_match_cluster_resources() {
    let cluster = preset("s2.micro");

    let conflicting: BTreeMap<_, _> = [("shard1".to_string(), Some(preset("s2.small")))].into();
    let diags = validate_plan(Some(&cluster), &conflicting).unwrap_err();
    let rendered = diags.to_string();
    assert!(rendered.contains("shard/shard1"), "{}", rendered);
    assert!(rendered.contains("s2.micro") && rendered.contains("s2.small"), "{}", rendered);

    let identical: BTreeMap<_, _> = [("shard1".to_string(), Some(preset("s2.micro")))].into();
    assert!(validate_plan(Some(&cluster), &identical).is_ok());

    let absent: BTreeMap<_, _> = [("shard1".to_string(), None)].into();
    assert_eq!(validate_plan(Some(&cluster), &absent).unwrap()["shard1"], Some(cluster));
}

#[test]
fn test_plan_update_from_document() {
    let desired: Topology = serde_json::from_str(
        r#"{
            "resources": {
                "resource_preset_id": "s2.micro",
                "disk_type_id": "network-ssd",
                "disk_size": 10
            },
            "node_groups": [
                {"name": "managers", "roles": ["manager"], "hosts_count": 3},
                {"name": "data", "roles": ["Data"], "hosts_count": 2, "zone_ids": ["zone-a"]}
            ],
            "shards": [{"name": "shard1", "weight": 1}]
        }"#,
    )
    .unwrap();
    let observed = Topology::new().with(Shard::new("shard1", 1).with_resources(micro()));

    let reconciliation = plan_update(&desired, &observed);
    let plan = reconciliation.into_result().unwrap();
    assert_eq!(plan.count(OperationKind::Create), 2);
    assert_eq!(plan.count(OperationKind::Update), 0);
    let first = plan.operations().next().unwrap();
    assert_eq!(first.target.name, "managers");
}

#[test]
fn test_second_manager_only_group_rejected() {
    let desired = Topology::new()
        .with(manager_only("m1", 3))
        .with(manager_only("m2", 3));
    let reconciliation = plan_update(&desired, &Topology::new());
    assert!(!reconciliation.is_ok());
    assert!(reconciliation.plan.is_empty());
}

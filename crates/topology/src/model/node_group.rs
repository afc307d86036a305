//! Node group definitions

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{EntityKind, HasResources, Identity, Resources, Role, RoleSet};
use crate::mask::FieldMask;

pub const HOSTS_COUNT: &str = "hosts_count";
pub const ROLES: &str = "roles";
pub const ZONE_IDS: &str = "zone_ids";
pub const SUBNET_IDS: &str = "subnet_ids";
pub const ASSIGN_PUBLIC_IP: &str = "assign_public_ip";

/// Node group
///
/// A named subset of the cluster's hosts sharing roles, resources and
/// placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeGroup {
    /// Group name (unique within the cluster)
    pub name: String,
    /// Role tags
    pub roles: RoleSet,
    /// Number of hosts
    pub hosts_count: u32,
    /// Host resources
    #[serde(
        default,
        deserialize_with = "super::resources::deserialize_complete",
        skip_serializing_if = "Option::is_none"
    )]
    pub resources: Option<Resources>,
    /// Availability zones, compared as a set
    #[serde(default)]
    pub zone_ids: Vec<String>,
    /// Subnets, compared as a set
    #[serde(default)]
    pub subnet_ids: Vec<String>,
    /// Whether hosts get a public address
    #[serde(default)]
    pub assign_public_ip: bool,
}

impl NodeGroup {
    /// Create a group with the given roles and host count
    pub fn new(
        name: impl Into<String>,
        roles: impl IntoIterator<Item = Role>,
        hosts_count: u32,
    ) -> Self {
        Self {
            name: name.into(),
            roles: roles.into_iter().collect(),
            hosts_count,
            resources: None,
            zone_ids: Vec::new(),
            subnet_ids: Vec::new(),
            assign_public_ip: false,
        }
    }

    pub fn with_resources(mut self, resources: Resources) -> Self {
        self.resources = Some(resources);
        self
    }

    pub fn with_zones<I, S>(mut self, zone_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.zone_ids = zone_ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_subnets<I, S>(mut self, subnet_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subnet_ids = subnet_ids.into_iter().map(Into::into).collect();
        self
    }

    /// Role set is exactly `{MANAGER}`
    pub fn is_manager_only(&self) -> bool {
        self.roles.len() == 1 && self.roles.contains(&Role::Manager)
    }

    pub fn has_manager_role(&self) -> bool {
        self.roles.contains(&Role::Manager)
    }

    /// Carries the manager role next to another role
    pub fn is_mixed_manager(&self) -> bool {
        self.has_manager_role() && !self.is_manager_only()
    }

    /// Paths of the attributes that differ from `observed`
    ///
    /// Zone and subnet ids are compared as sets.
    pub fn changed_fields(&self, observed: &NodeGroup) -> FieldMask {
        let mut mask = FieldMask::new();
        self.diff_resources(observed, &mut mask);
        mask.push_if(self.hosts_count != observed.hosts_count, HOSTS_COUNT);
        mask.push_if(self.roles != observed.roles, ROLES);
        mask.push_if(!same_set(&self.zone_ids, &observed.zone_ids), ZONE_IDS);
        mask.push_if(!same_set(&self.subnet_ids, &observed.subnet_ids), SUBNET_IDS);
        mask.push_if(self.assign_public_ip != observed.assign_public_ip, ASSIGN_PUBLIC_IP);
        mask
    }
}

impl Identity for NodeGroup {
    const KIND: EntityKind = EntityKind::NodeGroup;

    fn name(&self) -> &str {
        &self.name
    }
}

impl HasResources for NodeGroup {
    fn resources(&self) -> Option<&Resources> {
        self.resources.as_ref()
    }
}

/// Order-insensitive comparison of two id lists
pub(crate) fn same_set(a: &[String], b: &[String]) -> bool {
    a.iter().collect::<BTreeSet<_>>() == b.iter().collect::<BTreeSet<_>>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manager_predicates() {
        let managers = NodeGroup::new("m", [Role::Manager], 3);
        assert!(managers.is_manager_only());
        assert!(managers.has_manager_role());
        assert!(!managers.is_mixed_manager());

        let mixed = NodeGroup::new("mixed", [Role::Data, Role::Manager], 3);
        assert!(!mixed.is_manager_only());
        assert!(mixed.is_mixed_manager());

        let data = NodeGroup::new("d", [Role::Data], 3);
        assert!(!data.has_manager_role());
    }

    #[test]
    fn test_zone_order_is_ignored() {
        let observed = NodeGroup::new("d", [Role::Data], 2).with_zones(["a", "b"]);
        let desired = NodeGroup::new("d", [Role::Data], 2).with_zones(["b", "a"]);
        assert!(desired.changed_fields(&observed).is_empty());
    }

    #[test]
    fn test_changed_fields() {
        let observed = NodeGroup::new("d", [Role::Data], 3)
            .with_resources(Resources::new("s2.micro", "network-ssd", 10))
            .with_subnets(["subnet-a"]);
        let mut desired = observed.clone();
        desired.hosts_count = 2;
        desired.resources = Some(Resources::new("s2.micro", "network-ssd", 20));
        desired.assign_public_ip = true;

        let mask = desired.changed_fields(&observed);
        assert_eq!(
            mask.paths(),
            &[
                "resources.disk_size".to_string(),
                HOSTS_COUNT.to_string(),
                ASSIGN_PUBLIC_IP.to_string(),
            ]
        );
    }
}

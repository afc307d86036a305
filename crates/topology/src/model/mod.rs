//! Cluster topology model
//!
//! Node groups, shards, shard groups, format schemas and ML models, plus the
//! snapshot type that holds them.

mod catalog;
mod entity;
mod node_group;
pub(crate) mod resources;
mod role;
mod shard;
mod topology;

pub use catalog::{FormatSchema, FormatSchemaType, MlModel, MlModelType};
pub use entity::{Entity, EntityKind, EntityRef, HasResources, Identity};
pub use node_group::NodeGroup;
pub use resources::{RawResources, Resources};
pub use role::{parse_roles, Role, RoleSet};
pub use shard::{Shard, ShardGroup};
pub use topology::{index_by_name, Topology};

/// Field paths used in update masks
pub mod paths {
    pub use super::catalog::URI;
    pub use super::node_group::{ASSIGN_PUBLIC_IP, HOSTS_COUNT, ROLES, SUBNET_IDS, ZONE_IDS};
    pub use super::resources::{DISK_SIZE, DISK_TYPE_ID, RESOURCE_PRESET_ID};
    pub use super::shard::{DESCRIPTION, SHARD_NAMES, WEIGHT};
}

//! Topology snapshot

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{
    resources::deserialize_complete, Entity, EntityKind, FormatSchema, Identity, MlModel, NodeGroup,
    Resources, Shard, ShardGroup,
};
use crate::error::ModelError;

/// Point-in-time view of a cluster's sub-resources
///
/// Used both for the desired topology (parsed configuration) and the
/// observed one (read from the control plane). Collections are keyed by
/// entity name; documents list them as sequences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    /// Cluster-level resources, applied to every shard without an override
    #[serde(
        default,
        deserialize_with = "deserialize_complete",
        skip_serializing_if = "Option::is_none"
    )]
    pub resources: Option<Resources>,
    #[serde(default, with = "named")]
    pub node_groups: BTreeMap<String, NodeGroup>,
    #[serde(default, with = "named")]
    pub shards: BTreeMap<String, Shard>,
    #[serde(default, with = "named")]
    pub shard_groups: BTreeMap<String, ShardGroup>,
    #[serde(default, with = "named")]
    pub format_schemas: BTreeMap<String, FormatSchema>,
    #[serde(default, with = "named")]
    pub ml_models: BTreeMap<String, MlModel>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resources(mut self, resources: Resources) -> Self {
        self.resources = Some(resources);
        self
    }

    /// Add an entity, replacing any entity of the same kind and name
    pub fn with(mut self, entity: impl Into<Entity>) -> Self {
        self.upsert(entity.into());
        self
    }

    /// Insert or replace an entity
    pub fn upsert(&mut self, entity: Entity) {
        match entity {
            Entity::NodeGroup(e) => {
                self.node_groups.insert(e.name.clone(), e);
            }
            Entity::Shard(e) => {
                self.shards.insert(e.name.clone(), e);
            }
            Entity::ShardGroup(e) => {
                self.shard_groups.insert(e.name.clone(), e);
            }
            Entity::FormatSchema(e) => {
                self.format_schemas.insert(e.name.clone(), e);
            }
            Entity::MlModel(e) => {
                self.ml_models.insert(e.name.clone(), e);
            }
        }
    }

    /// Remove an entity by kind and name, returning whether it existed
    pub fn remove(&mut self, kind: EntityKind, name: &str) -> bool {
        match kind {
            EntityKind::NodeGroup => self.node_groups.remove(name).is_some(),
            EntityKind::Shard => self.shards.remove(name).is_some(),
            EntityKind::ShardGroup => self.shard_groups.remove(name).is_some(),
            EntityKind::FormatSchema => self.format_schemas.remove(name).is_some(),
            EntityKind::MlModel => self.ml_models.remove(name).is_some(),
        }
    }

    /// Look up an entity by kind and name
    pub fn get(&self, kind: EntityKind, name: &str) -> Option<Entity> {
        match kind {
            EntityKind::NodeGroup => self.node_groups.get(name).cloned().map(Entity::from),
            EntityKind::Shard => self.shards.get(name).cloned().map(Entity::from),
            EntityKind::ShardGroup => self.shard_groups.get(name).cloned().map(Entity::from),
            EntityKind::FormatSchema => self.format_schemas.get(name).cloned().map(Entity::from),
            EntityKind::MlModel => self.ml_models.get(name).cloned().map(Entity::from),
        }
    }

    /// Total number of entities across all kinds
    pub fn len(&self) -> usize {
        self.node_groups.len()
            + self.shards.len()
            + self.shard_groups.len()
            + self.format_schemas.len()
            + self.ml_models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Manager-only node groups
    pub fn manager_only_groups(&self) -> impl Iterator<Item = &NodeGroup> {
        self.node_groups.values().filter(|g| g.is_manager_only())
    }

    /// Sum of hosts carrying the manager role
    pub fn manager_hosts(&self) -> u32 {
        self.node_groups
            .values()
            .filter(|g| g.has_manager_role())
            .map(|g| g.hosts_count)
            .sum()
    }
}

/// Index entities by name, rejecting duplicates
pub fn index_by_name<E, I>(items: I) -> Result<BTreeMap<String, E>, ModelError>
where
    E: Identity,
    I: IntoIterator<Item = E>,
{
    let mut map = BTreeMap::new();
    for item in items {
        let name = item.name().to_string();
        if map.contains_key(&name) {
            return Err(ModelError::DuplicateName { kind: E::KIND, name });
        }
        map.insert(name, item);
    }
    Ok(map)
}

/// Serde adapter: name-keyed map <-> sequence of entities
mod named {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    use super::{index_by_name, Identity};

    pub fn serialize<S, E>(map: &BTreeMap<String, E>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        E: Serialize,
    {
        serializer.collect_seq(map.values())
    }

    pub fn deserialize<'de, D, E>(deserializer: D) -> Result<BTreeMap<String, E>, D::Error>
    where
        D: Deserializer<'de>,
        E: Deserialize<'de> + Identity,
    {
        let items = Vec::<E>::deserialize(deserializer)?;
        index_by_name(items).map_err(serde::de::Error::custom)
    }
}

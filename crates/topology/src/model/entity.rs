//! Entity kinds and the closed sum type over them

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::{FormatSchema, MlModel, NodeGroup, Resources, Shard, ShardGroup};
use crate::error::ModelError;
use crate::mask::FieldMask;

/// Kind of a cluster sub-resource
///
/// The declaration order is the dependency order used when creating
/// entities; deletions walk it backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    NodeGroup,
    Shard,
    ShardGroup,
    FormatSchema,
    MlModel,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::NodeGroup,
        EntityKind::Shard,
        EntityKind::ShardGroup,
        EntityKind::FormatSchema,
        EntityKind::MlModel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::NodeGroup => "node_group",
            EntityKind::Shard => "shard",
            EntityKind::ShardGroup => "shard_group",
            EntityKind::FormatSchema => "format_schema",
            EntityKind::MlModel => "ml_model",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ModelError::InvalidEntityRef(s.to_string()))
    }
}

/// Reference to an entity: kind plus identity key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub name: String,
}

impl EntityRef {
    pub fn new(kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// Parses `kind/name`, e.g. `node_group/data-1`
impl FromStr for EntityRef {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, name) = s
            .split_once('/')
            .ok_or_else(|| ModelError::InvalidEntityRef(s.to_string()))?;
        if name.is_empty() {
            return Err(ModelError::InvalidEntityRef(s.to_string()));
        }
        Ok(EntityRef::new(kind.parse()?, name))
    }
}

/// Entity addressed by a unique name
pub trait Identity {
    const KIND: EntityKind;

    fn name(&self) -> &str;

    fn entity_ref(&self) -> EntityRef {
        EntityRef::new(Self::KIND, self.name())
    }
}

/// Entity that may carry its own resource descriptor
pub trait HasResources {
    fn resources(&self) -> Option<&Resources>;

    /// Add the resource paths that differ from `observed` to `mask`
    fn diff_resources(&self, observed: &Self, mask: &mut FieldMask) {
        Resources::diff_into(self.resources(), observed.resources(), mask);
    }
}

/// Any cluster sub-resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    NodeGroup(NodeGroup),
    Shard(Shard),
    ShardGroup(ShardGroup),
    FormatSchema(FormatSchema),
    MlModel(MlModel),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::NodeGroup(_) => EntityKind::NodeGroup,
            Entity::Shard(_) => EntityKind::Shard,
            Entity::ShardGroup(_) => EntityKind::ShardGroup,
            Entity::FormatSchema(_) => EntityKind::FormatSchema,
            Entity::MlModel(_) => EntityKind::MlModel,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Entity::NodeGroup(e) => e.name(),
            Entity::Shard(e) => e.name(),
            Entity::ShardGroup(e) => e.name(),
            Entity::FormatSchema(e) => e.name(),
            Entity::MlModel(e) => e.name(),
        }
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.kind(), self.name())
    }
}

macro_rules! impl_from_entity {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for Entity {
                fn from(e: $variant) -> Self {
                    Entity::$variant(e)
                }
            }
        )*
    };
}

impl_from_entity!(NodeGroup, Shard, ShardGroup, FormatSchema, MlModel);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_ref_parse() {
        let r: EntityRef = "node_group/managers".parse().unwrap();
        assert_eq!(r, EntityRef::new(EntityKind::NodeGroup, "managers"));
        assert_eq!(r.to_string(), "node_group/managers");

        assert!("node_group".parse::<EntityRef>().is_err());
        assert!("cluster/x".parse::<EntityRef>().is_err());
        assert!("shard/".parse::<EntityRef>().is_err());
    }

    #[test]
    fn test_kind_order_is_dependency_order() {
        assert!(EntityKind::NodeGroup < EntityKind::Shard);
        assert!(EntityKind::Shard < EntityKind::ShardGroup);
        assert!(EntityKind::ShardGroup < EntityKind::MlModel);
    }
}

//! Shard and shard group definitions

use serde::{Deserialize, Serialize};

use super::node_group::same_set;
use super::{EntityKind, HasResources, Identity, Resources};
use crate::mask::FieldMask;

pub const WEIGHT: &str = "weight";
pub const DESCRIPTION: &str = "description";
pub const SHARD_NAMES: &str = "shard_names";

/// Shard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shard {
    /// Shard name
    pub name: String,
    /// Relative weight for distributed writes
    pub weight: u32,
    /// Per-shard resources override
    #[serde(
        default,
        deserialize_with = "super::resources::deserialize_complete",
        skip_serializing_if = "Option::is_none"
    )]
    pub resources: Option<Resources>,
}

impl Shard {
    pub fn new(name: impl Into<String>, weight: u32) -> Self {
        Self {
            name: name.into(),
            weight,
            resources: None,
        }
    }

    pub fn with_resources(mut self, resources: Resources) -> Self {
        self.resources = Some(resources);
        self
    }

    pub fn changed_fields(&self, observed: &Shard) -> FieldMask {
        let mut mask = FieldMask::new();
        mask.push_if(self.weight != observed.weight, WEIGHT);
        self.diff_resources(observed, &mut mask);
        mask
    }
}

impl Identity for Shard {
    const KIND: EntityKind = EntityKind::Shard;

    fn name(&self) -> &str {
        &self.name
    }
}

impl HasResources for Shard {
    fn resources(&self) -> Option<&Resources> {
        self.resources.as_ref()
    }
}

/// Named set of shards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardGroup {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Member shards, compared as a set
    pub shard_names: Vec<String>,
}

impl ShardGroup {
    pub fn new<I, S>(name: impl Into<String>, shard_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            description: String::new(),
            shard_names: shard_names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn changed_fields(&self, observed: &ShardGroup) -> FieldMask {
        let mut mask = FieldMask::new();
        mask.push_if(self.description != observed.description, DESCRIPTION);
        mask.push_if(!same_set(&self.shard_names, &observed.shard_names), SHARD_NAMES);
        mask
    }
}

impl Identity for ShardGroup {
    const KIND: EntityKind = EntityKind::ShardGroup;

    fn name(&self) -> &str {
        &self.name
    }
}

//! Format schemas and ML models registered in the cluster

use serde::{Deserialize, Serialize};

use super::{EntityKind, Identity};
use crate::mask::FieldMask;

pub const URI: &str = "uri";

/// Format schema type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatSchemaType {
    Protobuf,
    Capnproto,
}

impl std::fmt::Display for FormatSchemaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatSchemaType::Protobuf => write!(f, "protobuf"),
            FormatSchemaType::Capnproto => write!(f, "capnproto"),
        }
    }
}

/// Format schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub schema_type: FormatSchemaType,
    pub uri: String,
}

impl FormatSchema {
    pub fn new(
        name: impl Into<String>,
        schema_type: FormatSchemaType,
        uri: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            schema_type,
            uri: uri.into(),
        }
    }

    /// Only the uri can change in place
    pub fn changed_fields(&self, observed: &FormatSchema) -> FieldMask {
        let mut mask = FieldMask::new();
        mask.push_if(self.uri != observed.uri, URI);
        mask
    }
}

impl Identity for FormatSchema {
    const KIND: EntityKind = EntityKind::FormatSchema;

    fn name(&self) -> &str {
        &self.name
    }
}

/// ML model type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MlModelType {
    #[serde(rename = "catboost")]
    CatBoost,
}

impl std::fmt::Display for MlModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MlModelType::CatBoost => write!(f, "catboost"),
        }
    }
}

/// ML model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlModel {
    pub name: String,
    #[serde(rename = "type")]
    pub model_type: MlModelType,
    pub uri: String,
}

impl MlModel {
    pub fn new(name: impl Into<String>, model_type: MlModelType, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model_type,
            uri: uri.into(),
        }
    }

    pub fn changed_fields(&self, observed: &MlModel) -> FieldMask {
        let mut mask = FieldMask::new();
        mask.push_if(self.uri != observed.uri, URI);
        mask
    }
}

impl Identity for MlModel {
    const KIND: EntityKind = EntityKind::MlModel;

    fn name(&self) -> &str {
        &self.name
    }
}

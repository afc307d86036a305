//! Compute and disk resources of a host

use serde::{Deserialize, Deserializer, Serialize};

use crate::mask::FieldMask;

/// Field path of the resource preset
pub const RESOURCE_PRESET_ID: &str = "resources.resource_preset_id";
/// Field path of the disk type
pub const DISK_TYPE_ID: &str = "resources.disk_type_id";
/// Field path of the disk size
pub const DISK_SIZE: &str = "resources.disk_size";

/// Resource descriptor
///
/// Preset, disk type and disk size always travel together: a descriptor is
/// either complete or absent (`Option<Resources>` on the owning entity).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resources {
    /// Host class, e.g. `s2.micro`
    pub resource_preset_id: String,
    /// Disk type, e.g. `network-ssd`
    pub disk_type_id: String,
    /// Disk size in bytes
    pub disk_size: u64,
}

impl Resources {
    pub fn new(
        resource_preset_id: impl Into<String>,
        disk_type_id: impl Into<String>,
        disk_size: u64,
    ) -> Self {
        Self {
            resource_preset_id: resource_preset_id.into(),
            disk_type_id: disk_type_id.into(),
            disk_size,
        }
    }

    /// Add the paths of every sub-field that differs from `observed`
    ///
    /// A desired descriptor of `None` means the resources are not managed
    /// and never contributes to the mask.
    pub fn diff_into(
        desired: Option<&Resources>,
        observed: Option<&Resources>,
        mask: &mut FieldMask,
    ) {
        let Some(desired) = desired else {
            return;
        };
        match observed {
            Some(observed) => {
                if desired.resource_preset_id != observed.resource_preset_id {
                    mask.push(RESOURCE_PRESET_ID);
                }
                if desired.disk_type_id != observed.disk_type_id {
                    mask.push(DISK_TYPE_ID);
                }
                if desired.disk_size != observed.disk_size {
                    mask.push(DISK_SIZE);
                }
            }
            None => {
                mask.push(RESOURCE_PRESET_ID);
                mask.push(DISK_TYPE_ID);
                mask.push(DISK_SIZE);
            }
        }
    }
}

impl std::fmt::Display for Resources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{preset: {}, disk_type: {}, disk_size: {}}}",
            self.resource_preset_id, self.disk_type_id, self.disk_size
        )
    }
}

/// Resource descriptor as declared in configuration, before the
/// all-or-nothing rule has been checked
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResources {
    #[serde(default)]
    pub resource_preset_id: Option<String>,
    #[serde(default)]
    pub disk_type_id: Option<String>,
    #[serde(default)]
    pub disk_size: Option<u64>,
}

impl RawResources {
    /// Names of the fields left unset
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.resource_preset_id.is_none() {
            missing.push("resource_preset_id");
        }
        if self.disk_type_id.is_none() {
            missing.push("disk_type_id");
        }
        if self.disk_size.is_none() {
            missing.push("disk_size");
        }
        missing
    }

    /// Convert into a complete descriptor
    ///
    /// Returns `Ok(None)` when nothing is declared and `Err` with the missing
    /// field names when the declaration is partial.
    pub fn into_resources(self) -> Result<Option<Resources>, Vec<&'static str>> {
        let missing = self.missing_fields();
        if missing.len() == 3 {
            return Ok(None);
        }
        if !missing.is_empty() {
            return Err(missing);
        }
        match (self.resource_preset_id, self.disk_type_id, self.disk_size) {
            (Some(preset), Some(disk_type), Some(disk_size)) => {
                Ok(Some(Resources::new(preset, disk_type, disk_size)))
            }
            _ => Err(missing),
        }
    }
}

impl From<Resources> for RawResources {
    fn from(resources: Resources) -> Self {
        Self {
            resource_preset_id: Some(resources.resource_preset_id),
            disk_type_id: Some(resources.disk_type_id),
            disk_size: Some(resources.disk_size),
        }
    }
}

/// Deserialize an optional descriptor, rejecting partial declarations
///
/// Used with `#[serde(default, deserialize_with = "...")]` on every
/// `Option<Resources>` field of the model.
pub fn deserialize_complete<'de, D>(deserializer: D) -> Result<Option<Resources>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawResources>::deserialize(deserializer)?.unwrap_or_default();
    raw.into_resources().map_err(|missing| {
        serde::de::Error::custom(format!(
            "resources must be declared together, missing: {}",
            missing.join(", ")
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_reports_only_changed_sub_fields() {
        let observed = Resources::new("s2.micro", "network-ssd", 10);
        let desired = Resources::new("s2.small", "network-ssd", 10);

        let mut mask = FieldMask::new();
        Resources::diff_into(Some(&desired), Some(&observed), &mut mask);
        assert_eq!(mask.paths(), &[RESOURCE_PRESET_ID.to_string()]);
    }

    #[test]
    fn test_unmanaged_resources_never_in_mask() {
        let observed = Resources::new("s2.micro", "network-ssd", 10);
        let mut mask = FieldMask::new();
        Resources::diff_into(None, Some(&observed), &mut mask);
        assert!(mask.is_empty());
    }

    #[test]
    fn test_newly_declared_resources_report_all_paths() {
        let desired = Resources::new("s2.micro", "network-ssd", 10);
        let mut mask = FieldMask::new();
        Resources::diff_into(Some(&desired), None, &mut mask);
        assert_eq!(mask.len(), 3);
    }

    #[test]
    fn test_raw_resources_all_or_nothing() {
        assert_eq!(RawResources::default().into_resources(), Ok(None));

        let partial = RawResources {
            resource_preset_id: Some("s2.micro".to_string()),
            ..Default::default()
        };
        assert_eq!(
            partial.into_resources(),
            Err(vec!["disk_type_id", "disk_size"])
        );

        let full: RawResources = Resources::new("s2.micro", "network-hdd", 20).into();
        assert_eq!(
            full.into_resources(),
            Ok(Some(Resources::new("s2.micro", "network-hdd", 20)))
        );
    }

    #[derive(Debug, Deserialize)]
    struct Owner {
        #[serde(default, deserialize_with = "deserialize_complete")]
        resources: Option<Resources>,
    }

    #[test]
    fn test_deserialize_rejects_partial_descriptor() {
        let owner: Owner = serde_json::from_str("{}").unwrap();
        assert!(owner.resources.is_none());

        let err = serde_json::from_str::<Owner>(r#"{"resources": {"disk_size": 10}}"#).unwrap_err();
        assert!(err.to_string().contains("resource_preset_id, disk_type_id"));
    }
}

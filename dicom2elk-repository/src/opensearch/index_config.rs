//! OpenSearch index settings for the metadata index.
//!
//! DICOM JSON documents carry one top-level field per tag, so the default
//! field limit of 1000 is raised. Mappings are left dynamic.

use serde_json::{json, Value};

/// Upper bound on the number of mapped fields in the metadata index.
pub const TOTAL_FIELDS_LIMIT: u32 = 10_000;

/// Get the settings used when the metadata index has to be created.
///
/// # Sharding Configuration
///
/// - 1 primary shard
/// - 1 replica for redundancy
pub fn get_index_settings() -> Value {
    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 1,
            "index.mapping.total_fields.limit": TOTAL_FIELDS_LIMIT
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_settings_structure() {
        let settings = get_index_settings();

        assert_eq!(settings["settings"]["number_of_shards"], 1);
        assert_eq!(
            settings["settings"]["index.mapping.total_fields.limit"],
            TOTAL_FIELDS_LIMIT
        );
        assert!(settings.get("mappings").is_none());
    }
}

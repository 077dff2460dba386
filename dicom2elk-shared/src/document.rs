//! Extracted document type.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved key holding the path of the source file.
pub const FILEPATH_KEY: &str = "filepath";

/// Tag key of the SOP Instance UID (0008,0018), used to name output files.
pub const SOP_INSTANCE_UID_TAG: &str = "00080018";

/// Structured key/value extraction result for one source file.
///
/// Keys are DICOM tags in `GGGGEEEE` form (DICOM JSON Model) plus the
/// reserved [`FILEPATH_KEY`]. The backing map is ordered by key, so two
/// documents with the same content always serialize to the same bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    fields: Map<String, Value>,
}

impl Document {
    /// Build a document from extracted fields and stamp it with its source path.
    pub fn new(mut fields: Map<String, Value>, source: &Path) -> Self {
        fields.insert(
            FILEPATH_KEY.to_string(),
            Value::String(source.to_string_lossy().into_owned()),
        );
        Self { fields }
    }

    /// Path of the file this document was extracted from.
    pub fn filepath(&self) -> Option<&str> {
        self.fields.get(FILEPATH_KEY).and_then(Value::as_str)
    }

    /// The first value of the SOP Instance UID element, if present.
    pub fn primary_identifier(&self) -> Option<&str> {
        self.fields
            .get(SOP_INSTANCE_UID_TAG)?
            .get("Value")?
            .get(0)?
            .as_str()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Number of keys, the reserved `filepath` included.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

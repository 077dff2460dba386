//! Extractor module for the dicom2elk pipeline.
//!
//! Reads one DICOM file and turns its data set into a `Document`.

pub mod json_model;

use std::path::{Path, PathBuf};

use dicom_dictionary_std::tags;
use dicom_object::OpenFileOptions;
use thiserror::Error;
use tracing::{debug, instrument};

use dicom2elk_shared::{Document, ExtractOptions};

/// Why a file could not be turned into a document.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// The path does not name a readable regular file.
    #[error("{path}: not a readable file")]
    NotAFile { path: PathBuf },

    /// The file is not DICOM or is malformed.
    #[error("{path}: {message}")]
    Parse { path: PathBuf, message: String },
}

impl ExtractError {
    pub fn path(&self) -> &Path {
        match self {
            Self::NotAFile { path } | Self::Parse { path, .. } => path,
        }
    }
}

/// Turns DICOM files into metadata documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagExtractor {
    options: ExtractOptions,
}

impl TagExtractor {
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> ExtractOptions {
        self.options
    }

    /// Read `path` and build its document.
    ///
    /// Each call makes a single attempt; the caller decides what a failure
    /// means for the run.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn extract(&self, path: &Path) -> Result<Document, ExtractError> {
        if !path.is_file() {
            return Err(ExtractError::NotAFile {
                path: path.to_path_buf(),
            });
        }

        let open = if self.options.stop_before_pixels {
            OpenFileOptions::new()
                .read_until(tags::PIXEL_DATA)
                .open_file(path)
        } else {
            OpenFileOptions::new().open_file(path)
        };

        let object = open.map_err(|e| ExtractError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let fields = json_model::dataset_to_json(&object);
        debug!(elements = fields.len(), "Extracted data set");

        Ok(Document::new(fields, path))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;

    use dicom_core::{DataElement, PrimitiveValue, VR};
    use dicom_dictionary_std::{tags, uids};
    use dicom_object::{FileMetaTableBuilder, InMemDicomObject};

    /// Write a small, well-formed DICOM file with the given SOP Instance UID.
    pub fn write_dicom(path: &Path, sop_instance_uid: &str) {
        let mut obj = InMemDicomObject::new_empty();
        obj.put(DataElement::new(
            tags::SOP_CLASS_UID,
            VR::UI,
            PrimitiveValue::from(uids::SECONDARY_CAPTURE_IMAGE_STORAGE),
        ));
        obj.put(DataElement::new(
            tags::SOP_INSTANCE_UID,
            VR::UI,
            PrimitiveValue::from(sop_instance_uid),
        ));
        obj.put(DataElement::new(
            tags::PATIENT_NAME,
            VR::PN,
            PrimitiveValue::from("Doe^Jane"),
        ));
        obj.put(DataElement::new(tags::MODALITY, VR::CS, PrimitiveValue::from("OT")));
        obj.put(DataElement::new(tags::ROWS, VR::US, PrimitiveValue::from(2_u16)));
        obj.put(DataElement::new(tags::COLUMNS, VR::US, PrimitiveValue::from(2_u16)));
        obj.put(DataElement::new(
            tags::PIXEL_DATA,
            VR::OB,
            PrimitiveValue::from(vec![0_u8, 1, 2, 3]),
        ));

        let file = obj
            .with_meta(
                FileMetaTableBuilder::new()
                    .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
                    .media_storage_sop_class_uid(uids::SECONDARY_CAPTURE_IMAGE_STORAGE)
                    .media_storage_sop_instance_uid(sop_instance_uid),
            )
            .unwrap();
        file.write_to_file(path).unwrap();
    }
}

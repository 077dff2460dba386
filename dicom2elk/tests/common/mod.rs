#![allow(dead_code)]

use std::path::{Path, PathBuf};

use clap::Parser;
use dicom2elk::RunArgs;
use dicom_core::{DataElement, PrimitiveValue, VR};
use dicom_dictionary_std::{tags, uids};
use dicom_object::{FileMetaTableBuilder, InMemDicomObject};

#[derive(Parser)]
struct TestCli {
    #[command(flatten)]
    run: RunArgs,
}

/// Parse run flags the way the binaries do.
pub fn run_args(out: &Path, extra: &[&str]) -> RunArgs {
    let mut argv = vec!["dicom2elk", "-o", out.to_str().unwrap()];
    argv.extend_from_slice(extra);
    TestCli::try_parse_from(argv).unwrap().run
}

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
        PrimitiveValue::from("Roe^Richard"),
    ));
    obj.put(DataElement::new(tags::MODALITY, VR::CS, PrimitiveValue::from("CT")));
    obj.put(DataElement::new(
        tags::PIXEL_DATA,
        VR::OB,
        PrimitiveValue::from(vec![9_u8, 8, 7, 6]),
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

/// Write `paths` as an input list file and return its path.
pub fn write_list(dir: &Path, name: &str, paths: &[PathBuf]) -> PathBuf {
    let list = dir.join(name);
    let body: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    std::fs::write(&list, body.join("\n")).unwrap();
    list
}

/// JSON files in `dir`, sorted.
pub fn json_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().map(|e| e == "json").unwrap_or(false))
        .collect();
    files.sort();
    files
}

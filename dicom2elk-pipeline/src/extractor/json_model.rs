//! Conversion of an in-memory data set into the DICOM JSON Model.
//!
//! Each element becomes `"GGGGEEEE": {"vr": .., "Value": [..]}`, or carries
//! `InlineBinary` for bulk binary VRs. Elements whose value cannot be
//! represented are left out.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use dicom_core::value::{PrimitiveValue, Value as DicomValue};
use dicom_core::{Tag, VR};
use dicom_object::mem::InMemElement;
use dicom_object::InMemDicomObject;
use serde_json::{json, Map, Number, Value};
use tracing::debug;

/// File meta information group, never part of a document.
const META_GROUP: u16 = 0x0002;

/// Eight upper-case hex digits, group then element.
pub fn tag_key(tag: Tag) -> String {
    format!("{:04X}{:04X}", tag.group(), tag.element())
}

/// Convert every representable element of `dataset`.
pub fn dataset_to_json(dataset: &InMemDicomObject) -> Map<String, Value> {
    let mut fields = Map::new();

    for elem in dataset.iter() {
        let tag = elem.header().tag;
        if tag.group() == META_GROUP {
            continue;
        }

        match element_to_json(elem) {
            Some(value) => {
                fields.insert(tag_key(tag), value);
            }
            None => {
                debug!(tag = %tag_key(tag), "Suppressed element with unconvertible value");
            }
        }
    }

    fields
}

enum Converted {
    Values(Vec<Value>),
    InlineBinary(String),
}

fn element_to_json(elem: &InMemElement) -> Option<Value> {
    let vr = elem.header().vr;
    let mut entry = Map::new();
    entry.insert("vr".to_string(), json!(vr.to_string().to_owned()));

    match elem.value() {
        DicomValue::Sequence(sequence) => {
            let items: Vec<Value> = sequence
                .items()
                .iter()
                .map(|item| Value::Object(dataset_to_json(item)))
                .collect();
            if !items.is_empty() {
                entry.insert("Value".to_string(), Value::Array(items));
            }
        }
        // Encapsulated pixel data is only present on full reads.
        DicomValue::PixelSequence(_) => return None,
        DicomValue::Primitive(primitive) => {
            if !is_empty(primitive) {
                match convert_primitive(vr, primitive)? {
                    Converted::Values(values) => {
                        entry.insert("Value".to_string(), Value::Array(values));
                    }
                    Converted::InlineBinary(encoded) => {
                        entry.insert("InlineBinary".to_string(), Value::String(encoded));
                    }
                }
            }
        }
    }

    Some(Value::Object(entry))
}

fn is_empty(primitive: &PrimitiveValue) -> bool {
    matches!(primitive, PrimitiveValue::Empty) || primitive.multiplicity() == 0
}

fn convert_primitive(vr: VR, primitive: &PrimitiveValue) -> Option<Converted> {
    let values = match vr {
        VR::OB | VR::OW | VR::OD | VR::OF | VR::OL | VR::OV | VR::UN => {
            return Some(Converted::InlineBinary(STANDARD.encode(primitive.to_bytes())));
        }
        VR::PN => primitive
            .to_multi_str()
            .iter()
            .map(|name| person_name(name))
            .collect(),
        VR::IS | VR::SS | VR::US | VR::SL | VR::UL | VR::SV => primitive
            .to_multi_int::<i64>()
            .ok()?
            .into_iter()
            .map(Value::from)
            .collect(),
        VR::UV => primitive
            .to_multi_int::<u64>()
            .ok()?
            .into_iter()
            .map(Value::from)
            .collect(),
        VR::DS | VR::FL | VR::FD => primitive
            .to_multi_float64()
            .ok()?
            .into_iter()
            .map(|v| Number::from_f64(v).map(Value::Number))
            .collect::<Option<Vec<_>>>()?,
        VR::AT => match primitive {
            PrimitiveValue::Tags(tags) => tags.iter().map(|t| json!(tag_key(*t))).collect(),
            _ => return None,
        },
        _ => primitive
            .to_multi_str()
            .iter()
            .map(|s| text_value(s))
            .collect(),
    };

    Some(Converted::Values(values))
}

fn text_value(raw: &str) -> Value {
    let trimmed = raw.trim_end_matches([' ', '\0']);
    if trimmed.is_empty() {
        Value::Null
    } else {
        Value::String(trimmed.to_string())
    }
}

/// `Family^Given=Ideographic=Phonetic` into its component groups.
fn person_name(raw: &str) -> Value {
    let trimmed = raw.trim_end_matches([' ', '\0']);
    if trimmed.is_empty() {
        return Value::Null;
    }

    let mut name = Map::new();
    for (group, label) in trimmed
        .split('=')
        .zip(["Alphabetic", "Ideographic", "Phonetic"])
    {
        if !group.is_empty() {
            name.insert(label.to_string(), Value::String(group.to_string()));
        }
    }
    Value::Object(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicom_core::{DataElement, PrimitiveValue};
    use dicom_dictionary_std::tags;

    fn element(tag: Tag, vr: VR, value: PrimitiveValue) -> InMemElement {
        DataElement::new(tag, vr, value)
    }

    #[test]
    fn test_tag_key() {
        assert_eq!(tag_key(tags::SOP_INSTANCE_UID), "00080018");
        assert_eq!(tag_key(tags::PIXEL_DATA), "7FE00010");
    }

    #[test]
    fn test_text_and_name_values() {
        let mut obj = InMemDicomObject::new_empty();
        obj.put(element(tags::MODALITY, VR::CS, PrimitiveValue::from("MR")));
        obj.put(element(tags::PATIENT_NAME, VR::PN, PrimitiveValue::from("Doe^Jane")));

        let fields = dataset_to_json(&obj);

        assert_eq!(fields["00080060"], json!({"vr": "CS", "Value": ["MR"]}));
        assert_eq!(
            fields["00100010"],
            json!({"vr": "PN", "Value": [{"Alphabetic": "Doe^Jane"}]})
        );
    }

    #[test]
    fn test_numeric_values() {
        let mut obj = InMemDicomObject::new_empty();
        obj.put(element(tags::ROWS, VR::US, PrimitiveValue::from(512_u16)));
        obj.put(element(tags::SERIES_NUMBER, VR::IS, PrimitiveValue::from("7")));
        obj.put(element(tags::SLICE_THICKNESS, VR::DS, PrimitiveValue::from("1.5")));

        let fields = dataset_to_json(&obj);

        assert_eq!(fields["00280010"], json!({"vr": "US", "Value": [512]}));
        assert_eq!(fields["00200011"], json!({"vr": "IS", "Value": [7]}));
        assert_eq!(fields["00180050"], json!({"vr": "DS", "Value": [1.5]}));
    }

    #[test]
    fn test_empty_element_keeps_only_vr() {
        let mut obj = InMemDicomObject::new_empty();
        obj.put(element(tags::ACCESSION_NUMBER, VR::SH, PrimitiveValue::Empty));

        let fields = dataset_to_json(&obj);
        assert_eq!(fields["00080050"], json!({"vr": "SH"}));
    }

    #[test]
    fn test_unconvertible_element_is_suppressed() {
        let mut obj = InMemDicomObject::new_empty();
        obj.put(element(tags::SERIES_NUMBER, VR::IS, PrimitiveValue::from("not-a-number")));
        obj.put(element(tags::MODALITY, VR::CS, PrimitiveValue::from("CT")));

        let fields = dataset_to_json(&obj);
        assert!(!fields.contains_key("00200011"));
        assert!(fields.contains_key("00080060"));
    }

    #[test]
    fn test_binary_is_inline_base64() {
        let mut obj = InMemDicomObject::new_empty();
        obj.put(element(
            Tag(0x0009, 0x1001),
            VR::OB,
            PrimitiveValue::from(vec![1_u8, 2, 3]),
        ));

        let fields = dataset_to_json(&obj);
        assert_eq!(fields["00091001"], json!({"vr": "OB", "InlineBinary": "AQID"}));
    }

    #[test]
    fn test_person_name_groups() {
        assert_eq!(
            person_name("Yamada^Tarou=山田^太郎"),
            json!({"Alphabetic": "Yamada^Tarou", "Ideographic": "山田^太郎"})
        );
        assert_eq!(person_name("  "), Value::Null);
    }
}

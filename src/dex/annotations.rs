//! DEX annotations-related structures
//!
//! Read-only decoding of the binary structures from the DEX spec:
//! - annotations_directory_item
//! - annotation_set_item
//! - annotation_item (wraps EncodedAnnotation)

use crate::dex::encoded_values::EncodedAnnotation;
use crate::error::FormatError;
use crate::reader::BinaryReader;

/// annotation_item
/// https://source.android.com/docs/core/runtime/dex-format#annotation-item
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationItem {
    /// Visibility: 0x00 = build, 0x01 = runtime, 0x02 = system
    pub visibility: u8,
    /// The encoded annotation payload
    pub annotation: EncodedAnnotation,
}

impl AnnotationItem {
    pub fn read(reader: &mut BinaryReader<'_>) -> Result<AnnotationItem, FormatError> {
        let visibility = reader.read_u8()?;
        if visibility > 2 {
            fail!(at reader.position() - 1, "bad annotation visibility 0x{:02x}", visibility);
        }
        let annotation = EncodedAnnotation::read(reader)?;
        Ok(AnnotationItem {
            visibility,
            annotation,
        })
    }
}

/// annotation_set_item
/// A list of offsets to `annotation_item`s
/// https://source.android.com/docs/core/runtime/dex-format#annotation-set-item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationSetItem {
    /// Offsets (from start of the file) to `annotation_item`s
    pub entries: Vec<u32>,
}

impl AnnotationSetItem {
    pub fn read(reader: &mut BinaryReader<'_>) -> Result<AnnotationSetItem, FormatError> {
        let size = reader.read_u32()? as usize;
        let mut entries = Vec::with_capacity(size.min(reader.remaining() / 4));
        for _ in 0..size {
            entries.push(reader.read_u32()?);
        }
        Ok(AnnotationSetItem { entries })
    }
}

/// field_annotations_item, method_annotations_item and parameter_annotations_item
/// share one layout: a member index and an offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberAnnotations {
    /// index into field_ids or method_ids
    pub member_idx: u32,
    /// offset to an `annotation_set_item` (or an `annotation_set_ref_list` for parameters)
    pub annotations_off: u32,
}

impl MemberAnnotations {
    pub fn read(reader: &mut BinaryReader<'_>) -> Result<MemberAnnotations, FormatError> {
        Ok(MemberAnnotations {
            member_idx: reader.read_u32()?,
            annotations_off: reader.read_u32()?,
        })
    }
}

fn read_members(reader: &mut BinaryReader<'_>, count: usize) -> Result<Vec<MemberAnnotations>, FormatError> {
    let mut members = Vec::with_capacity(count.min(reader.remaining() / 8));
    for _ in 0..count {
        members.push(MemberAnnotations::read(reader)?);
    }
    Ok(members)
}

/// annotations_directory_item
/// https://source.android.com/docs/core/runtime/dex-format#annotations-directory-item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationsDirectoryItem {
    /// Offset to the class `annotation_set_item` (or 0 if none)
    pub class_annotations_off: u32,
    pub field_annotations: Vec<MemberAnnotations>,
    pub method_annotations: Vec<MemberAnnotations>,
    pub parameter_annotations: Vec<MemberAnnotations>,
}

impl AnnotationsDirectoryItem {
    pub fn read(reader: &mut BinaryReader<'_>) -> Result<AnnotationsDirectoryItem, FormatError> {
        let class_annotations_off = reader.read_u32()?;
        let fields_size = reader.read_u32()? as usize;
        let annotated_methods_size = reader.read_u32()? as usize;
        let annotated_parameters_size = reader.read_u32()? as usize;

        Ok(AnnotationsDirectoryItem {
            class_annotations_off,
            field_annotations: read_members(reader, fields_size)?,
            method_annotations: read_members(reader, annotated_methods_size)?,
            parameter_annotations: read_members(reader, annotated_parameters_size)?,
        })
    }

    /// The annotation set offset recorded for a method, if any.
    pub fn method_annotations_off(&self, method_idx: u32) -> Option<u32> {
        self.method_annotations
            .iter()
            .find(|m| m.member_idx == method_idx)
            .map(|m| m.annotations_off)
    }
}

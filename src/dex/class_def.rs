/* Class definitions, class data and their resolution into named records */

use bitflags::bitflags;
use log::debug;

use crate::dex::annotations::{AnnotationItem, AnnotationSetItem, AnnotationsDirectoryItem};
use crate::dex::dex_file::{DexFile, NO_INDEX};
use crate::dex::java_name;
use crate::error::{FormatError, ResultExt};
use crate::reader::BinaryReader;

bitflags! {
    /// access_flags of classes, fields and methods.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u32 {
        const PUBLIC = 0x1;
        const PRIVATE = 0x2;
        const PROTECTED = 0x4;
        const STATIC = 0x8;
        const FINAL = 0x10;
        const SYNCHRONIZED = 0x20;
        const VOLATILE = 0x40;
        const BRIDGE = 0x40;
        const TRANSIENT = 0x80;
        const VARARGS = 0x80;
        const NATIVE = 0x100;
        const INTERFACE = 0x200;
        const ABSTRACT = 0x400;
        const STRICT = 0x800;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const CONSTRUCTOR = 0x10000;
        const DECLARED_SYNCHRONIZED = 0x20000;
    }
}

/// A class_def_item, indices unresolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDefItem
{
    pub class_idx: u32,
    pub access_flags: AccessFlags,
    pub superclass_idx: Option<u32>,
    pub interfaces_off: u32,
    pub source_file_idx: Option<u32>,
    pub annotations_off: u32,
    pub class_data_off: u32,
    pub static_values_off: u32,
}

fn optional_index(idx: u32) -> Option<u32>
{
    if idx == NO_INDEX { None } else { Some(idx) }
}

impl ClassDefItem
{
    pub fn read(reader: &mut BinaryReader<'_>) -> Result<ClassDefItem, FormatError>
    {
        Ok(ClassDefItem {
            class_idx: reader.read_u32()?,
            access_flags: AccessFlags::from_bits_retain(reader.read_u32()?),
            superclass_idx: optional_index(reader.read_u32()?),
            interfaces_off: reader.read_u32()?,
            source_file_idx: optional_index(reader.read_u32()?),
            annotations_off: reader.read_u32()?,
            class_data_off: reader.read_u32()?,
            static_values_off: reader.read_u32()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedField
{
    pub field_idx: u32,
    pub access_flags: AccessFlags,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedMethod
{
    pub method_idx: u32,
    pub access_flags: AccessFlags,
    pub code_off: u32,
}

/// A class_data_item. Member indices are stored absolute, the deltas already summed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassDataItem
{
    pub static_fields: Vec<EncodedField>,
    pub instance_fields: Vec<EncodedField>,
    pub direct_methods: Vec<EncodedMethod>,
    pub virtual_methods: Vec<EncodedMethod>,
}

/// Sum the next index delta onto `previous`. Each list starts again from zero.
fn next_index(reader: &mut BinaryReader<'_>, previous: Option<u32>) -> Result<u32, FormatError>
{
    let offset = reader.position();
    let diff = reader.read_uleb128()?;
    match previous
    {
        None => Ok(diff),
        Some(_) if diff == 0 => fail!(at offset, "repeated member index in class_data"),
        Some(prev) => match prev.checked_add(diff)
        {
            Some(idx) => Ok(idx),
            None => fail!(at offset, "member index overflows in class_data"),
        },
    }
}

fn read_encoded_fields(reader: &mut BinaryReader<'_>, count: u32) -> Result<Vec<EncodedField>, FormatError>
{
    let mut fields = Vec::with_capacity((count as usize).min(reader.remaining()));
    let mut previous = None;
    for _ in 0..count
    {
        let field_idx = next_index(reader, previous)?;
        let access_flags = AccessFlags::from_bits_retain(reader.read_uleb128()?);
        fields.push(EncodedField { field_idx, access_flags });
        previous = Some(field_idx);
    }
    Ok(fields)
}

fn read_encoded_methods(reader: &mut BinaryReader<'_>, count: u32) -> Result<Vec<EncodedMethod>, FormatError>
{
    let mut methods = Vec::with_capacity((count as usize).min(reader.remaining()));
    let mut previous = None;
    for _ in 0..count
    {
        let method_idx = next_index(reader, previous)?;
        let access_flags = AccessFlags::from_bits_retain(reader.read_uleb128()?);
        let code_off = reader.read_uleb128()?;
        methods.push(EncodedMethod { method_idx, access_flags, code_off });
        previous = Some(method_idx);
    }
    Ok(methods)
}

impl ClassDataItem
{
    pub fn read(reader: &mut BinaryReader<'_>) -> Result<ClassDataItem, FormatError>
    {
        let static_fields_size = reader.read_uleb128()?;
        let instance_fields_size = reader.read_uleb128()?;
        let direct_methods_size = reader.read_uleb128()?;
        let virtual_methods_size = reader.read_uleb128()?;

        Ok(ClassDataItem {
            static_fields: read_encoded_fields(reader, static_fields_size).context(|| "static_fields")?,
            instance_fields: read_encoded_fields(reader, instance_fields_size).context(|| "instance_fields")?,
            direct_methods: read_encoded_methods(reader, direct_methods_size).context(|| "direct_methods")?,
            virtual_methods: read_encoded_methods(reader, virtual_methods_size).context(|| "virtual_methods")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind
{
    /// Static, private or constructor.
    Direct,
    Virtual,
}

/// A method with its name, shorty and annotations resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DexMethod
{
    pub method_idx: u32,
    pub name: String,
    pub shorty: String,
    pub access_flags: AccessFlags,
    pub code_off: u32,
    pub kind: MethodKind,
    /// Annotation type descriptors.
    pub annotations: Vec<String>,
}

impl DexMethod
{
    pub fn is_constructor(&self) -> bool
    {
        self.name == "<init>" || self.name == "<clinit>"
    }

    pub fn has_annotation(&self, descriptor: &str) -> bool
    {
        self.annotations.iter().any(|a| a == descriptor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DexField
{
    pub field_idx: u32,
    pub name: String,
    pub access_flags: AccessFlags,
}

/// A class definition with every name it refers to resolved.
///
/// Superclass and interfaces are kept as descriptors; nothing here links one
/// class to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DexClass
{
    pub descriptor: String,
    pub access_flags: AccessFlags,
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub source_file: Option<String>,
    /// Class-level annotation type descriptors.
    pub annotations: Vec<String>,
    pub fields: Vec<DexField>,
    /// Direct methods followed by virtual methods, each in method index order.
    pub methods: Vec<DexMethod>,
}

impl DexClass
{
    /// Dotted name, e.g. `com.example.FooTest`.
    pub fn java_name(&self) -> String
    {
        java_name(&self.descriptor)
    }

    /// Dotted package, empty for the default package.
    pub fn package_name(&self) -> String
    {
        let name = self.java_name();
        match name.rfind('.')
        {
            Some(ix) => name[..ix].to_string(),
            None => String::new(),
        }
    }

    pub fn has_annotation(&self, descriptor: &str) -> bool
    {
        self.annotations.iter().any(|a| a == descriptor)
    }

    pub fn is_abstract(&self) -> bool
    {
        self.access_flags.intersects(AccessFlags::ABSTRACT | AccessFlags::INTERFACE)
    }
}

impl<'a> DexFile<'a>
{
    /// Type descriptors of the annotations in the annotation_set_item at `offset`.
    fn annotation_types(&self, offset: u32) -> Result<Vec<String>, FormatError>
    {
        if offset == 0
        {
            return Ok(Vec::new());
        }
        let set = AnnotationSetItem::read(&mut self.reader_at(offset)?)?;
        let mut types = Vec::with_capacity(set.entries.len());
        for (i, entry) in set.entries.iter().enumerate()
        {
            let item = AnnotationItem::read(&mut self.reader_at(*entry)?).context(|| format!("annotation #{}", i))?;
            types.push(self.type_descriptor(item.annotation.type_idx)?.to_string());
        }
        Ok(types)
    }

    fn resolve_methods(
        &self,
        encoded: &[EncodedMethod],
        kind: MethodKind,
        directory: Option<&AnnotationsDirectoryItem>,
        out: &mut Vec<DexMethod>,
    ) -> Result<(), FormatError>
    {
        for method in encoded
        {
            let annotations = match directory.and_then(|dir| dir.method_annotations_off(method.method_idx))
            {
                Some(off) => self.annotation_types(off).context(|| format!("annotations of method #{}", method.method_idx))?,
                None => Vec::new(),
            };
            out.push(DexMethod {
                method_idx: method.method_idx,
                name: self.method_name(method.method_idx)?.to_string(),
                shorty: self.method_shorty(method.method_idx)?.to_string(),
                access_flags: method.access_flags,
                code_off: method.code_off,
                kind,
                annotations,
            });
        }
        Ok(())
    }

    /// Resolve one class_def into a [`DexClass`].
    pub fn class(&self, def: &ClassDefItem) -> Result<DexClass, FormatError>
    {
        let descriptor = self.type_descriptor(def.class_idx)?.to_string();
        let superclass = match def.superclass_idx
        {
            Some(idx) => Some(self.type_descriptor(idx).context(|| "superclass")?.to_string()),
            None => None,
        };
        let mut interfaces = Vec::new();
        for type_idx in self.type_list(def.interfaces_off).context(|| "interfaces")?
        {
            interfaces.push(self.type_descriptor(type_idx).context(|| "interfaces")?.to_string());
        }
        let source_file = match def.source_file_idx
        {
            Some(idx) => Some(self.string(idx).context(|| "source_file")?.to_string()),
            None => None,
        };

        let directory = if def.annotations_off != 0
        {
            let mut reader = self.reader_at(def.annotations_off).context(|| "annotations_directory")?;
            Some(AnnotationsDirectoryItem::read(&mut reader).context(|| "annotations_directory")?)
        }
        else
        {
            None
        };
        let annotations = match &directory
        {
            Some(dir) => self.annotation_types(dir.class_annotations_off).context(|| "class annotations")?,
            None => Vec::new(),
        };

        let class_data = if def.class_data_off != 0
        {
            let mut reader = self.reader_at(def.class_data_off).context(|| "class_data")?;
            ClassDataItem::read(&mut reader).context(|| "class_data")?
        }
        else
        {
            ClassDataItem::default()
        };

        let mut fields = Vec::with_capacity(class_data.static_fields.len() + class_data.instance_fields.len());
        for field in class_data.static_fields.iter().chain(class_data.instance_fields.iter())
        {
            fields.push(DexField {
                field_idx: field.field_idx,
                name: self.field_name(field.field_idx)?.to_string(),
                access_flags: field.access_flags,
            });
        }

        let mut methods = Vec::with_capacity(class_data.direct_methods.len() + class_data.virtual_methods.len());
        self.resolve_methods(&class_data.direct_methods, MethodKind::Direct, directory.as_ref(), &mut methods)?;
        self.resolve_methods(&class_data.virtual_methods, MethodKind::Virtual, directory.as_ref(), &mut methods)?;

        Ok(DexClass {
            descriptor,
            access_flags: def.access_flags,
            superclass,
            interfaces,
            source_file,
            annotations,
            fields,
            methods,
        })
    }

    /// Every class in class_def order.
    pub fn classes(&self) -> Result<Vec<DexClass>, FormatError>
    {
        let mut classes = Vec::with_capacity(self.class_defs.len());
        for (i, def) in self.class_defs.iter().enumerate()
        {
            classes.push(self.class(def).context(|| format!("class_def #{}", i))?);
        }
        debug!("[classes] resolved {} classes", classes.len());
        Ok(classes)
    }
}

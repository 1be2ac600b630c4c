/* Dex file format structures: header and constant pools */

use cesu8::from_java_cesu8;
use log::{debug, warn};

use crate::dex::class_def::ClassDefItem;
use crate::error::{FormatError, ResultExt};
use crate::reader::BinaryReader;

/* Constants */
pub const DEX_MAGIC_PREFIX: [u8; 4] = [ 0x64, 0x65, 0x78, 0x0a ];
pub const SUPPORTED_VERSIONS: [&[u8; 3]; 6] = [ b"035", b"037", b"038", b"039", b"040", b"041" ];
pub const ENDIAN_CONSTANT: u32 = 0x12345678;
pub const REVERSE_ENDIAN_CONSTANT: u32 = 0x78563412;
pub const NO_INDEX: u32 = 0xffffffff;
pub const HEADER_SIZE: usize = 0x70;

const STRING_ID_SIZE: usize = 4;
const TYPE_ID_SIZE: usize = 4;
const PROTO_ID_SIZE: usize = 12;
const FIELD_ID_SIZE: usize = 8;
const METHOD_ID_SIZE: usize = 8;
pub(crate) const CLASS_DEF_SIZE: usize = 32;

/// The fixed dex header. Every `*_off` field is an absolute offset into the blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header
{
    pub version: [u8; 3],
    pub checksum: u32,
    pub signature: [u8; 20],
    pub file_size: u32,
    pub header_size: u32,
    pub endian_tag: u32,
    pub link_size: u32,
    pub link_off: u32,
    pub map_off: u32,
    pub string_ids_size: u32,
    pub string_ids_off: u32,
    pub type_ids_size: u32,
    pub type_ids_off: u32,
    pub proto_ids_size: u32,
    pub proto_ids_off: u32,
    pub field_ids_size: u32,
    pub field_ids_off: u32,
    pub method_ids_size: u32,
    pub method_ids_off: u32,
    pub class_defs_size: u32,
    pub class_defs_off: u32,
    pub data_size: u32,
    pub data_off: u32,
}

impl Header
{
    pub fn read(reader: &mut BinaryReader<'_>) -> Result<Header, FormatError>
    {
        if reader.len() < HEADER_SIZE
        {
            fail!(at 0, "dex blob of {} bytes is shorter than its header", reader.len());
        }

        let magic = reader.read_bytes(8)?;
        if magic[0..4] != DEX_MAGIC_PREFIX || magic[7] != 0
        {
            fail!(at 0, "bad dex magic {:02x?}", magic);
        }
        let version = [magic[4], magic[5], magic[6]];
        if !SUPPORTED_VERSIONS.iter().any(|v| **v == version)
        {
            fail!(at 4, "unsupported dex version {:?}", String::from_utf8_lossy(&version));
        }

        let checksum = reader.read_u32()?;
        let mut signature = [0u8; 20];
        signature.copy_from_slice(reader.read_bytes(20)?);
        let file_size = reader.read_u32()?;
        let header_size = reader.read_u32()?;
        let endian_tag = reader.read_u32()?;
        match endian_tag
        {
            ENDIAN_CONSTANT => {}
            REVERSE_ENDIAN_CONSTANT => fail!(at 0x28, "big-endian dex files are not supported"),
            _ => fail!(at 0x28, "bad endian tag 0x{:08x}", endian_tag),
        }
        if header_size as usize != HEADER_SIZE
        {
            warn!("[header] unexpected header_size 0x{:x}", header_size);
        }
        if file_size as usize != reader.len()
        {
            debug!("[header] file_size {} differs from blob length {}", file_size, reader.len());
        }

        Ok(Header {
            version,
            checksum,
            signature,
            file_size,
            header_size,
            endian_tag,
            link_size: reader.read_u32()?,
            link_off: reader.read_u32()?,
            map_off: reader.read_u32()?,
            string_ids_size: reader.read_u32()?,
            string_ids_off: reader.read_u32()?,
            type_ids_size: reader.read_u32()?,
            type_ids_off: reader.read_u32()?,
            proto_ids_size: reader.read_u32()?,
            proto_ids_off: reader.read_u32()?,
            field_ids_size: reader.read_u32()?,
            field_ids_off: reader.read_u32()?,
            method_ids_size: reader.read_u32()?,
            method_ids_off: reader.read_u32()?,
            class_defs_size: reader.read_u32()?,
            class_defs_off: reader.read_u32()?,
            data_size: reader.read_u32()?,
            data_off: reader.read_u32()?,
        })
    }

    /// The version digits, e.g. `"035"`.
    pub fn version_str(&self) -> String
    {
        String::from_utf8_lossy(&self.version).into_owned()
    }
}

/// A string_data_item. Strings that are not valid modified UTF-8 are kept raw
/// and only become an error if something resolves them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DexString
{
    Decoded(String),
    Raw(u32, Vec<u8>),
}

impl DexString
{
    pub fn read(reader: &mut BinaryReader<'_>) -> Result<DexString, FormatError>
    {
        let utf16_size = reader.read_uleb128()?;
        let bytes = reader.read_until_nul()?;
        match from_java_cesu8(bytes)
        {
            Ok(s) => Ok(DexString::Decoded(s.into_owned())),
            Err(_) => Ok(DexString::Raw(utf16_size, bytes.to_vec())),
        }
    }

    pub fn as_str(&self) -> Option<&str>
    {
        match self
        {
            DexString::Decoded(s) => Some(s),
            DexString::Raw(_, _) => None,
        }
    }
}

/// A proto_id_item. The parameter list stays an offset until asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrototypeItem
{
    pub shorty_idx: u32,
    pub return_type_idx: u32,
    pub parameters_off: u32,
}

impl PrototypeItem
{
    pub fn read(reader: &mut BinaryReader<'_>) -> Result<PrototypeItem, FormatError>
    {
        Ok(PrototypeItem {
            shorty_idx: reader.read_u32()?,
            return_type_idx: reader.read_u32()?,
            parameters_off: reader.read_u32()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldItem
{
    pub class_idx: u16,
    pub type_idx: u16,
    pub name_idx: u32,
}

impl FieldItem
{
    pub fn read(reader: &mut BinaryReader<'_>) -> Result<FieldItem, FormatError>
    {
        Ok(FieldItem {
            class_idx: reader.read_u16()?,
            type_idx: reader.read_u16()?,
            name_idx: reader.read_u32()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodItem
{
    pub class_idx: u16,
    pub proto_idx: u16,
    pub name_idx: u32,
}

impl MethodItem
{
    pub fn read(reader: &mut BinaryReader<'_>) -> Result<MethodItem, FormatError>
    {
        Ok(MethodItem {
            class_idx: reader.read_u16()?,
            proto_idx: reader.read_u16()?,
            name_idx: reader.read_u32()?,
        })
    }
}

/// Read `count` fixed-stride records starting at `offset`.
fn read_table<'a, T>(
    data: &'a [u8],
    offset: u32,
    count: u32,
    stride: usize,
    what: &str,
    read: impl Fn(&mut BinaryReader<'a>) -> Result<T, FormatError>,
) -> Result<Vec<T>, FormatError>
{
    if count == 0
    {
        return Ok(Vec::new());
    }
    let end = (count as usize)
        .checked_mul(stride)
        .and_then(|len| len.checked_add(offset as usize));
    match end
    {
        Some(end) if end <= data.len() => {}
        _ => fail!(at offset as usize, "{} table of {} entries runs past end of data", what, count),
    }

    let mut reader = BinaryReader::at(data, offset as usize)?;
    let mut items = Vec::with_capacity(count as usize);
    for i in 0..count
    {
        items.push(read(&mut reader).context(|| format!("{} #{}", what, i))?);
    }
    Ok(items)
}

/// A decoded dex blob: header plus constant pools.
///
/// Pool entries hold raw indices. Cross references are resolved on demand by
/// the accessor methods, so an out-of-range index is reported where it is used.
#[derive(Debug)]
pub struct DexFile<'a>
{
    data: &'a [u8],
    pub header: Header,
    pub strings: Vec<DexString>,
    pub types: Vec<u32>,
    pub prototypes: Vec<PrototypeItem>,
    pub fields: Vec<FieldItem>,
    pub methods: Vec<MethodItem>,
    pub class_defs: Vec<ClassDefItem>,
}

impl<'a> DexFile<'a>
{
    pub fn parse(data: &'a [u8]) -> Result<DexFile<'a>, FormatError>
    {
        let mut reader = BinaryReader::new(data);
        let header = Header::read(&mut reader).context(|| "header")?;

        let string_offsets = read_table(data, header.string_ids_off, header.string_ids_size, STRING_ID_SIZE, "string_id", |r| r.read_u32())?;
        let mut strings = Vec::with_capacity(string_offsets.len());
        for (i, offset) in string_offsets.iter().enumerate()
        {
            let mut r = BinaryReader::at(data, *offset as usize).context(|| format!("string_data of string_id #{}", i))?;
            strings.push(DexString::read(&mut r).context(|| format!("string_data of string_id #{}", i))?);
        }

        let types = read_table(data, header.type_ids_off, header.type_ids_size, TYPE_ID_SIZE, "type_id", |r| r.read_u32())?;
        let prototypes = read_table(data, header.proto_ids_off, header.proto_ids_size, PROTO_ID_SIZE, "proto_id", PrototypeItem::read)?;
        let fields = read_table(data, header.field_ids_off, header.field_ids_size, FIELD_ID_SIZE, "field_id", FieldItem::read)?;
        let methods = read_table(data, header.method_ids_off, header.method_ids_size, METHOD_ID_SIZE, "method_id", MethodItem::read)?;
        let class_defs = read_table(data, header.class_defs_off, header.class_defs_size, CLASS_DEF_SIZE, "class_def", ClassDefItem::read)?;

        debug!(
            "[dex] version {} with {} strings, {} types, {} protos, {} fields, {} methods, {} classes",
            header.version_str(), strings.len(), types.len(), prototypes.len(), fields.len(), methods.len(), class_defs.len()
        );

        Ok(DexFile { data, header, strings, types, prototypes, fields, methods, class_defs })
    }

    pub fn data(&self) -> &'a [u8]
    {
        self.data
    }

    /// A reader over the blob positioned at `offset`.
    pub fn reader_at(&self, offset: u32) -> Result<BinaryReader<'a>, FormatError>
    {
        BinaryReader::at(self.data, offset as usize)
    }

    pub fn string(&self, idx: u32) -> Result<&str, FormatError>
    {
        match self.strings.get(idx as usize)
        {
            Some(DexString::Decoded(s)) => Ok(s),
            Some(DexString::Raw(_, _)) => fail!("string #{} is not valid modified UTF-8", idx),
            None => fail!("string index {} out of range (pool holds {})", idx, self.strings.len()),
        }
    }

    /// The descriptor of a type, e.g. `Ljava/lang/Object;`.
    pub fn type_descriptor(&self, type_idx: u32) -> Result<&str, FormatError>
    {
        match self.types.get(type_idx as usize)
        {
            Some(string_idx) => self.string(*string_idx).context(|| format!("type #{}", type_idx)),
            None => fail!("type index {} out of range (pool holds {})", type_idx, self.types.len()),
        }
    }

    pub fn proto(&self, proto_idx: u32) -> Result<&PrototypeItem, FormatError>
    {
        match self.prototypes.get(proto_idx as usize)
        {
            Some(proto) => Ok(proto),
            None => fail!("proto index {} out of range (pool holds {})", proto_idx, self.prototypes.len()),
        }
    }

    pub fn field(&self, field_idx: u32) -> Result<&FieldItem, FormatError>
    {
        match self.fields.get(field_idx as usize)
        {
            Some(field) => Ok(field),
            None => fail!("field index {} out of range (pool holds {})", field_idx, self.fields.len()),
        }
    }

    pub fn method(&self, method_idx: u32) -> Result<&MethodItem, FormatError>
    {
        match self.methods.get(method_idx as usize)
        {
            Some(method) => Ok(method),
            None => fail!("method index {} out of range (pool holds {})", method_idx, self.methods.len()),
        }
    }

    pub fn field_name(&self, field_idx: u32) -> Result<&str, FormatError>
    {
        let field = self.field(field_idx)?;
        self.string(field.name_idx).context(|| format!("field #{}", field_idx))
    }

    pub fn method_name(&self, method_idx: u32) -> Result<&str, FormatError>
    {
        let method = self.method(method_idx)?;
        self.string(method.name_idx).context(|| format!("method #{}", method_idx))
    }

    /// The shorty of a method's prototype, e.g. `VL` for `void m(Object)`.
    pub fn method_shorty(&self, method_idx: u32) -> Result<&str, FormatError>
    {
        let method = self.method(method_idx)?;
        let proto = self.proto(method.proto_idx as u32).context(|| format!("method #{}", method_idx))?;
        self.string(proto.shorty_idx).context(|| format!("proto #{}", method.proto_idx))
    }

    /// A type_list: a u4 count followed by u2 type indices. Offset 0 is the empty list.
    pub fn type_list(&self, offset: u32) -> Result<Vec<u32>, FormatError>
    {
        if offset == 0
        {
            return Ok(Vec::new());
        }
        let mut reader = self.reader_at(offset)?;
        let size = reader.read_u32()?;
        let mut list = Vec::with_capacity(size.min(0x1000) as usize);
        for _ in 0..size
        {
            list.push(reader.read_u16()? as u32);
        }
        Ok(list)
    }

    /// A method's descriptor-style signature, e.g. `(ILjava/lang/String;)V`.
    pub fn method_signature(&self, method_idx: u32) -> Result<String, FormatError>
    {
        let method = self.method(method_idx)?;
        let proto = self.proto(method.proto_idx as u32)?;
        let mut s = String::from("(");
        for type_idx in self.type_list(proto.parameters_off).context(|| format!("parameters of proto #{}", method.proto_idx))?
        {
            s.push_str(self.type_descriptor(type_idx)?);
        }
        s.push(')');
        s.push_str(self.type_descriptor(proto.return_type_idx)?);
        Ok(s)
    }
}

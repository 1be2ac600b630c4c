//! Android binary XML (AXML) chunk decoder.
//!
//! A document is a `RES_XML_TYPE` chunk holding a string pool, an optional
//! resource map and a flat stream of namespace, element and text chunks.
//! [`AxmlDocument::parse`] turns that stream into [`AxmlNode`]s, checking
//! nesting as it goes.

use log::{debug, warn};

use crate::android::resources::ResourceMap;
use crate::android::value::TypedValue;
use crate::error::{FormatError, ResultExt};
use crate::reader::BinaryReader;

const RES_XML_TYPE: u16 = 0x0003;
const RES_STRING_POOL_TYPE: u16 = 0x0001;
const RES_XML_RESOURCE_MAP_TYPE: u16 = 0x0180;
const RES_XML_START_NAMESPACE_TYPE: u16 = 0x0100;
const RES_XML_END_NAMESPACE_TYPE: u16 = 0x0101;
const RES_XML_START_ELEMENT_TYPE: u16 = 0x0102;
const RES_XML_END_ELEMENT_TYPE: u16 = 0x0103;
const RES_XML_CDATA_TYPE: u16 = 0x0104;

const NO_ENTRY_INDEX: u32 = 0xFFFF_FFFF;
const STRING_FLAG_UTF8: u32 = 0x0000_0100;
const STYLE_SPAN_END: u32 = 0xFFFF_FFFF;

const CHUNK_HEADER_SIZE: usize = 8;
const STRING_POOL_HEADER_SIZE: usize = 28;
const NODE_HEADER_SIZE: usize = 16;
const ATTRIBUTE_MIN_SIZE: usize = 20;
const TYPED_VALUE_SIZE: u16 = 8;
const TYPE_STRING: u8 = 0x03;

struct ChunkHeader {
    chunk_type: u16,
    header_size: u16,
    chunk_size: u32,
    start: usize,
}

impl ChunkHeader {
    fn end(&self) -> usize {
        self.start + self.chunk_size as usize
    }

    fn body(&self) -> usize {
        self.start + self.header_size as usize
    }
}

/// Read a chunk header at the reader's position. The chunk must end at or before `limit`.
fn read_chunk_header(reader: &mut BinaryReader<'_>, limit: usize) -> Result<ChunkHeader, FormatError> {
    let start = reader.position();
    let chunk_type = reader.read_u16()?;
    let header_size = reader.read_u16()?;
    let chunk_size = reader.read_u32()?;
    if (header_size as usize) < CHUNK_HEADER_SIZE || chunk_size < header_size as u32 {
        fail!(
            at start,
            "invalid sizing for chunk 0x{:04x} (header 0x{:x}, size 0x{:x})",
            chunk_type,
            header_size,
            chunk_size
        );
    }
    match start.checked_add(chunk_size as usize) {
        Some(end) if end <= limit => {}
        _ => fail!(
            at start,
            "chunk 0x{:04x} of size 0x{:x} extends past end of document (0x{:x})",
            chunk_type,
            chunk_size,
            limit
        ),
    }
    Ok(ChunkHeader {
        chunk_type,
        header_size,
        chunk_size,
        start,
    })
}

/// The decoded `RES_STRING_POOL_TYPE` chunk.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StringPool {
    strings: Vec<String>,
    utf8: bool,
    style_count: usize,
}

impl StringPool {
    fn parse(data: &[u8], header: &ChunkHeader) -> Result<Self, FormatError> {
        if (header.header_size as usize) < STRING_POOL_HEADER_SIZE {
            fail!(at header.start, "string pool header too small (0x{:x})", header.header_size);
        }
        // every read below is confined to this chunk
        let chunk = &data[..header.end()];
        let mut reader = BinaryReader::at(chunk, header.start + CHUNK_HEADER_SIZE)?;
        let string_count = reader.read_u32()? as usize;
        let style_count = reader.read_u32()? as usize;
        let flags = reader.read_u32()?;
        let strings_start = reader.read_u32()? as usize;
        let styles_start = reader.read_u32()? as usize;
        let utf8 = (flags & STRING_FLAG_UTF8) != 0;

        reader.seek(header.body())?;
        let mut string_offsets = Vec::with_capacity(string_count.min(reader.remaining() / 4));
        for _ in 0..string_count {
            string_offsets.push(reader.read_u32()? as usize);
        }
        let mut style_offsets = Vec::with_capacity(style_count.min(reader.remaining() / 4));
        for _ in 0..style_count {
            style_offsets.push(reader.read_u32()? as usize);
        }

        let strings_base = header.start + strings_start;
        let mut strings = Vec::with_capacity(string_offsets.len());
        for (idx, offset) in string_offsets.into_iter().enumerate() {
            let text = if utf8 {
                read_utf8_string(chunk, strings_base.saturating_add(offset))
            } else {
                read_utf16_string(chunk, strings_base.saturating_add(offset))
            }
            .context(|| format!("string #{idx}"))?;
            strings.push(text);
        }

        if !style_offsets.is_empty() {
            if styles_start == 0 {
                fail!(at header.start, "string pool has {} styles but no style data", style_count);
            }
            let styles_base = header.start + styles_start;
            for (idx, offset) in style_offsets.into_iter().enumerate() {
                walk_style_spans(chunk, styles_base.saturating_add(offset)).context(|| format!("style #{idx}"))?;
            }
        }

        debug!(
            "[axml] string pool: {} {} strings, {} styles",
            strings.len(),
            if utf8 { "UTF-8" } else { "UTF-16" },
            style_count
        );
        Ok(StringPool {
            strings,
            utf8,
            style_count,
        })
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn is_utf8(&self) -> bool {
        self.utf8
    }

    pub fn style_count(&self) -> usize {
        self.style_count
    }

    pub fn get(&self, idx: u32) -> Option<&str> {
        if idx == NO_ENTRY_INDEX {
            return None;
        }
        self.strings.get(idx as usize).map(String::as_str)
    }

    /// Look up `idx`, which was read at `offset`. An out-of-range index is an error.
    fn require(&self, idx: u32, offset: usize) -> Result<&str, FormatError> {
        match self.strings.get(idx as usize) {
            Some(text) => Ok(text),
            None => fail!(at offset, "string index {} out of range (pool has {})", idx, self.strings.len()),
        }
    }

    /// Like [`StringPool::require`], but `NO_ENTRY_INDEX` is `None`.
    fn optional(&self, idx: u32, offset: usize) -> Result<Option<&str>, FormatError> {
        if idx == NO_ENTRY_INDEX {
            return Ok(None);
        }
        self.require(idx, offset).map(Some)
    }
}

fn read_utf8_length(reader: &mut BinaryReader<'_>) -> Result<usize, FormatError> {
    let first = reader.read_u8()? as usize;
    if (first & 0x80) == 0 {
        Ok(first)
    } else {
        let second = reader.read_u8()? as usize;
        Ok(((first & 0x7F) << 8) | second)
    }
}

fn read_utf8_string(chunk: &[u8], offset: usize) -> Result<String, FormatError> {
    let mut reader = BinaryReader::at(chunk, offset)?;
    // character count, unused
    read_utf8_length(&mut reader)?;
    let byte_len = read_utf8_length(&mut reader)?;
    let start = reader.position();
    let bytes = reader.read_bytes(byte_len)?;
    if reader.read_u8()? != 0 {
        fail!(at start + byte_len, "UTF-8 string is not NUL-terminated");
    }
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|err| FormatError::at(start, &format!("invalid UTF-8 string: {err}")))
}

fn read_utf16_string(chunk: &[u8], offset: usize) -> Result<String, FormatError> {
    let mut reader = BinaryReader::at(chunk, offset)?;
    let first = reader.read_u16()? as usize;
    let char_count = if (first & 0x8000) == 0 {
        first
    } else {
        ((first & 0x7FFF) << 16) | reader.read_u16()? as usize
    };
    let start = reader.position();
    let bytes = reader.read_bytes(char_count * 2)?;
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    if reader.read_u16()? != 0 {
        fail!(at start + bytes.len(), "UTF-16 string is not zero-terminated");
    }
    String::from_utf16(&units).map_err(|err| FormatError::at(start, &format!("invalid UTF-16 string: {err}")))
}

/// Walk one style's `(name, first_char, last_char)` spans up to the end marker.
fn walk_style_spans(chunk: &[u8], offset: usize) -> Result<usize, FormatError> {
    let mut reader = BinaryReader::at(chunk, offset)?;
    let mut spans = 0;
    while reader.read_u32()? != STYLE_SPAN_END {
        reader.skip(8)?;
        spans += 1;
    }
    Ok(spans)
}

/// A namespace scope opened or closed by the document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Namespace {
    pub line: u32,
    /// `None` for an empty or missing prefix.
    pub prefix: Option<String>,
    pub uri: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    pub namespace: Option<String>,
    /// Local name. When the resource map ties the name to a framework
    /// attribute, this is the framework's canonical name, unless another
    /// attribute of the element already carries that name.
    pub name: String,
    pub raw_value: Option<String>,
    pub value: TypedValue,
    pub resource_id: Option<u32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ElementStart {
    pub line: u32,
    pub namespace: Option<String>,
    pub name: String,
    pub attributes: Vec<Attribute>,
}

impl ElementStart {
    /// First attribute with the given local name, in any namespace.
    pub fn attribute(&self, local_name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.name == local_name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementEnd {
    pub line: u32,
    pub namespace: Option<String>,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Text {
    pub line: u32,
    pub text: String,
}

/// One decoded chunk of the node stream, in document order.
#[derive(Clone, Debug, PartialEq)]
pub enum AxmlNode {
    NamespaceStart(Namespace),
    NamespaceEnd(Namespace),
    ElementStart(ElementStart),
    ElementEnd(ElementEnd),
    Text(Text),
}

/// A fully decoded binary XML document.
#[derive(Clone, Debug, PartialEq)]
pub struct AxmlDocument {
    nodes: Vec<AxmlNode>,
    strings: StringPool,
    resource_map: ResourceMap,
}

impl AxmlDocument {
    pub fn parse(data: &[u8]) -> Result<Self, FormatError> {
        let mut reader = BinaryReader::new(data);
        let xml_header = read_chunk_header(&mut reader, data.len())?;
        if xml_header.chunk_type != RES_XML_TYPE {
            fail!(at 0, "document does not start with RES_XML_TYPE (found 0x{:04x})", xml_header.chunk_type);
        }
        if xml_header.header_size as usize != CHUNK_HEADER_SIZE {
            warn!("[axml] unexpected document header size 0x{:x}", xml_header.header_size);
        }
        if xml_header.end() < data.len() {
            debug!("[axml] {} trailing bytes after document", data.len() - xml_header.end());
        }

        let mut decoder = Decoder::new(data);
        let xml_end = xml_header.end();
        reader.seek(xml_header.body())?;
        while reader.position() < xml_end {
            let chunk = read_chunk_header(&mut reader, xml_end)?;
            decoder.chunk(&chunk)?;
            reader.seek(chunk.end())?;
        }
        decoder.finish()
    }

    pub fn nodes(&self) -> &[AxmlNode] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<AxmlNode> {
        self.nodes
    }

    pub fn strings(&self) -> &StringPool {
        &self.strings
    }

    pub fn resource_map(&self) -> &ResourceMap {
        &self.resource_map
    }

    /// Element starts paired with their depth, the root being depth 0.
    pub fn elements(&self) -> impl Iterator<Item = (usize, &ElementStart)> {
        let mut depth = 0usize;
        self.nodes.iter().filter_map(move |node| match node {
            AxmlNode::ElementStart(element) => {
                depth += 1;
                Some((depth - 1, element))
            }
            AxmlNode::ElementEnd(_) => {
                depth = depth.saturating_sub(1);
                None
            }
            _ => None,
        })
    }

    pub fn root_element(&self) -> Option<&ElementStart> {
        self.elements().next().map(|(_, element)| element)
    }
}

/// Decoding state carried across the chunks of one document.
struct Decoder<'a> {
    data: &'a [u8],
    strings: Option<StringPool>,
    resource_map: ResourceMap,
    nodes: Vec<AxmlNode>,
    open_elements: Vec<(Option<String>, String)>,
    open_namespaces: Vec<String>,
    roots: usize,
}

impl<'a> Decoder<'a> {
    fn new(data: &'a [u8]) -> Self {
        Decoder {
            data,
            strings: None,
            resource_map: ResourceMap::default(),
            nodes: Vec::new(),
            open_elements: Vec::new(),
            open_namespaces: Vec::new(),
            roots: 0,
        }
    }

    fn chunk(&mut self, chunk: &ChunkHeader) -> Result<(), FormatError> {
        match chunk.chunk_type {
            RES_STRING_POOL_TYPE => {
                if self.strings.is_some() {
                    fail!(at chunk.start, "second string pool");
                }
                self.strings = Some(StringPool::parse(self.data, chunk).context(|| "string pool")?);
            }
            RES_XML_RESOURCE_MAP_TYPE => self.resource_map(chunk)?,
            RES_XML_START_NAMESPACE_TYPE
            | RES_XML_END_NAMESPACE_TYPE
            | RES_XML_START_ELEMENT_TYPE
            | RES_XML_END_ELEMENT_TYPE
            | RES_XML_CDATA_TYPE => {
                let node = self.node(chunk)?;
                self.nodes.push(node);
            }
            other => {
                debug!("[axml] skipping chunk 0x{:04x} at 0x{:x} ({} bytes)", other, chunk.start, chunk.chunk_size);
            }
        }
        Ok(())
    }

    fn resource_map(&mut self, chunk: &ChunkHeader) -> Result<(), FormatError> {
        let payload = chunk.chunk_size as usize - chunk.header_size as usize;
        if payload % 4 != 0 {
            fail!(at chunk.start, "resource map payload 0x{:x} is not a multiple of 4", payload);
        }
        let mut reader = BinaryReader::at(&self.data[..chunk.end()], chunk.body())?;
        let mut ids = Vec::with_capacity(payload / 4);
        for _ in 0..payload / 4 {
            ids.push(reader.read_u32()?);
        }
        debug!("[axml] resource map: {} ids", ids.len());
        self.resource_map = ResourceMap::new(ids);
        Ok(())
    }

    fn node(&mut self, chunk: &ChunkHeader) -> Result<AxmlNode, FormatError> {
        if (chunk.header_size as usize) < NODE_HEADER_SIZE {
            fail!(at chunk.start, "node header too small (0x{:x})", chunk.header_size);
        }
        let strings = match self.strings.as_ref() {
            Some(strings) => strings,
            None => fail!(at chunk.start, "node chunk 0x{:04x} before string pool", chunk.chunk_type),
        };
        let mut reader = BinaryReader::at(&self.data[..chunk.end()], chunk.start + CHUNK_HEADER_SIZE)?;
        let line = reader.read_u32()?;
        // comment index
        reader.read_u32()?;
        reader.seek(chunk.body())?;

        match chunk.chunk_type {
            RES_XML_START_NAMESPACE_TYPE => {
                let namespace = read_namespace(&mut reader, strings, line)?;
                self.open_namespaces.push(namespace.uri.clone());
                Ok(AxmlNode::NamespaceStart(namespace))
            }
            RES_XML_END_NAMESPACE_TYPE => {
                let namespace = read_namespace(&mut reader, strings, line)?;
                match self.open_namespaces.pop() {
                    Some(uri) if uri == namespace.uri => Ok(AxmlNode::NamespaceEnd(namespace)),
                    Some(uri) => fail!(at chunk.start, "namespace end for {} while {} is open", namespace.uri, uri),
                    None => fail!(at chunk.start, "namespace end for {} with no open namespace", namespace.uri),
                }
            }
            RES_XML_START_ELEMENT_TYPE => {
                let element = read_element_start(&mut reader, chunk, strings, &self.resource_map, line)?;
                if self.open_elements.is_empty() {
                    self.roots += 1;
                    if self.roots > 1 {
                        fail!(at chunk.start, "second root element <{}>", element.name);
                    }
                }
                self.open_elements.push((element.namespace.clone(), element.name.clone()));
                Ok(AxmlNode::ElementStart(element))
            }
            RES_XML_END_ELEMENT_TYPE => {
                let offset = reader.position();
                let namespace = strings.optional(reader.read_u32()?, offset)?.map(str::to_string);
                let name = strings.require(reader.read_u32()?, offset + 4)?.to_string();
                match self.open_elements.pop() {
                    Some((open_ns, open_name)) if open_ns == namespace && open_name == name => {}
                    Some((_, open_name)) => fail!(at chunk.start, "end of </{}> while <{}> is open", name, open_name),
                    None => fail!(at chunk.start, "end of </{}> with no open element", name),
                }
                Ok(AxmlNode::ElementEnd(ElementEnd { line, namespace, name }))
            }
            _ => {
                if self.open_elements.is_empty() {
                    fail!(at chunk.start, "text outside of any element");
                }
                let offset = reader.position();
                let data_idx = reader.read_u32()?;
                let value = read_typed_value(&mut reader, strings)?;
                let text = match strings.optional(data_idx, offset)? {
                    Some(text) => text.to_string(),
                    None => value.render(),
                };
                Ok(AxmlNode::Text(Text { line, text }))
            }
        }
    }

    fn finish(self) -> Result<AxmlDocument, FormatError> {
        if let Some((_, name)) = self.open_elements.last() {
            fail!("element <{}> is still open at end of document", name);
        }
        if self.roots == 0 {
            fail!("document has no root element");
        }
        for uri in &self.open_namespaces {
            warn!("[axml] namespace {} is still open at end of document", uri);
        }
        Ok(AxmlDocument {
            nodes: self.nodes,
            strings: self.strings.unwrap_or_default(),
            resource_map: self.resource_map,
        })
    }
}

fn read_namespace(reader: &mut BinaryReader<'_>, strings: &StringPool, line: u32) -> Result<Namespace, FormatError> {
    let offset = reader.position();
    let prefix = strings
        .optional(reader.read_u32()?, offset)?
        .filter(|prefix| !prefix.is_empty())
        .map(str::to_string);
    let uri = strings.require(reader.read_u32()?, offset + 4)?.to_string();
    Ok(Namespace { line, prefix, uri })
}

fn read_typed_value(reader: &mut BinaryReader<'_>, strings: &StringPool) -> Result<TypedValue, FormatError> {
    let offset = reader.position();
    let size = reader.read_u16()?;
    // res0
    reader.read_u8()?;
    let data_type = reader.read_u8()?;
    let data = reader.read_u32()?;
    if size != TYPED_VALUE_SIZE {
        fail!(at offset, "typed value size must be 8, found {}", size);
    }
    let string = if data_type == TYPE_STRING {
        Some(strings.require(data, offset + 4)?.to_string())
    } else {
        None
    };
    TypedValue::new(data_type, data, string).map_err(|err| FormatError::at(offset, err.message()))
}

fn read_element_start(
    reader: &mut BinaryReader<'_>,
    chunk: &ChunkHeader,
    strings: &StringPool,
    resource_map: &ResourceMap,
    line: u32,
) -> Result<ElementStart, FormatError> {
    let body = reader.position();
    let namespace = strings.optional(reader.read_u32()?, body)?.map(str::to_string);
    let name = strings.require(reader.read_u32()?, body + 4)?.to_string();
    let attribute_start = reader.read_u16()? as usize;
    let attribute_size = reader.read_u16()? as usize;
    let attribute_count = reader.read_u16()? as usize;
    // id, class and style attribute indices
    reader.skip(6)?;

    if attribute_count > 0 && attribute_size < ATTRIBUTE_MIN_SIZE {
        fail!(at body, "attribute size 0x{:x} smaller than 0x{:x}", attribute_size, ATTRIBUTE_MIN_SIZE);
    }
    let attributes_at = body + attribute_start;
    if attributes_at + attribute_count * attribute_size > chunk.end() {
        fail!(at body, "{} attributes of 0x{:x} bytes overrun the element chunk", attribute_count, attribute_size);
    }

    let mut attributes = Vec::with_capacity(attribute_count);
    let mut canonical = Vec::with_capacity(attribute_count);
    for idx in 0..attribute_count {
        let at = attributes_at + idx * attribute_size;
        reader.seek(at)?;
        let (attribute, canonical_name) = read_attribute(reader, strings, resource_map)
            .context(|| format!("attribute #{idx} of <{name}>"))?;
        canonical.push(canonical_name);
        attributes.push(attribute);
    }
    apply_canonical_names(&mut attributes, &canonical);
    Ok(ElementStart {
        line,
        namespace,
        name,
        attributes,
    })
}

fn read_attribute(
    reader: &mut BinaryReader<'_>,
    strings: &StringPool,
    resource_map: &ResourceMap,
) -> Result<(Attribute, Option<&'static str>), FormatError> {
    let offset = reader.position();
    let namespace = strings.optional(reader.read_u32()?, offset)?.map(str::to_string);
    let name_idx = reader.read_u32()?;
    let pool_name = strings.require(name_idx, offset + 4)?;
    let raw_value = strings.optional(reader.read_u32()?, offset + 8)?.map(str::to_string);
    let value = read_typed_value(reader, strings)?;
    let attribute = Attribute {
        namespace,
        name: pool_name.to_string(),
        raw_value,
        value,
        resource_id: resource_map.resource_id(name_idx),
    };
    Ok((attribute, resource_map.canonical_name(name_idx)))
}

/// Swap pool names for canonical framework names, keeping the pool name when
/// the canonical one is already used by another attribute of the element.
fn apply_canonical_names(attributes: &mut [Attribute], canonical: &[Option<&'static str>]) {
    for (idx, name) in canonical.iter().enumerate() {
        let name = match name {
            Some(name) if attributes[idx].name != *name => *name,
            _ => continue,
        };
        let namespace = &attributes[idx].namespace;
        let taken = attributes
            .iter()
            .enumerate()
            .any(|(other, attr)| other != idx && attr.namespace == *namespace && attr.name == name);
        if taken {
            warn!("[axml] attribute {} keeps its pool name, {} is already present", attributes[idx].name, name);
        } else {
            attributes[idx].name = name.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::android::value::ValueKind;
    use crate::tests::builders::{AxmlBuilder, ANDROID_NS};

    fn manifest_builder() -> AxmlBuilder {
        let mut builder = AxmlBuilder::new();
        builder
            .start_namespace("android", ANDROID_NS)
            .start_element("manifest")
            .attr_string(None, "package", "com.example")
            .start_element("uses-sdk")
            .attr_int(Some(ANDROID_NS), "minSdkVersion", 21)
            .end_element("uses-sdk")
            .end_element("manifest")
            .end_namespace("android", ANDROID_NS);
        builder
    }

    #[test]
    fn decodes_nodes_in_order() {
        let doc = AxmlDocument::parse(&manifest_builder().build()).unwrap();
        let kinds: Vec<&str> = doc
            .nodes()
            .iter()
            .map(|node| match node {
                AxmlNode::NamespaceStart(_) => "ns",
                AxmlNode::NamespaceEnd(_) => "/ns",
                AxmlNode::ElementStart(_) => "el",
                AxmlNode::ElementEnd(_) => "/el",
                AxmlNode::Text(_) => "text",
            })
            .collect();
        assert_eq!(kinds, vec!["ns", "el", "el", "/el", "/el", "/ns"]);

        let root = doc.root_element().unwrap();
        assert_eq!(root.name, "manifest");
        assert_eq!(root.attribute("package").unwrap().value.as_str(), Some("com.example"));

        let (depth, sdk) = doc.elements().nth(1).unwrap();
        assert_eq!(depth, 1);
        let min = sdk.attribute("minSdkVersion").unwrap();
        assert_eq!(min.namespace.as_deref(), Some(ANDROID_NS));
        assert_eq!(min.value.kind, ValueKind::IntDec);
        assert_eq!(min.value.as_int(), Some(21));
    }

    #[test]
    fn utf8_pool_with_styles() {
        let mut builder = manifest_builder();
        builder.utf8(true).style_spans(vec![(0, 0, 3)]);
        let doc = AxmlDocument::parse(&builder.build()).unwrap();
        assert!(doc.strings().is_utf8());
        assert_eq!(doc.strings().style_count(), 1);
        assert_eq!(doc.root_element().unwrap().name, "manifest");
    }

    #[test]
    fn resource_map_names_win() {
        let mut builder = AxmlBuilder::new();
        builder
            .resource_attr("a1", 0x0101_020c)
            .start_element("uses-sdk")
            .attr_int(None, "a1", 9)
            .end_element("uses-sdk");
        let doc = AxmlDocument::parse(&builder.build()).unwrap();
        let attr = &doc.root_element().unwrap().attributes[0];
        assert_eq!(attr.name, "minSdkVersion");
        assert_eq!(attr.resource_id, Some(0x0101_020c));
        assert_eq!(doc.resource_map().len(), 1);
    }

    #[test]
    fn unknown_chunks_are_skipped() {
        let mut builder = manifest_builder();
        builder.unknown_chunk(0x0777, &[1, 2, 3, 4]);
        assert!(AxmlDocument::parse(&builder.build()).is_ok());
    }

    #[test]
    fn rejects_wrong_document_type() {
        let mut bytes = manifest_builder().build();
        bytes[0] = 0x02;
        let err = AxmlDocument::parse(&bytes).unwrap_err();
        assert!(err.message().contains("RES_XML_TYPE"));
        assert_eq!(err.offset(), Some(0));
    }

    #[test]
    fn rejects_truncated_document() {
        let bytes = manifest_builder().build();
        let err = AxmlDocument::parse(&bytes[..bytes.len() - 4]).unwrap_err();
        assert!(err.message().contains("past end of document"));
    }

    #[test]
    fn rejects_mismatched_end_element() {
        let mut builder = AxmlBuilder::new();
        builder.start_element("a").start_element("b").end_element("a").end_element("a");
        let err = AxmlDocument::parse(&builder.build()).unwrap_err();
        assert!(err.message().contains("while <b> is open"));
    }

    #[test]
    fn rejects_unbalanced_documents() {
        let mut open = AxmlBuilder::new();
        open.start_element("a");
        assert!(AxmlDocument::parse(&open.build()).unwrap_err().message().contains("still open"));

        let mut stray = AxmlBuilder::new();
        stray.start_element("a").end_element("a").end_element("a");
        assert!(AxmlDocument::parse(&stray.build()).unwrap_err().message().contains("no open element"));

        let mut two_roots = AxmlBuilder::new();
        two_roots.start_element("a").end_element("a").start_element("b").end_element("b");
        assert!(AxmlDocument::parse(&two_roots.build()).unwrap_err().message().contains("second root"));

        let empty = AxmlBuilder::new();
        assert!(AxmlDocument::parse(&empty.build()).unwrap_err().message().contains("no root"));

        let mut text = AxmlBuilder::new();
        text.text("loose").start_element("a").end_element("a");
        assert!(AxmlDocument::parse(&text.build()).unwrap_err().message().contains("outside"));
    }

    #[test]
    fn rejects_mismatched_namespace_end() {
        let mut builder = AxmlBuilder::new();
        builder
            .start_namespace("a", "urn:a")
            .start_namespace("b", "urn:b")
            .start_element("x")
            .end_element("x")
            .end_namespace("a", "urn:a");
        let err = AxmlDocument::parse(&builder.build()).unwrap_err();
        assert!(err.message().contains("namespace end for urn:a"));
    }

    #[test]
    fn open_namespace_at_end_is_tolerated() {
        let mut builder = AxmlBuilder::new();
        builder.start_namespace("a", "urn:a").start_element("x").end_element("x");
        assert!(AxmlDocument::parse(&builder.build()).is_ok());
    }

    #[test]
    fn string_index_one_past_the_end_is_an_error() {
        let mut builder = AxmlBuilder::new();
        builder.start_element("a").attr_string_index(None, "v", 99).end_element("a");
        let bytes = builder.build();
        let err = AxmlDocument::parse(&bytes).unwrap_err();
        assert!(err.message().contains("out of range"), "{err}");
        assert!(err.offset().is_some());

        // pool is ["a", "v"], so 2 is one past the last entry
        let mut edge = AxmlBuilder::new();
        edge.start_element("a").attr_string_index(None, "v", 2).end_element("a");
        assert!(AxmlDocument::parse(&edge.build()).unwrap_err().message().contains("out of range"));
    }

    #[test]
    fn rejects_second_string_pool() {
        let mut builder = manifest_builder();
        builder.duplicate_string_pool(true);
        assert!(AxmlDocument::parse(&builder.build()).unwrap_err().message().contains("second string pool"));
    }

    #[test]
    fn rejects_unknown_dimension_unit() {
        let mut builder = AxmlBuilder::new();
        builder.start_element("a").attr_typed(None, "w", 0x05, 0x100f).end_element("a");
        let err = AxmlDocument::parse(&builder.build()).unwrap_err();
        assert!(err.message().contains("unknown dimension unit"));
    }

    #[test]
    fn text_nodes() {
        let mut builder = AxmlBuilder::new();
        builder.start_element("a").text("hello & bye").end_element("a");
        let doc = AxmlDocument::parse(&builder.build()).unwrap();
        assert!(matches!(&doc.nodes()[1], AxmlNode::Text(text) if text.text == "hello & bye"));
    }
}

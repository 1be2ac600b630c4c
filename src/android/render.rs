//! Turn decoded AXML nodes back into XML text.

use std::collections::{HashMap, HashSet};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::android::binary_xml::{AxmlNode, ElementEnd, ElementStart};
use crate::error::FormatError;

/// Layout of the rendered text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Spaces per nesting level. `None` writes everything on one line.
    pub indent: Option<usize>,
    pub xml_declaration: bool,
}

impl RenderOptions {
    /// Four-space indentation behind an XML declaration.
    pub fn pretty() -> Self {
        RenderOptions {
            indent: Some(4),
            xml_declaration: true,
        }
    }
}

/// `NameStartChar` of XML 1.0, without the colon.
fn is_name_start_char(c: char) -> bool {
    matches!(c,
        'A'..='Z' | '_' | 'a'..='z'
        | '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}' | '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}' | '\u{10000}'..='\u{EFFFF}')
}

fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c, '-' | '.' | '0'..='9' | '\u{B7}' | '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}')
}

/// A name with no colon in it (`NCName`), usable as a prefix or a local name.
fn is_ncname(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => is_name_start_char(first) && chars.all(is_name_char),
        None => false,
    }
}

/// The XML 1.0 `Char` production.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

fn check_name(name: &str, what: &str) -> Result<(), FormatError> {
    if !is_ncname(name) {
        fail!("{} name {:?} is not a valid XML name", what, name);
    }
    Ok(())
}

fn check_chars(text: &str, what: &str) -> Result<(), FormatError> {
    match text.chars().find(|c| !is_xml_char(*c)) {
        Some(c) => fail!("{} contains U+{:04X}, which XML 1.0 cannot represent", what, c as u32),
        None => Ok(()),
    }
}

/// Namespace prefixes, fixed per URI for the whole document.
#[derive(Default)]
struct Prefixes {
    by_uri: HashMap<String, String>,
    taken: HashSet<String>,
}

impl Prefixes {
    /// The prefix of `uri`, assigning one on first sight: the declared prefix
    /// when it is usable, `ns<N>` otherwise.
    fn assign(&mut self, uri: &str, declared: Option<&str>) -> String {
        if let Some(prefix) = self.by_uri.get(uri) {
            return prefix.clone();
        }
        let prefix = match declared {
            Some(p) if is_ncname(p) && !p.to_ascii_lowercase().starts_with("xml") && !self.taken.contains(p) => {
                p.to_string()
            }
            _ => {
                let mut n = self.by_uri.len();
                while self.taken.contains(&format!("ns{n}")) {
                    n += 1;
                }
                format!("ns{n}")
            }
        };
        self.taken.insert(prefix.clone());
        self.by_uri.insert(uri.to_string(), prefix.clone());
        prefix
    }

    fn qualified(&mut self, namespace: Option<&str>, local: &str) -> String {
        match namespace {
            Some(uri) => format!("{}:{}", self.assign(uri, None), local),
            None => local.to_string(),
        }
    }
}

fn write_error(err: impl std::fmt::Display) -> FormatError {
    FormatError::new(&format!("cannot write XML: {err}"))
}

/// An element written as a start tag and still waiting for its end.
struct OpenElement {
    namespace: Option<String>,
    local: String,
    qualified: String,
}

struct Renderer {
    writer: Writer<Vec<u8>>,
    prefixes: Prefixes,
    /// URIs declared by namespace starts and not yet attached to an element.
    pending: Vec<String>,
    /// URIs declared on each open element.
    scopes: Vec<Vec<String>>,
    open: Vec<OpenElement>,
}

impl Renderer {
    fn in_scope(&self, uri: &str) -> bool {
        self.scopes.iter().flatten().any(|u| u == uri)
    }

    fn start(&mut self, element: &ElementStart, empty: bool) -> Result<(), FormatError> {
        check_name(&element.name, "element")?;
        let mut declared = std::mem::take(&mut self.pending);
        let used = element
            .namespace
            .iter()
            .chain(element.attributes.iter().filter_map(|a| a.namespace.as_ref()));
        for uri in used {
            if !self.in_scope(uri) && !declared.contains(uri) {
                declared.push(uri.clone());
            }
        }

        let name = self.prefixes.qualified(element.namespace.as_deref(), &element.name);
        let mut attributes: Vec<(String, String)> = Vec::with_capacity(declared.len() + element.attributes.len());
        for uri in &declared {
            check_chars(uri, "namespace URI")?;
            let prefix = self.prefixes.assign(uri, None);
            attributes.push((format!("xmlns:{prefix}"), uri.clone()));
        }
        for attr in &element.attributes {
            check_name(&attr.name, "attribute")?;
            let key = self.prefixes.qualified(attr.namespace.as_deref(), &attr.name);
            if attributes.iter().any(|(existing, _)| *existing == key) {
                fail!("duplicate attribute {} on <{}>", key, name);
            }
            let value = attr.value.render();
            check_chars(&value, &format!("value of attribute {key}"))?;
            attributes.push((key, value));
        }

        let mut start = BytesStart::new(name.as_str());
        for (key, value) in &attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }
        if empty {
            self.writer.write_event(Event::Empty(start)).map_err(write_error)?;
        } else {
            self.writer.write_event(Event::Start(start)).map_err(write_error)?;
            self.scopes.push(declared);
            self.open.push(OpenElement {
                namespace: element.namespace.clone(),
                local: element.name.clone(),
                qualified: name,
            });
        }
        Ok(())
    }

    fn end(&mut self, end: &ElementEnd) -> Result<(), FormatError> {
        let open = match self.open.pop() {
            Some(open) => open,
            None => fail!("end of </{}> with no open element", end.name),
        };
        if open.namespace != end.namespace || open.local != end.name {
            fail!("end of </{}> while <{}> is open", end.name, open.qualified);
        }
        self.scopes.pop();
        self.writer
            .write_event(Event::End(BytesEnd::new(open.qualified.as_str())))
            .map_err(write_error)
    }
}

/// True when `end` closes `start`.
fn closes(start: &ElementStart, end: &ElementEnd) -> bool {
    start.namespace == end.namespace && start.name == end.name
}

/// Render a node sequence as XML text.
///
/// Each namespace is declared on the element that introduces it, and an
/// element with no content is written self-closing. Names that are not XML
/// names, characters XML 1.0 cannot carry and repeated attributes are errors.
pub fn render(nodes: &[AxmlNode], options: &RenderOptions) -> Result<String, FormatError> {
    let writer = match options.indent {
        Some(width) => Writer::new_with_indent(Vec::new(), b' ', width),
        None => Writer::new(Vec::new()),
    };
    let mut renderer = Renderer {
        writer,
        prefixes: Prefixes::default(),
        pending: Vec::new(),
        scopes: Vec::new(),
        open: Vec::new(),
    };
    if options.xml_declaration {
        renderer
            .writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(write_error)?;
    }

    let mut idx = 0;
    while idx < nodes.len() {
        match &nodes[idx] {
            AxmlNode::NamespaceStart(ns) => {
                renderer.prefixes.assign(&ns.uri, ns.prefix.as_deref());
                if !renderer.pending.contains(&ns.uri) {
                    renderer.pending.push(ns.uri.clone());
                }
            }
            AxmlNode::NamespaceEnd(ns) => {
                renderer.pending.retain(|uri| uri != &ns.uri);
            }
            AxmlNode::ElementStart(element) => {
                let empty = matches!(nodes.get(idx + 1), Some(AxmlNode::ElementEnd(end)) if closes(element, end));
                renderer.start(element, empty)?;
                if empty {
                    idx += 1;
                }
            }
            AxmlNode::ElementEnd(end) => renderer.end(end)?,
            AxmlNode::Text(text) => {
                if renderer.open.is_empty() {
                    fail!("text outside of any element");
                }
                check_chars(&text.text, "text")?;
                renderer
                    .writer
                    .write_event(Event::Text(BytesText::new(&text.text)))
                    .map_err(write_error)?;
            }
        }
        idx += 1;
    }
    if let Some(open) = renderer.open.last() {
        fail!("element <{}> is never closed", open.qualified);
    }

    String::from_utf8(renderer.writer.into_inner()).map_err(write_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::android::binary_xml::{Attribute, Namespace, Text};
    use crate::android::value::TypedValue;
    use quick_xml::Reader;

    const ANDROID: &str = "http://schemas.android.com/apk/res/android";

    fn ns(prefix: &str, uri: &str) -> Namespace {
        Namespace {
            line: 1,
            prefix: if prefix.is_empty() { None } else { Some(prefix.to_string()) },
            uri: uri.to_string(),
        }
    }

    fn element(namespace: Option<&str>, name: &str, attributes: Vec<Attribute>) -> AxmlNode {
        AxmlNode::ElementStart(ElementStart {
            line: 1,
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
            attributes,
        })
    }

    fn end(namespace: Option<&str>, name: &str) -> AxmlNode {
        AxmlNode::ElementEnd(ElementEnd {
            line: 1,
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
        })
    }

    fn attr(namespace: Option<&str>, name: &str, value: TypedValue) -> Attribute {
        Attribute {
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
            raw_value: None,
            value,
            resource_id: None,
        }
    }

    fn assert_well_formed(xml: &str) {
        let mut reader = Reader::from_str(xml);
        loop {
            match reader.read_event() {
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(err) => panic!("malformed XML {xml:?}: {err}"),
            }
        }
    }

    #[test]
    fn minimal_manifest() {
        let nodes = vec![
            AxmlNode::NamespaceStart(ns("android", ANDROID)),
            element(None, "manifest", vec![attr(None, "package", TypedValue::string("com.example", 2))]),
            end(None, "manifest"),
            AxmlNode::NamespaceEnd(ns("android", ANDROID)),
        ];
        let xml = render(&nodes, &RenderOptions::default()).unwrap();
        assert_eq!(
            xml,
            r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="com.example"/>"#
        );
    }

    #[test]
    fn namespace_declared_once_on_introducing_element() {
        let nodes = vec![
            AxmlNode::NamespaceStart(ns("android", ANDROID)),
            element(None, "manifest", vec![]),
            element(None, "uses-sdk", vec![attr(Some(ANDROID), "minSdkVersion", TypedValue::new(0x10, 21, None).unwrap())]),
            end(None, "uses-sdk"),
            end(None, "manifest"),
            AxmlNode::NamespaceEnd(ns("android", ANDROID)),
        ];
        let xml = render(&nodes, &RenderOptions::default()).unwrap();
        assert_eq!(
            xml,
            r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android"><uses-sdk android:minSdkVersion="21"/></manifest>"#
        );
        assert_eq!(xml.matches("xmlns:android").count(), 1);
    }

    #[test]
    fn undeclared_and_clashing_prefixes_are_generated() {
        let nodes = vec![
            AxmlNode::NamespaceStart(ns("a", "urn:one")),
            AxmlNode::NamespaceStart(ns("a", "urn:two")),
            element(Some("urn:two"), "root", vec![attr(Some("urn:three"), "x", TypedValue::string("1", 0))]),
            end(Some("urn:two"), "root"),
        ];
        let xml = render(&nodes, &RenderOptions::default()).unwrap();
        assert_eq!(
            xml,
            r#"<ns1:root xmlns:a="urn:one" xmlns:ns1="urn:two" xmlns:ns2="urn:three" ns2:x="1"/>"#
        );
        assert_well_formed(&xml);
    }

    #[test]
    fn escapes_text_and_attributes() {
        let nodes = vec![
            element(None, "a", vec![attr(None, "v", TypedValue::string(r#"<"quoted" & 'single'>"#, 0))]),
            AxmlNode::Text(Text {
                line: 2,
                text: "1 < 2 && 3 > 2".to_string(),
            }),
            end(None, "a"),
        ];
        let xml = render(&nodes, &RenderOptions::default()).unwrap();
        assert!(!xml.contains(r#""quoted""#));
        assert!(xml.contains("&lt;"));
        assert!(xml.contains("&amp;"));
        assert_well_formed(&xml);
    }

    #[test]
    fn pretty_output_has_declaration_and_indent() {
        let nodes = vec![
            element(None, "manifest", vec![]),
            element(None, "application", vec![]),
            end(None, "application"),
            end(None, "manifest"),
        ];
        let xml = render(&nodes, &RenderOptions::pretty()).unwrap();
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="utf-8"?>"#));
        assert!(xml.contains("\n    <application/>"));
        assert_well_formed(&xml);
    }

    #[test]
    fn self_closing_needs_the_matching_end() {
        let nodes = vec![element(None, "a", vec![]), end(None, "b")];
        let err = render(&nodes, &RenderOptions::default()).unwrap_err();
        assert!(err.message().contains("while <a> is open"), "{err}");

        let nodes = vec![element(Some(ANDROID), "a", vec![]), end(None, "a")];
        assert!(render(&nodes, &RenderOptions::default()).is_err());
    }

    #[test]
    fn names_and_characters() {
        assert!(is_ncname("uses-sdk"));
        assert!(is_ncname("_x.1"));
        assert!(is_ncname("données"));
        assert!(!is_ncname(""));
        assert!(!is_ncname("1abc"));
        assert!(!is_ncname("a b"));
        assert!(!is_ncname("a:b"));

        assert!(is_xml_char('\t'));
        assert!(is_xml_char('✓'));
        assert!(!is_xml_char('\u{1}'));
        assert!(!is_xml_char('\u{FFFE}'));
    }

    #[test]
    fn unusable_declared_prefix_is_replaced() {
        let nodes = vec![
            AxmlNode::NamespaceStart(ns("1bad", "urn:one")),
            AxmlNode::NamespaceStart(ns("xmlfoo", "urn:two")),
            element(None, "root", vec![]),
            end(None, "root"),
        ];
        let xml = render(&nodes, &RenderOptions::default()).unwrap();
        assert_eq!(xml, r#"<root xmlns:ns0="urn:one" xmlns:ns1="urn:two"/>"#);
    }

    #[test]
    fn unbalanced_nodes_are_rejected() {
        assert!(render(&[end(None, "a")], &RenderOptions::default()).is_err());
        assert!(render(&[element(None, "a", vec![]), element(None, "b", vec![])], &RenderOptions::default()).is_err());
        let text = AxmlNode::Text(Text {
            line: 1,
            text: "x".to_string(),
        });
        assert!(render(&[text], &RenderOptions::default()).is_err());
    }
}

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::android::binary_xml::AxmlDocument;
use crate::android::render::{render, RenderOptions};
use crate::tests::builders::{AxmlBuilder, ANDROID_NS};

fn decode_and_render(builder: &AxmlBuilder) -> String {
    let doc = AxmlDocument::parse(&builder.build()).unwrap();
    render(doc.nodes(), &RenderOptions::default()).unwrap()
}

/// Parses `xml` completely, returning the element names in document order.
fn element_names(xml: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    let mut names = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                names.push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => panic!("malformed XML {xml:?}: {err}"),
        }
    }
    names
}

#[test]
fn minimal_manifest_round_trip() {
    let mut builder = AxmlBuilder::new();
    builder
        .start_namespace("android", ANDROID_NS)
        .start_element("manifest")
        .attr_string(None, "package", "com.example")
        .end_element("manifest")
        .end_namespace("android", ANDROID_NS);

    assert_eq!(
        decode_and_render(&builder),
        r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="com.example"/>"#
    );
}

#[test]
fn utf8_and_utf16_pools_render_alike() {
    let mut builder = AxmlBuilder::new();
    builder
        .start_namespace("android", ANDROID_NS)
        .start_element("manifest")
        .attr_string(None, "package", "com.exämple.ünïcode")
        .start_element("application")
        .attr_string(Some(ANDROID_NS), "label", "日本語 ✓")
        .end_element("application")
        .end_element("manifest")
        .end_namespace("android", ANDROID_NS);
    let utf16 = decode_and_render(&builder);
    builder.utf8(true);
    let utf8 = decode_and_render(&builder);

    assert_eq!(utf16, utf8);
    assert!(utf8.contains(r#"android:label="日本語 ✓""#));
    assert!(utf8.contains("com.exämple.ünïcode"));
}

#[test]
fn typed_values_in_a_realistic_manifest() {
    let mut builder = AxmlBuilder::new();
    builder
        .resource_attr("name", 0x0101_0003)
        .resource_attr("versionCode", 0x0101_021b)
        .resource_attr("debuggable", 0x0101_000f)
        .start_namespace("android", ANDROID_NS)
        .start_element("manifest")
        .attr_int(Some(ANDROID_NS), "versionCode", 42)
        .attr_string(None, "package", "com.example.app")
        .start_element("application")
        .attr_reference(Some(ANDROID_NS), "icon", 0x7f08_0001)
        .attr_bool(Some(ANDROID_NS), "debuggable", true)
        .attr_typed(Some(ANDROID_NS), "textSize", 0x05, 0x1001)
        .attr_typed(Some(ANDROID_NS), "colorAccent", 0x1c, 0xff00_8000)
        .attr_typed(Some(ANDROID_NS), "configChanges", 0x11, 0x04a0)
        .start_element("activity")
        .attr_string(Some(ANDROID_NS), "name", ".MainActivity")
        .end_element("activity")
        .end_element("application")
        .end_element("manifest")
        .end_namespace("android", ANDROID_NS);

    let xml = decode_and_render(&builder);
    assert_eq!(element_names(&xml), vec!["manifest", "application", "activity"]);
    assert!(xml.contains(r#"android:versionCode="42""#));
    assert!(xml.contains(r#"android:icon="@0x7f080001""#));
    assert!(xml.contains(r#"android:debuggable="true""#));
    assert!(xml.contains(r#"android:textSize="16.0dip""#));
    assert!(xml.contains(r##"android:colorAccent="#ff008000""##));
    assert!(xml.contains(r#"android:configChanges="0x000004a0""#));
    assert!(xml.contains(r#"<activity android:name=".MainActivity"/>"#));
    assert_eq!(xml.matches("xmlns:").count(), 1);
}

#[test]
fn reserved_characters_are_escaped() {
    let mut builder = AxmlBuilder::new();
    builder
        .start_element("meta-data")
        .attr_string(None, "value", r#"a<b & "c" > 'd'"#)
        .text("if (x < y && y > z) { }")
        .end_element("meta-data");

    let xml = decode_and_render(&builder);
    assert_eq!(element_names(&xml), vec!["meta-data"]);
    assert!(!xml.contains("x < y"));
    assert!(xml.contains("&amp;&amp;"));
}

#[test]
fn namespaced_elements_get_their_prefix() {
    let mut builder = AxmlBuilder::new();
    builder
        .start_namespace("app", "http://schemas.android.com/apk/res-auto")
        .start_element("layout")
        .start_element_ns(Some("http://schemas.android.com/apk/res-auto"), "data")
        .end_element("data")
        .end_element("layout")
        .end_namespace("app", "http://schemas.android.com/apk/res-auto");

    assert_eq!(
        decode_and_render(&builder),
        r#"<layout xmlns:app="http://schemas.android.com/apk/res-auto"><app:data/></layout>"#
    );
}

#[test]
fn styled_and_unknown_chunks_do_not_change_output() {
    let mut plain = AxmlBuilder::new();
    plain.start_element("a").attr_string(None, "b", "c").end_element("a");
    let expected = decode_and_render(&plain);

    let mut noisy = AxmlBuilder::new();
    noisy
        .style_spans(vec![(0, 0, 0)])
        .start_element("a")
        .attr_string(None, "b", "c")
        .unknown_chunk(0x0666, &[0xde, 0xad, 0xbe, 0xef])
        .end_element("a");
    assert_eq!(decode_and_render(&noisy), expected);
    assert_eq!(expected, r#"<a b="c"/>"#);
}

fn render_error(builder: &AxmlBuilder) -> String {
    let doc = AxmlDocument::parse(&builder.build()).unwrap();
    render(doc.nodes(), &RenderOptions::default()).unwrap_err().to_string()
}

#[test]
fn canonical_name_does_not_collide_with_an_existing_attribute() {
    let mut builder = AxmlBuilder::new();
    builder
        .resource_attr("a1", 0x0101_0003)
        .start_element("a")
        .attr_string(None, "a1", "x")
        .attr_string(None, "name", "y")
        .end_element("a");

    let xml = decode_and_render(&builder);
    assert_eq!(xml, r#"<a a1="x" name="y"/>"#);
    assert_eq!(element_names(&xml), vec!["a"]);
}

#[test]
fn repeated_attribute_is_an_error() {
    let mut builder = AxmlBuilder::new();
    builder
        .start_element("a")
        .attr_string(None, "v", "1")
        .attr_string(None, "v", "2")
        .end_element("a");
    assert!(render_error(&builder).contains("duplicate attribute v on <a>"));
}

#[test]
fn names_that_are_not_xml_names_are_errors() {
    let mut stripped = AxmlBuilder::new();
    stripped.start_element("a").attr_string(None, "", "v").end_element("a");
    assert!(render_error(&stripped).contains("not a valid XML name"));

    let mut element = AxmlBuilder::new();
    element.start_element("0x7f0a").end_element("0x7f0a");
    assert!(render_error(&element).contains("element name \"0x7f0a\""));
}

#[test]
fn control_characters_are_errors() {
    let mut attribute = AxmlBuilder::new();
    attribute.start_element("a").attr_string(None, "v", "x\u{1}y").end_element("a");
    assert!(render_error(&attribute).contains("U+0001"));

    let mut text = AxmlBuilder::new();
    text.start_element("a").text("bell\u{7}").end_element("a");
    assert!(render_error(&text).contains("U+0007"));

    // tab, newline and carriage return are fine
    let mut whitespace = AxmlBuilder::new();
    whitespace.start_element("a").attr_string(None, "v", "x\ty\r\nz").end_element("a");
    assert_eq!(element_names(&decode_and_render(&whitespace)), vec!["a"]);
}

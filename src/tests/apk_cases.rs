use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::android::zip::ApkZipError;
use crate::discovery::ClassifierConfig;
use crate::error::Error;
use crate::tests::builders::{AxmlBuilder, ClassSpec, DexBuilder, MethodSpec, ANDROID_NS};
use crate::{parse_manifest, parse_tests, parse_tests_with_config};

fn write_apk(dir: &Path, entries: &[(&str, Vec<u8>)]) -> PathBuf {
    let path = dir.join("test.apk");
    let mut writer = ZipWriter::new(File::create(&path).unwrap());
    for (name, data) in entries {
        // mirror real packages: dex stored, everything else deflated
        let method = if name.ends_with(".dex") { CompressionMethod::Stored } else { CompressionMethod::Deflated };
        writer
            .start_file(*name, SimpleFileOptions::default().compression_method(method))
            .unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap();
    path
}

fn manifest() -> Vec<u8> {
    let mut builder = AxmlBuilder::new();
    builder
        .resource_attr("name", 0x0101_0003)
        .resource_attr("targetPackage", 0x0101_0021)
        .start_namespace("android", ANDROID_NS)
        .start_element("manifest")
        .attr_string(None, "package", "com.example.test")
        .start_element("instrumentation")
        .attr_string(Some(ANDROID_NS), "name", "androidx.test.runner.AndroidJUnitRunner")
        .attr_string(Some(ANDROID_NS), "targetPackage", "com.example")
        .end_element("instrumentation")
        .end_element("manifest")
        .end_namespace("android", ANDROID_NS);
    builder.build()
}

fn base_dex() -> Vec<u8> {
    let mut builder = DexBuilder::new();
    builder.class(
        ClassSpec::new("Lcom/example/BaseTest;")
            .extends("Landroid/test/InstrumentationTestCase;")
            .method(MethodSpec::direct("<init>", "V"))
            .method(MethodSpec::virtual_method("testBase", "V")),
    );
    builder.build()
}

fn feature_dex() -> Vec<u8> {
    let mut builder = DexBuilder::new();
    builder
        .class(
            ClassSpec::new("Lcom/example/feature/FeatureTest;")
                .extends("Lcom/example/BaseTest;")
                .method(MethodSpec::direct("<init>", "V"))
                .method(MethodSpec::virtual_method("testFeature", "V")),
        )
        .class(
            ClassSpec::new("Lcom/example/other/OtherTest;")
                .method(MethodSpec::virtual_method("works", "V").annotated("Lorg/junit/Test;")),
        );
    builder.build()
}

fn test_apk(dir: &TempDir) -> PathBuf {
    write_apk(
        dir.path(),
        &[
            ("AndroidManifest.xml", manifest()),
            ("classes2.dex", feature_dex()),
            ("classes.dex", base_dex()),
            ("res/raw/classes3.dex", b"not a dex file".to_vec()),
        ],
    )
}

#[test]
fn lists_tests_across_dex_entries() {
    let dir = TempDir::new().unwrap();
    let apk = test_apk(&dir);

    let tests: Vec<String> = parse_tests(&apk, Vec::<String>::new())
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(
        tests,
        vec![
            "com.example.BaseTest#testBase",
            "com.example.feature.FeatureTest#testFeature",
            "com.example.other.OtherTest#works",
        ]
    );

    let filtered = parse_tests(&apk, ["com.example.feature"]).unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].class_name, "com.example.feature.FeatureTest");
    assert_eq!(filtered[0].method_name, "testFeature");
    assert_eq!(filtered[0].package_name, "com.example.feature");
}

#[test]
fn custom_policy() {
    let dir = TempDir::new().unwrap();
    let apk = test_apk(&dir);
    let config = ClassifierConfig {
        test_annotations: Vec::new(),
        ..ClassifierConfig::default()
    };
    let tests = parse_tests_with_config(&apk, ["re::Other"], &config).unwrap();
    assert!(tests.is_empty());
}

#[test]
fn bad_pattern_is_reported_before_opening_the_package() {
    let err = parse_tests("/nonexistent/app.apk", ["re::[unclosed"]).unwrap_err();
    assert!(matches!(err, Error::FilterPattern { .. }), "{err}");

    let err = parse_tests("/nonexistent/app.apk", ["com.example.*"]).unwrap_err();
    assert!(matches!(err, Error::Container(ApkZipError::Io(_))), "{err}");
}

#[test]
fn package_without_dex_files() {
    let dir = TempDir::new().unwrap();
    let apk = write_apk(dir.path(), &[("AndroidManifest.xml", manifest())]);
    let err = parse_tests(&apk, Vec::<String>::new()).unwrap_err();
    assert!(matches!(err, Error::Container(ApkZipError::MissingEntry(_))), "{err}");
}

#[test]
fn corrupt_dex_entry_fails() {
    let dir = TempDir::new().unwrap();
    let apk = write_apk(
        dir.path(),
        &[("classes.dex", base_dex()), ("classes2.dex", b"dex\n035\0".to_vec())],
    );
    let err = parse_tests(&apk, Vec::<String>::new()).unwrap_err();
    match err {
        Error::Format(err) => assert!(err.to_string().contains("classes2.dex"), "{err}"),
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn decodes_the_manifest() {
    let dir = TempDir::new().unwrap();
    let apk = test_apk(&dir);

    let manifest = parse_manifest(&apk).unwrap();
    assert_eq!(manifest.package_name(), Some("com.example.test"));
    let instrumentation = manifest.instrumentation().unwrap();
    assert_eq!(instrumentation.runner.as_deref(), Some("androidx.test.runner.AndroidJUnitRunner"));
    assert_eq!(instrumentation.target_package.as_deref(), Some("com.example"));
    assert_eq!(
        manifest.xml(),
        concat!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n",
            "<manifest xmlns:android=\"http://schemas.android.com/apk/res/android\" package=\"com.example.test\">\n",
            "    <instrumentation android:name=\"androidx.test.runner.AndroidJUnitRunner\" android:targetPackage=\"com.example\"/>\n",
            "</manifest>"
        )
    );
}

#[test]
fn missing_manifest_is_a_container_error() {
    let dir = TempDir::new().unwrap();
    let apk = write_apk(dir.path(), &[("classes.dex", base_dex())]);
    let err = parse_manifest(&apk).unwrap_err();
    assert!(matches!(err, Error::Container(ApkZipError::MissingEntry(ref name)) if name == "AndroidManifest.xml"));
}

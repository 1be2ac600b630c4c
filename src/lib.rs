//! # APK bitminer
//!
//! A library to list the test methods in an Android package and to decode its
//! binary `AndroidManifest.xml` back into XML text.
//!
//! Everything here is read-only. The package is opened once, its `classes*.dex`
//! blobs are decoded in parallel and classified together, so a test class may
//! extend a base class defined in another dex file of the same package.
//!
#[macro_use]
pub mod error;

pub mod android;
pub mod dex;
pub mod discovery;
pub mod reader;

#[cfg(test)]
mod tests;

use std::path::Path;

use crate::android::{AndroidManifest, ApkFile};
use crate::discovery::{ClassifierConfig, TestDescriptor, TestDiscovery};

pub use crate::error::{ApkResult, Error, FormatError};

/// Lists the tests in an APK, using the default classifier policy.
///
/// `patterns` restrict the result to matching classes or packages; with no
/// patterns every test is returned.
///
/// # Examples
///
/// ```no_run
///  use apk_bitminer::parse_tests;
///
///  let tests = parse_tests("app-debug-androidTest.apk", ["com.example.*"]).unwrap();
///  for test in tests {
///      println!("{}", test);
///  }
/// ```
pub fn parse_tests<P, I, S>(apk: P, patterns: I) -> ApkResult<Vec<TestDescriptor>>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parse_tests_with_config(apk, patterns, &ClassifierConfig::default())
}

/// Like [`parse_tests`], with a caller-supplied classifier policy.
pub fn parse_tests_with_config<P, I, S>(apk: P, patterns: I, config: &ClassifierConfig) -> ApkResult<Vec<TestDescriptor>>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    // patterns are checked before the package is touched
    let discovery = TestDiscovery::new(patterns, config)?;
    let apk = ApkFile::from_file(apk)?;
    let entries = apk.dex_entries()?;
    let blobs: Vec<(&str, &[u8])> = entries
        .iter()
        .map(|entry| (entry.name.as_str(), entry.data.as_slice()))
        .collect();
    discovery.discover(&blobs)
}

/// Decodes the `AndroidManifest.xml` of an APK.
///
/// # Examples
///
/// ```no_run
///  use apk_bitminer::parse_manifest;
///
///  let manifest = parse_manifest("app.apk").unwrap();
///  println!("{}", manifest.xml());
/// ```
pub fn parse_manifest(apk: impl AsRef<Path>) -> ApkResult<AndroidManifest> {
    let apk = ApkFile::from_file(apk)?;
    let entry = apk.manifest()?;
    Ok(AndroidManifest::from_bytes(&entry.data)?)
}

//! Which classes and annotations count as tests.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// JUnit3 base classes shipped with the Android SDK.
pub const JUNIT3_BASE_CLASSES: [&str; 15] = [
    "Ljunit/framework/TestCase;",
    "Landroid/test/ActivityInstrumentationTestCase;",
    "Landroid/test/ActivityInstrumentationTestCase2;",
    "Landroid/test/ActivityTestCase;",
    "Landroid/test/ActivityUnitTestCase;",
    "Landroid/test/AndroidTestCase;",
    "Landroid/test/ApplicationTestCase;",
    "Landroid/test/FailedToCreateTests;",
    "Landroid/test/InstrumentationTestCase;",
    "Landroid/test/LoaderTestCase;",
    "Landroid/test/ProviderTestCase;",
    "Landroid/test/ProviderTestCase2;",
    "Landroid/test/ServiceTestCase;",
    "Landroid/test/SingleLaunchActivityTestCase;",
    "Landroid/test/SyncBaseInstrumentation;",
];

pub const JUNIT4_TEST_ANNOTATION: &str = "Lorg/junit/Test;";
pub const JUNIT4_IGNORE_ANNOTATION: &str = "Lorg/junit/Ignore;";

/// Classification policy.
///
/// Names may be given as descriptors (`Ljunit/framework/TestCase;`) or dotted
/// (`junit.framework.TestCase`). Missing keys in a TOML file keep their defaults.
///
/// ```toml
/// test_base_classes = ["junit.framework.TestCase", "com.example.BaseTest"]
/// test_annotations = ["org.junit.Test", "org.testng.annotations.Test"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig
{
    /// A class whose superclass chain reaches one of these is a JUnit3 test case.
    pub test_base_classes: Vec<String>,
    /// Methods (or whole classes) carrying one of these are tests.
    pub test_annotations: Vec<String>,
    /// Methods (or whole classes) carrying one of these are never tests.
    pub ignore_annotations: Vec<String>,
    /// Name prefix of JUnit3 test methods.
    pub test_method_prefix: String,
    /// How many superclass links to follow before giving up.
    pub max_hierarchy_depth: usize,
}

impl Default for ClassifierConfig
{
    fn default() -> Self
    {
        ClassifierConfig {
            test_base_classes: JUNIT3_BASE_CLASSES.iter().map(|s| s.to_string()).collect(),
            test_annotations: vec![JUNIT4_TEST_ANNOTATION.to_string()],
            ignore_annotations: vec![JUNIT4_IGNORE_ANNOTATION.to_string()],
            test_method_prefix: "test".to_string(),
            max_hierarchy_depth: 64,
        }
    }
}

impl ClassifierConfig
{
    pub fn from_toml_str(text: &str) -> Result<ClassifierConfig, Error>
    {
        toml::from_str(text).map_err(|err| Error::Config(err.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<ClassifierConfig, Error>
    {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|err| Error::Config(format!("cannot read {}: {}", path.display(), err)))?;
        ClassifierConfig::from_toml_str(&text)
    }
}

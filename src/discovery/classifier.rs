//! Decide which decoded methods are tests.

use std::collections::{HashMap, HashSet};
use std::fmt;

use log::{debug, warn};
use serde::Serialize;

use crate::dex::{descriptor, AccessFlags, DexClass, DexMethod, MethodKind};
use crate::discovery::config::ClassifierConfig;
use crate::discovery::filter::PackageFilter;

/// A test method, as understood by `am instrument -e class`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TestDescriptor
{
    /// Dotted class name, e.g. `com.example.FooTest`.
    pub class_name: String,
    pub method_name: String,
    /// Dotted package, empty for the default package.
    pub package_name: String,
}

impl fmt::Display for TestDescriptor
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}#{}", self.class_name, self.method_name)
    }
}

/// Classification policy with every name normalized to a descriptor.
#[derive(Debug, Clone)]
pub struct TestClassifier
{
    base_classes: HashSet<String>,
    test_annotations: HashSet<String>,
    ignore_annotations: HashSet<String>,
    method_prefix: String,
    max_depth: usize,
}

impl Default for TestClassifier
{
    fn default() -> Self
    {
        TestClassifier::new(&ClassifierConfig::default())
    }
}

impl TestClassifier
{
    pub fn new(config: &ClassifierConfig) -> TestClassifier
    {
        let normalize = |names: &[String]| names.iter().map(|n| descriptor(n)).collect::<HashSet<_>>();
        TestClassifier {
            base_classes: normalize(&config.test_base_classes),
            test_annotations: normalize(&config.test_annotations),
            ignore_annotations: normalize(&config.ignore_annotations),
            method_prefix: config.test_method_prefix.clone(),
            max_depth: config.max_hierarchy_depth,
        }
    }

    /// Classify the classes of one or more dex blobs as a single namespace.
    ///
    /// Results follow blob order, then class_def order, then method order.
    pub fn classify(&self, blobs: &[Vec<DexClass>], filter: &PackageFilter) -> Vec<TestDescriptor>
    {
        let mut index: HashMap<&str, &DexClass> = HashMap::new();
        for class in blobs.iter().flatten()
        {
            if index.contains_key(class.descriptor.as_str())
            {
                warn!("[classify] duplicate definition of {}, keeping the first", class.descriptor);
                continue;
            }
            index.insert(class.descriptor.as_str(), class);
        }

        let mut tests = Vec::new();
        for class in blobs.iter().flatten()
        {
            // only the definition that won the index is classified
            if !index.get(class.descriptor.as_str()).is_some_and(|c| std::ptr::eq(*c, class))
            {
                continue;
            }
            let class_name = class.java_name();
            if !filter.matches(&class_name)
            {
                continue;
            }
            self.classify_class(class, &index, &class_name, &mut tests);
        }
        tests
    }

    fn classify_class(
        &self,
        class: &DexClass,
        index: &HashMap<&str, &DexClass>,
        class_name: &str,
        tests: &mut Vec<TestDescriptor>,
    )
    {
        if self.is_ignored(&class.annotations)
        {
            debug!("[classify] {} is ignored", class_name);
            return;
        }
        let junit3 = !class.is_abstract() && self.extends_test_base(class, index);
        let annotated_class = class.annotations.iter().any(|a| self.test_annotations.contains(a));

        let package_name = class.package_name();
        for method in &class.methods
        {
            if method.is_constructor() || self.is_ignored(&method.annotations)
            {
                continue;
            }
            let accepted = method.annotations.iter().any(|a| self.test_annotations.contains(a))
                || (junit3 && self.is_junit3_method(method))
                || (annotated_class && is_public_instance_method(method));
            if accepted
            {
                tests.push(TestDescriptor {
                    class_name: class_name.to_string(),
                    method_name: method.name.clone(),
                    package_name: package_name.clone(),
                });
            }
        }
    }

    fn is_ignored(&self, annotations: &[String]) -> bool
    {
        annotations.iter().any(|a| self.ignore_annotations.contains(a))
    }

    /// `public void testXxx()`, declared virtual.
    fn is_junit3_method(&self, method: &DexMethod) -> bool
    {
        method.kind == MethodKind::Virtual
            && method.access_flags.contains(AccessFlags::PUBLIC)
            && method.name.starts_with(&self.method_prefix)
            && method.shorty == "V"
    }

    /// Walk the superclass chain through `index` looking for a known test base.
    ///
    /// The walk stops at the first superclass defined outside the supplied
    /// blobs, and after `max_depth` links.
    pub fn extends_test_base(&self, class: &DexClass, index: &HashMap<&str, &DexClass>) -> bool
    {
        let mut current = class.superclass.as_deref();
        let mut depth = 0;
        while let Some(name) = current
        {
            if self.base_classes.contains(name)
            {
                return true;
            }
            depth += 1;
            if depth > self.max_depth
            {
                warn!("[classify] superclass chain of {} is deeper than {}", class.descriptor, self.max_depth);
                return false;
            }
            current = match index.get(name)
            {
                Some(parent) => parent.superclass.as_deref(),
                None => return false,
            };
        }
        false
    }
}

fn is_public_instance_method(method: &DexMethod) -> bool
{
    method.access_flags.contains(AccessFlags::PUBLIC) && !method.access_flags.contains(AccessFlags::STATIC)
}

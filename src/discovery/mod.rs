//! Test discovery over one or more dex blobs.

pub mod classifier;
pub mod config;
pub mod filter;

use log::info;
use rayon::prelude::*;

use crate::dex::{DexClass, DexFile};
use crate::error::{ApkResult, FormatError, ResultExt};

pub use classifier::{TestClassifier, TestDescriptor};
pub use config::ClassifierConfig;
pub use filter::{PackageFilter, PackagePattern};

/// Decode every class of a single dex blob.
pub fn decode_classes(blob: &[u8]) -> Result<Vec<DexClass>, FormatError>
{
    DexFile::parse(blob)?.classes()
}

/// A package filter and classification policy, ready to run over dex blobs.
#[derive(Debug, Clone)]
pub struct TestDiscovery
{
    filter: PackageFilter,
    classifier: TestClassifier,
}

impl TestDiscovery
{
    /// Patterns are compiled here, so a bad pattern fails before anything is decoded.
    pub fn new<I, S>(patterns: I, config: &ClassifierConfig) -> ApkResult<TestDiscovery>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(TestDiscovery {
            filter: PackageFilter::new(patterns)?,
            classifier: TestClassifier::new(config),
        })
    }

    pub fn filter(&self) -> &PackageFilter
    {
        &self.filter
    }

    /// Find the tests in a set of named dex blobs.
    ///
    /// Blobs are decoded in parallel. Classification only starts once every
    /// blob has decoded, and any failure fails the whole call.
    pub fn discover(&self, blobs: &[(&str, &[u8])]) -> ApkResult<Vec<TestDescriptor>>
    {
        let decoded = blobs
            .par_iter()
            .map(|(name, bytes)| decode_classes(bytes).context(|| name.to_string()))
            .collect::<Result<Vec<_>, _>>()?;

        let tests = self.classifier.classify(&decoded, &self.filter);
        info!(
            "found {} tests in {} classes across {} dex files",
            tests.len(),
            decoded.iter().map(Vec::len).sum::<usize>(),
            blobs.len()
        );
        Ok(tests)
    }
}

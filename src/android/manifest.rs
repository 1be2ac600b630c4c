use serde::Serialize;

use crate::android::binary_xml::{AxmlDocument, ElementStart};
use crate::android::render::{render, RenderOptions};
use crate::error::{FormatError, ResultExt};

/// The `<instrumentation>` declaration of a test package.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Instrumentation {
    pub runner: Option<String>,
    pub target_package: Option<String>,
    pub label: Option<String>,
    pub functional_test: Option<bool>,
    pub handle_profiling: Option<bool>,
}

/// SDK levels from `<uses-sdk>`. Kept as text, since preview SDKs use codenames.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UsesSdk {
    pub min_sdk_version: Option<String>,
    pub target_sdk_version: Option<String>,
}

/// A decoded `AndroidManifest.xml` and its rendered text.
#[derive(Clone, Debug)]
pub struct AndroidManifest {
    document: AxmlDocument,
    xml: String,
}

impl AndroidManifest {
    pub fn from_bytes(data: &[u8]) -> Result<Self, FormatError> {
        let document = AxmlDocument::parse(data).context(|| "AndroidManifest.xml")?;
        let xml = render(document.nodes(), &RenderOptions::pretty()).context(|| "AndroidManifest.xml")?;
        Ok(AndroidManifest { document, xml })
    }

    /// The manifest as indented XML text.
    pub fn xml(&self) -> &str {
        &self.xml
    }

    pub fn document(&self) -> &AxmlDocument {
        &self.document
    }

    pub fn package_name(&self) -> Option<&str> {
        self.document
            .root_element()
            .and_then(|root| root.attribute("package"))
            .and_then(|attr| attr.value.as_str())
    }

    pub fn instrumentation(&self) -> Option<Instrumentation> {
        let element = self.child("instrumentation").next()?;
        Some(Instrumentation {
            runner: text_attribute(element, "name"),
            target_package: text_attribute(element, "targetPackage"),
            label: text_attribute(element, "label"),
            functional_test: element.attribute("functionalTest").and_then(|a| a.value.as_bool()),
            handle_profiling: element.attribute("handleProfiling").and_then(|a| a.value.as_bool()),
        })
    }

    pub fn uses_sdk(&self) -> Option<UsesSdk> {
        let element = self.child("uses-sdk").next()?;
        Some(UsesSdk {
            min_sdk_version: text_attribute(element, "minSdkVersion"),
            target_sdk_version: text_attribute(element, "targetSdkVersion"),
        })
    }

    /// Names of the `<uses-permission>` entries, in document order.
    pub fn permissions(&self) -> Vec<String> {
        self.child("uses-permission")
            .filter_map(|element| text_attribute(element, "name"))
            .collect()
    }

    /// Direct children of the root element with the given name.
    fn child<'s>(&'s self, name: &'s str) -> impl Iterator<Item = &'s ElementStart> + 's {
        self.document
            .elements()
            .filter(move |(depth, element)| *depth == 1 && element.name == name)
            .map(|(_, element)| element)
    }
}

fn text_attribute(element: &ElementStart, name: &str) -> Option<String> {
    element.attribute(name).map(|attr| attr.value.render())
}

//! APK container access and Android binary XML decoding.

pub mod binary_xml;
pub mod manifest;
pub mod render;
pub mod resources;
pub mod value;
pub mod zip;

pub use binary_xml::{Attribute, AxmlDocument, AxmlNode, ElementEnd, ElementStart, Namespace, Text};
pub use manifest::{AndroidManifest, Instrumentation, UsesSdk};
pub use render::{render, RenderOptions};
pub use value::{TypedValue, ValueKind};
pub use zip::{ApkEntry, ApkFile, ApkZipError};

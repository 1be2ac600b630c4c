//! Read-only decoding of Dalvik executable (dex) files.

pub mod annotations;
pub mod class_def;
pub mod dex_file;
pub mod encoded_values;
pub(crate) mod leb;

pub use class_def::{AccessFlags, DexClass, DexField, DexMethod, MethodKind};
pub use dex_file::DexFile;

/// Convert a class descriptor to its dotted Java name.
///
/// `Lcom/example/Foo;` becomes `com.example.Foo`. Anything that is not a class
/// descriptor (primitives, arrays) is returned unchanged.
pub fn java_name(descriptor: &str) -> String
{
    match descriptor.strip_prefix('L').and_then(|s| s.strip_suffix(';'))
    {
        Some(inner) => inner.replace('/', "."),
        None => descriptor.to_string(),
    }
}

/// Convert a dotted Java class name to a descriptor. Descriptors pass through.
pub fn descriptor(name: &str) -> String
{
    if name.starts_with('L') && name.ends_with(';')
    {
        name.to_string()
    }
    else
    {
        format!("L{};", name.replace('.', "/"))
    }
}

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::Path;

use log::debug;
use zip::read::ZipArchive;

pub const MANIFEST_ENTRY: &str = "AndroidManifest.xml";

/// Result alias for APK (ZIP) operations.
pub type ApkZipResult<T> = Result<T, ApkZipError>;

/// Errors surfaced while reading an APK container.
#[derive(Debug)]
pub enum ApkZipError {
    Io(io::Error),
    Zip(zip::result::ZipError),
    MissingEntry(String),
}

impl std::fmt::Display for ApkZipError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApkZipError::Io(err) => write!(f, "I/O error: {err}"),
            ApkZipError::Zip(err) => write!(f, "ZIP error: {err}"),
            ApkZipError::MissingEntry(name) => write!(f, "no {name} entry in package"),
        }
    }
}

impl std::error::Error for ApkZipError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApkZipError::Io(err) => Some(err),
            ApkZipError::Zip(err) => Some(err),
            ApkZipError::MissingEntry(_) => None,
        }
    }
}

impl From<io::Error> for ApkZipError {
    fn from(value: io::Error) -> Self {
        ApkZipError::Io(value)
    }
}

impl From<zip::result::ZipError> for ApkZipError {
    fn from(value: zip::result::ZipError) -> Self {
        ApkZipError::Zip(value)
    }
}

/// A single file entry stored in [`ApkFile`].
#[derive(Clone, Debug)]
pub struct ApkEntry {
    pub name: String,
    pub data: Vec<u8>,
}

/// The files of an APK, loaded into memory.
///
/// Entries are kept in a `BTreeMap`, so iteration order is deterministic.
pub struct ApkFile {
    entries: BTreeMap<String, ApkEntry>,
}

impl ApkFile {
    /// Load an APK from disk into memory.
    pub fn from_file(path: impl AsRef<Path>) -> ApkZipResult<Self> {
        let file = File::open(path.as_ref())?;
        ApkFile::from_reader(file)
    }

    pub fn from_reader<R: Read + Seek>(reader: R) -> ApkZipResult<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let mut entries = BTreeMap::new();
        for idx in 0..archive.len() {
            let mut entry = archive.by_index(idx)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let mut data = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut data)?;
            entries.insert(name.clone(), ApkEntry { name, data });
        }
        debug!("[apk] loaded {} entries", entries.len());
        Ok(ApkFile { entries })
    }

    pub fn entry(&self, name: &str) -> Option<&ApkEntry> {
        self.entries.get(name)
    }

    /// Like [`ApkFile::entry`], but a missing entry is an error.
    pub fn require(&self, name: &str) -> ApkZipResult<&ApkEntry> {
        self.entries
            .get(name)
            .ok_or_else(|| ApkZipError::MissingEntry(name.to_string()))
    }

    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn manifest(&self) -> ApkZipResult<&ApkEntry> {
        self.require(MANIFEST_ENTRY)
    }

    /// The top-level `classes.dex`, `classes2.dex`, ... entries in load order.
    pub fn dex_entries(&self) -> ApkZipResult<Vec<&ApkEntry>> {
        let mut numbered: Vec<(u32, &ApkEntry)> = self
            .entries
            .values()
            .filter_map(|entry| dex_number(&entry.name).map(|n| (n, entry)))
            .collect();
        if numbered.is_empty() {
            return Err(ApkZipError::MissingEntry("classes*.dex".to_string()));
        }
        numbered.sort_by_key(|(n, _)| *n);
        Ok(numbered.into_iter().map(|(_, entry)| entry).collect())
    }
}

/// `classes.dex` is 1, `classes<N>.dex` is N. Anything else is not a dex entry.
fn dex_number(name: &str) -> Option<u32> {
    let digits = name.strip_prefix("classes")?.strip_suffix(".dex")?;
    if digits.is_empty() {
        return Some(1);
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match digits.parse::<u32>() {
        Ok(n) if n >= 2 => Some(n),
        _ => None,
    }
}

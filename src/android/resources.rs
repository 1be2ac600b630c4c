//! Android framework attribute ids and the per-document resource map.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// `android:` attribute ids from the framework's public resource table.
static ANDROID_ATTRIBUTES: Lazy<HashMap<u32, &'static str>> = Lazy::new(|| {
    [
        (0x0101_0000, "theme"),
        (0x0101_0001, "label"),
        (0x0101_0002, "icon"),
        (0x0101_0003, "name"),
        (0x0101_0004, "manageSpaceActivity"),
        (0x0101_0005, "allowClearUserData"),
        (0x0101_0006, "permission"),
        (0x0101_0007, "readPermission"),
        (0x0101_0008, "writePermission"),
        (0x0101_0009, "protectionLevel"),
        (0x0101_000a, "permissionGroup"),
        (0x0101_000b, "sharedUserId"),
        (0x0101_000c, "hasCode"),
        (0x0101_000d, "persistent"),
        (0x0101_000e, "enabled"),
        (0x0101_000f, "debuggable"),
        (0x0101_0010, "exported"),
        (0x0101_0011, "process"),
        (0x0101_0012, "taskAffinity"),
        (0x0101_0013, "multiprocess"),
        (0x0101_0014, "finishOnTaskLaunch"),
        (0x0101_0015, "clearTaskOnLaunch"),
        (0x0101_0016, "stateNotNeeded"),
        (0x0101_0017, "excludeFromRecents"),
        (0x0101_0018, "authorities"),
        (0x0101_0019, "syncable"),
        (0x0101_001a, "initOrder"),
        (0x0101_001b, "grantUriPermissions"),
        (0x0101_001c, "priority"),
        (0x0101_001d, "launchMode"),
        (0x0101_001e, "screenOrientation"),
        (0x0101_001f, "configChanges"),
        (0x0101_0020, "description"),
        (0x0101_0021, "targetPackage"),
        (0x0101_0022, "handleProfiling"),
        (0x0101_0023, "functionalTest"),
        (0x0101_0024, "value"),
        (0x0101_0025, "resource"),
        (0x0101_0026, "mimeType"),
        (0x0101_0027, "scheme"),
        (0x0101_0028, "host"),
        (0x0101_0029, "port"),
        (0x0101_002a, "path"),
        (0x0101_002b, "pathPrefix"),
        (0x0101_002c, "pathPattern"),
        (0x0101_002d, "action"),
        (0x0101_002e, "data"),
        (0x0101_002f, "targetClass"),
        (0x0101_020c, "minSdkVersion"),
        (0x0101_021b, "versionCode"),
        (0x0101_021c, "versionName"),
        (0x0101_0270, "targetSdkVersion"),
        (0x0101_0271, "maxSdkVersion"),
        (0x0101_0280, "allowBackup"),
        (0x0101_02b7, "installLocation"),
        (0x0101_035a, "largeHeap"),
        (0x0101_03af, "supportsRtl"),
    ]
    .into_iter()
    .collect()
});

/// Canonical local name of a framework attribute id.
pub fn android_attribute_name(resource_id: u32) -> Option<&'static str> {
    ANDROID_ATTRIBUTES.get(&resource_id).copied()
}

/// Resource ids of the `RES_XML_RESOURCE_MAP_TYPE` chunk, positionally aligned
/// with the first entries of the string pool.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceMap {
    ids: Vec<u32>,
}

impl ResourceMap {
    pub fn new(ids: Vec<u32>) -> Self {
        ResourceMap { ids }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Resource id attached to string-pool entry `string_idx`, if any.
    pub fn resource_id(&self, string_idx: u32) -> Option<u32> {
        match self.ids.get(string_idx as usize) {
            Some(0) | None => None,
            Some(id) => Some(*id),
        }
    }

    /// Canonical attribute name for string-pool entry `string_idx`.
    pub fn canonical_name(&self, string_idx: u32) -> Option<&'static str> {
        self.resource_id(string_idx).and_then(android_attribute_name)
    }
}

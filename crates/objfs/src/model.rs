//! Object model shared by the adapter and storage backends.

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Metadata record for a file or directory, as known to the backend.
///
/// Backends identify objects either by an opaque `id` or by their native
/// `path`; the adapter never interprets either and hands the object back
/// unchanged on later calls.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    /// Opaque backend identifier
    pub id: String,
    /// Backend-native path
    pub path: String,
    /// Backend-native name
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: SystemTime,
    /// Creation time
    pub created: SystemTime,
    /// Whether the object is a directory
    pub is_folder: bool,
}

impl Default for Object {
    fn default() -> Self {
        Self {
            id: String::new(),
            path: String::new(),
            name: String::new(),
            size: 0,
            modified: UNIX_EPOCH,
            created: UNIX_EPOCH,
            is_folder: false,
        }
    }
}

impl Object {
    /// A directory object with the given name.
    pub fn folder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_folder: true,
            ..Self::default()
        }
    }

    /// A file object with the given name and size.
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            ..Self::default()
        }
    }
}

/// Character substitutions applied to backend-native names before display.
///
/// Backends may allow characters in names that cannot appear in a path
/// segment; the default maps `/` to `|`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct NameMapping(BTreeMap<String, String>);

impl Default for NameMapping {
    fn default() -> Self {
        let mut map = BTreeMap::new();
        map.insert("/".to_string(), "|".to_string());
        Self(map)
    }
}

impl NameMapping {
    /// A mapping that leaves names untouched.
    pub fn identity() -> Self {
        Self(BTreeMap::new())
    }

    /// Build from explicit substitutions.
    pub fn new(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }

    /// Apply every substitution to `name`.
    pub fn apply(&self, name: &str) -> String {
        let mut out = name.to_string();
        for (from, to) in &self.0 {
            if !from.is_empty() {
                out = out.replace(from.as_str(), to);
            }
        }
        out
    }
}

/// An [`Object`] together with the name it is displayed under.
///
/// Wrapping never copies the object: `Entry` holds it behind an `Arc`, and
/// [`Entry::object`] returns the backend's original record for later calls.
#[derive(Debug, Clone)]
pub struct Entry {
    name: String,
    obj: Arc<Object>,
}

impl Entry {
    /// Wrap an object under an explicit display name.
    pub fn with_name(name: impl Into<String>, obj: impl Into<Arc<Object>>) -> Self {
        Self {
            name: name.into(),
            obj: obj.into(),
        }
    }

    /// Wrap an object under its mapped native name.
    pub fn mapped(obj: impl Into<Arc<Object>>, mapping: &NameMapping) -> Self {
        let obj = obj.into();
        Self {
            name: mapping.apply(&obj.name),
            obj,
        }
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The unwrapped backend object.
    pub fn object(&self) -> &Object {
        &self.obj
    }

    pub fn is_dir(&self) -> bool {
        self.obj.is_folder
    }

    pub fn size(&self) -> u64 {
        self.obj.size
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.obj.is_folder {
            write!(f, "{}/", self.name)
        } else {
            write!(f, "{} ({} bytes)", self.name, self.obj.size)
        }
    }
}

/// Options forwarded to [`Storage::list`](crate::Storage::list).
#[derive(Debug, Clone, Default)]
pub struct ListArgs {
    /// Ask the backend to bypass any cache of its own.
    pub refresh: bool,
}

/// Options forwarded to [`Storage::link`](crate::Storage::link).
#[derive(Debug, Clone, Default)]
pub struct LinkArgs {
    /// Request headers the backend may need to sign or forward.
    pub header: HashMap<String, String>,
}

/// A synthetic object plus the bytes to upload for it.
#[derive(Debug, Clone)]
pub struct FileStream {
    /// Object describing the upload
    pub obj: Object,
    data: Vec<u8>,
}

impl FileStream {
    pub fn new(obj: Object, data: Vec<u8>) -> Self {
        Self { obj, data }
    }

    /// Content as a byte slice.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Content as an async reader.
    pub fn reader(&self) -> std::io::Cursor<&[u8]> {
        std::io::Cursor::new(self.data.as_slice())
    }

    /// Take the content.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

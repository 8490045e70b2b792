//! Adapter configuration.
//!
//! # Defaults
//!
//! | Field | Default | Purpose |
//! |-------|---------|---------|
//! | `base_dir` | `/juicefs` | Namespace prefix every caller path is joined under |
//! | `root_name` | `root` | Display name of the backend root |
//! | `name_mapping` | `{"/": "\|"}` | Substitutions applied to backend-native names |

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::NameMapping;
use crate::vpath;

/// Default namespace prefix.
pub const DEFAULT_BASE_DIR: &str = "/juicefs";

/// Default display name of the backend root.
pub const DEFAULT_ROOT_NAME: &str = "root";

/// Adapter configuration.
///
/// # Example
///
/// ```rust
/// use objfs::FsConfig;
///
/// let config = FsConfig::from_json(r#"{"base_dir": "/volumes/data"}"#).unwrap();
/// assert_eq!(config.base_dir, "/volumes/data");
/// assert_eq!(config.root_name, "root");
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FsConfig {
    /// Namespace prefix, cleaned to an absolute path.
    pub base_dir: String,
    /// Display name of the backend root.
    pub root_name: String,
    /// Substitutions applied to backend-native names.
    pub name_mapping: NameMapping,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            base_dir: DEFAULT_BASE_DIR.to_string(),
            root_name: DEFAULT_ROOT_NAME.to_string(),
            name_mapping: NameMapping::default(),
        }
    }
}

impl FsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: FsConfig = serde_json::from_str(json)?;
        config.validated()
    }

    pub fn base_dir(mut self, base_dir: impl Into<String>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn root_name(mut self, root_name: impl Into<String>) -> Self {
        self.root_name = root_name.into();
        self
    }

    pub fn name_mapping(mut self, mapping: NameMapping) -> Self {
        self.name_mapping = mapping;
        self
    }

    /// Clean `base_dir` and reject values the adapter cannot work with.
    pub fn validated(mut self) -> Result<Self> {
        self.base_dir = vpath::clean(&self.base_dir);
        if self.root_name.is_empty() {
            return Err(Error::Configuration("root_name must not be empty".to_string()));
        }
        Ok(self)
    }
}

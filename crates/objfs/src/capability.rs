//! Capability dispatch.
//!
//! Backends advertise optional operations through the `as_*` accessors on
//! [`Storage`]. This module turns those answers into tagged variants at each
//! call site:
//!
//! - When a result-returning and a plain variant both exist, the
//!   result-returning one wins.
//! - When neither exists the caller gets [`Error::NotImplemented`].
//! - Nothing is cached; the backend is asked again on every call.

use std::fmt;

use crate::driver::{GetRooter, Getter, Mkdir, MkdirResult, Put, PutResult, Remove, Storage};
use crate::error::{Error, Result};

/// Abstract backend operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Remove,
    Put,
    MakeDir,
    Get,
    GetRoot,
    RootId,
    RootPath,
}

impl Capability {
    pub const ALL: [Capability; 7] = [
        Capability::Remove,
        Capability::Put,
        Capability::MakeDir,
        Capability::Get,
        Capability::GetRoot,
        Capability::RootId,
        Capability::RootPath,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Remove => "remove",
            Capability::Put => "put",
            Capability::MakeDir => "mkdir",
            Capability::Get => "get",
            Capability::GetRoot => "get_root",
            Capability::RootId => "root_id",
            Capability::RootPath => "root_path",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upload variant supported by a backend.
pub enum PutVariant<'a> {
    WithResult(&'a dyn PutResult),
    Plain(&'a dyn Put),
}

/// Directory-creation variant supported by a backend.
pub enum MkdirVariant<'a> {
    WithResult(&'a dyn MkdirResult),
    Plain(&'a dyn Mkdir),
}

/// How the root directory is described, in priority order.
pub enum RootStrategy<'a> {
    /// Backend returns the root object itself.
    Getter(&'a dyn GetRooter),
    /// Backend declares the root's ID.
    Id(String),
    /// Backend declares the root's native path.
    Path(String),
}

impl RootStrategy<'_> {
    pub fn capability(&self) -> Capability {
        match self {
            RootStrategy::Getter(_) => Capability::GetRoot,
            RootStrategy::Id(_) => Capability::RootId,
            RootStrategy::Path(_) => Capability::RootPath,
        }
    }
}

pub fn remove(storage: &dyn Storage) -> Result<&dyn Remove> {
    storage
        .as_remove()
        .ok_or(Error::NotImplemented(Capability::Remove))
}

pub fn put(storage: &dyn Storage) -> Result<PutVariant<'_>> {
    if let Some(p) = storage.as_put_result() {
        Ok(PutVariant::WithResult(p))
    } else if let Some(p) = storage.as_put() {
        Ok(PutVariant::Plain(p))
    } else {
        Err(Error::NotImplemented(Capability::Put))
    }
}

pub fn mkdir(storage: &dyn Storage) -> Result<MkdirVariant<'_>> {
    if let Some(m) = storage.as_mkdir_result() {
        Ok(MkdirVariant::WithResult(m))
    } else if let Some(m) = storage.as_mkdir() {
        Ok(MkdirVariant::Plain(m))
    } else {
        Err(Error::NotImplemented(Capability::MakeDir))
    }
}

/// Direct getter, if any. Absence is not an error: listing is the fallback.
pub fn getter(storage: &dyn Storage) -> Option<&dyn Getter> {
    storage.as_getter()
}

/// Pick the root strategy.
///
/// A backend that cannot describe its root at all is misconfigured, which
/// is reported as [`Error::Configuration`] rather than `NotImplemented`.
pub fn root(storage: &dyn Storage) -> Result<RootStrategy<'_>> {
    if let Some(g) = storage.as_root_getter() {
        Ok(RootStrategy::Getter(g))
    } else if let Some(id) = storage.root_id() {
        Ok(RootStrategy::Id(id))
    } else if let Some(path) = storage.root_path() {
        Ok(RootStrategy::Path(path))
    } else {
        Err(Error::Configuration(
            "please implement root path, root id or root getter".to_string(),
        ))
    }
}

/// Whether the backend implements `capability` in any variant.
pub fn supports(storage: &dyn Storage, capability: Capability) -> bool {
    match capability {
        Capability::Remove => storage.as_remove().is_some(),
        Capability::Put => storage.as_put_result().is_some() || storage.as_put().is_some(),
        Capability::MakeDir => storage.as_mkdir_result().is_some() || storage.as_mkdir().is_some(),
        Capability::Get => storage.as_getter().is_some(),
        Capability::GetRoot => storage.as_root_getter().is_some(),
        Capability::RootId => storage.root_id().is_some(),
        Capability::RootPath => storage.root_path().is_some(),
    }
}

/// Point-in-time view of what a backend supports, for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities(Vec<Capability>);

impl Capabilities {
    pub fn detect(storage: &dyn Storage) -> Self {
        Self(
            Capability::ALL
                .into_iter()
                .filter(|c| supports(storage, *c))
                .collect(),
        )
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(Capability::as_str).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

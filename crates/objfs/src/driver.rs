//! Storage backend contract.
//!
//! This module provides the [`Storage`] trait that object-storage backends
//! implement, plus one small trait per optional capability.
//!
//! # Required vs Optional
//!
//! Every backend can list a directory and issue a transfer link for a file.
//! Everything else is optional and advertised through an accessor returning
//! `Option<&dyn Capability>`:
//!
//! | Capability | Trait | Accessor |
//! |------------|-------|----------|
//! | Delete an object | [`Remove`] | [`Storage::as_remove`] |
//! | Upload, returning the new object | [`PutResult`] | [`Storage::as_put_result`] |
//! | Upload | [`Put`] | [`Storage::as_put`] |
//! | Create directory, returning it | [`MkdirResult`] | [`Storage::as_mkdir_result`] |
//! | Create directory | [`Mkdir`] | [`Storage::as_mkdir`] |
//! | Resolve a path without listing | [`Getter`] | [`Storage::as_getter`] |
//! | Describe the root directly | [`GetRooter`] | [`Storage::as_root_getter`] |
//! | Root identified by ID | - | [`Storage::root_id`] |
//! | Root identified by native path | - | [`Storage::root_path`] |
//!
//! The adapter never caches these answers: the
//! [capability dispatcher](crate::capability) asks again at every call site.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                    Caller                        │
//! │          (read / write / delete by path)         │
//! └───────────────────────┬─────────────────────────┘
//!                         │ uses
//! ┌───────────────────────▼─────────────────────────┐
//! │                    ObjFs                         │
//! │   locator · root resolver · coalesced listing    │
//! └───────────────────────┬─────────────────────────┘
//!                         │ dispatches through
//!                  ┌──────▼──────┐
//!                  │   Storage   │
//!                  │ (your impl) │
//!                  └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use objfs::{async_trait, Link, LinkArgs, ListArgs, Object, Put, Result, Storage, FileStream};
//!
//! struct Bucket { /* client handle */ }
//!
//! #[async_trait]
//! impl Storage for Bucket {
//!     async fn list(&self, dir: &Object, _args: &ListArgs) -> Result<Vec<Object>> {
//!         self.list_prefix(&dir.path).await
//!     }
//!
//!     async fn link(&self, file: &Object, _args: &LinkArgs) -> Result<Link> {
//!         Ok(Link::url(self.presign(&file.path)?))
//!     }
//!
//!     fn root_path(&self) -> Option<String> {
//!         Some("/".into())
//!     }
//!
//!     fn as_put(&self) -> Option<&dyn Put> {
//!         Some(self)
//!     }
//! }
//! ```

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Result;
use crate::model::{FileStream, LinkArgs, ListArgs, Object};
use crate::stream::Link;

/// Object-storage backend.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`; the adapter calls into one
/// backend from many tasks at once and does no locking of its own around
/// backend calls.
#[async_trait]
pub trait Storage: Send + Sync {
    /// List the direct children of a directory.
    ///
    /// Order is backend-defined and preserved by the adapter.
    async fn list(&self, dir: &Object, args: &ListArgs) -> Result<Vec<Object>>;

    /// Issue a transfer link for a file.
    async fn link(&self, file: &Object, args: &LinkArgs) -> Result<Link>;

    /// Last-modified time of the storage itself.
    ///
    /// Used as the timestamp of a synthesized root directory.
    fn modified(&self) -> SystemTime {
        UNIX_EPOCH
    }

    /// Identifier of the root directory, for ID-addressed backends.
    fn root_id(&self) -> Option<String> {
        None
    }

    /// Native path of the root directory, for path-addressed backends.
    fn root_path(&self) -> Option<String> {
        None
    }

    fn as_remove(&self) -> Option<&dyn Remove> {
        None
    }

    fn as_put_result(&self) -> Option<&dyn PutResult> {
        None
    }

    fn as_put(&self) -> Option<&dyn Put> {
        None
    }

    fn as_mkdir_result(&self) -> Option<&dyn MkdirResult> {
        None
    }

    fn as_mkdir(&self) -> Option<&dyn Mkdir> {
        None
    }

    fn as_getter(&self) -> Option<&dyn Getter> {
        None
    }

    fn as_root_getter(&self) -> Option<&dyn GetRooter> {
        None
    }
}

/// Delete an object.
#[async_trait]
pub trait Remove: Send + Sync {
    async fn remove(&self, obj: &Object) -> Result<()>;
}

/// Upload progress callback, called with a percentage in `0.0..=100.0`.
pub type Progress = dyn Fn(f64) + Send + Sync;

/// Upload a file into a directory.
#[async_trait]
pub trait Put: Send + Sync {
    async fn put(&self, dir: &Object, file: FileStream, progress: &Progress) -> Result<()>;
}

/// Upload a file into a directory and return the stored object.
#[async_trait]
pub trait PutResult: Send + Sync {
    async fn put_result(
        &self,
        dir: &Object,
        file: FileStream,
        progress: &Progress,
    ) -> Result<Option<Object>>;
}

/// Create a directory inside `parent`.
#[async_trait]
pub trait Mkdir: Send + Sync {
    async fn make_dir(&self, parent: &Object, name: &str) -> Result<()>;
}

/// Create a directory inside `parent` and return it.
#[async_trait]
pub trait MkdirResult: Send + Sync {
    async fn make_dir_result(&self, parent: &Object, name: &str) -> Result<Option<Object>>;
}

/// Resolve an absolute virtual path without listing its parent.
///
/// Non-authoritative: any error makes the adapter fall back to listing.
#[async_trait]
pub trait Getter: Send + Sync {
    async fn get(&self, path: &str) -> Result<Object>;
}

/// Describe the root directory.
#[async_trait]
pub trait GetRooter: Send + Sync {
    async fn get_root(&self) -> Result<Object>;
}

/// A backend that can be built from a serialized addition.
///
/// The addition is the backend's own settings (credentials, root folder,
/// endpoints); [`ObjFs::from_addition`](crate::ObjFs::from_addition) decodes
/// it from JSON and hands it to [`Driver::init`].
#[async_trait]
pub trait Driver: Storage + Sized + 'static {
    /// Backend settings.
    type Addition: DeserializeOwned + Send;

    /// Validate settings and connect.
    async fn init(addition: Self::Addition) -> Result<Self>;
}

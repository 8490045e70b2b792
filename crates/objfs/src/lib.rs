//! objfs - Virtual path filesystem over pluggable object storage
//!
//! objfs puts a small hierarchical-path layer in front of an object-storage
//! backend. Callers read, write and delete by path; objfs resolves those paths
//! to backend objects, creates missing directories on demand, and makes sure
//! concurrent lookups in one directory cost a single backend listing.
//!
//! Backends implement [`Storage`] plus whichever optional capability traits
//! they support ([`Put`], [`Mkdir`], [`Remove`], [`Getter`], ...). See
//! [`driver`] for the contract and [`capability`] for how optional operations
//! are dispatched.
//!
//! # Example
//!
//! ```rust,ignore
//! use objfs::{FsConfig, ObjFs};
//! use tokio::io::AsyncReadExt;
//!
//! #[tokio::main]
//! async fn main() -> objfs::Result<()> {
//!     let fs = ObjFs::from_addition::<MyDriver>(
//!         FsConfig::default(),
//!         r#"{"username": "xxx", "password": "xxx", "root_folder_id": "xxx"}"#,
//!     )
//!     .await?;
//!
//!     fs.write("x/y/z", b"hello".to_vec()).await?;
//!     let mut out = Vec::new();
//!     fs.read("x/y/z", 0, 5).await?.read_to_end(&mut out).await?;
//!     assert_eq!(out, b"hello");
//!     Ok(())
//! }
//! ```

pub mod capability;
mod coalesce;
mod config;
pub mod driver;
mod error;
mod fs;
mod logging_impl;
mod model;
mod stream;
pub mod vpath;

pub use async_trait::async_trait;
pub use capability::{Capabilities, Capability};
pub use config::{FsConfig, DEFAULT_BASE_DIR, DEFAULT_ROOT_NAME};
pub use driver::{
    Driver, GetRooter, Getter, Mkdir, MkdirResult, Progress, Put, PutResult, Remove, Storage,
};
pub use error::{Error, Result, ResultExt, StorageError};
pub use fs::{ObjFs, ObjFsBuilder};
pub use logging_impl::{sanitize_for_log, LogConfig};
pub use model::{Entry, FileStream, LinkArgs, ListArgs, NameMapping, Object};
pub use stream::{ByteStream, HttpRange, Link, LinkOpener, MemoryReader, RangeRead, SeekableStream};

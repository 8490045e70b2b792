//! Path-addressed filesystem over a [`Storage`] backend.
//!
//! [`ObjFs`] translates `/a/b/c` style paths into backend object lookups.
//!
//! # Resolution
//!
//! | Step | Behavior |
//! |------|----------|
//! | Direct get | Tried first when the backend has a [`Getter`](crate::Getter); failures fall through |
//! | Root | `/` is described by the backend's root getter, root ID or root path |
//! | Listing | Otherwise the parent is listed and scanned for the base name |
//!
//! Listings of the same directory that overlap in time share one backend call.
//! Directories are created on demand, ancestors first, before every write.

use futures_util::future::{Aborted, BoxFuture, FutureExt};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, trace, warn};

use crate::capability::{self, Capabilities, MkdirVariant, PutVariant, RootStrategy};
use crate::coalesce::Group;
use crate::config::FsConfig;
use crate::driver::{Driver, Storage};
use crate::error::{Error, Result, ResultExt};
use crate::logging_impl::LogConfig;
use crate::model::{Entry, FileStream, LinkArgs, ListArgs, Object};
use crate::stream::{ByteStream, HttpRange, LinkOpener, SeekableStream};
use crate::vpath;

type Listing = Result<Arc<Vec<Entry>>>;

/// Virtual filesystem over a single storage backend.
///
/// Caller paths are relative to [`FsConfig::base_dir`]; `"a.txt"` and
/// `"/a.txt"` both name `/juicefs/a.txt` with the default configuration.
///
/// # Example
///
/// ```rust,ignore
/// use objfs::ObjFs;
/// use std::sync::Arc;
/// use tokio::io::AsyncReadExt;
///
/// let fs = ObjFs::new(Arc::new(MyBucket::connect().await?)).await?;
/// fs.write("logs/today.txt", b"hello".to_vec()).await?;
///
/// let mut out = Vec::new();
/// fs.read("logs/today.txt", 1, 3).await?.read_to_end(&mut out).await?;
/// assert_eq!(out, b"ell");
///
/// fs.delete("logs/today.txt").await?;
/// ```
pub struct ObjFs {
    storage: Arc<dyn Storage>,
    config: FsConfig,
    opener: Option<Arc<dyn LinkOpener>>,
    lists: Group<Listing>,
}

/// Builder for [`ObjFs`].
pub struct ObjFsBuilder {
    storage: Arc<dyn Storage>,
    config: FsConfig,
    opener: Option<Arc<dyn LinkOpener>>,
}

impl ObjFsBuilder {
    /// Set the adapter configuration.
    pub fn config(mut self, config: FsConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the opener used for URL transfer links.
    pub fn link_opener(mut self, opener: Arc<dyn LinkOpener>) -> Self {
        self.opener = Some(opener);
        self
    }

    /// Build the adapter and make sure the namespace prefix exists.
    pub async fn build(self) -> Result<ObjFs> {
        let config = self.config.validated()?;
        let fs = ObjFs {
            storage: self.storage,
            config,
            opener: self.opener,
            lists: Group::new(),
        };
        info!(
            base_dir = %fs.config.base_dir,
            capabilities = %Capabilities::detect(fs.storage.as_ref()),
            "preparing namespace"
        );
        let base_dir = fs.config.base_dir.clone();
        fs.mkdir(&base_dir)
            .await
            .with_context(|| format!("failed to make dir [{base_dir}]"))?;
        info!(base_dir = %base_dir, "namespace ready");
        Ok(fs)
    }
}

impl ObjFs {
    /// Start building an adapter over `storage`.
    pub fn builder(storage: Arc<dyn Storage>) -> ObjFsBuilder {
        ObjFsBuilder {
            storage,
            config: FsConfig::default(),
            opener: None,
        }
    }

    /// Build an adapter with the default configuration.
    pub async fn new(storage: Arc<dyn Storage>) -> Result<Self> {
        Self::builder(storage).build().await
    }

    /// Construct backend `D` from its JSON addition, then build the adapter.
    ///
    /// The addition is logged with credentials redacted.
    pub async fn from_addition<D: Driver>(config: FsConfig, addition: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(addition)?;
        info!(
            addition = %LogConfig::default().redact_addition(&value),
            "initializing storage"
        );
        let addition: D::Addition = serde_json::from_value(value)?;
        let storage = D::init(addition)
            .await
            .context("failed to init storage")?;
        Self::builder(Arc::new(storage)).config(config).build().await
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Delete `name`. Deleting a path that does not exist succeeds.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let path = self.resolve_name(name);
        let obj = match self.get(&path).await {
            Ok(obj) => obj,
            Err(err) if err.is_not_found() => {
                debug!(path = %path, "delete of missing object");
                return Ok(());
            }
            Err(err) => return Err(err.context("failed to get object")),
        };
        capability::remove(self.storage.as_ref())?
            .remove(obj.object())
            .await
            .with_context(|| format!("failed to remove [{path}]"))
    }

    /// Read `length` bytes of `name` starting at `offset`.
    ///
    /// The range is clamped to the file size.
    pub async fn read(&self, name: &str, offset: u64, length: u64) -> Result<ByteStream> {
        let path = self.resolve_name(name);
        let file = self
            .get(&path)
            .await
            .with_context(|| format!("failed to get file [{path}]"))?;
        if file.is_dir() {
            return Err(Error::NotAFile.context(path));
        }

        let link = self
            .storage
            .link(file.object(), &LinkArgs::default())
            .await
            .with_context(|| format!("failed to link [{path}]"))?;
        let stream = SeekableStream::new(file, link, self.opener.as_deref())
            .await
            .with_context(|| format!("failed get [{path}] stream"))?;
        stream.range_read(HttpRange::new(offset, length)).await
    }

    /// Write `data` to `name`, creating missing parent directories.
    pub async fn write(&self, name: &str, data: impl Into<Vec<u8>>) -> Result<()> {
        let path = self.resolve_name(name);
        if path == self.config.base_dir {
            return Err(Error::NotAFile.context(path));
        }
        let (dir, base) = vpath::split(&path);
        // fail before touching the backend
        let put = capability::put(self.storage.as_ref())?;

        let data = data.into();
        let now = SystemTime::now();
        let obj = Object {
            name: base.to_string(),
            size: data.len() as u64,
            modified: now,
            created: now,
            ..Object::default()
        };
        let file = FileStream::new(obj, data);

        let parent = self
            .mkdir(dir)
            .await
            .with_context(|| format!("failed to make dir [{dir}]"))?;

        let upload = path.clone();
        let progress = move |p: f64| trace!(path = %upload, progress = p, "upload progress");
        let result = match put {
            PutVariant::WithResult(p) => p
                .put_result(parent.object(), file, &progress)
                .await
                .map(drop),
            PutVariant::Plain(p) => p.put(parent.object(), file, &progress).await,
        };
        result.with_context(|| format!("failed to put [{path}]"))
    }

    /// Read `reader` to the end and write it to `name`.
    pub async fn write_reader<R>(&self, name: &str, mut reader: R) -> Result<()>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await?;
        self.write(name, data).await
    }

    /// Resolve `name` to its entry.
    pub async fn stat(&self, name: &str) -> Result<Entry> {
        let path = self.resolve_name(name);
        self.get(&path).await
    }

    /// List the directory `name`.
    pub async fn read_dir(&self, name: &str) -> Result<Arc<Vec<Entry>>> {
        let path = self.resolve_name(name);
        self.list(&path, ListArgs::default()).await
    }

    fn resolve_name(&self, name: &str) -> String {
        vpath::join(&self.config.base_dir, name)
    }

    /// Resolve an absolute virtual path.
    fn get<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Entry>> {
        async move {
            if let Some(getter) = capability::getter(self.storage.as_ref()) {
                match getter.get(path).await {
                    Ok(obj) => return Ok(Entry::with_name(self.display_name(path), obj)),
                    Err(err) => {
                        debug!(path, error = %err, "direct get failed, falling back to listing")
                    }
                }
            }

            if vpath::is_root(path) {
                return self.root().await;
            }

            let (dir, name) = vpath::split(path);
            let files = self
                .list(dir, ListArgs::default())
                .await
                .context("failed get parent list")?;
            files
                .iter()
                .find(|f| f.name() == name)
                .cloned()
                .ok_or(Error::NotFound)
        }
        .boxed()
    }

    fn display_name(&self, path: &str) -> String {
        if vpath::is_root(path) {
            self.config.root_name.clone()
        } else {
            vpath::base_name(path).to_string()
        }
    }

    /// Describe the backend root. Built fresh on every call.
    async fn root(&self) -> Result<Entry> {
        let root_name = &self.config.root_name;
        let strategy = capability::root(self.storage.as_ref())?;
        debug!(strategy = %strategy.capability(), "resolving root");
        let obj = match strategy {
            RootStrategy::Getter(g) => g.get_root().await.context("failed get root obj")?,
            RootStrategy::Id(id) => Object {
                id,
                name: root_name.clone(),
                modified: self.storage.modified(),
                is_folder: true,
                ..Object::default()
            },
            RootStrategy::Path(path) => Object {
                path,
                name: root_name.clone(),
                modified: self.storage.modified(),
                is_folder: true,
                ..Object::default()
            },
        };
        Ok(Entry::with_name(root_name.clone(), obj))
    }

    /// List a directory; concurrent listings of the same path share one call.
    async fn list(&self, dir: &str, args: ListArgs) -> Result<Arc<Vec<Entry>>> {
        let d = self.get(dir).await?;
        if !d.is_dir() {
            return Err(Error::NotADirectory.context(dir));
        }

        let storage = Arc::clone(&self.storage);
        let mapping = self.config.name_mapping.clone();
        let key = dir.to_string();
        let listing = self
            .lists
            .run(dir, async move {
                debug!(path = %key, "listing directory");
                let files = storage
                    .list(d.object(), &args)
                    .await
                    .with_context(|| format!("failed to list objs [{key}]"))?;
                Ok(Arc::new(
                    files
                        .into_iter()
                        .map(|f| Entry::mapped(f, &mapping))
                        .collect(),
                ))
            })
            .await;
        match listing {
            Ok(listing) => listing,
            Err(Aborted) => {
                Err(Error::Cancelled.context(format!("failed to list objs [{dir}]")))
            }
        }
    }

    /// Find `name` in `parent` with a listing issued by this call.
    ///
    /// Bypasses the coalescer: a shared listing may have started before the
    /// caller's last change to the backend.
    async fn find_fresh(&self, parent: &Entry, dir: &str, name: &str) -> Result<Entry> {
        let files = self
            .storage
            .list(parent.object(), &ListArgs { refresh: true })
            .await
            .with_context(|| format!("failed to list objs [{dir}]"))?;
        files
            .into_iter()
            .map(|f| Entry::mapped(f, &self.config.name_mapping))
            .find(|f| f.name() == name)
            .ok_or(Error::NotFound)
    }

    /// Ensure `dir` and all its ancestors exist and return the directory.
    ///
    /// Not deduplicated across callers: a create that fails because another
    /// caller won the race counts as success once the directory resolves.
    fn mkdir<'a>(&'a self, dir: &'a str) -> BoxFuture<'a, Result<Entry>> {
        async move {
            if vpath::is_root(dir) {
                return self.get(dir).await;
            }
            match self.get(dir).await {
                Ok(existing) if existing.is_dir() => return Ok(existing),
                Ok(_) => return Err(Error::NotADirectory.context(dir)),
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err),
            }

            let (parent_path, name) = vpath::split(dir);
            let parent = match self.get(parent_path).await {
                Ok(parent) => parent,
                Err(err) if err.is_not_found() => self.mkdir(parent_path).await?,
                Err(err) => return Err(err),
            };

            let created = match capability::mkdir(self.storage.as_ref())? {
                MkdirVariant::WithResult(m) => m.make_dir_result(parent.object(), name).await,
                MkdirVariant::Plain(m) => m.make_dir(parent.object(), name).await.map(|()| None),
            };
            let entry = match created {
                Ok(Some(obj)) => Entry::with_name(name, obj),
                Ok(None) => self.find_fresh(&parent, parent_path, name).await?,
                Err(err) => match self.find_fresh(&parent, parent_path, name).await {
                    Ok(existing) if existing.is_dir() => {
                        warn!(path = dir, error = %err, "create failed but directory exists");
                        existing
                    }
                    _ => return Err(err),
                },
            };
            debug!(path = dir, "directory ready");
            Ok(entry)
        }
        .boxed()
    }
}

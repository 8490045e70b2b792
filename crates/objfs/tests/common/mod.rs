//! In-memory storage backend shared by the integration tests.
//!
//! Objects are keyed by native path; every object's `id` and `path` are that
//! key. Each optional capability can be switched off, and list calls are
//! counted per directory so coalescing can be observed.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use objfs::{
    async_trait, Driver, Error, FileStream, GetRooter, Getter, Link, LinkArgs, ListArgs, Mkdir,
    MkdirResult, Object, Progress, Put, PutResult, Remove, Result, Storage,
};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Notify;

/// Which optional capabilities the backend advertises.
#[derive(Debug, Clone)]
pub struct Caps {
    pub remove: bool,
    pub put: bool,
    pub put_result: bool,
    pub mkdir: bool,
    pub mkdir_result: bool,
    pub getter: bool,
    pub root_getter: bool,
    pub root_id: Option<String>,
    pub root_path: Option<String>,
}

impl Default for Caps {
    fn default() -> Self {
        Self {
            remove: true,
            put: true,
            put_result: false,
            mkdir: true,
            mkdir_result: false,
            getter: false,
            root_getter: false,
            root_id: Some("/".to_string()),
            root_path: None,
        }
    }
}

struct Node {
    obj: Object,
    data: Vec<u8>,
}

pub struct MemoryStorage {
    caps: Caps,
    nodes: Mutex<BTreeMap<String, Node>>,
    list_calls: Mutex<HashMap<String, usize>>,
    list_delay: Mutex<Duration>,
    fail_list: Mutex<Option<String>>,
    list_hold: Mutex<Option<(String, usize, Arc<Notify>)>>,
    mkdir_gate: Mutex<Option<Arc<Notify>>>,
    fail_after_create: AtomicBool,
    fail_get: bool,
    pub get_calls: AtomicUsize,
    pub mkdir_calls: AtomicUsize,
    pub put_calls: AtomicUsize,
    pub put_result_calls: AtomicUsize,
    pub remove_calls: AtomicUsize,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::with_caps(Caps::default())
    }
}

fn parent_of(key: &str) -> &str {
    match key.rfind('/') {
        Some(0) => "/",
        Some(idx) => &key[..idx],
        None => "/",
    }
}

fn child_key(dir: &str, name: &str) -> String {
    if dir == "/" {
        format!("/{name}")
    } else {
        format!("{dir}/{name}")
    }
}

fn not_found() -> Error {
    Error::NotFound
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_caps(caps: Caps) -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            "/".to_string(),
            Node {
                obj: Object {
                    id: "/".to_string(),
                    path: "/".to_string(),
                    name: "explicit-root".to_string(),
                    is_folder: true,
                    ..Object::default()
                },
                data: Vec::new(),
            },
        );
        Self {
            caps,
            nodes: Mutex::new(nodes),
            list_calls: Mutex::new(HashMap::new()),
            list_delay: Mutex::new(Duration::ZERO),
            fail_list: Mutex::new(None),
            list_hold: Mutex::new(None),
            mkdir_gate: Mutex::new(None),
            fail_after_create: AtomicBool::new(false),
            fail_get: false,
            get_calls: AtomicUsize::new(0),
            mkdir_calls: AtomicUsize::new(0),
            put_calls: AtomicUsize::new(0),
            put_result_calls: AtomicUsize::new(0),
            remove_calls: AtomicUsize::new(0),
        }
    }

    /// Make every direct get fail.
    pub fn failing_getter(mut self) -> Self {
        self.fail_get = true;
        self
    }

    /// Seed a file, creating its ancestors.
    pub fn seed_file(&self, key: &str, data: &[u8]) {
        self.seed_dir(parent_of(key));
        let name = key.rsplit('/').next().unwrap_or_default();
        let mut obj = Object::file(name, data.len() as u64);
        obj.id = key.to_string();
        obj.path = key.to_string();
        self.nodes.lock().unwrap().insert(
            key.to_string(),
            Node {
                obj,
                data: data.to_vec(),
            },
        );
    }

    /// Seed a file whose descriptor reports `size` regardless of its content.
    pub fn seed_file_with_size(&self, key: &str, data: &[u8], size: u64) {
        self.seed_file(key, data);
        if let Some(node) = self.nodes.lock().unwrap().get_mut(key) {
            node.obj.size = size;
        }
    }

    /// Seed a directory and its ancestors.
    pub fn seed_dir(&self, key: &str) {
        if key == "/" {
            return;
        }
        self.seed_dir(parent_of(key));
        let name = key.rsplit('/').next().unwrap_or_default();
        let mut obj = Object::folder(name);
        obj.id = key.to_string();
        obj.path = key.to_string();
        self.nodes
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_insert(Node {
                obj,
                data: Vec::new(),
            });
    }

    pub fn contains(&self, key: &str) -> bool {
        self.nodes.lock().unwrap().contains_key(key)
    }

    pub fn is_dir(&self, key: &str) -> bool {
        self.nodes
            .lock()
            .unwrap()
            .get(key)
            .is_some_and(|n| n.obj.is_folder)
    }

    pub fn data(&self, key: &str) -> Option<Vec<u8>> {
        self.nodes.lock().unwrap().get(key).map(|n| n.data.clone())
    }

    pub fn children(&self, key: &str) -> Vec<String> {
        self.nodes
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| k.as_str() != "/" && parent_of(k) == key)
            .map(|(_, n)| n.obj.name.clone())
            .collect()
    }

    pub fn set_list_delay(&self, delay: Duration) {
        *self.list_delay.lock().unwrap() = delay;
    }

    pub fn fail_list_of(&self, key: &str) {
        *self.fail_list.lock().unwrap() = Some(key.to_string());
    }

    /// Hold the `nth` list call of `key` (counted since the last reset).
    ///
    /// The call snapshots its result, then waits on the returned notify
    /// before answering.
    pub fn hold_list_call(&self, key: &str, nth: usize) -> Arc<Notify> {
        let release = Arc::new(Notify::new());
        *self.list_hold.lock().unwrap() = Some((key.to_string(), nth, release.clone()));
        release
    }

    /// Make the next directory create wait on the returned notify.
    pub fn gate_mkdir(&self) -> Arc<Notify> {
        let release = Arc::new(Notify::new());
        *self.mkdir_gate.lock().unwrap() = Some(release.clone());
        release
    }

    /// Directory creates still create, but report a storage error.
    pub fn fail_mkdir_after_create(&self) {
        self.fail_after_create.store(true, Ordering::SeqCst);
    }

    pub fn list_count(&self, key: &str) -> usize {
        self.list_calls
            .lock()
            .unwrap()
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    pub fn reset_counts(&self) {
        self.list_calls.lock().unwrap().clear();
        self.get_calls.store(0, Ordering::SeqCst);
        self.mkdir_calls.store(0, Ordering::SeqCst);
        self.put_calls.store(0, Ordering::SeqCst);
        self.put_result_calls.store(0, Ordering::SeqCst);
        self.remove_calls.store(0, Ordering::SeqCst);
    }

    fn key_of(obj: &Object) -> String {
        if !obj.id.is_empty() {
            obj.id.clone()
        } else {
            obj.path.clone()
        }
    }

    async fn gated_create_dir(&self, parent: &Object, name: &str) -> Result<Object> {
        let gate = self.mkdir_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let obj = self.create_dir(parent, name)?;
        if self.fail_after_create.load(Ordering::SeqCst) {
            return Err(Error::storage(std::io::Error::other("create timed out")));
        }
        Ok(obj)
    }

    fn create_dir(&self, parent: &Object, name: &str) -> Result<Object> {
        self.mkdir_calls.fetch_add(1, Ordering::SeqCst);
        let key = child_key(&Self::key_of(parent), name);
        let mut nodes = self.nodes.lock().unwrap();
        if nodes.contains_key(&key) {
            return Err(Error::storage(std::io::Error::from(
                ErrorKind::AlreadyExists,
            )));
        }
        let mut obj = Object::folder(name);
        obj.id = key.clone();
        obj.path = key.clone();
        nodes.insert(
            key,
            Node {
                obj: obj.clone(),
                data: Vec::new(),
            },
        );
        Ok(obj)
    }

    fn store(&self, dir: &Object, file: FileStream, progress: &Progress) -> Object {
        let key = child_key(&Self::key_of(dir), &file.obj.name);
        let mut obj = file.obj.clone();
        obj.id = key.clone();
        obj.path = key.clone();
        progress(100.0);
        self.nodes.lock().unwrap().insert(
            key,
            Node {
                obj: obj.clone(),
                data: file.into_bytes(),
            },
        );
        obj
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn list(&self, dir: &Object, _args: &ListArgs) -> Result<Vec<Object>> {
        let key = Self::key_of(dir);
        let nth = {
            let mut calls = self.list_calls.lock().unwrap();
            let count = calls.entry(key.clone()).or_default();
            *count += 1;
            *count
        };
        let hold = {
            let mut hold = self.list_hold.lock().unwrap();
            match hold.as_ref() {
                Some((k, n, _)) if *k == key && *n == nth => hold.take().map(|(_, _, h)| h),
                _ => None,
            }
        };

        let delay = *self.list_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_list.lock().unwrap().as_deref() == Some(key.as_str()) {
            return Err(Error::storage(std::io::Error::other("injected list failure")));
        }

        let snapshot: Vec<Object> = {
            let nodes = self.nodes.lock().unwrap();
            if !nodes.contains_key(&key) {
                return Err(not_found());
            }
            nodes
                .iter()
                .filter(|(k, _)| k.as_str() != "/" && parent_of(k) == key)
                .map(|(_, n)| n.obj.clone())
                .collect()
        };
        if let Some(release) = hold {
            release.notified().await;
        }
        Ok(snapshot)
    }

    async fn link(&self, file: &Object, _args: &LinkArgs) -> Result<Link> {
        self.data(&Self::key_of(file))
            .map(Link::data)
            .ok_or_else(not_found)
    }

    fn modified(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    fn root_id(&self) -> Option<String> {
        self.caps.root_id.clone()
    }

    fn root_path(&self) -> Option<String> {
        self.caps.root_path.clone()
    }

    fn as_remove(&self) -> Option<&dyn Remove> {
        self.caps.remove.then_some(self as &dyn Remove)
    }

    fn as_put_result(&self) -> Option<&dyn PutResult> {
        self.caps.put_result.then_some(self as &dyn PutResult)
    }

    fn as_put(&self) -> Option<&dyn Put> {
        self.caps.put.then_some(self as &dyn Put)
    }

    fn as_mkdir_result(&self) -> Option<&dyn MkdirResult> {
        self.caps.mkdir_result.then_some(self as &dyn MkdirResult)
    }

    fn as_mkdir(&self) -> Option<&dyn Mkdir> {
        self.caps.mkdir.then_some(self as &dyn Mkdir)
    }

    fn as_getter(&self) -> Option<&dyn Getter> {
        self.caps.getter.then_some(self as &dyn Getter)
    }

    fn as_root_getter(&self) -> Option<&dyn GetRooter> {
        self.caps.root_getter.then_some(self as &dyn GetRooter)
    }
}

#[async_trait]
impl Remove for MemoryStorage {
    async fn remove(&self, obj: &Object) -> Result<()> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        let key = Self::key_of(obj);
        let prefix = format!("{key}/");
        let mut nodes = self.nodes.lock().unwrap();
        nodes.retain(|k, _| k != &key && !k.starts_with(&prefix));
        Ok(())
    }
}

#[async_trait]
impl Put for MemoryStorage {
    async fn put(&self, dir: &Object, file: FileStream, progress: &Progress) -> Result<()> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        self.store(dir, file, progress);
        Ok(())
    }
}

#[async_trait]
impl PutResult for MemoryStorage {
    async fn put_result(
        &self,
        dir: &Object,
        file: FileStream,
        progress: &Progress,
    ) -> Result<Option<Object>> {
        self.put_result_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(self.store(dir, file, progress)))
    }
}

#[async_trait]
impl Mkdir for MemoryStorage {
    async fn make_dir(&self, parent: &Object, name: &str) -> Result<()> {
        self.gated_create_dir(parent, name).await.map(drop)
    }
}

#[async_trait]
impl MkdirResult for MemoryStorage {
    async fn make_dir_result(&self, parent: &Object, name: &str) -> Result<Option<Object>> {
        self.gated_create_dir(parent, name).await.map(Some)
    }
}

#[async_trait]
impl Getter for MemoryStorage {
    async fn get(&self, path: &str) -> Result<Object> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_get {
            return Err(Error::storage(std::io::Error::other("direct get offline")));
        }
        self.nodes
            .lock()
            .unwrap()
            .get(path)
            .map(|n| n.obj.clone())
            .ok_or_else(not_found)
    }
}

#[async_trait]
impl GetRooter for MemoryStorage {
    async fn get_root(&self) -> Result<Object> {
        self.nodes
            .lock()
            .unwrap()
            .get("/")
            .map(|n| n.obj.clone())
            .ok_or_else(not_found)
    }
}

/// Addition accepted by [`MemoryDriver`].
#[derive(Debug, Deserialize)]
pub struct MemoryAddition {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub root_folder_id: Option<String>,
}

/// [`MemoryStorage`] constructed from a JSON addition.
pub struct MemoryDriver(pub MemoryStorage);

#[async_trait]
impl Storage for MemoryDriver {
    async fn list(&self, dir: &Object, args: &ListArgs) -> Result<Vec<Object>> {
        self.0.list(dir, args).await
    }

    async fn link(&self, file: &Object, args: &LinkArgs) -> Result<Link> {
        self.0.link(file, args).await
    }

    fn root_id(&self) -> Option<String> {
        self.0.root_id()
    }

    fn as_put(&self) -> Option<&dyn Put> {
        self.0.as_put()
    }

    fn as_mkdir(&self) -> Option<&dyn Mkdir> {
        self.0.as_mkdir()
    }

    fn as_remove(&self) -> Option<&dyn Remove> {
        self.0.as_remove()
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    type Addition = MemoryAddition;

    async fn init(addition: MemoryAddition) -> Result<Self> {
        if addition.password.is_empty() {
            return Err(Error::storage(std::io::Error::new(
                ErrorKind::PermissionDenied,
                format!("login failed for {}", addition.username),
            )));
        }
        let caps = Caps {
            root_id: Some(addition.root_folder_id.unwrap_or_else(|| "/".to_string())),
            ..Caps::default()
        };
        Ok(Self(MemoryStorage::with_caps(caps)))
    }
}

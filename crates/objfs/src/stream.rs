//! Transfer links and range-readable streams.
//!
//! A backend answers [`Storage::link`](crate::Storage::link) with a [`Link`].
//! [`SeekableStream`] turns that link into something that can serve any byte
//! range of the object:
//!
//! | Link | Served by |
//! |------|-----------|
//! | [`Link::Reader`] | the backend's own [`RangeRead`] |
//! | [`Link::Data`] | an in-memory [`MemoryReader`] |
//! | [`Link::Url`] | the configured [`LinkOpener`] (e.g. an HTTP range client) |

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::io::Cursor;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

use crate::error::{Error, Result};
use crate::model::{Entry, Object};

/// Readable byte stream returned to callers.
pub type ByteStream = Box<dyn AsyncRead + Send + Unpin>;

/// A byte range `[start, start + length)`; `length: None` reads to the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpRange {
    pub start: u64,
    pub length: Option<u64>,
}

impl HttpRange {
    pub fn new(start: u64, length: u64) -> Self {
        Self {
            start,
            length: Some(length),
        }
    }

    /// From `start` to the end of the object.
    pub fn to_end(start: u64) -> Self {
        Self {
            start,
            length: None,
        }
    }

    /// Clamp to an object of `size` bytes.
    ///
    /// A start past the end yields an empty range at `size`.
    pub fn clamp(self, size: u64) -> Self {
        let start = self.start.min(size);
        let available = size - start;
        let length = self.length.map_or(available, |l| l.min(available));
        Self {
            start,
            length: Some(length),
        }
    }

    /// `bytes=` header value for HTTP range requests.
    ///
    /// An empty range has no header form and needs no request.
    pub fn header_value(&self) -> Option<String> {
        match self.length {
            Some(0) => None,
            Some(len) => Some(format!(
                "bytes={}-{}",
                self.start,
                self.start.saturating_add(len - 1)
            )),
            None => Some(format!("bytes={}-", self.start)),
        }
    }
}

/// Source that can serve any byte range of one object.
#[async_trait]
pub trait RangeRead: Send + Sync {
    async fn range_read(&self, range: HttpRange) -> Result<ByteStream>;
}

/// Opens URL links; the HTTP seek/stream layer lives behind this trait.
#[async_trait]
pub trait LinkOpener: Send + Sync {
    async fn open(
        &self,
        file: &Object,
        url: &str,
        header: &HashMap<String, String>,
    ) -> Result<Arc<dyn RangeRead>>;
}

/// Backend-issued transfer link.
#[derive(Clone)]
pub enum Link {
    /// Remote URL, opened through a [`LinkOpener`].
    Url {
        url: String,
        header: HashMap<String, String>,
    },
    /// Backend-provided range reader.
    Reader(Arc<dyn RangeRead>),
    /// Full object content held in memory.
    Data(Arc<[u8]>),
}

impl Link {
    pub fn url(url: impl Into<String>) -> Self {
        Link::Url {
            url: url.into(),
            header: HashMap::new(),
        }
    }

    pub fn data(data: impl Into<Arc<[u8]>>) -> Self {
        Link::Data(data.into())
    }

    pub fn reader(reader: Arc<dyn RangeRead>) -> Self {
        Link::Reader(reader)
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // header may carry signed credentials
            Link::Url { url, .. } => f.debug_struct("Url").field("url", url).finish(),
            Link::Reader(_) => f.write_str("Reader"),
            Link::Data(data) => write!(f, "Data({} bytes)", data.len()),
        }
    }
}

/// In-memory range reader.
#[derive(Debug, Clone)]
pub struct MemoryReader {
    data: Arc<[u8]>,
}

impl MemoryReader {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self { data: data.into() }
    }
}

#[async_trait]
impl RangeRead for MemoryReader {
    async fn range_read(&self, range: HttpRange) -> Result<ByteStream> {
        let range = range.clamp(self.data.len() as u64);
        let start = range.start as usize;
        let end = start + range.length.unwrap_or(0) as usize;
        Ok(Box::new(Cursor::new(self.data[start..end].to_vec())))
    }
}

/// A located file plus a reader able to serve any range of it.
///
/// # Example
///
/// ```rust
/// use objfs::{Entry, HttpRange, Link, Object, SeekableStream};
/// use tokio::io::AsyncReadExt;
///
/// # tokio_test::block_on(async {
/// let file = Entry::with_name("a.txt", Object::file("a.txt", 5));
/// let stream = SeekableStream::new(file, Link::data(b"hello".to_vec()), None).await?;
///
/// let mut out = Vec::new();
/// stream.range_read(HttpRange::new(1, 3)).await?.read_to_end(&mut out).await?;
/// assert_eq!(out, b"ell");
/// # Ok::<(), objfs::Error>(())
/// # }).unwrap();
/// ```
pub struct SeekableStream {
    file: Entry,
    reader: Arc<dyn RangeRead>,
}

impl SeekableStream {
    /// Resolve `link` into a range reader for `file`.
    ///
    /// URL links need an opener; without one this is a configuration error.
    pub async fn new(file: Entry, link: Link, opener: Option<&dyn LinkOpener>) -> Result<Self> {
        let reader: Arc<dyn RangeRead> = match link {
            Link::Reader(reader) => reader,
            Link::Data(data) => Arc::new(MemoryReader::new(data)),
            Link::Url { url, header } => match opener {
                Some(opener) => opener.open(file.object(), &url, &header).await?,
                None => {
                    return Err(Error::Configuration(format!(
                        "no link opener configured for [{}]",
                        file.name()
                    )));
                }
            },
        };
        Ok(Self { file, reader })
    }

    /// Read `range` from the link.
    ///
    /// The descriptor's size is not consulted; backends may report 0 when the
    /// size is unknown. The returned stream never yields more than
    /// `range.length` bytes, even if the underlying reader ignores the range end.
    pub async fn range_read(&self, range: HttpRange) -> Result<ByteStream> {
        trace!(file = %self.file.name(), range = ?range.header_value(), "range read");
        let stream = self.reader.range_read(range).await?;
        let stream: ByteStream = match range.length {
            Some(length) => Box::new(stream.take(length)),
            None => stream,
        };
        Ok(stream)
    }
}

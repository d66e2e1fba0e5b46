//! Request descriptor handed to [`Scheduler::perform`](crate::scheduler::Scheduler::perform).

use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, Read};

/// HTTP method supported by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    /// The response body is never delivered to the sink.
    Head,
    Post,
}

/// Pull-style upload callback: fill the buffer, return the number of bytes
/// written, `0` for end of body.
pub type ReadCallback = Box<dyn FnMut(&mut [u8]) -> usize + Send>;

/// Where the request body comes from.
pub enum BodySource {
    None,
    /// In-memory body streamed to the engine. `content_type`, when set, adds
    /// a `Content-Type` request header.
    Buffer {
        data: Vec<u8>,
        content_type: Option<String>,
    },
    /// Form-style payload handed to the engine in one piece.
    Fields(Vec<u8>),
    File(File),
    Callback(ReadCallback),
}

impl fmt::Debug for BodySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodySource::None => write!(f, "None"),
            BodySource::Buffer { data, content_type } => f
                .debug_struct("Buffer")
                .field("len", &data.len())
                .field("content_type", content_type)
                .finish(),
            BodySource::Fields(data) => write!(f, "Fields({} bytes)", data.len()),
            BodySource::File(file) => f.debug_tuple("File").field(file).finish(),
            BodySource::Callback(_) => write!(f, "Callback(..)"),
        }
    }
}

/// An HTTP request to schedule.
#[derive(Debug)]
pub struct Request {
    pub url: String,
    pub method: Method,
    /// Send `Pragma: no-cache` instead of an empty `Pragma` header.
    pub no_cache: bool,
    /// Ask for the identity encoding and hand the body over undecoded.
    pub no_encoding: bool,
    /// Extra header lines (`Name: value`), sent in this order.
    pub extra_headers: Vec<String>,
    pub body: BodySource,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            no_cache: false,
            no_encoding: false,
            extra_headers: Vec::new(),
            body: BodySource::None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn head(url: impl Into<String>) -> Self {
        Self::new(Method::Head, url)
    }

    pub fn post(url: impl Into<String>, body: BodySource) -> Self {
        Self::new(Method::Post, url).with_body(body)
    }

    pub fn no_cache(mut self, no_cache: bool) -> Self {
        self.no_cache = no_cache;
        self
    }

    pub fn no_encoding(mut self, no_encoding: bool) -> Self {
        self.no_encoding = no_encoding;
        self
    }

    pub fn header(mut self, line: impl Into<String>) -> Self {
        self.extra_headers.push(line.into());
        self
    }

    pub fn with_body(mut self, body: BodySource) -> Self {
        self.body = body;
        self
    }

    /// Request header lines in wire order: `Pragma` first (always present),
    /// then the caller's extra headers, then a synthesized `Content-Type`
    /// for buffered bodies that declare one.
    pub fn header_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.extra_headers.len() + 2);
        let pragma = if self.no_cache {
            "Pragma: no-cache"
        } else {
            "Pragma:"
        };
        lines.push(pragma.to_string());
        lines.extend(self.extra_headers.iter().cloned());
        if let BodySource::Buffer {
            content_type: Some(content_type),
            ..
        } = &self.body
        {
            lines.push(format!("Content-Type: {}", content_type));
        }
        lines
    }
}

/// Request body after it has been split for the engine: either a payload
/// the engine copies up front, or a reader pulled from the read callback.
pub(crate) enum Upload {
    Fields(Vec<u8>),
    Stream {
        reader: UploadReader,
        size: Option<u64>,
    },
}

pub(crate) enum UploadReader {
    Empty,
    Bytes(Cursor<Vec<u8>>),
    File(File),
    Callback(ReadCallback),
}

impl UploadReader {
    /// Fill `buf` from the body source; `Ok(0)` signals end of body.
    pub(crate) fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            UploadReader::Empty => Ok(0),
            UploadReader::Bytes(cursor) => cursor.read(buf),
            UploadReader::File(file) => file.read(buf),
            UploadReader::Callback(cb) => Ok(cb(buf).min(buf.len())),
        }
    }
}

impl BodySource {
    pub(crate) fn into_upload(self) -> Upload {
        match self {
            BodySource::None => Upload::Stream {
                reader: UploadReader::Empty,
                size: Some(0),
            },
            BodySource::Buffer { data, .. } => {
                let size = Some(data.len() as u64);
                Upload::Stream {
                    reader: UploadReader::Bytes(Cursor::new(data)),
                    size,
                }
            }
            BodySource::Fields(data) => Upload::Fields(data),
            BodySource::File(file) => {
                let size = file.metadata().ok().map(|m| m.len());
                Upload::Stream {
                    reader: UploadReader::File(file),
                    size,
                }
            }
            BodySource::Callback(cb) => Upload::Stream {
                reader: UploadReader::Callback(cb),
                size: None,
            },
        }
    }
}

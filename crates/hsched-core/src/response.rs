//! Caller-owned response populated by the scheduler.

use std::fmt;
use std::fs::File;
use std::io::Write;

use crate::error::TransferResult;
use crate::headers::find_header;

/// Push-style download callback: consume `data`, return how many bytes were
/// taken. Returning fewer than `data.len()` aborts the transfer.
pub type WriteCallback = Box<dyn FnMut(&[u8]) -> usize + Send>;

/// Where the response body goes.
pub enum BodySink {
    Discard,
    Buffer(Vec<u8>),
    File(File),
    Callback(WriteCallback),
}

impl BodySink {
    /// Deliver one chunk of body data. Returns the number of bytes accepted.
    pub(crate) fn write(&mut self, data: &[u8]) -> usize {
        match self {
            BodySink::Discard => data.len(),
            BodySink::Buffer(buf) => {
                buf.extend_from_slice(data);
                data.len()
            }
            BodySink::File(file) => match file.write_all(data) {
                Ok(()) => data.len(),
                Err(e) => {
                    tracing::warn!("response body write failed: {}", e);
                    0
                }
            },
            BodySink::Callback(cb) => cb(data),
        }
    }
}

impl fmt::Debug for BodySink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodySink::Discard => write!(f, "Discard"),
            BodySink::Buffer(buf) => write!(f, "Buffer({} bytes)", buf.len()),
            BodySink::File(file) => f.debug_tuple("File").field(file).finish(),
            BodySink::Callback(_) => write!(f, "Callback(..)"),
        }
    }
}

/// Result of a scheduled request.
#[derive(Debug)]
pub struct Response {
    /// Final transport outcome. HTTP error statuses are *not* failures here.
    pub result: TransferResult,
    /// Status of the final response (0 if none was received).
    pub http_status: u32,
    /// Status of the proxy CONNECT response, if a tunnel was used.
    pub connect_code: u32,
    /// Header lines of the final response, first-seen order, folded lines
    /// joined. The blank line ending the block is kept as an empty entry.
    pub headers: Vec<String>,
    pub body: BodySink,
}

impl Response {
    pub fn new(body: BodySink) -> Self {
        Self {
            result: Ok(()),
            http_status: 0,
            connect_code: 0,
            headers: Vec::new(),
            body,
        }
    }

    /// Response whose body is collected in memory.
    pub fn buffered() -> Self {
        Self::new(BodySink::Buffer(Vec::new()))
    }

    /// Response whose body is dropped.
    pub fn discard() -> Self {
        Self::new(BodySink::Discard)
    }

    pub fn to_file(file: File) -> Self {
        Self::new(BodySink::File(file))
    }

    /// Collected body for [`BodySink::Buffer`] responses.
    pub fn body_bytes(&self) -> Option<&[u8]> {
        match &self.body {
            BodySink::Buffer(buf) => Some(buf),
            _ => None,
        }
    }

    /// Value of the first header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Transfer completed and the final status is 2xx.
    pub fn is_success(&self) -> bool {
        self.result.is_ok() && (200..300).contains(&self.http_status)
    }
}

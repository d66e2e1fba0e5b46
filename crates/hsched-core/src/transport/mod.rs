//! Transport engine seam.
//!
//! The scheduler never touches sockets. It drives an engine that owns
//! reusable transfer handles and advances all registered handles in one
//! non-blocking call. [`CurlTransport`] is the production engine;
//! tests drive a scripted in-memory one.

pub mod curl_multi;
#[cfg(test)]
pub(crate) mod mock;

use std::io;
use std::time::Duration;

use crate::error::{TransferError, TransferResult};
use crate::headers::HeaderAssembler;
use crate::request::{Method, UploadReader};
use crate::response::BodySink;

pub use curl_multi::CurlTransport;

/// Defaults applied to every handle before a request is configured on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleTemplate {
    pub user_agent: String,
    /// Abort when throughput stays below this many bytes/s for `low_speed_time`.
    pub low_speed_limit: Option<u32>,
    pub low_speed_time: Option<Duration>,
    pub connect_timeout: Duration,
    pub follow_redirects: bool,
    pub max_redirects: u32,
}

impl Default for HandleTemplate {
    fn default() -> Self {
        Self {
            user_agent: concat!("hsched/", env!("CARGO_PKG_VERSION")).to_string(),
            low_speed_limit: None,
            low_speed_time: None,
            connect_timeout: Duration::from_secs(30),
            follow_redirects: true,
            max_redirects: 20,
        }
    }
}

/// Callback state for one in-flight transfer: header assembly, the response
/// body sink and the request body reader. The engine feeds it while the
/// transfer runs; the scheduler takes it back on completion.
pub struct Exchange {
    headers: HeaderAssembler,
    sink: BodySink,
    upload: UploadReader,
    skip_body: bool,
}

impl Exchange {
    pub(crate) fn new(sink: BodySink, upload: UploadReader, method: Method) -> Self {
        Self {
            headers: HeaderAssembler::new(),
            sink,
            upload,
            skip_body: method == Method::Head,
        }
    }

    /// One raw response header line.
    pub fn on_header(&mut self, line: &[u8]) {
        self.headers.push_line(line);
    }

    /// One chunk of response body. Returns bytes accepted.
    pub fn on_body(&mut self, data: &[u8]) -> usize {
        if self.skip_body {
            return data.len();
        }
        self.sink.write(data)
    }

    /// Fill `buf` with request body bytes; `Ok(0)` ends the upload.
    pub fn on_upload(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.upload.read(buf)
    }

    pub fn headers(&self) -> &[String] {
        self.headers.lines()
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, BodySink) {
        (self.headers.into_lines(), self.sink)
    }
}

/// A request lowered into what the engine needs to configure a handle.
pub struct Transfer {
    pub method: Method,
    pub url: String,
    /// Request header lines in wire order.
    pub headers: Vec<String>,
    /// Body copied into the engine up front (POST fields).
    pub fields: Option<Vec<u8>>,
    /// Size of a streamed upload, when known.
    pub upload_size: Option<u64>,
    /// Advertise every supported content encoding and decode the body.
    pub decode_content: bool,
}

/// Result of one engine drive call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Perform {
    /// Number of transfers still running.
    Running(u32),
    /// The engine has more immediate work; call again before waiting.
    CallAgain,
}

/// A transfer the engine reports as done, identified by its registration token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub token: usize,
    pub result: TransferResult,
}

/// What the engine reports about a handle after its transfer completed.
pub struct Finished {
    pub http_status: u32,
    pub connect_code: u32,
    pub exchange: Option<Exchange>,
}

/// A transport engine that executes transfers on reusable handles.
///
/// All methods are called from the single scheduling thread.
pub trait Transport {
    /// A handle not currently registered with the engine.
    type Handle;
    /// A handle registered with the engine's batch driver.
    type Attached;

    /// Allocate a fresh handle seeded from the engine's template.
    fn create_handle(&mut self) -> Self::Handle;

    /// Reset `handle` and configure it for `transfer`.
    fn configure(&mut self, handle: &mut Self::Handle, transfer: &Transfer) -> TransferResult;

    /// Add `handle` to the batch driver, tagged with `token`. On failure
    /// the handle is gone.
    fn register(&mut self, handle: Self::Handle, token: usize)
        -> Result<Self::Attached, TransferError>;

    /// Hand the callback state to a registered handle. Called before the
    /// next `perform`, so no callback can fire without it.
    fn install(&mut self, attached: &mut Self::Attached, exchange: Exchange);

    /// Remove a registered handle from the batch driver.
    fn unregister(&mut self, attached: Self::Attached) -> Result<Self::Handle, TransferError>;

    /// Advance every registered handle without blocking.
    fn perform(&mut self) -> Result<Perform, TransferError>;

    /// Transfers completed since the last call.
    fn completions(&mut self) -> Vec<Completion>;

    /// Read status codes and take back the callback state of a finished handle.
    fn finish(&mut self, handle: &mut Self::Handle) -> Finished;

    /// Longest wait before `perform` could make progress. `None` if the
    /// engine has no timer set.
    fn timeout_hint(&mut self) -> Option<Duration>;

    /// Block until a registered transfer has activity or `budget` elapses.
    fn wait(&mut self, budget: Duration);
}

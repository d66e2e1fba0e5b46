//! Pooled HTTP request scheduler over the libcurl multi interface.
//!
//! ```no_run
//! use hsched_core::{config, Request, Response, Scheduler};
//!
//! let cfg = config::load_or_init()?;
//! let mut scheduler = Scheduler::initialize(&cfg)?;
//! let res = scheduler.perform(Request::get("https://example.com/"), Response::buffered());
//! println!("{} {:?}", res.http_status, res.result);
//! scheduler.shutdown();
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod config;
pub mod logging;

pub mod error;
pub mod headers;
pub mod request;
pub mod response;
pub mod scheduler;
pub mod transport;

pub use error::{ErrorKind, TransferError, TransferResult};
pub use request::{BodySource, Method, Request};
pub use response::{BodySink, Response};
pub use scheduler::{Scheduler, Ticket};

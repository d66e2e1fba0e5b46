//! Request scheduler: pooled handles, one cooperative event loop.
//!
//! A caller blocked in [`Scheduler::perform`] drives *every* registered
//! transfer, not only its own. The only blocking point is the bounded
//! readiness wait between steps; the engine is stepped again after every
//! wake, timed out or not.
//!
//! The scheduler is owned by a single thread. Sharing one across threads
//! needs an external lock around the whole value.

mod dispatch;
mod multiplexer;
mod pool;
mod slot;

use anyhow::Result;

use crate::config::SchedulerConfig;
use crate::error::TransferError;
use crate::request::{Request, Upload, UploadReader};
use crate::response::{BodySink, Response};
use crate::transport::{CurlTransport, Exchange, Transfer, Transport};

pub use multiplexer::DEFAULT_POLL_WAIT;
pub use slot::{SlotState, Ticket};

use multiplexer::Multiplexer;
use pool::SlotPool;

/// Owns the slot pool and the multiplexer.
pub struct Scheduler<T: Transport = CurlTransport> {
    pool: SlotPool<T>,
    mux: Multiplexer<T>,
}

impl Scheduler<CurlTransport> {
    /// Set up libcurl and the multi handle from `config`.
    pub fn initialize(config: &SchedulerConfig) -> Result<Self> {
        let transport = CurlTransport::new(config.handle_template(), config.max_requests)?;
        tracing::info!(
            floor = config.min_sessions,
            max_requests = config.max_requests,
            "scheduler initialized"
        );
        Ok(Self::with_transport(transport, config.min_sessions))
    }
}

impl<T: Transport> Scheduler<T> {
    /// Scheduler over an arbitrary engine. `floor` is the number of handles
    /// kept warm after idle eviction.
    pub fn with_transport(transport: T, floor: usize) -> Self {
        Self {
            pool: SlotPool::new(floor),
            mux: Multiplexer::new(transport),
        }
    }

    /// Run `request` to completion and return the populated response.
    ///
    /// Transport failures are reported in [`Response::result`]; nothing is
    /// retried here.
    pub fn perform(&mut self, request: Request, response: Response) -> Response {
        match self.submit(request, response) {
            Ok(ticket) => self.wait(ticket),
            Err(response) => response,
        }
    }

    /// Acquire a slot, configure its handle and register it with the engine.
    /// The transfer advances whenever the scheduler is stepped.
    ///
    /// On failure the response comes back with
    /// `result = Err(TransferError::StartFailed(..))` and no slot is held.
    pub fn submit(&mut self, request: Request, mut response: Response) -> Result<Ticket, Response> {
        if let Err(e) = url::Url::parse(&request.url) {
            response.result = Err(TransferError::StartFailed(format!(
                "invalid URL {}: {}",
                request.url, e
            )));
            return Err(response);
        }

        let index = self.pool.acquire(self.mux.transport_mut());
        let headers = request.header_lines();
        let (fields, upload_size, reader) = match request.body.into_upload() {
            Upload::Fields(data) => (Some(data), None, UploadReader::Empty),
            Upload::Stream { reader, size } => (None, size, reader),
        };
        let transfer = Transfer {
            method: request.method,
            url: request.url,
            headers,
            fields,
            upload_size,
            decode_content: !request.no_encoding,
        };

        let Some(mut handle) = self.pool.slot_mut(index).and_then(|s| s.take_detached()) else {
            // acquire() always leaves a detached handle on the slot.
            self.pool.release_unstarted(index, true);
            response.result = Err(TransferError::Engine("slot has no handle".to_string()));
            return Err(response);
        };

        if let Err(e) = self.mux.transport_mut().configure(&mut handle, &transfer) {
            if let Some(slot) = self.pool.slot_mut(index) {
                slot.handle = Some(slot::SlotHandle::Detached(handle));
            }
            self.pool.release_unstarted(index, false);
            tracing::warn!(url = %transfer.url, "request not started: {}", e);
            response.result = Err(e);
            return Err(response);
        }

        match self.mux.register(handle, index) {
            Ok(mut attached) => {
                let sink = std::mem::replace(&mut response.body, BodySink::Discard);
                let exchange = Exchange::new(sink, reader, transfer.method);
                self.mux.install(&mut attached, exchange);
                tracing::debug!(slot = index, url = %transfer.url, "request registered");
                self.pool.mark_registered(index, attached, response);
                Ok(Ticket { slot: index })
            }
            Err(e) => {
                // The engine consumed the handle; the caller keeps its sink.
                self.pool.release_unstarted(index, true);
                tracing::warn!(url = %transfer.url, "request not started: {}", e);
                response.result = Err(e);
                Err(response)
            }
        }
    }

    /// Drive the engine until the ticket's transfer finishes, then read out
    /// its response and free the slot for reuse.
    pub fn wait(&mut self, ticket: Ticket) -> Response {
        let index = ticket.slot;
        while self.pool.state(index) == Some(SlotState::Registered) {
            self.tick();
            if self.pool.state(index) == Some(SlotState::Registered) {
                let budget = self.mux.wait_budget();
                self.mux.wait(budget);
            }
        }
        self.pool.read_out(index).unwrap_or_else(|| {
            tracing::warn!(slot = index, "ticket has no finished response");
            let mut response = Response::discard();
            response.result = Err(TransferError::Engine("response lost".to_string()));
            response
        })
    }

    /// One non-blocking scheduler iteration: step the engine and, if any
    /// transfer completed, dispatch completions and evict idle handles.
    /// Returns how many transfers are still running.
    pub fn tick(&mut self) -> u32 {
        let running = self.mux.step();
        if (running as usize) < self.pool.active() {
            dispatch::drain(&mut self.pool, &mut self.mux);
            self.pool.evict_idle();
        }
        running
    }

    /// Drive the engine until no transfer is registered. Finished responses
    /// stay parked in their slots until their tickets are waited.
    pub fn run_until_idle(&mut self) {
        while self.pool.active() > 0 {
            self.tick();
            if self.pool.active() > 0 {
                let budget = self.mux.wait_budget();
                self.mux.wait(budget);
            }
        }
    }

    pub fn is_finished(&self, ticket: &Ticket) -> bool {
        self.pool.state(ticket.slot) == Some(SlotState::Finished)
    }

    /// Transport handles currently allocated.
    pub fn live_handles(&self) -> usize {
        self.pool.live_handles()
    }

    /// Slots currently carrying a request that has not finished.
    pub fn active(&self) -> usize {
        self.pool.active()
    }

    pub fn slot_count(&self) -> usize {
        self.pool.len()
    }

    pub fn transport(&self) -> &T {
        self.mux.transport()
    }

    /// Detach anything still registered and release every handle.
    pub fn shutdown(mut self) {
        let attached = self.pool.drain_attached();
        if !attached.is_empty() {
            tracing::warn!(count = attached.len(), "shutting down with transfers in flight");
        }
        for a in attached {
            if let Err(e) = self.mux.unregister(a) {
                tracing::warn!("detaching handle at shutdown: {}", e);
            }
        }
        tracing::info!(
            slots = self.pool.len(),
            live = self.pool.live_handles(),
            "scheduler shut down"
        );
    }
}

//! libcurl engine: reusable `Easy2` handles driven by one `Multi` handle.

use anyhow::{Context, Result};
use curl::easy::{Easy2, Handler, List, ReadError, WriteError};
use curl::multi::{Easy2Handle, Multi};
use std::time::Duration;

use crate::error::{TransferError, TransferResult};
use crate::request::Method;

use super::{Completion, Exchange, Finished, HandleTemplate, Perform, Transfer, Transport};

/// Easy2 handler that forwards curl callbacks to the slot's current exchange.
/// Between transfers it holds nothing and accepts (and drops) any data.
#[derive(Default)]
pub struct SlotHandler {
    exchange: Option<Exchange>,
}

impl Handler for SlotHandler {
    fn header(&mut self, data: &[u8]) -> bool {
        if let Some(exchange) = self.exchange.as_mut() {
            exchange.on_header(data);
        }
        true
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        match self.exchange.as_mut() {
            Some(exchange) => Ok(exchange.on_body(data)),
            None => Ok(data.len()),
        }
    }

    fn read(&mut self, data: &mut [u8]) -> Result<usize, ReadError> {
        match self.exchange.as_mut() {
            Some(exchange) => exchange.on_upload(data).map_err(|e| {
                tracing::warn!("request body read failed: {}", e);
                ReadError::Abort
            }),
            None => Ok(0),
        }
    }
}

/// Transport backed by the curl crate's multi interface.
pub struct CurlTransport {
    multi: Multi,
    template: HandleTemplate,
}

impl CurlTransport {
    /// Initialise libcurl and create the multi handle. `max_connections`
    /// caps total open connections (0 = libcurl default).
    pub fn new(template: HandleTemplate, max_connections: usize) -> Result<Self> {
        curl::init();
        let mut multi = Multi::new();
        if max_connections > 0 {
            multi
                .set_max_total_connections(max_connections)
                .context("curl multi: max total connections")?;
        }
        Ok(Self { multi, template })
    }

    pub fn template(&self) -> &HandleTemplate {
        &self.template
    }

    fn apply_template(&self, easy: &mut Easy2<SlotHandler>) -> Result<(), curl::Error> {
        let t = &self.template;
        easy.useragent(&t.user_agent)?;
        easy.connect_timeout(t.connect_timeout)?;
        easy.follow_location(t.follow_redirects)?;
        if t.follow_redirects {
            easy.max_redirections(t.max_redirects)?;
        }
        if let Some(limit) = t.low_speed_limit {
            easy.low_speed_limit(limit)?;
        }
        if let Some(time) = t.low_speed_time {
            easy.low_speed_time(time)?;
        }
        Ok(())
    }

    fn setup(&self, easy: &mut Easy2<SlotHandler>, transfer: &Transfer) -> TransferResult {
        // Keeps the connection and DNS caches; clears every option.
        easy.reset();
        self.apply_template(easy).map_err(setup_error("handle template"))?;
        easy.url(&transfer.url).map_err(setup_error("url"))?;
        if transfer.decode_content {
            // Empty string: every encoding libcurl was built with.
            easy.accept_encoding("").map_err(setup_error("accept encoding"))?;
        }

        let mut list = List::new();
        for line in &transfer.headers {
            list.append(line).map_err(setup_error("header list"))?;
        }

        match transfer.method {
            Method::Get => easy.get(true).map_err(setup_error("method GET"))?,
            Method::Head => easy.nobody(true).map_err(setup_error("method HEAD"))?,
            Method::Post => {
                easy.post(true).map_err(setup_error("method POST"))?;
                match (&transfer.fields, transfer.upload_size) {
                    (Some(fields), _) => easy
                        .post_fields_copy(fields)
                        .map_err(setup_error("post fields"))?,
                    (None, Some(size)) => easy
                        .post_field_size(size)
                        .map_err(setup_error("post size"))?,
                    (None, None) => list
                        .append("Transfer-Encoding: chunked")
                        .map_err(setup_error("header list"))?,
                }
            }
        }
        easy.http_headers(list).map_err(setup_error("header list"))?;
        Ok(())
    }
}

fn setup_error(what: &'static str) -> impl Fn(curl::Error) -> TransferError {
    move |e| TransferError::StartFailed(format!("curl setup ({}): {}", what, e))
}

impl Transport for CurlTransport {
    type Handle = Easy2<SlotHandler>;
    type Attached = Easy2Handle<SlotHandler>;

    fn create_handle(&mut self) -> Self::Handle {
        let mut easy = Easy2::new(SlotHandler::default());
        if let Err(e) = self.apply_template(&mut easy) {
            // Reapplied on every configure; a bad template surfaces there.
            tracing::warn!("curl: applying handle template: {}", e);
        }
        easy
    }

    fn configure(&mut self, handle: &mut Self::Handle, transfer: &Transfer) -> TransferResult {
        self.setup(handle, transfer)
    }

    fn register(
        &mut self,
        handle: Self::Handle,
        token: usize,
    ) -> Result<Self::Attached, TransferError> {
        let mut attached = self
            .multi
            .add2(handle)
            .map_err(|e| TransferError::StartFailed(format!("curl multi add: {}", e)))?;
        attached
            .set_token(token)
            .map_err(|e| TransferError::StartFailed(format!("curl multi token: {}", e)))?;
        Ok(attached)
    }

    fn install(&mut self, attached: &mut Self::Attached, exchange: Exchange) {
        attached.get_mut().exchange = Some(exchange);
    }

    fn unregister(&mut self, attached: Self::Attached) -> Result<Self::Handle, TransferError> {
        self.multi
            .remove2(attached)
            .map_err(|e| TransferError::Engine(format!("curl multi remove: {}", e)))
    }

    fn perform(&mut self) -> Result<Perform, TransferError> {
        match self.multi.perform() {
            Ok(running) => Ok(Perform::Running(running)),
            Err(e) if e.is_call_perform() => Ok(Perform::CallAgain),
            Err(e) => Err(TransferError::Engine(format!("curl multi perform: {}", e))),
        }
    }

    fn completions(&mut self) -> Vec<Completion> {
        let mut done = Vec::new();
        self.multi.messages(|msg| match (msg.token(), msg.result()) {
            (Ok(token), Some(result)) => done.push(Completion {
                token,
                result: result.map_err(TransferError::from),
            }),
            _ => tracing::debug!("ignoring curl multi message that is not a completion"),
        });
        done
    }

    fn finish(&mut self, handle: &mut Self::Handle) -> Finished {
        let http_status = handle.response_code().unwrap_or(0);
        let connect_code = handle.http_connectcode().unwrap_or(0);
        Finished {
            http_status,
            connect_code,
            exchange: handle.get_mut().exchange.take(),
        }
    }

    fn timeout_hint(&mut self) -> Option<Duration> {
        match self.multi.get_timeout() {
            Ok(hint) => hint,
            Err(e) => {
                tracing::warn!("curl multi timeout: {}", e);
                None
            }
        }
    }

    fn wait(&mut self, budget: Duration) {
        if let Err(e) = self.multi.wait(&mut [], budget) {
            tracing::warn!("curl multi wait: {}", e);
        }
    }
}

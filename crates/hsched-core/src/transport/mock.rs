//! Scripted in-memory transport for scheduler tests.
//!
//! Every registered transfer completes after a fixed number of `perform`
//! calls with a canned status, header block and body.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use crate::error::{TransferError, TransferResult};
use crate::request::Method;

use super::{Completion, Exchange, Finished, Perform, Transfer, Transport};

#[derive(Debug, Clone)]
pub(crate) struct Canned {
    pub status: u32,
    /// Raw header lines, status line(s) included.
    pub header_lines: Vec<String>,
    pub body: Vec<u8>,
    pub result: TransferResult,
    /// `perform` calls before the transfer completes.
    pub ticks: u32,
    /// Respond with the uploaded request body instead of `body`.
    pub echo_upload: bool,
}

impl Canned {
    pub fn ok(body: &[u8]) -> Self {
        Self {
            status: 200,
            header_lines: vec![
                "HTTP/1.1 200 OK\r\n".to_string(),
                format!("Content-Length: {}\r\n", body.len()),
                "\r\n".to_string(),
            ],
            body: body.to_vec(),
            result: Ok(()),
            ticks: 1,
            echo_upload: false,
        }
    }

    pub fn ticks(mut self, ticks: u32) -> Self {
        self.ticks = ticks;
        self
    }
}

pub(crate) struct MockHandle {
    pub id: usize,
    exchange: Option<Exchange>,
    url: String,
    status: u32,
}

pub(crate) struct MockAttached {
    token: usize,
}

struct InFlight {
    handle: MockHandle,
    remaining: u32,
    done: bool,
}

/// Requests as the engine saw them, in configure order.
#[derive(Debug, Clone)]
pub(crate) struct Seen {
    pub handle_id: usize,
    pub url: String,
    pub method: Method,
    pub headers: Vec<String>,
    pub fields: Option<Vec<u8>>,
    pub upload_size: Option<u64>,
    pub decode_content: bool,
}

pub(crate) struct MockTransport {
    default: Canned,
    per_url: HashMap<String, Canned>,
    in_flight: HashMap<usize, InFlight>,
    completions: Vec<Completion>,
    next_id: usize,
    pub created: usize,
    pub seen: Vec<Seen>,
    pub fail_register: bool,
    pub fail_configure: bool,
    /// Tokens passed to `unregister`, shared so it outlives the transport.
    pub detached: Rc<RefCell<Vec<usize>>>,
    pub call_again: u32,
    pub hint: Option<Duration>,
    pub waits: Vec<Duration>,
}

impl MockTransport {
    pub fn new(default: Canned) -> Self {
        Self {
            default,
            per_url: HashMap::new(),
            in_flight: HashMap::new(),
            completions: Vec::new(),
            next_id: 0,
            created: 0,
            seen: Vec::new(),
            fail_register: false,
            fail_configure: false,
            detached: Rc::new(RefCell::new(Vec::new())),
            call_again: 0,
            hint: Some(Duration::ZERO),
            waits: Vec::new(),
        }
    }

    /// Transfers registered and not yet unregistered.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn respond(&mut self, url: &str, canned: Canned) {
        self.per_url.insert(url.to_string(), canned);
    }

    /// Queue a completion for a token the engine never registered.
    pub fn inject_completion(&mut self, token: usize, result: TransferResult) {
        self.completions.push(Completion { token, result });
    }

    fn canned_for(&self, url: &str) -> Canned {
        self.per_url
            .get(url)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }

    fn run_transfer(handle: &mut MockHandle, canned: &Canned) {
        let Some(exchange) = handle.exchange.as_mut() else {
            return;
        };
        let mut upload = Vec::new();
        let mut buf = [0u8; 3];
        while let Ok(n) = exchange.on_upload(&mut buf) {
            if n == 0 {
                break;
            }
            upload.extend_from_slice(&buf[..n]);
        }
        for line in &canned.header_lines {
            exchange.on_header(line.as_bytes());
        }
        let body = if canned.echo_upload { &upload } else { &canned.body };
        for chunk in body.chunks(2) {
            exchange.on_body(chunk);
        }
        handle.status = canned.status;
    }
}

impl Transport for MockTransport {
    type Handle = MockHandle;
    type Attached = MockAttached;

    fn create_handle(&mut self) -> MockHandle {
        self.created += 1;
        self.next_id += 1;
        MockHandle {
            id: self.next_id,
            exchange: None,
            url: String::new(),
            status: 0,
        }
    }

    fn configure(&mut self, handle: &mut MockHandle, transfer: &Transfer) -> TransferResult {
        self.seen.push(Seen {
            handle_id: handle.id,
            url: transfer.url.clone(),
            method: transfer.method,
            headers: transfer.headers.clone(),
            fields: transfer.fields.clone(),
            upload_size: transfer.upload_size,
            decode_content: transfer.decode_content,
        });
        if self.fail_configure {
            return Err(TransferError::StartFailed("mock configure refused".to_string()));
        }
        handle.url = transfer.url.clone();
        handle.status = 0;
        handle.exchange = None;
        Ok(())
    }

    fn register(
        &mut self,
        handle: MockHandle,
        token: usize,
    ) -> Result<MockAttached, TransferError> {
        if self.fail_register {
            return Err(TransferError::StartFailed("mock register refused".to_string()));
        }
        let remaining = self.canned_for(&handle.url).ticks;
        self.in_flight.insert(
            token,
            InFlight {
                handle,
                remaining,
                done: false,
            },
        );
        Ok(MockAttached { token })
    }

    fn install(&mut self, attached: &mut MockAttached, exchange: Exchange) {
        if let Some(f) = self.in_flight.get_mut(&attached.token) {
            f.handle.exchange = Some(exchange);
        }
    }

    fn unregister(&mut self, attached: MockAttached) -> Result<MockHandle, TransferError> {
        self.detached.borrow_mut().push(attached.token);
        self.in_flight
            .remove(&attached.token)
            .map(|f| f.handle)
            .ok_or_else(|| TransferError::Engine("mock: unknown token".to_string()))
    }

    fn perform(&mut self) -> Result<Perform, TransferError> {
        if self.call_again > 0 {
            self.call_again -= 1;
            return Ok(Perform::CallAgain);
        }
        let mut tokens: Vec<usize> = self.in_flight.keys().copied().collect();
        tokens.sort_unstable();
        for token in tokens {
            let canned = {
                let f = &self.in_flight[&token];
                if f.done {
                    continue;
                }
                self.canned_for(&f.handle.url)
            };
            let Some(f) = self.in_flight.get_mut(&token) else {
                continue;
            };
            f.remaining = f.remaining.saturating_sub(1);
            if f.remaining == 0 {
                Self::run_transfer(&mut f.handle, &canned);
                f.done = true;
                self.completions.push(Completion {
                    token,
                    result: canned.result.clone(),
                });
            }
        }
        let running = self.in_flight.values().filter(|f| !f.done).count();
        Ok(Perform::Running(running as u32))
    }

    fn completions(&mut self) -> Vec<Completion> {
        std::mem::take(&mut self.completions)
    }

    fn finish(&mut self, handle: &mut MockHandle) -> Finished {
        Finished {
            http_status: handle.status,
            connect_code: 0,
            exchange: handle.exchange.take(),
        }
    }

    fn timeout_hint(&mut self) -> Option<Duration> {
        self.hint
    }

    fn wait(&mut self, budget: Duration) {
        self.waits.push(budget);
    }
}

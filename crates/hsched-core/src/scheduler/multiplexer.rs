//! Batch driver over the transport engine.

use std::time::Duration;

use crate::error::TransferError;
use crate::transport::{Completion, Exchange, Perform, Transport};

/// Wait used when the engine gives no hint, and the cap on any hint.
pub const DEFAULT_POLL_WAIT: Duration = Duration::from_millis(50);

pub(crate) struct Multiplexer<T: Transport> {
    transport: T,
}

impl<T: Transport> Multiplexer<T> {
    pub(crate) fn new(transport: T) -> Self {
        Self { transport }
    }

    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    pub(crate) fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub(crate) fn register(
        &mut self,
        handle: T::Handle,
        token: usize,
    ) -> Result<T::Attached, TransferError> {
        self.transport.register(handle, token)
    }

    /// Attach callback state to a freshly registered handle, before the
    /// next step can drive it.
    pub(crate) fn install(&mut self, attached: &mut T::Attached, exchange: Exchange) {
        self.transport.install(attached, exchange);
    }

    pub(crate) fn unregister(&mut self, attached: T::Attached) -> Result<T::Handle, TransferError> {
        self.transport.unregister(attached)
    }

    /// Advance every registered handle until the engine has no more
    /// immediate work. Returns how many transfers are still running.
    pub(crate) fn step(&mut self) -> u32 {
        loop {
            match self.transport.perform() {
                Ok(Perform::CallAgain) => continue,
                Ok(Perform::Running(n)) => return n,
                Err(e) => {
                    // Forces a completion drain; the engine reports what it can.
                    tracing::warn!("multiplexer step failed: {}", e);
                    return 0;
                }
            }
        }
    }

    pub(crate) fn drain_completions(&mut self) -> Vec<Completion> {
        self.transport.completions()
    }

    /// How long the scheduler may block before the next step.
    pub(crate) fn wait_budget(&mut self) -> Duration {
        match self.transport.timeout_hint() {
            Some(hint) => hint.min(DEFAULT_POLL_WAIT),
            None => DEFAULT_POLL_WAIT,
        }
    }

    /// Block for at most `budget`. A zero budget returns immediately.
    pub(crate) fn wait(&mut self, budget: Duration) {
        if budget.is_zero() {
            return;
        }
        self.transport.wait(budget);
    }
}

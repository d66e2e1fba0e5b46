//! Pool slot: binds at most one transport handle to one in-flight request.

use crate::error::TransferResult;
use crate::response::Response;
use crate::transport::Transport;

/// Slot lifecycle: `Idle -> Acquired -> Registered -> Finished -> Idle`,
/// plus `Acquired -> Idle` when the request never starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Idle,
    Acquired,
    Registered,
    /// Transfer done; result not yet read out by its ticket.
    Finished,
}

pub(crate) enum SlotHandle<T: Transport> {
    Detached(T::Handle),
    Attached(T::Attached),
}

pub(crate) struct Slot<T: Transport> {
    pub(crate) state: SlotState,
    pub(crate) handle: Option<SlotHandle<T>>,
    pub(crate) result: TransferResult,
    /// Response being populated; present from registration until read-out.
    pub(crate) target: Option<Response>,
}

impl<T: Transport> Slot<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: SlotState::Idle,
            handle: None,
            result: Ok(()),
            target: None,
        }
    }

    pub(crate) fn in_use(&self) -> bool {
        matches!(self.state, SlotState::Acquired | SlotState::Registered)
    }

    pub(crate) fn has_detached_handle(&self) -> bool {
        matches!(self.handle, Some(SlotHandle::Detached(_)))
    }

    pub(crate) fn take_detached(&mut self) -> Option<T::Handle> {
        match self.handle.take() {
            Some(SlotHandle::Detached(h)) => Some(h),
            other => {
                self.handle = other;
                None
            }
        }
    }

    pub(crate) fn take_attached(&mut self) -> Option<T::Attached> {
        match self.handle.take() {
            Some(SlotHandle::Attached(a)) => Some(a),
            other => {
                self.handle = other;
                None
            }
        }
    }
}

/// Claim on a submitted request. Redeem it with
/// [`Scheduler::wait`](super::Scheduler::wait).
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a submitted request keeps its slot until the ticket is waited"]
pub struct Ticket {
    pub(crate) slot: usize,
}

impl Ticket {
    /// Pool position of the slot carrying this request.
    pub fn slot(&self) -> usize {
        self.slot
    }
}

//! Growable slot pool with lazy handle allocation and idle eviction.
//!
//! Slots are never removed; only their handles are freed and recreated.
//! Eviction never takes the number of live handles below the floor.

use crate::error::TransferResult;
use crate::response::Response;
use crate::transport::Transport;

use super::slot::{Slot, SlotHandle, SlotState};

pub(crate) struct SlotPool<T: Transport> {
    slots: Vec<Slot<T>>,
    live_handles: usize,
    active: usize,
    floor: usize,
}

impl<T: Transport> SlotPool<T> {
    pub(crate) fn new(floor: usize) -> Self {
        Self {
            slots: Vec::new(),
            live_handles: 0,
            active: 0,
            floor,
        }
    }

    pub(crate) fn live_handles(&self) -> usize {
        self.live_handles
    }

    pub(crate) fn active(&self) -> usize {
        self.active
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn state(&self, index: usize) -> Option<SlotState> {
        self.slots.get(index).map(|s| s.state)
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut Slot<T>> {
        self.slots.get_mut(index)
    }

    /// First idle slot (appending one if none), with a handle ready.
    pub(crate) fn acquire(&mut self, transport: &mut T) -> usize {
        let index = match self.slots.iter().position(|s| s.state == SlotState::Idle) {
            Some(i) => i,
            None => {
                self.slots.push(Slot::new());
                tracing::debug!(slots = self.slots.len(), "slot pool grew");
                self.slots.len() - 1
            }
        };
        let slot = &mut self.slots[index];
        if slot.handle.is_none() {
            slot.handle = Some(SlotHandle::Detached(transport.create_handle()));
            self.live_handles += 1;
            tracing::debug!(slot = index, live = self.live_handles, "allocated transport handle");
        }
        slot.state = SlotState::Acquired;
        slot.result = Ok(());
        slot.target = None;
        self.active += 1;
        index
    }

    /// Return an acquired slot that never started. `handle_lost` is set when
    /// the engine consumed the handle on a failed registration.
    pub(crate) fn release_unstarted(&mut self, index: usize, handle_lost: bool) {
        let Some(slot) = self.slots.get_mut(index) else {
            return;
        };
        debug_assert_eq!(slot.state, SlotState::Acquired);
        slot.state = SlotState::Idle;
        slot.target = None;
        if handle_lost && slot.handle.is_none() {
            self.live_handles -= 1;
        }
        self.active -= 1;
    }

    pub(crate) fn mark_registered(&mut self, index: usize, attached: T::Attached, target: Response) {
        let slot = &mut self.slots[index];
        slot.handle = Some(SlotHandle::Attached(attached));
        slot.target = Some(target);
        slot.state = SlotState::Registered;
    }

    /// Record a completed transfer. `handle` is `None` when the engine could
    /// not give the handle back.
    pub(crate) fn mark_finished(
        &mut self,
        index: usize,
        result: TransferResult,
        handle: Option<T::Handle>,
    ) {
        let slot = &mut self.slots[index];
        slot.result = result;
        slot.state = SlotState::Finished;
        match handle {
            Some(h) => slot.handle = Some(SlotHandle::Detached(h)),
            None => self.live_handles -= 1,
        }
        self.active -= 1;
    }

    /// Take the response of a finished slot and make the slot idle again.
    pub(crate) fn read_out(&mut self, index: usize) -> Option<Response> {
        let slot = self.slots.get_mut(index)?;
        if slot.state != SlotState::Finished {
            return None;
        }
        slot.state = SlotState::Idle;
        let result = std::mem::replace(&mut slot.result, Ok(()));
        let mut response = slot.target.take()?;
        response.result = result;
        Some(response)
    }

    /// Free handles of slots not in use while more than `floor` are live.
    pub(crate) fn evict_idle(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if self.live_handles <= self.floor {
                break;
            }
            if !slot.in_use() && slot.has_detached_handle() {
                slot.handle = None;
                self.live_handles -= 1;
                tracing::debug!(slot = index, live = self.live_handles, "evicted idle handle");
            }
        }
    }

    /// Every slot that still has a registered handle, for teardown.
    pub(crate) fn drain_attached(&mut self) -> Vec<T::Attached> {
        let mut out = Vec::new();
        for slot in &mut self.slots {
            if let Some(a) = slot.take_attached() {
                out.push(a);
            }
        }
        out
    }
}

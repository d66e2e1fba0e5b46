//! Completion dispatch: match engine completions to slots and finalize
//! their responses.

use crate::error::TransferResult;
use crate::response::Response;
use crate::transport::{Finished, Transport};

use super::multiplexer::Multiplexer;
use super::pool::SlotPool;
use super::slot::SlotState;

/// Drain every completion the engine has queued. Returns how many were
/// matched to a slot.
pub(crate) fn drain<T: Transport>(pool: &mut SlotPool<T>, mux: &mut Multiplexer<T>) -> usize {
    let mut dispatched = 0;
    for completion in mux.drain_completions() {
        let token = completion.token;
        let attached = match pool.slot_mut(token) {
            Some(slot) if slot.state == SlotState::Registered => slot.take_attached(),
            _ => None,
        };
        let Some(attached) = attached else {
            tracing::warn!(token, "completion for a handle no slot owns; discarded");
            continue;
        };

        let (result, handle) = match mux.unregister(attached) {
            Ok(mut handle) => {
                let finished = mux.transport_mut().finish(&mut handle);
                if let Some(slot) = pool.slot_mut(token) {
                    if let Some(target) = slot.target.as_mut() {
                        finalize(target, &completion.result, finished);
                    }
                }
                (completion.result, Some(handle))
            }
            Err(e) => {
                tracing::warn!(slot = token, "detaching finished handle: {}", e);
                (Err(e), None)
            }
        };

        tracing::debug!(slot = token, ok = result.is_ok(), "transfer finished");
        pool.mark_finished(token, result, handle);
        dispatched += 1;
    }
    dispatched
}

fn finalize(target: &mut Response, result: &TransferResult, finished: Finished) {
    target.result = result.clone();
    target.http_status = finished.http_status;
    target.connect_code = finished.connect_code;
    if let Some(exchange) = finished.exchange {
        let (headers, body) = exchange.into_parts();
        target.headers = headers;
        target.body = body;
    }
}

use crate::channel::{register_producer_impl, ChannelInner};
use crate::error::RegisterError;
use crate::invariants::{debug_assert_slot_len_in_bounds, debug_assert_wait_queue_distinct};
use std::sync::Arc;

/// A producer's view of a channel, handed to the closure passed to
/// [`Channel::register_producer`](crate::channel::Channel::register_producer).
///
/// Carries the opaque per-producer `context` the caller supplied at registration time,
/// so producer worker closures don't need to capture it separately.
pub struct ProducerHandle<C> {
    inner: Arc<ChannelInner>,
    id: usize,
    context: C,
}

impl<C> ProducerHandle<C> {
    pub(crate) fn new(inner: Arc<ChannelInner>, id: usize, context: C) -> Self {
        Self { inner, id, context }
    }

    /// The context value supplied when this producer was registered.
    pub fn context(&self) -> &C {
        &self.context
    }

    /// Sends one message, blocking until this producer is granted the slot.
    ///
    /// `data.len() == 0` is sent as a distinguished empty message (delivered to the
    /// consumer callback as `None`, per the Empty-threshold scenario) rather than being
    /// rejected.
    ///
    /// Returns `false` without blocking if the channel is already closed.
    ///
    /// # Panics / aborts
    ///
    /// Aborts the process if `data.len()` exceeds the channel's configured
    /// `buffer_size` — an oversized payload is a caller bug, not a runtime condition.
    pub fn send(&self, data: &[u8]) -> bool {
        if data.len() > self.inner.config.buffer_size {
            crate::error::fatal!(
                "ProducerHandle::send: payload of {} bytes exceeds buffer_size {}",
                data.len(),
                self.inner.config.buffer_size
            );
        }

        let mut state = self.inner.lock_state();
        if state.closed {
            return false;
        }

        let must_queue = state.pending || !state.wait_queue.is_empty();
        if must_queue {
            debug_assert_wait_queue_distinct!(state.wait_queue, self.id);
            state.wait_queue.push_back(self.id);
            #[cfg(test)]
            self.inner
                .max_wait_queue_len
                .fetch_max(state.wait_queue.len(), std::sync::atomic::Ordering::Relaxed);
            loop {
                state = self
                    .inner
                    .producer_cvs
                    .get(self.id)
                    .expect("producer id within max_producers")
                    .wait(state)
                    .unwrap_or_else(|_| crate::error::fatal!("channel mutex poisoned"));
                if state.closed {
                    state.wait_queue.retain(|&pid| pid != self.id);
                    if state.next_handoff == Some(self.id) {
                        state.next_handoff = None;
                    }
                    return false;
                }
                if state.next_handoff == Some(self.id) && !state.pending {
                    break;
                }
            }
            let popped = state.wait_queue.pop_front();
            debug_assert!(popped == Some(self.id), "INV-HS-01: handoff recipient must be queue head");
            state.next_handoff = None;
        }

        state.slot[..data.len()].copy_from_slice(data);
        state.slot_len = data.len();
        debug_assert_slot_len_in_bounds!(state.slot_len, state.slot.len());
        state.pending = true;

        debug_assert!(
            state.next_handoff.is_none(),
            "INV-HS-01: depositing producer must not itself be mid-election"
        );

        drop(state);
        self.inner.main_cv.notify_one();
        true
    }

    /// Convenience for sending a zero-length message.
    pub fn send_empty(&self) -> bool {
        self.send(&[])
    }

    /// Cooperative-cancellation probe: returns `true` once the channel has been
    /// closed, so a long-running producer loop can check this between messages
    /// instead of blocking forever in `send`.
    pub fn ping(&self) -> bool {
        self.inner.lock_state().closed
    }

    /// Registers another producer on the same channel.
    ///
    /// # Errors
    ///
    /// See [`Channel::register_producer`](crate::channel::Channel::register_producer).
    pub fn register_producer(
        &self,
        task: impl FnOnce(ProducerHandle<C>) + Send + 'static,
        context: C,
    ) -> Result<(), RegisterError>
    where
        C: Send + 'static,
    {
        register_producer_impl(&self.inner, task, context)
    }
}

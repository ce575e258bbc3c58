use crate::channel::{register_producer_impl, ChannelInner};
use crate::error::RegisterError;
use crate::invariants::debug_assert_handoff_matches_queue_head;
use std::sync::Arc;

/// Callback invoked once, from the consumer thread, if construction or delivery hits
/// a recoverable resource error under `ErrorPolicy::Report`.
pub(crate) type ConsumerErrCb<C> = Box<dyn Fn(ConsumerHandle<C>) + Send>;
type ConsumerCb<C> = Box<dyn FnMut(ConsumerHandle<C>, Option<Vec<u8>>, bool) + Send>;

/// The consumer's view of a channel, handed to the consumer callback on every
/// invocation.
///
/// A fresh handle is constructed per callback invocation; all of them share the same
/// underlying channel state through `Arc`, so calling [`ConsumerHandle::close`] from
/// any one of them is visible to the next.
pub struct ConsumerHandle<C> {
    inner: Arc<ChannelInner>,
    _context: std::marker::PhantomData<fn() -> C>,
}

impl<C> ConsumerHandle<C> {
    fn new(inner: Arc<ChannelInner>) -> Self {
        Self {
            inner,
            _context: std::marker::PhantomData,
        }
    }

    /// Marks the channel closed: no further producers may register, and every
    /// producer blocked in `send` or a future `ping` call observes the closed state.
    ///
    /// Idempotent — closing an already-closed channel is a no-op, not an error.
    pub fn close(&self) {
        let mut state = self.inner.lock_state();
        if state.closed {
            return;
        }
        state.closed = true;
        drop(state);
        self.inner.main_cv.notify_all();
        for cv in &self.inner.producer_cvs {
            cv.notify_all();
        }
    }

    /// Registers a new producer from within the consumer callback.
    ///
    /// # Errors
    ///
    /// See [`Channel::register_producer`](crate::channel::Channel::register_producer).
    pub fn register_producer(
        &self,
        task: impl FnOnce(crate::producer::ProducerHandle<C>) + Send + 'static,
        context: C,
    ) -> Result<(), RegisterError>
    where
        C: Send + 'static,
    {
        register_producer_impl(&self.inner, task, context)
    }
}

/// Runs on the dedicated consumer thread spawned by `Channel::create`. Delivers every
/// pending message to `consumer_cb` in handoff order, then a final `(handle, None,
/// true)` call once the channel is closed and drained, and returns.
pub(crate) fn consumer_loop<C>(
    inner: Arc<ChannelInner>,
    mut consumer_cb: ConsumerCb<C>,
    consumer_err_cb: Option<ConsumerErrCb<C>>,
) {
    let mut delivered = 0usize;
    loop {
        let mut state = inner.lock_state();
        while !state.pending && !state.closed {
            state = inner
                .main_cv
                .wait(state)
                .unwrap_or_else(|_| crate::error::fatal!("channel mutex poisoned"));
        }

        if state.pending {
            let len = state.slot_len;
            let payload = if len == 0 {
                Some(Vec::new())
            } else {
                let mut buf = Vec::new();
                if should_fail_delivery(&inner, delivered) || buf.try_reserve_exact(len).is_err() {
                    None
                } else {
                    buf.extend_from_slice(&state.slot[..len]);
                    Some(buf)
                }
            };
            delivered += 1;

            state.pending = false;
            state.slot_len = 0;

            debug_assert!(
                state.next_handoff.is_none(),
                "INV-HS-01: election must be idle between deliveries"
            );
            let elected = if !state.closed {
                state.wait_queue.front().copied()
            } else {
                None
            };
            state.next_handoff = elected;
            debug_assert_handoff_matches_queue_head!(state.next_handoff, state.wait_queue.front().copied());
            drop(state);

            if let Some(id) = elected {
                inner.producer_cvs[id].notify_one();
            }

            match payload {
                Some(data) => {
                    let data = if len == 0 { None } else { Some(data) };
                    consumer_cb(ConsumerHandle::new(Arc::clone(&inner)), data, false);
                }
                None => {
                    if let Some(err_cb) = consumer_err_cb.as_ref() {
                        err_cb(ConsumerHandle::new(Arc::clone(&inner)));
                    } else {
                        crate::error::fatal!("consumer: delivery allocation failed with no error callback");
                    }
                }
            }
            continue;
        }

        debug_assert!(state.closed);
        drop(state);
        consumer_cb(ConsumerHandle::new(Arc::clone(&inner)), None, true);
        return;
    }
}

#[cfg(not(test))]
fn should_fail_delivery(_inner: &Arc<ChannelInner>, _delivered: usize) -> bool {
    false
}

#[cfg(test)]
fn should_fail_delivery(inner: &Arc<ChannelInner>, delivered: usize) -> bool {
    *inner.fail_delivery_at.lock().unwrap() == Some(delivered)
}

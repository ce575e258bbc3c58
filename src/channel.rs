use crate::config::{ChannelConfig, ErrorPolicy};
use crate::consumer::{consumer_loop, ConsumerErrCb, ConsumerHandle};
use crate::error::{fatal, CreateError, RegisterError, ResourceError};
use crate::invariants::debug_assert_producer_counts;
use crate::producer::ProducerHandle;
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle, ThreadId};

/// Liveness bookkeeping for one registered producer.
///
/// The producer's opaque context lives on its own [`ProducerHandle`], not here —
/// see the REDESIGN FLAGS section of `SPEC_FULL.md`.
pub(crate) struct ProducerRecord {
    pub(crate) done: bool,
}

/// Everything the channel lock protects.
pub(crate) struct State {
    pub(crate) slot: Vec<u8>,
    pub(crate) slot_len: usize,
    pub(crate) pending: bool,
    pub(crate) closed: bool,
    pub(crate) joined: bool,
    pub(crate) producer_count: usize,
    pub(crate) producers_done: usize,
    pub(crate) producers: Vec<ProducerRecord>,
    pub(crate) producer_threads: Vec<JoinHandle<()>>,
    pub(crate) wait_queue: VecDeque<usize>,
    pub(crate) next_handoff: Option<usize>,
}

/// Shared channel state, reachable from the `Channel` handle, every `ProducerHandle`,
/// and the `ConsumerHandle` passed to callbacks.
pub(crate) struct ChannelInner {
    pub(crate) lock: Mutex<State>,
    pub(crate) main_cv: Condvar,
    /// One condition variable per producer slot, sized to `max_producers` at
    /// construction and never reallocated.
    pub(crate) producer_cvs: Vec<Condvar>,
    pub(crate) config: ChannelConfig,
    /// Test-only seam for injecting a consumer-side allocation failure at a specific
    /// delivery index (see `consumer.rs`). Always `None` outside `#[cfg(test)]`.
    #[cfg(test)]
    pub(crate) fail_delivery_at: Mutex<Option<usize>>,
    /// Test-only seam tracking the largest `wait_queue` length observed by any
    /// `send` call, so the wait-queue bound invariant can be checked directly instead
    /// of inferred from `join()` returning.
    #[cfg(test)]
    pub(crate) max_wait_queue_len: std::sync::atomic::AtomicUsize,
}

impl ChannelInner {
    pub(crate) fn lock_state(&self) -> std::sync::MutexGuard<'_, State> {
        self.lock.lock().unwrap_or_else(|_| fatal!("channel mutex poisoned"))
    }
}

/// A multi-producer single-consumer rendezvous channel.
///
/// Exclusively owned by the thread that created it (or, if
/// [`ChannelConfig::disable_thread_safety`] was used, any thread that later calls
/// [`Channel::join`]). Producers and the consumer interact with the channel through
/// [`ProducerHandle`] and [`ConsumerHandle`], both of which share the channel's inner
/// state through an `Arc` and may be freely sent to worker threads.
pub struct Channel<C> {
    inner: Arc<ChannelInner>,
    consumer_thread: Option<JoinHandle<()>>,
    parent_thread: ThreadId,
    _context: std::marker::PhantomData<fn() -> C>,
}

impl<C: Send + 'static> Channel<C> {
    /// Creates a new channel with zero producers registered and spawns its dedicated
    /// consumer thread.
    ///
    /// `consumer_cb` is required; `consumer_err_cb` is required iff
    /// `config.error_policy == ErrorPolicy::Report` (fatal otherwise — this is a
    /// programming bug, not a runtime error, so it aborts regardless of the policy
    /// it would otherwise gate).
    ///
    /// # Errors
    ///
    /// Returns `Err(CreateError::OutOfResources(..))` under `ErrorPolicy::Report` if
    /// an allocation or the consumer thread spawn fails. Under `ErrorPolicy::Abort`
    /// the same conditions terminate the process instead.
    pub fn create(
        config: ChannelConfig,
        consumer_cb: impl FnMut(ConsumerHandle<C>, Option<Vec<u8>>, bool) + Send + 'static,
        consumer_err_cb: Option<impl Fn(ConsumerHandle<C>) + Send + 'static>,
    ) -> Result<Self, CreateError> {
        if config.max_producers == 0 {
            fatal!("Channel::create: max_producers must be at least 1");
        }
        if config.error_policy == ErrorPolicy::Report && consumer_err_cb.is_none() {
            fatal!("Channel::create: consumer_err_cb is required under ErrorPolicy::Report");
        }

        let mut slot = Vec::new();
        if slot.try_reserve_exact(config.buffer_size).is_err() {
            return Self::resource_exhausted(config.error_policy, ResourceError::Oom);
        }
        slot.resize(config.buffer_size, 0);

        let mut producers = Vec::new();
        let mut producer_threads = Vec::new();
        let mut producer_cvs = Vec::new();
        if producers.try_reserve_exact(config.max_producers).is_err()
            || producer_threads.try_reserve_exact(config.max_producers).is_err()
            || producer_cvs.try_reserve_exact(config.max_producers).is_err()
        {
            return Self::resource_exhausted(config.error_policy, ResourceError::Oom);
        }
        producer_cvs.resize_with(config.max_producers, Condvar::new);

        let state = State {
            slot,
            slot_len: 0,
            pending: false,
            closed: false,
            joined: false,
            producer_count: 0,
            producers_done: 0,
            producers,
            producer_threads,
            wait_queue: VecDeque::new(),
            next_handoff: None,
        };

        let inner = Arc::new(ChannelInner {
            lock: Mutex::new(state),
            main_cv: Condvar::new(),
            producer_cvs,
            config,
            #[cfg(test)]
            fail_delivery_at: Mutex::new(None),
            #[cfg(test)]
            max_wait_queue_len: std::sync::atomic::AtomicUsize::new(0),
        });

        let consumer_err_cb: Option<ConsumerErrCb<C>> =
            consumer_err_cb.map(|cb| Box::new(cb) as ConsumerErrCb<C>);

        let loop_inner = Arc::clone(&inner);
        let spawned = thread::Builder::new().spawn(move || {
            consumer_loop(loop_inner, Box::new(consumer_cb), consumer_err_cb);
        });

        match spawned {
            Ok(consumer_thread) => Ok(Self {
                inner,
                consumer_thread: Some(consumer_thread),
                parent_thread: thread::current().id(),
                _context: std::marker::PhantomData,
            }),
            Err(_) => Self::resource_exhausted(config.error_policy, ResourceError::Again),
        }
    }

    fn resource_exhausted(
        policy: ErrorPolicy,
        err: ResourceError,
    ) -> Result<Self, CreateError> {
        match policy {
            ErrorPolicy::Report => Err(CreateError::OutOfResources(err)),
            ErrorPolicy::Abort => fatal!("Channel::create: {err}"),
        }
    }

    /// Registers a new producer, spawning a dedicated worker thread that invokes
    /// `task` with its [`ProducerHandle`].
    ///
    /// # Errors
    ///
    /// `Err(RegisterError::Closed)` if the channel is already closed,
    /// `Err(RegisterError::MaxProducersReached)` if `max_producers` registrations have
    /// already succeeded, or `Err(RegisterError::ResourceExhausted(..))` under
    /// `ErrorPolicy::Report` if the worker thread cannot be spawned (fatal under
    /// `ErrorPolicy::Abort`).
    pub fn register_producer(
        &self,
        task: impl FnOnce(ProducerHandle<C>) + Send + 'static,
        context: C,
    ) -> Result<(), RegisterError> {
        register_producer_impl(&self.inner, task, context)
    }

    /// Blocks until every producer has returned and the consumer has delivered the
    /// terminal callback, then destroys the channel.
    ///
    /// Takes `self` by value: since `join` consumes the channel, there is no handle
    /// left to call `join` on a second time, which is a strictly stronger guarantee
    /// than a runtime "already joined" check.
    ///
    /// # Panics / aborts
    ///
    /// Aborts the process if called from a thread other than the one that created
    /// the channel (unless [`ChannelConfig::disable_thread_safety`] was set), or if no
    /// producer was ever registered.
    pub fn join(mut self) {
        if !self.inner.config.thread_safety_disabled
            && thread::current().id() != self.parent_thread
        {
            fatal!("Channel::join: called from a thread other than the one that created the channel");
        }

        {
            let mut state = self.inner.lock_state();
            if state.producer_count == 0 {
                drop(state);
                fatal!("Channel::join: called with no producers registered");
            }
            state.joined = true;
            if state.producers_done == state.producer_count {
                state.closed = true;
                drop(state);
                self.inner.main_cv.notify_all();
            }
        }

        if let Some(consumer_thread) = self.consumer_thread.take() {
            if consumer_thread.join().is_err() {
                fatal!("Channel::join: consumer thread panicked");
            }
        }

        // The consumer only breaks its loop once `closed && !pending`; after the
        // consumer thread above has returned that has already happened, but we still
        // set `closed` unconditionally per the protocol so any late `ping` observes it.
        self.inner.lock_state().closed = true;

        let threads = std::mem::take(&mut self.inner.lock_state().producer_threads);
        for handle in threads {
            if handle.join().is_err() {
                fatal!("Channel::join: producer thread panicked");
            }
        }
    }
}

pub(crate) fn register_producer_impl<C: Send + 'static>(
    inner: &Arc<ChannelInner>,
    task: impl FnOnce(ProducerHandle<C>) + Send + 'static,
    context: C,
) -> Result<(), RegisterError> {
    let mut state = inner.lock_state();
    if state.closed {
        return Err(RegisterError::Closed);
    }
    if state.producer_count == inner.config.max_producers {
        return Err(RegisterError::MaxProducersReached {
            max: inner.config.max_producers,
        });
    }

    let id = state.producer_count;
    state.producers.push(ProducerRecord { done: false });

    let handle_inner = Arc::clone(inner);
    let finish_inner = Arc::clone(inner);
    let spawned = thread::Builder::new().spawn(move || {
        task(ProducerHandle::new(handle_inner, id, context));
        finish_producer(&finish_inner, id);
    });

    match spawned {
        Ok(join_handle) => {
            state.producer_threads.push(join_handle);
            state.producer_count += 1;
            debug_assert_producer_counts!(
                state.producers_done,
                state.producer_count,
                inner.config.max_producers
            );
            Ok(())
        }
        Err(_) => {
            state.producers.pop();
            match inner.config.error_policy {
                ErrorPolicy::Report => Err(RegisterError::ResourceExhausted(ResourceError::Again)),
                ErrorPolicy::Abort => fatal!("register_producer: failed to spawn worker thread"),
            }
        }
    }
}

fn finish_producer(inner: &Arc<ChannelInner>, id: usize) {
    let mut state = inner.lock_state();
    state.producers[id].done = true;
    state.producers_done += 1;
    debug_assert_producer_counts!(
        state.producers_done,
        state.producer_count,
        inner.config.max_producers
    );
    if state.joined && state.producers_done == state.producer_count {
        state.closed = true;
        drop(state);
        inner.main_cv.notify_all();
    }
}

#[cfg(test)]
impl<C> Channel<C> {
    pub(crate) fn inner_for_test(&self) -> &ChannelInner {
        &self.inner
    }

    /// Like [`inner_for_test`](Self::inner_for_test), but owned so it can outlive a
    /// `Channel::join(self)` call.
    pub(crate) fn inner_arc_for_test(&self) -> Arc<ChannelInner> {
        Arc::clone(&self.inner)
    }
}

//! Configuration for [`Channel::create`](crate::channel::Channel::create).

/// How the channel reacts to recoverable resource errors (allocation failures,
/// transient thread-spawn failures).
///
/// Programming-bug conditions (`max_producers == 0`, `send` with an oversized
/// payload, calling `join` from the wrong thread, ...) abort the process
/// regardless of this setting — this policy only governs *recoverable*
/// resource exhaustion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Print a diagnostic and abort the process on any recoverable resource error.
    #[default]
    Abort,
    /// Surface recoverable resource errors to the caller / consumer error callback.
    Report,
}

/// Construction-time parameters for a [`Channel`](crate::channel::Channel).
#[derive(Debug, Clone, Copy)]
pub struct ChannelConfig {
    /// Maximum payload size in bytes. May be 0 for empty-only messages.
    pub buffer_size: usize,
    /// Upper bound on the number of producers that may ever register.
    pub max_producers: usize,
    /// Recoverable-error handling policy.
    pub error_policy: ErrorPolicy,
    /// When true, skip the "join must be called from the constructing thread" check.
    pub thread_safety_disabled: bool,
}

impl ChannelConfig {
    /// Creates a configuration with `buffer_size` and `max_producers`, `ErrorPolicy::Abort`,
    /// and thread-safety checks enabled.
    ///
    /// # Aborts
    ///
    /// Aborts the process if `max_producers == 0` — this is a programming bug, not a
    /// recoverable condition, so it is checked here rather than deferred to `create`.
    #[must_use]
    pub fn new(buffer_size: usize, max_producers: usize) -> Self {
        if max_producers == 0 {
            crate::error::fatal!("ChannelConfig::new: max_producers must be at least 1");
        }
        Self {
            buffer_size,
            max_producers,
            error_policy: ErrorPolicy::Abort,
            thread_safety_disabled: false,
        }
    }

    /// Sets the error policy.
    #[must_use]
    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// Disables the "join from the constructing thread" safety check.
    #[must_use]
    pub fn disable_thread_safety(mut self) -> Self {
        self.thread_safety_disabled = true;
        self
    }
}

//! Error types for channel construction, registration, and the fatal/abort path.

use thiserror::Error;

/// A recoverable resource failure, surfaced only under [`ErrorPolicy::Report`](crate::config::ErrorPolicy::Report).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// An allocation could not be satisfied.
    #[error("out of memory")]
    Oom,
    /// An OS resource (e.g. a thread) could not be obtained, but the condition is transient.
    #[error("resource temporarily unavailable")]
    Again,
}

/// Errors returned by [`Channel::create`](crate::channel::Channel::create).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CreateError {
    /// Construction could not allocate everything it needed.
    #[error("out of resources: {0}")]
    OutOfResources(#[from] ResourceError),
}

/// Errors returned by `register_producer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegisterError {
    /// `max_producers` registrations have already succeeded.
    #[error("too many producers registered (max: {max})")]
    MaxProducersReached {
        /// The configured maximum number of producers.
        max: usize,
    },
    /// The channel is closed; no further producers may register.
    #[error("channel is closed")]
    Closed,
    /// The worker thread for the new producer could not be spawned.
    #[error("out of resources: {0}")]
    ResourceExhausted(#[from] ResourceError),
}

/// Prints a diagnostic and unconditionally aborts the process.
///
/// Used for programming-bug conditions rather than runtime errors: these must
/// terminate the process even under `ErrorPolicy::Report`, and must not be
/// interceptable by a panic hook or `catch_unwind`.
#[cold]
pub(crate) fn fatal(args: std::fmt::Arguments<'_>) -> ! {
    eprintln!("slotmpsc: fatal: {args}");
    std::process::abort()
}

macro_rules! fatal {
    ($($arg:tt)*) => {
        $crate::error::fatal(format_args!($($arg)*))
    };
}

pub(crate) use fatal;

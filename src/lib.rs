//! A threaded multi-producer single-consumer rendezvous channel.
//!
//! One shared byte slot, a FIFO wait queue of blocked producers, and a dedicated
//! consumer thread woken by a condition variable — the classical mutex + condvar
//! construction rather than a lock-free ring. See `SPEC_FULL.md` for the full
//! protocol and `DESIGN.md` for how each piece is grounded.
//!
//! ```no_run
//! use slotmpsc::{Channel, ChannelConfig, ConsumerHandle};
//!
//! let channel: Channel<()> = Channel::create(
//!     ChannelConfig::new(64, 4),
//!     |consumer, data, closed| {
//!         if closed {
//!             return;
//!         }
//!         println!("received {:?}", data);
//!         consumer.close();
//!     },
//!     None::<fn(ConsumerHandle<()>)>,
//! )
//! .expect("channel construction");
//!
//! channel
//!     .register_producer(|producer| {
//!         producer.send(b"hello");
//!     }, ())
//!     .expect("register producer");
//!
//! channel.join();
//! ```

mod channel;
mod config;
mod consumer;
mod error;
mod invariants;
mod producer;

pub use channel::Channel;
pub use config::{ChannelConfig, ErrorPolicy};
pub use consumer::ConsumerHandle;
pub use error::{CreateError, RegisterError, ResourceError};
pub use producer::ProducerHandle;

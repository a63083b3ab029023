//! Handlers keeping the gateway table in step with configuration and service network changes.
//!
//! Each listener filters events with `is_relevant` before touching any state, and can be driven
//! either one event at a time through `handle`, or over a whole stream with `listen`.
use futures::Stream;

mod config;
pub use self::config::*;

mod network;
pub use self::network::*;

mod gratuitous;
pub use self::gratuitous::*;

pub type EventStream<E> = Box<dyn Stream<Item = E> + Send + Unpin>;

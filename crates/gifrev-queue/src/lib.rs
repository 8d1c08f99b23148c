//! Redis Streams job queue.
//!
//! Reversal requests that are not processed inline are queued here and
//! consumed by the worker, with retry counting and a dead-letter stream.

pub mod error;
pub mod job;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use job::ReverseJob;
pub use queue::{JobQueue, QueueConfig};

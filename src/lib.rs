//! Store-and-forward connectivity client for refractometry sensors.
//!
//! One invocation validates a reading, drains any backlog of previously
//! failed readings, attempts direct HTTP delivery, and falls back to a
//! durable file-backed queue on failure. See [`queue`] for the
//! crash-safety and at-least-once contract.

pub mod error;
pub mod flush;
pub mod queue;
pub mod record;
pub mod submit;
pub mod transport;

pub use error::{Error, Result};
pub use flush::flush_queue;
pub use queue::ReadingQueue;
pub use record::{Reading, Unit};
pub use submit::{submit_reading, SubmitOutcome};
pub use transport::{DeliveryError, HttpTransport, Transport};

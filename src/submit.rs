//! Entry-point workflow for one new reading.

use log::{error, info, warn};

use crate::flush::flush_queue;
use crate::queue::ReadingQueue;
use crate::record::Reading;
use crate::transport::Transport;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Delivered directly.
    Sent,
    /// Direct delivery failed; the reading is durable in the queue.
    Queued,
}

/// Validate, drain the backlog best-effort, then attempt direct delivery,
/// falling back to the queue.
///
/// Validation failures surface before any queue or network activity. A
/// failed backlog flush is logged but never blocks the new reading. The
/// only fatal outcome is an I/O error, notably a failed fallback append,
/// which loses the reading.
pub fn submit_reading(
    queue: &ReadingQueue,
    transport: &dyn Transport,
    reading: &Reading,
) -> Result<SubmitOutcome> {
    reading.validate()?;

    if let Err(err) = flush_queue(queue, transport) {
        warn!("backlog flush failed: {err}");
    }

    let line = reading.to_json_line()?;
    match transport.deliver(&line) {
        Ok(()) => {
            info!("reading delivered");
            Ok(SubmitOutcome::Sent)
        }
        Err(err) => {
            warn!("direct delivery failed, queuing reading: {err}");
            if let Err(append_err) = queue.append(&line) {
                error!("reading lost, could not queue after failed delivery: {append_err}");
                return Err(append_err);
            }
            Ok(SubmitOutcome::Queued)
        }
    }
}

//! Backlog drain with stop-on-first-failure backpressure.

use log::{debug, info, warn};

use crate::queue::ReadingQueue;
use crate::transport::Transport;
use crate::Result;

/// Drain the queue oldest-first, delivering each entry via `transport`.
///
/// Stops at the first failed delivery: the failed entry is re-appended (it
/// lands at the tail, since pop already removed it from the head) and no
/// further entries are attempted. A persistently failing head entry
/// therefore stalls the backlog until it succeeds or the queue is cleared.
///
/// Returns the number of entries delivered this call; 0 is a normal
/// outcome. Queue I/O errors propagate, including a failure to re-append,
/// which loses the popped entry.
pub fn flush_queue(queue: &ReadingQueue, transport: &dyn Transport) -> Result<usize> {
    let mut flushed = 0;
    while queue.has_entries()? {
        let line = match queue.pop()? {
            Some(line) => line,
            None => break,
        };
        match transport.deliver(&line) {
            Ok(()) => {
                debug!("delivered queued reading: {line}");
                flushed += 1;
            }
            Err(err) => {
                warn!("stopping flush, restoring entry to queue: {err}");
                queue.append(&line)?;
                break;
            }
        }
    }
    if flushed > 0 {
        info!("flushed {flushed} queued reading(s)");
    }
    Ok(flushed)
}

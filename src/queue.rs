//! Durable single-file FIFO for serialized readings.
//!
//! The queue is one UTF-8 text file, one reading per newline-terminated
//! line, oldest first. An absent file is an empty queue. `append` only ever
//! adds to the end, so a mid-write kill can at worst truncate the entry
//! being added; prior entries are untouched. `pop` rewrites the remainder
//! into a temp file in the same directory and commits it with an atomic
//! rename, so a crash mid-pop leaves the original file fully intact
//! (pre-rename) or fully replaced (post-rename), never half-written.
//!
//! The popped line is in flight from the moment it is returned, before the
//! rename commits. A crash in that window redelivers the entry on the next
//! pop: delivery is at-least-once, never at-most-once.
//!
//! The read-copy-rename sequence in `pop` is not safe against a second
//! process operating on the same file. At most one instance may use a given
//! queue file at a time; enforcing that (cron serialization, a file lock)
//! is the caller's responsibility.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use crate::{Error, Result};

pub const DEFAULT_QUEUE_FILE: &str = "queue.log";

/// Upper bound on a single serialized entry, including its newline.
pub const MAX_LINE_LEN: usize = 1024;

pub struct ReadingQueue {
    path: PathBuf,
}

impl ReadingQueue {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `line` as the new tail entry, creating the file on first use.
    pub fn append(&self, line: &str) -> Result<()> {
        if line.len() >= MAX_LINE_LEN {
            return Err(Error::EntryTooLong);
        }
        if line.contains('\n') {
            return Err(Error::Invalid(
                "queue entry contains an embedded newline".to_string(),
            ));
        }
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)?;
        file.write_all(format!("{line}\n").as_bytes())?;
        Ok(())
    }

    /// Remove and return the head (oldest) entry.
    ///
    /// Returns `Ok(None)` when the file is absent or empty. A head line
    /// with no terminating newline, or longer than [`MAX_LINE_LEN`], is a
    /// malformed entry and fails with `Error::Corrupt` rather than being
    /// truncated or skipped.
    pub fn pop(&self) -> Result<Option<String>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let mut reader = BufReader::new(file);

        let mut head = Vec::new();
        (&mut reader)
            .take(MAX_LINE_LEN as u64)
            .read_until(b'\n', &mut head)?;
        if head.is_empty() {
            return Ok(None);
        }
        if head.last() != Some(&b'\n') {
            if head.len() == MAX_LINE_LEN {
                return Err(Error::Corrupt("entry exceeds maximum line length"));
            }
            return Err(Error::Corrupt("unterminated entry"));
        }
        head.pop();
        let head =
            String::from_utf8(head).map_err(|_| Error::Corrupt("entry is not valid utf-8"))?;

        // Copy the remainder byte-for-byte and swap it in atomically.
        let tmp = self.tmp_path();
        let mut out = File::create(&tmp)?;
        io::copy(&mut reader, &mut out)?;
        out.sync_all()?;
        drop(out);
        if let Err(err) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(err.into());
        }

        Ok(Some(head))
    }

    /// True iff the file exists and holds at least one byte. Single-byte
    /// probe, not a scan.
    pub fn has_entries(&self) -> Result<bool> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(err) => return Err(err.into()),
        };
        let mut probe = [0u8; 1];
        Ok(file.read(&mut probe)? > 0)
    }

    /// Number of entries. Full scan; diagnostics only.
    pub fn count(&self) -> Result<usize> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(err.into()),
        };
        let mut count = 0;
        for chunk in BufReader::new(file).split(b'\n') {
            chunk?;
            count += 1;
        }
        Ok(count)
    }

    /// Remove the backing file. Already absent counts as success.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| DEFAULT_QUEUE_FILE.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

//! Tail session state machine
//!
//! A session owns the read buffer and the line pattern for one open log
//! handle and decides, after every completed operation, which operation
//! comes next. It performs no I/O itself: the driver issues the [`Step`]
//! it is told to and reports the outcome back through the matching
//! `*_complete` method. Because the next operation is only ever produced
//! by the completion of the previous one, a session never has more than
//! one operation outstanding.
//!
//! Continuous sessions additionally carry a busy flag, set when a poll
//! issues a read and cleared only once the chain started by that read has
//! reached the end of the available data.

use log::{debug, warn};
use std::borrow::Cow;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::models::TailError;
use crate::parser::LinePattern;

/// Whether the session reads once or follows the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Read from offset 0 to end of file, then close
    OneShot,
    /// Seek to end of file, then poll for appended data
    Continuous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    SeekingToEnd,
    Reading,
    SeekingBack,
    Closed,
}

/// Next operation the driver must perform on the log handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Read up to the chunk size into [`TailSession::buffer_mut`]
    Read,
    /// Seek to end of file
    SeekEnd,
    /// Seek backward from the current position by this many bytes
    SeekBack(u64),
    /// Nothing outstanding; wait for the next poll tick
    Wait,
    /// Close the handle; the session is finished
    Close,
}

#[derive(Debug)]
pub struct TailSession {
    mode: SessionMode,
    state: SessionState,
    buffer: Option<Vec<u8>>,
    pattern: Option<LinePattern>,
    chunk_size: usize,
    half_line: bool,
    busy: bool,
    /// Go idle rather than read once the pending seek-back completes
    idle_after_seek: bool,
    /// Inside an overlong record: discard input up to the next newline
    skip_to_newline: bool,
    bytes_read: u64,
    /// Mirror of `bytes_read` for observers outside the driving task
    shared_progress: Option<Arc<AtomicU64>>,
    size: u64,
}

impl TailSession {
    pub fn new(mode: SessionMode, pattern: LinePattern, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            mode,
            state: SessionState::Idle,
            buffer: Some(vec![0; chunk_size]),
            pattern: Some(pattern),
            chunk_size,
            half_line: false,
            busy: false,
            idle_after_seek: false,
            skip_to_newline: false,
            bytes_read: 0,
            shared_progress: None,
            size: 0,
        }
    }

    /// Publish the consumed byte count to `counter` as reading progresses
    pub fn with_progress(mut self, counter: Arc<AtomicU64>) -> Self {
        self.shared_progress = Some(counter);
        self
    }

    /// The log handle is open. `size` is the file length at open time.
    pub fn opened(&mut self, size: u64) -> Step {
        if self.state != SessionState::Idle {
            return self.terminal_step();
        }
        self.size = size;
        match self.mode {
            SessionMode::OneShot => {
                self.state = SessionState::Reading;
                self.busy = true;
                Step::Read
            }
            SessionMode::Continuous => {
                self.state = SessionState::SeekingToEnd;
                Step::SeekEnd
            }
        }
    }

    /// Timer tick in continuous mode: issue a read unless one is outstanding
    pub fn poll(&mut self) -> Option<Step> {
        if self.mode != SessionMode::Continuous
            || self.busy
            || self.state != SessionState::Reading
        {
            return None;
        }
        self.busy = true;
        Some(Step::Read)
    }

    /// Buffer the next read must fill; `None` once released
    pub fn buffer_mut(&mut self) -> Option<&mut [u8]> {
        self.buffer.as_deref_mut()
    }

    pub fn seek_end_complete(&mut self, result: io::Result<u64>) -> Result<Step, TailError> {
        if self.state == SessionState::Closed {
            return Ok(Step::Close);
        }
        let offset = result.map_err(|e| self.abort(e))?;
        debug!("Tail positioned at end of log (offset {})", offset);
        self.state = SessionState::Reading;
        self.busy = false;
        Ok(Step::Wait)
    }

    /// A read finished with `result` bytes placed at the start of the buffer.
    ///
    /// Every complete line that matches the pattern is passed to `on_line`;
    /// a trailing fragment without its newline is held back.
    pub fn read_complete<F>(&mut self, result: io::Result<usize>, mut on_line: F) -> Result<Step, TailError>
    where
        F: FnMut(&str),
    {
        if self.state == SessionState::Closed {
            return Ok(Step::Close);
        }
        let read = result.map_err(|e| self.abort(e))?;

        let (Some(buffer), Some(pattern)) = (self.buffer.as_mut(), self.pattern.as_ref()) else {
            return Ok(Step::Close);
        };

        let read = read.min(buffer.len());

        // Drop the remainder of a record that did not fit in one chunk
        let mut start = 0;
        if self.skip_to_newline {
            match buffer[..read].iter().position(|&b| b == b'\n') {
                Some(idx) => {
                    start = idx + 1;
                    self.skip_to_newline = false;
                }
                None => start = read,
            }
        }

        let data = &buffer[start..read];
        let len = data.len();
        self.half_line = len > 0 && data[len - 1] != b'\n';

        // Everything up to and including the last newline is complete
        let complete_len = data
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |idx| idx + 1);
        let fragment_len = (len - complete_len) as u64;

        let mut full_lines = 0usize;
        if complete_len > 0 {
            for raw in data[..complete_len - 1].split(|&b| b == b'\n') {
                full_lines += 1;
                let line: Cow<'_, str> = String::from_utf8_lossy(raw);
                if pattern.matches(&line) {
                    on_line(&line);
                }
            }
        }

        if read < self.chunk_size {
            buffer.fill(0);
            self.consume(start + complete_len);
            return Ok(match self.mode {
                SessionMode::Continuous if fragment_len > 0 => {
                    // Writer is mid-line: rewind so the next tick re-reads it whole
                    self.state = SessionState::SeekingBack;
                    self.idle_after_seek = true;
                    Step::SeekBack(fragment_len)
                }
                SessionMode::Continuous => {
                    self.busy = false;
                    Step::Wait
                }
                SessionMode::OneShot => {
                    if fragment_len > 0 {
                        debug!("Dropping unterminated record of {} bytes at end of log", fragment_len);
                    }
                    Step::Close
                }
            });
        }

        // The fragment starts a record: re-read it from its first byte
        if self.half_line && (full_lines > 0 || start > 0) {
            self.consume(start + complete_len);
            self.state = SessionState::SeekingBack;
            self.idle_after_seek = false;
            return Ok(Step::SeekBack(fragment_len));
        }

        if self.half_line {
            warn!(
                "Log record longer than {} bytes cannot be reassembled; skipping it",
                self.chunk_size
            );
            self.skip_to_newline = true;
        }
        buffer.fill(0);
        self.consume(read);
        Ok(Step::Read)
    }

    pub fn seek_back_complete(&mut self, result: io::Result<u64>) -> Result<Step, TailError> {
        if self.state == SessionState::Closed {
            return Ok(Step::Close);
        }
        result.map_err(|e| self.abort(e))?;

        if let Some(buffer) = self.buffer.as_mut() {
            buffer.fill(0);
        }
        self.state = SessionState::Reading;
        if std::mem::take(&mut self.idle_after_seek) {
            self.busy = false;
            Ok(Step::Wait)
        } else {
            Ok(Step::Read)
        }
    }

    /// The handle was closed (completion or error). Idempotent.
    pub fn close(&mut self) -> bool {
        self.release()
    }

    /// Abort the session wherever it is. Returns `false` if it was already
    /// closed, so cancelling twice releases resources only once.
    pub fn cancel(&mut self) -> bool {
        let released = self.release();
        if released {
            debug!("Tail session cancelled after {} bytes", self.bytes_read);
        }
        released
    }

    fn consume(&mut self, len: usize) {
        self.bytes_read += len as u64;
        if let Some(shared) = &self.shared_progress {
            shared.store(self.bytes_read, Ordering::Relaxed);
        }
    }

    fn abort(&mut self, error: io::Error) -> TailError {
        warn!("Log stream error, closing session: {}", error);
        self.release();
        TailError::Stream(error)
    }

    fn release(&mut self) -> bool {
        if self.state == SessionState::Closed {
            return false;
        }
        self.buffer = None;
        self.pattern = None;
        self.busy = false;
        self.state = SessionState::Closed;
        true
    }

    fn terminal_step(&self) -> Step {
        if self.state == SessionState::Closed {
            Step::Close
        } else {
            Step::Wait
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// Whether the last read ended inside a line
    pub fn half_line(&self) -> bool {
        self.half_line
    }

    /// Bytes consumed so far (complete lines only)
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Fraction of the file consumed by a one-shot read
    pub fn progress(&self) -> f64 {
        if self.size == 0 {
            return 1.0;
        }
        (self.bytes_read as f64 / self.size as f64).min(1.0)
    }
}

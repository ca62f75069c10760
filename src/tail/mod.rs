//! Log tail engine
//!
//! [`LogMonitor`] is the user-facing entry point. It owns at most one
//! one-shot reload session and one continuous tail session, each running as
//! a tokio task. Parsed hits flow into a shared [`HitJournal`].
//!
//! Cancellation is synchronous from the caller's point of view: once
//! [`LogMonitor::cancel`] returns, no further hit from the cancelled
//! session reaches the journal.

pub mod driver;
pub mod session;

use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::fs::File;
use tokio::task::JoinHandle;

use crate::constants::{FILE_BUF, POLL_INTERVAL_MS};
use crate::journal::{EventSink, HitJournal};
use crate::models::TailError;
use crate::parser::{HitParser, LinePattern};

pub use driver::LogFile;
pub use session::{SessionMode, SessionState, Step, TailSession};

/// Tunables for the tail engine
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Time between polls of a followed log
    pub poll_interval: Duration,
    /// Read size per operation
    pub chunk_size: usize,
    /// Pre-filter every line must match before it is parsed
    pub pattern: LinePattern,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
            chunk_size: FILE_BUF,
            pattern: LinePattern::hits(),
        }
    }
}

/// Handle on a running session task
struct SessionTask {
    path: PathBuf,
    cancelled: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    /// Taken once the task's outcome has been collected
    task: Option<JoinHandle<Result<(), TailError>>>,
}

pub struct LogMonitor<S: EventSink + 'static> {
    journal: Arc<Mutex<HitJournal<S>>>,
    parser: HitParser,
    settings: MonitorSettings,
    reload: Option<SessionTask>,
    tail: Option<SessionTask>,
    /// Bytes consumed by the current reload
    reload_read: Arc<AtomicU64>,
    reload_size: u64,
}

impl<S: EventSink + 'static> LogMonitor<S> {
    pub fn new(journal: HitJournal<S>, parser: HitParser, settings: MonitorSettings) -> Self {
        Self {
            journal: Arc::new(Mutex::new(journal)),
            parser,
            settings,
            reload: None,
            tail: None,
            reload_read: Arc::new(AtomicU64::new(0)),
            reload_size: 0,
        }
    }

    /// Re-read the whole log from the beginning.
    ///
    /// Cancels any reload already in flight and clears the journal. If the
    /// file cannot be opened no session is created and the error is
    /// returned for the caller to report.
    pub async fn begin_reload(&mut self, path: impl AsRef<Path>) -> Result<(), TailError> {
        let path = path.as_ref();
        self.cancel_reload();

        let file = open_log(path).await?;
        let size = match file.metadata().await {
            Ok(meta) => meta.len(),
            Err(e) => {
                warn!("Could not stat {}: {}", path.display(), e);
                0
            }
        };
        info!("Reloading {} ({} bytes)", path.display(), size);

        lock(&self.journal).clear();
        self.reload_read = Arc::new(AtomicU64::new(0));
        self.reload_size = size;

        let cancelled = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let journal = Arc::clone(&self.journal);
        let parser = self.parser.clone();
        let mut session = TailSession::new(
            SessionMode::OneShot,
            self.settings.pattern.clone(),
            self.settings.chunk_size,
        )
        .with_progress(Arc::clone(&self.reload_read));

        let task = {
            let cancelled = Arc::clone(&cancelled);
            let finished = Arc::clone(&finished);
            let display = path.display().to_string();
            tokio::spawn(async move {
                let mut file = file;
                let emit = emitter(Arc::clone(&journal), parser, Arc::clone(&cancelled));
                let result =
                    driver::run_one_shot(&mut file, &mut session, size, &cancelled, emit).await;

                {
                    let mut journal = lock(&journal);
                    if !cancelled.load(Ordering::SeqCst) {
                        journal.reload_complete();
                    }
                    finished.store(true, Ordering::SeqCst);
                }

                match &result {
                    Ok(()) => debug!("Reload of {} complete", display),
                    Err(e) => warn!("Reload of {} aborted: {}", display, e),
                }
                result
            })
        };

        self.reload = Some(SessionTask {
            path: path.to_path_buf(),
            cancelled,
            finished,
            task: Some(task),
        });
        Ok(())
    }

    /// Follow the log for appended records, starting at its current end.
    ///
    /// Replaces any tail session already running.
    pub async fn begin_tail(&mut self, path: impl AsRef<Path>) -> Result<(), TailError> {
        let path = path.as_ref();
        self.cancel_tail();

        let file = open_log(path).await?;
        info!(
            "Following {} every {} ms",
            path.display(),
            self.settings.poll_interval.as_millis()
        );

        let cancelled = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let journal = Arc::clone(&self.journal);
        let parser = self.parser.clone();
        let period = self.settings.poll_interval;
        let mut session = TailSession::new(
            SessionMode::Continuous,
            self.settings.pattern.clone(),
            self.settings.chunk_size,
        );

        let task = {
            let cancelled = Arc::clone(&cancelled);
            let finished = Arc::clone(&finished);
            let display = path.display().to_string();
            tokio::spawn(async move {
                let mut file = file;
                let emit = emitter(journal, parser, Arc::clone(&cancelled));
                let result =
                    driver::run_continuous(&mut file, &mut session, period, &cancelled, emit).await;
                finished.store(true, Ordering::SeqCst);
                if let Err(e) = &result {
                    warn!("Stopped following {}: {}", display, e);
                }
                result
            })
        };

        self.tail = Some(SessionTask {
            path: path.to_path_buf(),
            cancelled,
            finished,
            task: Some(task),
        });
        Ok(())
    }

    /// Abort every session. Safe to call repeatedly.
    pub fn cancel(&mut self) {
        self.cancel_reload();
        self.cancel_tail();
    }

    pub fn cancel_reload(&mut self) {
        if let Some(reload) = self.reload.take() {
            self.stop(reload);
        }
    }

    pub fn cancel_tail(&mut self) {
        if let Some(tail) = self.tail.take() {
            self.stop(tail);
        }
    }

    fn stop(&self, session: SessionTask) {
        {
            // Emission checks the flag under this lock
            let _journal = lock(&self.journal);
            session.cancelled.store(true, Ordering::SeqCst);
        }
        if let Some(task) = session.task {
            task.abort();
        }
        debug!("Cancelled session on {}", session.path.display());
    }

    /// A reload is still reading
    pub fn is_busy(&self) -> bool {
        self.reload
            .as_ref()
            .is_some_and(|r| !r.finished.load(Ordering::SeqCst))
    }

    pub fn is_following(&self) -> bool {
        self.tail
            .as_ref()
            .is_some_and(|t| !t.finished.load(Ordering::SeqCst))
    }

    /// Fraction of the current reload consumed, 0.0 to 1.0
    pub fn reload_progress(&self) -> f64 {
        if self.reload_size == 0 {
            return if self.is_busy() { 0.0 } else { 1.0 };
        }
        let done = self.reload_read.load(Ordering::SeqCst);
        (done as f64 / self.reload_size as f64).min(1.0)
    }

    /// Wait for the current reload to finish and report how it ended
    pub async fn wait_reload(&mut self) -> Result<(), TailError> {
        match self.reload.as_mut() {
            Some(reload) => collect(&mut reload.task).await,
            None => Ok(()),
        }
    }

    /// Wait for the tail session to stop (stream error or cancellation)
    pub async fn wait_tail(&mut self) -> Result<(), TailError> {
        match self.tail.as_mut() {
            Some(tail) => collect(&mut tail.task).await,
            None => Ok(()),
        }
    }

    /// Run `f` with the journal locked
    pub fn with_journal<R>(&self, f: impl FnOnce(&mut HitJournal<S>) -> R) -> R {
        f(&mut lock(&self.journal))
    }

    pub fn journal(&self) -> Arc<Mutex<HitJournal<S>>> {
        Arc::clone(&self.journal)
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }
}

impl<S: EventSink + 'static> Drop for LogMonitor<S> {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn open_log(path: &Path) -> Result<File, TailError> {
    File::open(path).await.map_err(|source| {
        error!("Cannot open {}: {}", path.display(), source);
        TailError::Open {
            path: path.to_path_buf(),
            source,
        }
    })
}

async fn collect(slot: &mut Option<JoinHandle<Result<(), TailError>>>) -> Result<(), TailError> {
    let Some(task) = slot.as_mut() else {
        return Ok(());
    };
    let outcome = task.await;
    *slot = None;
    match outcome {
        Ok(result) => result,
        Err(e) if e.is_cancelled() => Ok(()),
        Err(e) => Err(TailError::Stream(std::io::Error::new(
            std::io::ErrorKind::Other,
            e.to_string(),
        ))),
    }
}

/// Parse and journal one matched line unless the session was cancelled
fn emitter<S: EventSink>(
    journal: Arc<Mutex<HitJournal<S>>>,
    parser: HitParser,
    cancelled: Arc<AtomicBool>,
) -> impl FnMut(&str) {
    move |line: &str| {
        if cancelled.load(Ordering::SeqCst) {
            return;
        }
        let hit = parser.parse_line(line);
        let mut journal = lock(&journal);
        if cancelled.load(Ordering::SeqCst) {
            return;
        }
        journal.append(hit);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

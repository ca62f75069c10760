//! Async driver for [`TailSession`]
//!
//! Executes the steps a session asks for against a [`LogFile`] and feeds
//! the outcomes back. Continuous sessions are ticked by a tokio interval;
//! a tick that lands while a read chain is still running is a no-op.

use log::debug;
use std::future::Future;
use std::io::{self, SeekFrom};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};
use tokio::time::{interval, MissedTickBehavior};

use super::session::{Step, TailSession};
use crate::models::TailError;

/// Readable, seekable log handle
pub trait LogFile: Send {
    /// Fill `buf` as far as the data allows. A count below `buf.len()`
    /// means end of file was reached.
    fn read_chunk<'a>(
        &'a mut self,
        buf: &'a mut [u8],
    ) -> impl Future<Output = io::Result<usize>> + Send + 'a;

    fn seek_to(&mut self, pos: SeekFrom) -> impl Future<Output = io::Result<u64>> + Send + '_;
}

impl<T> LogFile for T
where
    T: AsyncRead + AsyncSeek + Unpin + Send,
{
    fn read_chunk<'a>(
        &'a mut self,
        buf: &'a mut [u8],
    ) -> impl Future<Output = io::Result<usize>> + Send + 'a {
        async move {
            let mut filled = 0;
            while filled < buf.len() {
                match self.read(&mut buf[filled..]).await {
                    Ok(0) => break,
                    Ok(n) => filled += n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                }
            }
            Ok(filled)
        }
    }

    fn seek_to(&mut self, pos: SeekFrom) -> impl Future<Output = io::Result<u64>> + Send + '_ {
        self.seek(pos)
    }
}

/// Run `step` and every step it leads to until the session waits or closes
async fn advance<F, E>(
    file: &mut F,
    session: &mut TailSession,
    mut step: Step,
    cancelled: &AtomicBool,
    emit: &mut E,
) -> Result<Step, TailError>
where
    F: LogFile,
    E: FnMut(&str),
{
    loop {
        if cancelled.load(Ordering::SeqCst) {
            session.cancel();
            return Ok(Step::Close);
        }

        step = match step {
            Step::Read => {
                let result = match session.buffer_mut() {
                    Some(buf) => file.read_chunk(buf).await,
                    None => return Ok(Step::Close),
                };
                session.read_complete(result, &mut *emit)?
            }
            Step::SeekBack(len) => {
                let offset = i64::try_from(len).unwrap_or(i64::MAX);
                let result = file.seek_to(SeekFrom::Current(-offset)).await;
                session.seek_back_complete(result)?
            }
            Step::SeekEnd => {
                let result = file.seek_to(SeekFrom::End(0)).await;
                session.seek_end_complete(result)?
            }
            Step::Wait | Step::Close => return Ok(step),
        };
    }
}

/// Read the whole file once, from the current position to end of file
pub async fn run_one_shot<F, E>(
    file: &mut F,
    session: &mut TailSession,
    size: u64,
    cancelled: &AtomicBool,
    mut emit: E,
) -> Result<(), TailError>
where
    F: LogFile,
    E: FnMut(&str),
{
    let first = session.opened(size);
    let result = advance(file, session, first, cancelled, &mut emit).await;
    session.close();
    debug!("One-shot read finished after {} bytes", session.bytes_read());
    result.map(|_| ())
}

/// Seek to end of file, then poll for appended records every `period`
/// until cancelled or the stream fails
pub async fn run_continuous<F, E>(
    file: &mut F,
    session: &mut TailSession,
    period: Duration,
    cancelled: &AtomicBool,
    mut emit: E,
) -> Result<(), TailError>
where
    F: LogFile,
    E: FnMut(&str),
{
    let first = session.opened(0);
    let mut step = advance(file, session, first, cancelled, &mut emit).await?;

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    while step != Step::Close {
        ticker.tick().await;
        if let Some(read) = session.poll() {
            step = advance(file, session, read, cancelled, &mut emit).await?;
        } else if cancelled.load(Ordering::SeqCst) {
            session.cancel();
            step = Step::Close;
        }
    }

    session.close();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::LinePattern;
    use crate::tail::session::SessionMode;
    use std::io::Cursor;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    const RECORD: &str = "Jan  1 00:00:01 host kernel: Inbound IN=eth0 OUT= SRC=203.0.113.5 \
                          DST=198.51.100.9 LEN=60 TOS=0x00 PROTO=TCP DPT=22 \n";

    #[tokio::test]
    async fn test_one_shot_over_cursor() {
        let data = RECORD.repeat(10);
        let mut file = Cursor::new(data.clone().into_bytes());
        let mut session = TailSession::new(SessionMode::OneShot, LinePattern::hits(), 256);
        let cancelled = AtomicBool::new(false);

        let mut lines = Vec::new();
        run_one_shot(&mut file, &mut session, data.len() as u64, &cancelled, |l| {
            lines.push(l.to_string())
        })
        .await
        .unwrap();

        assert_eq!(lines.len(), 10);
        assert!(session.is_closed());
        assert_eq!(session.progress(), 1.0);
    }

    #[tokio::test]
    async fn test_pre_cancelled_session_reads_nothing() {
        let mut file = Cursor::new(RECORD.repeat(3).into_bytes());
        let mut session = TailSession::new(SessionMode::OneShot, LinePattern::hits(), 4096);
        let cancelled = AtomicBool::new(true);

        let mut emitted = 0;
        run_one_shot(&mut file, &mut session, 0, &cancelled, |_| emitted += 1)
            .await
            .unwrap();

        assert_eq!(emitted, 0);
        assert!(session.is_closed());
        assert_eq!(file.position(), 0);
    }

    #[tokio::test]
    async fn test_fill_semantics_on_short_underlying_reads() {
        let data = RECORD.repeat(2).into_bytes();
        let mut file = Trickle(Cursor::new(data.clone()));
        let mut buf = vec![0u8; 64];

        assert_eq!(file.read_chunk(&mut buf).await.unwrap(), 64);
        assert_eq!(&buf[..], &data[..64]);
    }

    /// Hands out at most 7 bytes per underlying read
    struct Trickle(Cursor<Vec<u8>>);

    impl AsyncRead for Trickle {
        fn poll_read(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let mut small = vec![0u8; buf.remaining().min(7)];
            let mut small_buf = ReadBuf::new(&mut small);
            match Pin::new(&mut self.0).poll_read(cx, &mut small_buf) {
                Poll::Ready(Ok(())) => {
                    buf.put_slice(small_buf.filled());
                    Poll::Ready(Ok(()))
                }
                other => other,
            }
        }
    }

    impl AsyncSeek for Trickle {
        fn start_seek(mut self: Pin<&mut Self>, position: SeekFrom) -> io::Result<()> {
            Pin::new(&mut self.0).start_seek(position)
        }

        fn poll_complete(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
            Pin::new(&mut self.0).poll_complete(cx)
        }
    }
}

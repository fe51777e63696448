//! Seekable reader over a file that is still downloading.
//!
//! Reads past the completed prefix wait for the driver instead of returning
//! short. Dropping the torrent fails pending reads.

use std::future::Future;
use std::io::{self, SeekFrom};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};

use tidecast_core::torrent::FileReader;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, ReadBuf};
use tokio_util::sync::CancellationToken;

use crate::torrent::FileProgress;

/// Upper bound on a single read from disk.
const MAX_READ: usize = 64 * 1024;

type PendingRead = Pin<Box<dyn Future<Output = io::Result<Vec<u8>>> + Send>>;

/// Reader handed out by [`SimTorrent::open_reader`](crate::SimTorrent).
pub struct SimReader {
    progress: Arc<FileProgress>,
    cancel: CancellationToken,
    position: u64,
    responsive: bool,
    pending: Option<PendingRead>,
}

impl SimReader {
    pub(crate) fn new(progress: Arc<FileProgress>, cancel: CancellationToken) -> Self {
        Self {
            progress,
            cancel,
            position: 0,
            responsive: false,
            pending: None,
        }
    }

    pub fn position(&self) -> u64 {
        self.position
    }
}

async fn read_at(
    progress: Arc<FileProgress>,
    cancel: CancellationToken,
    position: u64,
    max: usize,
) -> io::Result<Vec<u8>> {
    let mut completed = progress.subscribe();
    let wait = async {
        completed
            .wait_for(|done| *done > position)
            .await
            .map(|done| *done)
    };
    let dropped = || io::Error::new(io::ErrorKind::BrokenPipe, "torrent dropped");
    let available = tokio::select! {
        result = wait => result.map_err(|_| dropped())?,
        () = cancel.cancelled() => return Err(dropped()),
    };

    let len = (available - position).min(max as u64) as usize;
    let mut file = tokio::fs::File::open(&progress.destination).await?;
    file.seek(SeekFrom::Start(position)).await?;
    let mut buffer = vec![0u8; len];
    file.read_exact(&mut buffer).await?;
    Ok(buffer)
}

impl AsyncRead for SimReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = &mut *self;
        if this.pending.is_none() && (this.position >= this.progress.length || buf.remaining() == 0)
        {
            return Poll::Ready(Ok(()));
        }

        let max = buf.remaining().min(MAX_READ);
        let pending = this.pending.get_or_insert_with(|| {
            Box::pin(read_at(
                Arc::clone(&this.progress),
                this.cancel.clone(),
                this.position,
                max,
            ))
        });
        let result = ready!(pending.as_mut().poll(cx));
        this.pending = None;

        let chunk = result?;
        let n = chunk.len().min(buf.remaining());
        buf.put_slice(&chunk[..n]);
        this.position += n as u64;
        Poll::Ready(Ok(()))
    }
}

impl AsyncSeek for SimReader {
    fn start_seek(mut self: Pin<&mut Self>, position: SeekFrom) -> io::Result<()> {
        let target = match position {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.progress.length.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        };
        let Some(target) = target else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative position",
            ));
        };
        self.pending = None;
        self.position = target;
        Ok(())
    }

    fn poll_complete(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        Poll::Ready(Ok(self.position))
    }
}

impl FileReader for SimReader {
    fn set_readahead(&mut self, bytes: u64) {
        self.progress.request_readahead(bytes);
    }

    fn set_responsive(&mut self) {
        if !self.responsive {
            self.responsive = true;
            self.progress.attach_responsive();
        }
    }
}

impl Drop for SimReader {
    fn drop(&mut self) {
        if self.responsive {
            self.progress.detach_responsive();
        }
    }
}

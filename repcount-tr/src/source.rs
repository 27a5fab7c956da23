//! Frame acquisition and pose estimation seams
//!
//! The frame loop pulls frames from a [`FrameSource`] and hands each one to a
//! [`PoseEstimator`]. Camera capture and the pose model live outside this
//! crate; what ships here are sources for recorded pose streams and for
//! frames pushed over a channel by an external capture process.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use repcount_common::PoseResult;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{Error, Result};

/// Pull-based source of frames, in temporal order
#[async_trait]
pub trait FrameSource: Send {
    type Frame: Send;

    /// Wait for the next frame; `None` once the source is exhausted
    async fn next_frame(&mut self) -> Result<Option<Self::Frame>>;

    /// Release the underlying resource
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Turns a raw frame into landmarks
///
/// Implemented by the adapter around the external pose model. An `Err` is
/// treated by the frame loop as a frame without a pose.
pub trait PoseEstimator<F>: Send {
    fn estimate(&mut self, frame: &F) -> Result<PoseResult>;
}

/// Estimator for sources that already carry pose results
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordedPose;

impl PoseEstimator<PoseResult> for RecordedPose {
    fn estimate(&mut self, frame: &PoseResult) -> Result<PoseResult> {
        Ok(frame.clone())
    }
}

/// Replays a JSON-lines recording of pose results
///
/// One `PoseResult` per line; blank lines are ignored. An optional frame
/// interval paces playback like a live camera.
pub struct ReplaySource<R> {
    lines: Option<Lines<R>>,
    line_number: usize,
    frame_interval: Option<Duration>,
}

impl ReplaySource<BufReader<File>> {
    /// Open a recording on disk
    pub async fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).await?;
        debug!("Opened pose recording {}", path.display());
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<R> ReplaySource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn from_reader(reader: R) -> Self {
        Self {
            lines: Some(reader.lines()),
            line_number: 0,
            frame_interval: None,
        }
    }

    /// Wait this long before yielding each frame
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = Some(interval);
        self
    }

    /// Line number of the most recently read line (1-based)
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

#[async_trait]
impl<R> FrameSource for ReplaySource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    type Frame = PoseResult;

    async fn next_frame(&mut self) -> Result<Option<PoseResult>> {
        let Some(lines) = self.lines.as_mut() else {
            return Ok(None);
        };

        loop {
            let Some(line) = lines.next_line().await? else {
                return Ok(None);
            };
            self.line_number += 1;

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let pose = serde_json::from_str::<PoseResult>(line).map_err(|source| Error::Replay {
                line: self.line_number,
                source,
            })?;

            if let Some(interval) = self.frame_interval {
                tokio::time::sleep(interval).await;
            }

            return Ok(Some(pose));
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.lines.take().is_some() {
            debug!("Closed pose recording after {} lines", self.line_number);
        }
        Ok(())
    }
}

/// Frames pushed by an external capture process
///
/// Exhausted once every sender has been dropped.
pub struct ChannelSource<F> {
    rx: mpsc::Receiver<F>,
}

impl<F> ChannelSource<F> {
    pub fn new(rx: mpsc::Receiver<F>) -> Self {
        Self { rx }
    }

    /// Create a connected sender/source pair
    pub fn channel(buffer: usize) -> (mpsc::Sender<F>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self::new(rx))
    }
}

#[async_trait]
impl<F: Send> FrameSource for ChannelSource<F> {
    type Frame = F;

    async fn next_frame(&mut self) -> Result<Option<F>> {
        Ok(self.rx.recv().await)
    }

    async fn close(&mut self) -> Result<()> {
        self.rx.close();
        Ok(())
    }
}

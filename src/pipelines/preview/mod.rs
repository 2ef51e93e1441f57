// SPDX-License-Identifier: MPL-2.0

//! Live filter preview pipeline
//!
//! ```text
//! FrameReceiver (capacity 1) → orientation → filter → cover/crop → PreviewUpdate
//! ```
//!
//! Frames are processed one at a time on a blocking worker. Frames that arrive
//! while a frame is in flight replace each other, so the pipeline always
//! resumes from the newest frame. A result is published only if its sequence
//! is newer than the last published one.
//!
//! With no filter selected nothing is composited: the pipeline publishes
//! [`PreviewOutput::RawLayer`] and the UI shows the device's own preview layer.

pub mod viewport;

use crate::backends::camera::types::{FrameReceiver, PreviewFrame};
use crate::filters::{FilterSelection, FilterSpec};
use futures::Stream;
use image::RgbaImage;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// What the preview surface should show
#[derive(Debug, Clone)]
pub enum PreviewOutput {
    /// No filter active; show the native preview layer
    RawLayer,
    /// Upright, filtered frame at the viewport's exact size
    Filtered(Arc<RgbaImage>),
}

impl PreviewOutput {
    pub fn is_raw_layer(&self) -> bool {
        matches!(self, PreviewOutput::RawLayer)
    }

    pub fn image(&self) -> Option<&Arc<RgbaImage>> {
        match self {
            PreviewOutput::Filtered(image) => Some(image),
            PreviewOutput::RawLayer => None,
        }
    }
}

/// One published preview result
#[derive(Debug, Clone)]
pub struct PreviewUpdate {
    /// Sequence of the source frame
    pub sequence: u64,
    pub output: PreviewOutput,
    /// Time from frame delivery to publication
    pub latency: Duration,
}

/// Per-frame processing: orientation correction, filter, cover crop
#[derive(Debug, Clone, Copy)]
pub struct PreviewProcessor {
    viewport: (u32, u32),
}

impl PreviewProcessor {
    pub fn new(viewport: (u32, u32)) -> Self {
        Self { viewport }
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Produce the displayed image for `frame` with `filter` applied
    pub fn process(&self, frame: &PreviewFrame, filter: &FilterSpec) -> RgbaImage {
        let rotation = frame.orientation.correction();
        let upright = rotation.apply(Arc::clone(&frame.image));
        trace!(
            sequence = frame.sequence,
            rotation = %rotation,
            width = upright.width(),
            height = upright.height(),
            "Frame oriented"
        );

        let filtered = filter.applied(&upright);
        viewport::cover_crop(&filtered, self.viewport)
    }
}

/// Running preview pipeline
///
/// Dropping the handle stops the worker.
pub struct PreviewHandle {
    updates: watch::Receiver<Option<Arc<PreviewUpdate>>>,
    task: JoinHandle<()>,
}

impl PreviewHandle {
    /// Most recently published update
    pub fn latest(&self) -> Option<Arc<PreviewUpdate>> {
        self.updates.borrow().clone()
    }

    /// Receiver for published updates (last value wins)
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<PreviewUpdate>>> {
        self.updates.clone()
    }

    /// Published updates as a stream; ends when the pipeline stops
    pub fn stream(&self) -> impl Stream<Item = Arc<PreviewUpdate>> + Send + 'static {
        let mut updates = self.updates.clone();
        async_stream::stream! {
            while updates.changed().await.is_ok() {
                let update = updates.borrow_and_update().clone();
                if let Some(update) = update {
                    yield update;
                }
            }
        }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Live filter preview pipeline
pub struct PreviewPipeline {
    processor: PreviewProcessor,
    selection: FilterSelection,
}

impl PreviewPipeline {
    /// `selection` is shared with the still pipeline
    pub fn new(viewport: (u32, u32), selection: FilterSelection) -> Self {
        Self {
            processor: PreviewProcessor::new(viewport),
            selection,
        }
    }

    /// Start consuming `frames` on the current tokio runtime
    pub fn spawn(self, frames: FrameReceiver) -> PreviewHandle {
        let (tx, updates) = watch::channel(None);
        info!(viewport = ?self.processor.viewport(), "Starting preview pipeline");
        let task = tokio::spawn(self.run(frames, tx));
        PreviewHandle { updates, task }
    }

    async fn run(self, mut frames: FrameReceiver, tx: watch::Sender<Option<Arc<PreviewUpdate>>>) {
        let mut last_published: Option<u64> = None;

        while let Some(frame) = frames.next_frame().await {
            let sequence = frame.sequence;
            if last_published.is_some_and(|last| sequence <= last) {
                trace!(sequence, "Dropping stale frame");
                continue;
            }

            let output = match self.selection.get() {
                None => PreviewOutput::RawLayer,
                Some(filter) => {
                    let processor = self.processor;
                    let frame = Arc::clone(&frame);
                    match tokio::task::spawn_blocking(move || processor.process(&frame, &filter))
                        .await
                    {
                        Ok(image) => PreviewOutput::Filtered(Arc::new(image)),
                        Err(e) => {
                            warn!(error = %e, sequence, "Preview processing task failed");
                            continue;
                        }
                    }
                }
            };

            // The consumer may have gone away while we were processing
            if tx.is_closed() {
                break;
            }

            last_published = Some(sequence);
            tx.send_replace(Some(Arc::new(PreviewUpdate {
                sequence,
                output,
                latency: frame.captured_at.elapsed(),
            })));
        }

        debug!(?last_published, "Preview pipeline finished");
    }
}

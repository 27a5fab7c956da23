//! Workout frame loop
//!
//! Pulls frames from a source one at a time, runs pose estimation, feeds the
//! session's frame processor and emits events for every stage change and
//! rep. The processor is created and owned by the loop, so the counter state
//! never leaves the session that produced it.
//!
//! The loop stops when the session handle is ended (checked before and after
//! waiting for each frame), when the source is exhausted, or when the source
//! fails. In every case the source is closed and the final summary returned.

use repcount_common::config::CounterConfig;
use repcount_common::events::{EventBus, RepEvent};
use repcount_common::time;
use repcount_common::{FrameOutcome, FrameProcessor, PoseResult, WorkoutSummary};
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::registry::SessionHandle;
use crate::source::{FrameSource, PoseEstimator};

/// Why the frame loop stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The session was ended by its owner
    Cancelled,
    /// The source ran out of frames
    Exhausted,
    /// The source failed; frames up to the failure were counted
    SourceFailed(String),
}

/// Result of one run of the frame loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub summary: WorkoutSummary,
    pub stop_reason: StopReason,
}

/// Runs workout sessions with a shared configuration
#[derive(Clone)]
pub struct WorkoutRunner {
    config: CounterConfig,
    events: EventBus,
}

impl WorkoutRunner {
    pub fn new(config: CounterConfig, events: EventBus) -> Self {
        Self { config, events }
    }

    /// Run the frame loop for one session until it stops
    ///
    /// Only fails if releasing the source fails; source errors during the
    /// loop end the session with [`StopReason::SourceFailed`].
    pub async fn run<S, E>(
        &self,
        source: &mut S,
        estimator: &mut E,
        handle: &SessionHandle,
    ) -> Result<RunReport>
    where
        S: FrameSource,
        E: PoseEstimator<S::Frame>,
    {
        let session_id = handle.session_id();
        let mut processor = FrameProcessor::start_session(&self.config);

        info!("Frame loop started for session {}", session_id);
        let stop_reason = self.drive(source, estimator, handle, &mut processor).await;

        // Whatever stopped the loop, no further frames are counted
        handle.end();
        source.close().await?;

        let summary = processor.end_session();
        info!(
            "Frame loop stopped for session {} ({:?}): {} reps, {} frames processed, {} skipped",
            session_id, stop_reason, summary.reps, summary.frames_processed, summary.frames_skipped
        );

        Ok(RunReport {
            summary,
            stop_reason,
        })
    }

    async fn drive<S, E>(
        &self,
        source: &mut S,
        estimator: &mut E,
        handle: &SessionHandle,
        processor: &mut FrameProcessor,
    ) -> StopReason
    where
        S: FrameSource,
        E: PoseEstimator<S::Frame>,
    {
        loop {
            if !handle.is_active() {
                return StopReason::Cancelled;
            }

            let frame = match source.next_frame().await {
                Ok(Some(frame)) => frame,
                Ok(None) => return StopReason::Exhausted,
                Err(e) => {
                    error!("Frame source failed for session {}: {}", handle.session_id(), e);
                    return StopReason::SourceFailed(e.to_string());
                }
            };

            // The session may have ended while waiting for the frame
            if !handle.is_active() {
                return StopReason::Cancelled;
            }

            let pose = match estimator.estimate(&frame) {
                Ok(pose) => pose,
                Err(e) => {
                    warn!("Pose estimation failed, treating frame as no pose: {}", e);
                    PoseResult::NotDetected
                }
            };

            self.apply(handle, processor, &pose);
        }
    }

    fn apply(&self, handle: &SessionHandle, processor: &mut FrameProcessor, pose: &PoseResult) {
        let (angle, state, transition) = match processor.process_frame(pose) {
            FrameOutcome::Counted {
                angle,
                state,
                transition,
            } => (angle, state, transition),
            FrameOutcome::Skipped(_) => return,
        };

        debug!(
            "Elbow angle {:.1}: count={} stage={}",
            angle, state.count, state.stage
        );

        let session_id = handle.session_id();
        if let Some(old_stage) = transition.stage_changed_from {
            self.events.emit_lossy(RepEvent::StageChanged {
                session_id,
                old_stage,
                new_stage: state.stage,
                timestamp: time::now(),
            });
        }
        if transition.rep_completed {
            info!("Session {}: rep {}", session_id, state.count);
            self.events.emit_lossy(RepEvent::RepCompleted {
                session_id,
                count: state.count,
                timestamp: time::now(),
            });
        }
    }
}

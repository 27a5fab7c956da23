//! Integration tests for the workout frame loop
//!
//! Covers frame ordering, skipped frames, cooperative cancellation, source
//! failures and isolation between concurrent sessions.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use repcount_common::config::CounterConfig;
use repcount_common::events::{EventBus, RepEvent};
use repcount_common::{Landmark, LandmarkPosition, PoseResult, Stage};
use repcount_tr::source::{ChannelSource, FrameSource, PoseEstimator, RecordedPose, ReplaySource};
use repcount_tr::{Error, SessionHandle, SessionRegistry, StopReason, WorkoutRunner};

/// Left arm with the elbow bent to `angle_deg`
fn arm_at(angle_deg: f64) -> PoseResult {
    let rad = angle_deg.to_radians();
    PoseResult::detected([
        (Landmark::LeftShoulder, LandmarkPosition::with_visibility(0.5, 0.3, 0.95)),
        (Landmark::LeftElbow, LandmarkPosition::with_visibility(0.5, 0.5, 0.95)),
        (
            Landmark::LeftWrist,
            LandmarkPosition::with_visibility(0.5 + 0.2 * rad.sin(), 0.5 - 0.2 * rad.cos(), 0.95),
        ),
    ])
}

/// Source yielding a fixed script, optionally ending the session or failing
/// when a given frame is reached
struct ScriptedSource {
    frames: VecDeque<PoseResult>,
    delivered: usize,
    end_at: Option<(usize, SessionHandle)>,
    fail_at: Option<usize>,
    closed: Arc<AtomicBool>,
}

impl ScriptedSource {
    fn new(frames: Vec<PoseResult>) -> Self {
        Self {
            frames: frames.into(),
            delivered: 0,
            end_at: None,
            fail_at: None,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl FrameSource for ScriptedSource {
    type Frame = PoseResult;

    async fn next_frame(&mut self) -> repcount_tr::Result<Option<PoseResult>> {
        if self.fail_at == Some(self.delivered) {
            return Err(Error::Source("camera disconnected".to_string()));
        }
        if let Some((at, handle)) = &self.end_at {
            if *at == self.delivered {
                handle.end();
            }
        }
        self.delivered += 1;
        Ok(self.frames.pop_front())
    }

    async fn close(&mut self) -> repcount_tr::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Estimator that fails on every other frame
struct FlakyEstimator {
    calls: usize,
}

impl PoseEstimator<PoseResult> for FlakyEstimator {
    fn estimate(&mut self, frame: &PoseResult) -> repcount_tr::Result<PoseResult> {
        self.calls += 1;
        if self.calls % 2 == 0 {
            Err(Error::Estimation("model timeout".to_string()))
        } else {
            Ok(frame.clone())
        }
    }
}

fn setup() -> (Arc<SessionRegistry>, WorkoutRunner, EventBus) {
    let events = EventBus::new(256);
    let registry = Arc::new(SessionRegistry::new(events.clone()));
    let runner = WorkoutRunner::new(CounterConfig::default(), events.clone());
    (registry, runner, events)
}

#[tokio::test]
async fn test_two_full_cycles() {
    let (registry, runner, _) = setup();
    let handle = registry.start("u1").await.unwrap();
    let mut source = ScriptedSource::new(
        [170.0, 170.0, 20.0, 20.0, 170.0, 20.0].into_iter().map(arm_at).collect(),
    );
    let closed = Arc::clone(&source.closed);

    let report = runner.run(&mut source, &mut RecordedPose, &handle).await.unwrap();

    assert_eq!(report.stop_reason, StopReason::Exhausted);
    assert_eq!(report.summary.reps, 2);
    assert_eq!(report.summary.final_stage, Stage::Up);
    assert!(closed.load(Ordering::SeqCst), "source must be released");
    assert!(!handle.is_active());
}

#[tokio::test]
async fn test_missed_frame_inside_transition() {
    let (registry, runner, _) = setup();
    let handle = registry.start("u1").await.unwrap();
    let mut source = ScriptedSource::new(vec![arm_at(170.0), PoseResult::NotDetected, arm_at(20.0)]);

    let report = runner.run(&mut source, &mut RecordedPose, &handle).await.unwrap();

    assert_eq!(report.summary.reps, 1);
    assert_eq!(report.summary.frames_processed, 2);
    assert_eq!(report.summary.frames_skipped, 1);
}

#[tokio::test]
async fn test_end_stops_counting_before_next_frame() {
    let (registry, runner, _) = setup();
    let handle = registry.start("u1").await.unwrap();

    // Session is ended while the third frame is being acquired; that frame
    // and everything after it must not be counted
    let mut source = ScriptedSource::new(
        [170.0, 20.0, 170.0, 20.0, 170.0, 20.0].into_iter().map(arm_at).collect(),
    );
    source.end_at = Some((2, handle.clone()));

    let report = runner.run(&mut source, &mut RecordedPose, &handle).await.unwrap();

    assert_eq!(report.stop_reason, StopReason::Cancelled);
    assert_eq!(report.summary.reps, 1);
    assert_eq!(report.summary.frames_processed, 2);
}

#[tokio::test]
async fn test_already_ended_session_processes_nothing() {
    let (registry, runner, _) = setup();
    let handle = registry.start("u1").await.unwrap();
    registry.end(handle.session_id()).await.unwrap();

    let mut source = ScriptedSource::new(vec![arm_at(170.0), arm_at(20.0)]);
    let report = runner.run(&mut source, &mut RecordedPose, &handle).await.unwrap();

    assert_eq!(report.stop_reason, StopReason::Cancelled);
    assert_eq!(report.summary.frames_processed, 0);
    assert_eq!(source.delivered, 0);
}

#[tokio::test]
async fn test_source_failure_keeps_counted_reps() {
    let (registry, runner, _) = setup();
    let handle = registry.start("u1").await.unwrap();
    let mut source = ScriptedSource::new(
        [170.0, 20.0, 170.0, 20.0].into_iter().map(arm_at).collect(),
    );
    source.fail_at = Some(2);

    let report = runner.run(&mut source, &mut RecordedPose, &handle).await.unwrap();

    assert!(matches!(report.stop_reason, StopReason::SourceFailed(_)));
    assert_eq!(report.summary.reps, 1);

    let entry = registry.complete(handle.session_id(), &report.summary).await.unwrap();
    assert_eq!(entry.reps, 1);
}

#[tokio::test]
async fn test_estimator_errors_are_skipped_frames() {
    let (registry, runner, _) = setup();
    let handle = registry.start("u1").await.unwrap();

    // Estimator fails on frames 2 and 4; frames 1 and 3 carry the rep
    let mut source = ScriptedSource::new(vec![arm_at(170.0), arm_at(90.0), arm_at(20.0), arm_at(170.0)]);
    let mut estimator = FlakyEstimator { calls: 0 };

    let report = runner.run(&mut source, &mut estimator, &handle).await.unwrap();

    assert_eq!(report.summary.reps, 1);
    assert_eq!(report.summary.final_stage, Stage::Up);
    assert_eq!(report.summary.frames_skipped, 2);
}

#[tokio::test]
async fn test_events_follow_transitions() {
    let (registry, runner, events) = setup();
    let mut rx = events.subscribe();
    let handle = registry.start("u1").await.unwrap();
    let mut source = ScriptedSource::new([10.0, 170.0, 90.0, 20.0].into_iter().map(arm_at).collect());

    runner.run(&mut source, &mut RecordedPose, &handle).await.unwrap();

    let mut received = Vec::new();
    while let Ok(event) = rx.try_recv() {
        received.push(event);
    }

    assert_eq!(received.len(), 4, "{:?}", received);
    assert!(matches!(received[0], RepEvent::SessionStarted { .. }));
    assert!(matches!(
        received[1],
        RepEvent::StageChanged { old_stage: Stage::Unknown, new_stage: Stage::Down, .. }
    ));
    assert!(matches!(
        received[2],
        RepEvent::StageChanged { old_stage: Stage::Down, new_stage: Stage::Up, .. }
    ));
    assert!(matches!(received[3], RepEvent::RepCompleted { count: 1, .. }));
}

#[tokio::test]
async fn test_concurrent_sessions_are_isolated() {
    let (registry, runner, _) = setup();

    let alice = registry.start("alice").await.unwrap();
    let bob = registry.start("bob").await.unwrap();

    let (alice_tx, mut alice_source) = ChannelSource::channel(16);
    let (bob_tx, mut bob_source) = ChannelSource::channel(16);

    let alice_runner = runner.clone();
    let alice_task = tokio::spawn(async move {
        alice_runner.run(&mut alice_source, &mut RecordedPose, &alice).await
    });
    let bob_runner = runner.clone();
    let bob_task = tokio::spawn(async move {
        bob_runner.run(&mut bob_source, &mut RecordedPose, &bob).await
    });

    // Interleave: alice does three reps, bob extends and stays extended
    for _ in 0..3 {
        alice_tx.send(arm_at(170.0)).await.unwrap();
        bob_tx.send(arm_at(175.0)).await.unwrap();
        alice_tx.send(arm_at(15.0)).await.unwrap();
        bob_tx.send(arm_at(120.0)).await.unwrap();
    }
    drop(alice_tx);
    drop(bob_tx);

    let alice_report = alice_task.await.unwrap().unwrap();
    let bob_report = bob_task.await.unwrap().unwrap();

    assert_eq!(alice_report.summary.reps, 3);
    assert_eq!(alice_report.summary.final_stage, Stage::Up);
    assert_eq!(bob_report.summary.reps, 0);
    assert_eq!(bob_report.summary.final_stage, Stage::Down);
}

#[tokio::test]
async fn test_replay_file_end_to_end() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for pose in [arm_at(170.0), PoseResult::NotDetected, arm_at(20.0), arm_at(165.0), arm_at(25.0)] {
        writeln!(file, "{}", serde_json::to_string(&pose).unwrap()).unwrap();
    }

    let (registry, runner, _) = setup();
    let handle = registry.start("replay-user").await.unwrap();
    let mut source = ReplaySource::open(file.path()).await.unwrap();

    let report = runner.run(&mut source, &mut RecordedPose, &handle).await.unwrap();
    let entry = registry.complete(handle.session_id(), &report.summary).await.unwrap();

    assert_eq!(entry.user_id, "replay-user");
    assert_eq!(entry.reps, 2);
    assert_eq!(entry.stage_label(), "up");
}

//! Curl repetition state machine
//!
//! Turns a stream of elbow angles into a debounced repetition count and a
//! coarse motion stage. Two thresholds with a dead band between them keep
//! per-frame jitter near either extreme from double-counting:
//!
//! - angle above the extended threshold: stage becomes `Down` (arm extended)
//! - angle below the flexed threshold while `Down`: stage becomes `Up` and
//!   one rep is credited
//! - anything else leaves the state untouched
//!
//! A rep is only credited on the `Down → Up` edge, so the first rep of a
//! session requires an observed extension.

use serde::{Deserialize, Serialize};

use crate::config::CounterConfig;

/// Coarse phase of the curl motion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// No extension observed yet this session
    #[default]
    Unknown,
    /// Arm extended
    Down,
    /// Arm flexed
    Up,
}

impl Stage {
    /// Label shown on the overlay and stored in the workout log
    ///
    /// `Unknown` has no label; the log stores an empty string for it.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Stage::Unknown => None,
            Stage::Down => Some("down"),
            Stage::Up => Some("up"),
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Unknown => write!(f, "unknown"),
            Stage::Down => write!(f, "down"),
            Stage::Up => write!(f, "up"),
        }
    }
}

/// Angle thresholds in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Above this the arm counts as extended
    pub extended_deg: f64,
    /// Below this the arm counts as flexed
    pub flexed_deg: f64,
}

impl Thresholds {
    pub const DEFAULT_EXTENDED_DEG: f64 = 160.0;
    pub const DEFAULT_FLEXED_DEG: f64 = 30.0;
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            extended_deg: Self::DEFAULT_EXTENDED_DEG,
            flexed_deg: Self::DEFAULT_FLEXED_DEG,
        }
    }
}

impl From<&CounterConfig> for Thresholds {
    fn from(config: &CounterConfig) -> Self {
        Self {
            extended_deg: config.extended_threshold_deg,
            flexed_deg: config.flexed_threshold_deg,
        }
    }
}

/// Count and stage of one workout session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RepCounterState {
    pub count: u32,
    pub stage: Stage,
}

impl RepCounterState {
    /// Fresh session state: no reps, stage unknown
    pub fn new() -> Self {
        Self::default()
    }
}

/// What a single update changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transition {
    /// Stage before the update, if the update changed it
    pub stage_changed_from: Option<Stage>,
    /// A rep was credited by this update
    pub rep_completed: bool,
}

impl Transition {
    pub fn is_noop(&self) -> bool {
        self.stage_changed_from.is_none() && !self.rep_completed
    }
}

/// Rep counter for a single session
///
/// Owned by exactly one session and fed in frame order. Out-of-order angles
/// corrupt stage transitions and cannot be detected here.
#[derive(Debug, Clone)]
pub struct RepCounter {
    state: RepCounterState,
    thresholds: Thresholds,
}

impl RepCounter {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            state: RepCounterState::new(),
            thresholds,
        }
    }

    /// Resume counting from an existing snapshot
    pub fn with_state(state: RepCounterState, thresholds: Thresholds) -> Self {
        Self { state, thresholds }
    }

    pub fn state(&self) -> RepCounterState {
        self.state
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Apply one elbow angle and return the resulting state
    pub fn update(&mut self, angle: f64) -> RepCounterState {
        self.step(angle);
        self.state
    }

    /// Apply one elbow angle and report what changed
    pub fn step(&mut self, angle: f64) -> Transition {
        let before = self.state.stage;
        let mut rep_completed = false;

        if angle > self.thresholds.extended_deg {
            self.state.stage = Stage::Down;
        } else if angle < self.thresholds.flexed_deg && self.state.stage == Stage::Down {
            self.state.stage = Stage::Up;
            self.state.count += 1;
            rep_completed = true;
        }

        Transition {
            stage_changed_from: (self.state.stage != before).then_some(before),
            rep_completed,
        }
    }
}

impl Default for RepCounter {
    fn default() -> Self {
        Self::new(Thresholds::default())
    }
}

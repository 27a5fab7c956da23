//! Pose landmark types supplied by the pose-estimation model
//!
//! The model itself is an external collaborator. Per frame it reports either
//! no pose at all or a set of named landmarks with normalized coordinates and
//! an optional visibility score.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::geometry::{AnglePoints, JointPoint};
use crate::session::SkipReason;

/// Arm landmarks, numbered as the pose model indexes them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(usize)]
pub enum Landmark {
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
}

impl Landmark {
    /// Shoulder, elbow and wrist of the tracked arm, in angle order
    pub const CURL_JOINTS: [Landmark; 3] =
        [Landmark::LeftShoulder, Landmark::LeftElbow, Landmark::LeftWrist];

    /// Index of this landmark in the model's output array
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            11 => Some(Self::LeftShoulder),
            12 => Some(Self::RightShoulder),
            13 => Some(Self::LeftElbow),
            14 => Some(Self::RightElbow),
            15 => Some(Self::LeftWrist),
            16 => Some(Self::RightWrist),
            _ => None,
        }
    }

    /// Name as it appears in recordings ("left_elbow")
    pub fn name(self) -> &'static str {
        match self {
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
        }
    }
}

impl std::fmt::Display for Landmark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One landmark as located by the pose model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPosition {
    /// Normalized X coordinate (0.0-1.0)
    pub x: f64,
    /// Normalized Y coordinate (0.0-1.0)
    pub y: f64,
    /// Model confidence that the landmark is visible (0.0-1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f32>,
}

impl LandmarkPosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, visibility: None }
    }

    pub fn with_visibility(x: f64, y: f64, visibility: f32) -> Self {
        Self {
            x,
            y,
            visibility: Some(visibility),
        }
    }

    pub fn point(&self) -> JointPoint {
        JointPoint::new(self.x, self.y)
    }
}

/// Per-frame output of the pose model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PoseResult {
    /// No person found in the frame
    NotDetected,
    /// Landmarks located in the frame (possibly a partial set)
    Detected {
        landmarks: HashMap<Landmark, LandmarkPosition>,
    },
}

impl PoseResult {
    pub fn detected<I>(landmarks: I) -> Self
    where
        I: IntoIterator<Item = (Landmark, LandmarkPosition)>,
    {
        Self::Detected {
            landmarks: landmarks.into_iter().collect(),
        }
    }

    pub fn is_detected(&self) -> bool {
        matches!(self, Self::Detected { .. })
    }

    pub fn get(&self, landmark: Landmark) -> Option<&LandmarkPosition> {
        match self {
            Self::NotDetected => None,
            Self::Detected { landmarks } => landmarks.get(&landmark),
        }
    }

    /// Shoulder/elbow/wrist triple of the tracked arm
    ///
    /// Fails with the first reason the frame cannot be used: no pose, a
    /// missing joint, a non-finite coordinate, or visibility under
    /// `min_visibility`. Landmarks without a visibility score are accepted.
    pub fn curl_points(&self, min_visibility: f32) -> Result<AnglePoints, SkipReason> {
        let landmarks = match self {
            Self::NotDetected => return Err(SkipReason::NoPose),
            Self::Detected { landmarks } => landmarks,
        };

        let mut joints = [JointPoint::new(0.0, 0.0); 3];
        for (slot, landmark) in joints.iter_mut().zip(Landmark::CURL_JOINTS) {
            let position = landmarks
                .get(&landmark)
                .ok_or(SkipReason::MissingLandmark(landmark))?;

            let point = position.point();
            if !point.is_finite() {
                return Err(SkipReason::InvalidCoordinate(landmark));
            }

            match position.visibility {
                Some(v) if v.is_nan() || v < min_visibility => {
                    return Err(SkipReason::LowVisibility(landmark));
                }
                _ => {}
            }

            *slot = point;
        }

        let [shoulder, elbow, wrist] = joints;
        Ok(AnglePoints::new(shoulder, elbow, wrist))
    }
}

//! Planar geometry: poses, waypoints and the action projector.
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

/// Number of headings in the visualization ring, see [`candidate_ring`].
pub const N_CANDIDATES: usize = 20;

/// Smallest heading offset of the visualization ring.
const CANDIDATE_HEADING_MIN: f64 = -2.0;

/// Heading increment of the visualization ring.
const CANDIDATE_HEADING_STEP: f64 = 0.2;

/// A pose of the robot in the map frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose2D {
    /// x coordinate.
    pub x: f64,

    /// y coordinate.
    pub y: f64,

    /// Yaw in (−π, π].
    pub theta: f64,
}

impl Pose2D {
    /// Constructs a pose, normalizing `theta`.
    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        Self {
            x,
            y,
            theta: normalize_angle(theta),
        }
    }

    /// Position of the pose.
    pub fn position(&self) -> Waypoint {
        Waypoint::new(self.x, self.y)
    }
}

/// A target point in the map frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// x coordinate.
    pub x: f64,

    /// y coordinate.
    pub y: f64,
}

impl Waypoint {
    /// Constructs a waypoint.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Waypoint) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Returns `true` if both coordinates are finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Realized velocity of the robot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Twist {
    /// Linear velocity along the heading.
    pub linear: f64,

    /// Angular velocity about the vertical axis.
    pub angular: f64,
}

impl Twist {
    /// Constructs a twist.
    pub fn new(linear: f64, angular: f64) -> Self {
        Self { linear, angular }
    }
}

/// Wraps an angle into (−π, π].
///
/// Angles already in range are returned unchanged, which makes the function
/// exactly idempotent.
pub fn normalize_angle(a: f64) -> f64 {
    if a > -PI && a <= PI {
        return a;
    }
    let n = (a + PI).rem_euclid(TAU) - PI;
    if n <= -PI {
        n + TAU
    } else {
        n
    }
}

/// Projects a heading offset onto the circle of radius `radius` around `reference`.
///
/// The heading is relative to the robot yaw.
pub fn project(action_heading: f64, robot_yaw: f64, reference: Waypoint, radius: f64) -> Waypoint {
    let angle = normalize_angle(action_heading + robot_yaw);
    Waypoint::new(
        reference.x + radius * angle.cos(),
        reference.y + radius * angle.sin(),
    )
}

/// Distance from `pose` to `target` and the bearing of `target` seen from `pose`.
pub fn distance_and_bearing(target: &Waypoint, pose: &Pose2D) -> (f64, f64) {
    let dx = target.x - pose.x;
    let dy = target.y - pose.y;
    let rho = dx.hypot(dy);
    let theta = normalize_angle(dy.atan2(dx) - pose.theta);
    (rho, theta)
}

/// Yaw of an orientation quaternion.
///
/// Valid for planar robots rotating about the vertical axis only.
pub fn yaw_from_quaternion(x: f64, y: f64, z: f64, w: f64) -> f64 {
    (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z))
}

/// Quaternion `(x, y, z, w)` of a rotation by `yaw` about the vertical axis.
pub fn quaternion_from_yaw(yaw: f64) -> (f64, f64, f64, f64) {
    let half = 0.5 * yaw;
    (0.0, 0.0, half.sin(), half.cos())
}

/// Projection candidates for heading offsets −2.0, −1.8, …, 1.8 rad.
pub fn candidate_ring(reference: Waypoint, robot_yaw: f64, radius: f64) -> Vec<Waypoint> {
    (0..N_CANDIDATES)
        .map(|i| {
            let heading = CANDIDATE_HEADING_MIN + CANDIDATE_HEADING_STEP * i as f64;
            project(heading, robot_yaw, reference, radius)
        })
        .collect()
}

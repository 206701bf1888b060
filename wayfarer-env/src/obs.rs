//! Observation of the waypoint environment.
use crate::geometry::Pose2D;
use wayfarer_core::Obs;

/// An observation delivered by the [`ObservationProvider`](crate::transport::ObservationProvider).
///
/// `merged` is the vector handed to the agent. The other fields are the parts the
/// reward engine and the loop itself read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WpObs {
    /// Flattened observation for the agent.
    pub merged: Vec<f32>,

    /// Laser ranges.
    pub laser_scan: Vec<f32>,

    /// Distance and bearing of the global goal seen from the robot.
    pub goal_in_robot_frame: (f64, f64),

    /// Distance and bearing of the global goal seen from the current subgoal.
    pub global_in_subgoal_frame: (f64, f64),

    /// Pose of the robot.
    pub robot_pose: Pose2D,
}

impl WpObs {
    /// Builds an observation whose merged vector is the scan followed by the
    /// distance and bearing of the goal.
    pub fn from_parts(
        laser_scan: Vec<f32>,
        goal_in_robot_frame: (f64, f64),
        global_in_subgoal_frame: (f64, f64),
        robot_pose: Pose2D,
    ) -> Self {
        let mut merged = Vec::with_capacity(laser_scan.len() + 2);
        merged.extend_from_slice(&laser_scan);
        merged.push(goal_in_robot_frame.0 as f32);
        merged.push(goal_in_robot_frame.1 as f32);
        Self {
            merged,
            laser_scan,
            goal_in_robot_frame,
            global_in_subgoal_frame,
            robot_pose,
        }
    }
}

impl Obs for WpObs {
    fn len(&self) -> usize {
        self.merged.len()
    }
}

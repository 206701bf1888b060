//! Waypoint gate: decides once per step whether a new command is issued.
//!
//! ```text
//!   AwaitingFirst ──(first step)──────────────────────────────▶ EnRoute
//!   EnRoute ──(d(robot, target) >= arrival)──▶ EnRoute (hold, no command)
//!   EnRoute ──(d(robot, target) <  arrival)──▶ arrived:
//!       d(robot, goal) <  goal proximity ──▶ EnRoute(goal)
//!       otherwise                        ──▶ EnRoute(projected waypoint)
//! ```
//!
//! Both thresholds are strict: a robot exactly at the arrival threshold keeps
//! holding, and a goal exactly at the proximity threshold is not substituted.
//!
//! The goal distance is read from the step snapshot. Substitution therefore
//! fires only once the global goal has been delivered through
//! [`SnapshotWriter::on_global_goal`](crate::snapshot::SnapshotWriter::on_global_goal);
//! until then every arrival issues a projected waypoint.
use crate::{
    geometry::{distance_and_bearing, project, Waypoint},
    snapshot::Snapshot,
    WpEnvError,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Thresholds and projection radius of the gate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateParams {
    /// Distance below which the robot has reached its target.
    pub arrival_threshold: f64,

    /// Goal distance below which the goal replaces a projected waypoint.
    pub goal_proximity_threshold: f64,

    /// Radius of the projection circle around the reference point.
    pub projection_radius: f64,
}

impl Default for GateParams {
    fn default() -> Self {
        Self {
            arrival_threshold: 0.6,
            goal_proximity_threshold: 2.0,
            projection_radius: 1.5,
        }
    }
}

/// Kind of an issued target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// A waypoint projected from the action.
    Projected,

    /// The global goal itself.
    Goal,
}

/// A target command sent to the motion controller. The orientation is always neutral.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaypointCommand {
    /// Target in the map frame.
    pub waypoint: Waypoint,

    /// Kind of the target.
    pub kind: TargetKind,
}

/// Why a command is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueReason {
    /// First command of the episode.
    First,

    /// The robot reached its target and the goal is still far.
    Arrived,

    /// The robot reached its target close to the goal.
    GoalInRange,
}

/// Outcome of [`WaypointGate::decide`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateDecision {
    /// Keep tracking the current target.
    Hold {
        /// Distance of the robot to the current target.
        distance: f64,
    },

    /// Emit a new command.
    Issue {
        /// The command.
        command: WaypointCommand,
        /// Why the command is issued.
        reason: IssueReason,
    },
}

/// State of the gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateState {
    /// No command issued in this episode.
    AwaitingFirst,

    /// Tracking the given target.
    EnRoute(WaypointCommand),
}

/// The waypoint gate state machine.
#[derive(Debug, Clone)]
pub struct WaypointGate {
    params: GateParams,
    state: GateState,
}

impl WaypointGate {
    /// Creates a gate in [`GateState::AwaitingFirst`].
    pub fn new(params: GateParams) -> Self {
        Self {
            params,
            state: GateState::AwaitingFirst,
        }
    }

    /// Parameters of the gate.
    pub fn params(&self) -> &GateParams {
        &self.params
    }

    /// Current state.
    pub fn state(&self) -> GateState {
        self.state
    }

    /// Back to [`GateState::AwaitingFirst`], called at episode reset.
    pub fn reset(&mut self) {
        self.state = GateState::AwaitingFirst;
    }

    /// Decides what to do in this step without changing the gate.
    ///
    /// `heading` is the heading offset of the current action. An issued command
    /// becomes the tracked target only when passed to [`WaypointGate::commit`].
    pub fn decide(&self, snapshot: &Snapshot, heading: f64) -> Result<GateDecision, WpEnvError> {
        let robot = snapshot.robot_pose.position();

        let target = match self.state {
            GateState::AwaitingFirst => {
                let command = self.projected(snapshot, heading)?;
                return Ok(GateDecision::Issue {
                    command,
                    reason: IssueReason::First,
                });
            }
            GateState::EnRoute(target) => target,
        };

        let (distance, bearing) = distance_and_bearing(&target.waypoint, &snapshot.robot_pose);
        check_distance("robot to target", distance)?;
        if distance >= self.params.arrival_threshold {
            return Ok(GateDecision::Hold { distance });
        }
        debug!(
            "Arrived at {:?} (distance = {:.3}, bearing = {:.3})",
            target, distance, bearing
        );

        if let Some(goal) = snapshot.global_goal {
            let goal_distance = robot.distance(&goal);
            check_distance("robot to goal", goal_distance)?;
            if goal_distance < self.params.goal_proximity_threshold {
                return Ok(GateDecision::Issue {
                    command: WaypointCommand {
                        waypoint: goal,
                        kind: TargetKind::Goal,
                    },
                    reason: IssueReason::GoalInRange,
                });
            }
        }

        Ok(GateDecision::Issue {
            command: self.projected(snapshot, heading)?,
            reason: IssueReason::Arrived,
        })
    }

    /// Makes an emitted command the tracked target.
    pub fn commit(&mut self, command: WaypointCommand) {
        self.state = GateState::EnRoute(command);
    }

    fn projected(&self, snapshot: &Snapshot, heading: f64) -> Result<WaypointCommand, WpEnvError> {
        let reference = match snapshot.reference_waypoint {
            Some(reference) => reference,
            None => {
                warn!("No reference waypoint delivered yet, projecting around the robot");
                snapshot.robot_pose.position()
            }
        };
        let waypoint = project(
            heading,
            snapshot.robot_pose.theta,
            reference,
            self.params.projection_radius,
        );
        if !waypoint.is_finite() {
            return Err(WpEnvError::InvariantViolation(format!(
                "projected waypoint {:?} from reference {:?} and pose {:?}",
                waypoint, reference, snapshot.robot_pose
            )));
        }
        Ok(WaypointCommand {
            waypoint,
            kind: TargetKind::Projected,
        })
    }
}

fn check_distance(what: &str, d: f64) -> Result<(), WpEnvError> {
    if d >= 0.0 && d.is_finite() {
        Ok(())
    } else {
        Err(WpEnvError::InvariantViolation(format!(
            "distance {} = {}",
            what, d
        )))
    }
}

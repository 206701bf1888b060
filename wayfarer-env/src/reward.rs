//! Reward engine contract and the default reward calculator.
use crate::geometry::{Pose2D, Twist, Waypoint};
use serde::Serialize;
use std::fmt;

/// Why an episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DoneReason {
    /// The step limit of the episode was reached.
    MaxSteps,

    /// The robot collided with an obstacle.
    Collision,

    /// The robot reached the goal.
    GoalReached,
}

impl DoneReason {
    /// Termination code: `0` max steps, `1` collision, `2` goal reached.
    pub fn code(&self) -> u8 {
        match self {
            Self::MaxSteps => 0,
            Self::Collision => 1,
            Self::GoalReached => 2,
        }
    }
}

impl fmt::Display for DoneReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MaxSteps => "max_steps",
            Self::Collision => "collision",
            Self::GoalReached => "goal_reached",
        };
        write!(f, "{}", s)
    }
}

/// Termination classification of a step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewardInfo {
    /// Whether the episode ends with this step.
    pub is_done: bool,

    /// Set when `is_done` is `true`.
    pub done_reason: Option<DoneReason>,
}

impl RewardInfo {
    /// A step that does not end the episode.
    pub fn running() -> Self {
        Self::default()
    }

    /// A step ending the episode.
    pub fn done(reason: DoneReason) -> Self {
        Self {
            is_done: true,
            done_reason: Some(reason),
        }
    }
}

/// Inputs of the reward engine for one step.
#[derive(Debug, Clone, Copy)]
pub struct RewardInput<'a> {
    /// Laser ranges.
    pub laser_scan: &'a [f32],

    /// Distance and bearing of the goal seen from the robot.
    pub goal_in_robot_frame: (f64, f64),

    /// Pose of the robot.
    pub robot_pose: Pose2D,

    /// Global plan of the episode.
    pub global_plan: &'a [Waypoint],

    /// Realized velocity, used in place of the agent action.
    pub action: Twist,

    /// Rounded initial goal distance.
    pub goal_path_length: u32,

    /// Number of commands emitted in the episode so far.
    pub action_count: usize,
}

/// Computes the reward and the termination classification of a step.
///
/// Implementations must be deterministic: identical inputs after a [`RewardEngine::reset`]
/// give identical outputs.
pub trait RewardEngine {
    /// Clears the per-episode state. Called once at every episode reset.
    fn reset(&mut self);

    /// Reward of a step.
    fn get_reward(&mut self, input: &RewardInput<'_>) -> (f32, RewardInfo);
}

/// Default reward shaping.
///
/// * Goal reached (goal distance below `goal_radius`): `+15`, episode ends.
/// * Collision (closest laser range at most `robot_radius`): `−10`, episode ends.
/// * Otherwise the sum of
///   * `−0.25` when the closest range is below `safe_dist`,
///   * `0.3` times the decrease of the goal distance since the last step,
///   * `−0.01` times the realized linear speed plus `−0.001` times the angular speed,
///   * `−0.05` times the distance to the global plan when farther than 0.5,
///   * `−0.1` once the command count exceeds the goal path length.
#[derive(Debug, Clone)]
pub struct RewardCalculator {
    robot_radius: f64,
    safe_dist: f64,
    goal_radius: f64,
    last_goal_dist: Option<f64>,
}

impl RewardCalculator {
    /// Creates a calculator.
    pub fn new(robot_radius: f64, safe_dist: f64, goal_radius: f64) -> Self {
        Self {
            robot_radius,
            safe_dist,
            goal_radius,
            last_goal_dist: None,
        }
    }

    fn reward_goal_approached(&mut self, goal_dist: f64) -> f64 {
        let r = match self.last_goal_dist {
            Some(last) => 0.3 * (last - goal_dist),
            None => 0.0,
        };
        self.last_goal_dist = Some(goal_dist);
        r
    }
}

impl RewardEngine for RewardCalculator {
    fn reset(&mut self) {
        self.last_goal_dist = None;
    }

    fn get_reward(&mut self, input: &RewardInput<'_>) -> (f32, RewardInfo) {
        let goal_dist = input.goal_in_robot_frame.0;
        if goal_dist < self.goal_radius {
            return (15.0, RewardInfo::done(DoneReason::GoalReached));
        }

        let min_range = input
            .laser_scan
            .iter()
            .copied()
            .fold(f32::INFINITY, f32::min) as f64;
        if min_range <= self.robot_radius {
            return (-10.0, RewardInfo::done(DoneReason::Collision));
        }

        let mut reward = 0.0;
        if min_range < self.safe_dist {
            reward -= 0.25;
        }
        reward += self.reward_goal_approached(goal_dist);
        reward -= 0.01 * input.action.linear.abs() + 0.001 * input.action.angular.abs();

        let robot = input.robot_pose.position();
        let plan_dist = input
            .global_plan
            .iter()
            .map(|p| p.distance(&robot))
            .fold(f64::INFINITY, f64::min);
        if plan_dist.is_finite() && plan_dist > 0.5 {
            reward -= 0.05 * plan_dist;
        }

        if input.goal_path_length > 0 && input.action_count > input.goal_path_length as usize {
            reward -= 0.1;
        }

        (reward as f32, RewardInfo::running())
    }
}

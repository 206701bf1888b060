//! Configuration of [`WpEnv`](crate::WpEnv).
use crate::{gate::GateParams, sim::SimConfig};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
    time::Duration,
};

/// Configuration of [`WpEnv`](crate::WpEnv).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WpEnvConfig {
    /// Path of the robot descriptor (flatland model file).
    pub robot_yaml_path: PathBuf,

    /// Path of the settings descriptor holding the action lists.
    pub settings_yaml_path: PathBuf,

    /// Use the discrete action list instead of the continuous heading range.
    pub is_action_space_discrete: bool,

    /// Step limit of an episode.
    pub max_steps_per_episode: usize,

    /// Goal distance at which the goal counts as reached.
    pub goal_radius: f64,

    /// Laser range below which the reward is penalized.
    /// Defaults to 1.1 times the robot radius.
    pub safe_dist: Option<f64>,

    /// Distance below which the robot has reached its waypoint.
    pub arrival_threshold: f64,

    /// Goal distance below which the goal replaces a projected waypoint.
    pub goal_proximity_threshold: f64,

    /// Radius of the projection circle.
    pub projection_radius: f64,

    /// Advance simulated time with the world stepper on every step.
    pub train_mode: bool,

    /// Bound on waiting for an observation, in milliseconds.
    pub observation_timeout_ms: u64,

    /// Bound on waiting for a command to be accepted, in milliseconds.
    pub command_timeout_ms: u64,

    /// Parameters of the built-in simulator used by [`Env::build`](wayfarer_core::Env::build).
    pub sim: SimConfig,
}

impl Default for WpEnvConfig {
    fn default() -> Self {
        let gate = GateParams::default();
        Self {
            robot_yaml_path: PathBuf::from("config/robot.yaml"),
            settings_yaml_path: PathBuf::from("config/settings.yaml"),
            is_action_space_discrete: false,
            max_steps_per_episode: 100,
            goal_radius: 0.1,
            safe_dist: None,
            arrival_threshold: gate.arrival_threshold,
            goal_proximity_threshold: gate.goal_proximity_threshold,
            projection_radius: gate.projection_radius,
            train_mode: true,
            observation_timeout_ms: 5000,
            command_timeout_ms: 1000,
            sim: SimConfig::default(),
        }
    }
}

impl WpEnvConfig {
    /// Sets the paths of the robot and settings descriptors.
    pub fn descriptors(mut self, robot: impl Into<PathBuf>, settings: impl Into<PathBuf>) -> Self {
        self.robot_yaml_path = robot.into();
        self.settings_yaml_path = settings.into();
        self
    }

    /// Selects the discrete or the continuous action space.
    pub fn discrete(mut self, v: bool) -> Self {
        self.is_action_space_discrete = v;
        self
    }

    /// Sets the step limit of an episode.
    pub fn max_steps_per_episode(mut self, v: usize) -> Self {
        self.max_steps_per_episode = v;
        self
    }

    /// Sets the goal radius.
    pub fn goal_radius(mut self, v: f64) -> Self {
        self.goal_radius = v;
        self
    }

    /// Sets the safe distance of the reward.
    pub fn safe_dist(mut self, v: f64) -> Self {
        self.safe_dist = Some(v);
        self
    }

    /// Sets the thresholds and the radius of the waypoint gate.
    pub fn gate(mut self, params: GateParams) -> Self {
        self.arrival_threshold = params.arrival_threshold;
        self.goal_proximity_threshold = params.goal_proximity_threshold;
        self.projection_radius = params.projection_radius;
        self
    }

    /// Sets training mode.
    pub fn train_mode(mut self, v: bool) -> Self {
        self.train_mode = v;
        self
    }

    /// Sets the bounds on waiting for observations and for commands to be accepted.
    pub fn timeouts(mut self, observation: Duration, command: Duration) -> Self {
        self.observation_timeout_ms = observation.as_millis() as u64;
        self.command_timeout_ms = command.as_millis() as u64;
        self
    }

    /// Sets the simulator parameters.
    pub fn sim(mut self, v: SimConfig) -> Self {
        self.sim = v;
        self
    }

    /// Parameters of the waypoint gate.
    pub fn gate_params(&self) -> GateParams {
        GateParams {
            arrival_threshold: self.arrival_threshold,
            goal_proximity_threshold: self.goal_proximity_threshold,
            projection_radius: self.projection_radius,
        }
    }

    /// Bound on waiting for an observation.
    pub fn observation_timeout(&self) -> Duration {
        Duration::from_millis(self.observation_timeout_ms)
    }

    /// Bound on waiting for a command to be accepted.
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    /// Constructs [`WpEnvConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`WpEnvConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

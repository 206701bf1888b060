//! The episodic control loop.
use crate::{
    descriptor::{load_action_space, RobotDescriptor},
    episode::EpisodeState,
    gate::{GateDecision, GateState, WaypointGate},
    geometry::candidate_ring,
    reward::{DoneReason, RewardCalculator, RewardEngine, RewardInput},
    sim::{SimBackend, SimHandle},
    snapshot::{SnapshotStore, SnapshotWriter},
    transport::NavBackend,
    ActionSpace, WpAct, WpEnvConfig, WpEnvError, WpObs,
};
use anyhow::Result;
use log::{debug, error, info, trace};
use wayfarer_core::{
    record::{Record, RecordValue},
    Env, Info, Step,
};

/// Information given at every step of [`WpEnv`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WpInfo {
    /// Why the episode ended. Present only when the step is done.
    pub done_reason: Option<DoneReason>,
}

impl Info for WpInfo {}

/// Waypoint environment.
///
/// Each step takes a heading offset from the agent, turns it into a map-frame
/// waypoint around the current subgoal when the robot has reached its previous
/// target, and scores the resulting motion with a [`RewardEngine`].
///
/// The environment owns its [`NavBackend`] and a [`SnapshotStore`]. Transports
/// deliver robot state through the [`SnapshotWriter`] returned by
/// [`WpEnv::snapshot_writer`], possibly from other threads.
pub struct WpEnv {
    config: WpEnvConfig,
    robot: RobotDescriptor,
    action_space: ActionSpace,
    backend: NavBackend,
    reward: Box<dyn RewardEngine>,
    store: SnapshotStore,
    gate: WaypointGate,
    episode: EpisodeState,
    closed: bool,
}

impl WpEnv {
    /// Creates an environment, reading the descriptors named in `config`.
    pub fn new(config: WpEnvConfig, store: SnapshotStore, backend: NavBackend) -> Result<Self, WpEnvError> {
        let robot = RobotDescriptor::load(&config.robot_yaml_path)?;
        let action_space =
            load_action_space(&config.settings_yaml_path, config.is_action_space_discrete)?;
        Self::from_parts(config, robot, action_space, store, backend)
    }

    /// Creates an environment from already parsed descriptors.
    ///
    /// The default reward engine is a [`RewardCalculator`]; replace it with
    /// [`WpEnv::with_reward_engine`].
    pub fn from_parts(
        config: WpEnvConfig,
        robot: RobotDescriptor,
        action_space: ActionSpace,
        store: SnapshotStore,
        backend: NavBackend,
    ) -> Result<Self, WpEnvError> {
        if config.train_mode && backend.stepper.is_none() {
            return Err(WpEnvError::Config(
                "training mode requires a world stepper".to_string(),
            ));
        }
        if action_space.is_empty() {
            return Err(WpEnvError::Config("empty discrete action list".to_string()));
        }
        if config.max_steps_per_episode == 0 {
            return Err(WpEnvError::Config(
                "max_steps_per_episode must be positive".to_string(),
            ));
        }

        let safe_dist = config.safe_dist.unwrap_or(1.1 * robot.radius);
        let reward = RewardCalculator::new(robot.radius, safe_dist, config.goal_radius);
        info!(
            "WpEnv: robot radius = {:.3}, safe_dist = {:.3}, {} laser beams, {} action space",
            robot.radius,
            safe_dist,
            robot.laser_num_beams,
            if action_space.is_discrete() { "discrete" } else { "continuous" }
        );

        Ok(Self {
            gate: WaypointGate::new(config.gate_params()),
            config,
            robot,
            action_space,
            backend,
            reward: Box::new(reward),
            store,
            episode: EpisodeState::default(),
            closed: false,
        })
    }

    /// Creates an environment driving the built-in simulator.
    ///
    /// Returns a handle for inspecting the simulated world.
    pub fn with_sim(config: &WpEnvConfig, seed: u64) -> Result<(Self, SimHandle), WpEnvError> {
        if !config.train_mode {
            return Err(WpEnvError::Config(
                "the simulator runs in training mode only".to_string(),
            ));
        }
        let robot = RobotDescriptor::load(&config.robot_yaml_path)?;
        let action_space =
            load_action_space(&config.settings_yaml_path, config.is_action_space_discrete)?;
        let store = SnapshotStore::new();
        let sim = SimBackend::new(&config.sim, &robot, seed, store.writer());
        let handle = sim.handle();
        let env = Self::from_parts(config.clone(), robot, action_space, store, sim.into_backend())?;
        Ok((env, handle))
    }

    /// Replaces the reward engine.
    pub fn with_reward_engine(mut self, reward: impl RewardEngine + 'static) -> Self {
        self.reward = Box::new(reward);
        self
    }

    /// Writer for the delivery callbacks of transports.
    pub fn snapshot_writer(&self) -> SnapshotWriter {
        self.store.writer()
    }

    /// Bookkeeping of the current episode.
    pub fn episode_state(&self) -> EpisodeState {
        self.episode
    }

    /// State of the waypoint gate.
    pub fn gate_state(&self) -> GateState {
        self.gate.state()
    }

    /// Action space.
    pub fn action_space(&self) -> &ActionSpace {
        &self.action_space
    }

    /// Robot descriptor.
    pub fn robot(&self) -> &RobotDescriptor {
        &self.robot
    }

    /// Configuration.
    pub fn config(&self) -> &WpEnvConfig {
        &self.config
    }

    /// Returns `true` after [`WpEnv::close`].
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Closes the environment. Later calls of `step` and `reset` fail with [`WpEnvError::Closed`].
    pub fn close(&mut self) {
        if !self.closed {
            info!("Closing WpEnv");
            self.closed = true;
        }
    }

    fn ensure_open(&self) -> Result<(), WpEnvError> {
        if self.closed {
            Err(WpEnvError::Closed)
        } else {
            Ok(())
        }
    }

    fn tick(&mut self) -> Result<(), WpEnvError> {
        if self.config.train_mode {
            if let Some(stepper) = self.backend.stepper.as_mut() {
                stepper.step_world()?;
            }
        }
        Ok(())
    }

    /// Starts a new episode and returns its initial observation.
    pub fn try_reset(&mut self) -> Result<WpObs, WpEnvError> {
        trace!("WpEnv::reset()");
        self.ensure_open()?;
        log_invariant_violation(self.reset_inner())
    }

    fn reset_inner(&mut self) -> Result<WpObs, WpEnvError> {
        self.backend.costmaps.clear_costmaps()?;
        self.backend.commands.cancel()?;
        self.tick()?;
        self.backend.task.reset_layout()?;

        self.reward.reset();
        self.episode = EpisodeState::default();
        self.gate.reset();

        let obs = self.backend.observations.get_observations()?;
        info!(
            "New episode, goal distance = {:.3}",
            obs.goal_in_robot_frame.0
        );
        Ok(obs)
    }

    /// Runs one step of the control loop.
    pub fn try_step(&mut self, act: &WpAct) -> Result<(Step<Self>, Record), WpEnvError> {
        trace!("WpEnv::step()");
        self.ensure_open()?;
        log_invariant_violation(self.step_inner(act))
    }

    fn step_inner(&mut self, act: &WpAct) -> Result<(Step<Self>, Record), WpEnvError> {
        let heading = self.action_space.heading(act)?;
        let step_counter = self.episode.begin_step()?;

        let snapshot = self.store.snapshot();
        let yaw = snapshot.robot_pose.theta;
        let reference = snapshot
            .reference_waypoint
            .unwrap_or_else(|| snapshot.robot_pose.position());
        self.backend
            .commands
            .publish_candidates(&candidate_ring(reference, yaw, self.gate.params().projection_radius))?;

        let decision = self.gate.decide(&snapshot, heading)?;
        let emitted = match decision {
            GateDecision::Hold { distance } => {
                trace!("Holding, distance to target = {:.3}", distance);
                false
            }
            GateDecision::Issue { command, reason } => {
                self.backend.commands.publish_waypoint(&command)?;
                let action_count = self.episode.record_emission()?;
                self.gate.commit(command);
                debug!(
                    "Issued {:?} ({:?}), action_count = {}",
                    command, reason, action_count
                );
                true
            }
        };
        let twist = snapshot.twist;

        self.tick()?;
        let obs = self.backend.observations.get_observations()?;

        self.episode.latch_goal_path_length(obs.goal_in_robot_frame.0)?;

        let (reward, mut reward_info) = self.reward.get_reward(&RewardInput {
            laser_scan: &obs.laser_scan,
            goal_in_robot_frame: obs.goal_in_robot_frame,
            robot_pose: obs.robot_pose,
            global_plan: &snapshot.global_plan,
            action: twist,
            goal_path_length: self.episode.goal_path_length,
            action_count: self.episode.action_count,
        });

        let is_terminated = reward_info.is_done;
        let mut is_truncated = false;
        if !is_terminated && step_counter >= self.config.max_steps_per_episode {
            reward_info.is_done = true;
            reward_info.done_reason = Some(DoneReason::MaxSteps);
            is_truncated = true;
        }

        let mut record = Record::from_slice(&[
            ("step_counter", RecordValue::Scalar(step_counter as f32)),
            ("action_count", RecordValue::Scalar(self.episode.action_count as f32)),
            (
                "goal_path_length",
                RecordValue::Scalar(self.episode.goal_path_length as f32),
            ),
            ("emitted", RecordValue::Scalar(if emitted { 1.0 } else { 0.0 })),
            ("heading", RecordValue::Scalar(heading as f32)),
        ]);
        if let GateState::EnRoute(target) = self.gate.state() {
            let dist = obs.robot_pose.position().distance(&target.waypoint);
            record.insert("dist_robot_wp", RecordValue::Scalar(dist as f32));
        }

        let done_reason = if reward_info.is_done {
            reward_info.done_reason
        } else {
            None
        };
        if let Some(reason) = done_reason {
            info!(
                "Episode done after {} steps: {} ({}), {} commands",
                step_counter,
                reason,
                reason.code(),
                self.episode.action_count
            );
            record.insert("done_reason", RecordValue::String(reason.to_string()));
        }

        let step = Step::new(
            obs,
            *act,
            reward,
            is_terminated,
            is_truncated,
            WpInfo { done_reason },
        );
        Ok((step, record))
    }
}

fn log_invariant_violation<T>(result: Result<T, WpEnvError>) -> Result<T, WpEnvError> {
    if let Err(WpEnvError::InvariantViolation(msg)) = &result {
        error!("Invariant violation: {}", msg);
    }
    result
}

impl Env for WpEnv {
    type Config = WpEnvConfig;
    type Obs = WpObs;
    type Act = WpAct;
    type Info = WpInfo;

    /// Builds an environment driving the built-in simulator.
    ///
    /// `seed` seeds the layout generator of the simulator.
    fn build(config: &Self::Config, seed: i64) -> Result<Self> {
        let (env, _) = Self::with_sim(config, seed as u64)?;
        Ok(env)
    }

    fn step(&mut self, a: &Self::Act) -> Result<(Step<Self>, Record)> {
        Ok(self.try_step(a)?)
    }

    fn reset(&mut self) -> Result<Self::Obs> {
        Ok(self.try_reset()?)
    }

    /// Reseeds the layout generator with `ix` and resets.
    fn reset_with_index(&mut self, ix: usize) -> Result<Self::Obs> {
        self.ensure_open()?;
        self.backend.task.reseed(ix as u64);
        self.reset()
    }
}

//! Scripted collaborators for driving `WpEnv` step by step.
#![allow(dead_code)]
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};
use wayfarer_env::{
    descriptor::RobotDescriptor,
    gate::WaypointCommand,
    geometry::{Pose2D, Twist, Waypoint},
    reward::{DoneReason, RewardEngine, RewardInfo, RewardInput},
    snapshot::SnapshotStore,
    transport::{CommandSink, CostmapClearer, ObservationProvider, TaskProvider, WorldStepper},
    ActionSpace, DiscreteAction, NavBackend, WpEnv, WpEnvConfig, WpEnvError, WpObs,
};

pub const ROBOT_YAML: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/config/robot.yaml");
pub const SETTINGS_YAML: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/config/settings.yaml");

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// What the scripted collaborators have seen and what they should do next.
#[derive(Default)]
pub struct Script {
    pub published: Vec<WaypointCommand>,
    pub events: Vec<&'static str>,
    pub cancels: usize,
    pub layouts: usize,
    pub clears: usize,
    pub ticks: usize,
    pub seeds: Vec<u64>,
    pub observations: VecDeque<WpObs>,
    pub default_obs: WpObs,
    pub fail_observations: bool,
    pub fail_publish: bool,
}

#[derive(Clone, Default)]
pub struct Scripted(Arc<Mutex<Script>>);

impl Scripted {
    pub fn new(default_obs: WpObs) -> Self {
        let s = Self::default();
        s.lock().default_obs = default_obs;
        s
    }

    pub fn lock(&self) -> MutexGuard<'_, Script> {
        self.0.lock().unwrap()
    }

    pub fn backend(&self, with_stepper: bool) -> NavBackend {
        NavBackend {
            observations: Box::new(self.clone()),
            commands: Box::new(self.clone()),
            task: Box::new(self.clone()),
            costmaps: Box::new(self.clone()),
            stepper: if with_stepper {
                Some(Box::new(self.clone()))
            } else {
                None
            },
        }
    }
}

fn timeout(operation: &'static str) -> WpEnvError {
    WpEnvError::TransportTimeout {
        operation,
        timeout: Duration::from_millis(10),
    }
}

impl ObservationProvider for Scripted {
    fn get_observations(&mut self) -> Result<WpObs, WpEnvError> {
        let mut s = self.lock();
        if s.fail_observations {
            return Err(timeout("waiting for observations"));
        }
        s.events.push("obs");
        let obs = match s.observations.pop_front() {
            Some(obs) => obs,
            None => s.default_obs.clone(),
        };
        Ok(obs)
    }
}

impl CommandSink for Scripted {
    fn publish_waypoint(&mut self, command: &WaypointCommand) -> Result<(), WpEnvError> {
        let mut s = self.lock();
        if s.fail_publish {
            return Err(timeout("sending a waypoint"));
        }
        s.events.push("publish");
        s.published.push(*command);
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), WpEnvError> {
        let mut s = self.lock();
        s.events.push("cancel");
        s.cancels += 1;
        Ok(())
    }

    fn publish_candidates(&mut self, candidates: &[Waypoint]) -> Result<(), WpEnvError> {
        assert_eq!(candidates.len(), 20);
        self.lock().events.push("candidates");
        Ok(())
    }
}

impl TaskProvider for Scripted {
    fn reset_layout(&mut self) -> Result<(), WpEnvError> {
        let mut s = self.lock();
        s.events.push("layout");
        s.layouts += 1;
        Ok(())
    }

    fn reseed(&mut self, seed: u64) {
        self.lock().seeds.push(seed);
    }
}

impl CostmapClearer for Scripted {
    fn clear_costmaps(&mut self) -> Result<(), WpEnvError> {
        let mut s = self.lock();
        s.events.push("costmaps");
        s.clears += 1;
        Ok(())
    }
}

impl WorldStepper for Scripted {
    fn step_world(&mut self) -> Result<(), WpEnvError> {
        let mut s = self.lock();
        s.events.push("tick");
        s.ticks += 1;
        Ok(())
    }
}

/// Inputs seen by [`ScriptedReward`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeenInput {
    pub action: Twist,
    pub goal_path_length: u32,
    pub action_count: usize,
}

/// Reward engine ending the episode at a given step.
#[derive(Clone, Default)]
pub struct ScriptedReward {
    pub done_at: Option<(usize, DoneReason)>,
    pub seen: Arc<Mutex<Vec<SeenInput>>>,
    pub resets: Arc<Mutex<usize>>,
}

impl ScriptedReward {
    pub fn never_done() -> Self {
        Self::default()
    }

    pub fn done_at(step: usize, reason: DoneReason) -> Self {
        Self {
            done_at: Some((step, reason)),
            ..Self::default()
        }
    }
}

impl RewardEngine for ScriptedReward {
    fn reset(&mut self) {
        *self.resets.lock().unwrap() += 1;
        self.seen.lock().unwrap().clear();
    }

    fn get_reward(&mut self, input: &RewardInput<'_>) -> (f32, RewardInfo) {
        let mut seen = self.seen.lock().unwrap();
        seen.push(SeenInput {
            action: input.action,
            goal_path_length: input.goal_path_length,
            action_count: input.action_count,
        });
        match self.done_at {
            Some((step, reason)) if seen.len() == step => (1.0, RewardInfo::done(reason)),
            _ => (-0.1, RewardInfo::running()),
        }
    }
}

pub fn robot() -> RobotDescriptor {
    RobotDescriptor {
        radius: 0.26,
        laser_num_beams: 8,
        laser_max_range: 3.5,
        laser_angle_min: 0.0,
        laser_angle_increment: std::f64::consts::PI / 4.0,
    }
}

pub fn obs(goal_distance: f64) -> WpObs {
    WpObs::from_parts(
        vec![3.5; 8],
        (goal_distance, 0.0),
        (goal_distance, 0.0),
        Pose2D::default(),
    )
}

pub fn continuous() -> ActionSpace {
    ActionSpace::Continuous {
        low: -2.0,
        high: 2.0,
    }
}

pub fn discrete() -> ActionSpace {
    ActionSpace::Discrete(vec![
        DiscreteAction {
            name: "forward".to_string(),
            linear: 0.3,
            angular: 0.0,
        },
        DiscreteAction {
            name: "left".to_string(),
            linear: 0.15,
            angular: 1.0,
        },
    ])
}

/// An environment without world stepper driven by scripted collaborators.
pub fn scripted_env(
    config: WpEnvConfig,
    action_space: ActionSpace,
    reward: ScriptedReward,
) -> (WpEnv, Scripted) {
    let scripted = Scripted::new(obs(8.0));
    let with_stepper = config.train_mode;
    let env = WpEnv::from_parts(
        config,
        robot(),
        action_space,
        SnapshotStore::new(),
        scripted.backend(with_stepper),
    )
    .unwrap()
    .with_reward_engine(reward);
    (env, scripted)
}

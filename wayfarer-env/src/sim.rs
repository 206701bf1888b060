//! In-process kinematic simulator.
//!
//! A single shared [`SimWorld`] backs all collaborators of a [`NavBackend`]:
//! the layout generator places start, goal and circular obstacles and plans a
//! straight line between start and goal, the stepper moves a unicycle robot
//! toward the last commanded target, and the observation provider ray-casts a
//! laser scan. Pose, twist, subgoal, goal and plan are delivered through a
//! [`SnapshotWriter`] like a real transport would.
//!
//! The robot is not blocked by obstacles. Collisions are detected by the
//! reward engine from the laser scan.
use crate::{
    descriptor::RobotDescriptor,
    gate::WaypointCommand,
    geometry::{distance_and_bearing, quaternion_from_yaw, Pose2D, Twist, Waypoint},
    snapshot::SnapshotWriter,
    transport::{CommandSink, CostmapClearer, NavBackend, ObservationProvider, TaskProvider, WorldStepper},
    WpEnvError, WpObs,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::{
    f64::consts::{FRAC_PI_2, PI},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// Number of attempts to place a goal or an obstacle before giving up on a constraint.
const MAX_PLACEMENT_ATTEMPTS: usize = 100;

/// Clearance between obstacles and the start or goal position.
const OBSTACLE_CLEARANCE: f64 = 1.0;

/// A circular obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Center.
    pub center: Waypoint,

    /// Radius.
    pub radius: f64,
}

/// A fixed episode layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimLayout {
    /// Start pose of the robot.
    pub start: Pose2D,

    /// Goal position.
    pub goal: Waypoint,

    /// Obstacles.
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
}

/// Parameters of the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Duration of a tick in seconds.
    pub dt: f64,

    /// Speed limit of the robot.
    pub max_linear_speed: f64,

    /// Turn rate limit of the robot.
    pub max_angular_speed: f64,

    /// Proportional gain from the bearing error to the turn rate.
    pub heading_gain: f64,

    /// The robot stops when closer than this to its target.
    pub stop_distance: f64,

    /// The map is the square `[-map_half_extent, map_half_extent]²` bounded by walls.
    pub map_half_extent: f64,

    /// Number of random obstacles.
    pub n_obstacles: usize,

    /// Radius of random obstacles.
    pub obstacle_radius: f64,

    /// Minimum distance between random start and goal.
    pub min_start_goal_distance: f64,

    /// Spacing of the points of the global plan.
    pub plan_resolution: f64,

    /// Distance of the subgoal ahead of the robot along the plan.
    pub subgoal_lookahead: f64,

    /// Use this layout in every episode instead of random layouts.
    pub layout: Option<SimLayout>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt: 0.1,
            max_linear_speed: 0.6,
            max_angular_speed: 1.5,
            heading_gain: 2.0,
            stop_distance: 0.05,
            map_half_extent: 6.0,
            n_obstacles: 4,
            obstacle_radius: 0.3,
            min_start_goal_distance: 4.0,
            plan_resolution: 0.25,
            subgoal_lookahead: 1.5,
            layout: None,
        }
    }
}

/// State of the simulated world.
#[derive(Debug)]
pub struct SimWorld {
    config: SimConfig,
    robot: RobotDescriptor,
    writer: SnapshotWriter,
    rng: fastrand::Rng,
    pose: Pose2D,
    twist: Twist,
    target: Option<Waypoint>,
    goal: Waypoint,
    plan: Vec<Waypoint>,
    obstacles: Vec<Obstacle>,
    ticks: u64,
    n_candidates: usize,
    n_costmap_clears: usize,
}

impl SimWorld {
    fn new(config: SimConfig, robot: RobotDescriptor, seed: u64, writer: SnapshotWriter) -> Self {
        let mut world = Self {
            config,
            robot,
            writer,
            rng: fastrand::Rng::with_seed(seed),
            pose: Pose2D::default(),
            twist: Twist::default(),
            target: None,
            goal: Waypoint::default(),
            plan: Vec::new(),
            obstacles: Vec::new(),
            ticks: 0,
            n_candidates: 0,
            n_costmap_clears: 0,
        };
        world.generate_layout();
        world
    }

    /// Pose of the robot.
    pub fn pose(&self) -> Pose2D {
        self.pose
    }

    /// Goal of the current episode.
    pub fn goal(&self) -> Waypoint {
        self.goal
    }

    /// Last commanded target, `None` after a cancel.
    pub fn target(&self) -> Option<Waypoint> {
        self.target
    }

    /// Obstacles of the current episode.
    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// Number of ticks since construction.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Size of the last published candidate ring.
    pub fn n_candidates(&self) -> usize {
        self.n_candidates
    }

    /// Number of costmap invalidations.
    pub fn n_costmap_clears(&self) -> usize {
        self.n_costmap_clears
    }

    fn random_point(&self, margin: f64) -> Waypoint {
        let h = self.config.map_half_extent - margin;
        Waypoint::new(
            -h + 2.0 * h * self.rng.f64(),
            -h + 2.0 * h * self.rng.f64(),
        )
    }

    fn random_layout(&self) -> SimLayout {
        let margin = 1.0;
        let start = self.random_point(margin);
        let mut goal = self.random_point(margin);
        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            if start.distance(&goal) >= self.config.min_start_goal_distance {
                break;
            }
            goal = self.random_point(margin);
        }

        let mut obstacles = Vec::with_capacity(self.config.n_obstacles);
        for _ in 0..self.config.n_obstacles {
            let clear = (0..MAX_PLACEMENT_ATTEMPTS)
                .map(|_| self.random_point(self.config.obstacle_radius))
                .find(|c| {
                    let min = self.config.obstacle_radius + OBSTACLE_CLEARANCE;
                    c.distance(&start) > min && c.distance(&goal) > min
                });
            if let Some(center) = clear {
                obstacles.push(Obstacle {
                    center,
                    radius: self.config.obstacle_radius,
                });
            }
        }

        SimLayout {
            start: Pose2D::new(start.x, start.y, PI * (2.0 * self.rng.f64() - 1.0)),
            goal,
            obstacles,
        }
    }

    fn generate_layout(&mut self) {
        let layout = match &self.config.layout {
            Some(layout) => layout.clone(),
            None => self.random_layout(),
        };
        self.pose = layout.start;
        self.goal = layout.goal;
        self.obstacles = layout.obstacles;
        self.twist = Twist::default();
        self.target = None;
        self.plan = straight_plan(layout.start.position(), layout.goal, self.config.plan_resolution);
        info!(
            "New layout: start = {:?}, goal = {:?}, {} obstacles",
            self.pose,
            self.goal,
            self.obstacles.len()
        );

        self.writer.on_global_goal(self.goal);
        self.writer.on_global_plan(self.plan.clone());
        self.deliver_state();
    }

    fn subgoal(&self) -> Waypoint {
        let robot = self.pose.position();
        let nearest = self
            .plan
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.distance(&robot)
                    .partial_cmp(&b.distance(&robot))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
            .unwrap_or(0);
        self.plan
            .iter()
            .skip(nearest)
            .find(|p| p.distance(&robot) >= self.config.subgoal_lookahead)
            .copied()
            .unwrap_or(self.goal)
    }

    fn deliver_state(&self) {
        let (x, y, z, w) = quaternion_from_yaw(self.pose.theta);
        self.writer.on_odometry(self.pose.x, self.pose.y, (x, y, z, w));
        self.writer.on_twist(self.twist);
        self.writer.on_reference_waypoint(self.subgoal());
    }

    fn tick(&mut self) {
        let c = &self.config;
        self.twist = match self.target {
            Some(target) => {
                let (dist, bearing) = distance_and_bearing(&target, &self.pose);
                if dist <= c.stop_distance {
                    Twist::default()
                } else {
                    let angular = (c.heading_gain * bearing)
                        .max(-c.max_angular_speed)
                        .min(c.max_angular_speed);
                    let linear = if bearing.abs() < FRAC_PI_2 {
                        (c.max_linear_speed * bearing.cos()).min(dist / c.dt)
                    } else {
                        0.0
                    };
                    Twist::new(linear, angular)
                }
            }
            None => Twist::default(),
        };

        let theta = self.pose.theta + self.twist.angular * c.dt;
        let h = c.map_half_extent;
        let x = (self.pose.x + self.twist.linear * theta.cos() * c.dt).max(-h).min(h);
        let y = (self.pose.y + self.twist.linear * theta.sin() * c.dt).max(-h).min(h);
        self.pose = Pose2D::new(x, y, theta);
        self.ticks += 1;
        self.deliver_state();
    }

    fn laser_scan(&self) -> Vec<f32> {
        let origin = self.pose.position();
        (0..self.robot.laser_num_beams)
            .map(|i| {
                let angle = self.pose.theta
                    + self.robot.laser_angle_min
                    + self.robot.laser_angle_increment * i as f64;
                let dir = (angle.cos(), angle.sin());
                let wall = ray_to_walls(origin, dir, self.config.map_half_extent);
                let range = self
                    .obstacles
                    .iter()
                    .filter_map(|o| ray_to_circle(origin, dir, o))
                    .fold(wall, f64::min);
                range.min(self.robot.laser_max_range) as f32
            })
            .collect()
    }

    fn observe(&self) -> WpObs {
        let subgoal = self.subgoal();
        WpObs::from_parts(
            self.laser_scan(),
            distance_and_bearing(&self.goal, &self.pose),
            distance_and_bearing(&self.goal, &Pose2D::new(subgoal.x, subgoal.y, 0.0)),
            self.pose,
        )
    }
}

fn straight_plan(start: Waypoint, goal: Waypoint, resolution: f64) -> Vec<Waypoint> {
    let length = start.distance(&goal);
    let n = (length / resolution.max(1e-3)).ceil().max(1.0) as usize;
    (0..n)
        .map(|i| {
            let s = i as f64 / n as f64;
            Waypoint::new(
                start.x + s * (goal.x - start.x),
                start.y + s * (goal.y - start.y),
            )
        })
        .chain(std::iter::once(goal))
        .collect()
}

fn ray_to_walls(origin: Waypoint, dir: (f64, f64), h: f64) -> f64 {
    let axis = |p: f64, d: f64| {
        if d > 0.0 {
            (h - p) / d
        } else if d < 0.0 {
            (-h - p) / d
        } else {
            f64::INFINITY
        }
    };
    axis(origin.x, dir.0).min(axis(origin.y, dir.1)).max(0.0)
}

fn ray_to_circle(origin: Waypoint, dir: (f64, f64), obstacle: &Obstacle) -> Option<f64> {
    let fx = origin.x - obstacle.center.x;
    let fy = origin.y - obstacle.center.y;
    let c = fx * fx + fy * fy - obstacle.radius * obstacle.radius;
    if c <= 0.0 {
        return Some(0.0);
    }
    let b = fx * dir.0 + fy * dir.1;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let t = -b - disc.sqrt();
    if t >= 0.0 {
        Some(t)
    } else {
        None
    }
}

fn lock(world: &Mutex<SimWorld>) -> MutexGuard<'_, SimWorld> {
    world.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared handle of a simulated world.
#[derive(Debug, Clone)]
pub struct SimHandle {
    world: Arc<Mutex<SimWorld>>,
}

impl SimHandle {
    /// Runs `f` with the world locked.
    pub fn with_world<T>(&self, f: impl FnOnce(&SimWorld) -> T) -> T {
        f(&lock(&self.world))
    }
}

/// Builds the collaborators of a simulated world.
pub struct SimBackend {
    world: Arc<Mutex<SimWorld>>,
}

impl SimBackend {
    /// Creates a world and delivers its first layout through `writer`.
    pub fn new(config: &SimConfig, robot: &RobotDescriptor, seed: u64, writer: SnapshotWriter) -> Self {
        let world = SimWorld::new(config.clone(), robot.clone(), seed, writer);
        Self {
            world: Arc::new(Mutex::new(world)),
        }
    }

    /// Handle for inspecting the world.
    pub fn handle(&self) -> SimHandle {
        SimHandle {
            world: self.world.clone(),
        }
    }

    /// Collaborators backed by the world. The stepper is always present.
    pub fn into_backend(self) -> NavBackend {
        let part = || SimPart {
            world: self.world.clone(),
        };
        NavBackend {
            observations: Box::new(part()),
            commands: Box::new(part()),
            task: Box::new(part()),
            costmaps: Box::new(part()),
            stepper: Some(Box::new(part())),
        }
    }
}

/// A collaborator sharing the simulated world.
struct SimPart {
    world: Arc<Mutex<SimWorld>>,
}

impl ObservationProvider for SimPart {
    fn get_observations(&mut self) -> Result<WpObs, WpEnvError> {
        Ok(lock(&self.world).observe())
    }
}

impl CommandSink for SimPart {
    fn publish_waypoint(&mut self, command: &WaypointCommand) -> Result<(), WpEnvError> {
        lock(&self.world).target = Some(command.waypoint);
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), WpEnvError> {
        let mut world = lock(&self.world);
        world.target = None;
        world.twist = Twist::default();
        Ok(())
    }

    fn publish_candidates(&mut self, candidates: &[Waypoint]) -> Result<(), WpEnvError> {
        lock(&self.world).n_candidates = candidates.len();
        Ok(())
    }
}

impl TaskProvider for SimPart {
    fn reset_layout(&mut self) -> Result<(), WpEnvError> {
        lock(&self.world).generate_layout();
        Ok(())
    }

    fn reseed(&mut self, seed: u64) {
        lock(&self.world).rng = fastrand::Rng::with_seed(seed);
    }
}

impl CostmapClearer for SimPart {
    fn clear_costmaps(&mut self) -> Result<(), WpEnvError> {
        debug!("Clearing costmaps");
        lock(&self.world).n_costmap_clears += 1;
        Ok(())
    }
}

impl WorldStepper for SimPart {
    fn step_world(&mut self) -> Result<(), WpEnvError> {
        lock(&self.world).tick();
        Ok(())
    }
}

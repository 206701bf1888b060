//! Waypoint-projection navigation environment.
//!
//! [`WpEnv`] lets a reinforcement-learning agent steer a mobile robot with a
//! single heading offset per step. The offset is projected onto a circle around
//! the current subgoal of the global planner, giving a map-frame waypoint for
//! the motion controller of the robot. A new waypoint is issued only when the
//! robot has reached the previous one; close to the goal the goal itself is
//! issued instead.
//!
//! ## Collaborators
//!
//! [`WpEnv`] does not drive the robot itself. It talks to the outside world
//! through the interfaces in [`transport`], bundled in a [`NavBackend`]:
//!
//! * [`ObservationProvider`](transport::ObservationProvider) delivers merged observations,
//! * [`CommandSink`](transport::CommandSink) receives waypoints,
//! * [`TaskProvider`](transport::TaskProvider) regenerates the episode layout,
//! * [`CostmapClearer`](transport::CostmapClearer) invalidates obstacle caches,
//! * [`WorldStepper`](transport::WorldStepper) advances simulated time in training mode.
//!
//! Robot pose, velocity, subgoal, goal and global plan are delivered
//! asynchronously through a [`SnapshotWriter`](snapshot::SnapshotWriter).
//!
//! [`sim`] implements all of them with an in-process kinematic simulator, which is
//! what [`Env::build`](wayfarer_core::Env::build) uses.
//!
//! ```no_run
//! use wayfarer_core::Env;
//! use wayfarer_env::{WpAct, WpEnv, WpEnvConfig};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = WpEnvConfig::default().max_steps_per_episode(50);
//! let mut env = WpEnv::build(&config, 42)?;
//! let _obs = env.reset()?;
//! let (step, _record) = env.step(&WpAct::Continuous(0.0))?;
//! println!("reward = {}", step.reward);
//! # Ok(())
//! # }
//! ```
mod act;
mod base;
mod config;
pub mod descriptor;
mod episode;
mod error;
pub mod gate;
pub mod geometry;
mod obs;
pub mod reward;
pub mod sim;
pub mod snapshot;
pub mod transport;
pub use act::{ActionSpace, DiscreteAction, WpAct};
pub use base::{WpEnv, WpInfo};
pub use config::WpEnvConfig;
pub use episode::EpisodeState;
pub use error::WpEnvError;
pub use obs::WpObs;
pub use transport::NavBackend;

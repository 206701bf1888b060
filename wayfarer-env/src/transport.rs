//! Collaborators of the control loop.
//!
//! The loop never owns a robot or a simulator. It talks to them through the
//! synchronous interfaces of this module, calls them from within `step` and
//! `reset` and waits for them to complete. Inbound state (pose, twist, goal,
//! plan) does not go through these interfaces but through a
//! [`SnapshotWriter`](crate::snapshot::SnapshotWriter).
//!
//! [`ChannelObservationProvider`] and [`ChannelCommandSink`] adapt the
//! interfaces to channels, for transports running on their own threads.
use crate::{
    gate::WaypointCommand,
    geometry::Waypoint,
    WpEnvConfig, WpEnvError, WpObs,
};
use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use log::trace;
use std::time::Duration;

/// Source of merged observations.
pub trait ObservationProvider {
    /// Blocks until a fresh observation is available, within a bounded wait.
    fn get_observations(&mut self) -> Result<WpObs, WpEnvError>;
}

/// Regenerates the layout of an episode: obstacles, start and goal.
pub trait TaskProvider {
    /// Regenerates the layout and returns once it is in place.
    fn reset_layout(&mut self) -> Result<(), WpEnvError>;

    /// Seeds the layout generator.
    fn reseed(&mut self, _seed: u64) {}
}

/// Invalidates cached obstacle layers of the motion controller.
pub trait CostmapClearer {
    /// Clears the costmaps.
    fn clear_costmaps(&mut self) -> Result<(), WpEnvError>;
}

/// Outbound commands of the loop.
pub trait CommandSink {
    /// Sends a target to the motion controller.
    fn publish_waypoint(&mut self, command: &WaypointCommand) -> Result<(), WpEnvError>;

    /// Sends the neutral command, cancelling any pending motion.
    fn cancel(&mut self) -> Result<(), WpEnvError>;

    /// Publishes the projection candidates for visualization.
    fn publish_candidates(&mut self, _candidates: &[Waypoint]) -> Result<(), WpEnvError> {
        Ok(())
    }
}

/// Advances simulated time. Used in training mode only.
pub trait WorldStepper {
    /// Blocks until one tick of the world has completed.
    fn step_world(&mut self) -> Result<(), WpEnvError>;
}

/// The set of collaborators of a [`WpEnv`](crate::WpEnv).
pub struct NavBackend {
    /// Observation source.
    pub observations: Box<dyn ObservationProvider>,

    /// Command destination.
    pub commands: Box<dyn CommandSink>,

    /// Layout generator.
    pub task: Box<dyn TaskProvider>,

    /// Costmap invalidation.
    pub costmaps: Box<dyn CostmapClearer>,

    /// Tick source, required in training mode.
    pub stepper: Option<Box<dyn WorldStepper>>,
}

/// Receives observations published by a transport thread.
pub struct ChannelObservationProvider {
    rx: Receiver<WpObs>,
    timeout: Duration,
}

impl ChannelObservationProvider {
    /// Creates a provider waiting at most `timeout` for an observation.
    pub fn new(rx: Receiver<WpObs>, timeout: Duration) -> Self {
        Self { rx, timeout }
    }

    /// Creates a provider bounded by [`WpEnvConfig::observation_timeout`].
    pub fn from_config(rx: Receiver<WpObs>, config: &WpEnvConfig) -> Self {
        Self::new(rx, config.observation_timeout())
    }
}

impl ObservationProvider for ChannelObservationProvider {
    /// Waits for one observation and then skips to the newest queued one.
    fn get_observations(&mut self) -> Result<WpObs, WpEnvError> {
        let first = self.rx.recv_timeout(self.timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => WpEnvError::TransportTimeout {
                operation: "waiting for observations",
                timeout: self.timeout,
            },
            RecvTimeoutError::Disconnected => {
                WpEnvError::TransportClosed("waiting for observations")
            }
        })?;
        let newest = self.rx.try_iter().last();
        if newest.is_some() {
            trace!("Skipped queued observations");
        }
        Ok(newest.unwrap_or(first))
    }
}

/// Message sent by [`ChannelCommandSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundCommand {
    /// A target for the motion controller.
    Waypoint(WaypointCommand),

    /// The neutral command.
    Cancel,

    /// Projection candidates for visualization.
    Candidates(Vec<Waypoint>),
}

/// Sends commands to a transport thread.
pub struct ChannelCommandSink {
    tx: Sender<OutboundCommand>,
    timeout: Duration,
}

impl ChannelCommandSink {
    /// Creates a sink waiting at most `timeout` for queue space.
    pub fn new(tx: Sender<OutboundCommand>, timeout: Duration) -> Self {
        Self { tx, timeout }
    }

    /// Creates a sink bounded by [`WpEnvConfig::command_timeout`].
    pub fn from_config(tx: Sender<OutboundCommand>, config: &WpEnvConfig) -> Self {
        Self::new(tx, config.command_timeout())
    }

    fn send(&self, msg: OutboundCommand, operation: &'static str) -> Result<(), WpEnvError> {
        self.tx.send_timeout(msg, self.timeout).map_err(|e| match e {
            SendTimeoutError::Timeout(_) => WpEnvError::TransportTimeout {
                operation,
                timeout: self.timeout,
            },
            SendTimeoutError::Disconnected(_) => WpEnvError::TransportClosed(operation),
        })
    }
}

impl CommandSink for ChannelCommandSink {
    fn publish_waypoint(&mut self, command: &WaypointCommand) -> Result<(), WpEnvError> {
        self.send(OutboundCommand::Waypoint(*command), "sending a waypoint")
    }

    fn cancel(&mut self) -> Result<(), WpEnvError> {
        self.send(OutboundCommand::Cancel, "sending the cancel command")
    }

    fn publish_candidates(&mut self, candidates: &[Waypoint]) -> Result<(), WpEnvError> {
        // Visualization is dropped rather than blocking the loop.
        match self.tx.try_send(OutboundCommand::Candidates(candidates.to_vec())) {
            Err(crossbeam_channel::TrySendError::Disconnected(_)) => {
                Err(WpEnvError::TransportClosed("sending candidates"))
            }
            _ => Ok(()),
        }
    }
}

//! Latest robot state delivered by the transport.
//!
//! Delivery handlers run outside of the control loop, typically on transport
//! threads, and write through a [`SnapshotWriter`]. The control loop reads a
//! consistent copy of all fields with [`SnapshotStore::snapshot`]. Every write
//! and every read holds the same lock, so a reader never sees a pose whose `x`
//! is newer than its `y`.
use crate::geometry::{yaw_from_quaternion, Pose2D, Twist, Waypoint};
use log::trace;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// State of the robot and of the planner as last delivered by the transport.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Pose of the robot.
    pub robot_pose: Pose2D,

    /// Realized velocity.
    pub twist: Twist,

    /// Current subgoal of the upstream planner, the anchor of projections.
    pub reference_waypoint: Option<Waypoint>,

    /// Final goal of the episode.
    pub global_goal: Option<Waypoint>,

    /// Planned path from start to goal.
    pub global_plan: Arc<Vec<Waypoint>>,
}

fn lock(inner: &Mutex<Snapshot>) -> MutexGuard<'_, Snapshot> {
    // Fields are plain values written in one statement, a panicking writer
    // cannot leave them half updated.
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owner of the shared snapshot, read by the control loop.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    inner: Arc<Mutex<Snapshot>>,
}

impl SnapshotStore {
    /// Creates a store holding the default snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle for delivery handlers.
    pub fn writer(&self) -> SnapshotWriter {
        SnapshotWriter {
            inner: self.inner.clone(),
        }
    }

    /// Copies all fields under one lock.
    pub fn snapshot(&self) -> Snapshot {
        lock(&self.inner).clone()
    }
}

/// Write handle of a [`SnapshotStore`].
///
/// Each method overwrites exactly the fields it owns.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    inner: Arc<Mutex<Snapshot>>,
}

impl SnapshotWriter {
    /// Odometry update with the orientation given as a quaternion `(x, y, z, w)`.
    pub fn on_odometry(&self, x: f64, y: f64, orientation: (f64, f64, f64, f64)) {
        let (qx, qy, qz, qw) = orientation;
        self.on_robot_pose(Pose2D::new(x, y, yaw_from_quaternion(qx, qy, qz, qw)));
    }

    /// Pose update.
    pub fn on_robot_pose(&self, pose: Pose2D) {
        trace!("Robot pose {:?}", pose);
        lock(&self.inner).robot_pose = pose;
    }

    /// Realized velocity update.
    pub fn on_twist(&self, twist: Twist) {
        lock(&self.inner).twist = twist;
    }

    /// Subgoal update.
    pub fn on_reference_waypoint(&self, waypoint: Waypoint) {
        lock(&self.inner).reference_waypoint = Some(waypoint);
    }

    /// Goal update.
    pub fn on_global_goal(&self, goal: Waypoint) {
        lock(&self.inner).global_goal = Some(goal);
    }

    /// Global plan update.
    pub fn on_global_plan(&self, plan: Vec<Waypoint>) {
        let plan = Arc::new(plan);
        lock(&self.inner).global_plan = plan;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::quaternion_from_yaw;
    use std::thread;

    #[test]
    fn test_writers_own_their_fields() {
        let store = SnapshotStore::new();
        let writer = store.writer();

        writer.on_odometry(1.0, 2.0, quaternion_from_yaw(0.5));
        writer.on_twist(Twist::new(0.3, -0.1));
        writer.on_global_goal(Waypoint::new(5.0, 5.0));

        let s = store.snapshot();
        assert_eq!(s.robot_pose.x, 1.0);
        assert_eq!(s.robot_pose.y, 2.0);
        assert!((s.robot_pose.theta - 0.5).abs() < 1e-9);
        assert_eq!(s.twist, Twist::new(0.3, -0.1));
        assert_eq!(s.global_goal, Some(Waypoint::new(5.0, 5.0)));
        assert_eq!(s.reference_waypoint, None);

        writer.on_reference_waypoint(Waypoint::new(2.0, 2.0));
        let s = store.snapshot();
        assert_eq!(s.robot_pose.x, 1.0);
        assert_eq!(s.reference_waypoint, Some(Waypoint::new(2.0, 2.0)));
    }

    #[test]
    fn test_pose_is_never_torn() {
        let store = SnapshotStore::new();
        let writer = store.writer();

        let handle = thread::spawn(move || {
            for k in 0..20_000 {
                let v = k as f64;
                writer.on_robot_pose(Pose2D { x: v, y: v, theta: 0.0 });
                writer.on_global_plan(vec![Waypoint::new(v, v); k % 4]);
            }
        });

        for _ in 0..20_000 {
            let s = store.snapshot();
            assert_eq!(s.robot_pose.x, s.robot_pose.y);
        }
        handle.join().unwrap();
        assert_eq!(store.snapshot().robot_pose.x, 19_999.0);
    }
}

//! Bookkeeping of an episode.
use crate::WpEnvError;
use serde::{Deserialize, Serialize};

/// Number of initial steps during which the goal path length is latched.
const GOAL_PATH_LATCH_STEPS: usize = 2;

/// Counters and flags of the current episode, owned by [`WpEnv`](crate::WpEnv).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeState {
    /// Number of `step` calls since the last reset.
    pub step_counter: usize,

    /// Number of commands emitted since the last reset.
    pub action_count: usize,

    /// Whether the first waypoint of the episode has been issued.
    pub waypoint_issued: bool,

    /// Rounded initial distance to the goal, a normalization reference of the reward.
    pub goal_path_length: u32,
}

impl EpisodeState {
    /// Counts a `step` call.
    pub fn begin_step(&mut self) -> Result<usize, WpEnvError> {
        self.step_counter = self
            .step_counter
            .checked_add(1)
            .ok_or_else(|| WpEnvError::InvariantViolation("step counter overflow".to_string()))?;
        Ok(self.step_counter)
    }

    /// Counts an emitted command.
    pub fn record_emission(&mut self) -> Result<usize, WpEnvError> {
        self.action_count = self
            .action_count
            .checked_add(1)
            .ok_or_else(|| WpEnvError::InvariantViolation("action count overflow".to_string()))?;
        self.waypoint_issued = true;
        Ok(self.action_count)
    }

    /// Latches the goal path length from the goal distance during the first steps.
    ///
    /// Returns `true` if the value was updated.
    pub fn latch_goal_path_length(&mut self, goal_distance: f64) -> Result<bool, WpEnvError> {
        if self.step_counter > GOAL_PATH_LATCH_STEPS {
            return Ok(false);
        }
        if !(goal_distance >= 0.0) || !goal_distance.is_finite() {
            return Err(WpEnvError::InvariantViolation(format!(
                "goal distance {}",
                goal_distance
            )));
        }
        self.goal_path_length = goal_distance.round() as u32;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_counters() {
        let mut state = EpisodeState::default();
        assert_eq!(state.begin_step().unwrap(), 1);
        assert!(!state.waypoint_issued);
        assert_eq!(state.record_emission().unwrap(), 1);
        assert!(state.waypoint_issued);
        assert_eq!(state.begin_step().unwrap(), 2);
        assert_eq!(state.action_count, 1);
    }

    #[test]
    fn test_goal_path_length_latched_on_first_two_steps() {
        let mut state = EpisodeState::default();
        state.begin_step().unwrap();
        assert!(state.latch_goal_path_length(6.4).unwrap());
        assert_eq!(state.goal_path_length, 6);
        state.begin_step().unwrap();
        assert!(state.latch_goal_path_length(6.6).unwrap());
        assert_eq!(state.goal_path_length, 7);
        state.begin_step().unwrap();
        assert!(!state.latch_goal_path_length(1.0).unwrap());
        assert_eq!(state.goal_path_length, 7);
    }

    #[test]
    fn test_negative_goal_distance_is_invariant_violation() {
        let mut state = EpisodeState::default();
        state.begin_step().unwrap();
        assert!(matches!(
            state.latch_goal_path_length(-0.1),
            Err(WpEnvError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_serde_round_trip() -> anyhow::Result<()> {
        let state = EpisodeState {
            step_counter: 17,
            action_count: 4,
            waypoint_issued: true,
            goal_path_length: 9,
        };
        let yaml = serde_yaml::to_string(&state)?;
        assert_eq!(serde_yaml::from_str::<EpisodeState>(&yaml)?, state);

        let dir = TempDir::new("episode_state")?;
        let path = dir.path().join("episode_state.yaml");
        std::fs::write(&path, yaml)?;
        let restored: EpisodeState = serde_yaml::from_reader(std::fs::File::open(&path)?)?;
        assert_eq!(restored, state);
        Ok(())
    }
}

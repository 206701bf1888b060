//! Actions and action spaces.
use crate::WpEnvError;
use log::debug;
use serde::{Deserialize, Serialize};
use wayfarer_core::Act;

/// An action of [`WpEnv`](crate::WpEnv).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WpAct {
    /// Index into the list of discrete actions.
    Discrete(usize),

    /// Heading offset relative to the robot yaw, in radians.
    Continuous(f64),
}

impl Act for WpAct {
    fn len(&self) -> usize {
        1
    }
}

/// A named (linear, angular) pair of the discrete action list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscreteAction {
    /// Name of the action, e.g. `forward`.
    pub name: String,

    /// Linear velocity.
    pub linear: f64,

    /// Angular velocity. Used as the heading offset of the projected waypoint.
    pub angular: f64,
}

/// The set of actions accepted by the environment. Fixed for the lifetime of an environment.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionSpace {
    /// An ordered list of named actions.
    Discrete(Vec<DiscreteAction>),

    /// A bounded heading offset.
    Continuous {
        /// Lower bound.
        low: f64,
        /// Upper bound.
        high: f64,
    },
}

impl ActionSpace {
    /// Number of discrete actions, or 1 for the continuous space.
    pub fn len(&self) -> usize {
        match self {
            Self::Discrete(actions) => actions.len(),
            Self::Continuous { .. } => 1,
        }
    }

    /// Returns `true` for a discrete space without actions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` for the discrete action space.
    pub fn is_discrete(&self) -> bool {
        matches!(self, Self::Discrete(_))
    }

    /// Resolves the heading offset of an action.
    ///
    /// Continuous headings outside of the bounds are clipped.
    pub fn heading(&self, act: &WpAct) -> Result<f64, WpEnvError> {
        match (self, act) {
            (Self::Discrete(actions), WpAct::Discrete(ix)) => actions
                .get(*ix)
                .map(|a| a.angular)
                .ok_or_else(|| {
                    WpEnvError::InvalidAction(format!(
                        "index {} out of {} discrete actions",
                        ix,
                        actions.len()
                    ))
                }),
            (Self::Continuous { low, high }, WpAct::Continuous(h)) => {
                if !h.is_finite() {
                    return Err(WpEnvError::InvalidAction(format!(
                        "non-finite heading {}",
                        h
                    )));
                }
                let clipped = h.max(*low).min(*high);
                if clipped != *h {
                    debug!("Heading {} clipped to {}", h, clipped);
                }
                Ok(clipped)
            }
            (Self::Discrete(_), WpAct::Continuous(_)) => Err(WpEnvError::InvalidAction(
                "continuous action for a discrete action space".to_string(),
            )),
            (Self::Continuous { .. }, WpAct::Discrete(_)) => Err(WpEnvError::InvalidAction(
                "discrete action for a continuous action space".to_string(),
            )),
        }
    }

    /// Samples an action uniformly.
    pub fn sample(&self, rng: &fastrand::Rng) -> WpAct {
        match self {
            Self::Discrete(actions) => WpAct::Discrete(rng.usize(..actions.len().max(1))),
            Self::Continuous { low, high } => WpAct::Continuous(low + (high - low) * rng.f64()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn discrete() -> ActionSpace {
        ActionSpace::Discrete(vec![
            DiscreteAction {
                name: "forward".to_string(),
                linear: 0.3,
                angular: 0.0,
            },
            DiscreteAction {
                name: "left".to_string(),
                linear: 0.15,
                angular: 0.75,
            },
        ])
    }

    #[test]
    fn test_discrete_heading() {
        let space = discrete();
        assert_eq!(space.heading(&WpAct::Discrete(1)).unwrap(), 0.75);
        assert!(matches!(
            space.heading(&WpAct::Discrete(2)),
            Err(WpEnvError::InvalidAction(_))
        ));
        assert!(matches!(
            space.heading(&WpAct::Continuous(0.1)),
            Err(WpEnvError::InvalidAction(_))
        ));
    }

    #[test]
    fn test_continuous_heading_is_clipped() {
        let space = ActionSpace::Continuous {
            low: -1.5,
            high: 1.5,
        };
        assert_eq!(space.heading(&WpAct::Continuous(0.2)).unwrap(), 0.2);
        assert_eq!(space.heading(&WpAct::Continuous(2.0)).unwrap(), 1.5);
        assert_eq!(space.heading(&WpAct::Continuous(-9.0)).unwrap(), -1.5);
        assert!(space.heading(&WpAct::Continuous(f64::NAN)).is_err());
    }

    #[test]
    fn test_samples_are_valid() {
        let rng = fastrand::Rng::with_seed(7);
        let spaces = vec![
            discrete(),
            ActionSpace::Continuous {
                low: -0.5,
                high: 0.5,
            },
        ];
        for space in spaces.iter() {
            for _ in 0..100 {
                let act = space.sample(&rng);
                assert!(space.heading(&act).is_ok());
            }
        }
    }
}

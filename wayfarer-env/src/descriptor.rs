//! Robot and settings descriptors.
//!
//! The robot descriptor is a flatland model file. Only the circular footprint
//! of the `base_footprint` body and the `Laser` plugin are read from it; all
//! other entries are ignored.
//!
//! ```yaml
//! bodies:
//!   - name: base_footprint
//!     footprints:
//!       - type: circle
//!         radius: 0.2
//! plugins:
//!   - type: Laser
//!     range: 3.5
//!     angle: {min: -3.12413936, max: 3.14159265, increment: 0.01745329}
//! ```
//!
//! The settings descriptor lists the actions of the agent:
//!
//! ```yaml
//! robot:
//!   discrete_actions:
//!     - name: forward
//!       linear: 0.15
//!       angular: 0.0
//!   continuous_actions:
//!     angular_range: [-1.5, 1.5]
//! ```
use crate::{ActionSpace, DiscreteAction, WpEnvError};
use serde::Deserialize;
use std::{fs, path::Path};

/// Name of the body holding the robot footprint.
const BASE_BODY: &str = "base_footprint";

/// Footprint radius used when a circular footprint has no radius.
const DEFAULT_FOOTPRINT_RADIUS: f64 = 0.3;

/// Inflation applied to the footprint radius.
const FOOTPRINT_INFLATION: f64 = 1.04;

/// Upper bound on the number of laser beams.
const MAX_LASER_BEAMS: usize = 100_000;

#[derive(Deserialize)]
struct RobotFile {
    #[serde(default)]
    bodies: Vec<BodyEntry>,
    #[serde(default)]
    plugins: Vec<PluginEntry>,
}

#[derive(Deserialize)]
struct BodyEntry {
    name: String,
    #[serde(default)]
    footprints: Vec<FootprintEntry>,
}

#[derive(Deserialize)]
struct FootprintEntry {
    #[serde(rename = "type")]
    kind: String,
    radius: Option<f64>,
}

#[derive(Deserialize)]
struct PluginEntry {
    #[serde(rename = "type")]
    kind: String,
    range: Option<f64>,
    angle: Option<AngleEntry>,
}

#[derive(Deserialize)]
struct AngleEntry {
    min: f64,
    max: f64,
    increment: f64,
}

#[derive(Deserialize)]
struct SettingsFile {
    robot: Option<RobotSettings>,
}

#[derive(Deserialize)]
struct RobotSettings {
    discrete_actions: Option<Vec<DiscreteAction>>,
    continuous_actions: Option<ContinuousSettings>,
}

#[derive(Deserialize)]
struct ContinuousSettings {
    angular_range: Option<Vec<f64>>,
}

/// Geometry and laser parameters of the robot.
#[derive(Debug, Clone, PartialEq)]
pub struct RobotDescriptor {
    /// Inflated body radius.
    pub radius: f64,

    /// Number of laser beams.
    pub laser_num_beams: usize,

    /// Maximum laser range.
    pub laser_max_range: f64,

    /// Angle of the first beam relative to the robot heading.
    pub laser_angle_min: f64,

    /// Angle between two consecutive beams.
    pub laser_angle_increment: f64,
}

impl RobotDescriptor {
    /// Parses a robot descriptor from YAML text.
    pub fn from_yaml_str(s: &str) -> Result<Self, WpEnvError> {
        let file: RobotFile = serde_yaml::from_str(s)?;

        let base = file
            .bodies
            .iter()
            .find(|b| b.name == BASE_BODY)
            .ok_or_else(|| WpEnvError::Config(format!("no `{}` body", BASE_BODY)))?;
        let radius = base
            .footprints
            .iter()
            .filter(|f| f.kind == "circle")
            .last()
            .map(|f| f.radius.unwrap_or(DEFAULT_FOOTPRINT_RADIUS) * FOOTPRINT_INFLATION)
            .ok_or_else(|| {
                WpEnvError::Config(format!("no circular footprint in `{}`", BASE_BODY))
            })?;

        let laser = file
            .plugins
            .iter()
            .find(|p| p.kind == "Laser")
            .ok_or_else(|| WpEnvError::Config("no Laser plugin".to_string()))?;
        let range = laser
            .range
            .ok_or_else(|| WpEnvError::Config("Laser plugin without range".to_string()))?;
        let angle = laser
            .angle
            .as_ref()
            .ok_or_else(|| WpEnvError::Config("Laser plugin without angle".to_string()))?;
        if !(angle.increment > 0.0) || angle.max < angle.min {
            return Err(WpEnvError::Config(format!(
                "invalid laser angles: min = {}, max = {}, increment = {}",
                angle.min, angle.max, angle.increment
            )));
        }
        let n_intervals = ((angle.max - angle.min) / angle.increment).round();
        if !n_intervals.is_finite() || n_intervals >= MAX_LASER_BEAMS as f64 {
            return Err(WpEnvError::Config(format!(
                "laser angles give {} beams, at most {} supported",
                n_intervals, MAX_LASER_BEAMS
            )));
        }
        let laser_num_beams = (n_intervals as usize)
            .checked_add(1)
            .ok_or_else(|| WpEnvError::Config("laser beam count overflow".to_string()))?;

        Ok(Self {
            radius,
            laser_num_beams,
            laser_max_range: range,
            laser_angle_min: angle.min,
            laser_angle_increment: angle.increment,
        })
    }

    /// Loads a robot descriptor from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WpEnvError> {
        Self::from_yaml_str(&read(path.as_ref())?)
    }
}

/// Parses the action space from settings YAML text.
pub fn action_space_from_yaml_str(s: &str, discrete: bool) -> Result<ActionSpace, WpEnvError> {
    let file: SettingsFile = serde_yaml::from_str(s)?;
    let robot = file
        .robot
        .ok_or_else(|| WpEnvError::Config("no `robot` block in settings".to_string()))?;

    if discrete {
        let actions = robot
            .discrete_actions
            .ok_or_else(|| WpEnvError::Config("no `robot.discrete_actions`".to_string()))?;
        if actions.is_empty() {
            return Err(WpEnvError::Config(
                "`robot.discrete_actions` is empty".to_string(),
            ));
        }
        Ok(ActionSpace::Discrete(actions))
    } else {
        let range = robot
            .continuous_actions
            .and_then(|c| c.angular_range)
            .ok_or_else(|| {
                WpEnvError::Config("no `robot.continuous_actions.angular_range`".to_string())
            })?;
        match range.as_slice() {
            [low, high] if low <= high => Ok(ActionSpace::Continuous {
                low: *low,
                high: *high,
            }),
            _ => Err(WpEnvError::Config(format!(
                "invalid angular_range {:?}",
                range
            ))),
        }
    }
}

/// Loads the action space from a settings file.
pub fn load_action_space(path: impl AsRef<Path>, discrete: bool) -> Result<ActionSpace, WpEnvError> {
    action_space_from_yaml_str(&read(path.as_ref())?, discrete)
}

fn read(path: &Path) -> Result<String, WpEnvError> {
    fs::read_to_string(path).map_err(|source| WpEnvError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROBOT: &str = r#"
bodies:
  - name: base_footprint
    pose: [0, 0, 0]
    type: dynamic
    footprints:
      - type: circle
        radius: 0.25
        density: 1
plugins:
  - type: DiffDrive
    name: diff_drive
    body: base_footprint
  - type: Laser
    name: static_laser
    range: 3.5
    angle: {min: -1.5, max: 1.5, increment: 0.1}
"#;

    #[test]
    fn test_robot_descriptor() {
        let robot = RobotDescriptor::from_yaml_str(ROBOT).unwrap();
        assert!((robot.radius - 0.26).abs() < 1e-9);
        assert_eq!(robot.laser_num_beams, 31);
        assert_eq!(robot.laser_max_range, 3.5);
        assert_eq!(robot.laser_angle_min, -1.5);
    }

    #[test]
    fn test_default_footprint_radius() {
        let yaml = ROBOT.replace("        radius: 0.25\n", "");
        let robot = RobotDescriptor::from_yaml_str(&yaml).unwrap();
        assert!((robot.radius - 0.312).abs() < 1e-9);
    }

    #[test]
    fn test_missing_laser_is_config_error() {
        let yaml = "bodies:\n  - name: base_footprint\n    footprints:\n      - type: circle\n        radius: 0.2\nplugins: []\n";
        assert!(matches!(
            RobotDescriptor::from_yaml_str(yaml),
            Err(WpEnvError::Config(_))
        ));
    }

    #[test]
    fn test_too_many_laser_beams_is_config_error() {
        let yaml = ROBOT.replace(
            "angle: {min: -1.5, max: 1.5, increment: 0.1}",
            "angle: {min: -3.0, max: 3.0, increment: 1.0e-20}",
        );
        assert!(matches!(
            RobotDescriptor::from_yaml_str(&yaml),
            Err(WpEnvError::Config(_))
        ));

        let yaml = ROBOT.replace(
            "angle: {min: -1.5, max: 1.5, increment: 0.1}",
            "angle: {min: 0.0, max: 100000.0, increment: 1.0}",
        );
        assert!(matches!(
            RobotDescriptor::from_yaml_str(&yaml),
            Err(WpEnvError::Config(_))
        ));
    }

    #[test]
    fn test_missing_base_body_is_config_error() {
        let yaml = ROBOT.replace("base_footprint", "chassis");
        assert!(matches!(
            RobotDescriptor::from_yaml_str(&yaml),
            Err(WpEnvError::Config(_))
        ));
    }

    #[test]
    fn test_action_spaces() {
        let settings = r#"
robot:
  discrete_actions:
    - name: forward
      linear: 0.15
      angular: 0.0
    - name: left
      linear: 0.0
      angular: 0.35
  continuous_actions:
    linear_range: [0, 0.3]
    angular_range: [-1.5, 1.5]
"#;
        let space = action_space_from_yaml_str(settings, true).unwrap();
        assert_eq!(space.len(), 2);
        let space = action_space_from_yaml_str(settings, false).unwrap();
        assert_eq!(
            space,
            ActionSpace::Continuous {
                low: -1.5,
                high: 1.5
            }
        );
    }

    #[test]
    fn test_absent_discrete_actions_is_config_error() {
        let settings = "robot:\n  continuous_actions:\n    angular_range: [-1.0, 1.0]\n";
        assert!(matches!(
            action_space_from_yaml_str(settings, true),
            Err(WpEnvError::Config(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            RobotDescriptor::load("/nonexistent/robot.yaml"),
            Err(WpEnvError::Io { .. })
        ));
    }
}

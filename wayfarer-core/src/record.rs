//! Types and traits for recording side information of environment steps.
//!
//! Every call of [`Env::step`](crate::Env::step) returns a [`Record`] holding
//! diagnostics of the step, e.g., the distance of the robot to its current
//! waypoint or the number of commands issued so far. Records are handed to a
//! [`Recorder`], which decides what to do with them.
//!
//! # Basic Usage
//!
//! ```rust
//! use wayfarer_core::record::{Record, RecordValue};
//!
//! // following values are obtained with some process in reality
//! let step = 1;
//! let scan = vec![1f32, 2.0, 3.0, 4.0, 5.0];
//! let reward = -1f32;
//!
//! let mut record = Record::empty();
//! record.insert("step", RecordValue::Scalar(step as f32));
//! record.insert("reward", RecordValue::Scalar(reward));
//! record.insert("laser_scan", RecordValue::Array1(scan));
//! assert_eq!(record.get_scalar("reward").unwrap(), -1.0);
//! ```
mod base;
mod buffered_recorder;
mod null_recorder;
mod recorder;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::Recorder;

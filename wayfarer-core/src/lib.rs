#![warn(missing_docs)]
//! Core abstractions for interacting with wayfarer environments.
//!
//! An environment ([`Env`]) consumes actions ([`Act`]) chosen by a [`Policy`]
//! from observations ([`Obs`]) and emits a [`Step`] per interaction. Side
//! information of every step is returned as a [`record::Record`], which can be
//! collected with a [`record::Recorder`].
pub mod error;
pub mod record;
pub mod util;

mod base;
pub use base::{Act, Env, Info, Obs, Policy, Step};

mod evaluator;
pub use evaluator::{DefaultEvaluator, Evaluator};

#[cfg(test)]
pub(crate) mod test_env;

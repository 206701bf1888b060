//! Default implementation of the [`Evaluator`] trait.
use super::Evaluator;
use crate::{record::Record, Env, Policy};
use anyhow::Result;
use log::debug;

/// Runs a fixed number of episodes and reports the average return.
///
/// Episode `i` is started with [`Env::reset_with_index`]`(i)`, so the same set
/// of episode layouts is used every time the evaluator runs.
pub struct DefaultEvaluator<E: Env> {
    n_episodes: usize,
    env: E,
}

impl<E: Env> Evaluator<E> for DefaultEvaluator<E> {
    /// Returns a [`Record`] holding `"Episode return"`, the return averaged over episodes.
    fn evaluate<P>(&mut self, policy: &mut P) -> Result<Record>
    where
        P: Policy<E>,
    {
        let mut r_total = 0f32;

        for ix in 0..self.n_episodes {
            let mut prev_obs = self.env.reset_with_index(ix)?;
            let mut r_episode = 0f32;

            loop {
                let act = policy.sample(&prev_obs);
                let (step, _) = self.env.step(&act)?;
                r_episode += step.reward;
                if step.is_done() {
                    break;
                }
                prev_obs = step.obs;
            }
            debug!("Evaluation episode {}: return = {}", ix, r_episode);
            r_total += r_episode;
        }

        Ok(Record::from_scalar(
            "Episode return",
            r_total / self.n_episodes.max(1) as f32,
        ))
    }
}

impl<E: Env> DefaultEvaluator<E> {
    /// Constructs a new [`DefaultEvaluator`].
    ///
    /// * `config` - Configuration for the environment
    /// * `seed` - Random seed for environment initialization
    /// * `n_episodes` - Number of episodes to run during evaluation
    pub fn new(config: &E::Config, seed: i64, n_episodes: usize) -> Result<Self> {
        Ok(Self {
            n_episodes,
            env: E::build(config, seed)?,
        })
    }

    /// Returns a reference to the evaluation environment.
    pub fn env(&self) -> &E {
        &self.env
    }
}

#[cfg(test)]
mod tests {
    use super::DefaultEvaluator;
    use crate::{
        test_env::{ConstPolicy, CountdownEnv},
        Evaluator,
    };
    use anyhow::Result;

    #[test]
    fn test_average_return_over_indexed_episodes() -> Result<()> {
        let mut evaluator = DefaultEvaluator::<CountdownEnv>::new(&4, 42, 3)?;
        let record = evaluator.evaluate(&mut ConstPolicy)?;

        assert_eq!(record.get_scalar("Episode return")?, 4.0);
        assert_eq!(evaluator.env().resets(), &[0, 1, 2]);
        Ok(())
    }
}

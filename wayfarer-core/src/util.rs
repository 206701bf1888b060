//! Utilities for interaction of policies and environments.
use crate::{
    record::{RecordValue, Recorder},
    Env, Policy,
};
use anyhow::Result;
use chrono::Local;
use log::info;

/// Run episodes with a policy and recorder, returning the return of each episode.
///
/// The [`Record`](crate::record::Record) of every step is extended with the
/// reward, the episode index and the step index within the episode before it
/// is written to `recorder`. The first record of every episode also carries
/// the wall-clock time at which the episode started.
pub fn eval_with_recorder<E, P, R>(
    env: &mut E,
    policy: &mut P,
    n_episodes: usize,
    recorder: &mut R,
) -> Result<Vec<f32>>
where
    E: Env,
    P: Policy<E>,
    R: Recorder,
{
    let mut rs = Vec::new();

    for episode in 0..n_episodes {
        let started = Local::now();
        let mut prev_obs = env.reset()?;
        let mut count_step = 0;
        let mut r_total = 0.0;

        loop {
            let act = policy.sample(&prev_obs);
            let (step, mut record) = env.step(&act)?;
            r_total += step.reward;

            record.insert("reward", RecordValue::Scalar(step.reward));
            record.insert("episode", RecordValue::Scalar(episode as _));
            record.insert("step", RecordValue::Scalar(count_step as _));
            if count_step == 0 {
                record.insert("episode_start", RecordValue::DateTime(started));
            }
            recorder.write(record);

            if step.is_done() {
                break;
            }
            prev_obs = step.obs;
            count_step += 1;
        }
        info!(
            "Episode {:?}, {:?} steps, return = {:?}",
            episode,
            count_step + 1,
            r_total
        );
        rs.push(r_total);
    }

    Ok(rs)
}

#[cfg(test)]
mod tests {
    use super::eval_with_recorder;
    use crate::{
        record::{BufferedRecorder, RecordValue},
        test_env::{CountdownEnv, ConstPolicy},
        Env,
    };
    use anyhow::Result;

    #[test]
    fn test_eval_with_recorder_writes_every_step() -> Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut env = CountdownEnv::build(&3, 0)?;
        let mut policy = ConstPolicy;
        let mut recorder = BufferedRecorder::new();

        let returns = eval_with_recorder(&mut env, &mut policy, 2, &mut recorder)?;

        assert_eq!(returns, vec![3.0, 3.0]);
        assert_eq!(recorder.len(), 6);
        let first = recorder.iter().next().unwrap();
        assert!(matches!(
            first.get("episode_start"),
            Some(RecordValue::DateTime(_))
        ));
        let last = recorder.iter().last().unwrap();
        assert_eq!(last.get_scalar("episode")?, 1.0);
        assert_eq!(last.get_scalar("step")?, 2.0);
        Ok(())
    }
}

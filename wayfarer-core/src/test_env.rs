//! A tiny environment used for tests of the crate.
use crate::{record::Record, Act, Env, Info, Obs, Policy, Step};
use anyhow::Result;

#[derive(Clone, Debug)]
pub struct CountdownObs(pub usize);

impl Obs for CountdownObs {
    fn len(&self) -> usize {
        1
    }
}

#[derive(Clone, Debug)]
pub struct UnitAct;

impl Act for UnitAct {
    fn len(&self) -> usize {
        1
    }
}

pub struct CountdownInfo;

impl Info for CountdownInfo {}

/// Gives a reward of one per step and truncates after `length` steps.
pub struct CountdownEnv {
    length: usize,
    remaining: usize,
    resets: Vec<usize>,
}

impl CountdownEnv {
    pub fn resets(&self) -> &[usize] {
        &self.resets
    }
}

impl Env for CountdownEnv {
    type Config = usize;
    type Obs = CountdownObs;
    type Act = UnitAct;
    type Info = CountdownInfo;

    fn build(config: &Self::Config, _seed: i64) -> Result<Self> {
        Ok(Self {
            length: *config,
            remaining: *config,
            resets: Vec::new(),
        })
    }

    fn step(&mut self, a: &Self::Act) -> Result<(Step<Self>, Record)> {
        self.remaining -= 1;
        let step = Step::new(
            CountdownObs(self.remaining),
            a.clone(),
            1.0,
            false,
            self.remaining == 0,
            CountdownInfo,
        );
        Ok((step, Record::empty()))
    }

    fn reset(&mut self) -> Result<Self::Obs> {
        self.remaining = self.length;
        Ok(CountdownObs(self.remaining))
    }

    fn reset_with_index(&mut self, ix: usize) -> Result<Self::Obs> {
        self.resets.push(ix);
        self.reset()
    }
}

pub struct ConstPolicy;

impl Policy<CountdownEnv> for ConstPolicy {
    fn sample(&mut self, _obs: &CountdownObs) -> UnitAct {
        UnitAct
    }
}

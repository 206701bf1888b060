use anyhow::Result;
use clap::Parser;
use wayfarer_core::{
    record::{BufferedRecorder, RecordValue},
    util, Env, Policy,
};
use wayfarer_env::{ActionSpace, WpAct, WpEnv, WpEnvConfig};

const ROBOT_YAML: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/config/robot.yaml");
const SETTINGS_YAML: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/config/settings.yaml");

/// Run a random heading policy in the simulated waypoint environment
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Number of episodes
    #[arg(short, long, default_value_t = 5)]
    n_episodes: usize,

    /// Step limit of an episode
    #[arg(short, long, default_value_t = 200)]
    max_steps: usize,

    /// Use the discrete action list
    #[arg(short, long, default_value_t = false)]
    discrete: bool,

    /// Random seed of the layouts and the policy
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Environment configuration in YAML, overrides the other options except the seed
    #[arg(short, long)]
    config: Option<String>,
}

struct RandomPolicy {
    action_space: ActionSpace,
    rng: fastrand::Rng,
}

impl Policy<WpEnv> for RandomPolicy {
    fn sample(&mut self, _: &<WpEnv as Env>::Obs) -> WpAct {
        self.action_space.sample(&self.rng)
    }
}

fn env_config(args: &Args) -> Result<WpEnvConfig> {
    match &args.config {
        Some(path) => WpEnvConfig::load(path),
        None => Ok(WpEnvConfig::default()
            .descriptors(ROBOT_YAML, SETTINGS_YAML)
            .discrete(args.discrete)
            .max_steps_per_episode(args.max_steps)
            .goal_radius(0.25)),
    }
}

fn run(args: &Args) -> Result<Vec<f32>> {
    let mut env = WpEnv::build(&env_config(args)?, args.seed as i64)?;
    let mut policy = RandomPolicy {
        action_space: env.action_space().clone(),
        rng: fastrand::Rng::with_seed(args.seed),
    };
    let mut recorder = BufferedRecorder::new();
    let returns = util::eval_with_recorder(&mut env, &mut policy, args.n_episodes, &mut recorder)?;

    let mut emitted = 0.0;
    for record in recorder.iter() {
        if let Some(RecordValue::Scalar(v)) = record.get("emitted") {
            emitted += v;
        }
        if let Ok(reason) = record.get_string("done_reason") {
            println!("done: {}", reason);
        }
    }
    println!(
        "{} steps, {} waypoints, returns = {:?}",
        recorder.len(),
        emitted,
        returns
    );
    env.close();
    Ok(returns)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    run(&args)?;
    Ok(())
}

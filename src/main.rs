// src/main.rs
//
// Thin harness around the triagesim library.
// All of the real logic lives in the lib crate (env, agent, runner).

use clap::Parser;

use triagesim::{
    EnvConfig, EventSink, FileSink, NoopSink, RuleBasedAgent, RunnerConfig, SimulationRunner,
    TriageEnv,
};

/// Command-line arguments for the triagesim binary.
#[derive(Parser, Debug)]
#[command(name = "triagesim")]
struct Cli {
    /// Number of episodes to run.
    #[arg(long, default_value_t = 10)]
    episodes: u64,

    /// Base seed; episode e uses seed + e. Random when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Patients in the queue at episode start.
    #[arg(long, default_value_t = 5)]
    initial_patients: usize,

    /// Per-step probability of a new arrival.
    #[arg(long, default_value_t = 0.3)]
    arrival_rate: f64,

    /// Hard step cap per episode.
    #[arg(long, default_value_t = 1000)]
    max_steps: u64,

    /// Pacing delay between episodes, in milliseconds.
    #[arg(long, default_value_t = 0)]
    episode_delay_ms: u64,

    /// Optional JSONL path for the step / episode log.
    #[arg(long)]
    log_jsonl: Option<String>,

    /// Suppress per-episode output.
    #[arg(long)]
    quiet: bool,
}

/// Build the log sink as a trait object so we can choose between
/// FileSink and NoopSink at runtime.
fn build_sink(log_jsonl: Option<&str>) -> Box<dyn EventSink> {
    match log_jsonl {
        Some(path) => Box::new(FileSink::new(path)),
        None => Box::new(NoopSink),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let env_config = EnvConfig::default()
        .with_initial_patient_count(cli.initial_patients)
        .with_patient_arrival_rate(cli.arrival_rate)
        .with_max_steps(cli.max_steps);

    let runner_config = RunnerConfig::default()
        .with_max_steps_per_episode(cli.max_steps)
        .with_episode_delay_ms(cli.episode_delay_ms)
        .with_seed(cli.seed);

    let env = TriageEnv::new(env_config);
    let agent = Box::new(RuleBasedAgent::default());
    let mut runner = SimulationRunner::new(env, agent, runner_config)
        .with_sink(build_sink(cli.log_jsonl.as_deref()));

    println!(
        "triagesim: {} episode(s), seed {}",
        cli.episodes,
        cli.seed
            .map(|s| s.to_string())
            .unwrap_or_else(|| "random".to_string()),
    );

    let results = runner.run(cli.episodes).await;

    if !cli.quiet {
        for r in &results {
            println!(
                "episode {:>4}  steps {:>5}  reward {:>9.3}  mean {:>7.3}  treated {:>3}  {}{}",
                r.episode,
                r.steps,
                r.total_reward,
                r.mean_reward,
                r.patients_treated,
                r.reason.as_str(),
                if r.success { " (success)" } else { "" },
            );
        }
    }

    let metrics = runner.metrics();
    let summary = runner.performance_summary();
    println!();
    println!("episodes completed:   {}", metrics.episodes_completed);
    println!("patients treated:     {}", metrics.patients_treated);
    println!("avg wait (min):       {:.2}", metrics.average_wait_time_min);
    println!("satisfaction (0-10):  {:.2}", metrics.patient_satisfaction);
    println!("cost per patient:     {:.2}", metrics.cost_per_patient);
    println!("safety incidents:     {}", metrics.safety_incidents);
    println!("success rate:         {:.1}%", summary.success_rate * 100.0);
    println!("reward trend:         {:+.3}", summary.reward_trend);

    let failed = results.iter().filter(|r| r.failed).count();
    if failed > 0 {
        eprintln!("{failed} episode(s) failed");
        std::process::exit(1);
    }
}

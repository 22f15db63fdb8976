//! Command-line driver for the delayed match-to-sample environment.
//!
//! Examples:
//!   epochtask-cli run --policy oracle --trials 200
//!   epochtask-cli run --config dms.json --policy random --json
//!   epochtask-cli timeline --seed 7
//!   epochtask-cli config > dms.json
//!
//! Logs go through `tracing` (info and above).

use std::process;

use epochtask::config::DmsConfig;
use epochtask::observer::EnvAdapter;
use epochtask::runner::{run_session, Policy, SessionReport};
use epochtask::tasks::delay_match_sample::METADATA;
use epochtask::tasks::DelayedMatchToSample;
use tracing::error;

const DEFAULT_TRIALS: u32 = 100;
const MAX_STEPS_PER_TRIAL: u64 = 10_000;

fn usage() -> ! {
    eprintln!("epochtask-cli (delayed match-to-sample environment)");
    eprintln!("Usage: epochtask-cli <command> [options]\n");
    eprintln!("Commands:");
    eprintln!("  run         Drive the environment with a scripted policy");
    eprintln!("  timeline    Print the epoch table and observation rows of one trial");
    eprintln!("  config      Print the default configuration as JSON");
    eprintln!("\nOptions:");
    eprintln!("  --config <path>             JSON config (missing fields keep defaults)");
    eprintln!("  --seed <n>                  Override the config seed");
    eprintln!("  --trials <n>                Trials to run (run only, default {DEFAULT_TRIALS})");
    eprintln!("  --policy <oracle|fixate|random|impulsive>  (run only, default oracle)");
    eprintln!("  --json                      Print the report as JSON (run only)");
    process::exit(1);
}

#[derive(Debug)]
struct Options {
    config: Option<String>,
    seed: Option<u64>,
    trials: u32,
    policy: Policy,
    json: bool,
}

fn fail(msg: &str) -> ! {
    error!("{}", msg);
    eprintln!("{}", msg);
    process::exit(2);
}

fn value_of(args: &[String], i: usize) -> &str {
    match args.get(i + 1) {
        Some(v) => v.as_str(),
        None => fail(&format!("{} needs a value", args[i])),
    }
}

fn parse_options(args: &[String]) -> Options {
    let mut opts = Options {
        config: None,
        seed: None,
        trials: DEFAULT_TRIALS,
        policy: Policy::Oracle,
        json: false,
    };

    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--config" => {
                opts.config = Some(value_of(args, i).to_string());
                i += 2;
            }
            "--seed" => {
                let v = value_of(args, i);
                opts.seed = Some(
                    v.parse()
                        .unwrap_or_else(|_| fail(&format!("--seed: not a number: {v}"))),
                );
                i += 2;
            }
            "--trials" => {
                let v = value_of(args, i);
                opts.trials = v
                    .parse()
                    .unwrap_or_else(|_| fail(&format!("--trials: not a number: {v}")));
                i += 2;
            }
            "--policy" => {
                let v = value_of(args, i);
                opts.policy =
                    Policy::parse(v).unwrap_or_else(|| fail(&format!("unknown policy: {v}")));
                i += 2;
            }
            "--json" => {
                opts.json = true;
                i += 1;
            }
            "-h" | "--help" => usage(),
            other => fail(&format!("unknown option: {other}")),
        }
    }
    opts
}

fn load_config(opts: &Options) -> DmsConfig {
    let mut cfg = match &opts.config {
        Some(path) => DmsConfig::load(path).unwrap_or_else(|e| fail(&e.to_string())),
        None => DmsConfig::default(),
    };
    if let Some(seed) = opts.seed {
        cfg.seed = seed;
    }
    cfg
}

fn print_report(r: &SessionReport) {
    println!(
        "policy={:<9} trials={} steps={} reward={:.3} reward/trial={:.3}",
        r.policy.name(),
        r.trials,
        r.steps,
        r.total_reward,
        r.mean_reward_per_trial,
    );
    println!(
        "correct={} incorrect={} aborted={} missed={} acc={:.1}% last100={:.1}%",
        r.stats.correct,
        r.stats.incorrect,
        r.stats.aborted,
        r.stats.missed,
        r.stats.accuracy() * 100.0,
        r.stats.last_100_rate() * 100.0,
    );
}

fn cmd_run(opts: &Options) {
    let cfg = load_config(opts);
    let seed = cfg.seed;
    let mut env = DelayedMatchToSample::new(cfg);
    let max_steps = (opts.trials as u64).saturating_mul(MAX_STEPS_PER_TRIAL);
    let report = run_session(&mut env, opts.policy, opts.trials, max_steps, seed ^ 0x5EED);

    if opts.json {
        match serde_json::to_string_pretty(&report) {
            Ok(s) => println!("{s}"),
            Err(e) => fail(&format!("serialize report: {e}")),
        }
    } else {
        print_report(&report);
    }
}

fn cmd_timeline(opts: &Options) {
    let env = DelayedMatchToSample::new(load_config(opts));
    let adapter = EnvAdapter::new(&env);
    let snap = adapter.snapshot();

    println!("{} ({})", METADATA.paper_name, METADATA.paper_link);
    println!(
        "trial: ground_truth={} sample={} test={} dt={}ms steps={}",
        snap.trial.ground_truth, snap.trial.sample, snap.trial.test, snap.dt, snap.total_steps
    );
    for e in &snap.epochs {
        println!("  {:<9} [{:>3}, {:>3})", e.name, e.start, e.end);
    }
    println!("\n  t  epoch      cue     ev1     ev2   gt");
    for (t, row) in adapter.observation_rows().iter().enumerate() {
        let epoch = env
            .epochs()
            .schedule()
            .epoch_at(t)
            .map(|e| e.name.as_str())
            .unwrap_or("-");
        println!(
            "{:>3}  {:<9} {:>6.3} {:>7.3} {:>7.3} {:>4}",
            t,
            epoch,
            row[0],
            row[1],
            row[2],
            env.epochs().gt_at(t)
        );
    }
}

fn cmd_config() {
    match DmsConfig::default().to_json_pretty() {
        Ok(s) => println!("{s}"),
        Err(e) => fail(&e.to_string()),
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(cmd) = args.first() else {
        usage();
    };
    let opts = parse_options(&args[1..]);

    match cmd.as_str() {
        "run" => cmd_run(&opts),
        "timeline" => cmd_timeline(&opts),
        "config" => cmd_config(),
        "-h" | "--help" | "help" => usage(),
        other => {
            eprintln!("Unknown command: {other}");
            usage();
        }
    }
}

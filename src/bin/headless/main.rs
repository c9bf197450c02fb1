// Headless Runner - drives the merge engine on a simulated clock
//
// Usage:
//   cargo run --bin headless                          # All scenarios, 3600 frames each
//   cargo run --bin headless -- --frames 600          # Shorter run
//   cargo run --bin headless -- --frame-ms 33.3       # 30 fps clock
//   cargo run --bin headless -- burst                 # Filter by name
//   cargo run --bin headless -- --jsonl --every 60    # One status object per second
//   RUST_LOG=chain_merge_engine=debug cargo run --bin headless

mod report;
mod scenarios;

use chain_merge_engine::MergeSimulation;
use report::{FrameRecord, RunSummary};
use scenarios::{scenarios, Scenario};
use tracing_subscriber::EnvFilter;

// ─── CLI Parsing ────────────────────────────────────────────────────────────

struct CliArgs {
    frames: u64,
    frame_ms: f64,
    seed: Option<u64>,
    every: u64,
    jsonl: bool,
    filter: Option<String>,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut cli = CliArgs {
        frames: 3600,
        frame_ms: 1000.0 / 60.0,
        seed: None,
        every: 300,
        jsonl: false,
        filter: None,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--frames" => {
                i += 1;
                if i < args.len() {
                    cli.frames = args[i].parse().unwrap_or(3600);
                }
            }
            "--frame-ms" => {
                i += 1;
                if i < args.len() {
                    cli.frame_ms = args[i].parse().unwrap_or(1000.0 / 60.0);
                }
            }
            "--seed" => {
                i += 1;
                if i < args.len() {
                    cli.seed = args[i].parse().ok();
                }
            }
            "--every" => {
                i += 1;
                if i < args.len() {
                    cli.every = args[i].parse::<u64>().unwrap_or(300).max(1);
                }
            }
            "--jsonl" => {
                cli.jsonl = true;
            }
            arg if !arg.starts_with('-') => {
                cli.filter = Some(arg.to_string());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
            }
        }
        i += 1;
    }

    cli
}

// ─── Run ────────────────────────────────────────────────────────────────────

fn run(scenario: &Scenario, cli: &CliArgs) -> Result<RunSummary, String> {
    let mut config = (scenario.config)();
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    let seed = config.seed;
    let start = 0.0;
    let mut sim = MergeSimulation::with_config(config, start).map_err(|e| e.to_string())?;
    if let Some(setup) = scenario.setup {
        setup(&mut sim, start).map_err(|e| e.to_string())?;
    }

    for frame in 1..=cli.frames {
        let now = start + frame as f64 * cli.frame_ms;
        sim.tick_core(now);
        if frame % cli.every == 0 {
            if cli.jsonl {
                let record = FrameRecord { scenario: scenario.name, frame, status: sim.status() };
                match serde_json::to_string(&record) {
                    Ok(line) => println!("{}", line),
                    Err(err) => tracing::warn!(%err, "failed to encode frame record"),
                }
            } else {
                println!("  [{:>6}] {}", frame, sim.status());
            }
        }
    }

    Ok(RunSummary::collect(scenario.name, seed, cli.frames, &sim))
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = parse_args();
    let all_scenarios = scenarios();

    let to_run: Vec<&Scenario> = match &cli.filter {
        Some(f) => {
            let f_lower = f.to_lowercase();
            all_scenarios.iter()
                .filter(|s| s.name.contains(&f_lower) || s.label.to_lowercase().contains(&f_lower))
                .collect()
        }
        None => all_scenarios.iter().collect(),
    };

    if to_run.is_empty() {
        eprintln!("No scenarios match filter: {:?}", cli.filter);
        std::process::exit(1);
    }

    if !cli.jsonl {
        println!("\n  Chain Merge Headless Runner");
        println!("  PRNG: ChaCha8Rng | Frames: {} @ {:.2}ms", cli.frames, cli.frame_ms);
    }

    let mut failed = 0;
    for scenario in to_run {
        match run(scenario, &cli) {
            Ok(summary) if cli.jsonl => match serde_json::to_string(&summary) {
                Ok(line) => println!("{}", line),
                Err(err) => tracing::warn!(%err, "failed to encode summary"),
            },
            Ok(summary) => summary.print(),
            Err(err) => {
                eprintln!("  {} failed: {}", scenario.name, err);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }
}

// Headless Scenario Definitions
// Each scenario is a config plus optional setup run at frame 0

use chain_merge_engine::config::{xai_preset, EngineConfig};
use chain_merge_engine::{Cadence, MergeSimulation, Result};

// ─── Scenario Configuration ─────────────────────────────────────────────────

pub struct Scenario {
    pub name: &'static str,
    pub label: &'static str,
    pub config: fn() -> EngineConfig,
    /// Commands issued before the first frame, at the start instant.
    pub setup: Option<fn(&mut MergeSimulation, f64) -> Result<()>>,
}

// ─── Setup Functions ────────────────────────────────────────────────────────

fn xai_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.presets.clear();
    config
}

fn add_xai(sim: &mut MergeSimulation, now: f64) -> Result<()> {
    let preset = xai_preset(0.0);
    sim.insert_chain(&preset.name, preset.cadence, now)?;
    Ok(())
}

fn burst_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.presets.clear();
    config.devices.initial = 20;
    config.random.device_direct_chain_chance = 0.3;
    config
}

fn add_burst_chains(sim: &mut MergeSimulation, now: f64) -> Result<()> {
    let fast = [("Arbitrum", 250.0), ("Base", 300.0), ("Optimism", 400.0), ("Polygon", 500.0)];
    for (name, interval_ms) in fast {
        sim.insert_chain(name, Cadence::fixed(interval_ms)?, now)?;
    }
    sim.insert_chain("Jitter", Cadence::probabilistic(vec![50.0, 100.0, 150.0])?, now)?;
    Ok(())
}

// ─── Registry ───────────────────────────────────────────────────────────────

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "default",
            label: "Intro sequence with preset chains",
            config: EngineConfig::default,
            setup: None,
        },
        Scenario {
            name: "xai",
            label: "Primary plus one probabilistic chain",
            config: xai_config,
            setup: Some(add_xai),
        },
        Scenario {
            name: "burst",
            label: "Many fast chains and heavy device traffic",
            config: burst_config,
            setup: Some(add_burst_chains),
        },
    ]
}

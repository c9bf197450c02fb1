// Headless Run Report Types
// Structured output for the final summary and per-frame JSONL

use serde::Serialize;

use chain_merge_engine::{EngineStatus, MergeSimulation, RunTotals};

#[derive(Debug, Serialize)]
pub struct FrameRecord<'a> {
    pub scenario: &'a str,
    pub frame: u64,
    pub status: EngineStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChainSummary {
    pub name: String,
    pub cadence: String,
    pub blocks_created: u64,
    pub blocks_live: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub name: String,
    pub rows: usize,
    pub last_modified: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub scenario: String,
    pub seed: u64,
    pub frames: u64,
    pub engine_time_ms: f64,
    pub chains: Vec<ChainSummary>,
    pub tables: Vec<TableSummary>,
    pub totals: RunTotals,
    pub batcher_requests: u64,
    pub devices: usize,
}

impl RunSummary {
    pub fn collect(scenario: &str, seed: u64, frames: u64, sim: &MergeSimulation) -> Self {
        let status = sim.status();
        Self {
            scenario: scenario.to_string(),
            seed,
            frames,
            engine_time_ms: status.engine_time_ms,
            chains: sim
                .chains()
                .iter()
                .map(|c| ChainSummary {
                    name: c.name.clone(),
                    cadence: c.cadence.label(),
                    blocks_created: c.counter,
                    blocks_live: c.blocks.len(),
                })
                .collect(),
            tables: sim
                .tables()
                .iter()
                .map(|t| TableSummary { name: t.name.clone(), rows: t.rows.len(), last_modified: t.last_modified })
                .collect(),
            totals: sim.totals().clone(),
            batcher_requests: status.batcher_requests,
            devices: status.device_count,
        }
    }

    pub fn print(&self) {
        println!("\n  Scenario: {} (seed {}, {} frames, {:.1}s engine time)",
            self.scenario, self.seed, self.frames, self.engine_time_ms / 1000.0);
        println!("  {:<20} {:>8} {:>10} {:>8}", "Chain", "Cadence", "Created", "Live");
        println!("  {}", "-".repeat(50));
        for chain in &self.chains {
            println!("  {:<20} {:>8} {:>10} {:>8}",
                chain.name, chain.cadence, chain.blocks_created, chain.blocks_live);
        }
        println!("  {}", "-".repeat(50));
        for table in &self.tables {
            println!("  {:<20} {:>3} rows", table.name, table.rows);
        }
        let t = &self.totals;
        println!("  Blocks: {} appended, {} merged, {} pruned",
            t.blocks_appended, t.blocks_merged, t.blocks_pruned);
        println!("  Actions: {} created, {} dispatched | Rows written: {}",
            t.actions_created, t.actions_dispatched, t.rows_inserted);
        println!("  Batcher requests: {} | Devices: {}\n", self.batcher_requests, self.devices);
    }
}

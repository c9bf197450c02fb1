// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Chain Merge Visualizer - Engine Configuration
//
// Everything the UI config panel used to mutate through shared globals lives
// here and is handed to the engine at construction.

use serde::{Deserialize, Serialize};

use crate::cadence::{Cadence, DEFAULT_PROBABILITY_THRESHOLDS_MS};
use crate::error::{EngineError, Result};
use crate::types::EventType;

pub const DEFAULT_PRIMARY_CHAIN_NAME: &str = "Paima Engine";
pub const DEFAULT_PRIMARY_INTERVAL_MS: f64 = 1000.0;
pub const DEFAULT_SEED: u64 = 0x5eed_cafe;

// ─── Canvas & Layout ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: f64,
    pub height: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self { width: 1200.0, height: 1000.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Now-line position as a fraction of canvas width.
    pub now_ratio: f64,
    pub pixels_per_second: f64,
    pub block_height: f64,
    pub chain_start_y: f64,
    pub chain_spacing: f64,
    pub action_y: f64,
    pub action_size: f64,
    /// Chain-bound particles park this far right of the now-line.
    pub wait_offset: f64,
    /// Blocks are pruned once their right edge is this far past the left edge.
    pub prune_margin: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            now_ratio: 0.8,
            pixels_per_second: 80.0,
            block_height: 40.0,
            chain_start_y: 400.0,
            chain_spacing: 80.0,
            action_y: 270.0,
            action_size: 20.0,
            wait_offset: 100.0,
            prune_margin: 100.0,
        }
    }
}

// ─── Tables ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub origin_x: f64,
    pub origin_y: f64,
    pub width: f64,
    pub height: f64,
    pub spacing: f64,
    pub max_rows: usize,
    pub blink_duration_ms: f64,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            origin_x: 50.0,
            origin_y: 60.0,
            width: 220.0,
            height: 140.0,
            spacing: 30.0,
            max_rows: 5,
            blink_duration_ms: 1500.0,
        }
    }
}

// ─── Actions ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionConfig {
    /// How long an executed action holds at the now-line before dispatch.
    pub wait_at_now_ms: f64,
    /// Delay between consecutive block-to-action particles of one block.
    pub particle_stagger_ms: f64,
    pub particle_travel_ms: f64,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            wait_at_now_ms: 0.0,
            particle_stagger_ms: 100.0,
            particle_travel_ms: 1500.0,
        }
    }
}

// ─── Randomness ─────────────────────────────────────────────────────────────

/// `value = rng * multiplier + offset`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RandomRange {
    pub multiplier: f64,
    pub offset: f64,
}

impl RandomRange {
    pub fn sample<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        rng.gen::<f64>() * self.multiplier + self.offset
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomMultipliers {
    pub balance: f64,
    pub user_id: u32,
    pub position: u32,
    pub character_id: u32,
    pub asset_id: u32,
    pub device_request_interval: RandomRange,
    pub device_creation_spread: f64,
    pub action_creation_delay: RandomRange,
    /// Per-tick chance that the block processor pings the batcher.
    pub processor_to_batcher_chance: f64,
    pub device_removal_chance: f64,
    pub device_addition_chance: f64,
    /// Blocks longer than this always carry an event; shorter ones carry one
    /// with probability `duration / threshold`.
    pub block_event_threshold_ms: f64,
    /// Chance a device request skips the batcher and heads straight to a chain.
    pub device_direct_chain_chance: f64,
}

impl Default for RandomMultipliers {
    fn default() -> Self {
        Self {
            balance: 1000.0,
            user_id: 999,
            position: 10,
            character_id: 5,
            asset_id: 9999,
            device_request_interval: RandomRange { multiplier: 4000.0, offset: 1000.0 },
            device_creation_spread: 80.0,
            action_creation_delay: RandomRange { multiplier: 2500.0, offset: 500.0 },
            processor_to_batcher_chance: 0.005,
            device_removal_chance: 0.5,
            device_addition_chance: 0.5,
            block_event_threshold_ms: 1000.0,
            device_direct_chain_chance: 0.0,
        }
    }
}

// ─── Devices ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub initial: usize,
    pub min: usize,
    pub max: usize,
    pub lifecycle_interval_ms: f64,
    pub fade_ms: f64,
    pub request_travel_ms: f64,
    pub batcher_width: f64,
    pub batcher_height: f64,
    pub chain_particle_travel_ms: f64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            initial: 10,
            min: 5,
            max: 20,
            lifecycle_interval_ms: 2000.0,
            fade_ms: 1000.0,
            request_travel_ms: 1500.0,
            batcher_width: 130.0,
            batcher_height: 100.0,
            chain_particle_travel_ms: 1000.0,
        }
    }
}

// ─── Block Processor ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    pub width: f64,
    pub height: f64,
    pub y: f64,
    pub highlight_ms: f64,
    /// start -> center, center -> bottom exit, bottom exit -> block
    pub block_segments_ms: [f64; 3],
    /// start -> center, center -> left exit, left exit -> table
    pub table_segments_ms: [f64; 3],
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            width: 180.0,
            height: 120.0,
            y: 230.0,
            highlight_ms: 500.0,
            block_segments_ms: [500.0, 300.0, 600.0],
            table_segments_ms: [500.0, 300.0, 1200.0],
        }
    }
}

// ─── Presets ────────────────────────────────────────────────────────────────

/// A chain added automatically `at_ms` after engine start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainPreset {
    pub at_ms: f64,
    pub name: String,
    pub cadence: Cadence,
}

impl ChainPreset {
    fn fixed(at_ms: f64, name: &str, block_time_secs: f64) -> Self {
        Self {
            at_ms,
            name: name.to_string(),
            cadence: Cadence::Fixed { interval_ms: block_time_secs * 1000.0 },
        }
    }
}

pub fn default_presets() -> Vec<ChainPreset> {
    vec![
        ChainPreset::fixed(3_500.0, "Arbitrum", 0.25),
        ChainPreset::fixed(7_600.0, "Ethereum", 12.0),
        ChainPreset::fixed(11_400.0, "Cardano", 20.0),
        ChainPreset::fixed(11_400.0, "Midnight", 6.0),
        ChainPreset::fixed(11_500.0, "Avail", 20.0),
    ]
}

/// The probabilistic XAI chain offered by the host's preset buttons.
pub fn xai_preset(at_ms: f64) -> ChainPreset {
    ChainPreset {
        at_ms,
        name: "XAI".to_string(),
        cadence: Cadence::Probability {
            thresholds_ms: DEFAULT_PROBABILITY_THRESHOLDS_MS.to_vec(),
            check_index: 0,
        },
    }
}

// ─── Colors ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventColors {
    pub erc20_transfer: String,
    pub erc721_transfer: String,
    pub game_move: String,
    pub account_created: String,
    pub fallback: String,
}

impl Default for EventColors {
    fn default() -> Self {
        Self {
            erc20_transfer: "#f39c12".into(),
            erc721_transfer: "#9b59b6".into(),
            game_move: "#3498db".into(),
            account_created: "#2ecc71".into(),
            fallback: "#e67e22".into(),
        }
    }
}

impl EventColors {
    pub fn for_type(&self, event_type: EventType) -> &str {
        match event_type {
            EventType::Erc20Transfer => &self.erc20_transfer,
            EventType::Erc721Transfer => &self.erc721_transfer,
            EventType::GameMove => &self.game_move,
            EventType::AccountCreated => &self.account_created,
        }
    }
}

pub fn default_merge_palette() -> Vec<String> {
    [
        "#e74c3c", "#3498db", "#2ecc71", "#f39c12", "#9b59b6",
        "#1abc9c", "#e67e22", "#34495e", "#f1c40f", "#16a085",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect()
}

// ─── EngineConfig ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub canvas: CanvasConfig,
    pub layout: LayoutConfig,
    pub table: TableConfig,
    pub action: ActionConfig,
    pub random: RandomMultipliers,
    pub devices: DeviceConfig,
    pub processor: ProcessorConfig,
    pub merge_palette: Vec<String>,
    pub event_colors: EventColors,
    pub primary_chain_name: String,
    pub primary_interval_ms: f64,
    pub primary_color: String,
    pub secondary_color: String,
    pub presets: Vec<ChainPreset>,
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            canvas: CanvasConfig::default(),
            layout: LayoutConfig::default(),
            table: TableConfig::default(),
            action: ActionConfig::default(),
            random: RandomMultipliers::default(),
            devices: DeviceConfig::default(),
            processor: ProcessorConfig::default(),
            merge_palette: default_merge_palette(),
            event_colors: EventColors::default(),
            primary_chain_name: DEFAULT_PRIMARY_CHAIN_NAME.to_string(),
            primary_interval_ms: DEFAULT_PRIMARY_INTERVAL_MS,
            primary_color: "#19b17b".into(),
            secondary_color: "#7f8c8d".into(),
            presets: default_presets(),
            seed: DEFAULT_SEED,
        }
    }
}

impl EngineConfig {
    /// Defaults without background traffic or scheduled chains: only what the
    /// caller adds explicitly moves.
    pub fn quiet() -> Self {
        let mut config = Self::default();
        config.presets.clear();
        config.devices.initial = 0;
        config.devices.min = 0;
        config.devices.max = 0;
        config.random.processor_to_batcher_chance = 0.0;
        config
    }

    pub fn now_pixel(&self) -> f64 {
        self.canvas.width * self.layout.now_ratio
    }

    pub fn validate(&self) -> Result<()> {
        fn positive(name: &str, value: f64) -> Result<()> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(EngineError::InvalidConfig(format!("{} must be positive, got {}", name, value)))
            }
        }
        fn non_negative(name: &str, value: f64) -> Result<()> {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(EngineError::InvalidConfig(format!(
                    "{} must not be negative, got {}",
                    name, value
                )))
            }
        }
        fn chance(name: &str, value: f64) -> Result<()> {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(EngineError::InvalidConfig(format!("{} must be within [0, 1], got {}", name, value)))
            }
        }

        positive("canvas.width", self.canvas.width)?;
        positive("canvas.height", self.canvas.height)?;
        positive("layout.pixels_per_second", self.layout.pixels_per_second)?;
        positive("layout.block_height", self.layout.block_height)?;
        positive("table.blink_duration_ms", self.table.blink_duration_ms)?;
        if self.table.max_rows == 0 {
            return Err(EngineError::InvalidConfig("table.max_rows must be at least 1".into()));
        }
        non_negative("action.wait_at_now_ms", self.action.wait_at_now_ms)?;
        non_negative("action.particle_stagger_ms", self.action.particle_stagger_ms)?;
        positive("action.particle_travel_ms", self.action.particle_travel_ms)?;
        non_negative("random.action_creation_delay.offset", self.random.action_creation_delay.offset)?;
        non_negative(
            "random.action_creation_delay.multiplier",
            self.random.action_creation_delay.multiplier,
        )?;
        positive(
            "random.device_request_interval.offset",
            self.random.device_request_interval.offset,
        )?;
        non_negative("random.block_event_threshold_ms", self.random.block_event_threshold_ms)?;
        chance("random.processor_to_batcher_chance", self.random.processor_to_batcher_chance)?;
        chance("random.device_removal_chance", self.random.device_removal_chance)?;
        chance("random.device_addition_chance", self.random.device_addition_chance)?;
        chance("random.device_direct_chain_chance", self.random.device_direct_chain_chance)?;
        if self.devices.min > self.devices.max {
            return Err(EngineError::InvalidConfig(format!(
                "devices.min ({}) exceeds devices.max ({})",
                self.devices.min, self.devices.max
            )));
        }
        positive("devices.lifecycle_interval_ms", self.devices.lifecycle_interval_ms)?;
        positive("devices.fade_ms", self.devices.fade_ms)?;
        positive("devices.request_travel_ms", self.devices.request_travel_ms)?;
        positive("devices.chain_particle_travel_ms", self.devices.chain_particle_travel_ms)?;
        positive("processor.highlight_ms", self.processor.highlight_ms)?;
        for ms in self
            .processor
            .block_segments_ms
            .iter()
            .chain(self.processor.table_segments_ms.iter())
        {
            positive("processor segment duration", *ms)?;
        }
        if self.merge_palette.is_empty() {
            return Err(EngineError::InvalidConfig("merge_palette must not be empty".into()));
        }
        if self.primary_chain_name.trim().is_empty() {
            return Err(EngineError::EmptyChainName);
        }
        Cadence::fixed(self.primary_interval_ms)?;
        for preset in &self.presets {
            non_negative("preset.at_ms", preset.at_ms)?;
            preset.cadence.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        EngineConfig::default().validate().expect("test: defaults are valid");
        EngineConfig::quiet().validate().expect("test: quiet is valid");
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"seed": 9, "table": {"max_rows": 3}}"#).expect("test: parse");
        assert_eq!(config.seed, 9);
        assert_eq!(config.table.max_rows, 3);
        assert_eq!(config.table.blink_duration_ms, 1500.0);
        assert_eq!(config.primary_chain_name, DEFAULT_PRIMARY_CHAIN_NAME);
        assert_eq!(config.presets.len(), 5);
    }

    #[test]
    fn rejects_inconsistent_values() {
        let mut config = EngineConfig::quiet();
        config.devices.min = 3;
        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));

        let mut config = EngineConfig::quiet();
        config.merge_palette.clear();
        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));

        let mut config = EngineConfig::quiet();
        config.primary_interval_ms = -1.0;
        assert_eq!(config.validate(), Err(EngineError::InvalidInterval(-1.0)));

        let mut config = EngineConfig::quiet();
        config.random.processor_to_batcher_chance = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn preset_schedule_matches_intro_sequence() {
        let presets = default_presets();
        let names: Vec<&str> = presets.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Arbitrum", "Ethereum", "Cardano", "Midnight", "Avail"]);
        assert_eq!(xai_preset(0.0).cadence.label(), "(prob)");
    }
}

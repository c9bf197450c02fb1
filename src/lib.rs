// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Chain Merge Visualizer

pub mod types;
pub mod error;
pub mod config;
pub mod cadence;
pub mod timeline;
pub mod events;
pub mod table;
pub mod chain;
pub mod action;
pub mod particle;
pub mod device;
pub mod processor;
pub mod scheduler;
pub mod simulation;

pub use types::*;
pub use error::{EngineError, Result};
pub use config::EngineConfig;
pub use cadence::Cadence;
pub use simulation::{MergeSimulation, RunTotals, PRIMARY_CHAIN_ID};

use wasm_bindgen::prelude::*;

fn to_js<T: serde::Serialize + ?Sized>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or(JsValue::NULL)
}

fn js_error(err: EngineError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

// ─── WASM Interface ──────────────────────────────────────────────────────────

#[wasm_bindgen]
impl MergeSimulation {
    /// Default configuration; `now` is the host's `performance.now()`.
    #[wasm_bindgen(constructor)]
    pub fn new(now: f64) -> std::result::Result<MergeSimulation, JsValue> {
        #[cfg(target_arch = "wasm32")]
        std::panic::set_hook(Box::new(console_error_panic_hook::hook));

        MergeSimulation::with_config(EngineConfig::default(), now).map_err(js_error)
    }

    pub fn from_config(config: JsValue, now: f64) -> std::result::Result<MergeSimulation, JsValue> {
        #[cfg(target_arch = "wasm32")]
        std::panic::set_hook(Box::new(console_error_panic_hook::hook));

        let config: EngineConfig = serde_wasm_bindgen::from_value(config)?;
        MergeSimulation::with_config(config, now).map_err(js_error)
    }

    pub fn tick(&mut self, now: f64) -> JsValue {
        let result = self.tick_core(now);
        to_js(&result)
    }

    /// Fixed-interval chain; returns the new chain id.
    pub fn add_chain(&mut self, name: &str, block_time_secs: f64, now: f64) -> std::result::Result<u32, JsValue> {
        let cadence = Cadence::fixed(block_time_secs * 1000.0).map_err(js_error)?;
        self.insert_chain(name, cadence, now).map(|id| id.0).map_err(js_error)
    }

    /// Probabilistic chain over ascending `thresholds_ms`.
    pub fn add_probability_chain(
        &mut self,
        name: &str,
        thresholds_ms: Vec<f64>,
        now: f64,
    ) -> std::result::Result<u32, JsValue> {
        let cadence = Cadence::probabilistic(thresholds_ms).map_err(js_error)?;
        self.insert_chain(name, cadence, now).map(|id| id.0).map_err(js_error)
    }

    pub fn remove_chain(&mut self, chain_id: u32) -> std::result::Result<(), JsValue> {
        self.remove_chain_core(ChainId(chain_id)).map_err(js_error)
    }

    pub fn clear_chains(&mut self) -> u32 {
        self.clear_secondary_chains() as u32
    }

    pub fn pause(&mut self, now: f64) -> std::result::Result<(), JsValue> {
        self.pause_at(now).map_err(js_error)
    }

    pub fn resume(&mut self, now: f64) -> std::result::Result<f64, JsValue> {
        self.resume_at(now).map_err(js_error)
    }

    pub fn toggle_pause(&mut self, now: f64) -> bool {
        self.toggle_pause_at(now)
    }

    #[wasm_bindgen(js_name = is_paused)]
    pub fn is_paused_js(&self) -> bool {
        self.is_paused()
    }

    pub fn get_status(&self) -> JsValue {
        to_js(&self.status())
    }

    pub fn status_line(&self) -> String {
        self.status().to_string()
    }

    pub fn get_chains(&self) -> JsValue {
        to_js(self.chains())
    }

    pub fn get_tables(&self) -> JsValue {
        to_js(self.tables())
    }

    pub fn get_actions(&self) -> JsValue {
        to_js(self.actions())
    }

    pub fn get_particles(&self) -> JsValue {
        to_js(&self.particles())
    }

    pub fn get_devices(&self) -> JsValue {
        to_js(self.devices())
    }

    pub fn get_processor(&self) -> JsValue {
        to_js(self.processor())
    }

    pub fn get_batcher(&self) -> JsValue {
        to_js(self.batcher())
    }

    pub fn get_config(&self) -> JsValue {
        to_js(self.config())
    }

    pub fn set_config(&mut self, config: JsValue) -> std::result::Result<(), JsValue> {
        let config: EngineConfig = serde_wasm_bindgen::from_value(config)?;
        self.replace_config(config).map_err(js_error)
    }

    /// Reset simulation to initial state
    pub fn reset(&mut self, now: f64) -> std::result::Result<(), JsValue> {
        self.reset_at(now).map_err(js_error)
    }
}

// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Chain Merge Visualizer - Block Cadence Policies

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result, MAX_BLOCK_INTERVAL_MS};

/// Thresholds used by the XAI preset.
pub const DEFAULT_PROBABILITY_THRESHOLDS_MS: [f64; 5] = [100.0, 150.0, 200.0, 250.0, 300.0];

/// When a chain appends its next block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Cadence {
    /// Append whenever `interval_ms` of wall time has passed since the last append.
    Fixed { interval_ms: f64 },
    /// Walk an ascending threshold list; at index `i` append with
    /// probability `1 / (len - i)`, so the last threshold always fires.
    Probability {
        thresholds_ms: Vec<f64>,
        #[serde(default)]
        check_index: usize,
    },
}

impl Cadence {
    pub fn fixed(interval_ms: f64) -> Result<Self> {
        let cadence = Self::Fixed { interval_ms };
        cadence.validate()?;
        Ok(cadence)
    }

    pub fn probabilistic(thresholds_ms: Vec<f64>) -> Result<Self> {
        let cadence = Self::Probability { thresholds_ms, check_index: 0 };
        cadence.validate()?;
        Ok(cadence)
    }

    /// Reject anything that could stall or spin the per-tick check.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Fixed { interval_ms } => {
                if !interval_ms.is_finite() || *interval_ms <= 0.0 {
                    return Err(EngineError::InvalidInterval(*interval_ms));
                }
                if *interval_ms > MAX_BLOCK_INTERVAL_MS {
                    return Err(EngineError::IntervalTooLong(*interval_ms));
                }
            }
            Self::Probability { thresholds_ms, .. } => {
                if thresholds_ms.is_empty() {
                    return Err(EngineError::EmptyThresholds);
                }
                let mut previous = 0.0_f64;
                for (index, &value) in thresholds_ms.iter().enumerate() {
                    if !value.is_finite() || value <= 0.0 || value < previous {
                        return Err(EngineError::InvalidThreshold { index, value });
                    }
                    if value > MAX_BLOCK_INTERVAL_MS {
                        return Err(EngineError::IntervalTooLong(value));
                    }
                    previous = value;
                }
            }
        }
        Ok(())
    }

    /// Decide whether a block is due, given wall time elapsed since the last
    /// append. Returning `true` means the caller appends now; the threshold
    /// index is already reset to 0.
    ///
    /// Every threshold cleared by `elapsed_ms` is consulted in order within
    /// the same call, so a coarse frame cannot skip past the final threshold.
    pub fn poll<R: Rng + ?Sized>(&mut self, elapsed_ms: f64, rng: &mut R) -> bool {
        match self {
            Self::Fixed { interval_ms } => elapsed_ms >= *interval_ms,
            Self::Probability { thresholds_ms, check_index } => {
                let total = thresholds_ms.len();
                while *check_index < total && elapsed_ms >= thresholds_ms[*check_index] {
                    let probability = 1.0 / (total - *check_index) as f64;
                    if rng.gen::<f64>() < probability {
                        *check_index = 0;
                        return true;
                    }
                    *check_index += 1;
                    if *check_index >= total {
                        *check_index = 0;
                        return true;
                    }
                }
                false
            }
        }
    }

    /// Probability of appending when sitting at `index` (0 once out of range).
    pub fn probability_at(&self, index: usize) -> f64 {
        match self {
            Self::Fixed { .. } => 1.0,
            Self::Probability { thresholds_ms, .. } => {
                if index < thresholds_ms.len() {
                    1.0 / (thresholds_ms.len() - index) as f64
                } else {
                    0.0
                }
            }
        }
    }

    /// Short label for the status line: `(12s)` or `(prob)`.
    pub fn label(&self) -> String {
        match self {
            Self::Fixed { interval_ms } => format!("({}s)", interval_ms / 1000.0),
            Self::Probability { .. } => "(prob)".to_string(),
        }
    }
}

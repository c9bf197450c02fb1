// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Chain Merge Visualizer - Block Processor

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::ProcessorConfig;
use crate::types::{Point, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProcessorStage {
    Pending,
    Processing,
    ToSql,
    ToPaima,
}

impl ProcessorStage {
    pub const ALL: [ProcessorStage; 4] = [Self::Pending, Self::Processing, Self::ToSql, Self::ToPaima];
}

/// Arrows drawn between stages, as `(from, to)`.
pub const ARROWS: [(ProcessorStage, ProcessorStage); 3] = [
    (ProcessorStage::Pending, ProcessorStage::Processing),
    (ProcessorStage::Processing, ProcessorStage::ToSql),
    (ProcessorStage::Processing, ProcessorStage::ToPaima),
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub stage: ProcessorStage,
    pub arrow: (ProcessorStage, ProcessorStage),
    pub start: f64,
}

/// Fixed via-point every processed event passes through, centred on the
/// now-line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockProcessor {
    pub bounds: Rect,
    pub highlight: Option<Highlight>,
}

impl BlockProcessor {
    pub fn new(now_pixel: f64, config: &ProcessorConfig) -> Self {
        Self {
            bounds: Rect::new(now_pixel - config.width / 2.0, config.y, config.width, config.height),
            highlight: None,
        }
    }

    pub fn center(&self) -> Point {
        self.bounds.center()
    }

    /// Where table-bound events leave the processor.
    pub fn left_exit(&self) -> Point {
        Point::new(self.bounds.x, self.bounds.y + self.bounds.height / 2.0)
    }

    /// Where chain-bound events leave the processor.
    pub fn bottom_exit(&self) -> Point {
        Point::new(self.bounds.x + self.bounds.width / 2.0, self.bounds.y + self.bounds.height)
    }

    pub fn is_animating(&self) -> bool {
        self.highlight.is_some()
    }

    /// Light up a random stage and arrow; restarts any running highlight.
    pub fn trigger_highlight<R: Rng + ?Sized>(&mut self, rng: &mut R, now: f64) {
        let stage = ProcessorStage::ALL[rng.gen_range(0..ProcessorStage::ALL.len())];
        let arrow = ARROWS[rng.gen_range(0..ARROWS.len())];
        self.highlight = Some(Highlight { stage, arrow, start: now });
    }

    pub fn update(&mut self, now: f64, highlight_ms: f64) {
        if let Some(h) = self.highlight {
            if now - h.start > highlight_ms {
                self.highlight = None;
            }
        }
    }

    pub(crate) fn shift_timestamps(&mut self, delta: f64) {
        if let Some(h) = self.highlight.as_mut() {
            h.start += delta;
        }
    }
}

// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Chain Merge Visualizer - Chains and Blocks

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::cadence::Cadence;
use crate::timeline::Timeline;
use crate::types::{BlockRef, ChainId, DomainEvent, ParticleId, Point, Rect};

/// Merge color fade length.
pub const COLOR_FADE_MS: f64 = 1000.0;

const APPEAR_OPACITY_STEP: f64 = 0.05;
const APPEAR_SCALE_STEP: f64 = 0.02;

// Accumulated-event grid inside a block.
const GRID_INSET: f64 = 5.0;
const GRID_SPACING: f64 = 8.0;
const GRID_ROW_HEIGHT: f64 = 8.0;

// ─── Color helpers ──────────────────────────────────────────────────────────

pub fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&digits[0..2], 16).ok()?;
    let g = u8::from_str_radix(&digits[2..4], 16).ok()?;
    let b = u8::from_str_radix(&digits[4..6], 16).ok()?;
    Some((r, g, b))
}

/// Linear RGB blend; falls back to `to` when either side is not `#rrggbb`.
pub fn interpolate_color(from: &str, to: &str, progress: f64) -> String {
    let (Some(a), Some(b)) = (parse_hex(from), parse_hex(to)) else {
        return to.to_string();
    };
    let t = progress.clamp(0.0, 1.0);
    let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
    format!("#{:02x}{:02x}{:02x}", mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

// ─── Block ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorFade {
    pub start: f64,
    pub duration_ms: f64,
    pub from: String,
    pub to: String,
    pub current: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub chain: ChainId,
    pub index: u64,
    /// Logical engine time span `[start_time, end_time)`.
    pub start_time: f64,
    pub end_time: f64,
    /// Recomputed from the span every frame.
    pub bounds: Rect,
    pub color: String,
    pub original_color: String,
    pub color_fade: Option<ColorFade>,
    pub opacity: f64,
    pub scale: f64,
    /// Events carried by the block itself (generated or absorbed from waiting particles).
    pub events: Vec<DomainEvent>,
    /// Processed events that arrived and ride on this block.
    pub accumulated: Vec<ParticleId>,
    pub events_processed: bool,
}

impl Block {
    pub fn new(chain: ChainId, index: u64, start_time: f64, end_time: f64, y: f64, height: f64, color: &str) -> Self {
        Self {
            chain,
            index,
            start_time,
            end_time,
            bounds: Rect::new(0.0, y, 1.0, height),
            color: color.to_string(),
            original_color: color.to_string(),
            color_fade: None,
            opacity: 0.0,
            scale: 0.5,
            events: Vec::new(),
            accumulated: Vec::new(),
            events_processed: false,
        }
    }

    pub fn block_ref(&self) -> BlockRef {
        BlockRef { chain: self.chain, index: self.index }
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    pub fn center(&self) -> Point {
        self.bounds.center()
    }

    /// Recompute screen bounds from the time span.
    pub fn layout(&mut self, timeline: &Timeline, engine_time: f64, y: f64) {
        let (x, width) = timeline.span(self.start_time, self.end_time, engine_time);
        self.bounds.x = x;
        self.bounds.y = y;
        self.bounds.width = width;
    }

    /// Appearance ramp and merge color fade.
    pub fn update(&mut self, now: f64) {
        if self.opacity < 1.0 {
            self.opacity = (self.opacity + APPEAR_OPACITY_STEP).min(1.0);
        }
        if self.scale < 1.0 {
            self.scale = (self.scale + APPEAR_SCALE_STEP).min(1.0);
        }
        let finished = match self.color_fade.as_mut() {
            Some(fade) => {
                let progress = ((now - fade.start) / fade.duration_ms).clamp(0.0, 1.0);
                fade.current = interpolate_color(&fade.from, &fade.to, progress);
                progress >= 1.0
            }
            None => false,
        };
        if finished {
            if let Some(fade) = self.color_fade.take() {
                self.color = fade.to;
            }
        }
    }

    pub fn start_color_fade(&mut self, target: &str, now: f64) {
        self.color_fade = Some(ColorFade {
            start: now,
            duration_ms: COLOR_FADE_MS,
            from: self.color.clone(),
            to: target.to_string(),
            current: self.color.clone(),
        });
    }

    /// Color to draw this frame.
    pub fn display_color(&self) -> &str {
        match &self.color_fade {
            Some(fade) => &fade.current,
            None => &self.color,
        }
    }

    pub fn attach(&mut self, particle: ParticleId) {
        if !self.accumulated.contains(&particle) {
            self.accumulated.push(particle);
        }
    }

    /// Grid cell for the accumulated event at `slot`, bottom-up inside the
    /// block. `None` when the block is too narrow for even one column.
    pub fn accumulated_slot(&self, slot: usize) -> Option<Point> {
        let per_row = ((self.bounds.width - GRID_INSET * 2.0) / GRID_SPACING).floor();
        if !per_row.is_finite() || per_row < 1.0 {
            return None;
        }
        let per_row = per_row as usize;
        let row = (slot / per_row) as f64;
        let col = (slot % per_row) as f64;
        Some(Point::new(
            self.bounds.x + GRID_INSET + col * GRID_SPACING,
            self.bounds.y + self.bounds.height - GRID_INSET - row * GRID_ROW_HEIGHT,
        ))
    }

    pub(crate) fn shift_timestamps(&mut self, delta: f64) {
        if let Some(fade) = self.color_fade.as_mut() {
            fade.start += delta;
        }
    }
}

// ─── Chain ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chain {
    pub id: ChainId,
    pub name: String,
    pub y: f64,
    pub cadence: Cadence,
    pub color: String,
    pub is_primary: bool,
    /// Next chain-local block index.
    pub counter: u64,
    /// Oldest first; pruned from the head.
    pub blocks: Vec<Block>,
    /// Wall-clock instant of the last append (cadence timer).
    pub last_block_time: f64,
    /// Logical end of the last closed block; start of the next one.
    pub last_block_end_time: f64,
}

impl Chain {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ChainId,
        name: &str,
        cadence: Cadence,
        y: f64,
        color: &str,
        is_primary: bool,
        now: f64,
        engine_time: f64,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            y,
            cadence,
            color: color.to_string(),
            is_primary,
            counter: 0,
            blocks: Vec::new(),
            last_block_time: now,
            last_block_end_time: engine_time,
        }
    }

    /// Ask the cadence whether a block is due; restarts the timer when it is.
    ///
    /// Fixed cadences keep their timer on the interval grid, so a late frame
    /// shifts one block, not every block after it.
    pub fn poll_cadence<R: Rng + ?Sized>(&mut self, now: f64, rng: &mut R) -> bool {
        let elapsed = now - self.last_block_time;
        if !self.cadence.poll(elapsed, rng) {
            return false;
        }
        self.last_block_time = match self.cadence {
            Cadence::Fixed { interval_ms } => now - elapsed % interval_ms,
            Cadence::Probability { .. } => now,
        };
        true
    }

    /// Close the current block at `engine_time` and append it.
    pub fn create_block(&mut self, engine_time: f64, block_height: f64) -> &mut Block {
        let index = self.counter;
        self.counter += 1;
        // Never let a block run backwards if the host clock stutters.
        let end = engine_time.max(self.last_block_end_time);
        let block = Block::new(self.id, index, self.last_block_end_time, end, self.y, block_height, &self.color);
        self.last_block_end_time = end;
        self.blocks.push(block);
        let last = self.blocks.len() - 1;
        &mut self.blocks[last]
    }

    pub fn block(&self, index: u64) -> Option<&Block> {
        self.blocks
            .binary_search_by_key(&index, |b| b.index)
            .ok()
            .map(|i| &self.blocks[i])
    }

    pub fn block_mut(&mut self, index: u64) -> Option<&mut Block> {
        match self.blocks.binary_search_by_key(&index, |b| b.index) {
            Ok(i) => Some(&mut self.blocks[i]),
            Err(_) => None,
        }
    }

    pub fn latest_block(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// Mark every unprocessed block whose end falls in `(start, end]` as
    /// processed and return their indices in insertion order.
    pub fn take_closed_within(&mut self, start: f64, end: f64) -> Vec<u64> {
        self.blocks
            .iter_mut()
            .filter(|b| !b.events_processed && b.end_time > start && b.end_time <= end)
            .map(|b| {
                b.events_processed = true;
                b.index
            })
            .collect()
    }

    pub fn layout_blocks(&mut self, timeline: &Timeline, engine_time: f64, now: f64) {
        let y = self.y;
        for block in &mut self.blocks {
            block.layout(timeline, engine_time, y);
            block.update(now);
        }
    }

    /// Drop blocks whose right edge has scrolled `margin` px past the left
    /// edge of the screen. Returns what was dropped.
    pub fn prune(&mut self, margin: f64) -> Vec<Block> {
        let keep_from = self
            .blocks
            .iter()
            .position(|b| b.bounds.x >= -b.bounds.width - margin)
            .unwrap_or(self.blocks.len());
        self.blocks.drain(..keep_from).collect()
    }

    pub(crate) fn shift_timestamps(&mut self, delta: f64) {
        self.last_block_time += delta;
        for block in &mut self.blocks {
            block.shift_timestamps(delta);
        }
    }
}

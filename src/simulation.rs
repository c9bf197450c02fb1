// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Chain Merge Visualizer - Simulation Core

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::action::{self, Action, ActionState};
use crate::cadence::Cadence;
use crate::chain::{Block, Chain};
use crate::config::{ChainPreset, EngineConfig};
use crate::device::{Batcher, DevicePool};
use crate::error::{EngineError, Result};
use crate::events;
use crate::particle::{
    ChainBoundParticle, EventParticle, ParticleSnapshot, ProcessedEvent, RequestParticle,
    RequestSource, TargetKind, TravelState, TravelStep,
};
use crate::processor::BlockProcessor;
use crate::scheduler::{DelayedQueue, Deferred};
use crate::table::TableSet;
use crate::timeline::Timeline;
use crate::types::*;

pub const PRIMARY_CHAIN_ID: ChainId = ChainId(0);

/// Running totals since construction, for reports.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunTotals {
    pub blocks_appended: u64,
    pub blocks_merged: u64,
    pub actions_created: u64,
    pub actions_dispatched: u64,
    pub rows_inserted: u64,
    pub blocks_pruned: u64,
}

// ─── MergeSimulation struct ──────────────────────────────────────────────────

#[wasm_bindgen]
pub struct MergeSimulation {
    pub(crate) config: EngineConfig,
    pub(crate) rng: ChaCha8Rng,
    pub(crate) timeline: Timeline,

    pub(crate) chains: Vec<Chain>,
    pub(crate) tables: TableSet,
    pub(crate) actions: Vec<Action>,

    pub(crate) processed: Vec<ProcessedEvent>,
    pub(crate) event_particles: Vec<EventParticle>,
    pub(crate) requests: Vec<RequestParticle>,
    pub(crate) chain_bound: Vec<ChainBoundParticle>,

    pub(crate) devices: DevicePool,
    pub(crate) batcher: Batcher,
    pub(crate) processor: BlockProcessor,
    pub(crate) queue: DelayedQueue,

    /// Wall-clock instant engine time is measured from.
    pub(crate) engine_start: f64,
    pub(crate) paused_at: Option<f64>,
    pub(crate) last_now: f64,

    /// Shared across every merge; wraps around the palette.
    pub(crate) merge_color_index: usize,
    pub(crate) next_chain_id: u32,
    pub(crate) next_action_id: u64,
    pub(crate) next_particle_id: u64,

    pub(crate) totals: RunTotals,
}

// ─── Internal Logic (Testable, pure Rust) ────────────────────────────────────

impl MergeSimulation {
    /// Build an engine whose clock starts at wall instant `now`.
    pub fn with_config(config: EngineConfig, now: f64) -> Result<Self> {
        config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let timeline = Timeline::new(config.now_pixel(), config.layout.pixels_per_second);

        let primary = Chain::new(
            PRIMARY_CHAIN_ID,
            &config.primary_chain_name,
            Cadence::fixed(config.primary_interval_ms)?,
            config.layout.chain_start_y,
            &config.primary_color,
            true,
            now,
            0.0,
        );
        let devices = DevicePool::new(&mut rng, &config.canvas, &config.devices, &config.random, now);

        let mut queue = DelayedQueue::new();
        for preset in &config.presets {
            queue.schedule(now + preset.at_ms, Deferred::AddChain(preset.clone()));
        }

        tracing::info!(
            seed = config.seed,
            presets = config.presets.len(),
            devices = devices.len(),
            "engine started"
        );

        Ok(Self {
            tables: TableSet::new(&config.table),
            batcher: Batcher::new(&config.canvas, &config.devices),
            processor: BlockProcessor::new(timeline.now_pixel, &config.processor),
            chains: vec![primary],
            actions: Vec::new(),
            processed: Vec::new(),
            event_particles: Vec::new(),
            requests: Vec::new(),
            chain_bound: Vec::new(),
            devices,
            queue,
            engine_start: now,
            paused_at: None,
            last_now: now,
            merge_color_index: 0,
            next_chain_id: 1,
            next_action_id: 0,
            next_particle_id: 0,
            totals: RunTotals::default(),
            config,
            rng,
            timeline,
        })
    }

    /// The wall instant the engine considers current: frozen while paused.
    fn clock(&self, now: f64) -> f64 {
        self.paused_at.unwrap_or(now)
    }

    pub fn engine_time(&self, now: f64) -> f64 {
        self.clock(now) - self.engine_start
    }

    pub fn tick_core(&mut self, now: f64) -> TickResult {
        if let Some(paused_at) = self.paused_at {
            return TickResult {
                engine_time_ms: paused_at - self.engine_start,
                paused: true,
                ..TickResult::default()
            };
        }
        self.last_now = now;
        let engine_time = now - self.engine_start;
        let mut result = TickResult { engine_time_ms: engine_time, ..TickResult::default() };

        // 1. Deferred work that came due
        for task in self.queue.drain_due(now) {
            self.run_deferred(task, now);
        }

        // 2. Cadence: every chain first, so the merge scan sees this tick's blocks
        let mut primary_blocks = Vec::new();
        for i in 0..self.chains.len() {
            if !self.chains[i].poll_cadence(now, &mut self.rng) {
                continue;
            }
            let (start, end) = self.append_block(i, engine_time, now);
            result.blocks_appended += 1;
            if self.chains[i].is_primary {
                primary_blocks.push((start, end));
            }
        }

        // 3. Merge recently closed secondary blocks into the primary chain
        for (start, end) in primary_blocks {
            let (merged, created) = self.merge_window(start, end, engine_time, now);
            result.blocks_merged += merged;
            result.actions_created += created;
        }

        // 4. Time-to-screen layout, then prune what scrolled off
        for chain in &mut self.chains {
            chain.layout_blocks(&self.timeline, engine_time, now);
            result.blocks_pruned += chain.prune(self.config.layout.prune_margin).len() as u32;
        }
        self.processor.update(now, self.config.processor.highlight_ms);

        // 5. Actions
        let (dispatched, rows) = self.update_actions(engine_time, now);
        result.actions_dispatched = dispatched;
        result.rows_inserted = rows;

        // 6. Particles
        self.update_processed_events(now);
        self.update_event_particles(now);
        self.update_traffic(now);
        self.update_chain_bound(now);

        // 7. Table blink
        self.tables.update_blinking(now, self.config.table.blink_duration_ms);

        self.totals.blocks_appended += result.blocks_appended as u64;
        self.totals.blocks_merged += result.blocks_merged as u64;
        self.totals.actions_created += result.actions_created as u64;
        self.totals.actions_dispatched += result.actions_dispatched as u64;
        self.totals.rows_inserted += result.rows_inserted as u64;
        self.totals.blocks_pruned += result.blocks_pruned as u64;
        result
    }

    fn run_deferred(&mut self, task: Deferred, now: f64) {
        match task {
            Deferred::SpawnEventParticle { action, block, color } => {
                let live = self.actions.iter().any(|a| a.id == action && a.is_live());
                let start = find_block(&self.chains, block).map(Block::center);
                if let (true, Some(start)) = (live, start) {
                    let id = self.next_particle_id();
                    let travel = self.config.action.particle_travel_ms;
                    self.event_particles
                        .push(EventParticle::new(id, action, start, &color, now, travel));
                }
            }
            Deferred::AddChain(preset) => self.apply_preset(preset, now),
        }
    }

    fn apply_preset(&mut self, preset: ChainPreset, now: f64) {
        match self.insert_chain(&preset.name, preset.cadence, now) {
            Ok(id) => tracing::info!(chain = %preset.name, %id, "preset chain added"),
            Err(err) => tracing::warn!(chain = %preset.name, %err, "preset chain skipped"),
        }
    }

    /// Close a block on chain `i`. Returns its logical span.
    fn append_block(&mut self, i: usize, engine_time: f64, now: f64) -> (f64, f64) {
        let chain_id = self.chains[i].id;
        let is_primary = self.chains[i].is_primary;
        let name = self.chains[i].name.clone();

        let absorbed: Vec<DomainEvent> = self
            .chain_bound
            .iter_mut()
            .filter(|p| p.chain == chain_id && p.is_waiting())
            .map(|p| p.absorb())
            .collect();

        let block = self.chains[i].create_block(engine_time, self.config.layout.block_height);
        block.events.extend(absorbed);
        if !is_primary
            && events::block_carries_event(
                &mut self.rng,
                block.duration(),
                self.config.random.block_event_threshold_ms,
            )
        {
            block
                .events
                .push(events::generate_event(&mut self.rng, &name, now, &self.config.random));
        }
        tracing::debug!(
            chain = %name,
            index = block.index,
            start = block.start_time,
            end = block.end_time,
            events = block.events.len(),
            "block appended"
        );
        (block.start_time, block.end_time)
    }

    /// Pull every unprocessed secondary block closed within `(start, end]`
    /// into the primary chain. Returns (blocks merged, actions created).
    fn merge_window(&mut self, start: f64, end: f64, engine_time: f64, now: f64) -> (u32, u32) {
        let mut merged_refs = Vec::new();
        for chain in self.chains.iter_mut().filter(|c| !c.is_primary) {
            for index in chain.take_closed_within(start, end) {
                merged_refs.push(BlockRef { chain: chain.id, index });
            }
        }

        let mut created = 0;
        for block_ref in &merged_refs {
            let palette = &self.config.merge_palette;
            let color = palette[self.merge_color_index % palette.len()].clone();
            self.merge_color_index = (self.merge_color_index + 1) % palette.len();

            let Some(block) = find_block_mut(&mut self.chains, *block_ref) else {
                continue;
            };
            block.start_color_fade(&color, now);
            let carried = block.events.clone();

            for (i, event) in carried.into_iter().enumerate() {
                let delay = self.config.random.action_creation_delay.sample(&mut self.rng);
                let id = self.next_action_id();
                let particle_color = self.config.event_colors.for_type(event.event_type()).to_string();
                self.actions.push(Action::new(
                    id,
                    *block_ref,
                    event,
                    engine_time + delay,
                    self.config.layout.action_size,
                ));
                self.queue.schedule(
                    now + i as f64 * self.config.action.particle_stagger_ms,
                    Deferred::SpawnEventParticle { action: id, block: *block_ref, color: particle_color },
                );
                created += 1;
            }
        }
        if !merged_refs.is_empty() {
            tracing::debug!(blocks = merged_refs.len(), actions = created, "merged into primary");
        }
        (merged_refs.len() as u32, created)
    }

    fn update_actions(&mut self, engine_time: f64, now: f64) -> (u32, u32) {
        let row_y = self.config.layout.action_y;
        let wait = self.config.action.wait_at_now_ms;
        let ready: Vec<ActionId> = self
            .actions
            .iter_mut()
            .filter_map(|a| a.update(now, engine_time, &self.timeline, row_y, wait).then_some(a.id))
            .collect();

        let mut dispatched = 0;
        let mut rows = 0;
        for id in ready {
            if let Some(wrote_row) = self.dispatch_action(id, now) {
                dispatched += 1;
                rows += wrote_row as u32;
            }
        }
        self.actions.retain(Action::is_live);
        (dispatched, rows)
    }

    /// Route an action's event to a table and the primary chain, write the
    /// table row right away, and retire the action. Returns whether a row
    /// was written, or `None` if the action is gone.
    fn dispatch_action(&mut self, id: ActionId, now: f64) -> Option<bool> {
        let pos = self.actions.iter().position(|a| a.id == id && a.is_live())?;
        let event = self.actions[pos].event.clone();
        let start = self.actions[pos].position;
        let color = self.config.event_colors.for_type(event.event_type()).to_string();

        let kinds = self.tables.kinds();
        let destination = action::destination_table(std::slice::from_ref(&event), &kinds, &mut self.rng);
        let mut wrote_row = false;
        if let Some(kind) = destination {
            if let Some(center) = self.tables.get(kind).map(|t| t.center()) {
                let pid = self.next_particle_id();
                self.processed.push(ProcessedEvent::new(
                    pid,
                    event.clone(),
                    TargetKind::Table(kind),
                    start,
                    &self.processor,
                    center,
                    self.config.processor.table_segments_ms,
                    &color,
                    now,
                ));
            }
            wrote_row = self.tables.insert_into(kind, &event, now);
        }

        let latest = self.primary_chain().and_then(Chain::latest_block).map(|b| (b.block_ref(), b.center()));
        if let Some((block_ref, center)) = latest {
            let pid = self.next_particle_id();
            self.processed.push(ProcessedEvent::new(
                pid,
                event.clone(),
                TargetKind::Block(block_ref),
                start,
                &self.processor,
                center,
                self.config.processor.block_segments_ms,
                &color,
                now,
            ));
        }

        self.actions[pos].retire();
        tracing::debug!(
            action = id.0,
            event = %event.event_type(),
            table = destination.map(|k| k.key()),
            "action dispatched"
        );
        Some(wrote_row)
    }

    fn update_processed_events(&mut self, now: f64) {
        let mut entered_processor = false;
        let mut arrivals = Vec::new();
        for pe in self.processed.iter_mut().filter(|p| p.is_traveling()) {
            let destination = match pe.target {
                TargetKind::Block(r) => find_block(&self.chains, r).map(Block::center),
                TargetKind::Table(k) => self.tables.get(k).map(|t| t.center()),
            };
            match pe.update(now, destination) {
                TravelStep::EnteredProcessor => entered_processor = true,
                TravelStep::Arrived => {
                    if let TargetKind::Block(r) = pe.target {
                        arrivals.push((r, pe.id));
                    }
                }
                TravelStep::Lost => tracing::debug!(particle = pe.id.0, "processed event lost its target"),
                TravelStep::Moving => {}
            }
        }
        if entered_processor {
            self.processor.trigger_highlight(&mut self.rng, now);
        }
        for (block_ref, id) in arrivals {
            if let Some(block) = find_block_mut(&mut self.chains, block_ref) {
                block.attach(id);
            }
        }

        // Lay accumulated events out on their blocks; pruned blocks drop theirs.
        let mut slots: HashMap<ParticleId, Option<Point>> = HashMap::new();
        for block in self.chains.iter().flat_map(|c| c.blocks.iter()) {
            for (slot, id) in block.accumulated.iter().enumerate() {
                slots.insert(*id, block.accumulated_slot(slot));
            }
        }
        for pe in self.processed.iter_mut().filter(|p| p.state == TravelState::Attached) {
            match slots.get(&pe.id) {
                Some(Some(point)) => pe.position = *point,
                Some(None) => {}
                None => pe.retire(),
            }
        }
        self.processed.retain(|p| p.state != TravelState::Retired);
    }

    fn update_event_particles(&mut self, now: f64) {
        let positions: HashMap<ActionId, Point> = self.actions.iter().map(|a| (a.id, a.position)).collect();
        for particle in &mut self.event_particles {
            particle.update(now, positions.get(&particle.action).copied());
        }
        self.event_particles.retain(|p| p.active);
    }

    /// Devices, processor pings and the batcher.
    fn update_traffic(&mut self, now: f64) {
        self.devices.lifecycle(
            &mut self.rng,
            &self.config.canvas,
            &self.config.devices,
            &self.config.random,
            now,
        );
        let batcher_center = self.batcher.center();
        let travel = self.config.devices.request_travel_ms;
        let sending = self.devices.update(
            &mut self.rng,
            now,
            self.config.devices.fade_ms,
            &self.config.random.device_request_interval,
        );
        for (device, position) in sending {
            if self.rng.gen::<f64>() < self.config.random.device_direct_chain_chance
                && self.send_to_random_chain(position, now)
            {
                continue;
            }
            let id = self.next_particle_id();
            self.requests.push(RequestParticle::new(
                id,
                RequestSource::Device(device),
                position,
                batcher_center,
                now,
                travel,
            ));
        }

        if self.rng.gen::<f64>() < self.config.random.processor_to_batcher_chance {
            let id = self.next_particle_id();
            let start = self.processor.center();
            self.requests
                .push(RequestParticle::new(id, RequestSource::Processor, start, batcher_center, now, travel));
        }

        let mut received = 0;
        for request in &mut self.requests {
            if request.update(now) {
                received += 1;
            }
        }
        self.requests.retain(|r| r.active);
        for _ in 0..received {
            self.batcher.receive_request(now);
            self.send_to_random_chain(batcher_center, now);
        }
    }

    /// Launch a generated event from `start` to a random secondary chain's
    /// wait point. Returns false when there is no secondary chain.
    fn send_to_random_chain(&mut self, start: Point, now: f64) -> bool {
        let secondary: Vec<usize> = self
            .chains
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_primary)
            .map(|(i, _)| i)
            .collect();
        if secondary.is_empty() {
            return false;
        }
        let chain = &self.chains[secondary[self.rng.gen_range(0..secondary.len())]];
        let (chain_id, name) = (chain.id, chain.name.clone());
        let event = events::generate_event(&mut self.rng, &name, now, &self.config.random);
        let color = self.config.event_colors.for_type(event.event_type()).to_string();
        let id = self.next_particle_id();
        self.chain_bound.push(ChainBoundParticle::new(
            id,
            chain_id,
            event,
            start,
            &color,
            now,
            self.config.devices.chain_particle_travel_ms,
        ));
        true
    }

    fn update_chain_bound(&mut self, now: f64) {
        let wait_points: HashMap<ChainId, Point> =
            self.chains.iter().map(|c| (c.id, self.wait_point(c))).collect();
        for particle in &mut self.chain_bound {
            particle.update(now, wait_points.get(&particle.chain).copied());
        }
        self.chain_bound.retain(ChainBoundParticle::is_live);
    }

    /// Parking spot just right of the now-line on `chain`'s row.
    fn wait_point(&self, chain: &Chain) -> Point {
        Point::new(
            self.timeline.now_pixel + self.config.layout.wait_offset,
            chain.y + self.config.layout.block_height / 2.0,
        )
    }

    fn next_action_id(&mut self) -> ActionId {
        self.next_action_id += 1;
        ActionId(self.next_action_id)
    }

    fn next_particle_id(&mut self) -> ParticleId {
        self.next_particle_id += 1;
        ParticleId(self.next_particle_id)
    }

    fn chain_row(&self, position: usize) -> f64 {
        self.config.layout.chain_start_y + position as f64 * self.config.layout.chain_spacing
    }

    fn repack_rows(&mut self) {
        let ys: Vec<f64> = (0..self.chains.len()).map(|i| self.chain_row(i)).collect();
        for (chain, y) in self.chains.iter_mut().zip(ys) {
            chain.y = y;
        }
    }

    // ─── Chain management ────────────────────────────────────────────────────

    /// Add a secondary chain. Its first block starts at the current engine
    /// time so it never spans time the chain did not exist for.
    pub fn insert_chain(&mut self, name: &str, cadence: Cadence, now: f64) -> Result<ChainId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::EmptyChainName);
        }
        cadence.validate()?;
        let lowered = name.to_lowercase();
        if self.chains.iter().any(|c| c.name.to_lowercase() == lowered) {
            return Err(EngineError::DuplicateChain(name.to_string()));
        }

        let id = ChainId(self.next_chain_id);
        self.next_chain_id += 1;
        let label = cadence.label();
        let chain = Chain::new(
            id,
            name,
            cadence,
            self.chain_row(self.chains.len()),
            &self.config.secondary_color,
            false,
            self.clock(now),
            self.engine_time(now),
        );
        self.chains.push(chain);
        tracing::info!(chain = %name, %id, cadence = %label, "chain added");
        Ok(id)
    }

    pub fn remove_chain_core(&mut self, id: ChainId) -> Result<()> {
        let pos = self
            .chains
            .iter()
            .position(|c| c.id == id)
            .ok_or(EngineError::UnknownChain(id.0))?;
        if self.chains[pos].is_primary {
            return Err(EngineError::PrimaryChainImmutable);
        }
        let chain = self.chains.remove(pos);
        self.forget_chain(id);
        self.repack_rows();
        tracing::info!(chain = %chain.name, %id, "chain removed");
        Ok(())
    }

    /// Drop every secondary chain. Returns how many were removed.
    pub fn clear_secondary_chains(&mut self) -> usize {
        let removed: Vec<ChainId> = self.chains.iter().filter(|c| !c.is_primary).map(|c| c.id).collect();
        self.chains.retain(|c| c.is_primary);
        for id in &removed {
            self.forget_chain(*id);
        }
        self.repack_rows();
        tracing::info!(removed = removed.len(), "secondary chains cleared");
        removed.len()
    }

    fn forget_chain(&mut self, id: ChainId) {
        self.queue.retain(|task| match task {
            Deferred::SpawnEventParticle { block, .. } => block.chain != id,
            Deferred::AddChain(_) => true,
        });
    }

    // ─── Pause / resume ──────────────────────────────────────────────────────

    pub fn pause_at(&mut self, now: f64) -> Result<()> {
        if self.paused_at.is_some() {
            return Err(EngineError::AlreadyPaused);
        }
        self.paused_at = Some(now);
        tracing::info!(engine_time = now - self.engine_start, "paused");
        Ok(())
    }

    /// Resume and shift every held wall timestamp by the pause length, which
    /// is returned.
    pub fn resume_at(&mut self, now: f64) -> Result<f64> {
        let paused_at = self.paused_at.take().ok_or(EngineError::NotPaused)?;
        let delta = (now - paused_at).max(0.0);
        self.shift_timestamps(delta);
        self.last_now = now;
        tracing::info!(paused_ms = delta, "resumed");
        Ok(delta)
    }

    /// Returns true if the engine is paused afterwards.
    pub fn toggle_pause_at(&mut self, now: f64) -> bool {
        if self.paused_at.is_some() {
            let _ = self.resume_at(now);
            false
        } else {
            let _ = self.pause_at(now);
            true
        }
    }

    fn shift_timestamps(&mut self, delta: f64) {
        self.engine_start += delta;
        for chain in &mut self.chains {
            chain.shift_timestamps(delta);
        }
        self.tables.shift_timestamps(delta);
        for a in &mut self.actions {
            a.shift_timestamps(delta);
        }
        for p in &mut self.processed {
            p.shift_timestamps(delta);
        }
        for p in &mut self.event_particles {
            p.shift_timestamps(delta);
        }
        for p in &mut self.requests {
            p.shift_timestamps(delta);
        }
        for p in &mut self.chain_bound {
            p.shift_timestamps(delta);
        }
        self.devices.shift_timestamps(delta);
        self.batcher.shift_timestamps(delta);
        self.processor.shift_timestamps(delta);
        self.queue.shift_timestamps(delta);
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    // ─── Config / reset ──────────────────────────────────────────────────────

    /// Swap in a new config. Live entities keep their state; layout and
    /// future random draws follow the new values.
    pub fn replace_config(&mut self, config: EngineConfig) -> Result<()> {
        config.validate()?;
        self.timeline = Timeline::new(config.now_pixel(), config.layout.pixels_per_second);
        self.processor = BlockProcessor::new(self.timeline.now_pixel, &config.processor);
        self.batcher.bounds = Batcher::new(&config.canvas, &config.devices).bounds;
        self.config = config;
        self.repack_rows();
        tracing::info!("config replaced");
        Ok(())
    }

    /// Rebuild from the current config with the clock restarting at `now`.
    pub fn reset_at(&mut self, now: f64) -> Result<()> {
        *self = Self::with_config(self.config.clone(), now)?;
        tracing::info!("engine reset");
        Ok(())
    }

    // ─── Read-only access ────────────────────────────────────────────────────

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    pub fn chain(&self, id: ChainId) -> Option<&Chain> {
        self.chains.iter().find(|c| c.id == id)
    }

    pub fn chain_by_name(&self, name: &str) -> Option<&Chain> {
        self.chains.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn primary_chain(&self) -> Option<&Chain> {
        self.chains.iter().find(|c| c.is_primary)
    }

    pub fn block(&self, block: BlockRef) -> Option<&Block> {
        find_block(&self.chains, block)
    }

    pub fn tables(&self) -> &TableSet {
        &self.tables
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn processed_events(&self) -> &[ProcessedEvent] {
        &self.processed
    }

    pub fn event_particles(&self) -> &[EventParticle] {
        &self.event_particles
    }

    pub fn request_particles(&self) -> &[RequestParticle] {
        &self.requests
    }

    pub fn chain_bound_particles(&self) -> &[ChainBoundParticle] {
        &self.chain_bound
    }

    pub fn particles(&self) -> ParticleSnapshot {
        ParticleSnapshot {
            processed: self.processed.clone(),
            events: self.event_particles.clone(),
            requests: self.requests.clone(),
            chain_bound: self.chain_bound.clone(),
        }
    }

    pub fn devices(&self) -> &DevicePool {
        &self.devices
    }

    pub fn batcher(&self) -> &Batcher {
        &self.batcher
    }

    pub fn processor(&self) -> &BlockProcessor {
        &self.processor
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn pending_tasks(&self) -> usize {
        self.queue.len()
    }

    pub fn totals(&self) -> &RunTotals {
        &self.totals
    }

    pub fn status(&self) -> EngineStatus {
        let moving = self.event_particles.iter().filter(|p| !p.arrived).count();
        EngineStatus {
            engine_time_ms: self.engine_time(self.last_now),
            paused: self.is_paused(),
            chains: self
                .chains
                .iter()
                .map(|c| ChainStatus {
                    id: c.id,
                    name: c.name.clone(),
                    timing_label: c.cadence.label(),
                    block_count: c.blocks.len(),
                    blocks_created: c.counter,
                })
                .collect(),
            table_count: self.tables.len(),
            last_updated_table: self.tables.most_recent().map(|t| t.name.clone()),
            moving_particles: moving,
            particles_at_actions: self.event_particles.len() - moving,
            scheduled_actions: self.actions.iter().filter(|a| a.state == ActionState::Scheduled).count(),
            waiting_actions: self
                .actions
                .iter()
                .filter(|a| a.state == ActionState::WaitingAtNow)
                .count(),
            processed_in_flight: self.processed.iter().filter(|p| p.is_traveling()).count(),
            accumulated_events: self
                .processed
                .iter()
                .filter(|p| p.state == TravelState::Attached)
                .count(),
            chain_bound_particles: self.chain_bound.len(),
            batcher_requests: self.batcher.request_count,
            device_count: self.devices.len(),
        }
    }
}

fn find_block(chains: &[Chain], block: BlockRef) -> Option<&Block> {
    chains.iter().find(|c| c.id == block.chain)?.block(block.index)
}

fn find_block_mut(chains: &mut [Chain], block: BlockRef) -> Option<&mut Block> {
    chains.iter_mut().find(|c| c.id == block.chain)?.block_mut(block.index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet(now: f64) -> MergeSimulation {
        MergeSimulation::with_config(EngineConfig::quiet(), now).expect("test: quiet config")
    }

    #[test]
    fn starts_with_primary_chain_only() {
        let sim = quiet(0.0);
        assert_eq!(sim.chains().len(), 1);
        let primary = sim.primary_chain().expect("test: primary");
        assert_eq!(primary.id, PRIMARY_CHAIN_ID);
        assert_eq!(primary.name, "Paima Engine");
        assert_eq!(primary.y, 400.0);
        assert_eq!(sim.tables().len(), 4);
    }

    #[test]
    fn rejects_invalid_config() {
        let mut config = EngineConfig::quiet();
        config.table.max_rows = 0;
        assert!(MergeSimulation::with_config(config, 0.0).is_err());
    }

    #[test]
    fn chain_rows_repack_after_removal() {
        let mut sim = quiet(0.0);
        let a = sim.insert_chain("A", Cadence::fixed(500.0).expect("test"), 0.0).expect("test");
        let b = sim.insert_chain("B", Cadence::fixed(500.0).expect("test"), 0.0).expect("test");
        assert_eq!(sim.chain(b).map(|c| c.y), Some(560.0));
        sim.remove_chain_core(a).expect("test: remove");
        assert_eq!(sim.chain(b).map(|c| c.y), Some(480.0));
        assert_eq!(sim.clear_secondary_chains(), 1);
        assert_eq!(sim.chains().len(), 1);
    }

    #[test]
    fn late_chain_starts_at_current_engine_time() {
        let mut sim = quiet(1_000.0);
        sim.tick_core(4_000.0);
        let id = sim.insert_chain("Late", Cadence::fixed(250.0).expect("test"), 4_000.0).expect("test");
        assert_eq!(sim.chain(id).map(|c| c.last_block_end_time), Some(3_000.0));
        sim.tick_core(4_250.0);
        let block = sim.chain(id).and_then(Chain::latest_block).expect("test: block");
        assert_eq!((block.start_time, block.end_time), (3_000.0, 3_250.0));
    }

    #[test]
    fn paused_tick_is_inert() {
        let mut sim = quiet(0.0);
        sim.pause_at(500.0).expect("test: pause");
        let result = sim.tick_core(5_000.0);
        assert!(result.paused);
        assert_eq!(result.engine_time_ms, 500.0);
        assert_eq!(result.blocks_appended, 0);
        assert_eq!(sim.pause_at(600.0), Err(EngineError::AlreadyPaused));
        assert_eq!(sim.resume_at(5_500.0), Ok(5_000.0));
        assert_eq!(sim.resume_at(5_600.0), Err(EngineError::NotPaused));
        assert_eq!(sim.engine_time(5_500.0), 500.0);
    }

    #[test]
    fn toggle_flips_state() {
        let mut sim = quiet(0.0);
        assert!(sim.toggle_pause_at(10.0));
        assert!(sim.is_paused());
        assert!(!sim.toggle_pause_at(20.0));
        assert!(!sim.is_paused());
    }

    #[test]
    fn presets_arrive_through_the_queue() {
        let mut config = EngineConfig::quiet();
        config.presets = crate::config::default_presets();
        let mut sim = MergeSimulation::with_config(config, 0.0).expect("test: config");
        assert_eq!(sim.pending_tasks(), 5);
        sim.tick_core(3_499.0);
        assert_eq!(sim.chains().len(), 1);
        sim.tick_core(3_500.0);
        assert!(sim.chain_by_name("arbitrum").is_some());
        sim.tick_core(12_000.0);
        assert_eq!(sim.chains().len(), 6);
        // Particles from this tick's merge may still be queued; no preset is.
        let mut leftover_presets = 0;
        sim.queue.retain(|task| {
            if matches!(task, Deferred::AddChain(_)) {
                leftover_presets += 1;
            }
            true
        });
        assert_eq!(leftover_presets, 0);
    }

    #[test]
    fn reset_restores_a_fresh_engine() {
        let mut sim = quiet(0.0);
        sim.insert_chain("A", Cadence::fixed(500.0).expect("test"), 0.0).expect("test");
        sim.tick_core(2_000.0);
        sim.reset_at(10_000.0).expect("test: reset");
        assert_eq!(sim.chains().len(), 1);
        assert_eq!(sim.engine_time(10_000.0), 0.0);
        assert_eq!(sim.totals().blocks_appended, 0);
    }

    #[test]
    fn replace_config_moves_rows() {
        let mut sim = quiet(0.0);
        let id = sim.insert_chain("A", Cadence::fixed(500.0).expect("test"), 0.0).expect("test");
        let mut config = EngineConfig::quiet();
        config.layout.chain_spacing = 100.0;
        sim.replace_config(config).expect("test: valid");
        assert_eq!(sim.chain(id).map(|c| c.y), Some(500.0));
        let mut bad = EngineConfig::quiet();
        bad.merge_palette.clear();
        assert!(sim.replace_config(bad).is_err());
    }
}

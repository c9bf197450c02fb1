// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Chain Merge Visualizer - Particles
//
// Every particle here is addressed by the engine through ids and relations.
// Each `update` takes the freshly resolved target position; `None` means the
// target is gone and the particle retires itself.

use serde::{Deserialize, Serialize};

use crate::processor::BlockProcessor;
use crate::table::TableKind;
use crate::types::{ActionId, BlockRef, ChainId, DeviceId, DomainEvent, ParticleId, Point};

pub fn ease_out_cubic(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(3)
}

pub fn ease_out_quad(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(2)
}

/// Linear progress in `[0, 1]`; a non-positive duration counts as done.
fn progress(now: f64, start: f64, duration_ms: f64) -> f64 {
    if duration_ms <= 0.0 {
        return 1.0;
    }
    ((now - start) / duration_ms).clamp(0.0, 1.0)
}

// ─── ProcessedEvent ─────────────────────────────────────────────────────────

/// Where a processed event is headed, resolved once at spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum TargetKind {
    Block(BlockRef),
    Table(TableKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelState {
    Traveling,
    /// Riding on its target block as an accumulated event.
    Attached,
    Retired,
}

/// What happened to a processed event during one update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelStep {
    Moving,
    /// The first segment (into the processor) just completed.
    EnteredProcessor,
    Arrived,
    Lost,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedEvent {
    pub id: ParticleId,
    pub event: DomainEvent,
    pub target: TargetKind,
    /// start, processor centre, exit, destination
    pub path: [Point; 4],
    pub segments_ms: [f64; 3],
    pub segment: usize,
    pub segment_start: f64,
    pub position: Point,
    pub state: TravelState,
    pub color: String,
}

impl ProcessedEvent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ParticleId,
        event: DomainEvent,
        target: TargetKind,
        start: Point,
        processor: &BlockProcessor,
        destination: Point,
        segments_ms: [f64; 3],
        color: &str,
        now: f64,
    ) -> Self {
        let exit = match target {
            TargetKind::Block(_) => processor.bottom_exit(),
            TargetKind::Table(_) => processor.left_exit(),
        };
        Self {
            id,
            event,
            target,
            path: [start, processor.center(), exit, destination],
            segments_ms,
            segment: 0,
            segment_start: now,
            position: start,
            state: TravelState::Traveling,
            color: color.to_string(),
        }
    }

    pub fn is_traveling(&self) -> bool {
        self.state == TravelState::Traveling
    }

    /// Advance along the path. `destination` is re-read every frame so a
    /// block-bound event follows its moving block.
    pub fn update(&mut self, now: f64, destination: Option<Point>) -> TravelStep {
        if self.state != TravelState::Traveling {
            return TravelStep::Moving;
        }
        let Some(destination) = destination else {
            self.state = TravelState::Retired;
            return TravelStep::Lost;
        };
        self.path[3] = destination;

        let mut step = TravelStep::Moving;
        while self.segment < self.segments_ms.len() {
            let duration = self.segments_ms[self.segment];
            let t = progress(now, self.segment_start, duration);
            if t < 1.0 {
                self.position = self.path[self.segment].lerp(self.path[self.segment + 1], t);
                return step;
            }
            self.segment_start += duration.max(0.0);
            self.segment += 1;
            if self.segment == 1 {
                step = TravelStep::EnteredProcessor;
            }
        }

        self.position = destination;
        self.state = match self.target {
            TargetKind::Block(_) => TravelState::Attached,
            TargetKind::Table(_) => TravelState::Retired,
        };
        TravelStep::Arrived
    }

    pub fn retire(&mut self) {
        self.state = TravelState::Retired;
    }

    pub(crate) fn shift_timestamps(&mut self, delta: f64) {
        self.segment_start += delta;
    }
}

// ─── EventParticle ──────────────────────────────────────────────────────────

/// Carries one event of a merged block up to the action created for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventParticle {
    pub id: ParticleId,
    pub action: ActionId,
    pub start: Point,
    pub start_time: f64,
    pub duration_ms: f64,
    pub position: Point,
    pub color: String,
    pub arrived: bool,
    pub active: bool,
}

impl EventParticle {
    pub fn new(id: ParticleId, action: ActionId, start: Point, color: &str, now: f64, duration_ms: f64) -> Self {
        Self {
            id,
            action,
            start,
            start_time: now,
            duration_ms,
            position: start,
            color: color.to_string(),
            arrived: false,
            active: true,
        }
    }

    /// Ease towards the action, then stick to it. Retires once the action
    /// no longer exists.
    pub fn update(&mut self, now: f64, action_position: Option<Point>) {
        if !self.active {
            return;
        }
        let Some(target) = action_position else {
            self.active = false;
            return;
        };
        let t = progress(now, self.start_time, self.duration_ms);
        self.position = self.start.lerp(target, ease_out_cubic(t));
        if t >= 1.0 {
            self.arrived = true;
        }
    }

    pub(crate) fn shift_timestamps(&mut self, delta: f64) {
        self.start_time += delta;
    }
}

// ─── RequestParticle ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RequestSource {
    Device(DeviceId),
    Processor,
}

/// A user or processor request travelling to the batcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestParticle {
    pub id: ParticleId,
    pub source: RequestSource,
    pub start: Point,
    pub end: Point,
    pub start_time: f64,
    pub duration_ms: f64,
    pub position: Point,
    pub active: bool,
}

impl RequestParticle {
    pub fn new(id: ParticleId, source: RequestSource, start: Point, end: Point, now: f64, duration_ms: f64) -> Self {
        Self { id, source, start, end, start_time: now, duration_ms, position: start, active: true }
    }

    /// Returns true on the frame it reaches the batcher.
    pub fn update(&mut self, now: f64) -> bool {
        if !self.active {
            return false;
        }
        let t = progress(now, self.start_time, self.duration_ms);
        self.position = self.start.lerp(self.end, ease_out_cubic(t));
        if t >= 1.0 {
            self.active = false;
            return true;
        }
        false
    }

    pub(crate) fn shift_timestamps(&mut self, delta: f64) {
        self.start_time += delta;
    }
}

// ─── ChainBoundParticle ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainBoundState {
    Traveling,
    /// Parked at the chain's wait point until the next block absorbs it.
    Waiting,
    Absorbed,
    Retired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainBoundParticle {
    pub id: ParticleId,
    pub chain: ChainId,
    pub event: DomainEvent,
    pub start: Point,
    pub start_time: f64,
    pub duration_ms: f64,
    pub position: Point,
    pub state: ChainBoundState,
    pub color: String,
}

impl ChainBoundParticle {
    pub fn new(
        id: ParticleId,
        chain: ChainId,
        event: DomainEvent,
        start: Point,
        color: &str,
        now: f64,
        duration_ms: f64,
    ) -> Self {
        Self {
            id,
            chain,
            event,
            start,
            start_time: now,
            duration_ms,
            position: start,
            state: ChainBoundState::Traveling,
            color: color.to_string(),
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.state == ChainBoundState::Waiting
    }

    pub fn is_live(&self) -> bool {
        matches!(self.state, ChainBoundState::Traveling | ChainBoundState::Waiting)
    }

    /// `wait_point` is `None` once the chain has been removed.
    pub fn update(&mut self, now: f64, wait_point: Option<Point>) {
        if !self.is_live() {
            return;
        }
        let Some(target) = wait_point else {
            self.state = ChainBoundState::Retired;
            return;
        };
        if self.state == ChainBoundState::Waiting {
            self.position = target;
            return;
        }
        let t = progress(now, self.start_time, self.duration_ms);
        self.position = self.start.lerp(target, ease_out_quad(t));
        if t >= 1.0 {
            self.state = ChainBoundState::Waiting;
        }
    }

    /// Hand the event over to a freshly created block.
    pub fn absorb(&mut self) -> DomainEvent {
        self.state = ChainBoundState::Absorbed;
        self.event.clone()
    }

    pub(crate) fn shift_timestamps(&mut self, delta: f64) {
        self.start_time += delta;
    }
}

// ─── Snapshot ───────────────────────────────────────────────────────────────

/// Every live particle, grouped by kind, for the renderer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParticleSnapshot {
    pub processed: Vec<ProcessedEvent>,
    pub events: Vec<EventParticle>,
    pub requests: Vec<RequestParticle>,
    pub chain_bound: Vec<ChainBoundParticle>,
}

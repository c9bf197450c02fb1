// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Chain Merge Visualizer - Action State Machine

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::events;
use crate::table::TableKind;
use crate::timeline::Timeline;
use crate::types::{ActionId, BlockRef, DomainEvent, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionState {
    /// Riding the timeline towards the now-line.
    Scheduled,
    /// Parked on the now-line until its hold expires.
    WaitingAtNow,
    Retired,
}

/// One merged event on its way to execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    pub source: BlockRef,
    pub event: DomainEvent,
    /// Logical engine time the action executes at.
    pub scheduled_time: f64,
    pub state: ActionState,
    /// Wall-clock instant the action reached the now-line.
    pub wait_start: Option<f64>,
    pub position: Point,
    pub size: f64,
}

impl Action {
    pub fn new(id: ActionId, source: BlockRef, event: DomainEvent, scheduled_time: f64, size: f64) -> Self {
        Self {
            id,
            source,
            event,
            scheduled_time,
            state: ActionState::Scheduled,
            wait_start: None,
            position: Point::default(),
            size,
        }
    }

    pub fn is_live(&self) -> bool {
        self.state != ActionState::Retired
    }

    /// Advance one frame. Returns true once the hold at the now-line has
    /// expired and the action should be dispatched.
    pub fn update(
        &mut self,
        now: f64,
        engine_time: f64,
        timeline: &Timeline,
        row_y: f64,
        wait_ms: f64,
    ) -> bool {
        match self.state {
            ActionState::Scheduled => {
                if engine_time >= self.scheduled_time {
                    self.state = ActionState::WaitingAtNow;
                    self.wait_start = Some(now);
                    self.position = Point::new(timeline.now_pixel, row_y);
                    return wait_ms <= 0.0;
                }
                self.position = Point::new(timeline.x_at(self.scheduled_time, engine_time), row_y);
                false
            }
            ActionState::WaitingAtNow => {
                self.position = Point::new(timeline.now_pixel, row_y);
                let started = self.wait_start.unwrap_or(now);
                now - started >= wait_ms
            }
            ActionState::Retired => false,
        }
    }

    pub fn retire(&mut self) {
        self.state = ActionState::Retired;
    }

    pub(crate) fn shift_timestamps(&mut self, delta: f64) {
        if let Some(start) = self.wait_start.as_mut() {
            *start += delta;
        }
    }
}

/// Destination table for a set of events: the first event whose mapped table
/// exists wins; otherwise a uniformly random available table.
pub fn destination_table<R: Rng + ?Sized>(
    events: &[DomainEvent],
    available: &[TableKind],
    rng: &mut R,
) -> Option<TableKind> {
    if let Some(kind) = events
        .iter()
        .map(|e| events::table_for(e.event_type()))
        .find(|kind| available.contains(kind))
    {
        return Some(kind);
    }
    if available.is_empty() {
        return None;
    }
    Some(available[rng.gen_range(0..available.len())])
}

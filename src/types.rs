// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Chain Merge Visualizer - Type Definitions

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Identifiers ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChainId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticleId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(pub u32);

/// A block addressed by relation: its chain plus the chain-local index.
///
/// Resolving can fail once the block is pruned or the chain removed; callers
/// treat that as "target no longer valid".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockRef {
    pub chain: ChainId,
    pub index: u64,
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chain-{}", self.0)
    }
}

// ─── Geometry ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Linear interpolation towards `to`; `t` is not clamped.
    pub fn lerp(self, to: Point, t: f64) -> Point {
        Point {
            x: self.x + (to.x - self.x) * t,
            y: self.y + (to.y - self.y) * t,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }
}

// ─── Domain Events ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Erc20Transfer,
    Erc721Transfer,
    GameMove,
    AccountCreated,
}

impl EventType {
    pub const ALL: [EventType; 4] = [
        Self::Erc20Transfer,
        Self::Erc721Transfer,
        Self::GameMove,
        Self::AccountCreated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Erc20Transfer => "erc20_transfer",
            Self::Erc721Transfer => "erc721_transfer",
            Self::GameMove => "game_move",
            Self::AccountCreated => "account_created",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event-specific data. The serde tag doubles as the wire `type` field the
/// renderer keys colors on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    Erc20Transfer { from: String, to: String, amount: Decimal },
    Erc721Transfer { token_id: u32, from: String, to: String },
    GameMove { user_id: u32, x: u32, y: u32, character_id: u32 },
    AccountCreated { user_id: u32, address: String },
}

impl EventPayload {
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Erc20Transfer { .. } => EventType::Erc20Transfer,
            Self::Erc721Transfer { .. } => EventType::Erc721Transfer,
            Self::GameMove { .. } => EventType::GameMove,
            Self::AccountCreated { .. } => EventType::AccountCreated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Name of the chain the event was generated for.
    pub chain: String,
    /// Host wall-clock instant (ms) at generation.
    pub timestamp: f64,
    pub payload: EventPayload,
}

impl DomainEvent {
    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }
}

// ─── TickResult ─────────────────────────────────────────────────────────────

/// Per-frame counters returned by `tick_core`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TickResult {
    pub engine_time_ms: f64,
    pub paused: bool,
    pub blocks_appended: u32,
    pub blocks_merged: u32,
    pub actions_created: u32,
    pub actions_dispatched: u32,
    pub rows_inserted: u32,
    pub blocks_pruned: u32,
}

// ─── Status ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainStatus {
    pub id: ChainId,
    pub name: String,
    pub timing_label: String,
    pub block_count: usize,
    pub blocks_created: u64,
}

/// Summary of live entity counts for the host's status bar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub engine_time_ms: f64,
    pub paused: bool,
    pub chains: Vec<ChainStatus>,
    pub table_count: usize,
    pub last_updated_table: Option<String>,
    pub moving_particles: usize,
    pub particles_at_actions: usize,
    pub scheduled_actions: usize,
    pub waiting_actions: usize,
    pub processed_in_flight: usize,
    pub accumulated_events: usize,
    pub chain_bound_particles: usize,
    pub batcher_requests: u64,
    pub device_count: usize,
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Engine Time: {:.1}s |", self.engine_time_ms / 1000.0)?;
        let active: Vec<String> = self
            .chains
            .iter()
            .filter(|c| c.block_count > 0)
            .map(|c| format!("{} {}", c.name.replace(" Chain", ""), c.timing_label))
            .collect();
        write!(f, " {}", active.join(", "))?;
        if let Some(table) = &self.last_updated_table {
            write!(f, " | Last update: {}", table)?;
        }
        if self.moving_particles + self.particles_at_actions > 0 {
            write!(
                f,
                " | {} moving, {} at actions",
                self.moving_particles, self.particles_at_actions
            )?;
        }
        if self.scheduled_actions + self.waiting_actions > 0 {
            write!(
                f,
                " | {} scheduled, {} waiting",
                self.scheduled_actions, self.waiting_actions
            )?;
        }
        if self.paused {
            write!(f, " | PAUSED")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_serializes_with_type_tag() {
        let payload = EventPayload::GameMove { user_id: 7, x: 1, y: 2, character_id: 3 };
        let json = serde_json::to_value(&payload).expect("test: serialize");
        assert_eq!(json["type"], "game_move");
        assert_eq!(json["user_id"], 7);
    }

    #[test]
    fn status_line_skips_idle_sections() {
        let status = EngineStatus {
            engine_time_ms: 12_345.0,
            paused: false,
            chains: vec![
                ChainStatus {
                    id: ChainId(0),
                    name: "Paima Engine".into(),
                    timing_label: "(1s)".into(),
                    block_count: 3,
                    blocks_created: 3,
                },
                ChainStatus {
                    id: ChainId(1),
                    name: "Avail".into(),
                    timing_label: "(20s)".into(),
                    block_count: 0,
                    blocks_created: 0,
                },
            ],
            table_count: 4,
            last_updated_table: None,
            moving_particles: 0,
            particles_at_actions: 0,
            scheduled_actions: 2,
            waiting_actions: 0,
            processed_in_flight: 0,
            accumulated_events: 0,
            chain_bound_particles: 0,
            batcher_requests: 0,
            device_count: 0,
        };
        let line = status.to_string();
        assert!(line.starts_with("Engine Time: 12.3s | Paima Engine (1s)"));
        assert!(!line.contains("Avail"));
        assert!(line.contains("2 scheduled, 0 waiting"));
        assert!(!line.contains("moving"));
    }

    #[test]
    fn rect_center_and_contains() {
        let r = Rect::new(10.0, 20.0, 100.0, 40.0);
        assert_eq!(r.center(), Point::new(60.0, 40.0));
        assert!(r.contains(Point::new(10.0, 60.0)));
        assert!(!r.contains(Point::new(111.0, 30.0)));
    }
}

// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Chain Merge Visualizer - Mock SQL Tables

use serde::{Deserialize, Serialize};

use crate::config::TableConfig;
use crate::events;
use crate::types::{DomainEvent, Point, Rect};

// ─── TableKind ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Erc20Balance,
    Erc721Ownership,
    CurrentPosition,
    AccountsToAddress,
}

impl TableKind {
    /// Display order, left to right.
    pub const ALL: [TableKind; 4] = [
        Self::Erc20Balance,
        Self::Erc721Ownership,
        Self::CurrentPosition,
        Self::AccountsToAddress,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Erc20Balance => "erc20_balance",
            Self::Erc721Ownership => "erc721_ownership",
            Self::CurrentPosition => "current_position",
            Self::AccountsToAddress => "accounts_to_address",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Erc20Balance => "ERC20 Balance",
            Self::Erc721Ownership => "ERC721 Ownership",
            Self::CurrentPosition => "Current Position",
            Self::AccountsToAddress => "Accounts to Address",
        }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Self::Erc20Balance => &["Address", "Balance"],
            Self::Erc721Ownership => &["Asset ID", "Owner"],
            Self::CurrentPosition => &["User ID", "X", "Y", "Char ID"],
            Self::AccountsToAddress => &["User ID", "Address"],
        }
    }
}

// ─── Table ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub cells: Vec<String>,
    pub timestamp: f64,
}

/// Bounded newest-first log of rows standing in for a persisted store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub kind: TableKind,
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
    pub max_rows: usize,
    pub bounds: Rect,
    pub is_blinking: bool,
    pub blink_start: f64,
    pub last_modified: Option<f64>,
}

impl Table {
    pub fn new(kind: TableKind, bounds: Rect, max_rows: usize) -> Self {
        Self {
            kind,
            name: kind.display_name().to_string(),
            columns: kind.columns().iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
            max_rows,
            bounds,
            is_blinking: false,
            blink_start: 0.0,
            last_modified: None,
        }
    }

    /// Append, re-sort newest first, drop anything past the cap, and start
    /// (or restart) the blink at `now`.
    pub fn insert(&mut self, cells: Vec<String>, timestamp: f64, now: f64) {
        self.rows.push(TableRow { cells, timestamp });
        // Stable sort keeps insertion order among equal stamps.
        self.rows.sort_by(|a, b| b.timestamp.total_cmp(&a.timestamp));
        self.rows.truncate(self.max_rows);
        self.is_blinking = true;
        self.blink_start = now;
        self.last_modified = Some(timestamp);
    }

    /// Clear the blink once `duration_ms` has passed. Returns true on the
    /// tick it clears.
    pub fn update_blink(&mut self, now: f64, duration_ms: f64) -> bool {
        if self.is_blinking && now - self.blink_start > duration_ms {
            self.is_blinking = false;
            return true;
        }
        false
    }

    pub fn center(&self) -> Point {
        self.bounds.center()
    }
}

// ─── TableSet ───────────────────────────────────────────────────────────────

/// The fixed set of four tables, laid out in a row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSet {
    tables: Vec<Table>,
}

impl TableSet {
    pub fn new(config: &TableConfig) -> Self {
        let tables = TableKind::ALL
            .iter()
            .enumerate()
            .map(|(i, kind)| {
                let x = config.origin_x + (config.width + config.spacing) * i as f64;
                Table::new(*kind, Rect::new(x, config.origin_y, config.width, config.height), config.max_rows)
            })
            .collect();
        Self { tables }
    }

    pub fn get(&self, kind: TableKind) -> Option<&Table> {
        self.tables.iter().find(|t| t.kind == kind)
    }

    pub fn get_mut(&mut self, kind: TableKind) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.kind == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn kinds(&self) -> Vec<TableKind> {
        self.tables.iter().map(|t| t.kind).collect()
    }

    /// Write `event` into its mapped table. Returns the table touched, or
    /// `None` when the mapped table is absent.
    pub fn apply_event(&mut self, event: &DomainEvent, now: f64) -> Option<TableKind> {
        let kind = events::table_for(event.event_type());
        self.insert_into(kind, event, now).then_some(kind)
    }

    /// Write `event` into `kind` regardless of mapping (fallback routing).
    pub fn insert_into(&mut self, kind: TableKind, event: &DomainEvent, now: f64) -> bool {
        match self.get_mut(kind) {
            Some(table) => {
                table.insert(events::row_for(&event.payload), now, now);
                true
            }
            None => false,
        }
    }

    /// Clear expired blinks; returns how many cleared this tick.
    pub fn update_blinking(&mut self, now: f64, duration_ms: f64) -> usize {
        self.tables
            .iter_mut()
            .filter_map(|t| t.update_blink(now, duration_ms).then_some(()))
            .count()
    }

    /// The table written most recently, if any.
    pub fn most_recent(&self) -> Option<&Table> {
        self.tables
            .iter()
            .filter(|t| t.last_modified.is_some())
            .max_by(|a, b| {
                let a = a.last_modified.unwrap_or(f64::MIN);
                let b = b.last_modified.unwrap_or(f64::MIN);
                a.total_cmp(&b)
            })
    }

    pub(crate) fn shift_timestamps(&mut self, delta: f64) {
        for table in &mut self.tables {
            if table.is_blinking {
                table.blink_start += delta;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventPayload;
    use rust_decimal_macros::dec;

    fn table(max_rows: usize) -> Table {
        Table::new(TableKind::Erc20Balance, Rect::default(), max_rows)
    }

    #[test]
    fn insert_keeps_newest_first_and_caps() {
        let mut t = table(5);
        for (i, stamp) in [10.0, 50.0, 30.0, 20.0, 60.0, 40.0, 5.0].iter().enumerate() {
            t.insert(vec![format!("r{}", i), "1".into()], *stamp, 100.0);
            assert!(t.rows.len() <= 5);
            assert!(t.rows.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
        }
        let stamps: Vec<f64> = t.rows.iter().map(|r| r.timestamp).collect();
        assert_eq!(stamps, vec![60.0, 50.0, 40.0, 30.0, 20.0]);
    }

    #[test]
    fn blink_clears_after_duration() {
        let mut t = table(5);
        t.insert(vec!["a".into(), "b".into()], 1000.0, 1000.0);
        assert!(t.is_blinking);
        assert!(!t.update_blink(2500.0, 1500.0));
        assert!(t.is_blinking);
        assert!(t.update_blink(2500.1, 1500.0));
        assert!(!t.is_blinking);
    }

    #[test]
    fn reinsert_refreshes_blink() {
        let mut t = table(5);
        t.insert(vec!["a".into(), "b".into()], 0.0, 0.0);
        t.insert(vec!["c".into(), "d".into()], 1000.0, 1000.0);
        assert!(!t.update_blink(2000.0, 1500.0));
        assert_eq!(t.blink_start, 1000.0);
    }

    #[test]
    fn apply_event_routes_to_mapped_table() {
        let mut set = TableSet::new(&TableConfig::default());
        let event = DomainEvent {
            chain: "Arbitrum".into(),
            timestamp: 0.0,
            payload: EventPayload::Erc20Transfer {
                from: "0xaaaa".into(),
                to: "0xbbbb".into(),
                amount: dec!(12.34),
            },
        };
        assert_eq!(set.apply_event(&event, 77.0), Some(TableKind::Erc20Balance));
        let table = set.get(TableKind::Erc20Balance).expect("test: table exists");
        assert_eq!(table.rows[0].cells, vec!["0xbbbb".to_string(), "12.34".to_string()]);
        assert_eq!(table.last_modified, Some(77.0));
        assert_eq!(set.most_recent().map(|t| t.kind), Some(TableKind::Erc20Balance));
    }

    #[test]
    fn tables_are_laid_out_in_a_row() {
        let config = TableConfig::default();
        let set = TableSet::new(&config);
        let xs: Vec<f64> = set.iter().map(|t| t.bounds.x).collect();
        assert_eq!(xs, vec![50.0, 300.0, 550.0, 800.0]);
        assert_eq!(set.len(), 4);
    }
}

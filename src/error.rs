// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Chain Merge Visualizer - Command Errors

/// Maximum block time accepted for a fixed-interval chain (10 minutes).
pub const MAX_BLOCK_INTERVAL_MS: f64 = 600_000.0;

/// Errors raised at the command boundary (chain management, pause, config).
///
/// Nothing inside a tick produces one of these: per-frame failures degrade
/// to "do nothing this frame".
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("block interval must be a positive number of milliseconds, got {0}")]
    InvalidInterval(f64),

    #[error("block interval {0} ms exceeds the 600 s limit")]
    IntervalTooLong(f64),

    #[error("probabilistic cadence needs at least one threshold")]
    EmptyThresholds,

    #[error("threshold #{index} is invalid: {value} ms (must be positive and ascending)")]
    InvalidThreshold { index: usize, value: f64 },

    #[error("chain name is required")]
    EmptyChainName,

    #[error("a chain named '{0}' already exists")]
    DuplicateChain(String),

    #[error("no chain with id {0}")]
    UnknownChain(u32),

    #[error("the primary chain cannot be removed")]
    PrimaryChainImmutable,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("engine is already paused")]
    AlreadyPaused,

    #[error("engine is not paused")]
    NotPaused,
}

pub type Result<T> = std::result::Result<T, EngineError>;

// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Chain Merge Visualizer - Random Event Generator
//
// Synthetic domain events with random payloads. Pure functions over the
// engine RNG; no state of their own.

use num_traits::FromPrimitive;
use rand::Rng;
use rust_decimal::Decimal;

use crate::config::RandomMultipliers;
use crate::table::TableKind;
use crate::types::{DomainEvent, EventPayload, EventType};

const HEX: &[u8; 16] = b"0123456789abcdef";
const ADDRESS_DISPLAY_LEN: usize = 12;

/// A random 20-byte address, truncated for display (`0x1234567890...`).
pub fn random_address<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut address = String::with_capacity(42);
    address.push_str("0x");
    for _ in 0..40 {
        address.push(HEX[rng.gen_range(0..HEX.len())] as char);
    }
    address.truncate(ADDRESS_DISPLAY_LEN);
    address.push_str("...");
    address
}

/// Balance in `[0, multiplier)` rounded to cents.
pub fn random_balance<R: Rng + ?Sized>(rng: &mut R, multiplier: f64) -> Decimal {
    let raw = rng.gen::<f64>() * multiplier;
    Decimal::from_f64(raw).map(|d| d.round_dp(2)).unwrap_or(Decimal::ZERO)
}

/// Uniform in `1..=max` (a zero max behaves like 1).
fn one_based<R: Rng + ?Sized>(rng: &mut R, max: u32) -> u32 {
    rng.gen_range(1..=max.max(1))
}

pub fn random_event_type<R: Rng + ?Sized>(rng: &mut R) -> EventType {
    EventType::ALL[rng.gen_range(0..EventType::ALL.len())]
}

/// Generate an event of a uniformly chosen type for `chain`.
pub fn generate_event<R: Rng + ?Sized>(
    rng: &mut R,
    chain: &str,
    timestamp: f64,
    random: &RandomMultipliers,
) -> DomainEvent {
    let event_type = random_event_type(rng);
    generate_event_of_type(rng, event_type, chain, timestamp, random)
}

pub fn generate_event_of_type<R: Rng + ?Sized>(
    rng: &mut R,
    event_type: EventType,
    chain: &str,
    timestamp: f64,
    random: &RandomMultipliers,
) -> DomainEvent {
    let payload = match event_type {
        EventType::Erc20Transfer => EventPayload::Erc20Transfer {
            from: random_address(rng),
            to: random_address(rng),
            amount: random_balance(rng, random.balance),
        },
        EventType::Erc721Transfer => EventPayload::Erc721Transfer {
            token_id: one_based(rng, random.asset_id),
            from: random_address(rng),
            to: random_address(rng),
        },
        EventType::GameMove => EventPayload::GameMove {
            user_id: one_based(rng, random.user_id),
            x: rng.gen_range(0..random.position.max(1)),
            y: rng.gen_range(0..random.position.max(1)),
            character_id: one_based(rng, random.character_id),
        },
        EventType::AccountCreated => EventPayload::AccountCreated {
            user_id: one_based(rng, random.user_id),
            address: random_address(rng),
        },
    };
    DomainEvent { chain: chain.to_string(), timestamp, payload }
}

/// Whether a freshly closed block of `duration_ms` carries a generated event.
///
/// Blocks longer than the threshold always do; shorter ones with probability
/// `duration / threshold`.
pub fn block_carries_event<R: Rng + ?Sized>(
    rng: &mut R,
    duration_ms: f64,
    threshold_ms: f64,
) -> bool {
    if duration_ms > threshold_ms {
        return true;
    }
    threshold_ms > 0.0 && rng.gen::<f64>() < duration_ms / threshold_ms
}

/// The one table each event type lands in.
pub fn table_for(event_type: EventType) -> TableKind {
    match event_type {
        EventType::Erc20Transfer => TableKind::Erc20Balance,
        EventType::Erc721Transfer => TableKind::Erc721Ownership,
        EventType::GameMove => TableKind::CurrentPosition,
        EventType::AccountCreated => TableKind::AccountsToAddress,
    }
}

/// Row shape written for an event; column order matches [`TableKind::columns`].
pub fn row_for(payload: &EventPayload) -> Vec<String> {
    match payload {
        EventPayload::Erc20Transfer { to, amount, .. } => vec![to.clone(), amount.to_string()],
        EventPayload::Erc721Transfer { token_id, to, .. } => {
            vec![token_id.to_string(), to.clone()]
        }
        EventPayload::GameMove { user_id, x, y, character_id } => vec![
            user_id.to_string(),
            x.to_string(),
            y.to_string(),
            character_id.to_string(),
        ],
        EventPayload::AccountCreated { user_id, address } => {
            vec![user_id.to_string(), address.clone()]
        }
    }
}

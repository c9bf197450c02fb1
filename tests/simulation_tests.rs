#[cfg(test)]
mod tests {
    use chain_merge_engine::action::ActionState;
    use chain_merge_engine::cadence::DEFAULT_PROBABILITY_THRESHOLDS_MS;
    use chain_merge_engine::config::EngineConfig;
    use chain_merge_engine::events::{row_for, table_for};
    use chain_merge_engine::particle::{TargetKind, TravelState};
    use chain_merge_engine::table::{TableKind, TableSet};
    use chain_merge_engine::{
        Cadence, ChainId, DomainEvent, EngineError, EventPayload, MergeSimulation, Point,
        PRIMARY_CHAIN_ID,
    };
    use rust_decimal_macros::dec;

    const FRAME_MS: f64 = 10.0;

    fn quiet_sim(seed: u64) -> MergeSimulation {
        let mut config = EngineConfig::quiet();
        config.seed = seed;
        MergeSimulation::with_config(config, 0.0).expect("quiet config is valid")
    }

    /// Primary (1000 ms) plus one 250 ms secondary whose every block carries
    /// exactly one generated event.
    fn merge_pair(seed: u64) -> (MergeSimulation, ChainId) {
        let mut config = EngineConfig::quiet();
        config.seed = seed;
        config.random.block_event_threshold_ms = 0.0;
        let mut sim = MergeSimulation::with_config(config, 0.0).expect("config is valid");
        let id = sim
            .insert_chain("Arbitrum", Cadence::fixed(250.0).expect("valid"), 0.0)
            .expect("chain added");
        (sim, id)
    }

    fn run_until(sim: &mut MergeSimulation, from: f64, to: f64) {
        run_frames(sim, from, to, FRAME_MS);
    }

    fn run_frames(sim: &mut MergeSimulation, from: f64, to: f64, frame_ms: f64) {
        let mut now = from;
        while now < to {
            now = (now + frame_ms).min(to);
            sim.tick_core(now);
        }
    }

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-6 && (a.y - b.y).abs() < 1e-6
    }

    // ========== Cadence ==========

    #[test]
    fn test_fixed_interval_block_counts() {
        let mut sim = quiet_sim(1);
        let fast = sim.insert_chain("Fast", Cadence::fixed(250.0).expect("valid"), 0.0).expect("added");
        let slow = sim.insert_chain("Slow", Cadence::fixed(12_000.0).expect("valid"), 0.0).expect("added");

        let odd = sim.insert_chain("Odd", Cadence::fixed(333.0).expect("valid"), 0.0).expect("added");

        // 16 ms frames divide none of the intervals.
        let total = 60_000.0;
        run_frames(&mut sim, 0.0, total, 16.0);

        for (id, interval) in [(PRIMARY_CHAIN_ID, 1_000.0), (fast, 250.0), (slow, 12_000.0), (odd, 333.0)] {
            let created = sim.chain(id).expect("chain exists").counter as f64;
            let expected = (total / interval).floor();
            assert!(
                (created - expected).abs() <= 1.0,
                "chain {} created {} blocks, expected {}",
                id,
                created,
                expected
            );
        }
    }

    #[test]
    fn test_blocks_tile_engine_time() {
        let mut sim = quiet_sim(2);
        let id = sim.insert_chain("Midnight", Cadence::fixed(600.0).expect("valid"), 0.0).expect("added");
        run_until(&mut sim, 0.0, 8_000.0);
        let chain = sim.chain(id).expect("chain exists");
        assert_eq!(chain.blocks[0].start_time, 0.0);
        for pair in chain.blocks.windows(2) {
            assert_eq!(pair[1].start_time, pair[0].end_time);
            assert!(pair[1].end_time >= pair[1].start_time);
        }
    }

    #[test]
    fn test_probabilistic_chain_never_starves() {
        let last = DEFAULT_PROBABILITY_THRESHOLDS_MS[DEFAULT_PROBABILITY_THRESHOLDS_MS.len() - 1];
        for seed in 0..40 {
            let mut sim = quiet_sim(seed);
            let id = sim
                .insert_chain(
                    "XAI",
                    Cadence::probabilistic(DEFAULT_PROBABILITY_THRESHOLDS_MS.to_vec()).expect("valid"),
                    0.0,
                )
                .expect("added");

            let mut last_append = 0.0;
            let mut seen = 0;
            let mut now = 0.0;
            while now < 5_000.0 {
                now += FRAME_MS;
                sim.tick_core(now);
                let count = sim.chain(id).expect("chain exists").counter;
                if count > seen {
                    assert!(
                        now - last_append <= last + 1e-9,
                        "seed {}: gap of {}ms exceeds last threshold",
                        seed,
                        now - last_append
                    );
                    seen = count;
                    last_append = now;
                }
            }
            assert!(5_000.0 - last_append <= last + FRAME_MS);
        }
    }

    // ========== Merge & Actions ==========

    #[test]
    fn test_end_to_end_four_actions() {
        let (mut sim, secondary) = merge_pair(7);
        let mut last = None;
        for now in [250.0, 500.0, 750.0, 1_000.0] {
            last = Some(sim.tick_core(now));
        }
        let result = last.expect("ticked");

        assert_eq!(sim.chain(secondary).expect("exists").counter, 4);
        assert_eq!(sim.primary_chain().expect("primary").counter, 1);
        assert_eq!(result.blocks_merged, 4);
        assert_eq!(result.actions_created, 4);
        assert_eq!(sim.actions().len(), 4);
        assert!(sim.actions().iter().all(|a| a.state == ActionState::Scheduled));
        assert!(sim.actions().iter().all(|a| a.scheduled_time >= 1_500.0 && a.scheduled_time < 4_000.0));
        assert!(sim
            .chain(secondary)
            .expect("exists")
            .blocks
            .iter()
            .all(|b| b.events_processed && b.color_fade.is_some()));
    }

    #[test]
    fn test_merged_block_processed_once() {
        let (mut sim, secondary) = merge_pair(8);
        run_until(&mut sim, 0.0, 1_000.0);
        assert_eq!(sim.totals().actions_created, 4);

        run_until(&mut sim, 1_000.0, 1_990.0);
        assert_eq!(sim.totals().actions_created, 4, "no merge between primary blocks");

        run_until(&mut sim, 1_990.0, 2_000.0);
        assert_eq!(sim.totals().blocks_merged, 8);
        assert_eq!(sim.totals().actions_created, 8);
        let processed = sim
            .chain(secondary)
            .expect("exists")
            .blocks
            .iter()
            .filter(|b| b.events_processed)
            .count();
        assert_eq!(processed, 8);
    }

    #[test]
    fn test_merge_palette_wraps() {
        let (mut sim, secondary) = merge_pair(9);
        run_until(&mut sim, 0.0, 3_000.0);
        let palette = sim.config().merge_palette.clone();
        let targets: Vec<String> = sim
            .chain(secondary)
            .expect("exists")
            .blocks
            .iter()
            .map(|b| b.color_fade.as_ref().map(|f| f.to.clone()).unwrap_or_else(|| b.color.clone()))
            .collect();
        for (i, color) in targets.iter().enumerate() {
            assert_eq!(color, &palette[i % palette.len()]);
        }
    }

    #[test]
    fn test_table_updated_at_dispatch() {
        let (mut sim, _) = merge_pair(11);
        run_until(&mut sim, 0.0, 1_000.0);

        let mut now = 1_000.0;
        loop {
            let pending: Vec<(u64, DomainEvent)> =
                sim.actions().iter().map(|a| (a.id.0, a.event.clone())).collect();
            now += FRAME_MS;
            let result = sim.tick_core(now);
            if result.actions_dispatched == 0 {
                assert!(now < 5_000.0, "no action dispatched");
                continue;
            }

            let live: Vec<u64> = sim.actions().iter().map(|a| a.id.0).collect();
            for (id, event) in pending.iter().filter(|(id, _)| !live.contains(id)) {
                let table = sim.tables().get(table_for(event.event_type())).expect("table exists");
                let row = row_for(&event.payload);
                assert!(
                    table.rows.iter().any(|r| r.cells == row && r.timestamp == now),
                    "action {} not reflected in {}",
                    id,
                    table.name
                );
                assert!(table.is_blinking);
            }
            // The particles that carry those rows are still on their way.
            assert!(sim
                .processed_events()
                .iter()
                .any(|p| p.state == TravelState::Traveling && matches!(p.target, TargetKind::Table(_))));
            break;
        }
    }

    #[test]
    fn test_dispatch_spawns_block_and_table_particles() {
        let (mut sim, secondary) = merge_pair(12);
        run_until(&mut sim, 0.0, 1_000.0);
        sim.remove_chain_core(secondary).expect("removed");
        run_until(&mut sim, 1_000.0, 5_000.0);
        assert_eq!(sim.totals().actions_dispatched, 4);
        assert_eq!(sim.totals().rows_inserted, 4);
        assert!(sim.actions().is_empty());

        run_until(&mut sim, 5_000.0, 6_500.0);
        let attached: Vec<_> = sim
            .processed_events()
            .iter()
            .filter(|p| p.state == TravelState::Attached)
            .collect();
        assert!(!attached.is_empty());
        for p in attached {
            let TargetKind::Block(block_ref) = p.target else {
                panic!("only block-bound events attach");
            };
            assert_eq!(block_ref.chain, PRIMARY_CHAIN_ID);
            let block = sim.block(block_ref).expect("target block is live");
            assert!(block.accumulated.contains(&p.id));
        }
        assert!(sim.processed_events().iter().all(|p| !matches!(p.target, TargetKind::Table(_))));
    }

    // ========== Tables ==========

    #[test]
    fn test_table_cap_and_order_under_load() {
        let mut config = EngineConfig::default();
        config.seed = 21;
        config.random.block_event_threshold_ms = 0.0;
        let mut sim = MergeSimulation::with_config(config, 0.0).expect("valid");
        let mut now = 0.0;
        while now < 30_000.0 {
            now += 16.0;
            sim.tick_core(now);
            for table in sim.tables().iter() {
                assert!(table.rows.len() <= table.max_rows);
                assert!(table.rows.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
            }
        }
        assert!(sim.totals().rows_inserted > 5);
    }

    #[test]
    fn test_erc20_blink_sets_then_clears() {
        let config = EngineConfig::default();
        let mut tables = TableSet::new(&config.table);
        assert!(tables.get(TableKind::Erc20Balance).expect("table").rows.is_empty());

        let event = DomainEvent {
            chain: "Ethereum".into(),
            timestamp: 1_000.0,
            payload: EventPayload::Erc20Transfer {
                from: "0x1111111111...".into(),
                to: "0x2222222222...".into(),
                amount: dec!(250.75),
            },
        };
        assert_eq!(tables.apply_event(&event, 1_000.0), Some(TableKind::Erc20Balance));
        assert!(tables.get(TableKind::Erc20Balance).expect("table").is_blinking);

        assert_eq!(tables.update_blinking(2_000.0, config.table.blink_duration_ms), 0);
        assert!(tables.get(TableKind::Erc20Balance).expect("table").is_blinking);
        assert_eq!(tables.update_blinking(2_600.0, config.table.blink_duration_ms), 1);
        let table = tables.get(TableKind::Erc20Balance).expect("table");
        assert!(!table.is_blinking);
        assert_eq!(table.rows[0].cells[1], "250.75");
    }

    #[test]
    fn test_engine_clears_blink_without_new_rows() {
        let (mut sim, secondary) = merge_pair(13);
        run_until(&mut sim, 0.0, 1_000.0);
        sim.remove_chain_core(secondary).expect("removed");
        run_until(&mut sim, 1_000.0, 5_000.0);
        assert_eq!(sim.totals().rows_inserted, 4);
        // Last possible dispatch is before 4 s; 1.5 s later every blink is over.
        run_until(&mut sim, 5_000.0, 5_600.0);
        assert!(sim.tables().iter().all(|t| !t.is_blinking));
        assert!(sim.status().last_updated_table.is_some());
    }

    // ========== Pause / Resume ==========

    #[test]
    fn test_pause_resume_preserves_positions() {
        let (mut sim, _) = merge_pair(17);
        run_until(&mut sim, 0.0, 2_500.0);

        let blocks_before: Vec<(f64, f64)> = sim
            .chains()
            .iter()
            .flat_map(|c| c.blocks.iter().map(|b| (b.bounds.x, b.bounds.width)))
            .collect();
        let actions_before: Vec<Point> = sim.actions().iter().map(|a| a.position).collect();
        let processed_before: Vec<Point> = sim.processed_events().iter().map(|p| p.position).collect();
        let engine_before = sim.status().engine_time_ms;

        sim.pause_at(2_500.0).expect("pause");
        let paused = sim.tick_core(6_000.0);
        assert!(paused.paused);
        assert_eq!(paused.engine_time_ms, engine_before);

        let shifted = sim.resume_at(7_500.0).expect("resume");
        assert_eq!(shifted, 5_000.0);
        let result = sim.tick_core(7_500.0);
        assert_eq!(result.engine_time_ms, engine_before);
        assert_eq!(result.blocks_appended, 0);

        let blocks_after: Vec<(f64, f64)> = sim
            .chains()
            .iter()
            .flat_map(|c| c.blocks.iter().map(|b| (b.bounds.x, b.bounds.width)))
            .collect();
        assert_eq!(blocks_before, blocks_after);
        let actions_after: Vec<Point> = sim.actions().iter().map(|a| a.position).collect();
        assert_eq!(actions_before.len(), actions_after.len());
        assert!(actions_before.iter().zip(&actions_after).all(|(a, b)| close(*a, *b)));
        let processed_after: Vec<Point> = sim.processed_events().iter().map(|p| p.position).collect();
        assert_eq!(processed_before.len(), processed_after.len());
        assert!(processed_before.iter().zip(&processed_after).all(|(a, b)| close(*a, *b)));
    }

    #[test]
    fn test_pause_delays_cadence_by_pause_length() {
        let (mut sim, secondary) = merge_pair(18);
        run_until(&mut sim, 0.0, 900.0);
        sim.pause_at(900.0).expect("pause");
        sim.resume_at(10_900.0).expect("resume");
        sim.tick_core(10_990.0);
        assert_eq!(sim.primary_chain().expect("primary").counter, 0);
        sim.tick_core(11_000.0);
        assert_eq!(sim.primary_chain().expect("primary").counter, 1);
        let latest = sim.primary_chain().and_then(|c| c.latest_block()).expect("block");
        assert_eq!(latest.end_time, 1_000.0);
        assert_eq!(sim.chain(secondary).expect("exists").counter, 4);
    }

    // ========== Chain Management ==========

    #[test]
    fn test_invalid_chain_arguments_rejected() {
        let mut sim = quiet_sim(3);
        let fixed = |ms| Cadence::Fixed { interval_ms: ms };
        assert_eq!(sim.insert_chain("  ", fixed(1_000.0), 0.0), Err(EngineError::EmptyChainName));
        assert_eq!(sim.insert_chain("Neg", fixed(-1.0), 0.0), Err(EngineError::InvalidInterval(-1.0)));
        assert_eq!(sim.insert_chain("Zero", fixed(0.0), 0.0), Err(EngineError::InvalidInterval(0.0)));
        assert_eq!(
            sim.insert_chain("Slow", fixed(600_001.0), 0.0),
            Err(EngineError::IntervalTooLong(600_001.0))
        );
        assert_eq!(
            sim.insert_chain("Empty", Cadence::Probability { thresholds_ms: vec![], check_index: 0 }, 0.0),
            Err(EngineError::EmptyThresholds)
        );
        assert_eq!(
            sim.insert_chain("paima engine", fixed(1_000.0), 0.0),
            Err(EngineError::DuplicateChain("paima engine".into()))
        );
        assert_eq!(sim.chains().len(), 1);
    }

    #[test]
    fn test_primary_chain_cannot_be_removed() {
        let mut sim = quiet_sim(4);
        assert_eq!(sim.remove_chain_core(PRIMARY_CHAIN_ID), Err(EngineError::PrimaryChainImmutable));
        assert_eq!(sim.remove_chain_core(ChainId(99)), Err(EngineError::UnknownChain(99)));
        sim.insert_chain("A", Cadence::fixed(500.0).expect("valid"), 0.0).expect("added");
        sim.insert_chain("B", Cadence::fixed(500.0).expect("valid"), 0.0).expect("added");
        assert_eq!(sim.clear_secondary_chains(), 2);
        let primary = sim.primary_chain().expect("primary survives");
        assert_eq!(primary.y, sim.config().layout.chain_start_y);
    }

    // ========== Dangling References ==========

    #[test]
    fn test_removed_chain_deactivates_its_particles() {
        let (mut sim, secondary) = merge_pair(5);
        let mut config = sim.config().clone();
        config.random.processor_to_batcher_chance = 1.0;
        sim.replace_config(config).expect("valid");

        run_until(&mut sim, 0.0, 3_000.0);
        assert!(sim.batcher().request_count > 0);
        assert!(!sim.chain_bound_particles().is_empty());
        let absorbed = sim
            .chain(secondary)
            .expect("exists")
            .blocks
            .iter()
            .any(|b| b.events.len() > 1);
        assert!(absorbed, "waiting particles should ride into the next block");

        sim.remove_chain_core(secondary).expect("removed");
        sim.tick_core(3_010.0);
        assert!(sim.chain_bound_particles().iter().all(|p| p.chain != secondary));
        run_until(&mut sim, 3_010.0, 8_000.0);
        assert!(sim.event_particles().iter().all(|p| sim.actions().iter().any(|a| a.id == p.action)));
    }

    #[test]
    fn test_pruned_blocks_release_accumulated_events() {
        let (mut sim, _) = merge_pair(6);
        run_until(&mut sim, 0.0, 40_000.0);
        assert!(sim.totals().blocks_pruned > 0);
        for p in sim.processed_events() {
            if let TargetKind::Block(block_ref) = p.target {
                if p.state == TravelState::Attached {
                    assert!(sim.block(block_ref).is_some(), "attached to a pruned block");
                }
            }
        }
        let margin = sim.config().layout.prune_margin;
        for chain in sim.chains() {
            for block in &chain.blocks {
                assert!(block.bounds.x + block.bounds.width >= -margin);
            }
        }
    }

    // ========== Status & Determinism ==========

    #[test]
    fn test_status_line_reflects_state() {
        let (mut sim, _) = merge_pair(19);
        run_until(&mut sim, 0.0, 1_200.0);
        let line = sim.status().to_string();
        assert!(line.starts_with("Engine Time: 1.2s |"), "{}", line);
        assert!(line.contains("Arbitrum (0.25s)"));
        assert!(line.contains("4 scheduled"));
        sim.pause_at(1_200.0).expect("pause");
        assert!(sim.status().to_string().ends_with("| PAUSED"));
    }

    #[test]
    fn test_same_seed_same_run() {
        let run = |seed| {
            let mut config = EngineConfig::default();
            config.seed = seed;
            let mut sim = MergeSimulation::with_config(config, 0.0).expect("valid");
            run_until(&mut sim, 0.0, 15_000.0);
            let rows: Vec<Vec<Vec<String>>> = sim
                .tables()
                .iter()
                .map(|t| t.rows.iter().map(|r| r.cells.clone()).collect())
                .collect();
            (sim.totals().actions_dispatched, sim.batcher().request_count, rows)
        };
        assert_eq!(run(99), run(99));
    }

    #[test]
    fn test_default_run_drives_device_traffic() {
        let mut sim = MergeSimulation::with_config(EngineConfig::default(), 0.0).expect("valid");
        run_until(&mut sim, 0.0, 20_000.0);
        let status = sim.status();
        assert!(status.batcher_requests > 0);
        assert!(status.device_count >= sim.config().devices.min);
        assert!(sim.devices().live_count() <= sim.config().devices.max);
        assert_eq!(status.chains.len(), 6);
    }
}

// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Chain Merge Visualizer - User Devices & Batcher

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{CanvasConfig, DeviceConfig, RandomMultipliers, RandomRange};
use crate::types::{DeviceId, Point, Rect};

// ─── Batcher ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batcher {
    pub bounds: Rect,
    pub request_count: u64,
    pub last_request: Option<f64>,
}

impl Batcher {
    pub fn new(canvas: &CanvasConfig, devices: &DeviceConfig) -> Self {
        let x = canvas.width * 0.9 - 50.0;
        let y = canvas.height / 2.0;
        Self {
            bounds: Rect::new(x, y, devices.batcher_width, devices.batcher_height),
            request_count: 0,
            last_request: None,
        }
    }

    pub fn center(&self) -> Point {
        self.bounds.center()
    }

    pub fn receive_request(&mut self, now: f64) {
        self.request_count += 1;
        self.last_request = Some(now);
    }

    pub(crate) fn shift_timestamps(&mut self, delta: f64) {
        if let Some(t) = self.last_request.as_mut() {
            *t += delta;
        }
    }
}

// ─── UserDevice ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceState {
    FadingIn,
    Active,
    FadingOut,
    Gone,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDevice {
    pub id: DeviceId,
    pub name: String,
    pub position: Point,
    pub state: DeviceState,
    pub opacity: f64,
    pub state_start: f64,
    pub last_request: f64,
    pub request_interval_ms: f64,
}

impl UserDevice {
    pub fn update(&mut self, now: f64, fade_ms: f64) {
        let t = ((now - self.state_start) / fade_ms).clamp(0.0, 1.0);
        match self.state {
            DeviceState::FadingIn => {
                self.opacity = t;
                if t >= 1.0 {
                    self.state = DeviceState::Active;
                    self.state_start = now;
                }
            }
            DeviceState::FadingOut => {
                self.opacity = 1.0 - t;
                if t >= 1.0 {
                    self.state = DeviceState::Gone;
                }
            }
            DeviceState::Active | DeviceState::Gone => {}
        }
    }

    pub fn can_send(&self) -> bool {
        self.state == DeviceState::Active
    }

    /// True when a request is due. Restarts the timer with a fresh interval.
    pub fn poll_request<R: Rng + ?Sized>(&mut self, rng: &mut R, now: f64, interval: &RandomRange) -> bool {
        if self.can_send() && now - self.last_request > self.request_interval_ms {
            self.last_request = now;
            self.request_interval_ms = interval.sample(rng);
            return true;
        }
        false
    }

    pub fn fade_out(&mut self, now: f64) {
        if self.state != DeviceState::Gone {
            self.state = DeviceState::FadingOut;
            self.state_start = now;
        }
    }

    fn shift_timestamps(&mut self, delta: f64) {
        self.state_start += delta;
        self.last_request += delta;
    }
}

// ─── DevicePool ─────────────────────────────────────────────────────────────

/// The device population and its churn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DevicePool {
    pub devices: Vec<UserDevice>,
    pub counter: u32,
    pub last_lifecycle_check: f64,
}

impl DevicePool {
    pub fn new<R: Rng + ?Sized>(
        rng: &mut R,
        canvas: &CanvasConfig,
        config: &DeviceConfig,
        random: &RandomMultipliers,
        now: f64,
    ) -> Self {
        let mut pool = Self { devices: Vec::new(), counter: 0, last_lifecycle_check: now };
        for _ in 0..config.initial.min(config.max) {
            pool.spawn(rng, canvas, random, now);
        }
        pool
    }

    pub fn spawn<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        canvas: &CanvasConfig,
        random: &RandomMultipliers,
        now: f64,
    ) -> DeviceId {
        self.counter += 1;
        let id = DeviceId(self.counter);
        let spread = random.device_creation_spread;
        let position = Point::new(
            canvas.width * 0.87 + rng.gen::<f64>() * spread,
            canvas.height * 0.7 + rng.gen::<f64>() * spread,
        );
        self.devices.push(UserDevice {
            id,
            name: format!("User {}", self.counter),
            position,
            state: DeviceState::FadingIn,
            opacity: 0.0,
            state_start: now,
            last_request: now,
            request_interval_ms: random.device_request_interval.sample(rng),
        });
        id
    }

    /// Devices that still count towards the population.
    pub fn live_count(&self) -> usize {
        self.devices
            .iter()
            .filter(|d| matches!(d.state, DeviceState::FadingIn | DeviceState::Active))
            .count()
    }

    /// Periodic churn: maybe retire one active device, maybe add one.
    pub fn lifecycle<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        canvas: &CanvasConfig,
        config: &DeviceConfig,
        random: &RandomMultipliers,
        now: f64,
    ) {
        if now - self.last_lifecycle_check <= config.lifecycle_interval_ms {
            return;
        }
        self.last_lifecycle_check = now;

        if self.live_count() > config.min && rng.gen::<f64>() < random.device_removal_chance {
            let active: Vec<usize> = self
                .devices
                .iter()
                .enumerate()
                .filter(|(_, d)| d.state == DeviceState::Active)
                .map(|(i, _)| i)
                .collect();
            if !active.is_empty() {
                let pick = active[rng.gen_range(0..active.len())];
                self.devices[pick].fade_out(now);
                tracing::debug!(device = %self.devices[pick].name, "device leaving");
            }
        }
        if self.live_count() < config.max && rng.gen::<f64>() < random.device_addition_chance {
            let id = self.spawn(rng, canvas, random, now);
            tracing::debug!(device = id.0, "device joined");
        }
    }

    /// Advance fades and collect the positions of devices sending this frame.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        now: f64,
        fade_ms: f64,
        interval: &RandomRange,
    ) -> Vec<(DeviceId, Point)> {
        let mut requests = Vec::new();
        for device in &mut self.devices {
            device.update(now, fade_ms);
            if device.poll_request(rng, now, interval) {
                requests.push((device.id, device.position));
            }
        }
        self.devices.retain(|d| d.state != DeviceState::Gone);
        requests
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub(crate) fn shift_timestamps(&mut self, delta: f64) {
        self.last_lifecycle_check += delta;
        for device in &mut self.devices {
            device.shift_timestamps(delta);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn interval() -> RandomRange {
        RandomMultipliers::default().device_request_interval
    }

    fn pool(initial: usize) -> (DevicePool, ChaCha8Rng) {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let config = DeviceConfig { initial, ..DeviceConfig::default() };
        let pool = DevicePool::new(
            &mut rng,
            &CanvasConfig::default(),
            &config,
            &RandomMultipliers::default(),
            0.0,
        );
        (pool, rng)
    }

    #[test]
    fn spawns_named_devices_in_the_corner() {
        let (pool, _) = pool(3);
        let names: Vec<&str> = pool.devices.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["User 1", "User 2", "User 3"]);
        for d in &pool.devices {
            assert!(d.position.x >= 1044.0 && d.position.x < 1124.0);
            assert!(d.position.y >= 700.0 && d.position.y < 780.0);
            assert!(d.request_interval_ms >= 1000.0 && d.request_interval_ms < 5000.0);
        }
    }

    #[test]
    fn fade_in_then_out() {
        let (mut pool, mut rng) = pool(1);
        pool.update(&mut rng, 500.0, 1000.0, &interval());
        assert_eq!(pool.devices[0].opacity, 0.5);
        pool.update(&mut rng, 1000.0, 1000.0, &interval());
        assert_eq!(pool.devices[0].state, DeviceState::Active);
        pool.devices[0].fade_out(1000.0);
        pool.update(&mut rng, 2000.0, 1000.0, &interval());
        assert!(pool.is_empty());
    }

    #[test]
    fn requests_fire_after_interval() {
        let (mut pool, mut rng) = pool(1);
        let first = pool.devices[0].request_interval_ms;
        assert!(pool.update(&mut rng, first, 1000.0, &interval()).is_empty());
        let fired = pool.update(&mut rng, first + 1.0, 1000.0, &interval());
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].0, DeviceId(1));
        assert_eq!(pool.devices[0].last_request, first + 1.0);
    }

    #[test]
    fn only_active_devices_send_and_each_send_redraws_the_interval() {
        let (mut pool, mut rng) = pool(1);
        let range = RandomRange { multiplier: 0.0, offset: 100.0 };
        pool.devices[0].request_interval_ms = 100.0;
        // Still fading in well past its interval.
        assert!(pool.update(&mut rng, 500.0, 1000.0, &range).is_empty());
        assert_eq!(pool.devices[0].state, DeviceState::FadingIn);

        assert_eq!(pool.update(&mut rng, 1000.0, 1000.0, &range).len(), 1);
        assert_eq!(pool.devices[0].request_interval_ms, 100.0);
        assert!(pool.update(&mut rng, 1100.0, 1000.0, &range).is_empty());
        assert_eq!(pool.update(&mut rng, 1101.0, 1000.0, &range).len(), 1);

        pool.devices[0].fade_out(1101.0);
        assert!(pool.update(&mut rng, 1300.0, 1000.0, &range).is_empty());
    }

    #[test]
    fn lifecycle_respects_bounds() {
        let (mut pool, mut rng) = pool(20);
        let config = DeviceConfig::default();
        let random = RandomMultipliers {
            device_addition_chance: 1.0,
            device_removal_chance: 0.0,
            ..RandomMultipliers::default()
        };
        let canvas = CanvasConfig::default();
        for step in 1..20 {
            pool.lifecycle(&mut rng, &canvas, &config, &random, step as f64 * 2_001.0);
        }
        assert_eq!(pool.live_count(), 20);
    }

    #[test]
    fn batcher_counts_requests() {
        let mut batcher = Batcher::new(&CanvasConfig::default(), &DeviceConfig::default());
        assert_eq!(batcher.bounds.x, 1030.0);
        batcher.receive_request(10.0);
        batcher.receive_request(20.0);
        assert_eq!(batcher.request_count, 2);
        assert_eq!(batcher.last_request, Some(20.0));
    }
}

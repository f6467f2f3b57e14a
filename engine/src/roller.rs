//! Gradual health for heroes: real health walks one point at a time toward an estimate.
//!
//! A hit lowers the estimate by the full damage, but a hidden true estimate may sit
//! above it. Rolling stops at the true estimate, so a hero can come out of a hit
//! with more health than the display first promised.

use crate::stats::{HealthStatus, health_status};

pub const ROLL_INTERVAL: f32 = 0.25;
pub const DEFAULT_SPEED: u8 = 3;
pub const MIN_SPEED: u8 = 1;
pub const MAX_SPEED: u8 = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct HealthRoller {
    estimate: i32,
    true_estimate: i32,
    /// Health as of the last roll or sync.
    health: i32,
    speed: u8,
    timer: f32,
}

impl HealthRoller {
    pub fn new(health: i32) -> Self {
        Self::with_speed(health, DEFAULT_SPEED)
    }

    /// Speed is clamped to `MIN_SPEED..=MAX_SPEED`.
    pub fn with_speed(health: i32, speed: u8) -> Self {
        Self {
            estimate: health,
            true_estimate: health,
            health,
            speed: speed.clamp(MIN_SPEED, MAX_SPEED),
            timer: ROLL_INTERVAL,
        }
    }

    /// The value health is rolling toward, as shown on the HUD.
    pub fn estimate(&self) -> i32 {
        self.estimate
    }

    /// Where rolling actually stops.
    pub fn true_estimate(&self) -> i32 {
        self.true_estimate
    }

    /// Health as of the last roll or sync.
    pub fn health(&self) -> i32 {
        self.health
    }

    pub fn speed(&self) -> u8 {
        self.speed
    }

    pub fn is_aligned(&self) -> bool {
        self.estimate == self.health
    }

    /// Lower the estimate by `shown` and the true estimate by `taken`. Both stop at 0.
    pub fn take_hit(&mut self, shown: i32, taken: i32) {
        self.estimate = self.estimate.saturating_sub(shown.max(0)).max(0);
        self.true_estimate = self.true_estimate.saturating_sub(taken.max(0)).max(0);
    }

    /// Raise both estimates, capped at `max_health`. Returns how far the estimate rose.
    pub fn restore(&mut self, amount: i32, max_health: i32) -> i32 {
        if amount <= 0 {
            return 0;
        }
        let before = self.estimate;
        self.estimate = self.estimate.saturating_add(amount).min(max_health);
        self.true_estimate = self.true_estimate.saturating_add(amount).min(max_health);
        self.estimate - before
    }

    /// Carry a health change made outside the roller (ailment ticks, max health changes)
    /// into both estimates.
    pub fn sync(&mut self, health: i32, max_health: i32) {
        let delta = health.saturating_sub(self.health);
        self.health = health;
        if delta == 0 && self.estimate <= max_health {
            return;
        }
        self.estimate = self.estimate.saturating_add(delta).clamp(0, max_health);
        self.true_estimate = self.true_estimate.saturating_add(delta).clamp(0, max_health);
    }

    /// A lethal roll in progress stops at 1 HP instead. Returns true if that took hold.
    pub fn survive_fatal_hit(&mut self) -> bool {
        if self.is_aligned() || self.true_estimate != 0 {
            return false;
        }
        self.true_estimate = 1;
        true
    }

    /// Freeze rolling at `health`.
    pub fn stop(&mut self, health: i32) {
        self.health = health;
        self.estimate = health;
        self.true_estimate = health;
        self.timer = ROLL_INTERVAL;
    }

    /// Advance by `dt` seconds, rolling health toward the estimate. Returns the new health
    /// when it moved. Exhausted units fall at double speed and climb at half speed.
    pub fn advance(&mut self, dt: f32, exhausted: bool) -> Option<i32> {
        if self.is_aligned() {
            self.timer = ROLL_INTERVAL;
            return None;
        }

        let going_down = self.health > self.estimate;
        let mut rate = self.speed as f32;
        if exhausted {
            rate = if going_down { rate * 2.0 } else { rate / 2.0 };
        }

        self.timer -= dt * rate;
        let mut moved = false;
        while self.timer <= 0.0 && !self.is_aligned() {
            self.health += if going_down { -1 } else { 1 };
            self.timer += ROLL_INTERVAL;
            moved = true;
            let reached_true = if going_down {
                self.health <= self.true_estimate && self.estimate < self.true_estimate
            } else {
                self.health >= self.true_estimate && self.estimate > self.true_estimate
            };
            if reached_true {
                self.estimate = self.true_estimate;
            }
        }
        if self.is_aligned() {
            self.timer = ROLL_INTERVAL;
        }
        moved.then_some(self.health)
    }

    pub fn status(&self, max_health: i32) -> HealthStatus {
        health_status(self.estimate, max_health)
    }
}

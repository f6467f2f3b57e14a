use crate::Button;
use crate::catalog::TimelyPreset;

use super::{CommandPhase, Verdict};

pub const START_GAUGE: f32 = 3.0;
pub const READY_GOAL: f32 = 0.8;
/// How far above the goal a High-Noon button gets revealed.
pub const HIGH_NOON_REVEAL_LEAD: f32 = 0.2;

pub fn depletion_rate(preset: TimelyPreset) -> f32 {
    match preset {
        TimelyPreset::Slow => 2.5,
        TimelyPreset::Medium => 3.0,
        TimelyPreset::Quick => 4.0,
        TimelyPreset::HighNoonSlow => 2.5,
        TimelyPreset::HighNoonQuick => 3.5,
    }
}

/// Press the required button once the draining gauge enters the ready window.
#[derive(Debug, Clone)]
pub struct TimelyPress {
    preset: TimelyPreset,
    required: Button,
    revealed: bool,
    gauge: f32,
    goal: f32,
    rate: f32,
    phase: CommandPhase,
}

impl TimelyPress {
    /// For High-Noon presets `required` should already be a random pick; it stays hidden until near ready.
    pub fn new(preset: TimelyPreset, required: Button) -> Self {
        Self {
            preset,
            required,
            revealed: !preset.is_high_noon(),
            gauge: START_GAUGE,
            goal: READY_GOAL,
            rate: depletion_rate(preset),
            phase: CommandPhase::Inactive,
        }
    }

    pub fn preset(&self) -> TimelyPreset {
        self.preset
    }

    pub fn required(&self) -> Button {
        self.required
    }

    pub fn gauge(&self) -> f32 {
        self.gauge
    }

    pub fn goal(&self) -> f32 {
        self.goal
    }

    pub fn phase(&self) -> CommandPhase {
        self.phase
    }

    pub fn label(&self) -> &'static str {
        if self.preset.is_high_noon() { "HIGH NOON" } else { "TIMELY PRESS" }
    }

    pub fn is_ready(&self) -> bool {
        self.gauge <= self.goal
    }

    /// The button to show, or None while a High-Noon draw is still hidden.
    pub fn visible_button(&self) -> Option<Button> {
        self.revealed.then_some(self.required)
    }

    /// Seconds until the gauge runs dry.
    pub fn time_left(&self) -> f32 {
        (self.gauge / self.rate).max(0.0)
    }

    pub fn arm(&mut self) {
        if self.phase == CommandPhase::Inactive {
            self.phase = CommandPhase::Armed;
        }
    }

    fn settle(&mut self, verdict: Verdict) -> Option<Verdict> {
        self.phase = match verdict {
            Verdict::Pass => CommandPhase::Passed,
            _ => CommandPhase::Failed,
        };
        Some(verdict)
    }

    pub(crate) fn advance(&mut self, dt: f32, is_current: bool) -> Option<Verdict> {
        if self.phase != CommandPhase::Armed {
            return None;
        }
        self.gauge = (self.gauge - dt * self.rate).max(0.0);
        if !self.revealed && self.gauge <= self.goal + HIGH_NOON_REVEAL_LEAD {
            self.revealed = true;
        }
        if self.gauge > 0.0 {
            return None;
        }
        if is_current {
            self.settle(Verdict::Fail)
        } else {
            self.settle(Verdict::EndedBeforeReady)
        }
    }

    pub(crate) fn press(&mut self, button: Button) -> Option<Verdict> {
        if self.phase != CommandPhase::Armed {
            return None;
        }
        if button == self.required && self.is_ready() {
            self.settle(Verdict::Pass)
        } else {
            self.settle(Verdict::Fail)
        }
    }
}

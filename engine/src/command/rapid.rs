use crate::Button;
use crate::catalog::RapidPreset;

use super::{CommandPhase, Verdict};

pub const PRESS_RATE: f32 = 10.0;
pub const RAGE_PRESS_RATE: f32 = 18.0;
/// Progress lost per second in degrading variants.
pub const DEGRADE_RATE: f32 = 0.3;
pub const WRONG_PRESS_PENALTY: f32 = 1.0;
/// Press increment basis until the first frame is seen.
pub const NOMINAL_DT: f32 = 1.0 / 60.0;

pub const RAGE_MAX: f32 = 2.0;
pub const RAGE_SECONDS: f32 = 10.0;
pub const RAGE_MAX_HALF_RANGE: u32 = 25;

/// Band used by the flow controller for Control-Rage strikes.
pub const DEFAULT_RAGE_RATIO: f32 = 0.5;
pub const DEFAULT_RAGE_HALF_RANGE: u32 = 20;

/// Goal and timer for the mash-to-fill presets.
pub fn preset_goal_and_timer(preset: RapidPreset) -> (f32, f32) {
    match preset {
        RapidPreset::Short => (0.4, 2.0),
        RapidPreset::Medium => (0.8, 3.0),
        RapidPreset::Long => (1.2, 5.0),
        RapidPreset::ControlRage => (RAGE_MAX, RAGE_SECONDS),
    }
}

/// Mash the required button to fill progress before the timer runs out.
#[derive(Debug, Clone)]
pub struct RapidPress {
    preset: RapidPreset,
    button: Button,
    progress: f32,
    goal: f32,
    timer: f32,
    degrade_goal: bool,
    band: Option<(f32, f32)>,
    last_dt: f32,
    phase: CommandPhase,
}

impl RapidPress {
    pub fn new(preset: RapidPreset, button: Button) -> Self {
        if preset == RapidPreset::ControlRage {
            return Self::control_rage(button, DEFAULT_RAGE_RATIO, DEFAULT_RAGE_HALF_RANGE);
        }
        let (goal, timer) = preset_goal_and_timer(preset);
        Self {
            preset,
            button,
            progress: 0.0,
            goal,
            timer,
            degrade_goal: false,
            band: None,
            last_dt: NOMINAL_DT,
            phase: CommandPhase::Inactive,
        }
    }

    /// Hold progress inside `[ratio·max − half%·max, ratio·max + half%·max]` until time runs out.
    /// `ratio` is clamped to [0, 1] and `half_range` to [0, 25].
    pub fn control_rage(button: Button, ratio: f32, half_range: u32) -> Self {
        let ratio = ratio.clamp(0.0, 1.0);
        let half = RAGE_MAX * half_range.min(RAGE_MAX_HALF_RANGE) as f32 / 100.0;
        let center = RAGE_MAX * ratio;
        Self {
            preset: RapidPreset::ControlRage,
            button,
            progress: 0.0,
            goal: RAGE_MAX,
            timer: RAGE_SECONDS,
            degrade_goal: true,
            band: Some((center - half, center + half)),
            last_dt: NOMINAL_DT,
            phase: CommandPhase::Inactive,
        }
    }

    pub fn preset(&self) -> RapidPreset {
        self.preset
    }

    pub fn button(&self) -> Button {
        self.button
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    /// Goal for presets; the maximum value for Control-Rage.
    pub fn goal(&self) -> f32 {
        self.goal
    }

    pub fn band(&self) -> Option<(f32, f32)> {
        self.band
    }

    pub fn time_left(&self) -> f32 {
        self.timer.max(0.0)
    }

    pub fn phase(&self) -> CommandPhase {
        self.phase
    }

    pub fn label(&self) -> &'static str {
        if self.preset == RapidPreset::ControlRage { "RAGE CONTROL" } else { "RAPID PRESS" }
    }

    /// Whether `value` sits inside the Control-Rage band. Always false for presets.
    pub fn in_range(&self, value: f32) -> bool {
        match self.band {
            Some((lo, hi)) => value >= lo && value <= hi,
            None => false,
        }
    }

    pub fn goal_reached(&self) -> bool {
        match self.band {
            Some(_) => self.in_range(self.progress),
            None => self.progress >= self.goal,
        }
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
        self.last_dt = dt;
        self.timer -= dt;
        if self.degrade_goal {
            self.progress = (self.progress - dt * DEGRADE_RATE).max(0.0);
        }
        if self.timer > 0.0 {
            return None;
        }
        if self.goal_reached() {
            self.settle(Verdict::Pass)
        } else if is_current {
            self.settle(Verdict::Fail)
        } else {
            self.settle(Verdict::EndedBeforeReady)
        }
    }

    /// Input for the current instance. Uses the last frame's `dt` as the press increment.
    pub(crate) fn press(&mut self, button: Button) -> Option<Verdict> {
        if self.phase != CommandPhase::Armed {
            return None;
        }
        if button != self.button {
            if self.degrade_goal {
                self.progress = (self.progress - WRONG_PRESS_PENALTY).max(0.0);
            }
            return None;
        }
        let rate = if self.preset == RapidPreset::ControlRage { RAGE_PRESS_RATE } else { PRESS_RATE };
        self.progress = (self.progress + self.last_dt * rate).min(self.goal.max(RAGE_MAX));
        if self.band.is_none() && self.goal_reached() {
            return self.settle(Verdict::Pass);
        }
        None
    }
}

//! Timing and rhythm challenges that gate each strike.
//!
//! An instance goes `Inactive → Armed → {Passed, Failed}` and is dropped once reported.
//! Only the current instance listens to input; the rest wait in FIFO order.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Button;
use crate::catalog::{BonusType, CommandKind};

mod engine;
mod rapid;
mod timely;

pub use engine::CommandEngine;
pub use rapid::RapidPress;
pub use timely::TimelyPress;

/// Handle returned by [`CommandEngine::request`]; reports carry it back.
pub type Ticket = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandPhase {
    Inactive,
    Armed,
    Passed,
    Failed,
}

/// What an instance reports back to the flow controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Passed { bonus: BonusType },
    Failed,
    /// Ran out before it became current. Never mutates stats.
    EndedBeforeReady,
    /// Abandoned by a forced stop.
    Cancelled,
}

impl CommandOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            CommandOutcome::Passed { .. } => "PASS",
            CommandOutcome::Failed => "FAIL",
            CommandOutcome::EndedBeforeReady => "ENDED EARLY",
            CommandOutcome::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandReport {
    pub ticket: Ticket,
    pub outcome: CommandOutcome,
}

/// Internal verdict of a single instance before the engine attaches the bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    Pass,
    Fail,
    EndedBeforeReady,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("no free {0:?} slot")]
    PoolExhausted(CommandKind),
    #[error("{0:?} action commands are not supported")]
    Unsupported(CommandKind),
    #[error("strike needs no action command")]
    NoCommand,
    #[error("strike lists no buttons")]
    NoButtons,
}

/// How many instances of each variant may be outstanding at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct CommandLimits {
    pub rapid: usize,
    pub timely: usize,
}

impl Default for CommandLimits {
    fn default() -> Self {
        Self { rapid: 1, timely: 3 }
    }
}

impl CommandLimits {
    pub fn for_kind(&self, kind: CommandKind) -> usize {
        match kind {
            CommandKind::RapidPress => self.rapid,
            CommandKind::TimelyPress => self.timely,
            _ => 0,
        }
    }
}

/// Read-only snapshot of an instance for presentation and scripted input.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandView {
    pub ticket: Ticket,
    pub kind: CommandKind,
    pub label: &'static str,
    /// None while a High-Noon button is still hidden.
    pub button: Option<Button>,
    pub value: f32,
    pub goal: f32,
    /// Target band of a Control-Rage instance.
    pub band: Option<(f32, f32)>,
    pub ready: bool,
    pub time_left: f32,
    pub phase: CommandPhase,
}

#[derive(Debug, Clone)]
pub(crate) enum Challenge {
    Rapid(RapidPress),
    Timely(TimelyPress),
}

impl Challenge {
    pub(crate) fn kind(&self) -> CommandKind {
        match self {
            Challenge::Rapid(_) => CommandKind::RapidPress,
            Challenge::Timely(_) => CommandKind::TimelyPress,
        }
    }

    pub(crate) fn arm(&mut self) {
        match self {
            Challenge::Rapid(c) => c.arm(),
            Challenge::Timely(c) => c.arm(),
        }
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.phase() == CommandPhase::Armed
    }

    pub(crate) fn phase(&self) -> CommandPhase {
        match self {
            Challenge::Rapid(c) => c.phase(),
            Challenge::Timely(c) => c.phase(),
        }
    }

    pub(crate) fn advance(&mut self, dt: f32, is_current: bool) -> Option<Verdict> {
        match self {
            Challenge::Rapid(c) => c.advance(dt, is_current),
            Challenge::Timely(c) => c.advance(dt, is_current),
        }
    }

    pub(crate) fn press(&mut self, button: Button) -> Option<Verdict> {
        match self {
            Challenge::Rapid(c) => c.press(button),
            Challenge::Timely(c) => c.press(button),
        }
    }

    pub(crate) fn view(&self, ticket: Ticket) -> CommandView {
        match self {
            Challenge::Rapid(c) => CommandView {
                ticket,
                kind: CommandKind::RapidPress,
                label: c.label(),
                button: Some(c.button()),
                value: c.progress(),
                goal: c.goal(),
                band: c.band(),
                ready: c.goal_reached(),
                time_left: c.time_left(),
                phase: c.phase(),
            },
            Challenge::Timely(c) => CommandView {
                ticket,
                kind: CommandKind::TimelyPress,
                label: c.label(),
                button: c.visible_button(),
                value: c.gauge(),
                goal: c.goal(),
                band: None,
                ready: c.is_ready(),
                time_left: c.time_left(),
                phase: c.phase(),
            },
        }
    }
}

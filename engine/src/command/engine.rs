use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::catalog::{BonusType, CommandKind, CommandSpec};
use crate::{Button, Dice};

use super::rapid::RapidPress;
use super::timely::TimelyPress;
use super::{
    Challenge, CommandError, CommandLimits, CommandOutcome, CommandReport, CommandView, Ticket,
    Verdict,
};

#[derive(Debug, Clone)]
struct Slot {
    ticket: Ticket,
    challenge: Challenge,
    bonus: BonusType,
}

impl Slot {
    fn report(&self, verdict: Verdict) -> CommandReport {
        let outcome = match verdict {
            Verdict::Pass => CommandOutcome::Passed { bonus: self.bonus },
            Verdict::Fail => CommandOutcome::Failed,
            Verdict::EndedBeforeReady => CommandOutcome::EndedBeforeReady,
        };
        CommandReport { ticket: self.ticket, outcome }
    }
}

/// FIFO of action command instances with exactly one current instance receiving input.
#[derive(Debug, Clone, Default)]
pub struct CommandEngine {
    current: Option<Slot>,
    queue: VecDeque<Slot>,
    limits: CommandLimits,
    next_ticket: Ticket,
    activated: Vec<Ticket>,
}

impl CommandEngine {
    pub fn new(limits: CommandLimits) -> Self {
        Self { limits, ..Self::default() }
    }

    pub fn limits(&self) -> CommandLimits {
        self.limits
    }

    /// Queue a new instance for `command`. Becomes current at once if nothing else is.
    ///
    /// Requests beyond the variant's capacity are dropped with [`CommandError::PoolExhausted`].
    pub fn request(
        &mut self,
        command: CommandSpec,
        buttons: &[Button],
        bonus: BonusType,
        dice: &mut Dice,
    ) -> Result<Ticket, CommandError> {
        let kind = command.kind();
        match command {
            CommandSpec::None => return Err(CommandError::NoCommand),
            CommandSpec::Sequence(_) | CommandSpec::Stick(_) => {
                return Err(CommandError::Unsupported(kind));
            }
            CommandSpec::Rapid(_) | CommandSpec::Timely(_) => {}
        }

        if !self.has_room(kind) {
            warn!(?kind, "action command request dropped: no free slot");
            return Err(CommandError::PoolExhausted(kind));
        }

        let challenge = match command {
            CommandSpec::Rapid(preset) => {
                let button = dice.pick(buttons).ok_or(CommandError::NoButtons)?;
                Challenge::Rapid(RapidPress::new(preset, button))
            }
            CommandSpec::Timely(preset) => {
                let pool: &[Button] = if preset.is_high_noon() { &Button::ALL } else { buttons };
                let button = dice.pick(pool).ok_or(CommandError::NoButtons)?;
                Challenge::Timely(TimelyPress::new(preset, button))
            }
            _ => return Err(CommandError::Unsupported(kind)),
        };

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        debug!(ticket, ?command, "action command queued");
        self.queue.push_back(Slot { ticket, challenge, bonus });
        self.promote();
        Ok(ticket)
    }

    fn promote(&mut self) {
        if self.current.is_some() {
            return;
        }
        if let Some(mut slot) = self.queue.pop_front() {
            slot.challenge.arm();
            debug!(ticket = slot.ticket, "action command is current");
            self.activated.push(slot.ticket);
            self.current = Some(slot);
        }
    }

    /// Whether a request of `kind` would fit in the pool right now.
    pub fn has_room(&self, kind: CommandKind) -> bool {
        self.outstanding_of(kind) < self.limits.for_kind(kind)
    }

    /// Make the first waiting instance visible so its timer starts, without giving it input.
    pub fn highlight_next(&mut self) -> Option<Ticket> {
        let slot = self.queue.iter_mut().find(|s| !s.challenge.is_armed())?;
        slot.challenge.arm();
        Some(slot.ticket)
    }

    /// Tick every armed instance. Resolved ones are reported in resolution order.
    pub fn advance(&mut self, dt: f32) -> Vec<CommandReport> {
        let mut reports = Vec::new();

        if let Some(cur) = self.current.as_mut() {
            if let Some(verdict) = cur.challenge.advance(dt, true) {
                reports.push(cur.report(verdict));
                self.current = None;
            }
        }

        let mut i = 0;
        while i < self.queue.len() {
            let slot = &mut self.queue[i];
            match slot.challenge.advance(dt, false) {
                Some(verdict) => {
                    let report = slot.report(verdict);
                    if report.outcome == CommandOutcome::EndedBeforeReady {
                        warn!(ticket = report.ticket, "action command ended before it was current");
                    }
                    reports.push(report);
                    self.queue.remove(i);
                }
                None => i += 1,
            }
        }

        self.promote();
        reports
    }

    /// Route input to the current instance.
    pub fn press(&mut self, button: Button) -> Option<CommandReport> {
        let cur = self.current.as_mut()?;
        let verdict = cur.challenge.press(button)?;
        let report = cur.report(verdict);
        self.current = None;
        self.promote();
        Some(report)
    }

    /// Drop every outstanding instance, reporting each as cancelled.
    pub fn cancel_all(&mut self) -> Vec<CommandReport> {
        let reports: Vec<_> = self
            .current
            .take()
            .into_iter()
            .chain(self.queue.drain(..))
            .map(|s| CommandReport { ticket: s.ticket, outcome: CommandOutcome::Cancelled })
            .collect();
        if !reports.is_empty() {
            debug!(count = reports.len(), "action commands cancelled");
        }
        reports
    }

    pub fn current_ticket(&self) -> Option<Ticket> {
        self.current.as_ref().map(|s| s.ticket)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.current_ticket() == Some(ticket)
    }

    pub fn current_view(&self) -> Option<CommandView> {
        self.current.as_ref().map(|s| s.challenge.view(s.ticket))
    }

    pub fn view(&self, ticket: Ticket) -> Option<CommandView> {
        self.current
            .iter()
            .chain(self.queue.iter())
            .find(|s| s.ticket == ticket)
            .map(|s| s.challenge.view(s.ticket))
    }

    pub fn outstanding(&self) -> usize {
        self.queue.len() + usize::from(self.current.is_some())
    }

    fn outstanding_of(&self, kind: CommandKind) -> usize {
        self.current
            .iter()
            .chain(self.queue.iter())
            .filter(|s| s.challenge.kind() == kind)
            .count()
    }

    pub fn is_idle(&self) -> bool {
        self.outstanding() == 0
    }

    /// Tickets in the order they became current since the last reset.
    pub fn activations(&self) -> &[Ticket] {
        &self.activated
    }

    /// Forget activation history, e.g. at the start of a turn.
    pub fn reset_activations(&mut self) {
        self.activated.clear();
    }
}

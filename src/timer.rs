//! Phase state machine.
//!
//! ```text
//! Work --expire--> ShortBreak (rep_count < reps)
//! Work --expire--> LongBreak  (rep_count == reps, rep_count reset)
//! ShortBreak | LongBreak --expire--> Work
//! any running phase <--p--> Paused
//! ```
//!
//! Every operation takes the current time explicitly and returns the
//! notification it wants shown, if any. Nothing here talks to the terminal
//! or the notification service.

use chrono::Duration;
use std::fmt;

use crate::clock::Timestamp;
use crate::config::{Config, MAX_PHASE_MINUTES};
use crate::countdown::{self, Remaining};

/// Reminders only fire on whole multiples of this many minutes.
const REMINDER_EVERY_MINUTES: i64 = 5;
/// No reminder until the phase has been running this many seconds.
const REMINDER_GRACE_SECS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Work,
    ShortBreak,
    LongBreak,
    Paused,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Work => "Work",
            Self::ShortBreak => "Short Break",
            Self::LongBreak => "Long Break",
            Self::Paused => "Paused",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Next phase and repetition count after `phase` runs out.
pub fn transition(phase: Phase, rep_count: u32, reps: u32) -> (Phase, u32) {
    match phase {
        Phase::Work => {
            let done = rep_count + 1;
            if done < reps {
                (Phase::ShortBreak, done)
            } else {
                (Phase::LongBreak, 0)
            }
        }
        Phase::ShortBreak | Phase::LongBreak => (Phase::Work, rep_count),
        Phase::Paused => (Phase::Paused, rep_count),
    }
}

/// Something worth telling the user about on the desktop.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    PhaseStarted { phase: Phase, minutes: f64 },
    Paused { remaining: Remaining },
    Resumed { phase: Phase, remaining: Remaining },
    Reminder { phase: Phase, remaining: Remaining },
}

impl Notice {
    pub fn title(&self) -> String {
        match self {
            Self::PhaseStarted { phase, minutes } => {
                format!("Start {} for {} minutes", phase, format_mins(*minutes))
            }
            Self::Paused { remaining } => format!("Paused. {} remaining", remaining),
            Self::Resumed { phase, remaining } => format!("Resumed: {} for {}", phase, remaining),
            Self::Reminder { phase, remaining } => format!("{} for {}", phase, remaining),
        }
    }

    pub fn body(&self) -> &'static str {
        match self {
            Self::PhaseStarted { phase: Phase::Work, .. } => "Time to focus.",
            Self::PhaseStarted { phase: Phase::LongBreak, .. } => "Great work! Take a longer break.",
            Self::PhaseStarted { .. } => "Time for a short break.",
            Self::Paused { .. } => "Press P to resume.",
            Self::Resumed { .. } => "Back on the clock.",
            Self::Reminder { .. } => "Keep going.",
        }
    }
}

fn format_mins(m: f64) -> String {
    if m.fract() == 0.0 {
        format!("{}", m as u64)
    } else {
        format!("{:.2}", m)
    }
}

/// The mutable timer core, owned by the session loop.
#[derive(Debug, Clone)]
pub struct TimerState {
    config: Config,
    phase: Phase,
    phase_started_at: Timestamp,
    phase_ends_at: Timestamp,
    /// Set only while `phase == Paused`.
    paused_from_phase: Option<Phase>,
    rep_count: u32,
    remaining: Remaining,
    /// Remaining-seconds value of the last reminder fired in this phase.
    last_reminder: Option<i64>,
}

impl TimerState {
    /// A fresh timer in `Work` with no completed repetitions.
    pub fn start(config: Config, now: Timestamp) -> (Self, Notice) {
        let mut state = Self {
            config,
            phase: Phase::Work,
            phase_started_at: now,
            phase_ends_at: now,
            paused_from_phase: None,
            rep_count: 0,
            remaining: Remaining::default(),
            last_reminder: None,
        };
        let notice = state.enter_phase(Phase::Work, now);
        (state, notice)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[cfg(test)]
    pub fn paused_from_phase(&self) -> Option<Phase> {
        self.paused_from_phase
    }

    pub fn rep_count(&self) -> u32 {
        self.rep_count
    }

    pub fn remaining(&self) -> Remaining {
        self.remaining
    }

    #[cfg(test)]
    pub fn phase_started_at(&self) -> Timestamp {
        self.phase_started_at
    }

    #[cfg(test)]
    pub fn phase_ends_at(&self) -> Timestamp {
        self.phase_ends_at
    }

    pub fn is_paused(&self) -> bool {
        self.phase == Phase::Paused
    }

    fn enter_phase(&mut self, phase: Phase, now: Timestamp) -> Notice {
        let minutes = self.config.minutes_for(phase);
        self.phase = phase;
        self.phase_started_at = now;
        self.phase_ends_at = countdown::minutes_to_duration(minutes)
            .and_then(|length| now.checked_add_signed(length))
            .unwrap_or_else(|| {
                log::warn!("{} minutes of {} is out of range; capping at one week", minutes, phase);
                now.checked_add_signed(Duration::minutes(MAX_PHASE_MINUTES as i64)).unwrap_or(now)
            });
        self.last_reminder = None;
        self.refresh(now);
        log::info!("Entered {} for {} minutes (rep {})", phase, format_mins(minutes), self.rep_count);
        Notice::PhaseStarted { phase, minutes }
    }

    /// Recomputes the displayed remaining time and returns the raw
    /// remaining seconds.
    pub fn refresh(&mut self, now: Timestamp) -> i64 {
        let secs = countdown::remaining_seconds(now, self.phase_ends_at);
        self.remaining = Remaining::from_seconds(secs);
        secs
    }

    /// Runs the expiry check for a running phase and moves to the next
    /// phase when the countdown has run out.
    pub fn advance(&mut self, now: Timestamp) -> Option<Notice> {
        if self.is_paused() {
            return None;
        }
        if !countdown::is_expired(self.refresh(now)) {
            return None;
        }
        let (next, rep_count) = transition(self.phase, self.rep_count, self.config.reps);
        self.rep_count = rep_count;
        Some(self.enter_phase(next, now))
    }

    /// Keeps a paused countdown frozen by sliding the end timestamp along
    /// with the clock.
    pub fn hold(&mut self, now: Timestamp) {
        if self.is_paused() {
            self.phase_ends_at = now + self.remaining.as_duration();
        }
    }

    pub fn pause(&mut self, now: Timestamp) -> Option<Notice> {
        if self.is_paused() {
            return None;
        }
        self.refresh(now);
        self.paused_from_phase = Some(self.phase);
        self.phase = Phase::Paused;
        self.hold(now);
        log::info!("Paused with {} remaining", self.remaining);
        Some(Notice::Paused { remaining: self.remaining })
    }

    pub fn resume(&mut self, now: Timestamp) -> Option<Notice> {
        let from = self.paused_from_phase.filter(|_| self.is_paused())?;
        self.hold(now);
        self.phase = from;
        self.paused_from_phase = None;
        log::info!("Resumed {} with {} remaining", from, self.remaining);
        Some(Notice::Resumed { phase: from, remaining: self.remaining })
    }

    pub fn toggle_pause(&mut self, now: Timestamp) -> Option<Notice> {
        if self.is_paused() {
            self.resume(now)
        } else {
            self.pause(now)
        }
    }

    /// Pushes the end of the running phase back by one minute.
    pub fn add_minute(&mut self) -> bool {
        if self.is_paused() {
            return false;
        }
        match self.phase_ends_at.checked_add_signed(Duration::seconds(60)) {
            Some(ends_at) => {
                self.phase_ends_at = ends_at;
                log::info!("Added a minute to {}", self.phase);
                true
            }
            None => {
                log::warn!("Cannot extend {} any further", self.phase);
                false
            }
        }
    }

    /// Ends the running phase now; the next `advance` moves on.
    pub fn skip(&mut self, now: Timestamp) -> bool {
        if self.is_paused() {
            return false;
        }
        self.phase_ends_at = now;
        log::info!("Skipping the rest of {}", self.phase);
        true
    }

    /// Reminder on every positive five-minute mark, once the phase has run
    /// for at least a minute. Each mark fires at most once per phase.
    pub fn check_reminder(&mut self, now: Timestamp) -> Option<Notice> {
        if self.is_paused() {
            return None;
        }
        let Remaining { minutes, seconds } = self.remaining;
        let on_mark = seconds == 0 && minutes > 0 && minutes % REMINDER_EVERY_MINUTES == 0;
        if !on_mark || now - self.phase_started_at < Duration::seconds(REMINDER_GRACE_SECS) {
            return None;
        }
        let mark = self.remaining.total_seconds();
        if self.last_reminder == Some(mark) {
            return None;
        }
        self.last_reminder = Some(mark);
        Some(Notice::Reminder { phase: self.phase, remaining: self.remaining })
    }
}

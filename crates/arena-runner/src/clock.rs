//! Match clock.
//!
//! All methods take the current instant explicitly; the match actor reads
//! it from `tokio::time`, so tests can drive the clock with paused time.

use arena_core::TimeControl;
use chess_core::Color;
use std::time::Duration;
use tokio::time::Instant;

/// Chess clock for both players
#[derive(Debug, Clone)]
pub struct MatchClock {
    pub time_control: TimeControl,
    /// White's remaining time in milliseconds
    pub white_time_ms: u64,
    /// Black's remaining time in milliseconds
    pub black_time_ms: u64,
    /// Which side's clock is running and since when
    running: Option<(Color, Instant)>,
    /// Side whose time ran out, if any
    flagged: Option<Color>,
}

impl MatchClock {
    pub fn new(time_control: TimeControl) -> Self {
        let initial_ms = time_control.initial_ms();
        Self {
            time_control,
            white_time_ms: initial_ms,
            black_time_ms: initial_ms,
            running: None,
            flagged: None,
        }
    }

    fn time_mut(&mut self, color: Color) -> &mut u64 {
        match color {
            Color::White => &mut self.white_time_ms,
            Color::Black => &mut self.black_time_ms,
        }
    }

    /// Start (or switch) the clock to `color`.
    pub fn start(&mut self, color: Color, now: Instant) {
        if self.flagged.is_none() {
            self.running = Some((color, now));
        }
    }

    pub fn running_for(&self) -> Option<Color> {
        self.running.map(|(c, _)| c)
    }

    pub fn flagged(&self) -> Option<Color> {
        self.flagged
    }

    /// Charge elapsed time to the running side. Returns the side whose
    /// time ran out, the first time it happens.
    pub fn tick(&mut self, now: Instant) -> Option<Color> {
        let (color, since) = self.running?;
        let elapsed_ms = now.saturating_duration_since(since).as_millis() as u64;
        let remaining = self.time_mut(color);
        let charged = elapsed_ms.min(*remaining);
        *remaining -= charged;
        // Carry the sub-millisecond remainder into the next tick.
        let since = since + Duration::from_millis(charged);
        if *remaining == 0 {
            self.running = None;
            self.flagged = Some(color);
            return Some(color);
        }
        self.running = Some((color, since));
        None
    }

    /// Settle the mover's time, credit increment plus `bonus_ms`, and
    /// start `next`'s clock. Returns the flagged side if the mover ran
    /// out before the move arrived.
    pub fn commit_move(
        &mut self,
        mover: Color,
        next: Color,
        bonus_ms: u64,
        now: Instant,
    ) -> Option<Color> {
        if let Some(flag) = self.tick(now) {
            return Some(flag);
        }
        if self.flagged.is_some() {
            return self.flagged;
        }
        let increment_ms = self.time_control.increment_ms();
        *self.time_mut(mover) += increment_ms + bonus_ms;
        self.start(next, now);
        None
    }

    /// Stop the clock without crediting anything.
    pub fn stop(&mut self, now: Instant) {
        self.tick(now);
        self.running = None;
    }

    /// Current remaining time for a player (accounting for running clock)
    pub fn remaining_ms(&self, color: Color, now: Instant) -> u64 {
        let base_ms = match color {
            Color::White => self.white_time_ms,
            Color::Black => self.black_time_ms,
        };
        let elapsed_ms = match self.running {
            Some((c, since)) if c == color => now.saturating_duration_since(since).as_millis() as u64,
            _ => 0,
        };
        base_ms.saturating_sub(elapsed_ms)
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod clock_tests;

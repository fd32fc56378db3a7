//! Legislative calendar heuristic
//!
//! Source data changes slowly while the House is not sitting, so cache TTLs
//! are stretched by a multiplier during recess windows.

use chrono::{Datelike, NaiveDate};

/// Recess window as (month, day) bounds, inclusive on both ends.
/// A window whose start is later in the year than its end wraps the year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecessWindow {
    pub start: (u32, u32),
    pub end: (u32, u32),
}

impl RecessWindow {
    pub const fn new(start_month: u32, start_day: u32, end_month: u32, end_day: u32) -> Self {
        Self {
            start: (start_month, start_day),
            end: (end_month, end_day),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        let md = (date.month(), date.day());
        if self.start <= self.end {
            md >= self.start && md <= self.end
        } else {
            md >= self.start || md <= self.end
        }
    }
}

/// Default recess windows
pub const DEFAULT_RECESS_WINDOWS: [RecessWindow; 4] = [
    // Summer
    RecessWindow::new(6, 23, 9, 15),
    // Winter break (wraps year)
    RecessWindow::new(12, 17, 1, 26),
    // Family Day week
    RecessWindow::new(2, 14, 2, 21),
    // Spring break
    RecessWindow::new(3, 15, 3, 29),
];

#[derive(Debug, Clone)]
pub struct RecessCalendar {
    windows: Vec<RecessWindow>,
}

impl Default for RecessCalendar {
    fn default() -> Self {
        Self::new(DEFAULT_RECESS_WINDOWS.to_vec())
    }
}

impl RecessCalendar {
    pub fn new(windows: Vec<RecessWindow>) -> Self {
        Self { windows }
    }

    pub fn is_recess(&self, date: NaiveDate) -> bool {
        self.windows.iter().any(|w| w.contains(date))
    }

    pub fn in_session(&self, date: NaiveDate) -> bool {
        !self.is_recess(date)
    }
}

/// Stretch `base_ttl` by `recess_multiplier` when not in session
pub fn effective_ttl(base_ttl: u64, in_session: bool, recess_multiplier: f64) -> u64 {
    if in_session {
        base_ttl
    } else {
        (base_ttl as f64 * recess_multiplier) as u64
    }
}

/// Calendar plus multiplier, evaluated against today's date
#[derive(Debug, Clone)]
pub struct TtlPolicy {
    calendar: RecessCalendar,
    recess_multiplier: f64,
}

impl TtlPolicy {
    pub fn new(calendar: RecessCalendar, recess_multiplier: f64) -> Self {
        Self {
            calendar,
            recess_multiplier,
        }
    }

    pub fn effective_on(&self, base_ttl: u64, date: NaiveDate) -> u64 {
        effective_ttl(base_ttl, self.calendar.in_session(date), self.recess_multiplier)
    }

    pub fn effective(&self, base_ttl: u64) -> u64 {
        self.effective_on(base_ttl, parlcards_common::time::today())
    }
}

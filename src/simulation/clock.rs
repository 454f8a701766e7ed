//! Simulation calendar
//!
//! Time advances one day per step. Each day carries its number and a weekday
//! label drawn from a repeating Mon..Sun cycle starting on Monday.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Weekday {
    Mon,
    Tues,
    Weds,
    Thurs,
    Fri,
    Sat,
    Sun,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tues,
        Weekday::Weds,
        Weekday::Thurs,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    /// Weekday label of the given day number (day 0 is a Monday)
    pub fn from_day_number(day_num: u32) -> Self {
        Self::ALL[(day_num % 7) as usize]
    }

    /// Position in the week, Monday first
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Weekday::Mon => "Mon",
            Weekday::Tues => "Tues",
            Weekday::Weds => "Weds",
            Weekday::Thurs => "Thurs",
            Weekday::Fri => "Fri",
            Weekday::Sat => "Sat",
            Weekday::Sun => "Sun",
        }
    }

    /// Parse a label, accepting the canonical labels and common abbreviations
    pub fn parse(label: &str) -> Option<Self> {
        let lower = label.trim().to_ascii_lowercase();
        let day = match lower.as_str() {
            "mon" | "monday" => Weekday::Mon,
            "tue" | "tues" | "tuesday" => Weekday::Tues,
            "wed" | "weds" | "wednesday" => Weekday::Weds,
            "thu" | "thur" | "thurs" | "thursday" => Weekday::Thurs,
            "fri" | "friday" => Weekday::Fri,
            "sat" | "saturday" => Weekday::Sat,
            "sun" | "sunday" => Weekday::Sun,
            _ => return None,
        };
        Some(day)
    }

    pub fn is_weekend(self) -> bool {
        matches!(self, Weekday::Sat | Weekday::Sun)
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One simulated day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Day {
    pub number: u32,
    pub weekday: Weekday,
}

impl Day {
    pub fn new(number: u32) -> Self {
        Self {
            number,
            weekday: Weekday::from_day_number(number),
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "day {} ({})", self.number, self.weekday)
    }
}

/// Iterator over the days `0..horizon`
#[derive(Debug, Clone)]
pub struct SimulationClock {
    next: u32,
    horizon: u32,
}

impl SimulationClock {
    pub fn new(horizon: u32) -> Self {
        Self { next: 0, horizon }
    }
}

impl Iterator for SimulationClock {
    type Item = Day;

    fn next(&mut self) -> Option<Day> {
        if self.next >= self.horizon {
            return None;
        }
        let day = Day::new(self.next);
        self.next += 1;
        Some(day)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.horizon - self.next.min(self.horizon)) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SimulationClock {}

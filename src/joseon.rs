//! Joseon double-hour table
//!
//! ## Table of Contents
//! - **JoseonTime**: Display metadata for one 2-hour block
//! - **Phase**: Coarse DAY/NIGHT flag
//! - **lookup**: Hour of day to double-hour
//!
//! The twelve blocks (십이시) start at 23:00 with 자시 and advance every two
//! hours. Five of them are night.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse day/night phase as the backend names it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    /// Daylight blocks
    Day,
    /// Night blocks
    Night,
}

impl Phase {
    /// Phase for an `is_night` flag
    pub fn from_night(is_night: bool) -> Self {
        if is_night {
            Phase::Night
        } else {
            Phase::Day
        }
    }

    /// The other phase
    pub fn opposite(self) -> Self {
        match self {
            Phase::Day => Phase::Night,
            Phase::Night => Phase::Day,
        }
    }

    /// Backend path that announces this phase
    pub fn endpoint(self) -> &'static str {
        match self {
            Phase::Day => "/day",
            Phase::Night => "/night",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Day => write!(f, "DAY"),
            Phase::Night => write!(f, "NIGHT"),
        }
    }
}

/// One Joseon double-hour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoseonTime {
    /// Block name, e.g. 자시
    pub name: &'static str,
    /// Zodiac animal emoji
    pub emoji: &'static str,
    /// Wall-clock span, e.g. `23:00 ~ 01:00`
    pub period: &'static str,
    /// Short description, e.g. 쥐의 시간
    pub description: &'static str,
    /// Whether this block counts as night
    pub is_night: bool,
}

impl JoseonTime {
    /// DAY or NIGHT
    pub fn phase(&self) -> Phase {
        Phase::from_night(self.is_night)
    }

    /// Header label: name followed by emoji
    pub fn label(&self) -> String {
        format!("{} {}", self.name, self.emoji)
    }
}

impl fmt::Display for JoseonTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}) {} [{}]",
            self.name,
            self.emoji,
            self.period,
            self.description,
            self.phase()
        )
    }
}

const fn block(
    name: &'static str,
    emoji: &'static str,
    period: &'static str,
    description: &'static str,
    is_night: bool,
) -> JoseonTime {
    JoseonTime {
        name,
        emoji,
        period,
        description,
        is_night,
    }
}

/// The twelve double-hours, starting with 자시 (23:00 ~ 01:00)
pub const DOUBLE_HOURS: [JoseonTime; 12] = [
    block("자시", "🐭", "23:00 ~ 01:00", "쥐의 시간", true),
    block("축시", "🐮", "01:00 ~ 03:00", "소의 시간", true),
    block("인시", "🐯", "03:00 ~ 05:00", "호랑이의 시간", true),
    block("묘시", "🐰", "05:00 ~ 07:00", "토끼의 시간", false),
    block("진시", "🐉", "07:00 ~ 09:00", "용의 시간", false),
    block("사시", "🐍", "09:00 ~ 11:00", "뱀의 시간", false),
    block("오시", "🐴", "11:00 ~ 13:00", "말의 시간", false),
    block("미시", "🐑", "13:00 ~ 15:00", "양의 시간", false),
    block("신시", "🐵", "15:00 ~ 17:00", "원숭이의 시간", false),
    block("유시", "🐔", "17:00 ~ 19:00", "닭의 시간", false),
    block("술시", "🐶", "19:00 ~ 21:00", "개의 시간", true),
    block("해시", "🐷", "21:00 ~ 23:00", "돼지의 시간", true),
];

/// Index into [`DOUBLE_HOURS`] for an hour of day.
///
/// Hours outside 0..24 are wrapped first.
pub fn block_index(hour: u32) -> usize {
    let hour = hour % 24;
    (((hour + 1) % 24) / 2) as usize
}

/// Double-hour for an hour of day
pub fn lookup(hour: u32) -> &'static JoseonTime {
    &DOUBLE_HOURS[block_index(hour)]
}

/// Coarse daylight window used for backgrounds (06:00 to 18:00)
pub fn is_day_time(hour: u32) -> bool {
    (6..18).contains(&(hour % 24))
}

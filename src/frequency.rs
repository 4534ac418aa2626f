//! Update frequency: how long a downloaded `composer.phar` stays fresh.
//!
//! Accepts relative-time expressions such as `7 days`, `1 week 2 days`,
//! `2 weeks ago`, `last month` or `3 weekdays`, and bare signed integers
//! (`-100`, `+3`) meaning that many days. An unsigned integer without a unit
//! is refused because it is unclear which unit was meant.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Duration, Local, Months, Weekday};
use regex::Regex;

use crate::error::ConfigError;

pub const DEFAULT_UPDATE_FREQ: &str = "7 days";

static EXPRESSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:\s*(?:[+-]?\s*\d+\s*|(?:next|last|previous)\s+)[a-z]+)+(?:\s+ago)?\s*$")
        .expect("valid expression regex")
});
static TERM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:([+-]?)\s*(\d+)\s*|(next|last|previous)\s+)([a-z]+)").expect("valid term regex")
});
static AGO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+ago$").expect("valid ago regex"));
static SIGNED_DAYS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]\d+$").expect("valid signed integer regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Second,
    Minute,
    Hour,
    Day,
    Weekday,
    Week,
    Fortnight,
    Month,
    Year,
}

impl Unit {
    fn parse(word: &str) -> Option<Unit> {
        let unit = match word.to_ascii_lowercase().as_str() {
            "sec" | "secs" | "second" | "seconds" => Unit::Second,
            "min" | "mins" | "minute" | "minutes" => Unit::Minute,
            "hour" | "hours" => Unit::Hour,
            "day" | "days" => Unit::Day,
            "weekday" | "weekdays" => Unit::Weekday,
            "week" | "weeks" => Unit::Week,
            "fortnight" | "fortnights" => Unit::Fortnight,
            "month" | "months" => Unit::Month,
            "year" | "years" => Unit::Year,
            _ => return None,
        };
        Some(unit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Term {
    amount: i64,
    unit: Unit,
}

impl Term {
    /// Moves `at` backwards by this term; a negative amount moves it forwards.
    fn rewind(&self, at: DateTime<Local>, flip: bool) -> Option<DateTime<Local>> {
        let amount = if flip { -self.amount } else { self.amount };
        let fixed = |d: Duration| at.checked_sub_signed(d);
        match self.unit {
            Unit::Second => fixed(Duration::try_seconds(amount)?),
            Unit::Minute => fixed(Duration::try_minutes(amount)?),
            Unit::Hour => fixed(Duration::try_hours(amount)?),
            Unit::Day => fixed(Duration::try_days(amount)?),
            Unit::Weekday => rewind_weekdays(at, amount),
            Unit::Week => fixed(Duration::try_weeks(amount)?),
            Unit::Fortnight => fixed(Duration::try_weeks(amount.checked_mul(2)?)?),
            Unit::Month | Unit::Year => {
                let months = match self.unit {
                    Unit::Year => amount.checked_mul(12)?,
                    _ => amount,
                };
                let count = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
                if months >= 0 {
                    at.checked_sub_months(count)
                } else {
                    at.checked_add_months(count)
                }
            }
        }
    }
}

/// Steps back over `amount` working days, skipping Saturdays and Sundays.
fn rewind_weekdays(at: DateTime<Local>, amount: i64) -> Option<DateTime<Local>> {
    let direction: i64 = if amount >= 0 { -1 } else { 1 };
    let count = amount.unsigned_abs();
    let weeks = i64::try_from(count / 5).ok()?;
    let mut at = at.checked_add_signed(Duration::try_weeks(weeks.checked_mul(direction)?)?)?;
    let mut left = count % 5;
    while left > 0 {
        at = at.checked_add_signed(Duration::try_days(direction)?)?;
        if !matches!(at.weekday(), Weekday::Sat | Weekday::Sun) {
            left -= 1;
        }
    }
    Some(at)
}

/// A validated update frequency that remembers how it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateFrequency {
    raw: String,
    terms: Vec<Term>,
}

impl UpdateFrequency {
    /// Parses the textual form used by environment variables and config files.
    pub fn parse(input: &str) -> Result<UpdateFrequency, ConfigError> {
        let invalid = || ConfigError::UpdateFrequency(input.to_string());
        let trimmed = input.trim();

        let terms = if SIGNED_DAYS.is_match(trimmed) {
            let amount: i64 = trimmed.parse().map_err(|_| invalid())?;
            vec![Term { amount, unit: Unit::Day }]
        } else if EXPRESSION.is_match(trimmed) {
            // `ago` turns the whole expression around.
            let ago = AGO.is_match(trimmed);
            let body = AGO.replace(trimmed, "");
            let mut terms = Vec::new();
            for caps in TERM.captures_iter(&body) {
                let amount: i64 = match (caps.get(2), caps.get(3)) {
                    (Some(digits), _) => {
                        let amount: i64 = digits.as_str().parse().map_err(|_| invalid())?;
                        if &caps[1] == "-" { -amount } else { amount }
                    }
                    (None, Some(word)) if word.as_str().eq_ignore_ascii_case("next") => 1,
                    _ => -1,
                };
                let unit = Unit::parse(&caps[4]).ok_or_else(invalid)?;
                terms.push(Term { amount: if ago { -amount } else { amount }, unit });
            }
            terms
        } else {
            return Err(invalid());
        };

        let frequency = UpdateFrequency { raw: input.to_string(), terms };
        // Zero would mark every run as stale.
        let now = Local::now();
        match frequency.threshold(now) {
            Some(threshold) if threshold < now => Ok(frequency),
            _ => Err(invalid()),
        }
    }

    /// Accepts a JSON scalar: strings go through [`UpdateFrequency::parse`],
    /// numbers must be negative integers.
    pub fn from_json(value: &serde_json::Value) -> Result<UpdateFrequency, ConfigError> {
        match value {
            serde_json::Value::String(s) => UpdateFrequency::parse(s),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(days) if days < 0 => UpdateFrequency::parse(&days.to_string()),
                _ => Err(ConfigError::UpdateFrequency(n.to_string())),
            },
            other => Err(ConfigError::UpdateFrequency(other.to_string())),
        }
    }

    /// The value exactly as it was supplied.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The point in time before which a file counts as stale.
    ///
    /// The direction of the expression does not matter: `-7 days` and
    /// `7 days` both look one week back.
    pub fn threshold(&self, now: DateTime<Local>) -> Option<DateTime<Local>> {
        let backwards = self.apply(now, false)?;
        if backwards <= now {
            return Some(backwards);
        }
        self.apply(now, true)
    }

    fn apply(&self, now: DateTime<Local>, flip: bool) -> Option<DateTime<Local>> {
        self.terms
            .iter()
            .try_fold(now, |at, term| term.rewind(at, flip))
    }
}

impl Default for UpdateFrequency {
    fn default() -> Self {
        UpdateFrequency {
            raw: DEFAULT_UPDATE_FREQ.to_string(),
            terms: vec![Term { amount: 7, unit: Unit::Day }],
        }
    }
}

impl fmt::Display for UpdateFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

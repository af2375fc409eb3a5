//! Compact period tokens used by the plan-limits payload.
//!
//! A token is either the sentinel `unlimited` or `<quantity><unit>` with unit one of
//! `y`, `m`, `w`, `d`. Decoding produces the earliest queryable date relative to today, so a
//! zero quantity limits queries to today.

use chrono::{Days, Months, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

pub const UNLIMITED: &str = "unlimited";

static TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,6})([ymwd])$").expect("Invalid duration token regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DurationUnit {
    Year,
    Month,
    Week,
    Day,
}

impl DurationUnit {
    fn from_letter(letter: &str) -> Option<Self> {
        match letter {
            "y" => Some(Self::Year),
            "m" => Some(Self::Month),
            "w" => Some(Self::Week),
            "d" => Some(Self::Day),
            _ => None,
        }
    }

    pub fn letter(&self) -> char {
        match self {
            Self::Year => 'y',
            Self::Month => 'm',
            Self::Week => 'w',
            Self::Day => 'd',
        }
    }

    fn noun(&self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Month => "month",
            Self::Week => "week",
            Self::Day => "day",
        }
    }
}

/// A historical-depth limit: either no lower bound, or a calendar offset back from today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DurationLimit {
    Unlimited,
    Offset { quantity: u32, unit: DurationUnit },
}

impl DurationLimit {
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        if token == UNLIMITED {
            return Some(Self::Unlimited);
        }
        let caps = TOKEN_REGEX.captures(token)?;
        let quantity = caps.get(1)?.as_str().parse::<u32>().ok()?;
        let unit = DurationUnit::from_letter(caps.get(2)?.as_str())?;
        Some(Self::Offset { quantity, unit })
    }

    pub fn days(quantity: u32) -> Self {
        Self::Offset {
            quantity,
            unit: DurationUnit::Day,
        }
    }

    pub fn years(quantity: u32) -> Self {
        Self::Offset {
            quantity,
            unit: DurationUnit::Year,
        }
    }

    /// Wire form, e.g. `3y` or `unlimited`.
    pub fn token(&self) -> String {
        match self {
            Self::Unlimited => UNLIMITED.to_string(),
            Self::Offset { quantity, unit } => format!("{}{}", quantity, unit.letter()),
        }
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, Self::Unlimited)
    }

    /// Earliest queryable date counted back from `today`; `None` means no lower bound.
    pub fn earliest_date_from(&self, today: NaiveDate) -> Option<NaiveDate> {
        let Self::Offset { quantity, unit } = *self else {
            return None;
        };
        let shifted = match unit {
            DurationUnit::Year => quantity
                .checked_mul(12)
                .and_then(|months| today.checked_sub_months(Months::new(months))),
            DurationUnit::Month => today.checked_sub_months(Months::new(quantity)),
            DurationUnit::Week => today.checked_sub_days(Days::new(u64::from(quantity) * 7)),
            DurationUnit::Day => today.checked_sub_days(Days::new(u64::from(quantity))),
        };
        Some(shifted.unwrap_or(NaiveDate::MIN))
    }

    pub fn earliest_date(&self) -> Option<NaiveDate> {
        self.earliest_date_from(today())
    }
}

impl fmt::Display for DurationLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlimited => write!(f, "{}", UNLIMITED),
            Self::Offset { quantity, unit } => {
                let plural = if *quantity == 1 { "" } else { "s" };
                write!(f, "{} {}{}", quantity, unit.noun(), plural)
            }
        }
    }
}

impl TryFrom<String> for DurationLimit {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid_duration_token: {}", value))
    }
}

impl From<DurationLimit> for String {
    fn from(value: DurationLimit) -> Self {
        value.token()
    }
}

/// Outcome of decoding a raw token, keeping "unlimited" and "malformed" apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    Unlimited,
    Malformed,
    Date(NaiveDate),
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn is_duration_token(value: &str) -> bool {
    DurationLimit::parse(value).is_some()
}

pub fn decode_from(token: &str, today: NaiveDate) -> Decoded {
    match DurationLimit::parse(token) {
        None => Decoded::Malformed,
        Some(limit) => match limit.earliest_date_from(today) {
            Some(date) => Decoded::Date(date),
            None => Decoded::Unlimited,
        },
    }
}

pub fn decode(token: &str) -> Decoded {
    decode_from(token, today())
}

/// Two-way variant: `None` for both the unlimited sentinel and malformed input.
/// Callers that must tell those apart branch on the token or use [`decode`].
pub fn decode_date(token: &str) -> Option<NaiveDate> {
    match decode(token) {
        Decoded::Date(date) => Some(date),
        Decoded::Unlimited | Decoded::Malformed => None,
    }
}

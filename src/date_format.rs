//! Date/time text format detection and pattern handling.
//!
//! Patterns use LDML-style tokens (`yyyy`, `MM`, `MMM`, `dd`, `HH`, `mm`,
//! `ss`, `SSS`, `XXX`, quoted literals such as `'T'`) and are translated to
//! chrono `strftime` specifications for parsing and formatting.
//!
//! Detection walks a ranked cross-product of candidates: date bases (locale
//! pattern, default ISO pattern, then a fixed list of common patterns) ×
//! time-of-day suffixes (coarsest first) × date/time separators × zone
//! notations. The first combination that parses the value wins.

use std::fmt::Write as _;

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc,
    format::{self, Parsed, StrftimeItems},
};
use itertools::Itertools;
use log::debug;
use thiserror::Error;

use crate::{column::TimeUnit, guess, locale::Locale};

pub const DEFAULT_DATE_PATTERN: &str = "yyyy-MM-dd";

const EXTRA_DATE_PATTERNS: &[&str] = &[
    "dd.MM.yyyy",
    "d.M.yyyy",
    "dd/MM/yyyy",
    "MM/dd/yyyy",
    "yyyy/MM/dd",
    "dd-MM-yyyy",
    "d MMM yyyy",
    "MMM d, yyyy",
    "d MMMM yyyy",
    "MMMM d, yyyy",
];

struct TimeSuffix {
    pattern: &'static str,
    unit: Option<TimeUnit>,
}

const TIME_SUFFIXES: &[TimeSuffix] = &[
    TimeSuffix {
        pattern: "",
        unit: None,
    },
    TimeSuffix {
        pattern: "HH",
        unit: Some(TimeUnit::Hour),
    },
    TimeSuffix {
        pattern: "HH:mm",
        unit: Some(TimeUnit::Minute),
    },
    TimeSuffix {
        pattern: "HH:mm:ss",
        unit: Some(TimeUnit::Second),
    },
    TimeSuffix {
        pattern: "HH:mm:ss.SSS",
        unit: Some(TimeUnit::Millisecond),
    },
];

const DATE_TIME_SEPARATORS: &[&str] = &[" ", "'T'"];

const ZONE_NOTATIONS: &[&str] = &["", "'Z'", "XXX", "XX", " XXX", " XX"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("Unterminated quoted literal in pattern \"{0}\"")]
    UnterminatedLiteral(String),
    #[error("Unsupported token '{token}' in pattern \"{pattern}\"")]
    UnsupportedToken { token: String, pattern: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedFormat {
    /// Parsing pattern for the raw text (`source.format`).
    pub format: String,
    pub time_unit: TimeUnit,
}

/// Date base candidates in trial order, duplicates removed.
pub fn candidate_date_patterns(locale: &Locale) -> Vec<&'static str> {
    [locale.date_pattern(), DEFAULT_DATE_PATTERN]
        .into_iter()
        .chain(EXTRA_DATE_PATTERNS.iter().copied())
        .unique()
        .collect()
}

fn combinations(bases: &[&str]) -> Vec<(String, Option<TimeUnit>)> {
    let mut patterns = Vec::new();
    for base in bases {
        for suffix in TIME_SUFFIXES {
            if suffix.pattern.is_empty() {
                patterns.push((base.to_string(), None));
                continue;
            }
            for separator in DATE_TIME_SEPARATORS {
                for zone in ZONE_NOTATIONS {
                    patterns.push((
                        format!("{base}{separator}{}{zone}", suffix.pattern),
                        suffix.unit,
                    ));
                }
            }
        }
    }
    patterns
}

/// Finds the first candidate pattern that parses `value`.
///
/// A bare date takes its granularity from the column name when the name
/// points at a calendar unit (`BirthMonth`), and is a day otherwise. This is
/// a heuristic: `10.04.2005` says nothing about whether the column is meant
/// to be grouped by day.
pub fn detect(value: &str, locale: &Locale, column_name: &str) -> Option<DetectedFormat> {
    let trimmed = value.trim();
    let bases = candidate_date_patterns(locale);
    let (format, unit) = combinations(&bases)
        .into_iter()
        .find(|(pattern, _)| parse_with_format(trimmed, pattern).is_some())?;
    let time_unit = unit.unwrap_or_else(|| bare_date_unit(column_name));
    debug!("Detected format \"{format}\" ({time_unit}) for value \"{trimmed}\"");
    Some(DetectedFormat { format, time_unit })
}

/// Re-tries the time-of-day suffixes on the implied date part (the locale
/// pattern, then the default pattern) and returns the first that parses.
pub fn refine_format(value: &str, locale: &Locale) -> Option<String> {
    let trimmed = value.trim();
    let bases = [locale.date_pattern(), DEFAULT_DATE_PATTERN]
        .into_iter()
        .unique()
        .collect::<Vec<_>>();
    combinations(&bases)
        .into_iter()
        .map(|(pattern, _)| pattern)
        .find(|pattern| parse_with_format(trimmed, pattern).is_some())
}

fn bare_date_unit(column_name: &str) -> TimeUnit {
    guess::time_unit_hint(column_name)
        .filter(TimeUnit::is_calendar)
        .unwrap_or(TimeUnit::Day)
}

pub fn validate_pattern(pattern: &str) -> Result<(), PatternError> {
    to_chrono(pattern).map(|_| ())
}

/// Text a pattern field accepts, checked before handing the value to chrono.
///
/// chrono reads `%Y` or `%d` from any number of digits up to the field's
/// maximum, so `dd.MM.yyyy` would otherwise accept `1.2.3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Digits(usize),
    ShortDigits,
    Word,
    Zone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Literal(char),
    Field { spec: &'static str, shape: Shape },
}

fn tokenize(pattern: &str) -> Result<Vec<Token>, PatternError> {
    let chars = pattern.chars().collect::<Vec<_>>();
    let mut tokens = Vec::with_capacity(chars.len());
    let mut idx = 0;
    while idx < chars.len() {
        let ch = chars[idx];
        if ch == '\'' {
            if chars.get(idx + 1) == Some(&'\'') {
                tokens.push(Token::Literal('\''));
                idx += 2;
                continue;
            }
            let mut end = idx + 1;
            while end < chars.len() && chars[end] != '\'' {
                tokens.push(Token::Literal(chars[end]));
                end += 1;
            }
            if end == chars.len() {
                return Err(PatternError::UnterminatedLiteral(pattern.to_string()));
            }
            idx = end + 1;
            continue;
        }
        if !ch.is_ascii_alphabetic() {
            tokens.push(Token::Literal(ch));
            idx += 1;
            continue;
        }
        let mut run = 1;
        while chars.get(idx + run) == Some(&ch) {
            run += 1;
        }
        let (spec, shape) = match (ch, run) {
            ('y', 2) => ("%y", Shape::Digits(2)),
            ('y', _) => ("%Y", Shape::Digits(4)),
            ('M', 1) => ("%-m", Shape::ShortDigits),
            ('M', 2) => ("%m", Shape::Digits(2)),
            ('M', 3) => ("%b", Shape::Word),
            ('M', 4) => ("%B", Shape::Word),
            ('d', 1) => ("%-d", Shape::ShortDigits),
            ('d', 2) => ("%d", Shape::Digits(2)),
            ('E', 1..=3) => ("%a", Shape::Word),
            ('E', 4) => ("%A", Shape::Word),
            ('H', 1) => ("%-H", Shape::ShortDigits),
            ('H', 2) => ("%H", Shape::Digits(2)),
            ('h', 1) => ("%-I", Shape::ShortDigits),
            ('h', 2) => ("%I", Shape::Digits(2)),
            ('a', 1) => ("%p", Shape::Word),
            ('m', 1) => ("%-M", Shape::ShortDigits),
            ('m', 2) => ("%M", Shape::Digits(2)),
            ('s', 1) => ("%-S", Shape::ShortDigits),
            ('s', 2) => ("%S", Shape::Digits(2)),
            ('S', 3) => ("%3f", Shape::Digits(3)),
            ('X', 2) => ("%z", Shape::Zone),
            ('X', 3) => ("%:z", Shape::Zone),
            _ => {
                return Err(PatternError::UnsupportedToken {
                    token: ch.to_string().repeat(run),
                    pattern: pattern.to_string(),
                });
            }
        };
        tokens.push(Token::Field { spec, shape });
        idx += run;
    }
    Ok(tokens)
}

/// Translates an LDML-style pattern into a chrono `strftime` specification.
pub fn to_chrono(pattern: &str) -> Result<String, PatternError> {
    let tokens = tokenize(pattern)?;
    Ok(chrono_spec(&tokens))
}

fn chrono_spec(tokens: &[Token]) -> String {
    let mut spec = String::with_capacity(tokens.len() * 2);
    for token in tokens {
        match token {
            Token::Literal('%') => spec.push_str("%%"),
            Token::Literal(ch) => spec.push(*ch),
            Token::Field { spec: item, .. } => spec.push_str(item),
        }
    }
    spec
}

/// Byte length of the longest prefix of `text` made of chars matching `accept`.
fn prefix_len(text: &str, accept: impl Fn(char) -> bool) -> usize {
    text.char_indices()
        .find(|(_, ch)| !accept(*ch))
        .map_or(text.len(), |(idx, _)| idx)
}

/// True when `text` has exactly the field widths and literals of `tokens`.
fn matches_shape(text: &str, tokens: &[Token]) -> bool {
    let mut rest = text;
    for token in tokens {
        let taken = match token {
            Token::Literal(ch) => {
                if !rest.starts_with(*ch) {
                    return false;
                }
                ch.len_utf8()
            }
            Token::Field { shape, .. } => {
                let digits = prefix_len(rest, |c| c.is_ascii_digit());
                match shape {
                    Shape::Digits(width) if digits >= *width => *width,
                    Shape::ShortDigits if digits >= 1 => digits.min(2),
                    Shape::Word => prefix_len(rest, |c| c.is_alphabetic() || c == '.'),
                    Shape::Zone if rest.starts_with('Z') => 1,
                    Shape::Zone if rest.starts_with(['+', '-']) => {
                        1 + prefix_len(&rest[1..], |c| c.is_ascii_digit() || c == ':')
                    }
                    _ => return false,
                }
            }
        };
        if taken == 0 {
            return false;
        }
        rest = &rest[taken..];
    }
    rest.is_empty()
}

/// Finest unit named by the pattern's tokens; `Millisecond` when it has none.
pub fn granularity_of(pattern: &str) -> TimeUnit {
    let mut finest: Option<TimeUnit> = None;
    let mut quoted = false;
    for ch in pattern.chars() {
        if ch == '\'' {
            quoted = !quoted;
            continue;
        }
        if quoted {
            continue;
        }
        let unit = match ch {
            'S' => TimeUnit::Millisecond,
            's' => TimeUnit::Second,
            'm' => TimeUnit::Minute,
            'H' | 'h' | 'k' | 'K' => TimeUnit::Hour,
            'd' | 'E' => TimeUnit::Day,
            'M' | 'L' => TimeUnit::Month,
            'y' => TimeUnit::Year,
            _ => continue,
        };
        finest = Some(finest.map_or(unit, |current| current.min(unit)));
    }
    finest.unwrap_or(TimeUnit::Millisecond)
}

/// Parses `text` with `pattern`.
///
/// Fixed-width fields must be given in full: `yyyy` takes four digits and
/// `dd` two, while `d` and `M` take one or two.
///
/// Missing minutes default to zero, a missing day of month to the first and
/// a missing month to January. Values carrying an offset are converted to
/// UTC; values without one are read as UTC.
pub fn parse_with_format(text: &str, pattern: &str) -> Option<DateTime<Utc>> {
    let tokens = tokenize(pattern).ok()?;
    let text = text.trim();
    if !matches_shape(text, &tokens) {
        return None;
    }
    let spec = chrono_spec(&tokens);
    let mut parsed = Parsed::new();
    format::parse(&mut parsed, text, StrftimeItems::new(&spec)).ok()?;
    if parsed.day().is_none() && parsed.ordinal().is_none() {
        parsed.set_day(1).ok()?;
        if parsed.month().is_none() {
            parsed.set_month(1).ok()?;
        }
    }
    let date = parsed.to_naive_date().ok()?;
    let time = if parsed.hour_div_12().is_none() {
        NaiveTime::MIN
    } else {
        if parsed.minute().is_none() {
            parsed.set_minute(0).ok()?;
        }
        parsed.to_naive_time().ok()?
    };
    let naive = date.and_time(time);
    match parsed.offset() {
        Some(seconds) => FixedOffset::east_opt(seconds)?
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc)),
        None => Some(Utc.from_utc_datetime(&naive)),
    }
}

pub fn format_instant(instant: &DateTime<Utc>, pattern: &str) -> Option<String> {
    let spec = to_chrono(pattern).ok()?;
    let mut rendered = String::new();
    write!(rendered, "{}", instant.format(&spec)).ok()?;
    Some(rendered)
}

/// Rounds `instant` down to the start of `unit` for calendar units.
pub fn truncate_to(instant: DateTime<Utc>, unit: TimeUnit) -> DateTime<Utc> {
    let date = instant.date_naive();
    let start = match unit {
        TimeUnit::Day => Some(date),
        TimeUnit::Month => date.with_day(1),
        TimeUnit::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1),
        _ => return instant,
    };
    start
        .map(|day| Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN)))
        .unwrap_or(instant)
}

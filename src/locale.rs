//! Locale conventions for reading numbers and dates out of text.
//!
//! A [`Locale`] is resolved from a BCP-47 style tag (`en-US`, `de_CH`, `fr`)
//! against a small built-in table. Unknown tags fall back to their language
//! and finally to `en-US`, so resolution never fails.

use std::fmt;

use log::debug;

const FALLBACK_TAG: &str = "en-US";

#[derive(Debug, PartialEq, Eq)]
struct LocaleSpec {
    tag: &'static str,
    decimal_separator: char,
    grouping_separators: &'static [char],
    date_pattern: &'static str,
}

const SPACE_GROUPING: &[char] = &[' ', '\u{00A0}', '\u{202F}'];

const LOCALES: &[LocaleSpec] = &[
    LocaleSpec {
        tag: "en-US",
        decimal_separator: '.',
        grouping_separators: &[','],
        date_pattern: "M/d/yyyy",
    },
    LocaleSpec {
        tag: "en-GB",
        decimal_separator: '.',
        grouping_separators: &[','],
        date_pattern: "dd/MM/yyyy",
    },
    LocaleSpec {
        tag: "de",
        decimal_separator: ',',
        grouping_separators: &['.'],
        date_pattern: "dd.MM.yyyy",
    },
    LocaleSpec {
        tag: "de-CH",
        decimal_separator: '.',
        grouping_separators: &['\'', '\u{2019}'],
        date_pattern: "dd.MM.yyyy",
    },
    LocaleSpec {
        tag: "fr",
        decimal_separator: ',',
        grouping_separators: SPACE_GROUPING,
        date_pattern: "dd/MM/yyyy",
    },
    LocaleSpec {
        tag: "es",
        decimal_separator: ',',
        grouping_separators: &['.'],
        date_pattern: "d/M/yyyy",
    },
    LocaleSpec {
        tag: "it",
        decimal_separator: ',',
        grouping_separators: &['.'],
        date_pattern: "d/M/yyyy",
    },
    LocaleSpec {
        tag: "nl",
        decimal_separator: ',',
        grouping_separators: &['.'],
        date_pattern: "d-M-yyyy",
    },
    LocaleSpec {
        tag: "pt",
        decimal_separator: ',',
        grouping_separators: SPACE_GROUPING,
        date_pattern: "dd/MM/yyyy",
    },
    LocaleSpec {
        tag: "pt-BR",
        decimal_separator: ',',
        grouping_separators: &['.'],
        date_pattern: "dd/MM/yyyy",
    },
    LocaleSpec {
        tag: "ru",
        decimal_separator: ',',
        grouping_separators: SPACE_GROUPING,
        date_pattern: "dd.MM.yyyy",
    },
    LocaleSpec {
        tag: "pl",
        decimal_separator: ',',
        grouping_separators: SPACE_GROUPING,
        date_pattern: "d.MM.yyyy",
    },
    LocaleSpec {
        tag: "sv",
        decimal_separator: ',',
        grouping_separators: SPACE_GROUPING,
        date_pattern: "yyyy-MM-dd",
    },
    LocaleSpec {
        tag: "ja",
        decimal_separator: '.',
        grouping_separators: &[','],
        date_pattern: "yyyy/MM/dd",
    },
    LocaleSpec {
        tag: "zh",
        decimal_separator: '.',
        grouping_separators: &[','],
        date_pattern: "yyyy/M/d",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locale {
    spec: &'static LocaleSpec,
}

impl Locale {
    /// Resolves `tag` to the closest built-in locale.
    pub fn parse(tag: &str) -> Self {
        let normalized = tag.trim().replace('_', "-");
        if let Some(spec) = LOCALES
            .iter()
            .find(|spec| spec.tag.eq_ignore_ascii_case(&normalized))
        {
            return Self { spec };
        }
        let language = normalized.split('-').next().unwrap_or_default();
        if let Some(spec) = LOCALES.iter().find(|spec| {
            spec.tag
                .split('-')
                .next()
                .is_some_and(|lang| lang.eq_ignore_ascii_case(language))
        }) {
            return Self { spec };
        }
        debug!("Unknown locale '{tag}', falling back to {FALLBACK_TAG}");
        Self::default()
    }

    pub fn tag(&self) -> &'static str {
        self.spec.tag
    }

    pub fn decimal_separator(&self) -> char {
        self.spec.decimal_separator
    }

    /// Localized short date pattern, e.g. `M/d/yyyy` for `en-US`.
    pub fn date_pattern(&self) -> &'static str {
        self.spec.date_pattern
    }

    /// Parses `text` as a number using this locale's separators.
    ///
    /// Grouping separators are only accepted between complete groups of three
    /// digits, so `10.04.2005` is not a number under `de`.
    pub fn parse_number(&self, text: &str) -> Option<f64> {
        let trimmed = text.trim();
        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let (mantissa, exponent) = match body.find(['e', 'E']) {
            Some(pos) => (&body[..pos], Some(&body[pos + 1..])),
            None => (body, None),
        };
        let (integer, fraction) = match mantissa.split_once(self.spec.decimal_separator) {
            Some((integer, fraction)) => (integer, fraction),
            None => (mantissa, ""),
        };

        let integer = self.strip_grouping(integer)?;
        if !fraction.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        if integer.is_empty() && fraction.is_empty() {
            return None;
        }

        let mut normalized = String::with_capacity(trimmed.len() + 2);
        if negative {
            normalized.push('-');
        }
        if integer.is_empty() {
            normalized.push('0');
        } else {
            normalized.push_str(&integer);
        }
        if !fraction.is_empty() {
            normalized.push('.');
            normalized.push_str(fraction);
        }
        if let Some(exponent) = exponent {
            let digits = exponent
                .strip_prefix(['+', '-'])
                .unwrap_or(exponent);
            if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            normalized.push('e');
            normalized.push_str(exponent);
        }
        normalized.parse::<f64>().ok().filter(|value| value.is_finite())
    }

    fn strip_grouping(&self, integer: &str) -> Option<String> {
        let grouping = self.spec.grouping_separators;
        if !integer.contains(grouping) {
            return integer
                .chars()
                .all(|c| c.is_ascii_digit())
                .then(|| integer.to_string());
        }
        let mut digits = String::with_capacity(integer.len());
        for (idx, group) in integer.split(grouping).enumerate() {
            let valid_len = if idx == 0 {
                (1..=3).contains(&group.len())
            } else {
                group.len() == 3
            };
            if !valid_len || !group.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            digits.push_str(group);
        }
        Some(digits)
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self { spec: &LOCALES[0] }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spec.tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_resolves_exact_language_and_fallback_tags() {
        assert_eq!(Locale::parse("en-US").tag(), "en-US");
        assert_eq!(Locale::parse("en_gb").tag(), "en-GB");
        assert_eq!(Locale::parse("de-AT").tag(), "de");
        assert_eq!(Locale::parse("de-CH").tag(), "de-CH");
        assert_eq!(Locale::parse("en").tag(), "en-US");
        assert_eq!(Locale::parse("xx-YY").tag(), "en-US");
    }

    #[test]
    fn parse_number_respects_decimal_and_grouping_separators() {
        let en = Locale::parse("en-US");
        assert_eq!(en.parse_number("1,234.5"), Some(1234.5));
        assert_eq!(en.parse_number("-42"), Some(-42.0));
        assert_eq!(en.parse_number(".5"), Some(0.5));
        assert_eq!(en.parse_number("1e3"), Some(1000.0));

        let de = Locale::parse("de");
        assert_eq!(de.parse_number("1.234,5"), Some(1234.5));
        assert_eq!(de.parse_number("1,5"), Some(1.5));

        let fr = Locale::parse("fr-FR");
        assert_eq!(fr.parse_number("1 234,25"), Some(1234.25));
    }

    #[test]
    fn parse_number_rejects_dates_and_non_numeric_text() {
        let en = Locale::parse("en-US");
        assert_eq!(en.parse_number("2019-01-30"), None);
        assert_eq!(en.parse_number("1/2/2019"), None);
        assert_eq!(en.parse_number("abc"), None);
        assert_eq!(en.parse_number("inf"), None);
        assert_eq!(en.parse_number("NaN"), None);
        assert_eq!(en.parse_number(""), None);
        assert_eq!(en.parse_number("1e"), None);

        let de = Locale::parse("de");
        assert_eq!(de.parse_number("10.04.2005"), None);
        assert_eq!(de.parse_number("1.5"), None);
    }
}

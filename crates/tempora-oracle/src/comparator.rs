//! Transcript comparator
//!
//! Compares an actual transcript to an expected fixture line by line.
//! Lines carrying a progress value tolerate the locale's decimal separator
//! and small float drift; every other line must match after trimming.

use std::env;
use std::fmt;
use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Absolute difference under which two progress values are equal
pub const DEFAULT_TOLERANCE: f64 = 0.001;

const MARKER_PREFIX: &str = "Processing time";

/// Languages that write a comma as decimal separator
const COMMA_LANGUAGES: &[&str] = &[
    "de", "fr", "es", "it", "pt", "nl", "ru", "pl", "cs", "sk", "sv", "da", "fi", "nb", "nn", "tr",
    "uk", "hu", "ro", "el", "id", "vi",
];

static EXPONENT_REGEX: OnceLock<Regex> = OnceLock::new();

fn exponent_regex() -> &'static Regex {
    EXPONENT_REGEX.get_or_init(|| Regex::new(r"([0-9])\.([0-9]+E)").expect("invalid regex pattern"))
}

/// Number formatting of the current culture
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Locale {
    pub decimal_separator: char,
}

impl Default for Locale {
    fn default() -> Self {
        Self::invariant()
    }
}

impl Locale {
    pub fn invariant() -> Self {
        Locale { decimal_separator: '.' }
    }

    pub fn with_separator(decimal_separator: char) -> Self {
        Locale { decimal_separator }
    }

    /// Locale named by `LC_ALL`, `LC_NUMERIC` or `LANG`, first one set wins
    pub fn from_env() -> Self {
        ["LC_ALL", "LC_NUMERIC", "LANG"]
            .iter()
            .filter_map(|var| env::var(var).ok())
            .find(|value| !value.is_empty())
            .map(|tag| Self::from_tag(&tag))
            .unwrap_or_default()
    }

    /// Locale from a POSIX tag such as `de_DE.UTF-8`
    pub fn from_tag(tag: &str) -> Self {
        let language = tag
            .split(|c| c == '_' || c == '-' || c == '.' || c == '@')
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        if COMMA_LANGUAGES.contains(&language.as_str()) {
            Self::with_separator(',')
        } else {
            Self::invariant()
        }
    }

    /// Rewrite `0.` and `d.dddE` forms with this locale's separator
    pub fn localize(&self, line: &str) -> String {
        if self.decimal_separator == '.' {
            return line.to_string();
        }
        let sep = self.decimal_separator;
        let localized = line.replace("0.", &format!("0{}", sep));
        exponent_regex()
            .replace_all(&localized, |caps: &Captures| format!("{}{}{}", &caps[1], sep, &caps[2]))
            .into_owned()
    }

    /// Parse a number written in this locale; plain `.` is accepted too
    pub fn parse(&self, text: &str) -> Option<f64> {
        let normalized = if self.decimal_separator == '.' {
            text.to_string()
        } else {
            text.replace(self.decimal_separator, ".")
        };
        normalized.trim().parse::<f64>().ok()
    }
}

/// Comparator settings
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ComparatorConfig {
    pub locale: Locale,
    pub tolerance: f64,
}

impl Default for ComparatorConfig {
    fn default() -> Self {
        ComparatorConfig {
            locale: Locale::invariant(),
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl ComparatorConfig {
    /// Default tolerance with the process locale
    pub fn from_env() -> Self {
        ComparatorConfig {
            locale: Locale::from_env(),
            ..Default::default()
        }
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// One failing line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mismatch {
    /// Latest tick marker seen before the line
    pub marker: String,
    pub actual: String,
    pub expected: String,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\nActual:     {}\nExpect:     {}\n\n",
            self.marker, self.actual, self.expected
        )
    }
}

/// Outcome of one comparison
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Comparison {
    pub mismatches: Vec<Mismatch>,
    pub lines_compared: usize,
}

impl Comparison {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }

    /// Failure log, one block per mismatch
    pub fn log(&self) -> String {
        self.mismatches.iter().map(Mismatch::to_string).collect()
    }
}

/// Line-by-line transcript comparator
#[derive(Clone, Debug, Default)]
pub struct Comparator {
    config: ComparatorConfig,
}

impl Comparator {
    pub fn new(config: ComparatorConfig) -> Self {
        Comparator { config }
    }

    pub fn config(&self) -> &ComparatorConfig {
        &self.config
    }

    pub fn compare(&self, actual: &str, expected: &str) -> Comparison {
        let actual: Vec<&str> = actual.split('\n').collect();
        let expected: Vec<&str> = expected.split('\n').collect();
        let mut comparison = Comparison::default();
        let mut marker = String::new();

        let common = actual.len().min(expected.len());
        for i in 0..common {
            let a = actual[i];
            if a.starts_with(MARKER_PREFIX) {
                marker = a.to_string();
            }
            let (equal, e) = self.lines_equal(a, expected[i]);
            if !equal {
                comparison.mismatches.push(Mismatch {
                    marker: marker.clone(),
                    actual: a.to_string(),
                    expected: e,
                });
            }
        }

        for a in &actual[common..] {
            if a.starts_with(MARKER_PREFIX) {
                marker = a.to_string();
            }
            comparison.mismatches.push(Mismatch {
                marker: marker.clone(),
                actual: a.to_string(),
                expected: String::new(),
            });
        }
        for e in &expected[common..] {
            if e.starts_with(MARKER_PREFIX) {
                marker = e.to_string();
            }
            comparison.mismatches.push(Mismatch {
                marker: marker.clone(),
                actual: String::new(),
                expected: e.to_string(),
            });
        }

        comparison.lines_compared = actual.len().max(expected.len());
        for mismatch in &comparison.mismatches {
            tracing::warn!(
                marker = %mismatch.marker,
                actual = %mismatch.actual,
                expected = %mismatch.expected,
                "transcript mismatch"
            );
        }
        comparison
    }

    /// Compare one pair; returns the expected line as it was compared
    fn lines_equal(&self, actual: &str, expected: &str) -> (bool, String) {
        if !expected.contains("Progress") {
            return (actual.trim() == expected.trim(), expected.to_string());
        }

        // Both sides in one locale; transcripts are written invariant.
        let actual = self.config.locale.localize(actual);
        let expected = self.config.locale.localize(expected);
        if actual.trim() == expected.trim() {
            return (true, expected);
        }
        let equal = match (self.progress_of(&actual), self.progress_of(&expected)) {
            (Some(a), Some(e)) => (a - e).abs() < self.config.tolerance,
            _ => false,
        };
        (equal, expected)
    }

    /// Progress carried by a line: the first space-separated token holding
    /// a `0`, without `)`. Lines with no such token count as 1.
    pub fn progress_of(&self, line: &str) -> Option<f64> {
        match line.split(' ').find(|word| word.contains('0')) {
            Some(word) => self.config.locale.parse(&word.replace(')', "")),
            None => Some(1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn comma() -> Comparator {
        Comparator::new(ComparatorConfig::default().with_locale(Locale::with_separator(',')))
    }

    #[test]
    fn test_identical_transcripts_pass() {
        let text = "Processing time 0 ms\n  Node: Progress = 0.5\n";
        let result = Comparator::default().compare(text, text);

        assert!(result.passed());
        assert_eq!(result.lines_compared, 3);
        assert_eq!(result.log(), "");
    }

    #[test]
    fn test_progress_tolerance_across_locales() {
        let comparator = comma();

        assert!(comparator.compare("Progress = 0.500)", "Progress = 0,4999)").passed());
        assert!(comparator.compare("Progress = 0,4999)", "Progress = 0.500)").passed());
        assert!(!comparator.compare("Progress = 0.500)", "Progress = 0.600)").passed());
    }

    #[test]
    fn test_comma_locale_matches_own_transcript() {
        let text = "Processing time 10 ms\n  Clock0: Progress = 0.5\n  Anim10: Progress = 0.25\n";
        let result = comma().compare(text, text);

        assert!(result.passed(), "{}", result.log());
        assert!(!comma().compare(text, &text.replace("0.25", "0.5")).passed());
    }

    #[test]
    fn test_tolerance_in_invariant_locale() {
        let comparator = Comparator::default();

        assert!(comparator.compare("  A: Progress = 0.33333", "  A: Progress = 0.3333").passed());
        assert!(!comparator.compare("  A: Progress = 0.335", "  A: Progress = 0.333").passed());
    }

    #[test]
    fn test_missing_progress_token_counts_as_one() {
        let comparator = Comparator::default();

        assert_eq!(comparator.progress_of("  A: Progress = 1"), Some(1.0));
        assert!(comparator.compare("  A: Progress = 1", "  A: Progress = 0.9999").passed());
    }

    #[test]
    fn test_unparseable_progress_never_equal() {
        let comparator = Comparator::default();

        assert_eq!(comparator.progress_of("  A: Progress = 0.5x)"), None);
        assert!(!comparator.compare("  A: Progress = 0.5x)", "  A: Progress = 0.5y)").passed());
    }

    #[test]
    fn test_plain_lines_compare_trimmed() {
        let comparator = Comparator::default();

        assert!(comparator.compare("  A: Completed fired  ", "A: Completed fired").passed());
        assert!(!comparator.compare("A: Completed fired", "A: RemoveRequested fired").passed());
    }

    #[test]
    fn test_trailing_expected_lines_are_mismatches() {
        let actual = "Processing time 0 ms\nline one\nline two";
        let expected = "Processing time 0 ms\nline one\nline two\nProcessing time 10 ms\nline three";
        let result = Comparator::default().compare(actual, expected);

        assert_eq!(result.mismatches.len(), 2);
        assert_eq!(
            result.log(),
            "Processing time 10 ms\nActual:     \nExpect:     Processing time 10 ms\n\n\
             Processing time 10 ms\nActual:     \nExpect:     line three\n\n"
        );
    }

    #[test]
    fn test_trailing_actual_lines_are_mismatches() {
        let result = Comparator::default().compare("a\nb\nc", "a");

        assert_eq!(result.mismatches.len(), 2);
        assert_eq!(result.mismatches[0].actual, "b");
        assert_eq!(result.mismatches[1].expected, "");
    }

    #[test]
    fn test_mismatch_tracks_latest_marker() {
        let actual = "Processing time 0 ms\nx\nProcessing time 10 ms\ny";
        let expected = "Processing time 0 ms\nx\nProcessing time 10 ms\nz";
        let result = Comparator::default().compare(actual, expected);

        assert_eq!(
            result.mismatches,
            vec![Mismatch {
                marker: "Processing time 10 ms".to_string(),
                actual: "y".to_string(),
                expected: "z".to_string(),
            }]
        );
    }

    #[test]
    fn test_localize_exponent_forms() {
        let locale = Locale::with_separator(',');

        assert_eq!(locale.localize("Progress = 0.25"), "Progress = 0,25");
        assert_eq!(locale.localize("Progress = 1.5E-05"), "Progress = 1,5E-05");
        assert_eq!(Locale::invariant().localize("Progress = 1.5E-05"), "Progress = 1.5E-05");
    }

    #[test]
    fn test_exponent_progress_within_tolerance() {
        assert!(comma().compare("  A: Progress = 1.5E-05", "  A: Progress = 2E-05").passed());
    }

    #[test]
    fn test_locale_from_tag() {
        assert_eq!(Locale::from_tag("de_DE.UTF-8").decimal_separator, ',');
        assert_eq!(Locale::from_tag("fr-FR").decimal_separator, ',');
        assert_eq!(Locale::from_tag("en_US.UTF-8").decimal_separator, '.');
        assert_eq!(Locale::from_tag("C"), Locale::invariant());
        assert_eq!(Locale::from_tag(""), Locale::invariant());
    }

    proptest! {
        #[test]
        fn prop_comparison_is_idempotent(
            lines in proptest::collection::vec("[ a-zA-Z0-9.=:()]{0,24}", 0..12),
            other in proptest::collection::vec("[ a-zA-Z0-9.=:()]{0,24}", 0..12),
        ) {
            let actual = lines.join("\n");
            let expected = other.join("\n");
            let comparator = Comparator::default();

            prop_assert!(comparator.compare(&actual, &actual).passed());
            prop_assert_eq!(
                comparator.compare(&actual, &expected),
                comparator.compare(&actual, &expected)
            );
        }
    }
}

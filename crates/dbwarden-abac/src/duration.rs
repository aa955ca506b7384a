//! Duration resolution for a tokenized modifier list.
//!
//! Priority order:
//! 1. `always` anywhere → [`DurationSpec::Always`]
//! 2. `once` anywhere → [`DurationSpec::Once`]
//! 3. the first digit run → [`DurationSpec::NDays`]
//! 4. nothing usable → `NDays(0)`, reported as a fallback

use serde::{Deserialize, Serialize};

use crate::rule::DurationSpec;
use crate::token::Token;

/// Why a modifier list did not yield a duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// No duration keyword and no digits.
    NoDurationToken,
    /// The digit run does not fit in a day count.
    OutOfRange(String),
}

impl std::fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDurationToken => f.write_str("no duration token"),
            Self::OutOfRange(digits) => write!(f, "day count '{digits}' is out of range"),
        }
    }
}

/// Outcome of resolving a duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A duration token was found.
    Exact(DurationSpec),
    /// No usable token; the rule falls back to `NDays(0)`.
    Fallback(UnresolvedReason),
}

impl Resolution {
    /// The duration to apply. Fallbacks resolve to zero days.
    pub fn spec(&self) -> DurationSpec {
        match self {
            Self::Exact(spec) => *spec,
            Self::Fallback(_) => DurationSpec::NDays(0),
        }
    }
}

/// Resolves the duration carried by already tokenized modifiers.
pub fn resolve(tokens: &[Token<'_>]) -> Resolution {
    if tokens.iter().any(|t| matches!(t, Token::Always)) {
        return Resolution::Exact(DurationSpec::Always);
    }
    if tokens.iter().any(|t| matches!(t, Token::Once)) {
        return Resolution::Exact(DurationSpec::Once);
    }

    let digits = tokens.iter().find_map(|t| match t {
        Token::Digits(d) => Some(*d),
        _ => None,
    });

    match digits {
        Some(d) => match d.parse::<u32>() {
            Ok(n) => Resolution::Exact(DurationSpec::NDays(n)),
            Err(_) => Resolution::Fallback(UnresolvedReason::OutOfRange(d.to_string())),
        },
        None => Resolution::Fallback(UnresolvedReason::NoDurationToken),
    }
}

/// Tokenizes and resolves a raw modifier string.
#[cfg(test)]
pub(crate) fn resolve_modifiers(modifiers: &str) -> Resolution {
    resolve(&crate::token::tokenize(modifiers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("allow:always", DurationSpec::Always; "always")]
    #[test_case("allow:always:30days", DurationSpec::Always; "always beats digits")]
    #[test_case("deny:once", DurationSpec::Once; "once")]
    #[test_case("once:always", DurationSpec::Always; "always beats once")]
    #[test_case("once:15", DurationSpec::Once; "once beats digits")]
    #[test_case("allow:30days", DurationSpec::NDays(30); "days suffix")]
    #[test_case("allow:7:30", DurationSpec::NDays(7); "first digit run wins")]
    #[test_case("allow:0days", DurationSpec::NDays(0); "explicit zero")]
    fn test_exact_resolution(modifiers: &str, expected: DurationSpec) {
        assert_eq!(resolve_modifiers(modifiers), Resolution::Exact(expected));
    }

    #[test]
    fn test_missing_duration_falls_back_to_zero_days() {
        let resolution = resolve_modifiers("deny");
        assert_eq!(
            resolution,
            Resolution::Fallback(UnresolvedReason::NoDurationToken)
        );
        assert_eq!(resolution.spec(), DurationSpec::NDays(0));
    }

    #[test]
    fn test_overflowing_digits_fall_back_to_zero_days() {
        let resolution = resolve_modifiers("allow:99999999999days");
        assert!(matches!(resolution, Resolution::Fallback(_)));
        assert_eq!(resolution.spec(), DurationSpec::NDays(0));
        assert_eq!(
            resolution,
            Resolution::Fallback(UnresolvedReason::OutOfRange("99999999999".to_string()))
        );
    }
}

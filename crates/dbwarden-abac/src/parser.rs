//! Attribute string parser.
//!
//! An attribute string lists per-resource rules:
//!
//! ```text
//! accounts:allow:30days,logs:deny:once,reports:allow:always
//! ```
//!
//! Each comma-separated entry is `resource ':' modifiers`. Parsing never
//! aborts: well-formed entries become [`Rule`]s, malformed ones are reported
//! as [`ParseError`]s, and recoverable oddities as [`ParseWarning`]s. Rules
//! keep their encounter order so later entries for the same resource
//! override earlier ones when applied.

use dbwarden_types::ResourceName;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::duration::{Resolution, UnresolvedReason, resolve};
use crate::rule::{Effect, Rule};
use crate::token::{MODIFIER_SEPARATOR, Token, tokenize};

/// Separator between entries of an attribute string.
pub const ENTRY_SEPARATOR: char = ',';

// ============================================================================
// Diagnostics
// ============================================================================

/// What is wrong with a malformed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyntaxIssue {
    /// The entry has no `:` between resource and modifiers.
    MissingSeparator,
    /// The text before the first `:` is empty.
    EmptyResource,
}

impl std::fmt::Display for SyntaxIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingSeparator => f.write_str("expected 'resource:modifiers'"),
            Self::EmptyResource => f.write_str("resource name is empty"),
        }
    }
}

/// An entry that could not be turned into a rule.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseError {
    #[error("invalid rule syntax in entry '{entry}': {issue}")]
    InvalidRuleSyntax { entry: String, issue: SyntaxIssue },
}

/// A rule was produced, but with a defaulted component.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseWarning {
    /// The duration fell back to zero days.
    #[error("duration unresolved for '{resource}' ({reason}); using 0 days")]
    DurationUnresolved {
        resource: ResourceName,
        modifiers: String,
        reason: UnresolvedReason,
    },
    /// Neither `allow` nor `deny` was given; the rule defaults to allow.
    #[error("no effect keyword for '{resource}'; defaulting to allow")]
    ImplicitAllow { resource: ResourceName },
}

// ============================================================================
// Result
// ============================================================================

/// Everything recovered from one attribute string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedAttributes {
    /// Well-formed rules in encounter order.
    pub rules: Vec<Rule>,
    /// One error per malformed entry.
    pub errors: Vec<ParseError>,
    /// Non-fatal notes about the rules that were produced.
    pub warnings: Vec<ParseWarning>,
}

impl ParsedAttributes {
    /// True when every entry produced a rule.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Parses an attribute string into rules and diagnostics.
///
/// Entries that are empty after trimming (such as the one produced by a
/// trailing comma) are skipped.
pub fn parse(attributes: &str) -> ParsedAttributes {
    let mut parsed = ParsedAttributes::default();

    for raw in attributes.split(ENTRY_SEPARATOR) {
        let entry = raw.trim();
        if entry.is_empty() {
            continue;
        }

        match parse_entry(entry, &mut parsed.warnings) {
            Ok(rule) => parsed.rules.push(rule),
            Err(e) => {
                warn!(error = %e, "skipping malformed attribute entry");
                parsed.errors.push(e);
            }
        }
    }

    parsed
}

/// Parses a single `resource:modifiers` entry.
fn parse_entry(entry: &str, warnings: &mut Vec<ParseWarning>) -> Result<Rule, ParseError> {
    let Some((resource, modifiers)) = entry.split_once(MODIFIER_SEPARATOR) else {
        return Err(ParseError::InvalidRuleSyntax {
            entry: entry.to_string(),
            issue: SyntaxIssue::MissingSeparator,
        });
    };

    let resource = resource.trim();
    if resource.is_empty() {
        return Err(ParseError::InvalidRuleSyntax {
            entry: entry.to_string(),
            issue: SyntaxIssue::EmptyResource,
        });
    }
    let resource = ResourceName::new(resource);

    let tokens = tokenize(modifiers);

    let effect = match effect_of(&tokens) {
        Some(effect) => effect,
        None => {
            let warning = ParseWarning::ImplicitAllow {
                resource: resource.clone(),
            };
            warn!(%warning);
            warnings.push(warning);
            Effect::Allow
        }
    };

    let resolution = resolve(&tokens);
    if let Resolution::Fallback(reason) = &resolution {
        let warning = ParseWarning::DurationUnresolved {
            resource: resource.clone(),
            modifiers: modifiers.to_string(),
            reason: reason.clone(),
        };
        warn!(%warning);
        warnings.push(warning);
    }

    Ok(Rule {
        resource,
        effect,
        duration: resolution.spec(),
    })
}

/// `Deny` if any token denies, `Allow` if one allows, `None` if neither.
fn effect_of(tokens: &[Token<'_>]) -> Option<Effect> {
    let mut effect = None;
    for token in tokens {
        match token {
            Token::Effect(Effect::Deny) => return Some(Effect::Deny),
            Token::Effect(Effect::Allow) => effect = Some(Effect::Allow),
            _ => {}
        }
    }
    effect
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::DurationSpec;

    #[test]
    fn test_parse_single_entry() {
        let parsed = parse("accounts:allow:30days");
        assert!(parsed.is_clean());
        assert!(parsed.warnings.is_empty());
        assert_eq!(
            parsed.rules,
            vec![Rule::new("accounts", Effect::Allow, DurationSpec::NDays(30))]
        );
    }

    #[test]
    fn test_same_resource_keeps_encounter_order() {
        let parsed = parse("accounts:allow:30days,accounts:deny:once");
        assert_eq!(
            parsed.rules,
            vec![
                Rule::new("accounts", Effect::Allow, DurationSpec::NDays(30)),
                Rule::new("accounts", Effect::Deny, DurationSpec::Once),
            ]
        );
    }

    #[test]
    fn test_deny_without_duration_warns() {
        let parsed = parse("logs:deny");
        assert_eq!(
            parsed.rules,
            vec![Rule::new("logs", Effect::Deny, DurationSpec::NDays(0))]
        );
        assert_eq!(
            parsed.warnings,
            vec![ParseWarning::DurationUnresolved {
                resource: ResourceName::new("logs"),
                modifiers: "deny".to_string(),
                reason: UnresolvedReason::NoDurationToken,
            }]
        );
    }

    #[test]
    fn test_malformed_entry_does_not_stop_parsing() {
        let parsed = parse("badentry,accounts:allow:always");
        assert_eq!(
            parsed.errors,
            vec![ParseError::InvalidRuleSyntax {
                entry: "badentry".to_string(),
                issue: SyntaxIssue::MissingSeparator,
            }]
        );
        assert_eq!(
            parsed.rules,
            vec![Rule::new("accounts", Effect::Allow, DurationSpec::Always)]
        );
    }

    #[test]
    fn test_empty_resource_is_rejected() {
        let parsed = parse(":allow:once");
        assert!(parsed.rules.is_empty());
        assert_eq!(
            parsed.errors,
            vec![ParseError::InvalidRuleSyntax {
                entry: ":allow:once".to_string(),
                issue: SyntaxIssue::EmptyResource,
            }]
        );
    }

    #[test]
    fn test_missing_effect_defaults_to_allow_with_warning() {
        let parsed = parse("reports:7days");
        assert_eq!(
            parsed.rules,
            vec![Rule::new("reports", Effect::Allow, DurationSpec::NDays(7))]
        );
        assert_eq!(
            parsed.warnings,
            vec![ParseWarning::ImplicitAllow {
                resource: ResourceName::new("reports"),
            }]
        );
    }

    #[test]
    fn test_deny_anywhere_in_modifiers_wins() {
        let parsed = parse("accounts:allow:deny:once");
        assert_eq!(parsed.rules[0].effect, Effect::Deny);
    }

    #[test]
    fn test_whitespace_and_trailing_comma() {
        let parsed = parse(" accounts : allow:5 , logs:deny:once ,");
        assert!(parsed.is_clean());
        assert_eq!(parsed.rules.len(), 2);
        assert_eq!(parsed.rules[0].resource.as_str(), "accounts");
        assert_eq!(parsed.rules[0].duration, DurationSpec::NDays(5));
        assert_eq!(parsed.rules[1].resource.as_str(), "logs");
    }

    #[test]
    fn test_empty_string_yields_nothing() {
        assert_eq!(parse(""), ParsedAttributes::default());
    }

    #[test]
    fn test_resource_name_is_not_searched_for_keywords() {
        let parsed = parse("always_on:deny:3");
        assert_eq!(
            parsed.rules,
            vec![Rule::new("always_on", Effect::Deny, DurationSpec::NDays(3))]
        );
    }

    #[test]
    fn test_diagnostics_display() {
        let err = ParseError::InvalidRuleSyntax {
            entry: "x".to_string(),
            issue: SyntaxIssue::MissingSeparator,
        };
        assert_eq!(
            err.to_string(),
            "invalid rule syntax in entry 'x': expected 'resource:modifiers'"
        );
    }
}

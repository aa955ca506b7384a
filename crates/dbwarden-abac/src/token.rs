//! Tokenizer for the modifier list of an attribute entry.
//!
//! The modifiers of `accounts:allow:30days` are `allow:30days`. Each
//! `:`-separated segment is scanned for the keywords it contains, so a
//! single segment may yield several tokens (`denyonce` is both an effect
//! and a duration). Keyword matching is by substring, which keeps tokens
//! such as `deny_all` or `30days` meaningful.

use crate::rule::Effect;

/// Separator between modifiers, and between the resource and its modifiers.
pub const MODIFIER_SEPARATOR: char = ':';

const DENY: &str = "deny";
const ALLOW: &str = "allow";
const ALWAYS: &str = "always";
const ONCE: &str = "once";

/// A recognized piece of a modifier list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// An `allow` or `deny` keyword.
    Effect(Effect),
    /// The `always` keyword.
    Always,
    /// The `once` keyword.
    Once,
    /// The first run of decimal digits in a segment, e.g. `30` in `30days`.
    Digits(&'a str),
    /// A segment with no recognized keyword.
    Other(&'a str),
}

/// Splits `modifiers` on `:` and classifies every segment.
///
/// Tokens are emitted in segment order. Within one segment the order is
/// effect, duration keywords, digits.
pub fn tokenize(modifiers: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();

    for segment in modifiers.split(MODIFIER_SEPARATOR) {
        let start = tokens.len();

        if segment.contains(DENY) {
            tokens.push(Token::Effect(Effect::Deny));
        } else if segment.contains(ALLOW) {
            tokens.push(Token::Effect(Effect::Allow));
        }
        if segment.contains(ALWAYS) {
            tokens.push(Token::Always);
        }
        if segment.contains(ONCE) {
            tokens.push(Token::Once);
        }
        if let Some(digits) = first_digit_run(segment) {
            tokens.push(Token::Digits(digits));
        }

        if tokens.len() == start && !segment.trim().is_empty() {
            tokens.push(Token::Other(segment));
        }
    }

    tokens
}

/// Returns the first maximal run of ASCII digits in `s`.
pub fn first_digit_run(s: &str) -> Option<&str> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let rest = &s[start..];
    let len = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    Some(&rest[..len])
}

//! # dbwarden-abac: Attribute rules and access decisions
//!
//! Turns the attribute string carried in a subject's claim into per-resource
//! rules, and decides whether a stored access window currently grants access.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Attribute string                            │
//! │  "accounts:allow:30days,logs:deny:once"      │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  Parser                                      │
//! │  ├─ Split entries on ','                     │
//! │  ├─ Tokenize modifiers on ':'                │
//! │  └─ Resolve effect and duration              │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  ParsedAttributes                            │
//! │  - Rules in encounter order                  │
//! │  - Per-entry syntax errors                   │
//! │  - Warnings for defaulted components         │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Duration precedence
//!
//! `always` beats `once`, which beats the first digit run. With none of
//! them the rule lasts zero days and a warning is recorded.
//!
//! ## Examples
//!
//! ```
//! use dbwarden_abac::{parse, DurationSpec, Effect};
//!
//! let parsed = parse("accounts:allow:30days,badentry");
//! assert_eq!(parsed.rules.len(), 1);
//! assert_eq!(parsed.rules[0].effect, Effect::Allow);
//! assert_eq!(parsed.rules[0].duration, DurationSpec::NDays(30));
//! assert_eq!(parsed.errors.len(), 1);
//! ```

pub mod duration;
pub mod evaluator;
pub mod parser;
pub mod rule;
pub mod token;


pub use duration::{Resolution, UnresolvedReason};
pub use evaluator::{Decision, evaluate, evaluate_at};
pub use parser::{ParseError, ParseWarning, ParsedAttributes, SyntaxIssue, parse};
pub use rule::{DurationSpec, Effect, Rule};

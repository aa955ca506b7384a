//! Table formatting using comfy-table.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use dbwarden::{AccessDate, AccessWindow, AppliedRule, DurationSpec, Effect};

use super::colors::SemanticStyle;

fn styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn header_cell(title: &str) -> Cell {
    if super::no_color() {
        Cell::new(title)
    } else {
        Cell::new(title)
            .add_attribute(Attribute::Bold)
            .fg(Color::Cyan)
    }
}

fn effect_cell(effect: Effect) -> Cell {
    let (label, color) = match effect {
        Effect::Allow => ("allow", Color::Green),
        Effect::Deny => ("deny", Color::Red),
    };
    if super::no_color() {
        Cell::new(label)
    } else {
        Cell::new(label).fg(color)
    }
}

/// Human label for a rule duration.
pub fn duration_label(duration: DurationSpec) -> String {
    match duration {
        DurationSpec::Always => "always".to_string(),
        DurationSpec::Once => "once".to_string(),
        DurationSpec::NDays(1) => "1 day".to_string(),
        DurationSpec::NDays(n) => format!("{n} days"),
    }
}

fn date_label(date: Option<AccessDate>) -> String {
    date.map_or_else(|| "-".to_string(), |d| d.to_string())
}

/// One row per persisted rule: resource, effect, duration, column, old and new dates.
pub fn applied_rules_table(rules: &[AppliedRule]) -> Table {
    let mut table = styled_table();
    let header: Vec<Cell> = ["resource", "effect", "duration", "column", "previous", "new"]
        .into_iter()
        .map(header_cell)
        .collect();
    table.set_header(header);

    for rule in rules {
        table.add_row(vec![
            Cell::new(rule.resource.as_str()),
            effect_cell(rule.effect),
            Cell::new(duration_label(rule.duration)),
            Cell::new(rule.field.as_str()),
            Cell::new(date_label(rule.previous)),
            Cell::new(rule.new.to_string()),
        ]);
    }

    table
}

/// Key-value view of a stored window.
pub fn window_table(window: &AccessWindow) -> Table {
    let mut table = styled_table();
    let entries = [
        ("subject", window.subject.to_string()),
        ("resource", window.resource.to_string()),
        ("access_until", date_label(window.access_until)),
        ("deny_until", date_label(window.deny_until)),
    ];

    for (key, value) in entries {
        let key_cell = if super::no_color() {
            Cell::new(key)
        } else {
            Cell::new(key).fg(Color::DarkGrey)
        };
        table.add_row(vec![key_cell, Cell::new(value)]);
    }

    table
}

/// Prints the applied-rules table, or a muted note when there is nothing to show.
pub fn print_applied_rules(rules: &[AppliedRule]) {
    if rules.is_empty() {
        println!("{}", "No rules applied.".muted());
        return;
    }

    println!("{}", applied_rules_table(rules));
    let count = rules.len();
    let rule_word = if count == 1 { "rule" } else { "rules" };
    println!("{}", format!("({count} {rule_word} applied)").muted());
}

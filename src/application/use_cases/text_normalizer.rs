use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Mojibake left behind when Latin-1 text went through a Windows-1252
/// decode and back out as UTF-8. Applied once each, in this order.
const MOJIBAKE_REPLACEMENTS: [(&str, &str); 11] = [
    ("\u{00c3}\u{00b3}", "\u{00f3}"),
    ("\u{00c3}\u{00a9}", "\u{00e9}"),
    ("\u{00c3}\u{00a1}", "\u{00e1}"),
    ("\u{00c3}\u{00ad}", "\u{00ed}"),
    ("\u{00c3}\u{00ba}", "\u{00fa}"),
    ("\u{00c3}\u{00b1}", "\u{00f1}"),
    ("\u{00c3}\u{2030}", "\u{00c9}"),
    ("\u{00c3}\u{2019}", "\u{00d3}"),
    ("\u{00c3}\u{0161}", "\u{00da}"),
    ("\u{00c3}\u{2018}", "\u{00d1}"),
    ("\u{00c2}", ""),
];

const SYSTEMS_ENGINEERING: &str = "Ingeniería en Sistemas";

/// Known spellings of a program, keyed in lower case
static PROGRAM_VARIANTS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("sistemas", SYSTEMS_ENGINEERING),
        ("ing. sistemas", SYSTEMS_ENGINEERING),
        ("ingeniería en sistemas", SYSTEMS_ENGINEERING),
    ])
});

/// Trims the value and repairs the known accent mojibake.
/// Returns `None` when nothing but whitespace is left.
pub fn normalize_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut repaired = trimmed.to_string();
    for (broken, fixed) in MOJIBAKE_REPLACEMENTS {
        if repaired.contains(broken) {
            repaired = repaired.replace(broken, fixed);
        }
    }

    let repaired = repaired.trim();
    if repaired.is_empty() {
        None
    } else {
        Some(repaired.to_string())
    }
}

/// Collapses known variant spellings of a program onto its canonical name
pub fn normalize_program(program: &str) -> String {
    let trimmed = program.trim();
    PROGRAM_VARIANTS
        .get(trimmed.to_lowercase().as_str())
        .map(|canonical| canonical.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

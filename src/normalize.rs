//! Identifier normalization shared by every stage of the pipeline.

use convert_case::{Case, Casing};

/// Convert free text into a snake_case identifier that is valid in every
/// backend: lowercase, word characters only, no repeated or leading
/// underscore, and never starting with a digit.
///
/// An empty result means the input carried no usable identifier.
pub fn normalize(s: &str) -> String {
    let snake = s.to_case(Case::Snake).to_lowercase();

    let mut ok = String::with_capacity(snake.len());
    let mut prev = '\0';

    for c in snake.chars() {
        if !(c.is_ascii_alphanumeric() || c == '_') {
            continue;
        }
        if ok.is_empty() && (c == '_' || c.is_ascii_digit()) {
            continue;
        }
        if c == '_' && prev == '_' {
            continue;
        }
        ok.push(c);
        prev = c;
    }

    while ok.ends_with('_') {
        ok.pop();
    }

    ok
}

/// Name given to a node whose own name is missing or already taken.
pub fn fallback_name(n: u32) -> String {
    format!("unset_{n}")
}

//! Line classification. The DSL has no nested blocks, so a line's prefix
//! alone decides what it declares.

pub const PREFIX_SCHEMA: &str = "# ";
pub const PREFIX_ENTITY: &str = "## ";
pub const PREFIX_ATTRIBUTE: &str = "- ";

pub const DELI_AS: &str = " as ";
pub const DELI_WITH: &str = " with ";
pub const DELI_RANGE: &str = "..";
pub const DELI_LABEL: &str = ":";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    /// `# name`, with the prefix stripped.
    Schema(&'a str),
    /// `## name [with ...]`, with the prefix stripped.
    Entity(&'a str),
    /// `- ...`, the full trimmed line.
    Attribute(&'a str),
    Ignored,
}

impl<'a> Line<'a> {
    pub fn classify(raw: &'a str) -> Self {
        let line = raw.trim();
        if let Some(rest) = line.strip_prefix(PREFIX_SCHEMA) {
            Line::Schema(rest)
        } else if let Some(rest) = line.strip_prefix(PREFIX_ENTITY) {
            Line::Entity(rest)
        } else if line.starts_with(PREFIX_ATTRIBUTE) {
            Line::Attribute(line)
        } else {
            Line::Ignored
        }
    }
}

pub struct Lexer<'a> {
    input: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input }
    }

    /// Classified lines with their 1-based line numbers. Ignored lines are
    /// skipped.
    pub fn tokenize(&self) -> Vec<(usize, Line<'a>)> {
        self.input
            .lines()
            .enumerate()
            .map(|(i, raw)| (i + 1, Line::classify(raw)))
            .filter(|(_, line)| *line != Line::Ignored)
            .collect()
    }
}

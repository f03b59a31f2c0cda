pub mod attribute;

pub use attribute::parse_attribute_line;

use tracing::debug;

use crate::lexer::{DELI_WITH, Lexer, Line};
use crate::model::{Document, EntityId, MAX_DEPTH, SchemaId};

/// Builds a [`Document`] from DSL text, one line at a time.
///
/// Lines that do not fit the current nesting (an entity before any schema,
/// an attribute before any entity) are dropped. References are resolved
/// once the whole document is read, so they may point forward.
pub struct Parser {
    doc: Document,
    schema: Option<SchemaId>,
    entity: Option<EntityId>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self::with_max_depth(MAX_DEPTH)
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        let mut doc = Document::new();
        doc.set_max_depth(max_depth);
        Self {
            doc,
            schema: None,
            entity: None,
        }
    }

    pub fn parse(mut self, source: &str) -> Document {
        for (number, line) in Lexer::new(source).tokenize() {
            self.line(number, line);
        }
        self.doc.resolve_references();
        self.doc
    }

    fn line(&mut self, number: usize, line: Line<'_>) {
        match line {
            Line::Schema(name) => {
                self.schema = Some(self.doc.add_schema(name));
                self.entity = None;
            }
            Line::Entity(rest) => {
                let Some(schema) = self.schema else {
                    debug!(line = number, "entity outside a schema dropped");
                    return;
                };
                // entity options are accepted but carry no meaning yet
                let name = rest.split_once(DELI_WITH).map_or(rest, |(name, _)| name);
                match self.doc.add_entity(schema, name) {
                    Ok(id) => self.entity = Some(id),
                    Err(e) => debug!(line = number, error = %e, "entity dropped"),
                }
            }
            Line::Attribute(text) => {
                let Some(entity) = self.entity else {
                    debug!(line = number, "attribute outside an entity dropped");
                    return;
                };
                if let Err(e) = self.doc.attach(entity, parse_attribute_line(text)) {
                    debug!(line = number, error = %e, "attribute dropped");
                }
            }
            Line::Ignored => {}
        }
    }
}

/// Parse a whole document with the default flattening depth.
pub fn parse(source: &str) -> Document {
    Parser::new().parse(source)
}

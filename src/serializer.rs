//! Serializer for converting a document back to DSL text.

use crate::model::{Document, Entity, Schema};

/// Serialize a document to DSL text that parses back to the same document.
pub fn serialize(doc: &Document) -> String {
    let mut output = String::new();

    for (i, schema) in doc.schemas().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        serialize_schema(&mut output, doc, schema);
    }

    output
}

fn serialize_schema(output: &mut String, doc: &Document, schema: &Schema) {
    output.push_str(&format!("{schema}\n"));
    for entity in doc.entities_of(schema.id) {
        output.push('\n');
        serialize_entity(output, doc, entity);
    }
}

fn serialize_entity(output: &mut String, doc: &Document, entity: &Entity) {
    output.push_str(&format!("{entity}\n"));
    for attr in doc.attributes_of(entity.id) {
        output.push_str(&format!("{attr}\n"));
    }
}

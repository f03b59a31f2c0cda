//! Go struct source, one file per schema.

use std::fmt::{self, Write};

use super::align::Columns;
use super::case::{package_name, pascal_ua};
use super::{Field, FileId, Files, GenerateError, Renderer, fields, render_file, storage_kind};
use crate::model::{AttrKind, Attribute, Document, Entity, Schema};
use crate::relation::{Relation, RelationMaker};

pub struct GoStructs;

impl Renderer for GoStructs {
    fn type_name(&self, kind: AttrKind) -> &'static str {
        match kind {
            AttrKind::None | AttrKind::Reference => "any",
            AttrKind::Serial | AttrKind::Int => "int",
            AttrKind::Char => "rune",
            AttrKind::String | AttrKind::Bit => "string",
            AttrKind::Boolean => "bool",
            AttrKind::Date | AttrKind::Time | AttrKind::Timestamp => "time.Time",
            AttrKind::Float | AttrKind::Real | AttrKind::Decimal | AttrKind::Money => "float64",
        }
    }

    fn field_name(&self, attr: &Attribute) -> String {
        pascal_ua(&attr.name())
    }

    fn generate(&self, doc: &Document) -> Result<Files, GenerateError> {
        let relations = RelationMaker::new(doc).determine();
        let mut files = Files::new();

        for schema in doc.schemas() {
            let package = package_name(&schema.name);
            let file = FileId::new(&package, format!("{package}.go"));
            let text = render_file(&file, |out| {
                self.render_schema(out, doc, schema, &package, &relations)
            })?;
            files.insert(file, text);
        }

        Ok(files)
    }
}

impl GoStructs {
    fn render_schema(
        &self,
        out: &mut String,
        doc: &Document,
        schema: &Schema,
        package: &str,
        relations: &[Relation],
    ) -> fmt::Result {
        writeln!(out, "// Code generated by schemagen. DO NOT EDIT.")?;
        writeln!(out)?;
        writeln!(out, "package {package}")?;

        let uses_time = doc.entities_of(schema.id).any(|e| {
            super::valid_fields(doc, e.id)
                .iter()
                .any(|a| storage_kind(doc, a).is_temporal())
        });
        if uses_time {
            writeln!(out)?;
            writeln!(out, "import \"time\"")?;
        }

        for entity in doc.entities_of(schema.id) {
            writeln!(out)?;
            self.render_entity(out, doc, entity, relations)?;
        }
        Ok(())
    }

    fn render_entity(
        &self,
        out: &mut String,
        doc: &Document,
        entity: &Entity,
        relations: &[Relation],
    ) -> fmt::Result {
        let name = pascal_ua(&entity.name);

        for relation in relations.iter().filter(|r| r.base == entity.id) {
            writeln!(out, "// {}", describe(doc, relation))?;
        }
        writeln!(out, "type {name} struct {{")?;

        let fields = fields(doc, entity.id);
        let mut columns = Columns::default();
        for field in &fields {
            if let Field::Valid(attr) = field {
                columns.push(vec![
                    self.field_name(attr),
                    self.field_type(doc, attr),
                    format!("`json:\"{}\"`", attr.name()),
                ]);
            }
        }

        let mut aligned = columns.render().into_iter();
        for field in &fields {
            match field {
                Field::Valid(_) => {
                    if let Some(line) = aligned.next() {
                        writeln!(out, "\t{line}")?;
                    }
                }
                Field::Invalid { name, errors } => {
                    writeln!(out, "\t// {name} has errors: {errors}")?;
                }
            }
        }

        writeln!(out, "}}")
    }

    /// Optional values are pointers so that absence stays distinguishable
    /// from the zero value.
    fn field_type(&self, doc: &Document, attr: &Attribute) -> String {
        let base = self.type_name(storage_kind(doc, attr));
        let source = &doc[attr.source];
        if source.required() || source.primary || base == "any" {
            base.to_string()
        } else {
            format!("*{base}")
        }
    }
}

fn describe(doc: &Document, relation: &Relation) -> String {
    let base = pascal_ua(&doc[relation.base].name);
    let has = pascal_ua(&relation.has_name(doc));
    match relation.assoc {
        Some(assoc) => format!("{base} has many {has} through {}", pascal_ua(&doc[assoc].name)),
        None if relation.many => format!("{base} has many {has}"),
        None if relation.optional => format!("{base} has zero or one {has}"),
        None => format!("{base} has one {has}"),
    }
}

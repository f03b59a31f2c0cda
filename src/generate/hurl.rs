//! Hurl API tests, one file per entity.

use std::fmt::{self, Write};

use super::case::{kebab, package_name};
use super::{FileId, Files, GenerateError, Renderer, render_file, storage_kind, valid_fields};
use crate::model::{AttrKind, Attribute, Document, Entity, Schema};

pub struct HurlTests;

impl Renderer for HurlTests {
    /// JSON type a field of the kind is sent as.
    fn type_name(&self, kind: AttrKind) -> &'static str {
        match kind {
            AttrKind::None | AttrKind::Reference => "null",
            AttrKind::Serial
            | AttrKind::Int
            | AttrKind::Float
            | AttrKind::Real
            | AttrKind::Decimal
            | AttrKind::Money => "number",
            AttrKind::Boolean => "boolean",
            AttrKind::Char
            | AttrKind::String
            | AttrKind::Bit
            | AttrKind::Date
            | AttrKind::Time
            | AttrKind::Timestamp => "string",
        }
    }

    fn field_name(&self, attr: &Attribute) -> String {
        attr.name()
    }

    fn generate(&self, doc: &Document) -> Result<Files, GenerateError> {
        let mut files = Files::new();
        for schema in doc.schemas() {
            let package = package_name(&schema.name);
            for entity in doc.entities_of(schema.id) {
                let file = FileId::new(&package, format!("{}.hurl", entity.name));
                let text = render_file(&file, |out| self.render_entity(out, doc, schema, entity))?;
                files.insert(file, text);
            }
        }
        Ok(files)
    }
}

impl HurlTests {
    fn render_entity(
        &self,
        out: &mut String,
        doc: &Document,
        schema: &Schema,
        entity: &Entity,
    ) -> fmt::Result {
        let route = format!("{}/{}/{}", var("host"), kebab(&schema.name), kebab(&entity.name));
        let body = self.body(doc, entity);
        let primary = doc.primary(entity.id);

        writeln!(out, "# {}", doc.qualified_name(entity.id))?;
        writeln!(out)?;
        writeln!(out, "# create")?;
        writeln!(out, "POST {route}")?;
        writeln!(out, "{body}")?;
        writeln!(out, "HTTP 201")?;

        if primary.is_empty() {
            return Ok(());
        }

        writeln!(out, "[Captures]")?;
        for attr in &primary {
            let name = self.field_name(attr);
            writeln!(out, "{name}: jsonpath \"$.{name}\"")?;
        }

        let item = format!("{route}/{}", path_values(doc, &primary));
        writeln!(out)?;
        writeln!(out, "# read")?;
        writeln!(out, "GET {item}")?;
        writeln!(out, "HTTP 200")?;
        self.render_asserts(out, doc, entity)?;
        writeln!(out)?;
        writeln!(out, "# update")?;
        writeln!(out, "PUT {item}")?;
        writeln!(out, "{body}")?;
        writeln!(out, "HTTP 200")?;
        writeln!(out)?;
        writeln!(out, "# delete")?;
        writeln!(out, "DELETE {item}")?;
        writeln!(out, "HTTP 204")
    }

    /// Type check of every field of the fetched row.
    fn render_asserts(&self, out: &mut String, doc: &Document, entity: &Entity) -> fmt::Result {
        let checks: Vec<String> = valid_fields(doc, entity.id)
            .into_iter()
            .filter_map(|a| {
                let predicate = match self.type_name(storage_kind(doc, a)) {
                    "number" => "isNumber",
                    "boolean" => "isBoolean",
                    "string" => "isString",
                    _ => return None,
                };
                Some(format!("jsonpath \"$.{}\" {predicate}", self.field_name(a)))
            })
            .collect();

        if checks.is_empty() {
            return Ok(());
        }
        writeln!(out, "[Asserts]")?;
        for check in checks {
            writeln!(out, "{check}")?;
        }
        Ok(())
    }

    /// JSON object of seed values. Serial fields of the entity itself are
    /// assigned by the server and left out.
    fn body(&self, doc: &Document, entity: &Entity) -> String {
        let members: Vec<String> = valid_fields(doc, entity.id)
            .into_iter()
            .filter(|a| storage_kind(doc, a) != AttrKind::Serial)
            .map(|a| format!("    \"{}\": {}", self.field_name(a), self.seed(doc, a)))
            .collect();

        if members.is_empty() {
            return "{}".to_string();
        }
        format!("{{\n{}\n}}", members.join(",\n"))
    }

    fn seed(&self, doc: &Document, attr: &Attribute) -> String {
        let kind = storage_kind(doc, attr);
        match (kind, doc[attr.terminal].max_size()) {
            (AttrKind::Bit, Some(width)) => format!("\"{:0>width$}\"", "1", width = width as usize),
            _ => seed_literal(kind).to_string(),
        }
    }
}

/// JSON value sent for a field of the kind.
fn seed_literal(kind: AttrKind) -> &'static str {
    match kind {
        AttrKind::None | AttrKind::Reference => "null",
        AttrKind::Serial => "2",
        AttrKind::Int => "1",
        AttrKind::Char => "\"a\"",
        AttrKind::String => "\"foo\"",
        AttrKind::Bit => "\"1\"",
        AttrKind::Boolean => "false",
        AttrKind::Date => "\"2025-11-08\"",
        AttrKind::Time => "\"21:24:52\"",
        AttrKind::Timestamp => "\"2025-11-08T21:24:52Z\"",
        AttrKind::Float | AttrKind::Real | AttrKind::Decimal | AttrKind::Money => "1.2",
    }
}

/// Hurl variable reference, `{{name}}`.
fn var(name: &str) -> String {
    ["{{", name, "}}"].concat()
}

/// Path segments addressing one row by its primary key. A single key is
/// the bare value. Composite keys name each part, shortening `foo-id/{{foo_id}}`
/// to `foo/{{foo_id}}` unless the part itself comes from a composite key.
fn path_values(doc: &Document, primary: &[&Attribute]) -> String {
    if let [only] = primary {
        return var(&only.name());
    }

    primary
        .iter()
        .map(|attr| {
            let name = attr.name();
            let terminal = &doc[attr.terminal];
            let mut segment = kebab(&name);
            if !doc.composite_primary(terminal.parent) {
                let suffix = format!("-{}", kebab(&terminal.name));
                if let Some(stripped) = segment.strip_suffix(&suffix) {
                    segment = stripped.to_string();
                }
            }
            format!("{segment}/{}", var(&name))
        })
        .collect::<Vec<_>>()
        .join("/")
}

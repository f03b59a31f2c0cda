//! Postgres DDL, one `tables.sql` for the whole document.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Write};

use super::{Field, FileId, Files, GenerateError, Renderer, fields, render_file, storage_kind};
use crate::model::kind::NOW;
use crate::model::{AttrId, AttrKind, Attribute, Document, EntityId};

pub const FILE_NAME: &str = "tables.sql";

pub struct Postgres;

impl Renderer for Postgres {
    fn type_name(&self, kind: AttrKind) -> &'static str {
        match kind {
            AttrKind::None | AttrKind::Reference => "???",
            AttrKind::Serial => "SERIAL",
            AttrKind::Int => "INT",
            AttrKind::Char => "CHARACTER",
            AttrKind::String => "VARCHAR",
            AttrKind::Bit => "BIT",
            AttrKind::Boolean => "BOOLEAN",
            AttrKind::Date => "DATE",
            AttrKind::Time => "TIME",
            AttrKind::Timestamp => "TIMESTAMP",
            AttrKind::Float => "FLOAT",
            AttrKind::Real => "REAL",
            AttrKind::Decimal => "DECIMAL",
            AttrKind::Money => "MONEY",
        }
    }

    fn field_name(&self, attr: &Attribute) -> String {
        attr.name()
    }

    fn generate(&self, doc: &Document) -> Result<Files, GenerateError> {
        let file = FileId::new("", FILE_NAME);
        let text = render_file(&file, |out| self.render(out, doc))?;
        Ok(Files::from([(file, text)]))
    }
}

/// A line inside `CREATE TABLE (...)`. Only statements are comma separated.
enum Item {
    Sql(String),
    Comment(String),
}

impl Postgres {
    fn render(&self, out: &mut String, doc: &Document) -> fmt::Result {
        writeln!(out, "-- Code generated by schemagen. DO NOT EDIT.")?;

        for schema in doc.schemas() {
            writeln!(out)?;
            writeln!(out, "CREATE SCHEMA IF NOT EXISTS {};", schema.name)?;
        }

        for entity in table_order(doc) {
            writeln!(out)?;
            self.render_table(out, doc, entity)?;
        }
        Ok(())
    }

    fn render_table(&self, out: &mut String, doc: &Document, entity: EntityId) -> fmt::Result {
        let mut items = Vec::new();

        for field in fields(doc, entity) {
            match field {
                Field::Valid(attr) => items.push(Item::Sql(self.column(doc, attr))),
                Field::Invalid { name, errors } => {
                    items.push(Item::Comment(format!("-- {name} has errors: {errors}")));
                }
            }
        }

        let primary: Vec<String> = doc.primary(entity).iter().map(|a| a.name()).collect();
        if !primary.is_empty() {
            items.push(Item::Sql(format!("PRIMARY KEY ({})", primary.join(", "))));
        }

        for group in doc.unique(entity).values() {
            let columns: Vec<String> = group.iter().map(|a| a.name()).collect();
            items.push(Item::Sql(format!("UNIQUE ({})", columns.join(", "))));
        }

        for (via, columns, targets) in foreign_keys(doc, entity) {
            items.push(Item::Sql(format!(
                "FOREIGN KEY ({}) REFERENCES {} ({})",
                columns.join(", "),
                doc.qualified_name(via),
                targets.join(", ")
            )));
        }

        writeln!(out, "CREATE TABLE {} (", doc.qualified_name(entity))?;
        let last_sql = items.iter().rposition(|i| matches!(i, Item::Sql(_)));
        for (i, item) in items.iter().enumerate() {
            match item {
                Item::Sql(sql) if Some(i) == last_sql => writeln!(out, "    {sql}")?,
                Item::Sql(sql) => writeln!(out, "    {sql},")?,
                Item::Comment(comment) => writeln!(out, "    {comment}")?,
            }
        }
        writeln!(out, ");")
    }

    fn column(&self, doc: &Document, attr: &Attribute) -> String {
        let kind = storage_kind(doc, attr);
        let terminal = &doc[attr.terminal];
        let source = &doc[attr.source];
        let name = self.field_name(attr);

        let mut sql = format!("{name} {}", self.type_name(kind));
        if matches!(kind, AttrKind::String | AttrKind::Bit) {
            if let Some(size) = terminal.max_size() {
                sql.push_str(&format!("({size})"));
            }
        }
        if source.required() || source.primary {
            sql.push_str(" NOT NULL");
        }
        if attr.direct_child {
            if let Some(value) = &terminal.default_value {
                sql.push_str(&format!(" DEFAULT {}", literal(kind, value)));
            }
            let (min, max) = (&source.validation.min, &source.validation.max);
            if let Some(check) = check(&name, kind, min.as_deref(), max.as_deref()) {
                sql.push_str(&format!(" CHECK ({check})"));
            }
        }
        sql
    }
}

/// SQL literal for a sanitized default or bound value.
fn literal(kind: AttrKind, value: &str) -> String {
    match kind {
        AttrKind::Date if value == NOW => "CURRENT_DATE".to_string(),
        AttrKind::Time if value == NOW => "CURRENT_TIME".to_string(),
        AttrKind::Timestamp if value == NOW => "CURRENT_TIMESTAMP".to_string(),
        AttrKind::Boolean => value.to_uppercase(),
        AttrKind::Bit => format!("B'{value}'"),
        AttrKind::Money => format!("'{value}'::money"),
        AttrKind::Char | AttrKind::String | AttrKind::Date | AttrKind::Time | AttrKind::Timestamp => {
            format!("'{}'", value.replace('\'', "''"))
        }
        _ => value.to_string(),
    }
}

/// Range constraint of a column. String ranges bound the length, and only a
/// lower bound needs a check since the upper one sizes the column.
fn check(
    column: &str,
    kind: AttrKind,
    min: Option<&str>,
    max: Option<&str>,
) -> Option<String> {
    match kind {
        AttrKind::String => min.map(|min| format!("char_length({column}) >= {min}")),
        AttrKind::Int
        | AttrKind::Float
        | AttrKind::Real
        | AttrKind::Decimal
        | AttrKind::Money
        | AttrKind::Date
        | AttrKind::Time
        | AttrKind::Timestamp => {
            let min = min.map(|v| literal(kind, v));
            let max = max.map(|v| literal(kind, v));
            match (min, max) {
                (Some(min), Some(max)) => Some(format!("{column} BETWEEN {min} AND {max}")),
                (Some(min), None) => Some(format!("{column} >= {min}")),
                (None, Some(max)) => Some(format!("{column} <= {max}")),
                (None, None) => None,
            }
        }
        _ => None,
    }
}

/// One foreign key per reference attribute: the referenced table, the
/// local columns and the columns they point at.
fn foreign_keys(doc: &Document, entity: EntityId) -> Vec<(EntityId, Vec<String>, Vec<String>)> {
    let mut keys: BTreeMap<AttrId, (EntityId, Vec<String>, Vec<String>)> = BTreeMap::new();

    for attr in super::valid_fields(doc, entity) {
        let (Some(via), Some(target)) = (attr.via, attr.via_column()) else {
            continue;
        };
        let key = keys
            .entry(attr.source)
            .or_insert_with(|| (via, Vec::new(), Vec::new()));
        key.1.push(attr.name());
        key.2.push(target);
    }

    keys.into_values().collect()
}

/// Entities ordered so that referenced tables come first. Entities caught in
/// a reference cycle come last, in document order.
fn table_order(doc: &Document) -> Vec<EntityId> {
    let entities: Vec<EntityId> = doc.entities().map(|e| e.id).collect();

    let parents: BTreeMap<EntityId, BTreeSet<EntityId>> = entities
        .iter()
        .map(|&id| {
            let deps = doc
                .flatten(id)
                .iter()
                .filter_map(|a| a.via)
                .filter(|&via| via != id)
                .collect();
            (id, deps)
        })
        .collect();

    let mut levels: BTreeMap<EntityId, usize> = BTreeMap::new();
    let mut changed = true;
    while changed {
        changed = false;
        for (&entity, deps) in &parents {
            if levels.contains_key(&entity) {
                continue;
            }
            let parent_levels: Vec<usize> = deps.iter().filter_map(|p| levels.get(p).copied()).collect();
            if parent_levels.len() == deps.len() {
                let level = parent_levels.iter().max().map_or(0, |l| l + 1);
                levels.insert(entity, level);
                changed = true;
            }
        }
    }

    let max_level = levels.values().copied().max().map_or(0, |l| l + 1);
    let mut ordered: Vec<(usize, usize, EntityId)> = entities
        .iter()
        .enumerate()
        .map(|(position, id)| (levels.get(id).copied().unwrap_or(max_level), position, *id))
        .collect();
    ordered.sort();
    ordered.into_iter().map(|(_, _, id)| id).collect()
}

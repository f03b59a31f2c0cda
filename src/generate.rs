//! Code generation backends.
//!
//! Every backend renders a [`Document`] into a set of files keyed by
//! [`FileId`]. Attribute defects never stop generation; they are rendered
//! as comments where the field would have been.

pub mod align;
pub mod case;
pub mod go;
pub mod hurl;
pub mod postgres;

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::config::Backend;
use crate::model::{AttrKind, Attribute, Document, EntityId};

pub use go::GoStructs;
pub use hurl::HurlTests;
pub use postgres::Postgres;

/// Output-relative directory and file name of a generated file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileId {
    pub dir: String,
    pub name: String,
}

impl FileId {
    pub fn new(dir: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
        }
    }

    /// The same file placed under another directory.
    pub fn nest(&self, parent: &str) -> Self {
        let dir = match (parent.is_empty(), self.dir.is_empty()) {
            (true, _) => self.dir.clone(),
            (false, true) => parent.to_string(),
            (false, false) => format!("{parent}/{}", self.dir),
        };
        Self::new(dir, self.name.clone())
    }

    pub fn path(&self) -> PathBuf {
        let mut path = PathBuf::new();
        for part in self.dir.split('/').filter(|p| !p.is_empty()) {
            path.push(part);
        }
        path.push(&self.name);
        path
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dir.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.dir, self.name)
        }
    }
}

pub type Files = BTreeMap<FileId, String>;

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("failed to render {file}")]
    Render {
        file: FileId,
        #[source]
        source: fmt::Error,
    },
}

/// A backend: its type table, its naming convention and its file layout.
pub trait Renderer {
    /// Backend type of a storage kind.
    fn type_name(&self, kind: AttrKind) -> &'static str;

    /// Backend identifier of a flattened attribute.
    fn field_name(&self, attr: &Attribute) -> String;

    fn generate(&self, doc: &Document) -> Result<Files, GenerateError>;
}

/// Render one backend.
pub fn generate(doc: &Document, backend: Backend) -> Result<Files, GenerateError> {
    match backend {
        Backend::GoStructs => GoStructs.generate(doc),
        Backend::Postgres => Postgres.generate(doc),
        Backend::Hurl => HurlTests.generate(doc),
    }
}

/// Run `render` into a fresh buffer, attributing a formatting failure to
/// the file being rendered.
pub(crate) fn render_file(
    file: &FileId,
    render: impl FnOnce(&mut String) -> fmt::Result,
) -> Result<String, GenerateError> {
    let mut out = String::new();
    render(&mut out).map_err(|source| GenerateError::Render {
        file: file.clone(),
        source,
    })?;
    tracing::debug!(%file, bytes = out.len(), "generated");
    Ok(out)
}

/// Kind actually stored for a flattened attribute. A serial pulled in
/// through a reference is a plain integer on the referencing side.
pub fn storage_kind(doc: &Document, attr: &Attribute) -> AttrKind {
    match doc[attr.terminal].kind {
        AttrKind::Serial if !attr.direct_child => AttrKind::Int,
        kind => kind,
    }
}

/// A field slot of an entity, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<'d> {
    Valid(&'d Attribute),
    Invalid { name: String, errors: String },
}

/// Fields of an entity: every flattened attribute in the order its source
/// was declared, with defective attributes standing in as [`Field::Invalid`].
pub fn fields(doc: &Document, entity: EntityId) -> Vec<Field<'_>> {
    let flattened = doc.flatten(entity);
    let mut out = Vec::new();

    for raw in doc.attributes_of(entity) {
        if raw.has_err() {
            out.push(Field::Invalid {
                name: raw.segment().replace('.', "_"),
                errors: raw.err_string(),
            });
            continue;
        }
        for attr in flattened.iter().filter(|a| a.source == raw.id) {
            if doc.is_valid(attr) {
                out.push(Field::Valid(attr));
            } else {
                out.push(Field::Invalid {
                    name: attr.name(),
                    errors: doc[attr.terminal].err_string(),
                });
            }
        }
    }

    out
}

/// Valid flattened attributes of an entity, in field order.
pub fn valid_fields(doc: &Document, entity: EntityId) -> Vec<&Attribute> {
    fields(doc, entity)
        .into_iter()
        .filter_map(|f| match f {
            Field::Valid(attr) => Some(attr),
            Field::Invalid { .. } => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use std::path::Path;

    #[test]
    fn test_file_id() {
        let file = FileId::new("kitchen", "kitchen.go");
        assert_eq!(file.to_string(), "kitchen/kitchen.go");
        assert_eq!(file.path(), Path::new("kitchen").join("kitchen.go"));

        let nested = file.nest("golang");
        assert_eq!(nested.to_string(), "golang/kitchen/kitchen.go");

        let root = FileId::new("", "tables.sql");
        assert_eq!(root.to_string(), "tables.sql");
        assert_eq!(root.nest("postgres").to_string(), "postgres/tables.sql");
    }

    #[test]
    fn test_fields_keep_declaration_order() {
        let doc = parse(
            "# Lib
## Author
- id as ++
## Book
- title as str with ..80
- @author with required
- @publisher
- isbn as bad
- pages as int
",
        );
        let book = doc.find_entity("lib", "book").unwrap();
        let fields = fields(&doc, book);
        let rendered: Vec<_> = fields
            .iter()
            .map(|f| match f {
                Field::Valid(a) => a.name(),
                Field::Invalid { name, errors } => format!("{name}! {errors}"),
            })
            .collect();
        assert_eq!(
            rendered,
            vec![
                "title",
                "author_id",
                "publisher! cannot find reference",
                "isbn! kind invalid",
                "pages",
            ]
        );
        assert_eq!(valid_fields(&doc, book).len(), 3);
    }

    #[test]
    fn test_storage_kind_of_referenced_serial() {
        let doc = parse("# Lib\n## Author\n- id as ++\n## Book\n- @author\n");
        let author = doc.find_entity("lib", "author").unwrap();
        let book = doc.find_entity("lib", "book").unwrap();
        assert_eq!(storage_kind(&doc, &doc.flatten(author)[0]), AttrKind::Serial);
        assert_eq!(storage_kind(&doc, &doc.flatten(book)[0]), AttrKind::Int);
    }
}

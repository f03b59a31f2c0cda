//! The document arena: every schema, entity and attribute of one parse,
//! with back-references stored as handles.

use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Index;

use super::attribute::{AttrError, AttributeRaw};
use super::flatten::{self, Attribute, MAX_DEPTH};
use super::handle::{AttrId, EntityId, SchemaId};
use super::kind::AttrKind;
use crate::normalize::{fallback_name, normalize};
use crate::parser::parse_attribute_line;

#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error("unknown schema: {0}")]
    UnknownSchema(SchemaId),
    #[error("unknown entity: {0}")]
    UnknownEntity(EntityId),
    #[error("unknown attribute: {0}")]
    UnknownAttribute(AttrId),
}

/// Primary categorization, like a database schema or a package.
#[derive(Debug, Clone)]
pub struct Schema {
    pub id: SchemaId,
    pub name: String,
    pub entities: Vec<EntityId>,
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "# {}", self.name)
    }
}

/// A named record type within a schema, like a table.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub parent: SchemaId,
    pub attributes: Vec<AttrId>,
    flattened: OnceCell<Vec<Attribute>>,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "## {}", self.name)
    }
}

/// All nodes of one parsed document.
///
/// Derived views (flattened attributes) are memoized per entity. Every
/// mutating method clears all of them, since an entity's flattened list
/// depends on the primary keys of the entities it references.
#[derive(Debug, Clone)]
pub struct Document {
    schemas: Vec<Option<Schema>>,
    entities: Vec<Option<Entity>>,
    attributes: Vec<Option<AttributeRaw>>,
    max_depth: usize,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            schemas: Vec::new(),
            entities: Vec::new(),
            attributes: Vec::new(),
            max_depth: MAX_DEPTH,
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth;
        self.invalidate();
    }

    pub fn is_empty(&self) -> bool {
        self.schemas().next().is_none()
    }

    pub fn schemas(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.iter().flatten()
    }

    pub fn schema(&self, id: SchemaId) -> Option<&Schema> {
        self.schemas.get(id.slot()?)?.as_ref()
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.slot()?)?.as_ref()
    }

    pub fn attribute(&self, id: AttrId) -> Option<&AttributeRaw> {
        self.attributes.get(id.slot()?)?.as_ref()
    }

    fn schema_mut(&mut self, id: SchemaId) -> Result<&mut Schema, EditError> {
        id.slot()
            .and_then(|slot| self.schemas.get_mut(slot))
            .and_then(Option::as_mut)
            .ok_or(EditError::UnknownSchema(id))
    }

    fn entity_mut(&mut self, id: EntityId) -> Result<&mut Entity, EditError> {
        id.slot()
            .and_then(|slot| self.entities.get_mut(slot))
            .and_then(Option::as_mut)
            .ok_or(EditError::UnknownEntity(id))
    }

    pub(crate) fn attribute_mut(&mut self, id: AttrId) -> Result<&mut AttributeRaw, EditError> {
        id.slot()
            .and_then(|slot| self.attributes.get_mut(slot))
            .and_then(Option::as_mut)
            .ok_or(EditError::UnknownAttribute(id))
    }

    pub fn entities_of(&self, schema: SchemaId) -> impl Iterator<Item = &Entity> {
        self.schema(schema)
            .into_iter()
            .flat_map(|s| s.entities.iter())
            .filter_map(|&id| self.entity(id))
    }

    /// Every entity, in document order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.schemas().flat_map(|s| self.entities_of(s.id))
    }

    pub fn attributes_of(&self, entity: EntityId) -> impl Iterator<Item = &AttributeRaw> {
        self.entity(entity)
            .into_iter()
            .flat_map(|e| e.attributes.iter())
            .filter_map(|&id| self.attribute(id))
    }

    pub fn find_schema(&self, name: &str) -> Option<SchemaId> {
        self.schemas().find(|s| s.name == name).map(|s| s.id)
    }

    pub fn find_entity(&self, schema: &str, name: &str) -> Option<EntityId> {
        let schema = self.find_schema(schema)?;
        self.entities_of(schema)
            .find(|e| e.name == name)
            .map(|e| e.id)
    }

    pub fn schema_of_entity(&self, entity: EntityId) -> Option<SchemaId> {
        self.entity(entity).map(|e| e.parent)
    }

    pub fn schema_of_attribute(&self, attr: AttrId) -> Option<SchemaId> {
        self.attribute(attr)
            .and_then(|a| self.schema_of_entity(a.parent))
    }

    /// `schema.entity`
    pub fn qualified_name(&self, entity: EntityId) -> String {
        match self.entity(entity) {
            Some(e) => match self.schema(e.parent) {
                Some(s) => format!("{}.{}", s.name, e.name),
                None => e.name.clone(),
            },
            None => String::new(),
        }
    }

    /// `schema/entity/attribute`, a stable accessor for editing surfaces.
    pub fn attribute_path(&self, attr: AttrId) -> String {
        let Some(a) = self.attribute(attr) else {
            return String::new();
        };
        let entity = self.entity(a.parent);
        let schema = entity.and_then(|e| self.schema(e.parent));
        [
            schema.map(|s| s.name.as_str()).unwrap_or_default(),
            entity.map(|e| e.name.as_str()).unwrap_or_default(),
            a.name.as_str(),
        ]
        .join("/")
    }

    /// True if any attribute owned by the schema carries errors.
    pub fn has_error(&self, schema: SchemaId) -> bool {
        self.entities_of(schema)
            .flat_map(|e| self.attributes_of(e.id))
            .any(AttributeRaw::has_err)
    }

    pub fn any_error(&self) -> bool {
        self.schemas().any(|s| self.has_error(s.id))
    }

    /// Flattened attributes of an entity, memoized until the next mutation.
    pub fn flatten(&self, entity: EntityId) -> &[Attribute] {
        match self.entity(entity) {
            Some(e) => e
                .flattened
                .get_or_init(|| flatten::flatten(self, entity, self.max_depth)),
            None => &[],
        }
    }

    /// Flattened attributes whose source is a valid primary attribute.
    pub fn primary(&self, entity: EntityId) -> Vec<&Attribute> {
        self.flatten(entity)
            .iter()
            .filter(|a| self.is_valid(a) && self[a.source].primary)
            .collect()
    }

    /// Valid flattened attributes grouped by unique label.
    pub fn unique(&self, entity: EntityId) -> BTreeMap<&str, Vec<&Attribute>> {
        let mut groups: BTreeMap<&str, Vec<&Attribute>> = BTreeMap::new();
        for attr in self.flatten(entity) {
            if !self.is_valid(attr) {
                continue;
            }
            for label in &self[attr.source].unique {
                groups.entry(label.as_str()).or_default().push(attr);
            }
        }
        groups
    }

    pub fn composite_primary(&self, entity: EntityId) -> bool {
        self.primary(entity).len() > 1
    }

    /// Neither end of the chain carries errors.
    pub fn is_valid(&self, attr: &Attribute) -> bool {
        !self[attr.source].has_err() && !self[attr.terminal].has_err()
    }

    pub(crate) fn invalidate(&mut self) {
        for entity in self.entities.iter_mut().flatten() {
            entity.flattened.take();
        }
    }

    pub fn add_schema(&mut self, name: &str) -> SchemaId {
        let id = SchemaId::from_slot(self.schemas.len());
        let name = non_empty(normalize(name), id.get());
        self.schemas.push(Some(Schema {
            id,
            name,
            entities: Vec::new(),
        }));
        id
    }

    pub fn rename_schema(&mut self, id: SchemaId, name: &str) -> Result<(), EditError> {
        let schema = self.schema_mut(id)?;
        schema.name = non_empty(normalize(name), id.get());
        let entities = schema.entities.clone();
        self.retarget_references(&entities);
        self.invalidate();
        self.retry_references();
        Ok(())
    }

    pub fn remove_schema(&mut self, id: SchemaId) -> Result<(), EditError> {
        let entities = self.schema_mut(id)?.entities.clone();
        for entity in entities {
            self.remove_entity(entity)?;
        }
        if let Some(slot) = id.slot() {
            self.schemas[slot] = None;
        }
        self.invalidate();
        Ok(())
    }

    pub fn add_entity(&mut self, schema: SchemaId, name: &str) -> Result<EntityId, EditError> {
        let id = EntityId::from_slot(self.entities.len());
        self.schema_mut(schema)?.entities.push(id);
        self.entities.push(Some(Entity {
            id,
            name: non_empty(normalize(name), id.get()),
            parent: schema,
            attributes: Vec::new(),
            flattened: OnceCell::new(),
        }));
        self.retry_references();
        Ok(id)
    }

    pub fn rename_entity(&mut self, id: EntityId, name: &str) -> Result<(), EditError> {
        let entity = self.entity_mut(id)?;
        entity.name = non_empty(normalize(name), id.get());
        self.retarget_references(&[id]);
        self.invalidate();
        self.retry_references();
        Ok(())
    }

    /// Remove an entity with its attributes. Attributes referencing it lose
    /// their target and report an invalid reference.
    pub fn remove_entity(&mut self, id: EntityId) -> Result<(), EditError> {
        let entity = self.entity_mut(id)?;
        let parent = entity.parent;
        let owned = std::mem::take(&mut entity.attributes);

        for attr in owned {
            if let Some(slot) = attr.slot() {
                self.attributes[slot] = None;
            }
        }
        if let Ok(schema) = self.schema_mut(parent) {
            schema.entities.retain(|&e| e != id);
        }
        if let Some(slot) = id.slot() {
            self.entities[slot] = None;
        }

        for attr in self.attributes.iter_mut().flatten() {
            if attr.reference_to == Some(id) {
                attr.reference_to = None;
                attr.append_err(AttrError::InvalidReference);
            }
        }

        self.invalidate();
        Ok(())
    }

    /// Parse an attribute line and add it to an entity, resolving its
    /// reference against the current document.
    pub fn add_attribute(&mut self, entity: EntityId, line: &str) -> Result<AttrId, EditError> {
        self.insert_attribute(entity, parse_attribute_line(line))
    }

    pub fn insert_attribute(
        &mut self,
        entity: EntityId,
        raw: AttributeRaw,
    ) -> Result<AttrId, EditError> {
        let id = self.attach(entity, raw)?;
        self.resolve_reference(id);
        Ok(id)
    }

    /// Replace an attribute in place, keeping its handle and owner.
    pub fn replace_attribute(&mut self, id: AttrId, line: &str) -> Result<(), EditError> {
        let mut raw = parse_attribute_line(line);
        let current = self.attribute_mut(id)?;
        raw.id = current.id;
        raw.parent = current.parent;
        *current = raw;

        self.ensure_unique_segment(id);
        self.resolve_reference(id);
        self.invalidate();
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: AttrId) -> Result<(), EditError> {
        let parent = self.attribute_mut(id)?.parent;
        if let Ok(entity) = self.entity_mut(parent) {
            entity.attributes.retain(|&a| a != id);
        }
        if let Some(slot) = id.slot() {
            self.attributes[slot] = None;
        }
        self.invalidate();
        Ok(())
    }

    /// Point an attribute at an entity by handle, turning it into a
    /// reference.
    pub fn set_reference(&mut self, id: AttrId, target: EntityId) -> Result<(), EditError> {
        if self.entity(target).is_none() {
            return Err(EditError::UnknownEntity(target));
        }
        let attr = self.attribute_mut(id)?;
        attr.kind = AttrKind::Reference;
        attr.name = target.to_string();
        attr.reference_to = None;
        attr.default_value = None;
        attr.errors.retain(|e| *e != AttrError::InvalidReference);

        self.resolve_reference(id);
        self.ensure_unique_segment(id);
        self.invalidate();
        Ok(())
    }

    /// Add a parsed attribute to an entity without resolving references.
    pub(crate) fn attach(
        &mut self,
        entity: EntityId,
        mut raw: AttributeRaw,
    ) -> Result<AttrId, EditError> {
        let id = AttrId::from_slot(self.attributes.len());
        self.entity_mut(entity)?.attributes.push(id);

        raw.id = id;
        raw.parent = entity;
        if raw.name.is_empty() {
            raw.name = fallback_name(id.get());
        }
        self.attributes.push(Some(raw));

        self.ensure_unique_segment(id);
        self.invalidate();
        Ok(id)
    }

    /// Keep flattened names unique within an entity: a taken alias is
    /// dropped, and a taken name is replaced by a fallback name (as an
    /// alias for references, so the target can still be resolved).
    pub(crate) fn ensure_unique_segment(&mut self, id: AttrId) {
        let Some(attr) = self.attribute(id) else {
            return;
        };
        let siblings: Vec<&AttributeRaw> = self
            .attributes_of(attr.parent)
            .filter(|a| a.id != id)
            .collect();

        let alias_taken = attr
            .alias
            .as_ref()
            .is_some_and(|alias| siblings.iter().any(|s| s.alias.as_ref() == Some(alias)));
        let segment = if alias_taken {
            attr.name.as_str()
        } else {
            attr.segment()
        };
        let segment_taken = siblings.iter().any(|s| s.segment() == segment);
        let is_reference = attr.is_reference();

        let Ok(attr) = self.attribute_mut(id) else {
            return;
        };
        if alias_taken {
            attr.alias = None;
        }
        if segment_taken {
            let fallback = fallback_name(id.get());
            if is_reference {
                attr.alias = Some(fallback);
            } else {
                attr.name = fallback;
            }
        }
    }
}

fn non_empty(name: String, n: u32) -> String {
    if name.is_empty() {
        fallback_name(n)
    } else {
        name
    }
}

/// # Panics
///
/// Panics on a handle that does not name a live node of this document.
impl Index<SchemaId> for Document {
    type Output = Schema;

    fn index(&self, id: SchemaId) -> &Schema {
        self.schema(id).expect("stale schema handle")
    }
}

impl Index<EntityId> for Document {
    type Output = Entity;

    fn index(&self, id: EntityId) -> &Entity {
        self.entity(id).expect("stale entity handle")
    }
}

impl Index<AttrId> for Document {
    type Output = AttributeRaw;

    fn index(&self, id: AttrId) -> &AttributeRaw {
        self.attribute(id).expect("stale attribute handle")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::serializer::serialize;

    const SHOP: &str = "# Shop

## Customer
- id as ++
- first name as str with required, 3..30, unique:fl
- last name as str with required, 3..30, unique:fl, unique:ldob
- dob as date with unique:ldob

## Order
- id as ++
- @customer with required
";

    #[test]
    fn test_unique_groups() {
        let doc = parse(SHOP);
        let customer = doc.find_entity("shop", "customer").unwrap();
        let unique = doc.unique(customer);
        let labels: Vec<_> = unique.keys().copied().collect();
        assert_eq!(labels, vec!["fl", "ldob"]);
        let ldob: Vec<_> = unique["ldob"].iter().map(|a| a.name()).collect();
        assert_eq!(ldob, vec!["last_name", "dob"]);
    }

    #[test]
    fn test_primary_views() {
        let doc = parse(SHOP);
        let customer = doc.find_entity("shop", "customer").unwrap();
        assert_eq!(doc.primary(customer).len(), 1);
        assert!(!doc.composite_primary(customer));
    }

    #[test]
    fn test_add_attribute_invalidates_cache() {
        let mut doc = parse(SHOP);
        let order = doc.find_entity("shop", "order").unwrap();
        assert_eq!(doc.flatten(order).len(), 2);

        let placed = doc.add_attribute(order, "- placed at as ts with default:now").unwrap();
        assert_eq!(doc.flatten(order).len(), 3);
        assert_eq!(doc[placed].kind, AttrKind::Timestamp);

        doc.remove_attribute(placed).unwrap();
        assert_eq!(doc.flatten(order).len(), 2);
    }

    #[test]
    fn test_editing_referenced_primary_invalidates_referrer() {
        let mut doc = parse(SHOP);
        let customer = doc.find_entity("shop", "customer").unwrap();
        let order = doc.find_entity("shop", "order").unwrap();
        assert_eq!(doc.flatten(order)[1].name(), "customer_id");

        let id = doc[customer].attributes[0];
        doc.replace_attribute(id, "- code as int with primary, required")
            .unwrap();
        assert_eq!(doc.flatten(order)[1].name(), "customer_code");
    }

    #[test]
    fn test_remove_entity_breaks_references() {
        let mut doc = parse(SHOP);
        let customer = doc.find_entity("shop", "customer").unwrap();
        let order = doc.find_entity("shop", "order").unwrap();

        doc.remove_entity(customer).unwrap();
        assert!(doc.entity(customer).is_none());
        assert_eq!(doc.flatten(order).len(), 1);

        let reference = doc.attributes_of(order).nth(1).unwrap();
        assert_eq!(reference.errors, vec![AttrError::InvalidReference]);
        assert!(doc.any_error());
        assert!(matches!(
            doc.add_entity(SchemaId(99), "x"),
            Err(EditError::UnknownSchema(_))
        ));
    }

    const STORE: &str = "# Shop
## Customer
- id as ++
# Sales
## Order
- id as ++
- @shop.customer with required
";

    #[test]
    fn test_rename_schema_follows_dotted_references() {
        let mut doc = parse(STORE);
        let shop = doc.find_schema("shop").unwrap();
        let order = doc.find_entity("sales", "order").unwrap();
        assert_eq!(doc.flatten(order)[1].name(), "shop_customer_id");

        doc.rename_schema(shop, "Store").unwrap();
        assert_eq!(doc.attributes_of(order).nth(1).unwrap().name, "store.customer");
        assert_eq!(doc.flatten(order)[1].name(), "store_customer_id");

        let again = parse(&serialize(&doc));
        assert!(!again.any_error());
        assert!(again.find_entity("store", "customer").is_some());
    }

    #[test]
    fn test_remove_schema_breaks_cross_schema_references() {
        let mut doc = parse(STORE);
        let shop = doc.find_schema("shop").unwrap();
        let sales = doc.find_schema("sales").unwrap();
        let order = doc.find_entity("sales", "order").unwrap();
        assert_eq!(doc.flatten(order).len(), 2);

        doc.remove_schema(shop).unwrap();
        assert!(doc.schema(shop).is_none());
        assert_eq!(doc.schemas().count(), 1);
        assert!(doc.find_entity("shop", "customer").is_none());
        assert_eq!(doc.flatten(order).len(), 1);

        let reference = doc.attributes_of(order).nth(1).unwrap();
        assert_eq!(reference.reference_to, None);
        assert_eq!(reference.errors, vec![AttrError::InvalidReference]);
        assert!(doc.has_error(sales));
        assert!(matches!(doc.remove_schema(shop), Err(EditError::UnknownSchema(_))));
    }

    #[test]
    fn test_set_reference_by_handle() {
        let mut doc = parse(SHOP);
        let customer = doc.find_entity("shop", "customer").unwrap();
        let order = doc.find_entity("shop", "order").unwrap();
        let id = doc.add_attribute(order, "- buyer as int").unwrap();

        doc.set_reference(id, customer).unwrap();
        let attr = &doc[id];
        assert_eq!(attr.reference_to, Some(customer));
        assert_eq!(attr.name, "shop.customer");
        let names: Vec<_> = doc.flatten(order).iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["id", "customer_id", "shop_customer_id"]);
    }

    #[test]
    fn test_duplicate_names() {
        let doc = parse(
            "# S
## E
- code as int
- code as str with ..4
- @e as me
- @e as me
",
        );
        let e = doc.find_entity("s", "e").unwrap();
        let attrs: Vec<_> = doc.attributes_of(e).collect();
        assert_eq!(attrs[0].name, "code");
        assert!(attrs[1].name.starts_with("unset_"));
        assert_eq!(attrs[2].alias.as_deref(), Some("me"));
        assert_eq!(attrs[3].alias, None);
        assert_eq!(attrs[3].reference_to, Some(e));
    }

    #[test]
    fn test_attribute_path_and_errors() {
        let doc = parse("# Lib\n## Book\n- title as str with required");
        let book = doc.find_entity("lib", "book").unwrap();
        let title = doc[book].attributes[0];
        assert_eq!(doc.attribute_path(title), "lib/book/title");
        let lib = doc.find_schema("lib").unwrap();
        assert!(doc.has_error(lib));
    }
}

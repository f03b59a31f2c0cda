use crate::model::{Attribute, Document, EntityId};

/// A relationship between two entities inferred from references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    pub base: EntityId,
    pub has: EntityId,
    /// Associative entity joining `base` and `has`, for many-to-many.
    pub assoc: Option<EntityId>,
    pub many: bool,
    pub optional: bool,
}

impl Relation {
    /// `base_has`, e.g. `order_customer` or `food_ingredients`.
    pub fn name(&self, doc: &Document) -> String {
        format!("{}_{}", entity_name(doc, self.base), self.has_name(doc))
    }

    /// Name of the `has` side, pluralized when it can hold many rows.
    pub fn has_name(&self, doc: &Document) -> String {
        let name = entity_name(doc, self.has);
        if self.assoc.is_none() && !self.many {
            return name.to_string();
        }
        pluralize(name)
    }

    /// Reference-derived attributes of `base` that point at `has`.
    pub fn primary_base_to_has<'d>(&self, doc: &'d Document) -> Vec<&'d Attribute> {
        pointing_at(doc, self.base, self.has)
    }

    /// Reference-derived attributes of `has` that point at `base`.
    pub fn primary_has_to_base<'d>(&self, doc: &'d Document) -> Vec<&'d Attribute> {
        pointing_at(doc, self.has, self.base)
    }

    /// Attributes of the associative entity pointing at `base` and at `has`.
    pub fn keys_for_assoc_relation<'d>(&self, doc: &'d Document) -> [Vec<&'d Attribute>; 2] {
        match self.assoc {
            Some(assoc) => [
                pointing_at(doc, assoc, self.base),
                pointing_at(doc, assoc, self.has),
            ],
            None => [Vec::new(), Vec::new()],
        }
    }
}

fn entity_name(doc: &Document, id: EntityId) -> &str {
    doc.entity(id).map(|e| e.name.as_str()).unwrap_or_default()
}

fn pluralize(name: &str) -> String {
    if let Some(stem) = name.strip_suffix('y') {
        format!("{stem}ies")
    } else if name.ends_with('s') {
        format!("{name}es")
    } else {
        format!("{name}s")
    }
}

fn pointing_at(doc: &Document, from: EntityId, to: EntityId) -> Vec<&Attribute> {
    doc.flatten(from)
        .iter()
        .filter(|a| !a.direct_child && doc[a.terminal].parent == to)
        .collect()
}

/// Infers relations over a whole document.
pub struct RelationMaker<'a> {
    doc: &'a Document,
}

impl<'a> RelationMaker<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self { doc }
    }

    /// Every relation in the document, at most one per (base, has) pair.
    ///
    /// An entity with a composite primary key is associative: it yields one
    /// many-to-many relation per pair of distinct entities its key points
    /// at. Any other entity yields one relation per referenced entity, and
    /// each referenced entity in turn has many of the referencing one.
    pub fn determine(&self) -> Vec<Relation> {
        let mut relations: Vec<Relation> = Vec::new();
        let mut push = |candidate: Relation| {
            let duplicate = relations
                .iter()
                .any(|r| r.base == candidate.base && r.has == candidate.has);
            if !duplicate {
                relations.push(candidate);
            }
        };

        let plain: Vec<EntityId> = self
            .doc
            .entities()
            .map(|e| e.id)
            .filter(|&e| !self.doc.composite_primary(e))
            .collect();

        for entity in self.doc.entities() {
            if self.doc.composite_primary(entity.id) {
                let owners = self.key_owners(entity.id);
                for (i, &base) in owners.iter().enumerate() {
                    for &has in &owners[i + 1..] {
                        push(Relation {
                            base,
                            has,
                            assoc: Some(entity.id),
                            many: true,
                            optional: true,
                        });
                    }
                }
                continue;
            }

            for attr in self.doc.flatten(entity.id) {
                if attr.direct_child {
                    continue;
                }
                push(Relation {
                    base: entity.id,
                    has: self.doc[attr.terminal].parent,
                    assoc: None,
                    many: false,
                    optional: !self.doc[attr.source].required(),
                });
            }
        }

        for &entity in &plain {
            for attr in self.doc.flatten(entity) {
                if attr.direct_child {
                    continue;
                }
                push(Relation {
                    base: self.doc[attr.terminal].parent,
                    has: entity,
                    assoc: None,
                    many: true,
                    optional: true,
                });
            }
        }

        relations
    }

    /// Relations whose base is the given entity.
    pub fn determine_for(&self, entity: EntityId) -> Vec<Relation> {
        self.determine()
            .into_iter()
            .filter(|r| r.base == entity)
            .collect()
    }

    /// Distinct owning entities of the primary key attributes, in order.
    fn key_owners(&self, entity: EntityId) -> Vec<EntityId> {
        let mut owners = Vec::new();
        for attr in self.doc.primary(entity) {
            let owner = self.doc[attr.terminal].parent;
            if !owners.contains(&owner) {
                owners.push(owner);
            }
        }
        owners
    }
}

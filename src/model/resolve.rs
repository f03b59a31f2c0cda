//! Reference resolution against the whole document.

use tracing::warn;

use super::attribute::AttrError;
use super::document::Document;
use super::handle::{AttrId, EntityId};

enum Target {
    /// Matched by handle text. The reference is rewritten to the entity's
    /// qualified name so it survives serialization.
    Handle(EntityId, String),
    Name(EntityId),
}

impl Document {
    /// Resolve every reference attribute that has no target yet and has not
    /// already been reported as unresolvable.
    pub fn resolve_references(&mut self) {
        let pending: Vec<AttrId> = self
            .entities()
            .flat_map(|e| self.attributes_of(e.id))
            .filter(|a| {
                a.is_reference()
                    && a.reference_to.is_none()
                    && !a.errors.contains(&AttrError::InvalidReference)
            })
            .map(|a| a.id)
            .collect();

        for id in pending {
            self.resolve_reference(id);
        }
    }

    /// Give references that were reported unresolvable another chance, after
    /// an entity was added or renamed.
    pub(crate) fn retry_references(&mut self) {
        let lost: Vec<AttrId> = self
            .entities()
            .flat_map(|e| self.attributes_of(e.id))
            .filter(|a| {
                a.is_reference()
                    && a.reference_to.is_none()
                    && a.errors.contains(&AttrError::InvalidReference)
            })
            .map(|a| a.id)
            .collect();

        for id in lost {
            if let Ok(attr) = self.attribute_mut(id) {
                attr.errors.retain(|e| *e != AttrError::InvalidReference);
            }
            self.resolve_reference(id);
        }
    }

    /// Rewrite the written target of references to renamed entities so the
    /// document still serializes to DSL that resolves the same way. A bare
    /// name stays bare while it still finds the same entity first.
    pub(crate) fn retarget_references(&mut self, renamed: &[EntityId]) {
        let stale: Vec<(AttrId, EntityId, bool)> = self
            .entities()
            .flat_map(|e| self.attributes_of(e.id))
            .filter_map(|a| {
                let target = a.reference_to.filter(|t| renamed.contains(t))?;
                Some((a.id, target, !a.name.contains('.')))
            })
            .collect();

        for (id, target, bare) in stale {
            let Some(entity) = self.entity(target) else {
                continue;
            };
            let still_found = matches!(
                self.find_target(&entity.name),
                Some(Target::Name(found)) if found == target
            );
            let name = if bare && still_found {
                entity.name.clone()
            } else {
                self.qualified_name(target)
            };
            if let Ok(attr) = self.attribute_mut(id) {
                attr.name = name;
            }
            self.ensure_unique_segment(id);
        }
    }

    /// Point a reference attribute at its target entity, trying in order a
    /// handle match, a `schema.entity` match and a bare entity name match.
    /// Returns whether the attribute ends up resolved.
    pub fn resolve_reference(&mut self, id: AttrId) -> bool {
        let Some(attr) = self.attribute(id) else {
            return false;
        };
        if !attr.is_reference() {
            return false;
        }
        if attr.reference_to.is_some() {
            return true;
        }

        let target = self.find_target(&attr.name);
        let path = self.attribute_path(id);
        let Ok(attr) = self.attribute_mut(id) else {
            return false;
        };

        let resolved = match target {
            Some(Target::Handle(entity, qualified)) => {
                attr.reference_to = Some(entity);
                attr.name = qualified;
                true
            }
            Some(Target::Name(entity)) => {
                attr.reference_to = Some(entity);
                true
            }
            None => {
                warn!(attribute = %path, target = %attr.name, "cannot find reference");
                if !attr.errors.contains(&AttrError::InvalidReference) {
                    attr.append_err(AttrError::InvalidReference);
                }
                false
            }
        };

        self.invalidate();
        resolved
    }

    fn find_target(&self, name: &str) -> Option<Target> {
        if let Some(entity) = EntityId::parse(name).filter(|&e| self.entity(e).is_some()) {
            return Some(Target::Handle(entity, self.qualified_name(entity)));
        }

        if let Some((schema, entity)) = name.split_once('.') {
            return self.find_entity(schema, entity).map(Target::Name);
        }

        self.entities()
            .find(|e| e.name == name)
            .map(|e| Target::Name(e.id))
    }
}

//! Reference flattening: replace reference attributes with the primary key
//! attributes of their targets, recursively.

use tracing::debug;

use super::document::Document;
use super::handle::{AttrId, EntityId};

/// Reference chains deeper than this are truncated.
pub const MAX_DEPTH: usize = 5;

/// A storable attribute reached by walking zero or more references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Outermost raw attribute of the chain. Its validation options apply.
    pub source: AttrId,
    /// Innermost, non-reference raw attribute that is actually stored.
    pub terminal: AttrId,
    /// Entity the first reference of the chain points at, if any.
    pub via: Option<EntityId>,
    /// Alias-or-name of every hop, outermost first.
    pub segments: Vec<String>,
    pub direct_child: bool,
    pub changed_schema: bool,
}

impl Attribute {
    /// Flattened column name, e.g. `kitchen_recipe_food_id`.
    pub fn name(&self) -> String {
        self.segments.join("_").replace('.', "_")
    }

    /// Dotted path of hops, e.g. `kitchen.recipe.food.id`.
    pub fn path(&self) -> String {
        self.segments.join(".")
    }

    /// Name of the column this attribute points at in the `via` entity.
    pub fn via_column(&self) -> Option<String> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(self.segments[1..].join("_").replace('.', "_"))
    }
}

/// Walk an entity's attributes down to `max_depth` levels of references.
pub(crate) fn flatten(doc: &Document, entity: EntityId, max_depth: usize) -> Vec<Attribute> {
    let mut out = Vec::new();
    walk(doc, entity, 0, max_depth, &[], None, &mut out);
    out
}

fn walk(
    doc: &Document,
    entity: EntityId,
    depth: usize,
    max_depth: usize,
    prefix: &[String],
    head: Option<(AttrId, EntityId)>,
    out: &mut Vec<Attribute>,
) {
    if depth >= max_depth {
        debug!(%entity, depth, "reference chain truncated");
        return;
    }

    for attr in doc.attributes_of(entity) {
        // a reference only pulls in the identity of the referenced row
        if depth > 0 && !attr.primary {
            continue;
        }

        let mut segments = prefix.to_vec();
        segments.push(attr.segment().to_string());

        if attr.is_reference() {
            let Some(target) = attr.reference_to else {
                continue;
            };
            let head = head.unwrap_or((attr.id, target));
            walk(doc, target, depth + 1, max_depth, &segments, Some(head), out);
            continue;
        }

        let (source, via) = match head {
            Some((source, via)) => (source, Some(via)),
            None => (attr.id, None),
        };

        let changed_schema = doc.schema_of_attribute(source) != doc.schema_of_attribute(attr.id);

        out.push(Attribute {
            source,
            terminal: attr.id,
            via,
            segments,
            direct_child: depth == 0,
            changed_schema,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    const KITCHEN: &str = "# Kitchen

## Food
- id as ++
- name as str with required, 3..30

## Ingredient
- id as ++
- name as str with required, 3..30

## Recipe
- @food with required, primary
- @ingredient with required, primary
- amount as int with required

# Restaurant

## Customer
- id as ++

## Order
- @customer as co with required, primary
- @kitchen.recipe with required, primary
";

    fn entity(doc: &Document, schema: &str, name: &str) -> EntityId {
        doc.find_entity(schema, name).unwrap()
    }

    #[test]
    fn test_direct_attributes() {
        let doc = parse(KITCHEN);
        let food = entity(&doc, "kitchen", "food");
        let attrs = doc.flatten(food);
        assert_eq!(attrs.len(), 2);
        assert!(attrs.iter().all(|a| a.direct_child && !a.changed_schema));
        assert_eq!(attrs[1].name(), "name");
    }

    #[test]
    fn test_reference_pulls_primary_only() {
        let doc = parse(KITCHEN);
        let recipe = entity(&doc, "kitchen", "recipe");
        let names: Vec<_> = doc.flatten(recipe).iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["food_id", "ingredient_id", "amount"]);
    }

    #[test]
    fn test_chain_across_schemas() {
        let doc = parse(KITCHEN);
        let order = entity(&doc, "restaurant", "order");
        let attrs = doc.flatten(order);
        let names: Vec<_> = attrs.iter().map(|a| a.name()).collect();
        assert_eq!(
            names,
            vec!["co_id", "kitchen_recipe_food_id", "kitchen_recipe_ingredient_id"]
        );

        let chained = &attrs[1];
        assert!(!chained.direct_child);
        assert!(chained.changed_schema);
        assert_eq!(chained.path(), "kitchen.recipe.food.id");
        assert_eq!(chained.via, Some(entity(&doc, "kitchen", "recipe")));
        assert_eq!(chained.via_column().as_deref(), Some("food_id"));
        assert_eq!(doc[chained.source].name, "kitchen.recipe");
        assert_eq!(doc[chained.terminal].name, "id");
        assert!(!attrs[0].changed_schema);
    }

    #[test]
    fn test_cycle_is_bounded() {
        let doc = parse(
            "# Loop
## A
- @b with primary
## B
- @a with primary
",
        );
        let a = entity(&doc, "loop", "a");
        assert!(doc.flatten(a).is_empty());
    }

    #[test]
    fn test_long_chain_truncates() {
        let names = ["a", "b", "c", "d", "e", "f", "g", "h"];
        let mut src = String::from("# Chain\n## A\n- id as ++\n");
        for pair in names.windows(2) {
            src.push_str(&format!("## {}\n- @{} with primary\n", pair[1], pair[0]));
        }
        let doc = parse(&src);

        let e = entity(&doc, "chain", "e");
        assert_eq!(doc.flatten(e)[0].name(), "d_c_b_a_id");

        let h = entity(&doc, "chain", "h");
        assert!(doc.flatten(h).is_empty());
    }
}

//! Bundled example documents.

use crate::normalize::normalize;

pub struct Sample {
    pub label: &'static str,
    pub source: &'static str,
}

pub const SAMPLES: &[Sample] = &[
    Sample {
        label: "Books and People",
        source: "# People

## Author
- id as ++
- first name as string with unique:full name, required, 3..32
- last name as str with u:full name, r, ..30
- dob as date with 1900-01-01..

# Library

## Category
- id as ++
- name as str with unique, required, 3..30

## Book
- id as ++
- title as str with unique, required, ..50
- published as ts with default:now
- @category with required

## Publication
- @book with primary
- @people.author with primary
- flags as bit with ..16
",
    },
    Sample {
        label: "Foo Bar",
        source: "# Foo

## Bar

- id as ++
- name as str with 0..3
",
    },
];

/// Look up a sample by label, ignoring case and punctuation.
pub fn find(name: &str) -> Option<&'static Sample> {
    let wanted = normalize(name);
    SAMPLES.iter().find(|s| normalize(s.label) == wanted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::relation::RelationMaker;

    #[test]
    fn test_find() {
        assert_eq!(find("foo bar").map(|s| s.label), Some("Foo Bar"));
        assert_eq!(find("books-and-people").map(|s| s.label), Some("Books and People"));
        assert!(find("nothing").is_none());
    }

    #[test]
    fn test_samples_are_clean() {
        for sample in SAMPLES {
            let doc = parse(sample.source);
            assert!(!doc.any_error(), "{} has errors", sample.label);
        }
    }

    #[test]
    fn test_publication_is_associative() {
        let doc = parse(find("books and people").unwrap().source);
        let publication = doc.find_entity("library", "publication").unwrap();
        assert!(doc.composite_primary(publication));

        let relations = RelationMaker::new(&doc).determine();
        let book = doc.find_entity("library", "book").unwrap();
        let author = doc.find_entity("people", "author").unwrap();
        assert!(relations
            .iter()
            .any(|r| r.base == book && r.has == author && r.assoc == Some(publication)));
    }
}

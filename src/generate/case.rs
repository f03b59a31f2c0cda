//! Naming conventions shared by the backends.

use convert_case::{Case, Casing};

/// Words written fully upper-case in Go identifiers.
const ACRONYMS: [&str; 8] = ["id", "html", "css", "js", "eol", "eof", "dob", "ttl"];

pub fn snake(s: &str) -> String {
    s.to_case(Case::Snake)
}

pub fn kebab(s: &str) -> String {
    s.to_case(Case::Kebab)
}

/// camelCase with acronyms upper-cased: `foo_bar_id` becomes `fooBarID`.
pub fn camel_ua(s: &str) -> String {
    up_acronym(s, |run| run.to_case(Case::Camel))
}

/// PascalCase with acronyms upper-cased: `foo_bar_id` becomes `FooBarID`.
pub fn pascal_ua(s: &str) -> String {
    up_acronym(s, |run| run.to_case(Case::Pascal))
}

fn up_acronym(s: &str, convention: impl Fn(&str) -> String) -> String {
    let snake = snake(s);
    let mut out = String::new();
    let mut run: Vec<&str> = Vec::new();

    for word in snake.split('_').filter(|w| !w.is_empty()) {
        if ACRONYMS.contains(&word) {
            flush(&mut out, &mut run, &convention);
            out.push_str(&word.to_uppercase());
        } else {
            run.push(word);
        }
    }
    flush(&mut out, &mut run, &convention);
    out
}

fn flush(out: &mut String, run: &mut Vec<&str>, convention: &impl Fn(&str) -> String) {
    if run.is_empty() {
        return;
    }
    out.push_str(&convention(&run.join("_")));
    run.clear();
}

/// Go package name: the schema name without underscores.
pub fn package_name(schema: &str) -> String {
    snake(schema).replace('_', "")
}

//! Interpretation of a single `- ...` attribute line.

use tracing::debug;

use crate::lexer::{DELI_AS, DELI_LABEL, DELI_RANGE, DELI_WITH, PREFIX_ATTRIBUTE};
use crate::model::{AttrError, AttrKind, AttributeRaw, EntityId};
use crate::normalize::normalize;

/// Interpret one attribute line. Never fails: defects are attached to the
/// returned attribute. A missing identifier or kind stops interpretation
/// early, leaving the options unread.
pub fn parse_attribute_line(line: &str) -> AttributeRaw {
    let line = line.trim();
    let body = line.strip_prefix(PREFIX_ATTRIBUTE).unwrap_or(line).trim_start();
    let Declaration {
        ident,
        kind,
        opts,
        alias,
    } = Declaration::split(body);

    let kind_str = kind.trim();
    let kind = AttrKind::from_str(kind_str);

    let mut attr = AttributeRaw {
        name: identifier(ident, kind),
        alias: alias.map(normalize).filter(|a| !a.is_empty()),
        ..Default::default()
    };

    if attr.name.is_empty() {
        attr.append_err(AttrError::IdentifierRequired);
        return attr;
    }
    if kind_str.is_empty() {
        attr.append_err(AttrError::KindRequired);
        return attr;
    }
    if kind == AttrKind::None {
        attr.append_err(AttrError::KindInvalid);
        return attr;
    }
    attr.kind = kind;

    for opt in opts.split(',').map(str::trim).filter(|o| !o.is_empty()) {
        apply_option(&mut attr, opt);
    }

    attr.sanitize_serial_kind();
    attr.ensure_valid_range();
    attr.maybe_require_validation();
    attr.sanitize_default_value();
    attr
}

/// The parts of an attribute line, with `@target [as alias]` shorthand
/// already expanded to a reference declaration.
struct Declaration<'a> {
    ident: &'a str,
    kind: &'a str,
    opts: &'a str,
    alias: Option<&'a str>,
}

impl<'a> Declaration<'a> {
    fn split(body: &'a str) -> Self {
        if let Some(rest) = body.strip_prefix('@') {
            let reference = AttrKind::Reference.keyword();
            return match rest.split_once(DELI_AS) {
                Some((target, after)) => {
                    let (alias, opts) = split_with(after);
                    Self {
                        ident: target,
                        kind: reference,
                        opts,
                        alias: Some(alias),
                    }
                }
                None => {
                    let (target, opts) = split_with(rest);
                    Self {
                        ident: target,
                        kind: reference,
                        opts,
                        alias: None,
                    }
                }
            };
        }

        let (ident, later) = body.split_once(DELI_AS).unwrap_or((body, ""));
        let (kind, opts) = split_with(later);
        Self {
            ident,
            kind,
            opts,
            alias: None,
        }
    }
}

fn split_with(s: &str) -> (&str, &str) {
    let s = s.trim();
    if let Some((head, opts)) = s.split_once(DELI_WITH) {
        return (head, opts);
    }
    if let Some(opts) = s.strip_prefix(DELI_WITH.trim_start()) {
        return ("", opts);
    }
    match s.strip_suffix(DELI_WITH.trim_end()) {
        Some(head) => (head, ""),
        None => (s, ""),
    }
}

/// Normalized identifier. References keep a `schema.entity` form or an
/// entity handle; other kinds only keep the part before any dot.
fn identifier(ident: &str, kind: AttrKind) -> String {
    let ident = ident.trim();
    let (head, tail) = match ident.split_once('.') {
        Some((head, tail)) => (normalize(head), Some(normalize(tail))),
        None => (normalize(ident), None),
    };

    if kind != AttrKind::Reference {
        return head;
    }
    if let Some(handle) = EntityId::parse(ident) {
        return handle.to_string();
    }
    match tail {
        Some(tail) => format!("{head}.{tail}"),
        None => head,
    }
}

fn apply_option(attr: &mut AttributeRaw, opt: &str) {
    match opt.to_lowercase().as_str() {
        "p" | "primary" => attr.primary = true,
        "r" | "required" => attr.validation.required = true,
        "u" | "unique" => {
            let label = attr.segment().replace('.', "_");
            push_unique(attr, label);
        }
        _ if opt.contains(DELI_RANGE) => {
            let (min, max) = opt.split_once(DELI_RANGE).unwrap_or((opt, ""));
            attr.validation.min = non_empty(min);
            attr.validation.max = non_empty(max);
        }
        _ if opt.contains(DELI_LABEL) => {
            let (label, value) = opt.split_once(DELI_LABEL).unwrap_or((opt, ""));
            match label.trim().to_lowercase().as_str() {
                "u" | "unique" => push_unique(attr, normalize(value)),
                "d" | "default" => attr.default_value = Some(value.trim().to_string()),
                _ => debug!(option = opt, "unknown option label ignored"),
            }
        }
        _ => debug!(option = opt, "unknown option ignored"),
    }
}

fn push_unique(attr: &mut AttributeRaw, label: String) {
    if !label.is_empty() && !attr.unique.contains(&label) {
        attr.unique.push(label);
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

//! Raw attributes as written in the DSL, with their per-kind validation.

use std::fmt;

use super::handle::{AttrId, EntityId};
use super::kind::{AttrKind, NOW, canonical_moment, parse_moment};

/// A defect attached to a single attribute. Defects never abort a
/// document; they are rendered inline by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AttrError {
    #[error("identifier required")]
    IdentifierRequired,
    #[error("kind required")]
    KindRequired,
    #[error("kind invalid")]
    KindInvalid,
    #[error("upper range is required")]
    MaxLenRequired,
    #[error("bit size is required")]
    BitSizeRequired,
    #[error("range invalid: min malformed")]
    RangeMinMalformed,
    #[error("range invalid: max malformed")]
    RangeMaxMalformed,
    #[error("range invalid: max under min")]
    RangeMaxUnderMin,
    #[error("unacceptable default value")]
    MalformedDefault,
    #[error("cannot find reference")]
    InvalidReference,
}

/// Optional constraints on a value. Bounds keep their source text because
/// their meaning depends on the kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validation {
    pub required: bool,
    pub min: Option<String>,
    pub max: Option<String>,
}

/// An attribute of an entity, like a column in a table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeRaw {
    pub id: AttrId,
    pub parent: EntityId,
    pub kind: AttrKind,
    pub primary: bool,
    /// Normalized name. For references this is the target as written,
    /// either `entity` or `schema.entity`.
    pub name: String,
    pub alias: Option<String>,
    pub default_value: Option<String>,
    pub unique: Vec<String>,
    pub errors: Vec<AttrError>,
    pub reference_to: Option<EntityId>,
    pub validation: Validation,
}

impl AttributeRaw {
    pub fn append_err(&mut self, err: AttrError) {
        self.errors.push(err);
    }

    pub fn has_err(&self) -> bool {
        !self.errors.is_empty()
    }

    /// All errors joined for inline rendering.
    pub fn err_string(&self) -> String {
        self.errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn has_default(&self) -> bool {
        self.default_value.is_some()
    }

    pub fn is_reference(&self) -> bool {
        self.kind == AttrKind::Reference
    }

    pub fn required(&self) -> bool {
        self.validation.required
    }

    pub fn unique_labels(&self) -> String {
        self.unique.join(", ")
    }

    /// Path segment this attribute contributes to flattened names.
    pub fn segment(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Upper bound read as a size, as used by String and Bit.
    pub fn max_size(&self) -> Option<u32> {
        self.validation.max.as_deref()?.trim().parse().ok()
    }

    /// Serial attributes are always required primary keys without a range.
    pub fn sanitize_serial_kind(&mut self) {
        if self.kind != AttrKind::Serial {
            return;
        }
        self.primary = true;
        self.validation.required = true;
        self.validation.min = None;
        self.validation.max = None;
    }

    /// Check range bounds against the kind's value format.
    pub fn ensure_valid_range(&mut self) {
        match self.kind {
            AttrKind::Bit => {
                self.validation.min = None;
                if self.validation.max.is_some() && self.max_size().is_none() {
                    self.append_err(AttrError::RangeMaxMalformed);
                }
            }
            kind if kind.is_temporal() => {
                self.check_bounds(|s| parse_moment(kind, s));
            }
            kind if kind.has_numeric_range() => {
                self.check_bounds(parse_finite);
            }
            _ => {}
        }
    }

    fn check_bounds<T: PartialOrd>(&mut self, parse: impl Fn(&str) -> Option<T>) {
        let min = self.validation.min.as_deref().map(&parse);
        let max = self.validation.max.as_deref().map(&parse);

        if matches!(min, Some(None)) {
            self.append_err(AttrError::RangeMinMalformed);
        }
        if matches!(max, Some(None)) {
            self.append_err(AttrError::RangeMaxMalformed);
        }
        if let (Some(Some(min)), Some(Some(max))) = (min, max) {
            if max < min {
                self.append_err(AttrError::RangeMaxUnderMin);
            }
        }
    }

    /// Error if the attribute lacks the validation its kind needs.
    pub fn maybe_require_validation(&mut self) {
        match self.kind {
            AttrKind::String if self.validation.max.is_none() => {
                self.append_err(AttrError::MaxLenRequired);
            }
            AttrKind::Bit if self.validation.max.is_none() => {
                self.append_err(AttrError::BitSizeRequired);
            }
            _ => {}
        }
    }

    /// Keep the default value only if it is acceptable for the kind,
    /// rewriting it canonically. A rejected default is cleared and
    /// reported.
    pub fn sanitize_default_value(&mut self) {
        let Some(candidate) = self
            .default_value
            .take()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
        else {
            return;
        };

        let sanitized = match self.kind {
            AttrKind::None | AttrKind::Reference => None,
            AttrKind::Serial | AttrKind::Int => {
                candidate.parse::<i64>().ok().map(|v| v.to_string())
            }
            AttrKind::Boolean => parse_bool(&candidate).map(|b| b.to_string()),
            AttrKind::Char => (candidate.chars().count() == 1).then_some(candidate),
            AttrKind::String => Some(candidate),
            AttrKind::Bit => sanitize_bit(&candidate, self.max_size().unwrap_or(0)),
            AttrKind::Date | AttrKind::Time | AttrKind::Timestamp => {
                if candidate.eq_ignore_ascii_case(NOW) {
                    Some(NOW.to_string())
                } else {
                    canonical_moment(self.kind, &candidate)
                }
            }
            AttrKind::Float | AttrKind::Real | AttrKind::Decimal | AttrKind::Money => {
                parse_finite(&candidate).map(|_| candidate)
            }
        };

        match sanitized {
            Some(value) => self.default_value = Some(value),
            None => self.append_err(AttrError::MalformedDefault),
        }
    }
}

/// Numbers the generated DDL can carry as bare literals, so no NaN or
/// infinity.
fn parse_finite(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// Accept a binary string, falling back to decimal, and zero-pad it to the
/// declared width. Width 0 means unsized.
fn sanitize_bit(candidate: &str, width: u32) -> Option<String> {
    let value = u64::from_str_radix(candidate, 2)
        .or_else(|_| candidate.parse::<u64>())
        .ok()?;

    if width > 0 && width < 64 && value >> width != 0 {
        return None;
    }

    Some(format!("{:0width$b}", value, width = width as usize))
}

/// Writes a DSL line that parses back to an equivalent attribute.
impl fmt::Display for AttributeRaw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut opts = Vec::new();

        if self.primary {
            opts.push("primary".to_string());
        }
        if self.validation.required {
            opts.push("required".to_string());
        }
        if self.validation.min.is_some() || self.validation.max.is_some() {
            opts.push(format!(
                "{}..{}",
                self.validation.min.as_deref().unwrap_or(""),
                self.validation.max.as_deref().unwrap_or("")
            ));
        }
        for label in &self.unique {
            let label = label.trim();
            if !label.is_empty() {
                opts.push(format!("unique:{label}"));
            }
        }
        if let Some(value) = &self.default_value {
            opts.push(format!("default:{value}"));
        }

        if self.is_reference() {
            write!(f, "- @{}", self.name)?;
            if let Some(alias) = &self.alias {
                write!(f, " as {alias}")?;
            }
        } else {
            write!(f, "- {} as {}", self.name, self.kind.keyword())?;
        }

        if !opts.is_empty() {
            write!(f, " with {}", opts.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn attr(kind: AttrKind) -> AttributeRaw {
        AttributeRaw {
            name: "value".to_string(),
            kind,
            ..Default::default()
        }
    }

    #[test]
    fn test_serial_is_forced_primary() {
        let mut a = attr(AttrKind::Serial);
        a.validation.min = Some("1".into());
        a.sanitize_serial_kind();
        assert!(a.primary);
        assert!(a.required());
        assert_eq!(a.validation.min, None);
    }

    #[test]
    fn test_range_max_under_min() {
        let mut a = attr(AttrKind::Int);
        a.validation.min = Some("10".into());
        a.validation.max = Some("2".into());
        a.ensure_valid_range();
        assert_eq!(a.errors, vec![AttrError::RangeMaxUnderMin]);
    }

    #[test]
    fn test_date_range_malformed() {
        let mut a = attr(AttrKind::Date);
        a.validation.min = Some("2006-01-02".into());
        a.validation.max = Some("soon".into());
        a.ensure_valid_range();
        assert_eq!(a.errors, vec![AttrError::RangeMaxMalformed]);
    }

    #[test]
    fn test_bit_range_drops_min() {
        let mut a = attr(AttrKind::Bit);
        a.validation.min = Some("3".into());
        a.validation.max = Some("16".into());
        a.ensure_valid_range();
        assert!(!a.has_err());
        assert_eq!(a.validation.min, None);

        a.validation.max = Some("-4".into());
        a.ensure_valid_range();
        assert_eq!(a.errors, vec![AttrError::RangeMaxMalformed]);
    }

    #[rstest]
    #[case("NaN", "10", vec![AttrError::RangeMinMalformed])]
    #[case("0", "inf", vec![AttrError::RangeMaxMalformed])]
    #[case("-infinity", "infinity", vec![AttrError::RangeMinMalformed, AttrError::RangeMaxMalformed])]
    #[case("-1.5", "1e3", vec![])]
    fn test_numeric_range_must_be_finite(
        #[case] min: &str,
        #[case] max: &str,
        #[case] expected: Vec<AttrError>,
    ) {
        let mut a = attr(AttrKind::Decimal);
        a.validation.min = Some(min.into());
        a.validation.max = Some(max.into());
        a.ensure_valid_range();
        assert_eq!(a.errors, expected);
    }

    #[rstest]
    #[case("inf", None)]
    #[case("NaN", None)]
    #[case("-Infinity", None)]
    #[case("2.50", Some("2.50"))]
    fn test_numeric_default_must_be_finite(#[case] value: &str, #[case] expected: Option<&str>) {
        let mut a = attr(AttrKind::Money);
        a.default_value = Some(value.into());
        a.sanitize_default_value();
        assert_eq!(a.default_value.as_deref(), expected);
        assert_eq!(a.has_err(), expected.is_none());
    }

    #[test]
    fn test_missing_max() {
        let mut s = attr(AttrKind::String);
        s.maybe_require_validation();
        assert_eq!(s.err_string(), "upper range is required");

        let mut b = attr(AttrKind::Bit);
        b.maybe_require_validation();
        assert_eq!(b.err_string(), "bit size is required");
    }

    #[test]
    fn test_default_int() {
        let mut a = attr(AttrKind::Int);
        a.default_value = Some(" 42 ".into());
        a.sanitize_default_value();
        assert_eq!(a.default_value.as_deref(), Some("42"));

        a.default_value = Some("forty".into());
        a.sanitize_default_value();
        assert_eq!(a.default_value, None);
        assert_eq!(a.errors, vec![AttrError::MalformedDefault]);
    }

    #[test]
    fn test_default_bool_and_char() {
        let mut b = attr(AttrKind::Boolean);
        b.default_value = Some("T".into());
        b.sanitize_default_value();
        assert_eq!(b.default_value.as_deref(), Some("true"));

        let mut c = attr(AttrKind::Char);
        c.default_value = Some("ab".into());
        c.sanitize_default_value();
        assert_eq!(c.default_value, None);
        assert!(c.has_err());
    }

    #[test]
    fn test_default_bit_padding() {
        let mut a = attr(AttrKind::Bit);
        a.validation.max = Some("8".into());

        a.default_value = Some("101".into());
        a.sanitize_default_value();
        assert_eq!(a.default_value.as_deref(), Some("00000101"));

        a.default_value = Some("12".into());
        a.sanitize_default_value();
        assert_eq!(a.default_value.as_deref(), Some("00001100"));

        a.default_value = Some("300".into());
        a.sanitize_default_value();
        assert_eq!(a.default_value, None);
        assert_eq!(a.errors, vec![AttrError::MalformedDefault]);
    }

    #[test]
    fn test_default_temporal() {
        let mut a = attr(AttrKind::Timestamp);
        a.default_value = Some("NOW".into());
        a.sanitize_default_value();
        assert_eq!(a.default_value.as_deref(), Some("now"));

        let mut d = attr(AttrKind::Date);
        d.default_value = Some("2024-02-30".into());
        d.sanitize_default_value();
        assert_eq!(d.default_value, None);
        assert!(d.has_err());
    }

    #[test]
    fn test_reference_never_has_default() {
        let mut a = attr(AttrKind::Reference);
        a.default_value = Some("1".into());
        a.sanitize_default_value();
        assert_eq!(a.default_value, None);
        assert_eq!(a.errors, vec![AttrError::MalformedDefault]);
    }

    #[test]
    fn test_display_plain() {
        let a = AttributeRaw {
            name: "last_name".into(),
            kind: AttrKind::String,
            unique: vec!["fl".into(), "ldob".into()],
            validation: Validation {
                required: true,
                min: Some("3".into()),
                max: Some("30".into()),
            },
            ..Default::default()
        };
        assert_eq!(
            a.to_string(),
            "- last_name as string with required, 3..30, unique:fl, unique:ldob"
        );
    }

    #[test]
    fn test_display_reference() {
        let a = AttributeRaw {
            name: "restaurant.customer".into(),
            alias: Some("co".into()),
            kind: AttrKind::Reference,
            primary: true,
            ..Default::default()
        };
        assert_eq!(a.to_string(), "- @restaurant.customer as co with primary");
    }
}

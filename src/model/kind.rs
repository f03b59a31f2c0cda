//! Attribute kinds and their kind-dependent value formats.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Literal default that backends map to their current-time expression.
pub const NOW: &str = "now";

/// The core type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AttrKind {
    #[default]
    None,
    Reference,
    Serial,
    Int,
    Char,
    String,
    Bit,
    Boolean,
    Date,
    Time,
    Timestamp,
    Float,
    Real,
    Decimal,
    Money,
}

impl AttrKind {
    /// Map a DSL kind keyword, case-insensitively. Unknown keywords map to
    /// [`AttrKind::None`].
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "++" | "auto" | "auto increment" | "increment" => Self::Serial,
            "int" | "integer" | "digit" => Self::Int,
            "bool" | "boolean" => Self::Boolean,
            "str" | "string" | "varchar" => Self::String,
            "ts" | "timestamp" | "datetime" => Self::Timestamp,
            "date" => Self::Date,
            "time" => Self::Time,
            "bit" => Self::Bit,
            "char" | "character" => Self::Char,
            "dec" | "decimal" => Self::Decimal,
            "real" | "float" => Self::Float,
            "ref" | "reference" => Self::Reference,
            "money" => Self::Money,
            _ => Self::None,
        }
    }

    /// Keyword written back when serializing an attribute line.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::None => "???",
            Self::Reference => "reference",
            Self::Serial => "++",
            Self::Int => "int",
            Self::Char => "char",
            Self::String => "string",
            Self::Bit => "bit",
            Self::Boolean => "bool",
            Self::Date => "date",
            Self::Time => "time",
            Self::Timestamp => "timestamp",
            Self::Float => "float",
            Self::Real => "real",
            Self::Decimal => "decimal",
            Self::Money => "money",
        }
    }

    pub fn is_temporal(self) -> bool {
        matches!(self, Self::Date | Self::Time | Self::Timestamp)
    }

    /// Kinds whose range bounds are plain numbers. String and Char ranges
    /// bound the length.
    pub fn has_numeric_range(self) -> bool {
        matches!(
            self,
            Self::Serial
                | Self::Int
                | Self::Char
                | Self::String
                | Self::Float
                | Self::Real
                | Self::Decimal
                | Self::Money
        )
    }

    /// Format used to parse and canonically print values of a temporal kind.
    pub fn temporal_format(self) -> Option<&'static str> {
        match self {
            Self::Date => Some(DATE_FORMAT),
            Self::Time => Some(TIME_FORMAT),
            Self::Timestamp => Some(TIMESTAMP_FORMAT),
            _ => None,
        }
    }
}

/// Parse a temporal value in the kind's canonical format. All kinds are
/// projected onto a date-time so bounds can be compared.
pub fn parse_moment(kind: AttrKind, s: &str) -> Option<NaiveDateTime> {
    match kind {
        AttrKind::Date => NaiveDate::parse_from_str(s, DATE_FORMAT)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0)),
        AttrKind::Time => {
            let time = NaiveTime::parse_from_str(s, TIME_FORMAT).ok()?;
            NaiveDate::from_ymd_opt(1970, 1, 1).map(|d| d.and_time(time))
        }
        AttrKind::Timestamp => NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).ok(),
        _ => None,
    }
}

/// Re-format a temporal value canonically, or `None` if it does not parse.
pub fn canonical_moment(kind: AttrKind, s: &str) -> Option<String> {
    let format = kind.temporal_format()?;
    parse_moment(kind, s).map(|m| m.format(format).to_string())
}

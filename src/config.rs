use std::path::PathBuf;

use crate::model::MAX_DEPTH;

/// Output target of the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, clap::ValueEnum)]
pub enum Backend {
    /// Go structs, one package per schema
    #[value(name = "go", alias = "struct")]
    GoStructs,
    /// Postgres DDL
    #[value(alias = "sql", alias = "ddl")]
    Postgres,
    /// Hurl API tests, one file per entity
    #[value(alias = "test")]
    Hurl,
}

impl Backend {
    pub const ALL: [Backend; 3] = [Self::GoStructs, Self::Postgres, Self::Hurl];

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "go" | "struct" => Some(Self::GoStructs),
            "postgres" | "sql" | "ddl" => Some(Self::Postgres),
            "hurl" | "test" => Some(Self::Hurl),
            _ => None,
        }
    }

    /// Directory the backend's files are placed under when several
    /// backends share one output.
    pub fn dir(self) -> &'static str {
        match self {
            Self::GoStructs => "golang",
            Self::Postgres => "postgres",
            Self::Hurl => "hurl",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Reference chains longer than this are truncated while flattening.
    pub max_depth: usize,
    pub backends: Vec<Backend>,
    /// Where files are written. `None` prints them instead.
    pub output: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
            backends: Backend::ALL.to_vec(),
            output: None,
        }
    }
}

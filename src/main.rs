use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use schemagen::config::{Backend, Config};
use schemagen::generate::GenerateError;
use schemagen::{compile, samples, serializer};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "schemagen")]
#[command(about = "Compile a schema DSL into Go structs, Postgres DDL and Hurl tests")]
struct Args {
    /// Input DSL file
    #[arg(required_unless_present = "sample", conflicts_with = "sample")]
    input: Option<PathBuf>,

    /// Compile a bundled sample instead of a file, e.g. "foo bar"
    #[arg(short, long)]
    sample: Option<String>,

    /// Output directory (default: print to stdout)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Backends to run (default: all)
    #[arg(short, long = "backend", value_enum)]
    backends: Vec<Backend>,

    /// Maximum depth of reference chains
    #[arg(long, default_value_t = schemagen::model::MAX_DEPTH)]
    max_depth: usize,

    /// Exit with an error if any attribute has errors
    #[arg(long)]
    strict: bool,

    /// Print the normalized DSL instead of generating code
    #[arg(long)]
    print_dsl: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("unknown sample: {0}")]
    UnknownSample(String),
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error("document has errors")]
    Strict,
}

fn main() {
    let args = Args::parse();
    setup_tracing(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("ERROR: {e}");
        process::exit(1);
    }
}

fn setup_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(args: Args) -> Result<(), CliError> {
    let source = read_source(&args)?;

    let config = Config {
        max_depth: args.max_depth,
        backends: if args.backends.is_empty() {
            Backend::ALL.to_vec()
        } else {
            args.backends.clone()
        },
        output: args.output.clone(),
    };

    let output = compile(&source, &config)?;
    let doc = &output.document;

    for schema in doc.schemas().filter(|s| doc.has_error(s.id)) {
        warn!(schema = %schema.name, "schema has errors");
    }

    if args.print_dsl {
        print!("{}", serializer::serialize(doc));
    } else {
        match &config.output {
            Some(dir) => {
                for (file, text) in &output.files {
                    write_file(&dir.join(file.path()), text)?;
                }
                info!(files = output.files.len(), dir = %dir.display(), "generated");
            }
            None => {
                for (file, text) in &output.files {
                    println!("==> {file} <==");
                    print!("{text}");
                    println!();
                }
            }
        }
    }

    if args.strict && doc.any_error() {
        return Err(CliError::Strict);
    }
    Ok(())
}

fn read_source(args: &Args) -> Result<String, CliError> {
    if let Some(name) = &args.sample {
        return samples::find(name)
            .map(|s| s.source.to_string())
            .ok_or_else(|| CliError::UnknownSample(name.clone()));
    }

    let path = args.input.clone().unwrap_or_default();
    fs::read_to_string(&path).map_err(|source| CliError::Read { path, source })
}

fn write_file(path: &Path, text: &str) -> Result<(), CliError> {
    let write_err = |source| CliError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, text).map_err(write_err)
}

pub mod config;
pub mod generate;
pub mod lexer;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod relation;
pub mod samples;
pub mod serializer;

use wasm_bindgen::prelude::*;

use config::{Backend, Config};
use generate::{Files, GenerateError};
use model::Document;
use parser::Parser;

/// A parsed document and the files generated from it.
pub struct Output {
    pub document: Document,
    /// Generated files, each placed under its backend's directory.
    pub files: Files,
}

/// Parse DSL source and run every configured backend.
pub fn compile(source: &str, config: &Config) -> Result<Output, GenerateError> {
    let document = Parser::with_max_depth(config.max_depth).parse(source);

    let mut files = Files::new();
    for &backend in &config.backends {
        for (file, text) in generate::generate(&document, backend)? {
            files.insert(file.nest(backend.dir()), text);
        }
    }

    Ok(Output { document, files })
}

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Compile DSL source into an object mapping `dir/name` to file text
#[wasm_bindgen(js_name = "compileSchema")]
pub fn compile_schema(source: &str, backend: Option<String>) -> Result<js_sys::Object, String> {
    let backends = match backend.as_deref() {
        Some(name) => vec![Backend::from_str(name).ok_or_else(|| format!("unknown backend: {name}"))?],
        None => Backend::ALL.to_vec(),
    };
    let config = Config {
        backends,
        ..Config::default()
    };

    let output = compile(source, &config).map_err(|e| e.to_string())?;

    let object = js_sys::Object::new();
    for (file, text) in &output.files {
        js_sys::Reflect::set(
            &object,
            &JsValue::from_str(&file.to_string()),
            &JsValue::from_str(text),
        )
        .map_err(|_| format!("failed to set {file}"))?;
    }
    Ok(object)
}

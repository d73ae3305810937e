//! services/api/src/bin/openapi.rs
//!
//! Prints the OpenAPI document of the study planner API.
//!
//! Usage: `openapi [PATH]`. Without a path, or with `-`, the document goes to
//! stdout; otherwise it is written to PATH, creating parent directories.

use planner_api_lib::web::rest::ApiDoc;
use std::{io::Write, path::Path};
use utoipa::OpenApi;

fn document() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info.title = "Study Planner API".to_string();
    doc.info.version = env!("CARGO_PKG_VERSION").to_string();
    doc
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let json = document().to_pretty_json()?;

    match std::env::args().nth(1).as_deref() {
        None | Some("-") => {
            let mut out = std::io::stdout().lock();
            out.write_all(json.as_bytes())?;
            out.write_all(b"\n")?;
        }
        Some(path) => {
            let path = Path::new(path);
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)?;
            }
            std::fs::write(path, json)?;
            eprintln!("OpenAPI document written to {}", path.display());
        }
    }
    Ok(())
}

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use library::{Catalog, LocalFileSystem, NoopTriggers, Synchronizer};
use metadata::{MetadataParser, ParserSettings};
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: import_scan <scan|clean|refresh> <library_root> [index_path] [--force]";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut force = false;
    let mut positional = Vec::new();
    for arg in env::args().skip(1) {
        if arg == "--force" {
            force = true;
        } else {
            positional.push(arg);
        }
    }
    let mut positional = positional.into_iter();
    let command = positional.next().ok_or(USAGE)?;
    let library_root = positional
        .next()
        .or_else(|| env::var("LIBRARY_ROOT").ok())
        .ok_or(USAGE)?;
    let index_path = positional
        .next()
        .or_else(|| env::var("INDEX_PATH").ok())
        .unwrap_or_else(|| "data/index.redb".to_string());

    let settings = match env::var("PARSER_SETTINGS") {
        Ok(path) if !path.trim().is_empty() => {
            serde_yaml::from_str::<ParserSettings>(&std::fs::read_to_string(path)?)?
        }
        _ => ParserSettings::default(),
    };

    let index_path = PathBuf::from(index_path);
    if let Some(parent) = index_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let root = std::fs::canonicalize(&library_root)?;
    let name = root
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("library")
        .to_string();

    let catalog = Arc::new(Catalog::open(&index_path)?);
    let library = catalog.get_or_create_library(&name, &root.to_string_lossy())?;
    let sync = Synchronizer::new(
        Arc::clone(&catalog),
        Arc::new(MetadataParser::new(settings)?),
        Arc::new(LocalFileSystem),
        Arc::new(NoopTriggers),
        Arc::new(NoopTriggers),
    );
    info!("Library '{}' at {:?}", library.slug, root);

    let files = match command.as_str() {
        "scan" => sync.register_new_files(&library)?,
        "clean" => sync.unregister_unavailable_files(&library)?,
        "refresh" => sync.resync_all_metadata(&library, force)?,
        _ => return Err(USAGE.into()),
    };

    println!("{}: {} files", command, files.len());
    for file in files {
        println!("  {}", file.path);
    }
    Ok(())
}

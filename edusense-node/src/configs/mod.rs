use std::env;
use std::io;
use std::path::PathBuf;

pub mod schema;
pub mod settings;
pub mod storage;

pub use schema::SchemaManager;
pub use settings::{Database, Influx, InfluxVersion, Settings};
pub use storage::Storage;

fn project_root() -> io::Result<PathBuf> {
    if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
        // development and testing environments
        Ok(PathBuf::from(manifest_dir))
    } else {
        // runtime root relative path `folder/executable` -> `folder/`
        let exe = env::current_exe()?;
        exe.parent()
            .map(|path| path.to_path_buf())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "executable has no parent"))
    }
}

/// Resolve `~/`-prefixed paths against the project root.
pub fn normalize_path(path: &str) -> io::Result<PathBuf> {
    Ok(match path.strip_prefix("~/") {
        Some(relative) => project_root()?.join(relative),
        None => PathBuf::from(path),
    })
}

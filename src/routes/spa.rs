use std::path::Path;

use tower_http::services::{ServeDir, ServeFile};

/// Serves the built client; unknown paths get `index.html` so client-side routes resolve.
pub fn service(dir: &Path) -> ServeDir<ServeFile> {
    ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")))
}

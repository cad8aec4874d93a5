//! Static asset serving for the configured assets root.
//!
//! Mounted ahead of the GraphQL endpoint: a hit is served directly, a
//! miss falls through to the rest of the routing order. `GET /` resolves
//! to the index document when present, which is also why the explorer is
//! never mounted at root alongside an assets directory.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use http::{header, Method, Response, StatusCode};
use http_body_util::Full;
use tracing::debug;

const INDEX_FILE: &str = "index.html";

/// Serves files under a configured root directory.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    /// Create a server rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Attempt to serve a request.
    ///
    /// Returns `None` when the method is not GET/HEAD, the path escapes
    /// the root, or no file exists there; the caller then continues down
    /// the mount order.
    pub async fn try_serve(&self, method: &Method, request_path: &str) -> Option<Response<Full<Bytes>>> {
        if method != Method::GET && method != Method::HEAD {
            return None;
        }

        let mut path = self.resolve(request_path)?;
        if tokio::fs::metadata(&path).await.ok()?.is_dir() {
            path.push(INDEX_FILE);
        }

        let contents = match tokio::fs::read(&path).await {
            Ok(contents) => contents,
            Err(error) => {
                debug!(path = %path.display(), %error, "static miss");
                return None;
            }
        };

        let body = if method == Method::HEAD {
            Bytes::new()
        } else {
            Bytes::from(contents)
        };

        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type_for(&path))
            .body(Full::new(body))
            .ok()
    }

    /// Map a request path onto the root, rejecting traversal segments.
    fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let trimmed = request_path.trim_start_matches('/');
        let relative = Path::new(trimmed);

        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }
}

/// Content type by file extension; unknown extensions are served as
/// binary.
fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "application/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        Some("txt") => "text/plain; charset=utf-8",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture_root() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "<html>home</html>").unwrap();
        fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_serves_existing_file() {
        let root = fixture_root();
        let files = StaticFiles::new(root.path());

        let response = files.try_serve(&Method::GET, "/app.js").await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/javascript; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn test_root_serves_index() {
        let root = fixture_root();
        let files = StaticFiles::new(root.path());

        let response = files.try_serve(&Method::GET, "/").await.unwrap();
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn test_miss_falls_through() {
        let root = fixture_root();
        let files = StaticFiles::new(root.path());
        assert!(files.try_serve(&Method::GET, "/nope.css").await.is_none());
    }

    #[tokio::test]
    async fn test_post_falls_through() {
        let root = fixture_root();
        let files = StaticFiles::new(root.path());
        assert!(files.try_serve(&Method::POST, "/app.js").await.is_none());
    }

    #[tokio::test]
    async fn test_traversal_is_rejected() {
        let root = fixture_root();
        let files = StaticFiles::new(root.path());
        assert!(files
            .try_serve(&Method::GET, "/../../../etc/passwd")
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_head_returns_empty_body() {
        let root = fixture_root();
        let files = StaticFiles::new(root.path());
        let response = files.try_serve(&Method::HEAD, "/app.js").await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

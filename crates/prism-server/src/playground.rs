//! Interactive query explorer page.
//!
//! Served at the GraphQL path (and at root when no static assets root is
//! configured). Enabled unless the resolved environment is production,
//! with an explicit `playground` flag winning either way. Example
//! documents from the configured documents directory are loaded once at
//! startup and embedded as explorer tabs; loading is never on the
//! request path.

use std::path::Path;

use bytes::Bytes;
use http::{header, Response, StatusCode};
use http_body_util::Full;
use tracing::warn;

/// The explorer page, rendered once at startup.
#[derive(Debug, Clone)]
pub struct Playground {
    html: Bytes,
}

impl Playground {
    /// Render the explorer for the given GraphQL endpoint path.
    #[must_use]
    pub fn new(graphql_path: &str, documents: &[ExampleDocument]) -> Self {
        let tabs = serde_json::to_string(
            &documents
                .iter()
                .map(|doc| {
                    serde_json::json!({"name": doc.name, "query": doc.contents})
                })
                .collect::<Vec<_>>(),
        )
        .unwrap_or_else(|_| "[]".to_string());

        let html = EXPLORER_TEMPLATE
            .replace("__ENDPOINT__", graphql_path)
            .replace("__TABS__", &tabs);
        Self {
            html: Bytes::from(html),
        }
    }

    /// The `GET` response serving the explorer page.
    #[must_use]
    pub fn response(&self) -> Response<Full<Bytes>> {
        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
            .body(Full::new(self.html.clone()))
            .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
    }
}

/// An example query document embedded into the explorer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExampleDocument {
    /// Tab name, derived from the file stem.
    pub name: String,
    /// The document text.
    pub contents: String,
}

/// Load `.graphql` documents from a directory.
///
/// An unreadable directory or file is logged and skipped; example
/// documents are developer convenience, never a startup failure.
pub fn load_documents(dir: &Path) -> Vec<ExampleDocument> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) => {
            warn!(dir = %dir.display(), %error, "cannot read documents directory");
            return Vec::new();
        }
    };

    let mut documents: Vec<ExampleDocument> = entries
        .filter_map(Result::ok)
        .filter(|entry| {
            entry
                .path()
                .extension()
                .is_some_and(|ext| ext == "graphql")
        })
        .filter_map(|entry| {
            let path = entry.path();
            let name = path.file_stem()?.to_string_lossy().into_owned();
            match std::fs::read_to_string(&path) {
                Ok(contents) => Some(ExampleDocument { name, contents }),
                Err(error) => {
                    warn!(path = %path.display(), %error, "cannot read example document");
                    None
                }
            }
        })
        .collect();

    documents.sort_by(|a, b| a.name.cmp(&b.name));
    documents
}

const EXPLORER_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <title>Prism Explorer</title>
  <style>
    body { margin: 0; font-family: system-ui, sans-serif; display: flex; height: 100vh; }
    #sidebar { width: 220px; border-right: 1px solid #ddd; padding: 12px; overflow-y: auto; }
    #sidebar h2 { font-size: 14px; text-transform: uppercase; color: #666; }
    #sidebar button { display: block; width: 100%; text-align: left; margin: 4px 0; padding: 6px; border: none; background: #f4f4f4; cursor: pointer; border-radius: 4px; }
    #main { flex: 1; display: flex; flex-direction: column; }
    #query { flex: 1; font-family: monospace; font-size: 14px; padding: 12px; border: none; resize: none; }
    #result { flex: 1; font-family: monospace; font-size: 13px; padding: 12px; background: #fafafa; overflow: auto; white-space: pre; border-top: 1px solid #ddd; margin: 0; }
    #run { padding: 10px; background: #e10098; color: white; border: none; font-size: 15px; cursor: pointer; }
  </style>
</head>
<body>
  <div id="sidebar">
    <h2>Documents</h2>
    <div id="tabs"></div>
  </div>
  <div id="main">
    <textarea id="query" spellcheck="false">{ __typename }</textarea>
    <button id="run">Run on __ENDPOINT__</button>
    <pre id="result"></pre>
  </div>
  <script>
    const endpoint = "__ENDPOINT__";
    const documents = __TABS__;
    const tabs = document.getElementById("tabs");
    const query = document.getElementById("query");
    for (const doc of documents) {
      const button = document.createElement("button");
      button.textContent = doc.name;
      button.onclick = () => { query.value = doc.query; };
      tabs.appendChild(button);
    }
    document.getElementById("run").onclick = async () => {
      const response = await fetch(endpoint, {
        method: "POST",
        headers: { "content-type": "application/json" },
        body: JSON.stringify({ query: query.value }),
      });
      document.getElementById("result").textContent =
        JSON.stringify(await response.json(), null, 2);
    };
  </script>
</body>
</html>
"#;

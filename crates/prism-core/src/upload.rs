//! Upload handles for multipart GraphQL requests.
//!
//! The upload adapter rewrites each file part of a multipart request into
//! an [`UploadedFile`], then injects its scalar value into the operation
//! variables at the mapped paths. The executor is an external capability
//! that only sees JSON variables, so the handle serializes to a plain
//! object with base64 content.

use base64::Engine;
use bytes::Bytes;
use serde_json::{json, Value};

/// A file part extracted from a multipart request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Client-supplied file name, if any.
    pub filename: Option<String>,
    /// Declared content type, if any.
    pub content_type: Option<String>,
    /// The buffered file content.
    pub data: Bytes,
}

impl UploadedFile {
    /// Create a handle from extracted part metadata and content.
    #[must_use]
    pub fn new(filename: Option<String>, content_type: Option<String>, data: Bytes) -> Self {
        Self {
            filename,
            content_type,
            data,
        }
    }

    /// File size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// The JSON scalar value substituted into operation variables.
    #[must_use]
    pub fn to_scalar_value(&self) -> Value {
        json!({
            "filename": self.filename,
            "mimetype": self.content_type,
            "size": self.data.len(),
            "content": base64::engine::general_purpose::STANDARD.encode(&self.data),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_value_shape() {
        let file = UploadedFile::new(
            Some("avatar.png".to_string()),
            Some("image/png".to_string()),
            Bytes::from_static(b"png-bytes"),
        );

        assert_eq!(
            file.to_scalar_value(),
            json!({
                "filename": "avatar.png",
                "mimetype": "image/png",
                "size": 9,
                "content": "cG5nLWJ5dGVz",
            })
        );
    }

    #[test]
    fn test_scalar_value_without_metadata() {
        let file = UploadedFile::new(None, None, Bytes::new());
        let value = file.to_scalar_value();
        assert_eq!(value["filename"], Value::Null);
        assert_eq!(value["mimetype"], Value::Null);
        assert_eq!(value["size"], json!(0));
    }
}

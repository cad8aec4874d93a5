//! Multipart upload adaptation for the GraphQL endpoint.
//!
//! Multipart bodies follow the usual multipart GraphQL layout: an
//! `operations` field carrying the request JSON, a `map` field relating
//! file part names to dot-paths inside `operations`, then the file parts
//! themselves. Each file part is rewritten into an upload-handle scalar
//! and substituted at its mapped paths, so the executor only ever sees
//! JSON variables. Limit violations fail the request with a 4xx before
//! execution; no resolver runs for an oversized upload.

use std::collections::HashMap;

use bytes::Bytes;
use multer::{Constraints, Multipart, SizeLimit};
use serde_json::Value;
use tracing::debug;

use prism_config::UploadLimits;
use prism_core::{GraphQLRequest, UploadedFile};

use crate::error::RequestError;

/// Byte budget for a whole multipart stream: every file at the per-file
/// limit, plus headroom for the text fields and part framing.
pub(crate) fn stream_budget(limits: &UploadLimits) -> usize {
    limits
        .max_file_size
        .saturating_mul(limits.max_files)
        .saturating_add(64 * 1024)
}

/// Parse a multipart body into a GraphQL request with upload handles
/// substituted into the mapped variable paths.
pub async fn parse_multipart(
    body: Bytes,
    content_type: &str,
    limits: &UploadLimits,
) -> Result<GraphQLRequest, RequestError> {
    let boundary = multer::parse_boundary(content_type)
        .map_err(|e| RequestError::InvalidMultipart(e.to_string()))?;

    // Bound the stream as a whole; the per-file limit is enforced per
    // part below so the text fields are not clamped by it.
    let constraints = Constraints::new()
        .size_limit(SizeLimit::new().whole_stream(stream_budget(limits) as u64));
    let stream =
        futures_util::stream::once(async move { Ok::<Bytes, std::convert::Infallible>(body) });
    let mut multipart = Multipart::with_constraints(stream, boundary, constraints);

    let mut operations: Option<Value> = None;
    let mut map: Option<HashMap<String, Vec<String>>> = None;
    let mut file_count = 0usize;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(error) => return Err(translate_multer_error(error, limits)),
        };
        let name = field.name().map(str::to_string).unwrap_or_default();

        match name.as_str() {
            "operations" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| translate_multer_error(e, limits))?;
                let parsed = serde_json::from_str(&text)
                    .map_err(|e| RequestError::InvalidBody(e.to_string()))?;
                operations = Some(parsed);
            }
            "map" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| translate_multer_error(e, limits))?;
                let parsed = serde_json::from_str(&text).map_err(|e| {
                    RequestError::InvalidMultipart(format!("invalid map field: {e}"))
                })?;
                map = Some(parsed);
            }
            _ => {
                file_count += 1;
                if file_count > limits.max_files {
                    return Err(RequestError::TooManyFiles {
                        limit: limits.max_files,
                    });
                }

                let filename = field.file_name().map(str::to_string);
                let part_type = field.content_type().map(ToString::to_string);
                let data = field.bytes().await.map_err(|e| {
                    translate_multer_error_for(e, &name, limits)
                })?;
                if data.len() > limits.max_file_size {
                    return Err(RequestError::FileTooLarge {
                        name,
                        limit: limits.max_file_size,
                    });
                }

                let paths = map
                    .as_ref()
                    .and_then(|m| m.get(&name))
                    .ok_or_else(|| {
                        RequestError::InvalidMultipart(format!("unmapped file part '{name}'"))
                    })?
                    .clone();
                let target = operations.as_mut().ok_or_else(|| {
                    RequestError::InvalidMultipart(
                        "file part received before operations and map fields".to_string(),
                    )
                })?;

                let scalar = UploadedFile::new(filename, part_type, data).to_scalar_value();
                debug!(part = %name, paths = paths.len(), "substituting upload handle");
                for path in &paths {
                    set_path(target, path, scalar.clone());
                }
            }
        }
    }

    let operations = operations.ok_or_else(|| {
        RequestError::InvalidMultipart("missing operations field".to_string())
    })?;
    serde_json::from_value(operations).map_err(|e| RequestError::InvalidBody(e.to_string()))
}

fn translate_multer_error(error: multer::Error, limits: &UploadLimits) -> RequestError {
    translate_multer_error_for(error, "", limits)
}

fn translate_multer_error_for(
    error: multer::Error,
    fallback_name: &str,
    limits: &UploadLimits,
) -> RequestError {
    match error {
        multer::Error::FieldSizeExceeded { field_name, .. } => RequestError::FileTooLarge {
            name: field_name.unwrap_or_else(|| fallback_name.to_string()),
            limit: limits.max_file_size,
        },
        multer::Error::StreamSizeExceeded { .. } => RequestError::BodyTooLarge {
            limit: limits.max_file_size.saturating_mul(limits.max_files),
        },
        other => RequestError::InvalidMultipart(other.to_string()),
    }
}

/// Assign a value at a dot-path inside a JSON document.
///
/// Missing intermediate objects are created; array segments accept
/// numeric indices into existing arrays.
fn set_path(target: &mut Value, path: &str, value: Value) {
    let mut current = target;
    let segments: Vec<&str> = path.split('.').collect();

    for (i, segment) in segments.iter().enumerate() {
        let last = i == segments.len() - 1;
        match current {
            Value::Object(map) => {
                if last {
                    map.insert((*segment).to_string(), value);
                    return;
                }
                current = map
                    .entry((*segment).to_string())
                    .or_insert_with(|| Value::Object(serde_json::Map::new()));
            }
            Value::Array(items) => {
                let Some(item) = segment
                    .parse::<usize>()
                    .ok()
                    .and_then(|idx| items.get_mut(idx))
                else {
                    return;
                };
                if last {
                    *item = value;
                    return;
                }
                current = item;
            }
            _ => return,
        }
    }
}

//! Configuration-driven CORS handling.
//!
//! Applied globally, before any routing decision: preflight OPTIONS
//! requests are answered directly with `204`, and every other response
//! gets the allow/expose headers appended on its way out.

use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, Method, Request, Response, StatusCode};
use http_body_util::Full;

use prism_config::CorsPolicy;

const ALLOW_ORIGIN: &str = "access-control-allow-origin";
const ALLOW_METHODS: &str = "access-control-allow-methods";
const ALLOW_HEADERS: &str = "access-control-allow-headers";
const ALLOW_CREDENTIALS: &str = "access-control-allow-credentials";
const EXPOSE_HEADERS: &str = "access-control-expose-headers";
const MAX_AGE: &str = "access-control-max-age";
const REQUEST_HEADERS: &str = "access-control-request-headers";

/// Compiled CORS policy applier.
#[derive(Debug, Clone)]
pub struct Cors {
    policy: CorsPolicy,
    allow_any_origin: bool,
}

impl Cors {
    /// Compile an applier from the configured policy.
    #[must_use]
    pub fn new(policy: CorsPolicy) -> Self {
        let allow_any_origin = policy.origins.iter().any(|o| o == "*");
        Self {
            policy,
            allow_any_origin,
        }
    }

    /// Whether a request is a CORS preflight.
    pub fn is_preflight<B>(request: &Request<B>) -> bool {
        request.method() == Method::OPTIONS
            && request.headers().contains_key(header::ORIGIN)
            && request
                .headers()
                .contains_key("access-control-request-method")
    }

    /// Answer a preflight request without routing it.
    pub fn preflight_response<B>(&self, request: &Request<B>) -> Response<Full<Bytes>> {
        let mut response = Response::builder()
            .status(StatusCode::NO_CONTENT)
            .body(Full::new(Bytes::new()))
            .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())));

        let headers = response.headers_mut();
        self.append_origin(request.headers(), headers);
        insert_joined(headers, ALLOW_METHODS, &self.policy.methods);
        if self.policy.allowed_headers.is_empty() {
            // Echo whatever the client asked for when no allow-list is set.
            if let Some(requested) = request.headers().get(REQUEST_HEADERS) {
                headers.insert(ALLOW_HEADERS, requested.clone());
            }
        } else {
            insert_joined(headers, ALLOW_HEADERS, &self.policy.allowed_headers);
        }
        if let Some(max_age) = self.policy.max_age {
            if let Ok(value) = HeaderValue::from_str(&max_age.to_string()) {
                headers.insert(MAX_AGE, value);
            }
        }
        response
    }

    /// Append response headers to a routed response.
    pub fn apply<B>(&self, request_headers: &HeaderMap, response: &mut Response<B>) {
        let headers = response.headers_mut();
        self.append_origin(request_headers, headers);
        if !self.policy.exposed_headers.is_empty() {
            insert_joined(headers, EXPOSE_HEADERS, &self.policy.exposed_headers);
        }
    }

    fn append_origin(&self, request_headers: &HeaderMap, headers: &mut HeaderMap) {
        let origin = request_headers.get(header::ORIGIN);

        let allowed = if self.allow_any_origin && !self.policy.credentials {
            Some(HeaderValue::from_static("*"))
        } else {
            // With credentials (or an explicit allow-list) the origin is
            // echoed back only when it matches.
            origin
                .and_then(|o| o.to_str().ok())
                .filter(|o| {
                    self.allow_any_origin || self.policy.origins.iter().any(|a| a == o)
                })
                .and_then(|o| HeaderValue::from_str(o).ok())
        };

        if let Some(value) = allowed {
            headers.insert(ALLOW_ORIGIN, value);
            headers.append(header::VARY, HeaderValue::from_static("Origin"));
            if self.policy.credentials {
                headers.insert(ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
            }
        }
    }
}

fn insert_joined(headers: &mut HeaderMap, name: &'static str, values: &[String]) {
    if let Ok(value) = HeaderValue::from_str(&values.join(", ")) {
        headers.insert(name, value);
    }
}

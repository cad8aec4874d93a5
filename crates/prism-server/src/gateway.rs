//! Execution gateway for HTTP POST operations.
//!
//! Every request gets a freshly built context; contexts are never reused
//! or cached. Context construction and execution failures land in the
//! GraphQL response error list with a `200`, while unparseable bodies
//! and upload limit violations short-circuit as a 4xx before the
//! executor is reached.

use std::sync::Arc;

use bytes::Bytes;
use http::{header, Response, StatusCode};
use http_body_util::Full;
use tracing::debug;

use prism_config::UploadLimits;
use prism_core::{
    ContextBuilder, ContextRequest, ExecutionContext, GraphQLRequest, GraphQLResponse, RequestId,
    SchemaExecutor,
};
use prism_pubsub::PubSubHandle;

use crate::error::RequestError;
use crate::upload;

/// The HTTP operation path: body → context → execution → `{data, errors}`.
pub struct ExecutionGateway {
    executor: Arc<dyn SchemaExecutor>,
    context_builder: Arc<dyn ContextBuilder>,
    bus: PubSubHandle,
    upload_limits: UploadLimits,
}

impl ExecutionGateway {
    /// Create a gateway over the worker's shared capabilities.
    #[must_use]
    pub fn new(
        executor: Arc<dyn SchemaExecutor>,
        context_builder: Arc<dyn ContextBuilder>,
        bus: PubSubHandle,
        upload_limits: UploadLimits,
    ) -> Self {
        Self {
            executor,
            context_builder,
            bus,
            upload_limits,
        }
    }

    /// Handle one POST request to the GraphQL path.
    pub async fn handle(
        &self,
        context_request: ContextRequest,
        body: Bytes,
    ) -> Response<Full<Bytes>> {
        let request = match self.parse_body(&context_request, body).await {
            Ok(request) => request,
            Err(error) => {
                debug!(%error, "rejecting unparseable request");
                return error.into_response();
            }
        };

        let response = self.execute(context_request, request).await;
        json_response(StatusCode::OK, &response)
    }

    /// Build a fresh context and execute the operation.
    ///
    /// Failures from the context builder surface in the error list, not
    /// as a transport failure.
    pub async fn execute(
        &self,
        context_request: ContextRequest,
        request: GraphQLRequest,
    ) -> GraphQLResponse {
        let request_id = RequestId::new();
        let state = match self.context_builder.build(context_request).await {
            Ok(state) => state,
            Err(error) => {
                debug!(%request_id, %error, "context construction failed");
                return GraphQLResponse::from_error(error);
            }
        };

        let ctx = ExecutionContext::new(request_id, Arc::clone(&self.bus), state);
        self.executor.execute(request, ctx).await
    }

    /// Parse a JSON or multipart body into a GraphQL request.
    async fn parse_body(
        &self,
        context_request: &ContextRequest,
        body: Bytes,
    ) -> Result<GraphQLRequest, RequestError> {
        let content_type = context_request.header(header::CONTENT_TYPE.as_str());

        if let Some(content_type) = content_type {
            let is_multipart = content_type
                .parse::<mime::Mime>()
                .is_ok_and(|m| m.essence_str() == mime::MULTIPART_FORM_DATA.essence_str());
            if is_multipart {
                return upload::parse_multipart(body, content_type, &self.upload_limits).await;
            }
        }

        serde_json::from_slice(&body).map_err(|e| RequestError::InvalidBody(e.to_string()))
    }
}

/// Serialize a GraphQL response as a JSON HTTP response.
pub fn json_response(status: StatusCode, response: &GraphQLResponse) -> Response<Full<Bytes>> {
    let body = serde_json::to_vec(response).unwrap_or_else(|_| b"{\"data\":null}".to_vec());
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

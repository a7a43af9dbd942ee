// Copyright (C) 2024 Quickwit, Inc.
//
// Quickwit is offered under the AGPL v3.0 and as commercial software.
// For commercial licensing, contact us at hello@quickwit.io.
//
// AGPL:
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <http://www.gnu.org/licenses/>.

use std::sync::Arc;
use std::time::Instant;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Router};
use tracing::debug;

use tracegate_trace::{ingest_jaeger_thrift_spans, ingest_json_spans, SpanSink, TraceIngestError};

use crate::decompression::DecompressedBody;
use crate::metrics::TRACE_INGEST_METRICS;

/// The historical ingest path, shared by the Zipkin JSON and Jaeger Thrift
/// decoders. The payload is told apart by its content type.
pub const DEFAULT_TRACE_PATH: &str = "/v1/trace";
pub const ZIPKIN_TRACE_PATH_V1: &str = "/api/v1/spans";
pub const ZIPKIN_TRACE_PATH_V2: &str = "/api/v2/spans";

const ZIPKIN_JSON_FORMAT: &str = "zipkin_json_v1";
const JAEGER_THRIFT_FORMAT: &str = "jaeger_thrift_v1";

const THRIFT_CONTENT_TYPES: [&str; 2] =
    ["application/x-thrift", "application/vnd.apache.thrift.binary"];

/// Builds the trace ingest routes around a sink.
pub fn trace_routes(sink: Arc<dyn SpanSink>) -> Router {
    Router::new()
        .route(DEFAULT_TRACE_PATH, post(default_trace_handler))
        .route(ZIPKIN_TRACE_PATH_V1, post(zipkin_json_handler))
        .route(ZIPKIN_TRACE_PATH_V2, post(zipkin_json_handler))
        .route("/metrics", get(metrics_handler))
        .layer(Extension(sink))
}

async fn metrics_handler() -> String {
    tracegate_common::metrics::metrics_text_payload()
}

fn is_thrift_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|content_type| content_type.to_str().ok())
        .map(|content_type| {
            THRIFT_CONTENT_TYPES
                .iter()
                .any(|thrift_content_type| content_type.eq_ignore_ascii_case(thrift_content_type))
        })
        .unwrap_or(false)
}

async fn default_trace_handler(
    Extension(sink): Extension<Arc<dyn SpanSink>>,
    headers: HeaderMap,
    DecompressedBody(body): DecompressedBody,
) -> Response {
    let start = Instant::now();
    if is_thrift_content_type(&headers) {
        let result = ingest_jaeger_thrift_spans(&body, &*sink).await;
        into_ingest_response(JAEGER_THRIFT_FORMAT, start, result)
    } else {
        let result = ingest_json_spans(&body, &*sink).await;
        into_ingest_response(ZIPKIN_JSON_FORMAT, start, result)
    }
}

async fn zipkin_json_handler(
    Extension(sink): Extension<Arc<dyn SpanSink>>,
    DecompressedBody(body): DecompressedBody,
) -> Response {
    let start = Instant::now();
    let result = ingest_json_spans(&body, &*sink).await;
    into_ingest_response(ZIPKIN_JSON_FORMAT, start, result)
}

fn into_ingest_response(
    format: &'static str,
    start: Instant,
    result: Result<(), TraceIngestError>,
) -> Response {
    TRACE_INGEST_METRICS
        .requests_total
        .with_label_values([format])
        .inc();
    TRACE_INGEST_METRICS
        .request_duration_seconds
        .with_label_values([format, if result.is_err() { "true" } else { "false" }])
        .observe(start.elapsed().as_secs_f64());
    match result {
        Ok(()) => StatusCode::OK.into_response(),
        Err(ingest_error) => {
            TRACE_INGEST_METRICS
                .request_errors_total
                .with_label_values([format])
                .inc();
            debug!(format, error=%ingest_error, "trace ingest request failed");
            let status_code = match &ingest_error {
                TraceIngestError::UnableToReadRequest
                | TraceIngestError::InvalidJaegerTraceFormat
                | TraceIngestError::InvalidJsonTraceFormat
                | TraceIngestError::Conversion(_) => StatusCode::BAD_REQUEST,
                TraceIngestError::Sink(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status_code, ingest_error.to_string()).into_response()
        }
    }
}

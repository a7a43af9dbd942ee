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

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;
use tracegate_trace::{
    ingest_json_spans, Span, SpanKind, SpanSink, TraceIngestError,
};

#[derive(Default)]
struct RecordingSink {
    spans: Mutex<Vec<Span>>,
}

#[async_trait]
impl SpanSink for RecordingSink {
    async fn add_spans(&self, spans: Vec<Span>) -> anyhow::Result<()> {
        self.spans.lock().unwrap().extend(spans);
        Ok(())
    }
}

struct FailingSink;

#[async_trait]
impl SpanSink for FailingSink {
    async fn add_spans(&self, _spans: Vec<Span>) -> anyhow::Result<()> {
        anyhow::bail!("sink unavailable")
    }
}

#[tokio::test]
async fn test_ingest_mixed_v1_and_v2_batch() {
    let body = serde_json::to_vec(&json!([
        {
            "traceId": "abc",
            "id": "def",
            "kind": "CLIENT",
            "tags": {"http.status": "200"},
        },
        {
            "traceId": "1",
            "id": "2",
            "timestamp": 100,
            "duration": 50,
            "annotations": [
                {"timestamp": 100, "value": "cs", "endpoint": {"serviceName": "frontend"}},
                {"timestamp": 110, "value": "sr", "endpoint": {"serviceName": "frontend"}},
                {"timestamp": 140, "value": "ss", "endpoint": {"serviceName": "frontend"}},
                {"timestamp": 150, "value": "cr", "endpoint": {"serviceName": "frontend"}},
            ],
        },
    ]))
    .unwrap();

    let sink = RecordingSink::default();
    ingest_json_spans(&body, &sink).await.unwrap();

    let spans = sink.spans.into_inner().unwrap();
    assert_eq!(spans.len(), 3);

    assert_eq!(spans[0].trace_id, "0000000000000abc");
    assert_eq!(spans[0].kind, Some(SpanKind::Client));

    assert_eq!(spans[1].kind, Some(SpanKind::Client));
    assert_eq!(spans[2].kind, Some(SpanKind::Server));
    assert_eq!(spans[2].shared, Some(true));

    for span in &spans {
        assert!(span.trace_id.len() == 16 || span.trace_id.len() == 32);
        assert_eq!(span.id.len(), 16);
        if let Some(parent_id) = &span.parent_id {
            assert!(parent_id.chars().any(|ch| ch != '0'));
        }
    }
}

#[tokio::test]
async fn test_ingest_surfaces_conversion_errors_after_submitting_valid_spans() {
    let body = serde_json::to_vec(&json!([
        {"traceId": "a1", "id": "b1", "kind": "CLIENT"},
        {
            "traceId": "a2",
            "id": "b2",
            "kind": "CLIENT",
            "binaryAnnotations": [{"key": "sa", "value": true}],
        },
    ]))
    .unwrap();

    let sink = RecordingSink::default();
    let err = ingest_json_spans(&body, &sink).await.unwrap_err();
    assert!(matches!(err, TraceIngestError::Conversion(_)));
    assert_eq!(
        err.to_string(),
        "1 errors encountered, last one was: span cannot have binaryAnnotations with Zipkin V2 \
         fields"
    );

    // The valid span still made it to the sink.
    assert_eq!(sink.spans.into_inner().unwrap().len(), 1);
}

#[tokio::test]
async fn test_ingest_empty_batch_skips_the_sink() {
    let sink = FailingSink;
    ingest_json_spans(b"[]", &sink).await.unwrap();
}

#[tokio::test]
async fn test_sink_error_is_surfaced_unchanged() {
    let body = serde_json::to_vec(&json!([
        {"traceId": "a1", "id": "b1", "kind": "CLIENT"},
    ]))
    .unwrap();
    let err = ingest_json_spans(&body, &FailingSink).await.unwrap_err();
    assert!(matches!(err, TraceIngestError::Sink(_)));
}

#[tokio::test]
async fn test_invalid_json_is_request_fatal() {
    let sink = RecordingSink::default();
    let err = ingest_json_spans(b"not json", &sink).await.unwrap_err();
    assert!(matches!(err, TraceIngestError::InvalidJsonTraceFormat));
    assert!(sink.spans.into_inner().unwrap().is_empty());
}

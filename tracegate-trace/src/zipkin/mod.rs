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

//! Zipkin JSON decoding. The same endpoint accepts v1 and v2 payloads, so
//! every span is sniffed: spans with v2 marker fields take the fast path,
//! everything else goes through the v1 fan-out converter.

mod v1;

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

use crate::errors::{SpanConversionError, TraceErrs, TraceIngestError};
use crate::span::{normalize_parent_span_id, pad_id, Annotation, Endpoint, Span, SpanKind};
use crate::SpanSink;

/// One element of a Zipkin JSON submission, v1 or v2.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InputSpan {
    pub trace_id: String,
    pub id: String,
    pub parent_id: Option<String>,
    pub name: Option<String>,
    pub kind: Option<SpanKind>,
    #[serde(deserialize_with = "micros_opt")]
    pub timestamp: Option<i64>,
    #[serde(deserialize_with = "micros_opt")]
    pub duration: Option<i64>,
    pub debug: Option<bool>,
    pub shared: Option<bool>,
    pub local_endpoint: Option<Endpoint>,
    pub remote_endpoint: Option<Endpoint>,
    pub tags: HashMap<String, String>,
    pub annotations: Vec<InputAnnotation>,
    pub binary_annotations: Vec<InputBinaryAnnotation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InputAnnotation {
    #[serde(deserialize_with = "micros_opt")]
    pub timestamp: Option<i64>,
    pub value: Option<String>,
    pub endpoint: Option<Endpoint>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InputBinaryAnnotation {
    pub key: Option<String>,
    pub value: Option<TagValue>,
    pub endpoint: Option<Endpoint>,
}

/// The typed value of a v1 binary annotation. Variant order matters: serde
/// tries untagged variants top to bottom, and anything that matches none of
/// the wire types is kept around so the conversion can fail just that span.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    Other(JsonValue),
}

/// Zipkin clients routinely emit microsecond fields as JSON floats.
fn micros_opt<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where D: Deserializer<'de> {
    let micros = Option::<f64>::deserialize(deserializer)?;
    Ok(micros.map(|micros| micros as i64))
}

impl InputSpan {
    /// The presence of the `kind` field, tags, or local/remote endpoints is a
    /// dead giveaway that this is a Zipkin v2 span, so shortcut the whole
    /// conversion process. A span without any of those markers may still be
    /// v2, since none of them is required to be there.
    pub fn is_definitely_zipkin_v2(&self) -> bool {
        self.kind.is_some()
            || !self.tags.is_empty()
            || self.local_endpoint.is_some()
            || self.remote_endpoint.is_some()
    }

    /// Fast path: the span already is in the canonical shape, lift it over.
    pub fn from_zipkin_v2(self) -> Result<Span, SpanConversionError> {
        if !self.binary_annotations.is_empty() {
            return Err(SpanConversionError::BinaryAnnotationsWithV2Fields);
        }
        let annotations = self
            .annotations
            .iter()
            .map(|annotation| Annotation {
                timestamp: annotation.timestamp,
                value: annotation.value.clone(),
            })
            .collect();
        Ok(Span {
            trace_id: pad_id(self.trace_id),
            id: pad_id(self.id),
            parent_id: normalize_parent_span_id(self.parent_id).map(pad_id),
            name: self.name,
            kind: self.kind,
            timestamp: self.timestamp,
            duration: self.duration,
            debug: self.debug,
            shared: self.shared,
            local_endpoint: self.local_endpoint,
            remote_endpoint: self.remote_endpoint,
            annotations,
            tags: self.tags,
        })
    }
}

pub fn parse_input_spans(body: &[u8]) -> Result<Vec<InputSpan>, TraceIngestError> {
    serde_json::from_slice(body).map_err(|_| TraceIngestError::InvalidJsonTraceFormat)
}

/// Converts a decoded submission into canonical spans. Conversion errors are
/// aggregated per span so one bad span cannot reject the whole batch.
pub fn decode_json_spans(input_spans: Vec<InputSpan>) -> (Vec<Span>, TraceErrs) {
    let mut spans = Vec::with_capacity(input_spans.len());
    let mut conversion_errs = TraceErrs::default();

    for input_span in input_spans {
        if input_span.is_definitely_zipkin_v2() {
            match input_span.from_zipkin_v2() {
                Ok(span) => spans.push(span),
                Err(err) => conversion_errs.append(err),
            }
        } else {
            // A single v1 span can fan out into multiple canonical spans.
            match input_span.from_zipkin_v1() {
                Ok(derived) => spans.extend(derived),
                Err(err) => conversion_errs.append(err),
            }
        }
    }
    (spans, conversion_errs)
}

/// Decodes a Zipkin JSON request body and pushes the converted spans into
/// the sink.
pub async fn ingest_json_spans(
    body: &[u8],
    sink: &dyn SpanSink,
) -> Result<(), TraceIngestError> {
    let input_spans = parse_input_spans(body)?;
    if input_spans.is_empty() {
        return Ok(());
    }
    let (spans, conversion_errs) = decode_json_spans(input_spans);
    let sink_result = sink.add_spans(spans).await;
    conversion_errs.into_result(sink_result)
}

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

//! Jaeger-model output for the SAPM transport: Zipkin submissions are
//! converted into `api_v2` spans and bucketed into one batch per trace.

use std::collections::{BTreeMap, HashMap};

use itertools::Itertools;
use prost_types::{Duration as WellKnownDuration, Timestamp as WellKnownTimestamp};
use tracing::debug;
use tracegate_proto::jaeger::api_v2::{
    Batch as JaegerBatch, KeyValue as JaegerKeyValue, Log as JaegerLog, Process as JaegerProcess,
    Span as JaegerSpan, SpanRef as JaegerSpanRef, SpanRefType as JaegerSpanRefType, ValueType,
};
use tracegate_proto::sapm::PostSpansRequest;

use crate::errors::{SpanConversionError, TraceErrs, TraceIngestError};
use crate::span::{normalize_parent_span_id, Annotation, Endpoint, Span, SpanKind};
use crate::span_id::SpanId;
use crate::trace_id::TraceId;
use crate::zipkin::{parse_input_spans, InputAnnotation, InputSpan};

/// The debug bit of the Jaeger span flags.
pub const DEBUG_FLAG: u32 = 2;

/// Tag keys that describe the reporting process rather than one operation.
/// Jaeger clients attach these to the `Process`, so keep them there.
const PROCESS_TAG_KEYS: [&str; 3] = ["hostname", "ip", "jaeger.version"];

impl InputSpan {
    /// Fast path to the Jaeger model: the span already carries Zipkin v2
    /// fields and maps onto one `api_v2` span.
    pub fn jaeger_from_zipkin_v2(&self) -> Result<JaegerSpan, SpanConversionError> {
        if !self.binary_annotations.is_empty() {
            return Err(SpanConversionError::BinaryAnnotationsWithV2Fields);
        }
        let span_id = SpanId::from_hex(&self.id)?;
        let trace_id = TraceId::from_hex(&self.trace_id)?;

        let mut span = JaegerSpan {
            trace_id: trace_id.to_vec(),
            span_id: span_id.to_vec(),
            operation_name: self.name.clone().unwrap_or_default(),
            ..Default::default()
        };
        if let Some(duration) = self.duration {
            span.duration = Some(to_well_known_duration(duration));
        }
        if let Some(timestamp) = self.timestamp {
            span.start_time = Some(to_well_known_timestamp(timestamp));
        }
        if self.debug == Some(true) {
            span.flags |= DEBUG_FLAG;
        }

        let mut process = JaegerProcess::default();
        let (tags, process_tags) =
            split_jaeger_tags(&self.tags, self.remote_endpoint.as_ref(), self.kind);
        span.tags = tags;
        process.tags = process_tags;
        fill_local_endpoint(&mut process, self.local_endpoint.as_ref());
        span.process = Some(process);

        if let Some(parent_id) = normalize_parent_span_id(self.parent_id.clone()) {
            // Only add the parent reference when the parent ID parses.
            if let Ok(parent_span_id) = SpanId::from_hex(&parent_id) {
                span.references.push(JaegerSpanRef {
                    trace_id: trace_id.to_vec(),
                    span_id: parent_span_id.to_vec(),
                    ref_type: JaegerSpanRefType::ChildOf as i32,
                });
            }
        }
        span.logs = input_annotations_to_jaeger_logs(&self.annotations);
        Ok(span)
    }
}

/// Converts a canonical span into the Jaeger model. Used for the Zipkin v1
/// path, whose fan-out yields canonical spans first.
pub fn span_to_jaeger(span: &Span) -> Result<JaegerSpan, SpanConversionError> {
    let span_id = SpanId::from_hex(&span.id)?;
    let trace_id = TraceId::from_hex(&span.trace_id)?;

    let mut jaeger_span = JaegerSpan {
        trace_id: trace_id.to_vec(),
        span_id: span_id.to_vec(),
        operation_name: span.name.clone().unwrap_or_default(),
        ..Default::default()
    };
    if let Some(timestamp) = span.timestamp {
        jaeger_span.start_time = Some(to_well_known_timestamp(timestamp));
    }
    if let Some(duration) = span.duration {
        jaeger_span.duration = Some(to_well_known_duration(duration));
    }
    if span.debug == Some(true) {
        jaeger_span.flags |= DEBUG_FLAG;
    }

    let mut process = JaegerProcess::default();
    let (tags, process_tags) = split_jaeger_tags(&span.tags, span.remote_endpoint.as_ref(), span.kind);
    jaeger_span.tags = tags;
    process.tags = process_tags;
    fill_local_endpoint(&mut process, span.local_endpoint.as_ref());
    jaeger_span.process = Some(process);

    if let Some(parent_id) = &span.parent_id {
        if let Ok(parent_span_id) = SpanId::from_hex(parent_id) {
            jaeger_span.references.push(JaegerSpanRef {
                trace_id: trace_id.to_vec(),
                span_id: parent_span_id.to_vec(),
                ref_type: JaegerSpanRefType::ChildOf as i32,
            });
        }
    }
    jaeger_span.logs = annotations_to_jaeger_logs(&span.annotations);
    Ok(jaeger_span)
}

/// Buckets Jaeger-model spans into one batch per trace ID.
#[derive(Debug, Default)]
pub struct SpanBatcher {
    pub buckets: HashMap<[u8; 32], JaegerBatch>,
}

impl SpanBatcher {
    pub fn add(&mut self, span: JaegerSpan) {
        let key = Self::batch_key(&span.trace_id);
        self.buckets.entry(key).or_default().spans.push(span);
    }

    fn batch_key(trace_id: &[u8]) -> [u8; 32] {
        let mut key = [0u8; 32];
        let id_len = trace_id.len().min(key.len());
        key[..id_len].copy_from_slice(&trace_id[..id_len]);
        key
    }
}

/// Parses a Zipkin JSON request into Jaeger-model batches keyed by trace ID,
/// along with the per-span conversion errors.
pub fn jaeger_batches_from_json(
    body: &[u8],
) -> Result<(HashMap<[u8; 32], JaegerBatch>, TraceErrs), TraceIngestError> {
    let input_spans = parse_input_spans(body)?;

    let mut batcher = SpanBatcher::default();
    // Don't let an error converting one span reject other valid spans in the
    // same request.
    let mut conversion_errs = TraceErrs::default();
    for input_span in input_spans {
        if input_span.is_definitely_zipkin_v2() {
            match input_span.jaeger_from_zipkin_v2() {
                Ok(span) => batcher.add(span),
                Err(err) => conversion_errs.append(err),
            }
        } else {
            match input_span.from_zipkin_v1() {
                Ok(derived) => {
                    // Zipkin v1 spans can map to multiple spans in Zipkin v2.
                    for span in &derived {
                        match span_to_jaeger(span) {
                            Ok(jaeger_span) => batcher.add(jaeger_span),
                            Err(err) => conversion_errs.append(err),
                        }
                    }
                }
                Err(err) => conversion_errs.append(err),
            }
        }
    }
    Ok((batcher.buckets, conversion_errs))
}

/// Parses a Zipkin JSON request into a SAPM request. Unlike the canonical
/// path, a conversion error rejects the submission wholesale: the transport
/// has no channel for partial acceptance.
pub fn sapm_from_json(body: &[u8]) -> Result<PostSpansRequest, TraceIngestError> {
    let (buckets, conversion_errs) = jaeger_batches_from_json(body)?;
    if !conversion_errs.is_empty() {
        return Err(conversion_errs.into());
    }
    let batches = buckets.into_values().collect();
    Ok(PostSpansRequest { batches })
}

pub(crate) fn to_well_known_timestamp(timestamp_micros: i64) -> WellKnownTimestamp {
    let seconds = timestamp_micros / 1_000_000;
    let nanos = (timestamp_micros % 1_000_000) as i32 * 1_000;
    WellKnownTimestamp { seconds, nanos }
}

pub(crate) fn to_well_known_duration(duration_micros: i64) -> WellKnownDuration {
    let seconds = duration_micros / 1_000_000;
    let nanos = (duration_micros % 1_000_000) as i32 * 1_000;
    WellKnownDuration { seconds, nanos }
}

/// Splits flat Zipkin tags into Jaeger span tags and process tags, and
/// materializes the remote endpoint and kind as the `peer.*` and `span.kind`
/// tags Jaeger clients would have emitted.
fn split_jaeger_tags(
    tags: &HashMap<String, String>,
    remote_endpoint: Option<&Endpoint>,
    kind: Option<SpanKind>,
) -> (Vec<JaegerKeyValue>, Vec<JaegerKeyValue>) {
    let mut span_tags = Vec::with_capacity(tags.len() + 5);
    let mut process_tags = Vec::new();
    // Sorted for deterministic output.
    for (key, value) in tags.iter().sorted() {
        if PROCESS_TAG_KEYS.contains(&key.as_str()) {
            process_tags.push(string_key_value(key, value));
        } else {
            span_tags.push(string_key_value(key, value));
        }
    }
    if let Some(remote_endpoint) = remote_endpoint {
        if let Some(service_name) = &remote_endpoint.service_name {
            span_tags.push(string_key_value("peer.service", service_name));
        }
        if let Some(ipv4) = &remote_endpoint.ipv4 {
            span_tags.push(string_key_value("peer.ipv4", ipv4));
        }
        if let Some(ipv6) = &remote_endpoint.ipv6 {
            span_tags.push(string_key_value("peer.ipv6", ipv6));
        }
        if let Some(port) = remote_endpoint.port {
            span_tags.push(JaegerKeyValue {
                key: "peer.port".to_string(),
                v_type: ValueType::Int64 as i32,
                v_int64: i64::from(port),
                ..Default::default()
            });
        }
    }
    if let Some(kind) = kind {
        span_tags.push(string_key_value("span.kind", kind.as_jaeger_tag()));
    }
    (span_tags, process_tags)
}

fn fill_local_endpoint(process: &mut JaegerProcess, local_endpoint: Option<&Endpoint>) {
    if let Some(endpoint) = local_endpoint {
        if let Some(service_name) = &endpoint.service_name {
            process.service_name = service_name.clone();
        }
        if let Some(ipv4) = &endpoint.ipv4 {
            process.tags.push(string_key_value("ip", ipv4));
        }
    }
}

/// Converts v2 annotations into Jaeger logs. An annotation whose value is
/// not a JSON object of string fields loses the log line, not the span:
/// better to miss a log line than the entire operation.
fn input_annotations_to_jaeger_logs(annotations: &[InputAnnotation]) -> Vec<JaegerLog> {
    let mut logs = Vec::with_capacity(annotations.len());
    for annotation in annotations {
        let Some(value) = &annotation.value else {
            continue;
        };
        let Ok(fields) = serde_json::from_str::<BTreeMap<String, String>>(value) else {
            debug!(value = %value, "dropping annotation that does not parse as log fields");
            continue;
        };
        logs.push(JaegerLog {
            timestamp: annotation.timestamp.map(to_well_known_timestamp),
            fields: fields
                .iter()
                .map(|(key, value)| string_key_value(key, value))
                .collect(),
        });
    }
    logs
}

/// Converts canonical annotations into Jaeger logs. Values that are not JSON
/// objects are plain v1 event labels and map to a single `event` field.
fn annotations_to_jaeger_logs(annotations: &[Annotation]) -> Vec<JaegerLog> {
    let mut logs = Vec::with_capacity(annotations.len());
    for annotation in annotations {
        let Some(value) = &annotation.value else {
            continue;
        };
        let fields = match serde_json::from_str::<BTreeMap<String, String>>(value) {
            Ok(fields) => fields
                .iter()
                .map(|(key, value)| string_key_value(key, value))
                .collect(),
            Err(_) => vec![string_key_value("event", value)],
        };
        logs.push(JaegerLog {
            timestamp: annotation.timestamp.map(to_well_known_timestamp),
            fields,
        });
    }
    logs
}

fn string_key_value(key: &str, value: &str) -> JaegerKeyValue {
    JaegerKeyValue {
        key: key.to_string(),
        v_type: ValueType::String as i32,
        v_str: value.to_string(),
        ..Default::default()
    }
}

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

//! Jaeger Thrift decoding: collector submissions carry one Thrift-binary
//! `Batch` whose spans are converted either into canonical spans or into the
//! Jaeger `api_v2` model for SAPM transport.

use std::collections::{BTreeMap, HashMap};
use std::net::Ipv4Addr;

use tracegate_proto::jaeger::api_v2::{
    Batch as JaegerBatch, KeyValue as JaegerKeyValue, Log as JaegerLog, Process as JaegerProcess,
    Span as JaegerSpan, SpanRef as JaegerSpanRef, SpanRefType as JaegerSpanRefType, ValueType,
};
use tracegate_proto::jaeger::thrift::{
    Batch as ThriftBatch, Log as ThriftLog, Process as ThriftProcess, Span as ThriftSpan,
    SpanRef as ThriftSpanRef, SpanRefType as ThriftSpanRefType, Tag as ThriftTag, TagType,
};
use tracegate_proto::sapm::PostSpansRequest;

use crate::errors::TraceIngestError;
use crate::sapm::{to_well_known_duration, to_well_known_timestamp};
use crate::span::{pad_id, Annotation, Endpoint, Span, SpanKind};
use crate::SpanSink;

const PEER_HOST_IPV4: &str = "peer.ipv4";
const PEER_HOST_IPV6: &str = "peer.ipv6";
const PEER_PORT: &str = "peer.port";
const PEER_SERVICE: &str = "peer.service";
const SPAN_KIND: &str = "span.kind";

pub fn decode_jaeger_thrift_batch(body: &[u8]) -> Result<ThriftBatch, TraceIngestError> {
    ThriftBatch::from_thrift_bytes(body).map_err(|_| TraceIngestError::InvalidJaegerTraceFormat)
}

/// Decodes a Jaeger Thrift request body and pushes the converted spans into
/// the sink.
pub async fn ingest_jaeger_thrift_spans(
    body: &[u8],
    sink: &dyn SpanSink,
) -> Result<(), TraceIngestError> {
    let batch = decode_jaeger_thrift_batch(body)?;
    let spans = convert_jaeger_batch(batch);
    sink.add_spans(spans).await.map_err(TraceIngestError::Sink)
}

/// Decodes a Jaeger Thrift request body into a SAPM request.
pub fn sapm_from_jaeger_thrift(body: &[u8]) -> Result<PostSpansRequest, TraceIngestError> {
    let batch = decode_jaeger_thrift_batch(body)?;
    Ok(PostSpansRequest {
        batches: vec![thrift_batch_to_jaeger(batch)],
    })
}

pub fn convert_jaeger_batch(batch: ThriftBatch) -> Vec<Span> {
    batch
        .spans
        .into_iter()
        .map(|span| convert_jaeger_span(span, &batch.process))
        .collect()
}

fn convert_jaeger_span(tspan: ThriftSpan, tprocess: &ThriftProcess) -> Span {
    let parent_id = if tspan.parent_span_id != 0 {
        Some(pad_id(format!("{:x}", tspan.parent_span_id as u64)))
    } else {
        preferred_parent_ref(tspan.references.as_deref().unwrap_or_default())
            .map(|ref_span_id| pad_id(format!("{:x}", ref_span_id as u64)))
    };

    let mut local_endpoint = Endpoint {
        service_name: Some(tprocess.service_name.clone()),
        ..Default::default()
    };

    let debug = (tspan.flags & 2 != 0).then_some(true);

    let (kind, remote_endpoint, mut tags) =
        process_jaeger_tags(tspan.tags.as_deref().unwrap_or_default());

    for tag in tprocess.tags.as_deref().unwrap_or_default() {
        if tag.key == "ip" && tag.v_str.is_some() {
            local_endpoint.ipv4 = tag.v_str.clone();
        } else {
            tags.insert(tag.key.clone(), tag_value_to_string(tag));
        }
    }

    let mut trace_id = pad_id(format!("{:x}", tspan.trace_id_low as u64));
    if tspan.trace_id_high != 0 {
        trace_id = pad_id(format!("{:x}{trace_id}", tspan.trace_id_high as u64));
    }

    Span {
        trace_id,
        id: pad_id(format!("{:x}", tspan.span_id as u64)),
        parent_id,
        name: Some(tspan.operation_name),
        kind,
        timestamp: Some(tspan.start_time),
        duration: Some(tspan.duration),
        debug,
        shared: None,
        local_endpoint: Some(local_endpoint),
        remote_endpoint,
        annotations: convert_jaeger_logs(tspan.logs.unwrap_or_default()),
        tags,
    }
}

/// Picks the reference acting as the parent: the first `CHILD_OF` reference
/// if any, otherwise the first reference.
fn preferred_parent_ref(references: &[ThriftSpanRef]) -> Option<i64> {
    let mut preferred = references.first()?;
    for reference in references {
        if reference.ref_type == ThriftSpanRefType::ChildOf
            && preferred.ref_type != ThriftSpanRefType::ChildOf
        {
            preferred = reference;
            break;
        }
    }
    Some(preferred.span_id)
}

fn convert_jaeger_logs(logs: Vec<ThriftLog>) -> Vec<Annotation> {
    logs.into_iter()
        .map(|log| Annotation {
            timestamp: Some(log.timestamp),
            value: materialize_with_json(&log.fields),
        })
        .collect()
}

/// Renders log fields as a JSON object, or just the value of the `event`
/// field when it is the only one.
fn materialize_with_json(log_fields: &[ThriftTag]) -> Option<String> {
    let mut fields = BTreeMap::new();
    for field in log_fields {
        fields.insert(field.key.clone(), tag_value_to_string(field));
    }
    if fields.len() == 1 {
        if let Some(event) = fields.get("event") {
            return Some(event.clone());
        }
    }
    serde_json::to_string(&fields).ok()
}

/// Handles the special tags that map to the kind and remote endpoint fields,
/// and collects the rest into the Zipkin tag map.
fn process_jaeger_tags(
    tags: &[ThriftTag],
) -> (Option<SpanKind>, Option<Endpoint>, HashMap<String, String>) {
    let mut kind = None;
    let mut remote_endpoint: Option<Endpoint> = None;
    let mut converted_tags = HashMap::with_capacity(tags.len());

    for tag in tags {
        match tag.key.as_str() {
            PEER_HOST_IPV4 => {
                let ipv4 = convert_peer_ipv4(tag);
                if ipv4.is_empty() {
                    continue;
                }
                remote_endpoint.get_or_insert_with(Endpoint::default).ipv4 = Some(ipv4);
            }
            // An IPv6 host is always a string.
            PEER_HOST_IPV6 => {
                if let Some(ipv6) = &tag.v_str {
                    remote_endpoint.get_or_insert_with(Endpoint::default).ipv6 =
                        Some(ipv6.clone());
                }
            }
            PEER_PORT => {
                let port = convert_peer_port(tag);
                if port == 0 {
                    continue;
                }
                remote_endpoint.get_or_insert_with(Endpoint::default).port = Some(port);
            }
            PEER_SERVICE => {
                remote_endpoint
                    .get_or_insert_with(Endpoint::default)
                    .service_name = tag.v_str.clone();
            }
            SPAN_KIND => {
                kind = tag.v_str.as_deref().and_then(SpanKind::from_jaeger_tag);
            }
            _ => {
                let value = tag_value_to_string(tag);
                if !value.is_empty() {
                    converted_tags.insert(tag.key.clone(), value);
                }
            }
        }
    }
    (kind, remote_endpoint, converted_tags)
}

fn convert_peer_ipv4(tag: &ThriftTag) -> String {
    match tag.v_type {
        TagType::String => tag
            .v_str
            .as_deref()
            .and_then(|raw_ip| raw_ip.parse::<Ipv4Addr>().ok())
            .map(|ipv4| ipv4.to_string())
            .unwrap_or_default(),
        TagType::Long => {
            let octets = (tag.v_long.unwrap_or(0) as u32).to_be_bytes();
            Ipv4Addr::from(octets).to_string()
        }
        _ => String::new(),
    }
}

fn convert_peer_port(tag: &ThriftTag) -> i32 {
    match tag.v_type {
        TagType::String => tag
            .v_str
            .as_deref()
            .and_then(|raw_port| raw_port.parse::<u16>().ok())
            .map(i32::from)
            .unwrap_or(0),
        TagType::Long => tag.v_long.unwrap_or(0) as i32,
        _ => 0,
    }
}

/// Coerces a Thrift tag value to a string, the only value type the canonical
/// tag map carries.
pub fn tag_value_to_string(tag: &ThriftTag) -> String {
    match tag.v_type {
        TagType::String => tag.v_str.clone().unwrap_or_default(),
        TagType::Double => tag.v_double.unwrap_or(0.0).to_string(),
        TagType::Bool => tag.v_bool.unwrap_or(false).to_string(),
        TagType::Long => tag.v_long.unwrap_or(0).to_string(),
        TagType::Binary => String::new(),
    }
}

/// Lifts a Thrift batch into the `api_v2` model for SAPM transport.
pub fn thrift_batch_to_jaeger(batch: ThriftBatch) -> JaegerBatch {
    let process = JaegerProcess {
        service_name: batch.process.service_name.clone(),
        tags: batch
            .process
            .tags
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(thrift_tag_to_key_value)
            .collect(),
    };
    let spans = batch
        .spans
        .into_iter()
        .map(|span| thrift_span_to_jaeger(span, &process))
        .collect();
    JaegerBatch {
        spans,
        process: Some(process),
    }
}

fn thrift_span_to_jaeger(tspan: ThriftSpan, process: &JaegerProcess) -> JaegerSpan {
    let references = tspan
        .references
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|reference| JaegerSpanRef {
            trace_id: trace_id_bytes(reference.trace_id_high, reference.trace_id_low),
            span_id: (reference.span_id as u64).to_be_bytes().to_vec(),
            ref_type: match reference.ref_type {
                ThriftSpanRefType::ChildOf => JaegerSpanRefType::ChildOf as i32,
                ThriftSpanRefType::FollowsFrom => JaegerSpanRefType::FollowsFrom as i32,
            },
        })
        .collect();
    let logs = tspan
        .logs
        .unwrap_or_default()
        .into_iter()
        .map(|log| JaegerLog {
            timestamp: Some(to_well_known_timestamp(log.timestamp)),
            fields: log.fields.iter().map(thrift_tag_to_key_value).collect(),
        })
        .collect();
    JaegerSpan {
        trace_id: trace_id_bytes(tspan.trace_id_high, tspan.trace_id_low),
        span_id: (tspan.span_id as u64).to_be_bytes().to_vec(),
        operation_name: tspan.operation_name,
        references,
        flags: tspan.flags as u32,
        start_time: Some(to_well_known_timestamp(tspan.start_time)),
        duration: Some(to_well_known_duration(tspan.duration)),
        tags: tspan
            .tags
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(thrift_tag_to_key_value)
            .collect(),
        logs,
        process: Some(process.clone()),
        ..Default::default()
    }
}

fn trace_id_bytes(trace_id_high: i64, trace_id_low: i64) -> Vec<u8> {
    let mut trace_id = Vec::with_capacity(16);
    trace_id.extend_from_slice(&(trace_id_high as u64).to_be_bytes());
    trace_id.extend_from_slice(&(trace_id_low as u64).to_be_bytes());
    trace_id
}

fn thrift_tag_to_key_value(tag: &ThriftTag) -> JaegerKeyValue {
    let mut key_value = JaegerKeyValue {
        key: tag.key.clone(),
        ..Default::default()
    };
    match tag.v_type {
        TagType::String => {
            key_value.v_type = ValueType::String as i32;
            key_value.v_str = tag.v_str.clone().unwrap_or_default();
        }
        TagType::Double => {
            key_value.v_type = ValueType::Float64 as i32;
            key_value.v_float64 = tag.v_double.unwrap_or(0.0);
        }
        TagType::Bool => {
            key_value.v_type = ValueType::Bool as i32;
            key_value.v_bool = tag.v_bool.unwrap_or(false);
        }
        TagType::Long => {
            key_value.v_type = ValueType::Int64 as i32;
            key_value.v_int64 = tag.v_long.unwrap_or(0);
        }
        TagType::Binary => {
            key_value.v_type = ValueType::Binary as i32;
            key_value.v_binary = tag.v_binary.clone().unwrap_or_default();
        }
    }
    key_value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_tag(key: &str, value: &str) -> ThriftTag {
        ThriftTag {
            key: key.to_string(),
            v_type: TagType::String,
            v_str: Some(value.to_string()),
            ..Default::default()
        }
    }

    fn long_tag(key: &str, value: i64) -> ThriftTag {
        ThriftTag {
            key: key.to_string(),
            v_type: TagType::Long,
            v_long: Some(value),
            ..Default::default()
        }
    }

    #[test]
    fn test_convert_jaeger_span_with_process_ip() {
        let batch = ThriftBatch {
            process: ThriftProcess {
                service_name: "svc".to_string(),
                tags: Some(vec![
                    string_tag("ip", "10.0.0.1"),
                    string_tag("jaeger.version", "go-2.30"),
                ]),
            },
            spans: vec![ThriftSpan {
                trace_id_low: 0x10,
                span_id: 0x1,
                operation_name: "op".to_string(),
                flags: 2,
                start_time: 1_000,
                duration: 100,
                ..Default::default()
            }],
        };
        let spans = convert_jaeger_batch(batch);
        assert_eq!(spans.len(), 1);

        let span = &spans[0];
        assert_eq!(span.id, "0000000000000001");
        assert_eq!(span.trace_id, "0000000000000010");
        assert_eq!(span.debug, Some(true));
        assert_eq!(span.timestamp, Some(1_000));
        assert_eq!(span.duration, Some(100));

        let local_endpoint = span.local_endpoint.as_ref().unwrap();
        assert_eq!(local_endpoint.service_name.as_deref(), Some("svc"));
        assert_eq!(local_endpoint.ipv4.as_deref(), Some("10.0.0.1"));
        assert_eq!(span.tags.get("jaeger.version").unwrap(), "go-2.30");
    }

    #[test]
    fn test_trace_id_width_follows_trace_id_high() {
        let low_only = ThriftSpan {
            trace_id_low: 0xabc,
            span_id: 1,
            ..Default::default()
        };
        let span = convert_jaeger_span(low_only, &ThriftProcess::default());
        assert_eq!(span.trace_id.len(), 16);
        assert_eq!(span.trace_id, "0000000000000abc");

        let with_high = ThriftSpan {
            trace_id_low: 0xabc,
            trace_id_high: 0x1,
            span_id: 1,
            ..Default::default()
        };
        let span = convert_jaeger_span(with_high, &ThriftProcess::default());
        assert_eq!(span.trace_id.len(), 32);
        assert_eq!(span.trace_id, "00000000000000010000000000000abc");
    }

    #[test]
    fn test_parent_comes_from_parent_span_id_first() {
        let tspan = ThriftSpan {
            trace_id_low: 1,
            span_id: 2,
            parent_span_id: 3,
            references: Some(vec![ThriftSpanRef {
                ref_type: ThriftSpanRefType::FollowsFrom,
                span_id: 4,
                ..Default::default()
            }]),
            ..Default::default()
        };
        let span = convert_jaeger_span(tspan, &ThriftProcess::default());
        assert_eq!(span.parent_id.as_deref(), Some("0000000000000003"));
    }

    #[test]
    fn test_parent_prefers_child_of_reference() {
        let tspan = ThriftSpan {
            trace_id_low: 1,
            span_id: 2,
            references: Some(vec![
                ThriftSpanRef {
                    ref_type: ThriftSpanRefType::FollowsFrom,
                    span_id: 4,
                    ..Default::default()
                },
                ThriftSpanRef {
                    ref_type: ThriftSpanRefType::ChildOf,
                    span_id: 5,
                    ..Default::default()
                },
            ]),
            ..Default::default()
        };
        let span = convert_jaeger_span(tspan, &ThriftProcess::default());
        assert_eq!(span.parent_id.as_deref(), Some("0000000000000005"));
    }

    #[test]
    fn test_parent_falls_back_to_first_reference() {
        let tspan = ThriftSpan {
            trace_id_low: 1,
            span_id: 2,
            references: Some(vec![
                ThriftSpanRef {
                    ref_type: ThriftSpanRefType::FollowsFrom,
                    span_id: 4,
                    ..Default::default()
                },
                ThriftSpanRef {
                    ref_type: ThriftSpanRefType::FollowsFrom,
                    span_id: 5,
                    ..Default::default()
                },
            ]),
            ..Default::default()
        };
        let span = convert_jaeger_span(tspan, &ThriftProcess::default());
        assert_eq!(span.parent_id.as_deref(), Some("0000000000000004"));
    }

    #[test]
    fn test_peer_tags_become_the_remote_endpoint() {
        let tspan = ThriftSpan {
            trace_id_low: 1,
            span_id: 2,
            tags: Some(vec![
                string_tag("peer.service", "backend"),
                string_tag("peer.ipv4", "192.168.0.1"),
                string_tag("peer.ipv6", "::1"),
                long_tag("peer.port", 9000),
                string_tag("span.kind", "client"),
                string_tag("http.path", "/api"),
            ]),
            ..Default::default()
        };
        let span = convert_jaeger_span(tspan, &ThriftProcess::default());
        assert_eq!(span.kind, Some(SpanKind::Client));

        let remote_endpoint = span.remote_endpoint.as_ref().unwrap();
        assert_eq!(remote_endpoint.service_name.as_deref(), Some("backend"));
        assert_eq!(remote_endpoint.ipv4.as_deref(), Some("192.168.0.1"));
        assert_eq!(remote_endpoint.ipv6.as_deref(), Some("::1"));
        assert_eq!(remote_endpoint.port, Some(9000));

        assert_eq!(span.tags.len(), 1);
        assert_eq!(span.tags.get("http.path").unwrap(), "/api");
    }

    #[test]
    fn test_peer_ipv4_from_long_tag() {
        let tag = long_tag("peer.ipv4", 0x0a000001);
        assert_eq!(convert_peer_ipv4(&tag), "10.0.0.1");

        let tag = string_tag("peer.ipv4", "not an ip");
        assert_eq!(convert_peer_ipv4(&tag), "");
    }

    #[test]
    fn test_peer_port_parsing() {
        assert_eq!(convert_peer_port(&string_tag("peer.port", "9000")), 9000);
        assert_eq!(convert_peer_port(&string_tag("peer.port", "70000")), 0);
        assert_eq!(convert_peer_port(&long_tag("peer.port", 9000)), 9000);
    }

    #[test]
    fn test_logs_become_annotations() {
        let tspan = ThriftSpan {
            trace_id_low: 1,
            span_id: 2,
            logs: Some(vec![
                ThriftLog {
                    timestamp: 10,
                    fields: vec![string_tag("event", "cache miss")],
                },
                ThriftLog {
                    timestamp: 20,
                    fields: vec![
                        string_tag("event", "retry"),
                        long_tag("attempt", 2),
                    ],
                },
            ]),
            ..Default::default()
        };
        let span = convert_jaeger_span(tspan, &ThriftProcess::default());
        assert_eq!(
            span.annotations,
            vec![
                Annotation {
                    timestamp: Some(10),
                    value: Some("cache miss".to_string()),
                },
                Annotation {
                    timestamp: Some(20),
                    value: Some(r#"{"attempt":"2","event":"retry"}"#.to_string()),
                },
            ]
        );
    }

    #[test]
    fn test_tag_value_to_string() {
        assert_eq!(tag_value_to_string(&string_tag("k", "v")), "v");
        assert_eq!(tag_value_to_string(&long_tag("k", -3)), "-3");
        let double_tag = ThriftTag {
            key: "k".to_string(),
            v_type: TagType::Double,
            v_double: Some(0.25),
            ..Default::default()
        };
        assert_eq!(tag_value_to_string(&double_tag), "0.25");
        let bool_tag = ThriftTag {
            key: "k".to_string(),
            v_type: TagType::Bool,
            v_bool: Some(true),
            ..Default::default()
        };
        assert_eq!(tag_value_to_string(&bool_tag), "true");
        let binary_tag = ThriftTag {
            key: "k".to_string(),
            v_type: TagType::Binary,
            v_binary: Some(vec![1, 2, 3]),
            ..Default::default()
        };
        assert_eq!(tag_value_to_string(&binary_tag), "");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_jaeger_thrift_batch(&[0xff, 0x00, 0x13, 0x37]).unwrap_err();
        assert!(matches!(err, TraceIngestError::InvalidJaegerTraceFormat));
    }

    #[test]
    fn test_decode_thrift_binary_batch() {
        // A `Batch { process: Process { service_name: "svc" }, spans: [Span
        // { trace_id_low: 1, span_id: 2, operation_name: "op", flags: 2 }] }`
        // hand-encoded with the Thrift binary protocol.
        let mut payload: Vec<u8> = Vec::new();
        // field 1: struct Process
        payload.extend_from_slice(&[0x0c, 0x00, 0x01]);
        // Process field 1: string "svc"
        payload.extend_from_slice(&[0x0b, 0x00, 0x01]);
        payload.extend_from_slice(&3i32.to_be_bytes());
        payload.extend_from_slice(b"svc");
        // Process stop
        payload.push(0x00);
        // field 2: list<Span>, 1 element of type struct
        payload.extend_from_slice(&[0x0f, 0x00, 0x02]);
        payload.push(0x0c);
        payload.extend_from_slice(&1i32.to_be_bytes());
        // Span field 1: i64 trace_id_low = 1
        payload.extend_from_slice(&[0x0a, 0x00, 0x01]);
        payload.extend_from_slice(&1i64.to_be_bytes());
        // Span field 3: i64 span_id = 2
        payload.extend_from_slice(&[0x0a, 0x00, 0x03]);
        payload.extend_from_slice(&2i64.to_be_bytes());
        // Span field 5: string operation_name = "op"
        payload.extend_from_slice(&[0x0b, 0x00, 0x05]);
        payload.extend_from_slice(&2i32.to_be_bytes());
        payload.extend_from_slice(b"op");
        // Span field 7: i32 flags = 2
        payload.extend_from_slice(&[0x08, 0x00, 0x07]);
        payload.extend_from_slice(&2i32.to_be_bytes());
        // Span stop, Batch stop
        payload.push(0x00);
        payload.push(0x00);

        let batch = decode_jaeger_thrift_batch(&payload).unwrap();
        assert_eq!(batch.process.service_name, "svc");
        assert_eq!(batch.spans.len(), 1);
        assert_eq!(batch.spans[0].trace_id_low, 1);
        assert_eq!(batch.spans[0].span_id, 2);
        assert_eq!(batch.spans[0].operation_name, "op");
        assert_eq!(batch.spans[0].flags, 2);

        let spans = convert_jaeger_batch(batch);
        assert_eq!(spans[0].id, "0000000000000002");
        assert_eq!(spans[0].debug, Some(true));
        assert_eq!(
            spans[0].local_endpoint.as_ref().unwrap().service_name.as_deref(),
            Some("svc")
        );
    }

    #[test]
    fn test_thrift_batch_to_jaeger() {
        let batch = ThriftBatch {
            process: ThriftProcess {
                service_name: "svc".to_string(),
                tags: Some(vec![string_tag("hostname", "host-1")]),
            },
            spans: vec![ThriftSpan {
                trace_id_low: 2,
                trace_id_high: 1,
                span_id: 3,
                parent_span_id: 0,
                operation_name: "op".to_string(),
                references: Some(vec![ThriftSpanRef {
                    ref_type: ThriftSpanRefType::ChildOf,
                    trace_id_low: 2,
                    trace_id_high: 1,
                    span_id: 9,
                }]),
                flags: 1,
                start_time: 1_000_000,
                duration: 2,
                tags: Some(vec![long_tag("attempt", 1)]),
                logs: Some(vec![ThriftLog {
                    timestamp: 1_100_000,
                    fields: vec![string_tag("event", "x")],
                }]),
            }],
        };
        let jaeger_batch = thrift_batch_to_jaeger(batch);
        let process = jaeger_batch.process.as_ref().unwrap();
        assert_eq!(process.service_name, "svc");
        assert_eq!(process.tags[0].key, "hostname");

        let span = &jaeger_batch.spans[0];
        assert_eq!(span.trace_id.len(), 16);
        assert_eq!(span.trace_id[7], 1);
        assert_eq!(span.trace_id[15], 2);
        assert_eq!(span.span_id, vec![0, 0, 0, 0, 0, 0, 0, 3]);
        assert_eq!(span.flags, 1);
        assert_eq!(span.references.len(), 1);
        assert_eq!(span.references[0].span_id, vec![0, 0, 0, 0, 0, 0, 0, 9]);
        assert_eq!(span.tags[0].v_int64, 1);
        assert_eq!(span.logs[0].fields[0].v_str, "x");
        assert_eq!(span.process.as_ref().unwrap().service_name, "svc");
    }
}

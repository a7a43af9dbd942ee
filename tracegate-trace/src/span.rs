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

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The canonical span representation every decoder converts into. It follows
/// the Zipkin v2 data model: one span per reporting endpoint, kind and
/// endpoints lifted out of the annotation stream.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    pub trace_id: String,
    pub id: String,
    pub parent_id: Option<String>,
    pub name: Option<String>,
    pub kind: Option<SpanKind>,
    /// Microseconds since the Unix epoch.
    pub timestamp: Option<i64>,
    /// Microseconds.
    pub duration: Option<i64>,
    pub debug: Option<bool>,
    /// Set on the receiver half of an RPC whose client side also reports.
    pub shared: Option<bool>,
    pub local_endpoint: Option<Endpoint>,
    pub remote_endpoint: Option<Endpoint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpanKind {
    Client,
    Server,
    Producer,
    Consumer,
}

impl SpanKind {
    /// The `span.kind` tag value used by Jaeger and OpenTracing clients.
    pub fn as_jaeger_tag(&self) -> &'static str {
        match self {
            SpanKind::Client => "client",
            SpanKind::Server => "server",
            SpanKind::Producer => "producer",
            SpanKind::Consumer => "consumer",
        }
    }

    pub fn from_jaeger_tag(tag_value: &str) -> Option<SpanKind> {
        match tag_value {
            "client" => Some(SpanKind::Client),
            "server" => Some(SpanKind::Server),
            "producer" => Some(SpanKind::Producer),
            "consumer" => Some(SpanKind::Consumer),
            _ => None,
        }
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub service_name: Option<String>,
    pub ipv4: Option<String>,
    pub ipv6: Option<String>,
    pub port: Option<i32>,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Microseconds since the Unix epoch.
    pub timestamp: Option<i64>,
    pub value: Option<String>,
}

/// Left-pads a hex ID with `'0'` to the next valid width. Jaeger code paths
/// format IDs from integers and drop leading zeros, which fails length
/// validation downstream.
pub fn pad_id(id: String) -> String {
    let expected_len = if id.len() < 16 {
        16
    } else if id.len() > 16 && id.len() < 32 {
        32
    } else {
        return id;
    };
    format!("{id:0>expected_len$}")
}

/// A parent span ID of all hex zeros means "no parent".
pub fn normalize_parent_span_id(parent_span_id: Option<String>) -> Option<String> {
    parent_span_id.filter(|span_id| span_id.chars().any(|ch| ch != '0'))
}

/// Two endpoints report the same host for fan-out purposes iff both service
/// names are absent, or both are present and equal.
pub fn close_enough(left: &Endpoint, right: &Endpoint) -> bool {
    match (&left.service_name, &right.service_name) {
        (Some(left_name), Some(right_name)) => left_name == right_name,
        (None, None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named_endpoint(service_name: &str) -> Endpoint {
        Endpoint {
            service_name: Some(service_name.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_pad_id() {
        assert_eq!(pad_id("abc".to_string()), "0000000000000abc");
        assert_eq!(pad_id("def".to_string()), "0000000000000def");
        assert_eq!(pad_id("1234567890abcdef".to_string()), "1234567890abcdef");
        assert_eq!(
            pad_id("11234567890abcdef".to_string()),
            "00000000000000011234567890abcdef"
        );
        assert_eq!(pad_id(String::new()), "0000000000000000");
    }

    #[test]
    fn test_pad_id_is_idempotent_on_padded_ids() {
        for id in ["1234567890abcdef", "f1234567890abcdef1234567890abcde"] {
            let padded = pad_id(id.to_string());
            assert_eq!(pad_id(padded.clone()), padded);
        }
    }

    #[test]
    fn test_normalize_parent_span_id() {
        assert_eq!(normalize_parent_span_id(None), None);
        assert_eq!(
            normalize_parent_span_id(Some("0000000000000000".to_string())),
            None
        );
        assert_eq!(normalize_parent_span_id(Some("0".to_string())), None);
        assert_eq!(
            normalize_parent_span_id(Some("000000000000000a".to_string())),
            Some("000000000000000a".to_string())
        );
    }

    #[test]
    fn test_close_enough() {
        assert!(close_enough(&Endpoint::default(), &Endpoint::default()));
        assert!(close_enough(&named_endpoint("api"), &named_endpoint("api")));
        assert!(!close_enough(&named_endpoint("api"), &named_endpoint("web")));
        assert!(!close_enough(&named_endpoint("api"), &Endpoint::default()));
        assert!(!close_enough(&Endpoint::default(), &named_endpoint("api")));
    }

    #[test]
    fn test_span_kind_serde() {
        let kind_json = serde_json::to_string(&SpanKind::Client).unwrap();
        assert_eq!(kind_json, r#""CLIENT""#);
        let kind = serde_json::from_str::<SpanKind>(r#""CONSUMER""#).unwrap();
        assert_eq!(kind, SpanKind::Consumer);
    }
}

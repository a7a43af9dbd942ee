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

//! The span-conversion engine of the tracegate ingest gateway.
//!
//! Three decoders feed one converter family feeding one sink adapter:
//! Zipkin v1 JSON, Zipkin v2 JSON, and Jaeger Thrift submissions all convert
//! into the canonical [`Span`], or alternatively into the Jaeger `api_v2`
//! model for SAPM transport.

mod errors;
mod jaeger;
mod sapm;
mod span;
mod span_id;
mod trace_id;
mod zipkin;

use async_trait::async_trait;

pub use crate::errors::{SpanConversionError, TraceErrs, TraceIngestError};
pub use crate::jaeger::{
    convert_jaeger_batch, decode_jaeger_thrift_batch, ingest_jaeger_thrift_spans,
    sapm_from_jaeger_thrift, tag_value_to_string, thrift_batch_to_jaeger,
};
pub use crate::sapm::{
    jaeger_batches_from_json, sapm_from_json, span_to_jaeger, SpanBatcher, DEBUG_FLAG,
};
pub use crate::span::{
    close_enough, normalize_parent_span_id, pad_id, Annotation, Endpoint, Span, SpanKind,
};
pub use crate::span_id::{SpanId, TryFromHexSpanIdError};
pub use crate::trace_id::{TraceId, TryFromHexTraceIdError};
pub use crate::zipkin::{
    decode_json_spans, ingest_json_spans, parse_input_spans, InputAnnotation,
    InputBinaryAnnotation, InputSpan, TagValue,
};

/// The downstream consumer of converted spans. The sink takes ownership of
/// the spans; the engine keeps no state across requests.
#[async_trait]
pub trait SpanSink: Send + Sync + 'static {
    async fn add_spans(&self, spans: Vec<Span>) -> anyhow::Result<()>;
}

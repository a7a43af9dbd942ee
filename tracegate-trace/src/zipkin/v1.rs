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

//! Zipkin v1 to canonical span conversion.
//!
//! A single v1 span can map to multiple canonical spans because its
//! annotations and binary annotations each carry their own endpoint: every
//! distinct reporting endpoint gets its own output span, and a loopback RPC
//! is split into a client and a server span. The conversion was originally
//! ported from
//! <https://github.com/openzipkin/zipkin/blob/2.8.4/zipkin/src/main/java/zipkin/internal/V2SpanConverter.java>.

use crate::errors::SpanConversionError;
use crate::span::{close_enough, normalize_parent_span_id, pad_id, Annotation, Endpoint, Span, SpanKind};
use crate::zipkin::{InputAnnotation, InputSpan, TagValue};

impl InputSpan {
    /// Runs the fan-out conversion and returns the derived spans in creation
    /// order. `spans[0]` always restates the input span's trivial fields.
    pub fn from_zipkin_v1(&self) -> Result<Vec<Span>, SpanConversionError> {
        let mut span_builder = SpanBuilder {
            spans: vec![self.skeleton_span()],
            ..Default::default()
        };
        span_builder.process_annotations(self);
        span_builder.process_binary_annotations(self)?;
        Ok(span_builder.spans)
    }

    /// A copy of the input span's trivial fields, with no endpoint claimed
    /// yet and an empty tag map.
    fn skeleton_span(&self) -> Span {
        Span {
            trace_id: pad_id(self.trace_id.clone()),
            id: pad_id(self.id.clone()),
            parent_id: normalize_parent_span_id(self.parent_id.clone()).map(pad_id),
            name: self.name.clone(),
            debug: self.debug,
            shared: self.shared,
            ..Default::default()
        }
    }

    fn end_timestamp_reflects_span_duration(&self, end: Option<&InputAnnotation>) -> bool {
        match (end, self.timestamp, self.duration) {
            (Some(end), Some(timestamp), Some(duration)) => {
                end.timestamp == Some(timestamp + duration)
            }
            _ => false,
        }
    }
}

/// The per-input-span conversion state: the output spans plus one slot for
/// each special annotation seen so far.
#[derive(Default)]
struct SpanBuilder {
    spans: Vec<Span>,
    cs: Option<InputAnnotation>,
    sr: Option<InputAnnotation>,
    ss: Option<InputAnnotation>,
    cr: Option<InputAnnotation>,
    ms: Option<InputAnnotation>,
    mr: Option<InputAnnotation>,
    ws: Option<InputAnnotation>,
    wr: Option<InputAnnotation>,
}

impl SpanBuilder {
    fn add_span_for_endpoint(&mut self, input_span: &InputSpan, endpoint: Option<&Endpoint>) -> usize {
        let mut span = input_span.skeleton_span();
        span.local_endpoint = endpoint.cloned();
        self.spans.push(span);
        self.spans.len() - 1
    }

    /// Routes an endpoint to the span owning it, claiming the first
    /// endpoint-less span or appending a new one if no existing span is
    /// close enough.
    fn span_for_endpoint(&mut self, input_span: &InputSpan, endpoint: Option<&Endpoint>) -> usize {
        let Some(endpoint) = endpoint else {
            // Allocate missing endpoint data to the first span. For a Zipkin
            // v2 span this will be the only one.
            return 0;
        };
        for (idx, span) in self.spans.iter_mut().enumerate() {
            match &span.local_endpoint {
                None => {
                    span.local_endpoint = Some(endpoint.clone());
                    return idx;
                }
                Some(local_endpoint) if close_enough(local_endpoint, endpoint) => return idx,
                Some(_) => {}
            }
        }
        self.add_span_for_endpoint(input_span, Some(endpoint))
    }

    fn process_annotations(&mut self, input_span: &InputSpan) {
        self.pull_out_special_annotations(input_span);
        self.fill_in_start_annotations(input_span);

        match (
            self.cs.clone(),
            self.sr.clone(),
            self.ss.clone(),
            self.cr.clone(),
        ) {
            (Some(_), Some(_), _, _) => self.fill_in_missing_timings(input_span),
            (Some(cs), None, _, Some(cr)) => {
                self.maybe_timestamp_duration(input_span, &cs, Some(&cr))
            }
            (None, Some(sr), Some(ss), _) => {
                self.maybe_timestamp_duration(input_span, &sr, Some(&ss))
            }
            // Otherwise the span is incomplete, revert the special-casing.
            _ => self.handle_incomplete_span(input_span),
        }

        // The v1 format had no shared flag; by convention an absent timestamp
        // on a span only reported from the server side implied shared. Carry
        // that signal over.
        if self.cs.is_none() && self.sr.is_some() && input_span.timestamp.is_none() {
            let sr_endpoint = self.sr.as_ref().and_then(|sr| sr.endpoint.clone());
            let idx = self.span_for_endpoint(input_span, sr_endpoint.as_ref());
            self.spans[idx].shared = Some(true);
        }

        self.handle_message_queue_annotations(input_span);
    }

    fn pull_out_special_annotations(&mut self, input_span: &InputSpan) {
        for annotation in &input_span.annotations {
            let idx = self.span_for_endpoint(input_span, annotation.endpoint.as_ref());

            // Core annotations require an endpoint; without one the label
            // gets no special treatment.
            let processed = match annotation.value.as_deref() {
                Some(value) if value.len() == 2 && annotation.endpoint.is_some() => {
                    self.handle_special_annotation(annotation, idx)
                }
                _ => false,
            };
            if !processed {
                self.spans[idx].annotations.push(Annotation {
                    timestamp: annotation.timestamp,
                    value: annotation.value.clone(),
                });
            }
        }
    }

    fn handle_special_annotation(&mut self, annotation: &InputAnnotation, idx: usize) -> bool {
        let span = &mut self.spans[idx];
        match annotation.value.as_deref() {
            Some("cs") => {
                span.kind = Some(SpanKind::Client);
                self.cs = Some(annotation.clone());
            }
            Some("sr") => {
                span.kind = Some(SpanKind::Server);
                self.sr = Some(annotation.clone());
            }
            Some("ss") => {
                span.kind = Some(SpanKind::Server);
                self.ss = Some(annotation.clone());
            }
            Some("cr") => {
                span.kind = Some(SpanKind::Client);
                self.cr = Some(annotation.clone());
            }
            Some("ms") => {
                span.kind = Some(SpanKind::Producer);
                self.ms = Some(annotation.clone());
            }
            Some("mr") => {
                span.kind = Some(SpanKind::Consumer);
                self.mr = Some(annotation.clone());
            }
            Some("ws") => self.ws = Some(annotation.clone()),
            Some("wr") => self.wr = Some(annotation.clone()),
            _ => return false,
        }
        true
    }

    /// Bridging from the event model can lose a start annotation. When the
    /// end annotation lines up exactly with the declared timestamp plus
    /// duration, rebuild the start annotation at the declared timestamp.
    fn fill_in_start_annotations(&mut self, input_span: &InputSpan) {
        if self.cs.is_none() && input_span.end_timestamp_reflects_span_duration(self.cr.as_ref()) {
            self.cs = Some(InputAnnotation {
                timestamp: input_span.timestamp,
                value: Some("cs".to_string()),
                endpoint: self.cr.as_ref().and_then(|cr| cr.endpoint.clone()),
            });
        }
        if self.sr.is_none() && input_span.end_timestamp_reflects_span_duration(self.ss.as_ref()) {
            self.sr = Some(InputAnnotation {
                timestamp: input_span.timestamp,
                value: Some("sr".to_string()),
                endpoint: self.ss.as_ref().and_then(|ss| ss.endpoint.clone()),
            });
        }
    }

    /// Both `cs` and `sr` are present: one input span reports both sides of
    /// the RPC.
    fn fill_in_missing_timings(&mut self, input_span: &InputSpan) {
        let (Some(cs), Some(sr)) = (self.cs.clone(), self.sr.clone()) else {
            return;
        };

        // In a shared span, the client side owns the span duration, by
        // annotations or by explicit timestamp.
        self.maybe_timestamp_duration(input_span, &cs, self.cr.clone().as_ref());

        let client_idx = self.span_for_endpoint(input_span, cs.endpoint.as_ref());

        let server_idx = if endpoints_close_enough(cs.endpoint.as_ref(), sr.endpoint.as_ref()) {
            // Loopback: both sides report on the same endpoint, so fork a
            // second span for the server side.
            self.spans[client_idx].kind = Some(SpanKind::Client);
            let idx = self.add_span_for_endpoint(input_span, sr.endpoint.as_ref());
            self.spans[idx].kind = Some(SpanKind::Server);
            idx
        } else {
            self.span_for_endpoint(input_span, sr.endpoint.as_ref())
        };

        // The server side is smaller than that; read the annotations to find
        // out by how much.
        let server = &mut self.spans[server_idx];
        server.shared = Some(true);
        server.timestamp = sr.timestamp;
        if let (Some(ss), Some(sr_timestamp)) = (&self.ss, sr.timestamp) {
            if let Some(ss_timestamp) = ss.timestamp {
                server.duration = Some(ss_timestamp - sr_timestamp);
            }
        }
        if self.cr.is_none() && input_span.duration.is_none() {
            self.spans[client_idx].duration = None;
        }
    }

    /// No complete begin/end pair was seen: fall back to whatever timing the
    /// individual annotations and the input span itself provide.
    fn handle_incomplete_span(&mut self, input_span: &InputSpan) {
        for span in &mut self.spans {
            match span.kind {
                Some(SpanKind::Client) => {
                    if let Some(cs) = &self.cs {
                        span.timestamp = cs.timestamp;
                    }
                    if let Some(cr) = &self.cr {
                        span.annotations.push(Annotation {
                            timestamp: cr.timestamp,
                            value: cr.value.clone(),
                        });
                    }
                }
                Some(SpanKind::Server) => {
                    if let Some(sr) = &self.sr {
                        span.timestamp = sr.timestamp;
                    }
                    if let Some(ss) = &self.ss {
                        span.annotations.push(Annotation {
                            timestamp: ss.timestamp,
                            value: ss.value.clone(),
                        });
                    }
                }
                _ => {}
            }
        }
        self.fill_in_timings_on_first_span(input_span);
    }

    fn fill_in_timings_on_first_span(&mut self, input_span: &InputSpan) {
        if input_span.timestamp.is_some() {
            self.spans[0].timestamp = input_span.timestamp;
            self.spans[0].duration = input_span.duration;
        }
    }

    fn handle_message_queue_annotations(&mut self, input_span: &InputSpan) {
        // ms and mr are not supposed to be in the same span, but in case
        // they are..
        match (self.ms.clone(), self.mr.clone()) {
            (Some(ms), Some(mr)) => self.handle_both_ms_and_mr(input_span, &ms, &mr),
            (Some(ms), None) => {
                self.maybe_timestamp_duration(input_span, &ms, self.ws.clone().as_ref())
            }
            (None, Some(mr)) => match self.wr.clone() {
                Some(wr) => self.maybe_timestamp_duration(input_span, &wr, Some(&mr)),
                None => self.maybe_timestamp_duration(input_span, &mr, None),
            },
            (None, None) => {
                for queue_annotation in [self.ws.clone(), self.wr.clone()].into_iter().flatten() {
                    let idx =
                        self.span_for_endpoint(input_span, queue_annotation.endpoint.as_ref());
                    self.spans[idx].annotations.push(Annotation {
                        timestamp: queue_annotation.timestamp,
                        value: queue_annotation.value.clone(),
                    });
                }
            }
        }
    }

    fn handle_both_ms_and_mr(
        &mut self,
        input_span: &InputSpan,
        ms: &InputAnnotation,
        mr: &InputAnnotation,
    ) {
        let producer_idx = self.span_for_endpoint(input_span, ms.endpoint.as_ref());
        let consumer_idx = if endpoints_close_enough(ms.endpoint.as_ref(), mr.endpoint.as_ref()) {
            // Loopback: fork a new span for the consumer side.
            self.spans[producer_idx].kind = Some(SpanKind::Producer);
            let idx = self.add_span_for_endpoint(input_span, mr.endpoint.as_ref());
            self.spans[idx].kind = Some(SpanKind::Consumer);
            idx
        } else {
            self.span_for_endpoint(input_span, mr.endpoint.as_ref())
        };

        let consumer = &mut self.spans[consumer_idx];
        consumer.shared = Some(true);
        match (&self.wr, mr.timestamp) {
            (Some(wr), Some(mr_timestamp)) if wr.timestamp.is_some() => {
                consumer.timestamp = wr.timestamp;
                consumer.duration = wr.timestamp.map(|wr_timestamp| mr_timestamp - wr_timestamp);
            }
            _ => consumer.timestamp = mr.timestamp,
        }

        let producer = &mut self.spans[producer_idx];
        producer.timestamp = ms.timestamp;
        if let Some(ws) = &self.ws {
            if let (Some(ws_timestamp), Some(ms_timestamp)) = (ws.timestamp, ms.timestamp) {
                producer.duration = Some(ws_timestamp - ms_timestamp);
            }
        }
    }

    /// Routes to the span owning `begin`'s endpoint and fills its timing: the
    /// explicit input timestamp and duration win, otherwise the timing is
    /// inferred from the begin/end annotation pair.
    fn maybe_timestamp_duration(
        &mut self,
        input_span: &InputSpan,
        begin: &InputAnnotation,
        end: Option<&InputAnnotation>,
    ) {
        let idx = self.span_for_endpoint(input_span, begin.endpoint.as_ref());
        let span = &mut self.spans[idx];
        if input_span.timestamp.is_some() && input_span.duration.is_some() {
            span.timestamp = input_span.timestamp;
            span.duration = input_span.duration;
        } else {
            span.timestamp = begin.timestamp;
            if let (Some(end), Some(begin_timestamp)) = (end, begin.timestamp) {
                if let Some(end_timestamp) = end.timestamp {
                    span.duration = Some(end_timestamp - begin_timestamp);
                }
            }
        }
    }

    fn process_binary_annotations(
        &mut self,
        input_span: &InputSpan,
    ) -> Result<(), SpanConversionError> {
        let (ca, sa, ma) = self.pull_out_address_annotations(input_span)?;

        if self.handle_only_address_annotations(input_span, ca.as_ref(), sa.as_ref()) {
            return Ok(());
        }
        if let Some(sa) = &sa {
            self.handle_sa_present(input_span, sa);
        }
        if let Some(ca) = &ca {
            self.handle_ca_present(input_span, ca);
        }
        if let Some(ma) = &ma {
            self.handle_ma_present(input_span, ma);
        }
        Ok(())
    }

    /// Walks the binary annotations in order: boolean `ca`/`sa`/`ma` entries
    /// record address endpoints, every other entry becomes a tag on its
    /// endpoint's span.
    fn pull_out_address_annotations(
        &mut self,
        input_span: &InputSpan,
    ) -> Result<AddressAnnotations, SpanConversionError> {
        let mut ca = None;
        let mut sa = None;
        let mut ma = None;
        for binary_annotation in &input_span.binary_annotations {
            let (Some(key), Some(value)) = (&binary_annotation.key, &binary_annotation.value)
            else {
                continue;
            };
            if let TagValue::Bool(flag) = value {
                match key.as_str() {
                    "ca" => ca = binary_annotation.endpoint.clone(),
                    "sa" => sa = binary_annotation.endpoint.clone(),
                    "ma" => ma = binary_annotation.endpoint.clone(),
                    _ => {
                        let idx = self
                            .span_for_endpoint(input_span, binary_annotation.endpoint.as_ref());
                        let tag_value = if *flag { "true" } else { "false" };
                        self.spans[idx].tags.insert(key.clone(), tag_value.to_string());
                    }
                }
                continue;
            }
            let idx = self.span_for_endpoint(input_span, binary_annotation.endpoint.as_ref());
            self.convert_to_tag_on_span(idx, key, value)?;
        }
        Ok((ca, sa, ma))
    }

    fn convert_to_tag_on_span(
        &mut self,
        idx: usize,
        key: &str,
        value: &TagValue,
    ) -> Result<(), SpanConversionError> {
        let span = &mut self.spans[idx];
        match value {
            TagValue::String(value) => {
                // don't add marker "lc" tags
                if key == "lc" && value.is_empty() {
                    return Ok(());
                }
                span.tags.insert(key.to_string(), value.clone());
            }
            TagValue::Bytes(bytes) => {
                span.tags
                    .insert(key.to_string(), String::from_utf8_lossy(bytes).into_owned());
            }
            TagValue::Double(value) => {
                span.tags.insert(key.to_string(), value.to_string());
            }
            TagValue::Int(value) => {
                span.tags.insert(key.to_string(), value.to_string());
            }
            TagValue::Uint(value) => {
                span.tags.insert(key.to_string(), value.to_string());
            }
            TagValue::Bool(_) | TagValue::Other(_) => {
                return Err(SpanConversionError::InvalidBinaryAnnotationType {
                    key: key.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Special case: no core RPC annotation at all, but both address
    /// annotations. The `ca` span simply points at the `sa` endpoint.
    fn handle_only_address_annotations(
        &mut self,
        input_span: &InputSpan,
        ca: Option<&Endpoint>,
        sa: Option<&Endpoint>,
    ) -> bool {
        if !self.has_core_rpc_annotations() {
            if let (Some(ca), Some(sa)) = (ca, sa) {
                let idx = self.span_for_endpoint(input_span, Some(ca));
                self.spans[idx].remote_endpoint = Some(sa.clone());
                return true;
            }
        }
        false
    }

    fn handle_sa_present(&mut self, input_span: &InputSpan, sa: &Endpoint) {
        let cs_endpoint = self.cs.as_ref().and_then(|cs| cs.endpoint.clone());
        let cr_endpoint = self.cr.as_ref().and_then(|cr| cr.endpoint.clone());
        if self.cs.is_some() && !endpoints_close_enough(Some(sa), cs_endpoint.as_ref()) {
            let idx = self.span_for_endpoint(input_span, cs_endpoint.as_ref());
            self.spans[idx].remote_endpoint = Some(sa.clone());
        } else if self.cr.is_some() && !endpoints_close_enough(Some(sa), cr_endpoint.as_ref()) {
            let idx = self.span_for_endpoint(input_span, cr_endpoint.as_ref());
            self.spans[idx].remote_endpoint = Some(sa.clone());
        } else if !self.has_core_rpc_annotations() {
            let idx = self.span_for_endpoint(input_span, None);
            self.spans[idx].kind = Some(SpanKind::Client);
            self.spans[idx].remote_endpoint = Some(sa.clone());
        }
    }

    fn handle_ca_present(&mut self, input_span: &InputSpan, ca: &Endpoint) {
        let sr_endpoint = self.sr.as_ref().and_then(|sr| sr.endpoint.clone());
        let ss_endpoint = self.ss.as_ref().and_then(|ss| ss.endpoint.clone());
        if self.sr.is_some() && !endpoints_close_enough(Some(ca), sr_endpoint.as_ref()) {
            let idx = self.span_for_endpoint(input_span, sr_endpoint.as_ref());
            self.spans[idx].remote_endpoint = Some(ca.clone());
        }
        if self.ss.is_some() && !endpoints_close_enough(Some(ca), ss_endpoint.as_ref()) {
            let idx = self.span_for_endpoint(input_span, ss_endpoint.as_ref());
            self.spans[idx].remote_endpoint = Some(ca.clone());
        } else if !self.has_core_rpc_annotations() {
            let idx = self.span_for_endpoint(input_span, None);
            self.spans[idx].kind = Some(SpanKind::Server);
            self.spans[idx].remote_endpoint = Some(ca.clone());
        }
    }

    fn handle_ma_present(&mut self, input_span: &InputSpan, ma: &Endpoint) {
        let ms_endpoint = self.ms.as_ref().and_then(|ms| ms.endpoint.clone());
        let mr_endpoint = self.mr.as_ref().and_then(|mr| mr.endpoint.clone());
        if self.ms.is_some() && !endpoints_close_enough(Some(ma), ms_endpoint.as_ref()) {
            let idx = self.span_for_endpoint(input_span, ms_endpoint.as_ref());
            self.spans[idx].remote_endpoint = Some(ma.clone());
        }
        if self.mr.is_some() && !endpoints_close_enough(Some(ma), mr_endpoint.as_ref()) {
            let idx = self.span_for_endpoint(input_span, mr_endpoint.as_ref());
            self.spans[idx].remote_endpoint = Some(ma.clone());
        }
    }

    fn has_core_rpc_annotations(&self) -> bool {
        self.cs.is_some() || self.cr.is_some() || self.sr.is_some() || self.ss.is_some()
    }
}

type AddressAnnotations = (Option<Endpoint>, Option<Endpoint>, Option<Endpoint>);

fn endpoints_close_enough(left: Option<&Endpoint>, right: Option<&Endpoint>) -> bool {
    match (left, right) {
        (Some(left), Some(right)) => close_enough(left, right),
        _ => false,
    }
}

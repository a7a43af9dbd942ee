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

use std::fmt;

use crate::span_id::TryFromHexSpanIdError;
use crate::trace_id::TryFromHexTraceIdError;

/// Errors surfaced at the request boundary.
#[derive(Debug, thiserror::Error)]
pub enum TraceIngestError {
    #[error("unable to fully read the request body")]
    UnableToReadRequest,
    #[error("invalid Thrift format; the payload must be a Jaeger `Batch` in the binary protocol")]
    InvalidJaegerTraceFormat,
    #[error(
        "invalid JSON format; please see correct format at \
         https://zipkin.io/zipkin-api/#/default/post_spans"
    )]
    InvalidJsonTraceFormat,
    #[error(transparent)]
    Conversion(#[from] TraceErrs),
    #[error(transparent)]
    Sink(anyhow::Error),
}

/// An error converting one input span. The rest of the batch is unaffected:
/// dropping a single span beats losing a whole request.
#[derive(Debug, thiserror::Error)]
pub enum SpanConversionError {
    #[error("span cannot have binaryAnnotations with Zipkin V2 fields")]
    BinaryAnnotationsWithV2Fields,
    #[error("invalid binary annotation type for key `{key}`")]
    InvalidBinaryAnnotationType { key: String },
    #[error(transparent)]
    InvalidTraceId(#[from] TryFromHexTraceIdError),
    #[error(transparent)]
    InvalidSpanId(#[from] TryFromHexSpanIdError),
}

/// Accumulates span-conversion errors over a request. A default aggregator
/// means "no errors": callers can append unconditionally and only surface the
/// aggregator when something actually failed.
#[derive(Debug, Default)]
pub struct TraceErrs {
    count: usize,
    last_err: Option<SpanConversionError>,
}

impl TraceErrs {
    pub fn append(&mut self, err: SpanConversionError) {
        self.count += 1;
        self.last_err = Some(err);
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Folds the aggregator with the sink result. Conversion errors win: the
    /// sink error is surfaced only when every span converted cleanly.
    pub fn into_result(self, sink_result: anyhow::Result<()>) -> Result<(), TraceIngestError> {
        if self.is_empty() {
            sink_result.map_err(TraceIngestError::Sink)
        } else {
            Err(TraceIngestError::Conversion(self))
        }
    }
}

impl fmt::Display for TraceErrs {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.last_err {
            Some(last_err) => write!(
                formatter,
                "{} errors encountered, last one was: {last_err}",
                self.count
            ),
            None => write!(formatter, "no errors encountered"),
        }
    }
}

impl std::error::Error for TraceErrs {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_errs_starts_empty() {
        let errs = TraceErrs::default();
        assert!(errs.is_empty());
        assert_eq!(errs.count(), 0);
        errs.into_result(Ok(())).unwrap();
    }

    #[test]
    fn test_trace_errs_display() {
        let mut errs = TraceErrs::default();
        errs.append(SpanConversionError::InvalidBinaryAnnotationType {
            key: "lc".to_string(),
        });
        errs.append(SpanConversionError::BinaryAnnotationsWithV2Fields);
        assert_eq!(
            errs.to_string(),
            "2 errors encountered, last one was: span cannot have binaryAnnotations with Zipkin \
             V2 fields"
        );
    }

    #[test]
    fn test_conversion_errors_take_precedence_over_sink_errors() {
        let mut errs = TraceErrs::default();
        errs.append(SpanConversionError::BinaryAnnotationsWithV2Fields);
        let err = errs
            .into_result(Err(anyhow::anyhow!("sink unavailable")))
            .unwrap_err();
        assert!(matches!(err, TraceIngestError::Conversion(_)));
    }

    #[test]
    fn test_sink_error_surfaces_when_no_conversion_errors() {
        let errs = TraceErrs::default();
        let err = errs
            .into_result(Err(anyhow::anyhow!("sink unavailable")))
            .unwrap_err();
        assert!(matches!(err, TraceIngestError::Sink(_)));
    }
}

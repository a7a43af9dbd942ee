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

use std::io::Read;

use axum::extract::{FromRequest, Request};
use axum::http::header::CONTENT_ENCODING;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use flate2::read::{MultiGzDecoder, ZlibDecoder};
use tracegate_trace::TraceIngestError;

/// A request body with its `Content-Encoding` already applied. Ingesting is
/// CPU bound anyway, so the whole body is fetched before decompressing
/// rather than streamed through an async decoder.
pub(crate) struct DecompressedBody(pub Bytes);

#[axum::async_trait]
impl<S> FromRequest<S> for DecompressedBody
where S: Send + Sync
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_encoding = req
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|header_value| header_value.to_str().ok())
            .map(|header_value| header_value.to_string());

        let body = Bytes::from_request(req, state).await.map_err(|_| {
            (
                StatusCode::BAD_REQUEST,
                TraceIngestError::UnableToReadRequest.to_string(),
            )
                .into_response()
        })?;

        let decompressed = decompress_body(content_encoding.as_deref(), body).map_err(|_| {
            (StatusCode::BAD_REQUEST, "failed to decompress body").into_response()
        })?;

        Ok(Self(decompressed))
    }
}

fn decompress_body(encoding: Option<&str>, body: Bytes) -> std::io::Result<Bytes> {
    match encoding {
        Some("identity") | None => Ok(body),
        Some("gzip" | "x-gzip") => {
            let mut decompressed = Vec::new();
            MultiGzDecoder::new(body.as_ref()).read_to_end(&mut decompressed)?;
            Ok(Bytes::from(decompressed))
        }
        Some("deflate" | "x-deflate") => {
            let mut decompressed = Vec::new();
            ZlibDecoder::new(body.as_ref()).read_to_end(&mut decompressed)?;
            Ok(Bytes::from(decompressed))
        }
        Some("zstd") => zstd::decode_all(body.as_ref()).map(Bytes::from),
        Some(_encoding) => Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            "unsupported encoding",
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_decompress_identity() {
        let body = Bytes::from_static(b"[]");
        assert_eq!(decompress_body(None, body.clone()).unwrap(), body);
        assert_eq!(decompress_body(Some("identity"), body.clone()).unwrap(), body);
    }

    #[test]
    fn test_decompress_gzip() {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"[{\"traceId\": \"abc\"}]").unwrap();
        let compressed = Bytes::from(encoder.finish().unwrap());

        let decompressed = decompress_body(Some("gzip"), compressed).unwrap();
        assert_eq!(decompressed, Bytes::from_static(b"[{\"traceId\": \"abc\"}]"));
    }

    #[test]
    fn test_decompress_zstd() {
        let compressed = Bytes::from(zstd::encode_all(&b"[]"[..], 0).unwrap());
        let decompressed = decompress_body(Some("zstd"), compressed).unwrap();
        assert_eq!(decompressed, Bytes::from_static(b"[]"));
    }

    #[test]
    fn test_unsupported_encoding_is_rejected() {
        decompress_body(Some("br"), Bytes::from_static(b"[]")).unwrap_err();
    }

    #[test]
    fn test_corrupted_gzip_is_rejected() {
        decompress_body(Some("gzip"), Bytes::from_static(b"definitely not gzip")).unwrap_err();
    }
}

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

#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SpanId([u8; 8]);

impl SpanId {
    pub const HEX_LENGTH: usize = 16;

    pub fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// Parses a hex span ID of up to 16 characters, implicitly left-padding
    /// shorter IDs with zeros.
    pub fn from_hex(hex_span_id: &str) -> Result<Self, TryFromHexSpanIdError> {
        if hex_span_id.is_empty() || hex_span_id.len() > SpanId::HEX_LENGTH {
            return Err(TryFromHexSpanIdError(hex_span_id.to_string()));
        }
        let mut span_id = [0u8; 8];
        let padded_span_id = format!("{hex_span_id:0>width$}", width = SpanId::HEX_LENGTH);
        hex::decode_to_slice(padded_span_id, &mut span_id)
            .map_err(|_| TryFromHexSpanIdError(hex_span_id.to_string()))?;
        Ok(SpanId(span_id))
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", hex::encode(self.0))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("span ID must be 1 to 16 hex characters long, got `{0}`")]
pub struct TryFromHexSpanIdError(String);

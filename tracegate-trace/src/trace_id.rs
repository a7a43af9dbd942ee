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
pub struct TraceId([u8; 16]);

impl TraceId {
    pub const HEX_LENGTH: usize = 32;

    pub fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// Parses a hex trace ID of up to 32 characters, implicitly left-padding
    /// shorter IDs with zeros.
    pub fn from_hex(hex_trace_id: &str) -> Result<Self, TryFromHexTraceIdError> {
        if hex_trace_id.is_empty() || hex_trace_id.len() > TraceId::HEX_LENGTH {
            return Err(TryFromHexTraceIdError(hex_trace_id.to_string()));
        }
        let mut trace_id = [0u8; 16];
        let padded_trace_id = format!("{hex_trace_id:0>width$}", width = TraceId::HEX_LENGTH);
        hex::decode_to_slice(padded_trace_id, &mut trace_id)
            .map_err(|_| TryFromHexTraceIdError(hex_trace_id.to_string()))?;
        Ok(TraceId(trace_id))
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", hex::encode(self.0))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("trace ID must be 1 to 32 hex characters long, got `{0}`")]
pub struct TryFromHexTraceIdError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_id_from_hex() {
        let trace_id = TraceId::from_hex("abc").unwrap();
        assert_eq!(trace_id.to_string(), "00000000000000000000000000000abc");

        let trace_id = TraceId::from_hex("0123456789abcdef0123456789abcdef").unwrap();
        assert_eq!(trace_id.to_string(), "0123456789abcdef0123456789abcdef");

        TraceId::from_hex("").unwrap_err();
        TraceId::from_hex("not-hex!").unwrap_err();
        TraceId::from_hex("0123456789abcdef0123456789abcdef0").unwrap_err();
    }

    #[test]
    fn test_trace_id_as_bytes() {
        let trace_id = TraceId::new([1; 16]);
        assert_eq!(trace_id.as_bytes(), &[1; 16]);
        assert_eq!(trace_id.to_vec(), vec![1; 16]);
    }
}

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

//! Read-side of the Jaeger collector Thrift model, following
//! <https://github.com/jaegertracing/jaeger-idl/blob/main/thrift/jaeger.thrift>.
//!
//! The gateway only ever decodes this shape, so the structs carry readers for
//! the Thrift binary protocol and no writers. Unknown fields are skipped,
//! missing required fields decode to their default value.

use thrift::protocol::{field_id, TBinaryInputProtocol, TInputProtocol, TType};
use thrift::{ProtocolError, ProtocolErrorKind};

#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum TagType {
    #[default]
    String = 0,
    Double = 1,
    Bool = 2,
    Long = 3,
    Binary = 4,
}

impl TryFrom<i32> for TagType {
    type Error = thrift::Error;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TagType::String),
            1 => Ok(TagType::Double),
            2 => Ok(TagType::Bool),
            3 => Ok(TagType::Long),
            4 => Ok(TagType::Binary),
            _ => Err(thrift::Error::Protocol(ProtocolError::new(
                ProtocolErrorKind::InvalidData,
                format!("cannot convert enum constant {value} to TagType"),
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum SpanRefType {
    #[default]
    ChildOf = 0,
    FollowsFrom = 1,
}

impl TryFrom<i32> for SpanRefType {
    type Error = thrift::Error;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SpanRefType::ChildOf),
            1 => Ok(SpanRefType::FollowsFrom),
            _ => Err(thrift::Error::Protocol(ProtocolError::new(
                ProtocolErrorKind::InvalidData,
                format!("cannot convert enum constant {value} to SpanRefType"),
            ))),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tag {
    pub key: String,
    pub v_type: TagType,
    pub v_str: Option<String>,
    pub v_double: Option<f64>,
    pub v_bool: Option<bool>,
    pub v_long: Option<i64>,
    pub v_binary: Option<Vec<u8>>,
}

impl Tag {
    pub fn read_from_in_protocol(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Tag> {
        i_prot.read_struct_begin()?;
        let mut tag = Tag::default();
        loop {
            let field_ident = i_prot.read_field_begin()?;
            if field_ident.field_type == TType::Stop {
                break;
            }
            match field_id(&field_ident)? {
                1 => tag.key = i_prot.read_string()?,
                2 => tag.v_type = TagType::try_from(i_prot.read_i32()?)?,
                3 => tag.v_str = Some(i_prot.read_string()?),
                4 => tag.v_double = Some(i_prot.read_double()?),
                5 => tag.v_bool = Some(i_prot.read_bool()?),
                6 => tag.v_long = Some(i_prot.read_i64()?),
                7 => tag.v_binary = Some(i_prot.read_bytes()?),
                _ => i_prot.skip(field_ident.field_type)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(tag)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Log {
    pub timestamp: i64,
    pub fields: Vec<Tag>,
}

impl Log {
    pub fn read_from_in_protocol(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Log> {
        i_prot.read_struct_begin()?;
        let mut log = Log::default();
        loop {
            let field_ident = i_prot.read_field_begin()?;
            if field_ident.field_type == TType::Stop {
                break;
            }
            match field_id(&field_ident)? {
                1 => log.timestamp = i_prot.read_i64()?,
                2 => log.fields = read_list(i_prot, Tag::read_from_in_protocol)?,
                _ => i_prot.skip(field_ident.field_type)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(log)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SpanRef {
    pub ref_type: SpanRefType,
    pub trace_id_low: i64,
    pub trace_id_high: i64,
    pub span_id: i64,
}

impl SpanRef {
    pub fn read_from_in_protocol(i_prot: &mut dyn TInputProtocol) -> thrift::Result<SpanRef> {
        i_prot.read_struct_begin()?;
        let mut span_ref = SpanRef::default();
        loop {
            let field_ident = i_prot.read_field_begin()?;
            if field_ident.field_type == TType::Stop {
                break;
            }
            match field_id(&field_ident)? {
                1 => span_ref.ref_type = SpanRefType::try_from(i_prot.read_i32()?)?,
                2 => span_ref.trace_id_low = i_prot.read_i64()?,
                3 => span_ref.trace_id_high = i_prot.read_i64()?,
                4 => span_ref.span_id = i_prot.read_i64()?,
                _ => i_prot.skip(field_ident.field_type)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(span_ref)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Span {
    pub trace_id_low: i64,
    pub trace_id_high: i64,
    pub span_id: i64,
    pub parent_span_id: i64,
    pub operation_name: String,
    pub references: Option<Vec<SpanRef>>,
    pub flags: i32,
    pub start_time: i64,
    pub duration: i64,
    pub tags: Option<Vec<Tag>>,
    pub logs: Option<Vec<Log>>,
}

impl Span {
    pub fn read_from_in_protocol(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Span> {
        i_prot.read_struct_begin()?;
        let mut span = Span::default();
        loop {
            let field_ident = i_prot.read_field_begin()?;
            if field_ident.field_type == TType::Stop {
                break;
            }
            match field_id(&field_ident)? {
                1 => span.trace_id_low = i_prot.read_i64()?,
                2 => span.trace_id_high = i_prot.read_i64()?,
                3 => span.span_id = i_prot.read_i64()?,
                4 => span.parent_span_id = i_prot.read_i64()?,
                5 => span.operation_name = i_prot.read_string()?,
                6 => span.references = Some(read_list(i_prot, SpanRef::read_from_in_protocol)?),
                7 => span.flags = i_prot.read_i32()?,
                8 => span.start_time = i_prot.read_i64()?,
                9 => span.duration = i_prot.read_i64()?,
                10 => span.tags = Some(read_list(i_prot, Tag::read_from_in_protocol)?),
                11 => span.logs = Some(read_list(i_prot, Log::read_from_in_protocol)?),
                _ => i_prot.skip(field_ident.field_type)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(span)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Process {
    pub service_name: String,
    pub tags: Option<Vec<Tag>>,
}

impl Process {
    pub fn read_from_in_protocol(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Process> {
        i_prot.read_struct_begin()?;
        let mut process = Process::default();
        loop {
            let field_ident = i_prot.read_field_begin()?;
            if field_ident.field_type == TType::Stop {
                break;
            }
            match field_id(&field_ident)? {
                1 => process.service_name = i_prot.read_string()?,
                2 => process.tags = Some(read_list(i_prot, Tag::read_from_in_protocol)?),
                _ => i_prot.skip(field_ident.field_type)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(process)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Batch {
    pub process: Process,
    pub spans: Vec<Span>,
}

impl Batch {
    pub fn read_from_in_protocol(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Batch> {
        i_prot.read_struct_begin()?;
        let mut batch = Batch::default();
        loop {
            let field_ident = i_prot.read_field_begin()?;
            if field_ident.field_type == TType::Stop {
                break;
            }
            match field_id(&field_ident)? {
                1 => batch.process = Process::read_from_in_protocol(i_prot)?,
                2 => batch.spans = read_list(i_prot, Span::read_from_in_protocol)?,
                _ => i_prot.skip(field_ident.field_type)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(batch)
    }

    /// Decodes a collector submission, a bare `Batch` struct encoded with the
    /// Thrift binary protocol.
    pub fn from_thrift_bytes(bytes: &[u8]) -> thrift::Result<Batch> {
        let mut i_prot = TBinaryInputProtocol::new(bytes, true);
        Batch::read_from_in_protocol(&mut i_prot)
    }
}

fn read_list<T>(
    i_prot: &mut dyn TInputProtocol,
    read_element: fn(&mut dyn TInputProtocol) -> thrift::Result<T>,
) -> thrift::Result<Vec<T>> {
    let list_ident = i_prot.read_list_begin()?;
    // The declared size is attacker-controlled, only preallocate so much.
    let mut elements = Vec::with_capacity(list_ident.size.clamp(0, 1024) as usize);
    for _ in 0..list_ident.size {
        elements.push(read_element(i_prot)?);
    }
    i_prot.read_list_end()?;
    Ok(elements)
}
